use termion::{color, style};

use std::{
    fmt::Display,
    io::{self, Stdout, Write},
};

/// Line oriented text sink. Highlights are only emitted when `styled` is set
pub struct Console<W> {
    out: W,
    styled: bool,
}

impl Console<Stdout> {
    pub fn stdout() -> Console<Stdout> {
        let out = io::stdout();
        let styled = termion::is_tty(&out);
        Console { out, styled }
    }
}

impl<W: Write> Console<W> {
    pub fn new(out: W, styled: bool) -> Console<W> {
        Console { out, styled }
    }

    /// Bold blue span, used for the program name and show titles
    pub fn highlight(&self, text: &str) -> String {
        if !self.styled {
            return text.to_string();
        }

        format!(
            "{}{}{}{}{}",
            style::Bold,
            color::Fg(color::Blue),
            text,
            color::Fg(color::Reset),
            style::Reset
        )
    }

    pub fn line(&mut self, text: impl Display) -> io::Result<()> {
        writeln!(self.out, "{text}")
    }

    pub fn warn(&mut self, headline: &str, detail: &str, emoji: &str) -> io::Result<()> {
        if self.styled {
            writeln!(
                self.out,
                "{}{headline}{} {detail} {emoji}",
                color::Fg(color::Yellow),
                color::Fg(color::Reset)
            )
        } else {
            writeln!(self.out, "{headline} {detail} {emoji}")
        }
    }

    pub fn prompt(&mut self, text: &str) -> io::Result<()> {
        write!(self.out, "{text}")?;
        self.out.flush()
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_plain_output_has_no_escapes() {
        let mut console = Console::new(Vec::new(), false);
        let name = console.highlight("NextUp");
        console.line(format!("Welcome to {name}!")).expect("Failed to write");
        console
            .warn("Couldn't open file!", "Don't worry", "🤯")
            .expect("Failed to write");

        let out = String::from_utf8(console.into_inner()).expect("Invalid utf8");
        assert_eq!(out, "Welcome to NextUp!\nCouldn't open file! Don't worry 🤯\n");
    }

    #[test]
    fn test_styled_highlight() {
        let console = Console::new(Vec::new(), true);
        let name = console.highlight("NextUp");
        assert!(name.contains("NextUp"));
        assert!(name.starts_with('\x1b'));
        assert!(name.ends_with("\x1b[m"));
    }
}
