use thiserror::Error;
use tracing::{debug, info, warn};

use std::{
    fs::File,
    io::{BufRead, BufReader, Write},
    path::PathBuf,
};

use crate::{console::Console, types::AccessToken};

/// Client id of the registered AniList application
pub const CLIENT_ID: u32 = 3721;

const AUTHORIZE_URI: &str = "https://anilist.co/api/v2/oauth/authorize";

/// Inputs that abort the token prompt
const CANCEL_INPUTS: &[&str] = &["cancel", "q"];

pub fn authorize_url() -> String {
    let client_id = CLIENT_ID.to_string();
    format!(
        "{AUTHORIZE_URI}?client_id={}&response_type={}",
        urlencoding::encode(&client_id),
        urlencoding::encode("token")
    )
}

#[derive(Debug, Error)]
pub enum LoadTokenError {
    #[error("failed to open token file")]
    Open(#[source] std::io::Error),
    #[error("failed to read token file")]
    Read(#[source] std::io::Error),
}

#[derive(Debug, Error)]
pub enum SaveTokenError {
    #[error("failed to create token directory")]
    CreateDir(#[source] std::io::Error),
    #[error("failed to write token file")]
    Write(#[source] std::io::Error),
}

pub trait TokenStore {
    /// `Ok(None)` means there is nothing stored yet
    fn load(&self) -> Result<Option<AccessToken>, LoadTokenError>;
    fn save(&mut self, token: &AccessToken) -> Result<(), SaveTokenError>;
}

/// Keeps the token on the first line of a plain text file
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: PathBuf) -> FileTokenStore {
        FileTokenStore { path }
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Result<Option<AccessToken>, LoadTokenError> {
        let file = File::open(&self.path).map_err(LoadTokenError::Open)?;

        let mut line = String::new();
        BufReader::new(file)
            .read_line(&mut line)
            .map_err(LoadTokenError::Read)?;

        let token = line.trim();
        if token.is_empty() {
            return Ok(None);
        }

        Ok(Some(AccessToken::from_stored(token.to_string())))
    }

    fn save(&mut self, token: &AccessToken) -> Result<(), SaveTokenError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(SaveTokenError::CreateDir)?;
            }
        }

        // Rewritten, not appended, so the saved token is always the line load() reads
        std::fs::write(&self.path, format!("{}\n", token.as_str())).map_err(SaveTokenError::Write)
    }
}

#[derive(Debug, Error)]
pub enum AcquireTokenError {
    #[error("authorization cancelled")]
    Cancelled,
    #[error("failed to read from stdin")]
    ReadInput(#[source] std::io::Error),
    #[error("failed to write to console")]
    WriteOutput(#[source] std::io::Error),
}

/// Returns the stored token, or walks the user through authorizing the app
/// and pasting a new one
pub fn acquire<S, R, W>(
    store: &mut S,
    input: &mut R,
    console: &mut Console<W>,
) -> Result<AccessToken, AcquireTokenError>
where
    S: TokenStore,
    R: BufRead,
    W: Write,
{
    use AcquireTokenError::*;

    match store.load() {
        Ok(Some(token)) => {
            debug!("Using stored access token");
            return Ok(token);
        }
        Ok(None) => {
            debug!("Token file is empty");
        }
        Err(e) => {
            warn!("{e}");
            let (headline, detail, emoji) = match e {
                LoadTokenError::Open(_) => (
                    "Couldn't open file!",
                    "Don't worry everything is fine",
                    "🤯",
                ),
                LoadTokenError::Read(_) => {
                    ("Couldn't read from file!", "Well this is awkward", "😳")
                }
            };
            console
                .warn(headline, detail, emoji)
                .map_err(WriteOutput)?;
        }
    }

    let name = console.highlight("NextUp");
    console
        .line(format!("Welcome to {name}!"))
        .map_err(WriteOutput)?;
    console
        .line("To get started you need to authorize the program")
        .map_err(WriteOutput)?;
    console
        .line(format!(
            "You can do so by heading over to {}",
            authorize_url()
        ))
        .map_err(WriteOutput)?;
    console
        .line("After you have authorized the program copy & paste the token")
        .map_err(WriteOutput)?;

    loop {
        console
            .prompt("Paste token right here: ")
            .map_err(WriteOutput)?;

        let mut line = String::new();
        let read = input.read_line(&mut line).map_err(ReadInput)?;
        if read == 0 {
            return Err(Cancelled);
        }

        let pasted = line.trim();
        if CANCEL_INPUTS.contains(&pasted) {
            return Err(Cancelled);
        }

        match AccessToken::parse(pasted) {
            Ok(token) => {
                if let Err(e) = store.save(&token) {
                    warn!("Token will not be remembered: {e}");
                } else {
                    info!("Saved new access token");
                }
                return Ok(token);
            }
            Err(e) => {
                debug!("Rejected pasted token: {e}");
                console.line("That is not a token :^/").map_err(WriteOutput)?;
            }
        }
    }
}
