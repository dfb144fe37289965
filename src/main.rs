use thiserror::Error;
use tracing_subscriber::EnvFilter;

use std::{
    error::Error as StdError,
    path::{Path, PathBuf},
};

use app::Config;

mod anilist;
mod app;
mod console;
mod presenter;
mod schema;
mod season;
mod token;
mod types;

const TOKEN_FILE_NAME: &str = "setting.txt";
const SCHEMA_FILE_NAME: &str = "schema.graphql";

#[derive(Error, Debug, Eq, PartialEq)]
enum ArgParseError {
    #[error("Unknown arg {0}")]
    UnknownArg(String),
    #[error("No path provided for {0}")]
    MissingPath(String),
}

#[derive(Debug, Eq, PartialEq)]
enum Command {
    Help,
    Run(Args),
}

#[derive(Debug, Eq, PartialEq)]
struct Args {
    token_file: Option<PathBuf>,
    schema: Option<PathBuf>,
}

impl Args {
    fn parse<I: Iterator<Item = String>>(mut args: I) -> Result<Command, ArgParseError> {
        let _process_name = args.next();

        let mut token_file = None;
        let mut schema = None;
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--help" => return Ok(Command::Help),
                "--token-file" => {
                    token_file = Some(args.next().ok_or(ArgParseError::MissingPath(arg))?.into());
                }
                "--schema" => {
                    schema = Some(args.next().ok_or(ArgParseError::MissingPath(arg))?.into());
                }
                _ => {
                    return Err(ArgParseError::UnknownArg(arg));
                }
            }
        }

        Ok(Command::Run(Args { token_file, schema }))
    }

    fn help() -> String {
        let process_name = std::env::args()
            .next()
            .unwrap_or_else(|| "nextup".to_string());

        format!(
            "Show when the next episodes on your AniList watch list air\n\
                \n\
                Usage: {process_name} [ARGS]\n\
                \n\
                Args:\n\
                --help: Show this help\n\
                --token-file: Where the access token is kept. Defaults to {TOKEN_FILE_NAME} next \
                to the executable\n\
                --schema: AniList schema document. Defaults to {SCHEMA_FILE_NAME} next to the \
                executable\n\
                "
        )
    }

    fn into_config(self) -> Config {
        let dir = program_dir();
        let token_file = self
            .token_file
            .unwrap_or_else(|| dir.join(TOKEN_FILE_NAME));
        let schema = self.schema.unwrap_or_else(|| {
            let beside_exe = dir.join(SCHEMA_FILE_NAME);
            if beside_exe.exists() {
                beside_exe
            } else {
                Path::new(env!("CARGO_MANIFEST_DIR"))
                    .join("res")
                    .join(SCHEMA_FILE_NAME)
            }
        });

        Config { token_file, schema }
    }
}

fn program_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

fn format_error_chain(e: &dyn StdError) -> String {
    let mut out = format!("Error: {e}");
    let mut source = e.source();
    while let Some(e) = source {
        out.push_str(&format!("\n  caused by: {e}"));
        source = e.source();
    }
    out
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let args = match Args::parse(std::env::args()) {
        Ok(Command::Run(v)) => v,
        Ok(Command::Help) => {
            println!("{}", Args::help());
            return;
        }
        Err(e) => {
            println!("{}", e);
            println!();
            println!("{}", Args::help());
            std::process::exit(1);
        }
    };

    if let Err(e) = app::run_from_config(&args.into_config()) {
        eprintln!("{}", format_error_chain(&e));
        std::process::exit(1);
    }
}
