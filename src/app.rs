use chrono::{NaiveDate, TimeZone};
use thiserror::Error;
use tracing::info;

use std::{
    fmt::Display,
    io::{BufRead, Write},
    path::PathBuf,
};

use crate::{
    anilist::{AniListApiError, HttpTransport, ScheduleClient, Transport, TransportError},
    console::Console,
    presenter,
    schema::{LoadSchemaError, Schema},
    season::{self, InvalidMonth},
    token::{self, AcquireTokenError, FileTokenStore, TokenStore},
    types::AccessToken,
};

#[derive(Debug, Error)]
pub enum RunError {
    #[error("failed to load schema")]
    LoadSchema(#[from] LoadSchemaError),
    #[error("failed to get access token")]
    AcquireToken(#[from] AcquireTokenError),
    #[error("failed to pick current season")]
    Season(#[from] InvalidMonth),
    #[error("failed to set up transport")]
    Transport(#[from] TransportError),
    #[error("failed to fetch current season")]
    Fetch(#[from] AniListApiError),
    #[error("failed to print schedule")]
    Render(#[source] std::io::Error),
}

pub struct Config {
    pub token_file: PathBuf,
    pub schema: PathBuf,
}

/// One full run: token, query, schedule
pub fn run<S, R, W, T, F, Tz>(
    store: &mut S,
    input: &mut R,
    console: &mut Console<W>,
    schema: Schema,
    make_transport: F,
    today: &NaiveDate,
    tz: &Tz,
) -> Result<(), RunError>
where
    S: TokenStore,
    R: BufRead,
    W: Write,
    T: Transport,
    F: FnOnce(&AccessToken) -> Result<T, TransportError>,
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let token = token::acquire(store, input, console)?;
    let client = ScheduleClient::new(make_transport(&token)?, schema);

    let params = season::build_params(today)?;
    info!("Fetching {:?} {} schedule", params.season, params.season_year);
    let current_season = client.fetch_current_season(&params)?;

    let records = presenter::to_display_records(current_season);
    presenter::render(records, console, tz).map_err(RunError::Render)
}

pub fn run_from_config(config: &Config) -> Result<(), RunError> {
    let schema = Schema::load(&config.schema)?;
    let mut store = FileTokenStore::new(config.token_file.clone());
    let stdin = std::io::stdin();
    let mut console = Console::stdout();

    run(
        &mut store,
        &mut stdin.lock(),
        &mut console,
        schema,
        HttpTransport::new,
        &today(),
        &chrono::Local,
    )
}

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}
