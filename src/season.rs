use chrono::Datelike;
use thiserror::Error;

use crate::types::{Season, SeasonQueryParams};

#[derive(Debug, Error, Eq, PartialEq)]
#[error("month index {0} is not in 0..12")]
pub struct InvalidMonth(pub u32);

/// Maps a zero based month (january = 0) to the broadcast season it falls in
pub fn resolve(month0: u32) -> Result<Season, InvalidMonth> {
    match month0.saturating_add(1) {
        12 | 1 | 2 => Ok(Season::Winter),
        3..=5 => Ok(Season::Spring),
        6..=8 => Ok(Season::Summer),
        9..=11 => Ok(Season::Fall),
        _ => Err(InvalidMonth(month0)),
    }
}

pub fn build_params<D: Datelike>(now: &D) -> Result<SeasonQueryParams, InvalidMonth> {
    Ok(SeasonQueryParams {
        page: 1,
        season: resolve(now.month0())?,
        season_year: now.year(),
        on_list: true,
    })
}
