use serde::{Deserialize, Serialize};
use thiserror::Error;

use std::fmt;

/// Pasted tokens this short are certainly not AniList access tokens
pub const MIN_TOKEN_LEN: usize = 100;

#[derive(Debug, Error, Eq, PartialEq)]
#[error("token is {0} characters long, expected more than {}", MIN_TOKEN_LEN)]
pub struct InvalidTokenError(pub usize);

/// Bearer credential handed out by the AniList implicit grant
#[derive(Clone, Eq, PartialEq)]
pub struct AccessToken(String);

impl AccessToken {
    /// Accepts anything read back from the token file, no shape check
    pub fn from_stored(token: String) -> AccessToken {
        AccessToken(token)
    }

    /// Validates a freshly pasted token
    pub fn parse(input: &str) -> Result<AccessToken, InvalidTokenError> {
        let token = input.trim();
        let len = token.chars().count();
        if len > MIN_TOKEN_LEN {
            Ok(AccessToken(token.to_string()))
        } else {
            Err(InvalidTokenError(len))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccessToken(<{} chars>)", self.0.chars().count())
    }
}

#[derive(Serialize, Debug, Clone, Copy, Eq, PartialEq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum Season {
    Winter,
    Spring,
    Summer,
    Fall,
}

#[derive(Serialize, Debug, Clone, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SeasonQueryParams {
    pub page: i64,
    pub season: Season,
    pub season_year: i32,
    pub on_list: bool,
}

/// Episode counter that prints `?` when the service has no number for it
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct EpisodeNumber(pub Option<i64>);

impl fmt::Display for EpisodeNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(v) => write!(f, "{v}"),
            None => f.write_str("?"),
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct DisplayRecord {
    pub title: String,
    /// Unix timestamp in seconds
    pub airing_at: i64,
    pub episode: EpisodeNumber,
    pub total_episodes: EpisodeNumber,
}

macro_rules! impl_id {
    ($name:ident) => {
        #[derive(Serialize, Deserialize, Debug, Clone, Copy, Eq, PartialEq, Hash)]
        pub struct $name(pub i64);
    };
}

impl_id!(MediaId);
