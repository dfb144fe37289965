use isahc::{
    config::{Configurable, SslOption},
    error::Error as IsahcError,
    http::header::{self, HeaderName},
    HttpClient,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use std::io::Read;

use crate::{
    schema::{Schema, SchemaCheckError},
    types::{AccessToken, MediaId, SeasonQueryParams},
};

pub const API_ROOT: &str = "https://graphql.anilist.co";

pub const CURRENT_SEASON_QUERY: &str = r#"
query getCurrentSeason($page: Int, $season: MediaSeason, $seasonYear: Int, $onList: Boolean) {
  Page(page: $page, perPage: 50) {
    media(season: $season, seasonYear: $seasonYear, onList: $onList) {
      id
      title {
        userPreferred
      }
      episodes
      nextAiringEpisode {
        airingAt
        episode
      }
    }
  }
}
"#;

#[derive(Serialize, Deserialize, Debug, Clone, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ApiTitle {
    pub user_preferred: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ApiAiringEpisode {
    pub airing_at: i64,
    pub episode: Option<i64>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ApiMedia {
    pub id: MediaId,
    pub title: Option<ApiTitle>,
    pub episodes: Option<i64>,
    pub next_airing_episode: Option<ApiAiringEpisode>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Eq, PartialEq)]
pub struct ApiPage {
    #[serde(default)]
    pub media: Vec<ApiMedia>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Eq, PartialEq)]
pub struct CurrentSeason {
    #[serde(rename = "Page")]
    pub page: ApiPage,
}

#[derive(Serialize, Debug)]
struct GraphQlRequest<'a, V> {
    query: &'a str,
    variables: &'a V,
}

#[derive(Deserialize, Debug)]
struct GraphQlError {
    message: String,
}

#[derive(Deserialize, Debug)]
struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to build http client")]
    Build(#[source] IsahcError),
    #[error("failed to execute post")]
    Post(#[source] IsahcError),
    #[error("failed to read response body")]
    Read(#[source] std::io::Error),
}

/// Carries one serialized GraphQL request to the service
pub trait Transport {
    fn send(&self, payload: Vec<u8>) -> Result<RawResponse, TransportError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn send(&self, payload: Vec<u8>) -> Result<RawResponse, TransportError> {
        (**self).send(payload)
    }
}

pub struct HttpTransport {
    client: HttpClient,
}

/// Certificate checks are off for the AniList endpoint
const SSL_OPTIONS: SslOption = SslOption::DANGER_ACCEPT_INVALID_CERTS;

/// Headers every request to the service carries
fn request_headers(token: &AccessToken) -> Vec<(HeaderName, String)> {
    vec![
        (header::AUTHORIZATION, format!("Bearer {}", token.as_str())),
        (header::CONTENT_TYPE, "application/json".to_string()),
        (header::ACCEPT, "application/json".to_string()),
    ]
}

impl HttpTransport {
    pub fn new(token: &AccessToken) -> Result<HttpTransport, TransportError> {
        let mut builder = HttpClient::builder().ssl_options(SSL_OPTIONS);
        for (name, value) in request_headers(token) {
            builder = builder.default_header(name, value);
        }
        let client = builder.build().map_err(TransportError::Build)?;

        Ok(HttpTransport { client })
    }
}

impl Transport for HttpTransport {
    fn send(&self, payload: Vec<u8>) -> Result<RawResponse, TransportError> {
        debug!("Sending request to {API_ROOT}");
        let mut response = self
            .client
            .post(API_ROOT, payload)
            .map_err(TransportError::Post)?;

        let mut body = String::new();
        response
            .body_mut()
            .read_to_string(&mut body)
            .map_err(TransportError::Read)?;

        debug!("Returned content {}", body);
        Ok(RawResponse {
            status: response.status().as_u16(),
            body,
        })
    }
}

#[derive(Debug, Error)]
pub enum AniListApiError {
    #[error("query does not match schema")]
    Schema(#[from] SchemaCheckError),
    #[error("failed to serialize request")]
    Encode(#[source] serde_json::Error),
    #[error("failed to reach anilist")]
    Transport(#[from] TransportError),
    #[error("anilist rejected the query: {}", .0.join(", "))]
    Execution(Vec<String>),
    #[error("anilist answered with http status {0}")]
    Status(u16),
    #[error("failed to parse response")]
    Parse(#[source] serde_json::Error),
    #[error("response carried no data")]
    NoData,
}

/// GraphQL client bound to a transport and the schema the queries are checked
/// against
pub struct ScheduleClient<T> {
    transport: T,
    schema: Schema,
}

impl<T: Transport> ScheduleClient<T> {
    pub fn new(transport: T, schema: Schema) -> ScheduleClient<T> {
        ScheduleClient { transport, schema }
    }

    pub fn fetch_current_season(
        &self,
        params: &SeasonQueryParams,
    ) -> Result<CurrentSeason, AniListApiError> {
        self.schema.check_query(CURRENT_SEASON_QUERY)?;
        debug!(
            "Querying {:?} {} (page {}, on list: {})",
            params.season, params.season_year, params.page, params.on_list
        );
        self.execute(CURRENT_SEASON_QUERY, params)
    }

    fn execute<V: Serialize, R: DeserializeOwned>(
        &self,
        query: &str,
        variables: &V,
    ) -> Result<R, AniListApiError> {
        let request = GraphQlRequest { query, variables };
        let payload = serde_json::to_vec(&request).map_err(AniListApiError::Encode)?;
        let response = self.transport.send(payload)?;
        let success = (200..300).contains(&response.status);

        let parsed: GraphQlResponse<R> = match serde_json::from_str(&response.body) {
            Ok(v) => v,
            Err(_) if !success => return Err(AniListApiError::Status(response.status)),
            Err(e) => return Err(AniListApiError::Parse(e)),
        };

        if !parsed.errors.is_empty() {
            let messages = parsed.errors.into_iter().map(|e| e.message).collect();
            return Err(AniListApiError::Execution(messages));
        }

        if !success {
            return Err(AniListApiError::Status(response.status));
        }

        parsed.data.ok_or(AniListApiError::NoData)
    }
}
