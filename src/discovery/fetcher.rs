//! Single-track metadata lookup against the remote tralbum API.

use std::{sync::Arc, time::Duration};

use log::{debug, info};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    config::DiscoveryConfig,
    discovery::{
        clock::{CancelToken, Clock},
        http_agent,
    },
    domain::track::Track,
};

/// Error message prefix the API uses for ids that do not exist
pub const NOT_FOUND_PREFIX: &str = "No such tralbum";

const TRACK_TYPE: &str = "t";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TralbumRequest {
    pub tralbum_type: &'static str,
    pub band_id: u64,
    pub tralbum_id: u32,
}

impl TralbumRequest {
    pub fn track(band_id: u64, tralbum_id: u32) -> Self {
        Self {
            tralbum_type: TRACK_TYPE,
            band_id,
            tralbum_id,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TralbumDetails {
    pub error: bool,
    pub error_message: Option<String>,
    pub title: Option<String>,
    pub album_title: Option<String>,
    pub tralbum_artist: Option<String>,
    pub bandcamp_url: Option<String>,
}

impl TralbumDetails {
    fn into_outcome(self, id: u32) -> Result<FetchOutcome, FetchError> {
        if self.error {
            let message = self.error_message.unwrap_or_default();
            if message.starts_with(NOT_FOUND_PREFIX) {
                return Ok(FetchOutcome::NotFound);
            }
            return Err(FetchError::Remote(message));
        }

        Ok(FetchOutcome::Found(Track {
            track_id: id,
            track_title: self.title.unwrap_or_default(),
            album_title: self.album_title.filter(|album| !album.is_empty()),
            band_name: self.tralbum_artist.unwrap_or_default(),
            track_url: self.bandcamp_url.unwrap_or_default(),
        }))
    }
}

/// What a single round trip to the API produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiResponse {
    RateLimited { retry_after: Option<String> },
    Status(u16),
    Details(TralbumDetails),
}

pub trait TralbumApi {
    fn tralbum_details(&self, request: &TralbumRequest) -> Result<ApiResponse, FetchError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Found(Track),
    NotFound,
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("send request: {0}")]
    Transport(String),

    #[error("non-200 response status code {0}")]
    Status(u16),

    #[error("decode response JSON: {0}")]
    Decode(String),

    #[error("error true in response: {0}")]
    Remote(String),

    #[error("cancelled")]
    Cancelled,
}

/// `ureq` client for the tralbum details endpoint
pub struct UreqTralbumApi {
    agent: ureq::Agent,
    url: String,
}

impl UreqTralbumApi {
    pub fn new(config: &DiscoveryConfig) -> Self {
        Self {
            agent: http_agent(config),
            url: config.api_url.clone(),
        }
    }
}

impl TralbumApi for UreqTralbumApi {
    fn tralbum_details(&self, request: &TralbumRequest) -> Result<ApiResponse, FetchError> {
        match self.agent.post(&self.url).send_json(request) {
            Ok(response) if response.status() == 200 => response
                .into_json::<TralbumDetails>()
                .map(ApiResponse::Details)
                .map_err(|e| FetchError::Decode(e.to_string())),
            Ok(response) => Ok(ApiResponse::Status(response.status())),
            Err(ureq::Error::Status(429, response)) => Ok(ApiResponse::RateLimited {
                retry_after: response.header("retry-after").map(str::to_string),
            }),
            Err(ureq::Error::Status(code, _)) => Ok(ApiResponse::Status(code)),
            Err(ureq::Error::Transport(e)) => Err(FetchError::Transport(e.to_string())),
        }
    }
}

/// Parses a `retry-after` value in whole seconds.
pub fn parse_retry_after(header: Option<&str>, default: Duration) -> Duration {
    header
        .and_then(|value| value.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(default)
}

enum FetchState {
    Requesting,
    Backoff(Duration),
}

pub struct Fetcher {
    api: Box<dyn TralbumApi>,
    clock: Arc<dyn Clock>,
    band_id: u64,
    default_retry_after: Duration,
    cancel: CancelToken,
}

impl Fetcher {
    pub fn new(
        api: Box<dyn TralbumApi>,
        clock: Arc<dyn Clock>,
        config: &DiscoveryConfig,
        cancel: CancelToken,
    ) -> Self {
        Self {
            api,
            clock,
            band_id: config.band_id,
            default_retry_after: config.default_retry_after(),
            cancel,
        }
    }

    pub(crate) fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub(crate) fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Looks up one track id.
    ///
    /// Rate-limited responses are never returned: the same id is requested
    /// again after the advertised delay until another answer arrives or the
    /// cancel token fires.
    pub fn fetch(&self, id: u32) -> Result<FetchOutcome, FetchError> {
        let request = TralbumRequest::track(self.band_id, id);
        let mut state = FetchState::Requesting;

        loop {
            if self.cancel.is_cancelled() {
                return Err(FetchError::Cancelled);
            }

            state = match state {
                FetchState::Requesting => match self.api.tralbum_details(&request)? {
                    ApiResponse::RateLimited { retry_after } => FetchState::Backoff(
                        parse_retry_after(retry_after.as_deref(), self.default_retry_after),
                    ),
                    ApiResponse::Status(code) => return Err(FetchError::Status(code)),
                    ApiResponse::Details(details) => return details.into_outcome(id),
                },
                FetchState::Backoff(delay) => {
                    info!("{id} - WAIT - {} s", delay.as_secs());
                    self.clock.sleep(delay);
                    debug!("{id} - retrying after rate limit");
                    FetchState::Requesting
                }
            };
        }
    }
}
