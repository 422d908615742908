use anyhow::anyhow;
use log::{info, warn};
use rouille::{Request, Response};
use std::{
    io::Read,
    sync::{Arc, Mutex, MutexGuard},
    time::{Duration, Instant},
};

use crate::{
    config::HttpConfig,
    domain::{
        track::Track,
        validate::{ValidationError, validate_batch},
    },
    http::{error::ApiError, render},
    storage::{error::StorageError, filter::LookupFilter, operations::Store},
};

/// Collector service: ingestion of discovered batches plus the lookup form.
pub struct HttpServer {
    store: Arc<Mutex<Store>>,
    pub config: HttpConfig,
}

/// Per-request handling budget
struct Deadline {
    started: Instant,
    limit: Duration,
}

impl Deadline {
    fn start(limit: Duration) -> Self {
        Self {
            started: Instant::now(),
            limit,
        }
    }

    fn check(&self) -> Result<(), ApiError> {
        if self.started.elapsed() >= self.limit {
            return Err(ApiError::Timeout);
        }
        Ok(())
    }
}

impl HttpServer {
    pub fn new(store: Store, config: HttpConfig) -> Self {
        Self::with_shared_store(Arc::new(Mutex::new(store)), config)
    }

    pub fn with_shared_store(store: Arc<Mutex<Store>>, config: HttpConfig) -> Self {
        Self { store, config }
    }

    pub fn run(self) {
        let addr = format!("{}:{}", self.config.bind_addr, self.config.port);
        rouille::start_server(addr, move |request| self.handle_request(request));
    }

    pub(crate) fn handle_request(&self, request: &Request) -> Response {
        Self::log_request(request);
        let deadline = Deadline::start(self.config.request_timeout());

        let response = if let Err(e) = self.check_content_length(request) {
            e.into_response()
        } else {
            rouille::router!(request,
                (GET) (/) => {
                    Response::html(render::LANDING_PAGE)
                },
                (POST) (/submit) => {
                    self.handle_submit(request, &deadline)
                        .unwrap_or_else(ApiError::into_response)
                },
                (GET) (/submit) => {
                    ApiError::MethodNotAllowed.into_response()
                },
                (GET) (/lookup) => {
                    Response::html(render::lookup_page(&LookupFilter::new(), None))
                },
                (POST) (/lookup) => {
                    self.handle_lookup(request, &deadline)
                        .unwrap_or_else(ApiError::into_response)
                },
                _ => Response::empty_404()
            )
        };

        info!("Response: {} {}", request.method(), response.status_code);
        response
    }

    fn log_request(request: &Request) {
        info!("{} {}", request.method(), request.url());
    }

    fn lock_store(&self) -> Result<MutexGuard<'_, Store>, ApiError> {
        self.store.lock().map_err(|e| {
            ApiError::from(StorageError::Internal(anyhow!(
                "Could not access store under lock: {e}"
            )))
        })
    }

    /// rejects oversized bodies up front when the client declares the length
    fn check_content_length(&self, request: &Request) -> Result<(), ApiError> {
        let declared = request
            .header("Content-Length")
            .and_then(|value| value.trim().parse::<u64>().ok());
        match declared {
            Some(len) if len > self.config.max_body_bytes => {
                Err(ApiError::PayloadTooLarge(self.config.max_body_bytes))
            }
            _ => Ok(()),
        }
    }

    fn read_body(&self, request: &Request) -> Result<Vec<u8>, ApiError> {
        let limit = self.config.max_body_bytes;
        let data = request
            .data()
            .ok_or_else(|| ApiError::Internal("request body already consumed".into()))?;

        let mut body = Vec::new();
        data.take(limit + 1)
            .read_to_end(&mut body)
            .map_err(|e| ApiError::BadRequest(format!("Failed to read body: {e}")))?;

        if body.len() as u64 > limit {
            return Err(ApiError::PayloadTooLarge(limit));
        }
        Ok(body)
    }

    /// Validates the submitted batch and stores it atomically.
    fn handle_submit(&self, request: &Request, deadline: &Deadline) -> Result<Response, ApiError> {
        let body = self.read_body(request)?;
        let tracks: Vec<Track> = serde_json::from_slice(&body)
            .map_err(|e| ApiError::BadRequest(format!("Failed to decode JSON: {e}")))?;

        if let Err(e) = validate_batch(&tracks) {
            if let ValidationError::InvalidTrack { index, .. } = &e {
                warn!(
                    "Received invalid track in submission: {:?}",
                    tracks.get(*index)
                );
            } else {
                warn!("Rejected submission: {e}");
            }
            return Err(ApiError::BadRequest(e.to_string()));
        }

        deadline.check()?;
        let mut store = self.lock_store()?;
        deadline.check()?;
        let count = store.insert_batch(&tracks)?;

        info!("Received submission with {count} track(s)!");
        Ok(Response::text("").with_status_code(201))
    }

    fn handle_lookup(&self, request: &Request, deadline: &Deadline) -> Result<Response, ApiError> {
        let body = self.read_body(request)?;
        let body = String::from_utf8(body)
            .map_err(|e| ApiError::BadRequest(format!("Failed to parse form: {e}")))?;

        let filter = LookupFilter::from_pairs(parse_form(&body)?);
        if filter.is_empty() {
            return Err(StorageError::EmptyFilter.into());
        }

        deadline.check()?;
        let store = self.lock_store()?;
        deadline.check()?;
        let tracks = store.lookup(&filter)?;
        info!("Lookup completed and returned {} tracks!", tracks.len());

        Ok(Response::html(render::lookup_page(&filter, Some(tracks.as_slice()))))
    }
}

/// Decodes an `application/x-www-form-urlencoded` body into its pairs.
fn parse_form(body: &str) -> Result<Vec<(String, String)>, ApiError> {
    let decode = |raw: &str| {
        urlencoding::decode(&raw.replace('+', " "))
            .map(|s| s.into_owned())
            .map_err(|e| ApiError::BadRequest(format!("Failed to parse form: {e}")))
    };

    body.split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            Ok::<_, ApiError>((decode(key)?, decode(value)?))
        })
        .collect()
}

#[cfg(test)]
pub fn parse_text_response(response: rouille::Response) -> String {
    let mut buf = String::new();
    let mut reader = response.data.into_reader_and_size().0;
    let _ = reader.read_to_string(&mut buf);
    buf
}
