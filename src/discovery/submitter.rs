use thiserror::Error;

use crate::{config::DiscoveryConfig, discovery::http_agent, domain::track::Track};

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("send request: {0}")]
    Transport(String),

    #[error("non-201 response code {code}: {body}")]
    Status { code: u16, body: String },
}

/// Destination of discovered batches
pub trait Collector {
    fn submit(&self, tracks: &[Track]) -> Result<(), SubmitError>;
}

/// Posts batches as JSON to the collector's ingestion endpoint.
pub struct HttpCollector {
    agent: ureq::Agent,
    url: String,
}

impl HttpCollector {
    pub fn new(config: &DiscoveryConfig) -> Self {
        Self {
            agent: http_agent(config),
            url: config.collector_url.clone(),
        }
    }
}

impl Collector for HttpCollector {
    fn submit(&self, tracks: &[Track]) -> Result<(), SubmitError> {
        match self.agent.post(&self.url).send_json(tracks) {
            Ok(response) if response.status() == 201 => Ok(()),
            Ok(response) | Err(ureq::Error::Status(_, response)) => {
                let code = response.status();
                let body = response.into_string().unwrap_or_default();
                Err(SubmitError::Status {
                    code,
                    body: body.trim().to_string(),
                })
            }
            Err(ureq::Error::Transport(e)) => Err(SubmitError::Transport(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::HttpConfig,
        domain::validate::sample_track,
        http::server::HttpServer,
        storage::{filter::FilterField, filter::LookupFilter, operations::Store, schema},
    };
    use rusqlite::Connection;
    use std::sync::{Arc, Mutex};

    /// Runs a collector on an ephemeral port and returns a client pointed at it.
    fn start_collector() -> anyhow::Result<(HttpCollector, Arc<Mutex<Store>>, impl FnOnce())> {
        let conn = Connection::open_in_memory()?;
        schema::init(&conn)?;
        let store = Arc::new(Mutex::new(Store::from_existing_conn(conn)));

        let server = HttpServer::with_shared_store(Arc::clone(&store), HttpConfig::default());
        let listener = rouille::Server::new("127.0.0.1:0", move |request| {
            server.handle_request(request)
        })
        .map_err(|e| anyhow::anyhow!("failed to bind test collector: {e}"))?;
        let addr = listener.server_addr();
        let (handle, stop) = listener.stoppable();

        let collector = HttpCollector::new(&DiscoveryConfig {
            collector_url: format!("http://{addr}/submit"),
            ..Default::default()
        });

        let shutdown = move || {
            let _ = stop.send(());
            let _ = handle.join();
        };

        Ok((collector, store, shutdown))
    }

    #[test]
    fn test_submit_to_live_collector() -> anyhow::Result<()> {
        let (collector, store, shutdown) = start_collector()?;

        let batch: Vec<_> = (1..=3).map(sample_track).collect();
        collector.submit(&batch)?;

        let found = store
            .lock()
            .unwrap()
            .lookup(&LookupFilter::new().with(FilterField::BandName, "Band"))?;
        assert_eq!(found.len(), 3);

        shutdown();
        Ok(())
    }

    #[test]
    fn test_empty_batch_is_rejected_by_collector() -> anyhow::Result<()> {
        let (collector, store, shutdown) = start_collector()?;

        let err = collector.submit(&[]).unwrap_err();

        assert!(
            matches!(&err, SubmitError::Status { code: 400, .. }),
            "unexpected error: {err}"
        );
        assert_eq!(store.lock().unwrap().count_tracks()?, 0);

        shutdown();
        Ok(())
    }

    #[test]
    fn test_duplicate_submission_fails_whole_batch() -> anyhow::Result<()> {
        let (collector, store, shutdown) = start_collector()?;

        collector.submit(&[sample_track(1)])?;
        let err = collector
            .submit(&[sample_track(2), sample_track(1)])
            .unwrap_err();

        assert!(matches!(err, SubmitError::Status { code: 409, .. }));
        assert_eq!(store.lock().unwrap().count_tracks()?, 1);

        shutdown();
        Ok(())
    }

    #[test]
    fn test_unreachable_collector_is_transport_error() {
        let collector = HttpCollector::new(&DiscoveryConfig {
            collector_url: "http://127.0.0.1:1/submit".to_string(),
            connect_timeout_secs: 1,
            ..Default::default()
        });

        let err = collector.submit(&[sample_track(1)]).unwrap_err();

        assert!(matches!(err, SubmitError::Transport(_)));
    }
}
