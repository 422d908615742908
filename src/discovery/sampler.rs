use std::time::Duration;

use log::{debug, error, info, warn};
use rand::{RngCore, rngs::ThreadRng};

use crate::{
    config::DiscoveryConfig,
    discovery::{
        fetcher::{FetchError, FetchOutcome, Fetcher},
        submitter::{Collector, SubmitError},
    },
};

/// Source of candidate track ids
pub trait IdSource {
    fn next_id(&mut self) -> u32;
}

/// Uniform draws over the whole u32 range, with no memory of earlier draws
pub struct RandomIds(ThreadRng);

impl RandomIds {
    pub fn new() -> Self {
        Self(rand::thread_rng())
    }
}

impl IdSource for RandomIds {
    fn next_id(&mut self) -> u32 {
        self.0.next_u32()
    }
}

#[derive(Debug)]
pub struct BatchReport {
    pub attempts: usize,
    pub found: usize,
    pub not_found: usize,
    pub failed: usize,
    pub submitted: Result<(), SubmitError>,
}

/// Sequential discovery loop: one request in flight, paced, batched.
pub struct Sampler {
    fetcher: Fetcher,
    collector: Box<dyn Collector>,
    ids: Box<dyn IdSource>,
    batch_size: usize,
    pacing: Duration,
}

impl Sampler {
    pub fn new(
        fetcher: Fetcher,
        collector: Box<dyn Collector>,
        ids: Box<dyn IdSource>,
        config: &DiscoveryConfig,
    ) -> Self {
        Self {
            fetcher,
            collector,
            ids,
            batch_size: config.batch_size,
            pacing: config.pacing(),
        }
    }

    /// Runs `batch_size` sampling attempts and submits whatever was found.
    ///
    /// The batch is submitted even when empty. A failed submission is logged
    /// and its tracks are dropped. Returns `None` if cancelled mid-batch.
    pub fn run_batch(&mut self) -> Option<BatchReport> {
        let clock = std::sync::Arc::clone(self.fetcher.clock());
        let mut tracks = Vec::new();
        let mut not_found = 0;
        let mut failed = 0;

        for _ in 0..self.batch_size {
            let id = self.ids.next_id();
            let started = clock.now();
            let result = self.fetcher.fetch(id);

            if let Err(FetchError::Cancelled) = result {
                return None;
            }

            // backoff sleeps inside the fetch count toward the budget
            let elapsed = clock.now().saturating_duration_since(started);
            if let Some(rest) = self.pacing.checked_sub(elapsed).filter(|d| !d.is_zero()) {
                debug!("{id} - WAIT - {} ms", rest.as_millis());
                clock.sleep(rest);
            }

            match result {
                Ok(FetchOutcome::Found(track)) => {
                    info!("{id} - OK");
                    tracks.push(track);
                }
                Ok(FetchOutcome::NotFound) => {
                    debug!("{id} - NOK");
                    not_found += 1;
                }
                Err(e) => {
                    warn!("{id} - ERR - {e}");
                    failed += 1;
                }
            }
        }

        let submitted = self.collector.submit(&tracks);
        match &submitted {
            Ok(()) => info!("Submitted {} track(s)!", tracks.len()),
            Err(e) => error!("Failed to submit {} track(s): {e}", tracks.len()),
        }

        Some(BatchReport {
            attempts: self.batch_size,
            found: tracks.len(),
            not_found,
            failed,
            submitted,
        })
    }

    /// Produces batches until the cancel token fires.
    pub fn run(&mut self) {
        while !self.fetcher.cancel_token().is_cancelled() {
            let Some(report) = self.run_batch() else {
                break;
            };
            debug!(
                "Batch of {} attempts: {} found, {} not found, {} failed, submitted: {}",
                report.attempts,
                report.found,
                report.not_found,
                report.failed,
                report.submitted.is_ok()
            );
        }
        info!("Discovery loop stopped");
    }
}
