//! Cleaning of image elements already present in the document.
//!
//! Per-element state lives in a map keyed by [`ElementId`], never on the
//! element itself. Claiming an element is a single check-and-set under the
//! lock, so two overlapping scans cannot both start on the same element.
//!
//! The host is never called with the state map locked, so it may read
//! [`ImageElementProcessor::state`] from inside [`ImageHost::set_source`].
//! It must not call back into `restore_all` or a scan from there.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use futures::future::join_all;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::codec;
use crate::dom::{DisplaySource, ElementId, ImageCandidate, ImageHost};
use crate::engine::WatermarkEngine;
use crate::error::Result;
use crate::relay::FetchRelay;
use crate::urls;

/// Processing state of one element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingState {
    /// Never claimed, or reset by [`ImageElementProcessor::restore_all`].
    Unprocessed,
    /// A clean is in flight.
    Processing,
    /// The element displays its cleaned image.
    Done,
    /// Cleaning failed; the element displays its original image.
    Failed,
}

#[derive(Debug)]
struct ElementRecord {
    state: ProcessingState,
    original_src: Option<String>,
    ticket: u64,
}

/// Counts from one [`ImageElementProcessor::scan`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanSummary {
    /// Elements that were claimed and processed.
    pub processed: usize,
    /// Of those, how many now display a cleaned image.
    pub done: usize,
    /// Of those, how many failed.
    pub failed: usize,
}

/// Finds generated images in the document and swaps in cleaned versions.
pub struct ImageElementProcessor {
    engine: WatermarkEngine,
    relay: Arc<dyn FetchRelay>,
    host: Arc<dyn ImageHost>,
    records: Mutex<HashMap<ElementId, ElementRecord>>,
    // Held across a state change and the host update it implies, keeping
    // both in the same order.
    swaps: Mutex<()>,
    next_ticket: AtomicU64,
}

impl ImageElementProcessor {
    /// Create a processor cleaning with `engine`, fetching through `relay`.
    pub fn new(
        engine: WatermarkEngine,
        relay: Arc<dyn FetchRelay>,
        host: Arc<dyn ImageHost>,
    ) -> Self {
        Self {
            engine,
            relay,
            host,
            records: Mutex::new(HashMap::new()),
            swaps: Mutex::new(()),
            next_ticket: AtomicU64::new(1),
        }
    }

    /// Current state of element `id`.
    #[must_use]
    pub fn state(&self, id: ElementId) -> ProcessingState {
        self.records
            .lock()
            .get(&id)
            .map_or(ProcessingState::Unprocessed, |r| r.state)
    }

    /// Process every unprocessed generated image in the document.
    ///
    /// Elements are cleaned concurrently; completion order does not matter.
    pub async fn scan(&self) -> ScanSummary {
        let candidates: Vec<ImageCandidate> = self
            .host
            .images()
            .into_iter()
            .filter(urls::is_generated_image_element)
            .filter(|c| self.state(c.id) == ProcessingState::Unprocessed)
            .collect();

        if candidates.is_empty() {
            return ScanSummary::default();
        }
        debug!(count = candidates.len(), "scanning generated images");

        let outcomes = join_all(candidates.iter().map(|c| self.process_one(c))).await;
        let summary = ScanSummary {
            processed: outcomes.len(),
            done: outcomes
                .iter()
                .filter(|s| **s == ProcessingState::Done)
                .count(),
            failed: outcomes
                .iter()
                .filter(|s| **s == ProcessingState::Failed)
                .count(),
        };
        info!(
            processed = summary.processed,
            done = summary.done,
            failed = summary.failed,
            "scan finished"
        );
        summary
    }

    /// Clean one element. No-op unless it is currently unprocessed.
    ///
    /// Returns the element's state afterwards. If the element was reset while
    /// the clean was in flight, the result is discarded.
    pub async fn process_one(&self, candidate: &ImageCandidate) -> ProcessingState {
        let Some(ticket) = self.claim(candidate.id) else {
            return self.state(candidate.id);
        };

        let outcome = self.clean_remote(&candidate.src).await;
        self.finish(candidate, ticket, outcome)
    }

    /// Put every modified element back to its original source and forget
    /// all state. Returns how many elements were restored.
    pub fn restore_all(&self) -> usize {
        let _swap = self.swaps.lock();
        let originals: Vec<(ElementId, String)> = self
            .records
            .lock()
            .drain()
            .filter_map(|(id, record)| record.original_src.map(|src| (id, src)))
            .collect();

        let restored = originals.len();
        for (id, src) in originals {
            self.host.set_source(id, DisplaySource::Url(src));
        }
        if restored > 0 {
            info!(restored, "restored original images");
        }
        restored
    }

    fn claim(&self, id: ElementId) -> Option<u64> {
        let mut records = self.records.lock();
        if records
            .get(&id)
            .is_some_and(|r| r.state != ProcessingState::Unprocessed)
        {
            return None;
        }
        let ticket = self.next_ticket.fetch_add(1, Ordering::Relaxed);
        records.insert(
            id,
            ElementRecord {
                state: ProcessingState::Processing,
                original_src: None,
                ticket,
            },
        );
        Some(ticket)
    }

    async fn clean_remote(&self, src: &str) -> Result<Vec<u8>> {
        let full_size = urls::full_size_url(src);
        let data_url = self.relay.fetch_as_data_url(&full_size).await?;
        let bytes = codec::parse_data_url(&data_url)?;
        self.engine.clean_encoded(&bytes)
    }

    fn finish(
        &self,
        candidate: &ImageCandidate,
        ticket: u64,
        outcome: Result<Vec<u8>>,
    ) -> ProcessingState {
        let _swap = self.swaps.lock();
        let (state, source) = {
            let mut records = self.records.lock();
            let record = match records.get_mut(&candidate.id) {
                Some(record) if record.ticket == ticket => record,
                other => {
                    debug!(
                        id = candidate.id.0,
                        "element reset while in flight, discarding result"
                    );
                    return other.map_or(ProcessingState::Unprocessed, |r| r.state);
                }
            };

            match outcome {
                Ok(png) => {
                    record
                        .original_src
                        .get_or_insert_with(|| candidate.src.clone());
                    record.state = ProcessingState::Done;
                    (record.state, DisplaySource::Cleaned(Bytes::from(png)))
                }
                Err(e) => {
                    warn!(id = candidate.id.0, error = %e, "failed to process image");
                    record.state = ProcessingState::Failed;
                    (record.state, DisplaySource::Url(candidate.src.clone()))
                }
            }
        };

        self.host.set_source(candidate.id, source);
        if state == ProcessingState::Done {
            debug!(id = candidate.id.0, "processed image successfully");
        }
        state
    }
}
