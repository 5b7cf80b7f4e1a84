//! Ordered application of light placements.
//!
//! Every placement (ephemeris lookup or manual angles) goes through one
//! queue drained by a single worker task. The worker does not take the next
//! job until the current one has settled, so results are applied in issue
//! order no matter how the network reorders responses: a slow early lookup
//! can never overwrite a later one.
//!
//! Failed lookups are logged and counted; the light keeps its last good
//! placement and the worker moves on to the next job.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::core::{Error, Result};
use crate::ephemeris::{EphemerisProvider, LookupError, LookupRequest, Observer};
use crate::scene::light::{LightSink, LightSource};
use crate::solar::calendar::ClockStamp;
use crate::solar::transform::{LightRig, SolarAngles};

/// Work item for the dispatch worker.
#[derive(Debug)]
enum LightJob {
    Lookup(LookupRequest),
    Manual(SolarAngles),
    /// Completes once every job queued before it has settled.
    Flush(oneshot::Sender<()>),
}

/// Counters shared between the queue handle and the worker.
#[derive(Debug, Default)]
pub struct DispatchStats {
    issued: AtomicU64,
    applied: AtomicU64,
    failed: AtomicU64,
    last_error: Mutex<Option<String>>,
}

/// Point-in-time copy of [`DispatchStats`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchSnapshot {
    pub issued: u64,
    pub applied: u64,
    pub failed: u64,
    pub pending: u64,
    pub last_error: Option<String>,
}

impl DispatchStats {
    pub fn snapshot(&self) -> DispatchSnapshot {
        let issued = self.issued.load(Ordering::Acquire);
        let applied = self.applied.load(Ordering::Acquire);
        let failed = self.failed.load(Ordering::Acquire);
        DispatchSnapshot {
            issued,
            applied,
            failed,
            pending: issued.saturating_sub(applied + failed),
            last_error: self
                .last_error
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .clone(),
        }
    }

    fn record_failure(&self, err: &LookupError) {
        *self
            .last_error
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(err.to_string());
        self.failed.fetch_add(1, Ordering::AcqRel);
    }
}

/// Sending side of the dispatch queue. Cheap to clone.
#[derive(Clone, Debug)]
pub struct LookupQueue {
    jobs: mpsc::UnboundedSender<LightJob>,
    stats: Arc<DispatchStats>,
}

impl LookupQueue {
    /// Queue a sun lookup for `observer` at `stamp`. Returns the job's
    /// sequence number.
    pub fn submit_lookup(&self, observer: Observer, stamp: ClockStamp) -> Result<u64> {
        let sequence = self.enqueue(|sequence| {
            LightJob::Lookup(LookupRequest { sequence, observer, stamp })
        })?;
        log::debug!("Queued lookup #{sequence} for {stamp}");
        Ok(sequence)
    }

    /// Queue a manual placement behind any lookups already issued.
    pub fn submit_manual(&self, angles: SolarAngles) -> Result<u64> {
        self.enqueue(|_| LightJob::Manual(angles))
    }

    /// Wait until every job submitted before this call has settled.
    pub async fn flush(&self) -> Result<()> {
        let (done_tx, done_rx) = oneshot::channel();
        self.jobs
            .send(LightJob::Flush(done_tx))
            .map_err(|_| Error::QueueClosed)?;
        done_rx.await.map_err(|_| Error::QueueClosed)
    }

    pub fn stats(&self) -> DispatchSnapshot {
        self.stats.snapshot()
    }

    pub fn is_closed(&self) -> bool {
        self.jobs.is_closed()
    }

    /// Reserve the next sequence number and send the job built for it.
    /// A job the worker will never see is not counted as issued.
    fn enqueue(&self, build: impl FnOnce(u64) -> LightJob) -> Result<u64> {
        let sequence = self.stats.issued.fetch_add(1, Ordering::AcqRel) + 1;
        if self.jobs.send(build(sequence)).is_err() {
            self.stats.issued.fetch_sub(1, Ordering::AcqRel);
            return Err(Error::QueueClosed);
        }
        Ok(sequence)
    }
}

/// Worker that settles jobs one at a time and writes results to the light.
pub struct LookupDispatcher<P, S> {
    provider: P,
    sink: S,
    rig: LightRig,
    timeout: Duration,
    stats: Arc<DispatchStats>,
}

impl<P, S> LookupDispatcher<P, S>
where
    P: EphemerisProvider,
    S: LightSink,
{
    pub fn new(provider: P, sink: S, rig: LightRig, timeout: Duration) -> Self {
        Self {
            provider,
            sink,
            rig,
            timeout,
            stats: Arc::new(DispatchStats::default()),
        }
    }

    /// Spawn the worker on the current tokio runtime.
    ///
    /// The worker exits once every [`LookupQueue`] clone has been dropped.
    /// Panics if called outside a tokio runtime context.
    pub fn spawn(self) -> (LookupQueue, JoinHandle<()>) {
        let (jobs_tx, jobs_rx) = mpsc::unbounded_channel();
        let queue = LookupQueue {
            jobs: jobs_tx,
            stats: self.stats.clone(),
        };
        let handle = tokio::spawn(self.run(jobs_rx));
        (queue, handle)
    }

    async fn run(mut self, mut jobs: mpsc::UnboundedReceiver<LightJob>) {
        while let Some(job) = jobs.recv().await {
            match job {
                LightJob::Lookup(request) => {
                    let sequence = request.sequence;
                    match settle(&self.provider, self.timeout, &request).await {
                        Ok(angles) => {
                            log::debug!(
                                "Lookup #{sequence} for {}: elevation {:.2}, azimuth {:.2}",
                                request.stamp,
                                angles.elevation_deg,
                                angles.azimuth_deg
                            );
                            self.apply(angles, LightSource::Lookup { sequence });
                        }
                        Err(e) => {
                            log::warn!("Lookup #{sequence} for {} failed: {e}", request.stamp);
                            self.stats.record_failure(&e);
                        }
                    }
                }
                LightJob::Manual(angles) => self.apply(angles, LightSource::Manual),
                LightJob::Flush(done) => {
                    let _ = done.send(());
                }
            }
        }
        log::debug!("Lookup dispatcher stopped");
    }

    fn apply(&mut self, angles: SolarAngles, source: LightSource) {
        let position = self.rig.position(angles);
        self.sink.place(position, self.rig.target_point(), angles, source);
        self.stats.applied.fetch_add(1, Ordering::AcqRel);
    }
}

/// Run one lookup to settlement, bounded by `timeout`.
async fn settle<P: EphemerisProvider>(
    provider: &P,
    timeout: Duration,
    request: &LookupRequest,
) -> std::result::Result<SolarAngles, LookupError> {
    tokio::time::timeout(timeout, provider.lookup(request))
        .await
        .map_err(|_| LookupError::Timeout(timeout))?
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
