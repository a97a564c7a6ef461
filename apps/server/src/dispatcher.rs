//! Background dispatch of purchased deliverables to the generator.
//!
//! Jobs arrive on an in-process channel right after a purchase commits. A
//! periodic sweep over `queued` rows picks up anything the channel missed
//! (restarts, a full channel, a failed enqueue), so delivery is
//! at-least-once. Claims are conditional, so a job seen twice runs once.
//! Each sweep first requeues rows stuck in `generating`, so a worker that
//! died mid-generation does not strand a paid deliverable.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use dealgate_core::deliverables::{DeliverableServiceTrait, GenerationJob, GenerationQueue};
use dealgate_core::{Error, Result};

/// [`GenerationQueue`] backed by an unbounded tokio channel.
#[derive(Clone)]
pub struct ChannelQueue {
    tx: mpsc::UnboundedSender<GenerationJob>,
}

impl ChannelQueue {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<GenerationJob>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl GenerationQueue for ChannelQueue {
    async fn enqueue(&self, job: GenerationJob) -> Result<()> {
        self.tx
            .send(job)
            .map_err(|e| Error::Unexpected(format!("dispatcher stopped: {}", e)))
    }
}

/// Processes one deliverable, logging instead of propagating. Returns true
/// when this call did the work.
async fn dispatch_one(service: &dyn DeliverableServiceTrait, deliverable_id: i64) -> bool {
    match service.process(deliverable_id).await {
        Ok(Some(deliverable)) => {
            debug!(
                "Deliverable {} settled as {}",
                deliverable.id, deliverable.status
            );
            true
        }
        Ok(None) => {
            debug!("Deliverable {} handled elsewhere", deliverable_id);
            false
        }
        Err(e) => {
            warn!("Dispatch of deliverable {} failed: {}", deliverable_id, e);
            false
        }
    }
}

/// Runs one sweep: releases generations older than `stale_after`, then
/// processes queued deliverables. Returns how many this sweep processed.
pub async fn sweep(
    service: &dyn DeliverableServiceTrait,
    batch: i64,
    stale_after: Duration,
) -> usize {
    match chrono::Duration::from_std(stale_after) {
        Ok(older_than) => {
            if let Err(e) = service.release_stale(older_than).await {
                warn!("Could not release stale generations: {}", e);
            }
        }
        Err(e) => warn!("Stale threshold {:?} out of range: {}", stale_after, e),
    }

    let pending = match service.pending(batch) {
        Ok(pending) => pending,
        Err(e) => {
            warn!("Could not list queued deliverables: {}", e);
            return 0;
        }
    };

    let mut processed = 0;
    for deliverable in pending {
        if dispatch_one(service, deliverable.id).await {
            processed += 1;
        }
    }
    processed
}

/// Starts the dispatcher loop. The task ends once `shutdown` flips to true
/// or its sender is dropped.
pub fn start_dispatcher(
    service: Arc<dyn DeliverableServiceTrait>,
    mut jobs: mpsc::UnboundedReceiver<GenerationJob>,
    every: Duration,
    batch: i64,
    stale_after: Duration,
    mut shutdown: tokio::sync::watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(
            "Deliverable dispatcher started (sweep every {:?}, batch {}, stale after {:?})",
            every, batch, stale_after
        );
        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut channel_open = true;

        loop {
            tokio::select! {
                job = jobs.recv(), if channel_open => match job {
                    Some(job) => {
                        dispatch_one(service.as_ref(), job.deliverable_id).await;
                    }
                    None => {
                        debug!("Job channel closed; sweeping only");
                        channel_open = false;
                    }
                },
                _ = ticker.tick() => {
                    let processed = sweep(service.as_ref(), batch, stale_after).await;
                    if processed > 0 {
                        info!("Sweep processed {} deliverable(s)", processed);
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("Deliverable dispatcher stopping");
                        break;
                    }
                }
            }
        }
    })
}
