use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::Instrument;
use uuid::Uuid;

use crate::error::PipelineError;
use crate::models::{Decision, RawImage};
use crate::pipeline::ClassificationPipeline;

/// Result of submitting one image to a session
#[derive(Debug)]
pub enum Outcome {
    /// The run finished and is still the latest one
    Decided {
        run_id: Uuid,
        image: RawImage,
        decision: Decision,
    },
    /// The run failed and is still the latest one
    Failed {
        run_id: Uuid,
        image: RawImage,
        error: PipelineError,
    },
    /// A newer image was submitted before this run finished; its result is discarded
    Superseded { run_id: Uuid },
}

impl Outcome {
    pub fn run_id(&self) -> Uuid {
        match self {
            Outcome::Decided { run_id, .. }
            | Outcome::Failed { run_id, .. }
            | Outcome::Superseded { run_id } => *run_id,
        }
    }

    pub fn decision(&self) -> Option<&Decision> {
        match self {
            Outcome::Decided { decision, .. } => Some(decision),
            _ => None,
        }
    }

    pub fn is_superseded(&self) -> bool {
        matches!(self, Outcome::Superseded { .. })
    }
}

/// Position of a run in submission order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Ticket(u64);

/// Front end for a shared pipeline that applies last-write-wins: only the most
/// recently submitted image may produce a visible outcome.
pub struct Session {
    pipeline: Arc<ClassificationPipeline>,
    latest: AtomicU64,
}

impl Session {
    pub fn new(pipeline: Arc<ClassificationPipeline>) -> Self {
        Self {
            pipeline,
            latest: AtomicU64::new(0),
        }
    }

    /// Reserve the next run slot. Issuing a ticket supersedes every earlier one.
    pub fn ticket(&self) -> Ticket {
        Ticket(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Take a ticket and run the pipeline on `image`
    pub async fn submit(&self, image: RawImage) -> Outcome {
        let ticket = self.ticket();
        self.run(ticket, image).await
    }

    /// Run the pipeline on `image` under a previously issued ticket.
    ///
    /// Issue tickets in arrival order; completion order does not matter.
    pub async fn run(&self, ticket: Ticket, image: RawImage) -> Outcome {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("run", %run_id, ticket = ticket.0);

        async move {
            tracing::debug!("Submitted {}", image.display_name());
            let result = self.pipeline.run(&image).await;

            if !self.is_latest(ticket) {
                tracing::info!("Discarding result for {}: superseded by a newer image", image.display_name());
                return Outcome::Superseded { run_id };
            }

            match result {
                Ok(decision) => Outcome::Decided {
                    run_id,
                    image,
                    decision,
                },
                Err(error) => {
                    tracing::warn!("Run failed for {}: {}", image.display_name(), error);
                    Outcome::Failed {
                        run_id,
                        image,
                        error,
                    }
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Whether no newer ticket has been issued since `ticket`
    pub fn is_latest(&self, ticket: Ticket) -> bool {
        self.latest.load(Ordering::SeqCst) == ticket.0
    }
}
