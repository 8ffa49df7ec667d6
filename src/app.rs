use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use crate::error::SourceError;
use crate::models::{Decision, RawImage};
use crate::session::{Outcome, Session};

/// What an image source hands to the driver
pub type Capture = Result<RawImage, SourceError>;

/// Receives the outcome of each run that is still current
pub trait PresentationSink: Send {
    fn present(&mut self, image: &RawImage, decision: &Decision);

    /// `origin` names the image the error belongs to
    fn report_error(&mut self, origin: &str, message: &str);
}

/// How captures are scheduled against the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dispatch {
    /// Wait for each decision before taking the next capture
    #[default]
    Sequential,
    /// Start every capture immediately; only the newest may reach the sink
    LatestWins,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub decided: usize,
    pub failed: usize,
    pub superseded: usize,
}

/// Read image files one by one and send them down a channel.
///
/// The channel holds a single capture, so reading stays just ahead of the
/// consumer.
pub fn spawn_file_source(paths: Vec<PathBuf>) -> mpsc::Receiver<Capture> {
    let (sender, receiver) = mpsc::channel(1);

    tokio::task::spawn_blocking(move || {
        for path in paths {
            let capture = RawImage::from_path(&path).map_err(|source| SourceError::Read {
                path: path.clone(),
                source,
            });
            if sender.blocking_send(capture).is_err() {
                tracing::debug!("Driver stopped; file source exiting");
                break;
            }
        }
    });

    receiver
}

/// Feed captures into the session until the source closes and every run has
/// finished. Errors are reported to the sink; the driver keeps going.
pub async fn run<S: PresentationSink>(
    session: Arc<Session>,
    mut captures: mpsc::Receiver<Capture>,
    sink: &mut S,
    dispatch: Dispatch,
) -> RunSummary {
    let mut summary = RunSummary::default();

    match dispatch {
        Dispatch::Sequential => {
            while let Some(capture) = captures.recv().await {
                match capture {
                    Ok(image) => {
                        let outcome = session.submit(image).await;
                        deliver(outcome, sink, &mut summary);
                    }
                    Err(error) => report_source_error(&error, sink, &mut summary),
                }
            }
        }
        Dispatch::LatestWins => {
            let mut in_flight: JoinSet<Outcome> = JoinSet::new();
            let mut source_open = true;

            loop {
                if !source_open && in_flight.is_empty() {
                    break;
                }

                tokio::select! {
                    capture = captures.recv(), if source_open => match capture {
                        Some(Ok(image)) => {
                            // Ticket is issued here so arrival order decides the winner
                            let ticket = session.ticket();
                            let session = session.clone();
                            in_flight.spawn(async move { session.run(ticket, image).await });
                        }
                        Some(Err(error)) => report_source_error(&error, sink, &mut summary),
                        None => source_open = false,
                    },
                    Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => match joined {
                        Ok(outcome) => deliver(outcome, sink, &mut summary),
                        Err(e) => {
                            tracing::error!("Pipeline task failed: {}", e);
                            summary.failed += 1;
                        }
                    },
                }
            }
        }
    }

    tracing::debug!(
        "Driver finished: {} decided, {} failed, {} superseded",
        summary.decided,
        summary.failed,
        summary.superseded
    );
    summary
}

fn deliver<S: PresentationSink>(outcome: Outcome, sink: &mut S, summary: &mut RunSummary) {
    match outcome {
        Outcome::Decided { image, decision, .. } => {
            summary.decided += 1;
            sink.present(&image, &decision);
        }
        Outcome::Failed { image, error, .. } => {
            summary.failed += 1;
            sink.report_error(&image.display_name(), error.user_message());
        }
        Outcome::Superseded { .. } => summary.superseded += 1,
    }
}

fn report_source_error<S: PresentationSink>(error: &SourceError, sink: &mut S, summary: &mut RunSummary) {
    tracing::warn!("{}", error);
    summary.failed += 1;
    sink.report_error(&error.origin(), error.user_message());
}

/// Prints one line per image to stdout
pub struct ConsoleSink {
    pub verbose: bool,
}

impl PresentationSink for ConsoleSink {
    fn present(&mut self, image: &RawImage, decision: &Decision) {
        if self.verbose {
            println!(
                "{}: {} (top label: {}, confidence: {:.2})",
                image.display_name(),
                decision,
                decision.basis.label,
                decision.basis.confidence
            );
        } else {
            println!("{}: {}", image.display_name(), decision);
        }
    }

    fn report_error(&mut self, origin: &str, message: &str) {
        println!("{}: {}", origin, message);
    }
}
