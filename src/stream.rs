//! Streaming analysis API: observe a run as an ordered event sequence.
//!
//! Unlike the eager [`crate::analyze::analyze`], which returns only once the
//! run finishes, [`analyze_stream`] yields [`ProgressEvent`]s as the run
//! advances. The sequence is:
//!
//! ```text
//! progress(0) [progress(10)] progress(20) progress(100) complete
//! ```
//!
//! or, on failure, the progress events emitted so far followed by a single
//! `error` event. Exactly one terminal event is produced per run and nothing
//! follows it.

use crate::analyze::{run, AnalysisInput};
use crate::config::AnalysisConfig;
use crate::progress::{AnalysisProgressCallback, ProgressCallback, ProgressEvent};
use std::pin::Pin;
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_stream::Stream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// A boxed stream of progress events.
pub type EventStream = Pin<Box<dyn Stream<Item = ProgressEvent> + Send>>;

/// Analyse a document or text, streaming progress events.
///
/// The run executes on a spawned Tokio task, so this must be called from
/// within a Tokio runtime. Dropping the stream does not stop the run; cancel
/// `cancel` for that. A cancelled run ends with an `error` event whose
/// category is `cancelled`.
///
/// Events are also forwarded to the configured progress callback, if any.
///
/// # Example
/// ```rust,no_run
/// use doc2tasks::{analyze_stream, AnalysisConfig, AnalysisInput, ProgressEvent};
/// use futures::StreamExt;
/// use tokio_util::sync::CancellationToken;
///
/// # #[tokio::main]
/// # async fn main() {
/// let config = AnalysisConfig::default();
/// let mut events = analyze_stream(
///     AnalysisInput::text("A booking system for yoga studios"),
///     &config,
///     CancellationToken::new(),
/// );
/// while let Some(event) = events.next().await {
///     println!("{}", serde_json::to_string(&event).unwrap());
/// }
/// # }
/// ```
pub fn analyze_stream(
    input: AnalysisInput,
    config: &AnalysisConfig,
    cancel: CancellationToken,
) -> EventStream {
    let (tx, rx) = mpsc::unbounded_channel();
    let config = config.clone();

    tokio::spawn(async move {
        info!("Starting streaming analysis");
        let forwarder = ChannelProgress {
            tx: tx.clone(),
            inner: config.progress_callback.clone(),
        };

        let terminal = match run(input, &config, &cancel, &forwarder).await {
            Ok(result) => ProgressEvent::Complete { result },
            Err(e) => {
                warn!("Analysis failed: {}", e);
                ProgressEvent::failed(&e)
            }
        };

        if tx.send(terminal).is_err() {
            debug!("Event receiver dropped before the terminal event");
        }
    });

    Box::pin(UnboundedReceiverStream::new(rx))
}

/// Turns stage callbacks into `progress` events on the channel.
struct ChannelProgress {
    tx: UnboundedSender<ProgressEvent>,
    inner: Option<ProgressCallback>,
}

impl AnalysisProgressCallback for ChannelProgress {
    fn on_progress(&self, percent: u8, message: &str) {
        if let Some(ref cb) = self.inner {
            cb.on_progress(percent, message);
        }
        // A closed channel only means nobody is listening any more.
        let _ = self.tx.send(ProgressEvent::Progress {
            progress: percent,
            message: message.to_string(),
        });
    }
}
