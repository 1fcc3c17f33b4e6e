//! Progress stream adapter
//!
//! Turns the event channel of a running pipeline into the response body:
//! one `data: <json>\n\n` frame per event, each yielded as soon as it
//! arrives. The body always ends with exactly one terminal frame, even when
//! the pipeline task dies without producing one.

use axum::body::Bytes;
use futures_util::Stream;
use futures_util::stream;
use oneclick_core::domain::event::ProgressEvent;
use std::convert::Infallible;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::DropGuard;

/// Terminal message when the pipeline task panics
pub const PANIC_MESSAGE: &str = "Deployment failed unexpectedly";

struct StreamState<T> {
    events: mpsc::Receiver<ProgressEvent>,
    task: Option<JoinHandle<T>>,
    finished: bool,
    // Cancels the run when the body is dropped before it completes
    _cancel_on_drop: DropGuard,
}

/// Builds the frame stream for one run
///
/// `task` is the pipeline task feeding `events`; it is only awaited to tell
/// a panic apart from a silent exit.
pub fn progress_frames<T>(
    events: mpsc::Receiver<ProgressEvent>,
    task: JoinHandle<T>,
    cancel_on_drop: DropGuard,
) -> impl Stream<Item = Result<Bytes, Infallible>> + Send + 'static
where
    T: Send + 'static,
{
    let state = StreamState {
        events,
        task: Some(task),
        finished: false,
        _cancel_on_drop: cancel_on_drop,
    };

    stream::unfold(state, |mut state| async move {
        if state.finished {
            return None;
        }

        let event = match state.events.recv().await {
            Some(event) => event,
            None => {
                let reason = match state.task.take() {
                    Some(task) => match task.await {
                        Err(e) if e.is_panic() => PANIC_MESSAGE,
                        Err(_) => "Deployment was aborted",
                        Ok(_) => "Deployment ended without a result",
                    },
                    None => "Deployment ended without a result",
                };
                tracing::error!("{}", reason);
                ProgressEvent::error(reason)
            }
        };

        if event.is_terminal() {
            state.finished = true;
            // Anything sent after the terminal event is discarded
            state.events.close();
        }

        Some((Ok(encode(&event)), state))
    })
}

fn encode(event: &ProgressEvent) -> Bytes {
    match event.to_frame() {
        Ok(frame) => Bytes::from(frame),
        Err(e) => {
            tracing::error!("Failed to encode progress event: {}", e);
            Bytes::from_static(b"data: {\"error\":\"Failed to encode progress event\"}\n\n")
        }
    }
}
