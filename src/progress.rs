//! Progress reporting from a running pipeline to the presentation layer.

use crate::defaults::PREVIEW_CHARS;
use crossbeam_channel::{Receiver, Sender, unbounded};
use std::sync::{Arc, Mutex};

/// One-way progress capability owned by the presentation layer.
///
/// `fraction` is in `0.0..=1.0`. Calls come from the worker thread; an
/// implementation backed by a single-threaded UI must marshal the event onto
/// its own context. Reports are fire-and-forget.
pub trait ProgressSink: Send + Sync {
    fn report(&self, fraction: f64, message: &str);
}

/// A progress event as it crosses the worker → presentation boundary.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressEvent {
    pub fraction: f64,
    pub message: String,
}

/// Sink that forwards every report over an unbounded crossbeam channel.
///
/// Unbounded so the worker never blocks on a slow renderer; the receiving
/// side may coalesce.
#[derive(Debug, Clone)]
pub struct ChannelProgressSink {
    tx: Sender<ProgressEvent>,
}

impl ChannelProgressSink {
    pub fn new() -> (Self, Receiver<ProgressEvent>) {
        let (tx, rx) = unbounded();
        (Self { tx }, rx)
    }
}

impl ProgressSink for ChannelProgressSink {
    fn report(&self, fraction: f64, message: &str) {
        // Receiver gone means nobody is watching; the run carries on.
        if self
            .tx
            .send(ProgressEvent {
                fraction,
                message: message.to_string(),
            })
            .is_err()
        {
            tracing::debug!("progress receiver dropped");
        }
    }
}

/// Sink that records every report (for tests and for headless callers).
#[derive(Debug, Clone, Default)]
pub struct CollectingProgress {
    events: Arc<Mutex<Vec<ProgressEvent>>>,
}

impl CollectingProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    pub fn fractions(&self) -> Vec<f64> {
        self.events().iter().map(|e| e.fraction).collect()
    }
}

impl ProgressSink for CollectingProgress {
    fn report(&self, fraction: f64, message: &str) {
        if let Ok(mut events) = self.events.lock() {
            events.push(ProgressEvent {
                fraction,
                message: message.to_string(),
            });
        }
    }
}

/// Sink that drops everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn report(&self, _fraction: f64, _message: &str) {}
}

/// Shorten segment text for display, on a char boundary.
pub fn preview(text: &str) -> String {
    let text = text.trim();
    if text.chars().count() <= PREVIEW_CHARS {
        return text.to_string();
    }
    let mut short: String = text.chars().take(PREVIEW_CHARS).collect();
    short.push('…');
    short
}

/// Message shown after each transcribed segment.
pub fn segment_message(fraction: f64, segment_text: &str) -> String {
    let percent = (fraction * 100.0).floor() as u32;
    format!(
        "Transcription progress: {percent}%\n[{}]",
        preview(segment_text)
    )
}
