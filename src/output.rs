//! Terminal rendering of pipeline progress.
//!
//! The worker only emits [`ProgressEvent`]s; this module owns display state.
//! Segment progress rewrites a single status line on stderr, stage
//! announcements and the final status get lines of their own.

use crate::pipeline::orchestrator::RunOutcome;
use crate::progress::ProgressEvent;
use crossbeam_channel::Receiver;
use owo_colors::OwoColorize;
use std::io::{self, IsTerminal, Write};

const BAR_WIDTH: usize = 30;
const SEGMENT_PREFIX: &str = "Transcription progress:";

/// Clear the current terminal line (replaces the progress bar)
pub fn clear_line() {
    eprint!("\r\x1b[2K");
}

/// What a progress message means to the display.
#[derive(Debug, Clone, PartialEq)]
pub enum Line<'a> {
    /// Per-segment update: bar plus the preview of the recognized text.
    Segment { fraction: f64, preview: &'a str },
    /// Stage announcement, device notice or final status.
    Status(&'a str),
}

/// Sort a progress event into bar update or status line.
pub fn classify(event: &ProgressEvent) -> Line<'_> {
    match event.message.strip_prefix(SEGMENT_PREFIX) {
        Some(rest) => {
            let preview = rest
                .split_once('\n')
                .map(|(_, preview)| preview.trim_start_matches('[').trim_end_matches(']'))
                .unwrap_or("");
            Line::Segment {
                fraction: event.fraction,
                preview,
            }
        }
        None => Line::Status(&event.message),
    }
}

/// `[#########---------]  42%`
pub fn format_bar(fraction: f64, width: usize) -> String {
    let fraction = if fraction.is_finite() {
        fraction.clamp(0.0, 1.0)
    } else {
        0.0
    };
    let filled = (fraction * width as f64).round() as usize;
    format!(
        "[{}{}] {:>3}%",
        "#".repeat(filled),
        "-".repeat(width - filled),
        (fraction * 100.0).floor() as u32
    )
}

/// Stateful renderer fed from the progress channel.
#[derive(Debug)]
pub struct ProgressRenderer {
    quiet: bool,
    verbose: u8,
    color: bool,
    bar_visible: bool,
}

impl ProgressRenderer {
    pub fn new(quiet: bool, verbose: u8) -> Self {
        Self {
            quiet,
            verbose,
            color: io::stderr().is_terminal(),
            bar_visible: false,
        }
    }

    /// Render events until the sending side is dropped.
    pub fn drain(mut self, events: Receiver<ProgressEvent>) {
        for event in events {
            self.render(&event);
        }
        self.finish_bar();
    }

    pub fn render(&mut self, event: &ProgressEvent) {
        if self.quiet {
            return;
        }
        match classify(event) {
            Line::Segment { fraction, preview } => {
                if self.verbose > 0 && !preview.is_empty() {
                    clear_line();
                    eprintln!("  {}", preview.dimmed());
                }
                let bar = format_bar(fraction, BAR_WIDTH);
                if self.color {
                    clear_line();
                    eprint!("{}", bar.cyan());
                    self.bar_visible = true;
                } else if self.verbose > 0 {
                    eprintln!("{bar}");
                }
                io::stderr().flush().unwrap_or(());
            }
            Line::Status(message) => {
                self.finish_bar();
                if message.starts_with("Processing complete") {
                    eprintln!("{}", message.green());
                } else if message.starts_with("Processing cancelled") {
                    eprintln!("{}", message.yellow());
                } else if message.starts_with("Processing failed")
                    || message.starts_with("Processing aborted")
                {
                    eprintln!("{}", message.red());
                } else {
                    eprintln!("{}", message.bold());
                }
            }
        }
    }

    fn finish_bar(&mut self) {
        if self.bar_visible {
            eprintln!();
            self.bar_visible = false;
        }
    }
}

/// Print the files a completed run produced, one per line on stdout.
pub fn print_outcome(outcome: &RunOutcome) {
    if let RunOutcome::Completed { files } = outcome {
        for file in files {
            println!("{}", file.display());
        }
    }
}
