//! Result presenter: one view per panel state.
//!
//! `render` is pure so every view can be tested without a terminal. The
//! async `follow` loop drives a spinner from the orchestrator's events and
//! prints the terminal view once the request settles.

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use medai_common::PendingAnalysis;
use medai_shared::{
    AdvisoryMessage, AnalysisResult, Panel, PanelEvent, PanelEventKind, RequestState, Severity,
};
use owo_colors::OwoColorize;
use std::io::{self, IsTerminal};
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::debug;

const IDLE_TEXT: &str = "No analysis yet. Submit a request to begin.";
const IN_FLIGHT_TEXT: &str = "Analyzing...";

/// Spinner frames, same as the braille set used elsewhere in the CLI
const SPINNER_FRAMES: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// Single-line in-flight view
pub fn in_flight_line(advisory: Option<&AdvisoryMessage>) -> String {
    match advisory {
        Some(message) => format!("{} {}", IN_FLIGHT_TEXT, message.text),
        None => IN_FLIGHT_TEXT.to_string(),
    }
}

fn render_result(result: &AnalysisResult) -> String {
    match result {
        AnalysisResult::Classification(c) => {
            format!("Prediction: {}\nConfidence: {:.1}%", c.label, c.confidence_score)
        }
        AnalysisResult::Risk(risk) => format!(
            "Risk level: {}\nProbability: {:.1}%\n\n{}",
            risk.risk_level,
            risk.percent(),
            risk.narrative
        ),
        AnalysisResult::Narrative { text } => text.clone(),
    }
}

/// Plain-text view of `state`. `advisory` is only shown while in flight.
pub fn render(state: &RequestState, advisory: Option<&AdvisoryMessage>) -> String {
    match state {
        RequestState::Idle => IDLE_TEXT.to_string(),
        RequestState::InFlight { .. } => in_flight_line(advisory),
        RequestState::Succeeded { result } => render_result(result),
        RequestState::Failed { reason, .. } => format!("Error: {}", reason),
    }
}

pub struct ResultPresenter {
    panel: Panel,
    json: bool,
    interactive: bool,
}

impl ResultPresenter {
    pub fn new(panel: Panel, json: bool) -> Self {
        Self {
            panel,
            json,
            interactive: io::stderr().is_terminal(),
        }
    }

    fn spinner(&self) -> ProgressBar {
        if self.json || !self.interactive {
            return ProgressBar::hidden();
        }
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner()
            .tick_strings(SPINNER_FRAMES)
            .template("{spinner:.cyan} {msg}")
        {
            spinner.set_style(style);
        }
        spinner.set_message(in_flight_line(None));
        spinner.enable_steady_tick(Duration::from_millis(120));
        spinner
    }

    fn show_advisory(&self, spinner: &ProgressBar, message: &AdvisoryMessage) {
        if self.json {
            return;
        }
        if self.interactive {
            let text = match message.severity {
                Severity::Neutral => message.text.clone(),
                Severity::Info => message.text.bright_cyan().to_string(),
                Severity::Warning => message.text.bright_yellow().to_string(),
            };
            spinner.set_message(format!("{} {}", IN_FLIGHT_TEXT, text));
        } else {
            eprintln!("[medai]  {}", in_flight_line(Some(message)));
        }
    }

    /// Follow a submitted request until it settles, showing advisories as
    /// they arrive. Returns the terminal state.
    pub async fn follow(
        &self,
        mut events: broadcast::Receiver<PanelEvent>,
        mut pending: PendingAnalysis,
    ) -> RequestState {
        let spinner = self.spinner();
        if !self.json && !self.interactive {
            eprintln!("[medai]  {}", in_flight_line(None));
        }

        let request_id = pending.request_id();
        let mut closed = false;
        let terminal = loop {
            tokio::select! {
                biased;
                event = events.recv(), if !closed => match event {
                    Ok(event) => {
                        debug!("{}", event.format_debug());
                        if event.request_id != request_id {
                            continue;
                        }
                        if let PanelEventKind::Advisory(message) = &event.kind {
                            self.show_advisory(&spinner, message);
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        debug!(skipped, "presenter lagged behind panel events");
                    }
                    Err(RecvError::Closed) => closed = true,
                },
                state = &mut pending => break state,
            }
        };

        spinner.finish_and_clear();
        terminal
    }

    /// Print the terminal view to stdout
    pub fn print(&self, state: &RequestState) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(state)?);
            return Ok(());
        }

        let body = render(state, None);
        if io::stdout().is_terminal() {
            println!("{}  {}", "[medai]".bright_cyan(), self.panel.title().bold());
            match state {
                RequestState::Failed { .. } => println!("{}", body.bright_red()),
                _ => println!("{}", body),
            }
        } else {
            println!("[medai]  {}", self.panel.title());
            println!("{}", body);
        }
        Ok(())
    }
}
