//! Latency advisories for long-running analysis requests.
//!
//! Maps elapsed wait time to a user-facing status message. The mapping is a
//! pure function of elapsed time; `AdvisoryTracker` adds the monotonic
//! "never step back down" rule on top of it.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Severity of an advisory message, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Neutral,
    Info,
    Warning,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Neutral => write!(f, "neutral"),
            Self::Info => write!(f, "info"),
            Self::Warning => write!(f, "warning"),
        }
    }
}

/// Elapsed-time band. `Quiet` produces no advisory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LatencyBand {
    Quiet,
    Busy,
    Queued,
    ColdStart,
}

impl LatencyBand {
    pub fn severity(&self) -> Option<Severity> {
        match self {
            Self::Quiet => None,
            Self::Busy => Some(Severity::Neutral),
            Self::Queued => Some(Severity::Info),
            Self::ColdStart => Some(Severity::Warning),
        }
    }

    fn text(&self) -> Option<&'static str> {
        match self {
            Self::Quiet => None,
            Self::Busy => Some("Server is busy processing your request..."),
            Self::Queued => Some("High load: your request is queued..."),
            Self::ColdStart => Some(
                "Cold start: waking up the inference instance, this can take a minute...",
            ),
        }
    }

    pub fn message(&self) -> Option<AdvisoryMessage> {
        match (self.severity(), self.text()) {
            (Some(severity), Some(text)) => Some(AdvisoryMessage {
                severity,
                text: text.to_string(),
            }),
            _ => None,
        }
    }
}

/// A non-authoritative status message shown while a request is in flight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvisoryMessage {
    pub severity: Severity,
    pub text: String,
}

/// Band boundaries and tick interval
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdvisoryThresholds {
    pub busy: Duration,
    pub queued: Duration,
    pub cold_start: Duration,
    pub tick: Duration,
}

impl Default for AdvisoryThresholds {
    fn default() -> Self {
        Self {
            busy: Duration::from_secs(10),
            queued: Duration::from_secs(30),
            cold_start: Duration::from_secs(60),
            tick: Duration::from_secs(1),
        }
    }
}

impl AdvisoryThresholds {
    /// Bands must be strictly increasing and the tick non-zero.
    pub fn is_valid(&self) -> bool {
        !self.tick.is_zero()
            && !self.busy.is_zero()
            && self.busy < self.queued
            && self.queued < self.cold_start
    }

    pub fn band(&self, elapsed: Duration) -> LatencyBand {
        if elapsed >= self.cold_start {
            LatencyBand::ColdStart
        } else if elapsed >= self.queued {
            LatencyBand::Queued
        } else if elapsed >= self.busy {
            LatencyBand::Busy
        } else {
            LatencyBand::Quiet
        }
    }
}

/// Advisory for `elapsed` under the default thresholds.
pub fn advise(elapsed: Duration) -> Option<AdvisoryMessage> {
    AdvisoryThresholds::default().band(elapsed).message()
}

/// Tracks the highest band reached during one in-flight period.
#[derive(Debug, Clone)]
pub struct AdvisoryTracker {
    thresholds: AdvisoryThresholds,
    reached: LatencyBand,
}

impl AdvisoryTracker {
    pub fn new(thresholds: AdvisoryThresholds) -> Self {
        Self {
            thresholds,
            reached: LatencyBand::Quiet,
        }
    }

    pub fn reached(&self) -> LatencyBand {
        self.reached
    }

    /// Sample the clock. Returns an advisory only when a higher band is
    /// entered; samples that fall in a lower band than already reached
    /// are ignored.
    pub fn observe(&mut self, elapsed: Duration) -> Option<AdvisoryMessage> {
        let band = self.thresholds.band(elapsed);
        if band <= self.reached {
            return None;
        }
        self.reached = band;
        band.message()
    }

    /// Latest advisory for the band reached so far.
    pub fn current(&self) -> Option<AdvisoryMessage> {
        self.reached.message()
    }
}
