//! Request orchestrator: one in-flight analysis per panel.
//!
//! `Idle -> InFlight -> {Succeeded | Failed} -> Idle`
//!
//! `submit` moves the panel to `InFlight` and spawns a driver task. The
//! driver runs the single network exchange and the advisory ticker in one
//! biased `select!`, so the ticker cannot fire once the exchange has
//! resolved. Every advisory and the terminal transition are published under
//! the state lock and only while the state still belongs to the same
//! request, which keeps cancellation and late results from racing.

use crate::codec;
use crate::config::{Endpoint, MedaiConfig};
use crate::transport::AnalysisTransport;
use chrono::Utc;
use medai_shared::{
    AdvisoryMessage, AdvisoryThresholds, AdvisoryTracker, AnalysisRequest, AnalysisResult,
    Panel, PanelEvent, RequestState, ScreeningError,
};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};
use std::task::{Context, Poll};
use tokio::sync::broadcast;
use tokio::task::{AbortHandle, JoinHandle};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Reason shown when a request is cancelled by teardown
pub const CANCELLED_REASON: &str = "Analysis cancelled.";

const EVENT_CAPACITY: usize = 64;

struct Shared {
    state: Mutex<RequestState>,
    driver: Mutex<Option<AbortHandle>>,
    /// Monotonic start of the in-flight request; every `elapsed_ms` is
    /// measured from here. `started_at` is only a display timestamp.
    clock: Mutex<Option<Instant>>,
    events: broadcast::Sender<PanelEvent>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

impl Shared {
    /// Move `request_id` to a terminal state if it is still the in-flight
    /// request. Returns the state the panel ends up in.
    fn finish(&self, panel: Panel, request_id: Uuid, terminal: RequestState, elapsed_ms: u64) -> RequestState {
        let mut state = lock(&self.state);
        if !state.is_in_flight_for(request_id) {
            debug!(%panel, %request_id, "discarding outcome of superseded request");
            return state.clone();
        }
        *state = terminal.clone();
        lock(&self.driver).take();
        lock(&self.clock).take();
        let _ = self
            .events
            .send(PanelEvent::terminal(panel, request_id, terminal.clone(), elapsed_ms));
        info!(%panel, %request_id, outcome = terminal.label(), elapsed_ms, "analysis finished");
        terminal
    }

    fn advise(&self, panel: Panel, request_id: Uuid, message: AdvisoryMessage, elapsed_ms: u64) {
        let state = lock(&self.state);
        if !state.is_in_flight_for(request_id) {
            return;
        }
        debug!(%panel, severity = %message.severity, elapsed_ms, "latency advisory");
        let _ = self
            .events
            .send(PanelEvent::advisory(panel, request_id, message, elapsed_ms));
    }
}

/// Owns the lifecycle of a panel's analysis requests
pub struct RequestOrchestrator {
    panel: Panel,
    endpoint: Endpoint,
    transport: Arc<dyn AnalysisTransport>,
    thresholds: AdvisoryThresholds,
    shared: Arc<Shared>,
}

impl RequestOrchestrator {
    pub fn new(panel: Panel, endpoint: Endpoint, transport: Arc<dyn AnalysisTransport>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            panel,
            endpoint,
            transport,
            thresholds: AdvisoryThresholds::default(),
            shared: Arc::new(Shared {
                state: Mutex::new(RequestState::Idle),
                driver: Mutex::new(None),
                clock: Mutex::new(None),
                events,
            }),
        }
    }

    /// Build from configuration; a missing endpoint is a config error
    pub fn from_config(
        panel: Panel,
        config: &MedaiConfig,
        transport: Arc<dyn AnalysisTransport>,
    ) -> Result<Self, ScreeningError> {
        let endpoint = config.require(panel)?.clone();
        Ok(Self::new(panel, endpoint, transport).with_thresholds(config.advisory.thresholds()))
    }

    pub fn with_thresholds(mut self, thresholds: AdvisoryThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn panel(&self) -> Panel {
        self.panel
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Snapshot of the current state
    pub fn state(&self) -> RequestState {
        lock(&self.shared.state).clone()
    }

    /// Receive every event published from now on
    pub fn subscribe(&self) -> broadcast::Receiver<PanelEvent> {
        self.shared.events.subscribe()
    }

    /// Start an analysis. Must be called from within a tokio runtime.
    ///
    /// Rejects with `AlreadyInFlight` while a request is running, leaving
    /// that request untouched. Everything that can go wrong after
    /// acceptance ends in `Failed { reason }` instead of an error here.
    pub fn submit(&self, request: AnalysisRequest) -> Result<PendingAnalysis, ScreeningError> {
        if request.panel() != self.panel {
            return Err(ScreeningError::InvalidInput(format!(
                "{} request submitted to the {} panel",
                request.panel(),
                self.panel
            )));
        }

        let request_id = Uuid::new_v4();
        let started = Instant::now();
        {
            let mut state = lock(&self.shared.state);
            if state.is_in_flight() {
                warn!(panel = %self.panel, "rejected submit: request already in flight");
                return Err(ScreeningError::AlreadyInFlight);
            }
            *state = RequestState::InFlight {
                request_id,
                started_at: Utc::now(),
            };
            *lock(&self.shared.clock) = Some(started);
            let _ = self
                .shared
                .events
                .send(PanelEvent::started(self.panel, request_id));
        }
        info!(panel = %self.panel, %request_id, url = %self.endpoint.url, "analysis submitted");

        let driver = Driver {
            panel: self.panel,
            request_id,
            started,
            endpoint: self.endpoint.clone(),
            transport: Arc::clone(&self.transport),
            thresholds: self.thresholds,
            shared: Arc::clone(&self.shared),
        };
        let handle = tokio::spawn(driver.run(request));

        {
            let state = lock(&self.shared.state);
            if state.is_in_flight_for(request_id) {
                *lock(&self.shared.driver) = Some(handle.abort_handle());
            }
        }

        Ok(PendingAnalysis {
            panel: self.panel,
            request_id,
            started,
            handle,
            shared: Arc::clone(&self.shared),
        })
    }

    /// Abort the in-flight request, if any. Returns whether one was running.
    pub fn cancel(&self) -> bool {
        let mut state = lock(&self.shared.state);
        let request_id = match &*state {
            RequestState::InFlight { request_id, .. } => *request_id,
            _ => return false,
        };
        let elapsed = lock(&self.shared.clock).take().map_or(0, elapsed_ms);

        *state = RequestState::failed(CANCELLED_REASON);
        if let Some(driver) = lock(&self.shared.driver).take() {
            driver.abort();
        }
        let _ = self.shared.events.send(PanelEvent::terminal(
            self.panel,
            request_id,
            state.clone(),
            elapsed,
        ));
        info!(panel = %self.panel, %request_id, "analysis cancelled");
        true
    }

    /// Return a terminal panel to `Idle`
    pub fn reset(&self) -> Result<(), ScreeningError> {
        let mut state = lock(&self.shared.state);
        if state.is_in_flight() {
            return Err(ScreeningError::AlreadyInFlight);
        }
        *state = RequestState::Idle;
        Ok(())
    }
}

impl Drop for RequestOrchestrator {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Background task for one request
struct Driver {
    panel: Panel,
    request_id: Uuid,
    started: Instant,
    endpoint: Endpoint,
    transport: Arc<dyn AnalysisTransport>,
    thresholds: AdvisoryThresholds,
    shared: Arc<Shared>,
}

async fn exchange(
    transport: &dyn AnalysisTransport,
    endpoint: &Endpoint,
    request: AnalysisRequest,
) -> Result<AnalysisResult, ScreeningError> {
    let body = codec::encode(&request, endpoint.kind)?;
    let raw = transport.post(endpoint, body).await?;
    codec::decode(request.panel(), endpoint.kind, &raw)
}

impl Driver {
    async fn run(self, request: AnalysisRequest) -> RequestState {
        let started = self.started;

        let call = exchange(self.transport.as_ref(), &self.endpoint, request);
        tokio::pin!(call);

        let tick = self.thresholds.tick;
        let mut ticker = tokio::time::interval_at(started + tick, tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut tracker = AdvisoryTracker::new(self.thresholds);

        let outcome = loop {
            tokio::select! {
                biased;
                outcome = &mut call => break outcome,
                _ = ticker.tick() => {
                    if let Some(message) = tracker.observe(started.elapsed()) {
                        self.shared.advise(self.panel, self.request_id, message, elapsed_ms(started));
                    }
                }
            }
        };
        drop(ticker);

        let terminal = match outcome {
            Ok(result) => RequestState::Succeeded { result },
            Err(e) => {
                warn!(panel = %self.panel, request_id = %self.request_id, code = e.code(), error = %e, "analysis failed");
                RequestState::failed_with(&e)
            }
        };
        self.shared
            .finish(self.panel, self.request_id, terminal, elapsed_ms(started))
    }
}

/// Resolves to the terminal state of a submitted request
pub struct PendingAnalysis {
    panel: Panel,
    request_id: Uuid,
    started: Instant,
    handle: JoinHandle<RequestState>,
    shared: Arc<Shared>,
}

impl PendingAnalysis {
    pub fn request_id(&self) -> Uuid {
        self.request_id
    }
}

impl Future for PendingAnalysis {
    type Output = RequestState;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        match Pin::new(&mut this.handle).poll(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(Ok(state)) => Poll::Ready(state),
            Poll::Ready(Err(join_error)) => {
                // Aborted by cancel/teardown, or the driver panicked
                let fallback = if join_error.is_cancelled() {
                    RequestState::failed(CANCELLED_REASON)
                } else {
                    error!(panel = %this.panel, request_id = %this.request_id, "analysis driver panicked");
                    RequestState::failed("The analysis could not be completed.")
                };
                let elapsed = elapsed_ms(this.started);
                Poll::Ready(this.shared.finish(this.panel, this.request_id, fallback, elapsed))
            }
        }
    }
}
