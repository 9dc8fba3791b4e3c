use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::api::Econet300Api;
use crate::types::TelemetrySnapshot;
use crate::{Error, Result};

pub const DEFAULT_UPDATE_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoordinatorEvent {
    Updated,
    /// Credentials were rejected; polling stops until the host reconfigures.
    ReauthRequired,
    UpdateFailed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorState {
    Idle,
    Fetching,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    Success,
    AuthFailed,
    UpdateFailed,
}

type Listener = Arc<dyn Fn(&TelemetrySnapshot) + Send + Sync>;
type EventHandler = Box<dyn Fn(&CoordinatorEvent) + Send + Sync>;

pub struct CoordinatorBuilder {
    api: Arc<Econet300Api>,
    update_interval: Duration,
    on_event: Option<EventHandler>,
}

impl CoordinatorBuilder {
    pub fn update_interval(mut self, interval: Duration) -> Self {
        self.update_interval = interval;
        self
    }

    pub fn on_event<F>(mut self, f: F) -> Self
    where
        F: Fn(&CoordinatorEvent) + Send + Sync + 'static,
    {
        self.on_event = Some(Box::new(f));
        self
    }

    pub fn build(self) -> Coordinator {
        Coordinator {
            api: self.api,
            update_interval: self.update_interval,
            on_event: self.on_event,
            snapshot: RwLock::new(Arc::new(TelemetrySnapshot::default())),
            listeners: Mutex::new(Vec::new()),
            state: Mutex::new(CoordinatorState::Idle),
            last_outcome: Mutex::new(None),
            fetch_lock: tokio::sync::Mutex::new(()),
        }
    }
}

/// Polls `regParamsData` on a fixed interval and fans each snapshot out to
/// subscribers. Only one fetch is in flight at a time.
pub struct Coordinator {
    api: Arc<Econet300Api>,
    update_interval: Duration,
    on_event: Option<EventHandler>,
    snapshot: RwLock<Arc<TelemetrySnapshot>>,
    listeners: Mutex<Vec<Listener>>,
    state: Mutex<CoordinatorState>,
    last_outcome: Mutex<Option<UpdateOutcome>>,
    fetch_lock: tokio::sync::Mutex<()>,
}

impl Coordinator {
    pub fn builder(api: Arc<Econet300Api>) -> CoordinatorBuilder {
        CoordinatorBuilder {
            api,
            update_interval: DEFAULT_UPDATE_INTERVAL,
            on_event: None,
        }
    }

    pub fn api(&self) -> &Arc<Econet300Api> {
        &self.api
    }

    pub fn update_interval(&self) -> Duration {
        self.update_interval
    }

    /// Register a callback invoked with every successfully fetched snapshot.
    pub fn subscribe<F>(&self, f: F)
    where
        F: Fn(&TelemetrySnapshot) + Send + Sync + 'static,
    {
        lock(&self.listeners).push(Arc::new(f));
    }

    /// Current snapshot; empty until the first successful fetch.
    pub fn data(&self) -> Arc<TelemetrySnapshot> {
        match self.snapshot.read() {
            Ok(guard) => Arc::clone(&*guard),
            Err(poisoned) => Arc::clone(&*poisoned.into_inner()),
        }
    }

    /// Whether the current snapshot carries `key`.
    pub fn has_data(&self, key: &str) -> bool {
        self.data().has_data(key)
    }

    pub fn state(&self) -> CoordinatorState {
        *lock(&self.state)
    }

    pub fn last_outcome(&self) -> Option<UpdateOutcome> {
        *lock(&self.last_outcome)
    }

    /// Fetch once during setup. Errors go to the caller; no event is emitted
    /// for a failure.
    pub async fn first_refresh(&self) -> Result<Arc<TelemetrySnapshot>> {
        let _guard = self.fetch_lock.lock().await;
        self.set_state(CoordinatorState::Fetching);
        let result = self.api.fetch_telemetry().await;
        self.set_state(CoordinatorState::Idle);

        match result {
            Ok(snapshot) => {
                self.record(UpdateOutcome::Success);
                Ok(self.publish(snapshot))
            }
            Err(e) => {
                self.record(outcome_for(&e));
                Err(e)
            }
        }
    }

    /// One polling cycle. Failures are reported through events and leave
    /// the previous snapshot in place.
    pub async fn refresh(&self) -> UpdateOutcome {
        let _guard = self.fetch_lock.lock().await;
        self.set_state(CoordinatorState::Fetching);
        debug!("fetching telemetry");
        let result = self.api.fetch_telemetry().await;
        self.set_state(CoordinatorState::Idle);

        let outcome = match result {
            Ok(snapshot) => {
                self.publish(snapshot);
                self.emit(&CoordinatorEvent::Updated);
                UpdateOutcome::Success
            }
            Err(Error::Authentication) => {
                error!("authentication failed, re-authentication required");
                self.emit(&CoordinatorEvent::ReauthRequired);
                UpdateOutcome::AuthFailed
            }
            Err(e) => {
                warn!(error = %e, "update failed, keeping last snapshot");
                self.emit(&CoordinatorEvent::UpdateFailed(e.to_string()));
                UpdateOutcome::UpdateFailed
            }
        };
        self.record(outcome);
        outcome
    }

    /// Poll until cancelled or until credentials are rejected.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(self.update_interval);
        interval.tick().await; // the immediate first tick

        info!(interval_secs = self.update_interval.as_secs(), "polling started");
        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                _ = interval.tick() => {
                    if self.refresh().await == UpdateOutcome::AuthFailed {
                        break;
                    }
                }
            }
        }
        info!("polling stopped");
    }

    pub fn spawn(self: &Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(Arc::clone(self).run(cancel))
    }

    fn publish(&self, snapshot: TelemetrySnapshot) -> Arc<TelemetrySnapshot> {
        let snapshot = Arc::new(snapshot);
        match self.snapshot.write() {
            Ok(mut guard) => *guard = Arc::clone(&snapshot),
            Err(poisoned) => *poisoned.into_inner() = Arc::clone(&snapshot),
        }
        // Listeners may subscribe again, so they run outside the lock.
        let listeners: Vec<Listener> = lock(&self.listeners).clone();
        for listener in &listeners {
            listener(&snapshot);
        }
        snapshot
    }

    fn emit(&self, event: &CoordinatorEvent) {
        if let Some(handler) = &self.on_event {
            handler(event);
        }
    }

    fn set_state(&self, state: CoordinatorState) {
        *lock(&self.state) = state;
    }

    fn record(&self, outcome: UpdateOutcome) {
        *lock(&self.last_outcome) = Some(outcome);
    }
}

fn outcome_for(e: &Error) -> UpdateOutcome {
    if e.is_authentication() {
        UpdateOutcome::AuthFailed
    } else {
        UpdateOutcome::UpdateFailed
    }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
