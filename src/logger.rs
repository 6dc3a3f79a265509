//! Logger interface: leveled messages plus structured incident records.
//!
//! The transport is external; the default implementation forwards to
//! [`tracing`]. Tests install a [`CaptureLogger`] to assert on output.

use serde::Serialize;
use serde_json::Value;
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

/// Kinds of structured incidents the core reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum IncidentKind {
    /// An `ensure` was satisfied from the cache without re-executing.
    CachedOutcome,
    /// A `forget` targeted an entry that was not cached.
    ForgetMiss,
    /// A step's operation failed.
    StepFailure,
    /// A scenario boundary was crossed.
    ScenarioStart,
    /// A stepper teardown hook failed.
    Teardown,
}

/// A structured event record: incident kind plus details.
#[derive(Debug, Clone, Serialize)]
pub struct Incident {
    pub kind: IncidentKind,
    pub details: Value,
}

/// Narrow logging contract consumed by the core.
pub trait Logger: Send + Sync {
    fn log(&self, level: LogLevel, message: &str);
    fn incident(&self, incident: Incident);

    fn debug(&self, message: &str) {
        self.log(LogLevel::Debug, message);
    }
    fn info(&self, message: &str) {
        self.log(LogLevel::Info, message);
    }
    fn warn(&self, message: &str) {
        self.log(LogLevel::Warn, message);
    }
    fn error(&self, message: &str) {
        self.log(LogLevel::Error, message);
    }
}

/// Default logger: forwards everything to `tracing`.
#[derive(Debug, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn log(&self, level: LogLevel, message: &str) {
        match level {
            LogLevel::Debug => tracing::debug!("{message}"),
            LogLevel::Info => tracing::info!("{message}"),
            LogLevel::Warn => tracing::warn!("{message}"),
            LogLevel::Error => tracing::error!("{message}"),
        }
    }

    fn incident(&self, incident: Incident) {
        tracing::info!(kind = ?incident.kind, details = %incident.details, "incident");
    }
}

/// In-memory logger for tests.
#[derive(Debug, Default)]
pub struct CaptureLogger {
    messages: Mutex<Vec<(LogLevel, String)>>,
    incidents: Mutex<Vec<Incident>>,
}

impl CaptureLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether any captured message contains the fragment.
    pub fn contains(&self, fragment: &str) -> bool {
        self.messages
            .lock()
            .expect("logger poisoned")
            .iter()
            .any(|(_, m)| m.contains(fragment))
    }

    pub fn messages(&self) -> Vec<(LogLevel, String)> {
        self.messages.lock().expect("logger poisoned").clone()
    }

    pub fn incident_count(&self, kind: IncidentKind) -> usize {
        self.incidents
            .lock()
            .expect("logger poisoned")
            .iter()
            .filter(|i| i.kind == kind)
            .count()
    }
}

impl Logger for CaptureLogger {
    fn log(&self, level: LogLevel, message: &str) {
        self.messages
            .lock()
            .expect("logger poisoned")
            .push((level, message.to_string()));
    }

    fn incident(&self, incident: Incident) {
        self.incidents
            .lock()
            .expect("logger poisoned")
            .push(incident);
    }
}
