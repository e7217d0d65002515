use serde::Serialize;
use std::sync::Mutex;

/// Severity of a message sent back to the host engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Notice,
    Warning,
}

/// The host's non-fatal error channel. Reports never stop rendering.
pub trait Reporter: Send + Sync {
    fn report(&self, level: Level, message: &str);

    fn notice(&self, message: &str) {
        self.report(Level::Notice, message);
    }

    fn warning(&self, message: &str) {
        self.report(Level::Warning, message);
    }
}

/// Forwards reports to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn report(&self, level: Level, message: &str) {
        match level {
            Level::Notice => tracing::info!(target: "timeperiod", "{message}"),
            Level::Warning => tracing::warn!(target: "timeperiod", "{message}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    pub level: Level,
    pub message: String,
}

/// Keeps every report in memory, in arrival order.
#[derive(Debug, Default)]
pub struct CollectingReporter {
    reports: Mutex<Vec<Report>>,
}

impl CollectingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reports(&self) -> Vec<Report> {
        self.lock().clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.lock().iter().map(|r| r.message.clone()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Report>> {
        // a poisoned sink still holds every report pushed before the panic
        self.reports.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Reporter for CollectingReporter {
    fn report(&self, level: Level, message: &str) {
        tracing::debug!(target: "timeperiod", ?level, "{message}");
        self.lock().push(Report {
            level,
            message: message.to_string(),
        });
    }
}
