use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::OnceLock;

use crate::clock::Clock;
use crate::datetime::DateParser;
use crate::errors::BlockError;
use crate::reporter::Reporter;

/// Request field that pins "now" for the whole process.
pub const USE_TIME_PARAM: &str = "use_time";

/// The instant every block compares against, and whether it was pinned
/// through [`USE_TIME_PARAM`]. Debug notices are only emitted when pinned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EvalContext {
    pub now: DateTime<Utc>,
    pub debug: bool,
}

impl EvalContext {
    pub fn live(now: DateTime<Utc>) -> Self {
        Self { now, debug: false }
    }

    pub fn pinned(now: DateTime<Utc>) -> Self {
        Self { now, debug: true }
    }
}

/// Request values made available by the host (query string, form fields...).
#[derive(Debug, Clone, Default)]
pub struct RequestParams {
    values: HashMap<String, String>,
}

impl RequestParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// The `use_time` value, unless the host would consider it empty.
    pub fn use_time(&self) -> Option<&str> {
        self.get(USE_TIME_PARAM)
            .filter(|v| !v.is_empty() && *v != "0")
    }
}

/// Lazily built, then frozen, [`EvalContext`]. The first caller decides "now";
/// every later caller (on any thread) observes that same value.
#[derive(Debug, Default)]
pub struct ContextCell {
    cell: OnceLock<EvalContext>,
}

impl ContextCell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<EvalContext> {
        self.cell.get().copied()
    }

    pub fn get_or_init(
        &self,
        clock: &dyn Clock,
        dates: &DateParser,
        request: &RequestParams,
        reporter: &dyn Reporter,
    ) -> EvalContext {
        *self
            .cell
            .get_or_init(|| resolve(clock, dates, request, reporter))
    }
}

fn resolve(
    clock: &dyn Clock,
    dates: &DateParser,
    request: &RequestParams,
    reporter: &dyn Reporter,
) -> EvalContext {
    let real_now = clock.now();
    let Some(raw) = request.use_time() else {
        tracing::debug!(target: "timeperiod", now = %real_now, "using wall clock");
        return EvalContext::live(real_now);
    };

    match dates.parse(raw, real_now) {
        Ok(now) => {
            let shown = now.with_timezone(&dates.offset()).format("%m/%d/%Y %H:%M:%S");
            reporter.notice(&format!("Using test time for timeperiod: {shown}"));
            EvalContext::pinned(now)
        }
        Err(_) => {
            reporter.warning(&BlockError::invalid_timestamp(USE_TIME_PARAM, raw).to_string());
            EvalContext::live(real_now)
        }
    }
}
