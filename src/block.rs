//! The `timeperiod` block: render the enclosed content only while the current
//! time is inside a `start`/`end` window.
//!
//! ```text
//! {timeperiod start="2024-12-01" end="2024-12-26 00:00"}
//!   Seasonal banner
//! {/timeperiod}
//! ```
//!
//! Both bounds are inclusive and either may be left out. When "now" has been
//! pinned through the `use_time` request field, a block outside its window
//! renders a markup comment saying when it will appear or how long ago it
//! stopped, instead of nothing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::clock::{Clock, SystemClock};
use crate::context::{ContextCell, EvalContext, RequestParams};
use crate::datetime::DateParser;
use crate::errors::{BlockError, Result};
use crate::functions::{BlockCall, BlockFunction};
use crate::humanize::diff;
use crate::reporter::Reporter;

/// Raw block parameters. Keys other than `start` and `end` are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Params {
    #[serde(default, deserialize_with = "lenient_string")]
    pub start: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub end: Option<String>,
}

// Template engines hand over whatever literal was written: accept numbers and
// treat null as absent. Anything else is kept verbatim and fails to parse later.
fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

impl Params {
    pub fn new(start: Option<&str>, end: Option<&str>) -> Self {
        Self {
            start: start.map(str::to_string),
            end: end.map(str::to_string),
        }
    }

    pub fn from_map(map: &Map<String, Value>) -> Result<Self> {
        serde_json::from_value(Value::Object(map.clone()))
            .map_err(|e| BlockError::Parse(e.to_string()))
    }

    /// Validate and parse the bounds. Checks run in order: presence, each
    /// bound's syntax (start first), then ordering.
    pub fn resolve(&self, dates: &DateParser, now: DateTime<Utc>) -> Result<Window> {
        if self.start.is_none() && self.end.is_none() {
            return Err(BlockError::MissingBounds);
        }
        let parse = |param: &str, raw: &Option<String>| {
            raw.as_deref()
                .map(|raw| {
                    dates
                        .parse(raw, now)
                        .map_err(|_| BlockError::invalid_timestamp(param, raw))
                })
                .transpose()
        };
        let window = Window {
            start: parse("start", &self.start)?,
            end: parse("end", &self.end)?,
        };
        if let (Some(start), Some(end)) = (window.start, window.end) {
            if start > end {
                return Err(BlockError::InvertedRange);
            }
        }
        Ok(window)
    }
}

/// A validated window: at least one bound, and `start <= end` when both exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl Window {
    pub fn contains(&self, now: DateTime<Utc>) -> bool {
        match (self.start, self.end) {
            (Some(start), Some(end)) => start <= now && now <= end,
            (Some(start), None) => now >= start,
            (None, Some(end)) => now <= end,
            (None, None) => false,
        }
    }

    pub fn decide(&self, ctx: &EvalContext) -> Decision {
        if self.contains(ctx.now) {
            return Decision::Show;
        }
        if ctx.debug {
            if let Some(start) = self.start.filter(|start| ctx.now < *start) {
                return Decision::DebugNotice(format!(
                    "Content will be displayed in {}.",
                    diff(ctx.now, start)
                ));
            }
            if let Some(end) = self.end.filter(|end| ctx.now > *end) {
                return Decision::DebugNotice(format!(
                    "Content stopped displaying {} ago.",
                    diff(end, ctx.now)
                ));
            }
        }
        Decision::Suppress
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", content = "notice", rename_all = "snake_case")]
pub enum Decision {
    Show,
    Suppress,
    DebugNotice(String),
}

/// Result of the opening-tag pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenOutcome {
    /// Whether the host should run the closing-tag pass at all.
    pub render_close: bool,
}

#[derive(Clone)]
pub struct BlockConfig {
    clock: Arc<dyn Clock>,
    dates: DateParser,
    wrap_notices: bool,
}

impl Default for BlockConfig {
    fn default() -> Self {
        Self {
            clock: Arc::new(SystemClock),
            dates: DateParser::utc(),
            wrap_notices: true,
        }
    }
}

impl BlockConfig {
    pub fn with_clock<C: Clock + 'static>(mut self, clock: C) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn with_dates(mut self, dates: DateParser) -> Self {
        self.dates = dates;
        self
    }

    /// Emit debug notices as `<!-- ... -->` (default) or as bare text.
    pub fn wrap_notices(mut self, wrap: bool) -> Self {
        self.wrap_notices = wrap;
        self
    }
}

#[derive(Clone, Default)]
pub struct TimePeriodBlock {
    config: BlockConfig,
    context: Arc<ContextCell>,
}

impl TimePeriodBlock {
    pub fn new(config: BlockConfig) -> Self {
        Self {
            config,
            context: Arc::new(ContextCell::new()),
        }
    }

    /// Share an evaluation context with other blocks (one "now" per process).
    pub fn with_context(config: BlockConfig, context: Arc<ContextCell>) -> Self {
        Self { config, context }
    }

    /// The evaluation context, built on first use.
    pub fn context(&self, request: &RequestParams, reporter: &dyn Reporter) -> EvalContext {
        self.context
            .get_or_init(self.config.clock.as_ref(), &self.config.dates, request, reporter)
    }

    pub fn evaluate(&self, params: &Params, ctx: &EvalContext) -> Result<Decision> {
        let window = params.resolve(&self.config.dates, ctx.now)?;
        let decision = window.decide(ctx);
        tracing::debug!(target: "timeperiod", ?window, ?decision, now = %ctx.now, "evaluated");
        Ok(decision)
    }

    pub fn on_open(&self, params: &Params, ctx: &EvalContext) -> Result<OpenOutcome> {
        let decision = self.evaluate(params, ctx)?;
        Ok(OpenOutcome {
            render_close: decision != Decision::Suppress,
        })
    }

    pub fn on_close(&self, params: &Params, content: &str, ctx: &EvalContext) -> Result<Option<String>> {
        Ok(match self.evaluate(params, ctx)? {
            Decision::Show => Some(content.to_string()),
            Decision::DebugNotice(text) => Some(self.notice_markup(&text)),
            Decision::Suppress => None,
        })
    }

    fn notice_markup(&self, text: &str) -> String {
        if self.config.wrap_notices {
            format!("<!-- {text} -->")
        } else {
            text.to_string()
        }
    }
}

impl BlockFunction for TimePeriodBlock {
    fn name(&self) -> &'static str { "timeperiod" }

    fn invoke(&self, call: BlockCall<'_>) -> Option<String> {
        let ctx = self.context(call.request, call.reporter);
        let outcome = Params::from_map(call.params).and_then(|params| match call.content {
            None => self.on_open(&params, &ctx).map(|open| {
                if !open.render_close {
                    *call.repeat = false;
                }
                None
            }),
            Some(content) => self.on_close(&params, content, &ctx),
        });
        outcome.unwrap_or_else(|err| {
            call.reporter.warning(&err.to_string());
            None
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporter::CollectingReporter;
    use chrono::{Duration, TimeZone};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
    }

    fn decide(start: Option<&str>, end: Option<&str>, ctx: EvalContext) -> Result<Decision> {
        TimePeriodBlock::default().evaluate(&Params::new(start, end), &ctx)
    }

    #[test]
    fn inclusive_on_both_bounds() {
        let live = EvalContext::live(now());
        let at = "2024-06-15 12:00:00";
        assert_eq!(decide(Some(at), Some(at), live), Ok(Decision::Show));
        assert_eq!(decide(Some(at), None, live), Ok(Decision::Show));
        assert_eq!(decide(None, Some(at), live), Ok(Decision::Show));
    }

    #[test]
    fn outside_window_is_suppressed_when_live() {
        let live = EvalContext::live(now());
        assert_eq!(decide(Some("2024-06-16"), None, live), Ok(Decision::Suppress));
        assert_eq!(decide(None, Some("2024-06-14"), live), Ok(Decision::Suppress));
        assert_eq!(
            decide(Some("2024-01-01"), Some("2024-02-01"), live),
            Ok(Decision::Suppress)
        );
    }

    #[test]
    fn validation_order() {
        let live = EvalContext::live(now());
        assert_eq!(decide(None, None, live), Err(BlockError::MissingBounds));
        assert_eq!(
            decide(Some("bogus"), Some("also bogus"), live),
            Err(BlockError::invalid_timestamp("start", "bogus"))
        );
        assert_eq!(
            decide(Some("2024-01-01"), Some(""), live),
            Err(BlockError::invalid_timestamp("end", ""))
        );
        assert_eq!(
            decide(Some("2099-01-01"), Some("2000-01-01"), live),
            Err(BlockError::InvertedRange)
        );
    }

    #[test]
    fn debug_notices() {
        let pinned = EvalContext::pinned(now());
        let two_days_on = (now() + Duration::days(2)).to_rfc3339();
        assert_eq!(
            decide(Some(two_days_on.as_str()), None, pinned),
            Ok(Decision::DebugNotice("Content will be displayed in 2 day(s).".into()))
        );
        assert_eq!(
            decide(Some("2024-06-01"), Some("2024-06-15 09:00"), pinned),
            Ok(Decision::DebugNotice("Content stopped displaying 3 hour(s) ago.".into()))
        );
        assert_eq!(
            decide(None, Some("2024-06-15 11:59:30"), pinned),
            Ok(Decision::DebugNotice("Content stopped displaying 30 second(s) ago.".into()))
        );
    }

    #[test]
    fn relative_bounds_resolve_against_context_now() {
        let live = EvalContext::live(now());
        assert_eq!(decide(Some("-1 hour"), Some("+1 hour"), live), Ok(Decision::Show));
        assert_eq!(decide(Some("tomorrow"), None, live), Ok(Decision::Suppress));
    }

    #[test]
    fn params_from_map_are_lenient() {
        let map = json!({"start": "2024-01-01", "end": null, "class": "promo"});
        let params = Params::from_map(map.as_object().unwrap()).unwrap();
        assert_eq!(params, Params::new(Some("2024-01-01"), None));

        let map = json!({"end": 20240101});
        let params = Params::from_map(map.as_object().unwrap()).unwrap();
        assert_eq!(params.end.as_deref(), Some("20240101"));
    }

    #[test]
    fn two_pass_state_machine() {
        let block = TimePeriodBlock::default();
        let live = EvalContext::live(now());
        let shown = Params::new(Some("2024-01-01"), None);
        let hidden = Params::new(Some("2025-01-01 12:00"), None);

        assert_eq!(block.on_open(&shown, &live), Ok(OpenOutcome { render_close: true }));
        assert_eq!(block.on_close(&shown, "hi", &live), Ok(Some("hi".to_string())));
        assert_eq!(block.on_open(&hidden, &live), Ok(OpenOutcome { render_close: false }));
        assert_eq!(block.on_close(&hidden, "hi", &live), Ok(None));

        let pinned = EvalContext::pinned(now());
        assert_eq!(block.on_open(&hidden, &pinned), Ok(OpenOutcome { render_close: true }));
        assert_eq!(
            block.on_close(&hidden, "hi", &pinned),
            Ok(Some("<!-- Content will be displayed in 200 day(s). -->".to_string()))
        );
    }

    #[test]
    fn unwrapped_notices() {
        let block = TimePeriodBlock::new(BlockConfig::default().wrap_notices(false));
        let pinned = EvalContext::pinned(now());
        let out = block
            .on_close(&Params::new(None, Some("2024-06-15 11:00")), "hi", &pinned)
            .unwrap();
        assert_eq!(out.as_deref(), Some("Content stopped displaying 60 minute(s) ago."));
    }

    #[test]
    fn invoke_reports_errors_and_keeps_repeat() {
        let block = TimePeriodBlock::default();
        let reporter = CollectingReporter::new();
        let mut repeat = true;
        let out = block.invoke(BlockCall {
            params: &Map::new(),
            content: None,
            repeat: &mut repeat,
            request: &RequestParams::new(),
            reporter: &reporter,
        });
        assert_eq!(out, None);
        assert!(repeat);
        assert_eq!(
            reporter.messages(),
            vec!["At least one parameter of 'start' or 'end' must be provided".to_string()]
        );
    }
}
