pub mod errors;
pub mod clock;
pub mod context;
pub mod datetime;
pub mod humanize;
pub mod reporter;
pub mod block;
pub mod functions;  // plugin model
mod parser;

use serde_json::{Map, Value};
use std::sync::OnceLock;
use errors::{Result, BlockError};
use context::RequestParams;
use functions::{BlockCall, Registry};
use reporter::Reporter;

/// Drives block functions through the host's two-pass protocol: the opening
/// tag is invoked without content (its output is discarded), and unless the
/// block cleared `repeat`, the closing tag is invoked once with the content.
pub struct Renderer {
    registry: Registry,
    request: RequestParams,
}

impl Renderer {
    pub fn new(registry: Registry, request: RequestParams) -> Self {
        Self { registry, request }
    }

    /// Render one block; a block that renders nothing yields an empty string.
    pub fn render_block(
        &self,
        name: &str,
        params: &Map<String, Value>,
        content: &str,
        reporter: &dyn Reporter,
    ) -> Result<String> {
        let block = self
            .registry
            .get(name)
            .ok_or_else(|| BlockError::UnknownBlock(name.to_string()))?;

        let mut repeat = true;
        block.invoke(BlockCall {
            params,
            content: None,
            repeat: &mut repeat,
            request: &self.request,
            reporter,
        });
        if !repeat {
            tracing::debug!(target: "timeperiod", block = name, "closing pass skipped");
            return Ok(String::new());
        }

        // a block may ask for another round, but content never changes here
        repeat = false;
        let out = block.invoke(BlockCall {
            params,
            content: Some(content),
            repeat: &mut repeat,
            request: &self.request,
            reporter,
        });
        Ok(out.unwrap_or_default())
    }
}

static BUILTINS: OnceLock<Registry> = OnceLock::new();

/// Convenience: render a `timeperiod` block with the process-wide built-in
/// registry. "now" is settled by the first call and kept for the process, so
/// `use_time` in later requests is ignored.
pub fn render_timeperiod(
    params: &Map<String, Value>,
    content: &str,
    request: &RequestParams,
    reporter: &dyn Reporter,
) -> Result<String> {
    let registry = BUILTINS.get_or_init(Registry::with_builtins).clone();
    Renderer::new(registry, request.clone())
        .render_block("timeperiod", params, content, reporter)
}

pub use block::{BlockConfig, Decision, Params, TimePeriodBlock, Window};
pub use context::{ContextCell, EvalContext, USE_TIME_PARAM};
pub use datetime::DateParser;
pub use humanize::diff;
