use clap::Parser;
use serde_json::{json, Map};
use timeperiod_block::context::RequestParams;
use timeperiod_block::functions::Registry;
use timeperiod_block::errors::Result;
use timeperiod_block::reporter::{CollectingReporter, Reporter, TracingReporter};
use timeperiod_block::{BlockConfig, DateParser, Decision, Params, Renderer, TimePeriodBlock, USE_TIME_PARAM};
use tracing_subscriber::EnvFilter;

/// Render a block of content only while "now" is inside a time window.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Window start (inclusive), e.g. "2024-12-01" or "tomorrow 09:00"
    #[arg(long)]
    start: Option<String>,
    /// Window end (inclusive)
    #[arg(long)]
    end: Option<String>,
    /// Pin "now" to this date/time and enable debug notices
    #[arg(long, env = "TIMEPERIOD_USE_TIME")]
    use_time: Option<String>,
    /// Offset east of UTC, in minutes, for dates written without one
    #[arg(long, env = "TIMEPERIOD_UTC_OFFSET", default_value_t = 0, allow_hyphen_values = true)]
    utc_offset: i32,
    /// Block content; read from stdin when omitted
    #[arg(long)]
    content: Option<String>,
    /// Emit debug notices as bare text instead of markup comments
    #[arg(long)]
    plain: bool,
    /// Print output, decision and reports as JSON
    #[arg(long)]
    json: bool,
    /// Default log filter when RUST_LOG is unset (notices log at info)
    #[arg(long, default_value = "warn,timeperiod=info")]
    log_level: String,
}

fn main() {
    // Parse CLI arguments.
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let content = match args.content.clone() {
        Some(c) => c,
        None => match std::io::read_to_string(std::io::stdin()) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Failed to read content from stdin: {e}");
                std::process::exit(1);
            }
        },
    };

    // Build the block parameter mapping the way a template would pass it.
    let mut params = Map::new();
    if let Some(start) = &args.start { params.insert("start".into(), json!(start)); }
    if let Some(end) = &args.end { params.insert("end".into(), json!(end)); }

    let mut request = RequestParams::new();
    if let Some(t) = &args.use_time { request = request.with(USE_TIME_PARAM, t.as_str()); }

    let block = TimePeriodBlock::new(
        BlockConfig::default()
            .with_dates(DateParser::with_offset_minutes(args.utc_offset))
            .wrap_notices(!args.plain),
    );
    let mut registry = Registry::new();
    registry.register(block.clone());
    let renderer = Renderer::new(registry, request.clone());

    // --json collects reports into the document; otherwise they go to the log
    let collected = CollectingReporter::new();
    let reporter: &dyn Reporter = if args.json { &collected } else { &TracingReporter };

    let output = match renderer.render_block("timeperiod", &params, &content, reporter) {
        Ok(out) => out,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    // shares the renderer's context cell, so this is the same "now"
    let ctx = block.context(&request, reporter);
    let decision = Params::from_map(&params).and_then(|p| block.evaluate(&p, &ctx));

    if args.json {
        let doc = json!({
            "output": output,
            "decision": decision.as_ref().ok(),
            "context": ctx,
            "reports": collected.reports(),
        });
        match serde_json::to_string_pretty(&doc) {
            Ok(s) => println!("{s}"),
            Err(e) => {
                eprintln!("Failed to encode JSON: {e}");
                std::process::exit(1);
            }
        }
    } else {
        print!("{output}");
    }

    let code = exit_code(&decision);
    if code != 0 {
        std::process::exit(code);
    }
}

/// 2 when the block's parameters were rejected. Warnings that did not stop
/// evaluation (a bad `use_time`, say) keep the exit code at 0.
fn exit_code(decision: &Result<Decision>) -> i32 {
    match decision {
        Ok(_) => 0,
        Err(_) => 2,
    }
}
