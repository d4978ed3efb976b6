use clap::Parser;
use std::io::Write;
use thinkgym_lib::mock_engine::{respond, EngineRequest};
use thinkgym_lib::Mode;

/// ThinkGym engine - writes one JSON document to stdout per invocation
#[derive(Parser, Debug)]
#[command(name = "thinkgym-engine")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// debate | structure | report | full
    #[arg(long)]
    mode: Mode,

    /// Debate topic
    #[arg(long, allow_hyphen_values = true)]
    topic: String,

    /// Round index (1-based)
    #[arg(long, default_value_t = 1, allow_negative_numbers = true)]
    round: i64,

    /// Deterministic seed for mock content
    #[arg(long, default_value_t = 42, allow_negative_numbers = true)]
    seed: i64,

    /// User note text
    #[arg(long, allow_hyphen_values = true)]
    user_note: Option<String>,

    /// Debate turns as a JSON string (structure/report)
    #[arg(long, allow_hyphen_values = true)]
    debate_json: Option<String>,

    /// Structure as a JSON string (report)
    #[arg(long, allow_hyphen_values = true)]
    structure_json: Option<String>,

    /// Use mock generation
    #[arg(long)]
    mock: bool,
}

fn write_document(doc: &serde_json::Value) -> std::io::Result<()> {
    let mut stdout = std::io::stdout().lock();
    serde_json::to_writer(&mut stdout, doc)?;
    stdout.flush()
}

fn main() {
    // env_logger writes to stderr, stdout stays JSON only
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if !e.use_stderr() => e.exit(),
        Err(e) => {
            log::debug!("argument error: {}", e);
            let doc = serde_json::json!({
                "ok": false,
                "mode": null,
                "error": {
                    "code": "INVALID_INPUT",
                    "message": e.kind().to_string(),
                    "http_hint": 400,
                }
            });
            let _ = write_document(&doc);
            std::process::exit(1);
        }
    };

    let request = EngineRequest {
        mode: cli.mode,
        topic: cli.topic,
        round: cli.round,
        seed: cli.seed,
        user_note: cli.user_note,
        debate_json: cli.debate_json,
        structure_json: cli.structure_json,
        mock: cli.mock,
    };

    let (doc, exit_code) = respond(&request);
    if let Err(e) = write_document(&doc) {
        log::error!("Failed to write result: {}", e);
        std::process::exit(2);
    }
    std::process::exit(exit_code);
}
