use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use thinkgym_lib::config::{
    load_file_layer, resolve_engine_program, ConfigMerger, PartialConfig, PartialEngineConfig,
    PartialServerConfig,
};
use thinkgym_lib::session::{HttpThinkingApi, WizardSession};
use thinkgym_lib::WizardStep;

/// ThinkGym - guided thinking exercise server
#[derive(Parser, Debug)]
#[command(name = "thinkgym")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server
    Serve(ServeArgs),
    /// Drive one or more wizard rounds against a running server
    Session(SessionArgs),
}

#[derive(Args, Debug)]
struct ServeArgs {
    /// Config file (defaults to ~/.config/thinkgym/config.toml when present)
    #[arg(long, env = "THINKGYM_CONFIG")]
    config: Option<PathBuf>,

    /// Port to bind the server to
    #[arg(long, env = "THINKGYM_PORT")]
    port: Option<u16>,

    /// Address to bind the server to
    #[arg(long, env = "THINKGYM_BIND")]
    bind: Option<String>,

    /// Engine command line, split on whitespace (e.g. "python3 backend/run.py")
    #[arg(long, env = "THINKGYM_ENGINE")]
    engine: Option<String>,

    /// Working directory for engine processes
    #[arg(long)]
    engine_dir: Option<PathBuf>,

    /// Engine timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Do not pass --mock to the engine
    #[arg(long)]
    no_mock: bool,

    /// Maximum engine processes running at once
    #[arg(long)]
    max_concurrent: Option<usize>,

    /// Maximum requests waiting for an engine slot
    #[arg(long)]
    max_queued: Option<usize>,

    /// Allowed CORS origin (repeatable); any origin when omitted
    #[arg(long = "cors-origin")]
    cors_origins: Vec<String>,
}

impl ServeArgs {
    fn to_partial(&self) -> PartialConfig {
        PartialConfig {
            server: Some(PartialServerConfig {
                port: self.port,
                bind: self.bind.clone(),
                cors_origins: (!self.cors_origins.is_empty()).then(|| self.cors_origins.clone()),
            }),
            engine: Some(PartialEngineConfig {
                command: self
                    .engine
                    .as_ref()
                    .map(|e| e.split_whitespace().map(str::to_string).collect()),
                working_dir: self.engine_dir.clone(),
                timeout_secs: self.timeout,
                mock: self.no_mock.then_some(false),
                max_concurrent: self.max_concurrent,
                max_queued: self.max_queued,
            }),
        }
    }
}

#[derive(Args, Debug)]
struct SessionArgs {
    /// Server base URL
    #[arg(long, default_value = "http://127.0.0.1:3000", env = "THINKGYM_SERVER")]
    server: String,

    /// Custom topic; the first preset is used when omitted
    #[arg(long)]
    topic: Option<String>,

    /// Note for each round, in order (repeatable)
    #[arg(long = "note")]
    notes: Vec<String>,

    /// Number of rounds to run
    #[arg(long, default_value_t = 1)]
    rounds: u32,

    /// Seed for deterministic content
    #[arg(long, default_value_t = thinkgym_lib::session::DEFAULT_SEED, allow_negative_numbers = true)]
    seed: i64,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logger
    env_logger::init();

    match cli.command {
        Command::Serve(args) => run_serve(args),
        Command::Session(args) => run_session(args),
    }
}

fn run_serve(args: ServeArgs) -> Result<()> {
    use thinkgym_lib::server::{self, ServerAppState};
    use thinkgym_lib::shutdown::{register_signal_handlers, ShutdownState};

    let file = load_file_layer(args.config.as_deref())?;
    let mut config = ConfigMerger::new()
        .with_file(file)
        .with_cli(Some(args.to_partial()))
        .merge();
    config.validate()?;

    match resolve_engine_program(&config.engine.command[0]) {
        Some(program) => config.engine.command[0] = program.to_string_lossy().into_owned(),
        None => log::warn!(
            "Engine program {:?} not found on PATH or next to the server; requests will fail until it is installed",
            config.engine.command[0]
        ),
    }

    let rt = tokio::runtime::Runtime::new().context("Failed to create tokio runtime")?;

    rt.block_on(async move {
        let shutdown_state = ShutdownState::new();
        if let Err(e) = register_signal_handlers(shutdown_state.clone()) {
            log::warn!("Failed to register signal handlers: {}", e);
        }

        let state = ServerAppState::new(config, shutdown_state);
        server::run_server(state).await.map_err(anyhow::Error::msg)
    })
}

fn run_session(args: SessionArgs) -> Result<()> {
    if args.rounds < 1 {
        anyhow::bail!("--rounds must be at least 1");
    }

    let rt = tokio::runtime::Runtime::new().context("Failed to create tokio runtime")?;
    rt.block_on(async move {
        let api = HttpThinkingApi::new(&args.server)?;
        let mut wizard = WizardSession::new(api).with_seed(args.seed);
        if let Some(topic) = &args.topic {
            wizard.set_custom_topic(topic.as_str());
        }

        for index in 0..args.rounds as usize {
            // Topic -> Debate
            wizard.go_next().await?;
            println!("\n===== Round {} =====", wizard.round());
            println!("질문: {}", wizard.topic());
            for turn in wizard.debate() {
                println!("\n[{}]\n{}", turn.role.as_str(), turn.text);
            }

            // Debate -> Notes; an explicit note replaces the carried-over draft
            wizard.go_next().await?;
            if let Some(note) = args.notes.get(index) {
                wizard.set_user_note(note.as_str());
            }
            println!("\n[사용자 생각]\n{}", display_note(wizard.user_note()));

            // Notes -> Structure -> Report
            wizard.go_next().await?;
            if let Some(structure) = wizard.structure() {
                println!("\n[구조 피드백 JSON]");
                println!("{}", serde_json::to_string_pretty(structure)?);
            }
            wizard.go_next().await?;
            println!("\n{}", wizard.report());

            if index + 1 < args.rounds as usize {
                wizard.go_next().await?;
                debug_assert_eq!(wizard.step(), WizardStep::Topic);
            }
        }
        Ok(())
    })
}

fn display_note(note: &str) -> &str {
    if note.trim().is_empty() {
        "(미입력)"
    } else {
        note
    }
}
