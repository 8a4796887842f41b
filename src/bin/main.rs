//! modelwiki CLI - Extract model metadata through a documentation engine
//!
//! Usage:
//!   modelwiki extract <source> [--engine <key>] [--server-path <path>] [--mode <mode>]
//!   modelwiki engines
//!   modelwiki classify <source>
//!
//! Examples:
//!   modelwiki extract ./Sales.SemanticModel --pretty
//!   modelwiki extract localhost:51174 --mode readonly --timeout 120
//!   modelwiki extract ./sales.pbix --engine pbixray

use clap::{Parser, Subcommand, ValueEnum};
use modelwiki::config::{AccessMode, EngineOptions, LoadOptions, Settings};
use modelwiki::engine::{self, SourceKind};
use modelwiki::metadata::ExtractOptions;
use modelwiki::registry::EngineRegistry;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "modelwiki")]
#[command(about = "modelwiki - Extract analytical model metadata through pluggable backends")]
#[command(version)]
struct Cli {
    /// Enable debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract metadata from a model and print it as JSON
    Extract {
        /// Model folder, remote workspace URI, host:port, or model file
        source: String,

        /// Engine to use (defaults to [engine].default from the config)
        #[arg(short, long)]
        engine: Option<String>,

        /// Backend binary or server script
        #[arg(long)]
        server_path: Option<String>,

        /// Backend access mode
        #[arg(short, long)]
        mode: Option<ModeArg>,

        /// Timeout in seconds for launch, handshake and each tool call
        #[arg(short, long)]
        timeout: Option<u64>,

        /// Config file (defaults to the standard search locations)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// List registered engines
    Engines,

    /// Show how a source string would be bound
    Classify {
        /// Source string to classify
        source: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    Readonly,
    Readwrite,
}

impl From<ModeArg> for AccessMode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Readonly => AccessMode::ReadOnly,
            ModeArg::Readwrite => AccessMode::ReadWrite,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    modelwiki::logging::init(cli.verbose);

    match cli.command {
        Commands::Extract {
            source,
            engine,
            server_path,
            mode,
            timeout,
            config,
            pretty,
        } => {
            let overrides = EngineOptions {
                server_path,
                mode: mode.map(Into::into),
                timeout_secs: timeout,
                ..Default::default()
            };
            cmd_extract(&source, engine, overrides, config, pretty).await
        }
        Commands::Engines => cmd_engines(),
        Commands::Classify { source } => cmd_classify(&source),
    }
}

async fn cmd_extract(
    source: &str,
    engine_key: Option<String>,
    overrides: EngineOptions,
    config: Option<PathBuf>,
    pretty: bool,
) -> ExitCode {
    let settings = match config {
        Some(path) => Settings::from_file(&path),
        None => Settings::load(),
    };
    let settings = match settings {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let key = engine_key.unwrap_or_else(|| settings.engine.default.clone());
    let options = settings.engine_options(&key).merged_with(&overrides);

    let registry = EngineRegistry::with_builtin();
    let mut engine = match registry.get(&key, options) {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    engine.set_extract_options(ExtractOptions::default().with_concurrency(settings.extract.concurrency));

    let metadata = match engine::document(engine.as_mut(), source, LoadOptions::default()).await {
        Ok(metadata) => metadata,
        Err(e) => {
            eprintln!("Extraction failed ({}): {}", e.kind(), e);
            return ExitCode::FAILURE;
        }
    };

    let dangling = metadata.dangling_table_refs();
    if !dangling.is_empty() {
        tracing::info!(tables = ?dangling, "model references tables that were not extracted");
    }

    let json = if pretty {
        serde_json::to_string_pretty(&metadata)
    } else {
        serde_json::to_string(&metadata)
    };
    match json {
        Ok(json) => {
            println!("{}", json);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error serializing metadata: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn cmd_engines() -> ExitCode {
    let registry = EngineRegistry::with_builtin();
    for key in registry.keys() {
        println!("{}", key);
    }
    ExitCode::SUCCESS
}

fn cmd_classify(source: &str) -> ExitCode {
    match SourceKind::classify(source) {
        Ok(kind) => {
            println!("{} (operation: {})", kind, kind.operation());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
