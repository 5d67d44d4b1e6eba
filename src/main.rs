//! Graph Loader CLI
//!
//! Usage:
//!   graph-loader [OPTIONS] [FILE]
//!
//! Options:
//!   -c, --config <FILE>  Loader configuration (TOML format)
//!   -d, --dump           Print the loaded graph
//!   -h, --help           Print help

use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::rc::Rc;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use graph_loader::{DocumentAssets, Loader, LoaderConfig, Services, TypeRegistry};

#[derive(Parser)]
#[command(name = "graph-loader")]
#[command(about = "Build an object graph from a declarative document")]
struct Cli {
    /// Input file (reads from stdin if not provided)
    input: Option<PathBuf>,

    /// Loader configuration (TOML format)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print a description of the loaded graph
    #[arg(short, long)]
    dump: bool,
}

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "graph_loader=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => match LoaderConfig::from_file(path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error loading config '{}': {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => LoaderConfig::default(),
    };

    // Includes and resources resolve next to the input unless configured
    if config.base_path.is_none() {
        if let Some(dir) = cli.input.as_ref().and_then(|p| p.parent()) {
            config.base_path = Some(dir.to_path_buf());
        }
    }

    let mut registry = TypeRegistry::new();
    for name in &config.types {
        registry.register_record(name);
    }
    let services = Services::new(registry)
        .with_assets(Rc::new(DocumentAssets))
        .with_config(config);
    let loader = Loader::new(services);

    let (source, filename) = match &cli.input {
        Some(path) => match fs::read_to_string(path) {
            Ok(content) => (content, path.display().to_string()),
            Err(e) => {
                eprintln!("Error reading file '{}': {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => {
            let mut buffer = String::new();
            match io::stdin().read_to_string(&mut buffer) {
                Ok(_) => (buffer, "<stdin>".to_string()),
                Err(e) => {
                    eprintln!("Error reading from stdin: {}", e);
                    std::process::exit(1);
                }
            }
        }
    };

    let report = loader.load_named(&source, &filename);

    if !report.is_ok() {
        eprintln!("{}", report.diagnostics.format(&source, &filename));
        eprintln!("Error: load failed with {} diagnostic(s)", report.diagnostics.len());
        std::process::exit(1);
    }

    match report.value {
        Some(value) if cli.dump => print!("{}", value.describe()),
        Some(value) => println!("{}", value),
        None => println!("(no object)"),
    }
}
