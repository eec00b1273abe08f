//! Model Registry CLI
//!
//! Loads a model directory into the in-memory registry and reports how each
//! declared association was resolved.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use model_registry::{
    association, define_models_with, loader, Diagnostics, FsSource, Registry, RegistryConfig,
    SkipReason,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "model-registry")]
#[command(about = "Register model definitions and wire up their associations")]
struct Cli {
    /// Configuration file (defaults to models.toml lookup)
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register every model in a directory and resolve associations
    Load {
        /// Model directory (defaults to the configured one)
        dir: Option<PathBuf>,
        /// Print every registration and resolution decision
        #[arg(short, long)]
        verbose: bool,
        /// Print the resolution report as JSON
        #[arg(long)]
        json: bool,
        /// Load definition files sorted by name
        #[arg(long)]
        sorted: bool,
    },

    /// Validate every association declaration without registering models
    Check {
        /// Model directory (defaults to the configured one)
        dir: Option<PathBuf>,
    },

    /// Show or initialize configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Write the default configuration
    Init {
        #[arg(default_value = "models.toml")]
        path: String,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = RegistryConfig::load_from(cli.config.as_deref())?;

    match cli.command {
        Commands::Load { dir, verbose, json, sorted } => {
            let dir = dir.unwrap_or_else(|| config.models_dir());
            let mut load_config = config.load_config();
            load_config.sorted |= sorted;
            let mut diagnostics = Diagnostics::new(verbose || config.diagnostics.verbose);

            let mut registry = Registry::new();
            let report =
                define_models_with(&mut registry, &FsSource, &dir, &load_config, &mut diagnostics)?;

            if json {
                let models: Vec<_> = registry.models().collect();
                let output = serde_json::json!({
                    "models": models,
                    "report": report,
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
            } else {
                println!("📦 Registered {} models from {:?}", registry.len(), dir);
                for model in registry.models() {
                    println!("  {} ({} columns)", model.name, model.columns.len());
                    for assoc in &model.associations {
                        println!("    └─ {} {} as {}", assoc.kind, assoc.target_name, assoc.alias);
                    }
                }
                println!();
                println!("🔗 {} associations applied, {} skipped", report.applied(), report.skipped());
                for (outcome, reason) in report.skips() {
                    println!("  ⚠️  {}[{}]: {}", outcome.source, outcome.index, describe(reason));
                }
            }

            if config.resolution.fail_on_skipped && !report.is_clean() {
                std::process::exit(1);
            }
            Ok(())
        }

        Commands::Check { dir } => {
            let dir = dir.unwrap_or_else(|| config.models_dir());
            let definitions = loader::load_definitions_from(
                &FsSource,
                &dir,
                &config.load_config(),
                &mut Diagnostics::default(),
            )?;

            let mut invalid = 0;
            for definition in &definitions {
                for (index, declared) in definition.associations.iter().enumerate() {
                    if let Err(reason) = association::validate(declared) {
                        invalid += 1;
                        println!("❌ {}[{}]: {}", definition.display_name(), index, reason);
                    }
                }
            }

            if invalid > 0 {
                println!();
                println!("❌ {} invalid association declaration(s)", invalid);
                std::process::exit(1);
            }
            println!("✅ {} definitions, all association declarations valid", definitions.len());
            Ok(())
        }

        Commands::Config { action } => match action {
            ConfigAction::Show => {
                println!("{}", toml::to_string_pretty(&config)?);
                Ok(())
            }
            ConfigAction::Init { path } => {
                RegistryConfig::default().save(&path)?;
                println!("✅ Configuration written to {}", path);
                Ok(())
            }
        },
    }
}

fn describe(reason: &SkipReason) -> String {
    match reason {
        SkipReason::Invalid { reason } => reason.to_string(),
        SkipReason::TargetMissing { target, suggestion: Some(s) } => {
            format!("target {} not found (did you mean {}?)", target, s)
        }
        SkipReason::TargetMissing { target, suggestion: None } => {
            format!("target {} not found", target)
        }
        SkipReason::SourceMissing => "declaring model is not registered".to_string(),
        SkipReason::Rejected { error } => format!("rejected by the store: {}", error),
    }
}
