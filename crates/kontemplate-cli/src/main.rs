//! Kontemplate CLI - Extremely simple Kubernetes resource templates

use clap::{Args, Parser, Subcommand};
use kontemplate_kube::{DispatchMode, Tools};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod display;
mod error;
mod exit_codes;

#[derive(Parser)]
#[command(name = "kontemplate")]
#[command(about = "Extremely simple Kubernetes resource templates", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalOptions,
}

/// Options shared by every subcommand, parsed once and passed down
#[derive(Args, Debug, Clone)]
pub struct GlobalOptions {
    /// Resource sets to include (all sets when omitted)
    #[arg(short = 'i', long = "include", global = true, value_name = "NAME")]
    pub include: Vec<String>,

    /// Resource sets to exclude, wins over --include
    #[arg(short = 'e', long = "exclude", global = true, value_name = "NAME")]
    pub exclude: Vec<String>,

    /// Override a variable in every resource set
    #[arg(long = "var", global = true, value_name = "KEY=VALUE")]
    pub vars: Vec<String>,

    /// kubectl binary to dispatch to
    #[arg(long, global = true, env = "KONTEMPLATE_KUBECTL", default_value = "kubectl")]
    pub kubectl: PathBuf,

    /// helm binary to dispatch to
    #[arg(long, global = true, env = "KONTEMPLATE_HELM", default_value = "helm")]
    pub helm: PathBuf,

    /// Enable debug output
    #[arg(long, global = true)]
    pub debug: bool,

    /// Exit non-zero when any template file failed to render
    #[arg(long, global = true)]
    pub strict: bool,
}

impl GlobalOptions {
    pub fn tools(&self) -> Tools {
        Tools {
            kubectl: self.kubectl.clone(),
            helm: self.helm.clone(),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Render resource sets and print them, or write them to a directory
    Template {
        /// Cluster configuration file
        file: PathBuf,

        /// Write one file per rendered template into this directory
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Render resource sets and apply them with kubectl / helm
    Apply {
        /// Cluster configuration file
        file: PathBuf,

        /// Only print what would be applied
        #[arg(long)]
        dry_run: bool,
    },

    /// Render resource sets and replace them with kubectl / helm
    Replace {
        /// Cluster configuration file
        file: PathBuf,
    },

    /// Render resource sets and delete them with kubectl
    Delete {
        /// Cluster configuration file
        file: PathBuf,
    },

    /// Render resource sets and create them with kubectl / helm
    Create {
        /// Cluster configuration file
        file: PathBuf,
    },

    /// Print version information
    Version,
}

fn init_logging(debug: bool) {
    let default_level = if debug { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .with_target(false)
        .init();
}

fn main() {
    // Setup miette for nice error display
    miette::set_panic_hook();

    let cli = Cli::parse();
    init_logging(cli.global.debug);

    let result = match cli.command {
        Commands::Template { file, output } => {
            commands::template::run(&file, output.as_deref(), &cli.global)
        }
        Commands::Apply { file, dry_run } => {
            commands::deploy::run(&file, DispatchMode::Apply { dry_run }, &cli.global)
        }
        Commands::Replace { file } => {
            commands::deploy::run(&file, DispatchMode::Replace, &cli.global)
        }
        Commands::Delete { file } => {
            commands::deploy::run(&file, DispatchMode::Delete, &cli.global)
        }
        Commands::Create { file } => {
            commands::deploy::run(&file, DispatchMode::Create, &cli.global)
        }
        Commands::Version => {
            commands::version::run();
            Ok(())
        }
    };

    match result {
        Ok(()) => std::process::exit(exit_codes::SUCCESS),
        Err(err) => {
            let code = err.exit_code();
            eprintln!("{:?}", miette::Report::new(err));
            std::process::exit(code);
        }
    }
}
