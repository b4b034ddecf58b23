//! buildconf CLI
//!
//! Entry point for the `buildconf` command-line tool.

use buildconf::config::ConfigFormat;
use buildconf::{resolve_file, resolve_project, ConfigError, Resolution, ResolutionReport, ResolveOptions};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process;

#[derive(Parser)]
#[command(name = "buildconf")]
#[command(about = "Resolve and validate asset build configuration", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve the configuration and print a JSON report
    Resolve {
        #[command(flatten)]
        opts: ResolveArgs,
    },

    /// Validate the configuration and print a short summary
    Check {
        #[command(flatten)]
        opts: ResolveArgs,
    },
}

#[derive(Args)]
struct ResolveArgs {
    /// Config file, or a path without extension to try .toml then .json
    #[arg(long, short = 'c', default_value = "buildconf")]
    config: PathBuf,

    /// Comma-separated environments to apply, in order
    #[arg(long, short = 'e')]
    env: Option<String>,

    /// Apply the production environment first
    #[arg(long, short = 'p', alias = "optimize")]
    production: bool,

    /// Override paths.public
    #[arg(long = "public-path", short = 'o')]
    public_path: Option<String>,

    /// Run the development server (implies a persistent build)
    #[arg(long, short = 's')]
    server: bool,

    /// Development server port
    #[arg(long, short = 'P', requires = "server")]
    port: Option<u16>,

    /// Keep watching after the first build
    #[arg(long, short = 'w')]
    persistent: bool,
}

impl ResolveArgs {
    fn options(&self) -> ResolveOptions {
        ResolveOptions {
            env: self.env.as_deref().map(ResolveOptions::parse_env).unwrap_or_default(),
            production: self.production,
            public_path: self.public_path.clone(),
            server: self.server,
            port: self.port,
            persistent: self.persistent || self.server,
            config_path: None,
            process_env: None,
        }
        .with_process_env()
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Resolve { opts } => run_resolve(&opts),
        Commands::Check { opts } => run_check(&opts),
    }
}

fn resolve(args: &ResolveArgs) -> Result<Resolution, ConfigError> {
    let options = args.options();
    if has_config_extension(&args.config) {
        resolve_file(&args.config, &options)
    } else {
        resolve_project(&args.config, &options)
    }
}

fn has_config_extension(path: &Path) -> bool {
    ConfigFormat::from_path(path).is_some()
}

fn resolve_or_exit(args: &ResolveArgs) -> Resolution {
    match resolve(args) {
        Ok(resolution) => resolution,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            process::exit(e.exit_code());
        }
    }
}

fn run_resolve(args: &ResolveArgs) {
    let report = ResolutionReport::from_resolution(&resolve_or_exit(args));
    match report.to_json() {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Error serializing output: {}", e);
            process::exit(1);
        }
    }
}

fn run_check(args: &ResolveArgs) {
    let report = ResolutionReport::from_resolution(&resolve_or_exit(args));
    for diagnostic in &report.diagnostics {
        println!("  warning: {}", diagnostic.message);
    }
    println!("{}", report.human_summary());
}
