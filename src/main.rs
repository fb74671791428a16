use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use release_guard::cli::{run_new_release, run_validation, NewReleaseArgs, ValidateArgs};
use release_guard::config;
use release_guard::increment::ReleaseType;
use release_guard::ui;

#[derive(clap::Parser)]
#[command(
    name = "release-guard",
    version,
    about = "Validate release metadata and compute new releases"
)]
struct Args {
    #[arg(short, long, global = true, help = "Custom configuration file path")]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check deliverable files against the release rules
    Validate {
        #[arg(long, help = "Stop at the first error")]
        debug: bool,

        #[arg(long, help = "Do not remove temporary files")]
        no_cleanup: bool,

        #[arg(help = "YAML files to validate, defaults to files changed in the latest commit")]
        inputs: Vec<PathBuf>,
    },

    /// Compute the next release of a deliverable and add it to its file
    NewRelease {
        #[arg(help = "Series to release from")]
        series: String,

        #[arg(help = "Deliverable name")]
        deliverable: String,

        #[arg(help = "bugfix, feature, major, milestone, rc, procedural, eol, em or releasefix")]
        release_type: String,

        #[arg(short, long, help = "Release even if nothing changed")]
        force: bool,

        #[arg(long, help = "Create the stable branch along with the release")]
        stable_branch: bool,

        #[arg(long, help = "Preview the release without writing the file")]
        dry_run: bool,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();
    init_tracing();

    let config = match config::load_config(args.config.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            ui::display_error(&format!("Error loading config: {}", e));
            return Ok(ExitCode::FAILURE);
        }
    };

    match args.command {
        Command::Validate {
            debug,
            no_cleanup,
            inputs,
        } => {
            let validate_args = ValidateArgs {
                inputs,
                debug,
                cleanup: !no_cleanup,
            };
            let report = run_validation(validate_args, &config)?;
            Ok(ExitCode::from(report.exit_code()))
        }
        Command::NewRelease {
            series,
            deliverable,
            release_type,
            force,
            stable_branch,
            dry_run,
        } => {
            let release_type: ReleaseType = release_type.parse()?;
            run_new_release(
                NewReleaseArgs {
                    series,
                    deliverable,
                    release_type,
                    force,
                    stable_branch,
                    dry_run,
                },
                &config,
            )?;
            Ok(ExitCode::SUCCESS)
        }
    }
}
