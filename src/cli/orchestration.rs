//! Command workflows
//!
//! `main.rs` only parses arguments and sets up logging. The work of each
//! subcommand lives here so it can be called programmatically without
//! depending on clap.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use crate::ci::{JobTemplates, StaticJobTemplates, UnavailableJobTemplates};
use crate::config::Config;
use crate::domain::deliverable::{DeliverableFile, DeliverableIndex};
use crate::domain::series::{SeriesStatus, INDEPENDENT};
use crate::git::{modified_deliverable_files, Git2Workspace};
use crate::governance::{Governance, StaticGovernance, UnavailableGovernance};
use crate::increment::{ReleasePlan, ReleasePlanner, ReleaseType};
use crate::ui;
use crate::validate::{
    Collaborators, FileOutcome, ScratchDir, ValidationContext, ValidationReport, Validator,
};

/// Arguments for the `validate` command
#[derive(Debug, Clone, PartialEq)]
pub struct ValidateArgs {
    /// Deliverable files; empty means the files touched by the last commit
    pub inputs: Vec<PathBuf>,

    /// Stop at the first error
    pub debug: bool,

    /// Remove cloned repositories when done
    pub cleanup: bool,
}

impl Default for ValidateArgs {
    fn default() -> Self {
        ValidateArgs {
            inputs: Vec::new(),
            debug: false,
            cleanup: true,
        }
    }
}

/// Arguments for the `new-release` command
#[derive(Debug, Clone, PartialEq)]
pub struct NewReleaseArgs {
    pub series: String,
    pub deliverable: String,
    pub release_type: ReleaseType,

    /// Release even when no repository changed
    pub force: bool,

    /// Also create the stable branch for the series
    pub stable_branch: bool,

    /// Show the plan without writing the deliverable file
    pub dry_run: bool,
}

fn load_series_status(config: &Config) -> Result<SeriesStatus> {
    match &config.release.series_status_file {
        Some(path) if path.exists() => SeriesStatus::load(path)
            .with_context(|| format!("Failed to load series status from {}", path.display())),
        Some(path) => {
            tracing::warn!("series status file {} not found, using defaults", path.display());
            Ok(SeriesStatus::default())
        }
        None => Ok(SeriesStatus::default()),
    }
}

fn load_index(config: &Config) -> Result<DeliverableIndex> {
    let root = &config.release.deliverables_dir;
    if !root.is_dir() {
        tracing::warn!("deliverables directory {} not found", root.display());
        return Ok(DeliverableIndex::default());
    }
    DeliverableIndex::load(root)
        .with_context(|| format!("Failed to load deliverables from {}", root.display()))
}

fn load_governance(config: &Config) -> Result<Box<dyn Governance>> {
    match &config.governance.projects_file {
        Some(path) if path.exists() => {
            let governance = StaticGovernance::load(path).with_context(|| {
                format!("Failed to load governance data from {}", path.display())
            })?;
            Ok(Box::new(governance))
        }
        Some(path) => Ok(Box::new(UnavailableGovernance::new(format!(
            "governance file {} not found",
            path.display()
        )))),
        None => Ok(Box::new(UnavailableGovernance::new(
            "no governance projects file configured",
        ))),
    }
}

fn load_job_templates(config: &Config) -> Result<Box<dyn JobTemplates>> {
    match &config.ci.job_templates_file {
        Some(path) if path.exists() => {
            let jobs = StaticJobTemplates::load(path).with_context(|| {
                format!("Failed to load job templates from {}", path.display())
            })?;
            Ok(Box::new(jobs))
        }
        Some(path) => Ok(Box::new(UnavailableJobTemplates::new(format!(
            "job templates file {} not found",
            path.display()
        )))),
        None => Ok(Box::new(UnavailableJobTemplates::new(
            "no job templates file configured",
        ))),
    }
}

/// The configured series, else the newest one under development
pub fn current_series(config: &Config, status: &SeriesStatus, index: &DeliverableIndex) -> String {
    if let Some(series) = &config.release.current_series {
        return series.clone();
    }
    if let Some(series) = status.current_series() {
        return series;
    }
    index
        .series_names()
        .into_iter()
        .filter(|s| s != INDEPENDENT)
        .last()
        .unwrap_or_default()
}

/// Check each file in order and collect the report
pub fn validate_files(
    paths: &[PathBuf],
    validator: &Validator,
    ctx: &mut ValidationContext,
) -> Result<ValidationReport> {
    for path in paths {
        ui::display_header(&format!("Checking {}", path.display()));
        match validator.validate_file(path, ctx)? {
            FileOutcome::Deleted => ui::display_status("File was deleted, skipping."),
            FileOutcome::ClosedSeries(series) => ui::display_status(&format!(
                "File is part of the closed series {}, skipping",
                series
            )),
            FileOutcome::Checked => {}
        }
    }
    Ok(ValidationReport::from_context(ctx))
}

/// The `validate` command
pub fn run_validation(args: ValidateArgs, config: &Config) -> Result<ValidationReport> {
    let inputs = if args.inputs.is_empty() {
        let cwd = std::env::current_dir()?;
        modified_deliverable_files(&cwd).context("Failed to list files changed by HEAD")?
    } else {
        args.inputs.clone()
    };
    if inputs.is_empty() {
        ui::display_warning("no modified deliverable files and no arguments, skipping validation");
        return Ok(ValidationReport::default());
    }

    let series_status = load_series_status(config)?;
    let index = load_index(config)?;
    let current = current_series(config, &series_status, &index);
    tracing::debug!(current_series = %current, "loaded release data");

    let scratch = ScratchDir::new(args.cleanup)?;
    let scratch_path = scratch.path().to_path_buf();
    let kept = scratch.is_kept();
    let collaborators = Collaborators {
        git: Box::new(Git2Workspace::new(&scratch_path, &config.git.base_url)),
        governance: load_governance(config)?,
        jobs: load_job_templates(config)?,
    };

    let mut ctx = ValidationContext::new(collaborators, series_status, index, current)
        .with_debug(args.debug)
        .with_scratch(scratch);
    let validator = Validator::new(config.release.closed_series.clone());

    let report = validate_files(&inputs, &validator, &mut ctx)?;
    ui::display_summary(&report);
    if kept {
        ui::display_status(&format!("leaving scratch workspace {}", scratch_path.display()));
    }
    Ok(report)
}

/// `<deliverables_dir>/<series>/<name>.yaml`, with `_independent` for
/// independent deliverables
pub fn deliverable_path(root: &Path, series: &str, name: &str) -> PathBuf {
    let dir = if series == INDEPENDENT {
        format!("_{}", INDEPENDENT)
    } else {
        series.to_string()
    };
    root.join(dir).join(format!("{}.yaml", name))
}

/// Append a plan to the deliverable file on disk
pub fn write_release(path: &Path, plan: &ReleasePlan) -> Result<()> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let mut file = DeliverableFile::from_yaml_str(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    plan.apply(&mut file);
    fs::write(path, file.to_yaml_string()?)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

/// The `new-release` command
pub fn run_new_release(args: NewReleaseArgs, config: &Config) -> Result<ReleasePlan> {
    let index = load_index(config)?;
    let history = index.history(&args.deliverable);
    if history.is_empty() {
        bail!(
            "no deliverable named {} under {}",
            args.deliverable,
            config.release.deliverables_dir.display()
        );
    }

    let scratch = ScratchDir::new(true)?;
    let git = Git2Workspace::new(scratch.path(), &config.git.base_url);
    let plan = ReleasePlanner::new(&git)
        .force(args.force)
        .stable_branch(args.stable_branch)
        .plan(&history, &args.series, args.release_type)?;

    ui::display_release_plan(&plan);

    if !plan.has_changes {
        ui::display_status(&format!(
            "no changes since {}, nothing to release (use --force to release anyway)",
            plan.previous_version
        ));
        return Ok(plan);
    }
    let path = deliverable_path(&config.release.deliverables_dir, &args.series, &args.deliverable);
    if args.dry_run {
        ui::display_status(&format!("Dry run: not updating {}", path.display()));
        return Ok(plan);
    }

    write_release(&path, &plan)?;
    ui::display_success(&format!("Added {} to {}", plan.version, path.display()));
    Ok(plan)
}
