//! Application orchestrator.
//! Loads/merges config, initializes logging, plans descriptors from the command
//! line, runs the scheduler, and prints one result line per file.

use anyhow::{anyhow, bail, Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error};
use walkdir::WalkDir;

use batch_mover::cli::{Args, SourceSpec};
use batch_mover::descriptor::lock;
use batch_mover::output as out;
use batch_mover::progress::{LogCompletion, LogObserver};
use batch_mover::{
    default_config_path, default_log_path, load_config, plan_descriptor, Config, MoveJob,
    MoveScheduler, MoveStatus, SharedDescriptor,
};

use crate::logging::init_tracing;

/// Run the CLI application.
pub fn run(args: Args) -> Result<()> {
    if args.print_config {
        match default_config_path() {
            Some(p) => {
                out::print_info(&format!("batch_mover config path:\n  {}", p.display()));
                if !p.exists() {
                    out::print_info("No config file exists there; built-in defaults apply.");
                }
                if let Some(log) = default_log_path() {
                    out::print_info(&format!("Suggested log file:\n  {}", log.display()));
                }
            }
            None => out::print_error("Could not determine a config path"),
        }
        return Ok(());
    }

    // Defaults < XML < CLI.
    let mut cfg = load_config()?;
    args.apply_overrides(&mut cfg);

    let _guard = init_tracing(&cfg.log_level, cfg.log_file.as_deref(), args.json).map_err(|e| {
        out::print_error(&format!("Failed to initialize logging: {e}"));
        e
    })?;
    debug!("Starting batch_mover: {:?}", args);

    cfg.validate()?;

    let (planned, plan_failures) = plan_batch(&cfg, &args.source_specs());
    if planned.is_empty() {
        bail!("nothing to move");
    }

    let mut scheduler = MoveScheduler::start(
        (&cfg).into(),
        cfg.settings.clone(),
        Arc::new(LogCompletion),
    )?;

    let shutdown = scheduler.shutdown_handle();
    ctrlc::set_handler(move || {
        out::print_warn("Received interrupt; cancelling outstanding moves...");
        shutdown.trigger();
    })
    .context("install signal handler")?;

    let jobs = planned
        .iter()
        .map(|(original, d)| {
            let label = original.display().to_string();
            MoveJob::new(Arc::clone(d)).with_observer(Arc::new(LogObserver::new(label)))
        })
        .collect();
    scheduler.submit(jobs)?;
    let report = scheduler.wait();

    for (original, d) in &planned {
        let d = lock(d);
        let detail = match d.status() {
            MoveStatus::Renamed => format!("{} -> {}", original.display(), d.source().display()),
            _ => original.display().to_string(),
        };
        out::print_move(d.status(), &detail);
    }

    if plan_failures > 0 || !report.all_succeeded() {
        error!(
            planned = report.total,
            unplanned = plan_failures,
            failed = report.failed,
            not_found = report.not_found,
            "Some files were not moved"
        );
        return Err(anyhow!(
            "{} of {} files not moved",
            report.total - report.renamed + plan_failures,
            report.total + plan_failures
        ));
    }
    Ok(())
}

/// Turn command-line specs into descriptors. Directories contribute every file
/// beneath them under their own names. Returns the descriptors (with their
/// original paths) and the number of specs that could not be planned.
fn plan_batch(cfg: &Config, specs: &[SourceSpec]) -> (Vec<(PathBuf, SharedDescriptor)>, usize) {
    let mut planned = Vec::new();
    let mut failures = 0;

    let mut plan_one = |path: PathBuf, new_name: Option<&str>| {
        match plan_descriptor(&path, new_name, &cfg.destination_root, &cfg.settings) {
            Ok(d) => planned.push((path, d.share())),
            Err(e) => {
                let status = if path.exists() {
                    MoveStatus::Failed
                } else {
                    MoveStatus::NotFound
                };
                out::print_move(status, &format!("{}: {e:#}", path.display()));
                failures += 1;
            }
        }
    };

    for spec in specs {
        if spec.path.is_dir() {
            if spec.new_name.is_some() {
                out::print_warn(&format!(
                    "Ignoring new name for directory {}",
                    spec.path.display()
                ));
            }
            for entry in WalkDir::new(&spec.path)
                .min_depth(1)
                .into_iter()
                .filter_map(Result::ok)
                .filter(|e| e.file_type().is_file())
            {
                plan_one(entry.into_path(), None);
            }
        } else {
            plan_one(spec.path.clone(), spec.new_name.as_deref());
        }
    }
    (planned, failures)
}
