//! Architectural kernel command-line host
//!
//! Usage:
//!   ak replay --project house.ron --script edits.ron [--config kernel.ron] [--output out.ron]
//!   ak inspect --project house.ron

mod script;

use std::path::{Path, PathBuf};

use ak_core::{ConfigError, EntityKind, KernelConfig, Project, ProjectError, Session};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::script::{EditScript, replay};

#[derive(Parser, Debug)]
#[command(name = "ak")]
#[command(about = "Replay edit scripts against architectural projects")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Apply an edit script to a project
    Replay {
        /// Project file (RON)
        #[arg(short, long)]
        project: PathBuf,

        /// Edit script (RON)
        #[arg(short, long)]
        script: PathBuf,

        /// Kernel configuration (RON); defaults are used when omitted
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Where to save the edited project
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print a summary of a project
    Inspect {
        /// Project file (RON)
        #[arg(short, long)]
        project: PathBuf,
    },
}

/// Errors surfaced by the command-line host
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Project(#[from] ProjectError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Script error: {0}")]
    Script(String),
    #[error("IO error: {0}")]
    Io(String),
}

fn main() -> Result<(), CliError> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ak_cli=info,ak_core=info,ak_sketch=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match Cli::parse().command {
        Commands::Replay {
            project,
            script,
            config,
            output,
        } => run_replay(&project, &script, config.as_deref(), output.as_deref()),
        Commands::Inspect { project } => run_inspect(&project),
    }
}

fn run_replay(
    project_path: &Path,
    script_path: &Path,
    config_path: Option<&Path>,
    output_path: Option<&Path>,
) -> Result<(), CliError> {
    let config = match config_path {
        Some(path) => KernelConfig::load(path)?,
        None => KernelConfig::default(),
    };
    let project = Project::load(project_path)?;
    let script = EditScript::load(script_path)?;
    info!(
        project = %project_path.display(),
        steps = script.steps.len(),
        "Replaying edit script"
    );

    let mut session = Session::from_project(project, config);
    let report = replay(&mut session, &script);

    println!(
        "{} applied, {} rejected, {} without effect",
        report.applied, report.rejected, report.skipped
    );
    println!("History:");
    for (index, (description, category)) in session.history().iter().enumerate() {
        println!("  {:>3}. [{}] {}", index + 1, category, description);
    }

    if let Some(path) = output_path {
        session.into_project().save(path)?;
        info!(output = %path.display(), "Saved project");
    }
    Ok(())
}

fn run_inspect(project_path: &Path) -> Result<(), CliError> {
    let project = Project::load(project_path)?;
    let model = &project.model;

    println!("Project: {} (version {})", project.name, project.version);
    println!("Layers:");
    for layer in model.layers() {
        println!(
            "  {} elevation {} height {}: {} slab faces, {} roof regions",
            layer.name,
            layer.elevation,
            layer.height,
            layer.sketch.len(),
            layer.roofs_drawing.len()
        );
    }
    println!("Entities: {}", model.len());
    for kind in [
        EntityKind::Wall,
        EntityKind::Slab,
        EntityKind::Roof,
        EntityKind::RoofDrawingRegion,
        EntityKind::Window,
        EntityKind::Content,
    ] {
        let count = model.entities_of_kind(kind).count();
        if count > 0 {
            println!("  {kind}: {count}");
        }
    }
    println!("Recycled: {}", model.recycled().count());
    println!("Outdoor faces: {}", model.outdoor_drawing().len());
    Ok(())
}
