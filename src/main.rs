use std::{path::PathBuf, process};

use anyhow::Result;
use clap::{Parser, Subcommand};

use vrm_denormalizer::logging::init_logging;
use vrm_denormalizer::project::{ExportSettings, load_export_settings, save_export_settings};
use vrm_denormalizer::vrm::{
    AnalysisReport, DenormalizeReport, analyze_avatar, denormalize_avatar, write_report,
};

/// Rebuild a canonical humanoid skeleton for VRM avatars
#[derive(Parser)]
#[command(name = "vrm-denormalize")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect the humanoid definition of a VRM file
    Analyze {
        /// Input .vrm / .glb file
        input: PathBuf,
    },

    /// Denormalize the skeleton and write a new VRM file
    Convert {
        /// Input .vrm / .glb file
        input: PathBuf,

        /// Output file
        output: PathBuf,

        /// Export settings JSON (see `init-settings`)
        #[arg(short, long)]
        settings: Option<PathBuf>,

        /// Also write the conversion report to this path
        #[arg(short, long)]
        report: Option<PathBuf>,
    },

    /// Write default export settings to a JSON file
    InitSettings {
        /// Destination path
        path: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(err) = run(cli.command) {
        eprintln!("{err:#}");
        process::exit(1);
    }
}

fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Analyze { input } => {
            let report = analyze_avatar(&input)?;
            print_analysis(&report);
        }
        Commands::Convert {
            input,
            output,
            settings,
            report,
        } => {
            let settings = match settings {
                Some(path) => load_export_settings(&path)?,
                None => ExportSettings::default(),
            };
            let result = denormalize_avatar(&input, &output, &settings)?;
            if let Some(path) = report {
                write_report(&path, &result)?;
            }
            print_conversion(&result);
        }
        Commands::InitSettings { path } => {
            save_export_settings(&path, &ExportSettings::default())?;
            println!("Settings written: {}", path.display());
        }
    }

    Ok(())
}

fn print_analysis(report: &AnalysisReport) {
    println!("Model: {}", report.model_name);
    if let Some(author) = &report.author {
        println!("Author: {author}");
    }
    println!("Nodes: {}, Meshes: {}", report.node_count, report.mesh_count);
    println!("Humanoid bones: {}", report.present_bones.len());
    if let Some(armature) = &report.armature_name {
        println!("Armature: {armature}");
    }
    if !report.missing_required_bones.is_empty() {
        println!(
            "Missing required bones: {}",
            report.missing_required_bones.join(", ")
        );
    }
    for issue in &report.issues {
        println!("[{:?}] {}: {}", issue.severity, issue.code, issue.message);
    }
}

fn print_conversion(report: &DenormalizeReport) {
    println!("Model: {}", report.model_name);
    println!("Output: {}", report.output_path);
    println!(
        "Nodes: {} -> {}",
        report.node_count_before, report.node_count_after
    );
    println!("Bound bones: {}", report.bound_bones.len());
    println!(
        "Armature created: {}",
        if report.armature_created { "yes" } else { "no" }
    );
    for renamed in &report.renamed_nodes {
        println!("Renamed: {} -> {}", renamed.old_name, renamed.new_name);
    }
    for issue in &report.issues {
        println!("[{:?}] {}: {}", issue.severity, issue.code, issue.message);
    }
}
