//! CLI type definitions
//!
//! This module contains clap command structures that define the CLI interface.

use clap::{Parser, Subcommand};

use crate::cli::commands::{
    catalog::CatalogArgs, experiment::ExperimentArgs, init::InitArgs, seed::SeedArgs,
    serve::ServeArgs,
};

#[derive(Parser)]
#[command(name = "ideaflow")]
#[command(about = "Ideaflow - adaptive idea-presentation experiment platform", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize ideaflow configuration and database
    Init(InitArgs),

    /// Start the participant-facing HTTP portal
    Serve(ServeArgs),

    /// Import a YAML catalog of idea groups
    Seed(SeedArgs),

    /// Experiment administration commands
    Experiment(ExperimentArgs),

    /// Stimulus catalog commands
    Catalog(CatalogArgs),
}
