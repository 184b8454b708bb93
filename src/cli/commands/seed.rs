//! Implementation of the `ideaflow seed` command.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;

use crate::adapters::sqlite::{initialize_database, SqliteCatalogRepository};
use crate::cli::output::{output, CommandOutput};
use crate::infrastructure::config::ConfigLoader;
use crate::services::{CatalogService, SeedCatalog};

#[derive(Args, Debug)]
pub struct SeedArgs {
    /// Path to a YAML catalog file
    pub file: PathBuf,
}

#[derive(Debug, serde::Serialize)]
pub struct SeedOutput {
    pub groups_created: usize,
    pub groups_skipped: usize,
    pub ideas_created: usize,
}

impl CommandOutput for SeedOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![format!(
            "Imported {} group(s) with {} idea(s).",
            self.groups_created, self.ideas_created
        )];
        if self.groups_skipped > 0 {
            lines.push(format!(
                "Skipped {} existing group(s).",
                self.groups_skipped
            ));
        }
        lines.join("\n")
    }
}

pub async fn execute(args: SeedArgs, json_mode: bool) -> Result<()> {
    let config = ConfigLoader::load().context("Failed to load configuration")?;

    let content = tokio::fs::read_to_string(&args.file)
        .await
        .with_context(|| format!("Failed to read catalog file {:?}", args.file))?;
    let catalog: SeedCatalog =
        serde_yaml::from_str(&content).context("Failed to parse catalog YAML")?;

    let database_url = format!("sqlite:{}", config.database.path);
    let pool = initialize_database(&database_url, config.database.max_connections)
        .await
        .context("Failed to initialize database. Run 'ideaflow init' first.")?;

    let service = CatalogService::new(Arc::new(SqliteCatalogRepository::new(pool)));
    let summary = service.import_catalog(catalog).await?;

    let output_data = SeedOutput {
        groups_created: summary.groups_created,
        groups_skipped: summary.groups_skipped,
        ideas_created: summary.ideas_created,
    };
    output(&output_data, json_mode);
    Ok(())
}
