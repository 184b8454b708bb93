//! Implementation of the `ideaflow init` command.

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use tokio::fs;

use crate::adapters::sqlite::initialize_database;
use crate::cli::output::{output, CommandOutput};
use crate::domain::models::Config;

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Force reinitialization even if already initialized
    #[arg(long, short)]
    pub force: bool,

    /// Target directory (defaults to current directory)
    #[arg(default_value = ".")]
    pub path: PathBuf,
}

#[derive(Debug, serde::Serialize)]
pub struct InitOutput {
    pub success: bool,
    pub message: String,
    pub initialized_path: PathBuf,
    pub config_written: bool,
    pub database_initialized: bool,
}

impl CommandOutput for InitOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![self.message.clone()];
        if self.config_written {
            lines.push("Wrote .ideaflow/config.yaml".to_string());
        }
        if self.database_initialized {
            lines.push("Database initialized at .ideaflow/ideaflow.db".to_string());
        }
        lines.join("\n")
    }
}

pub async fn execute(args: InitArgs, json_mode: bool) -> Result<()> {
    let target_path = if args.path.is_absolute() {
        args.path.clone()
    } else {
        std::env::current_dir()
            .context("Failed to get current directory")?
            .join(&args.path)
    };

    let ideaflow_dir = target_path.join(".ideaflow");

    if ideaflow_dir.exists() && !args.force {
        let output_data = InitOutput {
            success: false,
            message: "Project already initialized. Use --force to reinitialize.".to_string(),
            initialized_path: target_path,
            config_written: false,
            database_initialized: false,
        };
        output(&output_data, json_mode);
        return Ok(());
    }

    if args.force && ideaflow_dir.exists() {
        fs::remove_dir_all(&ideaflow_dir)
            .await
            .context("Failed to remove existing .ideaflow directory")?;
    }

    fs::create_dir_all(&ideaflow_dir)
        .await
        .with_context(|| format!("Failed to create {ideaflow_dir:?}"))?;

    let config = Config::default();
    let config_yaml = serde_yaml::to_string(&config).context("Failed to serialize default config")?;
    fs::write(ideaflow_dir.join("config.yaml"), config_yaml)
        .await
        .context("Failed to write config.yaml")?;

    let db_path = ideaflow_dir.join("ideaflow.db");
    let db_url = format!("sqlite:{}", db_path.display());
    initialize_database(&db_url, config.database.max_connections)
        .await
        .context("Failed to initialize database")?;

    let output_data = InitOutput {
        success: true,
        message: if args.force {
            "Project reinitialized successfully.".to_string()
        } else {
            "Project initialized successfully.".to_string()
        },
        initialized_path: target_path,
        config_written: true,
        database_initialized: true,
    };

    output(&output_data, json_mode);
    Ok(())
}
