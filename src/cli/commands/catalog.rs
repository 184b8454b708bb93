//! Implementation of the `ideaflow catalog` commands.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use uuid::Uuid;

use crate::adapters::sqlite::{initialize_database, SqliteCatalogRepository};
use crate::cli::display::{list_table, render_list};
use crate::cli::output::{output, truncate, CommandOutput};
use crate::domain::models::IdeasGroup;
use crate::domain::ports::CatalogRepository;
use crate::infrastructure::config::ConfigLoader;
use crate::services::CatalogService;

#[derive(Args, Debug)]
pub struct CatalogArgs {
    #[command(subcommand)]
    pub command: CatalogCommands,
}

#[derive(Subcommand, Debug)]
pub enum CatalogCommands {
    /// List idea groups
    List,
    /// Show a group and its ideas
    Show {
        /// Group name or ID
        group: String,
    },
    /// Create a new group
    AddGroup {
        /// Group name
        name: String,
        /// Group description
        #[arg(short, long, default_value = "")]
        description: String,
    },
    /// Create an idea inside a group
    AddIdea {
        /// Group name or ID
        group: String,
        /// Idea text
        value: String,
    },
}

/// Resolve a group argument that may be a UUID or a name.
pub async fn resolve_group(repo: &SqliteCatalogRepository, group: &str) -> Result<IdeasGroup> {
    if let Ok(id) = Uuid::parse_str(group) {
        if let Some(found) = repo.get_group(id).await? {
            return Ok(found);
        }
    }
    repo.get_group_by_name(group)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Group not found: {group}"))
}

#[derive(Debug, serde::Serialize)]
pub struct GroupOutput {
    pub id: String,
    pub name: String,
    pub description: String,
    pub idea_count: usize,
}

#[derive(Debug, serde::Serialize)]
pub struct GroupListOutput {
    pub groups: Vec<GroupOutput>,
    pub total: usize,
}

impl CommandOutput for GroupListOutput {
    fn to_human(&self) -> String {
        let mut table = list_table(&["id", "name", "description", "ideas"]);
        for group in &self.groups {
            table.add_row(vec![
                group.id[..8].to_string(),
                group.name.clone(),
                truncate(&group.description, 40),
                group.idea_count.to_string(),
            ]);
        }
        render_list("group", &table, self.total)
    }
}

#[derive(Debug, serde::Serialize)]
pub struct GroupDetailOutput {
    pub group: GroupOutput,
    pub ideas: Vec<String>,
}

impl CommandOutput for GroupDetailOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![
            format!("Group: {}", self.group.name),
            format!("ID: {}", self.group.id),
            format!("Description: {}", self.group.description),
            format!("\n{} idea(s):", self.ideas.len()),
        ];
        for idea in &self.ideas {
            lines.push(format!("  - {idea}"));
        }
        lines.join("\n")
    }
}

#[derive(Debug, serde::Serialize)]
pub struct CatalogActionOutput {
    pub success: bool,
    pub message: String,
}

impl CommandOutput for CatalogActionOutput {
    fn to_human(&self) -> String {
        self.message.clone()
    }
}

pub async fn execute(args: CatalogArgs, json_mode: bool) -> Result<()> {
    let config = ConfigLoader::load().context("Failed to load configuration")?;
    let database_url = format!("sqlite:{}", config.database.path);
    let pool = initialize_database(&database_url, config.database.max_connections)
        .await
        .context("Failed to initialize database. Run 'ideaflow init' first.")?;

    let repo = Arc::new(SqliteCatalogRepository::new(pool));
    let service = CatalogService::new(repo.clone());

    match args.command {
        CatalogCommands::List => {
            let groups = service.list_groups().await?;
            let mut outputs = Vec::with_capacity(groups.len());
            for group in groups {
                let ideas = repo.list_group_ideas(group.id).await?;
                outputs.push(GroupOutput {
                    id: group.id.to_string(),
                    name: group.name,
                    description: group.description,
                    idea_count: ideas.len(),
                });
            }
            let total = outputs.len();
            output(&GroupListOutput { groups: outputs, total }, json_mode);
        }

        CatalogCommands::Show { group } => {
            let group = resolve_group(&repo, &group).await?;
            let ideas = service.list_group_ideas(group.id).await?;
            let output_data = GroupDetailOutput {
                group: GroupOutput {
                    id: group.id.to_string(),
                    name: group.name,
                    description: group.description,
                    idea_count: ideas.len(),
                },
                ideas: ideas.into_iter().map(|i| i.value).collect(),
            };
            output(&output_data, json_mode);
        }

        CatalogCommands::AddGroup { name, description } => {
            let group = service.create_group(name, description).await?;
            let output_data = CatalogActionOutput {
                success: true,
                message: format!("Created group {} ({})", group.name, group.id),
            };
            output(&output_data, json_mode);
        }

        CatalogCommands::AddIdea { group, value } => {
            let group = resolve_group(&repo, &group).await?;
            let idea = service.add_idea(group.id, value).await?;
            let output_data = CatalogActionOutput {
                success: true,
                message: format!("Added idea {} to group {}", idea.id, group.name),
            };
            output(&output_data, json_mode);
        }
    }

    Ok(())
}
