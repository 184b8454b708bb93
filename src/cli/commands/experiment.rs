//! Implementation of the `ideaflow experiment` commands.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use uuid::Uuid;

use crate::adapters::sqlite::{
    initialize_database, SqliteCatalogRepository, SqliteExperimentRepository,
    SqliteParticipationRepository,
};
use crate::cli::commands::catalog::resolve_group;
use crate::cli::display::{list_table, render_list};
use crate::cli::output::{output, truncate, CommandOutput};
use crate::domain::models::GroupRole;
use crate::domain::ports::ExperimentFilter;
use crate::infrastructure::config::ConfigLoader;
use crate::services::ExperimentService;

#[derive(Args, Debug)]
pub struct ExperimentArgs {
    #[command(subcommand)]
    pub command: ExperimentCommands,
}

#[derive(Subcommand, Debug)]
pub enum ExperimentCommands {
    /// Create a new experiment
    Create {
        /// Experiment name
        name: String,
        /// Experiment description
        #[arg(short, long, default_value = "")]
        description: String,
        /// Participant name of the owning researcher
        #[arg(short, long)]
        owner: Option<String>,
        /// Maximum stimuli per participation (0 or below = unlimited)
        #[arg(short, long, default_value = "-1")]
        limit: i64,
        /// Starting expansion rate in [0, 1]
        #[arg(short, long, default_value = "0.2")]
        rate: f64,
    },
    /// List experiments
    List {
        /// Only show running experiments
        #[arg(long)]
        running: bool,
    },
    /// Show an experiment and its attached groups
    Show {
        /// Experiment ID
        id: Uuid,
    },
    /// Attach an idea group with a role
    AttachGroup {
        /// Experiment ID
        id: Uuid,
        /// Group name or ID
        group: String,
        /// Group role (fixation or expansion)
        role: String,
    },
    /// Open the experiment to participants
    Start {
        /// Experiment ID
        id: Uuid,
    },
    /// Close the experiment to participants
    Stop {
        /// Experiment ID
        id: Uuid,
    },
    /// Review aggregate results
    Results {
        /// Experiment ID
        id: Uuid,
    },
}

#[derive(Debug, serde::Serialize)]
pub struct ExperimentOutput {
    pub id: String,
    pub name: String,
    pub description: String,
    pub owner: Option<String>,
    pub running: bool,
    pub idea_limit: Option<u32>,
    pub starting_expansion_rate: f64,
}

#[derive(Debug, serde::Serialize)]
pub struct ExperimentListOutput {
    pub experiments: Vec<ExperimentOutput>,
    pub total: usize,
}

impl CommandOutput for ExperimentListOutput {
    fn to_human(&self) -> String {
        let mut table = list_table(&["id", "name", "running", "limit", "rate", "owner"]);
        for exp in &self.experiments {
            table.add_row(vec![
                exp.id[..8].to_string(),
                truncate(&exp.name, 30),
                exp.running.to_string(),
                exp.idea_limit.map_or_else(|| "-".to_string(), |l| l.to_string()),
                format!("{:.2}", exp.starting_expansion_rate),
                exp.owner.clone().unwrap_or_else(|| "-".to_string()),
            ]);
        }
        render_list("experiment", &table, self.total)
    }
}

#[derive(Debug, serde::Serialize)]
pub struct AttachedGroupOutput {
    pub group: String,
    pub role: String,
}

#[derive(Debug, serde::Serialize)]
pub struct ExperimentDetailOutput {
    pub experiment: ExperimentOutput,
    pub groups: Vec<AttachedGroupOutput>,
}

impl CommandOutput for ExperimentDetailOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![
            format!("Experiment: {}", self.experiment.name),
            format!("ID: {}", self.experiment.id),
            format!("Running: {}", self.experiment.running),
            format!(
                "Limit: {}",
                self.experiment
                    .idea_limit
                    .map_or_else(|| "unlimited".to_string(), |l| l.to_string())
            ),
            format!("Starting rate: {:.2}", self.experiment.starting_expansion_rate),
            format!("Description: {}", self.experiment.description),
        ];
        if let Some(owner) = &self.experiment.owner {
            lines.push(format!("Owner: {owner}"));
        }
        if !self.groups.is_empty() {
            lines.push("\nAttached groups:".to_string());
            for group in &self.groups {
                lines.push(format!("  - {} ({})", group.group, group.role));
            }
        }
        lines.join("\n")
    }
}

#[derive(Debug, serde::Serialize)]
pub struct ExperimentActionOutput {
    pub success: bool,
    pub message: String,
}

impl CommandOutput for ExperimentActionOutput {
    fn to_human(&self) -> String {
        self.message.clone()
    }
}

#[derive(Debug, serde::Serialize)]
pub struct ResultRowOutput {
    pub seq: u32,
    pub idea: String,
    pub did_expand: bool,
    pub expansion_rate: f64,
    pub reaction: String,
}

#[derive(Debug, serde::Serialize)]
pub struct ParticipationOutput {
    pub participant: String,
    pub finished: bool,
    pub expansion_rate: f64,
    pub responses: Vec<ResultRowOutput>,
}

#[derive(Debug, serde::Serialize)]
pub struct ResultsOutput {
    pub experiment: String,
    pub participations: Vec<ParticipationOutput>,
}

impl CommandOutput for ResultsOutput {
    fn to_human(&self) -> String {
        if self.participations.is_empty() {
            return format!("No participations recorded for {}.", self.experiment);
        }

        let mut lines = vec![format!("Results for {}:", self.experiment)];
        for participation in &self.participations {
            lines.push(format!(
                "\n{} (finished: {}, final rate: {:.2})",
                participation.participant, participation.finished, participation.expansion_rate
            ));
            let mut table = list_table(&["seq", "idea", "expanded", "rate", "reaction"]);
            for row in &participation.responses {
                table.add_row(vec![
                    row.seq.to_string(),
                    truncate(&row.idea, 50),
                    row.did_expand.to_string(),
                    format!("{:.2}", row.expansion_rate),
                    row.reaction.clone(),
                ]);
            }
            lines.push(table.to_string());
        }
        lines.join("\n")
    }
}

pub async fn execute(args: ExperimentArgs, json_mode: bool) -> Result<()> {
    let config = ConfigLoader::load().context("Failed to load configuration")?;
    let database_url = format!("sqlite:{}", config.database.path);
    let pool = initialize_database(&database_url, config.database.max_connections)
        .await
        .context("Failed to initialize database. Run 'ideaflow init' first.")?;

    let experiments = Arc::new(SqliteExperimentRepository::new(pool.clone()));
    let participations = Arc::new(SqliteParticipationRepository::new(pool.clone()));
    let catalog = Arc::new(SqliteCatalogRepository::new(pool));
    let service = ExperimentService::new(experiments, participations, catalog.clone());

    match args.command {
        ExperimentCommands::Create { name, description, owner, limit, rate } => {
            let experiment = service
                .create_experiment(name, description, owner, limit, rate)
                .await?;
            let output_data = ExperimentActionOutput {
                success: true,
                message: format!("Created experiment {} ({})", experiment.name, experiment.id),
            };
            output(&output_data, json_mode);
        }

        ExperimentCommands::List { running } => {
            let filter = ExperimentFilter {
                running: running.then_some(true),
                ..Default::default()
            };
            let experiments = service.list_experiments(filter).await?;
            let outputs: Vec<ExperimentOutput> =
                experiments.into_iter().map(to_experiment_output).collect();
            let total = outputs.len();
            output(&ExperimentListOutput { experiments: outputs, total }, json_mode);
        }

        ExperimentCommands::Show { id } => {
            let experiment = service
                .get_experiment(id)
                .await?
                .ok_or_else(|| anyhow::anyhow!("Experiment not found: {id}"))?;
            let groups = service
                .attached_groups(id)
                .await?
                .into_iter()
                .map(|(link, group)| AttachedGroupOutput {
                    group: group.name,
                    role: link.role.as_str().to_string(),
                })
                .collect();
            let output_data = ExperimentDetailOutput {
                experiment: to_experiment_output(experiment),
                groups,
            };
            output(&output_data, json_mode);
        }

        ExperimentCommands::AttachGroup { id, group, role } => {
            let role = GroupRole::from_str(&role)
                .ok_or_else(|| anyhow::anyhow!("Invalid role: {role} (expected fixation or expansion)"))?;
            let group = resolve_group(&catalog, &group).await?;
            service.attach_group(id, group.id, role).await?;
            let output_data = ExperimentActionOutput {
                success: true,
                message: format!("Attached group {} as {}", group.name, role),
            };
            output(&output_data, json_mode);
        }

        ExperimentCommands::Start { id } => {
            let experiment = service.set_running(id, true).await?;
            let output_data = ExperimentActionOutput {
                success: true,
                message: format!("Experiment {} is now running", experiment.name),
            };
            output(&output_data, json_mode);
        }

        ExperimentCommands::Stop { id } => {
            let experiment = service.set_running(id, false).await?;
            let output_data = ExperimentActionOutput {
                success: true,
                message: format!("Experiment {} is now stopped", experiment.name),
            };
            output(&output_data, json_mode);
        }

        ExperimentCommands::Results { id } => {
            // CLI access is the researcher's own machine; the owner gate
            // applies to the HTTP route only.
            let results = service.results(id, None).await?;
            let output_data = ResultsOutput {
                experiment: results.experiment.name.clone(),
                participations: results
                    .participations
                    .into_iter()
                    .map(|p| ParticipationOutput {
                        participant: p.participation.participant,
                        finished: p.participation.finished,
                        expansion_rate: p.participation.expansion_rate,
                        responses: p
                            .rows
                            .into_iter()
                            .map(|row| ResultRowOutput {
                                seq: row.entry.seq,
                                idea: row.idea_value,
                                did_expand: row.entry.did_expand,
                                expansion_rate: row.entry.expansion_rate,
                                reaction: row.entry.reaction.as_str().to_string(),
                            })
                            .collect(),
                    })
                    .collect(),
            };
            output(&output_data, json_mode);
        }
    }

    Ok(())
}

fn to_experiment_output(experiment: crate::domain::models::Experiment) -> ExperimentOutput {
    ExperimentOutput {
        id: experiment.id.to_string(),
        name: experiment.name,
        description: experiment.description,
        owner: experiment.owner,
        running: experiment.running,
        idea_limit: experiment.idea_limit,
        starting_expansion_rate: experiment.starting_expansion_rate,
    }
}
