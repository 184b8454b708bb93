//! Experiment domain model.
//!
//! An experiment references groups of ideas through a typed join: each
//! attached group plays either the fixation or the expansion role, and the
//! selection engine draws from one pool or the other according to the
//! participation's current expansion rate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role a group of ideas plays within an experiment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupRole {
    /// Ideas shown while the participant stays on the current track
    Fixation,
    /// Ideas shown when the algorithm decides to expand
    Expansion,
}

impl GroupRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fixation => "fixation",
            Self::Expansion => "expansion",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "fixation" => Some(Self::Fixation),
            "expansion" => Some(Self::Expansion),
            _ => None,
        }
    }
}

impl std::fmt::Display for GroupRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed link between an experiment and an ideas group.
///
/// A given group appears at most once per experiment, whatever its role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExperimentGroup {
    pub experiment_id: Uuid,
    pub group_id: Uuid,
    pub role: GroupRole,
}

/// A behavioral experiment definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Experiment {
    /// Unique identifier
    pub id: Uuid,
    /// Human-readable name
    pub name: String,
    /// Detailed description shown to participants
    pub description: String,
    /// Participant name of the researcher owning this experiment
    pub owner: Option<String>,
    /// Whether participants may currently join
    pub running: bool,
    /// Maximum number of stimuli per participation (None = unlimited)
    pub idea_limit: Option<u32>,
    /// Expansion rate assigned to new participations, in [0, 1]
    pub starting_expansion_rate: f64,
    /// When this experiment was created
    pub created_at: DateTime<Utc>,
    /// When this experiment was last updated
    pub updated_at: DateTime<Utc>,
}

impl Experiment {
    /// Create a new (not yet running) experiment.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: description.into(),
            owner: None,
            running: false,
            idea_limit: None,
            starting_expansion_rate: 0.2,
            created_at: now,
            updated_at: now,
        }
    }

    /// Set the owner of this experiment.
    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    /// Set the per-participation stimulus limit.
    ///
    /// Values of zero or below mean "unlimited" and normalize to None.
    pub fn with_idea_limit(mut self, limit: i64) -> Self {
        self.idea_limit = u32::try_from(limit).ok().filter(|l| *l > 0);
        self
    }

    /// Set the starting expansion rate.
    pub fn with_starting_rate(mut self, rate: f64) -> Self {
        self.starting_expansion_rate = rate;
        self
    }

    /// Mark this experiment as running.
    pub fn with_running(mut self, running: bool) -> Self {
        self.running = running;
        self
    }

    /// Validate this experiment.
    ///
    /// An out-of-range starting rate is a configuration error; the runtime
    /// adjustment itself always clamps and can never produce one.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.is_empty() {
            return Err("Experiment name cannot be empty".to_string());
        }
        if !(0.0..=1.0).contains(&self.starting_expansion_rate) {
            return Err(format!(
                "Starting expansion rate {} is not between 0 and 1",
                self.starting_expansion_rate
            ));
        }
        Ok(())
    }

    /// Whether the given participant may review this experiment's results.
    pub fn is_owned_by(&self, participant: &str) -> bool {
        self.owner.as_deref() == Some(participant)
    }
}
