//! Participation domain models.
//!
//! A participation ties one participant to one experiment and tracks the
//! adaptive expansion rate across their reactions. Response entries form an
//! append-only log; only the most recent entry is ever mutated, once, to
//! attach the participant's reaction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A participant's reaction to a presented stimulus.
///
/// `Undefined` is the sentinel meaning "no reaction yet": a response entry
/// carries it from the moment the stimulus is drawn until the participant
/// submits a real reaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reaction {
    /// No reaction submitted yet
    Undefined,
    /// Keep going on the current track
    Continue,
    /// Push further away from the current track
    Expand,
    /// Neither; leaves the expansion rate untouched
    Neutral,
}

impl Default for Reaction {
    fn default() -> Self {
        Self::Undefined
    }
}

impl Reaction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Undefined => "undefined",
            Self::Continue => "continue",
            Self::Expand => "expand",
            Self::Neutral => "neutral",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "undefined" => Some(Self::Undefined),
            "continue" => Some(Self::Continue),
            "expand" => Some(Self::Expand),
            "neutral" => Some(Self::Neutral),
            _ => None,
        }
    }

    /// Whether this value counts as a submitted reaction.
    pub fn is_answered(&self) -> bool {
        !matches!(self, Self::Undefined)
    }
}

/// One participant's run through one experiment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participation {
    /// Unique identifier
    pub id: Uuid,
    /// Authenticated participant name
    pub participant: String,
    /// Experiment being run
    pub experiment_id: Uuid,
    /// Current adaptive expansion rate, in [0, 1]
    pub expansion_rate: f64,
    /// Terminal flag; once set, no further stimuli are drawn
    pub finished: bool,
    /// When this participation was created
    pub created_at: DateTime<Utc>,
    /// When this participation was last updated
    pub updated_at: DateTime<Utc>,
}

impl Participation {
    /// Create a new participation starting at the experiment's configured rate.
    pub fn new(participant: impl Into<String>, experiment_id: Uuid, starting_rate: f64) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            participant: participant.into(),
            experiment_id,
            expansion_rate: starting_rate,
            finished: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Mark this participation as finished. Terminal.
    pub fn finish(&mut self) {
        self.finished = true;
        self.updated_at = Utc::now();
    }

    /// Record a new expansion rate.
    pub fn set_rate(&mut self, rate: f64) {
        self.expansion_rate = rate;
        self.updated_at = Utc::now();
    }
}

/// One presented stimulus and the participant's reaction to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEntry {
    /// Unique identifier
    pub id: Uuid,
    /// Owning participation
    pub participation_id: Uuid,
    /// 0-based position within the participation, strictly increasing
    pub seq: u32,
    /// The stimulus that was shown
    pub idea_id: Uuid,
    /// Whether the stimulus came from the expansion pool
    pub did_expand: bool,
    /// Expansion rate recorded at this step
    pub expansion_rate: f64,
    /// Participant's reaction; `Undefined` until submitted
    pub reaction: Reaction,
    /// When this entry was created
    pub created_at: DateTime<Utc>,
}

impl ResponseEntry {
    /// Create a fresh entry for a just-drawn stimulus, awaiting a reaction.
    pub fn new(
        participation_id: Uuid,
        seq: u32,
        idea_id: Uuid,
        did_expand: bool,
        expansion_rate: f64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            participation_id,
            seq,
            idea_id,
            did_expand,
            expansion_rate,
            reaction: Reaction::Undefined,
            created_at: Utc::now(),
        }
    }

    /// Whether this entry is still waiting for the participant.
    pub fn is_awaiting_reaction(&self) -> bool {
        !self.reaction.is_answered()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reaction_round_trip() {
        assert_eq!(Reaction::from_str("continue"), Some(Reaction::Continue));
        assert_eq!(Reaction::from_str("EXPAND"), Some(Reaction::Expand));
        assert_eq!(Reaction::from_str("bogus"), None);
        assert_eq!(Reaction::Neutral.as_str(), "neutral");
    }

    #[test]
    fn test_sentinel_is_not_answered() {
        assert!(!Reaction::Undefined.is_answered());
        assert!(Reaction::Continue.is_answered());
        assert!(Reaction::Neutral.is_answered());
    }

    #[test]
    fn test_participation_lifecycle() {
        let mut p = Participation::new("alice", Uuid::new_v4(), 0.2);
        assert!(!p.finished);

        p.set_rate(0.25);
        assert!((p.expansion_rate - 0.25).abs() < f64::EPSILON);

        p.finish();
        assert!(p.finished);
    }

    #[test]
    fn test_fresh_entry_awaits_reaction() {
        let entry = ResponseEntry::new(Uuid::new_v4(), 0, Uuid::new_v4(), false, 0.2);
        assert!(entry.is_awaiting_reaction());
        assert_eq!(entry.reaction, Reaction::Undefined);
    }
}
