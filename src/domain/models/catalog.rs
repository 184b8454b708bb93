//! Stimulus catalog domain models.
//!
//! Ideas are immutable text stimuli. Groups gather ideas into named
//! collections that experiments later tag as fixation or expansion pools.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single textual stimulus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Idea {
    /// Unique identifier
    pub id: Uuid,
    /// The content of the idea
    pub value: String,
    /// When this idea was created
    pub created_at: DateTime<Utc>,
}

impl Idea {
    /// Create a new idea with the given text value.
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            value: value.into(),
            created_at: Utc::now(),
        }
    }

    /// Validate this idea.
    pub fn validate(&self) -> Result<(), String> {
        if self.value.trim().is_empty() {
            return Err("Idea value cannot be empty".to_string());
        }
        Ok(())
    }
}

/// A named collection of ideas.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdeasGroup {
    /// Unique identifier
    pub id: Uuid,
    /// Human-readable name (unique across the catalog)
    pub name: String,
    /// Free-text description
    pub description: String,
    /// When this group was created
    pub created_at: DateTime<Utc>,
}

impl IdeasGroup {
    /// Create a new group with the given name and description.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: description.into(),
            created_at: Utc::now(),
        }
    }

    /// Validate this group.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.is_empty() {
            return Err("Group name cannot be empty".to_string());
        }
        if self.name.len() > 255 {
            return Err("Group name cannot exceed 255 characters".to_string());
        }
        Ok(())
    }
}
