//! Precedence dependency model.
//!
//! A dependency links a predecessor task to the task that owns it, with one
//! of the four standard relation types and a signed lag (negative = lead).
//!
//! # Reference
//! PMI (2017), "PMBOK Guide", 6th ed., §6.3.2 (Precedence Diagramming Method)

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Precedence relation type.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum DependencyType {
    /// Finish-to-Start: successor starts after predecessor finishes.
    #[default]
    FS,
    /// Start-to-Start: successor starts no earlier than predecessor starts.
    SS,
    /// Finish-to-Finish: successor finishes no earlier than predecessor finishes.
    FF,
    /// Start-to-Finish: successor finishes no earlier than predecessor starts.
    SF,
}

impl DependencyType {
    /// All relation types, in mnemonic order.
    pub const ALL: [DependencyType; 4] = [Self::FS, Self::SS, Self::FF, Self::SF];

    /// Two-letter mnemonic.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FS => "FS",
            Self::SS => "SS",
            Self::FF => "FF",
            Self::SF => "SF",
        }
    }

    /// Whether the predecessor's start (rather than finish) anchors the relation.
    pub fn anchors_on_start(&self) -> bool {
        matches!(self, Self::SS | Self::SF)
    }

    /// Whether the relation constrains the successor's finish.
    pub fn constrains_finish(&self) -> bool {
        matches!(self, Self::FF | Self::SF)
    }
}

impl fmt::Display for DependencyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DependencyType {
    type Err = ();

    /// Case-insensitive mnemonic lookup.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or(())
    }
}

/// A predecessor link owned by the successor task.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Dependency {
    /// ID of the task this one depends on.
    pub predecessor_id: String,
    /// Relation type.
    #[serde(rename = "type", default)]
    pub dep_type: DependencyType,
    /// Offset in days; negative values are leads.
    #[serde(default)]
    pub lag_days: i64,
}

impl Dependency {
    /// Creates a finish-to-start dependency with no lag.
    pub fn new(predecessor_id: impl Into<String>) -> Self {
        Self {
            predecessor_id: predecessor_id.into(),
            dep_type: DependencyType::FS,
            lag_days: 0,
        }
    }

    /// Sets the relation type.
    pub fn with_type(mut self, dep_type: DependencyType) -> Self {
        self.dep_type = dep_type;
        self
    }

    /// Sets the lag (negative = lead).
    pub fn with_lag(mut self, lag_days: i64) -> Self {
        self.lag_days = lag_days;
        self
    }
}
