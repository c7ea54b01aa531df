//! Retention policy registry.
//!
//! The set of policies is closed: each [`PolicyId`] maps to one pure function
//! from chunk content (plus the per-transaction [`PolicyContext`]) to an expiry
//! period. The registry is a `static` table, built at compile time and never
//! mutated, so every replica dispatches identically.
//!
//! # Example
//!
//! ```
//! use watchdog::policy::{PolicyContext, PolicyRegistry};
//! use watchdog::ChunkData;
//!
//! let registry = PolicyRegistry::builtin();
//! let period = registry
//!     .apply("signal_energy_policy_v1", &ChunkData::default(), &PolicyContext::new(0))
//!     .unwrap();
//! assert_eq!(period.as_millis(), 31_800);
//! # Ok::<(), watchdog::Error>(())
//! ```

pub mod energy;
pub mod example;

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use time::OffsetDateTime;

use crate::core::{Error, Result};
use crate::model::ChunkData;

/// Identifier of a registered policy. Versioned: a changed rule gets a new id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PolicyId {
    ExamplePolicyV1,
    SignalEnergyPolicyV1,
}

impl PolicyId {
    pub const ALL: [PolicyId; 2] = [PolicyId::ExamplePolicyV1, PolicyId::SignalEnergyPolicyV1];

    pub fn as_str(self) -> &'static str {
        match self {
            PolicyId::ExamplePolicyV1 => "example_policy_v1",
            PolicyId::SignalEnergyPolicyV1 => "signal_energy_policy_v1",
        }
    }
}

impl FromStr for PolicyId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        PolicyId::ALL
            .into_iter()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| Error::PolicyNotFound(s.to_string()))
    }
}

impl fmt::Display for PolicyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Deterministic per-transaction input available to policies.
///
/// Derived from transaction metadata, so it is identical on every replica
/// that executes the transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolicyContext {
    pub seed: u64,
}

impl PolicyContext {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// Seeds from the Unix seconds of the transaction timestamp.
    pub fn from_tx_timestamp(timestamp: OffsetDateTime) -> Self {
        Self::new(timestamp.unix_timestamp() as u64)
    }
}

pub type PolicyLogic = fn(&ChunkData, &PolicyContext) -> Result<Duration>;

#[derive(Debug, Clone, Copy)]
pub struct Policy {
    pub id: PolicyId,
    pub description: &'static str,
    logic: PolicyLogic,
}

impl Policy {
    pub const fn new(id: PolicyId, description: &'static str, logic: PolicyLogic) -> Self {
        Self {
            id,
            description,
            logic,
        }
    }

    pub fn apply(&self, chunk: &ChunkData, ctx: &PolicyContext) -> Result<Duration> {
        (self.logic)(chunk, ctx)
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Policy with Id {:?} and description {:?}.",
            self.id.as_str(),
            self.description
        )
    }
}

/// Read-only table of policies.
#[derive(Debug)]
pub struct PolicyRegistry {
    policies: &'static [Policy],
}

static BUILTIN: PolicyRegistry = PolicyRegistry {
    policies: &[example::EXAMPLE_POLICY, energy::ENERGY_POLICY],
};

impl PolicyRegistry {
    /// The process-wide registry.
    pub fn builtin() -> &'static PolicyRegistry {
        &BUILTIN
    }

    pub fn lookup(&self, id: &str) -> Result<&Policy> {
        let id: PolicyId = id.parse()?;
        self.policies
            .iter()
            .find(|policy| policy.id == id)
            .ok_or_else(|| Error::PolicyNotFound(id.as_str().to_string()))
    }

    /// All policies, ordered by id.
    pub fn enumerate(&self) -> Vec<&Policy> {
        let mut policies: Vec<&Policy> = self.policies.iter().collect();
        policies.sort_by_key(|policy| policy.id);
        policies
    }

    pub fn apply(&self, id: &str, chunk: &ChunkData, ctx: &PolicyContext) -> Result<Duration> {
        self.lookup(id)?.apply(chunk, ctx)
    }

    /// Human-readable listing.
    pub fn describe(&self) -> String {
        let policies = self.enumerate();
        if policies.is_empty() {
            return "No available policies.".to_string();
        }
        let mut text = String::from("List of available policies:");
        for policy in policies {
            text.push_str("\n  ");
            text.push_str(&policy.to_string());
        }
        text
    }
}
