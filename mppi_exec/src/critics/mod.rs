//! # Critics
//!
//! A critic scores every trajectory in a batch by adding its own cost term to the shared
//! accumulator in [`CriticData`]. Critics are selected by name in the controller's parameters and
//! built through the [`CriticType`] registry.
//!
//! Configuring a critic happens in two stages:
//!
//! 1. [`CriticFunction::on_configure`] stores the critic's name and costmap, and reads the
//!    `enabled` flag shared by all critics.
//! 2. [`CriticFunction::initialize`] reads the critic's own parameters.
//!
//! Both read from the namespace `<controller namespace>.<critic name>`.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod path_follow;

pub use path_follow::PathFollowCritic;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::str::FromStr;

use log::info;
use util::params::{ParamGetter, ParamStore};

use crate::{costmap::SharedCostmap, models::CriticData};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Prefix accepted in front of critic type names, e.g. `mppi::critics::PathFollowCritic`.
pub const CRITIC_TYPE_PREFIX: &str = "mppi::critics::";

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// Interface implemented by every critic.
pub trait CriticFunction: std::fmt::Debug + Send + Sync {
    fn base(&self) -> &CriticBase;

    fn base_mut(&mut self) -> &mut CriticBase;

    /// Read the critic specific parameters.
    fn initialize(&mut self, params: &ParamGetter);

    /// Add this critic's cost for every trajectory to `data.costs`.
    fn score(&mut self, data: &mut CriticData);

    /// Configure the critic under `<ns>.<name>` and then initialise it.
    fn on_configure(
        &mut self,
        ns: &str,
        name: &str,
        params: &ParamStore,
        costmap: SharedCostmap,
    ) {
        let getter = params.getter(ns).nested(name);

        let base = self.base_mut();
        base.name = name.to_string();
        base.costmap = Some(costmap);
        base.enabled = getter.get("enabled", true);

        self.initialize(&getter);

        info!(
            "Configured critic {} ({})",
            name,
            if self.is_enabled() { "enabled" } else { "disabled" }
        );
    }

    fn name(&self) -> &str {
        &self.base().name
    }

    fn is_enabled(&self) -> bool {
        self.base().enabled
    }
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// State common to all critics.
#[derive(Debug, Clone)]
pub struct CriticBase {
    pub name: String,
    pub enabled: bool,

    /// The costmap the critic was configured with. `None` until configured.
    pub costmap: Option<SharedCostmap>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// All critics which can be loaded by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CriticType {
    PathFollow,
}

#[derive(Debug, thiserror::Error)]
pub enum CriticError {
    #[error("Unknown critic type \"{0}\"")]
    UnknownCriticType(String),

    #[error("No critics are configured under \"{0}\"")]
    NoCritics(String),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for CriticBase {
    fn default() -> Self {
        Self {
            name: String::new(),
            enabled: true,
            costmap: None,
        }
    }
}

impl CriticType {
    /// Every registered critic type.
    pub const ALL: [CriticType; 1] = [CriticType::PathFollow];

    /// The identifier the critic is registered under.
    pub fn type_name(&self) -> &'static str {
        match self {
            CriticType::PathFollow => "PathFollowCritic",
        }
    }

    /// Build a new unconfigured critic of this type.
    pub fn create(&self) -> Box<dyn CriticFunction> {
        match self {
            CriticType::PathFollow => Box::new(PathFollowCritic::default()),
        }
    }
}

impl FromStr for CriticType {
    type Err = CriticError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        let name = name.strip_prefix(CRITIC_TYPE_PREFIX).unwrap_or(name);

        Self::ALL
            .iter()
            .copied()
            .find(|t| t.type_name() == name)
            .ok_or_else(|| CriticError::UnknownCriticType(s.to_string()))
    }
}

impl std::fmt::Display for CriticType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", CRITIC_TYPE_PREFIX, self.type_name())
    }
}
