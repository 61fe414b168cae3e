//! # Critic manager
//!
//! Loads the critics listed in the controller's parameters and runs them, in list order, over
//! every batch of trajectories.
//!
//! The list is read from `<ns>.critics`, e.g.
//!
//! ```toml
//! [controller]
//! critics = ["PathFollowCritic"]
//!
//! [controller.PathFollowCritic]
//! cost_weight = 5.0
//! ```

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::{info, trace};
use util::params::ParamStore;

use crate::{
    costmap::SharedCostmap,
    critics::{CriticError, CriticFunction, CriticType},
    models::CriticData,
};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Critics loaded when the parameters don't list any.
pub const DEFAULT_CRITICS: [&str; 1] = ["PathFollowCritic"];

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug)]
pub struct CriticManager {
    ns: String,

    costmap: SharedCostmap,

    /// Critics in evaluation order
    critics: Vec<Box<dyn CriticFunction>>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl CriticManager {
    /// Load and configure every critic listed under `ns`.
    pub fn on_configure(
        ns: &str,
        params: &ParamStore,
        costmap: SharedCostmap,
    ) -> Result<Self, CriticError> {
        let default_names: Vec<String> = DEFAULT_CRITICS.iter().map(|s| s.to_string()).collect();
        let names: Vec<String> = params.getter(ns).get("critics", default_names);

        if names.is_empty() {
            return Err(CriticError::NoCritics(ns.to_string()));
        }

        let mut critics = Vec::with_capacity(names.len());

        for name in names.iter().map(|n| n.trim()) {
            let mut critic = name.parse::<CriticType>()?.create();
            critic.on_configure(ns, name, params, costmap.clone());
            critics.push(critic);
        }

        info!("Critics loaded: {:?}", names);

        Ok(Self {
            ns: ns.to_string(),
            costmap,
            critics,
        })
    }

    /// Re-read the parameters of every loaded critic.
    ///
    /// The set of critics itself is not changed.
    pub fn reconfigure(&mut self, params: &ParamStore) {
        for critic in self.critics.iter_mut() {
            let name = critic.name().to_string();
            critic.on_configure(&self.ns, &name, params, self.costmap.clone());
        }
    }

    /// Score the batch with every critic in order.
    ///
    /// Stops after any critic which raises `data.fail_flag`.
    pub fn eval_trajectories_scores(&mut self, data: &mut CriticData) {
        for critic in self.critics.iter_mut() {
            if data.fail_flag {
                trace!("Fail flag raised, skipping {} and later critics", critic.name());
                break;
            }

            critic.score(data);
        }
    }

    /// Names of the loaded critics in evaluation order.
    pub fn critic_names(&self) -> Vec<&str> {
        self.critics.iter().map(|c| c.name()).collect()
    }

    pub fn namespace(&self) -> &str {
        &self.ns
    }
}
