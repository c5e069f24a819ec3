use crate::common::{DomainError, DomainResult};
use crate::config::Config;
use crate::domains::navigation::{Controller, Planner};
use std::collections::BTreeMap;
use std::sync::Arc;

use super::controllers::{LinearController, TeleportController};
use super::planners::{GridSearchPlanner, StraightLinePlanner};

pub type PlannerFactory = Box<dyn Fn(&Config) -> Arc<dyn Planner> + Send + Sync>;
pub type ControllerFactory = Box<dyn Fn(&Config) -> Box<dyn Controller> + Send + Sync>;

/// Resolves planner and controller plugin names to instances.
pub struct PluginRegistry {
    planners: BTreeMap<String, PlannerFactory>,
    controllers: BTreeMap<String, ControllerFactory>,
}

impl PluginRegistry {
    pub fn empty() -> Self {
        Self {
            planners: BTreeMap::new(),
            controllers: BTreeMap::new(),
        }
    }

    /// Registry with the bundled `straight_line`, `grid_search`, `teleport` and `linear` plugins.
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        registry.register_planner("straight_line", |config| Arc::new(StraightLinePlanner::new(&config.planner)) as Arc<dyn Planner>);
        registry.register_planner("grid_search", |config| Arc::new(GridSearchPlanner::new(&config.planner)) as Arc<dyn Planner>);
        registry.register_controller("teleport", |config| Box::new(TeleportController::new(&config.controller)) as Box<dyn Controller>);
        registry.register_controller("linear", |config| {
            Box::new(LinearController::new(&config.controller, config.navigation.control_period())) as Box<dyn Controller>
        });
        registry
    }

    pub fn register_planner<F>(&mut self, name: &str, factory: F)
    where
        F: Fn(&Config) -> Arc<dyn Planner> + Send + Sync + 'static,
    {
        self.planners.insert(name.to_string(), Box::new(factory));
    }

    pub fn register_controller<F>(&mut self, name: &str, factory: F)
    where
        F: Fn(&Config) -> Box<dyn Controller> + Send + Sync + 'static,
    {
        self.controllers.insert(name.to_string(), Box::new(factory));
    }

    pub fn create_planner(&self, name: &str, config: &Config) -> DomainResult<Arc<dyn Planner>> {
        let factory = self.planners.get(name).ok_or_else(|| DomainError::UnknownPlugin {
            kind: "planner".to_string(),
            name: name.to_string(),
        })?;
        Ok(factory(config))
    }

    pub fn create_controller(&self, name: &str, config: &Config) -> DomainResult<Box<dyn Controller>> {
        let factory = self.controllers.get(name).ok_or_else(|| DomainError::UnknownPlugin {
            kind: "controller".to_string(),
            name: name.to_string(),
        })?;
        Ok(factory(config))
    }

    pub fn planner_names(&self) -> Vec<&str> {
        self.planners.keys().map(String::as_str).collect()
    }

    pub fn controller_names(&self) -> Vec<&str> {
        self.controllers.keys().map(String::as_str).collect()
    }
}
