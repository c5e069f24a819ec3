use crate::domains::navigation::NavigationSettings;
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub navigation: NavigationConfig,
    pub planner: PlannerConfig,
    pub controller: ControllerConfig,
    pub costmap: CostmapConfig,
    pub frames: Vec<FrameConfig>,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigationConfig {
    pub planner: String,
    pub controller: String,
    /// Zero plans once per goal.
    pub planning_period_ms: u64,
    pub control_period_ms: u64,
    pub publish_feedback: bool,
    pub shutdown_costmaps: bool,
    /// Consecutive missed control deadlines before an escalated warning.
    pub missed_cycle_warn_threshold: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Sampling distance of the straight line planner, in cells.
    pub step_cells: f64,
    pub allow_unknown: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Distance in metres at which a waypoint counts as reached.
    pub goal_tolerance: f64,
    /// Metres per second for the linear controller.
    pub max_speed: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CostmapConfig {
    pub global_frame: String,
    pub width: usize,
    pub height: usize,
    pub resolution: f64,
    pub origin_x: f64,
    pub origin_y: f64,
    /// Offset between a cell index and the point it represents.
    pub convert_offset: f64,
}

/// A static frame expressed relative to the costmap's global frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameConfig {
    pub name: String,
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub yaw: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Domain log file; console only when unset.
    pub file: Option<String>,
    /// Forward domain log lines from a background task.
    pub buffered: bool,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            planner: "straight_line".to_string(),
            controller: "teleport".to_string(),
            planning_period_ms: 0,
            control_period_ms: 50,
            publish_feedback: true,
            shutdown_costmaps: false,
            missed_cycle_warn_threshold: 5,
        }
    }
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            step_cells: 1.0,
            allow_unknown: true,
        }
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            goal_tolerance: 0.05,
            max_speed: 1.0,
        }
    }
}

impl Default for CostmapConfig {
    fn default() -> Self {
        Self {
            global_frame: "map".to_string(),
            width: 200,
            height: 200,
            resolution: 0.1,
            origin_x: -10.0,
            origin_y: -10.0,
            convert_offset: 0.5,
        }
    }
}

impl NavigationConfig {
    pub fn planning_period(&self) -> Duration {
        Duration::from_millis(self.planning_period_ms)
    }

    pub fn control_period(&self) -> Duration {
        Duration::from_millis(self.control_period_ms)
    }
}

impl From<&NavigationConfig> for NavigationSettings {
    fn from(config: &NavigationConfig) -> Self {
        NavigationSettings {
            planning_period: config.planning_period(),
            publish_feedback: config.publish_feedback,
            shutdown_costmaps: config.shutdown_costmaps,
        }
    }
}

impl Config {
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Defaults, then the optional file, then `CROWD_NAV__SECTION__KEY` environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = ::config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(::config::File::from(path).required(true));
        }
        let config = builder
            .add_source(
                ::config::Environment::with_prefix("CROWD_NAV")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize::<Config>()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.navigation.control_period_ms == 0 {
            bail!("navigation.control_period_ms must be greater than zero");
        }
        if self.navigation.planner.is_empty() || self.navigation.controller.is_empty() {
            bail!("navigation.planner and navigation.controller must name a plugin");
        }
        if self.costmap.width == 0 || self.costmap.height == 0 {
            bail!("costmap.width and costmap.height must be greater than zero");
        }
        if !(self.costmap.resolution.is_finite() && self.costmap.resolution > 0.0) {
            bail!("costmap.resolution must be a positive number");
        }
        if self.costmap.global_frame.is_empty() {
            bail!("costmap.global_frame must not be empty");
        }
        if !(self.planner.step_cells > 0.0) {
            bail!("planner.step_cells must be greater than zero");
        }
        if !(self.controller.goal_tolerance >= 0.0) || !(self.controller.max_speed > 0.0) {
            bail!("controller.goal_tolerance must not be negative and controller.max_speed must be positive");
        }
        Ok(())
    }
}
