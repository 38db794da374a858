//! Scenario configuration and strategy selection.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tsc_core::{CoreError, CoreResult, RunConfig};

/// One of the two signal-control strategies under comparison.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    Adaptive,
    FixedCycle,
}

impl Strategy {
    pub const ALL: [Strategy; 2] = [Strategy::Adaptive, Strategy::FixedCycle];

    /// Session label and output column value.
    pub fn label(self) -> &'static str {
        match self {
            Strategy::Adaptive   => "adaptive",
            Strategy::FixedCycle => "fixed",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Everything `initialize` needs.  Partial JSON fills the rest with defaults.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    pub scenario:     String,
    /// Network file for engines that load one.  Must exist when given.
    pub network_path: Option<PathBuf>,
    /// Strategies to run side by side.  One entry gives a single-strategy run.
    pub strategies:   Vec<Strategy>,
    pub run:          RunConfig,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            scenario:     "default".to_owned(),
            network_path: None,
            strategies:   Strategy::ALL.to_vec(),
            run:          RunConfig::default(),
        }
    }
}

impl ScenarioConfig {
    pub fn new(scenario: impl Into<String>, run: RunConfig) -> Self {
        Self { scenario: scenario.into(), run, ..Self::default() }
    }

    /// Restrict the run to a single strategy.
    pub fn only(mut self, strategy: Strategy) -> Self {
        self.strategies = vec![strategy];
        self
    }

    pub fn is_dual(&self) -> bool {
        self.strategies.len() == 2
    }

    pub fn validate(&self) -> CoreResult<()> {
        if self.scenario.trim().is_empty() {
            return Err(CoreError::Config("scenario name must not be empty".into()));
        }
        if let Some(path) = &self.network_path {
            if !path.exists() {
                return Err(CoreError::Config(format!("network path {} does not exist", path.display())));
            }
        }
        if self.strategies.is_empty() {
            return Err(CoreError::Config("at least one strategy is required".into()));
        }
        if self.strategies.len() == 2 && self.strategies[0] == self.strategies[1] {
            return Err(CoreError::Config(format!("strategy `{}` listed twice", self.strategies[0])));
        }
        if self.strategies.len() > 2 {
            return Err(CoreError::Config("at most two strategies can run side by side".into()));
        }
        self.run.validate()
    }
}
