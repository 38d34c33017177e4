//! Configuration for the workflow service and its progression policy

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::Result;

/// Top-level service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    /// Path of the SQLite database file
    pub database_path: String,
    pub bind_address: String,
    pub port: u16,
    pub policy: PolicyConfig,
}

/// Business-rule knobs consulted by the engines
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Failed units a student may carry and still progress
    pub max_failed_units: u32,
    pub failure_scope: FailureScope,
    /// Whether an uncleared fee balance makes a report ineligible
    pub require_financial_clearance: bool,
    pub resit_pass_rule: PassRule,
    /// Fee charged when a resit registration does not name one
    pub default_resit_fee: Decimal,
}

/// Which failed results count against progression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureScope {
    AllSemesters,
    /// Only the most recent semester the student has results in
    LatestSemester,
}

/// How a completed resit decides pass or fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "rule", content = "threshold")]
pub enum PassRule {
    /// Use the matched grading band's own pass flag
    BandFlag,
    /// Pass iff the grade point reaches the threshold
    MinGradePoint(Decimal),
}

impl WorkflowConfig {
    /// Loads the configuration from a JSON file. Missing keys take defaults.
    ///
    /// # Arguments
    /// * `path` - Path to the JSON config file
    ///
    /// # Returns
    /// * `Ok(WorkflowConfig)` - Loaded configuration
    /// * `Err` - If the file can't be read or parsed
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: WorkflowConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Socket address string the HTTP server binds to
    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            database_path: "semreg.db".to_string(),
            bind_address: "127.0.0.1".to_string(),
            port: 3000,
            policy: PolicyConfig::default(),
        }
    }
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            max_failed_units: 2,
            failure_scope: FailureScope::AllSemesters,
            require_financial_clearance: false,
            resit_pass_rule: PassRule::BandFlag,
            default_resit_fee: Decimal::new(200000, 2),
        }
    }
}
