use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::ReconError;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Run configuration. Every field has a default, so an empty TOML document
/// describes the standard Prévia x Base layout.
#[derive(Debug, Clone, Deserialize)]
pub struct ReconConfig {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default)]
    pub columns: ColumnMapping,
    #[serde(default)]
    pub base: BaseConfig,
    #[serde(default)]
    pub normalize: NormalizeConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

fn default_name() -> String {
    "Prévia x Base".into()
}

impl Default for ReconConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            columns: ColumnMapping::default(),
            base: BaseConfig::default(),
            normalize: NormalizeConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Column mapping
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ColumnMapping {
    pub circuit: String,
    /// Identifier label in the base table, when it differs from `circuit`.
    pub base_circuit: Option<String>,
    pub availability: String,
    pub sla_threshold: String,
    pub contracted_value: String,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            circuit: "Circuito".into(),
            base_circuit: None,
            availability: "Disponibilidade".into(),
            sla_threshold: "SLA disponibilidade".into(),
            contracted_value: "Valor Contratado".into(),
        }
    }
}

impl ColumnMapping {
    pub fn base_circuit(&self) -> &str {
        self.base_circuit.as_deref().unwrap_or(&self.circuit)
    }
}

// ---------------------------------------------------------------------------
// Base join
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BaseConfig {
    /// Zero-based base column positions carried into the preview.
    pub carry_positions: Vec<usize>,
    /// Appended to a joined label that already exists in the preview.
    pub join_suffix: String,
    pub duplicates: DuplicatePolicy,
}

impl Default for BaseConfig {
    fn default() -> Self {
        Self {
            carry_positions: vec![5, 6],
            join_suffix: "_Base".into(),
            duplicates: DuplicatePolicy::default(),
        }
    }
}

/// What the join does when a preview circuit matches several base rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// One output row per matching base row.
    #[default]
    FanOut,
    /// First matching base row wins.
    FirstMatch,
    /// Fail the run.
    Reject,
}

impl std::fmt::Display for DuplicatePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FanOut => write!(f, "fan_out"),
            Self::FirstMatch => write!(f, "first_match"),
            Self::Reject => write!(f, "reject"),
        }
    }
}

// ---------------------------------------------------------------------------
// Normalize + Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NormalizeConfig {
    /// Preview columns holding percentages. Defaults to the availability and
    /// SLA threshold columns.
    #[serde(default)]
    pub percent_columns: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub xlsx: Option<String>,
    #[serde(default)]
    pub json: Option<String>,
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl ReconConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: ReconConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        let labels = [
            ("columns.circuit", self.columns.circuit.as_str()),
            ("columns.base_circuit", self.columns.base_circuit()),
            ("columns.availability", self.columns.availability.as_str()),
            ("columns.sla_threshold", self.columns.sla_threshold.as_str()),
            ("columns.contracted_value", self.columns.contracted_value.as_str()),
        ];
        for (field, label) in labels {
            if label.trim().is_empty() {
                return Err(ReconError::ConfigValidation(format!("{field} must not be empty")));
            }
        }

        if self.columns.availability.trim() == self.columns.sla_threshold.trim() {
            return Err(ReconError::ConfigValidation(
                "columns.availability and columns.sla_threshold must differ".into(),
            ));
        }

        if self.base.join_suffix.is_empty() {
            return Err(ReconError::ConfigValidation("base.join_suffix must not be empty".into()));
        }

        let mut seen = HashSet::new();
        for pos in &self.base.carry_positions {
            if !seen.insert(pos) {
                return Err(ReconError::ConfigValidation(format!(
                    "base.carry_positions lists position {pos} more than once"
                )));
            }
        }

        if let Some(ref cols) = self.normalize.percent_columns {
            if cols.iter().any(|c| c.trim().is_empty()) {
                return Err(ReconError::ConfigValidation(
                    "normalize.percent_columns must not contain empty labels".into(),
                ));
            }
            let mut seen = HashSet::new();
            for label in cols {
                if !seen.insert(label.trim()) {
                    return Err(ReconError::ConfigValidation(format!(
                        "normalize.percent_columns lists '{}' more than once",
                        label.trim()
                    )));
                }
            }
        }

        Ok(())
    }

    /// Percentage columns to rescale, trimmed to match normalized labels.
    pub fn percent_columns(&self) -> Vec<String> {
        match self.normalize.percent_columns {
            Some(ref cols) => {
                let mut labels: Vec<String> = Vec::with_capacity(cols.len());
                for label in cols.iter().map(|c| c.trim()) {
                    // A repeated label would be rescaled twice
                    if !labels.iter().any(|l| l == label) {
                        labels.push(label.to_string());
                    }
                }
                labels
            }
            None => vec![
                self.columns.availability.trim().to_string(),
                self.columns.sla_threshold.trim().to_string(),
            ],
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
