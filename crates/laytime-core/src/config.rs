//! Engine configuration.
//!
//! Every heuristic constant of the pipeline lives here so it can be
//! tuned from a TOML file. Missing sections and keys fall back to the
//! defaults, so an empty file is a valid configuration.
//!
//! ```toml
//! context_window = 2
//! laytime_basis = "cargo_operations"
//!
//! [placeholder]
//! default_hour = 12
//!
//! [placeholder.hours]
//! Berthed = 9
//!
//! [overlap]
//! tolerance_secs = 300
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::aggregate::LaytimeBasis;
use crate::domain::{Result, SofError};
use crate::duration::DurationPolicy;
use crate::reconcile::OverlapPolicy;
use crate::temporal::PlaceholderPolicy;

/// Environment variable the CLI reads a config path from.
pub const CONFIG_ENV: &str = "LAYTIME_CONFIG";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Lines searched on each side of a candidate for dates and context.
    pub context_window: usize,
    /// Leading lines searched for the document base date.
    pub base_date_scan_lines: usize,
    pub laytime_basis: LaytimeBasis,
    /// Upper bound on each collaborator call.
    pub augmentation_timeout_ms: u64,
    pub placeholder: PlaceholderPolicy,
    pub duration: DurationPolicy,
    pub overlap: OverlapPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            context_window: 2,
            base_date_scan_lines: 20,
            laytime_basis: LaytimeBasis::default(),
            augmentation_timeout_ms: 5_000,
            placeholder: PlaceholderPolicy::default(),
            duration: DurationPolicy::default(),
            overlap: OverlapPolicy::default(),
        }
    }
}

fn positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

impl EngineConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw).map_err(|e| SofError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&raw)
            .map_err(|e| SofError::Config(format!("{}: {e}", path.display())))?;
        tracing::debug!(path = %path.display(), "engine config loaded");
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| SofError::Config(e.to_string()))
    }

    pub fn augmentation_timeout(&self) -> Duration {
        Duration::from_millis(self.augmentation_timeout_ms)
    }

    /// Reject values the pipeline cannot honour.
    pub fn validate(&self) -> Result<()> {
        if self.placeholder.line_cycle == 0 {
            return Err(SofError::Config("placeholder.line_cycle must be at least 1".into()));
        }
        if let Some((ty, hour)) = self.placeholder.hours.iter().find(|(_, h)| **h > 23) {
            return Err(SofError::Config(format!(
                "placeholder hour for {ty} out of range: {hour}"
            )));
        }
        if self.placeholder.default_hour > 23 {
            return Err(SofError::Config("placeholder.default_hour must be 0-23".into()));
        }
        if self.placeholder.stride_hours > 23 {
            return Err(SofError::Config("placeholder.stride_hours must be 0-23".into()));
        }
        if self.overlap.tolerance_secs < 0 {
            return Err(SofError::Config("overlap.tolerance_secs must not be negative".into()));
        }
        if !positive(self.overlap.trim_floor_hours) {
            return Err(SofError::Config("overlap.trim_floor_hours must be positive".into()));
        }
        if !positive(self.duration.default_hours)
            || self.duration.base_hours.values().any(|h| !h.is_finite() || *h < 0.0)
            || self.duration.cargo_coefficients.values().any(|c| !positive(*c))
        {
            return Err(SofError::Config(
                "duration hours must be non-negative and coefficients positive".into(),
            ));
        }
        if self.augmentation_timeout_ms == 0 {
            return Err(SofError::Config("augmentation_timeout_ms must be positive".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::EventType;

    #[test]
    fn empty_toml_is_default() {
        assert_eq!(EngineConfig::from_toml_str("").expect("parse"), EngineConfig::default());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = EngineConfig::from_toml_str(
            r#"
            laytime_basis = "all_events"

            [placeholder.hours]
            Berthed = 9

            [overlap]
            tolerance_secs = 600
            "#,
        )
        .expect("parse");
        assert_eq!(config.laytime_basis, LaytimeBasis::AllEvents);
        assert_eq!(config.placeholder.hours.get(&EventType::Berthed), Some(&9));
        assert_eq!(config.placeholder.default_hour, 12);
        assert_eq!(config.overlap.tolerance_secs, 600);
        assert_eq!(config.overlap.trim_floor_hours, 0.5);
        assert_eq!(config.context_window, 2);
    }

    #[test]
    fn default_roundtrips_through_toml() {
        let config = EngineConfig::default();
        let raw = config.to_toml().expect("serialize");
        assert_eq!(EngineConfig::from_toml_str(&raw).expect("parse"), config);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let err = EngineConfig::from_toml_str("[placeholder]\nline_cycle = 0\n")
            .expect_err("line_cycle 0");
        assert!(matches!(err, SofError::Config(_)));

        let err = EngineConfig::from_toml_str("[placeholder.hours]\nArrived = 30\n")
            .expect_err("hour 30");
        assert!(err.to_string().contains("Arrived"));

        let err = EngineConfig::from_toml_str("[placeholder]\nstride_hours = 4000000000\n")
            .expect_err("stride past a day");
        assert!(err.to_string().contains("stride_hours"));

        assert!(EngineConfig::from_toml_str("context_window = \"wide\"").is_err());
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("laytime.toml");
        std::fs::write(&path, "augmentation_timeout_ms = 250\n").expect("write config");
        let config = EngineConfig::load(&path).expect("load");
        assert_eq!(config.augmentation_timeout(), Duration::from_millis(250));
    }
}
