//! Training hyperparameters recorded with every run.

use crate::{Error, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Hyperparameters the external training pipeline was run with.
///
/// The service never fits models, but every manifest records the exact
/// configuration so a run can be reproduced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TrainingConfig {
    pub random_state: u64,
    pub test_size: f64,
    pub n_estimators: u32,
    pub min_samples_leaf: u32,
    pub n_clusters: u32,
    pub dbscan_eps: f64,
    pub dbscan_min_samples: u32,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            random_state: 42,
            test_size: 0.2,
            n_estimators: 120,
            min_samples_leaf: 2,
            n_clusters: 4,
            dbscan_eps: 0.95,
            dbscan_min_samples: 12,
        }
    }
}

fn read<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: T,
) -> Result<T> {
    match lookup(name) {
        None => Ok(default),
        Some(raw) => raw.trim().parse::<T>().map_err(|_| Error::InvalidSetting {
            name: name.to_string(),
            reason: format!("cannot parse '{}'", raw),
        }),
    }
}

impl TrainingConfig {
    /// Resolve from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(super::env_lookup)
    }

    /// Resolve from an arbitrary variable lookup, then validate.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let d = Self::default();
        let config = Self {
            random_state: read(&lookup, "YTS_RANDOM_STATE", d.random_state)?,
            test_size: read(&lookup, "YTS_TEST_SIZE", d.test_size)?,
            n_estimators: read(&lookup, "YTS_N_ESTIMATORS", d.n_estimators)?,
            min_samples_leaf: read(&lookup, "YTS_MIN_SAMPLES_LEAF", d.min_samples_leaf)?,
            n_clusters: read(&lookup, "YTS_N_CLUSTERS", d.n_clusters)?,
            dbscan_eps: read(&lookup, "YTS_DBSCAN_EPS", d.dbscan_eps)?,
            dbscan_min_samples: read(&lookup, "YTS_DBSCAN_MIN_SAMPLES", d.dbscan_min_samples)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Semantic range checks.
    pub fn validate(&self) -> Result<()> {
        let invalid = |name: &str, reason: &str| {
            Err(Error::InvalidSetting {
                name: name.to_string(),
                reason: reason.to_string(),
            })
        };
        if !(self.test_size > 0.0 && self.test_size < 1.0) {
            return invalid("test_size", "must be in (0, 1)");
        }
        if self.n_estimators == 0 {
            return invalid("n_estimators", "must be >= 1");
        }
        if self.min_samples_leaf == 0 {
            return invalid("min_samples_leaf", "must be >= 1");
        }
        if self.n_clusters == 0 {
            return invalid("n_clusters", "must be >= 1");
        }
        if !(self.dbscan_eps > 0.0 && self.dbscan_eps.is_finite()) {
            return invalid("dbscan_eps", "must be a positive finite number");
        }
        if self.dbscan_min_samples == 0 {
            return invalid("dbscan_min_samples", "must be >= 1");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::map_lookup;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        map_lookup(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<HashMap<_, _>>(),
        )
    }

    #[test]
    fn test_defaults() {
        let config = TrainingConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, TrainingConfig::default());
        assert_eq!(config.n_clusters, 4);
        assert_eq!(config.dbscan_min_samples, 12);
    }

    #[test]
    fn test_env_values() {
        let config = TrainingConfig::from_lookup(lookup(&[
            ("YTS_N_ESTIMATORS", "300"),
            ("YTS_DBSCAN_EPS", "1.25"),
        ]))
        .unwrap();
        assert_eq!(config.n_estimators, 300);
        assert!((config.dbscan_eps - 1.25).abs() < 1e-12);
    }

    #[test]
    fn test_unparseable_names_variable() {
        let err = TrainingConfig::from_lookup(lookup(&[("YTS_N_CLUSTERS", "four")])).unwrap_err();
        assert!(err.to_string().contains("YTS_N_CLUSTERS"));
    }

    #[test]
    fn test_out_of_range_rejected() {
        assert!(TrainingConfig::from_lookup(lookup(&[("YTS_TEST_SIZE", "1.0")])).is_err());
        assert!(TrainingConfig::from_lookup(lookup(&[("YTS_N_CLUSTERS", "0")])).is_err());
        assert!(TrainingConfig::from_lookup(lookup(&[("YTS_DBSCAN_EPS", "-1")])).is_err());
    }
}
