//! Experiment tracking configuration.

use crate::{Error, Result};
use std::collections::BTreeMap;
use std::path::PathBuf;

pub const ENV_TRACKING_BACKENDS: &str = "YTS_TRACKING_BACKENDS";
pub const ENV_TRACKING_STRICT: &str = "YTS_TRACKING_STRICT";
pub const ENV_EXPERIMENT_TAGS: &str = "YTS_EXPERIMENT_TAGS";
pub const ENV_TRACKING_DIR: &str = "YTS_TRACKING_DIR";

/// Which tracking backends to enable and how to react when one is missing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackingConfig {
    /// Requested backend names, lowercase, in request order.
    pub backends: Vec<String>,
    /// Fail instead of warn when a requested backend is unavailable.
    pub strict: bool,
    /// Free-form run tags.
    pub tags: BTreeMap<String, String>,
    /// Override for the file-backend output directory.
    pub dir: Option<PathBuf>,
}

impl TrackingConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(super::env_lookup)
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let backends = lookup(ENV_TRACKING_BACKENDS)
            .map(|raw| parse_backends(&raw))
            .transpose()?
            .unwrap_or_default();
        Ok(Self {
            backends,
            strict: lookup(ENV_TRACKING_STRICT)
                .map(|v| super::parse_bool(&v))
                .unwrap_or(false),
            tags: lookup(ENV_EXPERIMENT_TAGS)
                .map(|raw| parse_tags(&raw))
                .unwrap_or_default(),
            dir: lookup(ENV_TRACKING_DIR).map(PathBuf::from),
        })
    }

    pub fn with_backends<I, S>(mut self, backends: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.backends = backends.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }
}

fn parse_backends(raw: &str) -> Result<Vec<String>> {
    let mut out = Vec::new();
    for name in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
            return Err(Error::InvalidSetting {
                name: ENV_TRACKING_BACKENDS.to_string(),
                reason: format!("bad backend name '{}'", name),
            });
        }
        let name = name.to_ascii_lowercase();
        if !out.contains(&name) {
            out.push(name);
        }
    }
    Ok(out)
}

/// Parse `k=v,k2=v2`; entries without `=` or with an empty side are skipped.
pub fn parse_tags(raw: &str) -> BTreeMap<String, String> {
    raw.split(',')
        .filter_map(|pair| {
            let (k, v) = pair.split_once('=')?;
            let (k, v) = (k.trim(), v.trim());
            (!k.is_empty() && !v.is_empty()).then(|| (k.to_string(), v.to_string()))
        })
        .collect()
}
