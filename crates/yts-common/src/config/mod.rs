//! Environment-derived configuration.
//!
//! Every `YTS_*` variable is read once, at startup, through a lookup function;
//! library code receives the resulting structs explicitly. Tests pass a map
//! instead of mutating the process environment.

pub mod paths;
pub mod tracking;
pub mod training;

pub use paths::ArtifactPaths;
pub use tracking::TrackingConfig;
pub use training::TrainingConfig;

use std::collections::HashMap;

/// Read a variable from the real process environment.
pub fn env_lookup(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Build a lookup function over a fixed map (used by tests and embedders).
pub fn map_lookup(vars: HashMap<String, String>) -> impl Fn(&str) -> Option<String> {
    move |name| vars.get(name).cloned()
}

/// Parse a boolean flag the way shell users write them.
pub fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "y" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bool() {
        for v in ["1", "true", "YES", " on ", "y"] {
            assert!(parse_bool(v), "{v}");
        }
        for v in ["0", "false", "no", "", "maybe"] {
            assert!(!parse_bool(v), "{v}");
        }
    }
}
