//! Feature schema shared by training artifacts, requests and the drift engine.
//!
//! Column names and order are fixed at training time; every consumer goes
//! through the constants here rather than spelling names inline.

use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use yts_common::{Error, Result};

/// Raw input columns, in model order.
pub const FEATURE_COLUMNS: [&str; 4] = ["uploads", "category", "country", "age"];

/// Numeric subset of [`FEATURE_COLUMNS`], in encoder order.
pub const NUMERIC_FEATURES: [&str; 2] = ["uploads", "age"];

/// Categorical subset of [`FEATURE_COLUMNS`], in encoder order.
pub const CATEGORICAL_FEATURES: [&str; 2] = ["category", "country"];

/// Placeholder for missing categorical values.
pub const UNKNOWN_CATEGORY: &str = "Unknown";

/// Regression target.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum Target {
    Subscribers,
    Earnings,
    Growth,
}

impl Target {
    pub const ALL: [Target; 3] = [Target::Subscribers, Target::Earnings, Target::Growth];

    pub fn as_str(self) -> &'static str {
        match self {
            Target::Subscribers => "subscribers",
            Target::Earnings => "earnings",
            Target::Growth => "growth",
        }
    }

    /// Dataset column the target was trained on.
    pub fn column(self) -> &'static str {
        match self {
            Target::Subscribers => "subscribers",
            Target::Earnings => "highest_yearly_earnings",
            Target::Growth => "growth_target",
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Target {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "subscribers" => Ok(Target::Subscribers),
            "earnings" => Ok(Target::Earnings),
            "growth" => Ok(Target::Growth),
            other => Err(Error::validation(
                "target",
                format!(
                    "unknown target '{}'; allowed: earnings, growth, subscribers",
                    other
                ),
            )),
        }
    }
}

/// Read access to one row's feature values by column name.
///
/// `None` means the value is missing; callers decide how to fill it.
pub trait FeatureView {
    fn numeric(&self, column: &str) -> Option<f64>;
    fn categorical(&self, column: &str) -> Option<String>;
}

/// One row of the processed training table.
///
/// Numeric cells accept numbers or numeric strings; anything else reads as
/// missing. Categorical cells accept any scalar and are stringified.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChannelRecord {
    #[serde(default, deserialize_with = "lenient_number")]
    pub uploads: Option<f64>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub country: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub age: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub subscribers: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub highest_yearly_earnings: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub growth_target: Option<f64>,
}

/// Numeric columns of [`ChannelRecord`], in table order.
pub const RECORD_NUMERIC_COLUMNS: [&str; 5] = [
    "uploads",
    "age",
    "subscribers",
    "highest_yearly_earnings",
    "growth_target",
];

/// All columns of [`ChannelRecord`], in table order.
pub const RECORD_COLUMNS: [&str; 7] = [
    "uploads",
    "category",
    "country",
    "age",
    "subscribers",
    "highest_yearly_earnings",
    "growth_target",
];

impl ChannelRecord {
    pub fn target(&self, target: Target) -> Option<f64> {
        self.numeric(target.column())
    }

    /// Whether `column` holds no value.
    pub fn is_missing(&self, column: &str) -> bool {
        if RECORD_NUMERIC_COLUMNS.contains(&column) {
            self.numeric(column).is_none()
        } else {
            self.categorical(column).is_none()
        }
    }
}

impl FeatureView for ChannelRecord {
    fn numeric(&self, column: &str) -> Option<f64> {
        match column {
            "uploads" => self.uploads,
            "age" => self.age,
            "subscribers" => self.subscribers,
            "highest_yearly_earnings" => self.highest_yearly_earnings,
            "growth_target" => self.growth_target,
            _ => None,
        }
    }

    fn categorical(&self, column: &str) -> Option<String> {
        match column {
            "category" => self.category.clone(),
            "country" => self.country.clone(),
            _ => None,
        }
    }
}

fn lenient_number<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_f64().filter(|v| v.is_finite()),
        Some(serde_json::Value::String(s)) => {
            s.trim().parse::<f64>().ok().filter(|v| v.is_finite())
        }
        Some(serde_json::Value::Bool(b)) => Some(if b { 1.0 } else { 0.0 }),
        _ => None,
    })
}

fn lenient_text<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        Some(serde_json::Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}
