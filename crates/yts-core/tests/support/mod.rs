//! Shared fixtures for integration tests.
//!
//! Builds a small but complete artifact tree: eight channels split into a
//! low-volume and a high-volume group, a prediction bundle whose forests
//! split on uploads at 500, and a two-cluster clustering bundle.

#![allow(dead_code)]
// Test support provides more helpers than any single test uses.

use std::collections::BTreeMap;
use std::path::Path;
use tempfile::TempDir;
use yts_common::ArtifactPaths;
use yts_core::features::{ChannelRecord, Target};
use yts_core::models::{
    ClusterTrainingRow, ClusteringBundle, DbscanModel, DecisionTree, Forest, KMeansModel,
    PredictionBundle, StandardScaler, SupervisedMetadata, TargetMetrics, TreeNode,
};
use yts_core::pipeline::{register_run, RegistrationOptions, RegistrationOutcome};
use yts_core::service::PredictionRequest;

/// Uploads at or below this go to the low leaf of every forest.
pub const UPLOAD_SPLIT: f64 = 500.0;

pub const LOW_SUBSCRIBERS: f64 = 20_000.0;
pub const LOW_EARNINGS: f64 = 60_000.0;
pub const LOW_GROWTH: f64 = 5_000.0;
pub const HIGH_SUBSCRIBERS: f64 = 1_200_000.0;
pub const HIGH_EARNINGS: f64 = 6_000_000.0;
pub const HIGH_GROWTH: f64 = 250_000.0;

/// `(uploads, category, country, age, subscribers, earnings, growth)`
const CHANNELS: [(f64, &str, &str, f64, f64, f64, f64); 8] = [
    (100.0, "Music", "India", 3.0, 20_000.0, 60_000.0, 4_000.0),
    (150.0, "Gaming", "India", 5.0, 30_000.0, 80_000.0, 6_000.0),
    (200.0, "Education", "United States", 4.0, 25_000.0, 70_000.0, 5_000.0),
    (120.0, "Music", "United States", 2.0, 15_000.0, 50_000.0, 3_000.0),
    (900.0, "Music", "India", 10.0, 1_200_000.0, 6_000_000.0, 250_000.0),
    (1000.0, "Gaming", "United States", 12.0, 1_500_000.0, 7_000_000.0, 300_000.0),
    (800.0, "Education", "India", 9.0, 900_000.0, 4_000_000.0, 180_000.0),
    (950.0, "Music", "India", 11.0, 1_100_000.0, 5_500_000.0, 220_000.0),
];

pub fn channels() -> Vec<ChannelRecord> {
    CHANNELS
        .iter()
        .map(
            |&(uploads, category, country, age, subscribers, earnings, growth)| ChannelRecord {
                uploads: Some(uploads),
                category: Some(category.to_string()),
                country: Some(country.to_string()),
                age: Some(age),
                subscribers: Some(subscribers),
                highest_yearly_earnings: Some(earnings),
                growth_target: Some(growth),
            },
        )
        .collect()
}

pub fn request(uploads: i64, category: &str, country: &str, age: i64) -> PredictionRequest {
    PredictionRequest {
        uploads,
        category: category.to_string(),
        country: country.to_string(),
        age,
    }
}

fn leaf(value: f64) -> TreeNode {
    TreeNode::Leaf {
        value,
        impurity: 0.0,
        weighted_samples: 4.0,
    }
}

/// `uploads <= 500 ? low : high`, with leaves in log1p space.
fn stump(n_features: usize, low: f64, high: f64) -> Forest {
    Forest {
        n_features,
        trees: vec![DecisionTree {
            nodes: vec![
                TreeNode::Split {
                    feature: 0,
                    threshold: UPLOAD_SPLIT,
                    left: 1,
                    right: 2,
                    impurity: 1.0,
                    weighted_samples: 8.0,
                },
                leaf(low.ln_1p()),
                leaf(high.ln_1p()),
            ],
        }],
    }
}

pub fn prediction_bundle() -> PredictionBundle {
    let metadata = SupervisedMetadata::new(
        vec!["Education".into(), "Gaming".into(), "Music".into()],
        vec!["Brazil".into(), "India".into(), "United States".into()],
    );
    // uploads, age, three categories, three countries; Brazil has no rows here
    let width = 8;
    let leaves = [
        (Target::Subscribers, LOW_SUBSCRIBERS, HIGH_SUBSCRIBERS),
        (Target::Earnings, LOW_EARNINGS, HIGH_EARNINGS),
        (Target::Growth, LOW_GROWTH, HIGH_GROWTH),
    ];
    let mut models = BTreeMap::new();
    let mut metrics = BTreeMap::new();
    for (target, low, high) in leaves {
        models.insert(target, stump(width, low, high));
        metrics.insert(
            target,
            TargetMetrics {
                mae: low / 10.0,
                rmse: low / 5.0,
                r2: 0.8,
            },
        );
    }
    PredictionBundle::from_parts(metadata, models, metrics).expect("fixture prediction bundle")
}

fn scaler() -> StandardScaler {
    StandardScaler::new(
        [525.0, 600_000.0, 2_900_000.0, 120_000.0],
        [400.0, 600_000.0, 3_000_000.0, 120_000.0],
    )
}

/// Training rows labelled 0 (low group) and 1 (high group).
pub fn training_rows() -> Vec<ClusterTrainingRow> {
    channels()
        .iter()
        .enumerate()
        .map(|(i, c)| {
            let cluster = if i < 4 { 0 } else { 1 };
            ClusterTrainingRow {
                uploads: c.uploads.unwrap_or(0.0),
                subscribers: c.subscribers.unwrap_or(0.0),
                earnings: c.highest_yearly_earnings.unwrap_or(0.0),
                growth: c.growth_target.unwrap_or(0.0),
                category: c.category.clone().unwrap_or_default(),
                country: c.country.clone().unwrap_or_default(),
                cluster,
                density_cluster: cluster as i64,
            }
        })
        .collect()
}

pub fn clustering_bundle() -> ClusteringBundle {
    let centroids = vec![vec![-1.0; 4], vec![1.0; 4]];
    let dbscan = DbscanModel {
        eps: 0.5,
        min_samples: 2,
        core_samples: centroids.clone(),
        core_labels: vec![0, 1],
    };
    ClusteringBundle::from_fit(scaler(), KMeansModel { centroids }, dbscan, &training_rows())
        .expect("fixture clustering bundle")
}

pub fn write_dataset(path: &Path, rows: &[ChannelRecord]) {
    std::fs::create_dir_all(path.parent().expect("dataset parent")).expect("create data dir");
    let body: String = rows
        .iter()
        .map(|r| serde_json::to_string(r).expect("serialize row") + "\n")
        .collect();
    std::fs::write(path, body).expect("write dataset");
}

/// A temporary project root and its resolved artifact paths.
pub struct Project {
    pub dir: TempDir,
    pub paths: ArtifactPaths,
}

impl Project {
    /// Empty project: no dataset, no artifacts.
    pub fn empty() -> Self {
        let dir = TempDir::new().expect("tempdir");
        let paths = ArtifactPaths::from_root(dir.path());
        Self { dir, paths }
    }

    /// Dataset plus both bundles, as the trainer leaves them.
    pub fn trained() -> Self {
        let project = Self::empty();
        std::fs::create_dir_all(&project.paths.model_dir).expect("model dir");
        write_dataset(&project.paths.data_path, &channels());
        prediction_bundle()
            .write(&project.paths.supervised_bundle(), Some("fixture"))
            .expect("write prediction bundle");
        clustering_bundle()
            .write(&project.paths.clustering_bundle(), Some("fixture"))
            .expect("write clustering bundle");
        project
    }

    /// Trained and registered: every expected artifact exists.
    pub fn registered() -> Self {
        let project = Self::trained();
        project.register();
        project
    }

    pub fn register(&self) -> RegistrationOutcome {
        register_run(&self.paths, &RegistrationOptions::default()).expect("register run")
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }
}
