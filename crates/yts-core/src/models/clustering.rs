//! Clustering bundle adapter.
//!
//! Holds the standardization fitted at training time, the fixed-K centroid
//! model, the density model, and the cluster profiles and archetype names
//! that were computed once from the labelled training table.

use super::{bundle_error, open_bundle};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;
use yts_bundle::{BundleKind, BundleManifest, BundleWriter};
use yts_common::{Error, Result};

pub const ARTIFACT_NAME: &str = "clustering_bundle";

/// Clustering feature space, in scaler order.
pub const CLUSTER_FEATURES: [&str; 4] = ["uploads", "subscribers", "earnings", "growth"];

pub const ARCHETYPE_VIRAL: &str = "Viral entertainers";
pub const ARCHETYPE_HIGH_EARNING: &str = "High earning low upload";
pub const ARCHETYPE_HIGH_UPLOAD: &str = "High upload low growth";
pub const ARCHETYPE_CONSISTENT: &str = "Consistent educators";

const SCALER_FILE: &str = "scaler.json";
const KMEANS_FILE: &str = "kmeans.json";
const DBSCAN_FILE: &str = "dbscan.json";
const PROFILES_FILE: &str = "profiles.json";
const ARCHETYPES_FILE: &str = "archetypes.json";

fn corrupted(reason: impl Into<String>) -> Error {
    Error::ArtifactCorrupted {
        artifact: ARTIFACT_NAME.to_string(),
        reason: reason.into(),
    }
}

fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum()
}

/// Per-feature standardization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub features: Vec<String>,
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl StandardScaler {
    pub fn new(mean: [f64; 4], scale: [f64; 4]) -> Self {
        Self {
            features: CLUSTER_FEATURES.iter().map(|f| f.to_string()).collect(),
            mean: mean.to_vec(),
            scale: scale.to_vec(),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.features != CLUSTER_FEATURES {
            return Err(corrupted(format!(
                "scaler feature order {:?} does not match {:?}",
                self.features, CLUSTER_FEATURES
            )));
        }
        if self.mean.len() != 4 || self.scale.len() != 4 {
            return Err(corrupted("scaler must have four mean and scale entries"));
        }
        if self
            .mean
            .iter()
            .chain(&self.scale)
            .any(|v| !v.is_finite())
        {
            return Err(corrupted("scaler has non-finite parameters"));
        }
        Ok(())
    }

    /// Standardize a raw feature vector. A zero scale leaves the centred value unscaled.
    pub fn transform(&self, raw: &[f64; 4]) -> [f64; 4] {
        let mut out = [0.0; 4];
        for (i, slot) in out.iter_mut().enumerate() {
            let scale = if self.scale[i] == 0.0 { 1.0 } else { self.scale[i] };
            *slot = (raw[i] - self.mean[i]) / scale;
        }
        out
    }
}

/// Fixed-K partitioning model in standardized space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KMeansModel {
    pub centroids: Vec<Vec<f64>>,
}

impl KMeansModel {
    pub fn k(&self) -> usize {
        self.centroids.len()
    }

    fn validate(&self) -> Result<()> {
        if self.centroids.is_empty() {
            return Err(corrupted("centroid model has no clusters"));
        }
        for (i, c) in self.centroids.iter().enumerate() {
            if c.len() != CLUSTER_FEATURES.len() || c.iter().any(|v| !v.is_finite()) {
                return Err(corrupted(format!("centroid {} is malformed", i)));
            }
        }
        Ok(())
    }

    /// Index of the nearest centroid; ties go to the lower index.
    pub fn nearest(&self, z: &[f64; 4]) -> usize {
        let mut best = 0;
        let mut best_dist = f64::INFINITY;
        for (i, c) in self.centroids.iter().enumerate() {
            let d = squared_distance(z, c);
            if d < best_dist {
                best = i;
                best_dist = d;
            }
        }
        best
    }
}

/// Outlier-aware density model in standardized space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DbscanModel {
    pub eps: f64,
    pub min_samples: u32,
    pub core_samples: Vec<Vec<f64>>,
    pub core_labels: Vec<i64>,
}

impl DbscanModel {
    fn validate(&self) -> Result<()> {
        if !(self.eps.is_finite() && self.eps > 0.0) {
            return Err(corrupted("density model eps must be positive"));
        }
        if self.core_samples.len() != self.core_labels.len() {
            return Err(corrupted("density model core samples and labels differ in length"));
        }
        if self
            .core_samples
            .iter()
            .any(|s| s.len() != CLUSTER_FEATURES.len())
        {
            return Err(corrupted("density model core sample has wrong width"));
        }
        Ok(())
    }

    /// Label of the nearest core sample within `eps`, or -1 (noise).
    pub fn assign(&self, z: &[f64; 4]) -> i64 {
        let eps2 = self.eps * self.eps;
        let mut best: Option<(f64, i64)> = None;
        for (sample, label) in self.core_samples.iter().zip(&self.core_labels) {
            let d = squared_distance(z, sample);
            if d <= eps2 && best.is_none_or(|(bd, _)| d < bd) {
                best = Some((d, *label));
            }
        }
        best.map(|(_, label)| label).unwrap_or(-1)
    }
}

/// Aggregates for one cluster of the training table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ClusterProfile {
    pub cluster_id: usize,
    pub archetype: String,
    pub size: usize,
    pub avg_uploads: f64,
    pub avg_subscribers: f64,
    pub avg_earnings: f64,
    pub avg_growth: f64,
    pub dominant_category: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ClusterAssignment {
    pub cluster_id: usize,
    pub archetype: String,
}

/// One labelled training row, as exported to `clustered_channels.jsonl`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterTrainingRow {
    pub uploads: f64,
    pub subscribers: f64,
    #[serde(rename = "highest_yearly_earnings")]
    pub earnings: f64,
    #[serde(rename = "growth_target")]
    pub growth: f64,
    pub category: String,
    pub country: String,
    #[serde(rename = "kmeans_cluster")]
    pub cluster: usize,
    #[serde(rename = "dbscan_cluster")]
    pub density_cluster: i64,
}

#[derive(Serialize)]
struct ClusteredChannel<'a> {
    #[serde(flatten)]
    row: &'a ClusterTrainingRow,
    archetype: String,
}

/// Per-cluster means used by the archetype heuristic.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClusterMeans {
    pub cluster_id: usize,
    pub uploads: f64,
    pub earnings: f64,
    pub growth: f64,
}

/// First index holding the maximum score; NaN scores never win.
fn argmax_first(scores: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &s) in scores.iter().enumerate() {
        if s.is_nan() {
            continue;
        }
        if best.is_none_or(|(_, b)| s > b) {
            best = Some((i, s));
        }
    }
    best.map(|(i, _)| i)
}

/// Name clusters by the fixed four-step ranking heuristic.
///
/// Steps run over the clusters not yet named, in ascending id order, and
/// are skipped once no candidates remain.
pub fn name_archetypes(means: &[ClusterMeans]) -> BTreeMap<usize, String> {
    let mut remaining: Vec<ClusterMeans> = means.to_vec();
    remaining.sort_by_key(|m| m.cluster_id);
    let mut names = BTreeMap::new();

    let mut take = |remaining: &mut Vec<ClusterMeans>, scores: Vec<f64>, label: &str| {
        if let Some(i) = argmax_first(&scores) {
            let chosen = remaining.remove(i);
            names.insert(chosen.cluster_id, label.to_string());
        }
    };

    let growth: Vec<f64> = remaining.iter().map(|m| m.growth).collect();
    take(&mut remaining, growth, ARCHETYPE_VIRAL);

    let per_upload: Vec<f64> = remaining
        .iter()
        .map(|m| m.earnings / (m.uploads + 1.0))
        .collect();
    take(&mut remaining, per_upload, ARCHETYPE_HIGH_EARNING);

    let upload_ranks =
        yts_math::percentile_ranks(&remaining.iter().map(|m| m.uploads).collect::<Vec<_>>());
    let growth_ranks =
        yts_math::percentile_ranks(&remaining.iter().map(|m| m.growth).collect::<Vec<_>>());
    let gap: Vec<f64> = upload_ranks
        .iter()
        .zip(&growth_ranks)
        .map(|(u, g)| u - g)
        .collect();
    take(&mut remaining, gap, ARCHETYPE_HIGH_UPLOAD);

    for m in remaining {
        names.insert(m.cluster_id, ARCHETYPE_CONSISTENT.to_string());
    }
    names
}

fn mean_of(rows: &[&ClusterTrainingRow], f: impl Fn(&ClusterTrainingRow) -> f64) -> f64 {
    rows.iter().map(|r| f(r)).sum::<f64>() / rows.len() as f64
}

/// Most frequent category; ties resolve to the lexicographically smallest.
fn dominant_category(rows: &[&ClusterTrainingRow]) -> String {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for row in rows {
        *counts.entry(row.category.as_str()).or_default() += 1;
    }
    let mut best: Option<(&str, usize)> = None;
    for (category, count) in counts {
        if best.is_none_or(|(_, c)| count > c) {
            best = Some((category, count));
        }
    }
    best.map(|(c, _)| c.to_string())
        .unwrap_or_else(|| "Unknown".to_string())
}

fn group_by_cluster(rows: &[ClusterTrainingRow]) -> BTreeMap<usize, Vec<&ClusterTrainingRow>> {
    let mut groups: BTreeMap<usize, Vec<&ClusterTrainingRow>> = BTreeMap::new();
    for row in rows {
        groups.entry(row.cluster).or_default().push(row);
    }
    groups
}

/// Profiles for every non-empty cluster, sorted by id.
pub fn build_profiles(
    rows: &[ClusterTrainingRow],
    archetypes: &BTreeMap<usize, String>,
) -> Vec<ClusterProfile> {
    group_by_cluster(rows)
        .into_iter()
        .map(|(id, members)| ClusterProfile {
            cluster_id: id,
            archetype: archetype_or_fallback(archetypes, id),
            size: members.len(),
            avg_uploads: mean_of(&members, |r| r.uploads),
            avg_subscribers: mean_of(&members, |r| r.subscribers),
            avg_earnings: mean_of(&members, |r| r.earnings),
            avg_growth: mean_of(&members, |r| r.growth),
            dominant_category: dominant_category(&members),
        })
        .collect()
}

fn archetype_or_fallback(archetypes: &BTreeMap<usize, String>, id: usize) -> String {
    archetypes
        .get(&id)
        .cloned()
        .unwrap_or_else(|| format!("Cluster {}", id))
}

/// Fitted clustering models plus cached profiles and names.
#[derive(Debug, Clone)]
pub struct ClusteringBundle {
    scaler: StandardScaler,
    kmeans: KMeansModel,
    dbscan: DbscanModel,
    profiles: Vec<ClusterProfile>,
    archetypes: BTreeMap<usize, String>,
}

impl ClusteringBundle {
    /// Assemble from externally fitted models and the labelled training
    /// rows. Archetypes and profiles are computed here, once.
    pub fn from_fit(
        scaler: StandardScaler,
        kmeans: KMeansModel,
        dbscan: DbscanModel,
        rows: &[ClusterTrainingRow],
    ) -> Result<Self> {
        if let Some(row) = rows.iter().find(|r| r.cluster >= kmeans.k()) {
            return Err(corrupted(format!(
                "training row labelled {} but only {} clusters exist",
                row.cluster,
                kmeans.k()
            )));
        }

        let means: Vec<ClusterMeans> = group_by_cluster(rows)
            .into_iter()
            .map(|(id, members)| ClusterMeans {
                cluster_id: id,
                uploads: mean_of(&members, |r| r.uploads),
                earnings: mean_of(&members, |r| r.earnings),
                growth: mean_of(&members, |r| r.growth),
            })
            .collect();
        let archetypes = name_archetypes(&means);
        let profiles = build_profiles(rows, &archetypes);

        Self::from_parts(scaler, kmeans, dbscan, profiles, archetypes)
    }

    /// Assemble from stored parts and validate them.
    pub fn from_parts(
        scaler: StandardScaler,
        kmeans: KMeansModel,
        dbscan: DbscanModel,
        profiles: Vec<ClusterProfile>,
        archetypes: BTreeMap<usize, String>,
    ) -> Result<Self> {
        scaler.validate()?;
        kmeans.validate()?;
        dbscan.validate()?;
        if profiles
            .windows(2)
            .any(|w| w[0].cluster_id >= w[1].cluster_id)
        {
            return Err(corrupted("profiles are not sorted by cluster id"));
        }
        if let Some(id) = archetypes.keys().find(|id| **id >= kmeans.k()) {
            return Err(corrupted(format!("archetype for unknown cluster {}", id)));
        }
        Ok(Self {
            scaler,
            kmeans,
            dbscan,
            profiles,
            archetypes,
        })
    }

    /// Load and verify a bundle file.
    pub fn load(path: &Path) -> Result<Self> {
        let mut reader = open_bundle(path, ARTIFACT_NAME, BundleKind::Clustering)?;
        let to_err = |e| bundle_error(ARTIFACT_NAME, e);
        let scaler = reader.read_json(SCALER_FILE).map_err(to_err)?;
        let kmeans = reader.read_json(KMEANS_FILE).map_err(to_err)?;
        let dbscan = reader.read_json(DBSCAN_FILE).map_err(to_err)?;
        let profiles = reader.read_json(PROFILES_FILE).map_err(to_err)?;
        let archetypes = reader.read_json(ARCHETYPES_FILE).map_err(to_err)?;

        let bundle = Self::from_parts(scaler, kmeans, dbscan, profiles, archetypes)?;
        info!(
            path = %path.display(),
            run_id = reader.manifest().run_id.as_deref().unwrap_or("-"),
            clusters = bundle.k(),
            "Clustering bundle loaded"
        );
        Ok(bundle)
    }

    /// Write the bundle as a verified archive.
    pub fn write(&self, path: &Path, run_id: Option<&str>) -> Result<BundleManifest> {
        let mut writer = BundleWriter::new(BundleKind::Clustering)
            .with_producer("yts-core", env!("CARGO_PKG_VERSION"));
        if let Some(run_id) = run_id {
            writer = writer.with_run_id(run_id);
        }
        let to_err = |e| bundle_error(ARTIFACT_NAME, e);
        writer.add_json(SCALER_FILE, &self.scaler).map_err(to_err)?;
        writer.add_json(KMEANS_FILE, &self.kmeans).map_err(to_err)?;
        writer.add_json(DBSCAN_FILE, &self.dbscan).map_err(to_err)?;
        writer.add_json(PROFILES_FILE, &self.profiles).map_err(to_err)?;
        writer.add_json(ARCHETYPES_FILE, &self.archetypes).map_err(to_err)?;
        writer.write(path).map_err(to_err)
    }

    /// Number of centroid clusters.
    pub fn k(&self) -> usize {
        self.kmeans.k()
    }

    pub fn profiles(&self) -> &[ClusterProfile] {
        &self.profiles
    }

    pub fn archetype(&self, cluster_id: usize) -> String {
        archetype_or_fallback(&self.archetypes, cluster_id)
    }

    /// Nearest centroid for a raw feature vector.
    pub fn assign(&self, uploads: f64, subscribers: f64, earnings: f64, growth: f64) -> ClusterAssignment {
        let z = self
            .scaler
            .transform(&[uploads, subscribers, earnings, growth]);
        let cluster_id = self.kmeans.nearest(&z);
        ClusterAssignment {
            cluster_id,
            archetype: self.archetype(cluster_id),
        }
    }

    /// Density-model label for a raw feature vector (-1 means noise).
    pub fn assign_density(&self, uploads: f64, subscribers: f64, earnings: f64, growth: f64) -> i64 {
        let z = self
            .scaler
            .transform(&[uploads, subscribers, earnings, growth]);
        self.dbscan.assign(&z)
    }

    /// Export the labelled training table with archetype names.
    pub fn write_clustered_channels(&self, path: &Path, rows: &[ClusterTrainingRow]) -> Result<()> {
        let out: Vec<ClusteredChannel<'_>> = rows
            .iter()
            .map(|row| ClusteredChannel {
                row,
                archetype: self.archetype(row.cluster),
            })
            .collect();
        crate::fsutil::write_jsonl_atomic(path, &out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn means(id: usize, uploads: f64, earnings: f64, growth: f64) -> ClusterMeans {
        ClusterMeans {
            cluster_id: id,
            uploads,
            earnings,
            growth,
        }
    }

    fn row(cluster: usize, uploads: f64, growth: f64, category: &str) -> ClusterTrainingRow {
        ClusterTrainingRow {
            uploads,
            subscribers: 1000.0,
            earnings: 5000.0,
            growth,
            category: category.into(),
            country: "US".into(),
            cluster,
            density_cluster: 0,
        }
    }

    #[test]
    fn test_archetypes_four_clusters() {
        let names = name_archetypes(&[
            means(0, 100.0, 1_000.0, 10.0),
            means(1, 50.0, 900_000.0, 20.0),
            means(2, 5_000.0, 10_000.0, 5.0),
            means(3, 10.0, 1_000.0, 90_000.0),
        ]);
        assert_eq!(names[&3], ARCHETYPE_VIRAL);
        assert_eq!(names[&1], ARCHETYPE_HIGH_EARNING);
        assert_eq!(names[&2], ARCHETYPE_HIGH_UPLOAD);
        assert_eq!(names[&0], ARCHETYPE_CONSISTENT);
    }

    #[test]
    fn test_archetypes_small_k_skips_steps() {
        let names = name_archetypes(&[means(0, 1.0, 1.0, 1.0)]);
        assert_eq!(names.len(), 1);
        assert_eq!(names[&0], ARCHETYPE_VIRAL);

        let names = name_archetypes(&[means(0, 1.0, 1.0, 1.0), means(1, 1.0, 5.0, 0.5)]);
        assert_eq!(names[&1], ARCHETYPE_HIGH_EARNING);
    }

    #[test]
    fn test_archetype_tie_goes_to_lowest_id() {
        let names = name_archetypes(&[means(0, 1.0, 1.0, 7.0), means(1, 1.0, 1.0, 7.0)]);
        assert_eq!(names[&0], ARCHETYPE_VIRAL);
    }

    #[test]
    fn test_archetypes_many_clusters_fallback_label() {
        let all: Vec<_> = (0..6)
            .map(|i| means(i, i as f64, 1.0, i as f64))
            .collect();
        let names = name_archetypes(&all);
        assert_eq!(names.len(), 6);
        assert_eq!(
            names.values().filter(|n| *n == ARCHETYPE_CONSISTENT).count(),
            3
        );
    }

    #[test]
    fn test_profiles_sorted_with_mode() {
        let rows = vec![
            row(1, 10.0, 1.0, "Music"),
            row(0, 20.0, 2.0, "Gaming"),
            row(1, 30.0, 3.0, "Music"),
            row(1, 50.0, 5.0, "Comedy"),
        ];
        let profiles = build_profiles(&rows, &BTreeMap::new());
        assert_eq!(profiles.len(), 2);
        assert_eq!(profiles[0].cluster_id, 0);
        assert_eq!(profiles[1].size, 3);
        assert_eq!(profiles[1].avg_uploads, 30.0);
        assert_eq!(profiles[1].dominant_category, "Music");
        assert_eq!(profiles[1].archetype, "Cluster 1");
    }

    #[test]
    fn test_kmeans_nearest_uses_scaler() {
        let scaler = StandardScaler::new([100.0, 0.0, 0.0, 0.0], [10.0, 1.0, 1.0, 1.0]);
        let kmeans = KMeansModel {
            centroids: vec![vec![0.0; 4], vec![5.0, 0.0, 0.0, 0.0]],
        };
        let dbscan = DbscanModel {
            eps: 0.5,
            min_samples: 2,
            core_samples: vec![vec![5.0, 0.0, 0.0, 0.0]],
            core_labels: vec![3],
        };
        let rows = vec![row(0, 100.0, 1.0, "A"), row(1, 150.0, 9.0, "B")];
        let bundle = ClusteringBundle::from_fit(scaler, kmeans, dbscan, &rows).unwrap();

        assert_eq!(bundle.assign(101.0, 0.0, 0.0, 0.0).cluster_id, 0);
        let far = bundle.assign(149.0, 0.0, 0.0, 0.0);
        assert_eq!(far.cluster_id, 1);
        assert_eq!(far.archetype, ARCHETYPE_VIRAL);

        assert_eq!(bundle.assign_density(150.0, 0.0, 0.0, 0.0), 3);
        assert_eq!(bundle.assign_density(100.0, 0.0, 0.0, 0.0), -1);
    }

    #[test]
    fn test_from_fit_rejects_unknown_label() {
        let scaler = StandardScaler::new([0.0; 4], [1.0; 4]);
        let kmeans = KMeansModel {
            centroids: vec![vec![0.0; 4]],
        };
        let dbscan = DbscanModel {
            eps: 1.0,
            min_samples: 1,
            core_samples: vec![],
            core_labels: vec![],
        };
        let err = ClusteringBundle::from_fit(scaler, kmeans, dbscan, &[row(2, 1.0, 1.0, "A")])
            .unwrap_err();
        assert!(matches!(err, Error::ArtifactCorrupted { .. }));
    }

    #[test]
    fn test_scaler_rejects_reordered_features() {
        let mut scaler = StandardScaler::new([0.0; 4], [1.0; 4]);
        scaler.features.reverse();
        assert!(scaler.validate().is_err());
    }
}
