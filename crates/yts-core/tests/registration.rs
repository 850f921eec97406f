//! Registration runs: report generation, manifest, registry and readiness.

mod support;

use support::*;
use yts_common::hash::file_sha256;
use yts_common::{Error, RunId, TrackingConfig};
use yts_core::dataset;
use yts_core::mlops::drift::load_baseline;
use yts_core::mlops::registry::ARTIFACT_NAMES;
use yts_core::mlops::ArtifactRegistry;
use yts_core::pipeline::{label_rows, register_run, RegistrationOptions};

fn options_with_run(run_id: &str) -> RegistrationOptions {
    RegistrationOptions {
        run_id: RunId::parse(run_id),
        ..RegistrationOptions::default()
    }
}

// ============================================================================
// Readiness
// ============================================================================

mod readiness {
    use super::*;

    #[test]
    fn empty_project_lists_every_artifact_missing() {
        let project = Project::empty();
        let report = ArtifactRegistry::new(project.paths.clone()).check_ready();
        assert!(!report.ready);
        assert_eq!(report.missing, ARTIFACT_NAMES.to_vec());
        assert_eq!(report.artifacts.len(), ARTIFACT_NAMES.len());
    }

    #[test]
    fn bundles_alone_are_not_ready() {
        let project = Project::trained();
        let report = ArtifactRegistry::new(project.paths.clone()).check_ready();
        assert!(!report.ready);
        assert!(!report.missing.contains(&"supervised_bundle".to_string()));
        assert!(report.missing.contains(&"training_manifest".to_string()));
    }

    #[test]
    fn registered_project_is_ready() {
        let project = Project::registered();
        let report = ArtifactRegistry::new(project.paths.clone()).check_ready();
        assert!(report.ready, "missing: {:?}", report.missing);
        assert!(report.missing.is_empty());
    }
}

// ============================================================================
// Registration runs
// ============================================================================

mod runs {
    use super::*;

    #[test]
    fn run_writes_reports_in_order() {
        let project = Project::trained();
        let outcome = project.register();
        let names: Vec<&str> = outcome.written.iter().map(|(name, _)| *name).collect();
        assert_eq!(
            names,
            vec![
                "data_quality_report",
                "training_baseline",
                "feature_store_snapshot",
                "clustered_channels",
                "training_metrics",
                "training_manifest",
                "model_registry",
            ]
        );
        for (name, path) in &outcome.written {
            assert!(path.exists(), "{name} not written");
        }
        assert_eq!(outcome.rows, 8);
    }

    #[test]
    fn baseline_reflects_dataset() {
        let project = Project::registered();
        let baseline = load_baseline(&project.paths.training_baseline())
            .unwrap()
            .expect("baseline written");
        assert!((baseline.numeric["uploads"].mean - 527.5).abs() < 1e-9);
        assert!((baseline.numeric["age"].mean - 7.0).abs() < 1e-9);
        assert_eq!(baseline.categorical["category"]["Music"], 0.5);
        assert_eq!(baseline.categorical["country"]["India"], 0.625);
        let total: f64 = baseline.categorical["country"].values().sum();
        assert!((total - 1.0).abs() < 1e-6);
    }

    #[test]
    fn manifest_hashes_existing_artifacts() {
        let project = Project::trained();
        let outcome = project.register();
        let manifest = &outcome.manifest;

        assert_eq!(manifest.run_id, outcome.run_id.to_string());
        assert_eq!(
            manifest.data_sha256,
            file_sha256(&project.paths.data_path).unwrap()
        );
        assert_eq!(
            manifest.artifact_hashes["supervised_bundle"],
            file_sha256(&project.paths.supervised_bundle()).unwrap()
        );
        // the manifest did not exist yet when it was built
        assert!(!manifest.artifact_hashes.contains_key("training_manifest"));
        assert_eq!(manifest.artifact_hashes.len(), ARTIFACT_NAMES.len() - 1);
        assert_eq!(
            manifest.artifact_hashes.keys().collect::<Vec<_>>(),
            manifest.artifact_paths.keys().collect::<Vec<_>>()
        );
    }

    #[test]
    fn stored_manifest_matches_outcome() {
        let project = Project::trained();
        let outcome = project.register();
        let stored = ArtifactRegistry::new(project.paths.clone())
            .load_manifest()
            .unwrap()
            .expect("manifest written");
        assert_eq!(stored, outcome.manifest);
        assert_eq!(stored.metrics.clusters.len(), 2);
    }

    #[test]
    fn registry_accumulates_runs() {
        let project = Project::trained();
        let first = "20260101T000000Z-aaaaaaaa";
        let second = "20260102T000000Z-bbbbbbbb";
        register_run(&project.paths, &options_with_run(first)).unwrap();
        let outcome = register_run(&project.paths, &options_with_run(second)).unwrap();

        assert_eq!(outcome.registry.active_run_id.as_deref(), Some(second));
        let ids: Vec<&str> = outcome.registry.runs.iter().map(|r| r.run_id.as_str()).collect();
        assert!(ids.contains(&first));
        assert!(ids.contains(&second));
        assert_eq!(ids.len(), 2);
    }

    #[test]
    fn rerunning_a_run_id_replaces_its_entry() {
        let project = Project::trained();
        let run = "20260101T000000Z-cccccccc";
        register_run(&project.paths, &options_with_run(run)).unwrap();
        let outcome = register_run(&project.paths, &options_with_run(run)).unwrap();
        assert_eq!(outcome.registry.runs.len(), 1);
        // second run sees the first run's manifest on disk
        assert!(outcome.manifest.artifact_hashes.contains_key("training_manifest"));
    }

    #[test]
    fn corrupt_registry_starts_fresh() {
        let project = Project::trained();
        std::fs::create_dir_all(&project.paths.mlops_dir).unwrap();
        std::fs::write(project.paths.model_registry(), b"{ not json").unwrap();
        let outcome = project.register();
        assert_eq!(outcome.registry.runs.len(), 1);
    }

    #[test]
    fn empty_dataset_rejected_before_writing() {
        let project = Project::trained();
        write_dataset(&project.paths.data_path, &[]);
        let err = project_err(&project);
        assert!(matches!(err, Error::Dataset { line: 0, .. }), "got {err:?}");
        assert!(!project.paths.training_manifest().exists());
    }

    fn project_err(project: &Project) -> Error {
        register_run(&project.paths, &RegistrationOptions::default()).unwrap_err()
    }

    #[test]
    fn jsonl_tracking_records_the_run() {
        let project = Project::trained();
        let options = RegistrationOptions {
            tracking: TrackingConfig::default().with_backends(["jsonl"]),
            ..RegistrationOptions::default()
        };
        let outcome = register_run(&project.paths, &options).unwrap();

        let log = project
            .paths
            .tracking_dir()
            .join(format!("{}.jsonl", outcome.run_id));
        let events: Vec<String> = std::fs::read_to_string(&log)
            .unwrap()
            .lines()
            .map(|line| {
                let value: serde_json::Value = serde_json::from_str(line).unwrap();
                value["event"].as_str().unwrap_or_default().to_string()
            })
            .collect();
        assert_eq!(events.first().map(String::as_str), Some("start"));
        assert_eq!(events.last().map(String::as_str), Some("end"));
        assert!(events.iter().any(|e| e == "params"));
        assert!(events.iter().any(|e| e == "metrics"));
    }

    #[test]
    fn strict_tracking_fails_on_unknown_backend() {
        let project = Project::trained();
        let options = RegistrationOptions {
            tracking: TrackingConfig::default()
                .with_backends(["mlflow"])
                .with_strict(true),
            ..RegistrationOptions::default()
        };
        let err = register_run(&project.paths, &options).unwrap_err();
        assert!(matches!(err, Error::Tracking(_)), "got {err:?}");
    }
}

// ============================================================================
// Clustered channel export
// ============================================================================

mod clustered_channels {
    use super::*;

    #[test]
    fn labels_match_fixture_groups() {
        let bundle = clustering_bundle();
        let labelled = label_rows(&bundle, &channels());
        let clusters: Vec<usize> = labelled.iter().map(|r| r.cluster).collect();
        assert_eq!(clusters, vec![0, 0, 0, 0, 1, 1, 1, 1]);
    }

    #[test]
    fn export_carries_archetypes() {
        let project = Project::registered();
        let text = std::fs::read_to_string(project.paths.clustered_channels()).unwrap();
        let rows: Vec<serde_json::Value> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(rows.len(), 8);
        assert_eq!(rows[0]["kmeans_cluster"], 0);
        assert!(rows[0].get("dbscan_cluster").is_some());
        assert!(rows[7]["archetype"].as_str().is_some());
    }

    #[test]
    fn missing_cells_read_as_defaults() {
        let bundle = clustering_bundle();
        let sparse = yts_core::features::ChannelRecord {
            uploads: Some(1.0),
            ..Default::default()
        };
        let labelled = label_rows(&bundle, &[sparse]);
        assert_eq!(labelled[0].subscribers, 0.0);
        assert_eq!(labelled[0].category, "Unknown");
    }

    #[test]
    fn dataset_round_trips_through_loader() {
        let project = Project::trained();
        let rows = dataset::load_jsonl(&project.paths.data_path).unwrap();
        assert_eq!(rows, channels());
    }
}
