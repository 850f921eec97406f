//! Property-based tests for drift baseline and scoring invariants.

use proptest::prelude::*;
use yts_core::features::ChannelRecord;
use yts_core::mlops::drift::{build_baseline, score, Severity};
use yts_core::service::PredictionRequest;

fn record_strategy() -> impl Strategy<Value = ChannelRecord> {
    (
        prop::option::of(0.0f64..2_000_000.0),
        prop::option::of(prop::sample::select(vec!["Music", "Gaming", "Education"])),
        prop::option::of(prop::sample::select(vec!["India", "Brazil"])),
        prop::option::of(0.0f64..100.0),
    )
        .prop_map(|(uploads, category, country, age)| ChannelRecord {
            uploads,
            category: category.map(str::to_string),
            country: country.map(str::to_string),
            age,
            ..Default::default()
        })
}

fn mean_of(rows: &[ChannelRecord], f: impl Fn(&ChannelRecord) -> Option<f64>) -> f64 {
    rows.iter().map(|r| f(r).unwrap_or(0.0)).sum::<f64>() / rows.len() as f64
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn frequency_tables_sum_to_one(rows in prop::collection::vec(record_strategy(), 1..60)) {
        let baseline = build_baseline(&rows);
        for table in baseline.categorical.values() {
            let total: f64 = table.values().sum();
            // each entry is rounded to 6 decimals
            prop_assert!((total - 1.0).abs() <= 1e-6 * table.len() as f64 + 1e-12,
                "table sums to {}", total);
        }
    }

    #[test]
    fn std_is_positive_and_finite(rows in prop::collection::vec(record_strategy(), 1..60)) {
        let baseline = build_baseline(&rows);
        for stats in baseline.numeric.values() {
            prop_assert!(stats.std.is_finite());
            prop_assert!(stats.std > 0.0);
        }
    }

    #[test]
    fn item_at_the_mean_has_zero_z(
        rows in prop::collection::vec(record_strategy(), 2..60),
        z_threshold in 0.1f64..10.0,
    ) {
        let baseline = build_baseline(&rows);
        let item = ChannelRecord {
            uploads: Some(mean_of(&rows, |r| r.uploads)),
            age: Some(mean_of(&rows, |r| r.age)),
            category: rows[0].category.clone(),
            country: rows[0].country.clone(),
            ..Default::default()
        };
        let report = score(&[item], &baseline, z_threshold, 0.0);
        let numeric_warnings = report.records[0]
            .warnings
            .iter()
            .filter(|w| w.starts_with("uploads") || w.starts_with("age"))
            .count();
        prop_assert_eq!(numeric_warnings, 0);
    }

    #[test]
    fn records_keep_input_order(
        rows in prop::collection::vec(record_strategy(), 1..30),
        uploads in prop::collection::vec(0i64..2_000_000, 1..40),
    ) {
        let baseline = build_baseline(&rows);
        let items: Vec<PredictionRequest> = uploads
            .iter()
            .map(|&u| PredictionRequest {
                uploads: u,
                category: "Music".to_string(),
                country: "India".to_string(),
                age: 5,
            })
            .collect();
        let report = score(&items, &baseline, 3.0, 0.01);
        prop_assert_eq!(report.records.len(), items.len());
        for (i, record) in report.records.iter().enumerate() {
            prop_assert_eq!(record.index, i);
        }
        let high = report.records.iter().filter(|r| r.severity == Severity::High).count();
        prop_assert_eq!(report.summary.high_severity_records, high);
        prop_assert_eq!(report.summary.is_drift_risk, high > 0);
    }

    #[test]
    fn severity_follows_warning_count(
        rows in prop::collection::vec(record_strategy(), 1..30),
        uploads in 0i64..2_000_000,
    ) {
        let baseline = build_baseline(&rows);
        let item = PredictionRequest {
            uploads,
            category: "Unseen".to_string(),
            country: "Nowhere".to_string(),
            age: 50,
        };
        let report = score(&[item], &baseline, 3.0, 0.01);
        let record = &report.records[0];
        // two unseen categories alone make it high
        prop_assert!(record.warnings.len() >= 2);
        prop_assert_eq!(record.severity, Severity::High);
    }
}
