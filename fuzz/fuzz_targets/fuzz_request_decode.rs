//! Fuzz target for API request decoding.
//!
//! Feeds arbitrary bodies and query strings through the router without
//! loading artifacts. Every input must map to an HTTP status, never a panic.

#![no_main]

use libfuzzer_sys::fuzz_target;
use std::sync::{Arc, OnceLock};
use yts_common::{ArtifactPaths, TrackingConfig};
use yts_core::api::{parse_query, Router};
use yts_core::ServiceHandle;

static ROUTER: OnceLock<Option<Router>> = OnceLock::new();

fn router() -> Option<&'static Router> {
    ROUTER
        .get_or_init(|| {
            let root = std::env::temp_dir().join("yts-fuzz-empty-root");
            let handle = Arc::new(ServiceHandle::new(ArtifactPaths::from_root(root)));
            Router::new(handle, TrackingConfig::default()).ok()
        })
        .as_ref()
}

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        let _ = parse_query(text);
    }

    let Some(router) = router() else { return };
    for path in [
        "/predict",
        "/predict/batch",
        "/predict/simulate",
        "/mlops/drift-check",
    ] {
        let response = router.handle("POST", path, data);
        assert!((200..600).contains(&response.status));
    }
});
