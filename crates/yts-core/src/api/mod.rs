//! HTTP boundary of the intelligence service.
//!
//! - [`router`]: socket-free routing, validation and status mapping
//! - [`server`]: `tiny_http` worker pool in front of a [`Router`]
//! - [`metrics`]: Prometheus request counters rendered at `/metrics`

pub mod metrics;
pub mod router;
pub mod server;

pub use metrics::RequestMetrics;
pub use router::{parse_query, route_paths, Response, Router};
pub use server::{ApiServer, ServerConfig};
