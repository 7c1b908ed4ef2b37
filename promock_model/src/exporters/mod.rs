pub mod json;
pub mod prometheus;

pub use json::JsonExporter;
pub use prometheus::{format_value, PrometheusExporter};
