pub mod aggregator;
pub mod draw;
pub mod exporters;
pub mod generator;
pub mod model;
pub mod state;

pub use aggregator::{Observation, SeriesAggregator, SeriesObservations};
pub use draw::{thread_draw, DrawSource, RngDraw};
pub use exporters::{JsonExporter, PrometheusExporter};
pub use generator::{Generator, GeneratorConfig, IncrementRange};
pub use model::{ModelBuilder, RateStats, SeriesModel};
pub use state::{SeriesState, StateTable};
