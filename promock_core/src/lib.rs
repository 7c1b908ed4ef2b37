pub mod error;
pub mod labels;
pub mod parser;
pub mod sample;

pub use error::{MockError, ParseError, Result};
pub use labels::{LabelSet, SeriesKey};
pub use parser::{parse_snapshot, parse_snapshot_bytes, ExpositionParser, ParseReport};
pub use sample::{resolve_family, MetricFamily, MetricKind, Sample, SeriesKind};
