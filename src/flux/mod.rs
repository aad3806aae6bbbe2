//! Flux Query Builder Model
//!
//! Keeps a structured, order-sensitive list of query parts and the Flux text
//! it compiles to in sync:
//!
//! - **Model**: Typed query parts (bucket, date range, filter)
//! - **Serializer**: Parts to Flux text
//! - **Parser**: Flux text back to parts, with raw-text fallback
//! - **Parts**: Pure constructors and positional editors
//! - **Builder**: Selection workflow over a model plus cached listings
//!
//! # Supported Subset
//!
//! ```text
//! from(bucket: "<name>")
//!     |> range(start: <start>[, stop: <stop>])
//!     |> filter(fn: (r) => r._measurement == "<measurement>")
//!     |> filter(fn: (r) => r._field == "<field>" [or r._field == "<field>" ...])
//!     |> yield(name: "result")
//! ```
//!
//! Anything with another pipeline stage is kept verbatim as raw text.
//!
//! # Example
//!
//! ```rust
//! use fluxbuilder::flux::{parse, to_text, Bucket, DateRange, QueryModel};
//! use fluxbuilder::flux::parts::{append_part, bucket_part, date_range_part, measurement_filter_part};
//!
//! let model = QueryModel::new();
//! let model = append_part(&model, bucket_part(Bucket::named("metrics")));
//! let model = append_part(&model, date_range_part(DateRange::since("-1h")));
//! let model = append_part(&model, measurement_filter_part("cpu"));
//!
//! let text = to_text(&model);
//! assert_eq!(parse(&text), model);
//! ```

mod builder;
mod model;
mod parser;
pub mod parts;
mod serializer;

pub use builder::{FieldLookup, QueryBuilder, SelectionTitles, DEFAULT_RANGE_START};
pub use model::{Bucket, DateRange, Filter, FilterKind, FilterValue, QueryModel, QueryPart};
pub use parser::parse;
pub use serializer::to_text;

pub(crate) use serializer::part_line;
