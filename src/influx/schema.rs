//! Schema listing queries
//!
//! Measurements and fields are discovered with ordinary Flux queries built
//! from the same part lines the query builder emits.

use crate::flux::{
    part_line,
    parts::{bucket_part, date_range_part, measurement_filter_part},
    Bucket, DateRange, QueryPart,
};
use crate::influx::table::FluxTable;

/// Distinct measurements of `bucket`
pub fn measurements_query(bucket: &str, lookback: &str) -> String {
    listing_query(
        &[
            bucket_part(Bucket::named(bucket)),
            date_range_part(DateRange::since(lookback)),
        ],
        "_measurement",
    )
}

/// Distinct fields of `measurement` in `bucket`
pub fn fields_query(bucket: &str, measurement: &str, lookback: &str) -> String {
    listing_query(
        &[
            bucket_part(Bucket::named(bucket)),
            date_range_part(DateRange::since(lookback)),
            measurement_filter_part(measurement),
        ],
        "_field",
    )
}

fn listing_query(parts: &[QueryPart], column: &str) -> String {
    let mut lines: Vec<String> = parts.iter().filter_map(part_line).collect();
    lines.push(format!("    |> keep(columns: [\"{}\"])", column));
    lines.push(format!("    |> distinct(column: \"{}\")", column));
    lines.join("\n")
}

/// Collect distinct names from listing results
///
/// `distinct()` reports values in `_value`; older servers keep them in the
/// source column, which is used as a fallback.
pub fn distinct_values(tables: &[FluxTable], column: &str) -> Vec<String> {
    let mut values: Vec<String> = Vec::new();

    for table in tables {
        let source = if table.column_index("_value").is_some() {
            "_value"
        } else {
            column
        };

        for value in table.column_values(source) {
            if !values.iter().any(|v| v == value) {
                values.push(value.to_string());
            }
        }
    }

    values
}
