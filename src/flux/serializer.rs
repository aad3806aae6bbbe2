//! Flux Serializer
//!
//! Compiles a [`QueryModel`] into Flux text. Pure and total: parts that cannot
//! be rendered (a filter with no values) contribute no line.

use crate::flux::model::{DateRange, Filter, QueryModel, QueryPart};

const PIPE_INDENT: &str = "    |> ";
const YIELD_LINE: &str = "    |> yield(name: \"result\")";

/// Render a model as Flux text
///
/// Raw text wins over parts. A non-empty pipeline always ends with a
/// `yield(name: "result")` stage. No trailing newline.
pub fn to_text(model: &QueryModel) -> String {
    if let Some(raw) = &model.raw_text {
        return raw.clone();
    }

    let mut lines: Vec<String> = model.parts.iter().filter_map(part_line).collect();

    if !lines.is_empty() {
        lines.push(YIELD_LINE.to_string());
    }

    lines.join("\n")
}

/// Render one part as its Flux line
pub(crate) fn part_line(part: &QueryPart) -> Option<String> {
    match part {
        QueryPart::Bucket(bucket) => Some(format!("from(bucket: \"{}\")", bucket.name)),
        QueryPart::DateRange(range) => Some(range_line(range)),
        QueryPart::Filter(filter) => filter_line(filter),
    }
}

fn range_line(range: &DateRange) -> String {
    match &range.stop {
        Some(stop) => format!("{}range(start: {}, stop: {})", PIPE_INDENT, range.start, stop),
        None => format!("{}range(start: {})", PIPE_INDENT, range.start),
    }
}

fn filter_line(filter: &Filter) -> Option<String> {
    let column = filter.kind.column();
    let values = filter.value.values();

    if values.is_empty() {
        return None;
    }

    let predicate = values
        .iter()
        .map(|value| format!("r.{} == \"{}\"", column, value))
        .collect::<Vec<_>>()
        .join(" or ");

    Some(format!("{}filter(fn: (r) => {})", PIPE_INDENT, predicate))
}
