//! Flux Parser
//!
//! Best-effort decompiler from Flux text back into a [`QueryModel`].
//!
//! # Recognized Lines
//!
//! Each trimmed, non-empty line is matched against these recognizers in order;
//! the first match wins and a pattern may start anywhere in the line:
//!
//! ```text
//! ... yield ...                                        (skipped)
//! from(bucket: "<name>")
//! range(start: <start>[, stop: <stop>])
//! filter(fn: (r) => r._measurement == "<value>")
//! filter(fn: (r) => r._field == "<a>" or r._field == "<b>" ...)
//! ```
//!
//! A line that matches nothing but contains `|>` is a stage outside the
//! supported subset. One such line turns the whole input into raw text.

use nom::{
    bytes::complete::{tag, take_till1, take_while1},
    character::complete::{char, multispace0, multispace1},
    combinator::{map_opt, opt},
    multi::separated_list1,
    sequence::{delimited, preceded, tuple},
    IResult,
};

use crate::flux::model::{Bucket, DateRange, Filter, FilterKind, FilterValue, QueryModel, QueryPart};

const PIPE: &str = "|>";

/// Parse Flux text into a model
///
/// Never fails: text outside the supported subset comes back as
/// `QueryModel { parts: [], raw_text: Some(text) }`.
pub fn parse(text: &str) -> QueryModel {
    if text.trim().is_empty() {
        return QueryModel::new();
    }

    let mut parts = Vec::new();
    let mut complex = false;

    for line in text.lines().map(str::trim).filter(|line| !line.is_empty()) {
        match recognize_line(line) {
            Line::Yield => {}
            Line::Part(part) => parts.push(part),
            Line::Unrecognized if line.contains(PIPE) => {
                tracing::debug!(line, "unsupported pipeline stage");
                complex = true;
            }
            Line::Unrecognized => {}
        }
    }

    if complex {
        return QueryModel::raw(text);
    }

    QueryModel::from_parts(parts)
}

/// Outcome of matching one line
#[derive(Debug, PartialEq)]
enum Line {
    Yield,
    Part(QueryPart),
    Unrecognized,
}

fn recognize_line(line: &str) -> Line {
    if line.contains("yield") {
        return Line::Yield;
    }

    if let Some(bucket) = scan(line, "from(", bucket_call) {
        return Line::Part(QueryPart::Bucket(bucket));
    }

    if let Some(range) = scan(line, "range(", range_call) {
        return Line::Part(QueryPart::DateRange(range));
    }

    if let Some(filter) = scan(line, "filter(", filter_call) {
        return Line::Part(QueryPart::Filter(filter));
    }

    Line::Unrecognized
}

/// Run `parser` at every occurrence of `anchor` in the line, keeping the first success
fn scan<'a, O>(
    line: &'a str,
    anchor: &str,
    parser: fn(&'a str) -> IResult<&'a str, O>,
) -> Option<O> {
    line.match_indices(anchor)
        .find_map(|(offset, _)| parser(&line[offset..]).ok().map(|(_, out)| out))
}

/// `from(bucket: "<name>")`
fn bucket_call(input: &str) -> IResult<&str, Bucket> {
    let (input, _) = tag("from(bucket:")(input)?;
    let (input, _) = multispace0(input)?;
    let (input, name) = quoted(input)?;
    let (input, _) = char(')')(input)?;

    Ok((input, Bucket::named(name)))
}

/// `range(start: <start>[, stop: <stop>])`
fn range_call(input: &str) -> IResult<&str, DateRange> {
    let (input, _) = tag("range(start:")(input)?;
    let (input, _) = multispace0(input)?;
    let (input, start) =
        take_while1(|c: char| c != ',' && c != ')' && !c.is_whitespace())(input)?;
    let (input, stop) = opt(preceded(
        tuple((multispace0, char(','), multispace0, tag("stop:"), multispace0)),
        take_till1(|c| c == ')'),
    ))(input)?;
    let (input, _) = char(')')(input)?;

    Ok((
        input,
        DateRange {
            start: start.to_string(),
            stop: stop.map(str::to_string),
        },
    ))
}

/// `filter(fn: (r) => <clause> [or <clause> ...])`, all clauses on one column
fn filter_call(input: &str) -> IResult<&str, Filter> {
    let (input, _) = tag("filter(fn:")(input)?;
    let (input, _) = multispace0(input)?;
    let (input, _) = tag("(r)")(input)?;
    let (input, _) = multispace0(input)?;
    let (input, _) = tag("=>")(input)?;
    let (input, _) = multispace0(input)?;
    let (input, filter) = map_opt(
        separated_list1(delimited(multispace1, tag("or"), multispace1), equality_clause),
        same_column_filter,
    )(input)?;
    let (input, _) = char(')')(input)?;

    Ok((input, filter))
}

/// `r._measurement == "<value>"` or `r._field == "<value>"`
fn equality_clause(input: &str) -> IResult<&str, (FilterKind, &str)> {
    let (input, _) = tag("r.")(input)?;
    let (input, kind) = map_opt(
        take_while1(|c: char| c == '_' || c.is_ascii_alphanumeric()),
        FilterKind::from_column,
    )(input)?;
    let (input, _) = tuple((multispace0, tag("=="), multispace0))(input)?;
    let (input, operand) = quoted(input)?;

    Ok((input, (kind, operand)))
}

fn same_column_filter(clauses: Vec<(FilterKind, &str)>) -> Option<Filter> {
    let kind = clauses.first()?.0;
    if clauses.iter().any(|(k, _)| *k != kind) {
        return None;
    }

    let value = match clauses.as_slice() {
        [(_, single)] => FilterValue::Single(single.to_string()),
        many => FilterValue::Many(many.iter().map(|(_, v)| v.to_string()).collect()),
    };

    Some(Filter { kind, value })
}

/// Double-quoted, non-empty, no escapes
fn quoted(input: &str) -> IResult<&str, &str> {
    delimited(char('"'), take_till1(|c| c == '"'), char('"'))(input)
}
