//! Part constructors and positional editors
//!
//! Every function here is pure: models are borrowed and a new model is
//! returned. Uniqueness of bucket/range/filter parts is maintained by
//! [`QueryBuilder`](crate::flux::QueryBuilder), not by these primitives.

use crate::flux::model::{Bucket, DateRange, Filter, FilterKind, FilterValue, QueryModel, QueryPart};

pub fn bucket_part(bucket: Bucket) -> QueryPart {
    QueryPart::Bucket(bucket)
}

pub fn date_range_part(range: DateRange) -> QueryPart {
    QueryPart::DateRange(range)
}

pub fn filter_part(filter: Filter) -> QueryPart {
    QueryPart::Filter(filter)
}

/// `_measurement == name`
pub fn measurement_filter_part(name: impl Into<String>) -> QueryPart {
    QueryPart::Filter(Filter::new(FilterKind::Measurement, name.into()))
}

/// `_field == name`, or a match-any filter when given several names
pub fn field_filter_part(names: impl Into<FilterValue>) -> QueryPart {
    QueryPart::Filter(Filter::new(FilterKind::Field, names))
}

/// Append a part at the end of the pipeline
///
/// Structured editing takes over from raw text, so `raw_text` is dropped.
pub fn append_part(model: &QueryModel, part: QueryPart) -> QueryModel {
    let mut parts = model.parts.clone();
    parts.push(part);
    QueryModel::from_parts(parts)
}

/// Remove the part at `index`
///
/// `raw_text` survives only if no parts remain. An out-of-range index leaves
/// the model unchanged.
pub fn remove_part_at(model: &QueryModel, index: usize) -> QueryModel {
    if index >= model.parts.len() {
        return model.clone();
    }

    let mut parts = model.parts.clone();
    parts.remove(index);

    let raw_text = if parts.is_empty() {
        model.raw_text.clone()
    } else {
        None
    };

    QueryModel { parts, raw_text }
}

/// Replace the part at `index`, keeping `raw_text`
///
/// An out-of-range index leaves the model unchanged.
pub fn replace_part_at(model: &QueryModel, index: usize, part: QueryPart) -> QueryModel {
    let mut next = model.clone();
    if let Some(slot) = next.parts.get_mut(index) {
        *slot = part;
    }
    next
}

/// Keep only the parts for which `keep` returns true
pub fn retain_parts(model: &QueryModel, keep: impl Fn(&QueryPart) -> bool) -> QueryModel {
    QueryModel {
        parts: model.parts.iter().filter(|&part| keep(part)).cloned().collect(),
        raw_text: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> QueryModel {
        QueryModel::from_parts(vec![
            bucket_part(Bucket::named("metrics")),
            date_range_part(DateRange::since("-1h")),
            measurement_filter_part("cpu"),
        ])
    }

    #[test]
    fn test_constructors() {
        assert_eq!(
            measurement_filter_part("cpu"),
            QueryPart::Filter(Filter {
                kind: FilterKind::Measurement,
                value: FilterValue::Single("cpu".into()),
            })
        );
        assert_eq!(
            field_filter_part(vec!["a", "b"]),
            QueryPart::Filter(Filter {
                kind: FilterKind::Field,
                value: FilterValue::Many(vec!["a".into(), "b".into()]),
            })
        );
        assert_eq!(
            filter_part(Filter::new(FilterKind::Field, "x")),
            field_filter_part("x")
        );
    }

    #[test]
    fn test_append_does_not_dedupe() {
        let model = append_part(&sample(), bucket_part(Bucket::named("other")));
        assert_eq!(model.parts.len(), 4);
        assert!(model.parts[3].is_bucket());
    }

    #[test]
    fn test_append_leaves_input_untouched() {
        let original = sample();
        let _ = append_part(&original, measurement_filter_part("mem"));
        assert_eq!(original, sample());
    }

    #[test]
    fn test_append_clears_raw_text() {
        let model = append_part(&QueryModel::raw("buckets()"), bucket_part(Bucket::named("b")));
        assert!(model.raw_text.is_none());
        assert_eq!(model.parts.len(), 1);
    }

    #[test]
    fn test_remove_part_at() {
        let model = remove_part_at(&sample(), 1);
        assert_eq!(model.parts.len(), 2);
        assert!(model.parts[1].is_filter(FilterKind::Measurement));

        let unchanged = remove_part_at(&sample(), 10);
        assert_eq!(unchanged, sample());
    }

    #[test]
    fn test_remove_keeps_raw_text_only_when_empty() {
        let raw = QueryModel::raw("buckets()");
        assert_eq!(remove_part_at(&raw, 0), raw);

        let single = QueryModel {
            parts: vec![bucket_part(Bucket::named("b"))],
            raw_text: Some("stale".into()),
        };
        assert_eq!(remove_part_at(&single, 0).raw_text.as_deref(), Some("stale"));

        let mixed = QueryModel {
            parts: vec![bucket_part(Bucket::named("b")), measurement_filter_part("m")],
            raw_text: Some("stale".into()),
        };
        assert!(remove_part_at(&mixed, 0).raw_text.is_none());
    }

    #[test]
    fn test_replace_part_at() {
        let model = replace_part_at(&sample(), 1, date_range_part(DateRange::since("-7d")));
        assert_eq!(model.date_range(), Some(&DateRange::since("-7d")));
        assert_eq!(model.parts.len(), 3);

        let unchanged = replace_part_at(&sample(), 3, measurement_filter_part("mem"));
        assert_eq!(unchanged, sample());
    }

    #[test]
    fn test_replace_preserves_raw_text() {
        let model = QueryModel {
            parts: vec![bucket_part(Bucket::named("b"))],
            raw_text: Some("raw".into()),
        };
        let next = replace_part_at(&model, 0, bucket_part(Bucket::named("c")));
        assert_eq!(next.raw_text.as_deref(), Some("raw"));
    }

    #[test]
    fn test_retain_parts() {
        let model = retain_parts(&sample(), |part| !part.is_filter(FilterKind::Measurement));
        assert_eq!(model.parts.len(), 2);
    }
}
