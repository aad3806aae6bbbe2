//! Query Builder
//!
//! Owns the [`QueryModel`] being edited together with the bucket, measurement
//! and field listings offered for selection. Every selection replaces the
//! whole model with a new value built from the pure editors in
//! [`parts`](crate::flux::parts) and bumps the revision counter.
//!
//! Listings are fetched by the caller. A fetch kicked off after a selection
//! should be applied with the revision returned at that time, so results that
//! arrive after a newer selection are dropped.

use serde::Serialize;

use crate::flux::model::{Bucket, DateRange, FilterKind, QueryModel, QueryPart};
use crate::flux::parser::parse;
use crate::flux::parts::{
    append_part, bucket_part, date_range_part, field_filter_part, measurement_filter_part,
    remove_part_at, replace_part_at, retain_parts,
};
use crate::flux::serializer::to_text;

/// Range start applied whenever a bucket is selected
pub const DEFAULT_RANGE_START: &str = "-1h";

/// Selection state for one query being built
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    buckets: Vec<Bucket>,
    measurements: Vec<String>,
    fields: Vec<String>,
    model: QueryModel,
    revision: u64,
}

/// Field listing request produced by a measurement selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldLookup {
    pub bucket: String,
    pub measurement: String,
}

/// Display titles for the selection controls
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionTitles {
    pub buckets: String,
    pub measurements: String,
    pub fields: String,
    pub date_range: String,
}

impl QueryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current model
    pub fn model(&self) -> &QueryModel {
        &self.model
    }

    /// Flux text for the current model
    pub fn text(&self) -> String {
        to_text(&self.model)
    }

    /// Incremented on every model change
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn buckets(&self) -> &[Bucket] {
        &self.buckets
    }

    pub fn measurements(&self) -> &[String] {
        &self.measurements
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Replace the bucket listing
    pub fn set_buckets(&mut self, buckets: Vec<Bucket>) {
        self.buckets = buckets;
    }

    /// Select the listed bucket at `position`
    ///
    /// Resets the model to the bucket plus a `-1h` range, dropping any earlier
    /// range or filters, and clears the measurement and field listings.
    /// Returns the bucket whose measurements should be fetched next.
    pub fn select_bucket(&mut self, position: usize) -> Option<Bucket> {
        let bucket = self.buckets.get(position)?.clone();

        self.replace_model(QueryModel::from_parts(vec![
            bucket_part(bucket.clone()),
            date_range_part(DateRange::since(DEFAULT_RANGE_START)),
        ]));
        self.measurements.clear();
        self.fields.clear();

        tracing::debug!(bucket = %bucket.name, revision = self.revision, "bucket selected");
        Some(bucket)
    }

    /// Select the listed measurement at `position`
    ///
    /// Needs a selected bucket. Any measurement and field filters are replaced
    /// by a single measurement filter and the field listing is cleared.
    pub fn select_measurement(&mut self, position: usize) -> Option<FieldLookup> {
        let measurement = self.measurements.get(position)?.clone();
        let bucket = self.selected_bucket()?.name.clone();

        let kept = retain_parts(&self.model, |part| {
            !part.is_filter(FilterKind::Measurement) && !part.is_filter(FilterKind::Field)
        });
        self.replace_model(append_part(&kept, measurement_filter_part(measurement.clone())));
        self.fields.clear();

        tracing::debug!(%bucket, %measurement, revision = self.revision, "measurement selected");
        Some(FieldLookup {
            bucket,
            measurement,
        })
    }

    /// Select listed fields by position
    ///
    /// An empty selection removes the field filter. Positions outside the
    /// listing are skipped; if none remain the model is left as is.
    /// Returns whether the model changed.
    pub fn select_fields(&mut self, positions: &[usize]) -> bool {
        let without_fields = retain_parts(&self.model, |part| !part.is_filter(FilterKind::Field));

        if positions.is_empty() {
            self.replace_model(without_fields);
            return true;
        }

        let names: Vec<String> = positions
            .iter()
            .filter_map(|&pos| self.fields.get(pos).cloned())
            .collect();

        if names.is_empty() {
            return false;
        }

        self.replace_model(append_part(&without_fields, field_filter_part(names)));
        true
    }

    /// Set the time range, replacing the existing range part in place
    pub fn select_date_range(&mut self, start: impl Into<String>, stop: Option<String>) {
        let range = date_range_part(DateRange {
            start: start.into(),
            stop,
        });

        let next = match self.model.position(QueryPart::is_date_range) {
            Some(index) => replace_part_at(&self.model, index, range),
            None => append_part(&self.model, range),
        };
        self.replace_model(next);
    }

    /// Re-derive the model from hand-edited Flux text
    pub fn update_text(&mut self, text: &str) {
        let model = parse(text);
        if model.is_raw() {
            tracing::debug!("query text outside the supported subset, keeping it verbatim");
        }
        self.replace_model(model);
    }

    /// Remove the part at `index`
    ///
    /// Removing the bucket clears the measurement and field listings; removing
    /// the measurement filter clears the field listing.
    pub fn remove_part(&mut self, index: usize) -> Option<QueryPart> {
        let removed = self.model.parts.get(index)?.clone();
        self.replace_model(remove_part_at(&self.model, index));

        match &removed {
            QueryPart::Bucket(_) => {
                self.measurements.clear();
                self.fields.clear();
            }
            part if part.is_filter(FilterKind::Measurement) => self.fields.clear(),
            _ => {}
        }

        Some(removed)
    }

    /// Drop the model and the dependent listings
    pub fn reset(&mut self) {
        self.replace_model(QueryModel::new());
        self.measurements.clear();
        self.fields.clear();
    }

    /// Store a measurement listing fetched at `revision`
    pub fn apply_measurements(&mut self, revision: u64, measurements: Vec<String>) -> bool {
        if revision != self.revision {
            tracing::debug!(revision, current = self.revision, "discarding stale measurements");
            return false;
        }
        self.measurements = measurements;
        true
    }

    /// Store a field listing fetched at `revision`
    pub fn apply_fields(&mut self, revision: u64, fields: Vec<String>) -> bool {
        if revision != self.revision {
            tracing::debug!(revision, current = self.revision, "discarding stale fields");
            return false;
        }
        self.fields = fields;
        true
    }

    pub fn selected_bucket(&self) -> Option<&Bucket> {
        self.model.bucket()
    }

    pub fn selected_measurement(&self) -> Option<&str> {
        self.model
            .filter(FilterKind::Measurement)
            .and_then(|filter| filter.value.first())
    }

    pub fn selected_fields(&self) -> Vec<&str> {
        self.model
            .filter(FilterKind::Field)
            .map(|filter| filter.value.values())
            .unwrap_or_default()
    }

    pub fn selected_date_range(&self) -> Option<&DateRange> {
        self.model.date_range()
    }

    pub fn is_bucket_selected(&self) -> bool {
        self.selected_bucket().is_some()
    }

    pub fn is_measurement_selected(&self) -> bool {
        self.selected_measurement().is_some()
    }

    pub fn is_field_selected(&self) -> bool {
        !self.selected_fields().is_empty()
    }

    pub fn is_date_range_selected(&self) -> bool {
        self.selected_date_range().is_some()
    }

    /// Titles for the bucket, measurement, field and range pickers
    pub fn titles(&self) -> SelectionTitles {
        SelectionTitles {
            buckets: self.buckets_title(),
            measurements: self.measurements_title(),
            fields: self.fields_title(),
            date_range: self.date_range_title(),
        }
    }

    fn buckets_title(&self) -> String {
        if self.buckets.is_empty() {
            return "No buckets found".to_string();
        }
        self.selected_bucket()
            .map(|bucket| bucket.name.clone())
            .unwrap_or_else(|| "Select a bucket".to_string())
    }

    fn measurements_title(&self) -> String {
        if !self.is_bucket_selected() {
            return "Select a bucket first".to_string();
        }
        if self.measurements.is_empty() {
            return "No measurements found".to_string();
        }
        self.selected_measurement()
            .map(str::to_string)
            .unwrap_or_else(|| "Select a measurement".to_string())
    }

    fn fields_title(&self) -> String {
        if !self.is_bucket_selected() {
            return "Select a bucket first".to_string();
        }
        if !self.is_measurement_selected() {
            return "Select a measurement first".to_string();
        }
        if self.fields.is_empty() {
            return "No fields found".to_string();
        }
        match self.selected_fields().as_slice() {
            [] => "Select fields".to_string(),
            [single] => single.to_string(),
            many => format!("{} fields selected", many.len()),
        }
    }

    fn date_range_title(&self) -> String {
        match self.selected_date_range() {
            None => "Select date range".to_string(),
            Some(DateRange { start, stop: None }) => start.clone(),
            Some(DateRange {
                start,
                stop: Some(stop),
            }) => format!("{} to {}", start, stop),
        }
    }

    fn replace_model(&mut self, model: QueryModel) {
        self.model = model;
        self.revision += 1;
    }
}
