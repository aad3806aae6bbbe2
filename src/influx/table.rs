//! Annotated CSV result decoding
//!
//! `/api/v2/query` answers with annotated CSV: `#datatype`/`#group`/`#default`
//! annotation rows, a header row, then data rows. Several results may follow
//! one another, each with its own header. Rows are grouped into one
//! [`FluxTable`] per `(result block, table)` pair in first-seen order.

use serde::Serialize;
use std::collections::HashMap;

/// One table of a Flux query result
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FluxTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl FluxTable {
    /// Index of a column by label
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    /// Non-empty values of one column, in row order
    pub fn column_values<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a str> + 'a {
        let index = self.column_index(name);
        self.rows.iter().filter_map(move |row| {
            index
                .and_then(|i| row.get(i))
                .map(String::as_str)
                .filter(|value| !value.is_empty())
        })
    }
}

/// Decode an annotated CSV response body
pub fn decode_annotated_csv(body: &str) -> Result<Vec<FluxTable>, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(body.as_bytes());

    let mut tables: Vec<FluxTable> = Vec::new();
    let mut positions: HashMap<(usize, String), usize> = HashMap::new();
    let mut header: Option<Vec<String>> = None;
    let mut block = 0usize;

    for result in reader.records() {
        let record = result?;

        let is_annotation = record.get(0).is_some_and(|field| field.starts_with('#'));
        if is_annotation || record.iter().all(str::is_empty) {
            continue;
        }

        if is_header(&record) {
            header = Some(record.iter().map(str::to_string).collect());
            block += 1;
            continue;
        }

        let Some(columns) = header.as_ref() else {
            tracing::debug!("skipping data row before header");
            continue;
        };

        // Leading annotation column has an empty label
        let skip = usize::from(columns.first().is_some_and(|c| c.is_empty()));
        let table_id = columns
            .iter()
            .position(|c| c == "table")
            .and_then(|i| record.get(i))
            .unwrap_or_default()
            .to_string();

        let slot = *positions.entry((block, table_id)).or_insert_with(|| {
            tables.push(FluxTable {
                columns: columns[skip..].to_vec(),
                rows: Vec::new(),
            });
            tables.len() - 1
        });

        tables[slot]
            .rows
            .push(record.iter().skip(skip).map(str::to_string).collect());
    }

    Ok(tables)
}

fn is_header(record: &csv::StringRecord) -> bool {
    record.iter().any(|f| f == "result") && record.iter().any(|f| f == "table")
}
