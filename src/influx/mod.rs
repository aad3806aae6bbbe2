//! InfluxDB v2 Access
//!
//! - [`InfluxApi`]: the operations the service needs from the database
//! - [`InfluxClient`]: HTTP implementation over reqwest
//! - [`FluxTable`]: decoded query results
//!
//! Every call takes the caller's [`Credentials`]; the client itself holds no
//! login state.

mod client;
pub mod schema;
mod table;

pub use client::InfluxClient;
pub use table::{decode_annotated_csv, FluxTable};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::flux::Bucket;

/// API token plus organization used for one session
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub api_token: String,
    pub organization: String,
}

impl Credentials {
    pub fn new(api_token: impl Into<String>, organization: impl Into<String>) -> Self {
        Self {
            api_token: api_token.into(),
            organization: organization.into(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_token", &"***")
            .field("organization", &self.organization)
            .finish()
    }
}

/// One problem reported by query analysis
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyzeError {
    #[serde(default)]
    pub line: u32,
    #[serde(default)]
    pub column: u32,
    #[serde(default)]
    pub character: u32,
    #[serde(default)]
    pub message: String,
}

/// Database operations used by the service
#[async_trait]
pub trait InfluxApi: Send + Sync {
    /// Server base URL
    fn url(&self) -> &str;

    /// Range start for schema listing queries
    fn schema_lookback(&self) -> &str {
        "-10y"
    }

    /// Buckets visible to the organization
    async fn buckets(&self, credentials: &Credentials) -> Result<Vec<Bucket>, InfluxError>;

    /// Run a Flux query
    async fn query(&self, credentials: &Credentials, flux: &str) -> Result<Vec<FluxTable>, InfluxError>;

    /// Check a Flux query for errors without running it
    async fn analyze(&self, credentials: &Credentials, flux: &str) -> Result<Vec<AnalyzeError>, InfluxError>;

    /// Check that the credentials are accepted
    async fn validate(&self, credentials: &Credentials) -> Result<(), InfluxError> {
        self.buckets(credentials).await.map(|_| ())
    }

    /// Distinct measurements in a bucket
    async fn measurements(&self, credentials: &Credentials, bucket: &str) -> Result<Vec<String>, InfluxError> {
        let flux = schema::measurements_query(bucket, self.schema_lookback());
        let tables = self.query(credentials, &flux).await?;
        Ok(schema::distinct_values(&tables, "_measurement"))
    }

    /// Distinct fields of a measurement
    async fn fields(
        &self,
        credentials: &Credentials,
        bucket: &str,
        measurement: &str,
    ) -> Result<Vec<String>, InfluxError> {
        let flux = schema::fields_query(bucket, measurement, self.schema_lookback());
        let tables = self.query(credentials, &flux).await?;
        Ok(schema::distinct_values(&tables, "_field"))
    }
}

/// Errors that can occur when talking to InfluxDB
#[derive(Error, Debug)]
pub enum InfluxError {
    #[error("InfluxDB unavailable")]
    Unavailable,

    #[error("Request timeout")]
    Timeout,

    #[error("Invalid InfluxDB credentials")]
    Unauthorized,

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Malformed query response: {0}")]
    Decode(#[from] csv::Error),
}

impl InfluxError {
    pub(crate) fn from_send(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            InfluxError::Timeout
        } else if e.is_connect() {
            InfluxError::Unavailable
        } else {
            InfluxError::Request(e)
        }
    }
}
