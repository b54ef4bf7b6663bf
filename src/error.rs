//! Error types for the library modules.

use std::path::PathBuf;
use thiserror::Error;

/// Errors reading a record file.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid CSV in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid YAML in {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Unsupported record file '{0}' (expected .json, .yaml, .yml or .csv)")]
    UnsupportedFormat(PathBuf),

    #[error("{0} does not contain a list of records")]
    NotRecords(PathBuf),
}

/// Errors while checking or reading an import file.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Unsupported file type '{0}' (expected .csv, .xlsx, .xls or .json)")]
    UnsupportedExtension(String),

    #[error("File is {size} bytes, the limit is {limit} bytes")]
    TooLarge { size: u64, limit: u64 },

    #[error("Reading {0} files needs a spreadsheet reader that is not available")]
    UnsupportedFormat(&'static str),

    #[error(transparent)]
    Load(#[from] LoadError),
}

/// Errors while producing an export.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("No writer available for {0} exports")]
    NoWriter(&'static str),

    #[error("Invalid export options: {0}")]
    InvalidOptions(String),

    #[error("CSV write failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON write failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("No API URL configured. Use --api-url, set ASSETQ_API_URL or add api_url to the config file")]
    MissingApiUrl,

    #[error("No home directory to keep the session token in")]
    NoConfigDir,
}

/// Errors talking to the inventory backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The token was rejected. The session has already been cleared.
    #[error("Session expired or not logged in, sign in again at {redirect_to}")]
    Unauthorized { redirect_to: &'static str },

    #[error("API error ({status}): {message}")]
    Api {
        status: u16,
        message: String,
        body: serde_json::Value,
    },

    #[error("'{0}' is already in progress")]
    InFlight(String),

    #[error("Request to {path} failed: {source}")]
    Transport {
        path: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Unexpected response from {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Response from {0} had no data")]
    MissingData(String),

    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("Failed to update stored session: {0}")]
    Session(#[from] std::io::Error),
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Unauthorized { .. } => Some(401),
            ApiError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}
