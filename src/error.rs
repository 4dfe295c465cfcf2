//! Error types for each failure domain of the selection pipeline.
//!
//! Component-local failures ([`FetchError`]) are absorbed by the pipeline and
//! degrade gracefully. Pipeline-level failures ([`EnrichError`],
//! [`HistoryError`]) abort an invocation and surface as [`PipelineError`].

use std::path::PathBuf;
use thiserror::Error;

/// Failure to retrieve a single portal page.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{url} answered with status {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },
}

/// Failure of the generative text service.
#[derive(Error, Debug)]
pub enum EnrichError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("completion service returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("completion response had no content")]
    EmptyContent,
}

/// Failure to read or persist the published record.
#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("failed to read history from {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write history to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failure of one pipeline invocation. History is never mutated when this is returned
/// from the enrichment step.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("description enrichment failed: {0}")]
    Enrichment(#[from] EnrichError),

    #[error("history persistence failed: {0}")]
    History(#[from] HistoryError),
}

/// Failure to deliver a message to the channel.
#[derive(Error, Debug)]
pub enum PublishError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("telegram rejected {method}: {description}")]
    Rejected {
        method: &'static str,
        description: String,
    },
}

/// Failure to load the configured list of portals.
#[derive(Error, Debug)]
pub enum SourcesError {
    #[error("failed to read sources file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid sources file: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid source URL {url:?}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("sources list is empty")]
    Empty,
}
