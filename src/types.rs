use std::{collections::HashMap, path::PathBuf};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScrapeError {
    #[error("directory: {0}")]
    Directory(String),
    #[error("no_input: no URL was supplied")]
    NoInput,
    #[error("input_file_not_found: {0}")]
    InputFileNotFound(PathBuf),
    #[error("missing_headers: cannot create {0} without a header row")]
    MissingHeaders(PathBuf),
    #[error("browser: {0}")]
    Browser(String),
    #[error("navigation: {0}")]
    Navigation(String),
    #[error("page_not_found: {0}")]
    PageNotFound(String),
    #[error("video_missing: {0}")]
    VideoMissing(String),
    #[error("missing_element: {0}")]
    MissingElement(String),
}

/// A cookie as captured from the browser session, reduced to the attributes
/// the HTTP client needs to replay it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    pub path: String,
    pub secure: bool,
    pub http_only: bool,
}

/// Anything able to hand over the cookies of an authenticated session.
pub trait CookieProvider {
    fn cookies(&self) -> Vec<SessionCookie>;
}

impl CookieProvider for Vec<SessionCookie> {
    fn cookies(&self) -> Vec<SessionCookie> {
        self.clone()
    }
}

#[derive(Debug, Clone)]
pub struct PageSnapshot {
    pub requested_url: String,
    pub current_url: String,
    pub html: String,
    pub cookies: Vec<SessionCookie>,
}

impl CookieProvider for PageSnapshot {
    fn cookies(&self) -> Vec<SessionCookie> {
        self.cookies.clone()
    }
}

/// Flat field name -> value mapping written verbatim to CSV.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataRecord {
    fields: HashMap<String, String>,
}

impl MetadataRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: &str, value: impl Into<String>) {
        self.fields.insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(|v| v.as_str())
    }

    /// Value for `key`, empty when absent.
    pub fn value(&self, key: &str) -> &str {
        self.get(key).unwrap_or("")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    Downloaded(PathBuf),
    Skipped(PathBuf),
    Failed(String),
}

impl DownloadOutcome {
    pub fn is_downloaded(&self) -> bool {
        matches!(self, DownloadOutcome::Downloaded(_))
    }
}

/// Everything scraped from a video page.
#[derive(Debug, Clone)]
pub struct VideoPage {
    pub video_id: String,
    pub video_url: String,
    pub user_id: String,
    pub user_url: String,
    pub sound_url: String,
    pub record: MetadataRecord,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub downloaded: usize,
    pub skipped: usize,
    pub failed: usize,
    pub not_found: usize,
}
