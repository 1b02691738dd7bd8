use thiserror::Error;

/// Whole-document ingestion failures. Per-field anomalies (bad colors,
/// unparsable numbers, dangling style references) are absorbed into
/// defaults by the pipeline and never reach this type.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("request for {url} failed: {source}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP {status} fetching {url}")]
    FetchStatus { status: u16, url: String },

    #[error("malformed map document: {0}")]
    Parse(String),
}

impl IngestError {
    /// True for both fetch variants: the document could not be retrieved.
    pub fn is_fetch(&self) -> bool {
        matches!(
            self,
            IngestError::Fetch { .. } | IngestError::FetchStatus { .. }
        )
    }

    /// True when the retrieved document was not well-formed markup (or a
    /// readable archive of one).
    pub fn is_parse(&self) -> bool {
        matches!(self, IngestError::Parse(_))
    }
}

impl From<quick_xml::Error> for IngestError {
    fn from(value: quick_xml::Error) -> Self {
        IngestError::Parse(value.to_string())
    }
}

impl From<zip::result::ZipError> for IngestError {
    fn from(value: zip::result::ZipError) -> Self {
        IngestError::Parse(format!("unreadable archive: {value}"))
    }
}

pub type Result<T> = std::result::Result<T, IngestError>;
