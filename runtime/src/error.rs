//! Run-level error taxonomy.

use carteira_teorica::CarteiraError;

/// Every way a run can end other than a successful publish.
#[derive(thiserror::Error, Debug)]
pub enum RunError {
    /// A required environment value is missing. Raised at startup.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Page interaction or the download wait failed.
    #[error("Download failed: {0}")]
    Download(String),

    /// The report file name has no `DD-MM-YY` token. Not a failure.
    #[error("No report date in file name: {0}")]
    NoDateFound(String),

    /// A dated report could not be parsed.
    #[error("Report could not be loaded: {0}")]
    Load(#[source] CarteiraError),

    /// Writing the artifact or uploading it failed.
    #[error("Publish failed: {0}")]
    Publish(String),
}

impl RunError {
    /// Whether this outcome should still exit with status 0.
    pub fn is_soft(&self) -> bool {
        matches!(self, RunError::NoDateFound(_))
    }
}

impl From<CarteiraError> for RunError {
    fn from(err: CarteiraError) -> Self {
        match err {
            CarteiraError::NoDateFound(name) => RunError::NoDateFound(name),
            other => RunError::Load(other),
        }
    }
}
