use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;
pub type ConfigError = Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("HTTP error: {0}")]
    HttpError(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Request timeout: {0}")]
    Timeout(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Feed generation error: {0}")]
    Feed(String),

    #[error("No list container found: {0}")]
    NoContainerFound(String),

    #[error("Could not infer a schema for this container: {0}")]
    NoSchemaInferred(String),

    #[error("Invalid selector: {0}")]
    InvalidSelector(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Invalid: {0}")]
    Invalid(String),
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for Error {
    fn from(err: toml::ser::Error) -> Self {
        Error::Config(err.to_string())
    }
}

impl From<rss::Error> for Error {
    fn from(err: rss::Error) -> Self {
        Error::Feed(err.to_string())
    }
}

impl From<crate::engine::InferenceFailure> for Error {
    fn from(failure: crate::engine::InferenceFailure) -> Self {
        use crate::engine::InferenceFailure;
        match failure {
            InferenceFailure::NoContainerFound => {
                Error::NoContainerFound("nothing to extract here".to_string())
            }
            InferenceFailure::NoSchemaInferred { container } => Error::NoSchemaInferred(container),
        }
    }
}

impl Error {
    pub fn is_temporary(&self) -> bool {
        matches!(
            self,
            Error::HttpError(_) | Error::Timeout(_) | Error::Io(_)
        )
    }

    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidUrl(_) | Error::Config(_) | Error::InvalidSelector(_)
        )
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            Error::HttpError(_) => "HTTP_ERROR",
            Error::InvalidUrl(_) => "INVALID_URL",
            Error::Timeout(_) => "TIMEOUT",
            Error::Io(_) => "IO_ERROR",
            Error::Serialization(_) => "SERIALIZATION",
            Error::Config(_) => "CONFIG",
            Error::Feed(_) => "FEED",
            Error::NoContainerFound(_) => "NO_CONTAINER_FOUND",
            Error::NoSchemaInferred(_) => "NO_SCHEMA_INFERRED",
            Error::InvalidSelector(_) => "INVALID_SELECTOR",
            Error::NotFound(_) => "NOT_FOUND",
            Error::AlreadyExists(_) => "ALREADY_EXISTS",
            Error::Invalid(_) => "INVALID",
        }
    }
}
