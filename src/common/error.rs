use snafu::prelude::*;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("{method} {url} failed: {source}"))]
    RequestError {
        url: String,
        method: String,
        #[snafu(source(from(ureq::Error, Box::new)))]
        source: Box<ureq::Error>,
    },
    #[snafu(display("{message}"))]
    ResponseError { message: String },
    /// System-level backend failure; the caller may retry.
    #[snafu(display("Transient backend error {code}: {description}"))]
    TransientBackendError { code: u32, description: String },
    /// The zone, record, pool or group is absent. Converted to an empty
    /// result by the operation that receives it.
    #[snafu(display("Not found: {message}"))]
    NotFoundError { message: String },
    /// The entity already exists. Drives create-or-reuse branching.
    #[snafu(display("Already exists: {message}"))]
    ConflictError { message: String },
    #[snafu(display("Backend error {code}: {description}"))]
    UnclassifiedBackendError { code: u32, description: String },
    #[snafu(display("Invalid input: {message}"))]
    InvalidInputError { message: String },
    #[snafu(display("Unsupported record: {message}"))]
    UnsupportedRecordError { message: String },
    #[snafu(display("{prefix}: {message}"))]
    ConfigError { prefix: String, message: String },
    #[snafu(display("{message}: {source}"))]
    FileError {
        message: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl Error {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFoundError { .. })
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::ConflictError { .. })
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, Error::TransientBackendError { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Absorbs `NotFoundError` at the call site that asked for the entity.
pub trait OkIfNotFound<T> {
    fn ok_if_not_found(self) -> Result<Option<T>>;
}

impl<T> OkIfNotFound<T> for Result<T> {
    fn ok_if_not_found(self) -> Result<Option<T>> {
        match self {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }
}
