use thiserror::Error;

use crate::wizard::Rejection;

#[derive(Error, Debug)]
pub enum JobMasterError {
    #[error("configuration error: {0}")] Config(String),
    #[error("{0}")] Validation(#[from] Rejection),
    #[error("provider error: {0}")] Provider(String),
    #[error("malformed demo payload: {0}")] Payload(String),
    #[error("archive failed: {0}")] Archive(String),
    #[error("i/o error: {0}")] Io(#[from] std::io::Error),
}

impl From<zip::result::ZipError> for JobMasterError {
    fn from(e: zip::result::ZipError) -> Self {
        JobMasterError::Archive(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, JobMasterError>;
