use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("{0} not found")]
    NotFound(String),
    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("cannot decode photo: {0}")]
    Image(#[from] image::ImageError),
}

#[derive(Debug, Error)]
pub enum BlobError {
    #[error("annotation blob is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("annotation blob must be an array, found {0}")]
    NotAnArray(&'static str),
}

pub type StoreResult<T> = Result<T, StoreError>;
