use thiserror::Error;

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("invalid media uri {0:?}")]
    InvalidUri(String),
    #[error("asset not found: {0}")]
    AssetNotFound(String),
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode media: {0}")]
    Decode(#[from] image::ImageError),
    #[error("media contains no frames")]
    Empty,
}
