use thiserror::Error;

#[derive(Debug, Error)]
pub enum HunterError {
    #[error("http request failed for {url}: {message}")]
    Http { url: String, message: String },

    #[error("unexpected http status {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("invalid domain: {0}")]
    InvalidDomain(String),

    #[error("invalid rule weight table at line {line}: {message}")]
    WeightTable { line: usize, message: String },

    #[error("unsupported output format: {0}")]
    UnsupportedOutputFormat(String),

    #[error("invalid resize target: {0}")]
    InvalidResize(String),

    #[error("config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, HunterError>;
