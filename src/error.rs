pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Please select a firmware file first")]
    NoFileSelected,

    #[error("Firmware details are missing, select the file again")]
    NoDetails,

    #[error("Unsupported firmware file: {0}")]
    UnsupportedFile(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Backend unreachable: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Backend responded with HTTP {0}")]
    Status(u16),

    #[error("{0}")]
    Backend(String),

    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),
}
