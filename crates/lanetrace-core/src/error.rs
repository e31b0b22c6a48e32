pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("CSV error (line {line}): {message}")]
    Csv { line: usize, message: String },

    #[error("Missing required column: {column} (accepted headers: {accepted})")]
    MissingColumn { column: String, accepted: String },

    #[error("Invalid record JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid config: {message}")]
    InvalidConfig { message: String },
}
