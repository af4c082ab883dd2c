use diesel::result::Error as DieselError;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Decomposition failed: {0}")]
    Decomposition(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),
    #[error("Executor error: {0}")]
    Executor(String),
    #[error("LLM error: {0}")]
    Llm(String),
    #[error("Guardrail error: {0}")]
    Guardrail(String),
    #[error("Store error: {0}")]
    Store(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Schema error: {0}")]
    Schema(String),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Diesel error: {0}")]
    DieselError(#[from] DieselError),
    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),
    #[error("Serde error: {0}")]
    SerdeError(#[from] serde_json::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
