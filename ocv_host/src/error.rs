use thiserror::Error;

#[derive(Debug, Error)]
pub enum HostError {
    #[error("invalid store key {0:?}")]
    InvalidKey(String),
    #[error("invalid throttle profile: {0}")]
    Profile(String),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, HostError>;
