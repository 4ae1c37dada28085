use thiserror::Error;

#[derive(Debug, Error)]
pub enum MltraceError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("failed to load logs: {0}")]
    Load(String),

    #[error("input contains no records")]
    EmptyInput,

    #[error("no records match job filter {0:?}")]
    NoMatchingRecords(String),

    #[error("every group was dropped during span reconstruction")]
    AllGroupsDropped,

    #[error("encoder invariant violated: {0}")]
    Encoding(String),

    #[error("io error: {0}")]
    Io(String),
}

pub type Result<T> = std::result::Result<T, MltraceError>;
