use thiserror::Error;

#[derive(Debug, Error)]
pub enum LensError {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("remote service error {code}: {message}")]
    Api { code: String, message: String },

    #[error("no task with task id {task_id}, list id {list_id}, task series id {task_series_id}")]
    NotFound {
        task_id: String,
        list_id: String,
        task_series_id: String,
    },

    #[error("unknown list {0}")]
    UnknownList(String),

    #[error("no collection mapping for response path {0:?}")]
    UnknownCollection(String),

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("unsupported date format {0:?}")]
    InvalidDate(String),

    #[error("invalid lens uri {0:?}")]
    InvalidUri(String),

    #[error("cache error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Config(String),
}

impl From<reqwest::Error> for LensError {
    fn from(err: reqwest::Error) -> Self {
        LensError::Transport(err.to_string())
    }
}

impl From<roxmltree::Error> for LensError {
    fn from(err: roxmltree::Error) -> Self {
        LensError::MalformedResponse(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, LensError>;
