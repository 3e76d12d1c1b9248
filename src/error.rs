use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Unknown field: {0}")]
    UnknownField(String),

    #[error("Invalid field in $select: {0}")]
    InvalidSelect(String),

    #[error("Invalid field in $orderby: {0}")]
    InvalidOrderBy(String),

    #[error("Invalid $expand: {0}. Allowed: {1}")]
    InvalidExpand(String, String),

    #[error("Invalid $filter: {0}")]
    InvalidFilter(String),

    #[error("Unexpected character in filter: {0}")]
    UnexpectedCharacter(char),

    #[error("{set} with key '{key}' not found")]
    NotFound { set: String, key: String },

    #[error("Unknown entity set: {0}")]
    UnknownEntitySet(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("{0}")]
    Backend(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl ApiError {
    /// Error code carried in the OData error envelope.
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::NotFound { .. } | ApiError::UnknownEntitySet(_) => "NotFound",
            ApiError::Unauthorized => "Unauthorized",
            _ => "ServerError",
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
