use crate::sheet::SheetError;
use axum::http::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MemberError {
    #[error("data source error: {0}")]
    DataSource(#[from] SheetError),

    #[error("member {0} not found")]
    NotFound(u32),

    #[error("unknown field: {0}")]
    FieldNotFound(String),

    #[error("{0}")]
    Validation(String),
}

impl MemberError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            MemberError::DataSource(_) => StatusCode::BAD_GATEWAY,
            MemberError::NotFound(_) => StatusCode::NOT_FOUND,
            MemberError::FieldNotFound(_) => StatusCode::BAD_REQUEST,
            MemberError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }
}

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl From<MemberError> for AppError {
    fn from(err: MemberError) -> Self {
        Self {
            status: err.status_code(),
            message: err.to_string(),
        }
    }
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        (self.status, self.message).into_response()
    }
}
