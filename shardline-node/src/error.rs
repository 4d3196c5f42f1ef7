//! Service layer errors

use thiserror::Error;

use shardline_core::CoreError;
use shardline_exec::EngineError;
use shardline_types::TypesError;

pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("Row decoding failed: {0}")]
    Decode(#[from] TypesError),

    #[error(transparent)]
    Config(#[from] CoreError),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("Operation failed: {0}")]
    OperationFailed(String),
}
