// ==========================================
// 成品库存台账 - API层错误类型
// ==========================================
// 职责: 把仓储层错误收敛为调用方可处理的五类错误
// 红线: 错误信息必须带显式原因
// ==========================================

use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 业务规则错误
    // ==========================================
    /// 必填字段缺失 / 数量非正 / 取值非法
    #[error("数据验证失败: {0}")]
    ValidationError(String),

    #[error("库存不足: style_no={style_no}, grade={grade}, requested={requested}t, available={available}t")]
    InsufficientStock {
        style_no: String,
        grade: String,
        requested: f64,
        available: f64,
    },

    #[error("可用量不足: style_no={style_no}, requested={requested}t, available={available}t")]
    InsufficientAvailable {
        style_no: String,
        requested: f64,
        available: f64,
    },

    #[error("资源未找到: {0}")]
    NotFound(String),

    // ==========================================
    // 存储错误（整体回滚）
    // ==========================================
    #[error("存储失败: {0}")]
    StorageFailure(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            RepositoryError::InsufficientStock {
                style_no,
                grade,
                requested,
                available,
                ..
            } => ApiError::InsufficientStock {
                style_no,
                grade,
                requested,
                available,
            },
            RepositoryError::InsufficientAvailable {
                style_no,
                requested,
                available,
                ..
            } => ApiError::InsufficientAvailable {
                style_no,
                requested,
                available,
            },

            // 数据质量错误
            RepositoryError::ValidationError(msg) => ApiError::ValidationError(msg),
            RepositoryError::FieldValueError { field, message } => {
                ApiError::ValidationError(format!("字段{}错误: {}", field, message))
            }

            // 存储错误
            RepositoryError::DatabaseTransactionError(msg)
            | RepositoryError::DatabaseQueryError(msg) => ApiError::StorageFailure(msg),
            RepositoryError::LockError(msg) => {
                ApiError::StorageFailure(format!("数据库锁获取失败: {}", msg))
            }
            RepositoryError::UniqueConstraintViolation(msg) => {
                ApiError::StorageFailure(format!("唯一约束违反: {}", msg))
            }

            RepositoryError::Other(err) => ApiError::Other(err),
        }
    }
}

impl From<csv::Error> for ApiError {
    fn from(err: csv::Error) -> Self {
        ApiError::StorageFailure(format!("CSV 导出失败: {}", err))
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;
