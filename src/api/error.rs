// ==========================================
// 高校选课系统 - API层错误类型
// ==========================================
// 职责: 定义API层错误类型，转换Repository/账本错误为调用方可见的结果
// 说明: outcome() 给出调用方信号（BadRequest / NotFound / Conflict / Internal）
// ==========================================

use crate::engine::error::LedgerError;
use crate::repository::error::RepositoryError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 调用方信号
///
/// 由外部请求处理层映射为具体协议（例如 HTTP 400/404/409/500）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutcomeCode {
    BadRequest,
    NotFound,
    Conflict,
    Internal,
}

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 输入错误
    // ==========================================
    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("数据验证失败: {0}")]
    ValidationError(String),

    /// 准入请求引用的学生/课程不存在
    #[error("引用的资源不存在: {0}")]
    UnknownReference(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    // ==========================================
    // 准入冲突
    // ==========================================
    #[error("重复选课: {0}")]
    AlreadyRegistered(String),

    #[error("课程容量已满: {0}")]
    CapacityExceeded(String),

    #[error("无效的状态转换: from={from} to={to}")]
    InvalidStateTransition { from: String, to: String },

    // ==========================================
    // 数据一致性冲突
    // ==========================================
    #[error("存在引用,拒绝删除: {0}")]
    ReferentialIntegrity(String),

    #[error("唯一约束违反: {0}")]
    Duplicate(String),

    // ==========================================
    // 数据访问错误
    // ==========================================
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    #[error("数据库事务失败: {0}")]
    DatabaseTransactionError(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("内部错误: {0}")]
    InternalError(String),
}

impl ApiError {
    /// 调用方信号
    pub fn outcome(&self) -> OutcomeCode {
        match self {
            ApiError::InvalidInput(_)
            | ApiError::ValidationError(_)
            | ApiError::UnknownReference(_) => OutcomeCode::BadRequest,
            ApiError::NotFound(_) => OutcomeCode::NotFound,
            ApiError::AlreadyRegistered(_)
            | ApiError::CapacityExceeded(_)
            | ApiError::InvalidStateTransition { .. }
            | ApiError::ReferentialIntegrity(_)
            | ApiError::Duplicate(_) => OutcomeCode::Conflict,
            ApiError::DatabaseError(_)
            | ApiError::DatabaseConnectionError(_)
            | ApiError::DatabaseTransactionError(_)
            | ApiError::InternalError(_) => OutcomeCode::Internal,
        }
    }
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
            RepositoryError::DatabaseTransactionError(msg) => {
                ApiError::DatabaseTransactionError(msg)
            }
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseConnectionError(format!("数据库锁获取失败: {}", msg))
            }
            RepositoryError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::UniqueConstraintViolation(msg) => ApiError::Duplicate(msg),
            RepositoryError::ForeignKeyViolation(msg) => ApiError::ReferentialIntegrity(msg),
            RepositoryError::FieldValueError { field, message } => {
                ApiError::DatabaseError(format!("字段{}错误: {}", field, message))
            }
            RepositoryError::InternalError(msg) => ApiError::InternalError(msg),
        }
    }
}

// ==========================================
// 从 LedgerError 转换
// ==========================================
impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            e @ LedgerError::AlreadyRegistered { .. } => ApiError::AlreadyRegistered(e.to_string()),
            e @ LedgerError::ReadmissionDisabled { .. } => {
                ApiError::AlreadyRegistered(e.to_string())
            }
            e @ LedgerError::CapacityExceeded { .. } => ApiError::CapacityExceeded(e.to_string()),
            LedgerError::InvalidStateTransition { from, to } => {
                ApiError::InvalidStateTransition { from, to }
            }
            e @ LedgerError::ReferencesExist { .. } => ApiError::ReferentialIntegrity(e.to_string()),
            LedgerError::LockError(msg) => ApiError::InternalError(format!("课程锁获取失败: {}", msg)),
            LedgerError::ConfigError(msg) => ApiError::InternalError(msg),
            LedgerError::Repository(e) => e.into(),
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;
