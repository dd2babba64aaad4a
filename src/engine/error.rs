// ==========================================
// 高校选课系统 - 准入账本错误类型
// ==========================================
// 工具: thiserror 派生宏
// 说明: 全部为可恢复、调用方可见的结果,不影响进程
// ==========================================

use crate::repository::error::RepositoryError;
use thiserror::Error;

/// 准入账本错误类型
#[derive(Error, Debug)]
pub enum LedgerError {
    // ===== 引用错误 =====
    #[error("记录未找到: {entity} with id={id}")]
    NotFound { entity: String, id: String },

    // ===== 准入判定 =====
    #[error("重复选课: student_id={student_id}, course_id={course_id}, 已有记录状态={status}")]
    AlreadyRegistered {
        student_id: String,
        course_id: String,
        status: String,
    },

    #[error("课程容量已满: course_id={course_id}, capacity={capacity}, enrolled={enrolled}")]
    CapacityExceeded {
        course_id: String,
        capacity: i32,
        enrolled: i32,
    },

    #[error("退课后不允许重新选课: student_id={student_id}, course_id={course_id}")]
    ReadmissionDisabled {
        student_id: String,
        course_id: String,
    },

    // ===== 状态机 =====
    #[error("无效的状态转换: from={from} to={to}")]
    InvalidStateTransition { from: String, to: String },

    // ===== 删除策略 =====
    #[error("存在引用,拒绝删除: {entity}(id={id}) registrations={registrations}, results={results}")]
    ReferencesExist {
        entity: String,
        id: String,
        registrations: usize,
        results: i64,
    },

    // ===== 基础设施 =====
    #[error("课程锁获取失败: {0}")]
    LockError(String),

    #[error("读取准入配置失败: {0}")]
    ConfigError(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Result 类型别名
pub type LedgerResult<T> = Result<T, LedgerError>;
