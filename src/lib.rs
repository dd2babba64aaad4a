// ==========================================
// 高校选课系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite (rusqlite)
// 核心: 选课准入控制 (容量/唯一性/状态机) + 成绩等级/GPA计算
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 业务规则
pub mod engine;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA/建表）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 业务接口
pub mod api;

// 应用层 - 组装
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{DeletePolicy, ExamType, Grade, RegistrationStatus};

// 领域实体
pub use domain::{Course, ExamResult, NewCourse, NewStudent, Registration, Student};

// 引擎
pub use engine::{EnrollmentLedger, GradeCalculator, LedgerError, ResultAggregator};

// API
pub use api::{ApiError, ApiResult, CourseApi, OutcomeCode, RegistrationApi, ResultApi, StudentApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "高校选课系统";
