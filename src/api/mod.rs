// ==========================================
// 高校选课系统 - API 层
// ==========================================
// 职责: 提供业务 API 接口,供外部请求处理层调用
// 说明: 认证/角色策略由调用方负责,本层不做权限判定
// ==========================================

pub mod course_api;
pub mod error;
pub mod registration_api;
pub mod result_api;
pub mod student_api;

// 重导出核心类型
pub use course_api::CourseApi;
pub use error::{ApiError, ApiResult, OutcomeCode};
pub use registration_api::RegistrationApi;
pub use result_api::ResultApi;
pub use student_api::StudentApi;
