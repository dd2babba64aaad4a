// ==========================================
// 高校选课系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型、容量判定接口
// 红线: 不含数据访问逻辑
// ==========================================

pub mod course;
pub mod registration;
pub mod result;
pub mod student;
pub mod types;

// 重导出核心类型
pub use course::{Course, NewCourse, SeatCapacity};
pub use registration::Registration;
pub use result::{is_valid_score, ExamResult, SCORE_MAX, SCORE_MIN};
pub use student::{NewStudent, Student};
pub use types::{DeletePolicy, ExamType, Grade, RegistrationStatus};
