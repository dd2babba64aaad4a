// ==========================================
// 高校选课系统 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// 约束: 所有仓储共享同一连接 (Arc<Mutex<Connection>>),
//       以便准入账本在单个事务内跨表写入
// ==========================================

pub mod course_repo;
pub mod error;
pub mod registration_repo;
pub mod result_repo;
pub mod student_repo;

// 重导出核心仓储
pub use course_repo::CourseRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use registration_repo::RegistrationRepository;
pub use result_repo::ExamResultRepository;
pub use student_repo::StudentRepository;
