// ==========================================
// 高校选课系统 - 引擎层
// ==========================================
// 职责: 成绩等级计算、成绩聚合、选课准入控制
// 红线: Engine 不拼 SQL（SQL 全部位于 repository）
// ==========================================

pub mod enrollment_ledger;
pub mod error;
pub mod grade_calculator;
pub mod result_aggregator;

// 重导出核心引擎
pub use enrollment_ledger::{DeletionSummary, EnrollmentLedger, SeatAudit};
pub use error::{LedgerError, LedgerResult};
pub use grade_calculator::GradeCalculator;
pub use result_aggregator::{CourseStatistics, ResultAggregator, Transcript};
