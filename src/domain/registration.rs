// ==========================================
// 高校选课系统 - 选课记录领域模型
// ==========================================
// 红线: 同一 (student_id, course_id) 至多一条非 DROPPED 记录
// 红线: 仅 ENROLLED 记录计入课程容量
// ==========================================

use crate::domain::types::{Grade, RegistrationStatus};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ==========================================
// Registration - 选课记录
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Registration {
    pub registration_id: String,   // 选课记录ID (UUID)
    pub student_id: String,        // 学生ID (非拥有引用)
    pub course_id: String,         // 课程ID (非拥有引用)
    pub status: RegistrationStatus,
    pub grade: Option<Grade>,      // 最终成绩 (可选,由教务/教师录入)
    pub registered_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Registration {
    /// 是否在读
    pub fn is_enrolled(&self) -> bool {
        self.status == RegistrationStatus::Enrolled
    }

    /// 是否已退课
    pub fn is_dropped(&self) -> bool {
        self.status == RegistrationStatus::Dropped
    }

    /// 是否已结课
    pub fn is_completed(&self) -> bool {
        self.status == RegistrationStatus::Completed
    }
}
