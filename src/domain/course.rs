// ==========================================
// 高校选课系统 - 课程领域模型
// ==========================================
// 红线: code 全局唯一
// 红线: max_students 为 None 表示不限容量,否则为非负整数
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ==========================================
// Course - 课程
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub course_id: String,           // 课程ID (UUID)
    pub code: String,                // 课程代码 (唯一)
    pub title: String,               // 课程名称
    pub description: Option<String>, // 课程描述
    pub credits: i32,                // 学分
    pub instructor: Option<String>,  // 授课教师

    // ===== 容量 =====
    pub max_students: Option<i32>, // 容量上限 (None = 不限)
    pub enrolled_count: i32,       // 当前 ENROLLED 人数 (由准入账本维护)

    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

// ==========================================
// NewCourse - 新建/更新课程的输入
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewCourse {
    pub code: String,
    pub title: String,
    pub description: Option<String>,
    pub credits: i32,
    pub instructor: Option<String>,
    pub max_students: Option<i32>,
}

// ==========================================
// Trait: SeatCapacity
// ==========================================
// 用途: 准入账本的容量判定接口
pub trait SeatCapacity {
    /// 是否还能再准入一名学生
    fn can_admit(&self) -> bool;

    /// 剩余名额 (None = 不限)
    fn remaining_seats(&self) -> Option<i32>;

    /// 当前在读人数是否已超过容量（容量被下调时可能出现）
    fn is_over_capacity(&self) -> bool;
}

impl SeatCapacity for Course {
    fn can_admit(&self) -> bool {
        match self.max_students {
            None => true,
            Some(cap) => self.enrolled_count < cap,
        }
    }

    fn remaining_seats(&self) -> Option<i32> {
        self.max_students
            .map(|cap| (cap - self.enrolled_count).max(0))
    }

    fn is_over_capacity(&self) -> bool {
        matches!(self.max_students, Some(cap) if self.enrolled_count > cap)
    }
}
