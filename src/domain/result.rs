// ==========================================
// 高校选课系统 - 考核成绩领域模型
// ==========================================
// 红线: grade 永远由 score 推导 (Grade::from_score),调用方不可单独指定
// 红线: score 取值范围 [0, 100]
// ==========================================
// 说明: 成绩直接引用学生与课程,不依赖选课记录的生命周期
// ==========================================

use crate::domain::types::{ExamType, Grade};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// 分数下限
pub const SCORE_MIN: f64 = 0.0;
/// 分数上限
pub const SCORE_MAX: f64 = 100.0;

// ==========================================
// ExamResult - 考核成绩
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExamResult {
    pub result_id: String,  // 成绩ID (UUID)
    pub student_id: String, // 学生ID
    pub course_id: String,  // 课程ID
    pub score: f64,         // 原始分数 [0, 100]
    pub grade: Grade,       // 派生等级 (只读语义)
    pub exam_type: ExamType,
    pub remarks: Option<String>,
    pub exam_date: NaiveDateTime,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl ExamResult {
    /// 设置分数并同步重算等级
    ///
    /// 调用前分数必须已通过 [`is_valid_score`] 校验
    pub fn set_score(&mut self, score: f64) {
        self.score = score;
        self.grade = Grade::from_score(score);
    }

    /// 等级与分数是否一致
    pub fn grade_matches_score(&self) -> bool {
        self.grade == Grade::from_score(self.score)
    }
}

/// 分数是否合法（有限值且位于 [0, 100]）
pub fn is_valid_score(score: f64) -> bool {
    score.is_finite() && (SCORE_MIN..=SCORE_MAX).contains(&score)
}
