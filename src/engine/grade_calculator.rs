// ==========================================
// 高校选课系统 - 成绩等级计算器
// ==========================================
// 红线: 纯函数,无状态;等级只能由分数推导
// ==========================================
// 输入: 已校验的分数 [0, 100]
// 输出: Grade (含展示标签与绩点)
// ==========================================

use crate::domain::types::Grade;

// ==========================================
// GradeCalculator - 成绩等级计算器
// ==========================================
pub struct GradeCalculator;

impl GradeCalculator {
    /// 分数 → 等级
    ///
    /// 规则（顺序执行，命中即返回）:
    /// - >=85 A+, >=70 A, >=65 A-, >=60 B+, >=55 B, >=50 B-
    /// - >=45 C+, >=40 C, >=35 C-, >=30 D+, >=25 D
    /// - 其他 F
    ///
    /// 分数范围校验由调用方负责;NaN 落入 F。
    /// 分段表定义在 [`Grade::from_score`]。
    pub fn score_to_grade(score: f64) -> Grade {
        Grade::from_score(score)
    }

    /// 分数 → 绩点
    pub fn score_to_gpa_value(score: f64) -> f64 {
        Self::score_to_grade(score).gpa_value()
    }
}
