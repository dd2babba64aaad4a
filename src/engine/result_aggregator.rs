// ==========================================
// 高校选课系统 - 成绩聚合器
// ==========================================
// 职责: GPA / 平均分 / 课程统计 / 成绩单
// 红线: 只读,无副作用;空集合返回 0.0,不允许除零
// ==========================================
// 口径: GPA 为每条成绩记录绩点的算术平均,不按学分加权
// ==========================================

use crate::domain::result::ExamResult;
use crate::domain::types::Grade;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::instrument;

// ==========================================
// CourseStatistics - 课程成绩统计
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseStatistics {
    pub course_id: String,
    pub average: f64,
    pub result_count: usize,
    pub grade_distribution: HashMap<Grade, usize>,
}

// ==========================================
// Transcript - 学生成绩单
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    pub student_id: String,
    pub results: Vec<ExamResult>,
    /// 按课程代码分组（缺少课程代码时以 course_id 代替）
    pub results_by_course: BTreeMap<String, Vec<ExamResult>>,
    pub gpa: f64,
    pub average: f64,
    pub total_courses: usize,
}

/// 安全均值: 空迭代器返回 0.0
fn mean<I: Iterator<Item = f64>>(values: I) -> f64 {
    let (sum, count) = values.fold((0.0_f64, 0_usize), |(s, c), v| (s + v, c + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

// ==========================================
// ResultAggregator - 成绩聚合器
// ==========================================
pub struct ResultAggregator;

impl ResultAggregator {
    /// 学生 GPA
    ///
    /// 每条成绩记录等权,无成绩时返回 0.0
    pub fn student_gpa(student_id: &str, results: &[ExamResult]) -> f64 {
        mean(
            results
                .iter()
                .filter(|r| r.student_id == student_id)
                .map(|r| r.grade.gpa_value()),
        )
    }

    /// 学生全部成绩的平均分
    pub fn student_average(student_id: &str, results: &[ExamResult]) -> f64 {
        mean(
            results
                .iter()
                .filter(|r| r.student_id == student_id)
                .map(|r| r.score),
        )
    }

    /// 课程平均分
    pub fn course_average(course_id: &str, results: &[ExamResult]) -> f64 {
        mean(
            results
                .iter()
                .filter(|r| r.course_id == course_id)
                .map(|r| r.score),
        )
    }

    /// 课程统计: 平均分 / 记录数 / 等级分布
    #[instrument(skip(results), fields(total = results.len()))]
    pub fn course_statistics(course_id: &str, results: &[ExamResult]) -> CourseStatistics {
        let course_results: Vec<&ExamResult> =
            results.iter().filter(|r| r.course_id == course_id).collect();

        let mut grade_distribution: HashMap<Grade, usize> = HashMap::new();
        for r in &course_results {
            *grade_distribution.entry(r.grade).or_insert(0) += 1;
        }

        CourseStatistics {
            course_id: course_id.to_string(),
            average: mean(course_results.iter().map(|r| r.score)),
            result_count: course_results.len(),
            grade_distribution,
        }
    }

    /// 成绩单
    ///
    /// # 参数
    /// - student_id: 学生ID
    /// - results: 成绩快照
    /// - course_codes: course_id → 课程代码
    #[instrument(skip(results, course_codes), fields(total = results.len()))]
    pub fn transcript(
        student_id: &str,
        results: &[ExamResult],
        course_codes: &HashMap<String, String>,
    ) -> Transcript {
        let student_results: Vec<ExamResult> = results
            .iter()
            .filter(|r| r.student_id == student_id)
            .cloned()
            .collect();

        let mut results_by_course: BTreeMap<String, Vec<ExamResult>> = BTreeMap::new();
        for r in &student_results {
            let code = course_codes
                .get(&r.course_id)
                .cloned()
                .unwrap_or_else(|| r.course_id.clone());
            results_by_course.entry(code).or_default().push(r.clone());
        }

        Transcript {
            student_id: student_id.to_string(),
            gpa: Self::student_gpa(student_id, &student_results),
            average: Self::student_average(student_id, &student_results),
            total_courses: results_by_course.len(),
            results_by_course,
            results: student_results,
        }
    }
}
