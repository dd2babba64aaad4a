// ==========================================
// 高校选课系统 - 成绩 API
// ==========================================
// 职责: 成绩录入/修改/删除、成绩查询、GPA与统计
// 红线: 等级只由分数推导,不接受调用方指定
// ==========================================

use std::sync::Arc;

use chrono::NaiveDateTime;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::api::error::{ApiError, ApiResult};
use crate::db::now_timestamp;
use crate::domain::result::{is_valid_score, ExamResult, SCORE_MAX, SCORE_MIN};
use crate::domain::types::{ExamType, Grade};
use crate::engine::grade_calculator::GradeCalculator;
use crate::engine::result_aggregator::{CourseStatistics, ResultAggregator, Transcript};
use crate::repository::course_repo::CourseRepository;
use crate::repository::error::RepositoryError;
use crate::repository::result_repo::ExamResultRepository;
use crate::repository::student_repo::StudentRepository;

fn validate_score(score: f64) -> ApiResult<()> {
    if !is_valid_score(score) {
        return Err(ApiError::ValidationError(format!(
            "分数必须在[{}, {}]范围内: {}",
            SCORE_MIN, SCORE_MAX, score
        )));
    }
    Ok(())
}

/// 写入成绩时的错误转换
///
/// 引用校验之后、写入之前学生或课程可能已被级联删除,外键失败按 NotFound 返回
fn map_insert_error(err: RepositoryError, student_id: &str, course_id: &str) -> ApiError {
    match err {
        RepositoryError::ForeignKeyViolation(_) => ApiError::NotFound(format!(
            "学生(id={})或课程(id={})不存在",
            student_id, course_id
        )),
        other => other.into(),
    }
}

// ==========================================
// ResultApi - 成绩 API
// ==========================================
pub struct ResultApi {
    result_repo: Arc<ExamResultRepository>,
    student_repo: Arc<StudentRepository>,
    course_repo: Arc<CourseRepository>,
}

impl ResultApi {
    /// 创建新的ResultApi实例
    ///
    /// # 参数
    /// - result_repo: 成绩仓储
    /// - student_repo: 学生仓储（引用校验）
    /// - course_repo: 课程仓储（引用校验、成绩单课程代码）
    pub fn new(
        result_repo: Arc<ExamResultRepository>,
        student_repo: Arc<StudentRepository>,
        course_repo: Arc<CourseRepository>,
    ) -> Self {
        Self {
            result_repo,
            student_repo,
            course_repo,
        }
    }

    // ==========================================
    // 写操作
    // ==========================================

    /// 录入成绩
    ///
    /// # 参数
    /// - score: 原始分数 [0, 100]
    /// - exam_date: 考试时间,None 时取当前时间
    ///
    /// # 返回
    /// - Ok(ExamResult): 已持久化的成绩（等级已推导）
    /// - Err(ValidationError): 分数越界
    /// - Err(NotFound): 学生或课程不存在
    #[instrument(skip(self, remarks))]
    pub fn record_result(
        &self,
        student_id: &str,
        course_id: &str,
        score: f64,
        exam_type: ExamType,
        remarks: Option<String>,
        exam_date: Option<NaiveDateTime>,
    ) -> ApiResult<ExamResult> {
        validate_score(score)?;

        if !self.student_repo.exists(student_id)? {
            return Err(ApiError::NotFound(format!("学生(id={})不存在", student_id)));
        }
        if !self.course_repo.exists(course_id)? {
            return Err(ApiError::NotFound(format!("课程(id={})不存在", course_id)));
        }

        let now = now_timestamp();
        let result = ExamResult {
            result_id: Uuid::new_v4().to_string(),
            student_id: student_id.to_string(),
            course_id: course_id.to_string(),
            score,
            grade: GradeCalculator::score_to_grade(score),
            exam_type,
            remarks,
            exam_date: exam_date.unwrap_or(now),
            created_at: now,
            updated_at: now,
        };
        self.result_repo
            .insert(&result)
            .map_err(|e| map_insert_error(e, student_id, course_id))?;

        info!(
            result_id = %result.result_id,
            score = result.score,
            grade = %result.grade,
            "成绩已录入"
        );
        Ok(result)
    }

    /// 修改成绩
    ///
    /// 分数变更后等级同步重算; exam_date 为 None 时保留原考试时间
    #[instrument(skip(self, remarks))]
    pub fn update_result(
        &self,
        result_id: &str,
        score: f64,
        exam_type: ExamType,
        remarks: Option<String>,
        exam_date: Option<NaiveDateTime>,
    ) -> ApiResult<ExamResult> {
        validate_score(score)?;

        let mut result = self.get_result(result_id)?;
        let old_grade = result.grade;

        result.set_score(score);
        result.exam_type = exam_type;
        result.remarks = remarks;
        if let Some(date) = exam_date {
            result.exam_date = date;
        }
        result.updated_at = now_timestamp();
        self.result_repo.update(&result)?;

        info!(
            result_id,
            old_grade = %old_grade,
            new_grade = %result.grade,
            "成绩已修改"
        );
        Ok(result)
    }

    /// 删除成绩
    pub fn delete_result(&self, result_id: &str) -> ApiResult<()> {
        self.result_repo.delete(result_id)?;
        info!(result_id, "成绩已删除");
        Ok(())
    }

    // ==========================================
    // 查询接口
    // ==========================================

    pub fn get_result(&self, result_id: &str) -> ApiResult<ExamResult> {
        self.result_repo
            .find_by_id(result_id)?
            .ok_or_else(|| ApiError::NotFound(format!("成绩(id={})不存在", result_id)))
    }

    pub fn list_results(&self) -> ApiResult<Vec<ExamResult>> {
        Ok(self.result_repo.list_all()?)
    }

    pub fn list_by_student(&self, student_id: &str) -> ApiResult<Vec<ExamResult>> {
        Ok(self.result_repo.find_by_student(student_id)?)
    }

    pub fn list_by_course(&self, course_id: &str) -> ApiResult<Vec<ExamResult>> {
        Ok(self.result_repo.find_by_course(course_id)?)
    }

    pub fn list_by_student_and_course(
        &self,
        student_id: &str,
        course_id: &str,
    ) -> ApiResult<Vec<ExamResult>> {
        Ok(self
            .result_repo
            .find_by_student_and_course(student_id, course_id)?)
    }

    pub fn list_by_exam_type(&self, exam_type: ExamType) -> ApiResult<Vec<ExamResult>> {
        Ok(self.result_repo.find_by_exam_type(exam_type)?)
    }

    pub fn list_by_grade(&self, grade: Grade) -> ApiResult<Vec<ExamResult>> {
        Ok(self.result_repo.find_by_grade(grade)?)
    }

    /// 学生最近成绩（按考试时间倒序）
    pub fn recent_results(&self, student_id: &str, limit: usize) -> ApiResult<Vec<ExamResult>> {
        if limit == 0 {
            return Err(ApiError::InvalidInput("limit必须大于0".to_string()));
        }
        Ok(self.result_repo.find_recent_by_student(student_id, limit)?)
    }

    // ==========================================
    // 聚合接口（读快照,无副作用）
    // ==========================================

    pub fn student_gpa(&self, student_id: &str) -> ApiResult<f64> {
        let results = self.result_repo.find_by_student(student_id)?;
        Ok(ResultAggregator::student_gpa(student_id, &results))
    }

    pub fn student_average(&self, student_id: &str) -> ApiResult<f64> {
        let results = self.result_repo.find_by_student(student_id)?;
        Ok(ResultAggregator::student_average(student_id, &results))
    }

    pub fn course_average(&self, course_id: &str) -> ApiResult<f64> {
        let results = self.result_repo.find_by_course(course_id)?;
        Ok(ResultAggregator::course_average(course_id, &results))
    }

    pub fn course_statistics(&self, course_id: &str) -> ApiResult<CourseStatistics> {
        let results = self.result_repo.find_by_course(course_id)?;
        Ok(ResultAggregator::course_statistics(course_id, &results))
    }

    /// 成绩单（按课程代码分组）
    pub fn transcript(&self, student_id: &str) -> ApiResult<Transcript> {
        let results = self.result_repo.find_by_student(student_id)?;
        let course_codes = self.course_repo.code_map()?;
        Ok(ResultAggregator::transcript(student_id, &results, &course_codes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::error::OutcomeCode;
    use crate::db::{configure_sqlite_connection, ensure_schema};
    use rusqlite::Connection;
    use std::sync::Mutex;

    #[test]
    fn test_missing_reference_on_insert_is_not_found() {
        let conn = Connection::open_in_memory().unwrap();
        configure_sqlite_connection(&conn).unwrap();
        ensure_schema(&conn).unwrap();
        let repo = ExamResultRepository::new(Arc::new(Mutex::new(conn)));

        let now = now_timestamp();
        let orphan = ExamResult {
            result_id: Uuid::new_v4().to_string(),
            student_id: "gone-student".to_string(),
            course_id: "gone-course".to_string(),
            score: 80.0,
            grade: Grade::from_score(80.0),
            exam_type: ExamType::Final,
            remarks: None,
            exam_date: now,
            created_at: now,
            updated_at: now,
        };

        let repo_err = repo.insert(&orphan).unwrap_err();
        assert!(matches!(repo_err, RepositoryError::ForeignKeyViolation(_)));

        let api_err = map_insert_error(repo_err, "gone-student", "gone-course");
        assert!(matches!(api_err, ApiError::NotFound(_)));
        assert_eq!(api_err.outcome(), OutcomeCode::NotFound);
    }

    #[test]
    fn test_other_insert_errors_keep_their_mapping() {
        let api_err = map_insert_error(
            RepositoryError::LockError("poisoned".to_string()),
            "S",
            "C",
        );
        assert_eq!(api_err.outcome(), OutcomeCode::Internal);
    }
}
