// ==========================================
// 高校选课系统 - 考核成绩数据仓储
// ==========================================
// 红线: 写入时 grade 一律由 score 重新推导,忽略实体上的 grade 字段
// ==========================================

use crate::db::{format_timestamp, parse_timestamp};
use crate::domain::result::ExamResult;
use crate::domain::types::{ExamType, Grade};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

const RESULT_COLUMNS: &str = r#"
    result_id, student_id, course_id, score, grade, exam_type, remarks,
    exam_date, created_at, updated_at
"#;

fn map_result_row(row: &Row<'_>) -> SqliteResult<ExamResult> {
    let grade_str: String = row.get(4)?;
    let grade = Grade::from_db_str(&grade_str).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            4,
            rusqlite::types::Type::Text,
            format!("未知成绩等级: {}", grade_str).into(),
        )
    })?;

    let exam_type_str: String = row.get(5)?;
    let exam_type = ExamType::from_db_str(&exam_type_str).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            5,
            rusqlite::types::Type::Text,
            format!("未知考核类型: {}", exam_type_str).into(),
        )
    })?;

    Ok(ExamResult {
        result_id: row.get(0)?,
        student_id: row.get(1)?,
        course_id: row.get(2)?,
        score: row.get(3)?,
        grade,
        exam_type,
        remarks: row.get(6)?,
        exam_date: parse_timestamp(7, &row.get::<_, String>(7)?)?,
        created_at: parse_timestamp(8, &row.get::<_, String>(8)?)?,
        updated_at: parse_timestamp(9, &row.get::<_, String>(9)?)?,
    })
}

// ==========================================
// ExamResultRepository - 考核成绩仓储
// ==========================================
pub struct ExamResultRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ExamResultRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 插入成绩
    ///
    /// grade 列由 score 推导
    pub fn insert(&self, result: &ExamResult) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let grade = Grade::from_score(result.score);

        conn.execute(
            r#"
            INSERT INTO exam_result (
                result_id, student_id, course_id, score, grade, exam_type,
                remarks, exam_date, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
            params![
                result.result_id,
                result.student_id,
                result.course_id,
                result.score,
                grade.to_db_str(),
                result.exam_type.to_db_str(),
                result.remarks,
                format_timestamp(&result.exam_date),
                format_timestamp(&result.created_at),
                format_timestamp(&result.updated_at),
            ],
        )?;

        Ok(())
    }

    /// 更新成绩（分数 / 考核类型 / 备注 / 考试时间）
    ///
    /// grade 列由 score 推导
    pub fn update(&self, result: &ExamResult) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let grade = Grade::from_score(result.score);

        let rows_affected = conn.execute(
            r#"
            UPDATE exam_result
               SET score = ?1, grade = ?2, exam_type = ?3, remarks = ?4,
                   exam_date = ?5, updated_at = ?6
             WHERE result_id = ?7
            "#,
            params![
                result.score,
                grade.to_db_str(),
                result.exam_type.to_db_str(),
                result.remarks,
                format_timestamp(&result.exam_date),
                format_timestamp(&result.updated_at),
                result.result_id,
            ],
        )?;

        if rows_affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "ExamResult".to_string(),
                id: result.result_id.clone(),
            });
        }
        Ok(())
    }

    /// 删除成绩
    pub fn delete(&self, result_id: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let rows_affected = conn.execute(
            "DELETE FROM exam_result WHERE result_id = ?1",
            params![result_id],
        )?;

        if rows_affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "ExamResult".to_string(),
                id: result_id.to_string(),
            });
        }
        Ok(())
    }

    // ==========================================
    // 查询接口
    // ==========================================

    pub fn find_by_id(&self, result_id: &str) -> RepositoryResult<Option<ExamResult>> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT {} FROM exam_result WHERE result_id = ?1", RESULT_COLUMNS);
        let result = conn
            .query_row(&sql, params![result_id], map_result_row)
            .optional()?;
        Ok(result)
    }

    pub fn list_all(&self) -> RepositoryResult<Vec<ExamResult>> {
        self.query_list(
            &format!("SELECT {} FROM exam_result ORDER BY created_at, result_id", RESULT_COLUMNS),
            &[],
        )
    }

    pub fn find_by_student(&self, student_id: &str) -> RepositoryResult<Vec<ExamResult>> {
        self.query_list(
            &format!(
                "SELECT {} FROM exam_result WHERE student_id = ?1 ORDER BY created_at, result_id",
                RESULT_COLUMNS
            ),
            &[&student_id],
        )
    }

    pub fn find_by_course(&self, course_id: &str) -> RepositoryResult<Vec<ExamResult>> {
        self.query_list(
            &format!(
                "SELECT {} FROM exam_result WHERE course_id = ?1 ORDER BY created_at, result_id",
                RESULT_COLUMNS
            ),
            &[&course_id],
        )
    }

    pub fn find_by_student_and_course(
        &self,
        student_id: &str,
        course_id: &str,
    ) -> RepositoryResult<Vec<ExamResult>> {
        self.query_list(
            &format!(
                r#"SELECT {} FROM exam_result
                   WHERE student_id = ?1 AND course_id = ?2
                   ORDER BY created_at, result_id"#,
                RESULT_COLUMNS
            ),
            &[&student_id, &course_id],
        )
    }

    pub fn find_by_exam_type(&self, exam_type: ExamType) -> RepositoryResult<Vec<ExamResult>> {
        self.query_list(
            &format!(
                "SELECT {} FROM exam_result WHERE exam_type = ?1 ORDER BY created_at, result_id",
                RESULT_COLUMNS
            ),
            &[&exam_type.to_db_str()],
        )
    }

    pub fn find_by_grade(&self, grade: Grade) -> RepositoryResult<Vec<ExamResult>> {
        self.query_list(
            &format!(
                "SELECT {} FROM exam_result WHERE grade = ?1 ORDER BY created_at, result_id",
                RESULT_COLUMNS
            ),
            &[&grade.to_db_str()],
        )
    }

    /// 学生最近成绩（按考试时间倒序）
    pub fn find_recent_by_student(
        &self,
        student_id: &str,
        limit: usize,
    ) -> RepositoryResult<Vec<ExamResult>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.query_list(
            &format!(
                r#"SELECT {} FROM exam_result WHERE student_id = ?1
                   ORDER BY exam_date DESC, created_at DESC
                   LIMIT ?2"#,
                RESULT_COLUMNS
            ),
            &[&student_id, &limit],
        )
    }

    fn query_list(
        &self,
        sql: &str,
        args: &[&dyn rusqlite::ToSql],
    ) -> RepositoryResult<Vec<ExamResult>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(sql)?;
        let list = stmt
            .query_map(args, map_result_row)?
            .collect::<SqliteResult<Vec<ExamResult>>>()?;
        Ok(list)
    }

    // ==========================================
    // 事务内操作（删除策略使用）
    // ==========================================

    pub fn count_by_course_in(conn: &Connection, course_id: &str) -> RepositoryResult<i64> {
        let n: i64 = conn.query_row(
            "SELECT COUNT(*) FROM exam_result WHERE course_id = ?1",
            params![course_id],
            |row| row.get(0),
        )?;
        Ok(n)
    }

    pub fn count_by_student_in(conn: &Connection, student_id: &str) -> RepositoryResult<i64> {
        let n: i64 = conn.query_row(
            "SELECT COUNT(*) FROM exam_result WHERE student_id = ?1",
            params![student_id],
            |row| row.get(0),
        )?;
        Ok(n)
    }

    pub fn delete_by_course_in(conn: &Connection, course_id: &str) -> RepositoryResult<usize> {
        let n = conn.execute(
            "DELETE FROM exam_result WHERE course_id = ?1",
            params![course_id],
        )?;
        Ok(n)
    }

    pub fn delete_by_student_in(conn: &Connection, student_id: &str) -> RepositoryResult<usize> {
        let n = conn.execute(
            "DELETE FROM exam_result WHERE student_id = ?1",
            params![student_id],
        )?;
        Ok(n)
    }
}
