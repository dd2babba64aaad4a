// ==========================================
// 高校选课系统 - 课程数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 说明: enrolled_count 只能通过 *_in 系列函数在账本写事务中变更
// ==========================================

use crate::db::{format_timestamp, parse_timestamp};
use crate::domain::course::Course;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

const COURSE_COLUMNS: &str = r#"
    course_id, code, title, description, credits, instructor,
    max_students, enrolled_count, created_at, updated_at
"#;

/// 行 → Course
fn map_course_row(row: &Row<'_>) -> SqliteResult<Course> {
    Ok(Course {
        course_id: row.get(0)?,
        code: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        credits: row.get(4)?,
        instructor: row.get(5)?,
        max_students: row.get(6)?,
        enrolled_count: row.get(7)?,
        created_at: parse_timestamp(8, &row.get::<_, String>(8)?)?,
        updated_at: parse_timestamp(9, &row.get::<_, String>(9)?)?,
    })
}

// ==========================================
// CourseRepository - 课程仓储
// ==========================================

/// 课程仓储
/// 职责: 管理course表的CRUD操作与名额计数器
pub struct CourseRepository {
    conn: Arc<Mutex<Connection>>,
}

impl CourseRepository {
    /// 从已有连接创建仓储实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 插入课程
    ///
    /// # 错误
    /// - `UniqueConstraintViolation`: 课程代码重复
    pub fn insert(&self, course: &Course) -> RepositoryResult<()> {
        let conn = self.get_conn()?;

        conn.execute(
            r#"
            INSERT INTO course (
                course_id, code, title, description, credits, instructor,
                max_students, enrolled_count, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
            params![
                course.course_id,
                course.code,
                course.title,
                course.description,
                course.credits,
                course.instructor,
                course.max_students,
                course.enrolled_count,
                format_timestamp(&course.created_at),
                format_timestamp(&course.updated_at),
            ],
        )?;

        Ok(())
    }

    /// 更新课程基本信息
    ///
    /// enrolled_count 不在更新范围内
    pub fn update(&self, course: &Course) -> RepositoryResult<()> {
        let conn = self.get_conn()?;

        let rows_affected = conn.execute(
            r#"
            UPDATE course
               SET code = ?1, title = ?2, description = ?3, credits = ?4,
                   instructor = ?5, max_students = ?6, updated_at = ?7
             WHERE course_id = ?8
            "#,
            params![
                course.code,
                course.title,
                course.description,
                course.credits,
                course.instructor,
                course.max_students,
                format_timestamp(&course.updated_at),
                course.course_id,
            ],
        )?;

        if rows_affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "Course".to_string(),
                id: course.course_id.clone(),
            });
        }

        Ok(())
    }

    /// 按ID查询
    pub fn find_by_id(&self, course_id: &str) -> RepositoryResult<Option<Course>> {
        let conn = self.get_conn()?;
        Self::find_by_id_in(&conn, course_id)
    }

    /// 按课程代码查询
    pub fn find_by_code(&self, code: &str) -> RepositoryResult<Option<Course>> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT {} FROM course WHERE code = ?1", COURSE_COLUMNS);

        let course = conn
            .query_row(&sql, params![code], map_course_row)
            .optional()?;
        Ok(course)
    }

    /// 查询全部课程（按课程代码排序）
    pub fn list_all(&self) -> RepositoryResult<Vec<Course>> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT {} FROM course ORDER BY code", COURSE_COLUMNS);

        let mut stmt = conn.prepare(&sql)?;
        let courses = stmt
            .query_map([], map_course_row)?
            .collect::<SqliteResult<Vec<Course>>>()?;
        Ok(courses)
    }

    /// 按课程名称模糊查询（不区分大小写）
    pub fn search_by_title(&self, keyword: &str) -> RepositoryResult<Vec<Course>> {
        self.search_by_column("title", keyword)
    }

    /// 按授课教师模糊查询（不区分大小写）
    pub fn search_by_instructor(&self, keyword: &str) -> RepositoryResult<Vec<Course>> {
        self.search_by_column("instructor", keyword)
    }

    fn search_by_column(&self, column: &str, keyword: &str) -> RepositoryResult<Vec<Course>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM course WHERE LOWER({}) LIKE '%' || LOWER(?1) || '%' ORDER BY code",
            COURSE_COLUMNS, column
        );

        let mut stmt = conn.prepare(&sql)?;
        let courses = stmt
            .query_map(params![keyword], map_course_row)?
            .collect::<SqliteResult<Vec<Course>>>()?;
        Ok(courses)
    }

    /// 查询仍有空余名额的课程
    ///
    /// 口径: 不限容量,或 ENROLLED 人数 < 容量
    pub fn find_available(&self) -> RepositoryResult<Vec<Course>> {
        let conn = self.get_conn()?;
        let sql = format!(
            r#"SELECT {} FROM course
               WHERE max_students IS NULL OR enrolled_count < max_students
               ORDER BY code"#,
            COURSE_COLUMNS
        );

        let mut stmt = conn.prepare(&sql)?;
        let courses = stmt
            .query_map([], map_course_row)?
            .collect::<SqliteResult<Vec<Course>>>()?;
        Ok(courses)
    }

    /// 课程是否存在
    pub fn exists(&self, course_id: &str) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let found: Option<i32> = conn
            .query_row(
                "SELECT 1 FROM course WHERE course_id = ?1",
                params![course_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// 查询 course_id → 课程代码 映射
    pub fn code_map(&self) -> RepositoryResult<std::collections::HashMap<String, String>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare("SELECT course_id, code FROM course")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
            .collect::<SqliteResult<Vec<(String, String)>>>()?;
        Ok(rows.into_iter().collect())
    }

    // ==========================================
    // 事务内操作（由准入账本调用）
    // ==========================================

    /// 在给定连接/事务上按ID查询
    pub fn find_by_id_in(conn: &Connection, course_id: &str) -> RepositoryResult<Option<Course>> {
        let sql = format!("SELECT {} FROM course WHERE course_id = ?1", COURSE_COLUMNS);
        let course = conn
            .query_row(&sql, params![course_id], map_course_row)
            .optional()?;
        Ok(course)
    }

    /// 条件占座: 仅当不限容量或 enrolled_count < max_students 时计数 +1
    ///
    /// # 返回
    /// - Ok(true): 占座成功
    /// - Ok(false): 已满（或课程不存在）
    pub fn try_reserve_seat_in(conn: &Connection, course_id: &str) -> RepositoryResult<bool> {
        let rows_affected = conn.execute(
            r#"
            UPDATE course
               SET enrolled_count = enrolled_count + 1
             WHERE course_id = ?1
               AND (max_students IS NULL OR enrolled_count < max_students)
            "#,
            params![course_id],
        )?;
        Ok(rows_affected == 1)
    }

    /// 释放名额: 计数 -1（不低于 0）
    pub fn release_seat_in(conn: &Connection, course_id: &str) -> RepositoryResult<()> {
        let rows_affected = conn.execute(
            r#"
            UPDATE course
               SET enrolled_count = enrolled_count - 1
             WHERE course_id = ?1 AND enrolled_count > 0
            "#,
            params![course_id],
        )?;

        if rows_affected == 0 {
            return Err(RepositoryError::InternalError(format!(
                "名额计数器已为0或课程不存在: course_id={}",
                course_id
            )));
        }
        Ok(())
    }

    /// 删除课程
    pub fn delete_in(conn: &Connection, course_id: &str) -> RepositoryResult<()> {
        let rows_affected =
            conn.execute("DELETE FROM course WHERE course_id = ?1", params![course_id])?;

        if rows_affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "Course".to_string(),
                id: course_id.to_string(),
            });
        }
        Ok(())
    }
}
