// ==========================================
// 高校选课系统 - 选课记录数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑（容量/唯一性判定在 EnrollmentLedger）
// 约束: 写操作只通过 with_write_tx 在 IMMEDIATE 事务中执行
// ==========================================

use crate::db::{format_timestamp, parse_timestamp};
use crate::domain::registration::Registration;
use crate::domain::types::{Grade, RegistrationStatus};
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDateTime;
use rusqlite::{
    params, Connection, OptionalExtension, Result as SqliteResult, Row, Transaction,
    TransactionBehavior,
};
use std::sync::{Arc, Mutex};

const REGISTRATION_COLUMNS: &str = r#"
    registration_id, student_id, course_id, status, grade, registered_at, updated_at
"#;

fn conversion_error(idx: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        idx,
        rusqlite::types::Type::Text,
        message.into(),
    )
}

fn map_registration_row(row: &Row<'_>) -> SqliteResult<Registration> {
    let status_str: String = row.get(3)?;
    let status = RegistrationStatus::from_db_str(&status_str)
        .ok_or_else(|| conversion_error(3, format!("未知选课状态: {}", status_str)))?;

    let grade = match row.get::<_, Option<String>>(4)? {
        Some(raw) => Some(
            Grade::from_db_str(&raw)
                .ok_or_else(|| conversion_error(4, format!("未知成绩等级: {}", raw)))?,
        ),
        None => None,
    };

    Ok(Registration {
        registration_id: row.get(0)?,
        student_id: row.get(1)?,
        course_id: row.get(2)?,
        status,
        grade,
        registered_at: parse_timestamp(5, &row.get::<_, String>(5)?)?,
        updated_at: parse_timestamp(6, &row.get::<_, String>(6)?)?,
    })
}

// ==========================================
// RegistrationRepository - 选课记录仓储
// ==========================================
pub struct RegistrationRepository {
    conn: Arc<Mutex<Connection>>,
}

impl RegistrationRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 在 IMMEDIATE 写事务中执行闭包
    ///
    /// 闭包返回 Ok 时提交,返回 Err 时回滚（Transaction drop 即回滚）。
    /// 同一事务内可调用各仓储的 *_in 函数,要求这些仓储共享同一连接。
    pub fn with_write_tx<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T, E>,
        E: From<RepositoryError>,
    {
        let mut conn = self.get_conn()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        let value = f(&tx)?;

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        Ok(value)
    }

    // ==========================================
    // 查询接口
    // ==========================================

    pub fn find_by_id(&self, registration_id: &str) -> RepositoryResult<Option<Registration>> {
        let conn = self.get_conn()?;
        Self::find_by_id_in(&conn, registration_id)
    }

    /// 查询全部选课记录
    pub fn list_all(&self) -> RepositoryResult<Vec<Registration>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM registration ORDER BY registered_at, registration_id",
            REGISTRATION_COLUMNS
        );
        Self::query_list(&conn, &sql, &[])
    }

    /// 按学生查询
    pub fn find_by_student(&self, student_id: &str) -> RepositoryResult<Vec<Registration>> {
        let conn = self.get_conn()?;
        Self::find_by_student_in(&conn, student_id)
    }

    /// 按课程查询
    pub fn find_by_course(&self, course_id: &str) -> RepositoryResult<Vec<Registration>> {
        let conn = self.get_conn()?;
        Self::find_by_course_in(&conn, course_id)
    }

    /// 按学生 + 课程查询（含历史退课记录）
    pub fn find_by_student_and_course(
        &self,
        student_id: &str,
        course_id: &str,
    ) -> RepositoryResult<Vec<Registration>> {
        let conn = self.get_conn()?;
        let sql = format!(
            r#"SELECT {} FROM registration
               WHERE student_id = ?1 AND course_id = ?2
               ORDER BY registered_at, registration_id"#,
            REGISTRATION_COLUMNS
        );
        Self::query_list(&conn, &sql, &[&student_id, &course_id])
    }

    /// 按学生 + 状态查询
    pub fn find_by_student_and_status(
        &self,
        student_id: &str,
        status: RegistrationStatus,
    ) -> RepositoryResult<Vec<Registration>> {
        let conn = self.get_conn()?;
        let sql = format!(
            r#"SELECT {} FROM registration
               WHERE student_id = ?1 AND status = ?2
               ORDER BY registered_at, registration_id"#,
            REGISTRATION_COLUMNS
        );
        Self::query_list(&conn, &sql, &[&student_id, &status.to_db_str()])
    }

    /// 按课程统计 ENROLLED 记录行数（直接计数,不读计数器）
    pub fn count_enrolled(&self, course_id: &str) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        Self::count_enrolled_in(&conn, course_id)
    }

    fn query_list(
        conn: &Connection,
        sql: &str,
        args: &[&dyn rusqlite::ToSql],
    ) -> RepositoryResult<Vec<Registration>> {
        let mut stmt = conn.prepare(sql)?;
        let list = stmt
            .query_map(args, map_registration_row)?
            .collect::<SqliteResult<Vec<Registration>>>()?;
        Ok(list)
    }

    // ==========================================
    // 事务内操作（由准入账本调用）
    // ==========================================

    pub fn find_by_id_in(
        conn: &Connection,
        registration_id: &str,
    ) -> RepositoryResult<Option<Registration>> {
        let sql = format!(
            "SELECT {} FROM registration WHERE registration_id = ?1",
            REGISTRATION_COLUMNS
        );
        let reg = conn
            .query_row(&sql, params![registration_id], map_registration_row)
            .optional()?;
        Ok(reg)
    }

    pub fn find_by_student_in(
        conn: &Connection,
        student_id: &str,
    ) -> RepositoryResult<Vec<Registration>> {
        let sql = format!(
            r#"SELECT {} FROM registration WHERE student_id = ?1
               ORDER BY registered_at, registration_id"#,
            REGISTRATION_COLUMNS
        );
        Self::query_list(conn, &sql, &[&student_id])
    }

    pub fn find_by_course_in(
        conn: &Connection,
        course_id: &str,
    ) -> RepositoryResult<Vec<Registration>> {
        let sql = format!(
            r#"SELECT {} FROM registration WHERE course_id = ?1
               ORDER BY registered_at, registration_id"#,
            REGISTRATION_COLUMNS
        );
        Self::query_list(conn, &sql, &[&course_id])
    }

    /// 查询 (学生, 课程) 的有效记录（非 DROPPED）
    pub fn find_active_by_pair_in(
        conn: &Connection,
        student_id: &str,
        course_id: &str,
    ) -> RepositoryResult<Option<Registration>> {
        let sql = format!(
            r#"SELECT {} FROM registration
               WHERE student_id = ?1 AND course_id = ?2 AND status <> 'DROPPED'
               LIMIT 1"#,
            REGISTRATION_COLUMNS
        );
        let reg = conn
            .query_row(&sql, params![student_id, course_id], map_registration_row)
            .optional()?;
        Ok(reg)
    }

    /// (学生, 课程) 是否存在退课记录
    pub fn has_dropped_for_pair_in(
        conn: &Connection,
        student_id: &str,
        course_id: &str,
    ) -> RepositoryResult<bool> {
        let found: Option<i32> = conn
            .query_row(
                r#"SELECT 1 FROM registration
                   WHERE student_id = ?1 AND course_id = ?2 AND status = 'DROPPED'
                   LIMIT 1"#,
                params![student_id, course_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    pub fn count_enrolled_in(conn: &Connection, course_id: &str) -> RepositoryResult<i64> {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM registration WHERE course_id = ?1 AND status = 'ENROLLED'",
            params![course_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    pub fn insert_in(conn: &Connection, reg: &Registration) -> RepositoryResult<()> {
        conn.execute(
            r#"
            INSERT INTO registration (
                registration_id, student_id, course_id, status, grade,
                registered_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                reg.registration_id,
                reg.student_id,
                reg.course_id,
                reg.status.to_db_str(),
                reg.grade.map(|g| g.to_db_str()),
                format_timestamp(&reg.registered_at),
                format_timestamp(&reg.updated_at),
            ],
        )?;
        Ok(())
    }

    /// 更新状态与最终成绩
    pub fn update_status_in(
        conn: &Connection,
        registration_id: &str,
        status: RegistrationStatus,
        grade: Option<Grade>,
        updated_at: &NaiveDateTime,
    ) -> RepositoryResult<()> {
        let rows_affected = conn.execute(
            r#"
            UPDATE registration
               SET status = ?1, grade = ?2, updated_at = ?3
             WHERE registration_id = ?4
            "#,
            params![
                status.to_db_str(),
                grade.map(|g| g.to_db_str()),
                format_timestamp(updated_at),
                registration_id,
            ],
        )?;

        if rows_affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "Registration".to_string(),
                id: registration_id.to_string(),
            });
        }
        Ok(())
    }

    pub fn delete_in(conn: &Connection, registration_id: &str) -> RepositoryResult<()> {
        let rows_affected = conn.execute(
            "DELETE FROM registration WHERE registration_id = ?1",
            params![registration_id],
        )?;

        if rows_affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "Registration".to_string(),
                id: registration_id.to_string(),
            });
        }
        Ok(())
    }

    /// 删除某课程的全部选课记录,返回删除行数
    pub fn delete_by_course_in(conn: &Connection, course_id: &str) -> RepositoryResult<usize> {
        let n = conn.execute(
            "DELETE FROM registration WHERE course_id = ?1",
            params![course_id],
        )?;
        Ok(n)
    }

    /// 删除某学生的全部选课记录,返回删除行数
    pub fn delete_by_student_in(conn: &Connection, student_id: &str) -> RepositoryResult<usize> {
        let n = conn.execute(
            "DELETE FROM registration WHERE student_id = ?1",
            params![student_id],
        )?;
        Ok(n)
    }
}
