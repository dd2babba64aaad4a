// ==========================================
// 高校选课系统 - 学生数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================

use crate::db::{format_timestamp, parse_date, parse_timestamp, DATE_FORMAT};
use crate::domain::student::Student;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

const STUDENT_COLUMNS: &str = r#"
    student_id, student_code, first_name, last_name, email, phone,
    date_of_birth, created_at, updated_at
"#;

fn map_student_row(row: &Row<'_>) -> SqliteResult<Student> {
    let date_of_birth = match row.get::<_, Option<String>>(6)? {
        Some(raw) => Some(parse_date(6, &raw)?),
        None => None,
    };

    Ok(Student {
        student_id: row.get(0)?,
        student_code: row.get(1)?,
        first_name: row.get(2)?,
        last_name: row.get(3)?,
        email: row.get(4)?,
        phone: row.get(5)?,
        date_of_birth,
        created_at: parse_timestamp(7, &row.get::<_, String>(7)?)?,
        updated_at: parse_timestamp(8, &row.get::<_, String>(8)?)?,
    })
}

// ==========================================
// StudentRepository - 学生仓储
// ==========================================
pub struct StudentRepository {
    conn: Arc<Mutex<Connection>>,
}

impl StudentRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 插入学生
    ///
    /// # 错误
    /// - `UniqueConstraintViolation`: 学号或邮箱重复
    pub fn insert(&self, student: &Student) -> RepositoryResult<()> {
        let conn = self.get_conn()?;

        conn.execute(
            r#"
            INSERT INTO student (
                student_id, student_code, first_name, last_name, email, phone,
                date_of_birth, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                student.student_id,
                student.student_code,
                student.first_name,
                student.last_name,
                student.email,
                student.phone,
                student.date_of_birth.map(|d| d.format(DATE_FORMAT).to_string()),
                format_timestamp(&student.created_at),
                format_timestamp(&student.updated_at),
            ],
        )?;

        Ok(())
    }

    /// 更新学生信息
    pub fn update(&self, student: &Student) -> RepositoryResult<()> {
        let conn = self.get_conn()?;

        let rows_affected = conn.execute(
            r#"
            UPDATE student
               SET student_code = ?1, first_name = ?2, last_name = ?3, email = ?4,
                   phone = ?5, date_of_birth = ?6, updated_at = ?7
             WHERE student_id = ?8
            "#,
            params![
                student.student_code,
                student.first_name,
                student.last_name,
                student.email,
                student.phone,
                student.date_of_birth.map(|d| d.format(DATE_FORMAT).to_string()),
                format_timestamp(&student.updated_at),
                student.student_id,
            ],
        )?;

        if rows_affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "Student".to_string(),
                id: student.student_id.clone(),
            });
        }

        Ok(())
    }

    /// 按ID查询
    pub fn find_by_id(&self, student_id: &str) -> RepositoryResult<Option<Student>> {
        let conn = self.get_conn()?;
        Self::find_by_id_in(&conn, student_id)
    }

    /// 按学号查询
    pub fn find_by_code(&self, student_code: &str) -> RepositoryResult<Option<Student>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM student WHERE student_code = ?1",
            STUDENT_COLUMNS
        );

        let student = conn
            .query_row(&sql, params![student_code], map_student_row)
            .optional()?;
        Ok(student)
    }

    /// 查询全部学生（按学号排序）
    pub fn list_all(&self) -> RepositoryResult<Vec<Student>> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT {} FROM student ORDER BY student_code", STUDENT_COLUMNS);

        let mut stmt = conn.prepare(&sql)?;
        let students = stmt
            .query_map([], map_student_row)?
            .collect::<SqliteResult<Vec<Student>>>()?;
        Ok(students)
    }

    /// 按全名 ("first last") 模糊查询
    pub fn search_by_full_name(&self, keyword: &str) -> RepositoryResult<Vec<Student>> {
        let conn = self.get_conn()?;
        let sql = format!(
            r#"SELECT {} FROM student
               WHERE (first_name || ' ' || last_name) LIKE '%' || ?1 || '%'
               ORDER BY student_code"#,
            STUDENT_COLUMNS
        );

        let mut stmt = conn.prepare(&sql)?;
        let students = stmt
            .query_map(params![keyword], map_student_row)?
            .collect::<SqliteResult<Vec<Student>>>()?;
        Ok(students)
    }

    /// 学生是否存在
    pub fn exists(&self, student_id: &str) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let found: Option<i32> = conn
            .query_row(
                "SELECT 1 FROM student WHERE student_id = ?1",
                params![student_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    // ==========================================
    // 事务内操作
    // ==========================================

    pub fn find_by_id_in(conn: &Connection, student_id: &str) -> RepositoryResult<Option<Student>> {
        let sql = format!("SELECT {} FROM student WHERE student_id = ?1", STUDENT_COLUMNS);
        let student = conn
            .query_row(&sql, params![student_id], map_student_row)
            .optional()?;
        Ok(student)
    }

    pub fn delete_in(conn: &Connection, student_id: &str) -> RepositoryResult<()> {
        let rows_affected =
            conn.execute("DELETE FROM student WHERE student_id = ?1", params![student_id])?;

        if rows_affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "Student".to_string(),
                id: student_id.to_string(),
            });
        }
        Ok(())
    }
}
