// ==========================================
// 高校选课系统 - 学生 API
// ==========================================
// 职责: 学生档案维护与查询
// 红线: 学号唯一; 邮箱填写时唯一
// ==========================================

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::api::error::{ApiError, ApiResult};
use crate::config::config_manager::ConfigManager;
use crate::db::now_timestamp;
use crate::domain::student::{NewStudent, Student};
use crate::domain::types::DeletePolicy;
use crate::engine::enrollment_ledger::{DeletionSummary, EnrollmentLedger};
use crate::repository::student_repo::StudentRepository;

fn validate_student_input(input: &NewStudent) -> ApiResult<()> {
    if input.student_code.trim().is_empty() {
        return Err(ApiError::ValidationError("学号不能为空".to_string()));
    }
    if input.first_name.trim().is_empty() || input.last_name.trim().is_empty() {
        return Err(ApiError::ValidationError("姓名不能为空".to_string()));
    }
    if let Some(email) = &input.email {
        if !email.contains('@') {
            return Err(ApiError::ValidationError(format!("邮箱格式错误: {}", email)));
        }
    }
    Ok(())
}

/// 空白字符串视为未填写
fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// ==========================================
// StudentApi - 学生 API
// ==========================================
pub struct StudentApi {
    student_repo: Arc<StudentRepository>,
    ledger: Arc<EnrollmentLedger>,
    config_manager: Arc<ConfigManager>,
}

impl StudentApi {
    pub fn new(
        student_repo: Arc<StudentRepository>,
        ledger: Arc<EnrollmentLedger>,
        config_manager: Arc<ConfigManager>,
    ) -> Self {
        Self {
            student_repo,
            ledger,
            config_manager,
        }
    }

    /// 新建学生
    ///
    /// # 返回
    /// - Err(ValidationError): 学号/姓名缺失或邮箱格式错误
    /// - Err(Duplicate): 学号或邮箱已存在
    pub fn create_student(&self, input: NewStudent) -> ApiResult<Student> {
        let input = NewStudent {
            email: non_blank(input.email),
            phone: non_blank(input.phone),
            ..input
        };
        validate_student_input(&input)?;

        let now = now_timestamp();
        let student = Student {
            student_id: Uuid::new_v4().to_string(),
            student_code: input.student_code.trim().to_string(),
            first_name: input.first_name.trim().to_string(),
            last_name: input.last_name.trim().to_string(),
            email: input.email,
            phone: input.phone,
            date_of_birth: input.date_of_birth,
            created_at: now,
            updated_at: now,
        };
        self.student_repo.insert(&student)?;

        info!(student_id = %student.student_id, code = %student.student_code, "学生已创建");
        Ok(student)
    }

    pub fn update_student(&self, student_id: &str, input: NewStudent) -> ApiResult<Student> {
        let input = NewStudent {
            email: non_blank(input.email),
            phone: non_blank(input.phone),
            ..input
        };
        validate_student_input(&input)?;

        let current = self.get_student(student_id)?;
        let updated = Student {
            student_code: input.student_code.trim().to_string(),
            first_name: input.first_name.trim().to_string(),
            last_name: input.last_name.trim().to_string(),
            email: input.email,
            phone: input.phone,
            date_of_birth: input.date_of_birth,
            updated_at: now_timestamp(),
            ..current
        };
        self.student_repo.update(&updated)?;
        Ok(updated)
    }

    /// 按当前配置的删除策略删除学生
    pub fn delete_student(&self, student_id: &str) -> ApiResult<DeletionSummary> {
        let policy = self
            .config_manager
            .get_delete_policy()
            .map_err(|e| ApiError::InternalError(format!("读取删除策略失败: {}", e)))?;
        self.delete_student_with_policy(student_id, policy)
    }

    pub fn delete_student_with_policy(
        &self,
        student_id: &str,
        policy: DeletePolicy,
    ) -> ApiResult<DeletionSummary> {
        Ok(self.ledger.remove_student(student_id, policy)?)
    }

    // ==========================================
    // 查询接口
    // ==========================================

    pub fn get_student(&self, student_id: &str) -> ApiResult<Student> {
        self.student_repo
            .find_by_id(student_id)?
            .ok_or_else(|| ApiError::NotFound(format!("学生(id={})不存在", student_id)))
    }

    pub fn get_student_by_code(&self, student_code: &str) -> ApiResult<Student> {
        self.student_repo
            .find_by_code(student_code)?
            .ok_or_else(|| ApiError::NotFound(format!("学生(code={})不存在", student_code)))
    }

    pub fn list_students(&self) -> ApiResult<Vec<Student>> {
        Ok(self.student_repo.list_all()?)
    }

    /// 按全名模糊查询
    pub fn search_by_name(&self, keyword: &str) -> ApiResult<Vec<Student>> {
        Ok(self.student_repo.search_by_full_name(keyword)?)
    }
}
