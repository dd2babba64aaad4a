// ==========================================
// 高校选课系统 - 选课 API
// ==========================================
// 职责: 选课准入、状态变更、删除与查询
// 说明: 写操作全部委托 EnrollmentLedger,本层只做参数校验与错误映射
// ==========================================

use std::sync::Arc;

use tracing::{debug, info};

use crate::api::error::{ApiError, ApiResult};
use crate::domain::registration::Registration;
use crate::domain::types::{Grade, RegistrationStatus};
use crate::engine::enrollment_ledger::EnrollmentLedger;
use crate::engine::error::LedgerError;
use crate::repository::registration_repo::RegistrationRepository;

fn require_id(field: &str, value: &str) -> ApiResult<()> {
    if value.trim().is_empty() {
        return Err(ApiError::InvalidInput(format!("{}不能为空", field)));
    }
    Ok(())
}

// ==========================================
// RegistrationApi - 选课 API
// ==========================================
pub struct RegistrationApi {
    ledger: Arc<EnrollmentLedger>,
    registration_repo: Arc<RegistrationRepository>,
}

impl RegistrationApi {
    /// 创建新的RegistrationApi实例
    ///
    /// # 参数
    /// - ledger: 选课准入账本
    /// - registration_repo: 选课记录仓储（只读查询）
    pub fn new(ledger: Arc<EnrollmentLedger>, registration_repo: Arc<RegistrationRepository>) -> Self {
        Self {
            ledger,
            registration_repo,
        }
    }

    // ==========================================
    // 写操作
    // ==========================================

    /// 学生选课
    ///
    /// # 返回
    /// - Ok(Registration): 新建的 ENROLLED 记录
    /// - Err(UnknownReference): 学生或课程不存在
    /// - Err(AlreadyRegistered): 已有 ENROLLED/COMPLETED 记录
    /// - Err(CapacityExceeded): 课程已满
    pub fn admit_registration(&self, student_id: &str, course_id: &str) -> ApiResult<Registration> {
        require_id("学生ID", student_id)?;
        require_id("课程ID", course_id)?;

        self.ledger
            .admit(student_id, course_id)
            .map_err(|e| match e {
                LedgerError::NotFound { entity, id } => {
                    ApiError::UnknownReference(format!("{}(id={})不存在", entity, id))
                }
                other => other.into(),
            })
    }

    /// 变更选课状态（可同时写入最终成绩）
    ///
    /// grade 为 None 时保留原有最终成绩
    pub fn update_registration_status(
        &self,
        registration_id: &str,
        status: RegistrationStatus,
        grade: Option<Grade>,
    ) -> ApiResult<Registration> {
        require_id("选课记录ID", registration_id)?;
        debug!(registration_id, status = %status, "变更选课状态");

        Ok(self.ledger.update_status(registration_id, status, grade)?)
    }

    /// 退课（ENROLLED → DROPPED）
    pub fn drop_registration(&self, registration_id: &str) -> ApiResult<Registration> {
        self.update_registration_status(registration_id, RegistrationStatus::Dropped, None)
    }

    /// 结课（ENROLLED → COMPLETED）,写入最终成绩
    pub fn complete_registration(
        &self,
        registration_id: &str,
        grade: Grade,
    ) -> ApiResult<Registration> {
        self.update_registration_status(registration_id, RegistrationStatus::Completed, Some(grade))
    }

    /// 删除选课记录
    pub fn remove_registration(&self, registration_id: &str) -> ApiResult<()> {
        require_id("选课记录ID", registration_id)?;
        let removed = self.ledger.remove(registration_id)?;
        info!(
            registration_id,
            student_id = %removed.student_id,
            course_id = %removed.course_id,
            "选课记录删除完成"
        );
        Ok(())
    }

    // ==========================================
    // 查询接口
    // ==========================================

    pub fn get_registration(&self, registration_id: &str) -> ApiResult<Registration> {
        require_id("选课记录ID", registration_id)?;
        self.registration_repo
            .find_by_id(registration_id)?
            .ok_or_else(|| ApiError::NotFound(format!("选课记录(id={})不存在", registration_id)))
    }

    /// 查询选课记录
    ///
    /// # 参数
    /// - by_student: 可选学生过滤
    /// - by_course: 可选课程过滤
    ///
    /// 两者都为 None 时返回全部记录
    pub fn list_registrations(
        &self,
        by_student: Option<&str>,
        by_course: Option<&str>,
    ) -> ApiResult<Vec<Registration>> {
        let list = match (by_student, by_course) {
            (Some(student_id), Some(course_id)) => self
                .registration_repo
                .find_by_student_and_course(student_id, course_id)?,
            (Some(student_id), None) => self.registration_repo.find_by_student(student_id)?,
            (None, Some(course_id)) => self.registration_repo.find_by_course(course_id)?,
            (None, None) => self.registration_repo.list_all()?,
        };
        Ok(list)
    }

    /// 按学生 + 状态查询
    pub fn list_by_student_and_status(
        &self,
        student_id: &str,
        status: RegistrationStatus,
    ) -> ApiResult<Vec<Registration>> {
        require_id("学生ID", student_id)?;
        Ok(self
            .registration_repo
            .find_by_student_and_status(student_id, status)?)
    }

    /// 课程当前 ENROLLED 人数
    pub fn enrolled_count(&self, course_id: &str) -> ApiResult<i32> {
        require_id("课程ID", course_id)?;
        Ok(self.ledger.enrolled_count(course_id)?)
    }
}
