// ==========================================
// 高校选课系统 - 课程 API
// ==========================================
// 职责: 课程目录维护与查询
// 红线: 课程代码唯一; 容量下调不驱逐已选学生
// 说明: 删除走 EnrollmentLedger,按 catalog.delete_policy 执行
// ==========================================

use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use crate::api::error::{ApiError, ApiResult};
use crate::config::config_manager::ConfigManager;
use crate::db::now_timestamp;
use crate::domain::course::{Course, NewCourse, SeatCapacity};
use crate::domain::types::DeletePolicy;
use crate::engine::enrollment_ledger::{DeletionSummary, EnrollmentLedger};
use crate::repository::course_repo::CourseRepository;

/// 课程输入校验
fn validate_course_input(input: &NewCourse) -> ApiResult<()> {
    if input.code.trim().is_empty() {
        return Err(ApiError::ValidationError("课程代码不能为空".to_string()));
    }
    if input.title.trim().is_empty() {
        return Err(ApiError::ValidationError("课程名称不能为空".to_string()));
    }
    if input.credits <= 0 {
        return Err(ApiError::ValidationError(format!(
            "学分必须大于0: {}",
            input.credits
        )));
    }
    if let Some(cap) = input.max_students {
        if cap < 0 {
            return Err(ApiError::ValidationError(format!("容量不能为负数: {}", cap)));
        }
    }
    Ok(())
}

// ==========================================
// CourseApi - 课程 API
// ==========================================
pub struct CourseApi {
    course_repo: Arc<CourseRepository>,
    ledger: Arc<EnrollmentLedger>,
    config_manager: Arc<ConfigManager>,
}

impl CourseApi {
    /// 创建新的CourseApi实例
    ///
    /// # 参数
    /// - course_repo: 课程仓储
    /// - ledger: 选课准入账本（删除课程时释放名额）
    /// - config_manager: 配置管理器（删除策略）
    pub fn new(
        course_repo: Arc<CourseRepository>,
        ledger: Arc<EnrollmentLedger>,
        config_manager: Arc<ConfigManager>,
    ) -> Self {
        Self {
            course_repo,
            ledger,
            config_manager,
        }
    }

    /// 新建课程
    ///
    /// # 返回
    /// - Err(ValidationError): 必填字段缺失、学分/容量非法
    /// - Err(Duplicate): 课程代码已存在
    pub fn create_course(&self, input: NewCourse) -> ApiResult<Course> {
        validate_course_input(&input)?;

        let now = now_timestamp();
        let course = Course {
            course_id: Uuid::new_v4().to_string(),
            code: input.code.trim().to_string(),
            title: input.title.trim().to_string(),
            description: input.description,
            credits: input.credits,
            instructor: input.instructor,
            max_students: input.max_students,
            enrolled_count: 0,
            created_at: now,
            updated_at: now,
        };
        self.course_repo.insert(&course)?;

        info!(course_id = %course.course_id, code = %course.code, "课程已创建");
        Ok(course)
    }

    /// 更新课程
    ///
    /// 容量可下调到当前人数以下,此时不再接受新的准入,直到名额释放
    pub fn update_course(&self, course_id: &str, input: NewCourse) -> ApiResult<Course> {
        validate_course_input(&input)?;

        let current = self.get_course(course_id)?;
        let updated = Course {
            code: input.code.trim().to_string(),
            title: input.title.trim().to_string(),
            description: input.description,
            credits: input.credits,
            instructor: input.instructor,
            max_students: input.max_students,
            updated_at: now_timestamp(),
            ..current
        };
        self.course_repo.update(&updated)?;

        // 重新读取,enrolled_count 以数据库为准
        let saved = self.get_course(course_id)?;
        if saved.is_over_capacity() {
            warn!(
                course_id,
                capacity = ?saved.max_students,
                enrolled = saved.enrolled_count,
                "课程容量已下调至在读人数以下"
            );
        }
        Ok(saved)
    }

    /// 按当前配置的删除策略删除课程
    pub fn delete_course(&self, course_id: &str) -> ApiResult<DeletionSummary> {
        let policy = self
            .config_manager
            .get_delete_policy()
            .map_err(|e| ApiError::InternalError(format!("读取删除策略失败: {}", e)))?;
        self.delete_course_with_policy(course_id, policy)
    }

    /// 按指定删除策略删除课程
    pub fn delete_course_with_policy(
        &self,
        course_id: &str,
        policy: DeletePolicy,
    ) -> ApiResult<DeletionSummary> {
        Ok(self.ledger.remove_course(course_id, policy)?)
    }

    // ==========================================
    // 查询接口
    // ==========================================

    pub fn get_course(&self, course_id: &str) -> ApiResult<Course> {
        self.course_repo
            .find_by_id(course_id)?
            .ok_or_else(|| ApiError::NotFound(format!("课程(id={})不存在", course_id)))
    }

    pub fn get_course_by_code(&self, code: &str) -> ApiResult<Course> {
        self.course_repo
            .find_by_code(code)?
            .ok_or_else(|| ApiError::NotFound(format!("课程(code={})不存在", code)))
    }

    pub fn list_courses(&self) -> ApiResult<Vec<Course>> {
        Ok(self.course_repo.list_all()?)
    }

    pub fn search_by_title(&self, keyword: &str) -> ApiResult<Vec<Course>> {
        Ok(self.course_repo.search_by_title(keyword)?)
    }

    pub fn search_by_instructor(&self, keyword: &str) -> ApiResult<Vec<Course>> {
        Ok(self.course_repo.search_by_instructor(keyword)?)
    }

    /// 仍有空余名额的课程
    pub fn list_available_courses(&self) -> ApiResult<Vec<Course>> {
        Ok(self.course_repo.find_available()?)
    }
}
