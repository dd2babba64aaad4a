// ==========================================
// 高校选课系统 - 应用状态
// ==========================================
// 职责: 管理应用级别的共享状态和API实例
// ==========================================

use std::sync::{Arc, Mutex};

use crate::api::{CourseApi, RegistrationApi, ResultApi, StudentApi};
use crate::config::config_manager::ConfigManager;
use crate::db::{ensure_schema, open_sqlite_connection};
use crate::engine::enrollment_ledger::EnrollmentLedger;
use crate::repository::{
    CourseRepository, ExamResultRepository, RegistrationRepository, StudentRepository,
};

/// 应用状态
///
/// 包含所有API实例和共享资源
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 课程API
    pub course_api: Arc<CourseApi>,

    /// 学生API
    pub student_api: Arc<StudentApi>,

    /// 选课API
    pub registration_api: Arc<RegistrationApi>,

    /// 成绩API
    pub result_api: Arc<ResultApi>,

    /// 选课准入账本
    pub ledger: Arc<EnrollmentLedger>,

    /// 配置管理器
    pub config_manager: Arc<ConfigManager>,
}

impl AppState {
    /// 创建新的AppState实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    ///
    /// # 返回
    /// - Ok(AppState): 初始化成功
    /// - Err(String): 初始化错误
    ///
    /// # 说明
    /// 该方法会：
    /// 1. 打开数据库并建表（幂等）
    /// 2. 初始化所有Repository（共享同一连接）
    /// 3. 创建准入账本（准入策略由配置管理器实时提供）
    /// 4. 创建所有API实例
    pub fn new(db_path: String) -> Result<Self, String> {
        tracing::info!("初始化AppState，数据库路径: {}", db_path);

        let conn = open_sqlite_connection(&db_path)
            .map_err(|e| format!("无法打开数据库: {}", e))?;
        ensure_schema(&conn).map_err(|e| format!("数据库建表失败: {}", e))?;
        let conn = Arc::new(Mutex::new(conn));

        // ==========================================
        // 初始化Repository层
        // ==========================================
        let course_repo = Arc::new(CourseRepository::new(conn.clone()));
        let student_repo = Arc::new(StudentRepository::new(conn.clone()));
        let registration_repo = Arc::new(RegistrationRepository::new(conn.clone()));
        let result_repo = Arc::new(ExamResultRepository::new(conn.clone()));

        let config_manager = Arc::new(
            ConfigManager::from_connection(conn.clone())
                .map_err(|e| format!("无法创建ConfigManager: {}", e))?,
        );

        // ==========================================
        // 初始化Engine层
        // ==========================================
        let ledger = Arc::new(EnrollmentLedger::new(
            registration_repo.clone(),
            course_repo.clone(),
            config_manager.clone(),
        ));

        // ==========================================
        // 初始化API层
        // ==========================================
        let course_api = Arc::new(CourseApi::new(
            course_repo.clone(),
            ledger.clone(),
            config_manager.clone(),
        ));
        let student_api = Arc::new(StudentApi::new(
            student_repo.clone(),
            ledger.clone(),
            config_manager.clone(),
        ));
        let registration_api = Arc::new(RegistrationApi::new(
            ledger.clone(),
            registration_repo,
        ));
        let result_api = Arc::new(ResultApi::new(result_repo, student_repo, course_repo));

        tracing::info!("AppState初始化完成");

        Ok(Self {
            db_path,
            course_api,
            student_api,
            registration_api,
            result_api,
            ledger,
            config_manager,
        })
    }
}

/// 获取默认数据库路径
///
/// 优先级:
/// 1. 环境变量 COURSE_ENROLLMENT_DB
/// 2. <用户数据目录>/course-enrollment/enrollment.db
/// 3. ./enrollment.db
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    if let Ok(path) = std::env::var("COURSE_ENROLLMENT_DB") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./enrollment.db");

    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("course-enrollment");
        match std::fs::create_dir_all(&dir) {
            Ok(()) => path = dir.join("enrollment.db"),
            Err(e) => tracing::warn!("无法创建数据目录 {}: {}, 使用当前目录", dir.display(), e),
        }
    }

    path.to_string_lossy().to_string()
}
