// ==========================================
// 高校选课系统 - 主入口
// ==========================================
// 职责: 初始化日志与数据库,组装 AppState,输出目录概况
// 说明: HTTP/认证等请求处理层由外部组件持有 AppState 接入
// ==========================================

use anyhow::{anyhow, Context, Result};
use course_enrollment::app::{get_default_db_path, AppState};
use course_enrollment::domain::SeatCapacity;
use course_enrollment::logging;

fn main() -> Result<()> {
    logging::init();

    tracing::info!("==================================================");
    tracing::info!("{}", course_enrollment::APP_NAME);
    tracing::info!("系统版本: {}", course_enrollment::VERSION);
    tracing::info!("==================================================");

    // 命令行第一个参数可覆盖数据库路径
    let db_path = std::env::args().nth(1).unwrap_or_else(get_default_db_path);
    tracing::info!("使用数据库: {}", db_path);

    let state = AppState::new(db_path).map_err(|e| anyhow!(e))?;

    let config = state
        .config_manager
        .get_config_snapshot()
        .map_err(|e| anyhow!(e.to_string()))
        .context("读取配置快照失败")?;
    tracing::info!("当前配置: {}", config);

    let courses = state.course_api.list_courses()?;
    let students = state.student_api.list_students()?;
    let available = courses.iter().filter(|c| c.can_admit()).count();
    tracing::info!(
        courses = courses.len(),
        available,
        students = students.len(),
        "目录概况"
    );

    for course in &courses {
        let audit = state.ledger.audit_seats(&course.course_id)?;
        if !audit.is_consistent() {
            tracing::warn!(
                course_id = %audit.course_id,
                counter = audit.counter,
                enrolled = audit.enrolled,
                "名额计数与选课记录不一致"
            );
        }
    }

    Ok(())
}
