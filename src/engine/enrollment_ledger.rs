// ==========================================
// 高校选课系统 - 选课准入账本
// ==========================================
// 红线: 任一课程的 ENROLLED 人数不得超过容量（并发下同样成立）
// 红线: 同一 (学生, 课程) 至多一条非 DROPPED 记录
// 红线: 名额计数与选课记录要么同时写入,要么都不写入
// ==========================================
// 并发控制:
// 1. 课程级互斥锁 (course_id → Mutex) 作为进程内串行点
// 2. 每次准入/状态变更/删除在单个 IMMEDIATE 事务中完成
// 3. 占座使用条件自增 (enrolled_count < max_students),不做“先查后插”
// ==========================================

use crate::config::ConfigManager;
use crate::db::now_timestamp;
use crate::domain::registration::Registration;
use crate::domain::types::{DeletePolicy, Grade, RegistrationStatus};
use crate::engine::error::{LedgerError, LedgerResult};
use crate::repository::course_repo::CourseRepository;
use crate::repository::error::RepositoryError;
use crate::repository::registration_repo::RegistrationRepository;
use crate::repository::result_repo::ExamResultRepository;
use crate::repository::student_repo::StudentRepository;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

// ==========================================
// DeletionSummary - 删除结果摘要
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletionSummary {
    pub entity: String,
    pub id: String,
    pub registrations_removed: usize,
    pub results_removed: usize,
    pub seats_released: usize,
}

// ==========================================
// SeatAudit - 名额计数核对
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatAudit {
    pub course_id: String,
    pub capacity: Option<i32>,
    pub counter: i64,  // course.enrolled_count
    pub enrolled: i64, // registration 中 ENROLLED 行数
}

impl SeatAudit {
    /// 计数器与实际行数一致
    pub fn is_consistent(&self) -> bool {
        self.counter == self.enrolled
    }
}

fn not_found(entity: &str, id: &str) -> LedgerError {
    LedgerError::NotFound {
        entity: entity.to_string(),
        id: id.to_string(),
    }
}

/// 占座: 条件自增失败时读取当前容量/人数组装错误
fn reserve_seat(conn: &Connection, course_id: &str) -> LedgerResult<()> {
    if CourseRepository::try_reserve_seat_in(conn, course_id)? {
        return Ok(());
    }

    let course = CourseRepository::find_by_id_in(conn, course_id)?
        .ok_or_else(|| not_found("Course", course_id))?;
    Err(LedgerError::CapacityExceeded {
        course_id: course_id.to_string(),
        capacity: course.max_students.unwrap_or(0),
        enrolled: course.enrolled_count,
    })
}

// ==========================================
// EnrollmentLedger - 选课准入账本
// ==========================================
pub struct EnrollmentLedger {
    registration_repo: Arc<RegistrationRepository>,
    course_repo: Arc<CourseRepository>,
    config_manager: Arc<ConfigManager>,
    course_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl EnrollmentLedger {
    /// 创建账本
    ///
    /// # 参数
    /// - registration_repo: 选课记录仓储（提供写事务）
    /// - course_repo: 课程仓储（只读查询）
    /// - config_manager: 配置管理器（准入策略每次调用时读取）
    ///
    /// 三者必须共享同一数据库连接
    pub fn new(
        registration_repo: Arc<RegistrationRepository>,
        course_repo: Arc<CourseRepository>,
        config_manager: Arc<ConfigManager>,
    ) -> Self {
        Self {
            registration_repo,
            course_repo,
            config_manager,
            course_locks: Mutex::new(HashMap::new()),
        }
    }

    /// 退课后是否允许重新选课
    ///
    /// 读取 registration.readmit_after_drop 的当前值。
    /// 必须在课程锁与写事务之外调用（会获取连接锁）。
    pub fn readmit_after_drop(&self) -> LedgerResult<bool> {
        self.config_manager
            .get_readmit_after_drop()
            .map_err(|e| LedgerError::ConfigError(e.to_string()))
    }

    /// 获取课程级互斥锁（不存在则创建）
    fn course_lock(&self, course_id: &str) -> LedgerResult<Arc<Mutex<()>>> {
        let mut locks = self
            .course_locks
            .lock()
            .map_err(|e| LedgerError::LockError(e.to_string()))?;
        Ok(locks
            .entry(course_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone())
    }

    fn forget_course_lock(&self, course_id: &str) {
        if let Ok(mut locks) = self.course_locks.lock() {
            locks.remove(course_id);
        }
    }

    // ==========================================
    // 准入
    // ==========================================

    /// 准入: 为学生分配课程名额
    ///
    /// 判定顺序:
    /// 1. 学生/课程不存在 → NotFound
    /// 2. 已有非 DROPPED 记录 → AlreadyRegistered
    /// 3. 容量已满 → CapacityExceeded
    /// 4. 新建 ENROLLED 记录 + 计数 +1（同一事务）
    ///
    /// 2~4 在课程锁 + 写事务内完成,对同一课程的其他准入/状态变更可线性化
    #[instrument(skip(self))]
    pub fn admit(&self, student_id: &str, course_id: &str) -> LedgerResult<Registration> {
        let readmit_allowed = self.readmit_after_drop()?;

        let course_lock = self.course_lock(course_id)?;
        let _serial = course_lock
            .lock()
            .map_err(|e| LedgerError::LockError(e.to_string()))?;

        let outcome = self.registration_repo.with_write_tx(|tx| {
            if StudentRepository::find_by_id_in(tx, student_id)?.is_none() {
                return Err(not_found("Student", student_id));
            }
            if CourseRepository::find_by_id_in(tx, course_id)?.is_none() {
                return Err(not_found("Course", course_id));
            }

            if let Some(existing) =
                RegistrationRepository::find_active_by_pair_in(tx, student_id, course_id)?
            {
                return Err(LedgerError::AlreadyRegistered {
                    student_id: student_id.to_string(),
                    course_id: course_id.to_string(),
                    status: existing.status.to_string(),
                });
            }

            if !readmit_allowed
                && RegistrationRepository::has_dropped_for_pair_in(tx, student_id, course_id)?
            {
                return Err(LedgerError::ReadmissionDisabled {
                    student_id: student_id.to_string(),
                    course_id: course_id.to_string(),
                });
            }

            reserve_seat(tx, course_id)?;

            let now = now_timestamp();
            let registration = Registration {
                registration_id: Uuid::new_v4().to_string(),
                student_id: student_id.to_string(),
                course_id: course_id.to_string(),
                status: RegistrationStatus::Enrolled,
                grade: None,
                registered_at: now,
                updated_at: now,
            };
            RegistrationRepository::insert_in(tx, &registration).map_err(|e| match e {
                RepositoryError::UniqueConstraintViolation(_) => LedgerError::AlreadyRegistered {
                    student_id: student_id.to_string(),
                    course_id: course_id.to_string(),
                    status: RegistrationStatus::Enrolled.to_string(),
                },
                other => LedgerError::Repository(other),
            })?;

            Ok(registration)
        });

        match &outcome {
            Ok(reg) => info!(registration_id = %reg.registration_id, "准入成功"),
            Err(e) => debug!(error = %e, "准入被拒绝"),
        }
        outcome
    }

    // ==========================================
    // 状态变更
    // ==========================================

    /// 变更选课状态
    ///
    /// - 离开 ENROLLED: 计数 -1（恰好一次）
    /// - 进入 ENROLLED (仅 DROPPED → ENROLLED): 按重新准入处理,校验策略、唯一性与容量后计数 +1
    /// - COMPLETED 为终态
    /// - grade 为 None 时保留原有最终成绩
    #[instrument(skip(self))]
    pub fn update_status(
        &self,
        registration_id: &str,
        new_status: RegistrationStatus,
        grade: Option<Grade>,
    ) -> LedgerResult<Registration> {
        let course_id = self
            .registration_repo
            .find_by_id(registration_id)?
            .ok_or_else(|| not_found("Registration", registration_id))?
            .course_id;
        let readmit_allowed = if new_status.holds_seat() {
            self.readmit_after_drop()?
        } else {
            true
        };

        let course_lock = self.course_lock(&course_id)?;
        let _serial = course_lock
            .lock()
            .map_err(|e| LedgerError::LockError(e.to_string()))?;

        let updated = self.registration_repo.with_write_tx(|tx| {
            // 加锁后重新读取,期间记录可能已被删除
            let current = RegistrationRepository::find_by_id_in(tx, registration_id)?
                .ok_or_else(|| not_found("Registration", registration_id))?;

            if !current.status.can_transition_to(new_status) {
                return Err(LedgerError::InvalidStateTransition {
                    from: current.status.to_string(),
                    to: new_status.to_string(),
                });
            }

            match (current.status.holds_seat(), new_status.holds_seat()) {
                (true, false) => {
                    CourseRepository::release_seat_in(tx, &current.course_id)?;
                }
                (false, true) => {
                    if !readmit_allowed {
                        return Err(LedgerError::ReadmissionDisabled {
                            student_id: current.student_id.clone(),
                            course_id: current.course_id.clone(),
                        });
                    }
                    if let Some(other) = RegistrationRepository::find_active_by_pair_in(
                        tx,
                        &current.student_id,
                        &current.course_id,
                    )? {
                        return Err(LedgerError::AlreadyRegistered {
                            student_id: current.student_id.clone(),
                            course_id: current.course_id.clone(),
                            status: other.status.to_string(),
                        });
                    }
                    reserve_seat(tx, &current.course_id)?;
                }
                _ => {}
            }

            let updated = Registration {
                status: new_status,
                grade: grade.or(current.grade),
                updated_at: now_timestamp(),
                ..current
            };
            RegistrationRepository::update_status_in(
                tx,
                &updated.registration_id,
                updated.status,
                updated.grade,
                &updated.updated_at,
            )?;
            Ok(updated)
        })?;

        info!(
            registration_id = %updated.registration_id,
            status = %updated.status,
            "选课状态已变更"
        );
        Ok(updated)
    }

    // ==========================================
    // 删除
    // ==========================================

    /// 删除选课记录; ENROLLED 记录同时释放名额
    #[instrument(skip(self))]
    pub fn remove(&self, registration_id: &str) -> LedgerResult<Registration> {
        let course_id = self
            .registration_repo
            .find_by_id(registration_id)?
            .ok_or_else(|| not_found("Registration", registration_id))?
            .course_id;

        let course_lock = self.course_lock(&course_id)?;
        let _serial = course_lock
            .lock()
            .map_err(|e| LedgerError::LockError(e.to_string()))?;

        let removed = self.registration_repo.with_write_tx(|tx| {
            let current = RegistrationRepository::find_by_id_in(tx, registration_id)?
                .ok_or_else(|| not_found("Registration", registration_id))?;

            RegistrationRepository::delete_in(tx, registration_id)?;
            if current.status.holds_seat() {
                CourseRepository::release_seat_in(tx, &current.course_id)?;
            }
            Ok::<_, LedgerError>(current)
        })?;

        info!(registration_id = %removed.registration_id, "选课记录已删除");
        Ok(removed)
    }

    /// 按删除策略删除课程
    ///
    /// - BLOCK: 存在任何选课记录或成绩时拒绝
    /// - CASCADE: 同一事务内删除该课程的成绩、选课记录与课程本身
    #[instrument(skip(self))]
    pub fn remove_course(
        &self,
        course_id: &str,
        policy: DeletePolicy,
    ) -> LedgerResult<DeletionSummary> {
        let course_lock = self.course_lock(course_id)?;
        let _serial = course_lock
            .lock()
            .map_err(|e| LedgerError::LockError(e.to_string()))?;

        let summary = self.registration_repo.with_write_tx(|tx| {
            let course = CourseRepository::find_by_id_in(tx, course_id)?
                .ok_or_else(|| not_found("Course", course_id))?;

            let registrations = RegistrationRepository::find_by_course_in(tx, course_id)?;
            let result_count = ExamResultRepository::count_by_course_in(tx, course_id)?;

            if policy == DeletePolicy::Block && (!registrations.is_empty() || result_count > 0) {
                return Err(LedgerError::ReferencesExist {
                    entity: "Course".to_string(),
                    id: course_id.to_string(),
                    registrations: registrations.len(),
                    results: result_count,
                });
            }

            let results_removed = ExamResultRepository::delete_by_course_in(tx, course_id)?;
            let registrations_removed = RegistrationRepository::delete_by_course_in(tx, course_id)?;
            CourseRepository::delete_in(tx, course_id)?;

            Ok(DeletionSummary {
                entity: "Course".to_string(),
                id: course_id.to_string(),
                registrations_removed,
                results_removed,
                seats_released: usize::try_from(course.enrolled_count).unwrap_or(0),
            })
        })?;

        drop(_serial);
        self.forget_course_lock(course_id);

        warn!(
            course_id,
            registrations = summary.registrations_removed,
            results = summary.results_removed,
            "课程已删除"
        );
        Ok(summary)
    }

    /// 按删除策略删除学生
    ///
    /// CASCADE 时释放该学生全部 ENROLLED 记录占用的名额。
    /// 按 course_id 升序获取所涉课程的锁,避免死锁。
    #[instrument(skip(self))]
    pub fn remove_student(
        &self,
        student_id: &str,
        policy: DeletePolicy,
    ) -> LedgerResult<DeletionSummary> {
        let course_ids: BTreeSet<String> = self
            .registration_repo
            .find_by_student(student_id)?
            .into_iter()
            .map(|r| r.course_id)
            .collect();

        let course_locks = course_ids
            .iter()
            .map(|id| self.course_lock(id))
            .collect::<LedgerResult<Vec<_>>>()?;
        let _serials = course_locks
            .iter()
            .map(|l| l.lock().map_err(|e| LedgerError::LockError(e.to_string())))
            .collect::<LedgerResult<Vec<_>>>()?;

        let summary = self.registration_repo.with_write_tx(|tx| {
            if StudentRepository::find_by_id_in(tx, student_id)?.is_none() {
                return Err(not_found("Student", student_id));
            }

            let registrations = RegistrationRepository::find_by_student_in(tx, student_id)?;
            let result_count = ExamResultRepository::count_by_student_in(tx, student_id)?;

            if policy == DeletePolicy::Block && (!registrations.is_empty() || result_count > 0) {
                return Err(LedgerError::ReferencesExist {
                    entity: "Student".to_string(),
                    id: student_id.to_string(),
                    registrations: registrations.len(),
                    results: result_count,
                });
            }

            let mut seats_released = 0;
            for reg in registrations.iter().filter(|r| r.is_enrolled()) {
                CourseRepository::release_seat_in(tx, &reg.course_id)?;
                seats_released += 1;
            }

            let results_removed = ExamResultRepository::delete_by_student_in(tx, student_id)?;
            let registrations_removed =
                RegistrationRepository::delete_by_student_in(tx, student_id)?;
            StudentRepository::delete_in(tx, student_id)?;

            Ok(DeletionSummary {
                entity: "Student".to_string(),
                id: student_id.to_string(),
                registrations_removed,
                results_removed,
                seats_released,
            })
        })?;

        warn!(
            student_id,
            registrations = summary.registrations_removed,
            results = summary.results_removed,
            seats_released = summary.seats_released,
            "学生已删除"
        );
        Ok(summary)
    }

    // ==========================================
    // 查询
    // ==========================================

    /// 课程当前 ENROLLED 人数（读计数器）
    pub fn enrolled_count(&self, course_id: &str) -> LedgerResult<i32> {
        let course = self
            .course_repo
            .find_by_id(course_id)?
            .ok_or_else(|| not_found("Course", course_id))?;
        Ok(course.enrolled_count)
    }

    /// 核对计数器与 ENROLLED 行数
    pub fn audit_seats(&self, course_id: &str) -> LedgerResult<SeatAudit> {
        let course = self
            .course_repo
            .find_by_id(course_id)?
            .ok_or_else(|| not_found("Course", course_id))?;
        let enrolled = self.registration_repo.count_enrolled(course_id)?;

        Ok(SeatAudit {
            course_id: course_id.to_string(),
            capacity: course.max_students,
            counter: i64::from(course.enrolled_count),
            enrolled,
        })
    }
}
