// ==========================================
// 选课准入账本集成测试
// ==========================================
// 测试范围: 准入判定 → 状态机 → 名额计数 → 删除
// ==========================================


use course_enrollment::api::{ApiError, OutcomeCode};
use course_enrollment::config::config_keys;
use course_enrollment::domain::{Grade, RegistrationStatus};
use test_helpers::{create_course, create_student, setup_state};

// ==========================================
// 准入
// ==========================================

#[test]
fn test_admit_creates_enrolled_registration() {
    let (_tmp, state) = setup_state();
    let course = create_course(&state, "CS101", Some(30));
    let student = create_student(&state, "S001");

    let reg = state
        .registration_api
        .admit_registration(&student.student_id, &course.course_id)
        .unwrap();

    assert_eq!(reg.status, RegistrationStatus::Enrolled);
    assert_eq!(reg.grade, None);
    assert_eq!(reg.student_id, student.student_id);
    assert_eq!(
        state
            .registration_api
            .enrolled_count(&course.course_id)
            .unwrap(),
        1
    );

    let fetched = state
        .registration_api
        .get_registration(&reg.registration_id)
        .unwrap();
    assert_eq!(fetched, reg);
}

#[test]
fn test_admit_twice_is_already_registered() {
    let (_tmp, state) = setup_state();
    let course = create_course(&state, "CS101", None);
    let student = create_student(&state, "S001");

    state
        .registration_api
        .admit_registration(&student.student_id, &course.course_id)
        .unwrap();
    let err = state
        .registration_api
        .admit_registration(&student.student_id, &course.course_id)
        .unwrap_err();

    assert!(matches!(err, ApiError::AlreadyRegistered(_)));
    assert_eq!(err.outcome(), OutcomeCode::Conflict);
    assert_eq!(
        state
            .registration_api
            .enrolled_count(&course.course_id)
            .unwrap(),
        1
    );
}

#[test]
fn test_admit_unknown_reference_is_bad_request() {
    let (_tmp, state) = setup_state();
    let course = create_course(&state, "CS101", None);
    let student = create_student(&state, "S001");

    let err = state
        .registration_api
        .admit_registration("no-such-student", &course.course_id)
        .unwrap_err();
    assert!(matches!(err, ApiError::UnknownReference(_)));
    assert_eq!(err.outcome(), OutcomeCode::BadRequest);

    let err = state
        .registration_api
        .admit_registration(&student.student_id, "no-such-course")
        .unwrap_err();
    assert_eq!(err.outcome(), OutcomeCode::BadRequest);

    let err = state
        .registration_api
        .admit_registration("", &course.course_id)
        .unwrap_err();
    assert!(matches!(err, ApiError::InvalidInput(_)));
}

#[test]
fn test_zero_capacity_course_admits_nobody() {
    let (_tmp, state) = setup_state();
    let course = create_course(&state, "CS000", Some(0));
    let student = create_student(&state, "S001");

    let err = state
        .registration_api
        .admit_registration(&student.student_id, &course.course_id)
        .unwrap_err();
    assert!(matches!(err, ApiError::CapacityExceeded(_)));
}

// ==========================================
// 容量=1 场景: s1 选课 → s2 被拒 → s1 退课 → s2 选课
// ==========================================

#[test]
fn test_capacity_one_drop_frees_seat() {
    let (_tmp, state) = setup_state();
    let course = create_course(&state, "CS101", Some(1));
    let s1 = create_student(&state, "S001");
    let s2 = create_student(&state, "S002");
    let api = &state.registration_api;

    let r1 = api
        .admit_registration(&s1.student_id, &course.course_id)
        .unwrap();
    assert_eq!(r1.status, RegistrationStatus::Enrolled);
    assert_eq!(api.enrolled_count(&course.course_id).unwrap(), 1);

    let err = api
        .admit_registration(&s2.student_id, &course.course_id)
        .unwrap_err();
    assert!(matches!(err, ApiError::CapacityExceeded(_)));
    assert_eq!(err.outcome(), OutcomeCode::Conflict);

    let dropped = api.drop_registration(&r1.registration_id).unwrap();
    assert_eq!(dropped.status, RegistrationStatus::Dropped);
    assert_eq!(api.enrolled_count(&course.course_id).unwrap(), 0);

    let r2 = api
        .admit_registration(&s2.student_id, &course.course_id)
        .unwrap();
    assert_eq!(r2.status, RegistrationStatus::Enrolled);
    assert_eq!(api.enrolled_count(&course.course_id).unwrap(), 1);

    assert!(state
        .ledger
        .audit_seats(&course.course_id)
        .unwrap()
        .is_consistent());
}

#[test]
fn test_readmit_after_drop_creates_new_row() {
    let (_tmp, state) = setup_state();
    let course = create_course(&state, "CS101", Some(5));
    let student = create_student(&state, "S001");
    let api = &state.registration_api;

    let first = api
        .admit_registration(&student.student_id, &course.course_id)
        .unwrap();
    api.drop_registration(&first.registration_id).unwrap();

    let second = api
        .admit_registration(&student.student_id, &course.course_id)
        .unwrap();
    assert_ne!(first.registration_id, second.registration_id);

    let history = api
        .list_registrations(Some(&student.student_id), Some(&course.course_id))
        .unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history.iter().filter(|r| r.is_dropped()).count(), 1);
    assert_eq!(history.iter().filter(|r| r.is_enrolled()).count(), 1);
    assert_eq!(api.enrolled_count(&course.course_id).unwrap(), 1);
}

#[test]
fn test_readmit_after_drop_disabled_by_config() {
    let (_tmp, state) = setup_state();
    let course = create_course(&state, "CS101", None);
    let student = create_student(&state, "S001");
    let api = &state.registration_api;

    let reg = api
        .admit_registration(&student.student_id, &course.course_id)
        .unwrap();
    api.drop_registration(&reg.registration_id).unwrap();

    // 运行中修改配置,立即生效
    state
        .config_manager
        .set_global_value(config_keys::READMIT_AFTER_DROP, "false")
        .unwrap();
    assert!(!state.ledger.readmit_after_drop().unwrap());

    let err = api
        .admit_registration(&student.student_id, &course.course_id)
        .unwrap_err();
    assert!(matches!(err, ApiError::AlreadyRegistered(_)));

    let err = api
        .update_registration_status(&reg.registration_id, RegistrationStatus::Enrolled, None)
        .unwrap_err();
    assert!(matches!(err, ApiError::AlreadyRegistered(_)));
    assert_eq!(api.enrolled_count(&course.course_id).unwrap(), 0);

    // 恢复后可再次选课
    state
        .config_manager
        .set_global_value(config_keys::READMIT_AFTER_DROP, "true")
        .unwrap();
    let again = api
        .admit_registration(&student.student_id, &course.course_id)
        .unwrap();
    assert_eq!(again.status, RegistrationStatus::Enrolled);
    assert_eq!(api.enrolled_count(&course.course_id).unwrap(), 1);
}

// ==========================================
// 状态机
// ==========================================

#[test]
fn test_completed_is_terminal() {
    let (_tmp, state) = setup_state();
    let course = create_course(&state, "CS101", Some(2));
    let student = create_student(&state, "S001");
    let api = &state.registration_api;

    let reg = api
        .admit_registration(&student.student_id, &course.course_id)
        .unwrap();
    let completed = api
        .complete_registration(&reg.registration_id, Grade::A)
        .unwrap();
    assert_eq!(completed.status, RegistrationStatus::Completed);
    assert_eq!(completed.grade, Some(Grade::A));
    // 结课释放名额
    assert_eq!(api.enrolled_count(&course.course_id).unwrap(), 0);

    for next in [
        RegistrationStatus::Enrolled,
        RegistrationStatus::Dropped,
        RegistrationStatus::Completed,
    ] {
        let err = api
            .update_registration_status(&reg.registration_id, next, None)
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidStateTransition { .. }));
        assert_eq!(err.outcome(), OutcomeCode::Conflict);
    }

    // COMPLETED 仍是有效记录,不能再次选同一课程
    let err = api
        .admit_registration(&student.student_id, &course.course_id)
        .unwrap_err();
    assert!(matches!(err, ApiError::AlreadyRegistered(_)));
}

#[test]
fn test_dropped_to_enrolled_rechecks_capacity() {
    let (_tmp, state) = setup_state();
    let course = create_course(&state, "CS101", Some(1));
    let s1 = create_student(&state, "S001");
    let s2 = create_student(&state, "S002");
    let api = &state.registration_api;

    let r1 = api
        .admit_registration(&s1.student_id, &course.course_id)
        .unwrap();
    api.drop_registration(&r1.registration_id).unwrap();
    api.admit_registration(&s2.student_id, &course.course_id)
        .unwrap();

    let err = api
        .update_registration_status(&r1.registration_id, RegistrationStatus::Enrolled, None)
        .unwrap_err();
    assert!(matches!(err, ApiError::CapacityExceeded(_)));

    // 失败的转换不改变任何状态
    let r1_after = api.get_registration(&r1.registration_id).unwrap();
    assert_eq!(r1_after.status, RegistrationStatus::Dropped);
    assert_eq!(api.enrolled_count(&course.course_id).unwrap(), 1);
}

#[test]
fn test_dropped_to_enrolled_rechecks_uniqueness() {
    let (_tmp, state) = setup_state();
    let course = create_course(&state, "CS101", None);
    let student = create_student(&state, "S001");
    let api = &state.registration_api;

    let old = api
        .admit_registration(&student.student_id, &course.course_id)
        .unwrap();
    api.drop_registration(&old.registration_id).unwrap();
    api.admit_registration(&student.student_id, &course.course_id)
        .unwrap();

    let err = api
        .update_registration_status(&old.registration_id, RegistrationStatus::Enrolled, None)
        .unwrap_err();
    assert!(matches!(err, ApiError::AlreadyRegistered(_)));
    assert_eq!(api.enrolled_count(&course.course_id).unwrap(), 1);
}

#[test]
fn test_dropped_to_enrolled_reclaims_seat() {
    let (_tmp, state) = setup_state();
    let course = create_course(&state, "CS101", Some(1));
    let student = create_student(&state, "S001");
    let api = &state.registration_api;

    let reg = api
        .admit_registration(&student.student_id, &course.course_id)
        .unwrap();
    api.drop_registration(&reg.registration_id).unwrap();

    let back = api
        .update_registration_status(&reg.registration_id, RegistrationStatus::Enrolled, None)
        .unwrap();
    assert_eq!(back.status, RegistrationStatus::Enrolled);
    assert_eq!(api.enrolled_count(&course.course_id).unwrap(), 1);
}

#[test]
fn test_dropped_cannot_complete() {
    let (_tmp, state) = setup_state();
    let course = create_course(&state, "CS101", None);
    let student = create_student(&state, "S001");
    let api = &state.registration_api;

    let reg = api
        .admit_registration(&student.student_id, &course.course_id)
        .unwrap();
    api.drop_registration(&reg.registration_id).unwrap();

    let err = api
        .complete_registration(&reg.registration_id, Grade::B)
        .unwrap_err();
    assert!(matches!(err, ApiError::InvalidStateTransition { .. }));
}

#[test]
fn test_grade_update_keeps_status_and_seat() {
    let (_tmp, state) = setup_state();
    let course = create_course(&state, "CS101", Some(1));
    let student = create_student(&state, "S001");
    let api = &state.registration_api;

    let reg = api
        .admit_registration(&student.student_id, &course.course_id)
        .unwrap();
    let updated = api
        .update_registration_status(
            &reg.registration_id,
            RegistrationStatus::Enrolled,
            Some(Grade::BPlus),
        )
        .unwrap();
    assert_eq!(updated.grade, Some(Grade::BPlus));
    assert_eq!(api.enrolled_count(&course.course_id).unwrap(), 1);

    // grade 为 None 时保留原成绩
    let dropped = api.drop_registration(&reg.registration_id).unwrap();
    assert_eq!(dropped.grade, Some(Grade::BPlus));
}

#[test]
fn test_update_unknown_registration_is_not_found() {
    let (_tmp, state) = setup_state();
    let err = state
        .registration_api
        .update_registration_status("missing", RegistrationStatus::Dropped, None)
        .unwrap_err();
    assert_eq!(err.outcome(), OutcomeCode::NotFound);

    let err = state
        .registration_api
        .remove_registration("missing")
        .unwrap_err();
    assert_eq!(err.outcome(), OutcomeCode::NotFound);
}

// ==========================================
// 删除
// ==========================================

#[test]
fn test_remove_enrolled_registration_releases_seat() {
    let (_tmp, state) = setup_state();
    let course = create_course(&state, "CS101", Some(1));
    let s1 = create_student(&state, "S001");
    let s2 = create_student(&state, "S002");
    let api = &state.registration_api;

    let r1 = api
        .admit_registration(&s1.student_id, &course.course_id)
        .unwrap();
    api.remove_registration(&r1.registration_id).unwrap();
    assert_eq!(api.enrolled_count(&course.course_id).unwrap(), 0);
    assert!(api.list_registrations(None, None).unwrap().is_empty());

    api.admit_registration(&s2.student_id, &course.course_id)
        .unwrap();
    assert_eq!(api.enrolled_count(&course.course_id).unwrap(), 1);
}

#[test]
fn test_remove_dropped_registration_keeps_count() {
    let (_tmp, state) = setup_state();
    let course = create_course(&state, "CS101", None);
    let s1 = create_student(&state, "S001");
    let s2 = create_student(&state, "S002");
    let api = &state.registration_api;

    let r1 = api
        .admit_registration(&s1.student_id, &course.course_id)
        .unwrap();
    api.admit_registration(&s2.student_id, &course.course_id)
        .unwrap();
    api.drop_registration(&r1.registration_id).unwrap();
    assert_eq!(api.enrolled_count(&course.course_id).unwrap(), 1);

    api.remove_registration(&r1.registration_id).unwrap();
    assert_eq!(api.enrolled_count(&course.course_id).unwrap(), 1);
    assert!(state
        .ledger
        .audit_seats(&course.course_id)
        .unwrap()
        .is_consistent());
}

// ==========================================
// 查询
// ==========================================

#[test]
fn test_list_registrations_filters() {
    let (_tmp, state) = setup_state();
    let c1 = create_course(&state, "CS101", None);
    let c2 = create_course(&state, "CS102", None);
    let s1 = create_student(&state, "S001");
    let s2 = create_student(&state, "S002");
    let api = &state.registration_api;

    api.admit_registration(&s1.student_id, &c1.course_id).unwrap();
    let r = api.admit_registration(&s1.student_id, &c2.course_id).unwrap();
    api.admit_registration(&s2.student_id, &c1.course_id).unwrap();
    api.drop_registration(&r.registration_id).unwrap();

    assert_eq!(api.list_registrations(None, None).unwrap().len(), 3);
    assert_eq!(
        api.list_registrations(Some(&s1.student_id), None)
            .unwrap()
            .len(),
        2
    );
    assert_eq!(
        api.list_registrations(None, Some(&c1.course_id))
            .unwrap()
            .len(),
        2
    );

    let enrolled = api
        .list_by_student_and_status(&s1.student_id, RegistrationStatus::Enrolled)
        .unwrap();
    assert_eq!(enrolled.len(), 1);
    assert_eq!(enrolled[0].course_id, c1.course_id);

    let dropped = api
        .list_by_student_and_status(&s1.student_id, RegistrationStatus::Dropped)
        .unwrap();
    assert_eq!(dropped.len(), 1);
    assert_eq!(dropped[0].course_id, c2.course_id);
}
