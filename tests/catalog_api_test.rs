// ==========================================
// 课程/学生目录 API 集成测试
// ==========================================
// 测试范围: 创建/更新/查询校验 → 删除策略 (BLOCK / CASCADE)
// ==========================================


use course_enrollment::api::{ApiError, OutcomeCode};
use course_enrollment::config::config_keys;
use course_enrollment::domain::{DeletePolicy, ExamType, NewCourse, NewStudent};
use test_helpers::{create_course, create_student, setup_state};

fn course_input(code: &str, max_students: Option<i32>) -> NewCourse {
    NewCourse {
        code: code.to_string(),
        title: "Data Structures".to_string(),
        description: Some("Lists, trees, graphs".to_string()),
        credits: 4,
        instructor: Some("Prof. Ada Lovelace".to_string()),
        max_students,
    }
}

// ==========================================
// 课程
// ==========================================

#[test]
fn test_create_course_validation() {
    let (_tmp, state) = setup_state();
    let api = &state.course_api;

    let mut input = course_input("", None);
    assert!(matches!(
        api.create_course(input.clone()).unwrap_err(),
        ApiError::ValidationError(_)
    ));

    input.code = "CS201".to_string();
    input.credits = 0;
    assert!(matches!(
        api.create_course(input.clone()).unwrap_err(),
        ApiError::ValidationError(_)
    ));

    input.credits = 4;
    input.max_students = Some(-1);
    let err = api.create_course(input.clone()).unwrap_err();
    assert_eq!(err.outcome(), OutcomeCode::BadRequest);

    input.max_students = Some(40);
    let course = api.create_course(input.clone()).unwrap();
    assert_eq!(course.enrolled_count, 0);

    // 课程代码唯一
    let err = api.create_course(input).unwrap_err();
    assert!(matches!(err, ApiError::Duplicate(_)));
    assert_eq!(err.outcome(), OutcomeCode::Conflict);
}

#[test]
fn test_course_lookup_and_search() {
    let (_tmp, state) = setup_state();
    let api = &state.course_api;

    let ds = api.create_course(course_input("CS201", Some(40))).unwrap();
    api.create_course(NewCourse {
        title: "Operating Systems".to_string(),
        instructor: Some("Dr. Dijkstra".to_string()),
        ..course_input("CS301", None)
    })
    .unwrap();

    assert_eq!(api.get_course(&ds.course_id).unwrap(), ds);
    assert_eq!(api.get_course_by_code("CS201").unwrap().course_id, ds.course_id);
    assert_eq!(
        api.get_course_by_code("XX999").unwrap_err().outcome(),
        OutcomeCode::NotFound
    );

    let all = api.list_courses().unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].code, "CS201");

    assert_eq!(api.search_by_title("data").unwrap().len(), 1);
    assert_eq!(api.search_by_title("SYSTEMS").unwrap()[0].code, "CS301");
    assert_eq!(api.search_by_instructor("lovelace").unwrap().len(), 1);
    assert!(api.search_by_instructor("turing").unwrap().is_empty());
}

#[test]
fn test_available_courses_count_only_enrolled() {
    let (_tmp, state) = setup_state();
    let full = create_course(&state, "CS101", Some(1));
    let freed = create_course(&state, "CS102", Some(1));
    let open = create_course(&state, "CS103", None);
    let s1 = create_student(&state, "S001");
    let s2 = create_student(&state, "S002");

    let reg_api = &state.registration_api;
    reg_api
        .admit_registration(&s1.student_id, &full.course_id)
        .unwrap();
    let r = reg_api
        .admit_registration(&s2.student_id, &freed.course_id)
        .unwrap();
    reg_api.drop_registration(&r.registration_id).unwrap();

    let codes: Vec<String> = state
        .course_api
        .list_available_courses()
        .unwrap()
        .into_iter()
        .map(|c| c.code)
        .collect();
    assert_eq!(codes, vec![freed.code.clone(), open.code.clone()]);
    assert!(!codes.contains(&full.code));
}

#[test]
fn test_lowering_capacity_keeps_enrolled_students() {
    let (_tmp, state) = setup_state();
    let course = create_course(&state, "CS101", Some(3));
    let s1 = create_student(&state, "S001");
    let s2 = create_student(&state, "S002");
    let s3 = create_student(&state, "S003");
    let reg_api = &state.registration_api;

    let r1 = reg_api
        .admit_registration(&s1.student_id, &course.course_id)
        .unwrap();
    reg_api
        .admit_registration(&s2.student_id, &course.course_id)
        .unwrap();

    let updated = state
        .course_api
        .update_course(&course.course_id, course_input("CS101", Some(1)))
        .unwrap();
    assert_eq!(updated.max_students, Some(1));
    assert_eq!(updated.enrolled_count, 2);
    assert_eq!(updated.created_at, course.created_at);

    let err = reg_api
        .admit_registration(&s3.student_id, &course.course_id)
        .unwrap_err();
    assert!(matches!(err, ApiError::CapacityExceeded(_)));

    // 退一人后恰好满员,依然拒绝
    reg_api.drop_registration(&r1.registration_id).unwrap();
    assert!(reg_api
        .admit_registration(&s3.student_id, &course.course_id)
        .is_err());
    assert_eq!(reg_api.enrolled_count(&course.course_id).unwrap(), 1);
}

#[test]
fn test_update_course_rejects_duplicate_code() {
    let (_tmp, state) = setup_state();
    create_course(&state, "CS101", None);
    let other = create_course(&state, "CS102", None);

    let err = state
        .course_api
        .update_course(&other.course_id, course_input("CS101", None))
        .unwrap_err();
    assert!(matches!(err, ApiError::Duplicate(_)));

    let err = state
        .course_api
        .update_course("missing", course_input("CS103", None))
        .unwrap_err();
    assert_eq!(err.outcome(), OutcomeCode::NotFound);
}

// ==========================================
// 学生
// ==========================================

#[test]
fn test_student_create_update_and_search() {
    let (_tmp, state) = setup_state();
    let api = &state.student_api;

    let grace = api
        .create_student(NewStudent {
            student_code: "2026001".to_string(),
            first_name: "Grace".to_string(),
            last_name: "Hopper".to_string(),
            email: Some("grace@example.edu".to_string()),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(grace.full_name(), "Grace Hopper");

    let err = api
        .create_student(NewStudent {
            student_code: "2026001".to_string(),
            first_name: "Another".to_string(),
            last_name: "Person".to_string(),
            ..Default::default()
        })
        .unwrap_err();
    assert!(matches!(err, ApiError::Duplicate(_)));

    let err = api
        .create_student(NewStudent {
            student_code: "2026002".to_string(),
            first_name: "Alan".to_string(),
            last_name: "Turing".to_string(),
            email: Some("grace@example.edu".to_string()),
            ..Default::default()
        })
        .unwrap_err();
    assert!(matches!(err, ApiError::Duplicate(_)));

    let err = api
        .create_student(NewStudent {
            student_code: "2026003".to_string(),
            first_name: "".to_string(),
            last_name: "Nobody".to_string(),
            ..Default::default()
        })
        .unwrap_err();
    assert!(matches!(err, ApiError::ValidationError(_)));

    // 空白邮箱视为未填写,不触发唯一约束
    for code in ["2026004", "2026005"] {
        api.create_student(NewStudent {
            student_code: code.to_string(),
            first_name: "Blank".to_string(),
            last_name: "Email".to_string(),
            email: Some("  ".to_string()),
            ..Default::default()
        })
        .unwrap();
    }

    let updated = api
        .update_student(
            &grace.student_id,
            NewStudent {
                student_code: "2026001".to_string(),
                first_name: "Grace".to_string(),
                last_name: "Brewster Hopper".to_string(),
                email: Some("grace@example.edu".to_string()),
                phone: Some("555-0100".to_string()),
                date_of_birth: chrono::NaiveDate::from_ymd_opt(1906, 12, 9),
            },
        )
        .unwrap();
    assert_eq!(
        api.get_student(&grace.student_id).unwrap().date_of_birth,
        updated.date_of_birth
    );
    assert_eq!(
        api.get_student_by_code("2026001").unwrap().last_name,
        "Brewster Hopper"
    );

    assert_eq!(api.search_by_name("grace brew").unwrap().len(), 1);
    assert_eq!(api.search_by_name("email").unwrap().len(), 2);
    assert_eq!(api.list_students().unwrap().len(), 3);
}

// ==========================================
// 删除策略
// ==========================================

#[test]
fn test_delete_course_blocked_by_default() {
    let (_tmp, state) = setup_state();
    let course = create_course(&state, "CS101", None);
    let student = create_student(&state, "S001");
    state
        .registration_api
        .admit_registration(&student.student_id, &course.course_id)
        .unwrap();

    let err = state.course_api.delete_course(&course.course_id).unwrap_err();
    assert!(matches!(err, ApiError::ReferentialIntegrity(_)));
    assert_eq!(err.outcome(), OutcomeCode::Conflict);
    assert!(state.course_api.get_course(&course.course_id).is_ok());

    // 无引用的课程可直接删除
    let unused = create_course(&state, "CS999", None);
    let summary = state.course_api.delete_course(&unused.course_id).unwrap();
    assert_eq!(summary.registrations_removed, 0);
    assert_eq!(
        state
            .course_api
            .get_course(&unused.course_id)
            .unwrap_err()
            .outcome(),
        OutcomeCode::NotFound
    );
}

#[test]
fn test_delete_course_blocked_by_results_only() {
    let (_tmp, state) = setup_state();
    let course = create_course(&state, "CS101", None);
    let student = create_student(&state, "S001");
    state
        .result_api
        .record_result(&student.student_id, &course.course_id, 70.0, ExamType::Final, None, None)
        .unwrap();

    let err = state
        .course_api
        .delete_course_with_policy(&course.course_id, DeletePolicy::Block)
        .unwrap_err();
    assert!(matches!(err, ApiError::ReferentialIntegrity(_)));
}

#[test]
fn test_delete_course_cascade_via_config() {
    let (_tmp, state) = setup_state();
    state
        .config_manager
        .set_global_value(config_keys::DELETE_POLICY, "CASCADE")
        .unwrap();

    let course = create_course(&state, "CS101", Some(2));
    let s1 = create_student(&state, "S001");
    let s2 = create_student(&state, "S002");
    let r1 = state
        .registration_api
        .admit_registration(&s1.student_id, &course.course_id)
        .unwrap();
    state
        .registration_api
        .admit_registration(&s2.student_id, &course.course_id)
        .unwrap();
    state.registration_api.drop_registration(&r1.registration_id).unwrap();
    state
        .result_api
        .record_result(&s1.student_id, &course.course_id, 80.0, ExamType::Midterm, None, None)
        .unwrap();

    let summary = state.course_api.delete_course(&course.course_id).unwrap();
    assert_eq!(summary.registrations_removed, 2);
    assert_eq!(summary.results_removed, 1);
    assert_eq!(summary.seats_released, 1);

    assert!(state
        .registration_api
        .list_registrations(None, None)
        .unwrap()
        .is_empty());
    assert!(state.result_api.list_results().unwrap().is_empty());
    // 学生不受影响
    assert_eq!(state.student_api.list_students().unwrap().len(), 2);
}

#[test]
fn test_delete_student_cascade_releases_seats() {
    let (_tmp, state) = setup_state();
    let c1 = create_course(&state, "CS101", Some(1));
    let c2 = create_course(&state, "CS102", Some(1));
    let leaving = create_student(&state, "S001");
    let waiting = create_student(&state, "S002");
    let reg_api = &state.registration_api;

    reg_api
        .admit_registration(&leaving.student_id, &c1.course_id)
        .unwrap();
    reg_api
        .admit_registration(&leaving.student_id, &c2.course_id)
        .unwrap();
    state
        .result_api
        .record_result(&leaving.student_id, &c1.course_id, 99.0, ExamType::Final, None, None)
        .unwrap();

    let err = state
        .student_api
        .delete_student(&leaving.student_id)
        .unwrap_err();
    assert!(matches!(err, ApiError::ReferentialIntegrity(_)));

    let summary = state
        .student_api
        .delete_student_with_policy(&leaving.student_id, DeletePolicy::Cascade)
        .unwrap();
    assert_eq!(summary.registrations_removed, 2);
    assert_eq!(summary.results_removed, 1);
    assert_eq!(summary.seats_released, 2);

    assert_eq!(reg_api.enrolled_count(&c1.course_id).unwrap(), 0);
    assert_eq!(reg_api.enrolled_count(&c2.course_id).unwrap(), 0);
    reg_api
        .admit_registration(&waiting.student_id, &c1.course_id)
        .unwrap();

    assert_eq!(
        state
            .student_api
            .get_student(&leaving.student_id)
            .unwrap_err()
            .outcome(),
        OutcomeCode::NotFound
    );
    assert_eq!(
        state
            .student_api
            .delete_student_with_policy(&leaving.student_id, DeletePolicy::Cascade)
            .unwrap_err()
            .outcome(),
        OutcomeCode::NotFound
    );
}

#[test]
fn test_config_snapshot_reflects_overrides() {
    let (_tmp, state) = setup_state();
    let config = &state.config_manager;

    assert_eq!(config.get_delete_policy().unwrap(), DeletePolicy::Block);
    assert_eq!(config.get_config_snapshot().unwrap(), "{}");

    config
        .set_global_value(config_keys::DELETE_POLICY, "cascade")
        .unwrap();
    assert_eq!(config.get_delete_policy().unwrap(), DeletePolicy::Cascade);

    let snapshot: serde_json::Value =
        serde_json::from_str(&config.get_config_snapshot().unwrap()).unwrap();
    assert_eq!(snapshot["catalog.delete_policy"], "cascade");
}
