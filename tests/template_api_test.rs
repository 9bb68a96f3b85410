// ==========================================
// TemplateApi 集成测试
// ==========================================
// 测试范围:
// 1. 模板维护: list_template, upsert_entry, delete_entry
// 2. 清零: reset_week（仅影响目标周）
// 3. 复制: duplicate_template（多目标、跨年、无效目标）
// 4. 应用: apply_template（按天展开到每个时段,跳过关闭格子）
// ==========================================

mod helpers;

use helpers::api_test_helper::*;
use rdv_planning::api::ApiError;
use rdv_planning::db::open_sqlite_connection;
use rdv_planning::domain::calendar::IsoWeek;
use rdv_planning::domain::time_slot::slot_ids;
use test_helpers::date;

const OP: &str = "planner";

#[test]
fn test_upsert_entry_与_list_template() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    env.seed_departments(&[("75", "Paris"), ("13", "Bouches-du-Rhône")]);

    env.template_api
        .upsert_entry("75", 2024, 10, 1, 3, OP)
        .expect("写入失败");
    env.template_api
        .upsert_entry("75", 2024, 10, 5, 2, OP)
        .expect("写入失败");
    env.template_api
        .upsert_entry("13", 2024, 10, 3, 4, OP)
        .expect("写入失败");
    // 覆盖
    env.template_api
        .upsert_entry("75", 2024, 10, 1, 6, OP)
        .expect("写入失败");

    let rows = env.template_api.list_template(2024, 10).expect("查询失败");
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].department.as_str(), "13");
    assert_eq!(rows[0].wed, 4);
    assert_eq!(rows[1].department.as_str(), "75");
    assert_eq!((rows[1].mon, rows[1].tue, rows[1].fri), (6, 0, 2));

    // 其他周不可见
    assert!(env.template_api.list_template(2024, 11).unwrap().is_empty());
}

#[test]
fn test_upsert_entry_校验() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    env.seed_departments(&[("75", "Paris")]);

    assert!(matches!(
        env.template_api.upsert_entry("75", 2024, 10, 6, 1, OP),
        Err(ApiError::InvalidWeekday(_))
    ));
    assert!(matches!(
        env.template_api.upsert_entry("75", 2024, 10, 1, -1, OP),
        Err(ApiError::InvalidCapacity { value: -1 })
    ));
    assert!(matches!(
        env.template_api.upsert_entry("75", 2021, 53, 1, 1, OP),
        Err(ApiError::InvalidWeek { .. })
    ));
    assert!(env.template_api.list_template(2024, 10).unwrap().is_empty());
}

#[test]
fn test_delete_entry() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    env.seed_departments(&[("75", "Paris"), ("13", "Bouches-du-Rhône")]);
    for weekday in 1..=5 {
        env.template_api
            .upsert_entry("75", 2024, 10, weekday, 1, OP)
            .expect("写入失败");
    }
    env.template_api
        .upsert_entry("13", 2024, 10, 1, 1, OP)
        .expect("写入失败");

    let deleted = env
        .template_api
        .delete_entry("75", 2024, 10, OP)
        .expect("删除失败");
    assert_eq!(deleted, 5);

    let rows = env.template_api.list_template(2024, 10).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].department.as_str(), "13");
}

#[test]
fn test_reset_week_只影响目标周() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    env.seed_departments(&[("75", "Paris"), ("69", "Rhône"), ("33", "Gironde")]);

    env.template_api
        .upsert_entry("75", 2024, 10, 2, 5, OP)
        .expect("写入失败");
    env.template_api
        .upsert_entry("33", 2024, 10, 4, 7, OP)
        .expect("写入失败");
    env.template_api
        .upsert_entry("75", 2024, 11, 2, 5, OP)
        .expect("写入失败");

    env.template_api
        .reset_week(2024, 10, OP)
        .expect("清零失败");

    let rows = env.template_api.list_template(2024, 10).unwrap();
    let codes: Vec<&str> = rows.iter().map(|r| r.department.as_str()).collect();
    assert_eq!(codes, vec!["33", "69", "75"]);
    for row in &rows {
        assert!(row.entries().iter().all(|(_, count)| *count == 0));
    }

    let next = env.template_api.list_template(2024, 11).unwrap();
    assert_eq!(next[0].tue, 5);
}

#[test]
fn test_duplicate_template_多目标跨年() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    env.seed_departments(&[("75", "Paris")]);

    env.template_api
        .upsert_entry("75", 2024, 52, 1, 3, OP)
        .expect("写入失败");
    env.template_api
        .upsert_entry("75", 2024, 52, 4, 2, OP)
        .expect("写入失败");

    let report = env
        .template_api
        .duplicate_template(2024, 52, &[(2025, 1), (2025, 2), (2025, 54)], OP)
        .expect("复制失败");

    assert_eq!(
        report.succeeded,
        vec![IsoWeek { year: 2025, week: 1 }, IsoWeek { year: 2025, week: 2 }]
    );
    assert_eq!(report.fail_count(), 1);
    assert_eq!(report.failed[0].key, IsoWeek { year: 2025, week: 54 });

    for week in [1, 2] {
        let rows = env.template_api.list_template(2025, week).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!((rows[0].mon, rows[0].thu), (3, 2));
    }
}

#[test]
fn test_duplicate_template_无效源周整体拒绝() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    assert!(matches!(
        env.template_api.duplicate_template(2021, 53, &[(2022, 1)], OP),
        Err(ApiError::InvalidWeek { .. })
    ));
    assert!(matches!(
        env.template_api.duplicate_template(2022, 1, &[], OP),
        Err(ApiError::InvalidInput(_))
    ));
}

#[test]
fn test_apply_template_按天展开并跳过关闭格子() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    env.seed_departments(&[("75", "Paris"), ("13", "Bouches-du-Rhône")]);
    let monday = date(2024, 3, 4);
    let tuesday = date(2024, 3, 5);

    env.template_api
        .upsert_entry("75", 2024, 10, 1, 4, OP)
        .expect("写入失败");
    env.template_api
        .upsert_entry("75", 2024, 10, 2, 2, OP)
        .expect("写入失败");
    env.planning_api
        .force_close("75", tuesday, 57600, OP)
        .expect("关闭失败");

    let report = env
        .template_api
        .apply_template(2024, 10, &["75".to_string(), "13".to_string()], OP)
        .expect("应用失败");

    assert_eq!(report.departments.succeeded, vec!["75".to_string()]);
    assert!(report.departments.failure_of(&"13".to_string()).is_some());
    assert_eq!(report.closed_cells.len(), 1);
    assert_eq!(report.closed_cells[0].date, tuesday);
    assert_eq!(report.closed_cells[0].slot_id, 57600);

    let grid = env.planning_api.get_week("75", 2024, 10).expect("查询失败");
    for slot_id in slot_ids() {
        assert_eq!(grid.cell(monday, slot_id).unwrap().capacity, Some(4));
    }
    assert_eq!(grid.cell(tuesday, 32400).unwrap().capacity, Some(2));
    assert_eq!(grid.cell(tuesday, 57600).unwrap().capacity, None);
    // 未设置的工作日按 0 写入
    assert_eq!(grid.cell(date(2024, 3, 8), 32400).unwrap().capacity, Some(0));
}

#[test]
fn test_模板写入拒绝目录外省份() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    env.seed_departments(&[("75", "Paris")]);

    assert!(matches!(
        env.template_api.upsert_entry("ZZ", 2024, 10, 1, 3, OP),
        Err(ApiError::InvalidDepartment(_))
    ));
    assert!(matches!(
        env.template_api.delete_entry("ZZ", 2024, 10, OP),
        Err(ApiError::InvalidDepartment(_))
    ));
    assert!(env.template_api.list_template(2024, 10).unwrap().is_empty());
}

#[test]
fn test_apply_template_省份写入失败时网格不变() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    env.seed_departments(&[("75", "Paris"), ("13", "Bouches-du-Rhône")]);
    let monday = date(2024, 3, 4);

    env.template_api
        .upsert_entry("75", 2024, 10, 1, 4, OP)
        .expect("写入失败");
    env.template_api
        .upsert_entry("13", 2024, 10, 1, 2, OP)
        .expect("写入失败");

    // 75 周五最后一个时段写入失败
    let conn = open_sqlite_connection(&env.db_path).expect("无法打开数据库");
    conn.execute_batch(
        r#"
        CREATE TRIGGER reject_friday BEFORE INSERT ON availability_cell
        WHEN NEW.department = '75' AND NEW.cell_date = '2024-03-08' AND NEW.slot_id = 70200
        BEGIN
            SELECT RAISE(ABORT, 'rejected');
        END;
        "#,
    )
    .expect("创建触发器失败");

    let report = env
        .template_api
        .apply_template(2024, 10, &["75".to_string(), "13".to_string()], OP)
        .expect("应用失败");

    assert_eq!(report.departments.succeeded, vec!["13".to_string()]);
    assert!(report.departments.failure_of(&"75".to_string()).is_some());
    assert!(report.closed_cells.is_empty());

    let paris = env.planning_api.get_week("75", 2024, 10).expect("查询失败");
    assert!(paris
        .cells
        .values()
        .flat_map(|row| row.values())
        .all(|c| c.capacity.is_none()));

    let marseille = env.planning_api.get_week("13", 2024, 10).expect("查询失败");
    for slot_id in slot_ids() {
        assert_eq!(marseille.cell(monday, slot_id).unwrap().capacity, Some(2));
    }
}
