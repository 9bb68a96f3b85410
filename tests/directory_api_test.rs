// ==========================================
// DirectoryApi 集成测试
// ==========================================
// 测试范围:
// 1. 省份目录: upsert_department, list_departments
// 2. 商务目录: upsert_commercial, list_commercials（active_only 过滤）
// ==========================================

mod helpers;

use helpers::api_test_helper::*;
use rdv_planning::api::ApiError;

#[test]
fn test_list_departments_按代码排序() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    env.seed_departments(&[("75", "Paris"), ("2a", "Corse-du-Sud"), ("13", "Bouches-du-Rhône")]);

    let departments = env.directory_api.list_departments().expect("查询失败");
    let codes: Vec<&str> = departments.iter().map(|d| d.code.as_str()).collect();
    assert_eq!(codes, vec!["13", "2A", "75"]);

    assert!(matches!(
        env.directory_api.upsert_department("750", "Paris"),
        Err(ApiError::InvalidDepartment(_))
    ));
    assert!(matches!(
        env.directory_api.upsert_department("69", "  "),
        Err(ApiError::InvalidInput(_))
    ));
}

#[test]
fn test_list_commercials_仅在职过滤() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    env.seed_commercial(1, "Bruno", true);
    env.seed_commercial(2, "Alice", false);
    env.seed_commercial(3, "Chloé", true);

    let all = env.directory_api.list_commercials(false).expect("查询失败");
    assert_eq!(all.iter().map(|c| c.id).collect::<Vec<_>>(), vec![2, 1, 3]);

    let active = env.directory_api.list_commercials(true).expect("查询失败");
    assert_eq!(active.iter().map(|c| c.id).collect::<Vec<_>>(), vec![1, 3]);
    assert!(active.iter().all(|c| c.active));

    // 停用后不再出现在在职列表中
    env.seed_commercial(3, "Chloé", false);
    let active = env.directory_api.list_commercials(true).expect("查询失败");
    assert_eq!(active.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(), vec!["Bruno"]);

    assert!(matches!(
        env.directory_api.upsert_commercial(4, " ", true),
        Err(ApiError::InvalidInput(_))
    ));
}
