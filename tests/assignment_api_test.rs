// ==========================================
// AssignmentApi 集成测试
// ==========================================
// 测试范围:
// 1. 可分配查询: list_assignable（仅已确认,按分配状态过滤,跨度上限）
// 2. 批量分配: assign（按条独立、后写覆盖、商务校验）
// 3. 批量取消: unassign
// 4. 路线距离: compute_route_distances（地址过滤、超时、维度校验）
// ==========================================

mod helpers;

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use helpers::api_test_helper::*;
use rdv_planning::api::ApiError;
use rdv_planning::config::config_keys;
use rdv_planning::domain::types::AssignedState;
use rdv_planning::engine::routing::{
    DistanceMatrix, RouteLeg, RouteStop, RoutingError, RoutingService,
};
use test_helpers::{at, date};

const OP: &str = "dispatcher";

// ==========================================
// Mock 路线服务
// ==========================================

/// 站点间距离 = |i - j| × 1000 米
struct LinearRouter {
    calls: AtomicUsize,
}

impl LinearRouter {
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl RoutingService for LinearRouter {
    async fn distance_matrix(&self, stops: &[RouteStop]) -> Result<DistanceMatrix, RoutingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let n = stops.len();
        let legs = (0..n)
            .map(|i| {
                (0..n)
                    .map(|j| {
                        let d = (i as f64 - j as f64).abs() * 1000.0;
                        RouteLeg {
                            distance_m: d,
                            duration_s: d / 10.0,
                        }
                    })
                    .collect()
            })
            .collect();
        let total = (n.saturating_sub(1)) as f64 * 1000.0;
        Ok(DistanceMatrix {
            legs,
            total_distance_m: total,
            total_duration_s: total / 10.0,
        })
    }
}

struct SlowRouter;

#[async_trait]
impl RoutingService for SlowRouter {
    async fn distance_matrix(&self, _stops: &[RouteStop]) -> Result<DistanceMatrix, RoutingError> {
        tokio::time::sleep(Duration::from_secs(10)).await;
        Err(RoutingError::Upstream("unreachable".to_string()))
    }
}

struct BrokenRouter;

#[async_trait]
impl RoutingService for BrokenRouter {
    async fn distance_matrix(&self, _stops: &[RouteStop]) -> Result<DistanceMatrix, RoutingError> {
        Ok(DistanceMatrix {
            legs: vec![],
            total_distance_m: 0.0,
            total_duration_s: 0.0,
        })
    }
}

fn stop(id: i64, postal_code: &str) -> RouteStop {
    RouteStop {
        id,
        postal_code: postal_code.to_string(),
        city: None,
    }
}

// ==========================================
// 可分配查询
// ==========================================

#[test]
fn test_list_assignable_按状态过滤() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    env.seed_commercial(10, "Alice", true);
    let monday = date(2024, 3, 4);
    let tuesday = date(2024, 3, 5);

    env.seed_appointment(1, "75", at(tuesday, 9, 0, 0), true);
    env.seed_appointment(2, "75", at(monday, 14, 0, 0), true);
    env.seed_appointment(3, "75", at(monday, 15, 0, 0), false); // 未确认
    env.seed_appointment(4, "13", at(monday, 15, 0, 0), true); // 其他省份
    env.seed_appointment(5, "75", at(date(2024, 3, 12), 9, 0, 0), true); // 范围外

    env.assignment_api.assign(&[1], 10, OP).expect("分配失败");

    let unassigned = env
        .assignment_api
        .list_assignable("75", monday, date(2024, 3, 8), AssignedState::Unassigned)
        .expect("查询失败");
    assert_eq!(unassigned.iter().map(|a| a.id).collect::<Vec<_>>(), vec![2]);

    let assigned = env
        .assignment_api
        .list_assignable("75", monday, date(2024, 3, 8), AssignedState::Assigned)
        .expect("查询失败");
    assert_eq!(assigned.len(), 1);
    assert_eq!(assigned[0].id, 1);
    assert_eq!(assigned[0].assigned_commercial, Some(10));
}

#[test]
fn test_list_assignable_日期范围校验() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");

    assert!(matches!(
        env.assignment_api.list_assignable(
            "75",
            date(2024, 3, 8),
            date(2024, 3, 4),
            AssignedState::Unassigned
        ),
        Err(ApiError::InvalidInput(_))
    ));

    env.config_manager
        .set_global_config_value(config_keys::ASSIGNABLE_RANGE_MAX_DAYS, "7")
        .expect("写入配置失败");
    assert!(env
        .assignment_api
        .list_assignable("75", date(2024, 3, 4), date(2024, 3, 10), AssignedState::Unassigned)
        .is_ok());
    assert!(matches!(
        env.assignment_api.list_assignable(
            "75",
            date(2024, 3, 4),
            date(2024, 3, 11),
            AssignedState::Unassigned
        ),
        Err(ApiError::InvalidInput(_))
    ));
}

// ==========================================
// 批量分配 / 取消
// ==========================================

#[test]
fn test_assign_后写覆盖且按条独立() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    env.seed_commercial(10, "Alice", true);
    env.seed_commercial(20, "Bruno", true);
    let monday = date(2024, 3, 4);
    for id in 1..=3 {
        env.seed_appointment(id, "75", at(monday, 9, id as u32, 0), true);
    }

    let report = env
        .assignment_api
        .assign(&[1, 2, 3], 10, OP)
        .expect("分配失败");
    assert_eq!(report.success_count(), 3);

    let report = env.assignment_api.assign(&[2], 20, OP).expect("分配失败");
    assert!(report.is_complete_success());

    assert_eq!(env.assigned_commercial(1), Some(10));
    assert_eq!(env.assigned_commercial(2), Some(20));
    assert_eq!(env.assigned_commercial(3), Some(10));

    let logs = env
        .action_log_repo
        .find_by_action_type("ASSIGN")
        .expect("查询日志失败");
    assert_eq!(logs.len(), 2);
}

#[test]
fn test_assign_部分失败不影响其他() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    env.seed_commercial(10, "Alice", true);
    let monday = date(2024, 3, 4);
    env.seed_appointment(1, "75", at(monday, 9, 0, 0), true);
    env.seed_appointment(2, "75", at(monday, 9, 5, 0), false); // 未确认
    env.seed_appointment(3, "75", at(monday, 9, 10, 0), true);

    let report = env
        .assignment_api
        .assign(&[1, 2, 999, 3], 10, OP)
        .expect("分配失败");

    assert_eq!(report.succeeded, vec![1, 3]);
    assert_eq!(report.fail_count(), 2);
    assert!(report.failure_of(&2).is_some());
    assert!(report.failure_of(&999).is_some());
    assert_eq!(env.assigned_commercial(2), None);
    assert_eq!(env.assigned_commercial(3), Some(10));

    // 重复提交同一批次结果一致
    let again = env
        .assignment_api
        .assign(&[1, 2, 999, 3], 10, OP)
        .expect("分配失败");
    assert_eq!(again.succeeded, vec![1, 3]);
}

#[test]
fn test_assign_商务校验() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    env.seed_commercial(30, "Chloé", false);
    env.seed_appointment(1, "75", at(date(2024, 3, 4), 9, 0, 0), true);

    assert!(matches!(
        env.assignment_api.assign(&[1], 99, OP),
        Err(ApiError::NotFound(_))
    ));
    assert!(matches!(
        env.assignment_api.assign(&[1], 30, OP),
        Err(ApiError::InvalidInput(_))
    ));
    assert!(matches!(
        env.assignment_api.assign(&[], 30, OP),
        Err(ApiError::InvalidInput(_))
    ));
    assert_eq!(env.assigned_commercial(1), None);
}

#[test]
fn test_unassign() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    env.seed_commercial(10, "Alice", true);
    let monday = date(2024, 3, 4);
    env.seed_appointment(1, "75", at(monday, 9, 0, 0), true);
    env.seed_appointment(2, "75", at(monday, 9, 5, 0), true);

    env.assignment_api.assign(&[1, 2], 10, OP).expect("分配失败");
    let report = env
        .assignment_api
        .unassign(&[1, 404], OP)
        .expect("取消失败");

    assert_eq!(report.succeeded, vec![1]);
    assert!(report.failure_of(&404).is_some());
    assert_eq!(env.assigned_commercial(1), None);
    assert_eq!(env.assigned_commercial(2), Some(10));

    // Unassigned → AssignedTo → Unassigned → AssignedTo
    env.assignment_api.assign(&[1], 10, OP).expect("分配失败");
    assert_eq!(env.assigned_commercial(1), Some(10));
}

// ==========================================
// 路线距离
// ==========================================

#[tokio::test]
async fn test_compute_route_distances_过滤空邮编() {
    let router = Arc::new(LinearRouter::new());
    let env = ApiTestEnv::with_router(router.clone()).expect("无法创建测试环境");

    let result = env
        .assignment_api
        .compute_route_distances(&[stop(1, "75001"), stop(2, "  "), stop(3, "92100")])
        .await
        .expect("计算失败");

    assert_eq!(result.stops.len(), 2);
    assert_eq!(result.skipped, vec![2]);
    assert_eq!(result.matrix.legs.len(), 2);
    assert_eq!(result.matrix.total_distance_m, 1000.0);
    assert_eq!(router.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_compute_route_distances_有效地址不足() {
    let router = Arc::new(LinearRouter::new());
    let env = ApiTestEnv::with_router(router.clone()).expect("无法创建测试环境");

    let result = env
        .assignment_api
        .compute_route_distances(&[stop(1, "75001"), stop(2, "")])
        .await;

    assert!(matches!(
        result,
        Err(ApiError::InsufficientAddresses { valid: 1 })
    ));
    // 校验失败时不调用外部服务
    assert_eq!(router.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_compute_route_distances_超时返回可重试错误() {
    let env = ApiTestEnv::with_router(Arc::new(SlowRouter)).expect("无法创建测试环境");
    env.config_manager
        .set_global_config_value(config_keys::ROUTING_TIMEOUT_MS, "50")
        .expect("写入配置失败");

    let result = env
        .assignment_api
        .compute_route_distances(&[stop(1, "75001"), stop(2, "75002")])
        .await;

    match result {
        Err(e @ ApiError::RoutingUnavailable(_)) => assert!(e.is_retryable()),
        other => panic!("Expected RoutingUnavailable, got {:?}", other),
    }
}

#[tokio::test]
async fn test_compute_route_distances_未配置或矩阵无效() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    assert!(matches!(
        env.assignment_api
            .compute_route_distances(&[stop(1, "75001"), stop(2, "75002")])
            .await,
        Err(ApiError::RoutingUnavailable(_))
    ));

    let env = ApiTestEnv::with_router(Arc::new(BrokenRouter)).expect("无法创建测试环境");
    assert!(matches!(
        env.assignment_api
            .compute_route_distances(&[stop(1, "75001"), stop(2, "75002")])
            .await,
        Err(ApiError::RoutingUnavailable(_))
    ));
}
