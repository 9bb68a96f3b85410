// ==========================================
// RDV 排期与分配系统 - 路线距离服务
// ==========================================
// 职责: 外部地理编码/路线服务的契约与 HTTP 适配
// 说明: 距离只作参考,不影响分配结果;调用必须有超时上限
// ==========================================

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::domain::types::AppointmentId;

/// 路线站点
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteStop {
    pub id: AppointmentId,
    pub postal_code: String,
    pub city: Option<String>,
}

/// 两点之间的距离与时长
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RouteLeg {
    pub distance_m: f64,
    pub duration_s: f64,
}

/// 距离矩阵（legs[i][j] 为站点 i 到 j）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistanceMatrix {
    pub legs: Vec<Vec<RouteLeg>>,
    pub total_distance_m: f64,
    pub total_duration_s: f64,
}

impl DistanceMatrix {
    /// 矩阵是否为 n×n
    pub fn is_square(&self, n: usize) -> bool {
        self.legs.len() == n && self.legs.iter().all(|row| row.len() == n)
    }
}

/// 路线服务错误
#[derive(Error, Debug)]
pub enum RoutingError {
    #[error("路线服务超时: {0:?}")]
    Timeout(Duration),

    #[error("路线服务调用失败: {0}")]
    Upstream(String),

    #[error("路线服务返回无效结果: {0}")]
    InvalidResponse(String),

    #[error("路线服务未配置")]
    NotConfigured,
}

// ==========================================
// RoutingService Trait
// ==========================================
// 实现者: HttpRoutingService / 测试 Mock
#[async_trait]
pub trait RoutingService: Send + Sync {
    /// 计算站点两两距离及顺序路线总距离
    async fn distance_matrix(&self, stops: &[RouteStop]) -> Result<DistanceMatrix, RoutingError>;
}

/// 带超时调用路线服务
pub async fn distance_matrix_with_timeout(
    service: &dyn RoutingService,
    stops: &[RouteStop],
    timeout: Duration,
) -> Result<DistanceMatrix, RoutingError> {
    match tokio::time::timeout(timeout, service.distance_matrix(stops)).await {
        Ok(result) => result,
        Err(_) => Err(RoutingError::Timeout(timeout)),
    }
}

// ==========================================
// HttpRoutingService - HTTP 适配
// ==========================================
// 请求: POST {endpoint}  body = {"stops":[{"id","postal_code","city"}]}
// 响应: DistanceMatrix JSON
#[derive(Clone)]
pub struct HttpRoutingService {
    client: reqwest::Client,
    endpoint: String,
}

#[derive(Serialize)]
struct MatrixRequest<'a> {
    stops: &'a [RouteStop],
}

impl HttpRoutingService {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, RoutingError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RoutingError::Upstream(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl RoutingService for HttpRoutingService {
    async fn distance_matrix(&self, stops: &[RouteStop]) -> Result<DistanceMatrix, RoutingError> {
        debug!(endpoint = %self.endpoint, stops = stops.len(), "请求路线距离矩阵");

        let response = self
            .client
            .post(&self.endpoint)
            .json(&MatrixRequest { stops })
            .send()
            .await
            .map_err(|e| RoutingError::Upstream(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RoutingError::Upstream(format!("HTTP {}", status)));
        }

        response
            .json::<DistanceMatrix>()
            .await
            .map_err(|e| RoutingError::InvalidResponse(e.to_string()))
    }
}

/// 未配置路线服务时使用
#[derive(Debug, Default, Clone, Copy)]
pub struct UnconfiguredRoutingService;

#[async_trait]
impl RoutingService for UnconfiguredRoutingService {
    async fn distance_matrix(&self, _stops: &[RouteStop]) -> Result<DistanceMatrix, RoutingError> {
        Err(RoutingError::NotConfigured)
    }
}
