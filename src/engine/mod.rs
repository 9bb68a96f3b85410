// ==========================================
// RDV 排期与分配系统 - 引擎层
// ==========================================
// 职责: 已预约数计算、路线距离外部服务
// ==========================================

pub mod booking;
pub mod routing;

pub use booking::BookingCounter;
pub use routing::{
    distance_matrix_with_timeout, DistanceMatrix, HttpRoutingService, RouteLeg, RouteStop,
    RoutingError, RoutingService, UnconfiguredRoutingService,
};
