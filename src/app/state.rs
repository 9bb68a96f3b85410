// ==========================================
// RDV 排期与分配系统 - 应用状态
// ==========================================
// 职责: 管理应用级别的共享状态和API实例
// ==========================================

use std::sync::{Arc, Mutex};

use crate::api::{AssignmentApi, DirectoryApi, PlanningApi, TemplateApi};
use crate::config::config_manager::ConfigManager;
use crate::db::{check_schema_version, init_schema, open_sqlite_connection};
use crate::engine::routing::{HttpRoutingService, RoutingService, UnconfiguredRoutingService};
use crate::repository::{
    action_log_repo::ActionLogRepository, appointment_repo::SqliteAppointmentStore,
    appointment_store::AppointmentStore, availability_repo::AvailabilityRepository,
    directory_repo::DirectoryRepository, template_repo::WeeklyTemplateRepository,
};

/// 应用状态
///
/// 包含所有API实例和共享资源（单一共享连接）
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 排期（容量网格）API
    pub planning_api: Arc<PlanningApi>,

    /// 周模板API
    pub template_api: Arc<TemplateApi>,

    /// 分配API
    pub assignment_api: Arc<AssignmentApi>,

    /// 省份/商务目录API
    pub directory_api: Arc<DirectoryApi>,

    /// 配置管理器
    pub config_manager: Arc<ConfigManager>,

    /// 操作日志仓储（用于审计追踪）
    pub action_log_repo: Arc<ActionLogRepository>,
}

impl AppState {
    /// 创建新的AppState实例
    ///
    /// 路线服务: 配置了 routing_endpoint 时使用 HTTP 适配,否则所有路线请求返回 RoutingUnavailable
    ///
    /// # 返回
    /// - Err(String): 初始化错误
    pub fn new(db_path: String) -> Result<Self, String> {
        Self::build(db_path, None)
    }

    /// 使用指定路线服务创建（测试或嵌入场景）
    pub fn with_routing_service(
        db_path: String,
        router: Arc<dyn RoutingService>,
    ) -> Result<Self, String> {
        Self::build(db_path, Some(router))
    }

    fn build(db_path: String, router: Option<Arc<dyn RoutingService>>) -> Result<Self, String> {
        tracing::info!("初始化AppState，数据库路径: {}", db_path);

        let conn =
            open_sqlite_connection(&db_path).map_err(|e| format!("无法打开数据库: {}", e))?;
        init_schema(&conn).map_err(|e| format!("数据库初始化失败: {}", e))?;
        check_schema_version(&conn).map_err(|e| format!("schema_version 检查失败: {}", e))?;
        let conn = Arc::new(Mutex::new(conn));

        // ==========================================
        // 初始化Repository层
        // ==========================================
        let availability_repo = Arc::new(AvailabilityRepository::new(conn.clone()));
        let template_repo = Arc::new(WeeklyTemplateRepository::new(conn.clone()));
        let directory_repo = Arc::new(DirectoryRepository::new(conn.clone()));
        let action_log_repo = Arc::new(ActionLogRepository::new(conn.clone()));
        let appointment_store: Arc<dyn AppointmentStore> =
            Arc::new(SqliteAppointmentStore::new(conn.clone()));

        // 配置管理器
        let config_manager = Arc::new(
            ConfigManager::from_connection(conn.clone())
                .map_err(|e| format!("无法创建ConfigManager: {}", e))?,
        );

        let router = match router {
            Some(router) => router,
            None => build_router(&config_manager)?,
        };

        // ==========================================
        // 初始化API层
        // ==========================================
        let planning_api = Arc::new(PlanningApi::new(
            availability_repo.clone(),
            directory_repo.clone(),
            appointment_store.clone(),
            action_log_repo.clone(),
        ));
        let template_api = Arc::new(TemplateApi::new(
            template_repo,
            availability_repo,
            directory_repo.clone(),
            action_log_repo.clone(),
        ));
        let assignment_api = Arc::new(AssignmentApi::new(
            appointment_store,
            directory_repo.clone(),
            action_log_repo.clone(),
            config_manager.clone(),
            router,
        ));
        let directory_api = Arc::new(DirectoryApi::new(directory_repo));

        tracing::info!("AppState初始化完成");

        Ok(Self {
            db_path,
            planning_api,
            template_api,
            assignment_api,
            directory_api,
            config_manager,
            action_log_repo,
        })
    }
}

fn build_router(config_manager: &ConfigManager) -> Result<Arc<dyn RoutingService>, String> {
    let endpoint = config_manager
        .get_routing_endpoint()
        .map_err(|e| format!("读取路线服务配置失败: {}", e))?;
    match endpoint {
        Some(endpoint) => {
            let timeout = config_manager
                .get_routing_timeout()
                .map_err(|e| format!("读取路线服务配置失败: {}", e))?;
            tracing::info!(endpoint = %endpoint, "启用 HTTP 路线服务");
            let service = HttpRoutingService::new(endpoint, timeout)
                .map_err(|e| format!("无法创建路线服务: {}", e))?;
            Ok(Arc::new(service))
        }
        None => {
            tracing::warn!("未配置 routing_endpoint，路线距离不可用");
            Ok(Arc::new(UnconfiguredRoutingService))
        }
    }
}

/// 获取默认数据库路径
///
/// 优先级: 环境变量 RDV_PLANNING_DB_PATH > 用户数据目录 > 当前目录
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    if let Ok(path) = std::env::var("RDV_PLANNING_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./rdv_planning.db");

    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("rdv-planning");
        // 目录创建失败时回退到当前目录
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("rdv_planning.db");
        }
    }

    path.to_string_lossy().to_string()
}
