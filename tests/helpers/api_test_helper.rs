// ==========================================
// API集成测试辅助工具
// ==========================================
// 职责: 提供API层集成测试的通用环境与数据准备
// 说明: 使用方需在 crate 根声明 `mod test_helpers;`
// ==========================================

#![allow(dead_code)]

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use chrono::NaiveDateTime;
use tempfile::NamedTempFile;

use rdv_planning::api::{AssignmentApi, DirectoryApi, PlanningApi, TemplateApi};
use rdv_planning::config::config_manager::ConfigManager;
use rdv_planning::db::open_sqlite_connection;
use rdv_planning::domain::appointment::{Appointment, Qualification};
use rdv_planning::domain::types::{AppointmentId, CommercialId, DepartmentCode};
use rdv_planning::engine::routing::{RoutingService, UnconfiguredRoutingService};
use rdv_planning::logging;
use rdv_planning::repository::{
    action_log_repo::ActionLogRepository, appointment_repo::SqliteAppointmentStore,
    appointment_store::AppointmentStore, availability_repo::AvailabilityRepository,
    directory_repo::DirectoryRepository, template_repo::WeeklyTemplateRepository,
};

use crate::test_helpers;

// ==========================================
// API测试环境
// ==========================================

/// API测试环境
///
/// 包含所有API实例和必要的依赖
pub struct ApiTestEnv {
    pub db_path: String,
    pub planning_api: Arc<PlanningApi>,
    pub template_api: Arc<TemplateApi>,
    pub assignment_api: Arc<AssignmentApi>,
    pub directory_api: Arc<DirectoryApi>,

    // Repository层（用于测试数据准备与断言）
    pub appointment_store: Arc<SqliteAppointmentStore>,
    pub availability_repo: Arc<AvailabilityRepository>,
    pub action_log_repo: Arc<ActionLogRepository>,
    pub config_manager: Arc<ConfigManager>,

    // 临时文件（确保生命周期）
    _temp_file: NamedTempFile,
}

impl ApiTestEnv {
    /// 创建新的API测试环境（路线服务未配置）
    pub fn new() -> Result<Self, String> {
        Self::with_router(Arc::new(UnconfiguredRoutingService))
    }

    /// 使用指定路线服务创建测试环境
    pub fn with_router(router: Arc<dyn RoutingService>) -> Result<Self, String> {
        logging::init_test();

        let (temp_file, db_path) = test_helpers::create_test_db()
            .map_err(|e| format!("创建测试数据库失败: {}", e))?;

        let conn =
            open_sqlite_connection(&db_path).map_err(|e| format!("无法打开数据库: {}", e))?;
        let conn = Arc::new(Mutex::new(conn));

        // ==========================================
        // 初始化Repository层
        // ==========================================
        let availability_repo = Arc::new(AvailabilityRepository::new(conn.clone()));
        let template_repo = Arc::new(WeeklyTemplateRepository::new(conn.clone()));
        let directory_repo = Arc::new(DirectoryRepository::new(conn.clone()));
        let action_log_repo = Arc::new(ActionLogRepository::new(conn.clone()));
        let appointment_store = Arc::new(SqliteAppointmentStore::new(conn.clone()));
        let store: Arc<dyn AppointmentStore> = appointment_store.clone();

        let config_manager = Arc::new(
            ConfigManager::from_connection(conn.clone())
                .map_err(|e| format!("无法创建ConfigManager: {}", e))?,
        );

        // ==========================================
        // 初始化API层
        // ==========================================
        let planning_api = Arc::new(PlanningApi::new(
            availability_repo.clone(),
            directory_repo.clone(),
            store.clone(),
            action_log_repo.clone(),
        ));
        let template_api = Arc::new(TemplateApi::new(
            template_repo,
            availability_repo.clone(),
            directory_repo.clone(),
            action_log_repo.clone(),
        ));
        let assignment_api = Arc::new(AssignmentApi::new(
            store,
            directory_repo.clone(),
            action_log_repo.clone(),
            config_manager.clone(),
            router,
        ));
        let directory_api = Arc::new(DirectoryApi::new(directory_repo));

        Ok(Self {
            db_path,
            planning_api,
            template_api,
            assignment_api,
            directory_api,
            appointment_store,
            availability_repo,
            action_log_repo,
            config_manager,
            _temp_file: temp_file,
        })
    }

    // ==========================================
    // 测试数据准备
    // ==========================================

    /// 写入省份目录
    pub fn seed_departments(&self, departments: &[(&str, &str)]) {
        for (code, name) in departments {
            self.directory_api
                .upsert_department(code, name)
                .expect("写入省份失败");
        }
    }

    /// 写入商务
    pub fn seed_commercial(&self, id: CommercialId, name: &str, active: bool) {
        self.directory_api
            .upsert_commercial(id, name, active)
            .expect("写入商务失败");
    }

    /// 写入 RDV
    pub fn seed_appointment(
        &self,
        id: AppointmentId,
        department: &str,
        scheduled_at: NaiveDateTime,
        confirmed: bool,
    ) -> Appointment {
        let appointment = Appointment {
            id,
            scheduled_at,
            department: DepartmentCode::parse(department).expect("省份代码无效"),
            assigned_commercial: None,
            confirmed,
            qualifications: BTreeSet::from([Qualification::SoloValid]),
            postal_code: Some(format!("{}001", department)),
            city: None,
        };
        self.appointment_store
            .upsert(&appointment)
            .expect("写入RDV失败");
        appointment
    }

    /// 读取 RDV 当前分配的商务
    pub fn assigned_commercial(&self, id: AppointmentId) -> Option<CommercialId> {
        self.appointment_store
            .find_by_id(id)
            .expect("查询RDV失败")
            .expect("RDV不存在")
            .assigned_commercial
    }
}
