// ==========================================
// RDV 排期与分配系统 - 省份/商务目录 API
// ==========================================

use std::sync::Arc;
use tracing::info;

use crate::api::error::{ApiError, ApiResult};
use crate::api::validator::parse_department;
use crate::domain::directory::{Commercial, Department};
use crate::domain::types::CommercialId;
use crate::repository::directory_repo::DirectoryRepository;

pub struct DirectoryApi {
    directory_repo: Arc<DirectoryRepository>,
}

impl DirectoryApi {
    pub fn new(directory_repo: Arc<DirectoryRepository>) -> Self {
        Self { directory_repo }
    }

    /// 全部省份（按代码排序）
    pub fn list_departments(&self) -> ApiResult<Vec<Department>> {
        Ok(self.directory_repo.list_departments()?)
    }

    /// 商务列表
    ///
    /// # 参数
    /// - active_only: 仅返回在岗商务
    pub fn list_commercials(&self, active_only: bool) -> ApiResult<Vec<Commercial>> {
        Ok(self.directory_repo.list_commercials(active_only)?)
    }

    pub fn upsert_department(&self, code: &str, name: &str) -> ApiResult<()> {
        let code = parse_department(code)?;
        if name.trim().is_empty() {
            return Err(ApiError::InvalidInput("省份名称不能为空".to_string()));
        }
        self.directory_repo.upsert_department(&Department {
            code: code.clone(),
            name: name.trim().to_string(),
        })?;
        info!(department = %code, "省份已写入目录");
        Ok(())
    }

    pub fn upsert_commercial(&self, id: CommercialId, name: &str, active: bool) -> ApiResult<()> {
        if name.trim().is_empty() {
            return Err(ApiError::InvalidInput("商务姓名不能为空".to_string()));
        }
        self.directory_repo.upsert_commercial(&Commercial {
            id,
            name: name.trim().to_string(),
            active,
        })?;
        info!(commercial_id = id, active, "商务已写入目录");
        Ok(())
    }
}
