// ==========================================
// RDV 排期与分配系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope, 当前仅 global)
// ==========================================

use crate::db::open_sqlite_connection;
use rusqlite::{params, Connection};
use serde_json::json;
use std::collections::BTreeMap;
use std::error::Error;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// 路线服务默认超时（毫秒）
pub const DEFAULT_ROUTING_TIMEOUT_MS: u64 = 10_000;

/// 可分配 RDV 查询的默认最大跨度（天）
pub const DEFAULT_ASSIGNABLE_RANGE_MAX_DAYS: i64 = 93;

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> Result<Self, Box<dyn Error>> {
        let conn = open_sqlite_connection(db_path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, Box<dyn Error>> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 读取 global scope 的配置值
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    pub fn get_global_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    /// 写入 global scope 的配置值（存在则覆盖）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2",
            params![key, value],
        )?;
        Ok(())
    }

    /// 删除 global scope 的配置值，恢复默认
    pub fn remove_global_config_value(&self, key: &str) -> Result<bool, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        let affected = conn.execute(
            "DELETE FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
        )?;
        Ok(affected > 0)
    }

    /// 获取所有 global 配置的快照（JSON 字符串，键有序）
    pub fn get_config_snapshot(&self) -> Result<String, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key")?;

        let mut config_map: BTreeMap<String, String> = BTreeMap::new();
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }

        Ok(serde_json::to_string(&json!(config_map))?)
    }

    // ===== 路线服务 =====

    /// 路线服务超时
    ///
    /// 未配置或格式错误（含 0）时回退到默认值
    pub fn get_routing_timeout(&self) -> Result<Duration, Box<dyn Error>> {
        let ms = match self.get_global_config_value(config_keys::ROUTING_TIMEOUT_MS)? {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(v) if v > 0 => v,
                _ => {
                    tracing::warn!(
                        config_key = config_keys::ROUTING_TIMEOUT_MS,
                        raw_value = %raw,
                        "路线超时配置格式错误，使用默认值"
                    );
                    DEFAULT_ROUTING_TIMEOUT_MS
                }
            },
            None => DEFAULT_ROUTING_TIMEOUT_MS,
        };
        Ok(Duration::from_millis(ms))
    }

    /// 路线服务地址（未配置返回 None）
    pub fn get_routing_endpoint(&self) -> Result<Option<String>, Box<dyn Error>> {
        Ok(self
            .get_global_config_value(config_keys::ROUTING_ENDPOINT)?
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty()))
    }

    // ===== 分配 =====

    /// 可分配 RDV 查询的最大日期跨度（天）
    pub fn get_assignable_range_max_days(&self) -> Result<i64, Box<dyn Error>> {
        let value = self.get_global_config_value(config_keys::ASSIGNABLE_RANGE_MAX_DAYS)?;
        Ok(value
            .and_then(|v| v.trim().parse::<i64>().ok())
            .filter(|v| *v > 0)
            .unwrap_or(DEFAULT_ASSIGNABLE_RANGE_MAX_DAYS))
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 路线服务
    pub const ROUTING_TIMEOUT_MS: &str = "routing_timeout_ms";
    pub const ROUTING_ENDPOINT: &str = "routing_endpoint";

    // 分配
    pub const ASSIGNABLE_RANGE_MAX_DAYS: &str = "assignable_range_max_days";
}
