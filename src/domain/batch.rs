// ==========================================
// RDV 排期与分配系统 - 批量操作结果
// ==========================================
// 用途: 复制/分配等批量操作逐项记录成功或失败（继续执行,不整体回滚）
// ==========================================

use serde::{Deserialize, Serialize};

/// 单项失败
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchFailure<K> {
    pub key: K,
    pub error: String,
}

/// 批量结果: 成功项与失败项分开,按提交顺序保存
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport<K> {
    pub succeeded: Vec<K>,
    pub failed: Vec<BatchFailure<K>>,
}

impl<K> Default for BatchReport<K> {
    fn default() -> Self {
        Self {
            succeeded: Vec::new(),
            failed: Vec::new(),
        }
    }
}

impl<K> BatchReport<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录一项结果
    pub fn record<T, E: std::fmt::Display>(&mut self, key: K, outcome: Result<T, E>) {
        match outcome {
            Ok(_) => self.succeeded.push(key),
            Err(e) => self.failed.push(BatchFailure {
                key,
                error: e.to_string(),
            }),
        }
    }

    pub fn success_count(&self) -> usize {
        self.succeeded.len()
    }

    pub fn fail_count(&self) -> usize {
        self.failed.len()
    }

    pub fn is_complete_success(&self) -> bool {
        self.failed.is_empty()
    }
}

impl<K: PartialEq> BatchReport<K> {
    pub fn failure_of(&self, key: &K) -> Option<&BatchFailure<K>> {
        self.failed.iter().find(|f| &f.key == key)
    }
}
