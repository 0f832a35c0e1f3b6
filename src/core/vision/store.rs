use super::config::ScoringConfig;
use super::error::FinderError;
use super::scorer::{estimate_proximity, ProximityEstimate};
use super::signature::{now_ms, VisualSignature};
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// 用户"教"过的物品
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearnedItem {
    pub id: u64,
    pub name: Option<String>,
    pub signature: VisualSignature,
    pub created_at_ms: u64,
}

/// 已学习特征的存储
///
/// 由调用方持有并显式传入（不是全局单例），多个寻物会话或测试互不影响。
/// 只在内存中，持久化由 App 通过 [`SignatureStore::to_json`] 自行完成。
#[derive(Debug, Default)]
pub struct SignatureStore {
    items: Vec<LearnedItem>,
    next_id: u64,
}

#[derive(Serialize, Deserialize)]
struct StoreSnapshot {
    items: Vec<LearnedItem>,
}

impl SignatureStore {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            next_id: 1,
        }
    }

    /// 追加一条记录，不做相似度去重
    pub fn teach(
        &mut self,
        signature: VisualSignature,
        name: Option<String>,
    ) -> Result<LearnedItem, FinderError> {
        let id = self.next_id.max(1);
        self.next_id = id.checked_add(1).ok_or(FinderError::IdExhausted)?;

        let item = LearnedItem {
            id,
            name: name.filter(|n| !n.trim().is_empty()),
            signature,
            created_at_ms: now_ms(),
        };
        info!(
            "📚 Learned item #{} ({:?}), store size {}",
            item.id,
            item.name,
            self.items.len() + 1
        );
        self.items.push(item.clone());
        Ok(item)
    }

    /// 按插入顺序
    pub fn list(&self) -> &[LearnedItem] {
        &self.items
    }

    pub fn get(&self, id: u64) -> Option<&LearnedItem> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn remove(&mut self, id: u64) -> bool {
        let before = self.items.len();
        self.items.retain(|item| item.id != id);
        let removed = self.items.len() != before;
        if removed {
            info!("🗑️ Forgot item #{}", id);
        }
        removed
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn signatures(&self) -> Vec<VisualSignature> {
        self.items.iter().map(|item| item.signature.clone()).collect()
    }

    /// 与全部已学习物品比较；`best_index` 对应 [`SignatureStore::list`] 的下标
    pub fn estimate(
        &self,
        live: &VisualSignature,
        config: &ScoringConfig,
    ) -> Result<ProximityEstimate, FinderError> {
        estimate_proximity(live, &self.signatures(), config)
    }

    pub fn to_json(&self) -> Result<String, FinderError> {
        let snapshot = StoreSnapshot {
            items: self.items.clone(),
        };
        Ok(serde_json::to_string(&snapshot)?)
    }

    /// 从快照恢复；导入的特征先校验，新 id 接在最大 id 之后
    ///
    /// id 重复或没有后续 id 可分配的快照整体拒绝。
    pub fn from_json(json: &str) -> Result<Self, FinderError> {
        let snapshot: StoreSnapshot = serde_json::from_str(json)?;
        let mut seen = HashSet::with_capacity(snapshot.items.len());
        for item in &snapshot.items {
            if !seen.insert(item.id) {
                return Err(FinderError::InvalidSnapshot(format!(
                    "duplicate item id {}",
                    item.id
                )));
            }
            item.signature.validate()?;
        }

        let max_id = snapshot.items.iter().map(|item| item.id).max().unwrap_or(0);
        let next_id = max_id.checked_add(1).ok_or_else(|| {
            FinderError::InvalidSnapshot(format!("item id {} leaves no room for new items", max_id))
        })?;
        Ok(Self {
            items: snapshot.items,
            next_id,
        })
    }
}
