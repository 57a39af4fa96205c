//! 庫存模型

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::bom::normalize_id;

/// 庫存記錄
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryRecord {
    /// 物料ID
    pub component_id: String,

    /// 現有庫存
    pub on_hand: Decimal,

    /// 最低庫存（低於此值發出警告）
    pub min_threshold: Option<Decimal>,

    /// 最高庫存（高於此值發出警告）
    pub max_threshold: Option<Decimal>,
}

impl InventoryRecord {
    /// 創建新的庫存記錄，負庫存視為 0
    pub fn new(component_id: &str, on_hand: Decimal) -> Self {
        Self {
            component_id: normalize_id(component_id),
            on_hand: on_hand.max(Decimal::ZERO),
            min_threshold: None,
            max_threshold: None,
        }
    }

    /// 建構器模式：設置最低庫存
    pub fn with_min_threshold(mut self, min: Decimal) -> Self {
        self.min_threshold = Some(min);
        self
    }

    /// 建構器模式：設置最高庫存
    pub fn with_max_threshold(mut self, max: Decimal) -> Self {
        self.max_threshold = Some(max);
        self
    }

    /// 扣除需求後是否低於最低庫存
    pub fn is_below_min_after(&self, remaining_after: Decimal) -> bool {
        self.min_threshold
            .map(|min| remaining_after < min)
            .unwrap_or(false)
    }

    /// 現有庫存是否超過最高庫存
    pub fn is_above_max(&self) -> bool {
        self.max_threshold
            .map(|max| self.on_hand > max)
            .unwrap_or(false)
    }
}
