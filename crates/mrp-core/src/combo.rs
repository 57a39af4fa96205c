//! 組合（Combo）模型
//!
//! 一個組合是一次生產批次，同時產出多種物料的固定數量。

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::bom::normalize_id;

/// 組合產出行（資料來源的原始列）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComboOutputLine {
    /// 組合名稱
    pub combo: String,

    /// 產出物料ID
    pub component_id: String,

    /// 每批產出數量
    pub qty_per_combo: Decimal,
}

impl ComboOutputLine {
    pub fn new(combo: &str, component_id: &str, qty_per_combo: Decimal) -> Self {
        Self {
            combo: combo.trim().to_string(),
            component_id: normalize_id(component_id),
            qty_per_combo: qty_per_combo.max(Decimal::ZERO),
        }
    }
}

/// 組合週期時間
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComboCycleTime {
    /// 組合名稱
    pub combo: String,

    /// 每批週期（分鐘）
    pub minutes: Decimal,
}

/// 主要組合指定（每個參照一筆，持久化於資料來源）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimaryComboLine {
    pub component_id: String,
    pub combo: String,
}

impl PrimaryComboLine {
    pub fn new(component_id: &str, combo: &str) -> Self {
        Self {
            component_id: normalize_id(component_id),
            combo: combo.trim().to_string(),
        }
    }
}

/// 組合的單一產出
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComboOutput {
    pub component_id: String,
    pub qty_per_combo: Decimal,
}

/// 組合定義
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComboDefinition {
    /// 組合名稱
    pub name: String,

    /// 每批週期（分鐘），未知時為 0
    pub cycle_time_minutes: Decimal,

    /// 產出列表
    pub outputs: Vec<ComboOutput>,
}

impl ComboDefinition {
    /// 創建新的組合定義
    pub fn new(name: &str) -> Self {
        Self {
            name: name.trim().to_string(),
            cycle_time_minutes: Decimal::ZERO,
            outputs: Vec::new(),
        }
    }

    /// 建構器模式：設置週期時間
    pub fn with_cycle_time(mut self, minutes: Decimal) -> Self {
        self.cycle_time_minutes = minutes.max(Decimal::ZERO);
        self
    }

    /// 建構器模式：添加產出
    pub fn with_output(mut self, component_id: &str, qty_per_combo: Decimal) -> Self {
        self.add_output(component_id, qty_per_combo);
        self
    }

    /// 添加產出；同一物料重複出現時數量累加
    pub fn add_output(&mut self, component_id: &str, qty_per_combo: Decimal) {
        let component_id = normalize_id(component_id);
        let qty = qty_per_combo.max(Decimal::ZERO);
        match self
            .outputs
            .iter_mut()
            .find(|o| o.component_id == component_id)
        {
            Some(existing) => existing.qty_per_combo += qty,
            None => self.outputs.push(ComboOutput {
                component_id,
                qty_per_combo: qty,
            }),
        }
    }

    /// 每批產出該物料的數量（不產出時為 0）
    pub fn qty_per_combo(&self, component_id: &str) -> Decimal {
        self.outputs
            .iter()
            .find(|o| o.component_id == component_id)
            .map(|o| o.qty_per_combo)
            .unwrap_or(Decimal::ZERO)
    }

    /// 檢查組合是否產出該物料
    pub fn produces(&self, component_id: &str) -> bool {
        self.qty_per_combo(component_id) > Decimal::ZERO
    }
}
