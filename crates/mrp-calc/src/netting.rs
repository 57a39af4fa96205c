//! 淨需求計算
//!
//! 以現有庫存沖銷展開後的需求，並依最低/最高庫存分類警示。

use std::collections::HashMap;

use mrp_core::InventoryRecord;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 庫存警示狀態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    /// 庫存足夠且在閾值內
    Ok,
    /// 庫存足夠，但扣除後低於最低庫存或現有庫存超過最高庫存
    Warning,
    /// 庫存不足，需要生產
    Error,
}

/// 單一物料的庫存分析
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentAnalysis {
    /// 物料ID
    pub component_id: String,

    /// 展開後的原始需求
    pub requirement: Decimal,

    /// 需求（向上取整）
    pub required: Decimal,

    /// 現有庫存
    pub on_hand: Decimal,

    /// 需生產數量
    pub to_produce: Decimal,

    /// 扣除需求後的庫存（可為負）
    pub remaining_after: Decimal,

    pub min_threshold: Option<Decimal>,
    pub max_threshold: Option<Decimal>,

    /// 警示狀態
    pub status: AlertStatus,
}

/// 需生產的物料
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductionRequirement {
    pub component_id: String,
    pub to_produce: Decimal,
}

/// 淨需求計算結果
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NettingResult {
    /// 需生產的物料（to_produce > 0），供下游組合分配使用
    pub production: Vec<ProductionRequirement>,

    /// 全部物料的分析（包含 ok）
    pub analysis: Vec<ComponentAnalysis>,
}

impl NettingResult {
    /// 物料的需生產數量（未出現時為 0）
    pub fn to_produce(&self, component_id: &str) -> Decimal {
        self.production
            .iter()
            .find(|p| p.component_id == component_id)
            .map(|p| p.to_produce)
            .unwrap_or(Decimal::ZERO)
    }

    /// 查找物料分析
    pub fn analysis_for(&self, component_id: &str) -> Option<&ComponentAnalysis> {
        self.analysis.iter().find(|a| a.component_id == component_id)
    }

    /// 指定狀態的物料數量
    pub fn count_by_status(&self, status: AlertStatus) -> usize {
        self.analysis.iter().filter(|a| a.status == status).count()
    }
}

/// 淨需求計算器
pub struct NettingCalculator;

impl NettingCalculator {
    /// 計算淨需求
    ///
    /// 沒有庫存記錄的物料視為現有庫存 0、無閾值。
    pub fn calculate(
        requirements: &HashMap<String, Decimal>,
        inventory: &HashMap<String, InventoryRecord>,
    ) -> NettingResult {
        let mut component_ids: Vec<&String> = requirements.keys().collect();
        component_ids.sort();

        let mut result = NettingResult::default();
        for component_id in component_ids {
            let analysis = Self::analyze_component(
                component_id,
                requirements[component_id],
                inventory.get(component_id),
            );

            if analysis.to_produce > Decimal::ZERO {
                result.production.push(ProductionRequirement {
                    component_id: analysis.component_id.clone(),
                    to_produce: analysis.to_produce,
                });
            }
            result.analysis.push(analysis);
        }

        tracing::debug!(
            "淨需求計算完成: {} 個物料, {} 個需生產, {} 個警告",
            result.analysis.len(),
            result.production.len(),
            result.count_by_status(AlertStatus::Warning)
        );

        result
    }

    /// 分析單一物料
    pub fn analyze_component(
        component_id: &str,
        requirement: Decimal,
        inventory: Option<&InventoryRecord>,
    ) -> ComponentAnalysis {
        let required = requirement.max(Decimal::ZERO).ceil();
        let on_hand = inventory.map(|r| r.on_hand).unwrap_or(Decimal::ZERO);
        let to_produce = (required - on_hand).max(Decimal::ZERO);
        let remaining_after = on_hand - required;

        let status = if to_produce > Decimal::ZERO {
            AlertStatus::Error
        } else if inventory
            .map(|r| r.is_below_min_after(remaining_after) || r.is_above_max())
            .unwrap_or(false)
        {
            AlertStatus::Warning
        } else {
            AlertStatus::Ok
        };

        ComponentAnalysis {
            component_id: component_id.to_string(),
            requirement,
            required,
            on_hand,
            to_produce,
            remaining_after,
            min_threshold: inventory.and_then(|r| r.min_threshold),
            max_threshold: inventory.and_then(|r| r.max_threshold),
            status,
        }
    }
}
