//! 參照分配模型
//!
//! 參照分配（Reference Allocation）是使用者可調整的最小單位：
//! 一個需要生產的物料、可用的組合、目前選定的組合與批數。

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::bom::normalize_id;
use crate::combo::ComboDefinition;
use crate::{MrpError, Result};

/// 選定組合的來源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComboSelectionSource {
    /// 資料來源持久化的主要組合
    Primary,
    /// 名稱相似度推測
    NameMatch,
    /// 第一個可用組合
    FirstAvailable,
    /// 使用者手動選擇
    Manual,
    /// 匯入檔覆寫
    Imported,
}

impl ComboSelectionSource {
    /// 是否為推測結果（可能選錯）
    pub fn is_heuristic(&self) -> bool {
        matches!(self, Self::NameMatch | Self::FirstAvailable)
    }
}

/// 參照分配
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceAllocation {
    /// 參照（物料）ID
    pub reference_id: String,

    /// 總需求（淨需求）
    pub total_required: Decimal,

    /// 可產出此參照的組合
    pub available_combos: Vec<ComboDefinition>,

    /// 目前選定的組合名稱
    pub selected_combo: String,

    /// 選定來源
    pub selection_source: ComboSelectionSource,

    /// 計劃生產批數
    pub quantity_to_produce: u64,
}

impl ReferenceAllocation {
    /// 創建新的參照分配，選定組合必須產出該參照
    pub fn new(
        reference_id: &str,
        total_required: Decimal,
        available_combos: Vec<ComboDefinition>,
        selected_combo: &str,
        selection_source: ComboSelectionSource,
    ) -> Result<Self> {
        let mut allocation = Self {
            reference_id: normalize_id(reference_id),
            total_required: total_required.max(Decimal::ZERO),
            available_combos,
            selected_combo: String::new(),
            selection_source,
            quantity_to_produce: 0,
        };
        allocation.select_combo(selected_combo, selection_source)?;
        allocation.quantity_to_produce = allocation.suggested_quantity();
        Ok(allocation)
    }

    /// 建構器模式：設置批數
    pub fn with_quantity(mut self, quantity_to_produce: u64) -> Self {
        self.quantity_to_produce = quantity_to_produce;
        self
    }

    /// 檢查組合是否可用於此參照
    pub fn can_use(&self, combo: &str) -> bool {
        self.available_combo(combo).is_some()
    }

    /// 查找可用組合
    pub fn available_combo(&self, combo: &str) -> Option<&ComboDefinition> {
        let combo = combo.trim();
        self.available_combos
            .iter()
            .find(|c| c.name == combo && c.produces(&self.reference_id))
    }

    /// 目前選定的組合定義
    pub fn selected_definition(&self) -> Option<&ComboDefinition> {
        self.available_combo(&self.selected_combo)
    }

    /// 選定組合每批產出此參照的數量
    pub fn qty_per_selected(&self) -> Decimal {
        self.selected_definition()
            .map(|c| c.qty_per_combo(&self.reference_id))
            .unwrap_or(Decimal::ZERO)
    }

    /// 切換選定組合（不重新計算批數）
    pub fn select_combo(&mut self, combo: &str, source: ComboSelectionSource) -> Result<()> {
        if !self.can_use(combo) {
            return Err(MrpError::ComboNotAvailable {
                reference: self.reference_id.clone(),
                combo: combo.trim().to_string(),
            });
        }
        self.selected_combo = combo.trim().to_string();
        self.selection_source = source;
        Ok(())
    }

    /// 以選定組合滿足全部需求的建議批數
    pub fn suggested_quantity(&self) -> u64 {
        ceil_batches(self.total_required, self.qty_per_selected())
    }

    /// 本參照的批數所產出的指定物料數量
    pub fn production_of(&self, component_id: &str) -> Decimal {
        if self.quantity_to_produce == 0 {
            return Decimal::ZERO;
        }
        self.selected_definition()
            .map(|c| batch_output(c.qty_per_combo(component_id), self.quantity_to_produce))
            .unwrap_or(Decimal::ZERO)
    }
}

/// 批數的產量，超出範圍時飽和為 `Decimal::MAX`
pub fn batch_output(qty_per_combo: Decimal, batches: u64) -> Decimal {
    qty_per_combo.saturating_mul(Decimal::from(batches))
}

/// 覆蓋數量所需的最少批數（向上取整），每批產出為 0 時返回 0
///
/// 超出 `u64` 時飽和為 `u64::MAX`。
pub fn ceil_batches(quantity: Decimal, per_batch: Decimal) -> u64 {
    if quantity <= Decimal::ZERO || per_batch <= Decimal::ZERO {
        return 0;
    }
    (quantity / per_batch).ceil().to_u64().unwrap_or(u64::MAX)
}

/// 數量可容納的完整批數（向下取整），每批產出為 0 時返回 0
pub fn floor_batches(quantity: Decimal, per_batch: Decimal) -> u64 {
    if quantity <= Decimal::ZERO || per_batch <= Decimal::ZERO {
        return 0;
    }
    (quantity / per_batch).floor().to_u64().unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn combo_x() -> ComboDefinition {
        ComboDefinition::new("CMB.X")
            .with_output("REF1", Decimal::from(5))
            .with_output("REF2", Decimal::from(3))
    }

    fn combo_y() -> ComboDefinition {
        ComboDefinition::new("CMB.Y").with_output("REF1", Decimal::from(10))
    }

    #[test]
    fn test_new_allocation_suggests_quantity() {
        let allocation = ReferenceAllocation::new(
            "ref1",
            Decimal::from(37),
            vec![combo_x(), combo_y()],
            "CMB.X",
            ComboSelectionSource::Primary,
        )
        .unwrap();

        assert_eq!(allocation.reference_id, "REF1");
        assert_eq!(allocation.qty_per_selected(), Decimal::from(5));
        // 37 / 5 = 7.4 → 8
        assert_eq!(allocation.quantity_to_produce, 8);
        assert_eq!(allocation.production_of("REF2"), Decimal::from(24));
    }

    #[test]
    fn test_select_combo_rejects_unavailable() {
        let mut allocation = ReferenceAllocation::new(
            "REF2",
            Decimal::from(10),
            vec![combo_x()],
            "CMB.X",
            ComboSelectionSource::FirstAvailable,
        )
        .unwrap();

        // CMB.Y 不產出 REF2
        let err = allocation
            .select_combo("CMB.Y", ComboSelectionSource::Manual)
            .unwrap_err();
        assert!(matches!(err, MrpError::ComboNotAvailable { .. }));
        assert_eq!(allocation.selected_combo, "CMB.X");
    }

    #[test]
    fn test_new_allocation_rejects_combo_without_reference() {
        let result = ReferenceAllocation::new(
            "REF2",
            Decimal::from(10),
            vec![combo_y()],
            "CMB.Y",
            ComboSelectionSource::Manual,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_batch_rounding() {
        assert_eq!(ceil_batches(Decimal::from(100), Decimal::from(30)), 4);
        assert_eq!(ceil_batches(Decimal::from(90), Decimal::from(30)), 3);
        assert_eq!(ceil_batches(Decimal::ZERO, Decimal::from(30)), 0);
        assert_eq!(ceil_batches(Decimal::from(10), Decimal::ZERO), 0);
        assert_eq!(floor_batches(Decimal::from(23), Decimal::from(5)), 4);
        assert_eq!(floor_batches(Decimal::from(3), Decimal::from(5)), 0);
    }

    #[test]
    fn test_batch_arithmetic_saturates() {
        assert_eq!(ceil_batches(Decimal::MAX, Decimal::ONE), u64::MAX);
        assert_eq!(batch_output(Decimal::from(5), 4), Decimal::from(20));
        assert_eq!(batch_output(Decimal::MAX, u64::MAX), Decimal::MAX);
    }

    #[test]
    fn test_heuristic_sources() {
        assert!(ComboSelectionSource::NameMatch.is_heuristic());
        assert!(ComboSelectionSource::FirstAvailable.is_heuristic());
        assert!(!ComboSelectionSource::Primary.is_heuristic());
        assert!(!ComboSelectionSource::Manual.is_heuristic());
    }
}
