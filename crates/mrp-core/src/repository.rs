//! 資料存取介面
//!
//! 核心只透過 [`MrpRepository`] 讀取 BOM、組合與庫存；重試與退避由
//! 實作者負責。[`MemoryRepository`] 是記憶體內的實作，供測試與示例使用。

use std::collections::HashMap;

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::bom::{normalize_id, BomLine};
use crate::combo::{ComboCycleTime, ComboOutputLine, PrimaryComboLine};
use crate::inventory::InventoryRecord;
use crate::Result;

/// MRP 資料來源
#[async_trait]
pub trait MrpRepository: Send + Sync {
    /// 查詢產品的 BOM 行（鍵不分大小寫、去除空白）；查無資料時返回空列表
    async fn get_bom_lines(&self, product_id: &str) -> Result<Vec<BomLine>>;

    /// 一次載入全部組合產出
    async fn get_all_combo_outputs(&self) -> Result<Vec<ComboOutputLine>>;

    /// 查詢指定組合的週期時間
    async fn get_combo_cycle_times(&self, combos: &[String]) -> Result<Vec<ComboCycleTime>>;

    /// 查詢指定物料的庫存
    async fn get_inventory(&self, component_ids: &[String]) -> Result<Vec<InventoryRecord>>;

    /// 查詢指定物料的主要組合指定
    async fn get_primary_combos(&self, _component_ids: &[String]) -> Result<Vec<PrimaryComboLine>> {
        Ok(Vec::new())
    }
}

/// 記憶體內資料來源
#[derive(Debug, Clone, Default)]
pub struct MemoryRepository {
    bom: HashMap<String, Vec<BomLine>>,
    combo_outputs: Vec<ComboOutputLine>,
    cycle_times: HashMap<String, Decimal>,
    inventory: HashMap<String, InventoryRecord>,
    primary_combos: HashMap<String, String>,
}

impl MemoryRepository {
    /// 創建空的資料來源
    pub fn new() -> Self {
        Self::default()
    }

    /// 建構器模式：添加 BOM 行
    pub fn with_bom_line(mut self, parent_id: &str, child_id: &str, multiplier: Decimal) -> Self {
        self.add_bom_line(BomLine::new(parent_id, child_id, multiplier));
        self
    }

    /// 建構器模式：添加組合產出
    pub fn with_combo_output(mut self, combo: &str, component_id: &str, qty: Decimal) -> Self {
        self.combo_outputs
            .push(ComboOutputLine::new(combo, component_id, qty));
        self
    }

    /// 建構器模式：設置組合週期時間
    pub fn with_cycle_time(mut self, combo: &str, minutes: Decimal) -> Self {
        self.cycle_times.insert(combo.trim().to_string(), minutes);
        self
    }

    /// 建構器模式：添加庫存記錄
    pub fn with_inventory(mut self, record: InventoryRecord) -> Self {
        self.inventory.insert(record.component_id.clone(), record);
        self
    }

    /// 建構器模式：指定主要組合
    pub fn with_primary_combo(mut self, component_id: &str, combo: &str) -> Self {
        self.primary_combos
            .insert(normalize_id(component_id), combo.trim().to_string());
        self
    }

    /// 添加 BOM 行
    pub fn add_bom_line(&mut self, line: BomLine) {
        self.bom
            .entry(line.parent_id.clone())
            .or_insert_with(Vec::new)
            .push(line);
    }
}

#[async_trait]
impl MrpRepository for MemoryRepository {
    async fn get_bom_lines(&self, product_id: &str) -> Result<Vec<BomLine>> {
        Ok(self
            .bom
            .get(&normalize_id(product_id))
            .cloned()
            .unwrap_or_default())
    }

    async fn get_all_combo_outputs(&self) -> Result<Vec<ComboOutputLine>> {
        Ok(self.combo_outputs.clone())
    }

    async fn get_combo_cycle_times(&self, combos: &[String]) -> Result<Vec<ComboCycleTime>> {
        Ok(combos
            .iter()
            .filter_map(|name| {
                self.cycle_times.get(name.trim()).map(|minutes| ComboCycleTime {
                    combo: name.trim().to_string(),
                    minutes: *minutes,
                })
            })
            .collect())
    }

    async fn get_inventory(&self, component_ids: &[String]) -> Result<Vec<InventoryRecord>> {
        Ok(component_ids
            .iter()
            .filter_map(|id| self.inventory.get(&normalize_id(id)).cloned())
            .collect())
    }

    async fn get_primary_combos(&self, component_ids: &[String]) -> Result<Vec<PrimaryComboLine>> {
        Ok(component_ids
            .iter()
            .filter_map(|id| {
                let id = normalize_id(id);
                self.primary_combos
                    .get(&id)
                    .map(|combo| PrimaryComboLine::new(&id, combo))
            })
            .collect())
    }
}
