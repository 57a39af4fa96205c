//! 需求模型

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::bom::normalize_id;

/// 成品（PT）需求，BOM 展開的根
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Demand {
    /// 需求ID
    pub id: Uuid,

    /// 成品ID
    pub component_id: String,

    /// 需求數量
    pub quantity: Decimal,

    /// 來源單據（如銷售訂單號）
    pub source_ref: Option<String>,
}

impl Demand {
    /// 創建新的需求，負數量視為 0
    pub fn new(component_id: &str, quantity: Decimal) -> Self {
        Self {
            id: Uuid::new_v4(),
            component_id: normalize_id(component_id),
            quantity: quantity.max(Decimal::ZERO),
            source_ref: None,
        }
    }

    /// 建構器模式：設置來源單據
    pub fn with_source_ref(mut self, source_ref: String) -> Self {
        self.source_ref = Some(source_ref);
        self
    }
}
