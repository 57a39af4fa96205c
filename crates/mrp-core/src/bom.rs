//! BOM 行模型

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 正規化物料ID（去除前後空白並轉大寫）
///
/// 所有查詢鍵、結果映射鍵都使用正規化後的ID。
pub fn normalize_id(raw: &str) -> String {
    raw.trim().to_ascii_uppercase()
}

/// BOM 行（父件 → 子件，含用量）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BomLine {
    /// 父件ID
    pub parent_id: String,

    /// 子件ID
    pub child_id: String,

    /// 用量（每單位父件所需子件數量）
    pub multiplier: Decimal,
}

impl BomLine {
    /// 創建新的 BOM 行，ID 會被正規化，負用量視為 0
    pub fn new(parent_id: &str, child_id: &str, multiplier: Decimal) -> Self {
        Self {
            parent_id: normalize_id(parent_id),
            child_id: normalize_id(child_id),
            multiplier: multiplier.max(Decimal::ZERO),
        }
    }
}
