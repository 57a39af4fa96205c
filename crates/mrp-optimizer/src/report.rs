//! 匯入比較報表

use std::collections::HashMap;
use std::io;

use chrono::{DateTime, Utc};
use mrp_core::{MrpError, ReferenceAllocation};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::optimizer::compute_production;

/// 比較狀態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComparisonStatus {
    #[serde(rename = "Cumple")]
    Satisfied,
    #[serde(rename = "Insuficiente")]
    Insufficient,
}

/// 匯入後套用到參照的一列
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedRow {
    pub reference_id: String,
    pub combo: String,
    pub quantity: u64,
}

/// 報表列
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonRow {
    pub reference: String,
    pub required: Decimal,

    /// 最後套用到此參照的匯入批數（未匯入為 0）
    pub csv_quantity: u64,

    /// 套用匯入後的總產量
    pub csv_production: Decimal,

    /// 匯入前的批數
    pub current_quantity: u64,

    /// 套用匯入後的總產量 - 需求
    pub difference: Decimal,
    pub status: ComparisonStatus,
    pub combo_used: String,
}

/// 報表合計
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportTotals {
    pub count: usize,
    pub sum_difference: Decimal,
    pub satisfied: usize,
    pub insufficient: usize,
}

/// 比較報表
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonReport {
    pub rows: Vec<ComparisonRow>,
    pub totals: ReportTotals,
    pub generated_at: DateTime<Utc>,
}

impl ComparisonReport {
    /// 以匯入前後的分配建立報表
    pub fn build(
        previous: &[ReferenceAllocation],
        current: &[ReferenceAllocation],
        applied: &[AppliedRow],
    ) -> Self {
        let production = compute_production(current);
        let previous_quantity: HashMap<&str, u64> = previous
            .iter()
            .map(|a| (a.reference_id.as_str(), a.quantity_to_produce))
            .collect();

        // 同一參照被多列套用時，以最後一列為準
        let csv_quantity: HashMap<&str, u64> = applied
            .iter()
            .map(|row| (row.reference_id.as_str(), row.quantity))
            .collect();

        let mut totals = ReportTotals::default();
        let rows: Vec<ComparisonRow> = current
            .iter()
            .map(|allocation| {
                let reference = allocation.reference_id.as_str();
                let produced = production.get(reference).copied().unwrap_or(Decimal::ZERO);
                let difference = produced - allocation.total_required;
                let status = if difference >= Decimal::ZERO {
                    totals.satisfied += 1;
                    ComparisonStatus::Satisfied
                } else {
                    totals.insufficient += 1;
                    ComparisonStatus::Insufficient
                };
                totals.count += 1;
                totals.sum_difference = totals.sum_difference.saturating_add(difference);

                ComparisonRow {
                    reference: reference.to_string(),
                    required: allocation.total_required,
                    csv_quantity: csv_quantity.get(reference).copied().unwrap_or(0),
                    csv_production: produced,
                    current_quantity: previous_quantity
                        .get(reference)
                        .copied()
                        .unwrap_or(allocation.quantity_to_produce),
                    difference,
                    status,
                    combo_used: allocation.selected_combo.clone(),
                }
            })
            .collect();

        Self {
            rows,
            totals,
            generated_at: Utc::now(),
        }
    }

    /// 不足的列
    pub fn insufficient_rows(&self) -> impl Iterator<Item = &ComparisonRow> {
        self.rows
            .iter()
            .filter(|r| r.status == ComparisonStatus::Insufficient)
    }

    /// 輸出 CSV（含標題列）
    pub fn write_csv<W: io::Write>(&self, writer: W) -> mrp_core::Result<()> {
        let mut writer = csv::Writer::from_writer(writer);
        for row in &self.rows {
            writer
                .serialize(row)
                .map_err(|e| MrpError::Export(e.to_string()))?;
        }
        writer.flush().map_err(|e| MrpError::Export(e.to_string()))?;
        Ok(())
    }
}
