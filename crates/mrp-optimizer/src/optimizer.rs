//! 組合批數優化
//!
//! 固定點迭代：每輪補足缺口、削減安全的過剩，直到一整輪沒有變化
//! 或達到迭代上限。產量在輪內隨每次調整即時更新。削減時任何已有
//! 需求的物料都不會因此低於需求，所以總缺口逐輪不增。

use std::collections::HashMap;

use mrp_core::{batch_output, ceil_batches, floor_batches, ComboOutput, EngineConfig, ReferenceAllocation};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 計算每個物料的總產量（所有批數大於 0 的參照選定組合之和）
///
/// 超出範圍的產量飽和為 `Decimal::MAX`。
pub fn compute_production(allocations: &[ReferenceAllocation]) -> HashMap<String, Decimal> {
    let mut production: HashMap<String, Decimal> = HashMap::new();
    for allocation in allocations.iter().filter(|a| a.quantity_to_produce > 0) {
        if let Some(combo) = allocation.selected_definition() {
            for output in &combo.outputs {
                let total = production
                    .entry(output.component_id.clone())
                    .or_insert(Decimal::ZERO);
                *total = total.saturating_add(batch_output(
                    output.qty_per_combo,
                    allocation.quantity_to_produce,
                ));
            }
        }
    }
    production
}

/// 全部分配的總批數（飽和加總）
pub fn total_batches<'a>(allocations: impl IntoIterator<Item = &'a ReferenceAllocation>) -> u64 {
    allocations
        .into_iter()
        .fold(0u64, |sum, a| sum.saturating_add(a.quantity_to_produce))
}

/// 單輪摘要
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PassSummary {
    /// 輪次（從 1 開始）
    pub pass: usize,

    /// 本輪調整的參照數
    pub changes: usize,

    /// 本輪結束時的總批數
    pub total_batches: u64,

    /// 本輪結束時的總缺口
    pub total_deficit: Decimal,
}

/// 剩餘缺口
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResidualDeficit {
    pub component_id: String,
    pub required: Decimal,
    pub produced: Decimal,
    pub deficit: Decimal,
}

/// 收斂報告
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvergenceReport {
    /// 使用的輪數
    pub passes_used: usize,

    /// 是否在上限內達到一整輪無變化
    pub converged: bool,

    /// 優化前的總缺口
    pub initial_deficit: Decimal,

    /// 每輪摘要
    pub passes: Vec<PassSummary>,

    /// 結束時仍有缺口的物料
    pub residual_deficits: Vec<ResidualDeficit>,

    /// 批數達到 `u64::MAX` 上限的參照
    pub saturated: Vec<String>,
}

impl ConvergenceReport {
    /// 是否需要呼叫端處理（未收斂、仍有缺口或批數飽和）
    pub fn needs_attention(&self) -> bool {
        !self.converged || !self.residual_deficits.is_empty() || !self.saturated.is_empty()
    }

    /// 全部輪次的調整總數
    pub fn total_changes(&self) -> usize {
        self.passes.iter().map(|p| p.changes).sum()
    }

    /// 結束時的總批數
    pub fn final_batches(&self) -> u64 {
        self.passes.last().map(|p| p.total_batches).unwrap_or(0)
    }
}

/// 組合批數優化器
#[derive(Debug, Clone, Copy)]
pub struct ComboOptimizer {
    max_passes: usize,
}

impl Default for ComboOptimizer {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

impl ComboOptimizer {
    pub fn new(max_passes: usize) -> Self {
        Self {
            max_passes: max_passes.max(1),
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.max_optimization_passes)
    }

    /// 優化分配的批數
    ///
    /// 達到上限仍未收斂時返回目前最佳結果，報告中 `converged = false`。
    pub fn optimize(&self, allocations: &mut [ReferenceAllocation]) -> ConvergenceReport {
        let requirements = requirement_map(allocations);
        let initial_deficit = total_deficit(&requirements, &compute_production(allocations));

        let mut passes = Vec::new();
        let mut converged = false;

        for pass in 1..=self.max_passes {
            let mut production = compute_production(allocations);
            let mut changes = 0;

            for allocation in allocations.iter_mut() {
                if adjust(allocation, &requirements, &mut production) {
                    changes += 1;
                }
            }

            let summary = PassSummary {
                pass,
                changes,
                total_batches: total_batches(allocations.iter()),
                total_deficit: total_deficit(&requirements, &production),
            };
            tracing::debug!(
                "優化第 {} 輪: 調整 {} 個, 總批數 {}, 總缺口 {}",
                pass,
                summary.changes,
                summary.total_batches,
                summary.total_deficit
            );
            passes.push(summary);

            if changes == 0 {
                converged = true;
                break;
            }
        }

        let production = compute_production(allocations);
        let mut residual_deficits: Vec<ResidualDeficit> = requirements
            .iter()
            .filter_map(|(component_id, required)| {
                let produced = production.get(component_id).copied().unwrap_or(Decimal::ZERO);
                (produced < *required).then(|| ResidualDeficit {
                    component_id: component_id.clone(),
                    required: *required,
                    produced,
                    deficit: *required - produced,
                })
            })
            .collect();
        residual_deficits.sort_by(|a, b| a.component_id.cmp(&b.component_id));

        let saturated: Vec<String> = allocations
            .iter()
            .filter(|a| a.quantity_to_produce == u64::MAX)
            .map(|a| a.reference_id.clone())
            .collect();

        let report = ConvergenceReport {
            passes_used: passes.len(),
            converged,
            initial_deficit,
            passes,
            residual_deficits,
            saturated,
        };

        if report.needs_attention() {
            tracing::warn!(
                "組合優化未完全滿足: 收斂={}, 輪數={}, 缺口物料 {} 個, 批數飽和 {} 個",
                report.converged,
                report.passes_used,
                report.residual_deficits.len(),
                report.saturated.len()
            );
        } else {
            tracing::info!(
                "組合優化收斂: {} 輪, 總批數 {}",
                report.passes_used,
                report.final_batches()
            );
        }

        report
    }
}

/// 參照ID → 需求（只含需求大於 0 者）
fn requirement_map(allocations: &[ReferenceAllocation]) -> HashMap<String, Decimal> {
    let mut requirements = HashMap::new();
    for allocation in allocations {
        if allocation.total_required > Decimal::ZERO {
            requirements
                .entry(allocation.reference_id.clone())
                .or_insert(allocation.total_required);
        }
    }
    requirements
}

fn total_deficit(requirements: &HashMap<String, Decimal>, production: &HashMap<String, Decimal>) -> Decimal {
    requirements
        .iter()
        .map(|(id, required)| {
            let produced = production.get(id).copied().unwrap_or(Decimal::ZERO);
            (*required - produced).max(Decimal::ZERO)
        })
        .fold(Decimal::ZERO, Decimal::saturating_add)
}

/// 調整單一參照，返回是否有變化
fn adjust(
    allocation: &mut ReferenceAllocation,
    requirements: &HashMap<String, Decimal>,
    production: &mut HashMap<String, Decimal>,
) -> bool {
    let outputs: Vec<ComboOutput> = allocation
        .selected_definition()
        .map(|c| c.outputs.clone())
        .unwrap_or_default();

    if allocation.total_required <= Decimal::ZERO {
        if allocation.quantity_to_produce == 0 {
            return false;
        }
        let removed = allocation.quantity_to_produce;
        apply_delta(production, &outputs, removed, true);
        allocation.quantity_to_produce = 0;
        return true;
    }

    let qty_per_combo = allocation.qty_per_selected();
    if qty_per_combo <= Decimal::ZERO {
        return false;
    }

    let produced = production
        .get(&allocation.reference_id)
        .copied()
        .unwrap_or(Decimal::ZERO);
    let deficit = allocation.total_required - produced;

    if deficit > Decimal::ZERO {
        let before = allocation.quantity_to_produce;
        allocation.quantity_to_produce = before.saturating_add(ceil_batches(deficit, qty_per_combo));
        let add = allocation.quantity_to_produce - before;
        apply_delta(production, &outputs, add, false);
        return add > 0;
    }

    if deficit < Decimal::ZERO && allocation.quantity_to_produce > 0 {
        let mut cut = floor_batches(-deficit, qty_per_combo).min(allocation.quantity_to_produce);

        // 共產物料也不能因削減而低於需求
        for output in &outputs {
            if cut == 0 {
                break;
            }
            if output.component_id == allocation.reference_id || output.qty_per_combo <= Decimal::ZERO {
                continue;
            }
            if let Some(required) = requirements.get(&output.component_id) {
                let produced = production
                    .get(&output.component_id)
                    .copied()
                    .unwrap_or(Decimal::ZERO);
                cut = cut.min(floor_batches(produced - *required, output.qty_per_combo));
            }
        }

        if cut > 0 {
            allocation.quantity_to_produce -= cut;
            apply_delta(production, &outputs, cut, true);
            return true;
        }
    }

    false
}

fn apply_delta(production: &mut HashMap<String, Decimal>, outputs: &[ComboOutput], batches: u64, remove: bool) {
    for output in outputs {
        let delta = batch_output(output.qty_per_combo, batches);
        let total = production
            .entry(output.component_id.clone())
            .or_insert(Decimal::ZERO);
        *total = if remove {
            total.saturating_sub(delta).max(Decimal::ZERO)
        } else {
            total.saturating_add(delta)
        };
    }
}
