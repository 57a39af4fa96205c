//! 彙總視圖
//!
//! 依參照與依組合兩種角度檢視目前的分配，都只讀取分配集合。

use std::collections::HashMap;

use mrp_core::{batch_output, normalize_id, MrpError, ReferenceAllocation};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::optimizer::{compute_production, total_batches};

/// 某個分配對參照產量的貢獻
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contribution {
    /// 貢獻來源的參照
    pub source_reference: String,
    pub combo: String,
    pub batches: u64,
    pub qty_per_combo: Decimal,
    pub produced: Decimal,

    /// 是否為參照自己的分配
    pub is_own: bool,
}

/// 依參照檢視
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceView {
    pub reference_id: String,
    pub total_required: Decimal,
    pub contributions: Vec<Contribution>,
    pub own_production: Decimal,
    pub produced_by_others: Decimal,

    /// 扣除其他參照產量後仍需自行生產的數量
    pub adjusted_requirement: Decimal,
    pub total_production: Decimal,

    /// 自身產量 - 調整後需求（負數表示不足）
    pub difference: Decimal,
    pub is_satisfied: bool,
}

/// 依參照檢視單一參照
pub fn by_reference(
    allocations: &[ReferenceAllocation],
    reference_id: &str,
) -> mrp_core::Result<ReferenceView> {
    let reference_id = normalize_id(reference_id);
    let own = allocations
        .iter()
        .find(|a| a.reference_id == reference_id)
        .ok_or_else(|| MrpError::UnknownReference(reference_id.clone()))?;

    let contributions: Vec<Contribution> = allocations
        .iter()
        .filter(|a| a.quantity_to_produce > 0)
        .filter_map(|a| {
            let combo = a.selected_definition()?;
            let qty_per_combo = combo.qty_per_combo(&reference_id);
            (qty_per_combo > Decimal::ZERO).then(|| Contribution {
                source_reference: a.reference_id.clone(),
                combo: combo.name.clone(),
                batches: a.quantity_to_produce,
                qty_per_combo,
                produced: batch_output(qty_per_combo, a.quantity_to_produce),
                is_own: a.reference_id == reference_id,
            })
        })
        .collect();

    let own_production = contributions
        .iter()
        .filter(|c| c.is_own)
        .fold(Decimal::ZERO, |sum, c| sum.saturating_add(c.produced));
    let produced_by_others = contributions
        .iter()
        .filter(|c| !c.is_own)
        .fold(Decimal::ZERO, |sum, c| sum.saturating_add(c.produced));
    let adjusted_requirement = (own.total_required - produced_by_others).max(Decimal::ZERO);
    let total_production = own_production.saturating_add(produced_by_others);

    Ok(ReferenceView {
        reference_id,
        total_required: own.total_required,
        contributions,
        own_production,
        produced_by_others,
        adjusted_requirement,
        total_production,
        difference: own_production.saturating_sub(adjusted_requirement),
        is_satisfied: total_production >= own.total_required,
    })
}

/// 全部參照的視圖（依分配順序）
pub fn all_references(allocations: &[ReferenceAllocation]) -> Vec<ReferenceView> {
    allocations
        .iter()
        .filter_map(|a| by_reference(allocations, &a.reference_id).ok())
        .collect()
}

/// 組合內某參照的批數占比
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComboShare {
    pub reference_id: String,
    pub batches: u64,

    /// 占組合總批數的比例（0..=1）
    pub share: Decimal,
}

/// 組合的單一產出
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComboOutputView {
    pub component_id: String,
    pub qty_per_combo: Decimal,

    /// 本組合總批數的產量
    pub produced: Decimal,

    /// 該物料的需求（沒有分配時為 0）
    pub required: Decimal,

    /// 全部組合的總產量 - 需求
    pub difference: Decimal,
}

/// 依組合檢視
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComboGroupView {
    pub combo: String,
    pub cycle_time_minutes: Decimal,
    pub references: Vec<ComboShare>,
    pub total_batches: u64,
    pub outputs: Vec<ComboOutputView>,

    /// 總批數 × 週期時間
    pub estimated_minutes: Decimal,
}

impl ComboGroupView {
    /// 是否由多個參照共用
    pub fn is_shared(&self) -> bool {
        self.references.len() > 1
    }
}

/// 依選定組合分組（依組合名稱排序）
pub fn by_combo(allocations: &[ReferenceAllocation]) -> Vec<ComboGroupView> {
    let production = compute_production(allocations);
    let required: HashMap<&str, Decimal> = allocations
        .iter()
        .map(|a| (a.reference_id.as_str(), a.total_required))
        .collect();

    let mut groups: Vec<(&str, Vec<&ReferenceAllocation>)> = Vec::new();
    for allocation in allocations {
        if allocation.selected_definition().is_none() {
            continue;
        }
        match groups
            .iter_mut()
            .find(|(name, _)| *name == allocation.selected_combo)
        {
            Some((_, members)) => members.push(allocation),
            None => groups.push((allocation.selected_combo.as_str(), vec![allocation])),
        }
    }
    groups.sort_by(|a, b| a.0.cmp(b.0));

    groups
        .into_iter()
        .filter_map(|(_, members)| {
            let combo = members.first()?.selected_definition()?;
            let total_batches = total_batches(members.iter().copied());
            let total = Decimal::from(total_batches);

            let references = members
                .iter()
                .map(|a| ComboShare {
                    reference_id: a.reference_id.clone(),
                    batches: a.quantity_to_produce,
                    share: if total_batches == 0 {
                        Decimal::ZERO
                    } else {
                        Decimal::from(a.quantity_to_produce) / total
                    },
                })
                .collect();

            let outputs = combo
                .outputs
                .iter()
                .map(|output| {
                    let required = required
                        .get(output.component_id.as_str())
                        .copied()
                        .unwrap_or(Decimal::ZERO);
                    let total_produced = production
                        .get(&output.component_id)
                        .copied()
                        .unwrap_or(Decimal::ZERO);
                    ComboOutputView {
                        component_id: output.component_id.clone(),
                        qty_per_combo: output.qty_per_combo,
                        produced: batch_output(output.qty_per_combo, total_batches),
                        required,
                        difference: total_produced - required,
                    }
                })
                .collect();

            Some(ComboGroupView {
                combo: combo.name.clone(),
                cycle_time_minutes: combo.cycle_time_minutes,
                references,
                total_batches,
                outputs,
                estimated_minutes: batch_output(combo.cycle_time_minutes, total_batches),
            })
        })
        .collect()
}

/// 依目前占比把新總批數分配回各參照
///
/// 最大餘數法：先取整數部分，剩餘批數依小數部分由大到小補上（同值取前者），
/// 總和一定等於 `new_total`。目前總數為 0 時平均分配。
pub fn redistribute(current: &[u64], new_total: u64) -> Vec<u64> {
    if current.is_empty() {
        return Vec::new();
    }

    let n = current.len() as u128;
    let current_total: u128 = current.iter().map(|&q| q as u128).sum();
    let weights: Vec<u128> = if current_total == 0 {
        vec![1; current.len()]
    } else {
        current.iter().map(|&q| q as u128).collect()
    };
    let weight_total = if current_total == 0 { n } else { current_total };

    let target = new_total as u128;
    let mut result: Vec<u64> = Vec::with_capacity(current.len());
    let mut remainders: Vec<(usize, u128)> = Vec::with_capacity(current.len());
    for (i, weight) in weights.iter().enumerate() {
        let scaled = target * weight;
        result.push((scaled / weight_total) as u64);
        remainders.push((i, scaled % weight_total));
    }

    let assigned: u64 = result.iter().sum();
    let mut left = new_total - assigned;
    remainders.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    for (i, _) in remainders {
        if left == 0 {
            break;
        }
        result[i] += 1;
        left -= 1;
    }

    result
}
