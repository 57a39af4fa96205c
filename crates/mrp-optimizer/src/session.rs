//! 互動式分配調整
//!
//! 使用者的每個動作都對應一個方法；每次調整後視圖都從目前的分配重新計算。

use mrp_core::{ceil_batches, normalize_id, ComboSelectionSource, EngineConfig, MrpError, ReferenceAllocation};
use rust_decimal::Decimal;

use crate::import::ImportRow;
use crate::optimizer::{ComboOptimizer, ConvergenceReport};
use crate::report::{AppliedRow, ComparisonReport};
use crate::views::{self, ComboGroupView, ReferenceView};

/// 匯入套用結果
#[derive(Debug, Clone)]
pub struct ImportApplication {
    pub applied: Vec<AppliedRow>,

    /// 沒有任何參照可使用其組合的列數
    pub unmatched: usize,
    pub report: ComparisonReport,
}

/// 分配調整會話
#[derive(Debug, Clone)]
pub struct AllocationSession {
    allocations: Vec<ReferenceAllocation>,
    config: EngineConfig,
    last_convergence: Option<ConvergenceReport>,
    last_comparison: Option<ComparisonReport>,
}

impl AllocationSession {
    pub fn new(allocations: Vec<ReferenceAllocation>, config: EngineConfig) -> Self {
        Self {
            allocations,
            config,
            last_convergence: None,
            last_comparison: None,
        }
    }

    /// 目前的分配
    pub fn allocations(&self) -> &[ReferenceAllocation] {
        &self.allocations
    }

    pub fn allocation(&self, reference_id: &str) -> Option<&ReferenceAllocation> {
        let reference_id = normalize_id(reference_id);
        self.allocations.iter().find(|a| a.reference_id == reference_id)
    }

    /// 最近一次優化的收斂報告
    pub fn last_convergence(&self) -> Option<&ConvergenceReport> {
        self.last_convergence.as_ref()
    }

    /// 最近一次匯入的比較報表
    pub fn last_comparison(&self) -> Option<&ComparisonReport> {
        self.last_comparison.as_ref()
    }

    fn allocation_mut(&mut self, reference_id: &str) -> mrp_core::Result<&mut ReferenceAllocation> {
        let reference_id = normalize_id(reference_id);
        self.allocations
            .iter_mut()
            .find(|a| a.reference_id == reference_id)
            .ok_or(MrpError::UnknownReference(reference_id))
    }

    /// 切換參照的組合，批數重設為以新組合滿足全部需求
    pub fn change_combo(&mut self, reference_id: &str, combo: &str) -> mrp_core::Result<u64> {
        let allocation = self.allocation_mut(reference_id)?;
        allocation.select_combo(combo, ComboSelectionSource::Manual)?;
        allocation.quantity_to_produce = allocation.suggested_quantity();
        tracing::debug!(
            "{} 改用 {} x{}",
            allocation.reference_id,
            allocation.selected_combo,
            allocation.quantity_to_produce
        );
        Ok(allocation.quantity_to_produce)
    }

    /// 直接設定批數
    pub fn set_quantity(&mut self, reference_id: &str, quantity: u64) -> mrp_core::Result<()> {
        self.allocation_mut(reference_id)?.quantity_to_produce = quantity;
        Ok(())
    }

    /// 設為扣除其他參照產量後所需的最少批數
    pub fn set_to_minimum(&mut self, reference_id: &str) -> mrp_core::Result<u64> {
        let reference_id = normalize_id(reference_id);
        let produced_by_others: Decimal = self
            .allocations
            .iter()
            .filter(|a| a.reference_id != reference_id)
            .fold(Decimal::ZERO, |sum, a| sum.saturating_add(a.production_of(&reference_id)));

        let allocation = self.allocation_mut(&reference_id)?;
        let remaining = (allocation.total_required - produced_by_others).max(Decimal::ZERO);
        allocation.quantity_to_produce = ceil_batches(remaining, allocation.qty_per_selected());
        Ok(allocation.quantity_to_produce)
    }

    /// 執行批數優化
    pub fn optimize(&mut self) -> ConvergenceReport {
        let report = ComboOptimizer::from_config(&self.config).optimize(&mut self.allocations);
        self.last_convergence = Some(report.clone());
        report
    }

    /// 設定組合的總批數
    ///
    /// 只有一個參照選用時直接設定，共用時依目前占比重新分配。
    pub fn set_combo_total(&mut self, combo: &str, total: u64) -> mrp_core::Result<Vec<(String, u64)>> {
        let combo = combo.trim();
        let members: Vec<usize> = self
            .allocations
            .iter()
            .enumerate()
            .filter(|(_, a)| a.selected_combo == combo)
            .map(|(i, _)| i)
            .collect();
        if members.is_empty() {
            return Err(MrpError::UnknownCombo(combo.to_string()));
        }

        let current: Vec<u64> = members
            .iter()
            .map(|&i| self.allocations[i].quantity_to_produce)
            .collect();
        let quantities = views::redistribute(&current, total);

        let mut changed = Vec::with_capacity(members.len());
        for (&i, quantity) in members.iter().zip(quantities) {
            let allocation = &mut self.allocations[i];
            allocation.quantity_to_produce = quantity;
            changed.push((allocation.reference_id.clone(), quantity));
        }
        Ok(changed)
    }

    /// 套用匯入的組合批數
    ///
    /// 每列套用到第一個可使用該組合的參照，覆寫選定組合與批數。
    pub fn apply_import(&mut self, rows: &[ImportRow]) -> ImportApplication {
        let previous = self.allocations.clone();
        let mut applied = Vec::new();
        let mut unmatched = 0;

        for row in rows {
            let target = self.allocations.iter_mut().find(|a| a.can_use(&row.combo));
            let Some(allocation) = target else {
                tracing::warn!("匯入組合 {} 沒有可套用的參照", row.combo);
                unmatched += 1;
                continue;
            };
            if allocation
                .select_combo(&row.combo, ComboSelectionSource::Imported)
                .is_err()
            {
                unmatched += 1;
                continue;
            }
            allocation.quantity_to_produce = row.quantity;
            applied.push(AppliedRow {
                reference_id: allocation.reference_id.clone(),
                combo: allocation.selected_combo.clone(),
                quantity: row.quantity,
            });
        }

        let report = ComparisonReport::build(&previous, &self.allocations, &applied);
        tracing::info!(
            "匯入套用: {} 列, 未匹配 {}, 不足 {}",
            applied.len(),
            unmatched,
            report.totals.insufficient
        );
        self.last_comparison = Some(report.clone());

        ImportApplication {
            applied,
            unmatched,
            report,
        }
    }

    pub fn reference_view(&self, reference_id: &str) -> mrp_core::Result<ReferenceView> {
        views::by_reference(&self.allocations, reference_id)
    }

    pub fn reference_views(&self) -> Vec<ReferenceView> {
        views::all_references(&self.allocations)
    }

    pub fn combo_views(&self) -> Vec<ComboGroupView> {
        views::by_combo(&self.allocations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::parse_import_str;
    use crate::report::ComparisonStatus;
    use mrp_core::ComboDefinition;

    fn combo_x() -> ComboDefinition {
        ComboDefinition::new("CMB.X")
            .with_output("REF1", Decimal::from(5))
            .with_output("REF2", Decimal::from(3))
    }

    fn combo_y() -> ComboDefinition {
        ComboDefinition::new("CMB.Y").with_output("REF2", Decimal::from(4))
    }

    fn session() -> AllocationSession {
        let allocations = vec![
            ReferenceAllocation::new(
                "REF1",
                Decimal::from(37),
                vec![combo_x()],
                "CMB.X",
                ComboSelectionSource::Primary,
            )
            .unwrap(),
            ReferenceAllocation::new(
                "REF2",
                Decimal::from(10),
                vec![combo_x(), combo_y()],
                "CMB.X",
                ComboSelectionSource::Primary,
            )
            .unwrap(),
        ];
        AllocationSession::new(allocations, EngineConfig::default())
    }

    #[test]
    fn test_change_combo_recomputes_quantity() {
        let mut session = session();

        let quantity = session.change_combo("ref2", "CMB.Y").unwrap();

        // 10 / 4 = 2.5 → 3
        assert_eq!(quantity, 3);
        let allocation = session.allocation("REF2").unwrap();
        assert_eq!(allocation.selection_source, ComboSelectionSource::Manual);
    }

    #[test]
    fn test_change_combo_rejects_unavailable() {
        let mut session = session();

        let err = session.change_combo("REF1", "CMB.Y").unwrap_err();

        assert!(matches!(err, MrpError::ComboNotAvailable { .. }));
        assert_eq!(session.allocation("REF1").unwrap().quantity_to_produce, 8);
    }

    #[test]
    fn test_set_to_minimum_nets_other_production() {
        let mut session = session();

        // REF1 8 批已產出 REF2 24 ≥ 10
        assert_eq!(session.set_to_minimum("REF2").unwrap(), 0);

        session.set_quantity("REF1", 2).unwrap();
        // 10 - 6 = 4 → 2 批
        assert_eq!(session.set_to_minimum("REF2").unwrap(), 2);

        assert!(session.set_quantity("NOPE", 1).is_err());
    }

    #[test]
    fn test_optimize_records_report() {
        let mut session = session();

        let report = session.optimize();

        assert!(report.converged);
        assert!(session.last_convergence().is_some());
        let total: u64 = session.allocations().iter().map(|a| a.quantity_to_produce).sum();
        assert_eq!(total, 8);
    }

    #[test]
    fn test_set_combo_total_redistributes() {
        let mut session = session();

        // 目前 8 + 4
        let changed = session.set_combo_total("CMB.X", 6).unwrap();

        assert_eq!(
            changed,
            vec![("REF1".to_string(), 4), ("REF2".to_string(), 2)]
        );
        assert_eq!(session.combo_views()[0].total_batches, 6);

        let err = session.set_combo_total("CMB.Y", 3).unwrap_err();
        assert!(matches!(err, MrpError::UnknownCombo(_)));
    }

    #[test]
    fn test_set_combo_total_single_reference() {
        let mut session = session();
        session.change_combo("REF2", "CMB.Y").unwrap();

        let changed = session.set_combo_total("CMB.Y", 9).unwrap();

        assert_eq!(changed, vec![("REF2".to_string(), 9)]);
    }

    #[test]
    fn test_apply_import_first_matching_reference() {
        let mut session = session();
        session.set_quantity("REF1", 3).unwrap();
        let batch = parse_import_str("combo,cantidad\nCMB.X,8\nCMB.Q,2\n").unwrap();

        let application = session.apply_import(&batch.rows);

        assert_eq!(application.applied.len(), 1);
        assert_eq!(application.applied[0].reference_id, "REF1");
        assert_eq!(application.unmatched, 1);

        let ref1 = session.allocation("REF1").unwrap();
        assert_eq!(ref1.quantity_to_produce, 8);
        assert_eq!(ref1.selection_source, ComboSelectionSource::Imported);
        // REF2 不受影響
        assert_eq!(session.allocation("REF2").unwrap().quantity_to_produce, 4);

        let row = &application.report.rows[0];
        assert_eq!(row.current_quantity, 3);
        assert_eq!(row.csv_quantity, 8);
        assert_eq!(row.status, ComparisonStatus::Satisfied);
        assert!(session.last_comparison().is_some());
    }

    #[test]
    fn test_apply_import_duplicate_rows_report_applied_state() {
        let mut session = session();
        let batch = parse_import_str("combo,cantidad\nCMB.X,8\nCMB.X,3\n").unwrap();

        let application = session.apply_import(&batch.rows);

        assert_eq!(application.applied.len(), 2);
        let ref1 = session.allocation("REF1").unwrap();
        assert_eq!(ref1.quantity_to_produce, 3);
        let row = &application.report.rows[0];
        assert_eq!(row.csv_quantity, ref1.quantity_to_produce);
        // 3 + 4 批 → REF1 35 < 37
        assert_eq!(row.csv_production, Decimal::from(35));
        assert_eq!(row.status, ComparisonStatus::Insufficient);
    }

    #[test]
    fn test_reference_views() {
        let session = session();

        let view = session.reference_view("REF2").unwrap();

        assert_eq!(view.produced_by_others, Decimal::from(24));
        assert_eq!(session.reference_views().len(), 2);
    }
}
