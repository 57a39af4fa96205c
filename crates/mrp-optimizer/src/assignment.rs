//! 初始組合分配

use mrp_calc::ProductionRequirement;
use mrp_core::{EngineConfig, ReferenceAllocation};

use crate::catalog::ComboCatalog;

/// 分配結果
#[derive(Debug, Clone, Default)]
pub struct AssignmentResult {
    /// 參照分配（依淨需求順序）
    pub allocations: Vec<ReferenceAllocation>,

    /// 沒有任何組合可產出的物料
    pub unassigned: Vec<ProductionRequirement>,
}

impl AssignmentResult {
    /// 以推測方式選定組合的參照
    pub fn heuristic_selections(&self) -> Vec<&ReferenceAllocation> {
        self.allocations
            .iter()
            .filter(|a| a.selection_source.is_heuristic())
            .collect()
    }
}

/// 組合分配器
#[derive(Debug, Clone, Default)]
pub struct ComboAssigner {
    config: EngineConfig,
}

impl ComboAssigner {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    /// 為每個需生產且可由組合產出的物料建立參照分配
    ///
    /// 批數初始為以選定組合滿足全部淨需求的向上取整。
    pub fn assign(&self, catalog: &ComboCatalog, production: &[ProductionRequirement]) -> AssignmentResult {
        let mut result = AssignmentResult::default();

        for requirement in production {
            let selection = catalog.select_default(
                &requirement.component_id,
                &self.config.combo_marker_suffix,
            );
            let Some((combo, source)) = selection else {
                tracing::debug!("物料 {} 沒有可用組合", requirement.component_id);
                result.unassigned.push(requirement.clone());
                continue;
            };

            let available = catalog
                .combos_for(&requirement.component_id)
                .into_iter()
                .cloned()
                .collect();

            match ReferenceAllocation::new(
                &requirement.component_id,
                requirement.to_produce,
                available,
                &combo,
                source,
            ) {
                Ok(allocation) => {
                    tracing::debug!(
                        "分配 {} → {} x{} ({:?})",
                        allocation.reference_id,
                        allocation.selected_combo,
                        allocation.quantity_to_produce,
                        source
                    );
                    result.allocations.push(allocation);
                }
                Err(e) => {
                    tracing::warn!("無法分配 {}: {}", requirement.component_id, e);
                    result.unassigned.push(requirement.clone());
                }
            }
        }

        tracing::info!(
            "組合分配完成: {} 個參照, {} 個無組合, {} 個推測選擇",
            result.allocations.len(),
            result.unassigned.len(),
            result.heuristic_selections().len()
        );

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mrp_core::{ComboOutputLine, ComboSelectionSource, PrimaryComboLine};
    use rust_decimal::Decimal;

    fn requirement(id: &str, qty: i64) -> ProductionRequirement {
        ProductionRequirement {
            component_id: id.to_string(),
            to_produce: Decimal::from(qty),
        }
    }

    #[test]
    fn test_assign_scenario() {
        let catalog = ComboCatalog::from_parts(
            vec![
                ComboOutputLine::new("CMB.X", "REF1", Decimal::from(5)),
                ComboOutputLine::new("CMB.X", "REF2", Decimal::from(3)),
            ],
            Vec::new(),
            vec![
                PrimaryComboLine::new("REF1", "CMB.X"),
                PrimaryComboLine::new("REF2", "CMB.X"),
            ],
        );

        let result = ComboAssigner::default().assign(
            &catalog,
            &[requirement("REF1", 37), requirement("REF2", 10), requirement("SUB-A", 6)],
        );

        assert_eq!(result.allocations.len(), 2);
        assert_eq!(result.allocations[0].quantity_to_produce, 8);
        assert_eq!(result.allocations[1].quantity_to_produce, 4);
        assert_eq!(result.allocations[0].selection_source, ComboSelectionSource::Primary);
        assert!(result.heuristic_selections().is_empty());

        assert_eq!(result.unassigned.len(), 1);
        assert_eq!(result.unassigned[0].component_id, "SUB-A");
    }

    #[test]
    fn test_assign_reports_heuristic_picks() {
        let catalog = ComboCatalog::from_parts(
            vec![
                ComboOutputLine::new("CMB.A", "REF1", Decimal::from(2)),
                ComboOutputLine::new("CMB.B", "REF1", Decimal::from(10)),
            ],
            Vec::new(),
            Vec::new(),
        );

        let result = ComboAssigner::default().assign(&catalog, &[requirement("REF1", 20)]);

        let allocation = &result.allocations[0];
        assert_eq!(allocation.available_combos.len(), 2);
        assert_eq!(allocation.selected_combo, "CMB.A");
        assert_eq!(allocation.quantity_to_produce, 10);
        assert_eq!(result.heuristic_selections().len(), 1);
    }
}
