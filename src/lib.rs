//! # Combo MRP
//!
//! 組合生產的物料需求規劃：BOM 展開、庫存淨需求、組合分配與批數優化。
//!
//! [`ComboPlanner`] 串起整個流程；各階段也可以直接使用對應的 crate。

pub mod logging;

pub use mrp_cache::BomLookupCache;
pub use mrp_calc::{
    AlertStatus, BomExplosion, ComponentAnalysis, MrpCalculator, MrpResult, MrpWarning, NettingResult,
    ProductionRequirement, WarningKind, WarningSeverity,
};
pub use mrp_core::{
    BomLine, ComboDefinition, ComboSelectionSource, Demand, EngineConfig, InventoryRecord, MemoryRepository,
    MrpError, MrpRepository, ReferenceAllocation, Result,
};
pub use mrp_optimizer::{
    parse_import, parse_import_str, AllocationSession, ComboAssigner, ComboCatalog, ComboOptimizer,
    ComparisonReport, ConvergenceReport, ImportApplication, ImportBatch,
};

/// 規劃結果
#[derive(Debug, Clone)]
pub struct PlanOutcome {
    /// 展開與淨需求
    pub mrp: MrpResult,

    /// 本次載入的組合目錄
    pub catalog: ComboCatalog,

    /// 需生產但沒有任何組合可產出的物料
    pub unassigned: Vec<ProductionRequirement>,

    /// 自動優化的收斂報告（未啟用時為 None）
    pub convergence: Option<ConvergenceReport>,

    /// 可繼續調整的分配
    pub session: AllocationSession,
}

impl PlanOutcome {
    /// 是否有需要使用者注意的結果
    pub fn needs_attention(&self) -> bool {
        self.mrp.is_truncated()
            || !self.unassigned.is_empty()
            || self
                .convergence
                .as_ref()
                .map(ConvergenceReport::needs_attention)
                .unwrap_or(false)
    }
}

/// 組合生產規劃器
#[derive(Debug, Clone, Default)]
pub struct ComboPlanner {
    config: EngineConfig,
    auto_optimize: bool,
}

impl ComboPlanner {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            auto_optimize: false,
        }
    }

    /// 建構器模式：分配後立即優化
    pub fn with_auto_optimize(mut self, auto_optimize: bool) -> Self {
        self.auto_optimize = auto_optimize;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// 執行一次完整規劃
    ///
    /// 只有資料存取失敗會返回錯誤。
    pub async fn plan<R>(&self, repo: &R, demands: &[Demand]) -> Result<PlanOutcome>
    where
        R: MrpRepository + ?Sized,
    {
        let mrp = MrpCalculator::new(self.config.clone())
            .calculate(repo, demands)
            .await?;

        let references: Vec<String> = mrp
            .netting
            .production
            .iter()
            .map(|p| p.component_id.clone())
            .collect();
        let catalog = ComboCatalog::load(repo, &references).await?;

        let assignment = ComboAssigner::new(self.config.clone()).assign(&catalog, &mrp.netting.production);
        for allocation in assignment.heuristic_selections() {
            tracing::warn!(
                run_id = %mrp.run_id,
                "{} 的組合 {} 為推測選擇 ({:?})",
                allocation.reference_id,
                allocation.selected_combo,
                allocation.selection_source
            );
        }

        let mut session = AllocationSession::new(assignment.allocations, self.config.clone());
        let convergence = self.auto_optimize.then(|| session.optimize());

        tracing::info!(
            run_id = %mrp.run_id,
            "規劃完成: {} 個參照分配, {} 個無組合",
            session.allocations().len(),
            assignment.unassigned.len()
        );

        Ok(PlanOutcome {
            mrp,
            catalog,
            unassigned: assignment.unassigned,
            convergence,
            session,
        })
    }
}
