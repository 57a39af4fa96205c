//! MRP 主計算器

use std::collections::HashMap;

use futures::future::join_all;
use mrp_core::{normalize_id, Demand, EngineConfig, InventoryRecord, MrpRepository};

use crate::explosion::BomExplosion;
use crate::netting::NettingCalculator;
use crate::MrpResult;

/// MRP 計算器
///
/// 一次 [`calculate`](MrpCalculator::calculate) 就是一次獨立的計算：
/// 自建 BOM 緩存、展開全部需求、批次查詢庫存後計算淨需求。
#[derive(Debug, Clone, Default)]
pub struct MrpCalculator {
    config: EngineConfig,
}

impl MrpCalculator {
    /// 創建新的 MRP 計算器
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    /// 引擎配置
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// 主 MRP 計算入口
    ///
    /// 只有資料存取失敗會返回錯誤；深度截斷與循環記錄在結果的警告中。
    pub async fn calculate<R>(&self, repo: &R, demands: &[Demand]) -> mrp_core::Result<MrpResult>
    where
        R: MrpRepository + ?Sized,
    {
        self.config.validate()?;

        let mut result = MrpResult::empty();
        tracing::info!(run_id = %result.run_id, "開始 MRP 計算：需求 {} 筆", demands.len());
        let start_time = std::time::Instant::now();

        // Step 1: BOM 展開
        tracing::debug!("Step 1: BOM 展開");
        let explosion = BomExplosion::from_config(&self.config)
            .explode_demands(repo, demands, self.config.lookup_concurrency)
            .await
            .map_err(|e| {
                tracing::error!(run_id = %result.run_id, "BOM 展開失敗: {}", e);
                e
            })?;

        // Step 2: 批次查詢庫存
        tracing::debug!("Step 2: 查詢庫存");
        let mut component_ids: Vec<String> = explosion.requirements.keys().cloned().collect();
        component_ids.sort();
        let inventory = self.load_inventory(repo, &component_ids).await?;
        tracing::debug!("庫存記錄: {} 筆", inventory.len());

        // Step 3: 淨需求
        tracing::debug!("Step 3: 淨需求計算");
        result.netting = NettingCalculator::calculate(&explosion.requirements, &inventory);

        result.requirements = explosion.requirements;
        result.stats = explosion.stats;
        result.warnings = explosion.warnings;
        result.calculation_time_ms = Some(start_time.elapsed().as_millis());

        if result.is_truncated() {
            tracing::warn!(run_id = %result.run_id, "BOM 展開有截斷，結果只累加到深度上限");
        }
        tracing::info!(
            run_id = %result.run_id,
            "MRP 計算完成，耗時 {:?}，需生產物料 {} 個",
            start_time.elapsed(),
            result.netting.production.len()
        );

        Ok(result)
    }

    /// 批次查詢庫存
    ///
    /// 每次查詢最多 `inventory_batch_size` 個物料，最多 `lookup_concurrency` 個並行。
    pub async fn load_inventory<R>(
        &self,
        repo: &R,
        component_ids: &[String],
    ) -> mrp_core::Result<HashMap<String, InventoryRecord>>
    where
        R: MrpRepository + ?Sized,
    {
        let batches: Vec<&[String]> = component_ids
            .chunks(self.config.inventory_batch_size.max(1))
            .collect();

        let mut inventory = HashMap::new();
        for group in batches.chunks(self.config.lookup_concurrency.max(1)) {
            let results = join_all(group.iter().map(|batch| repo.get_inventory(batch))).await;
            for records in results {
                for mut record in records? {
                    record.component_id = normalize_id(&record.component_id);
                    inventory.insert(record.component_id.clone(), record);
                }
            }
        }

        Ok(inventory)
    }
}
