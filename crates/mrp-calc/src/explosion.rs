//! BOM 展開
//!
//! 從成品需求遞迴累加每個子件的總需求量。查詢先經由
//! [`BomLookupCache::prefetch_tree`] 逐層批次載入，展開本身是純計算、
//! 深度優先、不會中途讓出執行權。

use std::collections::HashMap;

use mrp_cache::BomLookupCache;
use mrp_core::{normalize_id, Demand, EngineConfig, MrpRepository};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{MrpWarning, WarningKind};

/// 展開統計
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExplosionStats {
    /// 遞迴拜訪的節點次數（含根）
    pub nodes_visited: usize,

    /// 到達的最大深度（根為 0）
    pub max_depth_reached: usize,

    /// 因深度上限而未展開的節點次數
    pub truncated_nodes: usize,

    /// 被略過的循環邊數
    pub cycles_detected: usize,

    /// 因數量溢位而停止展開的分支數
    pub overflowed_branches: usize,
}

/// 展開結果
#[derive(Debug, Clone, Default)]
pub struct ExplosionResult {
    /// 物料ID → 總需求量
    pub requirements: HashMap<String, Decimal>,

    /// 截斷、循環等警告
    pub warnings: Vec<MrpWarning>,

    /// 展開統計
    pub stats: ExplosionStats,
}

impl ExplosionResult {
    /// 物料的總需求量（未出現時為 0）
    pub fn requirement(&self, component_id: &str) -> Decimal {
        self.requirements
            .get(&normalize_id(component_id))
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    /// 是否因深度上限、循環或溢位而截斷
    pub fn is_truncated(&self) -> bool {
        self.stats.truncated_nodes > 0
            || self.stats.cycles_detected > 0
            || self.stats.overflowed_branches > 0
    }
}

/// BOM 展開器
#[derive(Debug, Clone, Copy)]
pub struct BomExplosion {
    max_depth: usize,
}

impl BomExplosion {
    /// 創建展開器
    pub fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }

    /// 從引擎配置創建
    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.max_bom_depth)
    }

    /// 最大展開深度
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// 展開單一成品需求（本次呼叫自建緩存）
    pub async fn explode<R>(
        &self,
        repo: &R,
        root_id: &str,
        root_quantity: Decimal,
        concurrency: usize,
    ) -> mrp_core::Result<ExplosionResult>
    where
        R: MrpRepository + ?Sized,
    {
        let mut cache = BomLookupCache::new();
        let root = normalize_id(root_id);
        cache
            .prefetch_tree(repo, &[root.clone()], self.max_depth, concurrency)
            .await?;
        Ok(self.explode_cached(&cache, &root, root_quantity))
    }

    /// 展開多筆成品需求，結果累加到同一映射（一次計算共用一個緩存）
    pub async fn explode_demands<R>(
        &self,
        repo: &R,
        demands: &[Demand],
        concurrency: usize,
    ) -> mrp_core::Result<ExplosionResult>
    where
        R: MrpRepository + ?Sized,
    {
        let mut cache = BomLookupCache::new();
        let roots: Vec<String> = demands.iter().map(|d| d.component_id.clone()).collect();
        cache
            .prefetch_tree(repo, &roots, self.max_depth, concurrency)
            .await?;

        let roots: Vec<(String, Decimal)> = demands
            .iter()
            .map(|d| (d.component_id.clone(), d.quantity))
            .collect();
        Ok(self.explode_all_cached(&cache, &roots))
    }

    /// 以已載入的緩存展開單一根
    pub fn explode_cached(&self, cache: &BomLookupCache, root_id: &str, root_quantity: Decimal) -> ExplosionResult {
        self.explode_all_cached(cache, &[(root_id.to_string(), root_quantity)])
    }

    /// 以已載入的緩存展開多個根
    pub fn explode_all_cached(&self, cache: &BomLookupCache, roots: &[(String, Decimal)]) -> ExplosionResult {
        let mut run = ExplosionRun {
            cache,
            max_depth: self.max_depth,
            path: Vec::new(),
            result: ExplosionResult::default(),
        };

        for (root_id, quantity) in roots {
            let root = normalize_id(root_id);
            if cache.lines(&root).is_empty() {
                run.result.warnings.push(MrpWarning::info(
                    root.clone(),
                    WarningKind::NoBom,
                    format!("成品 {} 沒有 BOM", root),
                ));
            }
            run.visit(&root, (*quantity).max(Decimal::ZERO), 0);
        }

        tracing::debug!(
            "BOM 展開完成: {} 個物料, 拜訪 {} 個節點, 截斷 {} 次, 循環 {} 次",
            run.result.requirements.len(),
            run.result.stats.nodes_visited,
            run.result.stats.truncated_nodes,
            run.result.stats.cycles_detected
        );

        run.result
    }
}

/// 單次展開的狀態
struct ExplosionRun<'a> {
    cache: &'a BomLookupCache,
    max_depth: usize,
    /// 目前展開路徑（祖先），只用於偵測循環
    path: Vec<String>,
    result: ExplosionResult,
}

impl<'a> ExplosionRun<'a> {
    fn visit(&mut self, node: &str, quantity: Decimal, depth: usize) {
        let cache = self.cache;
        let stats = &mut self.result.stats;
        stats.nodes_visited += 1;
        stats.max_depth_reached = stats.max_depth_reached.max(depth);

        let lines = cache.lines(node);
        if lines.is_empty() {
            return;
        }

        if depth >= self.max_depth {
            stats.truncated_nodes += 1;
            tracing::warn!("BOM 展開達到深度上限 {}，{} 未展開", self.max_depth, node);
            self.result.warnings.push(MrpWarning::warning(
                node.to_string(),
                WarningKind::DepthExceeded,
                format!("深度 {} 達到上限，{} 的子件未展開", depth, node),
            ));
            return;
        }

        self.path.push(node.to_string());
        for line in lines {
            if self.path.contains(&line.child_id) {
                self.result.stats.cycles_detected += 1;
                tracing::warn!("BOM 循環: {} → {}", node, line.child_id);
                self.result.warnings.push(MrpWarning::warning(
                    line.child_id.clone(),
                    WarningKind::CycleDetected,
                    format!("{} → {} 形成循環，已略過", node, line.child_id),
                ));
                continue;
            }

            let Some(child_quantity) = quantity.checked_mul(line.multiplier) else {
                self.record_overflow(node, &line.child_id);
                continue;
            };
            let total = self
                .result
                .requirements
                .entry(line.child_id.clone())
                .or_insert(Decimal::ZERO);
            let accumulated = total.checked_add(child_quantity);
            *total = accumulated.unwrap_or(Decimal::MAX);
            if accumulated.is_none() {
                self.record_overflow(node, &line.child_id);
                continue;
            }

            tracing::trace!("BOM 展開: {} → {} (數量: {})", node, line.child_id, child_quantity);
            self.visit(&line.child_id, child_quantity, depth + 1);
        }
        self.path.pop();
    }

    /// 需求超出可表示範圍：停止展開這條分支
    fn record_overflow(&mut self, parent: &str, child: &str) {
        self.result.stats.overflowed_branches += 1;
        tracing::warn!("BOM 數量溢位: {} → {}，分支未展開", parent, child);
        self.result.warnings.push(MrpWarning::error(
            child.to_string(),
            WarningKind::Overflow,
            format!("{} → {} 的需求數量溢位，分支已停止展開", parent, child),
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mrp_core::{BomLine, MemoryRepository};
    use proptest::prelude::*;

    fn cache_of(edges: &[(&str, &str, i64)]) -> BomLookupCache {
        let mut grouped: HashMap<String, Vec<BomLine>> = HashMap::new();
        for (parent, child, multiplier) in edges {
            grouped
                .entry(normalize_id(parent))
                .or_default()
                .push(BomLine::new(parent, child, Decimal::from(*multiplier)));
        }
        let mut cache = BomLookupCache::new();
        for (parent, lines) in grouped {
            cache.insert(&parent, lines);
        }
        cache
    }

    #[test]
    fn test_single_level_explosion() {
        let cache = cache_of(&[("WIDGET-PT", "SUB-A", 1), ("WIDGET-PT", "SUB-B", 2)]);

        let result = BomExplosion::new(10).explode_cached(&cache, "widget-pt", Decimal::from(10));

        assert_eq!(result.requirements.len(), 2);
        assert_eq!(result.requirement("SUB-A"), Decimal::from(10));
        assert_eq!(result.requirement("SUB-B"), Decimal::from(20));
        assert!(!result.is_truncated());
    }

    #[test]
    fn test_multi_level_explosion() {
        //   BIKE
        //     ├── FRAME x1
        //     │   └── STEEL-TUBE x3
        //     └── WHEEL x2
        let cache = cache_of(&[
            ("BIKE", "FRAME", 1),
            ("BIKE", "WHEEL", 2),
            ("FRAME", "STEEL-TUBE", 3),
        ]);

        let result = BomExplosion::new(10).explode_cached(&cache, "BIKE", Decimal::from(50));

        assert_eq!(result.requirement("FRAME"), Decimal::from(50));
        assert_eq!(result.requirement("WHEEL"), Decimal::from(100));
        assert_eq!(result.requirement("STEEL-TUBE"), Decimal::from(150));
        assert_eq!(result.stats.max_depth_reached, 2);
    }

    #[test]
    fn test_diamond_dependency_accumulates() {
        // R → P1 x2 → C x3 ; R → P2 x1 → C x4
        let cache = cache_of(&[("R", "P1", 2), ("R", "P2", 1), ("P1", "C", 3), ("P2", "C", 4)]);

        let result = BomExplosion::new(10).explode_cached(&cache, "R", Decimal::from(5));

        // 5*2*3 + 5*1*4 = 30 + 20
        assert_eq!(result.requirement("C"), Decimal::from(50));
        assert_eq!(result.stats.cycles_detected, 0);
    }

    #[test]
    fn test_cycle_terminates() {
        let cache = cache_of(&[("A", "B", 1), ("B", "A", 1)]);

        let result = BomExplosion::new(10).explode_cached(&cache, "A", Decimal::from(3));

        assert_eq!(result.requirement("B"), Decimal::from(3));
        assert_eq!(result.stats.cycles_detected, 1);
        assert!(result.stats.nodes_visited <= 11);
        assert!(result
            .warnings
            .iter()
            .any(|w| w.kind == WarningKind::CycleDetected));
    }

    #[test]
    fn test_self_loop_terminates() {
        let cache = cache_of(&[("A", "A", 2), ("A", "B", 1)]);

        let result = BomExplosion::new(10).explode_cached(&cache, "A", Decimal::ONE);

        assert_eq!(result.requirement("A"), Decimal::ZERO);
        assert_eq!(result.requirement("B"), Decimal::ONE);
        assert_eq!(result.stats.cycles_detected, 1);
    }

    #[test]
    fn test_depth_bound_truncates_without_error() {
        // L0 → L1 → ... → L14，每層 x1
        let names: Vec<String> = (0..15).map(|i| format!("L{}", i)).collect();
        let edges: Vec<(&str, &str, i64)> = names
            .windows(2)
            .map(|w| (w[0].as_str(), w[1].as_str(), 1))
            .collect();
        let cache = cache_of(&edges);

        let result = BomExplosion::new(10).explode_cached(&cache, "L0", Decimal::ONE);

        // 深度 0..9 的節點展開，L1..L10 累加需求
        assert_eq!(result.requirements.len(), 10);
        assert_eq!(result.requirement("L10"), Decimal::ONE);
        assert_eq!(result.requirement("L11"), Decimal::ZERO);
        assert_eq!(result.stats.truncated_nodes, 1);
        assert_eq!(result.stats.nodes_visited, 11);
        assert!(result.is_truncated());
    }

    #[test]
    fn test_root_without_bom_is_reported() {
        let cache = BomLookupCache::new();

        let result = BomExplosion::new(10).explode_cached(&cache, "LONELY-PT", Decimal::from(4));

        assert!(result.requirements.is_empty());
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.warnings[0].kind, WarningKind::NoBom);
    }

    #[test]
    fn test_multiple_roots_accumulate() {
        let cache = cache_of(&[("PT-1", "SHARED", 2), ("PT-2", "SHARED", 3)]);

        let result = BomExplosion::new(10).explode_all_cached(
            &cache,
            &[
                ("PT-1".to_string(), Decimal::from(10)),
                ("PT-2".to_string(), Decimal::from(1)),
            ],
        );

        assert_eq!(result.requirement("SHARED"), Decimal::from(23));
    }

    #[test]
    fn test_quantity_overflow_stops_branch() {
        // L0 → L1 → ... → L10，每層 x1000；L10 需 1e30，超出 Decimal 範圍
        let names: Vec<String> = (0..11).map(|i| format!("L{}", i)).collect();
        let edges: Vec<(&str, &str, i64)> = names
            .windows(2)
            .map(|w| (w[0].as_str(), w[1].as_str(), 1000))
            .collect();
        let cache = cache_of(&edges);

        let result = BomExplosion::new(10).explode_cached(&cache, "L0", Decimal::ONE);

        assert_eq!(result.requirement("L9"), Decimal::from_i128_with_scale(10i128.pow(27), 0));
        assert_eq!(result.requirement("L10"), Decimal::ZERO);
        assert_eq!(result.stats.overflowed_branches, 1);
        assert!(result.is_truncated());
        let warning = result
            .warnings
            .iter()
            .find(|w| w.kind == WarningKind::Overflow)
            .unwrap();
        assert_eq!(warning.component_id, "L10");
        assert_eq!(warning.severity, crate::WarningSeverity::Error);
    }

    #[test]
    fn test_accumulation_overflow_saturates() {
        // 兩條路徑各自可表示，相加後溢位
        let big = Decimal::MAX - Decimal::ONE;
        let mut cache = BomLookupCache::new();
        cache.insert(
            "R",
            vec![BomLine::new("R", "C", big), BomLine::new("R", "C", big)],
        );

        let result = BomExplosion::new(10).explode_cached(&cache, "R", Decimal::ONE);

        assert_eq!(result.requirement("C"), Decimal::MAX);
        assert_eq!(result.stats.overflowed_branches, 1);
    }

    #[tokio::test]
    async fn test_explode_uses_fresh_cache_per_call() {
        let repo = MemoryRepository::new()
            .with_bom_line("WIDGET-PT", "SUB-A", Decimal::from(1))
            .with_bom_line("WIDGET-PT", "SUB-B", Decimal::from(2));
        let explosion = BomExplosion::new(10);

        let first = explosion
            .explode(&repo, "WIDGET-PT", Decimal::from(10), 5)
            .await
            .unwrap();
        let second = explosion
            .explode(&repo, "WIDGET-PT", Decimal::from(1), 5)
            .await
            .unwrap();

        assert_eq!(first.requirement("SUB-B"), Decimal::from(20));
        assert_eq!(second.requirement("SUB-B"), Decimal::from(2));
    }

    proptest! {
        #[test]
        fn prop_diamond_sums_both_paths(
            qty in 0i64..1000,
            m1 in 0i64..20,
            m2 in 0i64..20,
            c1 in 0i64..20,
            c2 in 0i64..20,
        ) {
            let cache = cache_of(&[("R", "P1", m1), ("R", "P2", m2), ("P1", "C", c1), ("P2", "C", c2)]);

            let result = BomExplosion::new(10).explode_cached(&cache, "R", Decimal::from(qty));

            let expected = Decimal::from(qty * m1 * c1 + qty * m2 * c2);
            prop_assert_eq!(result.requirement("C"), expected);
        }

        #[test]
        fn prop_cycles_always_terminate(len in 2usize..30, qty in 1i64..100) {
            // 環狀 N0 → N1 → ... → N(len-1) → N0
            let names: Vec<String> = (0..len).map(|i| format!("N{}", i)).collect();
            let mut edges: Vec<(&str, &str, i64)> = names
                .windows(2)
                .map(|w| (w[0].as_str(), w[1].as_str(), 1))
                .collect();
            edges.push((names[len - 1].as_str(), names[0].as_str(), 1));
            let cache = cache_of(&edges);

            let result = BomExplosion::new(10).explode_cached(&cache, "N0", Decimal::from(qty));

            prop_assert!(result.stats.nodes_visited <= 11);
            prop_assert!(result.is_truncated());
        }
    }
}
