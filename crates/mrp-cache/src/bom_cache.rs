//! BOM 查詢緩存
//!
//! 緩存由每次展開呼叫自行建立並以引用傳入遞迴，不跨計算共享。
//! 查詢失敗的鍵緩存為空結果，不在本次計算內重試。

use std::collections::{HashMap, HashSet};

use futures::future::join_all;
use mrp_core::{normalize_id, BomLine, MrpError, MrpRepository};

/// BOM 查詢緩存
#[derive(Debug, Default)]
pub struct BomLookupCache {
    /// 正規化產品ID → BOM 行
    entries: HashMap<String, Vec<BomLine>>,

    /// 查詢失敗（已緩存為空）的鍵
    failed: HashSet<String>,

    /// 實際發出的查詢次數
    lookups: usize,
}

impl BomLookupCache {
    /// 創建空緩存
    pub fn new() -> Self {
        Self::default()
    }

    /// 直接寫入一筆緩存（測試與離線資料使用）
    pub fn insert(&mut self, product_id: &str, lines: Vec<BomLine>) {
        self.entries.insert(normalize_id(product_id), lines);
    }

    /// 是否已緩存（包含空結果）
    pub fn contains(&self, product_id: &str) -> bool {
        self.entries.contains_key(&normalize_id(product_id))
    }

    /// 取得緩存的 BOM 行，未緩存或無 BOM 時返回空切片
    pub fn lines(&self, product_id: &str) -> &[BomLine] {
        self.entries
            .get(&normalize_id(product_id))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// 緩存的鍵數量
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 實際發出的查詢次數
    pub fn lookup_count(&self) -> usize {
        self.lookups
    }

    /// 查詢失敗的鍵
    pub fn failed_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.failed.iter().cloned().collect();
        keys.sort();
        keys
    }

    /// 載入尚未緩存的產品，每批最多 `concurrency` 個並行查詢
    ///
    /// 任一查詢失敗時，該批其餘結果照常寫入，失敗的鍵緩存為空，
    /// 並返回第一個錯誤；之前的緩存內容不受影響。
    pub async fn load<R>(&mut self, repo: &R, product_ids: &[String], concurrency: usize) -> mrp_core::Result<()>
    where
        R: MrpRepository + ?Sized,
    {
        let mut seen = HashSet::new();
        let missing: Vec<String> = product_ids
            .iter()
            .map(|id| normalize_id(id))
            .filter(|id| !self.entries.contains_key(id) && seen.insert(id.clone()))
            .collect();

        for chunk in missing.chunks(concurrency.max(1)) {
            let results = join_all(chunk.iter().map(|id| repo.get_bom_lines(id))).await;
            self.lookups += chunk.len();

            let mut first_error: Option<MrpError> = None;
            for (id, result) in chunk.iter().zip(results) {
                match result {
                    Ok(lines) => {
                        let lines = lines
                            .into_iter()
                            .map(|line| BomLine::new(id, &line.child_id, line.multiplier))
                            .collect();
                        self.entries.insert(id.clone(), lines);
                    }
                    Err(e) => {
                        tracing::warn!("BOM 查詢失敗，緩存為空: {} ({})", id, e);
                        self.entries.insert(id.clone(), Vec::new());
                        self.failed.insert(id.clone());
                        if first_error.is_none() {
                            first_error = Some(e);
                        }
                    }
                }
            }

            if let Some(e) = first_error {
                return Err(e);
            }
        }

        Ok(())
    }

    /// 逐層預先載入 BOM 樹（廣度優先）
    ///
    /// 載入深度 0 到 `max_depth`（含）的所有節點，深度上限的節點也會載入，
    /// 以便展開時判斷是否被截斷。
    pub async fn prefetch_tree<R>(
        &mut self,
        repo: &R,
        roots: &[String],
        max_depth: usize,
        concurrency: usize,
    ) -> mrp_core::Result<()>
    where
        R: MrpRepository + ?Sized,
    {
        let mut frontier: Vec<String> = roots.iter().map(|id| normalize_id(id)).collect();
        let mut scheduled: HashSet<String> = frontier.iter().cloned().collect();

        for depth in 0..=max_depth {
            if frontier.is_empty() {
                break;
            }
            tracing::debug!("預載 BOM 第 {} 層: {} 個節點", depth, frontier.len());
            self.load(repo, &frontier, concurrency).await?;

            let mut next = Vec::new();
            for id in &frontier {
                for line in self.lines(id) {
                    if scheduled.insert(line.child_id.clone()) {
                        next.push(line.child_id.clone());
                    }
                }
            }
            frontier = next;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use mrp_core::{ComboCycleTime, ComboOutputLine, InventoryRecord, MemoryRepository};
    use rust_decimal::Decimal;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// 計數並在指定產品上失敗的資料來源
    struct FlakyRepository {
        inner: MemoryRepository,
        fail_on: String,
        calls: AtomicUsize,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl FlakyRepository {
        fn new(inner: MemoryRepository, fail_on: &str) -> Self {
            Self {
                inner,
                fail_on: fail_on.to_string(),
                calls: AtomicUsize::new(0),
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl MrpRepository for FlakyRepository {
        async fn get_bom_lines(&self, product_id: &str) -> mrp_core::Result<Vec<BomLine>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(current, Ordering::SeqCst);
            tokio::task::yield_now().await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if product_id == self.fail_on {
                return Err(MrpError::data_store("get_bom_lines", "connection reset"));
            }
            self.inner.get_bom_lines(product_id).await
        }

        async fn get_all_combo_outputs(&self) -> mrp_core::Result<Vec<ComboOutputLine>> {
            self.inner.get_all_combo_outputs().await
        }

        async fn get_combo_cycle_times(
            &self,
            combos: &[String],
        ) -> mrp_core::Result<Vec<ComboCycleTime>> {
            self.inner.get_combo_cycle_times(combos).await
        }

        async fn get_inventory(
            &self,
            component_ids: &[String],
        ) -> mrp_core::Result<Vec<InventoryRecord>> {
            self.inner.get_inventory(component_ids).await
        }
    }

    fn wide_repository(children: usize) -> MemoryRepository {
        (0..children).fold(MemoryRepository::new(), |repo, i| {
            repo.with_bom_line("ROOT", &format!("C{}", i), Decimal::ONE)
        })
    }

    #[tokio::test]
    async fn test_prefetch_loads_each_key_once() {
        let repo = MemoryRepository::new()
            .with_bom_line("A", "B", Decimal::ONE)
            .with_bom_line("A", "C", Decimal::ONE)
            .with_bom_line("B", "D", Decimal::ONE)
            .with_bom_line("C", "D", Decimal::ONE);
        let flaky = FlakyRepository::new(repo, "NONE");

        let mut cache = BomLookupCache::new();
        cache
            .prefetch_tree(&flaky, &["a".to_string()], 10, 5)
            .await
            .unwrap();

        // A, B, C, D 各查一次（D 是菱形共用子件）
        assert_eq!(flaky.calls.load(Ordering::SeqCst), 4);
        assert_eq!(cache.lookup_count(), 4);
        assert_eq!(cache.lines("A").len(), 2);
        assert!(cache.contains("D"));
        assert!(cache.lines("D").is_empty());
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let flaky = FlakyRepository::new(wide_repository(12), "NONE");

        let mut cache = BomLookupCache::new();
        cache
            .prefetch_tree(&flaky, &["ROOT".to_string()], 10, 5)
            .await
            .unwrap();

        assert_eq!(flaky.calls.load(Ordering::SeqCst), 13);
        assert!(flaky.max_in_flight.load(Ordering::SeqCst) <= 5);
    }

    #[tokio::test]
    async fn test_failed_lookup_is_cached_empty() {
        let flaky = FlakyRepository::new(wide_repository(3), "C1");

        let mut cache = BomLookupCache::new();
        cache.insert("OTHER", vec![BomLine::new("OTHER", "X", Decimal::ONE)]);

        let err = cache
            .prefetch_tree(&flaky, &["ROOT".to_string()], 10, 5)
            .await
            .unwrap_err();

        assert!(err.is_retryable());
        assert!(cache.contains("C1"));
        assert!(cache.lines("C1").is_empty());
        assert_eq!(cache.failed_keys(), vec!["C1".to_string()]);
        // 既有緩存不受影響
        assert_eq!(cache.lines("OTHER").len(), 1);

        // 再次載入不會重新查詢失敗的鍵
        let before = flaky.calls.load(Ordering::SeqCst);
        cache.load(&flaky, &["C1".to_string()], 5).await.unwrap();
        assert_eq!(flaky.calls.load(Ordering::SeqCst), before);
    }

    #[tokio::test]
    async fn test_prefetch_respects_depth() {
        let repo = MemoryRepository::new()
            .with_bom_line("L0", "L1", Decimal::ONE)
            .with_bom_line("L1", "L2", Decimal::ONE)
            .with_bom_line("L2", "L3", Decimal::ONE);

        let mut cache = BomLookupCache::new();
        cache
            .prefetch_tree(&repo, &["L0".to_string()], 1, 5)
            .await
            .unwrap();

        assert!(cache.contains("L0"));
        assert!(cache.contains("L1"));
        assert!(!cache.contains("L2"));
    }
}
