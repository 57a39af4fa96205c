//! 組合目錄
//!
//! 一次批次載入全部組合產出與週期時間，建立雙向索引：
//! 組合 → 產出、物料 → 組合。建立後不再針對單一參照查詢資料來源。

use std::collections::{HashMap, HashSet};

use mrp_core::{
    normalize_id, ComboCycleTime, ComboDefinition, ComboOutputLine, ComboSelectionSource,
    MrpRepository, PrimaryComboLine,
};

/// 組合目錄
#[derive(Debug, Clone, Default)]
pub struct ComboCatalog {
    /// 組合名稱（依首次出現順序）
    order: Vec<String>,

    /// 組合名稱 → 定義
    combos: HashMap<String, ComboDefinition>,

    /// 物料ID → 可產出的組合名稱
    by_component: HashMap<String, Vec<String>>,

    /// 物料ID → 主要組合
    primary: HashMap<String, String>,
}

impl ComboCatalog {
    /// 從資料來源載入目錄
    ///
    /// `references` 是需要主要組合指定的物料；三次批次查詢，
    /// 任一失敗即返回資料存取錯誤。
    pub async fn load<R>(repo: &R, references: &[String]) -> mrp_core::Result<Self>
    where
        R: MrpRepository + ?Sized,
    {
        let outputs = repo.get_all_combo_outputs().await?;

        let mut seen: HashSet<&str> = HashSet::new();
        let names: Vec<String> = outputs
            .iter()
            .map(|line| line.combo.trim())
            .filter(|name| !name.is_empty() && seen.insert(*name))
            .map(str::to_string)
            .collect();

        let cycle_times = if names.is_empty() {
            Vec::new()
        } else {
            repo.get_combo_cycle_times(&names).await?
        };
        let primary = if references.is_empty() {
            Vec::new()
        } else {
            repo.get_primary_combos(references).await?
        };

        let catalog = Self::from_parts(outputs, cycle_times, primary);
        tracing::info!(
            "組合目錄載入完成: {} 個組合, {} 個物料",
            catalog.len(),
            catalog.by_component.len()
        );
        Ok(catalog)
    }

    /// 從原始列建立目錄
    pub fn from_parts(
        outputs: Vec<ComboOutputLine>,
        cycle_times: Vec<ComboCycleTime>,
        primary: Vec<PrimaryComboLine>,
    ) -> Self {
        let mut catalog = Self::default();

        for line in outputs {
            let name = line.combo.trim().to_string();
            if name.is_empty() {
                continue;
            }
            let component_id = normalize_id(&line.component_id);

            if !catalog.combos.contains_key(&name) {
                catalog.order.push(name.clone());
                catalog
                    .combos
                    .insert(name.clone(), ComboDefinition::new(&name));
            }
            if let Some(combo) = catalog.combos.get_mut(&name) {
                combo.add_output(&component_id, line.qty_per_combo);
            }

            let combos = catalog.by_component.entry(component_id).or_default();
            if !combos.contains(&name) {
                combos.push(name);
            }
        }

        for time in cycle_times {
            if let Some(combo) = catalog.combos.get_mut(time.combo.trim()) {
                combo.cycle_time_minutes = time.minutes.max(rust_decimal::Decimal::ZERO);
            }
        }

        for line in primary {
            catalog
                .primary
                .insert(normalize_id(&line.component_id), line.combo.trim().to_string());
        }

        catalog
    }

    /// 組合數量
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// 依名稱查找組合
    pub fn combo(&self, name: &str) -> Option<&ComboDefinition> {
        self.combos.get(name.trim())
    }

    /// 全部組合（依首次出現順序）
    pub fn combos(&self) -> impl Iterator<Item = &ComboDefinition> {
        self.order.iter().filter_map(|name| self.combos.get(name))
    }

    /// 可產出該物料的組合（依目錄順序，只含每批產出大於 0 者）
    pub fn combos_for(&self, component_id: &str) -> Vec<&ComboDefinition> {
        let component_id = normalize_id(component_id);
        self.by_component
            .get(&component_id)
            .map(|names| {
                names
                    .iter()
                    .filter_map(|name| self.combos.get(name))
                    .filter(|combo| combo.produces(&component_id))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// 物料是否只能經由組合生產
    pub fn is_combo_produced(&self, component_id: &str) -> bool {
        !self.combos_for(component_id).is_empty()
    }

    /// 物料的主要組合指定
    pub fn primary_for(&self, component_id: &str) -> Option<&str> {
        self.primary
            .get(&normalize_id(component_id))
            .map(String::as_str)
    }

    /// 選擇參照的預設組合
    ///
    /// 依序：主要組合指定 → 名稱相似度（去除組合標記後綴後的參照ID
    /// 是組合名稱的子字串）→ 第一個可用組合。名稱相似度只是推測，
    /// 來源會一併返回。
    pub fn select_default(
        &self,
        reference_id: &str,
        marker_suffix: &str,
    ) -> Option<(String, ComboSelectionSource)> {
        let reference_id = normalize_id(reference_id);
        let available = self.combos_for(&reference_id);
        if available.is_empty() {
            return None;
        }

        if let Some(primary) = self.primary_for(&reference_id) {
            if available.iter().any(|c| c.name == primary) {
                return Some((primary.to_string(), ComboSelectionSource::Primary));
            }
            tracing::warn!("主要組合 {} 不產出 {}，改用推測", primary, reference_id);
        }

        let marker = marker_suffix.trim().to_ascii_uppercase();
        let stem = if marker.is_empty() {
            reference_id.as_str()
        } else {
            reference_id
                .strip_suffix(marker.as_str())
                .unwrap_or(reference_id.as_str())
        };
        if !stem.is_empty() {
            if let Some(combo) = available
                .iter()
                .find(|c| c.name.to_ascii_uppercase().contains(stem))
            {
                return Some((combo.name.clone(), ComboSelectionSource::NameMatch));
            }
        }

        Some((available[0].name.clone(), ComboSelectionSource::FirstAvailable))
    }
}
