//! 引擎配置模型

use serde::{Deserialize, Serialize};

use crate::{MrpError, Result};

/// BOM 展開與組合優化的參數配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// BOM 最大展開深度（防止循環）
    pub max_bom_depth: usize,

    /// 資料來源查詢的最大並行數
    pub lookup_concurrency: usize,

    /// 每次庫存查詢的物料數量
    pub inventory_batch_size: usize,

    /// 組合優化的最大迭代次數
    pub max_optimization_passes: usize,

    /// 參照ID上的組合標記後綴（名稱相似度推測時去除）
    pub combo_marker_suffix: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_bom_depth: 10,
            lookup_concurrency: 5,
            inventory_batch_size: 100,
            max_optimization_passes: 100,
            combo_marker_suffix: "-CMB".to_string(),
        }
    }
}

impl EngineConfig {
    /// 創建預設配置
    pub fn new() -> Self {
        Self::default()
    }

    /// 從 JSON 讀取配置，缺少的欄位使用預設值
    ///
    /// # 範例
    /// ```
    /// # use mrp_core::EngineConfig;
    /// let config = EngineConfig::from_json(r#"{ "max_bom_depth": 6 }"#).unwrap();
    /// assert_eq!(config.max_bom_depth, 6);
    /// assert_eq!(config.lookup_concurrency, 5);
    /// ```
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| MrpError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// 建構器模式：設置最大展開深度
    pub fn with_max_bom_depth(mut self, depth: usize) -> Self {
        self.max_bom_depth = depth;
        self
    }

    /// 建構器模式：設置查詢並行數
    pub fn with_lookup_concurrency(mut self, concurrency: usize) -> Self {
        self.lookup_concurrency = concurrency;
        self
    }

    /// 建構器模式：設置庫存查詢批量
    pub fn with_inventory_batch_size(mut self, size: usize) -> Self {
        self.inventory_batch_size = size;
        self
    }

    /// 建構器模式：設置最大優化迭代次數
    pub fn with_max_optimization_passes(mut self, passes: usize) -> Self {
        self.max_optimization_passes = passes;
        self
    }

    /// 建構器模式：設置組合標記後綴
    pub fn with_combo_marker_suffix(mut self, suffix: &str) -> Self {
        self.combo_marker_suffix = suffix.to_string();
        self
    }

    /// 檢查配置是否有效
    pub fn validate(&self) -> Result<()> {
        if self.lookup_concurrency == 0 {
            return Err(MrpError::InvalidConfig(
                "lookup_concurrency 必須大於 0".to_string(),
            ));
        }
        if self.inventory_batch_size == 0 {
            return Err(MrpError::InvalidConfig(
                "inventory_batch_size 必須大於 0".to_string(),
            ));
        }
        if self.max_optimization_passes == 0 {
            return Err(MrpError::InvalidConfig(
                "max_optimization_passes 必須大於 0".to_string(),
            ));
        }
        Ok(())
    }
}
