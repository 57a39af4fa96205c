//! 組合批數匯入
//!
//! 格式：標題列 `combo,cantidad`，之後每列 `組合名稱,批數`。

use std::io;

use mrp_core::MrpError;
use serde::{Deserialize, Serialize};

/// 匯入的一列
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportRow {
    pub combo: String,
    pub quantity: u64,
}

/// 匯入摘要
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    /// 讀取的資料列（不含標題）
    pub rows_read: usize,
    pub accepted: usize,

    /// 組合名稱為空、批數非正整數或欄位不足而略過的列
    pub skipped: usize,
}

/// 解析後的匯入批次
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportBatch {
    pub rows: Vec<ImportRow>,
    pub summary: ImportSummary,
}

const EXPECTED_HEADER: [&str; 2] = ["combo", "cantidad"];

/// 解析匯入檔
///
/// 標題不符返回 [`MrpError::MalformedImport`]；個別不合格的列只計數。
pub fn parse_import<R: io::Read>(reader: R) -> mrp_core::Result<ImportBatch> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader
        .headers()
        .map_err(|e| MrpError::MalformedImport(format!("無法讀取標題: {}", e)))?;
    let header_ok = headers.len() >= EXPECTED_HEADER.len()
        && EXPECTED_HEADER
            .iter()
            .zip(headers.iter())
            .all(|(expected, actual)| actual.trim_start_matches('\u{feff}').eq_ignore_ascii_case(expected));
    if !header_ok {
        return Err(MrpError::MalformedImport(format!(
            "標題應為 combo,cantidad，實際為 {}",
            headers.iter().collect::<Vec<_>>().join(",")
        )));
    }

    let mut batch = ImportBatch::default();
    for record in reader.records() {
        batch.summary.rows_read += 1;
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                tracing::debug!("略過無法解析的列: {}", e);
                batch.summary.skipped += 1;
                continue;
            }
        };

        let combo = record.get(0).unwrap_or("").to_string();
        let quantity = record
            .get(1)
            .and_then(|q| q.parse::<u64>().ok())
            .filter(|q| *q > 0);

        match quantity {
            Some(quantity) if !combo.is_empty() => {
                batch.rows.push(ImportRow { combo, quantity });
                batch.summary.accepted += 1;
            }
            _ => {
                tracing::debug!("略過匯入列: {:?}", record);
                batch.summary.skipped += 1;
            }
        }
    }

    tracing::info!(
        "匯入解析完成: {} 列, 接受 {}, 略過 {}",
        batch.summary.rows_read,
        batch.summary.accepted,
        batch.summary.skipped
    );

    Ok(batch)
}

/// 從字串解析匯入內容
pub fn parse_import_str(content: &str) -> mrp_core::Result<ImportBatch> {
    parse_import(content.as_bytes())
}
