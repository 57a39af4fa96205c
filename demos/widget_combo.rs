//! 組合生產規劃示例
//!
//! ```text
//! RUST_LOG=debug cargo run --example widget_combo
//! ```

use anyhow::Context;
use combo_mrp::{logging, parse_import_str, ComboPlanner, Demand, EngineConfig, InventoryRecord, MemoryRepository};
use rust_decimal::Decimal;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();

    let repo = MemoryRepository::new()
        .with_bom_line("WIDGET-PT", "FRAME", Decimal::from(1))
        .with_bom_line("WIDGET-PT", "PANEL-L", Decimal::from(2))
        .with_bom_line("WIDGET-PT", "PANEL-R", Decimal::from(2))
        .with_bom_line("FRAME", "BOLT", Decimal::from(8))
        .with_combo_output("CMB.PANELS", "PANEL-L", Decimal::from(6))
        .with_combo_output("CMB.PANELS", "PANEL-R", Decimal::from(4))
        .with_combo_output("CMB.FRAME", "FRAME", Decimal::from(5))
        .with_cycle_time("CMB.PANELS", Decimal::from(45))
        .with_cycle_time("CMB.FRAME", Decimal::from(30))
        .with_primary_combo("PANEL-L", "CMB.PANELS")
        .with_inventory(InventoryRecord::new("PANEL-R", Decimal::from(6)))
        .with_inventory(InventoryRecord::new("BOLT", Decimal::from(500)).with_min_threshold(Decimal::from(200)));

    let config = EngineConfig::from_json(r#"{ "max_optimization_passes": 20 }"#)?;
    let mut outcome = ComboPlanner::new(config)
        .plan(&repo, &[Demand::new("WIDGET-PT", Decimal::from(25))])
        .await
        .context("規劃失敗")?;

    println!("== 淨需求 ==");
    for analysis in &outcome.mrp.netting.analysis {
        println!(
            "{:<10} 需求 {:>6} 庫存 {:>6} 生產 {:>6} {:?}",
            analysis.component_id, analysis.required, analysis.on_hand, analysis.to_produce, analysis.status
        );
    }
    for requirement in &outcome.unassigned {
        println!("無組合: {} x{}", requirement.component_id, requirement.to_produce);
    }

    let report = outcome.session.optimize();
    println!("\n== 優化: {} 輪, 收斂 {} ==", report.passes_used, report.converged);
    for group in outcome.session.combo_views() {
        println!(
            "{:<12} {:>4} 批 {:>6} 分鐘",
            group.combo, group.total_batches, group.estimated_minutes
        );
    }

    let batch = parse_import_str("combo,cantidad\nCMB.PANELS,10\nCMB.UNKNOWN,3\n")?;
    let application = outcome.session.apply_import(&batch.rows);
    println!(
        "\n== 匯入: 套用 {}, 未匹配 {}, 略過 {} ==",
        application.applied.len(),
        application.unmatched,
        batch.summary.skipped
    );
    application.report.write_csv(std::io::stdout())?;

    Ok(())
}
