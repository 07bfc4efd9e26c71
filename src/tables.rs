use comfy_table::{modifiers, presets, Attribute, Cell, CellAlignment, Color, Table};

use btm_dispatch::bundle::FrontierSummary;
use btm_dispatch::evaluation::Metrics;

fn new_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL_CONDENSED)
        .apply_modifier(modifiers::UTF8_ROUND_CORNERS);
    table
}

fn number(value: f64, precision: usize) -> Cell {
    Cell::new(format!("{value:.precision$}")).set_alignment(CellAlignment::Right)
}

pub fn build_metrics_table(metrics: &Metrics) -> Table {
    let mut table = new_table();
    table.set_header(vec!["", "Baseline", "Optimized", "Difference"]);
    table.add_row(vec![
        Cell::new("Cost, £"),
        number(metrics.baseline_cost_gbp, 2),
        number(metrics.optimal_cost_gbp, 2),
        number(metrics.savings_gbp, 2).fg(if metrics.savings_gbp >= 0.0 {
            Color::Green
        } else {
            Color::Red
        }),
    ]);
    table.add_row(vec![
        Cell::new("Peak import, kW"),
        number(metrics.baseline_peak_import_kw, 2),
        number(metrics.optimal_peak_import_kw, 2),
        number(metrics.peak_reduction_kw, 2).fg(if metrics.peak_reduction_kw >= 0.0 {
            Color::Green
        } else {
            Color::Red
        }),
    ]);
    table.add_row(vec![
        Cell::new("Savings, %"),
        Cell::new(""),
        Cell::new(""),
        number(metrics.savings_pct, 1),
    ]);
    table.add_row(vec![
        Cell::new("Throughput, kWh"),
        Cell::new(""),
        number(metrics.battery_throughput_kwh, 2),
        Cell::new(format!("{:.2} cycles", metrics.battery_cycles)).add_attribute(Attribute::Dim),
    ]);
    table.add_row(vec![
        Cell::new("Import / export, kWh"),
        Cell::new(""),
        Cell::new(format!("{:.2} / {:.2}", metrics.total_import_kwh, metrics.total_export_kwh))
            .set_alignment(CellAlignment::Right),
        Cell::new(""),
    ]);
    table
}

pub fn build_frontier_table(summary: &FrontierSummary) -> Table {
    let mut table = new_table();
    table.set_header(vec!["#", "Peak, kW", "Energy cost, £", "Total cost, £"]);
    for (index, point) in summary.points.iter().enumerate() {
        let marker = if index == summary.selected_index {
            Cell::new(format!("{index} ◀")).fg(Color::Green).add_attribute(Attribute::Bold)
        } else {
            Cell::new(index)
        };
        table.add_row(vec![
            marker,
            number(point.peak_demand_kw, 3),
            number(point.energy_cost_gbp, 4),
            number(point.total_cost_gbp, 4),
        ]);
    }
    table
}
