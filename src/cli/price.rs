use super::ui;
use crate::app::{App, PriceReport};
use crate::core::market::Market;
use anyhow::Result;
use comfy_table::Cell;

impl PriceReport {
    pub fn display_as_table(&self) -> String {
        let mut table = ui::new_styled_table();
        match self {
            PriceReport::Quote(quote) => {
                table.set_header(vec![
                    ui::header_cell("Symbol"),
                    ui::header_cell("Name"),
                    ui::header_cell("Price"),
                    ui::header_cell("Currency"),
                    ui::header_cell("Source"),
                ]);
                table.add_row(vec![
                    Cell::new(&quote.symbol),
                    Cell::new(quote.name.as_deref().unwrap_or("")),
                    ui::number_cell(format!("{:.4}", quote.price)),
                    Cell::new(&quote.currency),
                    Cell::new(quote.source.as_deref().unwrap_or("")),
                ]);
            }
            PriceReport::Metal(metal) => {
                table.set_header(vec![
                    ui::header_cell("Metal"),
                    ui::header_cell("Price / oz"),
                    ui::header_cell("Weight (g)"),
                    ui::header_cell(&format!("Value ({})", metal.currency)),
                ]);
                table.add_row(vec![
                    Cell::new(format!("{} ({})", metal.symbol, metal.metal_type)),
                    ui::number_cell(format!("{:.2}", metal.price_per_ounce)),
                    ui::number_cell(format!("{:.2}", metal.weight_grams)),
                    ui::number_cell(format!("{:.2}", metal.total_value)),
                ]);
            }
        }
        table.to_string()
    }
}

pub async fn run(
    app: &App,
    market: Market,
    symbol: &str,
    weight_grams: Option<f64>,
    json: bool,
) -> Result<()> {
    let pb = ui::new_spinner(&format!("Fetching {market} price for {symbol}..."));
    let report = app.price(market, symbol, weight_grams).await;
    pb.finish_and_clear();

    let report = report?;
    if json {
        return ui::print_json(&report);
    }
    println!("{}", report.display_as_table());
    Ok(())
}
