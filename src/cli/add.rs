use super::{portfolio, ui};
use crate::app::{AddReport, App};
use crate::core::market::Market;
use anyhow::Result;

impl AddReport {
    pub fn display_as_table(&self) -> String {
        let verb = if self.merged { "Merged" } else { "Added" };
        let mut output = format!(
            "{verb} {} ({}): value {}\n\n",
            ui::style_text(&self.holding.symbol, ui::StyleType::TotalLabel),
            self.holding.market,
            ui::style_text(
                &format!("{:.2} {}", self.holding.value, self.holding.currency),
                ui::StyleType::TotalValue
            )
        );
        output.push_str(&portfolio::holdings_table(self.portfolio.iter().enumerate(), None).to_string());
        output
    }
}

pub async fn run(app: &App, market: Market, symbol: &str, amount: f64, json: bool) -> Result<()> {
    let pb = ui::new_spinner(&format!("Pricing {symbol}..."));
    let report = app.add(market, symbol, amount).await;
    pb.finish_and_clear();

    let report = report?;
    if json {
        return ui::print_json(&report);
    }
    println!("{}", report.display_as_table());
    Ok(())
}
