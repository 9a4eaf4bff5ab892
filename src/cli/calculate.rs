use super::{portfolio, ui};
use crate::app::{App, CalculateReport};
use crate::core::holding::Holding;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Accepts a bare array or the `{"holdings": [...]}` request body.
#[derive(Deserialize)]
#[serde(untagged)]
enum HoldingsFile {
    List(Vec<Holding>),
    Wrapped { holdings: Vec<Holding> },
}

pub fn read_holdings(path: &Path) -> Result<Vec<Holding>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read holdings file: {}", path.display()))?;
    let file: HoldingsFile = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse holdings file: {}", path.display()))?;
    Ok(match file {
        HoldingsFile::List(holdings) | HoldingsFile::Wrapped { holdings } => holdings,
    })
}

impl CalculateReport {
    pub fn display_as_table(&self) -> String {
        match self {
            CalculateReport::Empty { message, .. } => {
                ui::style_text(message, ui::StyleType::Subtle)
            }
            CalculateReport::Valued(valuation) => {
                let mut output = format!(
                    "Total Value ({}): {}\n\n",
                    ui::style_text("USD", ui::StyleType::TotalLabel),
                    ui::style_text(
                        &format!("{:.2}", valuation.total_usd),
                        ui::StyleType::TotalValue
                    )
                );
                output.push_str(&portfolio::conversions_table(&valuation.conversions).to_string());
                output
            }
        }
    }
}

pub async fn run(app: &App, path: &Path, json: bool) -> Result<()> {
    let holdings = read_holdings(path)?;

    let pb = ui::new_spinner(&format!("Valuing {} holdings...", holdings.len()));
    let report = app.calculate(&holdings).await;
    pb.finish_and_clear();

    let report = report?;
    if json {
        return ui::print_json(&report);
    }
    println!("{}", report.display_as_table());
    Ok(())
}
