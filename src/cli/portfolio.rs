use super::ui;
use crate::app::{App, ListReport, MutationReport, ValueReport};
use crate::core::converter::{ConversionEntry, Conversions};
use crate::core::holding::Holding;
use crate::core::sort::SortColumn;
use crate::core::valuation::HoldingContribution;
use anyhow::Result;
use comfy_table::{Cell, Table};

/// Holdings table; `index` is the stored position `remove` expects.
pub fn holdings_table<'a>(
    rows: impl IntoIterator<Item = (usize, &'a Holding)>,
    contributions: Option<&[HoldingContribution]>,
) -> Table {
    let mut table = ui::new_styled_table();
    let mut header = vec![
        ui::header_cell("#"),
        ui::header_cell("Symbol"),
        ui::header_cell("Market"),
        ui::header_cell("Quantity"),
        ui::header_cell("Price"),
        ui::header_cell("Value"),
    ];
    if contributions.is_some() {
        header.push(ui::header_cell("Value (USD)"));
        header.push(ui::header_cell("Weight (%)"));
    }
    table.set_header(header);

    for (position, (index, holding)) in rows.into_iter().enumerate() {
        let quantity = match holding.weight_grams() {
            Some(grams) => format!("{grams:.2} g"),
            None => format!("{}", holding.quantity()),
        };
        let mut row = vec![
            Cell::new(index),
            Cell::new(&holding.symbol),
            Cell::new(holding.market),
            ui::number_cell(quantity),
            ui::number_cell(format!("{:.2} {}", holding.price, holding.currency)),
            ui::number_cell(format!("{:.2} {}", holding.value, holding.currency)),
        ];
        if let Some(contributions) = contributions {
            let contribution = contributions.get(position);
            row.push(ui::format_optional_cell(
                contribution.map(|c| c.value_usd),
                |v| format!("{v:.2}"),
            ));
            row.push(ui::format_optional_cell(
                contribution.and_then(|c| c.weight_pct),
                |w| format!("{w:.2}%"),
            ));
        }
        table.add_row(row);
    }
    table
}

pub fn conversions_table(conversions: &Conversions) -> Table {
    let mut table = ui::new_styled_table();
    table.set_header(vec![ui::header_cell("Currency"), ui::header_cell("Amount")]);
    for (currency, entry) in conversions {
        let amount = match entry {
            ConversionEntry::Amount(amount) => ui::number_cell(format!("{amount:.2}")),
            ConversionEntry::Failed { error } => ui::error_cell(error),
        };
        table.add_row(vec![Cell::new(currency), amount]);
    }
    table
}

impl ValueReport {
    pub fn display_as_table(&self) -> String {
        match self {
            ValueReport::Empty { message, .. } => ui::style_text(message, ui::StyleType::Subtle),
            ValueReport::Valued {
                holdings,
                total_value,
                contributions,
            } => {
                let mut output = format!(
                    "{}\n\n",
                    ui::style_text("Portfolio", ui::StyleType::Title)
                );
                let table = holdings_table(holdings.iter().enumerate(), Some(contributions.as_slice()));
                output.push_str(&table.to_string());
                output.push_str(&format!(
                    "\n\nTotal Value ({}): {}\n\n",
                    ui::style_text(total_value.base.currency, ui::StyleType::TotalLabel),
                    ui::style_text(
                        &format!("{:.2}", total_value.base.amount),
                        ui::StyleType::TotalValue
                    )
                ));
                output.push_str(&conversions_table(&total_value.conversions).to_string());
                output
            }
        }
    }
}

impl ListReport {
    pub fn display_as_table(&self) -> String {
        if self.holdings.is_empty() {
            return ui::style_text("Portfolio is empty", ui::StyleType::Subtle);
        }
        let rows = self.holdings.iter().map(|h| (h.index, &h.holding));
        let mut output = holdings_table(rows, None).to_string();
        if let (Some(column), Some(direction)) = (self.sort, self.direction) {
            output.push_str(&format!(
                "\n{}",
                ui::style_text(
                    &format!("Sorted by {column}, {direction:?}").to_lowercase(),
                    ui::StyleType::Subtle
                )
            ));
        }
        output
    }
}

fn print_mutation(report: &MutationReport, json: bool) -> Result<()> {
    if json {
        return ui::print_json(report);
    }
    match (&report.removed, &report.message) {
        (Some(removed), _) => println!(
            "Removed {} ({})",
            ui::style_text(&removed.symbol, ui::StyleType::TotalLabel),
            removed.market
        ),
        (None, Some(message)) => println!("{message}"),
        (None, None) => {}
    }
    Ok(())
}

pub async fn value(app: &App, json: bool) -> Result<()> {
    let pb = ui::new_spinner("Valuing portfolio...");
    let report = app.value().await;
    pb.finish_and_clear();

    let report = report?;
    if json {
        return ui::print_json(&report);
    }
    println!("{}", report.display_as_table());
    Ok(())
}

pub async fn list(app: &App, sort: Option<SortColumn>, json: bool) -> Result<()> {
    let report = app.list(sort).await?;
    if json {
        return ui::print_json(&report);
    }
    println!("{}", report.display_as_table());
    Ok(())
}

pub async fn remove(app: &App, index: usize, json: bool) -> Result<()> {
    print_mutation(&app.remove(index).await?, json)
}

pub async fn clear(app: &App, json: bool) -> Result<()> {
    print_mutation(&app.clear().await?, json)
}
