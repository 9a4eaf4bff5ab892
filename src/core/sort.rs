//! Column ordering for the holdings table.

use crate::core::error::PortfolioError;
use crate::core::holding::{Holding, Position};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt::Display;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortColumn {
    Symbol,
    Market,
    Quantity,
    Price,
    Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    fn flipped(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }
}

impl Display for SortColumn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SortColumn::Symbol => "symbol",
            SortColumn::Market => "market",
            SortColumn::Quantity => "quantity",
            SortColumn::Price => "price",
            SortColumn::Value => "value",
        };
        write!(f, "{name}")
    }
}

impl FromStr for SortColumn {
    type Err = PortfolioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "symbol" => Ok(SortColumn::Symbol),
            "market" => Ok(SortColumn::Market),
            "quantity" | "qty" => Ok(SortColumn::Quantity),
            "price" => Ok(SortColumn::Price),
            "value" => Ok(SortColumn::Value),
            _ => Err(PortfolioError::validation(format!(
                "Unknown sort column: {s}"
            ))),
        }
    }
}

/// Last applied ordering; drives the ascending/descending toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SortState {
    pub column: Option<SortColumn>,
    pub direction: SortDirection,
}

impl SortState {
    /// Same column flips direction, a new column starts ascending.
    pub fn select(&mut self, column: SortColumn) -> SortDirection {
        self.direction = if self.column == Some(column) {
            self.direction.flipped()
        } else {
            SortDirection::Ascending
        };
        self.column = Some(column);
        self.direction
    }
}

enum SortKey {
    Text(String),
    Number(f64),
}

fn sort_key(holding: &Holding, column: SortColumn) -> SortKey {
    match column {
        SortColumn::Symbol => SortKey::Text(holding.symbol.to_lowercase()),
        SortColumn::Market => SortKey::Text(holding.market.code().to_lowercase()),
        SortColumn::Quantity => SortKey::Number(match holding.position {
            Position::Units { quantity } => quantity,
            Position::Metal { weight_grams, .. } => weight_grams,
            Position::Cash => 0.0,
        }),
        SortColumn::Price => SortKey::Number(finite_or_zero(holding.price)),
        SortColumn::Value => SortKey::Number(finite_or_zero(holding.value)),
    }
}

fn finite_or_zero(v: f64) -> f64 {
    if v.is_finite() { v } else { 0.0 }
}

fn compare(a: &SortKey, b: &SortKey) -> Ordering {
    match (a, b) {
        (SortKey::Text(a), SortKey::Text(b)) => a.cmp(b),
        (SortKey::Number(a), SortKey::Number(b)) => a.total_cmp(b),
        _ => Ordering::Equal,
    }
}

/// Positions of `holdings` in display order. The sort is stable, so equal
/// rows keep their stored order.
pub fn sort_order(holdings: &[Holding], column: SortColumn, direction: SortDirection) -> Vec<usize> {
    let mut keyed: Vec<(SortKey, usize)> = holdings
        .iter()
        .enumerate()
        .map(|(index, h)| (sort_key(h, column), index))
        .collect();

    keyed.sort_by(|(a, _), (b, _)| match direction {
        SortDirection::Ascending => compare(a, b),
        SortDirection::Descending => compare(b, a),
    });

    keyed.into_iter().map(|(_, index)| index).collect()
}

pub fn sort_holdings(holdings: &[Holding], column: SortColumn, direction: SortDirection) -> Vec<Holding> {
    sort_order(holdings, column, direction)
        .into_iter()
        .map(|index| holdings[index].clone())
        .collect()
}
