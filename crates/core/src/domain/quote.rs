use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::crm::CustomerKind;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerRef {
    pub kind: CustomerKind,
    pub id: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuoteLine {
    pub description: String,
    pub quantity: u32,
    pub unit_price: Decimal,
}

impl QuoteLine {
    pub fn line_total(&self) -> Decimal {
        Decimal::from(self.quantity) * self.unit_price
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub id: String,
    pub number: String,
    pub customer: CustomerRef,
    pub description: String,
    pub lines: Vec<QuoteLine>,
    pub subtotal: Decimal,
    pub total: Decimal,
    pub created_at: DateTime<Utc>,
}

impl Quote {
    /// Sum of per-line quantity × unit price. No tax or discount is applied
    /// from model-proposed data.
    pub fn compute_totals(lines: &[QuoteLine]) -> Decimal {
        lines.iter().map(QuoteLine::line_total).sum()
    }
}

/// Generates the next sequential quote number from the most recently
/// created one by parsing its numeric suffix and incrementing it.
///
/// This is a read-last-increment sequence, not a transactional counter:
/// two processes executing quote-creating packages concurrently can mint
/// the same number. Known, accepted weakness.
pub fn next_quote_number(last: Option<&str>, prefix: &str) -> String {
    let next = last
        .and_then(|number| {
            let digits: String = number.chars().rev().take_while(char::is_ascii_digit).collect();
            digits.chars().rev().collect::<String>().parse::<u64>().ok()
        })
        .map(|suffix| suffix + 1)
        .unwrap_or(1);

    format!("{prefix}{next:04}")
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{next_quote_number, Quote, QuoteLine};

    fn line(quantity: u32, unit_price_cents: i64) -> QuoteLine {
        QuoteLine {
            description: "line".to_string(),
            quantity,
            unit_price: Decimal::new(unit_price_cents, 2),
        }
    }

    #[test]
    fn totals_sum_quantity_times_unit_price() {
        let total = Quote::compute_totals(&[line(3, 1000), line(1, 2550)]);
        assert_eq!(total, Decimal::new(5550, 2));
    }

    #[test]
    fn next_number_increments_numeric_suffix() {
        assert_eq!(next_quote_number(Some("QT-0041"), "QT-"), "QT-0042");
        assert_eq!(next_quote_number(Some("QT-9999"), "QT-"), "QT-10000");
    }

    #[test]
    fn missing_or_garbled_last_number_starts_at_one() {
        assert_eq!(next_quote_number(None, "QT-"), "QT-0001");
        assert_eq!(next_quote_number(Some("QT-draft"), "QT-"), "QT-0001");
    }
}
