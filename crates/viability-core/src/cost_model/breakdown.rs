use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::types::Money;

/// Accounting nature of a cost line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostCategory {
    Capital,
    Operating,
    Regulatory,
    Insurance,
}

/// A single line of the cost estimate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostLineItem {
    pub name: String,
    pub category: CostCategory,
    /// Amount before the location multiplier
    pub base_amount: Money,
    /// Amount after the location multiplier
    pub amount: Money,
    /// Share of the item's aggregate (CAPEX or OPEX), 0..100
    #[serde(default)]
    pub percentage_of_total: Decimal,
    pub description: String,
    /// true = annual OPEX, false = one-time CAPEX
    pub recurring: bool,
    #[serde(default = "unit_multiplier")]
    pub location_multiplier: Decimal,
}

fn unit_multiplier() -> Decimal {
    Decimal::ONE
}

impl CostLineItem {
    pub fn capital(
        name: &str,
        category: CostCategory,
        amount: Money,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.to_string(),
            category,
            base_amount: amount,
            amount,
            percentage_of_total: Decimal::ZERO,
            description: description.into(),
            recurring: false,
            location_multiplier: Decimal::ONE,
        }
    }

    pub fn annual(
        name: &str,
        category: CostCategory,
        amount: Money,
        description: impl Into<String>,
    ) -> Self {
        Self {
            recurring: true,
            ..Self::capital(name, category, amount, description)
        }
    }
}

#[derive(Deserialize)]
struct BreakdownRecord {
    items: Vec<CostLineItem>,
}

impl From<BreakdownRecord> for CostBreakdown {
    fn from(record: BreakdownRecord) -> Self {
        CostBreakdown::new(record.items)
    }
}

/// Ordered cost lines with derived aggregates.
///
/// Line items are only reachable through methods that keep `total_capex`,
/// `annual_opex` and every `percentage_of_total` in step with the amounts.
/// Deserialising reads the items and recomputes everything else.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "BreakdownRecord")]
pub struct CostBreakdown {
    items: Vec<CostLineItem>,
    total_capex: Money,
    annual_opex: Money,
    location_multiplier: Decimal,
}

impl CostBreakdown {
    pub fn new(items: Vec<CostLineItem>) -> Self {
        let mut breakdown = Self {
            items,
            total_capex: Decimal::ZERO,
            annual_opex: Decimal::ZERO,
            location_multiplier: Decimal::ONE,
        };
        breakdown.recompute();
        breakdown
    }

    pub fn items(&self) -> &[CostLineItem] {
        &self.items
    }

    pub fn capex_items(&self) -> impl Iterator<Item = &CostLineItem> {
        self.items.iter().filter(|i| !i.recurring)
    }

    pub fn opex_items(&self) -> impl Iterator<Item = &CostLineItem> {
        self.items.iter().filter(|i| i.recurring)
    }

    pub fn total_capex(&self) -> Money {
        self.total_capex
    }

    pub fn annual_opex(&self) -> Money {
        self.annual_opex
    }

    pub fn location_multiplier(&self) -> Decimal {
        self.location_multiplier
    }

    pub fn push(&mut self, item: CostLineItem) {
        self.items.push(item);
        self.recompute();
    }

    /// Re-price every CAPEX line as `base_amount × multiplier`. OPEX lines
    /// are left untouched.
    pub fn apply_location_multiplier(&mut self, multiplier: Decimal) {
        for item in self.items.iter_mut().filter(|i| !i.recurring) {
            item.location_multiplier = multiplier;
            item.amount = item.base_amount * multiplier;
        }
        self.recompute();
    }

    /// Scale all CAPEX lines (base and adjusted amounts alike).
    pub fn scale_capex(&mut self, factor: Decimal) {
        for item in self.items.iter_mut().filter(|i| !i.recurring) {
            item.base_amount *= factor;
            item.amount *= factor;
        }
        self.recompute();
    }

    /// Scale all OPEX lines.
    pub fn scale_opex(&mut self, factor: Decimal) {
        for item in self.items.iter_mut().filter(|i| i.recurring) {
            item.base_amount *= factor;
            item.amount *= factor;
        }
        self.recompute();
    }

    fn recompute(&mut self) {
        self.total_capex = self.capex_items().map(|i| i.amount).sum();
        self.annual_opex = self.opex_items().map(|i| i.amount).sum();
        let multiplier = self
            .capex_items()
            .next()
            .map(|i| i.location_multiplier)
            .unwrap_or(Decimal::ONE);
        self.location_multiplier = multiplier;

        let (capex, opex) = (self.total_capex, self.annual_opex);
        for item in &mut self.items {
            let aggregate = if item.recurring { opex } else { capex };
            item.percentage_of_total = if aggregate.is_zero() {
                Decimal::ZERO
            } else {
                item.amount / aggregate * dec!(100)
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> CostBreakdown {
        CostBreakdown::new(vec![
            CostLineItem::capital("equipment", CostCategory::Capital, dec!(600), "panels"),
            CostLineItem::capital("permitting", CostCategory::Regulatory, dec!(300), "permits"),
            CostLineItem::annual("o&m", CostCategory::Operating, dec!(30), "service"),
            CostLineItem::annual("insurance", CostCategory::Insurance, dec!(10), "cover"),
        ])
    }

    fn pct_sum<'a>(items: impl Iterator<Item = &'a CostLineItem>) -> Decimal {
        items.map(|i| i.percentage_of_total).sum()
    }

    #[test]
    fn test_aggregates_split_by_recurring_flag() {
        let b = sample();
        assert_eq!(b.total_capex(), dec!(900));
        assert_eq!(b.annual_opex(), dec!(40));
        assert_eq!(b.items()[2].percentage_of_total, dec!(75));
    }

    #[test]
    fn test_percentages_close_within_each_aggregate() {
        let b = sample();
        assert!((pct_sum(b.capex_items()) - dec!(100)).abs() < dec!(0.0000001));
        assert!((pct_sum(b.opex_items()) - dec!(100)).abs() < dec!(0.0000001));
    }

    #[test]
    fn test_push_recomputes_percentages() {
        let mut b = sample();
        b.push(CostLineItem::capital("grid", CostCategory::Capital, dec!(100), "line"));
        assert_eq!(b.total_capex(), dec!(1000));
        assert_eq!(b.items()[0].percentage_of_total, dec!(60));
        assert!((pct_sum(b.capex_items()) - dec!(100)).abs() < dec!(0.0000001));
    }

    #[test]
    fn test_location_multiplier_touches_capex_only() {
        let mut b = sample();
        b.apply_location_multiplier(dec!(1.15));
        assert_eq!(b.total_capex(), dec!(1035));
        assert_eq!(b.annual_opex(), dec!(40));
        assert_eq!(b.location_multiplier(), dec!(1.15));
        for item in b.capex_items() {
            assert_eq!(item.amount, item.base_amount * dec!(1.15));
        }
    }

    #[test]
    fn test_deserialise_recomputes_derived_fields() {
        let b = sample();
        let mut json = serde_json::to_value(&b).unwrap();
        json["total_capex"] = serde_json::json!("1");
        let restored: CostBreakdown = serde_json::from_value(json).unwrap();
        assert_eq!(restored, b);
    }
}
