use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};
use serde::Serialize;
use std::sync::Arc;
use tracing::{instrument, warn};
use uuid::Uuid;

use crate::{
    entities::cost_layer::{self, Entity as CostLayerEntity},
    errors::ServiceError,
};

/// FIFO valuation for a given on-hand quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Valuation {
    pub tax_excluded_value: Decimal,
    pub tax_included_value: Decimal,
    /// On-hand quantity not covered by any cost layer. Non-zero means the
    /// recorded receipts lag behind the physical count; the excess is
    /// valued at the newest layer's cost instead of failing the report.
    pub uncovered_quantity: i32,
}

/// Computes FIFO inventory valuation from purchase cost layers.
///
/// Strictly read-only: never decrements `remaining_quantity`. Issuing stock
/// is the inventory-issue operation's job.
#[derive(Clone)]
pub struct ValuationService {
    db: Arc<DatabaseConnection>,
}

impl ValuationService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Values `on_hand_quantity` units of a product against its cost
    /// layers, oldest acquisition first.
    #[instrument(skip(self))]
    pub async fn valuate(
        &self,
        product_id: Uuid,
        on_hand_quantity: i32,
    ) -> Result<Valuation, ServiceError> {
        if on_hand_quantity < 0 {
            return Err(ServiceError::ValidationError(format!(
                "on-hand quantity must not be negative, got {}",
                on_hand_quantity
            )));
        }

        let layers = self.fetch_layers(product_id).await?;
        let valuation = fifo_valuation(&layers, on_hand_quantity);
        if valuation.uncovered_quantity > 0 {
            warn!(
                product_id = %product_id,
                uncovered = valuation.uncovered_quantity,
                "On-hand quantity exceeds recorded cost layers; excess valued at newest layer cost"
            );
        }
        Ok(valuation)
    }

    /// Cost layers for a product in FIFO order: acquisition date ascending,
    /// ties broken by original receipt order.
    async fn fetch_layers(
        &self,
        product_id: Uuid,
    ) -> Result<Vec<cost_layer::Model>, ServiceError> {
        let layers = CostLayerEntity::find()
            .filter(cost_layer::Column::ProductId.eq(product_id))
            .order_by_asc(cost_layer::Column::AcquiredAt)
            .order_by_asc(cost_layer::Column::CreatedAt)
            .order_by_asc(cost_layer::Column::Id)
            .all(&*self.db)
            .await?;
        Ok(layers)
    }
}

/// Pure FIFO fold over cost layers.
///
/// Consumes each layer's remaining quantity in order until the on-hand
/// quantity is covered. When the layers run out first the excess is valued
/// at the last layer's unit costs and reported as `uncovered_quantity`;
/// valuation never fails for that case since it feeds reporting paths.
pub fn fifo_valuation(layers: &[cost_layer::Model], on_hand_quantity: i32) -> Valuation {
    let mut remaining = on_hand_quantity.max(0);
    let mut tax_excluded_value = Decimal::ZERO;
    let mut tax_included_value = Decimal::ZERO;

    for layer in layers {
        if remaining == 0 {
            break;
        }
        let consume = layer.remaining_quantity.clamp(0, remaining);
        tax_excluded_value += Decimal::from(consume) * layer.unit_cost_ex_tax;
        tax_included_value += Decimal::from(consume) * layer.unit_cost_inc_tax;
        remaining -= consume;
    }

    if remaining > 0 {
        if let Some(last) = layers.last() {
            tax_excluded_value += Decimal::from(remaining) * last.unit_cost_ex_tax;
            tax_included_value += Decimal::from(remaining) * last.unit_cost_inc_tax;
        }
    }

    Valuation {
        tax_excluded_value,
        tax_included_value,
        uncovered_quantity: remaining,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn layer(
        date: (i32, u32, u32),
        ex: Decimal,
        inc: Decimal,
        remaining: i32,
    ) -> cost_layer::Model {
        cost_layer::Model {
            id: Uuid::new_v4(),
            product_id: Uuid::nil(),
            acquired_at: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            unit_cost_ex_tax: ex,
            unit_cost_inc_tax: inc,
            remaining_quantity: remaining,
            original_quantity: remaining,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn single_layer_fully_covers_on_hand() {
        let layers = vec![layer((2023, 10, 1), dec!(100), dec!(110), 15)];
        let v = fifo_valuation(&layers, 15);
        assert_eq!(v.tax_excluded_value, dec!(1500));
        assert_eq!(v.tax_included_value, dec!(1650));
        assert_eq!(v.uncovered_quantity, 0);
    }

    #[test]
    fn consumed_older_layers_leave_on_hand_in_newest() {
        // Older layers already issued down to zero; the 8 remaining units
        // all sit in the 2023-10-03 layer.
        let layers = vec![
            layer((2023, 10, 1), dec!(100), dec!(110), 0),
            layer((2023, 10, 2), dec!(150), dec!(165), 0),
            layer((2023, 10, 3), dec!(200), dec!(220), 8),
        ];
        let v = fifo_valuation(&layers, 8);
        assert_eq!(v.tax_excluded_value, dec!(1600));
        assert_eq!(v.tax_included_value, dec!(1760));
        assert_eq!(v.uncovered_quantity, 0);
    }

    #[test]
    fn spans_multiple_layers_in_acquisition_order() {
        let layers = vec![
            layer((2023, 10, 1), dec!(100), dec!(110), 5),
            layer((2023, 10, 2), dec!(200), dec!(220), 10),
        ];
        let v = fifo_valuation(&layers, 8);
        // 5 @ 100 + 3 @ 200
        assert_eq!(v.tax_excluded_value, dec!(1100));
        assert_eq!(v.tax_included_value, dec!(1210));
    }

    #[test]
    fn excess_over_layers_valued_at_last_layer_cost() {
        let layers = vec![
            layer((2023, 10, 1), dec!(100), dec!(110), 4),
            layer((2023, 10, 2), dec!(200), dec!(220), 3),
        ];
        let v = fifo_valuation(&layers, 10);
        // 4 @ 100 + 3 @ 200 + 3 uncovered @ 200
        assert_eq!(v.tax_excluded_value, dec!(1600));
        assert_eq!(v.uncovered_quantity, 3);
    }

    #[test]
    fn no_layers_yields_zero_value_and_full_shortfall() {
        let v = fifo_valuation(&[], 7);
        assert_eq!(v.tax_excluded_value, Decimal::ZERO);
        assert_eq!(v.tax_included_value, Decimal::ZERO);
        assert_eq!(v.uncovered_quantity, 7);
    }

    #[test]
    fn zero_on_hand_is_zero_value() {
        let layers = vec![layer((2023, 10, 1), dec!(100), dec!(110), 15)];
        let v = fifo_valuation(&layers, 0);
        assert_eq!(v.tax_excluded_value, Decimal::ZERO);
        assert_eq!(v.uncovered_quantity, 0);
    }

    /// Independent re-implementation used as a reference: expand every
    /// layer into per-unit costs and sum the first `on_hand` units.
    fn reference_valuation(layers: &[cost_layer::Model], on_hand: i32) -> (Decimal, Decimal) {
        let mut units_ex = Vec::new();
        let mut units_inc = Vec::new();
        for l in layers {
            for _ in 0..l.remaining_quantity.max(0) {
                units_ex.push(l.unit_cost_ex_tax);
                units_inc.push(l.unit_cost_inc_tax);
            }
        }
        let covered = (on_hand as usize).min(units_ex.len());
        let mut ex: Decimal = units_ex[..covered].iter().copied().sum();
        let mut inc: Decimal = units_inc[..covered].iter().copied().sum();
        let shortfall = on_hand as usize - covered;
        if shortfall > 0 {
            if let Some(last) = layers.last() {
                ex += Decimal::from(shortfall as u64) * last.unit_cost_ex_tax;
                inc += Decimal::from(shortfall as u64) * last.unit_cost_inc_tax;
            }
        }
        (ex, inc)
    }

    proptest! {
        #[test]
        fn matches_reference_implementation(
            quantities in proptest::collection::vec(0i32..50, 1..8),
            costs in proptest::collection::vec(1u32..10_000, 1..8),
            on_hand in 0i32..400,
        ) {
            let n = quantities.len().min(costs.len());
            let layers: Vec<cost_layer::Model> = (0..n)
                .map(|i| {
                    let ex = Decimal::from(costs[i]) / dec!(100);
                    layer(
                        (2023, 1, (i as u32 % 28) + 1),
                        ex,
                        ex * dec!(1.1),
                        quantities[i],
                    )
                })
                .collect();

            let v = fifo_valuation(&layers, on_hand);
            let (ref_ex, ref_inc) = reference_valuation(&layers, on_hand);
            prop_assert_eq!(v.tax_excluded_value, ref_ex);
            prop_assert_eq!(v.tax_included_value, ref_inc);
        }
    }
}
