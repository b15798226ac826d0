use chrono::Utc;
use proptest::prelude::*;
use rust_decimal::Decimal;
use std::collections::HashMap;
use uuid::Uuid;

use mesa_pos::entities::menu_item_ingredient::Model as RecipeModel;
use mesa_pos::entities::order_item::Model as OrderItemModel;
use mesa_pos::services::billing::{
    accumulate_usage, aggregate_item_quantities, apply_discount,
};

fn order_item(menu_item_id: Uuid, quantity: i32) -> OrderItemModel {
    OrderItemModel {
        id: Uuid::new_v4(),
        order_id: Uuid::new_v4(),
        menu_item_id,
        quantity,
        price: Decimal::ONE,
        notes: None,
        created_at: Utc::now(),
    }
}

proptest! {
    #[test]
    fn discount_never_exceeds_the_original_total(
        cents in 0_i64..10_000_000,
        percent in 0_u32..=100,
    ) {
        let total = Decimal::new(cents, 2);
        let discounted = apply_discount(total, Decimal::from(percent));

        prop_assert!(discounted >= Decimal::ZERO);
        prop_assert!(discounted <= total);
        prop_assert!(discounted.scale() <= 2);
        if percent == 0 {
            prop_assert_eq!(discounted, total);
        }
        if percent == 100 {
            prop_assert_eq!(discounted, Decimal::ZERO);
        }
    }

    #[test]
    fn aggregation_preserves_the_total_line_quantity(
        quantities in proptest::collection::vec(1_i32..50, 1..20),
        dish_count in 1_usize..5,
    ) {
        let dishes: Vec<Uuid> = (0..dish_count).map(|_| Uuid::new_v4()).collect();
        let items: Vec<OrderItemModel> = quantities
            .iter()
            .enumerate()
            .map(|(i, &q)| order_item(dishes[i % dish_count], q))
            .collect();

        let aggregated = aggregate_item_quantities(&items);

        let line_sum: i64 = quantities.iter().map(|&q| i64::from(q)).sum();
        let aggregated_sum: i64 = aggregated.values().sum();
        prop_assert_eq!(line_sum, aggregated_sum);
        prop_assert!(aggregated.len() <= dish_count);
    }

    #[test]
    fn usage_scales_linearly_with_servings(
        servings in 1_i64..100,
        per_serving_tenths in 1_i64..1000,
    ) {
        let dish = Uuid::new_v4();
        let ingredient = Uuid::new_v4();
        let per_serving = Decimal::new(per_serving_tenths, 1);
        let recipes = vec![RecipeModel {
            id: Uuid::new_v4(),
            menu_item_id: dish,
            inventory_item_id: ingredient,
            quantity_required: per_serving,
            created_at: Utc::now(),
        }];

        let quantities = HashMap::from([(dish, servings)]);
        let usage = accumulate_usage(&quantities, &recipes);

        prop_assert_eq!(usage.len(), 1);
        prop_assert_eq!(usage[&ingredient], per_serving * Decimal::from(servings));
    }
}
