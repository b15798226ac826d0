pub mod dining_table;
pub mod inventory_category;
pub mod inventory_item;
pub mod inventory_transaction;
pub mod menu_category;
pub mod menu_item;
pub mod menu_item_ingredient;
pub mod order;
pub mod order_item;
pub mod payment;
