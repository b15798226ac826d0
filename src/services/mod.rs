pub mod billing;
pub mod import;
pub mod insights;
pub mod inventory;
pub mod menu;
pub mod menu_scan;
pub mod orders;
pub mod tables;
