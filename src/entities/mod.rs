//! Database entities.
//!
//! Every table uses a UUID primary key. Money is stored as `Decimal`,
//! stock quantities as `i32` and never go below zero.

pub mod category;
pub mod discount;
pub mod favorite;
pub mod inventory;
pub mod item;
pub mod media;
pub mod order;
pub mod order_item;
pub mod permission;
pub mod purchase_order;
pub mod purchase_order_item;
pub mod review;
pub mod role;
pub mod role_permission;
pub mod supplier;
pub mod user;
pub mod warehouse;
