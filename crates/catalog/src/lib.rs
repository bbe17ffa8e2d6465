//! Product catalog domain for FarmLink.
//!
//! A [`Product`] is a farmer's listing: what is for sale, at what price,
//! and how much of it is physically on hand versus promised to open
//! orders. Stock mutation rules live in `farmlink-inventory`; this crate
//! only defines the listing itself and its validation rules.

pub mod product;

pub use product::{NewProduct, Product, ProductStatus, ProductUpdate, StockSnapshot};
