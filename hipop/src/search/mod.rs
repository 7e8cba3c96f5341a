//! Components J, K and M: flaw ordering, the best-first plan-space driver,
//! and the SHOP-like total-order fallback.

pub mod driver;
pub mod order;
pub mod shop;

pub use driver::search;
pub use order::Flaw;
