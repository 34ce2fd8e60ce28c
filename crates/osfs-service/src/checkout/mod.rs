//! Checkout lock on files.

pub mod gate;
pub mod service;

pub use service::CheckoutService;
