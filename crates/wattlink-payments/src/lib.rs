//! # wattlink-payments
//!
//! Thin adapter over the payment provider's REST API (Razorpay wire format):
//! order creation, checkout signature verification, and forwarding a
//! verified payment to the wallet service as a recharge.

#![deny(unsafe_code)]

pub mod client;
pub mod error;
pub mod signature;

pub use client::{to_minor_units, CreateOrder, PaymentClient};
pub use error::PaymentError;
pub use signature::{compute_signature, verify_signature};
