//! Application layer containing the checkout orchestration.
//!
//! A [`checkout::Checkout`] drives one operation through fee resolution,
//! validation, confirmation and submission against any backend implementing
//! the domain ports.

pub mod checkout;
pub mod fee_resolver;
pub mod validator;
