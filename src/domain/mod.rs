//! Domain layer: money, fees, requests and the ports the application layer
//! talks to. Nothing here performs I/O.

pub mod fees;
pub mod money;
pub mod ports;
pub mod referral;
pub mod request;
pub mod wallet;
pub mod withdrawal;
