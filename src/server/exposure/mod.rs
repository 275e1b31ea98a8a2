//! API exposures
//!
//! An exposure consumes an [`AppHost`](super::AppHost) and produces a router
//! for one protocol. REST is the only one served.

pub mod rest;

pub use rest::RestExposure;
