//! JSON API over the ranking engine.

pub mod error;
pub mod programs;
pub mod recommend;
pub mod request_id;
pub mod routes;
pub mod status;

pub use routes::*;
