//! Hand-written PostgreSQL wire-protocol client (spec §4.8, C7/C8).

pub mod driver;
pub mod message;
pub mod sqlstate;

pub use driver::{PgDriver, PgRow};
