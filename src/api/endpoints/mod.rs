//! HTTP endpoint handlers. Business logic stays in `CoreState`.

pub mod health;
pub mod predict;
