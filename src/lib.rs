//! formadb - A strict, schema-driven record modeling and validation engine

pub mod model;
pub mod observability;
