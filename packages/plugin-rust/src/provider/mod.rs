//! [`SchemaProvider`](crate::traits::SchemaProvider) implementations.

pub mod fixture;
pub mod rest;

pub use fixture::{AppSchema, StaticSchemaProvider};
pub use rest::RestSchemaProvider;
