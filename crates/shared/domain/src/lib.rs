//! Domain layer - entity abstractions shared by every store.
//!
//! This crate has no storage dependency. It defines what a persisted entity
//! is ([`Entity`]) and the store-assigned identifier it carries ([`EntityId`]).

pub mod entity;
pub mod error;
pub mod id;

pub use entity::{default_collection_name, Entity};
pub use error::{DomainError, DomainResult};
pub use id::EntityId;
