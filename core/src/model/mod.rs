//! Resolved-model reconciliation: pair a declared model with live state and
//! resolve every attribute through schema-driven resolvers.

mod builder;
mod participant;
mod resolved;
mod resolver;
mod schema;

pub use builder::{build_resolved_model, is_fully_resolved};
pub use participant::{
    single_line, AttributeKind, ResolvedParticipant, TypeDescriptor, ValueState,
};
pub use resolved::{NodeId, ResolvedKind, ResolvedModel, ResolvedNode};
pub use resolver::{create_resolved_type, ModelResolver};
pub use schema::{AttributeSchema, SchemaResolver};
