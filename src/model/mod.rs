//! Domain types shared by the engine, the aggregator and the API.
//!
//! Stored and wire forms coincide: field names are camelCase and the
//! role-keyed vote map is a fixed struct, so every role's status lives at a
//! statically known path.

pub mod auth;
pub mod bson;
pub mod candidates;
pub mod role;
pub mod stats;
pub mod vote_status;
pub mod voter;
