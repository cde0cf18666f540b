//! Helpdesk Core - ticket model and visibility policy.
//!
//! This crate provides the types shared by every helpdesk component:
//! - `server` - Ticket lifecycle services, stores and the JSON API
//! - `cli` - Command-line tools for migrations, catalog seeding and reports
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP. Every role check lives in [`policy`], so the rules for who
//! may see or act on a ticket can be tested without a store.
//!
//! # Modules
//!
//! - [`types`] - Type-safe IDs, ticket status, actors, tickets, comments, catalog
//! - [`policy`] - Visibility and action authorization

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod policy;
pub mod types;

pub use policy::{Action, ActionSet, Denial};
pub use types::*;
