//! Core types for the helpdesk.
//!
//! This module provides type-safe wrappers for the domain concepts.

pub mod actor;
pub mod catalog;
pub mod comment;
pub mod id;
pub mod status;
pub mod ticket;

pub use actor::{Actor, DirectoryEntry};
pub use catalog::{Category, IssueType};
pub use comment::{Comment, CommentBody, CommentBodyError, NewComment};
pub use id::*;
pub use status::*;
pub use ticket::{NewTicket, Ticket, TicketChanges, TicketRevision};
