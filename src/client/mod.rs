//! Fluent query shims: `from(table).select(..).eq(..).order(..).limit(..)` ending in an `Envelope`.
//!
//! `RemoteClient` talks to the table endpoint over HTTP; `LocalClient` runs the same queries in-process.

mod builder;
mod envelope;
mod json_fields;
mod local;
mod remote;

pub use crate::query::{Filter, FilterOp, OrderBy, Predicate, SelectQuery};
pub use builder::{
    Backend, DeleteBuilder, InsertBuilder, ScopedDelete, ScopedUpdate, SelectBuilder, TableRef, UpdateBuilder,
};
pub use envelope::{ClientError, Envelope, EnvelopeError};
pub use json_fields::unstringify;
pub use local::LocalClient;
pub use remote::{RemoteAuth, RemoteClient};
