//! Parameterized SQL for whitelisted tables: identifiers sanitized and quoted, values always bound.

mod builder;
mod ident;
pub mod params;
pub use builder::*;
pub use ident::{sanitize_identifier, sanitized_non_empty};
pub(crate) use ident::quoted;
pub use params::*;
