//! TableService: Read/Create/Update/Delete over whitelisted tables, shared by the endpoint and the local shim.

mod table;
mod validation;
pub use table::{Operation, TableService};
pub use validation::RowValidator;
