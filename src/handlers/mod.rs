//! HTTP handlers: generic table endpoint, session routes, page data.

pub mod auth;
pub mod pages;
pub mod table;
