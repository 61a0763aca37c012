//! Chat feedback dashboard: read-only analytics over chat sessions and the
//! feedback users left on them.

pub mod api;
pub mod cache;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod pipeline;
pub mod store;
pub mod table;
