//! Herald HTTP surface: campaign submission, status polling and settings.

pub mod middleware;
pub mod routes;
pub mod state;
