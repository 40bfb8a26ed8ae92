//! Pieces shared by the list and edit pages.

pub mod http_trace;
pub mod messages;
