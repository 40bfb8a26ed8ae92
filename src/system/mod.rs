//! System-level routes

pub mod health_check;
