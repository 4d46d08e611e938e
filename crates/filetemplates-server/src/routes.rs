//! HTTP routes

pub mod templates;
