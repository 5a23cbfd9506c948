//! pdfgate - HTML to PDF over HTTP
//!
//! Renders submitted HTML with a managed headless Chrome process.
//! This library exposes modules for integration testing.

pub mod api;
pub mod error;
pub mod models;
pub mod server;
pub mod services;
