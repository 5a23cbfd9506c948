//! Capabilities a browser backend must provide.
//!
//! The production backend drives headless Chrome; tests plug in
//! in-process fakes through the same traits.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::error::RenderError;
use crate::models::PdfSettings;

/// Viewport a surface is configured with before content is loaded.
///
/// Only affects how CSS media queries resolve; page size comes from
/// [`PdfSettings`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
    pub device_scale_factor: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1200,
            height: 800,
            device_scale_factor: 1.0,
        }
    }
}

/// Starts a browser process.
#[async_trait]
pub trait EngineLauncher: Send + Sync {
    async fn launch(&self) -> Result<Arc<dyn Engine>, RenderError>;
}

/// A running browser process.
#[async_trait]
pub trait Engine: Send + Sync {
    /// Open a fresh surface sharing no page state with any other.
    async fn open_surface(&self) -> Result<Box<dyn Surface>, RenderError>;

    /// Terminate the process. Safe to call more than once.
    async fn close(&self) -> Result<(), RenderError>;
}

/// One disposable rendering context.
#[async_trait]
pub trait Surface: Send {
    async fn set_viewport(&mut self, viewport: Viewport) -> Result<(), RenderError>;

    /// Load `html` and wait for the load event plus network quiescence.
    /// `timeout` is the caller's budget; the caller enforces it as well.
    async fn load_html(&mut self, html: &str, timeout: Duration) -> Result<(), RenderError>;

    async fn export_pdf(&mut self, settings: &PdfSettings) -> Result<Vec<u8>, RenderError>;

    async fn close(self: Box<Self>) -> Result<(), RenderError>;
}
