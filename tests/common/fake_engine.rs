//! In-process stand-in for the browser backend.
//!
//! Records every call so tests can check that surfaces are acquired only
//! after validation and released exactly once.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

use pdfgate::error::RenderError;
use pdfgate::models::PdfSettings;
use pdfgate::services::{Engine, EngineLauncher, Surface, Viewport};

/// HTML containing this marker never finishes loading.
pub const STALL_MARKER: &str = "<!-- stall -->";

/// HTML containing this marker takes a fifth of a second to load.
pub const SLOW_MARKER: &str = "<!-- slow -->";

/// HTML containing this marker loads, but export fails.
pub const EXPORT_FAIL_MARKER: &str = "<!-- fail-export -->";

#[derive(Default)]
pub struct EngineStats {
    pub launches: AtomicUsize,
    pub engine_closes: AtomicUsize,
    pub opened: AtomicUsize,
    pub released: AtomicUsize,
    pub exports: AtomicUsize,
    pub viewports: Mutex<Vec<Viewport>>,
    pub load_timeouts: Mutex<Vec<Duration>>,
}

impl EngineStats {
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    pub fn exports(&self) -> usize {
        self.exports.load(Ordering::SeqCst)
    }

    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }

    pub fn engine_closes(&self) -> usize {
        self.engine_closes.load(Ordering::SeqCst)
    }
}

pub struct FakeLauncher {
    stats: Arc<EngineStats>,
    gate: Option<Arc<Notify>>,
    fail: bool,
}

impl FakeLauncher {
    pub fn new() -> (Self, Arc<EngineStats>) {
        let stats = Arc::new(EngineStats::default());
        let launcher = Self {
            stats: stats.clone(),
            gate: None,
            fail: false,
        };
        (launcher, stats)
    }

    /// Launch blocks until `gate` is notified.
    pub fn gated(gate: Arc<Notify>) -> (Self, Arc<EngineStats>) {
        let (mut launcher, stats) = Self::new();
        launcher.gate = Some(gate);
        (launcher, stats)
    }

    pub fn failing() -> (Self, Arc<EngineStats>) {
        let (mut launcher, stats) = Self::new();
        launcher.fail = true;
        (launcher, stats)
    }
}

#[async_trait]
impl EngineLauncher for FakeLauncher {
    async fn launch(&self) -> Result<Arc<dyn Engine>, RenderError> {
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.stats.launches.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(RenderError::Launch("browser executable not found".into()));
        }
        Ok(Arc::new(FakeEngine {
            stats: self.stats.clone(),
        }))
    }
}

struct FakeEngine {
    stats: Arc<EngineStats>,
}

#[async_trait]
impl Engine for FakeEngine {
    async fn open_surface(&self) -> Result<Box<dyn Surface>, RenderError> {
        self.stats.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeSurface {
            stats: self.stats.clone(),
            content: None,
        }))
    }

    async fn close(&self) -> Result<(), RenderError> {
        self.stats.engine_closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct FakeSurface {
    stats: Arc<EngineStats>,
    content: Option<String>,
}

#[async_trait]
impl Surface for FakeSurface {
    async fn set_viewport(&mut self, viewport: Viewport) -> Result<(), RenderError> {
        self.stats.viewports.lock().unwrap().push(viewport);
        Ok(())
    }

    async fn load_html(&mut self, html: &str, timeout: Duration) -> Result<(), RenderError> {
        self.stats.load_timeouts.lock().unwrap().push(timeout);
        if html.contains(STALL_MARKER) {
            std::future::pending::<()>().await;
        }
        if html.contains(SLOW_MARKER) {
            tokio::time::sleep(Duration::from_millis(200)).await;
        }
        // Yield so concurrent requests interleave.
        tokio::task::yield_now().await;
        self.content = Some(html.to_string());
        Ok(())
    }

    async fn export_pdf(&mut self, settings: &PdfSettings) -> Result<Vec<u8>, RenderError> {
        self.stats.exports.fetch_add(1, Ordering::SeqCst);
        let content = self
            .content
            .as_deref()
            .ok_or_else(|| RenderError::Export("nothing loaded".into()))?;
        if content.contains(EXPORT_FAIL_MARKER) {
            return Err(RenderError::Export("Printing failed".into()));
        }
        Ok(format!("%PDF-1.7\n% {settings:?}\n{content}\n%%EOF\n").into_bytes())
    }

    async fn close(self: Box<Self>) -> Result<(), RenderError> {
        self.stats.released.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
