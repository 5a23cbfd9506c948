//! Headless Chrome backend.
//!
//! `headless_chrome` speaks the DevTools protocol over blocking calls, so
//! every protocol round-trip runs on Tokio's blocking pool.

use async_trait::async_trait;
use headless_chrome::protocol::cdp::types::{Event, Method};
use headless_chrome::protocol::cdp::{Page, Target};
use headless_chrome::types::PrintToPdfOptions;
use headless_chrome::{Browser, LaunchOptions, Tab};
use serde::{Deserialize, Serialize};
use std::ffi::OsStr;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::error::RenderError;
use crate::models::PdfSettings;
use crate::services::engine::{Engine, EngineLauncher, Surface, Viewport};

/// Container hosts have no usable sandbox and no GPU.
static LAUNCH_ARGS: [&str; 6] = [
    "--disable-setuid-sandbox",
    "--disable-dev-shm-usage",
    "--disable-accelerated-2d-canvas",
    "--no-first-run",
    "--no-zygote",
    "--disable-gpu",
];

/// `headless_chrome` drops the DevTools connection after this long without
/// browser events. An idle service must keep its browser.
const IDLE_CONNECTION_TIMEOUT: Duration = Duration::from_secs(60 * 60 * 24 * 365);

/// Launches a local Chrome/Chromium process.
#[derive(Debug, Clone, Default)]
pub struct ChromeLauncher {
    path: Option<PathBuf>,
}

impl ChromeLauncher {
    /// `path` of `None` means: discover the executable on this system.
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }

    fn launch_options(&self) -> Result<LaunchOptions<'static>, RenderError> {
        LaunchOptions::default_builder()
            .headless(true)
            .sandbox(false)
            .enable_gpu(false)
            .path(self.path.clone())
            .idle_browser_timeout(IDLE_CONNECTION_TIMEOUT)
            .args(LAUNCH_ARGS.iter().map(|arg| OsStr::new(*arg)).collect())
            .build()
            .map_err(|e| RenderError::Launch(e.to_string()))
    }
}

#[async_trait]
impl EngineLauncher for ChromeLauncher {
    async fn launch(&self) -> Result<Arc<dyn Engine>, RenderError> {
        let engine = ChromeEngine::start(self.launch_options()?).await?;
        Ok(Arc::new(engine))
    }
}

/// A running Chrome process.
pub struct ChromeEngine {
    browser: Mutex<Option<Browser>>,
    /// Tab in the default context. Browser contexts are disposed through it,
    /// since a surface's own tab goes away with its context.
    control: Arc<Tab>,
    /// Target creation is serialized; everything after it is not.
    open_lock: tokio::sync::Mutex<()>,
}

impl ChromeEngine {
    async fn start(options: LaunchOptions<'static>) -> Result<Self, RenderError> {
        let (browser, control, version) = tokio::task::spawn_blocking(move || {
            let browser = Browser::new(options)?;
            let control = browser.new_tab()?;
            let version = browser
                .get_version()
                .map(|v| v.product)
                .unwrap_or_else(|_| "unknown".to_string());
            anyhow::Ok((browser, control, version))
        })
        .await
        .map_err(|e| RenderError::Launch(format!("launch task failed: {e}")))?
        .map_err(|e| RenderError::Launch(e.to_string()))?;

        tracing::info!(pid = ?browser.get_process_id(), %version, "Chrome launched");

        Ok(Self {
            browser: Mutex::new(Some(browser)),
            control,
            open_lock: tokio::sync::Mutex::new(()),
        })
    }

    fn browser(&self) -> Option<Browser> {
        self.browser.lock().ok().and_then(|b| b.clone())
    }

    async fn open(&self) -> Result<ChromeSurface, RenderError> {
        let _creating = self.open_lock.lock().await;
        let browser = self
            .browser()
            .ok_or_else(|| RenderError::Surface("browser is closed".to_string()))?;
        let control = self.control.clone();

        let (tab, context_id) = tokio::task::spawn_blocking(move || {
            // One browser context per surface: no cookies, cache or storage
            // carry over between documents.
            let context = browser.new_context()?;
            let context_id = context.get_id().to_string();
            match context.new_tab() {
                Ok(tab) => anyhow::Ok((tab, context_id)),
                Err(e) => {
                    if let Err(dispose) = dispose_context(&control, &context_id) {
                        tracing::warn!(%dispose, "Failed to dispose orphaned browser context");
                    }
                    Err(e)
                }
            }
        })
        .await
        .map_err(|e| RenderError::Task(e.to_string()))?
        .map_err(|e| RenderError::Surface(e.to_string()))?;

        tracing::debug!(context = %context_id, "Opened rendering surface");

        Ok(ChromeSurface {
            tab,
            context_id,
            control: self.control.clone(),
        })
    }
}

#[async_trait]
impl Engine for ChromeEngine {
    async fn open_surface(&self) -> Result<Box<dyn Surface>, RenderError> {
        Ok(Box::new(self.open().await?))
    }

    async fn close(&self) -> Result<(), RenderError> {
        let browser = self.browser.lock().ok().and_then(|mut b| b.take());
        if let Some(browser) = browser {
            // Dropping the last handle kills the process and waits for it.
            tokio::task::spawn_blocking(move || drop(browser))
                .await
                .map_err(|e| RenderError::Task(e.to_string()))?;
        }
        Ok(())
    }
}

fn dispose_context(control: &Tab, context_id: &str) -> Result<(), RenderError> {
    control
        .call_method(Target::DisposeBrowserContext {
            browser_context_id: context_id.to_string(),
        })
        .map(|_| ())
        .map_err(|e| RenderError::Surface(format!("failed to dispose browser context: {e}")))
}

/// One tab in its own browser context.
pub struct ChromeSurface {
    tab: Arc<Tab>,
    context_id: String,
    control: Arc<Tab>,
}

impl ChromeSurface {
    async fn with_tab<T, F>(&self, f: F) -> Result<T, RenderError>
    where
        T: Send + 'static,
        F: FnOnce(&Tab) -> Result<T, RenderError> + Send + 'static,
    {
        let tab = self.tab.clone();
        tokio::task::spawn_blocking(move || f(&tab))
            .await
            .map_err(|e| RenderError::Task(e.to_string()))?
    }
}

#[async_trait]
impl Surface for ChromeSurface {
    async fn set_viewport(&mut self, viewport: Viewport) -> Result<(), RenderError> {
        self.with_tab(move |tab| {
            tab.call_method(SetDeviceMetricsOverride {
                width: viewport.width,
                height: viewport.height,
                device_scale_factor: viewport.device_scale_factor,
                mobile: false,
            })
            .map(|_| ())
            .map_err(|e| RenderError::Surface(format!("failed to set viewport: {e}")))
        })
        .await
    }

    async fn load_html(&mut self, html: &str, timeout: Duration) -> Result<(), RenderError> {
        let html = html.to_string();
        self.with_tab(move |tab| set_content(tab, html, timeout))
            .await
    }

    async fn export_pdf(&mut self, settings: &PdfSettings) -> Result<Vec<u8>, RenderError> {
        let options = print_options(settings);
        self.with_tab(move |tab| {
            tab.print_to_pdf(Some(options))
                .map_err(|e| RenderError::Export(e.to_string()))
        })
        .await
    }

    async fn close(self: Box<Self>) -> Result<(), RenderError> {
        let context_id = self.context_id.clone();
        let control = self.control.clone();
        self.with_tab(move |tab| {
            let closed = tab
                .close_target()
                .map(|_| ())
                .map_err(|e| RenderError::Surface(format!("failed to close tab: {e}")));
            let disposed = dispose_context(&control, &context_id);
            closed.and(disposed)
        })
        .await
    }
}

/// Replace the blank document with `html` and block until it has loaded
/// and the network has gone quiet, or `timeout` passes.
///
/// The document is written into the main frame directly, so its size is
/// not bounded by URL length limits.
fn set_content(tab: &Tab, html: String, timeout: Duration) -> Result<(), RenderError> {
    let deadline = Instant::now() + timeout;

    let frame_id = tab
        .call_method(GetFrameTree {})
        .map_err(|e| RenderError::Load(format!("failed to read frame tree: {e}")))?
        .frame_tree
        .frame
        .id;

    let (sender, events) = mpsc::channel::<(String, String)>();
    let listener = tab
        .add_event_listener(Arc::new(move |event: &Event| {
            if let Event::PageLifecycleEvent(lifecycle) = event {
                let params = &lifecycle.params;
                sender
                    .send((params.frame_id.clone(), params.name.clone()))
                    .ok();
            }
        }))
        .map_err(|e| RenderError::Load(e.to_string()))?;

    let loaded = tab
        .call_method(Page::SetDocumentContent {
            frame_id: frame_id.clone(),
            html,
        })
        .map_err(|e| RenderError::Load(e.to_string()))
        .and_then(|_| wait_for_load(&events, &frame_id, deadline, timeout));

    if let Err(e) = tab.remove_event_listener(&listener) {
        tracing::debug!(%e, "Failed to remove lifecycle listener");
    }
    loaded
}

/// Consume lifecycle events until the frame has both fired `load` and
/// reached `networkIdle` afterwards.
fn wait_for_load(
    events: &Receiver<(String, String)>,
    frame_id: &str,
    deadline: Instant,
    timeout: Duration,
) -> Result<(), RenderError> {
    let mut progress = LoadProgress::new(frame_id);
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match events.recv_timeout(remaining) {
            Ok((frame, name)) => {
                if progress.observe(&frame, &name) {
                    return Ok(());
                }
            }
            Err(RecvTimeoutError::Timeout) => return Err(RenderError::LoadTimeout(timeout)),
            Err(RecvTimeoutError::Disconnected) => {
                return Err(RenderError::Load("tab event stream closed".to_string()))
            }
        }
    }
}

/// Load state of one frame, fed from `Page.lifecycleEvent`.
#[derive(Debug)]
struct LoadProgress {
    frame_id: String,
    loaded: bool,
    idle: bool,
}

impl LoadProgress {
    fn new(frame_id: &str) -> Self {
        Self {
            frame_id: frame_id.to_string(),
            loaded: false,
            idle: false,
        }
    }

    /// Record an event; returns true once the frame is done loading.
    fn observe(&mut self, frame_id: &str, name: &str) -> bool {
        if frame_id != self.frame_id {
            return false;
        }
        match name {
            "init" => {
                self.loaded = false;
                self.idle = false;
            }
            "load" => {
                self.loaded = true;
                self.idle = false;
            }
            // Only idleness reached after `load` counts.
            "networkIdle" if self.loaded => self.idle = true,
            _ => {}
        }
        self.loaded && self.idle
    }
}

/// `Page.getFrameTree`, decoding only the main frame id.
#[derive(Debug, Serialize)]
struct GetFrameTree {}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FrameTreeReply {
    frame_tree: FrameTree,
}

#[derive(Debug, Deserialize)]
struct FrameTree {
    frame: FrameInfo,
}

#[derive(Debug, Deserialize)]
struct FrameInfo {
    id: String,
}

impl Method for GetFrameTree {
    const NAME: &'static str = "Page.getFrameTree";
    type ReturnObject = FrameTreeReply;
}

/// `Emulation.setDeviceMetricsOverride` with only the parameters we set.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SetDeviceMetricsOverride {
    width: u32,
    height: u32,
    device_scale_factor: f64,
    mobile: bool,
}

impl Method for SetDeviceMetricsOverride {
    const NAME: &'static str = "Emulation.setDeviceMetricsOverride";
    type ReturnObject = serde_json::Value;
}

fn print_options(settings: &PdfSettings) -> PrintToPdfOptions {
    PrintToPdfOptions {
        landscape: Some(false),
        display_header_footer: Some(false),
        print_background: Some(settings.print_background),
        paper_width: Some(settings.paper_width),
        paper_height: Some(settings.paper_height),
        margin_top: Some(settings.margins.top),
        margin_right: Some(settings.margins.right),
        margin_bottom: Some(settings.margins.bottom),
        margin_left: Some(settings.margins.left),
        prefer_css_page_size: Some(settings.prefer_css_page_size),
        ..Default::default()
    }
}
