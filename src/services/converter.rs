use std::sync::Arc;
use std::time::Duration;

use crate::error::RenderError;
use crate::models::{ConversionJob, PdfArtifact, PdfSettings};
use crate::services::engine::{Surface, Viewport};
use crate::services::renderer::RendererHandle;

/// Budget for the load event plus network quiescence.
pub const LOAD_TIMEOUT: Duration = Duration::from_secs(30);

/// Drives one document through acquire → viewport → load → export → release.
pub struct Converter {
    renderer: Arc<RendererHandle>,
    viewport: Viewport,
    load_timeout: Duration,
}

impl Converter {
    pub fn new(renderer: Arc<RendererHandle>) -> Self {
        Self {
            renderer,
            viewport: Viewport::default(),
            load_timeout: LOAD_TIMEOUT,
        }
    }

    pub fn with_load_timeout(mut self, load_timeout: Duration) -> Self {
        self.load_timeout = load_timeout;
        self
    }

    pub fn load_timeout(&self) -> Duration {
        self.load_timeout
    }

    pub fn renderer(&self) -> &Arc<RendererHandle> {
        &self.renderer
    }

    pub async fn convert(&self, job: ConversionJob) -> Result<PdfArtifact, RenderError> {
        let bytes = self.render(job.html, job.settings).await?;
        Ok(PdfArtifact {
            bytes,
            filename: job.filename,
        })
    }

    /// Render `html` to PDF bytes.
    ///
    /// The pipeline runs on its own task: a caller that stops waiting (for
    /// example a disconnected HTTP client) cannot skip the surface release.
    pub async fn render(
        &self,
        html: String,
        settings: PdfSettings,
    ) -> Result<Vec<u8>, RenderError> {
        let renderer = self.renderer.clone();
        let viewport = self.viewport;
        let load_timeout = self.load_timeout;

        tokio::spawn(async move {
            let mut surface = renderer.new_surface().await?;
            let result = drive(surface.as_mut(), &html, viewport, load_timeout, &settings).await;
            if let Err(e) = surface.close().await {
                tracing::warn!(%e, "Failed to release rendering surface");
            }
            result
        })
        .await
        .map_err(|e| RenderError::Task(e.to_string()))?
    }
}

async fn drive(
    surface: &mut dyn Surface,
    html: &str,
    viewport: Viewport,
    load_timeout: Duration,
    settings: &PdfSettings,
) -> Result<Vec<u8>, RenderError> {
    surface.set_viewport(viewport).await?;

    match tokio::time::timeout(load_timeout, surface.load_html(html, load_timeout)).await {
        Ok(loaded) => loaded?,
        Err(_) => return Err(RenderError::LoadTimeout(load_timeout)),
    }

    surface.export_pdf(settings).await
}
