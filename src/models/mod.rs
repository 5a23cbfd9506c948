pub mod config;
pub mod options;
pub mod request;

pub use config::ServiceConfig;
pub use options::{Length, Margins, OptionsError, PaperFormat, PdfSettings, RenderOptions};
pub use request::{ConversionForm, ConversionJob, ConversionRequest, PdfArtifact};
