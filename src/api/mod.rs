pub mod convert;
pub mod status;

pub use convert::{handle_convert, ConversionPayload, ErrorResponse, __path_handle_convert};
pub use status::{
    handle_health, handle_info, HealthResponse, __path_handle_health, __path_handle_info,
};
