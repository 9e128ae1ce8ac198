//! Driven port for rasterising the host page.

use async_trait::async_trait;

use super::define_port_error;

/// Area to rasterise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureMode {
    /// The viewport; the result goes to the crop surface.
    Visible,
    /// The whole scrollable page; the result is attached directly.
    Full,
}

define_port_error! {
    /// Errors raised while rasterising.
    pub enum ScreenCaptureError {
        /// The renderer failed.
        Render { message: String } => "screen capture failed: {message}",
        /// No renderer is available in this environment.
        Unsupported => "screen capture is not supported here",
    }
}

/// Produces PNG rasters of the host page.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ScreenCapture: Send + Sync {
    /// Rasterise and return PNG bytes.
    async fn capture(&self, mode: CaptureMode) -> Result<Vec<u8>, ScreenCaptureError>;
}

/// Capture port for environments without a renderer.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnsupportedScreenCapture;

#[async_trait]
impl ScreenCapture for UnsupportedScreenCapture {
    async fn capture(&self, _mode: CaptureMode) -> Result<Vec<u8>, ScreenCaptureError> {
        Err(ScreenCaptureError::unsupported())
    }
}
