//! Domain ports for the hexagonal boundary.
//!
//! Each backend surface gets its own trait so services and tests depend only
//! on what they use. The hosted backend implements all of them through one
//! adapter; see [`BackendClient::from_shared`].

mod macros;
pub(crate) use macros::define_port_error;

mod attachment_store;
mod auth_gateway;
mod backend_connector;
mod backend_error;
mod feedback_repository;
mod local_store;
mod profile_repository;
mod screen_capture;

#[cfg(test)]
pub use attachment_store::MockAttachmentStore;
pub use attachment_store::AttachmentStore;
#[cfg(test)]
pub use auth_gateway::MockAuthGateway;
pub use auth_gateway::AuthGateway;
#[cfg(test)]
pub use backend_connector::MockBackendConnector;
pub use backend_connector::{BackendClient, BackendConnector, BackendCredentials};
pub use backend_error::BackendError;
#[cfg(test)]
pub use feedback_repository::MockFeedbackRepository;
pub use feedback_repository::FeedbackRepository;
#[cfg(test)]
pub use local_store::MockLocalStore;
pub use local_store::{InMemoryLocalStore, LocalStore, LocalStoreError, keys};
#[cfg(test)]
pub use profile_repository::MockProfileRepository;
pub use profile_repository::ProfileRepository;
#[cfg(test)]
pub use screen_capture::MockScreenCapture;
pub use screen_capture::{CaptureMode, ScreenCapture, ScreenCaptureError, UnsupportedScreenCapture};
