//! Domain primitives, services and ports.
//!
//! Purpose: model feedback submissions, authentication and the admin
//! dashboard without knowing which backend stores them. Services publish
//! their state through `tokio::sync::watch` channels; adapters live in
//! [`crate::outbound`].
//!
//! Public surface:
//! - Error (alias to `error::Error`) and ErrorCode: user-safe failures.
//! - BackendProvider and ConfigService: credential-driven backend handle.
//! - AuthService, FeedbackStore, FeedbackForm, Dashboard, SetupService.

pub mod attachments;
pub mod auth;
pub mod auth_service;
pub mod backend_provider;
pub mod dashboard;
pub mod error;
pub mod feedback;
pub mod feedback_store;
pub mod messages;
pub mod navigation;
pub mod panels;
pub mod ports;
pub mod setup;
pub mod widget_form;

pub use self::attachments::{
    Attachment, AttachmentLink, AttachmentList, MAX_ATTACHMENTS, StoragePath, format_file_size,
    is_image_file,
};
pub use self::auth::{
    AuthOutcome, AuthUser, Credentials, CredentialsValidationError, Profile, Role, Session, UserId,
};
pub use self::auth_service::AuthService;
pub use self::backend_provider::{BackendHandle, BackendProvider, ConfigService, SharedHandle};
pub use self::dashboard::{
    Dashboard, DashboardFilters, DashboardState, DeleteDialog, EditDialog, Filter,
    SelectedFeedback, SettingsForm, severity_label,
};
pub use self::error::{Error, ErrorCode};
pub use self::feedback::{
    DESCRIPTION_MAX_CHARS, DESCRIPTION_MIN_CHARS, DescriptionError, FeedbackId, FeedbackInsert,
    FeedbackRecord, FeedbackSeverity, FeedbackStatus, FeedbackType, FeedbackUpdate, NewFeedback,
    ParseFeedbackEnumError, TrackingId, validate_description,
};
pub use self::feedback_store::FeedbackStore;
pub use self::navigation::{MAX_HISTORY_LENGTH, NavigationState, NavigationTracker, View};
pub use self::panels::{
    AdminPanel, AdminPanelState, AdminView, AppFlow, ButtonAppearance, FeedbackPanel,
    FeedbackPanelState, FlowSelector, Prefill, TRIGGER_WINDOW_MS,
};
pub use self::setup::{SetupService, SetupState};
pub use self::widget_form::{FeedbackForm, FormDeps, FormState, FormView, PendingCrop, SubmitOutcome};
