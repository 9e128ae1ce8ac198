//! User-facing copy shown when operations fail or complete.
//!
//! Services store these strings in their UI state; technical detail goes to
//! the log instead.

/// Returned by every operation that needs a backend client when none exists.
pub const NOT_CONFIGURED: &str = "Supabase is not configured. Please initialise the widget first.";
/// Shown by the form when a submission fails because credentials are missing.
pub const SUBMIT_NOT_CONFIGURED: &str =
    "The Supabase credentials have not been configured correctly.";
/// Generic submission failure.
pub const SUBMIT_GENERIC: &str =
    "Something went wrong while sending your feedback. Please try again.";
/// Submission rejected by a row-level security policy.
pub const SUBMIT_POLICY: &str = "Your feedback could not be sent because of a security policy. \
     Check that you are signed in and try again.";
/// Submission rejected by a foreign key constraint.
pub const SUBMIT_DATA: &str = "Your feedback could not be sent because of a data problem. \
     Please reload and try again.";
/// Non-blocking warning after the record was saved but uploads failed.
pub const ATTACHMENTS_FAILED: &str =
    "Your feedback was saved, but there was an error uploading the attachments.";
/// Screenshot capture failed.
pub const CAPTURE_FAILED: &str = "Failed to capture the screen.";
/// Network failure while reaching the backend.
pub const NETWORK_FAILURE: &str =
    "Could not reach the server. Check the project URL and your network connection.";
/// Fallback for unexpected failures.
pub const GENERIC_FAILURE: &str = "An unexpected error occurred. Please try again.";
/// Dashboard could not load the feedback list.
pub const DASHBOARD_LOAD_FAILED: &str = "Failed to load feedback. Check that the Supabase \
     credentials are correct and that row-level security is configured.";
/// Dashboard settings saved together with new credentials.
pub const SETTINGS_SAVED_WITH_CREDENTIALS: &str =
    "Settings saved. The backend connection has been re-initialised.";
/// Dashboard settings saved without touching credentials.
pub const SETTINGS_SAVED: &str = "Appearance settings saved.";
/// Setup form submitted with a blank field.
pub const SETUP_MISSING_FIELDS: &str = "Please fill in both fields.";
/// Setup form URL did not parse.
pub const SETUP_INVALID_URL: &str = "The Supabase project URL appears to be invalid.";
/// Setup form key did not have a recognised prefix.
pub const SETUP_INVALID_KEY_FORMAT: &str = "The Supabase public key appears to be invalid. \
     It must start with \"sbp_\", \"sb_publishable_\", or \"ey\".";
/// Probe rejected the key.
pub const SETUP_INVALID_KEY: &str = "The Supabase public (anon) key is invalid or has expired.";
/// Probe reached the project but the table is missing.
pub const SETUP_TABLE_MISSING: &str = "Connected successfully, but the 'feedbacks' table was \
     not found. Did you run the database setup script?";
/// Probe could not reach the project.
pub const SETUP_CONNECT_FAILED: &str =
    "Failed to connect. Check the project URL and your network connection.";
/// A second setup attempt while one is running.
pub const SETUP_IN_PROGRESS: &str = "A connection attempt is already in progress.";
