//! Outbound adapters implementing domain ports.
//!
//! - **supabase**: the hosted backend over HTTP (rows, auth, storage).
//! - **local_store**: JSON file holding credentials, appearance and session.
//! - **attachment_file**: reads files from disk into attachments.
//!
//! Adapters translate between domain types and wire formats. They contain
//! no business logic.

pub mod attachment_file;
pub mod local_store;
pub mod supabase;
