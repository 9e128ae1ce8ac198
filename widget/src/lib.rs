//! Customer feedback widget and admin dashboard client backed by Supabase.
//!
//! The [`domain`] module holds the services and the ports they drive;
//! [`outbound`] implements those ports over HTTP and the local filesystem.
//! [`app`] wires everything together and [`cli`] exposes it as commands.

pub mod app;
pub mod cli;
pub mod domain;
pub mod outbound;
pub mod settings;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
