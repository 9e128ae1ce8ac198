//! Hosted backend adapter.
//!
//! One [`SupabaseClient`] per project implements every backend port over
//! HTTP. [`SupabaseConnector`] builds clients whenever credentials change.

mod auth;
mod client;
mod connector;
mod dto;
mod rest;
mod storage;

pub use client::{SupabaseClient, SupabaseOptions};
pub use connector::SupabaseConnector;
