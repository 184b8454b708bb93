//! HTTP adapters exposing the platform to participants.

pub mod portal_http;

pub use portal_http::{AppState, PortalHttpConfig, PortalHttpServer};
