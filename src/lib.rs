//! Webkomik client core.
//!
//! SYSTEM CONTEXT
//! ==============
//! The comics catalogue front end: session/authorization state backed by a
//! hosted identity service, a bearer-aware JSON client for the comics API,
//! the catalogue store, and the route guard that gates protected pages.
//! Rendering lives elsewhere; the `webkomik` binary drives these pieces
//! from the command line.

pub mod app;
pub mod config;
pub mod net;
pub mod router;
pub mod state;

pub use app::App;
pub use config::AppConfig;
