//! Network layer: wire types, the comics API client, and the identity backend.
//!
//! SYSTEM CONTEXT
//! ==============
//! Stores never touch `reqwest` directly. They call through [`api::ComicsApi`]
//! and [`identity::IdentityBackend`] so tests can swap in local servers or mocks.

pub mod api;
pub mod http;
pub mod identity;
pub mod storage;
pub mod types;

#[cfg(test)]
pub(crate) mod test_support;
