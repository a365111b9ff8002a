//! Client-side stores.
//!
//! SYSTEM CONTEXT
//! ==============
//! Each store owns its state behind a lock that is never held across an
//! `.await`, so mutations on either side of a network call stay ordered
//! while concurrent actions may still interleave at suspension points.

pub mod auth;
pub mod catalogue;

#[cfg(test)]
pub(crate) mod test_helpers;
