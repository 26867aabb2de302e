//!
//! Ledger-side building blocks shared by the covenant verifiers: the transaction model and its
//! wire codec, transaction and signing-digest hashing, application state records, protocol
//! constants and per-collection parameters.
//!

pub mod config;
pub mod errors;
pub mod hashing;
pub mod state;
pub mod tx;

#[cfg(any(test, feature = "testutils"))]
pub mod testutils;
