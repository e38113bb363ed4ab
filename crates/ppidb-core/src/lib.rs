//! Core types and rules for the ppidb interaction store.
//!
//! Confidence classification, reconciliation of re-analysed predictions, and
//! duplicate cleanup planning all live here as plain functions over
//! [`record::PredictionRecord`]s. This crate is deliberately free of database
//! dependencies; storage backends implement [`store::PredictionStore`] and
//! call into these rules.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod classify;
pub mod cleanup;
pub mod error;
pub mod ingest;
pub mod normalize;
pub mod reconcile;
pub mod record;
pub mod store;
pub mod subject;

pub use error::{Error, Result};
