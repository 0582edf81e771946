//! sqlsage: retrieval-augmented rewrite suggestions for slow SQL
//!
//! A slow statement is profiled by [`analyze`], enriched with tuning notes
//! retrieved from the [`store`], sent to a [`generate`] backend, and the
//! parsed suggestion is kept by the [`engine`] for human review.

pub mod analyze;
pub mod backend;
pub mod chunk;
pub mod commands;
pub mod config;
pub mod embed;
pub mod engine;
pub mod error;
pub mod generate;
pub mod meta;
pub mod prompt;
pub mod store;
