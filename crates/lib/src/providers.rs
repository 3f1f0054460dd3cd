//! # Providers
//!
//! Clients for the hosted LLM APIs used by structured extraction.

pub mod ai;
pub mod factory;
