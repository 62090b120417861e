//! Core library for cryptotracker.
//!
//! Provides the client-local identity store (accounts, session, biometric
//! gate, admission routing), the market-data price feed client, and the
//! local cache used to serve coin listings offline.

pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod models;
pub mod storage;
pub mod utils;
