//! Logistics intake server library.
//!
//! Companies upload spreadsheets after signing in through an OpenID Connect
//! provider. Metadata lives in DynamoDB, file bytes in S3.

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod services;
pub mod state;
