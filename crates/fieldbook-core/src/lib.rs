//! Core library for fieldbook, a client for a mini-soccer field booking service.
//!
//! - `signing`: per-request signature headers for the backend services
//! - `auth`: session manager, persisted storage and route guard
//! - `api`: HTTP client for the field, user and order services
//! - `booking`: schedule slot selection and pricing
//! - `config`: service targets and user preferences

pub mod api;
pub mod auth;
pub mod booking;
pub mod config;
pub mod models;
pub mod signing;
pub mod utils;
