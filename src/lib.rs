//! Maylove: onboarding and profile service for a maternal-wellbeing app.

pub mod api;
pub mod auth;
pub mod backend;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod onboarding;
pub mod profile;
