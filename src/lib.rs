//! Account registration, JWT bearer authentication and image upload service.

pub mod app;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod images;
pub mod state;
pub mod storage;
