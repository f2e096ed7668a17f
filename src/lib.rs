//! Minerva - A lightweight blog backend
//!
//! This library provides the core functionality for the Minerva blog backend:
//! credential handling with JWT session tokens, and post management with
//! unique slugs and image uploads.

pub mod api;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
