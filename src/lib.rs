//! agrinews - Bilingual (Vietnamese/Japanese) corporate site CMS backend
//!
//! This library provides the HTTP API, services, persistence and caching of
//! the site.

pub mod api;
pub mod cache;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
