//! # Order Status Service
//!
//! Order lifecycle management for a Telegram booking bot.
//!
//! ## Features
//! - Validated status transitions driven by per-status configuration
//! - Status configuration stored in an entity-attribute-value table, with built-in defaults
//! - Append-only status change log
//! - User, merchant and admin notifications over Telegram
//! - Periodic detection and resolution of timed-out orders
//! - Tolerates both the legacy and the current `orders` schema

/// Configuration management and environment variables
pub mod config;
/// Database models, connections, and migrations
pub mod database;
/// Error types surfaced by the order status manager
pub mod error;
/// Order status management, notifications, timeouts and health checks
pub mod services;
/// Logging and formatting helpers
pub mod utils;
