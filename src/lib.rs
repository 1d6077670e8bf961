//! # Stagehand
//!
//! Schema lifecycle manager for a self-hosted content library, usable both as
//! a standalone binary and as a library.
//!
//! It inspects which tables the platform needs, applies versioned migration
//! units at most once each, repairs a partially provisioned schema, provisions
//! the media bucket and seeds the single bootstrap administrator.
//!
//! ## Library Usage
//!
//! ```toml
//! [dependencies]
//! stagehand = { version = "0.0.1", default-features = false }
//! ```
//!
//! ```rust,ignore
//! use stagehand::config::Settings;
//! use stagehand::lifecycle::Controller;
//!
//! let controller = Controller::from_settings(&Settings::default())?;
//! let snapshot = controller.check().await?;
//! if snapshot.state == stagehand::types::LifecycleState::Idle {
//!     let result = controller.initialize().await?;
//!     for line in &result.log {
//!         println!("{line}");
//!     }
//! }
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` (default): Includes CLI module. Disable with `default-features = false`.

pub mod backend;
pub mod bucket;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod schema;
pub mod server;
pub mod types;
