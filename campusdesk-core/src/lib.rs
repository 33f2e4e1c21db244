//! Core types for campusdesk.
//!
//! This crate holds everything that does not need a network or a terminal:
//! - records mirrored from the school API (`event`, `academic`, `attendance`, `trends`)
//! - view derivation (`view`, `filter`, `paginate`, `analytics`)
//! - file formats (`export`, `import`)
//! - client state (`config`, `settings`)

pub mod academic;
pub mod analytics;
pub mod attendance;
pub mod config;
pub mod constants;
pub mod date_range;
pub mod error;
pub mod event;
pub mod export;
pub mod filter;
pub mod import;
pub mod paginate;
pub mod settings;
pub mod timestamp;
pub mod trends;
pub mod view;

pub use error::{CampusError, CampusResult};
