//! Core traits, types, and error handling for todoist-mcp.
//!
//! This crate provides the domain model, the response normalizer, the
//! configuration layers and the provider traits used across all components.

pub mod config;
pub mod error;
pub mod normalize;
pub mod provider;
pub mod types;

pub use config::{
    Config, Credential, ServerSettings, SettingsOverrides, TransportKind, TransportSettings,
};
pub use error::{Error, ErrorKind, Result};
pub use normalize::{normalize, Introspect, Record, Upstream};
pub use provider::{CommentProvider, LabelProvider, ProjectProvider, Provider, TaskProvider};
