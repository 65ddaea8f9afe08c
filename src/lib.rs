#![forbid(unsafe_code)]

//! Prompt-chain preset editor core
//!
//! Presets hold, per section, a list of prompts plus an emission order that
//! interleaves prompt references with conditional blocks. This crate keeps
//! those lists consistent under edits, repairs presets saved by older
//! layouts, persists them through a key-value store, and turns pointer input
//! into reorder commits.

pub mod catalog;
pub mod config;
pub mod constants;
pub mod drag;
pub mod error;
pub mod migration;
pub mod model;
pub mod notify;
pub mod persistence;
pub mod presets;
pub mod resolve;
pub mod session;
pub mod storage;
pub mod transfer;
pub mod types;

pub use catalog::Catalog;
pub use config::EditorConfig;
pub use error::{ChainError, Result};
pub use model::PresetData;
pub use presets::PresetManager;
pub use session::EditorSession;
pub use types::{OrderEntry, PromptEntry, PromptField, Role};
