//! Forge - Core Library
//!
//! Streaming parser for model responses that embed artifact and action
//! tags, the per-artifact action runner, the virtual file store they write
//! to, and the workbench coordinator tying them together.

pub mod config;
pub mod diff;
pub mod error;
pub mod files;
pub mod parser;
pub mod payload;
pub mod ports;
pub mod runner;
pub mod stream;
pub mod types;
pub mod workbench;

pub use config::*;
pub use error::*;
pub use files::FileStore;
pub use parser::{ParseEvents, StreamingParser};
pub use ports::{ShellExecutor, SimulatedShell};
pub use runner::{ActionRunner, ActionTicket, FilesChangedHook, RunnerContext};
pub use types::*;
pub use workbench::{EditorDocument, Workbench, WorkbenchSnapshot};
