// SPDX-License-Identifier: Apache-2.0

pub mod checkpoint;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod init;
pub mod input;
pub mod persistence;
pub mod selector;
pub mod sink;
pub mod tailer;

pub use checkpoint::Checkpoint;
pub use config::Config;
pub use error::{Error, Result};
pub use tailer::{RunSummary, Tailer};
