//! TUI module: Terminal User Interface using Ratatui.
//!
//! Provides:
//! - Wallet connect gate and FHE initialization screen
//! - Diary list with stats and search
//! - New entry form with client-side encryption
//! - Entry detail with verified decryption

mod app;
mod styles;
mod ui;
mod worker;

pub use app::{App, DevnetService};
pub use styles::DiaryTheme;
pub use worker::{FlowJob, FlowWorker, FlowWorkerHandle, WorkerMessage};
