//! Application layer: Use cases and services.
//!
//! `DiaryService` runs the load, create and decrypt flows against the ports;
//! `ControllerState` holds what the views render and applies flow results.

mod create;
mod decrypt;
mod loader;
mod service;
mod state;

#[cfg(test)]
pub(crate) mod fakes;

pub use create::CreateOutcome;
pub use decrypt::DecryptOutcome;
pub use service::{DiaryService, FlowProgress, LoadedDiaries};
pub use state::{
    ComposeField, ComposeForm, ControllerState, FheStatus, StatusKind, TransactionStatus,
    ViewMode, ERROR_DISPLAY, SUCCESS_DISPLAY,
};
