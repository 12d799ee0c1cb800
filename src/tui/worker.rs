//! Background flow worker for non-blocking chain and FHE calls.
//!
//! Key generation, transaction confirmation and verified decryption all
//! block; they run on a worker thread and report over a channel the TUI
//! main loop polls every frame.

use std::sync::mpsc::{self, Receiver, Sender};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::application::{
    CreateOutcome, DecryptOutcome, DiaryService, FlowProgress, LoadedDiaries,
};
use crate::domain::{DiaryDraft, RecordId};
use crate::ports::{ContractError, ContractReader, ContractWriter, FheError, FheSdk};
use crate::DiaryError;

/// Work a flow worker can run.
pub enum FlowJob {
    /// Initialize FHE (if needed), then load the diary list
    Connect,
    Refresh,
    Create(DiaryDraft),
    Decrypt(RecordId),
}

impl FlowJob {
    /// Short name for logs; never includes entry text.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Connect => "connect",
            Self::Refresh => "refresh",
            Self::Create(_) => "create",
            Self::Decrypt(_) => "decrypt",
        }
    }
}

/// Messages from the flow worker.
#[derive(Debug)]
pub enum WorkerMessage {
    Progress(FlowProgress),
    FheReady,
    FheFailed(DiaryError),
    Loaded(Result<LoadedDiaries, DiaryError>),
    Created(Result<CreateOutcome, DiaryError>),
    Decrypted(Result<DecryptOutcome, DiaryError>),
}

/// Handle to a running flow worker.
pub struct FlowWorkerHandle {
    rx: Receiver<WorkerMessage>,
    handle: JoinHandle<()>,
}

impl FlowWorkerHandle {
    /// Try to receive the next message (non-blocking).
    #[must_use]
    pub fn try_recv(&self) -> Option<WorkerMessage> {
        self.rx.try_recv().ok()
    }

    /// Whether the worker thread has exited.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

/// Runs one flow job on a background thread.
pub struct FlowWorker;

impl FlowWorker {
    /// Spawn a background job.
    pub fn spawn<R, W, F>(service: Arc<DiaryService<R, W, F>>, job: FlowJob) -> FlowWorkerHandle
    where
        R: ContractReader + 'static,
        W: ContractWriter + 'static,
        F: FheSdk + 'static,
    {
        let (tx, rx) = mpsc::channel();

        let handle = thread::spawn(move || {
            tracing::debug!("Flow worker started: {}", job.name());
            Self::run(&service, job, &tx);
        });

        FlowWorkerHandle { rx, handle }
    }

    fn run<R, W, F>(service: &DiaryService<R, W, F>, job: FlowJob, tx: &Sender<WorkerMessage>)
    where
        R: ContractReader,
        W: ContractWriter + 'static,
        F: FheSdk,
    {
        // The receiver is dropped if the UI exits first; nothing to report then.
        let mut progress = |p: FlowProgress| {
            let _ = tx.send(WorkerMessage::Progress(p));
        };

        match job {
            FlowJob::Connect => {
                if !service.is_fhe_ready() {
                    let init = guarded(
                        "connect",
                        || service.initialize_fhe(),
                        || DiaryError::FheInitialization(FheError::Initialization(ABORTED.into())),
                    );
                    if let Err(e) = init {
                        let _ = tx.send(WorkerMessage::FheFailed(e));
                        return;
                    }
                }
                let _ = tx.send(WorkerMessage::FheReady);
                let _ = tx.send(WorkerMessage::Loaded(guarded_load(service)));
            }
            FlowJob::Refresh => {
                let _ = tx.send(WorkerMessage::Loaded(guarded_load(service)));
            }
            FlowJob::Create(draft) => {
                let result = guarded(
                    "create",
                    || service.create_diary(&draft, &mut progress),
                    || DiaryError::Creation(ABORTED.into()),
                );
                let _ = tx.send(WorkerMessage::Created(result));
            }
            FlowJob::Decrypt(record_id) => {
                let result = guarded(
                    "decrypt",
                    || service.decrypt_diary(&record_id, &mut progress),
                    || DiaryError::Decryption,
                );
                let _ = tx.send(WorkerMessage::Decrypted(result));
            }
        }
    }
}

const ABORTED: &str = "flow worker stopped unexpectedly";

/// Run one flow step, turning a panic into the flow's failure.
///
/// Every job must end with a result message, or the UI would wait forever.
fn guarded<T>(
    job: &str,
    step: impl FnOnce() -> Result<T, DiaryError>,
    on_panic: impl FnOnce() -> DiaryError,
) -> Result<T, DiaryError> {
    panic::catch_unwind(AssertUnwindSafe(step)).unwrap_or_else(|_| {
        tracing::error!("Flow worker panicked during {job}");
        Err(on_panic())
    })
}

fn guarded_load<R, W, F>(service: &DiaryService<R, W, F>) -> Result<LoadedDiaries, DiaryError>
where
    R: ContractReader,
    W: ContractWriter + 'static,
    F: FheSdk,
{
    guarded(
        "load",
        || service.load_diaries(),
        || DiaryError::Load(ContractError::Transport(ABORTED.into())),
    )
}
