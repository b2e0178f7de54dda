//! Core admission, dispatch and completion-dedup abstractions.

pub mod admission;
pub mod dispatcher;
pub mod error;
pub mod event;
pub mod ledger;
pub mod notify;
pub mod router;
pub mod runner;

pub use admission::{AdmissionController, AdmissionDecision};
pub use dispatcher::{
    container_image_uri, job_name_for, partition_suffix, JobDispatcher, JobHandle, JobRequest,
    TRAINING_CHANNEL,
};
pub use error::{AppResult, GateError};
pub use event::{
    CompletionEvent, InboundEvent, JobStatus, NewRequestEvent, OutputDataConfig, RequestPayload,
    Response, StageLimit, StageVariables,
};
pub use ledger::{CompletionLedger, LedgerEntry, LedgerStore, WriteOutcome, LEDGER_KEY_ATTRIBUTE};
pub use notify::{CompletionNotification, Notifier};
pub use router::{Admitted, CompletionOutcome, CompletionReport, EventRouter};
pub use runner::{JobRunner, JobSummary, JobTag, TrainingJobSpec};
