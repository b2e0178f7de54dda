//! Event routing: classify an inbound event and drive admission, dispatch or
//! completion dedup.
//!
//! The router holds no state of its own beyond long-lived collaborator
//! handles. Every event yields exactly one [`Response`]; collaborator
//! failures are logged and mapped to a 500 response instead of escaping.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{
    AdmissionController, CompletionEvent, CompletionLedger, CompletionNotification, GateError,
    InboundEvent, JobDispatcher, JobHandle, JobRequest, JobRunner, JobStatus, LedgerStore,
    NewRequestEvent, Notifier, Response, WriteOutcome,
};
use crate::config::{GateConfig, RequestSettings};

/// What the completion path did with an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionOutcome {
    /// First `Completed` delivery: entry recorded and notification fired.
    Notified,
    /// First `Completed` delivery: entry recorded but the sink refused the
    /// notification.
    NotificationDropped(String),
    /// Ledger already held the job; notification suppressed.
    AlreadyNotified,
    /// Status is not `Completed`; nothing recorded.
    Ignored,
}

/// Result of processing a completion event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionReport {
    /// Job name.
    pub job_name: String,
    /// Status carried by the event.
    pub job_status: JobStatus,
    /// Output location carried by the event.
    pub job_output: String,
    /// Dedup decision.
    pub outcome: CompletionOutcome,
}

impl CompletionReport {
    fn message(&self) -> String {
        let action = match &self.outcome {
            CompletionOutcome::Notified => "notification fired".to_string(),
            CompletionOutcome::NotificationDropped(reason) => {
                format!("notification dropped ({reason})")
            }
            CompletionOutcome::AlreadyNotified => "already notified".to_string(),
            CompletionOutcome::Ignored => "ignored".to_string(),
        };
        format!(
            "job [{}] status {}: {action}",
            self.job_name, self.job_status
        )
    }
}

/// Stateless dispatcher composing admission, submission and the ledger.
pub struct EventRouter<R, L, N> {
    config: Arc<GateConfig>,
    admission: AdmissionController<R>,
    dispatcher: JobDispatcher<R>,
    ledger: CompletionLedger<L>,
    notifier: Arc<N>,
}

impl<R, L, N> EventRouter<R, L, N>
where
    R: JobRunner,
    L: LedgerStore,
    N: Notifier,
{
    /// Wire a router from long-lived collaborator handles.
    pub fn new(config: Arc<GateConfig>, runner: Arc<R>, store: Arc<L>, notifier: Arc<N>) -> Self {
        let admission = AdmissionController::new(Arc::clone(&runner), config.max_in_flight_query)
            .with_serialized_admission(config.serialize_admission);
        let dispatcher = JobDispatcher::new(runner, Arc::clone(&config));
        let ledger = CompletionLedger::new(store, config.ledger_table.clone());
        Self {
            config,
            admission,
            dispatcher,
            ledger,
            notifier,
        }
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// Completion ledger.
    #[must_use]
    pub const fn ledger(&self) -> &CompletionLedger<L> {
        &self.ledger
    }

    /// Admission controller.
    #[must_use]
    pub const fn admission(&self) -> &AdmissionController<R> {
        &self.admission
    }

    /// Classify a raw JSON event and handle it.
    pub async fn handle_value(&self, raw: &Value) -> Response {
        match InboundEvent::from_value(raw) {
            Ok(event) => self.handle(event).await,
            Err(e) => {
                tracing::warn!(error = %e, "couldn't decode inbound event");
                Response::from_error(&e)
            }
        }
    }

    /// Handle a classified event, producing exactly one response.
    pub async fn handle(&self, event: InboundEvent) -> Response {
        let result = match event {
            InboundEvent::Completion(ev) => self
                .on_completion(&ev)
                .await
                .map(|report| Response::ok(report.message())),
            InboundEvent::NewRequest(req) => self.on_new_request(&req).await.map(|handle| {
                Response::ok(format!(
                    "A new job [{}] was scheduled successfully, and {} slots remain.",
                    handle.job.job_name, handle.remaining
                ))
            }),
        };

        result.unwrap_or_else(|e| {
            if e.is_collaborator_error() || matches!(e, GateError::Config(_)) {
                tracing::error!(error = %e, status = e.status_code(), "event failed");
            } else {
                tracing::warn!(error = %e, status = e.status_code(), "event rejected");
            }
            Response::from_error(&e)
        })
    }

    /// Completion path: ensure the ledger exists, then record and notify
    /// exactly once per job for `Completed` events.
    ///
    /// # Errors
    ///
    /// Propagates ledger store failures.
    pub async fn on_completion(
        &self,
        event: &CompletionEvent,
    ) -> Result<CompletionReport, GateError> {
        tracing::info!(
            job_name = %event.job_name,
            job_status = %event.status,
            job_output = %event.output_location(),
            "completion event"
        );

        self.ledger.ensure_schema().await?;

        let outcome = if self.ledger.has_recorded(&event.job_name).await? {
            CompletionOutcome::AlreadyNotified
        } else if event.status != JobStatus::Completed {
            CompletionOutcome::Ignored
        } else {
            match self.ledger.record(&event.job_name).await? {
                WriteOutcome::Inserted => self.fire(event),
                WriteOutcome::AlreadyExists => CompletionOutcome::AlreadyNotified,
            }
        };

        match &outcome {
            CompletionOutcome::Notified => {
                tracing::info!(job_name = %event.job_name, "fired completion notification");
            }
            CompletionOutcome::NotificationDropped(_) => {}
            CompletionOutcome::AlreadyNotified | CompletionOutcome::Ignored => {
                tracing::info!(job_name = %event.job_name, ?outcome, "notification not fired");
            }
        }

        Ok(CompletionReport {
            job_name: event.job_name.clone(),
            job_status: event.status.clone(),
            job_output: event.output_location().to_string(),
            outcome,
        })
    }

    fn fire(&self, event: &CompletionEvent) -> CompletionOutcome {
        let notification =
            CompletionNotification::new(event.job_name.clone(), event.output_location());
        match self.notifier.notify(notification) {
            Ok(()) => CompletionOutcome::Notified,
            Err(e) => {
                tracing::error!(job_name = %event.job_name, error = %e, "notification sink refused");
                CompletionOutcome::NotificationDropped(e.to_string())
            }
        }
    }

    /// New-request path: validate, check capacity, submit.
    ///
    /// # Errors
    ///
    /// Client errors (missing type, unsupported category, malformed fields),
    /// [`GateError::CapacityExceeded`], or runner failures.
    pub async fn on_new_request(&self, event: &NewRequestEvent) -> Result<Admitted, GateError> {
        let payload = event.payload.as_ref().ok_or(GateError::MissingType)?;
        let category = payload
            .category
            .as_deref()
            .filter(|c| !c.trim().is_empty())
            .ok_or(GateError::MissingType)?;
        tracing::info!(category, "incoming inference request");

        let settings = RequestSettings::resolve(&self.config, &event.stage_variables);
        self.dispatcher.check_category(category, &settings)?;
        let request = JobRequest::build(category, payload, &settings, &self.config)?;

        let _guard = self.admission.admission_guard().await;
        let decision = self.admission.check_capacity(category, settings.limit).await?;
        if !decision.is_admitted() {
            tracing::warn!(category, ?decision, "limit reached");
            return Err(GateError::CapacityExceeded {
                limit: decision.limit,
            });
        }

        let job = self.dispatcher.submit(&request).await?;
        Ok(Admitted {
            job,
            remaining: decision.remaining_after_submit(),
        })
    }
}

/// Accepted submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Admitted {
    /// Handle of the submitted job.
    pub job: JobHandle,
    /// Slots left for the category after this job.
    pub remaining: i64,
}
