//! Build an event router from configuration.

use std::sync::Arc;

use anyhow::Context;

use crate::config::GateConfig;
use crate::core::{AppResult, EventRouter, GateError, JobRunner, LedgerStore, Notifier};
use crate::util::init_tracing;

/// Validate `cfg` and wire a router around the given collaborators.
///
/// # Errors
///
/// [`GateError::Config`] when the configuration is invalid.
pub fn build_router<R, L, N>(
    cfg: GateConfig,
    runner: Arc<R>,
    store: Arc<L>,
    notifier: Arc<N>,
) -> Result<EventRouter<R, L, N>, GateError>
where
    R: JobRunner,
    L: LedgerStore,
    N: Notifier,
{
    cfg.validate().map_err(GateError::Config)?;
    tracing::info!(
        ledger_table = %cfg.ledger_table,
        jobs_limit = cfg.jobs_limit,
        allow_list = %cfg.allow_list,
        region = %cfg.region,
        serialize_admission = cfg.serialize_admission,
        "building event router"
    );
    Ok(EventRouter::new(Arc::new(cfg), runner, store, notifier))
}

/// Host start-up: install logging, load [`GateConfig::from_env`] and build
/// the router. Call once per process and reuse the router for every event.
///
/// # Errors
///
/// Fails when the environment holds an unparsable or invalid configuration.
pub fn router_from_env<R, L, N>(
    runner: Arc<R>,
    store: Arc<L>,
    notifier: Arc<N>,
) -> AppResult<EventRouter<R, L, N>>
where
    R: JobRunner,
    L: LedgerStore,
    N: Notifier,
{
    init_tracing();
    let cfg = GateConfig::from_env()?;
    build_router(cfg, runner, store, notifier).context("couldn't build event router")
}
