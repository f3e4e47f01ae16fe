//! PrismFlow convergence engine
//!
//! Turns a fire-and-forget control-plane call into a synchronous outcome.
//! A caller starts a remote operation, receives an [`OperationHandle`], and
//! hands it to the [`Poller`] together with the [`ClassificationTable`] of
//! that operation kind. The poller queries the status until the remote
//! reports a terminal state, the timeout elapses, or the caller cancels.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │              Caller / Orchestrator               │
//! │     (provision, run action, execute runbook)     │
//! └─────────────────┬───────────────────────────────┘
//!                   │ handle
//! ┌─────────────────▼───────────────────────────────┐
//! │               prismflow-converge                 │
//! │  ┌──────────────────────────────────────────┐   │
//! │  │             Convergence Poller            │   │
//! │  │   query → classify → sleep / converge     │   │
//! │  └──────────────────────────────────────────┘   │
//! │  ┌──────────────┐  ┌──────────────────────┐     │
//! │  │  Classifier  │  │  Per-kind settings   │     │
//! │  └──────────────┘  └──────────────────────┘     │
//! └───────┬─────────────────────────────────────────┘
//!         │ trait StatusQuery
//! ┌───────▼───────┐ ┌───────────────┐ ┌───────────────┐
//! │ self-service  │ │      NDB      │ │  Prism tasks  │
//! │   adapters    │ │   operations  │ │               │
//! └───────────────┘ └───────────────┘ └───────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use prismflow_converge::{OperationKind, Poller};
//!
//! let kind = OperationKind::AppRunlog;
//! let outcome = Poller::new(kind.table(), kind.default_settings())
//!     .with_cancellation(token.clone())
//!     .run(&query, runlog_uuid.into())
//!     .await?;
//!
//! let payload = outcome.into_result()?;
//! ```

pub mod classify;
pub mod error;
pub mod handle;
pub mod outcome;
pub mod poller;
pub mod query;
pub mod settings;
pub mod tables;

// Re-exports
pub use classify::{ClassificationTable, StateClass};
pub use error::{ConvergeError, QueryError, Result};
pub use handle::OperationHandle;
pub use outcome::{AbortDetail, FailureDetail, FailureReason, PollOutcome, TimeoutDetail};
pub use poller::{Poller, poll};
pub use query::{StatusQuery, StatusSnapshot};
pub use settings::{NotFoundPolicy, PollProfile, PollSettings};
pub use tables::OperationKind;

pub use tokio_util::sync::CancellationToken;
