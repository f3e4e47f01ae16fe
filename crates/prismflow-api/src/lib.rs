//! PrismFlow control-plane clients
//!
//! HTTP transport, wire types, and [`prismflow_converge::StatusQuery`]
//! adapters for the three services whose operations run asynchronously:
//!
//! - self-service blueprints, applications and runbooks ([`selfservice`])
//! - NDB database operations ([`ndb`])
//! - Prism Central tasks ([`prism`])
//!
//! # Requirements
//!
//! `PRISM_ENDPOINT`, `PRISM_USERNAME`, `PRISM_PASSWORD` env vars for
//! [`ClientConfig::from_env`]; `PRISM_PORT` and `PRISM_INSECURE` are
//! optional.
//!
//! # Example
//!
//! ```ignore
//! use prismflow_api::{ApiClient, ClientConfig, selfservice::{SelfService, app::AppLifecycle}};
//!
//! let client = ApiClient::new(ClientConfig::from_env()?)?;
//! let lifecycle = AppLifecycle::new(SelfService::new(client));
//!
//! let run = lifecycle.run_custom_action("app-uuid", "scale_out", vec![]).await?;
//! println!("runlog {} finished", run.runlog_uuid);
//! ```

pub mod client;
pub mod error;
pub mod ndb;
pub mod prism;
pub mod selfservice;

pub use client::{ApiClient, ClientConfig};
pub use error::{ApiError, Result};
pub use ndb::{Ndb, NdbOperationQuery, OperationStatus};
pub use prism::{Prism, PrismTaskQuery, TaskStatus};
pub use selfservice::SelfService;
pub use selfservice::app::{ActionRun, AppLifecycle, LaunchRequest, RunbookResult, SystemAction};
pub use selfservice::query::{AppRunlogQuery, AppStateQuery, LaunchQuery, RunbookRunlogQuery};
