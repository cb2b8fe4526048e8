//! # Cardsync Architecture
//!
//! Cardsync is the offline-first persistence and sync core of a business-card
//! contact manager. Scanned contacts are saved whether or not the device can
//! reach the authoritative remote store; work done offline is queued and
//! replayed when connectivity returns.
//!
//! It is a library first. The `cardsync` binary is one client among others.
//!
//! ## Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  API Layer (api.rs)                                         │
//! │  - CardsApi: save / list / update / delete / duplicates     │
//! │  - Routes to remote or local depending on connectivity      │
//! └─────────────────────────────────────────────────────────────┘
//!          │                    │                      │
//!          ▼                    ▼                      ▼
//! ┌────────────────┐  ┌───────────────────┐  ┌──────────────────┐
//! │ store/         │  │ remote/           │  │ duplicates.rs    │
//! │ LocalStore:    │  │ RemoteStore:      │  │ name / phone     │
//! │ cache + queue  │  │ owner-scoped CRUD │  │ matching         │
//! └────────────────┘  └───────────────────┘  └──────────────────┘
//!          ▲                    ▲
//!          └────────┬───────────┘
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Sync Engine (sync.rs)                                      │
//! │  - Drains the pending queue on reconnect or on demand       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Connectivity is injected through the [`connectivity::Connectivity`]
//! trait; nothing in the core probes the network or reads global state.
//!
//! ## No I/O Assumptions in Core
//!
//! Nothing in this crate writes to stdout/stderr or exits the process.
//! Diagnostics go through `tracing`; the embedding application decides
//! whether and where they are printed.
//!
//! ## Testing Strategy
//!
//! - Store logic: [`store::memory::InMemoryCardStore`], with read/write
//!   failure injection on its backend.
//! - Remote behaviour: [`remote::memory::MemRemote`], with transport and
//!   rejection failure injection.
//! - Filesystem specifics: integration tests under `tests/` against
//!   temporary directories.

pub mod api;
pub mod config;
pub mod connectivity;
pub mod duplicates;
pub mod error;
pub mod model;
pub mod remote;
pub mod store;
pub mod sync;

pub use api::{CardsApi, QueueReason, SaveOutcome, SaveStatus};
pub use error::{CardError, NotSyncedReason, Result};
pub use sync::{DrainOutcome, DrainReport, SyncEngine};
