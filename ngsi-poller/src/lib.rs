//! NGSI-LD poller - fetches entities from a context broker on a schedule and
//! feeds them to a map session.
//!
//! # Architecture
//!
//! ```text
//!   NGSI-LD context broker            built-in fixture
//!   /ngsi-ld/v1/entities, /types      (no broker configured)
//!              ↓                               ↓
//! ┌─────────────────────────────────────────────────────┐
//! │       EntitySource (NgsiClient | FixtureSource)     │
//! │  - One request per active type, run concurrently    │
//! │  - Type catalogue normalization                     │
//! └─────────────────────────────────────────────────────┘
//!              ↓
//! ┌─────────────────────────────────────────────────────┐
//! │       PollingController                             │
//! │  - Fixed interval, pause/resume, manual refresh     │
//! │  - Cancels and discards superseded cycles           │
//! └─────────────────────────────────────────────────────┘
//!              ↓ PollOutcome
//! ┌─────────────────────────────────────────────────────┐
//! │       ngsi_map::MapSession                          │
//! │  - transform → time window → layers → viewport      │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! # Core Types
//!
//! - [`EntitySource`] - Trait implemented by every entity source
//! - [`NgsiClient`] - HTTP source for a real broker
//! - [`FixtureSource`] - Stub entities for development
//! - [`PollingController`] / [`PollerHandle`] - Scheduling and control
//! - [`FetchError`] - Distinguishable fetch failures

pub mod cancel;
pub mod catalog;
pub mod client;
pub mod console;
pub mod fixture;
pub mod poller;
pub mod source;
pub mod types;

pub use cancel::CancelToken;
pub use catalog::{load_catalogue, normalize_type_list};
pub use client::NgsiClient;
pub use console::ConsoleCommand;
pub use fixture::FixtureSource;
pub use poller::{PollCommand, PollOutcome, PollTrigger, PollerHandle, PollerStatus, PollingController};
pub use source::{fetch_for_types, EntitySource};
pub use types::{EntityQuery, FetchError};
