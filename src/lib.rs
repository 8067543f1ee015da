//! # oVirt / RHV Engine Management
//!
//! Client-side orchestration for VMs on an oVirt / RHV engine:
//! declarative provisioning from a YAML document, identifier
//! resolution, disk/NIC attachment, bounded power-state watching and
//! read-only inventory, over the engine's REST API.
//!
//! ## Modules
//!
//! - **types** — Shared data structures (config, wire types, plans,
//!   projections, reports)
//! - **error** — Crate-specific error types
//! - **engine** — Engine REST API HTTP client with SSO session
//!   management
//! - **resolve** — VM id/name resolution
//! - **plan** — Declarative document → fully-defaulted creation plan
//! - **vm** — VM collection operations (list, search, create, remove,
//!   power actions)
//! - **attach** — Disk and NIC attachment orchestration
//! - **watcher** — Bounded power-state polling
//! - **inventory** — Listing, per-VM snapshots, engine summary
//! - **service** — Aggregate facade, one engine session per operation

pub mod types;
pub mod error;
pub mod engine;
pub mod resolve;
pub mod plan;
pub mod vm;
pub mod attach;
pub mod watcher;
pub mod inventory;
pub mod service;
