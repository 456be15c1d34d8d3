//! Shared data model for the generation & iteration engine.
//!
//! Every other crate in the workspace (`forge-llm`, `forge-agents`,
//! `forge-vfs`, `forge-patch`, `forge-validate`, `forge-memory`,
//! `forge-preview`, `forge-orchestrator`) depends on these types instead of
//! redefining its own. Keeping the schema in one crate is what lets the
//! manifest validator (`manifest::validate`) be the single place that
//! decides what a "valid" plan looks like.

pub mod agent;
pub mod error;
pub mod manifest;
pub mod memory;
pub mod patch;
pub mod path_safety;
pub mod preview;
pub mod validation;
pub mod vfs;

pub use error::ForgeError;
pub use manifest::ProjectManifest;
