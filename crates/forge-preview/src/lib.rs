//! Containerised live preview sandbox with a commit-triggered reload
//! watcher (C9).

pub mod container;
pub mod detection;
pub mod manager;
pub mod port_allocator;
pub mod watcher;

pub use detection::detect_project_type;
pub use forge_protocol::preview::{PreviewEnvironment, PreviewStatus, ProjectType, ReloadEvent};
pub use manager::{PreviewError, PreviewManager};
pub use port_allocator::{PortAllocator, PortsExhausted};
pub use watcher::Watcher;
