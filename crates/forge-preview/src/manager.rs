//! Preview lifecycle: create, stop, reap (§4.9 "Lifecycle").

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use bollard::Docker;
use chrono::Utc;
use forge_common::config::PreviewConfig;
use forge_protocol::preview::{LogRingBuffer, PreviewEnvironment, PreviewStatus, ProjectType};
use rand::Rng;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};

use crate::container;
use crate::detection::detect_project_type;
use crate::port_allocator::PortAllocator;

#[derive(Debug, Error)]
pub enum PreviewError {
    #[error("docker daemon unavailable")]
    DockerUnavailable,
    #[error("no ports available in configured range")]
    PortsExhausted,
    #[error("project type could not be detected from the submitted files")]
    UnknownProjectType,
    #[error("active preview limit ({0}) reached")]
    LimitReached(usize),
    #[error("container build failed: {0}")]
    BuildFailed(String),
    #[error("unknown preview {0}")]
    UnknownPreview(String),
}

struct Entry {
    environment: PreviewEnvironment,
    working_dir: tempfile::TempDir,
    logs: Arc<Mutex<LogRingBuffer>>,
    project_type: ProjectType,
}

/// Owns every live [`PreviewEnvironment`] for the process (§3
/// "Exclusively owned by the Preview Sandbox manager").
pub struct PreviewManager {
    docker: Option<Docker>,
    config: PreviewConfig,
    ports: PortAllocator,
    previews: RwLock<HashMap<String, Entry>>,
}

impl PreviewManager {
    pub fn new(config: PreviewConfig) -> Self {
        let docker = Docker::connect_with_local_defaults().ok();
        Self {
            docker,
            ports: PortAllocator::new(config.port_range),
            config,
            previews: RwLock::new(HashMap::new()),
        }
    }

    /// Builds a new preview from `files` and starts its container
    /// (§4.9 "Container build" / "Creating -> Running").
    #[tracing::instrument(skip(self, files), fields(project_id))]
    pub async fn create_preview(
        &self,
        project_id: &str,
        files: &BTreeMap<String, String>,
    ) -> Result<PreviewEnvironment, PreviewError> {
        let docker = self.docker.as_ref().ok_or(PreviewError::DockerUnavailable)?;

        if self.previews.read().await.len() >= self.config.max_concurrent_previews {
            return Err(PreviewError::LimitReached(self.config.max_concurrent_previews));
        }

        let project_type = detect_project_type(files).ok_or(PreviewError::UnknownProjectType)?;
        let preview_id = random_token();
        let now = Utc::now();
        let mut environment = PreviewEnvironment::new(project_id, &preview_id, now);

        let working_dir = tempfile::tempdir().map_err(|e| PreviewError::BuildFailed(e.to_string()))?;
        for (path, content) in files {
            let dest = forge_protocol::path_safety::safe_relative_join(working_dir.path(), path)
                .ok_or_else(|| PreviewError::BuildFailed(format!("unsafe file path: {path:?}")))?;
            if let Some(parent) = dest.parent() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| PreviewError::BuildFailed(e.to_string()))?;
            }
            tokio::fs::write(&dest, content)
                .await
                .map_err(|e| PreviewError::BuildFailed(e.to_string()))?;
        }

        let port = self.ports.allocate().map_err(|_| PreviewError::PortsExhausted)?;
        let spec = container::spec_for(project_type);
        let host_config = container::resource_caps(
            project_type,
            self.config.service_memory_mib,
            self.config.service_cpu_fraction,
            self.config.static_memory_mib,
        );
        let container_name = format!("forge-preview-{preview_id}");

        let logs = Arc::new(Mutex::new(LogRingBuffer::default()));
        match container::build_and_start(docker, &container_name, &spec, working_dir.path(), port, host_config).await
        {
            Ok(container_id) => {
                container::spawn_log_tail(docker.clone(), container_id.clone(), logs.clone());
                environment.container_handle = Some(container_id.clone());

                if container::wait_until_healthy(port, self.config.build_timeout).await {
                    environment.status = PreviewStatus::Running;
                    environment.port = Some(port);
                    environment.url = Some(format!("http://localhost:{port}"));
                } else {
                    container::stop_and_remove(docker, &container_id).await.ok();
                    self.ports.release(port);
                    environment.container_handle = None;
                    environment.status = PreviewStatus::Error;
                    environment.error = Some("health probe did not succeed within the build timeout".to_string());
                }
            }
            Err(error) => {
                self.ports.release(port);
                environment.status = PreviewStatus::Error;
                environment.error = Some(error.to_string());
            }
        }

        let result = environment.clone();
        self.previews.write().await.insert(
            preview_id,
            Entry {
                environment,
                working_dir,
                logs,
                project_type,
            },
        );
        Ok(result)
    }

    /// Rewrites the preview's working directory from `files` and restarts
    /// its container against the new content (§4.9 "rebuild (rebuild
    /// image + restart container)"). The preview keeps its allocated port
    /// and project type; only the container is torn down and recreated.
    #[tracing::instrument(skip(self, files), fields(preview_id))]
    pub async fn rebuild_preview(&self, preview_id: &str, files: &BTreeMap<String, String>) -> Result<(), PreviewError> {
        let docker = self.docker.as_ref().ok_or(PreviewError::DockerUnavailable)?;
        let mut previews = self.previews.write().await;
        let entry = previews
            .get_mut(preview_id)
            .ok_or_else(|| PreviewError::UnknownPreview(preview_id.to_string()))?;

        for (path, content) in files {
            let dest = forge_protocol::path_safety::safe_relative_join(entry.working_dir.path(), path)
                .ok_or_else(|| PreviewError::BuildFailed(format!("unsafe file path: {path:?}")))?;
            if let Some(parent) = dest.parent() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| PreviewError::BuildFailed(e.to_string()))?;
            }
            tokio::fs::write(&dest, content)
                .await
                .map_err(|e| PreviewError::BuildFailed(e.to_string()))?;
        }

        let port = entry
            .environment
            .port
            .ok_or_else(|| PreviewError::BuildFailed("preview has no allocated port to rebuild against".to_string()))?;

        if let Some(container_id) = entry.environment.container_handle.take() {
            container::stop_and_remove(docker, &container_id).await.ok();
        }

        let spec = container::spec_for(entry.project_type);
        let host_config = container::resource_caps(
            entry.project_type,
            self.config.service_memory_mib,
            self.config.service_cpu_fraction,
            self.config.static_memory_mib,
        );
        let container_name = format!("forge-preview-{preview_id}");

        match container::build_and_start(docker, &container_name, &spec, entry.working_dir.path(), port, host_config).await
        {
            Ok(container_id) => {
                container::spawn_log_tail(docker.clone(), container_id.clone(), entry.logs.clone());
                entry.environment.container_handle = Some(container_id.clone());

                if container::wait_until_healthy(port, self.config.build_timeout).await {
                    entry.environment.status = PreviewStatus::Running;
                    entry.environment.error = None;
                    tracing::info!(%preview_id, "preview container rebuilt and restarted");
                } else {
                    container::stop_and_remove(docker, &container_id).await.ok();
                    entry.environment.container_handle = None;
                    entry.environment.status = PreviewStatus::Error;
                    entry.environment.error =
                        Some("health probe did not succeed within the rebuild's build timeout".to_string());
                }
                Ok(())
            }
            Err(error) => {
                entry.environment.status = PreviewStatus::Error;
                entry.environment.error = Some(error.to_string());
                Err(PreviewError::BuildFailed(error.to_string()))
            }
        }
    }

    pub async fn get_status(&self, preview_id: &str) -> Option<PreviewEnvironment> {
        let mut previews = self.previews.write().await;
        let entry = previews.get_mut(preview_id)?;
        entry.environment.last_accessed = Utc::now();
        entry.environment.logs = entry.logs.lock().await.clone();
        Some(entry.environment.clone())
    }

    /// Remove container, delete temp directory, release port (§4.9 "On
    /// stop").
    pub async fn stop_preview(&self, preview_id: &str) -> Result<(), PreviewError> {
        let mut previews = self.previews.write().await;
        let entry = previews
            .remove(preview_id)
            .ok_or_else(|| PreviewError::UnknownPreview(preview_id.to_string()))?;

        if let (Some(docker), Some(container_id)) = (&self.docker, &entry.environment.container_handle) {
            container::stop_and_remove(docker, container_id).await.ok();
        }
        if let Some(port) = entry.environment.port {
            self.ports.release(port);
        }
        Ok(())
    }

    /// Removes every preview older than the hard expiry or idle past the
    /// idle expiry (§4.9 "A background reaper").
    pub async fn reap_expired(self: &Arc<Self>) {
        let now = Utc::now();
        let expired: Vec<String> = {
            let previews = self.previews.read().await;
            previews
                .iter()
                .filter(|(_, entry)| {
                    entry.environment.is_expired(
                        now,
                        chrono::Duration::from_std(self.config.hard_expiry).unwrap_or_default(),
                        chrono::Duration::from_std(self.config.idle_expiry).unwrap_or_default(),
                    )
                })
                .map(|(id, _)| id.clone())
                .collect()
        };
        for preview_id in expired {
            if let Err(error) = self.stop_preview(&preview_id).await {
                tracing::warn!(%preview_id, %error, "reaper failed to stop expired preview");
            }
        }
    }

    pub async fn working_dir_of(&self, preview_id: &str) -> Option<std::path::PathBuf> {
        self.previews
            .read()
            .await
            .get(preview_id)
            .map(|entry| entry.working_dir.path().to_path_buf())
    }
}

fn random_token() -> String {
    const CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::rng();
    (0..8)
        .map(|_| CHARSET[rng.random_range(0..CHARSET.len())] as char)
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn random_token_has_expected_length() {
        assert_eq!(random_token().len(), 8);
    }
}
