//! Container build and lifecycle over the Docker daemon (§4.9 "Container
//! build"). Rather than assembling a bespoke Dockerfile per project, each
//! project type maps to a stock base image; the project's exported tree
//! is bind-mounted in and the development command runs against it. This
//! keeps a rebuild cheap (no image layer to produce) while still
//! matching the contract: install deps, expose a known port, run the
//! dev command.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use bollard::container::{
    Config, CreateContainerOptions, LogOutput, LogsOptions, RemoveContainerOptions,
    StartContainerOptions, StopContainerOptions,
};
use bollard::errors::Error as DockerError;
use bollard::models::{HostConfig, PortBinding};
use bollard::Docker;
use forge_protocol::preview::{LogRingBuffer, ProjectType};
use futures::StreamExt;
use tokio::sync::Mutex;

const NETWORK_NAME: &str = "forge-preview";

pub struct ContainerSpec {
    pub image: &'static str,
    pub container_port: u16,
    pub command: Vec<String>,
}

/// Synthesises a minimal container definition for `project_type` (§4.9).
pub fn spec_for(project_type: ProjectType) -> ContainerSpec {
    match project_type {
        ProjectType::PythonService => ContainerSpec {
            image: "python:3.12-slim",
            container_port: 8000,
            command: vec![
                "sh".to_string(),
                "-c".to_string(),
                "pip install --quiet -r requirements.txt 2>/dev/null; python app.py".to_string(),
            ],
        },
        ProjectType::ReactSpa => ContainerSpec {
            image: "node:20-slim",
            container_port: 5173,
            command: vec![
                "sh".to_string(),
                "-c".to_string(),
                "npm install --no-audit --no-fund >/dev/null 2>&1; npm run dev -- --host 0.0.0.0".to_string(),
            ],
        },
        ProjectType::NodeService => ContainerSpec {
            image: "node:20-slim",
            container_port: 3000,
            command: vec![
                "sh".to_string(),
                "-c".to_string(),
                "npm install --no-audit --no-fund >/dev/null 2>&1; npm start".to_string(),
            ],
        },
        ProjectType::StaticSite => ContainerSpec {
            image: "nginx:alpine",
            container_port: 80,
            command: Vec::new(),
        },
    }
}

/// Static sites get `static_memory_mib`; every other project type gets
/// the service memory/CPU caps (§4.9 "512 MiB memory, half a CPU for
/// services; 256 MiB for static").
pub fn resource_caps(
    project_type: ProjectType,
    service_memory_mib: u64,
    service_cpu_fraction: f32,
    static_memory_mib: u64,
) -> HostConfig {
    let (memory_mib, nano_cpus) = match project_type {
        ProjectType::StaticSite => (static_memory_mib, None),
        _ => (
            service_memory_mib,
            Some((service_cpu_fraction as f64 * 1_000_000_000.0) as i64),
        ),
    };
    HostConfig {
        memory: Some((memory_mib * 1024 * 1024) as i64),
        nano_cpus,
        network_mode: Some(NETWORK_NAME.to_string()),
        ..Default::default()
    }
}

/// Creates, starts, and returns the container id for `spec`, bind-mounting
/// `working_dir` at `/app` and publishing `host_port` to the container's
/// port.
pub async fn build_and_start(
    docker: &Docker,
    name: &str,
    spec: &ContainerSpec,
    working_dir: &std::path::Path,
    host_port: u16,
    mut host_config: HostConfig,
) -> Result<String, DockerError> {
    let mut port_bindings = HashMap::new();
    port_bindings.insert(
        format!("{}/tcp", spec.container_port),
        Some(vec![PortBinding {
            host_ip: Some("0.0.0.0".to_string()),
            host_port: Some(host_port.to_string()),
        }]),
    );
    host_config.port_bindings = Some(port_bindings);
    host_config.binds = Some(vec![format!(
        "{}:/app",
        working_dir.to_string_lossy()
    )]);

    let config = Config {
        image: Some(spec.image.to_string()),
        working_dir: Some("/app".to_string()),
        cmd: if spec.command.is_empty() {
            None
        } else {
            Some(spec.command.clone())
        },
        exposed_ports: Some(HashMap::from([(
            format!("{}/tcp", spec.container_port),
            HashMap::new(),
        )])),
        host_config: Some(host_config),
        ..Default::default()
    };

    let created = docker
        .create_container(Some(CreateContainerOptions { name, platform: None }), config)
        .await?;
    docker
        .start_container(&created.id, None::<StartContainerOptions<String>>)
        .await?;
    Ok(created.id)
}

/// Polls `127.0.0.1:host_port` until it accepts a TCP connection or
/// `budget` elapses (§4.9 "Creating -> Running (after a health probe
/// succeeds within a build-time budget)"). A dev-server's listen socket
/// opening is treated as "healthy" — there is no per-project-type HTTP
/// readiness endpoint to call, the same minimal bar used elsewhere for
/// a bare TCP connect/response check rather than a content check.
pub async fn wait_until_healthy(host_port: u16, budget: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + budget;
    let mut interval = tokio::time::interval(Duration::from_millis(250));
    loop {
        interval.tick().await;
        if tokio::net::TcpStream::connect(("127.0.0.1", host_port)).await.is_ok() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
    }
}

pub async fn stop_and_remove(docker: &Docker, container_id: &str) -> Result<(), DockerError> {
    docker
        .stop_container(container_id, Some(StopContainerOptions { t: 5 }))
        .await
        .ok();
    docker
        .remove_container(
            container_id,
            Some(RemoveContainerOptions {
                force: true,
                ..Default::default()
            }),
        )
        .await?;
    Ok(())
}

/// Treats any transport-level failure talking to the daemon as the
/// "Docker-daemon unavailable" case (§4.9 "whole subsystem reports
/// unavailable"), as opposed to an error the daemon itself returned.
pub fn docker_unavailable_hint(error: &DockerError) -> bool {
    error.to_string().to_lowercase().contains("connection")
}

/// Streams stdout/stderr from `container_id` into `logs` until the
/// container stops or the stream ends, feeding the ring buffer behind
/// `PreviewEnvironment.logs` (§3, §4.9). Spawned as a detached task per
/// preview; a lost connection to the daemon just ends the tail quietly.
pub fn spawn_log_tail(docker: Docker, container_id: String, logs: Arc<Mutex<LogRingBuffer>>) {
    tokio::spawn(async move {
        let options = LogsOptions::<String> {
            follow: true,
            stdout: true,
            stderr: true,
            tail: "all".to_string(),
            ..Default::default()
        };
        let mut stream = docker.logs(&container_id, Some(options));
        while let Some(chunk) = stream.next().await {
            let line = match chunk {
                Ok(LogOutput::StdOut { message } | LogOutput::StdErr { message }) => {
                    String::from_utf8_lossy(&message).trim_end().to_string()
                }
                Ok(_) => continue,
                Err(_) => break,
            };
            logs.lock().await.push(line);
        }
    });
}
