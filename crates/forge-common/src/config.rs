//! Typed configuration surface (§4.11 ambient addition; §6 "Environment
//! surface"). Parsing the environment/`forge.toml` overlay is an
//! external-collaborator concern per §1, but the typed shape lives here so
//! every component depends on `ForgeConfig` instead of reading
//! `std::env::var` directly.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

#[derive(Debug, Clone)]
pub struct PreviewConfig {
    pub port_range: (u16, u16),
    pub hard_expiry: Duration,
    pub idle_expiry: Duration,
    pub poll_interval: Duration,
    pub max_concurrent_previews: usize,
    pub service_memory_mib: u64,
    pub service_cpu_fraction: f32,
    pub static_memory_mib: u64,
    /// Upper bound on "Creating -> Running" (§5 "container build ≤ 120 s");
    /// a health probe that hasn't succeeded by this point fails the build.
    pub build_timeout: Duration,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            port_range: (8100, 8200),
            hard_expiry: Duration::from_secs(60 * 60),
            idle_expiry: Duration::from_secs(30 * 60),
            poll_interval: Duration::from_secs(2),
            max_concurrent_previews: 16,
            service_memory_mib: 512,
            service_cpu_fraction: 0.5,
            static_memory_mib: 256,
            build_timeout: Duration::from_secs(120),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ForgeConfig {
    pub preview: PreviewConfig,
    /// Shared retry budget for both the Orchestrator's repair loop
    /// (§4.5 step 5) and the Validation auto-fix loop (§4.8) — one
    /// constant, not two independently configured ones, since they bound
    /// the same logical attempt counter.
    pub max_repair_attempts: u32,
    pub circuit_breaker_threshold: u32,
    pub circuit_breaker_reprobe: Duration,
    pub memory_context_budget_chars: usize,
    pub debug: bool,
}

impl Default for ForgeConfig {
    fn default() -> Self {
        Self {
            preview: PreviewConfig::default(),
            max_repair_attempts: 3,
            circuit_breaker_threshold: 3,
            circuit_breaker_reprobe: Duration::from_secs(60),
            memory_context_budget_chars: 4096,
            debug: false,
        }
    }
}

/// Optional `forge.toml` overlay; every field is optional so a file only
/// needs to name what it overrides (§4.11 "an optional `forge.toml`
/// overlay parsed with `toml`").
#[derive(Debug, Default, Deserialize)]
struct ConfigOverlay {
    max_repair_attempts: Option<u32>,
    circuit_breaker_threshold: Option<u32>,
    debug: Option<bool>,
    preview: Option<PreviewOverlay>,
}

#[derive(Debug, Default, Deserialize)]
struct PreviewOverlay {
    port_range: Option<String>,
    poll_interval_secs: Option<u64>,
    max_concurrent_previews: Option<usize>,
}

impl ForgeConfig {
    /// Assembles config in the layering §4.11 describes: hardcoded
    /// defaults, then a `forge.toml` overlay in the current directory (if
    /// present), then environment variable overrides.
    pub fn load() -> Self {
        let mut config = Self::default();
        config.apply_overlay_file(Path::new("forge.toml"));
        config.apply_env();
        config
    }

    /// Environment-only layer, skipping the `forge.toml` overlay — useful
    /// where a working directory's `forge.toml` shouldn't leak into a
    /// test or CLI invocation that only cares about env vars.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    fn apply_overlay_file(&mut self, path: &Path) {
        let Ok(contents) = std::fs::read_to_string(path) else {
            return;
        };
        match toml::from_str::<ConfigOverlay>(&contents) {
            Ok(overlay) => self.apply_overlay(overlay),
            Err(error) => {
                tracing::warn!(%error, path = %path.display(), "failed to parse forge.toml overlay; ignoring");
            }
        }
    }

    fn apply_overlay(&mut self, overlay: ConfigOverlay) {
        if let Some(n) = overlay.max_repair_attempts {
            self.max_repair_attempts = n;
        }
        if let Some(n) = overlay.circuit_breaker_threshold {
            self.circuit_breaker_threshold = n;
        }
        if let Some(v) = overlay.debug {
            self.debug = v;
        }
        let Some(preview) = overlay.preview else { return };
        if let Some(range) = preview.port_range.as_deref().and_then(parse_port_range) {
            self.preview.port_range = range;
        }
        if let Some(secs) = preview.poll_interval_secs {
            self.preview.poll_interval = Duration::from_secs(secs);
        }
        if let Some(n) = preview.max_concurrent_previews {
            self.preview.max_concurrent_previews = n;
        }
    }

    fn apply_env(&mut self) {
        if let Some(range) = std::env::var("FORGE_PREVIEW_PORT_RANGE").ok().as_deref().and_then(parse_port_range) {
            self.preview.port_range = range;
        }
        if let Ok(v) = std::env::var("FORGE_MAX_REPAIR_ATTEMPTS") {
            if let Ok(n) = v.parse() {
                self.max_repair_attempts = n;
            }
        }
        if let Ok(v) = std::env::var("FORGE_PREVIEW_POLL_INTERVAL_SECS") {
            if let Ok(n) = v.parse() {
                self.preview.poll_interval = Duration::from_secs(n);
            }
        }
        if let Ok(v) = std::env::var("FORGE_DEBUG") {
            self.debug = v == "1" || v.eq_ignore_ascii_case("true");
        }
    }
}

fn parse_port_range(value: &str) -> Option<(u16, u16)> {
    let (start, end) = value.split_once('-')?;
    Some((start.trim().parse().ok()?, end.trim().parse().ok()?))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_spec_defaults() {
        let config = ForgeConfig::default();
        assert_eq!(config.preview.port_range, (8100, 8200));
        assert_eq!(config.max_repair_attempts, 3);
        assert_eq!(config.circuit_breaker_threshold, 3);
    }

    #[test]
    fn parses_port_range() {
        assert_eq!(parse_port_range("9000-9100"), Some((9000, 9100)));
        assert_eq!(parse_port_range("nonsense"), None);
    }

    #[test]
    fn overlay_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("forge.toml");
        std::fs::write(
            &path,
            r#"
            max_repair_attempts = 7
            debug = true

            [preview]
            port_range = "9000-9100"
            poll_interval_secs = 5
            "#,
        )
        .unwrap();

        let mut config = ForgeConfig::default();
        config.apply_overlay_file(&path);

        assert_eq!(config.max_repair_attempts, 7);
        assert!(config.debug);
        assert_eq!(config.preview.port_range, (9000, 9100));
        assert_eq!(config.preview.poll_interval, Duration::from_secs(5));
        assert_eq!(config.circuit_breaker_threshold, 3);
    }

    #[test]
    fn missing_overlay_file_leaves_defaults_untouched() {
        let mut config = ForgeConfig::default();
        config.apply_overlay_file(Path::new("/nonexistent/forge.toml"));
        assert_eq!(config.max_repair_attempts, 3);
    }
}
