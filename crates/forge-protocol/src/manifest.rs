//! The authoritative plan for a generation (§3, §4.3).
//!
//! `ProjectManifest` is produced once by the Core agent and is immutable
//! for the remainder of the pipeline. [`validate`] is the strict schema
//! gate: on any violation the Core agent substitutes [`default_manifest`]
//! rather than attempting to coerce a partially-valid plan — per the
//! REDESIGN FLAGS note, invalid shapes are rejected, not repaired in
//! place.

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::agent::Role;

/// Closed set of application archetypes the engine knows how to scaffold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum AppType {
    Crud,
    Ecommerce,
    Dashboard,
    Social,
    Todo,
    Blog,
    Auth,
    Booking,
    Api,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
pub struct TechStack {
    pub backend: String,
    pub frontend: String,
    pub styling: String,
    #[serde(default)]
    pub database: Option<String>,
    #[serde(default)]
    pub auth: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FieldSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
    #[serde(default)]
    pub required: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DataModel {
    pub name: String,
    pub fields: Vec<FieldSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct APIEndpoint {
    pub method: String,
    pub path: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub request_model: Option<String>,
    #[serde(default)]
    pub response_model: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FileSpec {
    pub path: String,
    #[serde(default)]
    pub purpose: String,
}

/// The minimum set of generated files a manifest must cover (§3 invariant,
/// §8 "Manifest totality"). Each entry is a *role* a `files_to_generate`
/// path must fulfil; `file_fulfils_role` decides whether a given path
/// plausibly fills it, since exact filenames are stack-dependent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequiredFileRole {
    BackendEntry,
    DependencyManifest,
    FrontendEntryComponent,
    FrontendPackageManifest,
    HtmlEntry,
    BundlerConfig,
    FrontendBootstrap,
}

pub const REQUIRED_FILE_ROLES: &[RequiredFileRole] = &[
    RequiredFileRole::BackendEntry,
    RequiredFileRole::DependencyManifest,
    RequiredFileRole::FrontendEntryComponent,
    RequiredFileRole::FrontendPackageManifest,
    RequiredFileRole::HtmlEntry,
    RequiredFileRole::BundlerConfig,
    RequiredFileRole::FrontendBootstrap,
];

fn file_fulfils_role(path: &str, role: RequiredFileRole) -> bool {
    let lower = path.to_ascii_lowercase();
    match role {
        RequiredFileRole::BackendEntry => {
            lower.ends_with("main.py")
                || lower.ends_with("app.py")
                || lower.ends_with("server.js")
                || lower.ends_with("index.js")
                || lower.ends_with("main.rs")
        }
        RequiredFileRole::DependencyManifest => {
            lower.ends_with("requirements.txt") || lower.ends_with("cargo.toml")
        }
        RequiredFileRole::FrontendEntryComponent => {
            lower.ends_with("app.jsx")
                || lower.ends_with("app.tsx")
                || lower.ends_with("app.js")
                || lower.ends_with("app.vue")
        }
        RequiredFileRole::FrontendPackageManifest => lower.ends_with("package.json"),
        RequiredFileRole::HtmlEntry => lower.ends_with("index.html"),
        RequiredFileRole::BundlerConfig => {
            lower.ends_with("vite.config.js")
                || lower.ends_with("vite.config.ts")
                || lower.ends_with("webpack.config.js")
        }
        RequiredFileRole::FrontendBootstrap => {
            lower.ends_with("main.jsx") || lower.ends_with("main.tsx") || lower.ends_with("main.js")
        }
    }
}

/// The structured plan a generation pipeline consumes (§3 `ProjectManifest`).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ProjectManifest {
    pub analysis: String,
    pub app_type: AppType,
    pub features: Vec<String>,
    pub tech_stack: TechStack,
    #[serde(default)]
    pub models: Vec<DataModel>,
    #[serde(default)]
    pub endpoints: Vec<APIEndpoint>,
    pub files_to_generate: Vec<FileSpec>,
    #[serde(default)]
    pub integrations: Vec<String>,
    pub agents_needed: Vec<Role>,
    #[serde(default)]
    pub priority: String,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ManifestError {
    #[error("features must be non-empty")]
    EmptyFeatures,
    #[error("model name {0:?} must begin with an uppercase letter")]
    BadModelName(String),
    #[error("endpoint path {0:?} must begin with '/'")]
    BadEndpointPath(String),
    #[error("files_to_generate is missing a file covering {0:?}")]
    MissingRequiredFile(RequiredFileRole),
}

/// Strict schema gate (§4.3): fails on any missing required field, unknown
/// `app_type`, empty features, ill-formed endpoint path, or a
/// `files_to_generate` set missing a member of the required roles.
///
/// `app_type` and other "unknown variant" failures are caught earlier, at
/// deserialization time, by serde's closed enum — this function covers the
/// invariants serde cannot express structurally.
pub fn validate(manifest: &ProjectManifest) -> Result<(), ManifestError> {
    if manifest.features.is_empty() {
        return Err(ManifestError::EmptyFeatures);
    }
    for model in &manifest.models {
        if !model
            .name
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_uppercase())
        {
            return Err(ManifestError::BadModelName(model.name.clone()));
        }
    }
    for endpoint in &manifest.endpoints {
        if !endpoint.path.starts_with('/') {
            return Err(ManifestError::BadEndpointPath(endpoint.path.clone()));
        }
    }
    for role in REQUIRED_FILE_ROLES {
        let covered = manifest
            .files_to_generate
            .iter()
            .any(|f| file_fulfils_role(&f.path, *role));
        if !covered {
            return Err(ManifestError::MissingRequiredFile(*role));
        }
    }
    Ok(())
}

/// Default manifest substituted by the Core agent when the LLM's output
/// fails [`validate`] or fails to parse at all (§8 scenario 1).
pub fn default_manifest(project_name: &str, description: &str) -> ProjectManifest {
    let tech_stack = TechStack {
        backend: "python-fastapi".to_string(),
        frontend: "react".to_string(),
        styling: "tailwind".to_string(),
        database: Some("sqlite".to_string()),
        auth: None,
    };
    ProjectManifest {
        analysis: format!(
            "Default manifest substituted for project {project_name:?}: {description}"
        ),
        app_type: AppType::Todo,
        features: vec![
            "create item".to_string(),
            "list items".to_string(),
            "delete item".to_string(),
        ],
        tech_stack,
        models: vec![DataModel {
            name: "Item".to_string(),
            fields: vec![
                FieldSpec {
                    name: "id".to_string(),
                    field_type: "string".to_string(),
                    required: true,
                },
                FieldSpec {
                    name: "title".to_string(),
                    field_type: "string".to_string(),
                    required: true,
                },
                FieldSpec {
                    name: "done".to_string(),
                    field_type: "boolean".to_string(),
                    required: false,
                },
            ],
        }],
        endpoints: vec![
            APIEndpoint {
                method: "GET".to_string(),
                path: "/items".to_string(),
                description: "list items".to_string(),
                request_model: None,
                response_model: Some("Item".to_string()),
            },
            APIEndpoint {
                method: "POST".to_string(),
                path: "/items".to_string(),
                description: "create item".to_string(),
                request_model: Some("Item".to_string()),
                response_model: Some("Item".to_string()),
            },
            APIEndpoint {
                method: "DELETE".to_string(),
                path: "/items/{id}".to_string(),
                description: "delete item".to_string(),
                request_model: None,
                response_model: None,
            },
        ],
        files_to_generate: vec![
            FileSpec {
                path: "backend/main.py".to_string(),
                purpose: "backend entry".to_string(),
            },
            FileSpec {
                path: "backend/requirements.txt".to_string(),
                purpose: "dependency manifest".to_string(),
            },
            FileSpec {
                path: "frontend/src/App.jsx".to_string(),
                purpose: "frontend entry component".to_string(),
            },
            FileSpec {
                path: "frontend/package.json".to_string(),
                purpose: "frontend package manifest".to_string(),
            },
            FileSpec {
                path: "frontend/index.html".to_string(),
                purpose: "html entry".to_string(),
            },
            FileSpec {
                path: "frontend/vite.config.js".to_string(),
                purpose: "bundler config".to_string(),
            },
            FileSpec {
                path: "frontend/src/main.jsx".to_string(),
                purpose: "frontend bootstrap".to_string(),
            },
        ],
        integrations: Vec::new(),
        agents_needed: vec![Role::Arch, Role::Backend, Role::Uix, Role::Test],
        priority: "ship the default todo scaffold".to_string(),
    }
}

/// A per-file purpose map, as produced by the Arch agent's refinement of
/// the manifest into the §4.4 `ArchitectureSpec`.
pub type PurposeMap = BTreeMap<String, String>;

/// Refinement of a [`ProjectManifest`] produced by the Arch agent:
/// endpoints annotated with request/response models, data models with
/// field types (already present on the manifest, carried through
/// unchanged), a per-file purpose map, and optional scaling notes. The
/// Arch agent fails soft by passing the manifest through with an empty
/// purpose map and no notes (§4.4).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ArchitectureSpec {
    pub manifest: ProjectManifest,
    #[serde(default)]
    pub file_purposes: PurposeMap,
    #[serde(default)]
    pub scaling_notes: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn default_manifest_satisfies_validate() {
        let manifest = default_manifest("TodoApp", "a todo list");
        validate(&manifest).expect("default manifest must always validate");
        assert!(manifest.features.len() >= 3);
        assert_eq!(manifest.app_type, AppType::Todo);
    }

    #[test]
    fn rejects_empty_features() {
        let mut manifest = default_manifest("x", "y");
        manifest.features.clear();
        assert_eq!(validate(&manifest), Err(ManifestError::EmptyFeatures));
    }

    #[test]
    fn rejects_lowercase_model_name() {
        let mut manifest = default_manifest("x", "y");
        manifest.models[0].name = "item".to_string();
        assert_eq!(
            validate(&manifest),
            Err(ManifestError::BadModelName("item".to_string()))
        );
    }

    #[test]
    fn rejects_endpoint_without_leading_slash() {
        let mut manifest = default_manifest("x", "y");
        manifest.endpoints[0].path = "items".to_string();
        assert_eq!(
            validate(&manifest),
            Err(ManifestError::BadEndpointPath("items".to_string()))
        );
    }

    #[test]
    fn rejects_missing_required_file_role() {
        let mut manifest = default_manifest("x", "y");
        manifest
            .files_to_generate
            .retain(|f| !f.path.ends_with("index.html"));
        assert_eq!(
            validate(&manifest),
            Err(ManifestError::MissingRequiredFile(
                RequiredFileRole::HtmlEntry
            ))
        );
    }
}
