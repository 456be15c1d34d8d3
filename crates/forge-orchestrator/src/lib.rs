//! Ties the Router, Agent set, VFS, AST Patcher, Validation pipeline, and
//! Memory store into the `generate` and `edit` pipelines (C5, §4.5).

pub mod error;
mod project_lock;

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use forge_agents::{run_arch, run_artifact_agent, run_core};
use forge_common::config::ForgeConfig;
use forge_llm::Router;
use forge_protocol::agent::{AgentContext, Role};
use forge_protocol::manifest::ProjectManifest;
use forge_protocol::validation::AggregatedValidation;
use forge_validate::ValidationPipeline;
use forge_vfs::Vfs;
use tokio::sync::RwLock;

pub use error::OrchestratorError;
use project_lock::ProjectLocks;

/// Outcome of a `generate` run (§4.5 "generate").
pub struct GenerateOutcome {
    pub project_id: String,
    pub commit_id: String,
    pub manifest: ProjectManifest,
    pub validation: AggregatedValidation,
    pub repair_attempts: u32,
}

/// Outcome of an `edit` run (§4.5 "edit").
pub struct EditOutcome {
    pub project_id: String,
    pub commit_id: String,
    pub changed_files: Vec<String>,
    pub validation: Option<AggregatedValidation>,
}

/// Owns one [`Vfs`] per project and coordinates the generate/edit
/// pipelines over it (§3 "Ownership": "the Orchestrator holds only
/// transient AgentContext during one request").
pub struct Orchestrator {
    router: Router,
    config: ForgeConfig,
    validation: ValidationPipeline,
    memory_base_dir: PathBuf,
    projects: RwLock<HashMap<String, Vfs>>,
    locks: ProjectLocks,
}

impl Orchestrator {
    pub fn new(router: Router, config: ForgeConfig, memory_base_dir: PathBuf) -> Self {
        Self {
            router,
            config,
            validation: ValidationPipeline::with_defaults(),
            memory_base_dir,
            projects: RwLock::new(HashMap::new()),
            locks: ProjectLocks::new(),
        }
    }

    /// `generate` pipeline (§4.5 step 1-6).
    #[tracing::instrument(skip(self, spec), fields(project_id = %project_id))]
    pub async fn generate(
        &self,
        project_id: &str,
        project_name: &str,
        spec: &str,
    ) -> Result<GenerateOutcome, OrchestratorError> {
        let _guard = self.locks.acquire(project_id).await;

        let memory_context = self.memory_context_for(project_id, spec);

        let mut context = AgentContext::new(project_name, project_id, spec);
        context.memory_context = memory_context;

        // Step 2: Core -> ProjectManifest. A missing router decision for
        // this task is fatal for generation (§4.5 "Failure semantics").
        let core_outcome = run_core(&self.router, &context)
            .await
            .map_err(|_| OrchestratorError::CoreUnavailable)?;
        let manifest = core_outcome.manifest.clone();
        context.absorb(core_outcome.message);

        // Step 3: fixed agent order, each seeing every prior artifact.
        let arch_outcome = run_arch(&self.router, &context, &manifest).await;
        context.absorb(arch_outcome.message);

        for role in [Role::Backend, Role::Uix, Role::Test, Role::Quality, Role::Debug] {
            if !manifest.agents_needed.contains(&role) {
                continue;
            }
            let message = run_artifact_agent(&self.router, &context, role).await;
            context.absorb(message);
        }

        // Step 4: merge into the VFS, then validate.
        let mut projects = self.projects.write().await;
        let vfs = projects
            .entry(project_id.to_string())
            .or_insert_with(|| Vfs::new(project_id));
        for (path, content) in &context.current_files {
            vfs.write_file(path, content.clone());
        }

        let mut aggregated = self.validation.run(&vfs.current_files()).await;
        let mut attempts = 0u32;

        // Step 5: repair loop, bounded by max_repair_attempts.
        while !aggregated.passed() && attempts < self.config.max_repair_attempts {
            attempts += 1;
            let directive = forge_validate::format_repair_directive(&aggregated);
            context.directive = Some(directive);
            context.current_files = vfs.current_files();

            for role in [Role::Quality, Role::Debug] {
                let message = run_artifact_agent(&self.router, &context, role).await;
                context.absorb(message);
            }
            context.directive = None;

            for (path, content) in &context.current_files {
                vfs.write_file(path, content.clone());
            }
            aggregated = self.validation.run(&vfs.current_files()).await;
        }

        let commit_message = if aggregated.passed() {
            format!("Initial generation: {project_name}")
        } else {
            format!(
                "Initial generation: {project_name} (committed with {} unresolved error(s) after {attempts} repair attempt(s))",
                aggregated.error_issues().len()
            )
        };
        let commit_id = vfs.commit(commit_message)?;
        let final_files = vfs.current_files();
        drop(projects);

        self.store_memory(project_id, &manifest, &final_files);

        Ok(GenerateOutcome {
            project_id: project_id.to_string(),
            commit_id,
            manifest,
            validation: aggregated,
            repair_attempts: attempts,
        })
    }

    /// `edit` pipeline (§4.5 "edit" step 1-4).
    #[tracing::instrument(skip(self, instruction, image_data), fields(project_id = %project_id))]
    pub async fn edit(
        &self,
        project_id: &str,
        instruction: &str,
        image_data: Option<Vec<u8>>,
    ) -> Result<EditOutcome, OrchestratorError> {
        let _guard = self.locks.acquire(project_id).await;

        let mut projects = self.projects.write().await;
        let vfs = projects
            .get_mut(project_id)
            .ok_or_else(|| OrchestratorError::UnknownProject(project_id.to_string()))?;

        let current_files = vfs.current_files();
        let memory_context = self.memory_context_for(project_id, instruction);

        let mut context = AgentContext::new(project_id, project_id, "");
        context.current_files = current_files.clone();
        context.instruction = Some(instruction.to_string());
        context.image_data = image_data;
        context.memory_context = memory_context;

        let message = run_artifact_agent(&self.router, &context, Role::Edit).await;

        let mut changed_files = Vec::new();
        for (path, new_content) in &message.artifacts {
            let previous = current_files.get(path).cloned().unwrap_or_default();
            let applied = match forge_patch::detect_language(path) {
                Some(_) => {
                    let patch = forge_patch::diff(path, &previous, new_content);
                    forge_patch::apply(path, &previous, &patch).unwrap_or_else(|_| new_content.clone())
                }
                None => new_content.clone(),
            };
            vfs.write_file(path, applied);
            changed_files.push(path.clone());
        }

        let commit_id = vfs.commit(format!("edit: {instruction}"))?;
        let final_files = vfs.current_files();

        // Non-blocking re-validation (§4.5 "optionally re-validate
        // (non-blocking)"): failures here never undo the commit.
        let validation = if changed_files.is_empty() {
            None
        } else {
            Some(self.validation.run(&final_files).await)
        };
        drop(projects);

        Ok(EditOutcome {
            project_id: project_id.to_string(),
            commit_id,
            changed_files,
            validation,
        })
    }

    /// Grants read access to a project's current file set, e.g. for
    /// handing off to the Preview Sandbox (§4.9 "the exported tree").
    pub async fn current_files(&self, project_id: &str) -> Option<BTreeMap<String, String>> {
        self.projects.read().await.get(project_id).map(|vfs| vfs.current_files())
    }

    pub async fn latest_commit(&self, project_id: &str) -> Option<String> {
        self.projects
            .read()
            .await
            .get(project_id)
            .and_then(|vfs| vfs.current_commit_id().map(str::to_string))
    }

    fn memory_context_for(&self, project_id: &str, query: &str) -> Option<String> {
        let store = forge_memory::open_project_store(&self.memory_base_dir, project_id).ok()?;
        forge_memory::get_context_for_generation(&store, project_id, query, self.config.memory_context_budget_chars)
            .ok()
            .filter(|s| !s.is_empty())
    }

    fn store_memory(&self, project_id: &str, manifest: &ProjectManifest, files: &BTreeMap<String, String>) {
        let Ok(store) = forge_memory::open_project_store(&self.memory_base_dir, project_id) else {
            return;
        };
        if let Err(error) = store.store_decision(project_id, "app_type", &manifest.analysis) {
            tracing::warn!(%error, "failed to persist generation decision to memory");
        }
        for (path, content) in files {
            let language = path.rsplit('.').next().unwrap_or("text");
            if let Err(error) = store.store_code(project_id, path, content, language) {
                tracing::warn!(%error, path, "failed to persist generated file to memory");
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use forge_llm::adapter::{Adapter, AdapterError, AdapterMetadata, CompletionResponse};
    use forge_llm::{CompletionRequest, RouterConfig};
    use forge_protocol::agent::TaskType;
    use std::sync::Arc;
    use std::time::Duration;

    /// Canned-response adapter standing in for a real LLM backend in
    /// tests, the same role `FlakyAdapter` plays in `forge-llm`'s own
    /// router tests.
    struct ScriptedAdapter {
        id: &'static str,
        task: TaskType,
    }

    #[async_trait]
    impl Adapter for ScriptedAdapter {
        fn id(&self) -> &'static str {
            self.id
        }
        fn model_id(&self) -> &'static str {
            "scripted-model"
        }
        fn metadata(&self) -> AdapterMetadata {
            AdapterMetadata {
                max_context_tokens: 32_000,
                supports_streaming: false,
                supports_vision: true,
                preferred_for: match self.task {
                    TaskType::Reasoning => &[TaskType::Reasoning],
                    TaskType::Code => &[TaskType::Code],
                    TaskType::UiText => &[TaskType::UiText],
                },
            }
        }
        fn has_credentials(&self) -> bool {
            true
        }
        async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, AdapterError> {
            let text = match self.task {
                TaskType::Reasoning if request.system_prompt.contains("architecture") => {
                    r#"{"manifest":{"analysis":"a todo app","app_type":"todo","features":["add item"],"tech_stack":{"backend":"python-fastapi","frontend":"react","styling":"tailwind","database":"sqlite","auth":null},"models":[{"name":"Item","fields":[{"name":"id","type":"string","required":true}]}],"endpoints":[{"method":"GET","path":"/items","description":"list","request_model":null,"response_model":"Item"}],"files_to_generate":[{"path":"backend/main.py","purpose":"entry"},{"path":"backend/requirements.txt","purpose":"deps"},{"path":"frontend/src/App.jsx","purpose":"entry"},{"path":"frontend/package.json","purpose":"deps"},{"path":"frontend/index.html","purpose":"html"},{"path":"frontend/vite.config.js","purpose":"bundler"},{"path":"frontend/src/main.jsx","purpose":"bootstrap"}],"integrations":[],"agents_needed":["BACKEND","UIX"],"priority":"ship it"},"file_purposes":{},"scaling_notes":null}"#.to_string()
                }
                TaskType::Reasoning => {
                    r#"{"analysis":"a todo app","app_type":"todo","features":["add item"],"tech_stack":{"backend":"python-fastapi","frontend":"react","styling":"tailwind","database":"sqlite","auth":null},"models":[{"name":"Item","fields":[{"name":"id","type":"string","required":true}]}],"endpoints":[{"method":"GET","path":"/items","description":"list","request_model":null,"response_model":"Item"}],"files_to_generate":[{"path":"backend/main.py","purpose":"entry"},{"path":"backend/requirements.txt","purpose":"deps"},{"path":"frontend/src/App.jsx","purpose":"entry"},{"path":"frontend/package.json","purpose":"deps"},{"path":"frontend/index.html","purpose":"html"},{"path":"frontend/vite.config.js","purpose":"bundler"},{"path":"frontend/src/main.jsx","purpose":"bootstrap"}],"integrations":[],"agents_needed":["BACKEND","UIX"],"priority":"ship it"}"#.to_string()
                }
                TaskType::Code if request.system_prompt.contains("change") => {
                    r#"{"backend/main.py": "def app():\n    return 'hello, edited'\n"}"#.to_string()
                }
                TaskType::Code => {
                    r#"{"backend/main.py": "def app():\n    return 'hello'\n"}"#.to_string()
                }
                TaskType::UiText => r#"{"frontend/src/App.jsx": "export default function App() { return null; }\n"}"#.to_string(),
            };
            Ok(CompletionResponse {
                text,
                latency: Duration::from_millis(5),
            })
        }
    }

    fn test_router() -> Router {
        let adapters: Vec<Arc<dyn Adapter>> = vec![
            Arc::new(ScriptedAdapter { id: "reasoning", task: TaskType::Reasoning }),
            Arc::new(ScriptedAdapter { id: "code", task: TaskType::Code }),
            Arc::new(ScriptedAdapter { id: "ui", task: TaskType::UiText }),
        ];
        Router::new(adapters, RouterConfig::default())
    }

    #[tokio::test]
    async fn generate_produces_a_commit_with_the_requested_artifacts() {
        let memory_dir = tempfile::tempdir().unwrap();
        let orchestrator = Orchestrator::new(test_router(), ForgeConfig::default(), memory_dir.path().to_path_buf());

        let outcome = orchestrator
            .generate("proj-1", "TodoApp", "a simple todo list app")
            .await
            .expect("generate should succeed with a scripted reasoning provider");

        assert!(!outcome.commit_id.is_empty());
        assert_eq!(outcome.manifest.features, vec!["add item".to_string()]);

        let files = orchestrator.current_files("proj-1").await.unwrap();
        assert!(files.contains_key("backend/main.py"));
    }

    #[tokio::test]
    async fn edit_updates_only_the_targeted_file() {
        let memory_dir = tempfile::tempdir().unwrap();
        let orchestrator = Orchestrator::new(test_router(), ForgeConfig::default(), memory_dir.path().to_path_buf());
        orchestrator
            .generate("proj-2", "TodoApp", "a simple todo list app")
            .await
            .unwrap();

        let outcome = orchestrator
            .edit("proj-2", "change the greeting message", None)
            .await
            .expect("edit should succeed against an existing project");

        assert_eq!(outcome.changed_files, vec!["backend/main.py".to_string()]);
        let files = orchestrator.current_files("proj-2").await.unwrap();
        assert!(files["backend/main.py"].contains("edited"));
    }

    #[tokio::test]
    async fn edit_against_unknown_project_fails() {
        let memory_dir = tempfile::tempdir().unwrap();
        let orchestrator = Orchestrator::new(test_router(), ForgeConfig::default(), memory_dir.path().to_path_buf());
        let result = orchestrator.edit("no-such-project", "do something", None).await;
        assert!(matches!(result, Err(OrchestratorError::UnknownProject(_))));
    }

    /// An adapter that only ever returns malformed JSON, standing in for
    /// a reasoning provider whose output the Core agent can't parse
    /// (§8 scenario 1 "default manifest").
    struct GarbledAdapter;

    #[async_trait]
    impl Adapter for GarbledAdapter {
        fn id(&self) -> &'static str {
            "garbled"
        }
        fn model_id(&self) -> &'static str {
            "garbled-model"
        }
        fn metadata(&self) -> AdapterMetadata {
            AdapterMetadata {
                max_context_tokens: 8_000,
                supports_streaming: false,
                supports_vision: false,
                preferred_for: &[TaskType::Reasoning],
            }
        }
        fn has_credentials(&self) -> bool {
            true
        }
        async fn complete(&self, _request: CompletionRequest) -> Result<CompletionResponse, AdapterError> {
            Ok(CompletionResponse {
                text: "not json at all, just prose".to_string(),
                latency: Duration::from_millis(5),
            })
        }
    }

    #[tokio::test]
    async fn unparseable_core_output_falls_back_to_the_default_manifest() {
        let adapters: Vec<Arc<dyn Adapter>> = vec![
            Arc::new(GarbledAdapter),
            Arc::new(ScriptedAdapter { id: "code", task: TaskType::Code }),
            Arc::new(ScriptedAdapter { id: "ui", task: TaskType::UiText }),
        ];
        let router = Router::new(adapters, RouterConfig::default());
        let memory_dir = tempfile::tempdir().unwrap();
        let orchestrator = Orchestrator::new(router, ForgeConfig::default(), memory_dir.path().to_path_buf());

        let outcome = orchestrator
            .generate("proj-3", "TodoApp", "a todo list")
            .await
            .expect("a garbled Core response falls back, it never fails generation");

        assert_eq!(outcome.manifest.app_type, forge_protocol::manifest::AppType::Todo);
        assert!(outcome.manifest.features.len() >= 3);
        for required in [
            "backend/main.py",
            "backend/requirements.txt",
            "frontend/src/App.jsx",
            "frontend/package.json",
            "frontend/index.html",
            "frontend/vite.config.js",
            "frontend/src/main.jsx",
        ] {
            assert!(
                outcome.manifest.files_to_generate.iter().any(|f| f.path == required),
                "missing required file {required}"
            );
        }
    }
}
