//! One function per subcommand, kept deliberately thin: argument handling
//! lives in `main.rs`, everything else is a direct call into
//! `forge-orchestrator`/`forge-preview`.

use forge_orchestrator::Orchestrator;

pub async fn generate(orchestrator: &Orchestrator, project_id: &str, project_name: &str, spec: &str) -> anyhow::Result<()> {
    let outcome = orchestrator.generate(project_id, project_name, spec).await?;
    println!(
        "generated project {} at commit {} ({} repair attempt(s), validation {})",
        outcome.project_id,
        outcome.commit_id,
        outcome.repair_attempts,
        if outcome.validation.passed() { "passed" } else { "has unresolved issues" }
    );
    println!("manifest: {}", serde_json::to_string_pretty(&outcome.manifest)?);
    Ok(())
}

pub async fn edit(orchestrator: &Orchestrator, project_id: &str, instruction: &str) -> anyhow::Result<()> {
    let outcome = orchestrator.edit(project_id, instruction, None).await?;
    println!("edited project {} at commit {}", outcome.project_id, outcome.commit_id);
    for path in &outcome.changed_files {
        println!("  changed: {path}");
    }
    if let Some(validation) = outcome.validation {
        println!("re-validation: {}", if validation.passed() { "passed" } else { "has issues" });
    }
    Ok(())
}

pub async fn preview(orchestrator: &Orchestrator, project_id: &str) -> anyhow::Result<()> {
    let files = orchestrator
        .current_files(project_id)
        .await
        .ok_or_else(|| anyhow::anyhow!("unknown project {project_id}"))?;

    let manager = forge_preview::PreviewManager::new(forge_common::config::PreviewConfig::default());
    let environment = manager.create_preview(project_id, &files).await?;
    println!("preview {} status={:?}", environment.preview_id, environment.status);
    if let Some(url) = environment.url {
        println!("url: {url}");
    }
    if let Some(error) = environment.error {
        println!("error: {error}");
    }
    Ok(())
}

pub async fn history(orchestrator: &Orchestrator, project_id: &str) -> anyhow::Result<()> {
    match orchestrator.latest_commit(project_id).await {
        Some(commit_id) => println!("latest commit: {commit_id}"),
        None => println!("no commits for project {project_id}"),
    }
    Ok(())
}
