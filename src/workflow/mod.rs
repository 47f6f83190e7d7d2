//! Crew workflows: build a plan, discover the tool servers it needs, hand it
//! to an engine, then see which artifacts were left behind.

pub mod artifacts;
pub mod discovery;
pub mod engine;
pub mod templates;

use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use crate::core::WorkflowError;
use crate::domain::CrewPlan;

pub use artifacts::{ArtifactReport, ArtifactStatus};
pub use engine::{CommandEngine, CrewEngine, DryRunEngine};
pub use templates::{Workflow, SAMPLE_PROJECTS};

#[derive(Debug, Clone)]
pub struct CrewOptions {
    pub workflow: Workflow,
    pub requirement: String,
    /// Binary used to launch tool servers; `None` skips discovery.
    pub server_command: Option<String>,
    /// Where agents write their files.
    pub artifact_dir: PathBuf,
    pub output: Option<PathBuf>,
}

#[derive(Debug)]
pub struct CrewRun {
    pub plan: CrewPlan,
    pub result: String,
    pub artifacts: Vec<ArtifactReport>,
}

pub async fn run_crew(opts: &CrewOptions, engine: &dyn CrewEngine) -> Result<CrewRun, WorkflowError> {
    let requirement = opts.requirement.trim();
    if requirement.is_empty() {
        return Err(WorkflowError::EmptyRequirement);
    }

    let mut plan = opts.workflow.plan(requirement);
    if let Some(command) = &opts.server_command {
        let servers = discovery::discover_all(opts.workflow.tool_variants(), command).await?;
        plan.attach_tool_servers(servers);
    }
    let tool_count = plan.agents.first().map(|a| a.tools.len()).unwrap_or(0);
    tracing::info!(workflow = %opts.workflow, tools = tool_count, tasks = plan.tasks.len(), "plan ready");

    let result = engine.kickoff(&plan).await?;
    let artifacts = artifacts::inspect(&opts.artifact_dir, &plan.artifacts).await;

    if let Some(path) = &opts.output {
        write_result(path, &plan, &result).await?;
    }
    Ok(CrewRun {
        plan,
        result,
        artifacts,
    })
}

async fn write_result(path: &Path, plan: &CrewPlan, result: &str) -> Result<(), WorkflowError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    let body = format!(
        "Workflow: {}\nRequirement: {}\n\n{}\n",
        plan.workflow, plan.requirement, result
    );
    tokio::fs::write(path, body).await?;
    tracing::info!(path = %path.display(), "crew result written");
    Ok(())
}

/// Offer the sample projects and read a choice. End of input means no
/// requirement.
pub fn prompt_requirement<R: BufRead, W: Write>(mut input: R, mut out: W) -> Result<String, WorkflowError> {
    writeln!(out, "\n🎯 Sample Project Ideas:")?;
    for (i, project) in SAMPLE_PROJECTS.iter().enumerate() {
        writeln!(out, "   {}. {}", i + 1, project)?;
    }
    writeln!(out, "\n💡 Or describe your own project requirement...")?;

    loop {
        write!(out, "\nEnter project number (1-{}) or type custom requirement: ", SAMPLE_PROJECTS.len())?;
        out.flush()?;
        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            return Err(WorkflowError::EmptyRequirement);
        }
        match templates::pick_requirement(&line) {
            Some(requirement) => return Ok(requirement),
            None => writeln!(out, "Please enter a valid choice or requirement")?,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn opts(dir: &Path, requirement: &str) -> CrewOptions {
        CrewOptions {
            workflow: Workflow::DevTeam,
            requirement: requirement.into(),
            server_command: None,
            artifact_dir: dir.to_path_buf(),
            output: None,
        }
    }

    #[tokio::test]
    async fn dry_run_reports_missing_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let run = run_crew(&opts(dir.path(), "Build a file organizer"), &DryRunEngine)
            .await
            .unwrap();
        assert_eq!(run.plan.requirement, "Build a file organizer");
        assert!(run.result.contains("Software Developer"));
        assert_eq!(run.artifacts.len(), 3);
        assert!(run.artifacts.iter().all(|a| !a.is_present()));
    }

    #[tokio::test]
    async fn blank_requirement_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = run_crew(&opts(dir.path(), "   "), &DryRunEngine).await.unwrap_err();
        assert!(matches!(err, WorkflowError::EmptyRequirement));
    }

    #[tokio::test]
    async fn writes_result_file_when_asked() {
        let dir = tempfile::tempdir().unwrap();
        let mut o = opts(dir.path(), "Build a todo list manager");
        o.output = Some(dir.path().join("out/crew_result.txt"));
        std::fs::write(dir.path().join("project_plan.txt"), "plan").unwrap();

        let run = run_crew(&o, &DryRunEngine).await.unwrap();
        assert!(run.artifacts[0].is_present());
        let written = std::fs::read_to_string(dir.path().join("out/crew_result.txt")).unwrap();
        assert!(written.starts_with("Workflow: dev-team\nRequirement: Build a todo list manager"));
    }

    #[test]
    fn prompt_retries_on_blank_then_accepts_number() {
        let mut out = Vec::new();
        let req = prompt_requirement(Cursor::new("\n3\n"), &mut out).unwrap();
        assert_eq!(req, SAMPLE_PROJECTS[2]);
        let shown = String::from_utf8(out).unwrap();
        assert!(shown.contains("1. Create a simple Python calculator"));
        assert!(shown.contains("Please enter a valid choice"));
    }

    #[test]
    fn prompt_at_eof_is_empty_requirement() {
        let err = prompt_requirement(Cursor::new(""), Vec::new()).unwrap_err();
        assert!(matches!(err, WorkflowError::EmptyRequirement));
    }
}
