//! The two built-in crews and the sample requirements offered interactively.

use serde::{Deserialize, Serialize};

use crate::domain::{AgentProfile, CrewPlan, Process, TaskPrompt};
use crate::tools::Variant;

pub const SAMPLE_PROJECTS: [&str; 5] = [
    "Create a simple Python calculator with basic operations",
    "Build a todo list manager with file storage",
    "Create a basic web scraper for news headlines",
    "Build a password generator with customizable options",
    "Create a file organizer that sorts files by extension",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Workflow {
    /// Supervisor, developer and tester building a project.
    DevTeam,
    /// Researcher, analyst and writer producing a report.
    Research,
}

impl Workflow {
    pub fn as_str(self) -> &'static str {
        match self {
            Workflow::DevTeam => "dev-team",
            Workflow::Research => "research",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Workflow::DevTeam => "3-Agent Development Team",
            Workflow::Research => "Research Crew",
        }
    }

    /// Tool servers launched for discovery, in connection order.
    pub fn tool_variants(self) -> &'static [Variant] {
        match self {
            Workflow::DevTeam => &[Variant::Terminal, Variant::Filesystem, Variant::Simple],
            Workflow::Research => &[Variant::Sample],
        }
    }

    pub fn artifacts(self) -> &'static [&'static str] {
        match self {
            Workflow::DevTeam => &["project_plan.txt", "development_log.txt", "test_report.txt"],
            Workflow::Research => &["ai_trends_report.txt"],
        }
    }

    /// Whether the workflow needs a requirement from the user.
    pub fn takes_requirement(self) -> bool {
        matches!(self, Workflow::DevTeam)
    }

    pub fn default_requirement(self) -> &'static str {
        match self {
            Workflow::DevTeam => SAMPLE_PROJECTS[0],
            Workflow::Research => "artificial intelligence trends in 2024",
        }
    }

    /// Agents and ordered tasks, with no tools attached yet.
    pub fn plan(self, requirement: &str) -> CrewPlan {
        let (agents, tasks) = match self {
            Workflow::DevTeam => (dev_team_agents(), dev_team_tasks(requirement)),
            Workflow::Research => (research_agents(), research_tasks(requirement)),
        };
        CrewPlan {
            workflow: self.as_str().to_string(),
            process: Process::Sequential,
            requirement: requirement.to_string(),
            agents,
            tasks,
            tool_servers: Vec::new(),
            artifacts: self.artifacts().iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl std::fmt::Display for Workflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolve interactive input: `1`..=`5` picks a sample project, anything else
/// non-blank is taken verbatim.
pub fn pick_requirement(input: &str) -> Option<String> {
    let choice = input.trim();
    if choice.is_empty() {
        return None;
    }
    if let Ok(n) = choice.parse::<usize>() {
        if (1..=SAMPLE_PROJECTS.len()).contains(&n) {
            return Some(SAMPLE_PROJECTS[n - 1].to_string());
        }
    }
    Some(choice.to_string())
}

fn agent(role: &str, goal: &str, backstory: &str, max_iter: Option<u32>, allow_delegation: bool) -> AgentProfile {
    AgentProfile {
        role: role.to_string(),
        goal: goal.to_string(),
        backstory: backstory.to_string(),
        tools: Vec::new(),
        max_iter,
        allow_delegation,
    }
}

fn task(agent_role: &str, description: String, expected_output: &str) -> TaskPrompt {
    TaskPrompt {
        description,
        expected_output: expected_output.to_string(),
        agent_role: agent_role.to_string(),
    }
}

const SUPERVISOR: &str = "Project Supervisor";
const DEVELOPER: &str = "Software Developer";
const TESTER: &str = "Software Tester";

fn dev_team_agents() -> Vec<AgentProfile> {
    vec![
        agent(
            SUPERVISOR,
            "Take project requirements and break them down into clear, actionable tasks for the development team",
            "You are an experienced project supervisor who specializes in understanding project \
             requirements and scope, breaking complex projects into manageable tasks, writing clear \
             task specifications for developers and making high-level architectural decisions. \
             You focus on the big picture and delegate coding tasks to developers and testing tasks \
             to testers. You use time tracking and project organization tools to stay organized.",
            Some(3),
            true,
        ),
        agent(
            DEVELOPER,
            "Implement code solutions based on task specifications from the supervisor",
            "You are a skilled software developer who writes clean, efficient code from \
             specifications, uses terminal commands for development tasks and manages files and \
             project structure. You focus only on the implementation work assigned to you: project \
             decisions belong to the supervisor and extensive testing belongs to the tester. You use \
             filesystem and terminal tools to write and manage code.",
            Some(5),
            false,
        ),
        agent(
            TESTER,
            "Test code implementations and report issues back to the team",
            "You are a meticulous software tester who runs code, identifies bugs, verifies that code \
             meets requirements, designs test cases and documents results. You do not write \
             production code and you do not make project decisions. You use terminal and filesystem \
             tools to run tests and analyze results.",
            Some(4),
            false,
        ),
    ]
}

fn dev_team_tasks(requirement: &str) -> Vec<TaskPrompt> {
    vec![
        task(
            SUPERVISOR,
            format!(
                "Project Requirement: {requirement}\n\n\
                 As the Project Supervisor, analyze this requirement and:\n\
                 1. Create a project plan with clear phases\n\
                 2. Break down the requirement into specific, actionable tasks\n\
                 3. Create a project structure (directories and files needed)\n\
                 4. Write a detailed specification document for the developer\n\
                 5. Define testing criteria for the tester\n\n\
                 Save your analysis to 'project_plan.txt' and create the basic project structure.\n\
                 Focus on high-level planning, not implementation details."
            ),
            "Project plan with task breakdown and project structure created",
        ),
        task(
            DEVELOPER,
            "Based on the project plan and specifications created by the supervisor:\n\
             1. Read the project_plan.txt file to understand requirements\n\
             2. Implement the code according to specifications\n\
             3. Create necessary files and code structure\n\
             4. Write clean, functional code that meets the requirements\n\
             5. Document your implementation approach\n\n\
             Focus only on coding and implementation. Don't make architectural decisions.\n\
             Save your implementation and create a 'development_log.txt' with your progress."
                .to_string(),
            "Code implementation completed with documentation",
        ),
        task(
            TESTER,
            "Based on the project plan and the developer's implementation:\n\
             1. Read the project_plan.txt to understand testing criteria\n\
             2. Examine the code implementation\n\
             3. Run tests to verify functionality\n\
             4. Test edge cases and error conditions\n\
             5. Create a comprehensive test report\n\n\
             Focus only on testing and quality assurance. Don't modify the code.\n\
             Save your findings to 'test_report.txt' with detailed results."
                .to_string(),
            "Comprehensive test report with results and recommendations",
        ),
    ]
}

const RESEARCHER: &str = "Research Specialist";
const ANALYST: &str = "Data Analyst";
const WRITER: &str = "Technical Writer";

fn research_agents() -> Vec<AgentProfile> {
    vec![
        agent(
            RESEARCHER,
            "Gather information and provide comprehensive research on given topics",
            "You are an expert researcher with access to web search, file operations and \
             calculation tools. You excel at finding relevant information and presenting it clearly.",
            None,
            false,
        ),
        agent(
            ANALYST,
            "Analyze information and provide insights with supporting calculations",
            "You are a skilled data analyst who processes information, performs calculations and \
             creates reports. You are detail-oriented and provide actionable insights.",
            None,
            false,
        ),
        agent(
            WRITER,
            "Create well-structured documents and reports",
            "You are an experienced technical writer who creates clear, comprehensive reports and \
             documentation. You save your work to files and organize information effectively.",
            None,
            false,
        ),
    ]
}

fn research_tasks(topic: &str) -> Vec<TaskPrompt> {
    vec![
        task(
            RESEARCHER,
            format!("Search for information about {topic}"),
            "Research findings about the topic",
        ),
        task(
            ANALYST,
            "Analyze the research findings and calculate:\n\
             1. If the market grows 25% annually, what would be the growth over 5 years?\n\
             2. Current timestamp for the analysis"
                .to_string(),
            "Analysis with calculations and timestamps",
        ),
        task(
            WRITER,
            "Create a comprehensive report combining the research and analysis.\n\
             Save the final report to 'ai_trends_report.txt'."
                .to_string(),
            "A complete report saved to file",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dev_team_runs_supervisor_then_developer_then_tester() {
        let plan = Workflow::DevTeam.plan("Build a todo list manager");
        let roles: Vec<&str> = plan.tasks.iter().map(|t| t.agent_role.as_str()).collect();
        assert_eq!(roles, vec![SUPERVISOR, DEVELOPER, TESTER]);
        assert!(plan.tasks[0].description.contains("Build a todo list manager"));
        assert!(plan.unassigned_tasks().is_empty());
    }

    #[test]
    fn dev_team_limits_match_roles() {
        let plan = Workflow::DevTeam.plan("x");
        let supervisor = plan.agent(SUPERVISOR).unwrap();
        assert_eq!(supervisor.max_iter, Some(3));
        assert!(supervisor.allow_delegation);
        assert_eq!(plan.agent(DEVELOPER).unwrap().max_iter, Some(5));
        assert_eq!(plan.agent(TESTER).unwrap().max_iter, Some(4));
        assert!(!plan.agent(TESTER).unwrap().allow_delegation);
        assert_eq!(
            plan.artifacts,
            vec!["project_plan.txt", "development_log.txt", "test_report.txt"]
        );
    }

    #[test]
    fn research_crew_writes_one_report() {
        let plan = Workflow::Research.plan("quantum sensors");
        assert_eq!(plan.agents.len(), 3);
        assert!(plan.tasks[0].description.ends_with("quantum sensors"));
        assert!(plan.tasks[2].description.contains("ai_trends_report.txt"));
        assert_eq!(Workflow::Research.tool_variants(), &[Variant::Sample]);
        assert!(plan.unassigned_tasks().is_empty());
    }

    #[test]
    fn picks_sample_projects_by_number() {
        assert_eq!(pick_requirement("2").as_deref(), Some(SAMPLE_PROJECTS[1]));
        assert_eq!(pick_requirement(" 5 ").as_deref(), Some(SAMPLE_PROJECTS[4]));
        assert_eq!(pick_requirement("6").as_deref(), Some("6"));
        assert_eq!(pick_requirement("a chess clock").as_deref(), Some("a chess clock"));
        assert_eq!(pick_requirement("   "), None);
    }
}
