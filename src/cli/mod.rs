use clap::{Parser, Subcommand};
use rmcp::model::CallToolResult;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use crate::infra::boot::run_server;
use crate::infra::config::{Config, Transport};
use crate::infra::http::headers::add_standard_headers;
use crate::infra::runtime::limits::make_http_client_with;
use crate::tools::{build_registry, Variant};
use crate::workflow::discovery::{self, ToolSession};
use crate::workflow::{self, CommandEngine, CrewEngine, CrewOptions, DryRunEngine, Workflow};

#[derive(Parser)]
#[command(name = "crew-mcp")]
#[command(about = "MCP tool servers for agent crews, and a crew workflow runner")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a tool server over stdio or streamable HTTP
    Serve {
        /// Tool set to expose
        #[arg(short, long, value_enum)]
        variant: Option<Variant>,
        /// Transport (overrides MODE)
        #[arg(short, long, value_enum)]
        mode: Option<Transport>,
        /// HTTP port in server mode (overrides PORT)
        #[arg(short, long)]
        port: Option<u16>,
        /// Workspace directory for file tools (overrides TOOLS_ROOT)
        #[arg(long)]
        root: Option<PathBuf>,
    },
    /// List the tools a variant exposes
    Tools {
        #[arg(short, long, value_enum, default_value_t = Variant::Simple)]
        variant: Variant,
        /// Print descriptors as JSON
        #[arg(long)]
        json: bool,
    },
    /// Run a crew workflow
    Crew {
        #[arg(short, long, value_enum, default_value_t = Workflow::DevTeam)]
        workflow: Workflow,
        /// Print the plan instead of running the engine
        #[arg(long)]
        dry_run: bool,
        /// Do not launch tool servers; agents get no tools
        #[arg(long)]
        skip_discovery: bool,
        /// Also write the final result to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Project requirement; prompted for when omitted
        #[arg(trailing_var_arg = true)]
        requirement: Vec<String>,
    },
    /// Start the dev-team tool servers and verify their tools
    Check,
    /// Show environment and setup status
    Status,
    /// Health check an HTTP-mode server
    Health {
        /// Service URL to check
        #[arg(short, long, default_value = "http://localhost:8080")]
        url: String,
    },
    /// Show or validate configuration
    Config {
        /// Validate only, do not print the effective configuration
        #[arg(long)]
        validate: bool,
    },
}

pub async fn run() -> ExitCode {
    let cli = Cli::parse();

    run_commands(cli.command).await
}

pub async fn run_commands(command: Commands) -> ExitCode {
    match command {
        Commands::Serve {
            variant,
            mode,
            port,
            root,
        } => match serve(variant, mode, port, root).await {
            Ok(_) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("❌ Server failed: {:#}", e);
                ExitCode::FAILURE
            }
        },
        Commands::Tools { variant, json } => match list_tools(variant, json) {
            Ok(_) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("❌ Cannot list tools: {:#}", e);
                ExitCode::FAILURE
            }
        },
        Commands::Crew {
            workflow,
            dry_run,
            skip_discovery,
            output,
            requirement,
        } => match crew(workflow, dry_run, skip_discovery, output, requirement).await {
            Ok(_) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("❌ Failed to run project: {:#}", e);
                ExitCode::FAILURE
            }
        },
        Commands::Check => match check_servers().await {
            Ok(true) => ExitCode::SUCCESS,
            Ok(false) => ExitCode::FAILURE,
            Err(e) => {
                eprintln!("❌ Check failed: {:#}", e);
                ExitCode::FAILURE
            }
        },
        Commands::Status => match show_status() {
            Ok(_) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("❌ Status check failed: {:#}", e);
                ExitCode::FAILURE
            }
        },
        Commands::Health { url } => match health_check(&url).await {
            Ok(_) => {
                println!("✅ Service is healthy");
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("❌ Health check failed: {:#}", e);
                ExitCode::FAILURE
            }
        },
        Commands::Config { validate } => match show_config(validate) {
            Ok(_) => {
                println!("✅ Configuration is valid");
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("❌ Configuration validation failed: {:#}", e);
                ExitCode::FAILURE
            }
        },
    }
}

async fn serve(
    variant: Option<Variant>,
    mode: Option<Transport>,
    port: Option<u16>,
    root: Option<PathBuf>,
) -> anyhow::Result<()> {
    let mut cfg = Config::load()?;
    if let Some(variant) = variant {
        cfg.tools_variant = variant.as_str().to_string();
    }
    if let Some(mode) = mode {
        cfg.mode = match mode {
            Transport::Stdio => "stdio",
            Transport::Server => "server",
        }
        .to_string();
    }
    if let Some(port) = port {
        cfg.port = port;
    }
    if let Some(root) = root {
        cfg.tools_root = Some(root);
    }
    run_server(&cfg).await
}

fn list_tools(variant: Variant, json: bool) -> anyhow::Result<()> {
    let cfg = Config::load()?;
    let registry = build_registry(variant, &cfg.tool_settings())?;
    let tools = registry.list();

    if json {
        println!("{}", serde_json::to_string_pretty(&tools)?);
        return Ok(());
    }

    println!("🛠️ {} ({} tools)", variant.server_name(), tools.len());
    for (i, tool) in tools.iter().enumerate() {
        println!("  {}. {}: {}", i + 1, tool.name, tool.description);
        let required = tool.required_arguments();
        if !required.is_empty() {
            println!("     required: {}", required.join(", "));
        }
    }
    Ok(())
}

async fn read_requirement(workflow: Workflow, words: Vec<String>) -> anyhow::Result<String> {
    let given = words.join(" ");
    if !given.trim().is_empty() {
        return Ok(given.trim().to_string());
    }
    if !workflow.takes_requirement() {
        return Ok(workflow.default_requirement().to_string());
    }
    let picked = tokio::task::spawn_blocking(|| {
        workflow::prompt_requirement(std::io::stdin().lock(), std::io::stdout())
    })
    .await??;
    Ok(picked)
}

async fn crew(
    workflow: Workflow,
    dry_run: bool,
    skip_discovery: bool,
    output: Option<PathBuf>,
    words: Vec<String>,
) -> anyhow::Result<()> {
    let cfg = Config::load()?;
    cfg.validate()?;

    // fail on a missing key or engine before any server is launched
    let engine: Box<dyn CrewEngine> = if dry_run {
        Box::new(DryRunEngine)
    } else {
        Box::new(CommandEngine::from_config(&cfg)?)
    };

    println!("🏗️ {}", workflow.title());
    let requirement = read_requirement(workflow, words).await?;
    println!("🚀 Starting: {}", requirement);

    let server_command = if skip_discovery {
        None
    } else {
        println!("🔧 Setting up MCP servers...");
        Some(discovery::self_command()?)
    };
    let opts = CrewOptions {
        workflow,
        requirement,
        server_command,
        artifact_dir: cfg.tool_settings().root,
        output,
    };

    let plan_preview = workflow.plan(&opts.requirement);
    println!("\n📋 Executing {} workflow...", workflow);
    for (i, task) in plan_preview.tasks.iter().enumerate() {
        println!("   {}. {}", i + 1, task.agent_role);
    }

    let run = workflow::run_crew(&opts, engine.as_ref()).await?;
    for server in &run.plan.tool_servers {
        println!("   ✅ {}: {} tools", server.name, server.tools.len());
    }

    if dry_run {
        println!("\n{}", run.result);
    } else {
        println!("\n✅ Project Completed!\n\nFinal Result:\n{}", run.result);
    }

    println!("\n📁 Project Artifacts:");
    for artifact in &run.artifacts {
        println!("   {}", artifact.render());
    }
    if let Some(path) = &opts.output {
        println!("\n💾 Result saved to {}", path.display());
    }
    Ok(())
}

fn expected_tools(variant: Variant) -> &'static [&'static str] {
    match variant {
        Variant::Terminal => &["execute_command", "list_directory", "check_command_exists", "get_environment_variable"],
        Variant::Filesystem => &["read_file", "write_file", "create_directory", "list_files"],
        Variant::Simple => &["get_current_time", "calculate"],
        Variant::Sample => &["web_search", "calculate"],
    }
}

/// Returns whether every server answered with every expected tool.
async fn check_servers() -> anyhow::Result<bool> {
    println!("🧪 Testing MCP Servers for the Development Team");
    let command = discovery::self_command()?;
    let mut all_ok = true;
    let mut total = 0;

    for &variant in Workflow::DevTeam.tool_variants() {
        let server = discovery::tool_server(variant, command.clone());
        println!("\n🔧 Testing {}...", server.name);

        let session = match ToolSession::open(&server).await {
            Ok(session) => session,
            Err(e) => {
                println!("   ❌ Connection failed: {}", e);
                all_ok = false;
                continue;
            }
        };
        let ok = check_session(&session, variant).await;
        session.close().await;
        match ok {
            Ok((count, ok)) => {
                total += count;
                all_ok &= ok;
            }
            Err(e) => {
                println!("   ❌ {}", e);
                all_ok = false;
            }
        }
    }

    println!("\n📋 Test Summary:");
    println!("   Total MCP tools available: {}", total);
    if all_ok {
        println!("   ✅ All MCP servers working correctly!");
    } else {
        println!("   ❌ Some MCP servers have issues");
    }
    Ok(all_ok)
}

async fn check_session(session: &ToolSession, variant: Variant) -> anyhow::Result<(usize, bool)> {
    let tools = session.list_tools().await?;
    println!("   ✅ Connected, {} tools", tools.len());
    let names: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();

    let mut ok = true;
    for expected in expected_tools(variant) {
        if names.contains(expected) {
            println!("      ✅ {}", expected);
        } else {
            println!("      ❌ {} (missing)", expected);
            ok = false;
        }
    }

    if names.contains(&"calculate") {
        let mut args = serde_json::Map::new();
        args.insert("expression".into(), serde_json::json!("2+2"));
        let result = session.call_tool("calculate", args).await?;
        let text = result_text(&result);
        if result.is_error != Some(true) && text.contains('4') {
            println!("      ✅ calculate(2+2): {}", text);
        } else {
            println!("      ❌ calculate(2+2): {}", text);
            ok = false;
        }
    }
    Ok((tools.len(), ok))
}

/// Concatenated text blocks of a tool result; rmcp leaves `content` unset
/// when a server sends none.
fn result_text(result: &CallToolResult) -> String {
    result
        .content
        .iter()
        .flatten()
        .filter_map(|c| c.as_text().map(|t| t.text.clone()))
        .collect()
}

fn mark(ok: bool) -> &'static str {
    if ok {
        "✅"
    } else {
        "❌"
    }
}

fn show_status() -> anyhow::Result<()> {
    let cfg = Config::load()?;
    println!("🎯 crew-mcp status");
    println!("{}", "=".repeat(40));

    println!("\n✅ ENVIRONMENT");
    let has_key = cfg.api_key().is_some();
    println!(
        "{} OpenAI API key: {}",
        mark(has_key),
        if has_key { "CONFIGURED" } else { "MISSING" }
    );
    let engine = match cfg.crew_engine_cmd.as_deref() {
        None => {
            println!("⚠️  Crew engine: NOT CONFIGURED (set CREW_ENGINE_CMD)");
            false
        }
        Some(cmd) => {
            let program = cmd.split_whitespace().next().unwrap_or_default();
            match which::which(program) {
                Ok(path) => {
                    println!("✅ Crew engine: {}", path.display());
                    true
                }
                Err(_) => {
                    println!("❌ Crew engine: '{}' not found in PATH", program);
                    false
                }
            }
        }
    };
    let shell = if cfg!(windows) { "cmd" } else { "sh" };
    let has_shell = which::which(shell).is_ok();
    println!("{} Shell ({}): {}", mark(has_shell), shell, if has_shell { "AVAILABLE" } else { "MISSING" });

    println!("\n🔧 TOOL SERVERS");
    let settings = cfg.tool_settings();
    let mut servers_ok = true;
    for variant in Variant::ALL {
        match build_registry(variant, &settings) {
            Ok(registry) => println!("✅ {}: {} tools", variant.server_name(), registry.len()),
            Err(e) => {
                servers_ok = false;
                println!("❌ {}: {}", variant.server_name(), e);
            }
        }
    }

    println!("\n📁 CONFIGURATION");
    match &cfg.source {
        Some(path) => println!("✅ Config file: {}", path.display()),
        None => println!("⚠️  Config file: none (environment and defaults)"),
    }
    println!("  Mode: {}", cfg.mode);
    println!("  Port: {}", cfg.port);
    println!("  Workspace: {}", settings.root.display());
    let valid = cfg.validate();
    if let Err(e) = &valid {
        println!("❌ {}", e);
    }

    println!("\n🎯 OVERALL STATUS");
    if has_key && engine && has_shell && servers_ok && valid.is_ok() {
        println!("🎉 FULLY READY");
        println!("   Run: crew-mcp crew");
    } else if servers_ok && has_shell && valid.is_ok() {
        println!("✅ TOOL SERVERS READY");
        println!("   Configure OPENAI_API_KEY and CREW_ENGINE_CMD to run crews");
    } else {
        println!("❌ NEEDS SETUP");
    }
    Ok(())
}

async fn health_check(url: &str) -> anyhow::Result<()> {
    let client = make_http_client_with(Duration::from_secs(2))?;
    let (request, request_id) =
        add_standard_headers(client.get(format!("{}/healthz", url.trim_end_matches('/'))), None);
    tracing::debug!(%url, %request_id, "health check");
    let response = request.send().await?;

    if response.status().is_success() {
        Ok(())
    } else {
        anyhow::bail!("HTTP {}", response.status())
    }
}

fn show_config(validate_only: bool) -> anyhow::Result<()> {
    let cfg = Config::load()?;
    cfg.validate()?;
    if !validate_only {
        if let Some(path) = &cfg.source {
            println!("# loaded from {}", path.display());
        }
        println!("{}", toml::to_string(&cfg)?);
    }
    Ok(())
}
