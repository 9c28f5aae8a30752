use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};

use trellis_catalog::variable_suggestions;
use trellis_config::Workflow;
use trellis_sync::{Draft, ValidatorRegistry};

/// Trellis - configuration layer for the workflow builder
#[derive(Parser)]
#[command(name = "trellis")]
#[command(version, about, long_about = None)]
struct Cli {
  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Print the template-variable suggestions reachable from a node
  Suggest {
    /// Path to the workflow file (JSON)
    workflow_file: PathBuf,

    /// The node ID to compute suggestions for
    #[arg(long)]
    node: String,
  },

  /// Validate a node's current configuration
  Check {
    /// Path to the workflow file (JSON)
    workflow_file: PathBuf,

    /// The node ID to validate
    #[arg(long)]
    node: String,
  },
}

fn main() -> Result<()> {
  let cli = Cli::parse();

  match cli.command {
    Some(Commands::Suggest {
      workflow_file,
      node,
    }) => suggest(&workflow_file, &node),
    Some(Commands::Check {
      workflow_file,
      node,
    }) => check(&workflow_file, &node),
    None => {
      println!("trellis - use --help to see available commands");
      Ok(())
    }
  }
}

fn load_workflow(path: &Path) -> Result<Workflow> {
  let content = std::fs::read_to_string(path)
    .with_context(|| format!("failed to read workflow file: {}", path.display()))?;
  serde_json::from_str(&content)
    .with_context(|| format!("failed to parse workflow file: {}", path.display()))
}

fn suggest(workflow_file: &Path, node: &str) -> Result<()> {
  let workflow = load_workflow(workflow_file)?;
  for suggestion in variable_suggestions(&workflow, node) {
    println!("{}", suggestion);
  }
  Ok(())
}

fn check(workflow_file: &Path, node_id: &str) -> Result<()> {
  let workflow = load_workflow(workflow_file)?;
  let Some(node) = workflow.get_node(node_id) else {
    bail!("node '{}' not found in workflow", node_id);
  };

  let draft = Draft::from_node(node);
  let errors = ValidatorRegistry::new().validate(node.kind, &draft);
  if errors.is_empty() {
    println!("ok");
    return Ok(());
  }

  for (field, message) in &errors {
    eprintln!("{}: {}", field, message);
  }
  bail!("configuration for node '{}' is invalid", node_id);
}
