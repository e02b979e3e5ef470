use std::path::PathBuf;

use super::error::ToolError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum CliAction {
    Help,
    Run(CliArgs),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct CliArgs {
    pub(crate) scene: PathBuf,
    pub(crate) config: Option<PathBuf>,
    pub(crate) out: Option<PathBuf>,
    pub(crate) script: Option<PathBuf>,
    /// One command per argument, run after the script.
    pub(crate) commands: Vec<String>,
}

pub(crate) fn parse_args(args: &[String]) -> Result<CliAction, ToolError> {
    let Some(first) = args.first() else {
        return Err(ToolError::Usage(usage_text()));
    };
    if first == "-h" || first == "--help" {
        return Ok(CliAction::Help);
    }

    let mut parsed = CliArgs::default();
    let mut scene = None;
    let mut index = 0usize;
    while index < args.len() {
        let arg = args[index].as_str();
        match arg {
            "--config" | "--out" | "--script" => {
                let value = args
                    .get(index + 1)
                    .map(PathBuf::from)
                    .ok_or_else(|| ToolError::Usage(format!("missing value for {arg}")))?;
                match arg {
                    "--config" => parsed.config = Some(value),
                    "--out" => parsed.out = Some(value),
                    _ => parsed.script = Some(value),
                }
                index += 2;
            }
            flag if flag.starts_with("--") => {
                return Err(ToolError::Usage(format!("unknown option '{flag}'")));
            }
            _ if scene.is_none() => {
                scene = Some(PathBuf::from(arg));
                index += 1;
            }
            command => {
                parsed.commands.push(command.to_string());
                index += 1;
            }
        }
    }

    parsed.scene = scene.ok_or_else(|| ToolError::Usage("missing scene path".to_string()))?;
    Ok(CliAction::Run(parsed))
}

/// Script lines, skipping blanks and `#` comments.
pub(crate) fn parse_script_commands(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(ToString::to_string)
        .collect()
}

pub(crate) fn usage_text() -> String {
    [
        "link_tool - keep scene instances in sync with their linked roots",
        "",
        "Usage:",
        "  link_tool <scene.json> [--config <file>] [--out <file>] [--script <file>] [command ...]",
        "",
        "Commands (quote each one):",
        "  revert <id>            queue a revert of one node",
        "  revert-hierarchy <id>  queue a revert including linked descendants",
        "  revert-instances <id>  queue a revert of every instance of a root",
        "  apply <id>             queue an apply of one node",
        "  apply-all <id>         queue an apply including linked descendants",
        "  create-root <id>       queue creation of a new linked root",
        "  adopt-root <root> <id> queue wiring a copied root to its instance",
        "  link-by-name <id>...   link nodes to same-named asset roots",
        "  registry               print root -> instances",
        "  dirty <id>             check a node against its root",
        "  tick                   run queued requests",
        "",
        "Queued requests left at the end run in a final tick. The scene is",
        "written back (or to --out) when anything changed.",
    ]
    .join("\n")
}
