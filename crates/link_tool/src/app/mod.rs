mod atomic_io;
mod bootstrap;
mod cli;
mod commands;
mod document;
mod error;

use std::fs;
use std::io::Write;

use tracing::info;

pub(crate) use bootstrap::init_tracing;
pub(crate) use cli::{parse_args, usage_text, CliAction};
pub(crate) use error::ToolError;

use cli::{parse_script_commands, CliArgs};
use commands::{Command, Session};
use document::{load_scene, save_scene};

/// Loads the scene, runs script then command-line commands, finishes any
/// queued requests and writes the scene back when it changed.
pub(crate) fn run<W: Write>(args: CliArgs, out: &mut W) -> Result<(), ToolError> {
    let config = bootstrap::load_config(args.config.as_deref())?;
    let graph = load_scene(&args.scene)?;
    let mut session = Session::new(graph, config);

    let mut lines = match &args.script {
        Some(path) => {
            let raw = fs::read_to_string(path).map_err(|source| ToolError::Read {
                path: path.clone(),
                source,
            })?;
            parse_script_commands(&raw)
        }
        None => Vec::new(),
    };
    lines.extend(args.commands.iter().cloned());

    for line in &lines {
        session.execute(Command::parse(line)?, out)?;
    }
    if session.has_pending() {
        session.tick(out)?;
    }

    let destination = args.out.as_ref().unwrap_or(&args.scene);
    if session.changed() || args.out.is_some() {
        save_scene(destination, session.graph())?;
    } else {
        info!(commands = lines.len(), "scene_unchanged");
    }
    Ok(())
}
