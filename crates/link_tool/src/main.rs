mod app;

use std::io;
use std::process::ExitCode;

use tracing::error;

use app::{init_tracing, parse_args, run, usage_text, CliAction, ToolError};

fn main() -> ExitCode {
    init_tracing();
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    match parse_args(&args).and_then(|action| match action {
        CliAction::Help => {
            println!("{}", usage_text());
            Ok(())
        }
        CliAction::Run(args) => run(args, &mut io::stdout().lock()),
    }) {
        Ok(()) => ExitCode::SUCCESS,
        Err(ToolError::Usage(message)) => {
            eprintln!("{message}");
            ExitCode::from(2)
        }
        Err(err) => {
            error!(error = %err, "link_tool_failed");
            let mut source = std::error::Error::source(&err);
            while let Some(cause) = source {
                error!(cause = %cause, "caused_by");
                source = cause.source();
            }
            ExitCode::from(1)
        }
    }
}
