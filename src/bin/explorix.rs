use std::time::Duration;

use clap::Parser;
use explorix::{
    cli::ExplorixCLI, copy::CopyOptions, history::HistoryLog, repl::Repl, system::LocalSystem,
};
use miette::{IntoDiagnostic, Result};

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = ExplorixCLI::parse();

    let options = CopyOptions {
        chunk_size: cli.chunk_size,
        pacing: (cli.pace_ms > 0).then(|| Duration::from_millis(cli.pace_ms)),
    };

    let current_dir = std::env::current_dir().into_diagnostic()?;
    let system = LocalSystem::new(current_dir, options);
    let history = HistoryLog::new(cli.history_file);

    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    let mut repl = Repl::new(stdin.lock(), stdout.lock(), system, history)
        .with_bar_width(cli.bar_width);

    repl.run()
}
