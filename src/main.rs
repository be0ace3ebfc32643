use std::{io, process::ExitCode};

use autoinsert::{Cli, Config, UsageError, report, resolve, run, usage_error};
use chrono::Local;
use clap::Parser;
use console::style;

fn main() -> ExitCode {
    let cli = Cli::parse();
    let cfg = match Config::load() {
        Ok(cfg) => cfg,
        Err(e) => return failed("Invalid configuration.", &e),
    };
    let now = Local::now().naive_local();
    let today = now.date();

    let result = resolve(&cli.args, &cfg, today)
        .map_err(anyhow::Error::from)
        .and_then(|inputs| run(&inputs, &cfg, now, &mut io::stdout().lock()));

    match result {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => match usage_error(&e) {
            Some(usage) => {
                eprintln!("{}", style(usage).red());
                eprintln!();
                // best effort: stdout may already be gone
                let _ = report::print_usage_notes(&mut io::stdout().lock(), &cfg, today);
                ExitCode::from(UsageError::EXIT_CODE)
            }
            None => failed("Failed to read Excel.", &e),
        },
    }
}

fn failed(header: &str, e: &anyhow::Error) -> ExitCode {
    eprintln!("{}", style(header).red().bold());
    eprintln!("{e:#}");
    ExitCode::FAILURE
}
