//! codexline installer CLI entrypoint.
//!
//! Downloads the prebuilt codexline binary for this host, verifies it, and
//! installs it. Unsupported platforms and explicit skips exit successfully so
//! automated setups keep working.

use clap::Parser;
use codexline_installer::cli::Cli;
use codexline_installer::config::{EnvSettings, InstallConfig, skip_requested_by};
use codexline_installer::dirs::SystemBaseDirs;
use codexline_installer::error::{InstallerError, Result};
use codexline_installer::install::{InstallOutcome, run_install};
use codexline_installer::output::{failure_message, write_stderr_line};
use std::io::Write;

fn main() {
    let cli = Cli::parse();
    env_logger::Builder::new()
        .filter_level(cli.log_level())
        .parse_default_env()
        .init();

    let mut stderr = std::io::stderr();
    let run_result = run(&cli, &mut stderr);
    let exit_code = exit_code_for_run_result(run_result, &mut stderr);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

fn run(cli: &Cli, stderr: &mut dyn Write) -> Result<InstallOutcome> {
    // Skipping must not depend on anything else resolving.
    if skip_requested_by(cli, |name| std::env::var(name).ok())? {
        if !cli.quiet {
            write_stderr_line(stderr, "codexline download skipped");
        }
        return Ok(InstallOutcome::Skipped);
    }

    let env = EnvSettings::from_env()?;
    let config = InstallConfig::resolve(cli, &env, &SystemBaseDirs)?;
    log::debug!("resolved install configuration: {config:?}");
    run_install(&config, stderr)
}

fn exit_code_for_run_result(result: Result<InstallOutcome>, stderr: &mut dyn Write) -> i32 {
    match result {
        Ok(_) => 0,
        Err(err) => {
            report_failure(&err, stderr);
            1
        }
    }
}

fn report_failure(err: &InstallerError, stderr: &mut dyn Write) {
    write_stderr_line(stderr, failure_message(err.stage(), err));
}
