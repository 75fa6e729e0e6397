use std::path::PathBuf;
use std::process::ExitCode;

use quire::Config;
use quire::error::Result;
use quire::markup::Highlighter;

mod flags;

pub const OUTPUT_DIR: &str = "_site";

pub fn main() -> ExitCode {
    let flags = flags::Folio::from_env_or_exit();

    let level = if flags.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    if let Some(jobs) = flags.jobs {
        let pool = quire::rayon::ThreadPoolBuilder::new().num_threads(jobs).build_global();
        if let Err(e) = pool {
            log::warn!("failed to configure {jobs} worker threads: {e}");
        }
    }

    Highlighter::warm_up();

    let start = std::time::Instant::now();
    let result = run(flags);
    log::info!("total time: {}ms", start.elapsed().as_millis());

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Builds the site. Returns `false` if a best-effort build reported failures.
fn run(flags: flags::Folio) -> Result<bool> {
    let mut config = Config::discover(&flags.root)?;
    if flags.best_effort {
        config.fail_fast = false;
    }

    if flags.strict_highlighting {
        config.highlight_unknown_language_as_plain = false;
    }

    let output: PathBuf = flags.output.unwrap_or_else(|| flags.root.join(OUTPUT_DIR));
    let rendering = quire::build(config, &output)?;
    if rendering.is_clean() {
        return Ok(true);
    }

    eprintln!("{} document(s) or layout(s) failed:", rendering.failures.len());
    for failure in &rendering.failures {
        eprintln!("  - {}: {}", failure.subject, failure.kind().map_or("error".into(), |k| k.to_string()));
    }

    Ok(false)
}
