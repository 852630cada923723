use eyre::{Result, WrapErr};
use log::LevelFilter;
use std::fs;
use std::io::Write;
use std::path::Path;

/// Initialize logging to stderr, or to `log_file` when one is given.
///
/// Stdout is reserved for the run transcript, so log lines never go there.
pub fn init_logging(log_file: Option<&Path>) -> Result<()> {
    // Stderr shares the pipeline log with the transcript; keep it quieter.
    let default_level = if log_file.is_some() { LevelFilter::Info } else { LevelFilter::Warn };
    let log_level = level_from_env(std::env::var("RUST_LOG").ok().as_deref(), default_level);

    let mut builder = env_logger::Builder::new();
    builder.filter_level(log_level).format(|buf, record| {
        writeln!(
            buf,
            "{} [{}] {} - {}",
            chrono::Utc::now().format("%Y-%m-%d %H:%M:%S%.3f"),
            record.level(),
            record.target(),
            record.args()
        )
    });

    match log_file {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)
                    .wrap_err_with(|| format!("Failed to create log directory {}", parent.display()))?;
            }
            let file = fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .wrap_err_with(|| format!("Failed to open log file {}", path.display()))?;
            builder.target(env_logger::Target::Pipe(Box::new(file)));
        }
        None => {
            builder.target(env_logger::Target::Stderr);
        }
    }

    builder.try_init().wrap_err("Logger already initialized")?;

    match log_file {
        Some(path) => log::info!("Logging initialized to: {}", path.display()),
        None => log::debug!("Logging initialized to stderr"),
    }
    log::debug!("Log level: {}", log_level);

    Ok(())
}

fn level_from_env(value: Option<&str>, default: LevelFilter) -> LevelFilter {
    value
        .and_then(|v| v.trim().parse::<LevelFilter>().ok())
        .unwrap_or(default)
}
