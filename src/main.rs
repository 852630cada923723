use eyre::{Result, WrapErr};
use std::process::ExitCode;
use std::time::Instant;

use scan_gate::{Config, HttpTransport, Orchestrator, cli, pretty};

const EXIT_FAILURE: u8 = 1;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(e) => {
            log::error!("[main] fatal: error={:#}", e);
            eprintln!("Error: {:?}", e);
            ExitCode::from(EXIT_FAILURE)
        }
    }
}

async fn run() -> Result<ExitCode> {
    let args = cli::parse();

    // Initialize logging first
    if let Err(e) = scan_gate::init_logging(args.log_file.as_deref()) {
        eprintln!("Warning: Failed to initialize logging: {:#}", e);
    }

    let config = Config::from_cli(&args)?;
    log::info!("[main] starting: config={:?}", config);

    let transport = HttpTransport::new(config.base_url.clone(), &config.api_key, config.request_timeout)
        .wrap_err("Failed to set up the API client")?;
    let orchestrator = Orchestrator::new(&transport, &config);

    if args.list_configs {
        let configs = orchestrator.list_configurations().await?;
        pretty::print_configurations(&configs);
        return Ok(ExitCode::SUCCESS);
    }

    pretty::print_header(&config.scan_config_name, config.app_name.as_deref());
    let started = Instant::now();

    let report = tokio::select! {
        report = orchestrator.run() => report,
        signal = tokio::signal::ctrl_c() => {
            signal.wrap_err("Failed to listen for interrupt")?;
            log::warn!("[main] interrupted: scan_config={}", config.scan_config_name);
            println!("⚠️ Interrupted, the remote scan keeps running");
            return Ok(ExitCode::from(EXIT_FAILURE));
        }
    };

    pretty::print_report(&report, started.elapsed());
    log::info!("[main] exiting: outcome={} exit_code={}", report.outcome, report.exit_code());

    Ok(ExitCode::from(report.exit_code() as u8))
}
