//! Binary entry point: reads configuration, warm-starts the plant, and
//! runs the gateway and simulation driver concurrently until a shutdown
//! signal arrives (§6, §7, §9 ambient stack).

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use log::{error, info, warn};
use parking_lot::Mutex;
use plant_twin::gateway::{Gateway, RegisterBank};
use plant_twin::params::{DamageParams, Parameters};
use plant_twin::plant::Plant;
use plant_twin::{config::Config, driver, error::TwinError};

/// In-flight client handlers get this long to finish after the gateway's
/// listening socket is closed (§5: "a short grace window").
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(target: "plant-twin", "{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), TwinError> {
    let config = Config::from_env()?;
    info!(
        target: "plant-twin",
        "starting: bind={} port={} dt={}ms warmup_steps={}",
        config.bind, config.port, config.dt_ms, config.warmup_steps,
    );

    let params = Parameters::default();
    let damage_params = DamageParams::default();

    let plant = Arc::new(Plant::new(params, damage_params));
    plant.warm_start(config.warmup_steps, config.dt_seconds());
    info!(target: "plant-twin", "warm start complete, t={:.0}s", plant.snapshot().time_s);

    let bank = Arc::new(Mutex::new(RegisterBank::new(&params)));
    let gateway = Gateway::new(bank.clone());
    let addr = std::net::SocketAddr::new(config.bind, config.port);

    // Bind ahead of spawning anything: a port-in-use failure must surface
    // here and propagate out of `run()` as a fatal `TwinError::Bind`, not
    // be discovered only after `wait_for_shutdown_signal()` returns (§6,
    // §7: "port in use" is a configuration error, fatal at startup).
    let listener = Gateway::bind(addr).await?;

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

    let gateway_task = tokio::spawn(gateway.serve(listener));
    let driver_task = tokio::spawn(driver::run(
        plant.clone(),
        bank.clone(),
        Duration::from_millis(config.dt_ms),
        shutdown_rx,
    ));

    wait_for_shutdown_signal().await;
    info!(target: "plant-twin", "shutdown signal received, stopping driver");
    let _ = shutdown_tx.send(true);

    if let Err(e) = driver_task.await {
        warn!(target: "plant-twin", "driver task join error: {e}");
    }

    info!(target: "plant-twin", "waiting up to {:?} for in-flight gateway sessions", SHUTDOWN_GRACE);
    tokio::select! {
        result = gateway_task => match result {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(target: "plant-twin", "gateway exited with error: {e}"),
            Err(e) => warn!(target: "plant-twin", "gateway task join error: {e}"),
        },
        _ = tokio::time::sleep(SHUTDOWN_GRACE) => {
            warn!(target: "plant-twin", "grace window elapsed, dropping remaining gateway sessions");
        }
    }

    Ok(())
}

/// Waits for `SIGINT` (Ctrl-C, all platforms) or, on Unix, `SIGTERM` —
/// matching §5's "driver responds to a shutdown signal at its sleep
/// boundary" and "gateway is shut down by closing its listening socket".
async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
