use std::io::{self, Write};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use ext_authz::config::Arg;
use ext_authz::logs;
use ext_authz::server::{signal, Server};
use log::{debug, error, info};
use sd_notify::NotifyState;

async fn run() -> Result<()> {
    let arg = Arg::parse();
    let cfg = arg.normalize()?;

    logs::init(cfg.level)?;
    debug!("Use config: {:?}", cfg);

    let shutdown = signal::shutdown_signal()?;

    let server = Server::bind(cfg.bind)
        .await
        .context("start gRPC server")?;

    sd_notify::notify(true, &[NotifyState::Ready]).context("notify systemd")?;
    info!("gRPC server ready on port {}", server.local_addr().port());

    server
        .listen_and_serve(shutdown)
        .await
        .context("run gRPC server")?;

    info!("Server exited by user");
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("Fatal: {:#}", err);
            _ = writeln!(io::stderr(), "Fatal: {:#}", err);
            ExitCode::FAILURE
        }
    }
}
