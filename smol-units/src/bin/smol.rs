/*
 * Copyright (c) 2024. Govcraft
 *
 * Licensed under either of
 *   * Apache License, Version 2.0 (the "License");
 *     you may not use this file except in compliance with the License.
 *     You may obtain a copy of the License at http://www.apache.org/licenses/LICENSE-2.0
 *   * MIT license: http://opensource.org/licenses/MIT
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the applicable License for the specific language governing permissions and
 * limitations under that License.
 */

//! `smol`: boots a registry with a lifecycle unit and runs until interrupted.

use std::sync::Arc;

use anyhow::Context as _;
use smol_units::prelude::*;
use tracing::{info, warn, Subscriber};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Loads the configuration with `bootstrap` as the active subscriber, so that what loading
/// reports is not lost before [`init_tracing`] has run.
fn load_config_with<S>(bootstrap: S) -> SmolConfig
where
    S: Subscriber + Send + Sync + 'static,
{
    tracing::subscriber::with_default(bootstrap, SmolConfig::load)
}

fn bootstrap_subscriber() -> impl Subscriber + Send + Sync + 'static {
    fmt()
        .compact()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish()
}

fn init_tracing(config: &SmolConfig) -> anyhow::Result<WorkerGuard> {
    std::fs::create_dir_all(&config.tracing.log_directory).with_context(|| {
        format!("could not create log directory {}", config.tracing.log_directory)
    })?;
    let file_appender =
        tracing_appender::rolling::never(&config.tracing.log_directory, &config.tracing.log_file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.tracing.default_filter))
        .context("invalid tracing filter")?;

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_target(true))
        .with(fmt::layer().with_ansi(false).with_writer(non_blocking))
        .try_init()
        .context("failed to install tracing subscriber")?;
    Ok(guard)
}

async fn wait_for_signal() -> anyhow::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut terminate = signal(SignalKind::terminate()).context("failed to listen for SIGTERM")?;
        tokio::select! {
            result = tokio::signal::ctrl_c() => result.context("failed to listen for Ctrl-C")?,
            _ = terminate.recv() => {}
        }
    }
    #[cfg(not(unix))]
    tokio::signal::ctrl_c().await.context("failed to listen for Ctrl-C")?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = load_config_with(bootstrap_subscriber());
    let _guard = init_tracing(&config)?;
    info!("Starting smol...");

    let registry = Registry::with_config(config.clone());
    let lifecycle = Lifecycle::new();
    let lifecycle_ref = registry.register(&config.defaults.lifecycle_unit_name, Arc::new(lifecycle.clone()));
    registry.start().await?;

    lifecycle.add_task_with_token(|token| async move {
        token.cancelled().await;
        info!("Shutting down lifecycle...");
    });

    info!(unit = %lifecycle_ref.name(), state = %lifecycle.state(), "Running; press Ctrl-C to stop");
    wait_for_signal().await?;
    info!("Received shutdown signal");

    match tokio::time::timeout(config.shutdown_timeout(), lifecycle.shutdown()).await {
        Ok(()) => info!(state = %lifecycle.state(), "Lifecycle shut down"),
        Err(_) => warn!(
            timeout_ms = config.timeouts.shutdown_timeout_ms,
            "Lifecycle did not shut down in time"
        ),
    }

    registry.stop();
    if tokio::time::timeout(config.shutdown_timeout(), registry.quiesce()).await.is_err() {
        warn!("In-flight handlers still running at exit");
    }
    info!("Shutdown complete");
    Ok(())
}
