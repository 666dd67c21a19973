use anyhow::{Context, Result};
use ngsi_map::config::resolve_config;
use ngsi_map::view::{FixedLocation, NoGeolocation};
use ngsi_map::{Geolocator, MapSession, MapSurface, MemorySurface, TimeWindow, TypeSelection};
use ngsi_poller::console::HELP;
use ngsi_poller::{
    load_catalogue, ConsoleCommand, EntitySource, FetchError, FixtureSource, NgsiClient, PollOutcome,
    PollerHandle, PollingController,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ngsi_poller=info,ngsi_map=info".into()),
        )
        .init();

    info!("NGSI-LD poller starting...");

    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = resolve_config(config_path.as_deref()).context("Failed to load configuration")?;

    info!(
        base_url = config.ngsi.base_url.as_deref().unwrap_or("<none>"),
        fixture = config.ngsi.uses_fixture(),
        interval_secs = config.polling.interval_seconds,
        limit = config.ngsi.limit,
        "Configuration loaded"
    );

    let source: Arc<dyn EntitySource> = if config.ngsi.uses_fixture() {
        info!("No broker configured, serving built-in fixture");
        Arc::new(FixtureSource::new())
    } else {
        Arc::new(NgsiClient::from_config(&config.ngsi).context("Failed to create NGSI-LD client")?)
    };

    let mut session = MapSession::new(&config, MemorySurface::new());

    let geolocator: Box<dyn Geolocator> = match config.view.fixed_location() {
        Some(position) => Box::new(FixedLocation(position)),
        None => Box::new(NoGeolocation),
    };
    let view_state = session.establish_initial_view(geolocator.as_ref()).await;
    info!(state = ?view_state, "Initial view established");

    let active = load_catalogue(&mut session, source.as_ref()).await;

    let (poller, mut outcomes, task) = PollingController::new(
        Arc::clone(&source),
        config.polling.interval(),
        config.ngsi.limit,
    )
    .with_types(active)
    .start();

    info!("{}", HELP);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            outcome = outcomes.recv() => match outcome {
                Some(outcome) => {
                    apply_outcome(&mut session, outcome);
                    if session.needs_catalogue() {
                        retry_catalogue(&mut session, &poller, source.as_ref()).await?;
                    }
                }
                None => break,
            },
            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(line)) => {
                    let quit = handle_line(&line, &mut session, &poller, source.as_ref()).await?;
                    if quit {
                        break;
                    }
                }
                Ok(None) => {
                    debug!("Console closed");
                    stdin_open = false;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to read console, ignoring further input");
                    stdin_open = false;
                }
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Received ctrl-c, shutting down");
                break;
            }
        }
    }

    if poller.shutdown().is_ok() {
        task.await.context("Poller task failed")?;
    }
    info!("NGSI-LD poller stopped");
    Ok(())
}

fn apply_outcome(session: &mut MapSession, outcome: PollOutcome) {
    match outcome.result {
        Ok(entities) => {
            let summary = session.apply_entities(&entities);
            for layer in session.layers().iter() {
                info!(
                    entity_type = %layer.entity_type,
                    color = %layer.color,
                    shapes = layer.shapes.len(),
                    visible = session.surface().is_attached(layer.id),
                    "Layer"
                );
            }
            info!(
                generation = outcome.generation,
                status = ?session.status(),
                created = ?summary.created,
                removed = ?summary.removed,
                view = ?session.view_state(),
                "Map updated"
            );
        }
        Err(FetchError::Cancelled) => {
            debug!(generation = outcome.generation, "Cycle cancelled");
        }
        Err(e) => session.apply_fetch_error(&e),
    }
}

/// Reload a missing or failed catalogue after a cycle; a successful reload
/// hands the new active types to the poller, which starts a fresh cycle.
async fn retry_catalogue(
    session: &mut MapSession,
    poller: &PollerHandle,
    source: &dyn EntitySource,
) -> Result<()> {
    let active = load_catalogue(session, source).await;
    if !session.needs_catalogue() {
        info!(active = active.len(), "Type catalogue recovered");
        poller.set_types(active)?;
    }
    Ok(())
}

/// Run one console line. Returns true when the operator asked to quit.
async fn handle_line(
    line: &str,
    session: &mut MapSession,
    poller: &PollerHandle,
    source: &dyn EntitySource,
) -> Result<bool> {
    let command = match ConsoleCommand::parse(line) {
        Ok(Some(command)) => command,
        Ok(None) => return Ok(false),
        Err(e) => {
            warn!(error = %e, "{}", HELP);
            return Ok(false);
        }
    };

    match command {
        ConsoleCommand::Pause => poller.pause()?,
        ConsoleCommand::Resume => poller.resume()?,
        ConsoleCommand::Refresh => {
            let active = load_catalogue(session, source).await;
            poller.set_types(active)?;
            poller.refresh()?;
        }
        ConsoleCommand::Recenter => {
            if !session.recenter() {
                info!("Nothing to recenter on yet");
            }
        }
        ConsoleCommand::SelectType(name) => {
            let active = session.set_selection(TypeSelection::parse(&name));
            if active.is_empty() {
                warn!(selection = %name, "Type not in catalogue");
            }
            poller.set_types(active)?;
        }
        ConsoleCommand::Window { start, end } => {
            let window = TimeWindow::new(start, end);
            let summary = session.set_time_window(window);
            info!(
                start = window.start(),
                end = window.end(),
                rendered = summary.rendered,
                "Time window applied"
            );
        }
        ConsoleCommand::ClearWindow => {
            let summary = session.clear_time_window();
            info!(rendered = summary.rendered, "Time window cleared");
        }
        ConsoleCommand::Status => {
            let status = poller.status();
            let status = status.lock().await;
            info!(
                session = ?session.status(),
                view = ?session.view_state(),
                selection = %session.selection(),
                range = ?session.observed_range(),
                paused = status.paused,
                polls = status.poll_count,
                errors = status.error_count,
                last_error = ?status.last_error,
                "Status"
            );
        }
        ConsoleCommand::Quit => return Ok(true),
    }
    Ok(false)
}
