//! Server shell
//!
//! Binds the listener, accepts connections until a shutdown signal arrives,
//! lets in-flight requests drain and finally destroys every cached servlet
//! and filter instance. Expired sessions are purged in the background while
//! the server runs.

pub mod connection;
pub mod dispatcher;
pub mod listener;
pub mod request_builder;
pub mod signal;

pub use connection::AppState;
pub use dispatcher::Dispatcher;
pub use listener::create_listener;

use crate::config::Config;
use crate::logger;
use crate::servlet::ComponentRegistry;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};

/// Upper bound for in-flight connections to finish after shutdown was requested
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);
const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(50);
/// How often idle sessions are swept from storage
const SESSION_PURGE_INTERVAL: Duration = Duration::from_secs(60);

/// Run the server until SIGTERM / SIGINT
pub async fn run(config: Config, registry: ComponentRegistry) -> Result<(), Box<dyn std::error::Error>> {
    let dispatcher = Dispatcher::from_config(&config, Arc::new(registry)).map_err(|e| e.to_string())?;
    let state = Arc::new(AppState {
        dispatcher,
        max_body_size: config.http.max_body_size,
        temp_dir: config.temp_dir(),
    });

    let addr = config.get_socket_addr()?;
    let listener = create_listener(addr)?;
    logger::log_server_start(&addr, &config);

    let purge_task = spawn_session_purge(Arc::clone(&state), SESSION_PURGE_INTERVAL);
    let active_connections = Arc::new(AtomicUsize::new(0));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let shutdown = signal::shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => {
                        connection::accept_connection(
                            stream,
                            peer_addr,
                            &state,
                            &active_connections,
                            shutdown_rx.clone(),
                        );
                    }
                    Err(e) => logger::log_error(&format!("Failed to accept connection: {e}")),
                }
            }

            signal_name = &mut shutdown => {
                logger::log_shutdown_signal(signal_name);
                break;
            }
        }
    }
    drop(listener);
    purge_task.abort();
    // Idle keep-alive connections close now, busy ones after their response
    let _ = shutdown_tx.send(true);

    let deadline = Instant::now() + DRAIN_TIMEOUT;
    while active_connections.load(Ordering::SeqCst) > 0 && Instant::now() < deadline {
        sleep(DRAIN_POLL_INTERVAL).await;
    }

    let remaining = active_connections.load(Ordering::SeqCst);
    let shutdown_state = Arc::clone(&state);
    if let Err(e) = tokio::task::spawn_blocking(move || shutdown_state.dispatcher.shutdown()).await {
        logger::log_error(&format!("Component shutdown failed: {e}"));
    }
    logger::log_shutdown_complete(remaining);
    Ok(())
}

/// Periodically drop expired sessions on a blocking worker
fn spawn_session_purge(state: Arc<AppState>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        // The first tick completes immediately
        interval.tick().await;
        loop {
            interval.tick().await;
            let purge_state = Arc::clone(&state);
            if let Err(e) =
                tokio::task::spawn_blocking(move || purge_state.dispatcher.purge_expired_sessions()).await
            {
                logger::log_error(&format!("Session purge failed: {e}"));
            }
        }
    })
}
