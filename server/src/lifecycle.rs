//! Port discovery, the stdout announcement contract, and shutdown
//! signals.
//!
//! The server binds loopback only. Discovery order: the preferred
//! port, then a scan of the configured range, then an OS-assigned
//! port. The winning listener is kept (rebinding after a probe would
//! race other processes).

use std::io::Write;
use std::net::Ipv4Addr;

use tokio::net::TcpListener;

pub const DEFAULT_PREFERRED_PORT: u16 = 39283;
pub const DEFAULT_PORT_RANGE_END: u16 = 39383;

#[derive(Debug, Clone, Copy)]
pub struct PortConfig {
    pub preferred: u16,
    pub range_start: u16,
    pub range_end: u16,
}

impl Default for PortConfig {
    fn default() -> Self {
        Self {
            preferred: DEFAULT_PREFERRED_PORT,
            range_start: DEFAULT_PREFERRED_PORT,
            range_end: DEFAULT_PORT_RANGE_END,
        }
    }
}

/// Bind a loopback listener per the discovery order.
pub async fn bind_listener(ports: PortConfig) -> anyhow::Result<TcpListener> {
    match TcpListener::bind((Ipv4Addr::LOCALHOST, ports.preferred)).await {
        Ok(listener) => return Ok(listener),
        Err(e) => {
            tracing::info!(
                port = ports.preferred,
                error = %e,
                "Preferred port unavailable, scanning range"
            );
        }
    }

    for port in ports.range_start..=ports.range_end {
        if port == ports.preferred {
            continue;
        }
        if let Ok(listener) = TcpListener::bind((Ipv4Addr::LOCALHOST, port)).await {
            return Ok(listener);
        }
    }

    tracing::warn!(
        range_start = ports.range_start,
        range_end = ports.range_end,
        "No free port in range, requesting an OS-assigned port"
    );
    Ok(TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await?)
}

/// The sole machine-readable interop contract with the host shell:
/// exactly one `SERVER_PORT=<n>` line on stdout, before any traffic
/// is accepted. All logging goes to stderr so nothing else touches
/// stdout.
pub fn announce_port(port: u16) {
    let mut stdout = std::io::stdout();
    if let Err(e) = writeln!(stdout, "SERVER_PORT={port}").and_then(|_| stdout.flush()) {
        tracing::error!(error = %e, "Failed to announce server port");
    }
}

/// Resolves on SIGINT or SIGTERM (Ctrl+C only on non-Unix platforms).
pub async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(s) => s,
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                let _ = tokio::signal::ctrl_c().await;
                return;
            }
        };
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
