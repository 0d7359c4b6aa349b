use tokio_util::sync::CancellationToken;

/// Cancel `cancel` on the first termination signal; a second Ctrl+C quits
/// on the spot.
pub fn install(cancel: CancellationToken) {
    tokio::spawn(async move {
        let signal = wait_for_signal().await;
        tracing::warn!("received termination signal: {}", signal);
        cancel.cancel();

        ctrl_c().await;
        eprintln!("Force quit!");
        std::process::exit(130);
    });
}

#[cfg(unix)]
async fn wait_for_signal() -> &'static str {
    use tokio::signal::unix::{signal, SignalKind};

    let (mut term, mut quit) = match (signal(SignalKind::terminate()), signal(SignalKind::quit())) {
        (Ok(term), Ok(quit)) => (term, quit),
        _ => {
            tracing::debug!("SIGTERM/SIGQUIT handlers unavailable, listening for Ctrl+C only");
            ctrl_c().await;
            return "SIGINT";
        }
    };

    tokio::select! {
        _ = ctrl_c() => "SIGINT",
        _ = term.recv() => "SIGTERM",
        _ = quit.recv() => "SIGQUIT",
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> &'static str {
    ctrl_c().await;
    "Ctrl+C"
}

/// Resolves on Ctrl+C. If the handler can't be installed it never resolves,
/// rather than cancelling a healthy run.
async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::debug!("Failed to install Ctrl+C handler: {}", e);
        std::future::pending::<()>().await;
    }
}
