//! # Termination signals.
//!
//! Only consulted when [`Config::handle_signals`](crate::Config) is set; an
//! interactive front-end usually maps its own keys to `Input::Quit` instead.
//!
//! | platform | signals                     |
//! |----------|-----------------------------|
//! | unix     | `SIGINT`, `SIGTERM`, `SIGHUP` |
//! | other    | Ctrl-C                      |

/// Completes with the name of the first termination signal received.
#[cfg(unix)]
pub(crate) async fn wait_for_shutdown_signal() -> std::io::Result<&'static str> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut term = signal(SignalKind::terminate())?;
    let mut hangup = signal(SignalKind::hangup())?;

    let name = tokio::select! {
        res = tokio::signal::ctrl_c() => {
            res?;
            "SIGINT"
        }
        _ = term.recv() => "SIGTERM",
        _ = hangup.recv() => "SIGHUP",
    };
    Ok(name)
}

/// Completes with the name of the first termination signal received.
#[cfg(not(unix))]
pub(crate) async fn wait_for_shutdown_signal() -> std::io::Result<&'static str> {
    tokio::signal::ctrl_c().await?;
    Ok("ctrl-c")
}
