//! Supervisor readiness signaling.
//!
//! When running as a managed worker the supervisor wants one "listening"
//! notification after the server starts accepting requests. The wire is
//! sd_notify style: a `READY=1` datagram to `$NOTIFY_SOCKET` when that is
//! set; otherwise the signal degrades to a log line.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::transport::TransportInfo;

static SENT: AtomicBool = AtomicBool::new(false);

/// Emit the one-shot readiness signal. Later calls are no-ops.
pub fn notify_listening(info: &TransportInfo) {
    if SENT.swap(true, Ordering::SeqCst) {
        return;
    }

    #[cfg(unix)]
    if let Ok(path) = std::env::var("NOTIFY_SOCKET") {
        use std::os::unix::net::UnixDatagram;
        match UnixDatagram::unbound() {
            Ok(socket) => {
                if let Err(e) = socket.send_to(b"READY=1", &path) {
                    tracing::warn!(error = %e, "failed to send readiness notification");
                }
            }
            Err(e) => tracing::warn!(error = %e, "failed to open notify socket"),
        }
    }

    tracing::info!(address = %info.addr, "server listening");
}
