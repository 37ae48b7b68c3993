use ripple_manifest::PinLedger;
use tracing::{error, warn};

/// Restores every pinned manifest on Ctrl-C and exits. In-flight pipelines
/// are not unwound, so their guards never run.
pub(crate) fn restore_pins_on_interrupt(ledger: PinLedger) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        warn!(pinned = ledger.pinned_paths().len(), "interrupted, restoring pinned manifests");

        let failures = ledger.restore_all();
        for failure in &failures {
            error!(error = %failure, "manifest restore failed");
        }
        if !failures.is_empty() {
            eprintln!(
                "error: {}",
                crate::error::CliError::RestoreFailed(failures.len())
            );
        }
        std::process::exit(130);
    });
}
