//! Full library scan.
//!
//! Queues every existing item once, so libraries populated before the
//! companion started are converted too.

use std::collections::HashSet;

use crate::context::AppContext;
use crate::error::Result;

/// Totals from one scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanSummary {
    pub libraries: usize,
    pub items_found: usize,
    pub items_queued: usize,
    pub errors: usize,
}

/// List all book libraries and queue their items, skipping anything already
/// queued, then start dispatching.
pub async fn run_full_scan(ctx: &AppContext) -> Result<ScanSummary> {
    tracing::info!("Starting full library scan");

    let libraries = ctx.control.list_libraries().await?;
    let mut summary = ScanSummary::default();
    let mut seen = HashSet::new();

    for library in libraries.iter().filter(|l| l.holds_books()) {
        summary.libraries += 1;

        let items = match ctx.control.list_library_items(&library.id).await {
            Ok(items) => items,
            Err(e) => {
                summary.errors += 1;
                tracing::warn!(
                    library_id = %library.id,
                    library = %library.name,
                    error = %e,
                    "Failed to list library items"
                );
                continue;
            }
        };

        summary.items_found += items.len();
        for item_id in items {
            if seen.insert(item_id.clone()) && ctx.queue.enqueue_unique(&item_id) {
                summary.items_queued += 1;
            }
        }

        tracing::debug!(library_id = %library.id, library = %library.name, "Library scanned");
    }

    tracing::info!(
        libraries = summary.libraries,
        found = summary.items_found,
        queued = summary.items_queued,
        errors = summary.errors,
        "Full library scan complete"
    );

    ctx.queue.fill();
    Ok(summary)
}

/// Run the startup scan in the background if enabled and not yet run.
pub fn spawn_startup_scan(ctx: &AppContext) {
    if !ctx.config.scan_on_start || !ctx.claim_startup_scan() {
        return;
    }

    let ctx = ctx.clone();
    tokio::spawn(async move {
        if let Err(e) = run_full_scan(&ctx).await {
            tracing::error!(error = %e, "Full library scan failed");
        }
    });
}
