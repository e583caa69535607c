use tracing::trace;

// Lightweight metrics helpers that are safe in demo builds.
// These intentionally avoid pulling in metrics macros to keep deps stable.

pub fn inc_requests(route: &'static str) {
    trace!(
        target = "bcexport.metrics",
        route = route,
        "requests_total_inc"
    );
}

pub fn page_fetched(endpoint: &'static str, records: usize) {
    trace!(
        target = "bcexport.metrics",
        endpoint = endpoint,
        records = records,
        "catalog_page_fetched"
    );
}

pub fn export_finished(rows: usize, elapsed_ms: u128) {
    trace!(
        target = "bcexport.metrics",
        rows = rows,
        elapsed_ms = elapsed_ms as u64,
        "export_finished"
    );
}
