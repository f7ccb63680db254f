use tracing::trace;

// Lightweight trace-based metrics helpers; the Prometheus recorder in main
// picks up process-level metrics while these keep per-route counts visible
// in logs without macro dependencies.

pub fn inc_requests(route: &'static str) {
    trace!(
        target = "srbot.metrics",
        route = route,
        "requests_total_inc"
    );
}

pub fn pipeline_elapsed(step: &'static str, elapsed_ms: u128) {
    trace!(
        target = "srbot.metrics",
        step = step,
        elapsed_ms = elapsed_ms as u64,
        "step_elapsed"
    );
}
