use axum::http::StatusCode;

/// Handler for `GET /healthz`, the liveness check.
pub async fn healthz() -> StatusCode {
    StatusCode::OK
}

/// Map dependency probe results to a readiness status.
///
/// Services call this from their own `/readyz` handler after pinging their backends.
pub fn readiness<I>(probes: I) -> StatusCode
where
    I: IntoIterator<Item = (&'static str, Result<(), String>)>,
{
    let mut status = StatusCode::OK;
    for (name, probe) in probes {
        if let Err(error) = probe {
            tracing::warn!(dependency = name, %error, "readiness probe failed");
            status = StatusCode::SERVICE_UNAVAILABLE;
        }
    }
    status
}
