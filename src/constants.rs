/// Broadcast channels (shared constants)
///
/// Channel names are part of the wire protocol between this service and the
/// dashboard / webhook consumers. When updating these values, ensure they
/// match the subscription names used by downstream clients.
pub mod channels {
    /// Channel every security alert is published on
    pub const SECURITY_ALERT: &str = "security-alert";
}

/// Broadcaster tuning
pub mod broadcaster {
    /// Per-client outbound buffer; slow consumers drop beyond this
    pub const OUTBOUND_BUFFER: usize = 64;
}

/// Enhancement node pool
pub mod enhancement {
    /// Path probed by the periodic health check
    pub const HEALTH_PATH: &str = "/health";
    /// Path the partial analysis is posted to
    pub const ENHANCE_PATH: &str = "/enhance";
}

/// Transaction Analyzer routes
pub mod analyzer {
    /// Single-transaction analysis endpoint
    pub const ANALYZE_PATH: &str = "/analyze/transaction";
    /// Recent-activity feed, address appended as a path segment
    pub const ACTIVITY_PATH: &str = "/activity";
}
