use feedhub_telemetry::{
    TelemetryMetrics, metrics, record_direct_write_latency_ms, record_update_queued,
    record_update_received,
};

#[test]
fn counters_accumulate_in_snapshot() {
    let before = metrics().snapshot();
    record_update_received();
    record_update_received();
    record_update_queued();
    record_direct_write_latency_ms(12);

    let after = metrics().snapshot();
    assert!(after.updates_received >= before.updates_received + 2);
    assert!(after.updates_queued > before.updates_queued);
    assert!(after.direct_write_latency_ms_total >= before.direct_write_latency_ms_total + 12);
    assert!(after.direct_write_latency_ms_count > before.direct_write_latency_ms_count);
}

#[test]
fn fresh_metrics_start_at_zero() {
    let snapshot = TelemetryMetrics::new().snapshot();
    assert_eq!(snapshot.updates_received, 0);
    assert_eq!(snapshot.control_writes, 0);
}
