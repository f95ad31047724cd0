//! Metric reporting interface.

use log::debug;

/// Gauge counting hosts whose children's summed resources exceed the host
/// envelope on some axis.
pub const OVERCOMMITTED_HOSTS: &str = "overcommittedHosts";

/// Gauge counting how many hosts the fleet can stand to lose before some
/// tenant has no new home.
pub const SPARE_HOST_CAPACITY: &str = "spareHostCapacity";

/// Sink for the integer gauges emitted by the maintainer.
pub trait MetricSink {
    fn set(&mut self, name: &str, value: i64);
}

/// Sink that records gauge values to the log only. Useful as a default
/// until the embedder wires up a real metric backend.
#[derive(Default)]
pub struct LogMetricSink;

impl LogMetricSink {
    pub fn new() -> Self {
        Self
    }
}

impl MetricSink for LogMetricSink {
    fn set(&mut self, name: &str, value: i64) {
        debug!("gauge {} = {}", name, value);
    }
}
