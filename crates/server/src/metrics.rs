use std::sync::Arc;

use prometheus::{Encoder, IntCounter, Registry, TextEncoder};

pub struct Metrics {
    registry: Registry,
    pub webhooks_received: IntCounter,
    pub bomb_planted: IntCounter,
    pub serial_write_failures: IntCounter,
}

impl Metrics {
    pub fn new() -> prometheus::Result<Arc<Self>> {
        let webhooks_received = IntCounter::new("bombwire_webhooks_received_total", "Total GSI payloads received")?;
        let bomb_planted = IntCounter::new("bombwire_bomb_planted_total", "Bomb plants forwarded to the serial device")?;
        let serial_write_failures = IntCounter::new("bombwire_serial_write_failures_total", "Failed serial writes")?;

        let registry = Registry::new();
        registry.register(Box::new(webhooks_received.clone()))?;
        registry.register(Box::new(bomb_planted.clone()))?;
        registry.register(Box::new(serial_write_failures.clone()))?;

        Ok(Arc::new(Self { registry, webhooks_received, bomb_planted, serial_write_failures }))
    }

    /// Text exposition format plus its content type.
    pub fn encode(&self) -> prometheus::Result<(String, Vec<u8>)> {
        let encoder = TextEncoder::new();
        let mut buf = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buf)?;
        Ok((encoder.format_type().to_string(), buf))
    }
}
