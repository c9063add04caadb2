//! prometheus meters of the receiver

use prometheus::{opts, IntCounter, IntCounterVec, Registry};

#[derive(Debug, Clone)]
/// meters are registered on their own [Registry] which is exposed by the
/// [telemetry endpoint](crate::telemetry_endpoint)
pub struct Metrics {
	registry: Registry,
	/// webhook calls by outcome
	webhook_requests: IntCounterVec,
	/// messages sent into the room
	messages_forwarded: IntCounter,
	/// messages which failed to send
	messages_failed: IntCounter,
}

impl Metrics {
	/// construct and register prometheus meters
	pub fn new() -> Result<Self, prometheus::Error> {
		let registry = Registry::new();

		let webhook_requests = IntCounterVec::new(
			opts!("requests_total", "number of alertmanager webhook calls")
				.namespace("receiver")
				.subsystem("webhook"),
			&["outcome"],
		)?;

		let messages_forwarded = IntCounter::with_opts(
			opts!("forwarded_total", "number of messages sent into the room")
				.namespace("receiver")
				.subsystem("messages"),
		)?;

		let messages_failed = IntCounter::with_opts(
			opts!("failed_total", "number of messages which could not be sent")
				.namespace("receiver")
				.subsystem("messages"),
		)?;

		registry.register(Box::new(webhook_requests.clone()))?;
		registry.register(Box::new(messages_forwarded.clone()))?;
		registry.register(Box::new(messages_failed.clone()))?;

		Ok(Self { registry, webhook_requests, messages_forwarded, messages_failed })
	}

	pub fn registry(&self) -> &Registry {
		&self.registry
	}

	pub fn record_webhook(&self, outcome: &str) {
		self.webhook_requests.with_label_values(&[outcome]).inc();
	}

	pub fn record_forwarded(&self) {
		self.messages_forwarded.inc();
	}

	pub fn record_failed(&self) {
		self.messages_failed.inc();
	}

	#[cfg(test)]
	pub fn forwarded(&self) -> u64 {
		self.messages_forwarded.get()
	}

	#[cfg(test)]
	pub fn failed(&self) -> u64 {
		self.messages_failed.get()
	}

	#[cfg(test)]
	pub fn webhook_requests(&self, outcome: &str) -> u64 {
		self.webhook_requests.with_label_values(&[outcome]).get()
	}
}
