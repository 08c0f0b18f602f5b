// std
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing how calls were served.
#[derive(Debug, Default)]
pub struct AcquisitionMetrics {
	cache_hits: AtomicU64,
	acquisitions: AtomicU64,
	joined: AtomicU64,
	failures: AtomicU64,
}
impl AcquisitionMetrics {
	/// Calls answered from a fresh cache or store entry.
	pub fn cache_hits(&self) -> u64 {
		self.cache_hits.load(Ordering::Relaxed)
	}

	/// Coordinated producers that ran.
	pub fn acquisitions(&self) -> u64 {
		self.acquisitions.load(Ordering::Relaxed)
	}

	/// Calls that joined a producer already in flight.
	pub fn joined(&self) -> u64 {
		self.joined.load(Ordering::Relaxed)
	}

	/// Producers that ended without a token.
	pub fn failures(&self) -> u64 {
		self.failures.load(Ordering::Relaxed)
	}

	pub(crate) fn record_cache_hit(&self) {
		self.cache_hits.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_acquisition(&self) {
		self.acquisitions.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_joined(&self) {
		self.joined.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_failure(&self) {
		self.failures.fetch_add(1, Ordering::Relaxed);
	}
}
