//! Single-flight coordination of token acquisitions.
//!
//! A [`Coordinator`] keeps at most one producer running per key. The first caller for a key
//! registers its producer future and becomes the leader; callers arriving before that producer
//! completes join it and receive a clone of the same output. The registry only holds a weak
//! handle to each shared future, and a release guard inside the producer removes the registration
//! on every exit path:
//!
//! - the producer completes (successfully or not), so failures are never memoized;
//! - the producer panics, in which case the panic is re-raised to the waiters after release;
//! - every waiter is dropped before completion, which drops the producer itself.
//!
//! Dropping one [`Flight`] only detaches that caller. The producer keeps running for everyone
//! else still waiting on the key.

// std
use std::{
	panic::{self, AssertUnwindSafe},
	sync::{
		Weak,
		atomic::{AtomicU64, Ordering},
	},
	task::{Context, Poll},
};
// crates.io
use futures::future::{BoxFuture, FutureExt, Shared, WeakShared};
// self
use crate::_prelude::*;

type SharedFlight<T> = Shared<BoxFuture<'static, T>>;

/// Generic single-flight coordinator keyed by `K`, publishing outputs of type `T`.
///
/// Cloning is cheap; clones share the same registry.
pub struct Coordinator<K, T>
where
	K: 'static + Clone + Eq + Hash + Send + Sync,
	T: 'static + Clone + Send + Sync,
{
	registry: Arc<Registry<K, T>>,
}
impl<K, T> Coordinator<K, T>
where
	K: 'static + Clone + Eq + Hash + Send + Sync,
	T: 'static + Clone + Send + Sync,
{
	/// Creates an empty coordinator.
	pub fn new() -> Self {
		Self {
			registry: Arc::new(Registry {
				flights: Mutex::new(HashMap::new()),
				next_id: AtomicU64::new(0),
			}),
		}
	}

	/// Joins the in-flight producer for `key`, or registers `producer` as a new one.
	///
	/// `producer` is invoked at most once, synchronously and under the registry lock, only to
	/// build the future; it must not call back into this coordinator. The returned [`Flight`]
	/// resolves to the producer's output, shared by every caller that joined it.
	pub fn acquire<F, Fut>(&self, key: K, producer: F) -> Flight<T>
	where
		F: FnOnce() -> Fut,
		Fut: 'static + Send + Future<Output = T>,
	{
		let mut flights = self.registry.flights.lock();

		if let Some(shared) =
			flights.get(&key).and_then(|registration| registration.flight.upgrade())
		{
			return Flight { shared, leader: false };
		}

		// No release guard may exist while a builder that can panic runs under the lock.
		let fut = producer();
		let id = self.registry.next_id.fetch_add(1, Ordering::Relaxed);
		let release = Release { registry: Arc::downgrade(&self.registry), key: key.clone(), id };
		let shared = async move {
			let outcome = AssertUnwindSafe(fut).catch_unwind().await;

			drop(release);

			match outcome {
				Ok(value) => value,
				Err(payload) => panic::resume_unwind(payload),
			}
		}
		.boxed()
		.shared();

		if let Some(flight) = shared.downgrade() {
			flights.insert(key, Registration { id, flight });
		}

		Flight { shared, leader: true }
	}

	/// Number of keys with a registered producer.
	pub fn in_flight(&self) -> usize {
		self.registry.flights.lock().len()
	}

	/// Returns `true` when a producer is registered for `key`.
	pub fn is_in_flight(&self, key: &K) -> bool {
		self.registry.flights.lock().contains_key(key)
	}
}
impl<K, T> Clone for Coordinator<K, T>
where
	K: 'static + Clone + Eq + Hash + Send + Sync,
	T: 'static + Clone + Send + Sync,
{
	fn clone(&self) -> Self {
		Self { registry: self.registry.clone() }
	}
}
impl<K, T> Default for Coordinator<K, T>
where
	K: 'static + Clone + Eq + Hash + Send + Sync,
	T: 'static + Clone + Send + Sync,
{
	fn default() -> Self {
		Self::new()
	}
}
impl<K, T> Debug for Coordinator<K, T>
where
	K: 'static + Clone + Eq + Hash + Send + Sync,
	T: 'static + Clone + Send + Sync,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Coordinator").field("in_flight", &self.in_flight()).finish()
	}
}

/// Handle to a coordinated acquisition; resolves to the shared producer output.
#[must_use = "flights do nothing unless polled"]
pub struct Flight<T>
where
	T: 'static + Clone,
{
	shared: SharedFlight<T>,
	leader: bool,
}
impl<T> Flight<T>
where
	T: 'static + Clone,
{
	/// Returns `true` when this call registered the producer rather than joining one.
	pub fn is_leader(&self) -> bool {
		self.leader
	}
}
impl<T> Future for Flight<T>
where
	T: 'static + Clone,
{
	type Output = T;

	fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
		self.shared.poll_unpin(cx)
	}
}
impl<T> Debug for Flight<T>
where
	T: 'static + Clone,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Flight").field("leader", &self.leader).finish()
	}
}

struct Registry<K, T>
where
	T: 'static,
{
	flights: Mutex<HashMap<K, Registration<T>>>,
	next_id: AtomicU64,
}

struct Registration<T>
where
	T: 'static,
{
	id: u64,
	flight: WeakShared<BoxFuture<'static, T>>,
}

struct Release<K, T>
where
	K: Eq + Hash,
	T: 'static,
{
	registry: Weak<Registry<K, T>>,
	key: K,
	id: u64,
}
impl<K, T> Drop for Release<K, T>
where
	K: Eq + Hash,
	T: 'static,
{
	fn drop(&mut self) {
		let Some(registry) = self.registry.upgrade() else {
			return;
		};
		let mut flights = registry.flights.lock();

		// A newer producer may already own the key.
		if flights.get(&self.key).is_some_and(|registration| registration.id == self.id) {
			flights.remove(&self.key);
		}
	}
}
