//! Tenant lifecycle event emission.
//!
//! The handshake publishes lifecycle notifications without knowing who (if
//! anyone) is listening; business logic, audit, and billing subscribe from the
//! embedding service. Sinks are injected at construction, never inherited.

// self
use crate::{_prelude::*, auth::ClientKey, tenant::TenantClientRecord};

/// Lifecycle notification published by the installation handshake.
#[derive(Clone, Debug)]
pub enum LifecycleEvent {
	/// A tenant completed install verification and its first token exchange.
	Installed {
		/// Tenant the event belongs to.
		tenant: ClientKey,
		/// Fully assembled client record (including group metadata).
		client: Box<TenantClientRecord>,
		/// Install callback payload as received, minus the shared secret.
		payload: serde_json::Value,
	},
	/// The add-on is enabled for the tenant.
	PluginEnabled {
		/// Tenant the event belongs to.
		tenant: ClientKey,
		/// Fully assembled client record.
		client: Box<TenantClientRecord>,
	},
	/// The tenant's client record was persisted successfully.
	HostSettingsSaved {
		/// Tenant the event belongs to.
		tenant: ClientKey,
		/// Persisted record as stored.
		settings: serde_json::Value,
	},
	/// The tenant uninstalled the add-on.
	Uninstalled {
		/// Tenant the event belongs to.
		tenant: ClientKey,
	},
}
impl LifecycleEvent {
	/// Stable event name for subscribers keyed by string.
	pub const fn name(&self) -> &'static str {
		match self {
			LifecycleEvent::Installed { .. } => "installed",
			LifecycleEvent::PluginEnabled { .. } => "plugin_enabled",
			LifecycleEvent::HostSettingsSaved { .. } => "host_settings_saved",
			LifecycleEvent::Uninstalled { .. } => "uninstalled",
		}
	}

	/// Tenant the event belongs to.
	pub fn tenant(&self) -> &ClientKey {
		match self {
			LifecycleEvent::Installed { tenant, .. }
			| LifecycleEvent::PluginEnabled { tenant, .. }
			| LifecycleEvent::HostSettingsSaved { tenant, .. }
			| LifecycleEvent::Uninstalled { tenant } => tenant,
		}
	}
}

/// Publish contract injected into the installation handshake.
pub trait LifecycleSink
where
	Self: Send + Sync,
{
	/// Delivers one event to every subscriber.
	fn emit(&self, event: LifecycleEvent);
}

/// Sink that discards every event, for embeddings without subscribers.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;
impl LifecycleSink for NullSink {
	fn emit(&self, _event: LifecycleEvent) {}
}

type Callback = Box<dyn Fn(&LifecycleEvent) + Send + Sync>;

/// Observer registry dispatching events to registered callbacks in
/// registration order.
#[derive(Default)]
pub struct CallbackRegistry {
	callbacks: RwLock<Vec<Callback>>,
}
impl CallbackRegistry {
	/// Creates an empty registry.
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers a subscriber invoked for every subsequent event.
	pub fn subscribe(&self, callback: impl Fn(&LifecycleEvent) + Send + Sync + 'static) {
		self.callbacks.write().push(Box::new(callback));
	}
}
impl LifecycleSink for CallbackRegistry {
	fn emit(&self, event: LifecycleEvent) {
		for callback in self.callbacks.read().iter() {
			callback(&event);
		}
	}
}
impl Debug for CallbackRegistry {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("CallbackRegistry")
			.field("subscribers", &self.callbacks.read().len())
			.finish()
	}
}

/// Sink that records every event in order, for tests and demos.
#[derive(Debug, Default)]
pub struct RecordingSink {
	events: Mutex<Vec<LifecycleEvent>>,
}
impl RecordingSink {
	/// Creates an empty recording sink.
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns the recorded event names in emission order.
	pub fn names(&self) -> Vec<&'static str> {
		self.events.lock().iter().map(LifecycleEvent::name).collect()
	}

	/// Drains and returns every recorded event in emission order.
	pub fn take(&self) -> Vec<LifecycleEvent> {
		std::mem::take(&mut *self.events.lock())
	}
}
impl LifecycleSink for RecordingSink {
	fn emit(&self, event: LifecycleEvent) {
		self.events.lock().push(event);
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::sync::atomic::{AtomicUsize, Ordering};
	// self
	use super::*;

	#[test]
	fn registry_dispatches_in_registration_order() {
		let registry = CallbackRegistry::new();
		let counter = Arc::new(AtomicUsize::new(0));
		let first_saw = Arc::new(AtomicUsize::new(usize::MAX));
		let second_saw = Arc::new(AtomicUsize::new(usize::MAX));

		{
			let counter = counter.clone();
			let first_saw = first_saw.clone();

			registry.subscribe(move |_| {
				first_saw.store(counter.fetch_add(1, Ordering::SeqCst), Ordering::SeqCst);
			});
		}
		{
			let counter = counter.clone();
			let second_saw = second_saw.clone();

			registry.subscribe(move |_| {
				second_saw.store(counter.fetch_add(1, Ordering::SeqCst), Ordering::SeqCst);
			});
		}

		registry.emit(LifecycleEvent::Uninstalled {
			tenant: ClientKey::new("tenant-1").expect("Tenant fixture should be valid."),
		});

		assert_eq!(first_saw.load(Ordering::SeqCst), 0);
		assert_eq!(second_saw.load(Ordering::SeqCst), 1);
	}

	#[test]
	fn recording_sink_preserves_emission_order() {
		let sink = RecordingSink::new();
		let tenant = ClientKey::new("tenant-1").expect("Tenant fixture should be valid.");

		sink.emit(LifecycleEvent::Uninstalled { tenant: tenant.clone() });
		sink.emit(LifecycleEvent::HostSettingsSaved {
			tenant,
			settings: serde_json::Value::Null,
		});

		assert_eq!(sink.names(), vec!["uninstalled", "host_settings_saved"]);
		assert_eq!(sink.take().len(), 2);
		assert!(sink.names().is_empty(), "Take drains the recorded events.");
	}
}
