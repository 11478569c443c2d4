//! Named event listeners
//!
//! Listeners are callbacks registered under an event name. Every incoming
//! event is handed to the callbacks of its name in registration order.
//! The registry is cheap to clone; clones share the same listeners so the
//! read loop and the caller see one registry.

use crate::error::ListenerError;
use crate::protocol::{SerialMessage, DATA_EVENT};
use crate::value::JsonValue;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// Callback invoked with the event payload
pub type ListenerCallback = Arc<dyn Fn(&JsonValue) + Send + Sync>;

/// Identity of a single registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(Uuid);

impl ListenerId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for ListenerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Listener({})", &self.0.to_string()[..8])
    }
}

/// Handle returned by [`ListenerRegistry::on`]
///
/// Pass it to [`ListenerRegistry::remove_listener`] to unregister exactly
/// this callback.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Listener {
    name: String,
    id: ListenerId,
}

impl Listener {
    /// Event name this listener is registered for
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Registration identity
    pub fn id(&self) -> ListenerId {
        self.id
    }
}

type Registrations = HashMap<String, Vec<(ListenerId, ListenerCallback)>>;

/// Registry of named event listeners
#[derive(Clone)]
pub struct ListenerRegistry {
    listeners: Arc<RwLock<Registrations>>,
    warn_about_unregistered_events: Arc<AtomicBool>,
}

impl ListenerRegistry {
    /// Create an empty registry that warns about unregistered events
    pub fn new() -> Self {
        Self {
            listeners: Arc::new(RwLock::new(HashMap::new())),
            warn_about_unregistered_events: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Toggle the warning for events nobody listens to
    pub fn set_warn_about_unregistered_events(&self, warn: bool) {
        self.warn_about_unregistered_events.store(warn, Ordering::Relaxed);
    }

    /// Whether unregistered events are reported
    pub fn warns_about_unregistered_events(&self) -> bool {
        self.warn_about_unregistered_events.load(Ordering::Relaxed)
    }

    /// Register a callback for the given event name
    pub fn on<F>(&self, name: impl Into<String>, callback: F) -> Listener
    where
        F: Fn(&JsonValue) + Send + Sync + 'static,
    {
        let name = name.into();
        let id = ListenerId::new();
        self.listeners
            .write()
            .entry(name.clone())
            .or_default()
            .push((id, Arc::new(callback)));
        tracing::debug!("{} added for event '{}'", id, name);
        Listener { name, id }
    }

    /// Unregister a single callback
    ///
    /// Returns `true` if the callback was still registered. Fails when no
    /// listener was ever registered under the listener's event name.
    pub fn remove_listener(&self, listener: &Listener) -> Result<bool, ListenerError> {
        let mut listeners = self.listeners.write();
        let callbacks = listeners
            .get_mut(&listener.name)
            .ok_or_else(|| ListenerError::NoListener {
                name: listener.name.clone(),
            })?;

        let before = callbacks.len();
        callbacks.retain(|(id, _)| *id != listener.id);
        let removed = before != callbacks.len();
        if removed {
            tracing::debug!("{} removed from event '{}'", listener.id, listener.name);
        }
        Ok(removed)
    }

    /// Unregister every callback of an event name
    ///
    /// Returns `true` if at least one callback was removed.
    pub fn remove_listeners(&self, name: &str) -> bool {
        let mut listeners = self.listeners.write();
        let callbacks = listeners.entry(name.to_string()).or_default();
        let removed = !callbacks.is_empty();
        callbacks.clear();
        removed
    }

    /// Number of callbacks registered for an event name
    pub fn listener_count(&self, name: &str) -> usize {
        self.listeners.read().get(name).map_or(0, Vec::len)
    }

    /// Call every callback registered for `name` with `data`.
    ///
    /// Returns `true` if the event name has been registered. Callbacks run
    /// on the calling thread and may register or remove listeners.
    pub fn emit(&self, name: &str, data: &JsonValue) -> bool {
        let callbacks: Option<Vec<ListenerCallback>> = self
            .listeners
            .read()
            .get(name)
            .map(|callbacks| callbacks.iter().map(|(_, cb)| cb.clone()).collect());

        match callbacks {
            Some(callbacks) => {
                for callback in callbacks {
                    callback(data);
                }
                true
            }
            None => {
                if self.warns_about_unregistered_events() {
                    tracing::warn!(
                        "Event {} has been received, but it has never been registered as listener.",
                        name
                    );
                }
                false
            }
        }
    }

    /// Hand a decoded message to the listeners it is meant for.
    ///
    /// Unnamed data goes to [`DATA_EVENT`] listeners and named events to
    /// the listeners of their name. Device warnings, logs and errors have
    /// no listeners; for those this returns `false` without warning.
    pub fn dispatch(&self, message: &SerialMessage) -> bool {
        match message {
            SerialMessage::Data(data) => self.emit(DATA_EVENT, data),
            SerialMessage::Event { name, data } => self.emit(name, data),
            SerialMessage::Warning(_) | SerialMessage::Log(_) | SerialMessage::Error(_) => false,
        }
    }
}

impl Default for ListenerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let listeners = self.listeners.read();
        let mut names: Vec<&String> = listeners.keys().collect();
        names.sort();
        f.debug_struct("ListenerRegistry")
            .field("events", &names)
            .field(
                "warn_about_unregistered_events",
                &self.warns_about_unregistered_events(),
            )
            .finish()
    }
}
