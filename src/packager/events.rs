//! Package lifecycle notifications
//!
//! Observers register a callback; events are delivered synchronously from
//! the step that triggers them, so per-script ordering is preserved.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use super::descriptor::ScriptDescriptor;

/// Notification emitted while packaging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", content = "descriptor", rename_all = "kebab-case")]
pub enum PackageEvent {
    /// Incremental mode skipped the script because its archive already exists.
    IgnorePackage(ScriptDescriptor),
    /// The script's archive was written; carries the finalized descriptor.
    CreatePackage(ScriptDescriptor),
}

impl PackageEvent {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::IgnorePackage(_) => "ignore-package",
            Self::CreatePackage(_) => "create-package",
        }
    }

    #[must_use]
    pub const fn descriptor(&self) -> &ScriptDescriptor {
        match self {
            Self::IgnorePackage(d) | Self::CreatePackage(d) => d,
        }
    }
}

/// Callback invoked for every event.
pub type Listener = Arc<dyn Fn(&PackageEvent) + Send + Sync>;

/// Registered listeners. Cloning shares the same callbacks.
#[derive(Clone, Default)]
pub struct Events {
    listeners: Vec<Listener>,
}

impl Events {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&mut self, listener: F)
    where
        F: Fn(&PackageEvent) + Send + Sync + 'static,
    {
        self.listeners.push(Arc::new(listener));
    }

    pub fn emit(&self, event: &PackageEvent) {
        for listener in &self.listeners {
            listener(event);
        }
    }
}

impl fmt::Debug for Events {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Events")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
