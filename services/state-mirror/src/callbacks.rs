//! Consumer callback table
//!
//! Callbacks are keyed by `(kind, scope)` in two classes:
//! - plain: receives the parsed frame
//! - managed: receives the parsed frame and the model's current state, and
//!   only fires for kinds that hold state
//!
//! Registering replaces the previous callback of the same class and key.

use std::collections::HashMap;
use std::fmt;

use types::kind::{EntityKind, Scope};

use crate::model::{Parsed, StateRef};

pub type PlainCallback = Box<dyn FnMut(&Parsed)>;
pub type ManagedCallback = Box<dyn FnMut(&Parsed, StateRef<'_>)>;

/// Callback class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallbackClass {
    Plain,
    Managed,
}

/// Callback key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CallbackKey {
    pub kind: EntityKind,
    pub scope: Scope,
}

impl CallbackKey {
    pub fn new(kind: EntityKind, scope: Scope) -> Self {
        Self { kind, scope }
    }
}

#[derive(Default)]
pub struct CallbackTable {
    plain: HashMap<CallbackKey, PlainCallback>,
    managed: HashMap<CallbackKey, ManagedCallback>,
}

impl CallbackTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_plain(&mut self, key: CallbackKey, callback: PlainCallback) {
        self.plain.insert(key, callback);
    }

    pub fn set_managed(&mut self, key: CallbackKey, callback: ManagedCallback) {
        self.managed.insert(key, callback);
    }

    /// Remove a registration. Returns whether one existed.
    pub fn remove(&mut self, class: CallbackClass, key: &CallbackKey) -> bool {
        match class {
            CallbackClass::Plain => self.plain.remove(key).is_some(),
            CallbackClass::Managed => self.managed.remove(key).is_some(),
        }
    }

    /// Invoke the callbacks registered for `(kind, scope)`. Managed
    /// callbacks only run when `state` is present. Returns the number of
    /// callbacks invoked.
    pub fn dispatch(
        &mut self,
        kind: EntityKind,
        scope: &Scope,
        parsed: &Parsed,
        state: Option<StateRef<'_>>,
    ) -> usize {
        let key = CallbackKey::new(kind, scope.clone());
        let mut invoked = 0;

        if let Some(callback) = self.plain.get_mut(&key) {
            callback(parsed);
            invoked += 1;
        }

        if let (Some(callback), Some(state)) = (self.managed.get_mut(&key), state) {
            callback(parsed, state);
            invoked += 1;
        }

        invoked
    }

    pub fn len(&self) -> usize {
        self.plain.len() + self.managed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for CallbackTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackTable")
            .field("plain", &self.plain.keys().collect::<Vec<_>>())
            .field("managed", &self.managed.keys().collect::<Vec<_>>())
            .finish()
    }
}
