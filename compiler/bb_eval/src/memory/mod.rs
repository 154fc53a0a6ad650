//! Scope memory.
//!
//! A [`Memory`] maps symbols to values for one scope: the program root, a
//! call, a struct instance, a background task. Scopes form a parent chain
//! that lookups walk outwards.
//!
//! # Visibility
//!
//! A scope created for a call disables *mutable visibility* once its
//! arguments are bound: from then on it can see only `final` bindings of
//! the scopes above it. This is what lets a call run on another thread
//! without racing the caller.
//!
//! # Futures
//!
//! Background calls store a future in their destination slot and register
//! it with the scope that spawned them. Reading the slot joins the future
//! and replaces it with the result; releasing or detaching the scope joins
//! every registered future.
//!
//! # Locking
//!
//! Every operation takes the scope's own mutex through a guard and drops
//! it before touching any other scope or running any user code, so lock
//! order never spans two scopes.

use crate::data::{Data, ErrorData, FutureData, StructData};
use crate::errors::{final_violation, missing_value, mutable_not_visible, unhandled_error};
use crate::{DataPtr, EvalError, EvalResult};
use bb_ir::{SharedSymbols, SymbolId};
use parking_lot::Mutex;
use rustc_hash::{FxHashMap, FxHashSet};
use std::sync::{Arc, Weak};

#[derive(Default)]
struct MemoryState {
    slots: FxHashMap<SymbolId, DataPtr>,
    finals: FxHashSet<SymbolId>,
    parent: Option<Arc<Memory>>,
    allow_mutables: bool,
    attached: Vec<Arc<FutureData>>,
    deferred: Vec<DataPtr>,
    this_object: Option<Weak<StructData>>,
}

impl MemoryState {
    fn holds(&self, id: SymbolId) -> bool {
        self.slots.get(&id).is_some_and(|v| !v.is_missing())
            || (id == SymbolId::THIS && self.this_object.is_some())
    }
}

/// Bindings of one scope.
pub struct Memory {
    symbols: SharedSymbols,
    state: Mutex<MemoryState>,
}

impl Memory {
    /// Scope without a parent.
    pub fn root(symbols: SharedSymbols) -> Arc<Memory> {
        Arc::new(Memory {
            symbols,
            state: Mutex::new(MemoryState {
                allow_mutables: true,
                ..MemoryState::default()
            }),
        })
    }

    /// Scope nested in `parent`, with mutable visibility on.
    pub fn child(parent: &Arc<Memory>) -> Arc<Memory> {
        Arc::new(Memory {
            symbols: Arc::clone(&parent.symbols),
            state: Mutex::new(MemoryState {
                parent: Some(Arc::clone(parent)),
                allow_mutables: true,
                ..MemoryState::default()
            }),
        })
    }

    pub fn symbols(&self) -> &SharedSymbols {
        &self.symbols
    }

    fn name(&self, id: SymbolId) -> Arc<str> {
        self.symbols.name(id)
    }

    pub fn parent(&self) -> Option<Arc<Memory>> {
        self.state.lock().parent.clone()
    }

    pub fn allows_mutables(&self) -> bool {
        self.state.lock().allow_mutables
    }

    pub fn set_allow_mutables(&self, allow: bool) {
        self.state.lock().allow_mutables = allow;
    }

    /// Make `this` resolve to `object` in this scope.
    pub fn set_this_object(&self, object: &Arc<StructData>) {
        let mut state = self.state.lock();
        state.this_object = Some(Arc::downgrade(object));
        state.finals.insert(SymbolId::THIS);
    }

    /// Value of `id`, searching outwards. Missing is an error.
    pub fn get(&self, id: SymbolId) -> EvalResult {
        self.get_with(id, true)
    }

    /// Like [`get`](Self::get); with `allow_mutable == false`, a non-final
    /// binding found in this scope is an error.
    pub fn get_with(&self, id: SymbolId, allow_mutable: bool) -> EvalResult {
        self.lookup(id, allow_mutable)?
            .ok_or_else(|| missing_value(&self.name(id)))
    }

    /// Value of `id`, searching outwards; `None` when absent everywhere.
    pub fn get_or_null(&self, id: SymbolId, allow_mutable: bool) -> Result<Option<DataPtr>, EvalError> {
        self.lookup(id, allow_mutable)
    }

    /// Value of `id` in this scope only.
    pub fn get_or_null_shallow(&self, id: SymbolId) -> Result<Option<DataPtr>, EvalError> {
        let found = self.state.lock().slots.get(&id).cloned();
        match found {
            Some(value) if !value.is_missing() => self.resolve(id, value).map(Some),
            _ => Ok(self.this_binding(id)),
        }
    }

    fn this_binding(&self, id: SymbolId) -> Option<DataPtr> {
        if id != SymbolId::THIS {
            return None;
        }
        let object = self.state.lock().this_object.as_ref()?.upgrade()?;
        let object: Arc<dyn Data> = object;
        Some(DataPtr::from_obj(object))
    }

    fn lookup(&self, id: SymbolId, allow_mutable: bool) -> Result<Option<DataPtr>, EvalError> {
        let (found, is_final, parent, allow_here) = {
            let state = self.state.lock();
            (
                state.slots.get(&id).filter(|v| !v.is_missing()).cloned(),
                state.finals.contains(&id),
                state.parent.clone(),
                state.allow_mutables,
            )
        };

        if let Some(value) = found {
            if !allow_mutable && !is_final {
                return Err(mutable_not_visible(&self.name(id)));
            }
            return self.resolve(id, value).map(Some);
        }
        if let Some(this) = self.this_binding(id) {
            return Ok(Some(this));
        }
        match parent {
            Some(parent) => parent.lookup(id, allow_mutable && allow_here),
            None => Ok(None),
        }
    }

    /// Join a future-valued slot and store its result in place.
    fn resolve(&self, id: SymbolId, value: DataPtr) -> EvalResult {
        let Some(future) = value.downcast::<FutureData>() else {
            return Ok(value);
        };
        let result = future.resolve()?;
        let mut state = self.state.lock();
        if state.slots.get(&id).is_some_and(|current| current.is_same(&value)) {
            state.slots.insert(id, result.clone());
        }
        Ok(result)
    }

    /// Bind `id` in this scope.
    ///
    /// Fails if `id` is final here, or final in an enclosing scope (the
    /// per-invocation `this` and `args` excepted).
    pub fn set(&self, id: SymbolId, value: DataPtr) -> Result<(), EvalError> {
        let parent = {
            let state = self.state.lock();
            if state.finals.contains(&id) && state.holds(id) {
                return Err(final_violation(&self.name(id)));
            }
            state.parent.clone()
        };
        if !id.is_per_invocation() {
            let mut scope = parent;
            while let Some(memory) = scope {
                let state = memory.state.lock();
                if state.finals.contains(&id) && state.slots.contains_key(&id) {
                    return Err(final_violation(&self.name(id)));
                }
                scope = state.parent.clone();
            }
        }
        self.state.lock().slots.insert(id, value);
        Ok(())
    }

    /// Bind `id` without any final checks. Used by the interpreter for
    /// bindings it owns (`this`, `args`, resolved futures).
    pub(crate) fn set_unchecked(&self, id: SymbolId, value: DataPtr) {
        self.state.lock().slots.insert(id, value);
    }

    pub fn set_final(&self, id: SymbolId) {
        self.state.lock().finals.insert(id);
    }

    pub fn is_final(&self, id: SymbolId) -> bool {
        self.state.lock().finals.contains(&id)
    }

    /// Snapshot of this scope's bindings, ordered by symbol.
    pub fn bindings(&self) -> Vec<(SymbolId, DataPtr)> {
        let mut bindings: Vec<(SymbolId, DataPtr)> = self
            .state
            .lock()
            .slots
            .iter()
            .filter(|(_, v)| !v.is_missing())
            .map(|(id, v)| (*id, v.clone()))
            .collect();
        bindings.sort_by_key(|(id, _)| *id);
        bindings
    }

    /// Resolved bindings of `other`, shallow-copied.
    fn copied_bindings(other: &Memory) -> Result<Vec<(SymbolId, DataPtr)>, EvalError> {
        other
            .bindings()
            .into_iter()
            .map(|(id, value)| {
                let value = other.resolve(id, value)?;
                let copy = match value.obj() {
                    Some(obj) => obj.shallow_copy(&value),
                    None => value,
                };
                Ok((id, copy))
            })
            .collect()
    }

    /// Copy every binding of `other` into this scope.
    pub fn pull(&self, other: &Memory) -> Result<(), EvalError> {
        for (id, value) in Self::copied_bindings(other)? {
            self.set(id, value)?;
        }
        Ok(())
    }

    /// Copy the bindings of `other` that this scope lacks.
    pub fn replace_missing(&self, other: &Memory) -> Result<(), EvalError> {
        for (id, value) in Self::copied_bindings(other)? {
            let absent = self
                .state
                .lock()
                .slots
                .get(&id)
                .map_or(true, DataPtr::is_missing);
            if absent {
                self.set(id, value)?;
            }
        }
        Ok(())
    }

    /// Register a background task spawned from this scope.
    pub fn attach(&self, future: Arc<FutureData>) {
        self.state.lock().attached.push(future);
    }

    #[cfg(test)]
    pub(crate) fn attached_count(&self) -> usize {
        self.state.lock().attached.len()
    }

    /// Join every registered task and resolve future-valued slots.
    ///
    /// All tasks are joined even if one fails; the first failure is
    /// returned.
    pub fn join_attached(&self) -> Result<(), EvalError> {
        let attached = std::mem::take(&mut self.state.lock().attached);
        let mut first_error = None;
        for future in attached {
            if let Err(error) = future.resolve() {
                first_error.get_or_insert(error);
            }
        }
        for (id, value) in self.bindings() {
            if value.downcast::<FutureData>().is_some() {
                if let Err(error) = self.resolve(id, value) {
                    first_error.get_or_insert(error);
                }
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Join tasks, then cut this scope loose from its parent with mutable
    /// visibility off.
    pub fn detach(&self) -> Result<(), EvalError> {
        self.detach_to(None)
    }

    /// Join tasks, then re-parent this scope under `parent` with mutable
    /// visibility off.
    pub fn detach_to(&self, parent: Option<Arc<Memory>>) -> Result<(), EvalError> {
        let joined = self.join_attached();
        let mut state = self.state.lock();
        state.allow_mutables = false;
        state.parent = parent;
        joined
    }

    /// Queue a block to run when this scope ends.
    pub fn defer(&self, code: DataPtr) {
        self.state.lock().deferred.push(code);
    }

    pub fn take_deferred(&self) -> Vec<DataPtr> {
        std::mem::take(&mut self.state.lock().deferred)
    }

    /// End of scope: join tasks, report unhandled errors, drop bindings.
    ///
    /// `keep` is the value leaving the scope (a returned value); it is not
    /// reported even if it is an unconsumed error.
    pub fn release(&self, keep: &DataPtr) -> Result<(), EvalError> {
        let joined = self.join_attached();
        let slots = std::mem::take(&mut self.state.lock().slots);
        joined?;
        for value in slots.values() {
            if let Some(error) = value.error() {
                if !error.is_consumed() && !value.is_same(keep) {
                    error.consume();
                    return Err(unhandled_error(&error.error().to_string()));
                }
            }
        }
        Ok(())
    }
}

impl Drop for Memory {
    fn drop(&mut self) {
        let attached = std::mem::take(&mut self.state.get_mut().attached);
        for future in attached {
            if let Err(error) = future.resolve() {
                tracing::warn!(%error, "background task failed after its scope was dropped");
            }
        }
    }
}

impl std::fmt::Debug for Memory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Memory")
            .field("slots", &state.slots.len())
            .field("finals", &state.finals.len())
            .field("has_parent", &state.parent.is_some())
            .field("allow_mutables", &state.allow_mutables)
            .finish()
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests;
