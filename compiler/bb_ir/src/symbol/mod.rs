//! Symbol interning.
//!
//! Every identifier that appears in bytecode (variables, struct fields,
//! operator overload names) maps to a dense [`SymbolId`]. A handful of ids
//! are reserved and have the same value in every table, which lets the
//! interpreter refer to them without a lookup.

use crate::BytecodeError;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::Arc;

/// Interned identifier.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolId(u32);

impl SymbolId {
    /// The struct receiver.
    pub const THIS: SymbolId = SymbolId(0);
    /// Positional argument list of a call.
    pub const ARGS: SymbolId = SymbolId(1);
    /// Placeholder operand: "no destination" or "no argument".
    pub const NONE: SymbolId = SymbolId(2);
    /// Field consulted when a struct is called like a function.
    pub const CALL: SymbolId = SymbolId(3);
    /// Pseudo-field written by console input/output.
    pub const CONSOLE: SymbolId = SymbolId(4);

    const RESERVED: [(SymbolId, &'static str); 5] = [
        (Self::THIS, "this"),
        (Self::ARGS, "args"),
        (Self::NONE, "#"),
        (Self::CALL, "\\call"),
        (Self::CONSOLE, "\\console"),
    ];

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub fn is_none(self) -> bool {
        self == Self::NONE
    }

    /// Bindings that every invocation creates for itself.
    #[inline]
    pub fn is_per_invocation(self) -> bool {
        self == Self::THIS || self == Self::ARGS
    }
}

impl fmt::Display for SymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}", self.0)
    }
}

#[derive(Default)]
struct SymbolStore {
    ids: FxHashMap<Arc<str>, SymbolId>,
    names: Vec<Arc<str>>,
}

/// Thread-safe bidirectional map between names and [`SymbolId`]s.
pub struct SymbolTable {
    store: RwLock<SymbolStore>,
}

/// Symbol table shared by a program and the VM that runs it.
pub type SharedSymbols = Arc<SymbolTable>;

impl SymbolTable {
    /// Create a table holding only the reserved symbols.
    pub fn new() -> Self {
        let mut store = SymbolStore::default();
        for (id, name) in SymbolId::RESERVED {
            let name: Arc<str> = Arc::from(name);
            debug_assert_eq!(id.index(), store.names.len());
            store.ids.insert(Arc::clone(&name), id);
            store.names.push(name);
        }
        SymbolTable {
            store: RwLock::new(store),
        }
    }

    pub fn shared() -> SharedSymbols {
        Arc::new(Self::new())
    }

    /// Intern `name`, failing only if the id space is exhausted.
    pub fn try_intern(&self, name: &str) -> Result<SymbolId, BytecodeError> {
        if let Some(&id) = self.store.read().ids.get(name) {
            return Ok(id);
        }

        let mut store = self.store.write();
        // Another thread may have won the race between the two locks.
        if let Some(&id) = store.ids.get(name) {
            return Ok(id);
        }
        let count = store.names.len();
        let id = SymbolId(u32::try_from(count).map_err(|_| BytecodeError::SymbolOverflow { count })?);
        let name: Arc<str> = Arc::from(name);
        store.ids.insert(Arc::clone(&name), id);
        store.names.push(name);
        Ok(id)
    }

    /// Intern `name`.
    ///
    /// # Panics
    /// Panics if more than `u32::MAX` distinct symbols are interned.
    pub fn intern(&self, name: &str) -> SymbolId {
        self.try_intern(name).unwrap_or_else(|e| panic!("{e}"))
    }

    /// Find an already interned name.
    pub fn lookup(&self, name: &str) -> Option<SymbolId> {
        self.store.read().ids.get(name).copied()
    }

    /// Name of `id`, or a placeholder for ids from another table.
    pub fn name(&self, id: SymbolId) -> Arc<str> {
        self.store
            .read()
            .names
            .get(id.index())
            .cloned()
            .unwrap_or_else(|| Arc::from(format!("<symbol {}>", id.0).as_str()))
    }

    pub fn len(&self) -> usize {
        self.store.read().names.len()
    }

    pub fn is_empty(&self) -> bool {
        // Reserved symbols are always present.
        false
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SymbolTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SymbolTable")
            .field("len", &self.len())
            .finish()
    }
}
