//! `VmBuilder` for creating [`Vm`] instances.

use super::{Vm, VmShared};
use crate::concurrency::ThreadGate;
use crate::console::{stdout_console, SharedConsole};
use crate::jit::{JitProbe, ReturnLiteralProbe};
use crate::memory::Memory;
use bb_ir::{SharedSymbols, SymbolTable};
use parking_lot::{Mutex, ReentrantMutex};
use rustc_hash::FxHashSet;
use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use std::time::Instant;

/// Tunables of a [`Vm`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VmConfig {
    /// Background threads allowed at once. `0` runs every call inline.
    pub max_threads: usize,
}

/// Builder for [`Vm`].
///
/// Defaults: no background threads, stdout console, the literal-return
/// accelerator, a fresh symbol table.
pub struct VmBuilder {
    config: VmConfig,
    console: Option<SharedConsole>,
    symbols: Option<SharedSymbols>,
    probes: Vec<Arc<dyn JitProbe>>,
}

impl VmBuilder {
    pub fn new() -> Self {
        VmBuilder {
            config: VmConfig::default(),
            console: None,
            symbols: None,
            probes: vec![Arc::new(ReturnLiteralProbe)],
        }
    }

    #[must_use]
    pub fn config(mut self, config: VmConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn max_threads(mut self, max_threads: usize) -> Self {
        self.config.max_threads = max_threads;
        self
    }

    /// Where `print` writes and `read` reads.
    #[must_use]
    pub fn console(mut self, console: SharedConsole) -> Self {
        self.console = Some(console);
        self
    }

    /// Share an existing symbol table (programs loaded elsewhere).
    #[must_use]
    pub fn symbols(mut self, symbols: SharedSymbols) -> Self {
        self.symbols = Some(symbols);
        self
    }

    /// Register an additional block accelerator.
    #[must_use]
    pub fn jit_probe(mut self, probe: Arc<dyn JitProbe>) -> Self {
        self.probes.push(probe);
        self
    }

    /// Drop every accelerator, including the built-in one.
    #[must_use]
    pub fn without_jit(mut self) -> Self {
        self.probes.clear();
        self
    }

    pub fn build(self) -> Vm {
        let symbols = self.symbols.unwrap_or_else(SymbolTable::shared);
        Vm {
            shared: Arc::new(VmShared {
                gate: ThreadGate::new(self.config.max_threads),
                cache: Memory::root(Arc::clone(&symbols)),
                symbols,
                console: self.console.unwrap_or_else(stdout_console),
                cached_blocks: Mutex::new(FxHashSet::default()),
                cache_lock: ReentrantMutex::new(()),
                probes: self.probes,
                started: Instant::now(),
                next_program: AtomicU64::new(0),
                config: self.config,
            }),
        }
    }
}

impl Default for VmBuilder {
    fn default() -> Self {
        Self::new()
    }
}
