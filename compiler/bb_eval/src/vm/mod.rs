//! The virtual machine handle.
//!
//! A [`Vm`] owns everything shared by all scopes and threads of a run: the
//! symbol table, the console, the thread gate, the value cache for
//! `BEGINCACHE` blocks and the registered accelerators. It is a cheap
//! `Clone` handle; background tasks carry their own copy.

mod builder;

pub use builder::{VmBuilder, VmConfig};

use crate::concurrency::ThreadGate;
use crate::console::SharedConsole;
use crate::data::CodeData;
use crate::errors::runtime;
use crate::interpreter::{close_scope, execute_block, Cx};
use crate::jit::{probe_block, JitProbe, Jitable};
use crate::memory::Memory;
use crate::{DataPtr, EvalError};
use bb_analysis::{analyze, Analysis, AnalysisError};
use bb_ir::{BytecodeError, Program, SharedSymbols};
use parking_lot::{Mutex, ReentrantMutex, ReentrantMutexGuard};
use rustc_hash::{FxHashMap, FxHashSet};
use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

/// Failure to load or run a program.
#[derive(Debug, Error)]
pub enum VmError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Bytecode(#[from] BytecodeError),

    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    #[error("{0}")]
    Eval(#[from] EvalError),
}

/// A parsed and analyzed program, ready to run.
pub struct LoadedProgram {
    id: u64,
    program: Program,
    analysis: Analysis,
    symbols: SharedSymbols,
    /// `BUILTIN` constants, indexed like the commands.
    literals: Vec<Option<DataPtr>>,
    /// Accelerators by block opener index.
    jits: FxHashMap<usize, Arc<dyn Jitable>>,
}

impl LoadedProgram {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn analysis(&self) -> &Analysis {
        &self.analysis
    }

    pub fn symbols(&self) -> &SharedSymbols {
        &self.symbols
    }

    #[inline]
    pub(crate) fn literal(&self, index: usize) -> Option<&DataPtr> {
        self.literals.get(index)?.as_ref()
    }

    pub(crate) fn jit(&self, begin: usize) -> Option<Arc<dyn Jitable>> {
        self.jits.get(&begin).cloned()
    }
}

impl fmt::Debug for LoadedProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedProgram")
            .field("id", &self.id)
            .field("path", self.program.path())
            .field("commands", &self.program.len())
            .field("accelerated", &self.jits.len())
            .finish_non_exhaustive()
    }
}

pub(crate) struct VmShared {
    symbols: SharedSymbols,
    console: SharedConsole,
    gate: Arc<ThreadGate>,
    cache: Arc<Memory>,
    /// `(program id, opener)` of cached blocks that already ran.
    cached_blocks: Mutex<FxHashSet<(u64, usize)>>,
    /// Serializes cached-block execution; reentrant so cached blocks may
    /// nest.
    cache_lock: ReentrantMutex<()>,
    probes: Vec<Arc<dyn JitProbe>>,
    started: Instant,
    next_program: AtomicU64,
    config: VmConfig,
}

/// Shared handle to one virtual machine.
#[derive(Clone)]
pub struct Vm {
    shared: Arc<VmShared>,
}

impl Vm {
    pub fn builder() -> VmBuilder {
        VmBuilder::new()
    }

    /// Machine with default settings: inline calls only, stdout console.
    pub fn new() -> Vm {
        VmBuilder::new().build()
    }

    pub fn symbols(&self) -> &SharedSymbols {
        &self.shared.symbols
    }

    pub fn console(&self) -> &SharedConsole {
        &self.shared.console
    }

    pub fn gate(&self) -> &Arc<ThreadGate> {
        &self.shared.gate
    }

    pub fn config(&self) -> &VmConfig {
        &self.shared.config
    }

    /// Scope holding the bindings produced by `BEGINCACHE` blocks.
    pub fn cache(&self) -> &Arc<Memory> {
        &self.shared.cache
    }

    /// Seconds since the machine was built.
    pub fn elapsed(&self) -> f64 {
        self.shared.started.elapsed().as_secs_f64()
    }

    /// Record that the cached block `(program, begin)` is about to run.
    /// Returns `false` if it already ran.
    pub(crate) fn mark_cached(&self, program: u64, begin: usize) -> bool {
        self.shared.cached_blocks.lock().insert((program, begin))
    }

    pub(crate) fn lock_cache(&self) -> ReentrantMutexGuard<'_, ()> {
        self.shared.cache_lock.lock()
    }

    /// Parse and analyze bytecode text.
    pub fn load(&self, source: &str, path: &str) -> Result<Arc<LoadedProgram>, VmError> {
        let program = Program::parse(source, path, &self.shared.symbols)?;
        let analysis = analyze(&program, &self.shared.symbols)?;
        let literals: Vec<Option<DataPtr>> = program
            .commands()
            .iter()
            .map(|command| command.literal.as_ref().map(DataPtr::from_literal))
            .collect();
        let jits: FxHashMap<usize, Arc<dyn Jitable>> = program
            .blocks()
            .into_iter()
            .filter_map(|span| {
                probe_block(&self.shared.probes, &program, &literals, span).map(|jit| (span.begin, jit))
            })
            .collect();
        let id = self.shared.next_program.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(
            path,
            id,
            commands = program.len(),
            parallel = analysis.parallel_count(),
            accelerated = jits.len(),
            "loaded program"
        );
        Ok(Arc::new(LoadedProgram {
            id,
            program,
            analysis,
            symbols: Arc::clone(&self.shared.symbols),
            literals,
            jits,
        }))
    }

    /// Read, parse and analyze a bytecode file.
    pub fn load_file(&self, path: &Path) -> Result<Arc<LoadedProgram>, VmError> {
        let source = std::fs::read_to_string(path).map_err(|source| VmError::Io {
            path: path.display().to_string(),
            source,
        })?;
        self.load(&source, &path.display().to_string())
    }

    /// Run `program` in a fresh root scope.
    ///
    /// Background tasks are joined and unhandled errors reported before
    /// this returns. A top-level `return` is an error.
    pub fn run(&self, program: &Arc<LoadedProgram>) -> Result<(), EvalError> {
        let memory = Memory::root(Arc::clone(&self.shared.symbols));
        let code = CodeData::root(program);
        let cx = Cx::new(self, &memory);
        let mut signal = false;
        let outcome = execute_block(&cx, &code, &mut signal);
        let outcome = match outcome {
            Ok(_) if signal => Err(runtime("The virtual machine cannot return a value")),
            other => other,
        };
        close_scope(&cx, &memory, outcome).map(drop)
    }

    /// Load and run bytecode text.
    pub fn run_source(&self, source: &str, path: &str) -> Result<(), VmError> {
        let program = self.load(source, path)?;
        self.run(&program)?;
        Ok(())
    }

    /// Release the cache scope, reporting unhandled errors left in it.
    pub fn shutdown(&self) -> Result<(), EvalError> {
        self.shared.cache.release(&DataPtr::missing())
    }
}

impl Default for Vm {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Vm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Vm")
            .field("symbols", &self.shared.symbols.len())
            .field("max_threads", &self.shared.config.max_threads)
            .field("active_threads", &self.shared.gate.active())
            .finish_non_exhaustive()
    }
}
