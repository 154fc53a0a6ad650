//! Static side-effect analysis for bbvm programs.
//!
//! Runs once per program, before execution. The analysis answers one
//! question per code block: can a call to this block run on a background
//! thread without observing or causing any visible mutation?
//!
//! # Passes
//!
//! 1. **Well-formedness**: every operand must be defined somewhere in the
//!    program (or be a reserved symbol). `BEGIN`/`END` balance is checked
//!    when the bytecode is loaded.
//! 2. **Grouping**: a union-find merges symbols that may alias each other
//!    (`IS`/`AS` assignments, values flowing through `get`/`set` fields).
//! 3. **Scanning**: each block records the groups it reads (`uses`), the
//!    groups it mutates (`affects`) and the blocks it may invoke (`calls`).
//!    Blocks are scanned in parallel.
//! 4. **Fixpoint**: uses and affects flow backwards along call edges until
//!    nothing changes.
//! 5. **Eligibility**: a block is parallel-eligible iff it affects nothing
//!    and uses no group that any block affects.
//!
//! Grouping is program-wide and deliberately coarse: two unrelated struct
//! fields that share a name share a group.

mod effects;
mod errors;
mod groups;

pub use effects::{analyze, analyze_source, Analysis, BlockEffects};
pub use errors::AnalysisError;
pub use groups::{GroupMap, SymbolGroups};
