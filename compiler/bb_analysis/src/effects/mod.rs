//! Per-block effect scanning and the call-graph fixpoint.

use crate::{AnalysisError, GroupMap, SymbolGroups};
use bb_ir::{BlockSpan, Command, OpCode, Program, SymbolId, SymbolTable};
use rayon::prelude::*;
use rustc_hash::{FxHashMap, FxHashSet};

/// What one block reads, writes and may invoke.
///
/// `uses` and `affects` hold symbol group representatives (see
/// [`GroupMap`]); `calls` holds the opener indices of invoked blocks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockEffects {
    pub uses: FxHashSet<usize>,
    pub affects: FxHashSet<usize>,
    pub calls: FxHashSet<usize>,
    pub parallel: bool,
}

/// Result of analyzing one program.
#[derive(Debug, Default)]
pub struct Analysis {
    blocks: FxHashMap<usize, BlockEffects>,
    groups: Option<GroupMap>,
    iterations: usize,
}

impl Analysis {
    /// Effects of the block opened at `begin`.
    pub fn block(&self, begin: usize) -> Option<&BlockEffects> {
        self.blocks.get(&begin)
    }

    /// Whether calls to the block opened at `begin` may run concurrently.
    #[inline]
    pub fn is_parallel(&self, begin: usize) -> bool {
        self.blocks.get(&begin).is_some_and(|b| b.parallel)
    }

    pub fn parallel_count(&self) -> usize {
        self.blocks.values().filter(|b| b.parallel).count()
    }

    /// Group of `symbol` as seen by this analysis.
    pub fn group(&self, symbol: SymbolId) -> usize {
        self.groups
            .as_ref()
            .map_or(symbol.index(), |groups| groups.group(symbol))
    }

    /// Rounds the fixpoint needed to converge.
    pub fn iterations(&self) -> usize {
        self.iterations
    }
}

/// Load `source` and analyze it in one step.
pub fn analyze_source(
    source: &str,
    path: &str,
    symbols: &SymbolTable,
) -> Result<(Program, Analysis), AnalysisError> {
    let program = Program::parse(source, path, symbols)?;
    let analysis = analyze(&program, symbols)?;
    Ok((program, analysis))
}

/// Run every pass over `program`.
pub fn analyze(program: &Program, symbols: &SymbolTable) -> Result<Analysis, AnalysisError> {
    check_definitions(program, symbols)?;

    let groups = build_groups(program);
    let bindings = bind_blocks(program, &groups);
    let overloads = OverloadGroups::new(symbols, &groups);
    let spans = program.blocks();

    let scanner = Scanner {
        program,
        groups: &groups,
        bindings: &bindings,
        overloads: &overloads,
    };

    let scanned: Vec<(usize, BlockEffects)> = spans
        .par_iter()
        .map(|span| (span.begin, scanner.scan(*span)))
        .collect();
    let mut blocks: FxHashMap<usize, BlockEffects> = scanned.into_iter().collect();

    let iterations = propagate(&mut blocks);

    // Top-level code runs alongside every background call, so its writes
    // count as mutations too. Its callees are already in `blocks`.
    let top_level = scanner.scan(program.root());
    let mutated: FxHashSet<usize> = blocks
        .values()
        .flat_map(|b| b.affects.iter().copied())
        .chain(top_level.affects)
        .collect();
    for effects in blocks.values_mut() {
        effects.parallel = effects.affects.is_empty() && effects.uses.is_disjoint(&mutated);
    }

    let analysis = Analysis {
        blocks,
        groups: Some(groups),
        iterations,
    };
    tracing::debug!(
        blocks = spans.len(),
        iterations,
        parallel = analysis.parallel_count(),
        "analyzed program"
    );
    Ok(analysis)
}

/// Every operand read by some instruction must be written somewhere.
fn check_definitions(program: &Program, symbols: &SymbolTable) -> Result<(), AnalysisError> {
    let mut defined: FxHashSet<SymbolId> = [
        SymbolId::THIS,
        SymbolId::ARGS,
        SymbolId::NONE,
        SymbolId::CALL,
        SymbolId::CONSOLE,
    ]
    .into_iter()
    .collect();
    for command in program.commands() {
        defined.insert(command.dest());
        if matches!(command.op, OpCode::Set | OpCode::SetFinal) {
            defined.insert(command.arg(2));
        }
    }

    for command in program.commands() {
        if let Some(missing) = command.sources().iter().find(|s| !defined.contains(s)) {
            return Err(AnalysisError::UndefinedSymbol {
                name: symbols.name(*missing).to_string(),
                line: command.origin.line,
            });
        }
    }
    Ok(())
}

fn build_groups(program: &Program) -> GroupMap {
    let mut groups = SymbolGroups::new();
    for command in program.commands() {
        match command.op {
            OpCode::Is | OpCode::As => groups.union(command.dest(), command.arg(1)),
            OpCode::Get => groups.union(command.dest(), command.arg(2)),
            OpCode::Set | OpCode::SetFinal => groups.union(command.arg(2), command.arg(3)),
            _ => {}
        }
    }
    groups.freeze()
}

/// Group to the blocks that may be bound to it.
fn bind_blocks(program: &Program, groups: &GroupMap) -> FxHashMap<usize, Vec<usize>> {
    let mut bindings: FxHashMap<usize, Vec<usize>> = FxHashMap::default();
    for span in program.blocks() {
        let dest = program.command(span.begin).dest();
        bindings.entry(groups.group(dest)).or_default().push(span.begin);
    }
    bindings
}

/// Groups of the overload fields that exist in this program.
struct OverloadGroups {
    direct: FxHashMap<OpCode, usize>,
    mirrored: FxHashMap<OpCode, usize>,
}

impl OverloadGroups {
    fn new(symbols: &SymbolTable, groups: &GroupMap) -> Self {
        let mut direct = FxHashMap::default();
        let mut mirrored = FxHashMap::default();
        for &op in OpCode::ALL {
            if let Some(id) = op.overload_name().and_then(|n| symbols.lookup(n)) {
                direct.insert(op, groups.group(id));
            }
            if let Some(id) = op.mirrored_overload_name().and_then(|n| symbols.lookup(n)) {
                mirrored.insert(op, groups.group(id));
            }
        }
        OverloadGroups { direct, mirrored }
    }

    fn for_op(&self, op: OpCode) -> impl Iterator<Item = usize> + '_ {
        self.direct
            .get(&op)
            .into_iter()
            .chain(self.mirrored.get(&op))
            .copied()
    }
}

struct Scanner<'a> {
    program: &'a Program,
    groups: &'a GroupMap,
    bindings: &'a FxHashMap<usize, Vec<usize>>,
    overloads: &'a OverloadGroups,
}

impl Scanner<'_> {
    /// Direct effects of the instructions of `span`, nested blocks excluded.
    fn scan(&self, span: BlockSpan) -> BlockEffects {
        let mut effects = BlockEffects::default();
        let mut i = span.start;
        while i < span.end {
            let command = self.program.command(i);
            if command.op.opens_block() {
                i = self.program.block(i).map_or(span.end, |b| b.end + 1);
                continue;
            }
            self.record(command, &mut effects);
            i += 1;
        }
        effects
    }

    fn calls_through(&self, symbol: SymbolId, effects: &mut BlockEffects) {
        if symbol.is_none() {
            return;
        }
        if let Some(targets) = self.bindings.get(&self.groups.group(symbol)) {
            effects.calls.extend(targets.iter().copied());
        }
    }

    fn record(&self, command: &Command, effects: &mut BlockEffects) {
        let group = |symbol: SymbolId| self.groups.group(symbol);

        for overload in self.overloads.for_op(command.op) {
            effects.uses.insert(overload);
            if let Some(targets) = self.bindings.get(&overload) {
                effects.calls.extend(targets.iter().copied());
            }
        }

        match command.op {
            OpCode::Get => {
                effects.uses.insert(group(command.arg(2)));
            }
            OpCode::At | OpCode::Len => {
                effects.uses.insert(group(command.arg(1)));
            }
            OpCode::Set | OpCode::SetFinal => {
                effects.affects.insert(group(command.arg(2)));
            }
            OpCode::Push | OpCode::Pop | OpCode::Put | OpCode::Next | OpCode::Clear | OpCode::Move => {
                // Each invocation owns its argument list.
                if !command.arg(1).is_per_invocation() {
                    effects.affects.insert(group(command.arg(1)));
                }
            }
            OpCode::Print | OpCode::Read => {
                effects.affects.insert(group(SymbolId::CONSOLE));
            }
            OpCode::Call => {
                self.calls_through(command.arg(1), effects);
                self.calls_through(command.arg(2), effects);
                // The callee may be a struct, which runs its `\call` field.
                effects.uses.insert(group(SymbolId::CALL));
                self.calls_through(SymbolId::CALL, effects);
            }
            OpCode::Inline
            | OpCode::If
            | OpCode::While
            | OpCode::Try
            | OpCode::Catch
            | OpCode::Default
            | OpCode::New
            | OpCode::Defer => {
                for source in command.sources() {
                    self.calls_through(*source, effects);
                }
            }
            _ => {}
        }
    }
}

/// Flow uses and affects from callees into callers until stable.
fn propagate(blocks: &mut FxHashMap<usize, BlockEffects>) -> usize {
    let order: Vec<usize> = {
        let mut keys: Vec<usize> = blocks.keys().copied().collect();
        keys.sort_unstable();
        keys
    };
    let mut iterations = 0;
    loop {
        iterations += 1;
        let mut changed = false;
        for &begin in &order {
            let Some(calls) = blocks.get(&begin).map(|b| b.calls.clone()) else {
                continue;
            };
            let mut uses = FxHashSet::default();
            let mut affects = FxHashSet::default();
            for callee in calls {
                if let Some(effects) = blocks.get(&callee) {
                    uses.extend(effects.uses.iter().copied());
                    affects.extend(effects.affects.iter().copied());
                }
            }
            if let Some(effects) = blocks.get_mut(&begin) {
                let before = effects.uses.len() + effects.affects.len();
                effects.uses.extend(uses);
                effects.affects.extend(affects);
                changed |= effects.uses.len() + effects.affects.len() != before;
            }
        }
        if !changed {
            return iterations;
        }
    }
}
