//! GRC model: the compiled control-flow graph of a module together with its
//! selection tree. Both live in arenas owned by [`GrcGraph`]; embedded guards
//! and actions refer back into the owning [`Module`](crate::ast::Module) by
//! id. The control-flow graph may be cyclic; the selection tree may share
//! sub-trees through [`StKind::Ref`].

use id_arena::{Arena, Id};

use crate::ast::{ExprId, SignalId, StmtId};

pub type GrcId = Id<GrcNode>;
pub type StId = Id<StNode>;

/// One control-flow node plus its ordered successor edges.
#[derive(Debug, Clone)]
pub struct GrcNode {
    pub kind: GrcKind,
    pub successors: Vec<GrcId>,
}

impl GrcNode {
    pub fn new(kind: GrcKind) -> Self {
        Self {
            kind,
            successors: Vec::new(),
        }
    }
}

/// The closed control-flow node variant set.
#[derive(Debug, Clone)]
pub enum GrcKind {
    /// Branch on the state recorded in a selection-tree node.
    Switch { selection: StId },
    /// Evaluate a guard and branch.
    Test { predicate: ExprId },
    /// Completion with a completion code.
    Terminate { code: u32 },
    /// Parallel-join point.
    Sync,
    /// Parallel-split point.
    Fork,
    /// An effectful statement.
    Action { statement: StmtId },
    /// Entry into a control state.
    Enter { state: StId },
    /// Suspension test tied to a selection-tree node.
    StSuspend { state: StId },
    /// Administrative: whole-graph entry.
    EnterGrc,
    /// Administrative: whole-graph exit.
    ExitGrc,
    /// Administrative: passthrough.
    Nop,
    /// Administrative: local-signal scope boundary.
    DefineSignal { signal: SignalId },
}

impl GrcKind {
    /// Bookkeeping nodes suppressed under the renderer's `clean` flag.
    pub fn is_administrative(&self) -> bool {
        matches!(
            self,
            GrcKind::EnterGrc | GrcKind::ExitGrc | GrcKind::Nop | GrcKind::DefineSignal { .. }
        )
    }
}

/// One selection-tree node.
#[derive(Debug, Clone)]
pub struct StNode {
    pub kind: StKind,
    pub children: Vec<StId>,
}

impl StNode {
    pub fn leaf() -> Self {
        Self {
            kind: StKind::Leaf,
            children: Vec::new(),
        }
    }
}

/// The closed selection-tree variant set.
#[derive(Debug, Clone)]
pub enum StKind {
    /// Exclusive choice among children.
    Excl,
    /// Concurrent children.
    Par,
    /// Childless active-state leaf.
    Leaf,
    /// Reference into a shared sub-tree, rendered once.
    Ref { target: StId },
}

/// A module's control-flow graph and selection tree.
#[derive(Debug, Default)]
pub struct GrcGraph {
    pub nodes: Arena<GrcNode>,
    pub st_nodes: Arena<StNode>,
    pub control_flow_root: Option<GrcId>,
    pub selection_root: Option<StId>,
}

impl GrcGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(&mut self, kind: GrcKind) -> GrcId {
        self.nodes.alloc(GrcNode::new(kind))
    }

    pub fn link(&mut self, from: GrcId, to: GrcId) {
        self.nodes[from].successors.push(to);
    }

    pub fn st_node(&mut self, kind: StKind, children: Vec<StId>) -> StId {
        self.st_nodes.alloc(StNode { kind, children })
    }
}
