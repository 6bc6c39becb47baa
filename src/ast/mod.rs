//! The `ast` module defines the Esterel program representation consumed by the
//! printers. A [`Module`] owns arena storage for every entity family (symbols,
//! statements, expressions) plus the ordered declaration lists the concrete
//! syntax needs; everything else refers to those entities through typed arena
//! ids, never through owning links.
//!
//! # Overview
//!
//! - **Module**: symbol tables, input relations, and the body statement tree.
//! - **Symbols**: types, constants, variables, signals, functions, procedures
//!   and tasks, each in its own arena. Builtin symbols are carried in the
//!   tables but suppressed from declaration dumps.
//! - **StmtKind** / **ExprKind**: closed variant sets for the statement and
//!   expression trees. Dispatch is by exhaustive `match`, so an unrecognized
//!   variant is a compile-time defect rather than a runtime surprise.
//!
//! This crate never builds or validates programs; upstream phases construct a
//! `Module` through the `add_*` helpers and hand it over read-only.

use id_arena::{Arena, Id};

// Arena-based IDs - keep these public for external use
pub type TypeId = Id<TypeSymbol>;
pub type ConstantId = Id<ConstantSymbol>;
pub type VariableId = Id<VariableSymbol>;
pub type SignalId = Id<SignalSymbol>;
pub type FunctionId = Id<FunctionSymbol>;
pub type ProcedureId = Id<ProcedureSymbol>;
pub type TaskId = Id<TaskSymbol>;
pub type ExprId = Id<ExprKind>;
pub type StmtId = Id<StmtKind>;

/// A single Esterel module: symbol tables in declaration order, input
/// relations, and the body statement.
#[derive(Debug, Default)]
pub struct Module {
    pub name: String,

    // Arena storage - public for read access
    pub types: Arena<TypeSymbol>,
    pub constants: Arena<ConstantSymbol>,
    pub variables: Arena<VariableSymbol>,
    pub signals: Arena<SignalSymbol>,
    pub functions: Arena<FunctionSymbol>,
    pub procedures: Arena<ProcedureSymbol>,
    pub tasks: Arena<TaskSymbol>,
    pub exprs: Arena<ExprKind>,
    pub stmts: Arena<StmtKind>,

    // Declaration order for the interface dump - this order is a contract
    pub type_decls: Vec<TypeId>,
    pub constant_decls: Vec<ConstantId>,
    pub function_decls: Vec<FunctionId>,
    pub procedure_decls: Vec<ProcedureId>,
    pub task_decls: Vec<TaskId>,
    pub signal_decls: Vec<SignalId>,

    pub relations: Vec<InputRelation>,

    pub body: Option<StmtId>,
}

impl Module {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn add_type(&mut self, sym: TypeSymbol) -> TypeId {
        let builtin = sym.builtin;
        let id = self.types.alloc(sym);
        if !builtin {
            self.type_decls.push(id);
        }
        id
    }

    pub fn add_constant(&mut self, sym: ConstantSymbol) -> ConstantId {
        let builtin = sym.builtin;
        let id = self.constants.alloc(sym);
        if !builtin {
            self.constant_decls.push(id);
        }
        id
    }

    pub fn add_variable(&mut self, sym: VariableSymbol) -> VariableId {
        self.variables.alloc(sym)
    }

    /// Interface signals land in the declaration dump; locally scoped and
    /// trap signals are reachable only through their `signal`/`trap`
    /// statement.
    pub fn add_signal(&mut self, sym: SignalSymbol) -> SignalId {
        let declare = !sym.builtin && sym.kind.is_interface();
        let id = self.signals.alloc(sym);
        if declare {
            self.signal_decls.push(id);
        }
        id
    }

    pub fn add_function(&mut self, sym: FunctionSymbol) -> FunctionId {
        let builtin = sym.builtin;
        let id = self.functions.alloc(sym);
        if !builtin {
            self.function_decls.push(id);
        }
        id
    }

    pub fn add_procedure(&mut self, sym: ProcedureSymbol) -> ProcedureId {
        let id = self.procedures.alloc(sym);
        self.procedure_decls.push(id);
        id
    }

    pub fn add_task(&mut self, sym: TaskSymbol) -> TaskId {
        let id = self.tasks.alloc(sym);
        self.task_decls.push(id);
        id
    }

    pub fn expr(&mut self, kind: ExprKind) -> ExprId {
        self.exprs.alloc(kind)
    }

    pub fn stmt(&mut self, kind: StmtKind) -> StmtId {
        self.stmts.alloc(kind)
    }
}

#[derive(Debug, Clone)]
pub struct TypeSymbol {
    pub name: String,
    pub builtin: bool,
}

impl TypeSymbol {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            builtin: false,
        }
    }

    pub fn builtin(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            builtin: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConstantSymbol {
    pub name: String,
    /// Required at declaration-print time; `None` is an internal fault.
    pub ty: Option<TypeId>,
    pub initializer: Option<ExprId>,
    pub builtin: bool,
}

#[derive(Debug, Clone)]
pub struct VariableSymbol {
    pub name: String,
    /// Required at declaration-print time; `None` is an internal fault.
    pub ty: Option<TypeId>,
    pub initializer: Option<ExprId>,
}

/// What role a signal plays. Interface kinds appear in the module's
/// declaration dump; `Local` and `Trap` signals only ever appear inside a
/// `signal`/`trap` scope statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalKind {
    Input,
    Output,
    InputOutput,
    Sensor,
    Return,
    Local,
    Trap,
}

impl SignalKind {
    pub fn is_interface(self) -> bool {
        !matches!(self, SignalKind::Local | SignalKind::Trap)
    }
}

#[derive(Debug, Clone)]
pub struct SignalSymbol {
    pub name: String,
    pub kind: SignalKind,
    pub ty: Option<TypeId>,
    pub initializer: Option<ExprId>,
    /// Combine function for multiply-emitted valued signals.
    pub combine: Option<FunctionId>,
    pub builtin: bool,
}

impl SignalSymbol {
    /// A pure (valueless) signal of the given kind.
    pub fn pure(name: impl Into<String>, kind: SignalKind) -> Self {
        Self {
            name: name.into(),
            kind,
            ty: None,
            initializer: None,
            combine: None,
            builtin: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FunctionSymbol {
    pub name: String,
    pub arguments: Vec<TypeId>,
    pub result: TypeId,
    pub builtin: bool,
}

#[derive(Debug, Clone)]
pub struct ProcedureSymbol {
    pub name: String,
    pub reference_arguments: Vec<TypeId>,
    pub value_arguments: Vec<TypeId>,
}

#[derive(Debug, Clone)]
pub struct TaskSymbol {
    pub name: String,
    pub reference_arguments: Vec<TypeId>,
    pub value_arguments: Vec<TypeId>,
}

/// Exclusion or implication constraint between interface signals.
#[derive(Debug, Clone)]
pub enum InputRelation {
    /// `relation A # B # C;`
    Exclusion(Vec<SignalId>),
    /// `relation A => B;`
    Implication {
        predicate: SignalId,
        implication: SignalId,
    },
}

/// A `(guard, optional body)` pair used by the multi-case constructs
/// (`present`, `abort`, `await`, `if`, trap handlers).
#[derive(Debug, Clone)]
pub struct PredicatedStatement {
    pub predicate: ExprId,
    pub body: Option<StmtId>,
}

/// One task-call case of an `exec` statement.
#[derive(Debug, Clone)]
pub struct TaskCall {
    pub task: TaskId,
    pub reference_args: Vec<VariableId>,
    pub value_args: Vec<ExprId>,
    /// Return signal awaited for task completion.
    pub signal: SignalId,
    pub body: Option<StmtId>,
}

// Renaming entries for `run`.

#[derive(Debug, Clone)]
pub struct TypeRenaming {
    pub new_type: TypeId,
    pub old_name: String,
}

#[derive(Debug, Clone)]
pub struct ConstantRenaming {
    pub new_value: ExprId,
    pub old_name: String,
}

#[derive(Debug, Clone)]
pub struct FunctionRenaming {
    pub new_func: FunctionId,
    pub old_name: String,
}

#[derive(Debug, Clone)]
pub struct ProcedureRenaming {
    pub new_proc: ProcedureId,
    pub old_name: String,
}

#[derive(Debug, Clone)]
pub struct TaskRenaming {
    pub new_task: TaskId,
    pub old_name: String,
}

#[derive(Debug, Clone)]
pub struct SignalRenaming {
    pub new_sig: SignalId,
    pub old_name: String,
}

/// Module instantiation with its renaming lists.
#[derive(Debug, Clone, Default)]
pub struct RunStatement {
    pub new_name: String,
    pub old_name: String,
    pub types: Vec<TypeRenaming>,
    pub constants: Vec<ConstantRenaming>,
    pub functions: Vec<FunctionRenaming>,
    pub procedures: Vec<ProcedureRenaming>,
    pub tasks: Vec<TaskRenaming>,
    pub signals: Vec<SignalRenaming>,
}

impl RunStatement {
    pub fn renaming_count(&self) -> usize {
        self.types.len()
            + self.constants.len()
            + self.functions.len()
            + self.procedures.len()
            + self.tasks.len()
            + self.signals.len()
    }
}

/// The closed statement variant set.
#[derive(Debug, Clone)]
pub enum StmtKind {
    Nothing,
    Pause,
    Halt,
    Emit {
        signal: SignalId,
        value: Option<ExprId>,
    },
    Sustain {
        signal: SignalId,
        value: Option<ExprId>,
    },
    Assign {
        variable: VariableId,
        value: ExprId,
    },
    ProcedureCall {
        procedure: ProcedureId,
        reference_args: Vec<VariableId>,
        value_args: Vec<ExprId>,
    },
    Exec {
        calls: Vec<TaskCall>,
    },
    Present {
        cases: Vec<PredicatedStatement>,
        default: Option<StmtId>,
    },
    If {
        cases: Vec<PredicatedStatement>,
        default: Option<StmtId>,
    },
    Loop {
        body: StmtId,
    },
    Repeat {
        count: ExprId,
        body: StmtId,
        is_positive: bool,
    },
    Abort {
        body: StmtId,
        cases: Vec<PredicatedStatement>,
        is_weak: bool,
    },
    Await {
        cases: Vec<PredicatedStatement>,
    },
    LoopEach {
        body: StmtId,
        predicate: ExprId,
    },
    Every {
        predicate: ExprId,
        body: StmtId,
    },
    Suspend {
        body: StmtId,
        predicate: ExprId,
    },
    DoWatching {
        body: StmtId,
        predicate: ExprId,
        timeout: Option<StmtId>,
    },
    DoUpto {
        body: StmtId,
        predicate: ExprId,
    },
    Trap {
        symbols: Vec<SignalId>,
        body: StmtId,
        handlers: Vec<PredicatedStatement>,
    },
    Exit {
        trap: SignalId,
        value: Option<ExprId>,
    },
    /// `var x := e : t, ... in body end var`
    Var {
        symbols: Vec<VariableId>,
        body: StmtId,
    },
    /// `signal s : t, ... in body end signal`
    Signal {
        symbols: Vec<SignalId>,
        body: StmtId,
    },
    Run(RunStatement),
    /// Sequential composition, `a; b; c`.
    Sequence(Vec<StmtId>),
    /// Concurrent composition, `a || b || c`.
    Parallel(Vec<StmtId>),
    /// GRC-level two-way branch in surface form.
    IfThenElse {
        predicate: ExprId,
        then_part: Option<StmtId>,
        else_part: Option<StmtId>,
    },
    /// GRC-level counter initialization.
    StartCounter {
        counter: usize,
        count: ExprId,
    },
    /// GRC-level counter test in statement position.
    CheckCounter {
        counter: usize,
        predicate: ExprId,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Not,
    Neg,
}

impl UnaryOp {
    pub fn text(self) -> &'static str {
        match self {
            UnaryOp::Not => "not",
            UnaryOp::Neg => "-",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    Neq,
    Lt,
    Gt,
    Lte,
    Gte,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl BinaryOp {
    pub fn text(self) -> &'static str {
        match self {
            BinaryOp::Or => "or",
            BinaryOp::And => "and",
            BinaryOp::Eq => "=",
            BinaryOp::Neq => "<>",
            BinaryOp::Lt => "<",
            BinaryOp::Gt => ">",
            BinaryOp::Lte => "<=",
            BinaryOp::Gte => ">=",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "mod",
        }
    }
}

/// The closed expression variant set.
#[derive(Debug, Clone)]
pub enum ExprKind {
    UnaryOp {
        op: UnaryOp,
        operand: ExprId,
    },
    BinaryOp {
        op: BinaryOp,
        left: ExprId,
        right: ExprId,
    },
    LoadVariable(VariableId),
    /// Presence test of a signal.
    LoadSignal(SignalId),
    /// Value read of a signal (`?S`) or trap (`??T`).
    LoadSignalValue(SignalId),
    Literal {
        value: String,
        /// Required at print time (drives string quoting); `None` is an
        /// internal fault.
        ty: Option<TypeId>,
    },
    FunctionCall {
        callee: FunctionId,
        arguments: Vec<ExprId>,
    },
    /// Temporal guard: an optional occurrence count (or `immediate`) over a
    /// signal expression.
    Delay {
        count: Option<ExprId>,
        predicate: ExprId,
        is_immediate: bool,
    },
    /// GRC-level counter test.
    CheckCounter {
        counter: usize,
        predicate: ExprId,
    },
}
