//! Concrete-syntax printer: serializes an already-validated AST subtree back
//! into Esterel text under a dialect chosen at construction. Bracket
//! minimization is driven by an explicit stack of minimum-binding-power
//! thresholds; statement sequencing and parallel composition get their own
//! reserved thresholds below every expression operator.

use std::collections::HashMap;
use std::io::Write;

use crate::ast::*;
use crate::error::{RenderError, RenderResult};

/// Surface dialect, fixed at printer construction. `V5` is the primary
/// notation (`present`, `[ ]` guards, initializer-before-type); `V7` is the
/// alternate (`if`, `( )` guards, type-before-initializer).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    V5,
    V7,
}

/// Reserved threshold for sequential composition. Below the root threshold,
/// above parallel, so sequences themselves are never bracketed.
const SEQUENTIAL_PRECEDENCE: i32 = -1;
/// Reserved threshold for parallel composition. The lowest of all, so a
/// parallel block nested under anything else comes out as `[ ... || ... ]`.
const PARALLEL_PRECEDENCE: i32 = -2;

/// Stack of minimum-binding-power thresholds; root threshold is 0.
#[derive(Debug)]
pub(crate) struct PrecedenceStack {
    stack: Vec<i32>,
}

impl PrecedenceStack {
    pub(crate) fn new() -> Self {
        Self { stack: vec![0] }
    }

    /// Returns whether the construct at power `p` needs enclosing brackets,
    /// then makes `p` the threshold for its operands.
    pub(crate) fn push(&mut self, p: i32) -> bool {
        let needs_brackets = p < *self.stack.last().unwrap_or(&0);
        self.stack.push(p);
        needs_brackets
    }

    pub(crate) fn pop(&mut self) {
        self.stack.pop();
    }
}

pub struct EsterelPrinter<'m, 'w, W: Write> {
    out: &'w mut W,
    module: &'m Module,
    dialect: Dialect,
    indent: usize,
    precedence: PrecedenceStack,
    binary_level: HashMap<BinaryOp, i32>,
    unary_level: HashMap<UnaryOp, i32>,
}

/// Unparses a whole module: header, symbol tables in the fixed order types,
/// constants, functions, procedures, tasks, signals, then input relations,
/// body, footer.
pub fn write_module<W: Write>(
    writer: &mut W,
    module: &Module,
    dialect: Dialect,
) -> RenderResult<()> {
    tracing::debug!(module = %module.name, ?dialect, "unparsing module");
    EsterelPrinter::new(writer, module, dialect).print_module()
}

/// Unparses a sequence of modules into one document. Under the V7 dialect a
/// lone module is marked `main`.
pub fn write_modules<W: Write>(
    writer: &mut W,
    modules: &[Module],
    dialect: Dialect,
) -> RenderResult<()> {
    for (i, module) in modules.iter().enumerate() {
        if dialect == Dialect::V7 && modules.len() == 1 {
            write!(writer, "main ")?;
        }
        write_module(writer, module, dialect)?;
        if i + 1 != modules.len() {
            writeln!(writer)?;
        }
    }
    Ok(())
}

/// Renders one statement subtree to a string.
pub fn statement_to_string(
    module: &Module,
    stmt: StmtId,
    dialect: Dialect,
) -> RenderResult<String> {
    let mut buf = Vec::new();
    EsterelPrinter::new(&mut buf, module, dialect).print_statement(stmt)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Renders one expression subtree to a string.
pub fn expression_to_string(
    module: &Module,
    expr: ExprId,
    dialect: Dialect,
) -> RenderResult<String> {
    let mut buf = Vec::new();
    EsterelPrinter::new(&mut buf, module, dialect).print_expression(expr)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

impl<'m, 'w, W: Write> EsterelPrinter<'m, 'w, W> {
    pub fn new(writer: &'w mut W, module: &'m Module, dialect: Dialect) -> Self {
        let mut binary_level = HashMap::new();
        binary_level.insert(BinaryOp::Or, 1);
        binary_level.insert(BinaryOp::And, 2);
        binary_level.insert(BinaryOp::Eq, 4);
        binary_level.insert(BinaryOp::Neq, 4);
        binary_level.insert(BinaryOp::Lt, 4);
        binary_level.insert(BinaryOp::Gt, 4);
        binary_level.insert(BinaryOp::Lte, 4);
        binary_level.insert(BinaryOp::Gte, 4);
        binary_level.insert(BinaryOp::Add, 5);
        binary_level.insert(BinaryOp::Sub, 5);
        binary_level.insert(BinaryOp::Mul, 6);
        binary_level.insert(BinaryOp::Div, 6);
        binary_level.insert(BinaryOp::Mod, 6);

        let mut unary_level = HashMap::new();
        unary_level.insert(UnaryOp::Not, 3);
        unary_level.insert(UnaryOp::Neg, 7);

        Self {
            out: writer,
            module,
            dialect,
            indent: 0,
            precedence: PrecedenceStack::new(),
            binary_level,
            unary_level,
        }
    }

    fn tab(&mut self) -> RenderResult<()> {
        write!(self.out, "{}", "  ".repeat(self.indent))?;
        Ok(())
    }

    /// Prints a nested statement on its own indented block:
    /// newline, indent, body, newline, dedent.
    fn statement_block(&mut self, stmt: StmtId) -> RenderResult<()> {
        writeln!(self.out)?;
        self.indent += 1;
        self.tab()?;
        self.print_statement(stmt)?;
        writeln!(self.out)?;
        self.indent -= 1;
        self.tab()?;
        Ok(())
    }

    fn type_name(&self, ty: Option<TypeId>, context: &'static str) -> RenderResult<&'m str> {
        let id = ty.ok_or(RenderError::MissingReference {
            what: "type",
            context,
        })?;
        Ok(&self.module.types[id].name)
    }

    fn binary_precedence(&self, op: BinaryOp) -> RenderResult<i32> {
        self.binary_level
            .get(&op)
            .copied()
            .ok_or_else(|| RenderError::UnknownOperator {
                op: op.text().to_string(),
            })
    }

    fn unary_precedence(&self, op: UnaryOp) -> RenderResult<i32> {
        self.unary_level
            .get(&op)
            .copied()
            .ok_or_else(|| RenderError::UnknownOperator {
                op: op.text().to_string(),
            })
    }

    // ---- module interface -------------------------------------------------

    pub fn print_module(&mut self) -> RenderResult<()> {
        let m = self.module;
        self.tab()?;
        writeln!(self.out, "module {}:", m.name)?;

        for &id in &m.type_decls {
            writeln!(self.out, "type {};", m.types[id].name)?;
        }
        for &id in &m.constant_decls {
            self.print_constant_decl(id)?;
        }
        for &id in &m.function_decls {
            self.print_function_decl(id)?;
        }
        for &id in &m.procedure_decls {
            self.print_procedure_decl(id)?;
        }
        for &id in &m.task_decls {
            self.print_task_decl(id)?;
        }
        for &id in &m.signal_decls {
            self.print_signal_decl(id)?;
        }
        for relation in &m.relations {
            self.print_relation(relation)?;
        }

        let body = m.body.ok_or(RenderError::MissingReference {
            what: "body statement",
            context: "module",
        })?;
        writeln!(self.out)?;
        self.tab()?;
        self.print_statement(body)?;
        write!(self.out, "\n\n")?;
        self.tab()?;
        writeln!(self.out, "end module")?;
        Ok(())
    }

    fn print_constant_decl(&mut self, id: ConstantId) -> RenderResult<()> {
        let m = self.module;
        let sym = &m.constants[id];
        let ty = self.type_name(sym.ty, "constant declaration")?;
        write!(self.out, "constant {}", sym.name)?;
        match self.dialect {
            Dialect::V7 => {
                write!(self.out, " : {}", ty)?;
                if let Some(init) = sym.initializer {
                    write!(self.out, " = ")?;
                    self.print_expression(init)?;
                }
            }
            Dialect::V5 => {
                if let Some(init) = sym.initializer {
                    write!(self.out, " = ")?;
                    self.print_expression(init)?;
                }
                write!(self.out, " : {}", ty)?;
            }
        }
        writeln!(self.out, ";")?;
        Ok(())
    }

    fn print_function_decl(&mut self, id: FunctionId) -> RenderResult<()> {
        let m = self.module;
        let sym = &m.functions[id];
        write!(self.out, "function {}(", sym.name)?;
        for (i, &arg) in sym.arguments.iter().enumerate() {
            if i > 0 {
                write!(self.out, ", ")?;
            }
            write!(self.out, "{}", m.types[arg].name)?;
        }
        writeln!(self.out, ") : {};", m.types[sym.result].name)?;
        Ok(())
    }

    fn print_procedure_decl(&mut self, id: ProcedureId) -> RenderResult<()> {
        let m = self.module;
        let sym = &m.procedures[id];
        write!(self.out, "procedure {}(", sym.name)?;
        match self.dialect {
            Dialect::V7 => {
                let mut need_comma = false;
                for &arg in &sym.reference_arguments {
                    if need_comma {
                        write!(self.out, ", ")?;
                    }
                    write!(self.out, "inout {}", m.types[arg].name)?;
                    need_comma = true;
                }
                for &arg in &sym.value_arguments {
                    if need_comma {
                        write!(self.out, ", ")?;
                    }
                    write!(self.out, "in {}", m.types[arg].name)?;
                    need_comma = true;
                }
            }
            Dialect::V5 => {
                for (i, &arg) in sym.reference_arguments.iter().enumerate() {
                    if i > 0 {
                        write!(self.out, ", ")?;
                    }
                    write!(self.out, "{}", m.types[arg].name)?;
                }
                write!(self.out, ")(")?;
                for (i, &arg) in sym.value_arguments.iter().enumerate() {
                    if i > 0 {
                        write!(self.out, ", ")?;
                    }
                    write!(self.out, "{}", m.types[arg].name)?;
                }
            }
        }
        writeln!(self.out, ");")?;
        Ok(())
    }

    fn print_task_decl(&mut self, id: TaskId) -> RenderResult<()> {
        let m = self.module;
        let sym = &m.tasks[id];
        write!(self.out, "task {}(", sym.name)?;
        for (i, &arg) in sym.reference_arguments.iter().enumerate() {
            if i > 0 {
                write!(self.out, ", ")?;
            }
            write!(self.out, "{}", m.types[arg].name)?;
        }
        write!(self.out, ")(")?;
        for (i, &arg) in sym.value_arguments.iter().enumerate() {
            if i > 0 {
                write!(self.out, ", ")?;
            }
            write!(self.out, "{}", m.types[arg].name)?;
        }
        writeln!(self.out, ");")?;
        Ok(())
    }

    fn print_signal_decl(&mut self, id: SignalId) -> RenderResult<()> {
        let m = self.module;
        let sym = &m.signals[id];
        let keyword = match sym.kind {
            SignalKind::Input => "input",
            SignalKind::Output => "output",
            SignalKind::InputOutput => "inputoutput",
            SignalKind::Sensor => match self.dialect {
                Dialect::V7 => "input",
                Dialect::V5 => "sensor",
            },
            SignalKind::Return => "return",
            SignalKind::Local | SignalKind::Trap => {
                return Err(RenderError::UnknownVariant {
                    family: "interface signal kind",
                    kind: format!("{:?}", sym.kind),
                })
            }
        };
        write!(self.out, "{} {}", keyword, sym.name)?;
        match self.dialect {
            Dialect::V7 => {
                if sym.ty.is_some() {
                    write!(self.out, " : ")?;
                    self.print_signal_type(sym)?;
                }
                if let Some(init) = sym.initializer {
                    write!(self.out, " init ")?;
                    self.print_expression(init)?;
                }
            }
            Dialect::V5 => {
                if let Some(init) = sym.initializer {
                    write!(self.out, " := ")?;
                    self.print_expression(init)?;
                }
                if sym.ty.is_some() {
                    write!(self.out, " : ")?;
                    self.print_signal_type(sym)?;
                }
            }
        }
        writeln!(self.out, ";")?;
        Ok(())
    }

    /// `[combine] T [with f]` - the type part shared by signal declarations
    /// and `signal` scope statements.
    fn print_signal_type(&mut self, sym: &SignalSymbol) -> RenderResult<()> {
        let m = self.module;
        let ty = self.type_name(sym.ty, "signal type")?;
        if sym.combine.is_some() {
            write!(self.out, "combine ")?;
        }
        write!(self.out, "{}", ty)?;
        if let Some(f) = sym.combine {
            write!(self.out, " with {}", m.functions[f].name)?;
        }
        Ok(())
    }

    fn print_relation(&mut self, relation: &InputRelation) -> RenderResult<()> {
        let m = self.module;
        if self.dialect == Dialect::V7 {
            write!(self.out, "input ")?;
        }
        write!(self.out, "relation ")?;
        match relation {
            InputRelation::Exclusion(signals) => {
                for (i, &sig) in signals.iter().enumerate() {
                    if i > 0 {
                        write!(self.out, " # ")?;
                    }
                    write!(self.out, "{}", m.signals[sig].name)?;
                }
            }
            InputRelation::Implication {
                predicate,
                implication,
            } => {
                write!(
                    self.out,
                    "{} => {}",
                    m.signals[*predicate].name, m.signals[*implication].name
                )?;
            }
        }
        writeln!(self.out, ";")?;
        Ok(())
    }

    // ---- statements -------------------------------------------------------

    pub fn print_statement(&mut self, id: StmtId) -> RenderResult<()> {
        let m = self.module;
        match &m.stmts[id] {
            StmtKind::Nothing => write!(self.out, "nothing")?,
            StmtKind::Pause => write!(self.out, "pause")?,
            StmtKind::Halt => write!(self.out, "halt")?,
            StmtKind::Emit { signal, value } => {
                write!(self.out, "emit {}", m.signals[*signal].name)?;
                if let Some(value) = *value {
                    write!(self.out, "(")?;
                    self.print_expression(value)?;
                    write!(self.out, ")")?;
                }
            }
            StmtKind::Sustain { signal, value } => {
                write!(self.out, "sustain {}", m.signals[*signal].name)?;
                if let Some(value) = *value {
                    write!(self.out, "(")?;
                    self.print_expression(value)?;
                    write!(self.out, ")")?;
                }
            }
            StmtKind::Assign { variable, value } => {
                write!(self.out, "{} := ", m.variables[*variable].name)?;
                self.print_expression(*value)?;
            }
            StmtKind::ProcedureCall {
                procedure,
                reference_args,
                value_args,
            } => self.print_procedure_call(*procedure, reference_args, value_args)?,
            StmtKind::Exec { calls } => self.print_exec(calls)?,
            StmtKind::Present { cases, default } => self.print_present(cases, *default)?,
            StmtKind::If { cases, default } => self.print_if(cases, *default)?,
            StmtKind::Loop { body } => {
                write!(self.out, "loop")?;
                self.statement_block(*body)?;
                write!(self.out, "end loop")?;
            }
            StmtKind::Repeat {
                count,
                body,
                is_positive,
            } => {
                if *is_positive {
                    write!(self.out, "positive ")?;
                }
                write!(self.out, "repeat ")?;
                self.print_expression(*count)?;
                write!(self.out, " times")?;
                self.statement_block(*body)?;
                write!(self.out, "end repeat")?;
            }
            StmtKind::Abort {
                body,
                cases,
                is_weak,
            } => self.print_abort(*body, cases, *is_weak)?,
            StmtKind::Await { cases } => self.print_await(cases)?,
            StmtKind::LoopEach { body, predicate } => {
                write!(self.out, "loop")?;
                self.statement_block(*body)?;
                write!(self.out, "each ")?;
                self.sig_expression(*predicate)?;
            }
            StmtKind::Every { predicate, body } => {
                write!(self.out, "every ")?;
                self.sig_expression(*predicate)?;
                write!(self.out, " do")?;
                self.statement_block(*body)?;
                write!(self.out, "end every")?;
            }
            StmtKind::Suspend { body, predicate } => {
                write!(self.out, "suspend")?;
                self.statement_block(*body)?;
                write!(self.out, "when ")?;
                self.sig_expression(*predicate)?;
            }
            StmtKind::DoWatching {
                body,
                predicate,
                timeout,
            } => self.print_do_watching(*body, *predicate, *timeout)?,
            StmtKind::DoUpto { body, predicate } => {
                write!(self.out, "do")?;
                self.statement_block(*body)?;
                write!(self.out, "upto ")?;
                self.sig_expression(*predicate)?;
            }
            StmtKind::Trap {
                symbols,
                body,
                handlers,
            } => self.print_trap(symbols, *body, handlers)?,
            StmtKind::Exit { trap, value } => {
                let sym = &m.signals[*trap];
                if sym.kind != SignalKind::Trap {
                    return Err(RenderError::UnknownVariant {
                        family: "exit target",
                        kind: format!("{:?}", sym.kind),
                    });
                }
                write!(self.out, "exit {}", sym.name)?;
                if let Some(value) = *value {
                    write!(self.out, "(")?;
                    self.print_expression(value)?;
                    write!(self.out, ")")?;
                }
            }
            StmtKind::Var { symbols, body } => self.print_var(symbols, *body)?,
            StmtKind::Signal { symbols, body } => self.print_signal_scope(symbols, *body)?,
            StmtKind::Run(run) => self.print_run(run)?,
            StmtKind::Sequence(stmts) => {
                self.precedence.push(SEQUENTIAL_PRECEDENCE);
                for (i, &stmt) in stmts.iter().enumerate() {
                    if i > 0 {
                        writeln!(self.out, ";")?;
                        self.tab()?;
                    }
                    self.print_statement(stmt)?;
                }
                self.precedence.pop();
            }
            StmtKind::Parallel(threads) => self.print_parallel(threads)?,
            StmtKind::IfThenElse {
                predicate,
                then_part,
                else_part,
            } => {
                write!(self.out, "if (")?;
                self.print_expression(*predicate)?;
                write!(self.out, ")")?;
                if let Some(then_part) = *then_part {
                    write!(self.out, " {{")?;
                    self.statement_block(then_part)?;
                    write!(self.out, "}}")?;
                }
                if let Some(else_part) = *else_part {
                    write!(self.out, " else {{")?;
                    self.statement_block(else_part)?;
                    write!(self.out, "}}")?;
                }
            }
            StmtKind::StartCounter { counter: _, count } => {
                write!(self.out, "StartCounter ")?;
                self.print_expression(*count)?;
            }
            StmtKind::CheckCounter {
                counter: _,
                predicate,
            } => {
                write!(self.out, "check(")?;
                self.print_expression(*predicate)?;
                write!(self.out, ")")?;
            }
        }
        Ok(())
    }

    fn print_parallel(&mut self, threads: &[StmtId]) -> RenderResult<()> {
        let needs_brackets = self.precedence.push(PARALLEL_PRECEDENCE);
        if needs_brackets {
            writeln!(self.out, "[")?;
            self.tab()?;
        }
        for (i, &thread) in threads.iter().enumerate() {
            if i > 0 {
                writeln!(self.out)?;
                self.tab()?;
                writeln!(self.out, "||")?;
                self.tab()?;
            }
            self.indent += 1;
            // indentation takes effect at the next tab, so pad here
            write!(self.out, "  ")?;
            self.print_statement(thread)?;
            self.indent -= 1;
        }
        if needs_brackets {
            writeln!(self.out)?;
            self.tab()?;
            write!(self.out, "]")?;
        }
        self.precedence.pop();
        Ok(())
    }

    fn print_procedure_call(
        &mut self,
        procedure: ProcedureId,
        reference_args: &[VariableId],
        value_args: &[ExprId],
    ) -> RenderResult<()> {
        let m = self.module;
        write!(self.out, "call {}(", m.procedures[procedure].name)?;
        match self.dialect {
            Dialect::V7 => {
                let mut need_comma = false;
                for &arg in reference_args {
                    if need_comma {
                        write!(self.out, ", ")?;
                    }
                    write!(self.out, "{}", m.variables[arg].name)?;
                    need_comma = true;
                }
                for &arg in value_args {
                    if need_comma {
                        write!(self.out, ", ")?;
                    }
                    self.print_expression(arg)?;
                    need_comma = true;
                }
            }
            Dialect::V5 => {
                for (i, &arg) in reference_args.iter().enumerate() {
                    if i > 0 {
                        write!(self.out, ", ")?;
                    }
                    write!(self.out, "{}", m.variables[arg].name)?;
                }
                write!(self.out, ")(")?;
                for (i, &arg) in value_args.iter().enumerate() {
                    if i > 0 {
                        write!(self.out, ", ")?;
                    }
                    self.print_expression(arg)?;
                }
            }
        }
        write!(self.out, ")")?;
        Ok(())
    }

    fn print_exec(&mut self, calls: &[TaskCall]) -> RenderResult<()> {
        let m = self.module;
        write!(self.out, "exec")?;
        self.indent += 1;
        for call in calls {
            writeln!(self.out)?;
            self.tab()?;
            write!(self.out, "case {}(", m.tasks[call.task].name)?;
            for (i, &arg) in call.reference_args.iter().enumerate() {
                if i > 0 {
                    write!(self.out, ", ")?;
                }
                write!(self.out, "{}", m.variables[arg].name)?;
            }
            write!(self.out, ")(")?;
            for (i, &arg) in call.value_args.iter().enumerate() {
                if i > 0 {
                    write!(self.out, ", ")?;
                }
                self.print_expression(arg)?;
            }
            write!(self.out, ") return {}", m.signals[call.signal].name)?;
            if let Some(body) = call.body {
                writeln!(self.out, " do")?;
                self.indent += 1;
                self.tab()?;
                self.print_statement(body)?;
                self.indent -= 1;
            }
        }
        writeln!(self.out)?;
        self.indent -= 1;
        self.tab()?;
        write!(self.out, "end exec")?;
        Ok(())
    }

    fn print_present(
        &mut self,
        cases: &[PredicatedStatement],
        default: Option<StmtId>,
    ) -> RenderResult<()> {
        match self.dialect {
            Dialect::V7 => write!(self.out, "if ")?,
            Dialect::V5 => write!(self.out, "present ")?,
        }
        if cases.len() == 1 {
            let case = &cases[0];
            self.sig_expression(case.predicate)?;
            write!(self.out, " ")?;
            if let Some(body) = case.body {
                write!(self.out, "then")?;
                self.statement_block(body)?;
            }
        } else {
            self.indent += 1;
            for case in cases {
                writeln!(self.out)?;
                self.tab()?;
                write!(self.out, "case ")?;
                self.sig_expression(case.predicate)?;
                if let Some(body) = case.body {
                    writeln!(self.out, " do")?;
                    self.indent += 1;
                    self.tab()?;
                    self.print_statement(body)?;
                    self.indent -= 1;
                }
            }
            self.indent -= 1;
            writeln!(self.out)?;
            self.tab()?;
        }
        if let Some(default) = default {
            write!(self.out, "else")?;
            self.statement_block(default)?;
        }
        match self.dialect {
            Dialect::V7 => write!(self.out, "end if")?,
            Dialect::V5 => write!(self.out, "end present")?,
        }
        Ok(())
    }

    fn print_if(
        &mut self,
        cases: &[PredicatedStatement],
        default: Option<StmtId>,
    ) -> RenderResult<()> {
        let first = cases.first().ok_or(RenderError::MissingReference {
            what: "branch case",
            context: "if statement",
        })?;
        write!(self.out, "if ")?;
        self.print_expression(first.predicate)?;
        write!(self.out, " ")?;
        if let Some(body) = first.body {
            write!(self.out, "then")?;
            self.statement_block(body)?;
        }
        for case in &cases[1..] {
            write!(self.out, "elsif ")?;
            self.print_expression(case.predicate)?;
            write!(self.out, " then")?;
            let body = case.body.ok_or(RenderError::MissingReference {
                what: "case body",
                context: "elsif branch",
            })?;
            self.statement_block(body)?;
        }
        if let Some(default) = default {
            write!(self.out, "else")?;
            self.statement_block(default)?;
        }
        write!(self.out, "end if")?;
        Ok(())
    }

    fn print_abort(
        &mut self,
        body: StmtId,
        cases: &[PredicatedStatement],
        is_weak: bool,
    ) -> RenderResult<()> {
        if is_weak {
            write!(self.out, "weak ")?;
        }
        write!(self.out, "abort")?;
        self.statement_block(body)?;
        write!(self.out, "when")?;
        // A bodiless single-case abort closes without `end abort`.
        let mut need_end = cases.len() != 1;
        if let [case] = cases {
            write!(self.out, " ")?;
            self.sig_expression(case.predicate)?;
            if let Some(handler) = case.body {
                write!(self.out, " do")?;
                self.statement_block(handler)?;
                need_end = true;
            }
        } else {
            self.indent += 1;
            for case in cases {
                writeln!(self.out)?;
                self.tab()?;
                write!(self.out, "case ")?;
                self.sig_expression(case.predicate)?;
                if let Some(handler) = case.body {
                    writeln!(self.out, " do")?;
                    self.indent += 1;
                    self.tab()?;
                    self.print_statement(handler)?;
                    self.indent -= 1;
                }
            }
            self.indent -= 1;
            writeln!(self.out)?;
            self.tab()?;
        }
        if need_end {
            write!(self.out, "end")?;
            if is_weak && self.dialect == Dialect::V5 {
                write!(self.out, " weak")?;
            }
            write!(self.out, " abort")?;
        }
        Ok(())
    }

    fn print_await(&mut self, cases: &[PredicatedStatement]) -> RenderResult<()> {
        write!(self.out, "await ")?;
        if let [case] = cases {
            self.sig_expression(case.predicate)?;
            if let Some(body) = case.body {
                write!(self.out, " do")?;
                self.statement_block(body)?;
                write!(self.out, "end await")?;
            }
        } else {
            self.indent += 1;
            for case in cases {
                writeln!(self.out)?;
                self.tab()?;
                write!(self.out, "case ")?;
                self.sig_expression(case.predicate)?;
                if let Some(body) = case.body {
                    writeln!(self.out, " do")?;
                    self.indent += 1;
                    self.tab()?;
                    self.print_statement(body)?;
                    self.indent -= 1;
                }
            }
            self.indent -= 1;
            writeln!(self.out)?;
            self.tab()?;
            write!(self.out, "end await")?;
        }
        Ok(())
    }

    fn print_do_watching(
        &mut self,
        body: StmtId,
        predicate: ExprId,
        timeout: Option<StmtId>,
    ) -> RenderResult<()> {
        match self.dialect {
            Dialect::V7 => {
                write!(self.out, "abort")?;
                self.statement_block(body)?;
                write!(self.out, "when ")?;
                self.sig_expression(predicate)?;
                if let Some(timeout) = timeout {
                    write!(self.out, " do")?;
                    self.statement_block(timeout)?;
                    write!(self.out, "end abort")?;
                }
            }
            Dialect::V5 => {
                write!(self.out, "do")?;
                self.statement_block(body)?;
                write!(self.out, "watching ")?;
                self.sig_expression(predicate)?;
                if let Some(timeout) = timeout {
                    write!(self.out, " timeout")?;
                    self.statement_block(timeout)?;
                    write!(self.out, "end timeout")?;
                }
            }
        }
        Ok(())
    }

    fn print_trap(
        &mut self,
        symbols: &[SignalId],
        body: StmtId,
        handlers: &[PredicatedStatement],
    ) -> RenderResult<()> {
        let m = self.module;
        write!(self.out, "trap ")?;
        for (i, &id) in symbols.iter().enumerate() {
            let sym = &m.signals[id];
            if sym.kind != SignalKind::Trap {
                return Err(RenderError::UnknownVariant {
                    family: "trap symbol",
                    kind: format!("{:?}", sym.kind),
                });
            }
            if i > 0 {
                writeln!(self.out, ",")?;
                self.tab()?;
                write!(self.out, "     ")?;
            }
            write!(self.out, "{}", sym.name)?;
            if let Some(init) = sym.initializer {
                write!(self.out, " := ")?;
                self.print_expression(init)?;
            }
            if sym.ty.is_some() {
                let ty = self.type_name(sym.ty, "trap declaration")?;
                write!(self.out, " : {}", ty)?;
            }
        }
        write!(self.out, " in")?;
        self.statement_block(body)?;
        for handler in handlers {
            write!(self.out, "handle ")?;
            self.print_expression(handler.predicate)?;
            write!(self.out, " do")?;
            let handler_body = handler.body.ok_or(RenderError::MissingReference {
                what: "handler body",
                context: "trap handler",
            })?;
            self.statement_block(handler_body)?;
        }
        write!(self.out, "end trap")?;
        Ok(())
    }

    fn print_var(&mut self, symbols: &[VariableId], body: StmtId) -> RenderResult<()> {
        let m = self.module;
        write!(self.out, "var ")?;
        for (i, &id) in symbols.iter().enumerate() {
            if i > 0 {
                writeln!(self.out, ",")?;
                self.tab()?;
                write!(self.out, "    ")?;
            }
            let sym = &m.variables[id];
            write!(self.out, "{}", sym.name)?;
            let ty = self.type_name(sym.ty, "var declaration")?;
            match self.dialect {
                Dialect::V7 => {
                    write!(self.out, " : {}", ty)?;
                    if let Some(init) = sym.initializer {
                        write!(self.out, " := ")?;
                        self.print_expression(init)?;
                    }
                }
                Dialect::V5 => {
                    if let Some(init) = sym.initializer {
                        write!(self.out, " := ")?;
                        self.print_expression(init)?;
                    }
                    write!(self.out, " : {}", ty)?;
                }
            }
        }
        write!(self.out, " in")?;
        self.statement_block(body)?;
        write!(self.out, "end var")?;
        Ok(())
    }

    fn print_signal_scope(&mut self, symbols: &[SignalId], body: StmtId) -> RenderResult<()> {
        let m = self.module;
        write!(self.out, "signal ")?;
        for (i, &id) in symbols.iter().enumerate() {
            if i > 0 {
                writeln!(self.out, ",")?;
                self.tab()?;
                write!(self.out, "       ")?;
            }
            let sym = &m.signals[id];
            write!(self.out, "{}", sym.name)?;
            if let Some(init) = sym.initializer {
                write!(self.out, " := ")?;
                self.print_expression(init)?;
            }
            if sym.ty.is_some() {
                write!(self.out, " : ")?;
                self.print_signal_type(sym)?;
            }
        }
        write!(self.out, " in")?;
        self.statement_block(body)?;
        write!(self.out, "end signal")?;
        Ok(())
    }

    fn print_run(&mut self, run: &RunStatement) -> RenderResult<()> {
        let m = self.module;
        write!(self.out, "run {}", run.new_name)?;
        if run.old_name != run.new_name {
            write!(self.out, " / {}", run.old_name)?;
        }
        if run.renaming_count() == 0 {
            return Ok(());
        }
        writeln!(self.out, " [")?;
        self.indent += 1;
        self.tab()?;

        let mut more = false;

        if !run.types.is_empty() {
            write!(self.out, "type ")?;
            for (i, r) in run.types.iter().enumerate() {
                if i > 0 {
                    writeln!(self.out, ",")?;
                    self.tab()?;
                    write!(self.out, "     ")?;
                }
                write!(self.out, "{} / {}", m.types[r.new_type].name, r.old_name)?;
            }
            more = true;
        }

        if !run.constants.is_empty() {
            if more {
                writeln!(self.out, ";")?;
                self.tab()?;
            }
            write!(self.out, "constant ")?;
            for (i, r) in run.constants.iter().enumerate() {
                if i > 0 {
                    writeln!(self.out, ",")?;
                    self.tab()?;
                    write!(self.out, "         ")?;
                }
                self.print_expression(r.new_value)?;
                write!(self.out, " / {}", r.old_name)?;
            }
            more = true;
        }

        if !run.functions.is_empty() {
            if more {
                writeln!(self.out, ";")?;
                self.tab()?;
            }
            write!(self.out, "function ")?;
            for (i, r) in run.functions.iter().enumerate() {
                if i > 0 {
                    writeln!(self.out, ",")?;
                    self.tab()?;
                    write!(self.out, "         ")?;
                }
                write!(self.out, "{} / {}", m.functions[r.new_func].name, r.old_name)?;
            }
            more = true;
        }

        if !run.procedures.is_empty() {
            if more {
                writeln!(self.out, ";")?;
                self.tab()?;
            }
            write!(self.out, "procedure ")?;
            for (i, r) in run.procedures.iter().enumerate() {
                if i > 0 {
                    writeln!(self.out, ",")?;
                    self.tab()?;
                    write!(self.out, "          ")?;
                }
                write!(
                    self.out,
                    "{} / {}",
                    m.procedures[r.new_proc].name, r.old_name
                )?;
            }
            more = true;
        }

        if !run.tasks.is_empty() {
            if more {
                writeln!(self.out, ";")?;
                self.tab()?;
            }
            write!(self.out, "task ")?;
            for (i, r) in run.tasks.iter().enumerate() {
                if i > 0 {
                    writeln!(self.out, ",")?;
                    self.tab()?;
                    write!(self.out, "     ")?;
                }
                write!(self.out, "{} / {}", m.tasks[r.new_task].name, r.old_name)?;
            }
            more = true;
        }

        if !run.signals.is_empty() {
            if more {
                writeln!(self.out, ";")?;
                self.tab()?;
            }
            write!(self.out, "signal ")?;
            for (i, r) in run.signals.iter().enumerate() {
                if i > 0 {
                    writeln!(self.out, ",")?;
                    self.tab()?;
                    write!(self.out, "       ")?;
                }
                write!(self.out, "{} / {}", m.signals[r.new_sig].name, r.old_name)?;
            }
        }
        write!(self.out, " ]")?;
        self.indent -= 1;
        Ok(())
    }

    // ---- expressions ------------------------------------------------------

    /// Prints an expression from a fresh root threshold.
    pub fn print_expression(&mut self, id: ExprId) -> RenderResult<()> {
        self.precedence.push(0);
        let r = self.print_expr_inner(id);
        self.precedence.pop();
        r
    }

    /// Prints a guard expression. A delay is already self-delimiting; every
    /// other guard is wrapped in the dialect's delimiters.
    pub fn sig_expression(&mut self, id: ExprId) -> RenderResult<()> {
        self.precedence.push(0);
        let r = match &self.module.exprs[id] {
            ExprKind::Delay { .. } => self.print_expr_inner(id),
            _ => self.delimited_expr(id),
        };
        self.precedence.pop();
        r
    }

    fn delimited_expr(&mut self, id: ExprId) -> RenderResult<()> {
        match self.dialect {
            Dialect::V7 => write!(self.out, "(")?,
            Dialect::V5 => write!(self.out, "[")?,
        }
        self.print_expr_inner(id)?;
        match self.dialect {
            Dialect::V7 => write!(self.out, ")")?,
            Dialect::V5 => write!(self.out, "]")?,
        }
        Ok(())
    }

    fn print_expr_inner(&mut self, id: ExprId) -> RenderResult<()> {
        let m = self.module;
        match &m.exprs[id] {
            ExprKind::UnaryOp { op, operand } => {
                let level = self.unary_precedence(*op)?;
                // The application itself is never bracketed; the pushed
                // threshold only constrains the operand.
                self.precedence.push(level);
                write!(self.out, "{} ", op.text())?;
                self.print_expr_inner(*operand)?;
                self.precedence.pop();
            }
            ExprKind::BinaryOp { op, left, right } => {
                let level = self.binary_precedence(*op)?;
                let needs_paren = self.precedence.push(level);
                if needs_paren {
                    write!(self.out, "(")?;
                }
                self.print_expr_inner(*left)?;
                write!(self.out, " {} ", op.text())?;
                self.print_expr_inner(*right)?;
                if needs_paren {
                    write!(self.out, ")")?;
                }
                self.precedence.pop();
            }
            ExprKind::LoadVariable(var) => {
                write!(self.out, "{}", m.variables[*var].name)?;
            }
            ExprKind::LoadSignal(sig) => {
                write!(self.out, "{}", m.signals[*sig].name)?;
            }
            ExprKind::LoadSignalValue(sig) => {
                let sym = &m.signals[*sig];
                if sym.kind == SignalKind::Trap {
                    write!(self.out, "?")?;
                }
                write!(self.out, "?{}", sym.name)?;
            }
            ExprKind::Literal { value, ty } => {
                let ty = self.type_name(*ty, "literal")?;
                if ty == "string" {
                    write!(self.out, "\"")?;
                    for c in value.chars() {
                        if c == '"' {
                            write!(self.out, "\"")?;
                        }
                        write!(self.out, "{}", c)?;
                    }
                    write!(self.out, "\"")?;
                } else {
                    write!(self.out, "{}", value)?;
                }
            }
            ExprKind::FunctionCall { callee, arguments } => {
                write!(self.out, "{}(", m.functions[*callee].name)?;
                for (i, &arg) in arguments.iter().enumerate() {
                    if i > 0 {
                        write!(self.out, ", ")?;
                    }
                    self.print_expression(arg)?;
                }
                write!(self.out, ")")?;
            }
            ExprKind::Delay {
                count,
                predicate,
                is_immediate,
            } => {
                if *is_immediate {
                    write!(self.out, "immediate ")?;
                } else {
                    let count = count.ok_or(RenderError::MissingReference {
                        what: "occurrence count",
                        context: "delay expression",
                    })?;
                    self.print_expression(count)?;
                    write!(self.out, " ")?;
                }
                self.delay_signal(*predicate)?;
            }
            ExprKind::CheckCounter {
                counter: _,
                predicate,
            } => {
                write!(self.out, "check(")?;
                self.print_expression(*predicate)?;
                write!(self.out, ")")?;
            }
        }
        Ok(())
    }

    /// The signal part of a delay: a bare signal load stays bare
    /// (`await 3 S`), anything composite gets the guard delimiters.
    fn delay_signal(&mut self, id: ExprId) -> RenderResult<()> {
        self.precedence.push(0);
        let r = match &self.module.exprs[id] {
            ExprKind::LoadSignal(_) => self.print_expr_inner(id),
            _ => self.delimited_expr(id),
        };
        self.precedence.pop();
        r
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_threshold_never_brackets() {
        let mut stack = PrecedenceStack::new();
        assert!(!stack.push(1));
        stack.pop();
        assert!(!stack.push(7));
    }

    #[test]
    fn lower_power_inside_higher_brackets() {
        let mut stack = PrecedenceStack::new();
        assert!(!stack.push(6)); // multiplicative under root
        assert!(stack.push(5)); // additive operand needs brackets
        stack.pop();
        assert!(!stack.push(6)); // same power nests freely
    }

    #[test]
    fn pop_restores_prior_threshold() {
        let mut stack = PrecedenceStack::new();
        stack.push(6);
        stack.push(7);
        stack.pop();
        assert!(stack.push(5));
    }

    #[test]
    fn parallel_brackets_under_sequence() {
        let mut stack = PrecedenceStack::new();
        assert!(!stack.push(SEQUENTIAL_PRECEDENCE));
        assert!(stack.push(PARALLEL_PRECEDENCE));
    }
}
