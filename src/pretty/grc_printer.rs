//! Graph renderer: walks a module's control-flow graph and selection tree and
//! emits a dot document for visual debugging. The two traversals keep
//! independent numbering spaces, each seeded from a caller-supplied offset so
//! several modules can be merged into one document without identifier
//! collisions. Cycles are cut by a reached-set; a node already numbered is
//! referenced, never re-emitted.

use std::collections::{HashMap, HashSet};
use std::io::Write;

use crate::ast::Module;
use crate::error::{RenderError, RenderResult};
use crate::grc::{GrcGraph, GrcId, GrcKind, StId, StKind};
use crate::pretty::esterel_printer::{expression_to_string, statement_to_string, Dialect};

fn escape_dot_label(s: &str) -> String {
    s.replace('\n', "\\n")
        .replace('"', "\\\"")
        .replace('{', "\\{")
        .replace('}', "\\}")
}

/// Output style flags plus the start of each numbering space.
#[derive(Debug, Clone)]
pub struct GrcDotOptions {
    /// Draw dashed overlay edges from control-flow nodes to their
    /// selection-tree nodes.
    pub draw_st_links: bool,
    /// Suppress administrative nodes (nop, graph entry/exit, signal scope
    /// bookkeeping), splicing their edges through.
    pub clean: bool,
    pub cfg_start: i32,
    pub st_start: i32,
}

impl Default for GrcDotOptions {
    fn default() -> Self {
        Self {
            draw_st_links: false,
            clean: false,
            cfg_start: 0,
            st_start: 0,
        }
    }
}

/// Highest number assigned in each space; chain the next render from
/// `last + 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GrcDotOffsets {
    pub cfg_last: i32,
    pub st_last: i32,
}

/// Renders a complete dot document for one module's GRC.
pub fn write_grc_dot<W: Write>(
    writer: &mut W,
    graph: &GrcGraph,
    module: &Module,
    opts: &GrcDotOptions,
) -> RenderResult<GrcDotOffsets> {
    tracing::debug!(
        module = %module.name,
        clean = opts.clean,
        st_links = opts.draw_st_links,
        "rendering GRC dot"
    );
    writeln!(writer, "digraph GRC {{")?;
    writeln!(writer, "  node [shape=box, fontname=\"Courier\"];")?;
    writeln!(writer)?;
    let offsets = render_grc_into(writer, graph, module, opts)?;
    writeln!(writer, "}}")?;
    Ok(offsets)
}

/// Renders the node and edge lines without the surrounding `digraph` wrapper,
/// so callers can merge several modules into one document by threading the
/// returned offsets forward.
pub fn render_grc_into<W: Write>(
    writer: &mut W,
    graph: &GrcGraph,
    module: &Module,
    opts: &GrcDotOptions,
) -> RenderResult<GrcDotOffsets> {
    let mut printer = GrcDotPrinter::new(writer, graph, module, opts);
    // Selection tree first: st-link edges reference its numbers.
    let st_last = match graph.selection_root {
        Some(root) => printer.render_selection_tree(root)?,
        None => opts.st_start - 1,
    };
    let cfg_last = match graph.control_flow_root {
        Some(root) => printer.render_control_flow(root)?,
        None => opts.cfg_start - 1,
    };
    Ok(GrcDotOffsets { cfg_last, st_last })
}

pub struct GrcDotPrinter<'m, 'g, 'w, W: Write> {
    out: &'w mut W,
    graph: &'g GrcGraph,
    module: &'m Module,
    draw_st_links: bool,
    clean: bool,

    // Node numbers per space; assigned monotonically on first visit and
    // never revised.
    cfg_num: HashMap<GrcId, i32>,
    st_num: HashMap<StId, i32>,
    // Used during DFS of the (possibly cyclic) CFG and the shared-subtree ST.
    cfg_reached: HashSet<GrcId>,
    st_reached: HashSet<StId>,
    next_cfg: i32,
    next_st: i32,
}

impl<'m, 'g, 'w, W: Write> GrcDotPrinter<'m, 'g, 'w, W> {
    pub fn new(
        writer: &'w mut W,
        graph: &'g GrcGraph,
        module: &'m Module,
        opts: &GrcDotOptions,
    ) -> Self {
        Self {
            out: writer,
            graph,
            module,
            draw_st_links: opts.draw_st_links,
            clean: opts.clean,
            cfg_num: HashMap::new(),
            st_num: HashMap::new(),
            cfg_reached: HashSet::new(),
            st_reached: HashSet::new(),
            next_cfg: opts.cfg_start,
            next_st: opts.st_start,
        }
    }

    /// Depth-first render of the control-flow graph from `root`; returns the
    /// highest number used in the CFG space.
    pub fn render_control_flow(&mut self, root: GrcId) -> RenderResult<i32> {
        if self.clean && self.graph.nodes[root].kind.is_administrative() {
            for target in self.clean_frontier(root) {
                self.visit_cfg(target)?;
            }
        } else {
            self.visit_cfg(root)?;
        }
        Ok(self.next_cfg - 1)
    }

    /// Renders the selection tree from `root`; returns the highest number
    /// used in the ST space.
    pub fn render_selection_tree(&mut self, root: StId) -> RenderResult<i32> {
        self.visit_st(root)?;
        Ok(self.next_st - 1)
    }

    fn visit_cfg(&mut self, id: GrcId) -> RenderResult<i32> {
        if let Some(&num) = self.cfg_num.get(&id) {
            return Ok(num);
        }
        self.cfg_reached.insert(id);
        let num = self.next_cfg;
        self.next_cfg += 1;
        self.cfg_num.insert(id, num);

        let node = &self.graph.nodes[id];
        let kind = node.kind.clone();
        let successors = node.successors.clone();

        let (label, shape) = self.node_label(&kind)?;
        writeln!(
            self.out,
            "  n{} [label=\"{}\", shape={}];",
            num,
            escape_dot_label(&label),
            shape
        )?;

        if self.draw_st_links {
            match kind {
                GrcKind::Switch { selection: st }
                | GrcKind::Enter { state: st }
                | GrcKind::StSuspend { state: st } => self.draw_st_link(id, st)?,
                _ => {}
            }
        }

        let targets = if self.clean {
            let mut spliced = Vec::new();
            for &succ in &successors {
                spliced.extend(self.clean_frontier(succ));
            }
            spliced
        } else {
            successors
        };

        let branching = targets.len() > 1;
        for (i, target) in targets.into_iter().enumerate() {
            let target_num = self.visit_cfg(target)?;
            if branching {
                writeln!(self.out, "  n{} -> n{} [label=\"{}\"];", num, target_num, i)?;
            } else {
                writeln!(self.out, "  n{} -> n{};", num, target_num)?;
            }
        }
        Ok(num)
    }

    fn visit_st(&mut self, id: StId) -> RenderResult<i32> {
        let node = &self.graph.st_nodes[id];
        // A reference resolves to its shared sub-tree, rendered once.
        if let StKind::Ref { target } = node.kind {
            return self.visit_st(target);
        }
        if let Some(&num) = self.st_num.get(&id) {
            return Ok(num);
        }
        self.st_reached.insert(id);
        let num = self.next_st;
        self.next_st += 1;
        self.st_num.insert(id, num);

        let children = node.children.clone();
        let (label, shape) = match node.kind {
            StKind::Excl => ("excl", "invtriangle"),
            StKind::Par => ("par", "triangle"),
            StKind::Leaf => ("leaf", "ellipse"),
            StKind::Ref { .. } => unreachable!("resolved above"),
        };
        writeln!(self.out, "  st{} [label=\"{}\", shape={}];", num, label, shape)?;

        for child in children {
            let child_num = self.visit_st(child)?;
            writeln!(self.out, "  st{} -> st{};", num, child_num)?;
        }
        Ok(num)
    }

    /// Overlay edge between a control-flow node and its selection-tree node.
    /// The tree must already be rendered so the number exists.
    pub fn draw_st_link(&mut self, grc: GrcId, st: StId) -> RenderResult<()> {
        let cfg_num = *self
            .cfg_num
            .get(&grc)
            .ok_or(RenderError::MissingReference {
                what: "control-flow node number",
                context: "st link",
            })?;
        let st_num = self.resolved_st_number(st)?;
        writeln!(
            self.out,
            "  n{} -> st{} [style=dashed, color=gray, arrowhead=none];",
            cfg_num, st_num
        )?;
        Ok(())
    }

    fn resolved_st_number(&self, mut st: StId) -> RenderResult<i32> {
        loop {
            match self.graph.st_nodes[st].kind {
                StKind::Ref { target } => st = target,
                _ => break,
            }
        }
        self.st_num
            .get(&st)
            .copied()
            .ok_or(RenderError::MissingReference {
                what: "selection-tree node number",
                context: "st link",
            })
    }

    /// Non-administrative nodes reachable from `id` by crossing only
    /// administrative ones. `id` itself is returned when it survives.
    fn clean_frontier(&self, id: GrcId) -> Vec<GrcId> {
        let mut frontier = Vec::new();
        let mut seen = HashSet::new();
        self.collect_clean(id, &mut seen, &mut frontier);
        frontier
    }

    fn collect_clean(&self, id: GrcId, seen: &mut HashSet<GrcId>, out: &mut Vec<GrcId>) {
        let node = &self.graph.nodes[id];
        if !node.kind.is_administrative() {
            out.push(id);
            return;
        }
        // seen guards against purely administrative cycles
        if !seen.insert(id) {
            return;
        }
        for &succ in &node.successors {
            self.collect_clean(succ, seen, out);
        }
    }

    fn node_label(&self, kind: &GrcKind) -> RenderResult<(String, &'static str)> {
        let m = self.module;
        Ok(match kind {
            GrcKind::Switch { .. } => ("switch".to_string(), "diamond"),
            GrcKind::Test { predicate } => {
                (expression_to_string(m, *predicate, Dialect::V5)?, "diamond")
            }
            GrcKind::Terminate { code } => (code.to_string(), "octagon"),
            GrcKind::Sync => ("sync".to_string(), "invtriangle"),
            GrcKind::Fork => ("fork".to_string(), "triangle"),
            GrcKind::Action { statement } => {
                (statement_to_string(m, *statement, Dialect::V5)?, "box")
            }
            GrcKind::Enter { .. } => ("enter".to_string(), "box"),
            GrcKind::StSuspend { .. } => ("suspend".to_string(), "box"),
            GrcKind::EnterGrc => ("start".to_string(), "Mdiamond"),
            GrcKind::ExitGrc => ("finish".to_string(), "Msquare"),
            GrcKind::Nop => ("nop".to_string(), "circle"),
            GrcKind::DefineSignal { signal } => {
                (format!("signal {}", m.signals[*signal].name), "box")
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_quotes_and_newlines() {
        assert_eq!(escape_dot_label("a\nb"), "a\\nb");
        assert_eq!(escape_dot_label("say \"hi\""), "say \\\"hi\\\"");
        assert_eq!(escape_dot_label("{x}"), "\\{x\\}");
    }
}
