use esterel_pretty::ast::{ExprKind, Module, SignalKind, SignalSymbol, StmtKind};
use esterel_pretty::grc::{GrcGraph, GrcKind, StKind, StNode};
use esterel_pretty::{render_grc_into, write_grc_dot, GrcDotOptions};

/// A module with one input and one output signal plus an `emit O` action,
/// enough to give tests and actions printable labels.
fn labeled_module() -> (Module, esterel_pretty::ast::ExprId, esterel_pretty::ast::StmtId) {
    let mut m = Module::new("main");
    let s = m.add_signal(SignalSymbol::pure("S", SignalKind::Input));
    let o = m.add_signal(SignalSymbol::pure("O", SignalKind::Output));
    let guard = m.expr(ExprKind::LoadSignal(s));
    let emit = m.stmt(StmtKind::Emit {
        signal: o,
        value: None,
    });
    (m, guard, emit)
}

fn render(graph: &GrcGraph, module: &Module, opts: &GrcDotOptions) -> String {
    let mut out = Vec::new();
    write_grc_dot(&mut out, graph, module, opts).unwrap();
    String::from_utf8(out).unwrap()
}

#[test]
fn cyclic_graph_terminates_and_emits_each_node_once() {
    let (m, guard, emit) = labeled_module();
    let mut g = GrcGraph::new();
    let test = g.node(GrcKind::Test { predicate: guard });
    let action = g.node(GrcKind::Action { statement: emit });
    g.link(test, action);
    g.link(action, test);
    g.control_flow_root = Some(test);

    let out = render(&g, &m, &GrcDotOptions::default());
    assert_eq!(out.matches("n0 [").count(), 1);
    assert_eq!(out.matches("n1 [").count(), 1);
    assert!(out.contains("n0 -> n1;"));
    // The back edge references the already-numbered node.
    assert!(out.contains("n1 -> n0;"));
}

#[test]
fn numbering_is_deterministic_across_renders() {
    let (m, guard, emit) = labeled_module();
    let mut g = GrcGraph::new();
    let test = g.node(GrcKind::Test { predicate: guard });
    let t0 = g.node(GrcKind::Terminate { code: 0 });
    let action = g.node(GrcKind::Action { statement: emit });
    g.link(test, t0);
    g.link(test, action);
    g.control_flow_root = Some(test);

    let first = render(&g, &m, &GrcDotOptions::default());
    let second = render(&g, &m, &GrcDotOptions::default());
    assert_eq!(first, second);
}

#[test]
fn branch_edges_are_labeled_by_successor_index() {
    let (m, guard, emit) = labeled_module();
    let mut g = GrcGraph::new();
    let test = g.node(GrcKind::Test { predicate: guard });
    let action = g.node(GrcKind::Action { statement: emit });
    let done = g.node(GrcKind::Terminate { code: 0 });
    g.link(test, action);
    g.link(test, done);
    g.control_flow_root = Some(test);

    let out = render(&g, &m, &GrcDotOptions::default());
    assert!(out.contains("n0 -> n1 [label=\"0\"];"));
    assert!(out.contains("n0 -> n2 [label=\"1\"];"));
}

#[test]
fn offsets_chain_across_renders() {
    let (m, guard, emit) = labeled_module();
    let mut g = GrcGraph::new();
    let test = g.node(GrcKind::Test { predicate: guard });
    let action = g.node(GrcKind::Action { statement: emit });
    g.link(test, action);
    g.control_flow_root = Some(test);

    let mut out = Vec::new();
    let first = render_grc_into(&mut out, &g, &m, &GrcDotOptions::default()).unwrap();
    assert_eq!(first.cfg_last, 1);
    // No selection tree rendered, so that space stays before its start.
    assert_eq!(first.st_last, -1);

    let chained = GrcDotOptions {
        cfg_start: first.cfg_last + 1,
        st_start: first.st_last + 1,
        ..GrcDotOptions::default()
    };
    let mut out2 = Vec::new();
    let second = render_grc_into(&mut out2, &g, &m, &chained).unwrap();
    let text = String::from_utf8(out2).unwrap();
    assert!(text.contains("n2 ["));
    assert!(text.contains("n3 ["));
    assert!(!text.contains("n0 ["));
    assert_eq!(second.cfg_last, 3);
}

#[test]
fn empty_graph_reports_last_below_start() {
    let (m, _, _) = labeled_module();
    let g = GrcGraph::new();
    let mut out = Vec::new();
    let offsets = render_grc_into(&mut out, &g, &m, &GrcDotOptions::default()).unwrap();
    assert_eq!(offsets.cfg_last, -1);
    assert_eq!(offsets.st_last, -1);
    assert!(out.is_empty());
}

#[test]
fn clean_mode_splices_administrative_nodes() {
    let (m, guard, emit) = labeled_module();
    let mut g = GrcGraph::new();
    let enter = g.node(GrcKind::EnterGrc);
    let test = g.node(GrcKind::Test { predicate: guard });
    let nop = g.node(GrcKind::Nop);
    let action = g.node(GrcKind::Action { statement: emit });
    let exit = g.node(GrcKind::ExitGrc);
    g.link(enter, test);
    g.link(test, nop);
    g.link(nop, action);
    g.link(action, exit);
    g.control_flow_root = Some(enter);

    let plain = render(&g, &m, &GrcDotOptions::default());
    assert!(plain.contains("nop"));
    assert!(plain.contains("start"));

    let clean = render(
        &g,
        &m,
        &GrcDotOptions {
            clean: true,
            ..GrcDotOptions::default()
        },
    );
    assert!(!clean.contains("nop"));
    assert!(!clean.contains("start"));
    assert!(!clean.contains("finish"));
    // Test and action survive, renumbered from zero, still connected.
    assert!(clean.contains("n0 [label=\"S\""));
    assert!(clean.contains("n1 [label=\"emit O\""));
    assert!(clean.contains("n0 -> n1;"));
}

#[test]
fn clean_mode_survives_administrative_cycles() {
    let (m, _, emit) = labeled_module();
    let mut g = GrcGraph::new();
    let nop_a = g.node(GrcKind::Nop);
    let nop_b = g.node(GrcKind::Nop);
    let action = g.node(GrcKind::Action { statement: emit });
    g.link(nop_a, nop_b);
    g.link(nop_b, nop_a);
    g.link(nop_b, action);
    g.control_flow_root = Some(nop_a);

    let clean = render(
        &g,
        &m,
        &GrcDotOptions {
            clean: true,
            ..GrcDotOptions::default()
        },
    );
    assert!(clean.contains("n0 [label=\"emit O\""));
}

#[test]
fn selection_tree_shapes_and_shared_subtree() {
    let (m, _, _) = labeled_module();
    let mut g = GrcGraph::new();
    let shared = g.st_nodes.alloc(StNode::leaf());
    let reference = g.st_node(StKind::Ref { target: shared }, vec![]);
    let leaf = g.st_nodes.alloc(StNode::leaf());
    let par = g.st_node(StKind::Par, vec![reference, shared]);
    let root = g.st_node(StKind::Excl, vec![leaf, par]);
    g.selection_root = Some(root);

    let out = render(&g, &m, &GrcDotOptions::default());
    assert!(out.contains("st0 [label=\"excl\", shape=invtriangle];"));
    assert!(out.contains("st1 [label=\"leaf\", shape=ellipse];"));
    assert!(out.contains("st2 [label=\"par\", shape=triangle];"));
    // The shared leaf is emitted once; both parallel children point at it.
    assert_eq!(out.matches("st3 [").count(), 1);
    assert_eq!(out.matches("st2 -> st3;").count(), 2);
}

#[test]
fn st_links_are_drawn_only_on_request() {
    let (m, _, _) = labeled_module();
    let mut g = GrcGraph::new();
    let state = g.st_nodes.alloc(StNode::leaf());
    let enter = g.node(GrcKind::Enter { state });
    g.control_flow_root = Some(enter);
    g.selection_root = Some(state);

    let plain = render(&g, &m, &GrcDotOptions::default());
    assert!(!plain.contains("style=dashed"));

    let linked = render(
        &g,
        &m,
        &GrcDotOptions {
            draw_st_links: true,
            ..GrcDotOptions::default()
        },
    );
    assert!(linked.contains("n0 -> st0 [style=dashed, color=gray, arrowhead=none];"));
}

#[test]
fn st_link_resolves_through_references() {
    let (m, _, _) = labeled_module();
    let mut g = GrcGraph::new();
    let state = g.st_nodes.alloc(StNode::leaf());
    let reference = g.st_node(StKind::Ref { target: state }, vec![]);
    let root = g.st_node(StKind::Excl, vec![state]);
    let switch = g.node(GrcKind::Switch {
        selection: reference,
    });
    g.control_flow_root = Some(switch);
    g.selection_root = Some(root);

    let out = render(
        &g,
        &m,
        &GrcDotOptions {
            draw_st_links: true,
            ..GrcDotOptions::default()
        },
    );
    // The link lands on the referenced leaf's number, not a fresh one.
    assert!(out.contains("n0 -> st1 [style=dashed"));
}

#[test]
fn node_labels_render_guards_and_actions_as_source_text() {
    let (m, guard, emit) = labeled_module();
    let mut g = GrcGraph::new();
    let test = g.node(GrcKind::Test { predicate: guard });
    let action = g.node(GrcKind::Action { statement: emit });
    let done = g.node(GrcKind::Terminate { code: 2 });
    let sync = g.node(GrcKind::Sync);
    g.link(test, action);
    g.link(action, done);
    g.link(done, sync);
    g.control_flow_root = Some(test);

    let out = render(&g, &m, &GrcDotOptions::default());
    assert!(out.contains("n0 [label=\"S\", shape=diamond];"));
    assert!(out.contains("n1 [label=\"emit O\", shape=box];"));
    assert!(out.contains("n2 [label=\"2\", shape=octagon];"));
    assert!(out.contains("n3 [label=\"sync\", shape=invtriangle];"));
}

#[test]
fn document_is_wrapped_in_a_digraph() {
    let (m, guard, _) = labeled_module();
    let mut g = GrcGraph::new();
    let test = g.node(GrcKind::Test { predicate: guard });
    g.control_flow_root = Some(test);

    let out = render(&g, &m, &GrcDotOptions::default());
    assert!(out.starts_with("digraph GRC {"));
    assert!(out.trim_end().ends_with('}'));
}
