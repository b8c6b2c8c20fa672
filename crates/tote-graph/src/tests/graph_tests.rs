use crate::{DependencyKind, Module, ModuleGraph, ModuleId, ModuleKind};

fn id(name: &str) -> ModuleId {
    ModuleId::new_virtual(format!("virtual:{name}"))
}

fn module(name: &str, deps: &[(&str, DependencyKind)]) -> Module {
    let mut builder = Module::builder(id(name), ModuleKind::Script).source(format!("// {name}"));
    for (dep, kind) in deps {
        builder = builder.dependency(format!("./{dep}"), *kind, id(dep));
    }
    builder.build()
}

fn names(ids: &[ModuleId]) -> Vec<String> {
    ids.iter()
        .map(|i| i.path_string().trim_start_matches("virtual:").to_string())
        .collect()
}

/// index -> a -> c, index -> b -> c, index ..> lazy (dynamic)
fn sample() -> ModuleGraph {
    let graph = ModuleGraph::from_modules([
        module(
            "index",
            &[
                ("a", DependencyKind::Static),
                ("b", DependencyKind::Static),
                ("lazy", DependencyKind::Dynamic),
            ],
        ),
        module("a", &[("c", DependencyKind::Static)]),
        module("b", &[("c", DependencyKind::Require)]),
        module("c", &[]),
        module("lazy", &[("c", DependencyKind::Static)]),
        module("orphan", &[("c", DependencyKind::Static)]),
    ]);
    graph.add_entry_point(id("index"));
    graph
}

#[test]
fn edges_are_recorded_both_ways() {
    let graph = sample();
    assert_eq!(names(&graph.dependencies(&id("index"))), vec!["a", "b", "lazy"]);
    assert_eq!(names(&graph.dependents(&id("c"))), vec!["a", "b", "lazy", "orphan"]);
    assert!(graph.module(&id("index")).unwrap().is_entry);
}

#[test]
fn duplicate_specifiers_produce_one_edge() {
    let graph = ModuleGraph::from_modules([
        module("x", &[("y", DependencyKind::Static), ("y", DependencyKind::Dynamic)]),
        module("y", &[]),
    ]);
    assert_eq!(names(&graph.dependencies(&id("x"))), vec!["y"]);
    assert_eq!(graph.module(&id("x")).unwrap().dependencies.len(), 2);
}

#[test]
fn transitive_dependencies_are_breadth_first() {
    let graph = sample();
    assert_eq!(
        names(&graph.transitive_dependencies(&id("index"))),
        vec!["a", "b", "lazy", "c"]
    );
    assert!(graph.transitive_dependencies(&id("c")).is_empty());
}

#[test]
fn retain_reachable_prunes_orphans() {
    let graph = sample();
    let removed = graph.retain_reachable();
    assert_eq!(names(&removed), vec!["orphan"]);
    assert!(!graph.contains(&id("orphan")));
    assert_eq!(names(&graph.dependents(&id("c"))), vec!["a", "b", "lazy"]);
    assert_eq!(graph.len(), 5);
}

#[test]
fn execution_order_puts_dependencies_first_and_skips_dynamic() {
    let graph = sample();
    assert_eq!(
        names(&graph.execution_order(&[id("index")])),
        vec!["c", "a", "b", "index"]
    );
    assert_eq!(names(&graph.execution_order(&[id("lazy")])), vec!["c", "lazy"]);
}

#[test]
fn execution_order_terminates_on_cycles() {
    let graph = ModuleGraph::from_modules([
        module("a", &[("b", DependencyKind::Static)]),
        module("b", &[("a", DependencyKind::Static)]),
    ]);
    assert_eq!(names(&graph.execution_order(&[id("a")])), vec!["b", "a"]);
}

#[test]
fn find_cycles_reports_components_and_self_loops() {
    let graph = ModuleGraph::from_modules([
        module("a", &[("b", DependencyKind::Static)]),
        module("b", &[("c", DependencyKind::Static)]),
        module("c", &[("a", DependencyKind::Static)]),
        module("d", &[("d", DependencyKind::Static)]),
        module("e", &[("a", DependencyKind::Static)]),
    ]);
    let cycles: Vec<Vec<String>> = graph.find_cycles().iter().map(|c| names(c)).collect();
    assert_eq!(cycles, vec![vec!["a", "b", "c"], vec!["d"]]);
}

#[test]
fn replacing_a_module_rewrites_its_edges() {
    let graph = sample();
    graph.add_module(module("a", &[]));
    assert!(graph.dependencies(&id("a")).is_empty());
    assert_eq!(names(&graph.dependents(&id("c"))), vec!["b", "lazy", "orphan"]);
}

#[test]
fn remove_module_detaches_edges_and_entry() {
    let graph = sample();
    graph.remove_module(&id("index"));
    assert!(graph.entry_points().is_empty());
    assert!(graph.dependents(&id("a")).is_empty());
}
