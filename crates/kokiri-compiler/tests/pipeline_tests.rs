//! End-to-end pipeline tests: rule text through compilation, evaluation
//! and search, plus batch diagnostics and reports.

use std::sync::Arc;

use kokiri_codegen::register_standard_intrinsics;
use kokiri_compiler::{parse_rule, Chunk, CompileOptions, RuleCompiler, SymbolKind, SymbolTable};
use kokiri_search::{make_sphere, EdgeHandle, EdgeId, Explored, NodeId, Search, SearchOptions, WorldGraph};
use kokiri_types::{ast::ExprKind, ErrorCategory, ErrorCode, Packed};
use kokiri_vm::{Environment, Function, Scope, Vm};

// ─────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────

fn rule_compiler() -> RuleCompiler {
    let mut symbols = SymbolTable::new();
    register_standard_intrinsics(&mut symbols);
    symbols.define("is_adult", SymbolKind::Function);
    RuleCompiler::new(symbols, CompileOptions::default())
}

struct World {
    nodes: usize,
    edges: Vec<EdgeHandle>,
    rules: Vec<Arc<Chunk>>,
    adjacency: Vec<Vec<EdgeId>>,
}

impl World {
    fn build(rc: &mut RuleCompiler, nodes: usize, edges: &[(NodeId, NodeId, &str)]) -> Self {
        let mut world = World {
            nodes,
            edges: Vec::new(),
            rules: Vec::new(),
            adjacency: vec![Vec::new(); nodes],
        };
        for (i, &(from, to, text)) in edges.iter().enumerate() {
            let id = i as EdgeId;
            let chunk = match rc.compile_rule(&format!("{from} -> {to}"), text) {
                Ok(chunk) => chunk,
                Err(e) => panic!("unexpected rule error: {e}"),
            };
            world.edges.push(EdgeHandle { id, from, to });
            world.rules.push(chunk);
            world.adjacency[from as usize].push(id);
        }
        world
    }
}

impl WorldGraph for World {
    fn node_count(&self) -> usize {
        self.nodes
    }

    fn edge_count(&self) -> usize {
        self.edges.len()
    }

    fn outgoing(&self, node: NodeId) -> &[EdgeId] {
        &self.adjacency[node as usize]
    }

    fn edge(&self, id: EdgeId) -> EdgeHandle {
        self.edges[id as usize]
    }

    fn rule(&self, id: EdgeId) -> &Chunk {
        &self.rules[id as usize]
    }
}

// ─────────────────────────────────────────────────────────────────────
// Parsing
// ─────────────────────────────────────────────────────────────────────

#[test]
fn parse_rule_reports_rule_name() {
    let expr = parse_rule("Kokiri Forest", "True").unwrap();
    assert_eq!(expr.kind, ExprKind::Bool(true));

    let err = parse_rule("Kokiri Forest", "is_adult and (").unwrap_err();
    assert_eq!(err.rule, "Kokiri Forest");
    assert_eq!(err.category, ErrorCategory::Lexical);
    assert_eq!(err.code, ErrorCode::UNCLOSED_GROUP);
}

// ─────────────────────────────────────────────────────────────────────
// Compile and evaluate
// ─────────────────────────────────────────────────────────────────────

#[test]
fn rule_with_strings_and_natives() {
    let mut rc = rule_compiler();
    let chunk = rc
        .compile_rule(
            "Shadow Temple",
            "can_play(Song_of_Time) or (logic_shadow_mq_invisible_blades and damage_multiplier != 'ohko')",
        )
        .unwrap();

    let mut env = Environment::new();
    env.define_native("can_play", 1, |_| Ok(Packed::FALSE));
    env.bind("Song_of_Time", Packed::pack_u32(1));
    env.bind("logic_shadow_mq_invisible_blades", true);
    let normal = rc.strings_mut().pack("normal").unwrap();
    env.bind("damage_multiplier", normal);

    let mut vm = Vm::default();
    assert_eq!(vm.test(&chunk, &env), Ok(true));

    let ohko = rc.strings_mut().pack("ohko").unwrap();
    env.bind("damage_multiplier", ohko);
    assert_eq!(vm.test(&chunk, &env), Ok(false));
}

#[test]
fn macros_and_intrinsics_expand_before_codegen() {
    let mut rc = rule_compiler();
    rc.define_macro("here", &["item"], "is_adult and item").unwrap();
    let chunk = rc.compile_rule("Hookshot Spot", "any_of(here(Hookshot), False)").unwrap();

    let mut env = Environment::new();
    env.define_native("is_adult", 0, |_| Ok(Packed::TRUE));
    env.bind("Hookshot", true);
    assert_eq!(Vm::default().test(&chunk, &env), Ok(true));
    env.bind("Hookshot", false);
    assert_eq!(Vm::default().test(&chunk, &env), Ok(false));
}

#[test]
fn compiled_functions_are_callable_from_rules() {
    let mut rc = rule_compiler();
    let body = rc.compile_function("has_both", &["a", "b"], "a and b").unwrap();
    let chunk = rc.compile_rule("Gate", "has_both(Bow, Hookshot)").unwrap();

    let mut env = Environment::new();
    env.functions.define(Function::compiled(
        "has_both",
        vec!["a".into(), "b".into()],
        Arc::new(body),
        Arc::new(Scope::new()),
    ));
    env.bind("Bow", true);
    env.bind("Hookshot", true);
    assert_eq!(Vm::default().test(&chunk, &env), Ok(true));
}

// ─────────────────────────────────────────────────────────────────────
// Search over compiled rules
// ─────────────────────────────────────────────────────────────────────

#[test]
fn search_follows_compiled_rules() {
    let mut rc = rule_compiler();
    rc.define_macro("has", &["item"], "item").unwrap();
    let world = World::build(
        &mut rc,
        4,
        &[
            (0, 1, "True"),
            (1, 2, "is_adult and has(Hookshot)"),
            (1, 3, "all_of()"),
        ],
    );

    let mut env = Environment::new();
    env.define_native("is_adult", 0, |_| Ok(Packed::TRUE));
    env.bind("Hookshot", false);
    let mut search = Search::from_roots(&world, [0], SearchOptions::default()).unwrap();

    let Explored::Progress(first) = search.explore(&env).unwrap() else {
        panic!("expected progress");
    };
    assert_eq!(first.reached.iter().collect::<Vec<_>>(), vec![1, 3]);
    assert_eq!(first.pending.iter().collect::<Vec<_>>(), vec![2]);
    let sphere = make_sphere(&first);
    assert_eq!(sphere.crossed.iter().collect::<Vec<_>>(), vec![0, 2]);

    assert!(!search.explore(&env).unwrap().is_progress());

    env.bind("Hookshot", true);
    let Explored::Progress(third) = search.explore(&env).unwrap() else {
        panic!("expected progress after granting the Hookshot");
    };
    assert!(third.crossed.contains(1));
    assert_eq!(search.visited().len(), 4);
}

// ─────────────────────────────────────────────────────────────────────
// Batches
// ─────────────────────────────────────────────────────────────────────

#[test]
fn batch_keeps_going_past_failures() {
    let mut rc = rule_compiler();
    let batch = rc.compile_batch([
        ("Kokiri Forest", "True"),
        ("Broken", "a == = b"),
        ("Lost Woods", "can_play(Sarias_Song)"),
        ("Also Broken", "world.can_reach(x)"),
        ("Deku Tree", "True"),
    ]);

    assert_eq!(batch.len(), 3);
    assert_eq!(batch.shared, 1);
    assert!(Arc::ptr_eq(
        batch.get("Kokiri Forest").unwrap(),
        batch.get("Deku Tree").unwrap()
    ));
    assert_eq!(batch.diagnostics.total_errors, 2);
    let rules: Vec<_> = batch.diagnostics.errors.iter().map(|e| e.rule.as_str()).collect();
    assert_eq!(rules, ["Broken", "Also Broken"]);
    assert_eq!(batch.diagnostics.errors[1].code, ErrorCode::UNSUPPORTED_CALLEE);
}

#[test]
fn report_lists_rules_and_errors() {
    let mut rc = rule_compiler();
    let batch = rc.compile_batch(vec![
        ("Open".to_string(), "not False".to_string()),
        ("Gate".to_string(), "is_adult".to_string()),
        ("Bad".to_string(), "(".to_string()),
    ]);
    let json: serde_json::Value = serde_json::from_str(&batch.report_json().unwrap()).unwrap();

    assert_eq!(json["rules"][0]["name"], "Open");
    assert_eq!(json["rules"][0]["constant"], true);
    assert!(json["rules"][1].get("constant").is_none());
    assert_eq!(json["diagnostics"]["total_errors"], 1);
    assert_eq!(json["diagnostics"]["errors"][0]["rule"], "Bad");
    assert_eq!(json["diagnostics"]["errors"][0]["category"], "lexical");
}

#[test]
fn diagnostics_cap_kept_errors() {
    let mut rc = rule_compiler();
    let rules: Vec<(String, &str)> = (0..30).map(|i| (format!("rule {i}"), "and")).collect();
    let batch = rc.compile_batch(rules);
    assert_eq!(batch.diagnostics.total_errors, 30);
    assert_eq!(batch.diagnostics.errors.len(), kokiri_types::MAX_ERRORS);
}

// ─────────────────────────────────────────────────────────────────────
// Determinism
// ─────────────────────────────────────────────────────────────────────

#[test]
fn batch_compilation_is_deterministic() {
    let rules = [
        ("a", "all_of(is_adult, Hookshot, not Slingshot)"),
        ("b", "any_of(x == 'ohko', y < 3)"),
        ("c", "can_play(Song_of_Time) or False"),
    ];
    let reference = rule_compiler().compile_batch(rules);
    for _ in 0..100 {
        let again = rule_compiler().compile_batch(rules);
        for (name, chunk) in &reference.rules {
            assert_eq!(again.get(name), Some(chunk));
        }
    }
}
