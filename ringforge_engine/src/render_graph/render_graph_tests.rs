/// Tests for RenderGraph
///
/// These tests validate dependency ordering, cycle detection, setup failure
/// isolation, recovery through validity polling and the per-frame protocol.

use super::*;
use std::sync::{Arc, Mutex};

// ============================================================================
// Test helpers
// ============================================================================

type EventLog = Arc<Mutex<Vec<String>>>;

#[derive(Default)]
struct TestContext {
    shaders_ready: bool,
}

struct TestPass {
    name: String,
    dependencies: Vec<String>,
    needs_shaders: bool,
    fail_update: bool,
    events: EventLog,
}

impl TestPass {
    fn new(name: &str, events: &EventLog) -> Self {
        Self {
            name: name.to_string(),
            dependencies: Vec::new(),
            needs_shaders: false,
            fail_update: false,
            events: events.clone(),
        }
    }

    fn depends_on(mut self, names: &[&str]) -> Self {
        self.dependencies = names.iter().map(|n| n.to_string()).collect();
        self
    }

    fn needs_shaders(mut self) -> Self {
        self.needs_shaders = true;
        self
    }

    fn failing_update(mut self) -> Self {
        self.fail_update = true;
        self
    }

    fn record(&self, event: &str) {
        self.events.lock().unwrap().push(format!("{}:{}", event, self.name));
    }
}

impl RenderPass<TestContext> for TestPass {
    fn name(&self) -> &str {
        &self.name
    }

    fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    fn setup(&mut self, ctx: &mut TestContext) -> Result<()> {
        self.record("setup");
        if self.needs_shaders && !ctx.shaders_ready {
            return Err(Error::BackendError("shaders not compiled".to_string()));
        }
        Ok(())
    }

    fn prepare(&mut self, _frame: &FrameInfo) -> Result<()> {
        self.record("prepare");
        Ok(())
    }

    fn update(&mut self, _ctx: &mut TestContext, _frame: &FrameInfo) -> Result<()> {
        self.record("update");
        if self.fail_update {
            return Err(Error::BackendError("uniform upload failed".to_string()));
        }
        Ok(())
    }

    fn execute(&mut self, _ctx: &mut TestContext, _frame: &FrameInfo) -> Result<()> {
        self.record("execute");
        Ok(())
    }

    fn teardown(&mut self, _ctx: &mut TestContext) {
        self.record("teardown");
    }

    fn check_validity(&mut self, ctx: &TestContext) -> bool {
        self.record("check");
        ctx.shaders_ready
    }

    fn reset(&mut self, _ctx: &mut TestContext) {
        self.record("reset");
    }
}

fn frame(frame_number: u64) -> FrameInfo {
    FrameInfo::new((frame_number % 2) as usize, frame_number, 0.016)
}

fn count(events: &EventLog, event: &str) -> usize {
    events.lock().unwrap().iter().filter(|e| e.as_str() == event).count()
}

fn position(order: &[&str], name: &str) -> usize {
    order.iter().position(|n| *n == name).unwrap()
}

// ============================================================================
// Tests: Pass management
// ============================================================================

#[test]
fn test_add_pass_duplicate_name_fails() {
    let events = EventLog::default();
    let mut graph = RenderGraph::<TestContext>::new();
    graph.add_pass(TestPass::new("shadow", &events)).unwrap();

    assert!(matches!(
        graph.add_pass(TestPass::new("shadow", &events)),
        Err(Error::InvalidResource(_))
    ));
    assert_eq!(graph.pass_count(), 1);
}

#[test]
fn test_new_pass_is_enabled_and_uninitialized() {
    let events = EventLog::default();
    let mut graph = RenderGraph::<TestContext>::new();
    let key = graph.add_pass(TestPass::new("shadow", &events)).unwrap();

    assert_eq!(graph.pass_key("shadow"), Some(key));
    assert_eq!(graph.is_pass_enabled("shadow"), Some(true));
    assert_eq!(graph.pass_state("shadow"), Some(PassState::Uninitialized));
    assert!(graph.needs_recompile());
}

#[test]
fn test_unknown_pass_operations_fail() {
    let mut graph = RenderGraph::<TestContext>::new();
    let mut ctx = TestContext::default();

    assert!(matches!(graph.set_pass_enabled("ghost", false), Err(Error::ResourceNotFound(_))));
    assert!(matches!(graph.remove_pass("ghost", &mut ctx), Err(Error::ResourceNotFound(_))));
    assert!(graph.pass_state("ghost").is_none());
}

// ============================================================================
// Tests: Ordering
// ============================================================================

#[test]
fn test_dependencies_run_first() {
    let events = EventLog::default();
    let mut graph = RenderGraph::new();
    let mut ctx = TestContext::default();
    graph.add_pass(TestPass::new("post", &events).depends_on(&["geometry"])).unwrap();
    graph.add_pass(TestPass::new("geometry", &events).depends_on(&["shadow"])).unwrap();
    graph.add_pass(TestPass::new("shadow", &events)).unwrap();

    graph.setup(&mut ctx);
    graph.compile().unwrap();

    assert_eq!(graph.execution_order(), vec!["shadow", "geometry", "post"]);
}

#[test]
fn test_independent_passes_keep_insertion_order() {
    let events = EventLog::default();
    let mut graph = RenderGraph::new();
    let mut ctx = TestContext::default();
    for name in ["ui", "sky", "fog"] {
        graph.add_pass(TestPass::new(name, &events)).unwrap();
    }

    graph.setup(&mut ctx);
    graph.compile().unwrap();

    assert_eq!(graph.execution_order(), vec!["ui", "sky", "fog"]);
}

#[test]
fn test_diamond_satisfies_every_edge() {
    let events = EventLog::default();
    let mut graph = RenderGraph::new();
    let mut ctx = TestContext::default();
    graph.add_pass(TestPass::new("composite", &events).depends_on(&["ssao", "bloom"])).unwrap();
    graph.add_pass(TestPass::new("ssao", &events).depends_on(&["depth"])).unwrap();
    graph.add_pass(TestPass::new("bloom", &events).depends_on(&["depth"])).unwrap();
    graph.add_pass(TestPass::new("depth", &events)).unwrap();

    graph.setup(&mut ctx);
    graph.compile().unwrap();
    let order = graph.execution_order();

    assert_eq!(order.len(), 4);
    for (pass, dependency) in [("composite", "ssao"), ("composite", "bloom"), ("ssao", "depth"), ("bloom", "depth")] {
        assert!(position(&order, dependency) < position(&order, pass));
    }
    // Ties between ssao and bloom follow insertion order
    assert!(position(&order, "ssao") < position(&order, "bloom"));
}

#[test]
fn test_cycle_is_detected() {
    let events = EventLog::default();
    let mut graph = RenderGraph::new();
    let mut ctx = TestContext::default();
    graph.add_pass(TestPass::new("A", &events).depends_on(&["B"])).unwrap();
    graph.add_pass(TestPass::new("B", &events).depends_on(&["C"])).unwrap();
    graph.add_pass(TestPass::new("C", &events).depends_on(&["A"])).unwrap();
    graph.setup(&mut ctx);

    match graph.compile() {
        Err(Error::CyclicDependency(passes)) => assert_eq!(passes, vec!["A", "B", "C"]),
        other => panic!("Expected CyclicDependency, got {:?}", other),
    }
    assert!(graph.execution_order().is_empty());
    assert!(graph.needs_recompile());
}

#[test]
fn test_cycle_keeps_previous_order_and_blocks_frames() {
    let events = EventLog::default();
    let mut graph = RenderGraph::new();
    let mut ctx = TestContext::default();
    graph.add_pass(TestPass::new("base", &events)).unwrap();
    graph.setup(&mut ctx);
    graph.compile().unwrap();

    graph.add_pass(TestPass::new("X", &events).depends_on(&["Y"])).unwrap();
    graph.add_pass(TestPass::new("Y", &events).depends_on(&["X"])).unwrap();
    graph.setup(&mut ctx);

    assert!(graph.compile().is_err());
    assert_eq!(graph.execution_order(), vec!["base"]);
    assert!(matches!(graph.run_frame(&mut ctx, &frame(0)), Err(Error::CyclicDependency(_))));

    // Disabling one pass of the cycle resolves it
    graph.set_pass_enabled("X", false).unwrap();
    graph.compile().unwrap();
    assert_eq!(graph.execution_order(), vec!["base", "Y"]);
}

#[test]
fn test_disabled_dependency_is_ignored() {
    let events = EventLog::default();
    let mut graph = RenderGraph::new();
    let mut ctx = TestContext::default();
    graph.add_pass(TestPass::new("shadow", &events)).unwrap();
    graph.add_pass(TestPass::new("geometry", &events).depends_on(&["shadow"])).unwrap();
    graph.setup(&mut ctx);

    graph.set_pass_enabled("shadow", false).unwrap();
    graph.compile().unwrap();
    assert_eq!(graph.execution_order(), vec!["geometry"]);

    graph.set_pass_enabled("shadow", true).unwrap();
    assert!(graph.needs_recompile());
    graph.compile().unwrap();
    assert_eq!(graph.execution_order(), vec!["shadow", "geometry"]);
}

#[test]
fn test_unknown_dependency_is_ignored() {
    let events = EventLog::default();
    let mut graph = RenderGraph::new();
    let mut ctx = TestContext::default();
    graph.add_pass(TestPass::new("geometry", &events).depends_on(&["ghost"])).unwrap();
    graph.setup(&mut ctx);

    graph.compile().unwrap();
    assert_eq!(graph.execution_order(), vec!["geometry"]);
}

// ============================================================================
// Tests: Setup failures and recovery
// ============================================================================

#[test]
fn test_setup_failure_isolates_pass() {
    let events = EventLog::default();
    let mut graph = RenderGraph::new();
    let mut ctx = TestContext::default();
    graph.add_pass(TestPass::new("shadow", &events)).unwrap();
    graph.add_pass(TestPass::new("bloom", &events).needs_shaders()).unwrap();
    graph.add_pass(TestPass::new("post", &events).depends_on(&["bloom"])).unwrap();

    assert_eq!(graph.setup(&mut ctx), 1);

    assert_eq!(graph.pass_state("bloom"), Some(PassState::Invalid));
    assert_eq!(graph.is_pass_enabled("bloom"), Some(true));
    assert!(matches!(graph.setup_error("bloom"), Some(Error::PassSetupFailed { pass, .. }) if pass == "bloom"));

    graph.compile().unwrap();
    assert_eq!(graph.execution_order(), vec!["shadow", "post"]);
}

#[test]
fn test_recovered_pass_joins_at_next_frame() {
    let events = EventLog::default();
    let mut graph = RenderGraph::new();
    let mut ctx = TestContext::default();
    graph.add_pass(TestPass::new("geometry", &events)).unwrap();
    graph.add_pass(TestPass::new("bloom", &events).needs_shaders().depends_on(&["geometry"])).unwrap();

    graph.run_frame(&mut ctx, &frame(0)).unwrap();
    assert_eq!(graph.pass_state("bloom"), Some(PassState::Invalid));
    assert_eq!(count(&events, "check:bloom"), 1);

    // Shaders finish compiling: recovery happens after execute of frame 1
    ctx.shaders_ready = true;
    graph.run_frame(&mut ctx, &frame(1)).unwrap();
    assert_eq!(graph.pass_state("bloom"), Some(PassState::Active));
    assert_eq!(count(&events, "setup:bloom"), 2);
    assert_eq!(count(&events, "execute:bloom"), 0);
    assert!(graph.needs_recompile());
    assert_eq!(graph.execution_order(), vec!["geometry"]);

    graph.run_frame(&mut ctx, &frame(2)).unwrap();
    assert_eq!(graph.execution_order(), vec!["geometry", "bloom"]);
    assert_eq!(count(&events, "execute:bloom"), 1);
    assert_eq!(count(&events, "update:bloom"), 1);
}

#[test]
fn test_recovery_keeps_operator_disable() {
    let events = EventLog::default();
    let mut graph = RenderGraph::new();
    let mut ctx = TestContext::default();
    graph.add_pass(TestPass::new("bloom", &events).needs_shaders()).unwrap();
    graph.setup(&mut ctx);
    graph.set_pass_enabled("bloom", false).unwrap();

    ctx.shaders_ready = true;
    graph.run_frame(&mut ctx, &frame(0)).unwrap();
    graph.run_frame(&mut ctx, &frame(1)).unwrap();

    assert_eq!(graph.pass_state("bloom"), Some(PassState::Active));
    assert_eq!(graph.is_pass_enabled("bloom"), Some(false));
    assert!(graph.execution_order().is_empty());
    assert_eq!(count(&events, "execute:bloom"), 0);
}

#[test]
fn test_validity_check_interval() {
    let events = EventLog::default();
    let mut graph = RenderGraph::new().with_validity_check_interval(3);
    let mut ctx = TestContext::default();
    graph.add_pass(TestPass::new("bloom", &events).needs_shaders()).unwrap();
    graph.setup(&mut ctx);

    for n in 0..6 {
        graph.run_frame(&mut ctx, &frame(n)).unwrap();
    }

    assert_eq!(count(&events, "check:bloom"), 2);
}

#[test]
fn test_active_passes_are_not_polled() {
    let events = EventLog::default();
    let mut graph = RenderGraph::new();
    let mut ctx = TestContext::default();
    graph.add_pass(TestPass::new("geometry", &events)).unwrap();

    for n in 0..3 {
        graph.run_frame(&mut ctx, &frame(n)).unwrap();
    }

    assert_eq!(count(&events, "check:geometry"), 0);
    assert_eq!(count(&events, "setup:geometry"), 1);
}

// ============================================================================
// Tests: Frame protocol
// ============================================================================

#[test]
fn test_frame_stages_run_in_order() {
    let events = EventLog::default();
    let mut graph = RenderGraph::new();
    let mut ctx = TestContext::default();
    graph.add_pass(TestPass::new("A", &events)).unwrap();
    graph.add_pass(TestPass::new("B", &events).depends_on(&["A"])).unwrap();
    graph.setup(&mut ctx);
    events.lock().unwrap().clear();

    graph.run_frame(&mut ctx, &frame(0)).unwrap();

    assert_eq!(*events.lock().unwrap(), vec![
        "prepare:A", "prepare:B",
        "update:A", "update:B",
        "execute:A", "execute:B",
    ]);
}

#[test]
fn test_pass_enabled_mid_frame_waits_for_next_prepare() {
    let events = EventLog::default();
    let mut graph = RenderGraph::new();
    let mut ctx = TestContext::default();
    graph.add_pass(TestPass::new("a", &events)).unwrap();
    graph.add_pass(TestPass::new("late", &events)).unwrap();
    graph.set_pass_enabled("late", false).unwrap();
    graph.run_frame(&mut ctx, &frame(0)).unwrap();
    events.lock().unwrap().clear();

    graph.prepare(&frame(1)).unwrap();
    graph.set_pass_enabled("late", true).unwrap();
    graph.update(&mut ctx, &frame(1)).unwrap();
    graph.execute(&mut ctx, &frame(1)).unwrap();

    assert_eq!(*events.lock().unwrap(), vec!["prepare:a", "update:a", "execute:a"]);
    assert_eq!(graph.execution_order(), vec!["a"]);
    assert!(graph.needs_recompile());

    events.lock().unwrap().clear();
    graph.run_frame(&mut ctx, &frame(2)).unwrap();
    assert_eq!(*events.lock().unwrap(), vec![
        "prepare:a", "prepare:late",
        "update:a", "update:late",
        "execute:a", "execute:late",
    ]);
}

#[test]
fn test_update_error_propagates_without_disabling() {
    let events = EventLog::default();
    let mut graph = RenderGraph::new();
    let mut ctx = TestContext::default();
    graph.add_pass(TestPass::new("flaky", &events).failing_update()).unwrap();
    graph.add_pass(TestPass::new("after", &events).depends_on(&["flaky"])).unwrap();

    assert!(graph.run_frame(&mut ctx, &frame(0)).is_err());
    assert_eq!(count(&events, "update:after"), 0);
    assert_eq!(count(&events, "execute:flaky"), 0);

    assert_eq!(graph.pass_state("flaky"), Some(PassState::Active));
    assert_eq!(graph.is_pass_enabled("flaky"), Some(true));
    assert_eq!(graph.execution_order(), vec!["flaky", "after"]);
}

// ============================================================================
// Tests: Lifecycle
// ============================================================================

#[test]
fn test_remove_pass_tears_down() {
    let events = EventLog::default();
    let mut graph = RenderGraph::new();
    let mut ctx = TestContext::default();
    graph.add_pass(TestPass::new("shadow", &events)).unwrap();
    graph.add_pass(TestPass::new("geometry", &events).depends_on(&["shadow"])).unwrap();
    graph.setup(&mut ctx);
    graph.compile().unwrap();

    graph.remove_pass("shadow", &mut ctx).unwrap();

    assert_eq!(count(&events, "teardown:shadow"), 1);
    assert_eq!(graph.pass_count(), 1);
    assert!(graph.pass_key("shadow").is_none());
    assert_eq!(graph.execution_order(), vec!["geometry"]);
}

#[test]
fn test_teardown_reverses_insertion_order() {
    let events = EventLog::default();
    let mut graph = RenderGraph::new();
    let mut ctx = TestContext::default();
    graph.add_pass(TestPass::new("A", &events)).unwrap();
    graph.add_pass(TestPass::new("B", &events).needs_shaders()).unwrap();
    graph.add_pass(TestPass::new("C", &events)).unwrap();
    graph.setup(&mut ctx);
    events.lock().unwrap().clear();

    graph.teardown(&mut ctx);

    // B never set up successfully, so it is not torn down
    assert_eq!(*events.lock().unwrap(), vec!["teardown:C", "teardown:A"]);
    assert_eq!(graph.pass_state("B"), Some(PassState::Uninitialized));
    assert!(graph.execution_order().is_empty());
}

#[test]
fn test_reset_passes_only_touches_active_passes() {
    let events = EventLog::default();
    let mut graph = RenderGraph::new();
    let mut ctx = TestContext::default();
    graph.add_pass(TestPass::new("taa", &events)).unwrap();
    graph.add_pass(TestPass::new("bloom", &events).needs_shaders()).unwrap();
    graph.setup(&mut ctx);

    graph.reset_passes(&mut ctx);

    assert_eq!(count(&events, "reset:taa"), 1);
    assert_eq!(count(&events, "reset:bloom"), 0);
}

#[test]
fn test_passes_added_later_are_set_up_by_run_frame() {
    let events = EventLog::default();
    let mut graph = RenderGraph::new();
    let mut ctx = TestContext::default();
    graph.add_pass(TestPass::new("A", &events)).unwrap();
    graph.run_frame(&mut ctx, &frame(0)).unwrap();

    graph.add_pass(TestPass::new("B", &events).depends_on(&["A"])).unwrap();
    graph.run_frame(&mut ctx, &frame(1)).unwrap();

    assert_eq!(count(&events, "setup:A"), 1);
    assert_eq!(count(&events, "setup:B"), 1);
    assert_eq!(graph.execution_order(), vec!["A", "B"]);
}
