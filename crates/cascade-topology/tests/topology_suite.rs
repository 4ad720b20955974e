//! End-to-end topology coverage: pipelines, feedback rings, and routed
//! networks built from known programs with pinned results.

#![allow(clippy::pedantic, clippy::nursery)]

use cascade_core::{Fault, Program, Word};
use cascade_topology::{
    run_feedback_ring, run_pipeline, run_routed_network, run_until_monitor_packet, TopologyError,
};
use env_logger as _;
use log as _;
use rstest::rstest;
use thiserror as _;

fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn program(text: &str) -> Program {
    text.parse().expect("fixture program is well formed")
}

/// Reads a phase and a signal, then emits their sum.
const ADDER_STAGE: &str = "3,11,3,12,1,11,12,11,4,11,99,0,0";

#[rstest]
#[case("3,15,3,16,1002,16,10,16,1,16,15,15,4,15,99,0,0", &[4, 3, 2, 1, 0], 43_210)]
#[case(
    "3,23,3,24,1002,24,10,24,1002,23,-1,23,101,5,23,23,1,24,23,23,4,23,99,0,0",
    &[0, 1, 2, 3, 4],
    54_321
)]
#[case(
    "3,31,3,32,1002,32,10,32,1001,31,-2,31,1007,31,0,33,1002,33,7,33,1,33,31,31,\
     1,32,31,31,4,31,99,0,0,0",
    &[1, 0, 4, 3, 2],
    65_210
)]
fn pipeline_produces_known_signals(
    #[case] text: &str,
    #[case] phases: &[Word],
    #[case] expected: Word,
) {
    init_logs();
    assert_eq!(run_pipeline(&program(text), phases), Ok(expected));
}

#[rstest]
#[case(&[7], 7)]
#[case(&[1, 2, 3], 6)]
#[case(&[0, 0, 0, 0, 0], 0)]
fn pipeline_of_adder_stages_accumulates_phases(#[case] phases: &[Word], #[case] expected: Word) {
    init_logs();
    assert_eq!(run_pipeline(&program(ADDER_STAGE), phases), Ok(expected));
}

#[test]
fn pipeline_rejects_empty_phase_list() {
    init_logs();
    assert_eq!(
        run_pipeline(&program(ADDER_STAGE), &[]),
        Err(TopologyError::Empty)
    );
}

#[test]
fn pipeline_reports_starved_stage_instead_of_hanging() {
    init_logs();
    // Asks for a third input that no upstream will ever provide; the head
    // hangup must cancel the stage rather than leave it blocked.
    let greedy = program("3,0,3,0,3,0,4,0,99");
    assert_eq!(
        run_pipeline(&greedy, &[5]),
        Err(TopologyError::Stalled { stage: 0 })
    );
}

#[test]
fn pipeline_propagates_stage_fault_with_location() {
    init_logs();
    let faulty = program("3,0,3,0,55");
    assert_eq!(
        run_pipeline(&faulty, &[1]),
        Err(TopologyError::Machine(Fault::InvalidOpcode {
            pc: 4,
            word: 55
        }))
    );
}

#[rstest]
#[case(
    "3,26,1001,26,-4,26,3,27,1002,27,2,27,1,27,26,27,4,27,1001,28,-1,28,1005,28,\
     6,99,0,0,5",
    &[9, 8, 7, 6, 5],
    139_629_729
)]
#[case(
    "3,52,1001,52,-5,52,3,53,1,52,56,54,1007,54,5,55,1005,55,26,1001,54,-5,54,\
     1105,1,12,1,53,54,53,1008,54,0,55,1001,55,1,55,2,53,55,53,4,53,1001,56,-1,\
     56,1005,56,6,99,0,0,0,0,10",
    &[9, 7, 8, 5, 6],
    18_216
)]
fn feedback_ring_converges_to_known_signal(
    #[case] text: &str,
    #[case] phases: &[Word],
    #[case] expected: Word,
) {
    init_logs();
    assert_eq!(run_feedback_ring(&program(text), phases), Ok(expected));
}

#[test]
fn feedback_ring_rejects_empty_phase_list() {
    init_logs();
    assert_eq!(
        run_feedback_ring(&program(ADDER_STAGE), &[]),
        Err(TopologyError::Empty)
    );
}

#[test]
fn ring_reports_wedged_cycle_instead_of_hanging() {
    init_logs();
    // Each stage demands a third input, but its seeds are all any neighbour
    // ever provides; every stage ends up waiting on its upstream with all
    // edges still connected, so only the bounded input wait can notice.
    let greedy = program("3,0,3,0,3,0,4,0,99");
    let result = run_feedback_ring(&greedy, &[5, 6]);
    assert!(
        matches!(result, Err(TopologyError::Stalled { .. })),
        "expected a wedged-cycle verdict, got {result:?}"
    );
}

#[test]
fn single_stage_ring_loops_its_own_output_back() {
    init_logs();
    // One adder stage wired to itself: reads phase 3 and signal 0, loops
    // 3 back onto its own input edge, then halts without consuming it.
    assert_eq!(run_feedback_ring(&program(ADDER_STAGE), &[3]), Ok(3));
}

/// Node 0 emits a single monitor packet `(255, 7, 42)` and then consumes
/// input forever; every other node consumes input forever from the start.
const MONITOR_BEACON: &str = "3,50,1005,50,11,104,255,104,7,104,42,3,51,1105,1,11";

/// Consumes input forever and never emits anything.
const SILENT_NODE: &str = "3,50,1105,1,0";

#[test]
fn network_reports_first_monitor_packet() {
    init_logs();
    assert_eq!(run_until_monitor_packet(&program(MONITOR_BEACON), 4), Ok(42));
}

#[test]
fn network_reaches_monitor_fixpoint() {
    init_logs();
    // The monitor holds (7, 42); every idle period re-injects it into
    // node 0, so the second injection repeats y = 42.
    assert_eq!(run_routed_network(&program(MONITOR_BEACON), 4), Ok(42));
}

#[test]
fn network_with_no_traffic_is_reported_not_hung() {
    init_logs();
    let result = run_routed_network(&program(SILENT_NODE), 3);
    assert!(
        matches!(result, Err(TopologyError::IdleWithoutTraffic { passes }) if passes > 0),
        "expected idle verdict, got {result:?}"
    );
}

#[test]
fn network_rejects_zero_nodes() {
    init_logs();
    assert_eq!(
        run_routed_network(&program(SILENT_NODE), 0),
        Err(TopologyError::Empty)
    );
}

#[test]
fn network_propagates_node_fault() {
    init_logs();
    // Reads the address seed, then trips on an undefined opcode.
    let faulty = program("3,0,55");
    assert_eq!(
        run_until_monitor_packet(&faulty, 2),
        Err(TopologyError::Machine(Fault::InvalidOpcode {
            pc: 2,
            word: 55
        }))
    );
}
