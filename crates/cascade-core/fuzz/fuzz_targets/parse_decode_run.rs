#![no_main]

use cascade_core::{decode, Machine, Program, Step, Word};
use libfuzzer_sys::fuzz_target;

const STEP_BUDGET: usize = 4096;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    let Ok(program) = text.parse::<Program>() else {
        return;
    };

    for word in program.words() {
        let _ = decode(*word);
    }

    // Bounded batch run: arbitrary programs may loop, so cap the steps and
    // feed a fixed input on demand. Faults are expected outcomes here; the
    // target only hunts panics and runaway allocation.
    let mut machine = Machine::new(&program);
    let mut produced = 0_usize;
    for _ in 0..STEP_BUDGET {
        match machine.step() {
            Ok(Step::Continue) => {}
            Ok(Step::NeedsInput) => {
                if machine.resolve_input(Word::from(1_i8)).is_err() {
                    break;
                }
            }
            Ok(Step::Output(_)) => {
                produced += 1;
                if produced > STEP_BUDGET {
                    break;
                }
            }
            Ok(Step::Halted) | Err(_) => break,
        }
    }
});
