//! Deterministic run fingerprint generator used for cross-host comparison.

use cascade_core::{Machine, Program};
use proptest as _;
use rstest as _;
#[cfg(feature = "serde")]
use serde as _;
use thiserror as _;

fn hash_bytes(hash: &mut u64, bytes: &[u8]) {
    for byte in bytes {
        *hash ^= u64::from(*byte);
        *hash = hash.wrapping_mul(0x1000_0000_01B3);
    }
}

fn fingerprint() -> String {
    let program: Program = "109,1,204,-1,1001,100,1,100,1008,100,16,101,1006,101,0,99"
        .parse()
        .expect("fixture program is well formed");

    let mut machine = Machine::new(&program);
    let outputs = machine.run_batch(&[]).expect("fixture program halts cleanly");

    let mut hash = 0xcbf2_9ce4_8422_2325_u64;
    for value in &outputs {
        hash_bytes(&mut hash, &value.to_le_bytes());
    }
    for cell in machine.memory().image() {
        hash_bytes(&mut hash, &cell.to_le_bytes());
    }
    hash_bytes(&mut hash, &machine.pc().to_le_bytes());
    hash_bytes(&mut hash, &machine.relative_base().to_le_bytes());

    format!("{hash:016x}")
}

fn main() {
    println!("{}", fingerprint());
}
