//! Extensible memory model with position/immediate/relative addressing.
//!
//! Addresses inside the original program image index a dense vector;
//! addresses beyond it live in a sparse map that materialises cells on
//! first write. Reads of never-written cells yield 0 regardless of access
//! order, and a write never shrinks the addressable space.

use std::collections::HashMap;

use thiserror::Error;

use crate::decoder::Mode;
use crate::{Program, Word};

/// Errors raised while resolving an operand against memory.
///
/// These carry no program counter; the machine attaches one when it maps
/// them into [`crate::Fault`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AccessError {
    /// The operand resolved to a negative address.
    #[error("operand resolved to negative address {address}")]
    NegativeAddress {
        /// The resolved, out-of-range address value.
        address: Word,
    },
    /// A write target was encoded in immediate mode.
    #[error("write target encoded in immediate mode")]
    ImmediateWrite,
}

/// One machine's private memory: dense program image plus sparse overflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Memory {
    image: Vec<Word>,
    extended: HashMap<usize, Word>,
}

impl Memory {
    /// Loads a fresh memory from a parsed program image.
    #[must_use]
    pub fn new(program: &Program) -> Self {
        Self {
            image: program.words().to_vec(),
            extended: HashMap::new(),
        }
    }

    /// Reads the cell at `address`, yielding 0 for never-written cells.
    #[must_use]
    pub fn load(&self, address: usize) -> Word {
        if address < self.image.len() {
            self.image[address]
        } else {
            self.extended.get(&address).copied().unwrap_or(0)
        }
    }

    /// Writes `value` to the cell at `address`, extending the sparse space
    /// when the address lies beyond the program image.
    pub fn store(&mut self, address: usize, value: Word) {
        if address < self.image.len() {
            self.image[address] = value;
        } else {
            self.extended.insert(address, value);
        }
    }

    /// Resolves `operand` under `mode` and reads the value it denotes.
    ///
    /// # Errors
    ///
    /// Returns [`AccessError::NegativeAddress`] when a position or
    /// relative operand dereferences below address 0.
    pub fn read(&self, operand: Word, mode: Mode, relative_base: Word) -> Result<Word, AccessError> {
        match mode {
            Mode::Immediate => Ok(operand),
            Mode::Position => Ok(self.load(Self::resolve(operand)?)),
            Mode::Relative => Ok(self.load(Self::resolve(relative_base + operand)?)),
        }
    }

    /// Resolves `operand` under `mode` and writes `value` to the cell it
    /// denotes.
    ///
    /// # Errors
    ///
    /// Returns [`AccessError::ImmediateWrite`] for immediate-mode targets
    /// and [`AccessError::NegativeAddress`] for addresses below 0.
    pub fn write(
        &mut self,
        operand: Word,
        mode: Mode,
        relative_base: Word,
        value: Word,
    ) -> Result<(), AccessError> {
        let address = match mode {
            Mode::Immediate => return Err(AccessError::ImmediateWrite),
            Mode::Position => Self::resolve(operand)?,
            Mode::Relative => Self::resolve(relative_base + operand)?,
        };
        self.store(address, value);
        Ok(())
    }

    /// Returns the dense image, including any self-modifications, for
    /// final-state inspection.
    #[must_use]
    pub fn image(&self) -> &[Word] {
        &self.image
    }

    fn resolve(address: Word) -> Result<usize, AccessError> {
        usize::try_from(address).map_err(|_| AccessError::NegativeAddress { address })
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::{AccessError, Memory, Mode};
    use crate::Program;

    fn memory(words: &[crate::Word]) -> Memory {
        Memory::new(&Program::from(words.to_vec()))
    }

    #[test]
    fn position_mode_dereferences_the_operand() {
        let mem = memory(&[10, 20, 30]);
        assert_eq!(mem.read(2, Mode::Position, 0), Ok(30));
    }

    #[test]
    fn immediate_mode_returns_the_operand_itself() {
        let mem = memory(&[10, 20, 30]);
        assert_eq!(mem.read(-7, Mode::Immediate, 0), Ok(-7));
    }

    #[test]
    fn relative_mode_offsets_by_the_base_before_dereferencing() {
        let mem = memory(&[10, 20, 30]);
        assert_eq!(mem.read(-1, Mode::Relative, 2), Ok(20));
    }

    #[test]
    fn relative_with_zero_base_equals_position() {
        let mem = memory(&[5, 6, 7, 8]);
        for operand in 0..4 {
            assert_eq!(
                mem.read(operand, Mode::Relative, 0),
                mem.read(operand, Mode::Position, 0)
            );
        }
    }

    #[test]
    fn first_read_of_extended_cell_is_zero_in_any_order() {
        let mut mem = memory(&[99]);
        assert_eq!(mem.load(1_000_000), 0);
        mem.store(1_000_001, 17);
        assert_eq!(mem.load(1_000_000), 0);
        assert_eq!(mem.load(1_000_001), 17);
    }

    #[test]
    fn writes_round_trip_through_both_regions() {
        let mut mem = memory(&[0, 0, 0]);
        mem.write(1, Mode::Position, 0, -42).expect("legal write");
        assert_eq!(mem.read(1, Mode::Position, 0), Ok(-42));

        mem.write(3, Mode::Relative, 500, 77).expect("legal write");
        assert_eq!(mem.load(503), 77);
        assert_eq!(mem.read(3, Mode::Relative, 500), Ok(77));
    }

    #[test]
    fn immediate_write_is_rejected() {
        let mut mem = memory(&[0]);
        assert_eq!(
            mem.write(0, Mode::Immediate, 0, 1),
            Err(AccessError::ImmediateWrite)
        );
    }

    #[test]
    fn negative_resolution_is_fatal_not_clamped() {
        let mut mem = memory(&[0, 0]);
        assert_eq!(
            mem.read(-3, Mode::Position, 0),
            Err(AccessError::NegativeAddress { address: -3 })
        );
        assert_eq!(
            mem.read(1, Mode::Relative, -10),
            Err(AccessError::NegativeAddress { address: -9 })
        );
        assert_eq!(
            mem.write(-1, Mode::Position, 0, 5),
            Err(AccessError::NegativeAddress { address: -1 })
        );
    }

    proptest! {
        #[test]
        fn property_store_then_load_returns_exactly_the_value(
            address in 0_usize..10_000,
            value in any::<i64>(),
        ) {
            let mut mem = memory(&[1, 2, 3]);
            mem.store(address, crate::Word::from(value));
            prop_assert_eq!(mem.load(address), crate::Word::from(value));
        }

        #[test]
        fn property_untouched_cells_always_read_zero(address in 100_usize..100_000) {
            let mem = memory(&[7; 100]);
            prop_assert_eq!(mem.load(address), 0);
        }
    }
}
