//! Pure instruction-word decoder.
//!
//! An instruction word packs an opcode into its two low decimal digits and
//! one parameter mode per operand into the hundreds, thousands, and
//! ten-thousands digits. Absent digits decode as position mode. Decoding
//! has no side effects and no dependency on machine state.

use thiserror::Error;

use crate::Word;

/// Defined opcodes, tagged with their decimal encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Opcode {
    /// `1`: add two operands into a target cell.
    Add,
    /// `2`: multiply two operands into a target cell.
    Mul,
    /// `3`: receive one value from the input edge into a target cell.
    Input,
    /// `4`: send one operand value onto the output edge.
    Output,
    /// `5`: jump to the second operand when the first is non-zero.
    JumpIfTrue,
    /// `6`: jump to the second operand when the first is zero.
    JumpIfFalse,
    /// `7`: write 1 when the first operand is less than the second, else 0.
    LessThan,
    /// `8`: write 1 when the operands are equal, else 0.
    Equals,
    /// `9`: add the operand to the relative base.
    AdjustRelativeBase,
    /// `99`: stop execution.
    Halt,
}

impl Opcode {
    /// Converts the low two decimal digits of an instruction word into an
    /// opcode.
    #[must_use]
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::Add),
            2 => Some(Self::Mul),
            3 => Some(Self::Input),
            4 => Some(Self::Output),
            5 => Some(Self::JumpIfTrue),
            6 => Some(Self::JumpIfFalse),
            7 => Some(Self::LessThan),
            8 => Some(Self::Equals),
            9 => Some(Self::AdjustRelativeBase),
            99 => Some(Self::Halt),
            _ => None,
        }
    }

    /// Returns the decimal encoding of this opcode.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Add => 1,
            Self::Mul => 2,
            Self::Input => 3,
            Self::Output => 4,
            Self::JumpIfTrue => 5,
            Self::JumpIfFalse => 6,
            Self::LessThan => 7,
            Self::Equals => 8,
            Self::AdjustRelativeBase => 9,
            Self::Halt => 99,
        }
    }

    /// Returns the number of operand words following the instruction word.
    #[must_use]
    pub const fn operand_count(self) -> usize {
        match self {
            Self::Add | Self::Mul | Self::LessThan | Self::Equals => 3,
            Self::JumpIfTrue | Self::JumpIfFalse => 2,
            Self::Input | Self::Output | Self::AdjustRelativeBase => 1,
            Self::Halt => 0,
        }
    }
}

/// Parameter addressing modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Mode {
    /// `0`: the operand is the address of the value.
    #[default]
    Position,
    /// `1`: the operand is the value itself. Illegal for write targets.
    Immediate,
    /// `2`: the operand plus the relative base is the address of the value.
    Relative,
}

impl Mode {
    /// Converts one decimal mode digit into a mode.
    #[must_use]
    pub const fn from_digit(digit: u8) -> Option<Self> {
        match digit {
            0 => Some(Self::Position),
            1 => Some(Self::Immediate),
            2 => Some(Self::Relative),
            _ => None,
        }
    }
}

/// A decoded instruction: opcode plus one mode per possible operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    /// The decoded opcode.
    pub opcode: Opcode,
    /// Modes for operands 0, 1, and 2. Operands beyond
    /// [`Opcode::operand_count`] keep the position default and are unused.
    pub modes: [Mode; 3],
    /// The raw instruction word, kept for fault reporting.
    pub word: Word,
}

/// Errors raised while decoding a single instruction word.
///
/// The decoder has no program counter; the machine attaches one when it
/// converts these into [`crate::Fault`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The low two digits do not name a defined opcode.
    #[error("unknown opcode in instruction word {word}")]
    UnknownOpcode {
        /// The raw instruction word.
        word: Word,
    },
    /// A mode digit is outside {0, 1, 2}.
    #[error("unknown mode digit {digit} for operand {operand} in instruction word {word}")]
    UnknownMode {
        /// The raw instruction word.
        word: Word,
        /// Zero-based operand index of the bad digit.
        operand: u8,
        /// The offending decimal digit.
        digit: u8,
    },
}

/// Splits an instruction word into opcode and parameter modes.
///
/// # Errors
///
/// Returns [`DecodeError::UnknownOpcode`] for undefined or negative
/// opcodes and [`DecodeError::UnknownMode`] for mode digits outside
/// {0, 1, 2}.
pub fn decode(word: Word) -> Result<Instruction, DecodeError> {
    if word < 0 {
        return Err(DecodeError::UnknownOpcode { word });
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let opcode = Opcode::from_code((word % 100) as u8).ok_or(DecodeError::UnknownOpcode { word })?;

    let mut modes = [Mode::Position; 3];
    let mut digits = word / 100;
    for (operand, slot) in modes.iter_mut().enumerate() {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let digit = (digits % 10) as u8;
        *slot = Mode::from_digit(digit).ok_or(DecodeError::UnknownMode {
            word,
            operand: u8::try_from(operand).unwrap_or(u8::MAX),
            digit,
        })?;
        digits /= 10;
    }

    Ok(Instruction {
        opcode,
        modes,
        word,
    })
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::{decode, DecodeError, Mode, Opcode};

    #[test]
    fn bare_opcodes_decode_with_position_defaults() {
        let instruction = decode(2).expect("defined opcode");
        assert_eq!(instruction.opcode, Opcode::Mul);
        assert_eq!(instruction.modes, [Mode::Position; 3]);
        assert_eq!(instruction.word, 2);
    }

    #[test]
    fn digit_groups_map_to_operand_modes() {
        let instruction = decode(1002).expect("defined opcode");
        assert_eq!(instruction.opcode, Opcode::Mul);
        assert_eq!(
            instruction.modes,
            [Mode::Position, Mode::Immediate, Mode::Position]
        );

        let instruction = decode(21107).expect("defined opcode");
        assert_eq!(instruction.opcode, Opcode::LessThan);
        assert_eq!(
            instruction.modes,
            [Mode::Immediate, Mode::Immediate, Mode::Relative]
        );
    }

    #[rstest]
    #[case(1, Opcode::Add, 3)]
    #[case(2, Opcode::Mul, 3)]
    #[case(3, Opcode::Input, 1)]
    #[case(4, Opcode::Output, 1)]
    #[case(5, Opcode::JumpIfTrue, 2)]
    #[case(6, Opcode::JumpIfFalse, 2)]
    #[case(7, Opcode::LessThan, 3)]
    #[case(8, Opcode::Equals, 3)]
    #[case(9, Opcode::AdjustRelativeBase, 1)]
    #[case(99, Opcode::Halt, 0)]
    fn opcode_codes_roundtrip_with_operand_counts(
        #[case] code: u8,
        #[case] expected: Opcode,
        #[case] operands: usize,
    ) {
        let opcode = Opcode::from_code(code).expect("defined opcode");
        assert_eq!(opcode, expected);
        assert_eq!(opcode.code(), code);
        assert_eq!(opcode.operand_count(), operands);
    }

    #[test]
    fn undefined_opcodes_are_rejected() {
        for code in [0, 10, 42, 98] {
            assert_eq!(decode(code), Err(DecodeError::UnknownOpcode { word: code }));
        }
        assert_eq!(decode(-1), Err(DecodeError::UnknownOpcode { word: -1 }));
    }

    #[test]
    fn mode_digit_outside_range_is_rejected_with_operand_index() {
        assert_eq!(
            decode(301),
            Err(DecodeError::UnknownMode {
                word: 301,
                operand: 0,
                digit: 3
            })
        );
        assert_eq!(
            decode(92201),
            Err(DecodeError::UnknownMode {
                word: 92_201,
                operand: 2,
                digit: 9
            })
        );
    }

    #[test]
    fn mode_digit_enumeration_is_exhaustive() {
        assert_eq!(Mode::from_digit(0), Some(Mode::Position));
        assert_eq!(Mode::from_digit(1), Some(Mode::Immediate));
        assert_eq!(Mode::from_digit(2), Some(Mode::Relative));
        for digit in 3..=9 {
            assert_eq!(Mode::from_digit(digit), None);
        }
    }
}
