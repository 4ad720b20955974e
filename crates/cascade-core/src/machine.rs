//! Fetch-decode-execute interpreter loop.
//!
//! Each machine exclusively owns one [`Memory`]; no two machines ever
//! share one. Execution is strictly sequential and yields control only at
//! the two channel boundaries, which keeps every multi-machine topology
//! free of shared mutable state by construction.

use crate::channel::{Receiver, Sender};
use crate::decoder::{decode, DecodeError, Instruction, Opcode};
use crate::memory::AccessError;
use crate::{Fault, Memory, Program, RunState, Word};

/// Outcome of executing a single instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// The instruction retired; the machine is ready for the next one.
    Continue,
    /// An input instruction is waiting for a value. The program counter
    /// has not advanced; feed [`Machine::resolve_input`] to make progress.
    NeedsInput,
    /// An output instruction produced this value. The caller must deliver
    /// it before stepping again.
    Output(Word),
    /// Opcode 99 retired; the machine is permanently halted.
    Halted,
}

/// Terminal outcome of a channel-driven run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The program executed opcode 99.
    Halted,
    /// The orchestrator disconnected an edge while the machine was
    /// suspended on it. Normal topology teardown, not a fault.
    Cancelled,
}

/// One interpreter instance executing a program against its own memory.
#[derive(Debug, Clone)]
pub struct Machine {
    memory: Memory,
    pc: usize,
    relative_base: Word,
    state: RunState,
}

impl Machine {
    /// Creates a fresh machine from a parsed program.
    ///
    /// Construction only clones the program image, so orchestrators can
    /// cheaply re-instantiate machines for every parameter combination
    /// they explore.
    #[must_use]
    pub fn new(program: &Program) -> Self {
        Self {
            memory: Memory::new(program),
            pc: 0,
            relative_base: 0,
            state: RunState::Running,
        }
    }

    /// Returns the current execution state.
    #[must_use]
    pub const fn run_state(&self) -> RunState {
        self.state
    }

    /// Returns the current program counter.
    #[must_use]
    pub const fn pc(&self) -> usize {
        self.pc
    }

    /// Returns the current relative base offset.
    #[must_use]
    pub const fn relative_base(&self) -> Word {
        self.relative_base
    }

    /// Returns the machine's memory for inspection.
    #[must_use]
    pub const fn memory(&self) -> &Memory {
        &self.memory
    }

    /// Executes exactly one instruction.
    ///
    /// Stepping a halted machine keeps returning [`Step::Halted`];
    /// stepping while input is outstanding keeps returning
    /// [`Step::NeedsInput`] without advancing.
    ///
    /// # Errors
    ///
    /// Returns a [`Fault`] for unknown opcodes, invalid parameter modes,
    /// and negative address resolution, reporting the failing program
    /// counter and raw instruction word.
    pub fn step(&mut self) -> Result<Step, Fault> {
        match self.state {
            RunState::Halted => return Ok(Step::Halted),
            RunState::AwaitingInput => return Ok(Step::NeedsInput),
            // The caller only steps again once the produced value has been
            // delivered, so the suspension is over.
            RunState::AwaitingOutputReady => self.state = RunState::Running,
            RunState::Running => {}
        }

        let pc = self.pc;
        let word = self.memory.load(pc);
        let instruction = decode(word).map_err(|error| Self::decode_fault(pc, error))?;

        match instruction.opcode {
            Opcode::Add => {
                let a = self.read_operand(&instruction, 0)?;
                let b = self.read_operand(&instruction, 1)?;
                self.write_operand(&instruction, 2, a + b)?;
                self.pc += 4;
                Ok(Step::Continue)
            }
            Opcode::Mul => {
                let a = self.read_operand(&instruction, 0)?;
                let b = self.read_operand(&instruction, 1)?;
                self.write_operand(&instruction, 2, a * b)?;
                self.pc += 4;
                Ok(Step::Continue)
            }
            Opcode::Input => {
                self.state = RunState::AwaitingInput;
                Ok(Step::NeedsInput)
            }
            Opcode::Output => {
                let value = self.read_operand(&instruction, 0)?;
                self.pc += 2;
                self.state = RunState::AwaitingOutputReady;
                Ok(Step::Output(value))
            }
            Opcode::JumpIfTrue => {
                let condition = self.read_operand(&instruction, 0)?;
                let target = self.read_operand(&instruction, 1)?;
                self.jump(condition != 0, target)?;
                Ok(Step::Continue)
            }
            Opcode::JumpIfFalse => {
                let condition = self.read_operand(&instruction, 0)?;
                let target = self.read_operand(&instruction, 1)?;
                self.jump(condition == 0, target)?;
                Ok(Step::Continue)
            }
            Opcode::LessThan => {
                let a = self.read_operand(&instruction, 0)?;
                let b = self.read_operand(&instruction, 1)?;
                self.write_operand(&instruction, 2, Word::from(a < b))?;
                self.pc += 4;
                Ok(Step::Continue)
            }
            Opcode::Equals => {
                let a = self.read_operand(&instruction, 0)?;
                let b = self.read_operand(&instruction, 1)?;
                self.write_operand(&instruction, 2, Word::from(a == b))?;
                self.pc += 4;
                Ok(Step::Continue)
            }
            Opcode::AdjustRelativeBase => {
                let offset = self.read_operand(&instruction, 0)?;
                self.relative_base += offset;
                self.pc += 2;
                Ok(Step::Continue)
            }
            Opcode::Halt => {
                self.state = RunState::Halted;
                Ok(Step::Halted)
            }
        }
    }

    /// Commits `value` to the input instruction the machine is suspended
    /// on and resumes execution.
    ///
    /// Must only be called after [`Machine::step`] returned
    /// [`Step::NeedsInput`].
    ///
    /// # Errors
    ///
    /// Returns a [`Fault`] when the input target operand is invalid.
    pub fn resolve_input(&mut self, value: Word) -> Result<(), Fault> {
        debug_assert!(
            self.state == RunState::AwaitingInput,
            "resolve_input outside AwaitingInput"
        );
        let pc = self.pc;
        let word = self.memory.load(pc);
        let instruction = decode(word).map_err(|error| Self::decode_fault(pc, error))?;
        self.write_operand(&instruction, 0, value)?;
        self.pc += 2;
        self.state = RunState::Running;
        Ok(())
    }

    /// Drives the machine to completion against a channel pair, consuming
    /// input values at opcode 3 and producing output values at opcode 4.
    ///
    /// A disconnected edge at a suspension point ends the run with
    /// [`RunOutcome::Cancelled`]; this is how orchestrators tear down
    /// machines that outlive a topology's terminal condition.
    ///
    /// # Errors
    ///
    /// Propagates any [`Fault`] raised while executing.
    pub fn run(&mut self, input: &Receiver, output: &Sender) -> Result<RunOutcome, Fault> {
        loop {
            match self.step()? {
                Step::Continue => {}
                // A blocking receive only fails on disconnect.
                Step::NeedsInput => match input.receive() {
                    Ok(value) => self.resolve_input(value)?,
                    Err(_) => return Ok(RunOutcome::Cancelled),
                },
                Step::Output(value) => {
                    if output.send(value).is_err() {
                        return Ok(RunOutcome::Cancelled);
                    }
                }
                Step::Halted => return Ok(RunOutcome::Halted),
            }
        }
    }

    /// Single-shot batch run: feeds `inputs` in order and collects every
    /// output until the machine halts. No channels, no concurrency.
    ///
    /// Collaborators that stream character codes (value 10 as the line
    /// separator) use this form to exchange whole scripts and rendered
    /// maps in one call.
    ///
    /// # Errors
    ///
    /// Propagates execution [`Fault`]s, and raises
    /// [`Fault::InputExhausted`] when the program requests more input
    /// than `inputs` supplies.
    pub fn run_batch(&mut self, inputs: &[Word]) -> Result<Vec<Word>, Fault> {
        let mut pending = inputs.iter().copied();
        let mut outputs = Vec::new();
        loop {
            match self.step()? {
                Step::Continue => {}
                Step::NeedsInput => {
                    let value = pending
                        .next()
                        .ok_or(Fault::InputExhausted { pc: self.pc })?;
                    self.resolve_input(value)?;
                }
                Step::Output(value) => outputs.push(value),
                Step::Halted => return Ok(outputs),
            }
        }
    }

    fn read_operand(&self, instruction: &Instruction, index: usize) -> Result<Word, Fault> {
        let operand = self.memory.load(self.pc + index + 1);
        self.memory
            .read(operand, instruction.modes[index], self.relative_base)
            .map_err(|error| self.access_fault(instruction, index, error))
    }

    fn write_operand(
        &mut self,
        instruction: &Instruction,
        index: usize,
        value: Word,
    ) -> Result<(), Fault> {
        let operand = self.memory.load(self.pc + index + 1);
        let relative_base = self.relative_base;
        self.memory
            .write(operand, instruction.modes[index], relative_base, value)
            .map_err(|error| self.access_fault(instruction, index, error))
    }

    fn jump(&mut self, taken: bool, target: Word) -> Result<(), Fault> {
        if taken {
            self.pc = usize::try_from(target).map_err(|_| Fault::NegativeAddress {
                pc: self.pc,
                address: target,
            })?;
        } else {
            self.pc += 3;
        }
        Ok(())
    }

    const fn decode_fault(pc: usize, error: DecodeError) -> Fault {
        match error {
            DecodeError::UnknownOpcode { word } => Fault::InvalidOpcode { pc, word },
            DecodeError::UnknownMode { word, operand, .. } => {
                Fault::InvalidParameterMode { pc, word, operand }
            }
        }
    }

    fn access_fault(&self, instruction: &Instruction, index: usize, error: AccessError) -> Fault {
        match error {
            AccessError::NegativeAddress { address } => Fault::NegativeAddress {
                pc: self.pc,
                address,
            },
            AccessError::ImmediateWrite => Fault::InvalidParameterMode {
                pc: self.pc,
                word: instruction.word,
                operand: u8::try_from(index).unwrap_or(u8::MAX),
            },
        }
    }
}

/// Convenience single-shot form over a parsed program.
///
/// Equivalent to `Machine::new(program).run_batch(inputs)`.
///
/// # Errors
///
/// Propagates the faults of [`Machine::run_batch`].
pub fn run_program(program: &Program, inputs: &[Word]) -> Result<Vec<Word>, Fault> {
    Machine::new(program).run_batch(inputs)
}
