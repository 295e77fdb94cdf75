use std::convert::TryFrom;

use crate::memory::{Byte, Memory};
use color_eyre::eyre::{eyre, Result};
use log::*;
use num_enum::IntoPrimitive;
use num_enum::TryFromPrimitive;

/// The packed status register, one field per flag.
///
/// Fields hold bytes rather than bools because [`Flags::set_status`] stores
/// the raw masked value of each bit (so `zero` holds 0 or 2, `truefalse`
/// 0 or 4, and so on). [`Flags::status`] shifts each field into position,
/// which means decomposing a status byte and recomposing it is not
/// idempotent. Instructions that test flags compare against the literal
/// values the instruction set was specified with.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Flags {
    pub carry: Byte,
    pub zero: Byte,
    pub truefalse: Byte,
    pub interrupt_disable: Byte,
    pub decimal_mode: Byte,
    pub halt: Byte,
    pub overflow: Byte,
    pub negative: Byte,
}

impl Flags {
    /// Clears every flag
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Composes the flags into a single status byte.
    /// Layout: bit 0 CARRY, 1 ZERO, 2 TRUEFALSE, 3 INTERRUPT_DISABLE,
    /// 4 DECIMAL_MODE, 5 HALT, 6 OVERFLOW, 7 NEGATIVE.
    pub fn status(&self) -> Byte {
        (u32::from(self.carry)
            | u32::from(self.zero) << 1
            | u32::from(self.truefalse) << 2
            | u32::from(self.interrupt_disable) << 3
            | u32::from(self.decimal_mode) << 4
            | u32::from(self.halt) << 5
            | u32::from(self.overflow) << 6
            | u32::from(self.negative) << 7) as Byte
    }

    /// Decomposes a status byte into the flags. Each field keeps the raw
    /// masked value of its bit, it is not normalized to 0/1.
    pub fn set_status(&mut self, value: Byte) {
        self.carry = value & 1;
        self.zero = value & 2;
        self.truefalse = value & 4;
        self.interrupt_disable = value & 8;
        self.decimal_mode = value & 16;
        self.halt = value & 32;
        self.overflow = value & 64;
        self.negative = value & 128;
    }
}

/// Emulates a CPU
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Processor {
    /// Program memory; byte 0 is the first opcode fetched
    pub memory: Memory,
    /// Stack memory, disjoint from program memory
    pub stack: Memory,
    /// Instruction pointer
    pub ip: Byte,
    /// Stack pointer
    pub sp: Byte,
    /// Accumulator
    pub a: Byte,
    pub x: Byte,
    pub y: Byte,
    pub z: Byte,
    pub flags: Flags,
}

impl Default for Processor {
    fn default() -> Self {
        Self::new()
    }
}

impl Processor {
    /// Initializes a new CPU with zeroed memory, registers and flags
    pub fn new() -> Self {
        Self {
            memory: Memory::default(),
            stack: Memory::default(),
            ip: 0,
            sp: 0,
            a: 0,
            x: 0,
            y: 0,
            z: 0,
            flags: Flags::default(),
        }
    }

    /// Restores a pristine machine: zero memory, stack, registers,
    /// pointers and flags. Callable before or between executions.
    pub fn reset(&mut self) {
        self.memory.clear();
        self.stack.clear();
        self.ip = 0;
        self.sp = 0;
        self.a = 0;
        self.x = 0;
        self.y = 0;
        self.z = 0;
        self.flags.reset();
    }

    fn set_zero_flag(&mut self, value: Byte) {
        self.flags.zero = (value == 0) as Byte;
    }

    fn set_truefalse_flag(&mut self, expression: bool) {
        self.flags.truefalse = expression as Byte;
    }

    /// The fail-stop path: sets HALT so the run loop cannot continue,
    /// leaves IP on the offending byte and surfaces the diagnostic to the
    /// caller. Recoverable only by [`Processor::reset`].
    fn fail_stop<T>(&mut self, diagnostic: String) -> Result<T> {
        self.flags.halt = 1;
        error!("{}", diagnostic);
        Err(eyre!(diagnostic))
    }

    /// Executes a single instruction. Each instruction advances IP itself;
    /// jumps intentionally do not auto-increment.
    pub fn execute_instruction(&mut self, instruction: Instruction) -> Result<()> {
        match instruction {
            Instruction::HALT => {
                self.flags.halt = 1;

                debug!("HALT");
            }
            Instruction::NOP => {
                self.ip = self.ip.wrapping_add(1);

                debug!("NOP");
            }
            Instruction::BREAK => {
                // Reserved: will push machine state and transfer to a
                // handler address. No state change until then.
                debug!("BREAK");
            }
            Instruction::NOT => {
                self.a = !self.a;
                self.set_zero_flag(self.a);
                self.ip = self.ip.wrapping_add(1);

                debug!("NOT: {}", self.a);
            }
            Instruction::AND => {
                // Operand is the accumulator itself, not Z
                self.a &= self.a;
                self.set_zero_flag(self.a);
                self.ip = self.ip.wrapping_add(1);

                debug!("AND: {}", self.a);
            }
            Instruction::OR => {
                self.a |= self.a;
                self.set_zero_flag(self.a);
                self.ip = self.ip.wrapping_add(1);

                debug!("OR: {}", self.a);
            }
            Instruction::XOR => {
                self.a ^= self.a;
                self.set_zero_flag(self.a);
                self.ip = self.ip.wrapping_add(1);

                debug!("XOR: {}", self.a);
            }
            Instruction::ADD => {
                self.a = self.a.wrapping_add(self.z);
                self.set_zero_flag(self.a);
                self.ip = self.ip.wrapping_add(1);

                debug!("ADD {}: {}", self.z, self.a);
            }
            Instruction::SUB => {
                self.a = self.a.wrapping_sub(self.z);
                self.set_zero_flag(self.a);
                self.ip = self.ip.wrapping_add(1);

                debug!("SUB {}: {}", self.z, self.a);
            }
            Instruction::MUL => {
                self.a = self.a.wrapping_mul(self.z);
                self.set_zero_flag(self.a);
                self.ip = self.ip.wrapping_add(1);

                debug!("MUL {}: {}", self.z, self.a);
            }
            Instruction::DIV => {
                if self.z == 0 {
                    return self.fail_stop(format!("division by zero at IP {}", self.ip));
                }
                let remainder = self.a % self.z;
                self.a /= self.z;
                self.z = remainder;
                self.set_zero_flag(self.a);
                self.ip = self.ip.wrapping_add(1);

                debug!("DIV: {} rem {}", self.a, self.z);
            }
            Instruction::INC => {
                self.a = self.a.wrapping_add(1);
                self.set_zero_flag(self.a);
                self.ip = self.ip.wrapping_add(1);

                debug!("INC: {}", self.a);
            }
            Instruction::DEC => {
                self.a = self.a.wrapping_sub(1);
                self.set_zero_flag(self.a);
                self.ip = self.ip.wrapping_add(1);

                debug!("DEC: {}", self.a);
            }
            Instruction::SHL | Instruction::SHR => {
                // Named in the opcode numbering but never bound; takes the
                // same path as a byte with no instruction at all.
                let opcode = Byte::from(instruction);
                return self.fail_stop(format!(
                    "no instruction found for: {} | 0x{:02X} at IP {}",
                    opcode, opcode, self.ip
                ));
            }
            Instruction::SET_A_VAL => {
                self.ip = self.ip.wrapping_add(1);
                self.a = self.memory.read_byte(self.ip);
                self.set_zero_flag(self.a);
                self.ip = self.ip.wrapping_add(1);

                debug!("SET_A_VAL {}", self.a);
            }
            Instruction::SET_X_VAL => {
                self.ip = self.ip.wrapping_add(1);
                self.x = self.memory.read_byte(self.ip);
                self.set_zero_flag(self.x);
                self.ip = self.ip.wrapping_add(1);

                debug!("SET_X_VAL {}", self.x);
            }
            Instruction::SET_Y_VAL => {
                self.ip = self.ip.wrapping_add(1);
                self.y = self.memory.read_byte(self.ip);
                self.set_zero_flag(self.y);
                self.ip = self.ip.wrapping_add(1);

                debug!("SET_Y_VAL {}", self.y);
            }
            Instruction::SET_Z_VAL => {
                self.ip = self.ip.wrapping_add(1);
                self.z = self.memory.read_byte(self.ip);
                self.set_zero_flag(self.z);
                self.ip = self.ip.wrapping_add(1);

                debug!("SET_Z_VAL {}", self.z);
            }
            Instruction::PUSH_STATUS => {
                let status = self.flags.status();
                self.stack.write_byte(self.sp, status);
                self.sp = self.sp.wrapping_add(1);
                self.ip = self.ip.wrapping_add(1);

                debug!("PUSH_STATUS 0b{:08b}", status);
            }
            Instruction::PUSH_A => {
                self.stack.write_byte(self.sp, self.a);
                self.sp = self.sp.wrapping_add(1);
                self.ip = self.ip.wrapping_add(1);

                debug!("PUSH_A {}", self.a);
            }
            Instruction::PUSH_X => {
                self.stack.write_byte(self.sp, self.x);
                self.sp = self.sp.wrapping_add(1);
                self.ip = self.ip.wrapping_add(1);

                debug!("PUSH_X {}", self.x);
            }
            Instruction::PUSH_Y => {
                self.stack.write_byte(self.sp, self.y);
                self.sp = self.sp.wrapping_add(1);
                self.ip = self.ip.wrapping_add(1);

                debug!("PUSH_Y {}", self.y);
            }
            Instruction::PUSH_Z => {
                self.stack.write_byte(self.sp, self.z);
                self.sp = self.sp.wrapping_add(1);
                self.ip = self.ip.wrapping_add(1);

                debug!("PUSH_Z {}", self.z);
            }
            Instruction::PULL_STATUS => {
                self.sp = self.sp.wrapping_sub(1);
                let value = self.stack.read_byte(self.sp);
                self.flags.set_status(value);
                self.ip = self.ip.wrapping_add(1);

                debug!("PULL_STATUS 0b{:08b}", value);
            }
            Instruction::PULL_A => {
                self.sp = self.sp.wrapping_sub(1);
                self.a = self.stack.read_byte(self.sp);
                self.ip = self.ip.wrapping_add(1);

                debug!("PULL_A {}", self.a);
            }
            Instruction::PULL_X => {
                self.sp = self.sp.wrapping_sub(1);
                self.x = self.stack.read_byte(self.sp);
                self.ip = self.ip.wrapping_add(1);

                debug!("PULL_X {}", self.x);
            }
            Instruction::PULL_Y => {
                self.sp = self.sp.wrapping_sub(1);
                self.y = self.stack.read_byte(self.sp);
                self.ip = self.ip.wrapping_add(1);

                debug!("PULL_Y {}", self.y);
            }
            Instruction::PULL_Z => {
                self.sp = self.sp.wrapping_sub(1);
                self.z = self.stack.read_byte(self.sp);
                self.ip = self.ip.wrapping_add(1);

                debug!("PULL_Z {}", self.z);
            }
            Instruction::CLEAR_STATUS => {
                self.flags.set_status(0);
                self.ip = self.ip.wrapping_add(1);

                debug!("CLEAR_STATUS");
            }
            Instruction::CLEAR_CARRY => {
                self.flags.carry = 0;
                self.ip = self.ip.wrapping_add(1);

                debug!("CLEAR_CARRY");
            }
            Instruction::CLEAR_DECIMAL => {
                self.flags.decimal_mode = 0;
                self.ip = self.ip.wrapping_add(1);

                debug!("CLEAR_DECIMAL");
            }
            Instruction::CLEAR_INTERRUPT => {
                self.flags.interrupt_disable = 0;
                self.ip = self.ip.wrapping_add(1);

                debug!("CLEAR_INTERRUPT");
            }
            Instruction::CLEAR_OVERFLOW => {
                self.flags.overflow = 0;
                self.ip = self.ip.wrapping_add(1);

                debug!("CLEAR_OVERFLOW");
            }
            Instruction::SET_STATUS => {
                self.flags.set_status(self.a);
                self.ip = self.ip.wrapping_add(1);

                debug!("SET_STATUS 0b{:08b}", self.a);
            }
            Instruction::SET_CARRY => {
                // Rewrites the entire status register, not just the carry
                // bit; every other flag is cleared
                self.flags.set_status(1);
                self.ip = self.ip.wrapping_add(1);

                debug!("SET_CARRY");
            }
            Instruction::SET_DECIMAL => {
                self.flags.decimal_mode = 1;
                self.ip = self.ip.wrapping_add(1);

                debug!("SET_DECIMAL");
            }
            Instruction::SET_INTERRUPT => {
                self.flags.interrupt_disable = 1;
                self.ip = self.ip.wrapping_add(1);

                debug!("SET_INTERRUPT");
            }
            Instruction::SET_OVERFLOW => {
                self.flags.overflow = 1;
                self.ip = self.ip.wrapping_add(1);

                debug!("SET_OVERFLOW");
            }
            Instruction::IS_EQ => {
                self.set_truefalse_flag(self.a == self.z);
                self.ip = self.ip.wrapping_add(1);

                debug!("IS_EQ {} {}: {}", self.a, self.z, self.flags.truefalse);
            }
            Instruction::IS_GR => {
                self.set_truefalse_flag(self.a > self.z);
                self.ip = self.ip.wrapping_add(1);

                debug!("IS_GR {} {}: {}", self.a, self.z, self.flags.truefalse);
            }
            Instruction::IS_GRE => {
                self.set_truefalse_flag(self.a >= self.z);
                self.ip = self.ip.wrapping_add(1);

                debug!("IS_GRE {} {}: {}", self.a, self.z, self.flags.truefalse);
            }
            Instruction::IS_LS => {
                self.set_truefalse_flag(self.a < self.z);
                self.ip = self.ip.wrapping_add(1);

                debug!("IS_LS {} {}: {}", self.a, self.z, self.flags.truefalse);
            }
            Instruction::IS_LSE => {
                self.set_truefalse_flag(self.a <= self.z);
                self.ip = self.ip.wrapping_add(1);

                debug!("IS_LSE {} {}: {}", self.a, self.z, self.flags.truefalse);
            }
            Instruction::JUMP => {
                self.ip = self.a;

                debug!("JUMP {}", self.ip);
            }
            Instruction::JUMP_TRUE => {
                if self.flags.truefalse == 1 {
                    self.ip = self.a;
                } else {
                    self.ip = self.ip.wrapping_add(1);
                }

                debug!("JUMP_TRUE {}: {}", self.a, self.flags.truefalse);
            }
            Instruction::JUMP_FALSE => {
                if self.flags.truefalse == 0 {
                    self.ip = self.a;
                } else {
                    self.ip = self.ip.wrapping_add(1);
                }

                debug!("JUMP_FALSE {}: {}", self.a, self.flags.truefalse);
            }
        }

        Ok(())
    }

    /// Runs one execution step: fetch the byte at IP, decode, dispatch.
    /// A byte with no bound instruction fail-stops with a diagnostic naming
    /// the opcode (decimal and hex) and the failing IP.
    pub fn execute(&mut self) -> Result<()> {
        let opcode = self.memory.read_byte(self.ip);
        match Instruction::try_from(opcode) {
            Ok(instruction) => self.execute_instruction(instruction),
            Err(_) => self.fail_stop(format!(
                "no instruction found for: {} | 0x{:02X} at IP {}",
                opcode, opcode, self.ip
            )),
        }
    }

    /// Runs the program until the HALT flag is set, either by the HALT
    /// instruction or by the fail-stop path.
    pub fn execute_until_halt(&mut self) -> Result<()> {
        while self.flags.halt == 0 {
            self.execute()?;
        }

        Ok(())
    }
}

macro_rules! instructions {
    ( $( $( #[doc = $doc:expr] )+ $name:ident = $repr:literal , )+ ) => {
        /// Defines the instructions
        #[repr(u8)]
        #[allow(non_camel_case_types)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
        #[derive(TryFromPrimitive, IntoPrimitive)]
        pub enum Instruction {
            $(
                $( #[doc = $doc] )+
                $name = $repr,
            )+
        }

        impl Instruction {
            pub const ALL: &'static [Self] = &[
                $( Self::$name , )+
            ];

            pub fn name(&self) -> &'static str {
                match self {
                    $( Self::$name => stringify!($name) , )+
                }
            }
        }

        impl ::std::fmt::Display for Instruction {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                match self {
                    $( Self::$name => f.write_str(stringify!($name)) , )+
                }
            }
        }
    }
}

instructions! {
    /// Stop the CPU; IP stays on the HALT byte
    HALT = 0,
    /// Just increment IP
    NOP = 1,
    /// Reserved for a future exception mechanism; currently changes nothing
    BREAK = 2,
    /// A = !A
    NOT = 10,
    /// A = A & A (the operand is the accumulator itself)
    AND = 11,
    /// A = A | A
    OR = 12,
    /// A = A ^ A
    XOR = 13,
    /// A = A + Z, wrapping
    ADD = 20,
    /// A = A - Z, wrapping
    SUB = 21,
    /// A = A * Z, wrapping
    MUL = 22,
    /// A = A / Z, remainder of the old A into Z
    DIV = 23,
    /// A = A + 1, wrapping
    INC = 30,
    /// A = A - 1, wrapping
    DEC = 31,
    /// Reserved bit-shift left; no bound behavior
    SHL = 40,
    /// Reserved bit-shift right; no bound behavior
    SHR = 41,
    /// A = operand byte following the opcode
    SET_A_VAL = 50,
    /// X = operand byte following the opcode
    SET_X_VAL = 51,
    /// Y = operand byte following the opcode
    SET_Y_VAL = 52,
    /// Z = operand byte following the opcode
    SET_Z_VAL = 53,
    /// Push a copy of the status byte onto the stack
    PUSH_STATUS = 60,
    /// Push A onto the stack
    PUSH_A = 61,
    /// Push X onto the stack
    PUSH_X = 62,
    /// Push Y onto the stack
    PUSH_Y = 63,
    /// Push Z onto the stack
    PUSH_Z = 64,
    /// Pull the status byte from the stack into the flags
    PULL_STATUS = 65,
    /// Pull A from the stack
    PULL_A = 66,
    /// Pull X from the stack
    PULL_X = 67,
    /// Pull Y from the stack
    PULL_Y = 68,
    /// Pull Z from the stack
    PULL_Z = 69,
    /// Set all status flags to 0
    CLEAR_STATUS = 70,
    /// Clear carry flag
    CLEAR_CARRY = 71,
    /// Clear decimal mode flag
    CLEAR_DECIMAL = 72,
    /// Clear interrupt disable flag
    CLEAR_INTERRUPT = 73,
    /// Clear overflow flag
    CLEAR_OVERFLOW = 74,
    /// Set status = A
    SET_STATUS = 75,
    /// Set status = 1 (rewrites the whole register, clearing other flags)
    SET_CARRY = 76,
    /// Set decimal mode flag
    SET_DECIMAL = 77,
    /// Set interrupt disable flag
    SET_INTERRUPT = 78,
    /// Set overflow flag
    SET_OVERFLOW = 79,
    /// Set truefalse flag if A == Z
    IS_EQ = 80,
    /// Set truefalse flag if A > Z
    IS_GR = 81,
    /// Set truefalse flag if A >= Z
    IS_GRE = 82,
    /// Set truefalse flag if A < Z
    IS_LS = 83,
    /// Set truefalse flag if A <= Z
    IS_LSE = 84,
    /// Jump: set IP = A, no increment
    JUMP = 90,
    /// Jump if the truefalse flag is set
    JUMP_TRUE = 91,
    /// Jump if the truefalse flag is clear
    JUMP_FALSE = 92,
}
