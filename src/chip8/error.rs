use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum Chip8Error {
    #[error("rom size too big ({size} bytes), should be <= {max} bytes")]
    RomTooLarge { size: usize, max: usize },

    #[error("could not allocate vm memory")]
    AllocationFailure,

    #[error("call stack overflow at {pc:#05X}")]
    StackOverflow { pc: u16 },

    #[error("return with empty call stack at {pc:#05X}")]
    StackUnderflow { pc: u16 },

    #[error("invalid opcode {opcode:04X} at {pc:#05X}")]
    InvalidOpcode { opcode: u16, pc: u16 },

    #[error("no such key {0:X}")]
    InvalidKey(u8),
}
