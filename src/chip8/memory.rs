use super::error::Chip8Error;
use super::screen::SCREEN_BYTES;

/// total addressable memory
pub const RAM_SIZE: usize = 0x1000;

/// programs start at 0x200
pub const PROGRAM_ADDR: u16 = 0x200;

/// return addresses, 16 big-endian words
pub const STACK_ADDR: u16 = 0xEA0;
pub const STACK_DEPTH: usize = 16;

/// packed 64x32 bitmap in the last page
pub const DISPLAY_ADDR: u16 = 0xF00;

/// everything from the stack up is reserved for the vm
pub const MAX_ROM_SIZE: usize = RAM_SIZE - PROGRAM_ADDR as usize - 352;

/// each glyph is 5 bytes, glyph n lives at n * 5
pub const FONT_GLYPH_SIZE: u16 = 5;

const FONTSET: [u8; 80] = [
    0xF0, 0x90, 0x90, 0x90, 0xF0, // 0
    0x20, 0x60, 0x20, 0x20, 0x70, // 1
    0xF0, 0x10, 0xF0, 0x80, 0xF0, // 2
    0xF0, 0x10, 0xF0, 0x10, 0xF0, // 3
    0xA0, 0xA0, 0xF0, 0x20, 0x20, // 4
    0xF0, 0x80, 0xF0, 0x10, 0xF0, // 5
    0xF0, 0x80, 0xF0, 0x90, 0xF0, // 6
    0xF0, 0x10, 0x20, 0x40, 0x40, // 7
    0xF0, 0x90, 0xF0, 0x90, 0xF0, // 8
    0xF0, 0x90, 0xF0, 0x10, 0xF0, // 9
    0xF0, 0x90, 0xF0, 0x90, 0x90, // A
    0xE0, 0x90, 0xE0, 0x90, 0xE0, // B
    0xF0, 0x80, 0x80, 0x80, 0xF0, // C
    0xE0, 0x90, 0x90, 0x90, 0xE0, // D
    0xF0, 0x80, 0xF0, 0x80, 0xF0, // E
    0xF0, 0x80, 0xF0, 0x80, 0x80, // F
];

/// The 4K address space. Memory map:
///   0x000-0x04f  font glyphs 0-F
///   0x200-0xe9f  program
///   0xea0-0xebf  call stack
///   0xf00-0xfff  display
///
/// Addresses wrap at 4K, so a runaway I can't index past the end.
pub struct Memory {
    bytes: Box<[u8]>,
}

impl Memory {
    pub fn new() -> Result<Self, Chip8Error> {
        let mut bytes = Vec::new();
        bytes
            .try_reserve_exact(RAM_SIZE)
            .map_err(|_| Chip8Error::AllocationFailure)?;
        bytes.resize(RAM_SIZE, 0);

        let mut memory = Self {
            bytes: bytes.into_boxed_slice(),
        };
        // CHIP-8 systems had the interpreter in the first 512 bytes of memory
        // since we're emulating that we can just store the fontset there
        memory.bytes[..FONTSET.len()].copy_from_slice(&FONTSET);
        Ok(memory)
    }

    /// copy a rom in at 0x200
    pub fn load_program(&mut self, rom: &[u8]) -> Result<(), Chip8Error> {
        if rom.len() > MAX_ROM_SIZE {
            return Err(Chip8Error::RomTooLarge {
                size: rom.len(),
                max: MAX_ROM_SIZE,
            });
        }
        let start = PROGRAM_ADDR as usize;
        self.bytes[start..start + rom.len()].copy_from_slice(rom);
        Ok(())
    }

    pub fn read_byte(&self, addr: u16) -> u8 {
        self.bytes[wrap(addr)]
    }

    pub fn write_byte(&mut self, addr: u16, value: u8) {
        self.bytes[wrap(addr)] = value;
    }

    /// two-byte big-endian word (opcodes, stack)
    pub fn read_word(&self, addr: u16) -> u16 {
        (self.read_byte(addr) as u16) << 8 | self.read_byte(addr.wrapping_add(1)) as u16
    }

    pub fn write_word(&mut self, addr: u16, value: u16) {
        self.write_byte(addr, (value >> 8) as u8);
        self.write_byte(addr.wrapping_add(1), value as u8);
    }

    pub fn stack_slot(&self, sp: usize) -> u16 {
        self.read_word(STACK_ADDR + 2 * sp as u16)
    }

    pub fn set_stack_slot(&mut self, sp: usize, addr: u16) {
        self.write_word(STACK_ADDR + 2 * sp as u16, addr);
    }

    pub fn screen(&self) -> &[u8] {
        let start = DISPLAY_ADDR as usize;
        &self.bytes[start..start + SCREEN_BYTES]
    }

    pub fn screen_mut(&mut self) -> &mut [u8] {
        let start = DISPLAY_ADDR as usize;
        &mut self.bytes[start..start + SCREEN_BYTES]
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }
}

fn wrap(addr: u16) -> usize {
    addr as usize % RAM_SIZE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_font_at_zero() {
        let m = Memory::new().unwrap();
        assert_eq!(m.as_slice()[..80], FONTSET[..]);
        // glyph for 4 uses the original vip shape
        assert_eq!(m.as_slice()[20..25], [0xA0, 0xA0, 0xF0, 0x20, 0x20]);
    }

    #[test]
    fn test_memory_zeroed() {
        let m = Memory::new().unwrap();
        assert!(m.as_slice()[80..].iter().all(|&b| b == 0));
        assert_eq!(m.as_slice().len(), RAM_SIZE);
    }

    #[test]
    fn test_layout() {
        assert_eq!(MAX_ROM_SIZE, 3232);
        assert_eq!(PROGRAM_ADDR as usize + MAX_ROM_SIZE, STACK_ADDR as usize);
        assert!(STACK_ADDR as usize + 2 * STACK_DEPTH <= DISPLAY_ADDR as usize);
        assert_eq!(DISPLAY_ADDR as usize + SCREEN_BYTES, RAM_SIZE);
    }

    #[test]
    fn test_program_load_ok() {
        let mut m = Memory::new().unwrap();
        m.load_program(&[0x00, 0xE0]).unwrap();
        assert_eq!(m.read_word(0x200), 0x00E0);
    }

    #[test]
    fn test_program_load_full() {
        let mut m = Memory::new().unwrap();
        let rom = vec![0xAB; MAX_ROM_SIZE];
        m.load_program(&rom).unwrap();
        assert_eq!(m.read_byte(STACK_ADDR - 1), 0xAB);
        assert_eq!(m.read_byte(STACK_ADDR), 0);
    }

    #[test]
    fn test_program_load_too_big() {
        let mut m = Memory::new().unwrap();
        let rom = vec![0; MAX_ROM_SIZE + 1];
        assert_eq!(
            m.load_program(&rom),
            Err(Chip8Error::RomTooLarge {
                size: MAX_ROM_SIZE + 1,
                max: MAX_ROM_SIZE
            })
        );
    }

    #[test]
    fn test_words_and_wrap() {
        let mut m = Memory::new().unwrap();
        m.write_word(0x300, 0x1234);
        assert_eq!(m.read_byte(0x300), 0x12);
        assert_eq!(m.read_byte(0x301), 0x34);
        m.write_byte(0x1005, 0x77);
        assert_eq!(m.read_byte(0x005), 0x77);
    }

    #[test]
    fn test_stack_slots_alias_memory() {
        let mut m = Memory::new().unwrap();
        m.set_stack_slot(3, 0x0ABC);
        assert_eq!(m.stack_slot(3), 0x0ABC);
        assert_eq!(m.read_word(STACK_ADDR + 6), 0x0ABC);
    }

    #[test]
    fn test_screen_aliases_last_page() {
        let mut m = Memory::new().unwrap();
        m.screen_mut()[0] = 0x80;
        assert_eq!(m.read_byte(DISPLAY_ADDR), 0x80);
        assert_eq!(m.screen().len(), 256);
    }
}
