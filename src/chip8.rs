pub mod error;
pub mod memory;
pub mod screen;

use log::{debug, trace};
use rand::Rng;

pub use error::Chip8Error;
use memory::{Memory, FONT_GLYPH_SIZE, PROGRAM_ADDR, STACK_DEPTH};
use screen::{SCREEN_HEIGHT, SCREEN_WIDTH};

/// rate the host is expected to call `tick_timers` at
pub const TIMER_HZ: u32 = 60;
pub const KEY_COUNT: usize = 16;

type OpResult = Result<(), Chip8Error>;

/// Execution state of the machine. FX0A parks the vm until the host reports
/// a key press through `key_down`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecState {
    Running,
    WaitingForKey(usize),
}

pub struct Chip8 {
    // CHIP-8 VM
    opcode: u16,           // current opcode
    memory: Memory,        // system memory, stack and display live in the top pages
    v: [u8; 16],           // registers V0-VE (VF is flag for some instructions)
    i: u16,                // address register
    pc: u16,               // program counter
    sp: u8,                // stack pointer, next free slot
    delay_timer: u8,
    sound_timer: u8, // timers count down at 60Hz, driven by the host
    keys: [bool; KEY_COUNT], // hex keypad state
    state: ExecState,
    program_size: u16,

    // emulator resources
    stopped: bool,
    draw_flag: bool,
    random: Box<dyn FnMut() -> u8>,
    opcode_fns: [fn(&mut Self) -> OpResult; 16],
}

impl Chip8 {
    /// Build a vm with `rom` loaded at 0x200. `random` is called once per
    /// CXNN and should return a uniformly random byte.
    pub fn new(rom: &[u8], random: impl FnMut() -> u8 + 'static) -> Result<Self, Chip8Error> {
        let mut memory = Memory::new()?;
        memory.load_program(rom)?;
        debug!("loaded {} byte rom", rom.len());

        Ok(Self {
            opcode: 0,
            memory,
            v: [0; 16],
            i: 0,
            pc: PROGRAM_ADDR, // programs start at 0x200
            sp: 0,
            delay_timer: 0,
            sound_timer: 0,
            keys: [false; KEY_COUNT],
            state: ExecState::Running,
            program_size: rom.len() as u16,

            stopped: false,
            draw_flag: false,
            random: Box::new(random),
            opcode_fns: [
                Self::cls_ret, // 00**
                Self::jmp,     // 1NNN
                Self::call,    // 2NNN
                Self::eb,      // 3XNN
                Self::neb,     // 4XNN
                Self::er,      // 5XY0
                Self::ld,      // 6XNN
                Self::addb,    // 7XNN
                Self::alu,     // 8XY*
                Self::ner,     // 9XY0
                Self::si,      // ANNN
                Self::jmpo,    // BNNN
                Self::rng,     // CXNN
                Self::draw,    // DXYN
                Self::key,     // EX**
                Self::ex,      // FX**
            ],
        })
    }

    pub fn with_thread_rng(rom: &[u8]) -> Result<Self, Chip8Error> {
        let mut rng = rand::thread_rng();
        Self::new(rom, move || rng.gen())
    }

    /// Run one fetch-decode-execute cycle.
    ///
    /// Does nothing while waiting for a key or once pc has run off the end of
    /// the loaded program. On error the vm is left as it was before the call,
    /// with pc pointing at the offending instruction.
    pub fn step(&mut self) -> Result<(), Chip8Error> {
        if self.is_waiting() {
            return Ok(());
        }
        let pc = self.pc;
        if pc >= PROGRAM_ADDR + self.program_size {
            return Ok(());
        }

        // two-byte opcodes
        self.opcode = self.memory.read_word(pc);
        trace!("[{:03X}] {:04X}", pc, self.opcode);
        self.pc = pc.wrapping_add(2);

        let f = self.opcode_fns[(self.opcode >> 12) as usize];
        f(self).map_err(|e| {
            self.pc = pc;
            e
        })
    }

    pub fn get_pixel(&self, x: usize, y: usize) -> bool {
        screen::get_pixel(self.memory.screen(), x, y)
    }

    pub fn set_pixel(&mut self, x: usize, y: usize, on: bool) {
        screen::set_pixel(self.memory.screen_mut(), x, y, on)
    }

    /// packed 64x32 framebuffer
    pub fn screen(&self) -> &[u8] {
        self.memory.screen()
    }

    pub fn lit_pixels(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        screen::lit_pixels(self.memory.screen())
    }

    /// true if the screen changed since the last call
    pub fn take_draw_flag(&mut self) -> bool {
        std::mem::take(&mut self.draw_flag)
    }

    /// Report a key press. Resolves a pending FX0A.
    pub fn key_down(&mut self, key: u8) -> Result<(), Chip8Error> {
        let k = key_index(key)?;
        self.keys[k] = true;
        if let ExecState::WaitingForKey(x) = self.state {
            debug!("key {:X} resolves wait into V{:X}", key, x);
            self.v[x] = key;
            self.state = ExecState::Running;
        }
        Ok(())
    }

    pub fn key_up(&mut self, key: u8) -> Result<(), Chip8Error> {
        let k = key_index(key)?;
        self.keys[k] = false;
        Ok(())
    }

    pub fn is_key_pressed(&self, key: u8) -> bool {
        self.keys.get(key as usize).copied().unwrap_or(false)
    }

    pub fn state(&self) -> ExecState {
        self.state
    }

    pub fn is_waiting(&self) -> bool {
        self.state != ExecState::Running
    }

    /// Decrement both timers, saturating at 0. Call at `TIMER_HZ`.
    pub fn tick_timers(&mut self) {
        self.delay_timer = self.delay_timer.saturating_sub(1);
        self.sound_timer = self.sound_timer.saturating_sub(1);
    }

    pub fn delay_timer(&self) -> u8 {
        self.delay_timer
    }

    pub fn sound_timer(&self) -> u8 {
        self.sound_timer
    }

    pub fn sound_flag(&self) -> bool {
        self.sound_timer > 0
    }

    /// Ask the host loop to end. The vm never sets this itself.
    pub fn stop(&mut self) {
        self.stopped = true;
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    pub fn pc(&self) -> u16 {
        self.pc
    }

    pub fn i(&self) -> u16 {
        self.i
    }

    pub fn v(&self, reg: usize) -> u8 {
        self.v[reg]
    }

    pub fn sp(&self) -> u8 {
        self.sp
    }

    pub fn program_size(&self) -> usize {
        self.program_size as usize
    }

    pub fn memory(&self) -> &[u8] {
        self.memory.as_slice()
    }

    fn x(&self) -> usize {
        ((self.opcode & 0xF00) >> 8) as usize
    }

    fn y(&self) -> usize {
        ((self.opcode & 0xF0) >> 4) as usize
    }

    fn nn(&self) -> u8 {
        (self.opcode & 0xFF) as u8
    }

    fn nnn(&self) -> u16 {
        self.opcode & 0xFFF
    }

    fn invalid(&self) -> Chip8Error {
        Chip8Error::InvalidOpcode {
            opcode: self.opcode,
            pc: self.pc.wrapping_sub(2),
        }
    }

    fn skip_if(&mut self, cond: bool) {
        if cond {
            self.pc = self.pc.wrapping_add(2);
        }
    }

    fn cls_ret(&mut self) -> OpResult {
        match self.opcode {
            0x00E0 => {
                // 00E0
                // clear screen
                screen::clear(self.memory.screen_mut());
                self.draw_flag = true;
            }
            0x00EE => {
                // 00EE
                // return from subroutine
                if self.sp == 0 {
                    return Err(Chip8Error::StackUnderflow {
                        pc: self.pc.wrapping_sub(2),
                    });
                }
                self.sp -= 1;
                self.pc = self.memory.stack_slot(self.sp as usize);
            }
            addr => {
                // 0NNN
                // machine code routine, treated as a jump
                self.pc = addr;
            }
        }
        Ok(())
    }

    fn jmp(&mut self) -> OpResult {
        // 1NNN
        // jump to NNN
        self.pc = self.nnn();
        Ok(())
    }

    fn call(&mut self) -> OpResult {
        // 2NNN
        // call subroutine at NNN
        if self.sp as usize >= STACK_DEPTH {
            return Err(Chip8Error::StackOverflow {
                pc: self.pc.wrapping_sub(2),
            });
        }
        self.memory.set_stack_slot(self.sp as usize, self.pc);
        self.sp += 1;
        self.pc = self.nnn();
        Ok(())
    }

    fn eb(&mut self) -> OpResult {
        // 3XNN
        // skip if VX == NN
        self.skip_if(self.v[self.x()] == self.nn());
        Ok(())
    }

    fn neb(&mut self) -> OpResult {
        // 4XNN
        // skip if VX != NN
        self.skip_if(self.v[self.x()] != self.nn());
        Ok(())
    }

    fn er(&mut self) -> OpResult {
        // 5XY0
        // skip if VX == VY
        if self.opcode & 0xF != 0 {
            return Err(self.invalid());
        }
        self.skip_if(self.v[self.x()] == self.v[self.y()]);
        Ok(())
    }

    fn ld(&mut self) -> OpResult {
        // 6XNN
        // set VX to NN
        let x = self.x();
        self.v[x] = self.nn();
        Ok(())
    }

    fn addb(&mut self) -> OpResult {
        // 7XNN
        // add NN to VX (no carry)
        let x = self.x();
        self.v[x] = self.v[x].wrapping_add(self.nn());
        Ok(())
    }

    fn alu(&mut self) -> OpResult {
        let x = self.x();
        let y = self.y();
        let (vx, vy) = (self.v[x], self.v[y]);
        match self.opcode & 0xF {
            0x0 => {
                // 8XY0
                // set VX to VY
                self.v[x] = vy;
            }
            0x1 => {
                // 8XY1
                self.v[x] = vx | vy;
            }
            0x2 => {
                // 8XY2
                self.v[x] = vx & vy;
            }
            0x3 => {
                // 8XY3
                self.v[x] = vx ^ vy;
            }
            0x4 => {
                // 8XY4
                // add VY to VX (set VF = 1 if there's a carry)
                let (sum, carry) = vx.overflowing_add(vy);
                self.v[x] = sum;
                self.v[0xF] = carry as u8;
            }
            0x5 => {
                // 8XY5
                // sub VY from VX (set VF = 0 if there's a borrow and 1 if not)
                self.v[x] = vx.wrapping_sub(vy);
                self.v[0xF] = (vx >= vy) as u8;
            }
            0x6 => {
                // 8XY6
                // store the LSB of VX in VF, then VX = VY >> 1
                self.v[0xF] = vx & 0x1;
                self.v[x] = self.v[y] >> 1;
            }
            0x7 => {
                // 8XY7
                // set VX to VY - VX (set VF = 0 if there's a borrow and 1 if not)
                self.v[x] = vy.wrapping_sub(vx);
                self.v[0xF] = (vy >= vx) as u8;
            }
            0xE => {
                // 8XYE
                // store the MSB of VX in VF, then VX = VY << 1
                self.v[0xF] = vx >> 7;
                self.v[x] = self.v[y] << 1;
            }
            _ => return Err(self.invalid()),
        }
        Ok(())
    }

    fn ner(&mut self) -> OpResult {
        // 9XY0
        // skip if VX != VY
        if self.opcode & 0xF != 0 {
            return Err(self.invalid());
        }
        self.skip_if(self.v[self.x()] != self.v[self.y()]);
        Ok(())
    }

    fn si(&mut self) -> OpResult {
        // ANNN
        // set I to NNN
        self.i = self.nnn();
        Ok(())
    }

    fn jmpo(&mut self) -> OpResult {
        // BNNN
        // jump to NNN + V0
        self.pc = self.nnn() + self.v[0] as u16;
        Ok(())
    }

    fn rng(&mut self) -> OpResult {
        // CXNN
        // set VX = random byte & NN
        let x = self.x();
        self.v[x] = (self.random)() & self.nn();
        Ok(())
    }

    fn draw(&mut self) -> OpResult {
        // DXYN
        // draw an 8xN sprite from memory at I to VX,VY
        // start coordinates wrap, the sprite itself is clipped at the edges
        // VF is set to 1 if any lit screen pixel gets toggled off
        let start_x = self.v[self.x()] as usize % SCREEN_WIDTH;
        let start_y = self.v[self.y()] as usize % SCREEN_HEIGHT;
        let height = (self.opcode & 0xF) as usize;

        let end_x = (start_x + 8).min(SCREEN_WIDTH);
        let end_y = (start_y + height).min(SCREEN_HEIGHT);

        self.v[0xF] = 0;
        for y in start_y..end_y {
            let row = self.memory.read_byte(self.i.wrapping_add((y - start_y) as u16));
            let screen = self.memory.screen_mut();
            for x in start_x..end_x {
                if row & (0x80 >> (x - start_x)) == 0 {
                    continue;
                }
                let lit = screen::get_pixel(screen, x, y);
                if lit {
                    self.v[0xF] = 1;
                }
                screen::set_pixel(screen, x, y, !lit);
            }
        }

        self.draw_flag = true;
        Ok(())
    }

    fn key(&mut self) -> OpResult {
        // only the low nibble of VX names a key
        let pressed = self.keys[(self.v[self.x()] & 0xF) as usize];
        match self.opcode & 0xFF {
            0x9E => {
                // EX9E
                // skip if key stored in VX is pressed
                self.skip_if(pressed);
            }
            0xA1 => {
                // EXA1
                // skip if key stored in VX isn't pressed
                self.skip_if(!pressed);
            }
            _ => return Err(self.invalid()),
        }
        Ok(())
    }

    fn ex(&mut self) -> OpResult {
        let x = self.x();
        match self.opcode & 0xFF {
            0x07 => {
                // FX07
                // set VX to delay timer
                self.v[x] = self.delay_timer;
            }
            0x0A => {
                // FX0A
                // park until the host reports a key press
                debug!("waiting for key into V{:X}", x);
                self.state = ExecState::WaitingForKey(x);
            }
            0x15 => {
                // FX15
                self.delay_timer = self.v[x];
            }
            0x18 => {
                // FX18
                self.sound_timer = self.v[x];
            }
            0x1E => {
                // FX1E
                // add VX to I
                self.i = self.i.wrapping_add(self.v[x] as u16);
            }
            0x29 => {
                // FX29
                // set I to the font glyph for the low nibble of VX
                self.i = (self.v[x] & 0xF) as u16 * FONT_GLYPH_SIZE;
            }
            0x33 => {
                // FX33
                // store the BCD representation of VX at I
                // so 193 becomes [1, 9, 3] in memory at I
                let vx = self.v[x];
                self.memory.write_byte(self.i, vx / 100);
                self.memory.write_byte(self.i.wrapping_add(1), (vx / 10) % 10);
                self.memory.write_byte(self.i.wrapping_add(2), vx % 10);
            }
            0x55 => {
                // FX55
                // store V0 to VX (inclusive) in memory at I
                for offset in 0..=x {
                    self.memory
                        .write_byte(self.i.wrapping_add(offset as u16), self.v[offset]);
                }
            }
            0x65 => {
                // FX65
                // fill V0 to VX (inclusive) from memory at I
                for offset in 0..=x {
                    self.v[offset] = self.memory.read_byte(self.i.wrapping_add(offset as u16));
                }
            }
            _ => return Err(self.invalid()),
        }
        Ok(())
    }
}

fn key_index(key: u8) -> Result<usize, Chip8Error> {
    if (key as usize) < KEY_COUNT {
        Ok(key as usize)
    } else {
        Err(Chip8Error::InvalidKey(key))
    }
}
