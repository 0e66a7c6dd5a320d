//! A CHIP-8 virtual machine. The host owns pacing: it calls `Chip8::step` as
//! fast as it likes, `Chip8::tick_timers` at 60Hz, feeds key events in and
//! reads the framebuffer back out.

pub mod chip8;

pub use crate::chip8::{Chip8, Chip8Error, ExecState, KEY_COUNT, TIMER_HZ};
pub use crate::chip8::screen::{SCREEN_HEIGHT, SCREEN_WIDTH};
