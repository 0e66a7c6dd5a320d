extern crate sdl2;

mod audio;
mod keymap;

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::Parser;
use log::{error, info};
use sdl2::event::Event;
use sdl2::gfx::primitives::DrawRenderer;
use sdl2::keyboard::Keycode;
use sdl2::pixels;
use sdl2::render::WindowCanvas;

use chip8_vm::{Chip8, SCREEN_HEIGHT, SCREEN_WIDTH, TIMER_HZ};

use crate::audio::Beeper;
use crate::keymap::map_key;

const PIXEL_ON: pixels::Color = pixels::Color {
    r: 0x8f,
    g: 0x91,
    b: 0x85,
    a: 0xff,
};
const PIXEL_OFF: pixels::Color = pixels::Color {
    r: 0x11,
    g: 0x1d,
    b: 0x2b,
    a: 0xff,
};

#[derive(Parser, Debug)]
#[command(version, about = "CHIP-8 virtual machine", long_about = None)]
struct Args {
    /// Path to the ROM file to run
    rom: PathBuf,

    #[arg(short, long, default_value_t = 6, help = "Window scale factor")]
    scale: u32,

    #[arg(short, long, default_value_t = 1000, help = "Instructions per second")]
    ips: u32,

    #[arg(short, long, help = "Disable the sound timer beep")]
    mute: bool,
}

fn render(canvas: &mut WindowCanvas, vm: &Chip8, scale: i16) -> anyhow::Result<()> {
    canvas.set_draw_color(PIXEL_OFF);
    canvas.clear();
    for (x, y) in vm.lit_pixels() {
        let x = x as i16 * scale;
        let y = y as i16 * scale;
        canvas
            .box_(x, y, x + scale - 1, y + scale - 1, PIXEL_ON)
            .map_err(anyhow::Error::msg)?;
    }
    canvas.present();
    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let rom = std::fs::read(&args.rom)
        .with_context(|| format!("can not open file {}", args.rom.display()))?;
    let mut vm = Chip8::with_thread_rng(&rom)?;
    info!("running {} ({} bytes)", args.rom.display(), rom.len());

    let sdl_ctx = sdl2::init().map_err(anyhow::Error::msg)?;
    let video = sdl_ctx.video().map_err(anyhow::Error::msg)?;

    let window = video
        .window(
            "CHIP-8",
            SCREEN_WIDTH as u32 * args.scale,
            SCREEN_HEIGHT as u32 * args.scale,
        )
        .position_centered()
        .build()?;
    let mut canvas = window.into_canvas().build()?;
    canvas.set_draw_color(PIXEL_OFF);
    canvas.clear();
    canvas.present();

    let mut beeper = if args.mute {
        Beeper::mute()
    } else {
        let audio = sdl_ctx.audio().map_err(anyhow::Error::msg)?;
        Beeper::new(&audio).map_err(anyhow::Error::msg)?
    };

    let mut event_pump = sdl_ctx.event_pump().map_err(anyhow::Error::msg)?;

    let scale = args.scale as i16;
    let cycle = Duration::from_secs(1) / args.ips.max(1);
    let frame = Duration::from_secs(1) / TIMER_HZ;
    let mut last_tick = Instant::now();
    let mut last_frame = Instant::now();

    while !vm.is_stopped() {
        for e in event_pump.poll_iter() {
            match e {
                Event::Quit { .. }
                | Event::KeyDown {
                    keycode: Some(Keycode::Escape),
                    ..
                } => vm.stop(),
                Event::KeyDown {
                    keycode: Some(k),
                    repeat: false,
                    ..
                } => {
                    if let Some(key) = map_key(k) {
                        vm.key_down(key)?;
                    }
                }
                Event::KeyUp {
                    keycode: Some(k), ..
                } => {
                    if let Some(key) = map_key(k) {
                        vm.key_up(key)?;
                    }
                }
                _ => {}
            }
        }

        if let Err(e) = vm.step() {
            error!("{}", e);
            vm.stop();
        }

        if last_tick.elapsed() >= frame {
            last_tick = Instant::now();
            vm.tick_timers();
            beeper.set(vm.sound_flag());
        }

        if last_frame.elapsed() >= frame && vm.take_draw_flag() {
            last_frame = Instant::now();
            render(&mut canvas, &vm, scale)?;
        }

        std::thread::sleep(cycle);
    }

    beeper.set(false);
    Ok(())
}
