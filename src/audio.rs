use sdl2::audio::{AudioCallback, AudioDevice, AudioSpecDesired};
use sdl2::AudioSubsystem;

const BEEP_PITCH: f32 = 440.0;
const BEEP_VOLUME: f32 = 0.15;

struct SquareWave {
    phase_inc: f32,
    phase: f32,
}

impl AudioCallback for SquareWave {
    type Channel = f32;

    fn callback(&mut self, out: &mut [f32]) {
        for sample in out.iter_mut() {
            *sample = if self.phase < 0.5 {
                BEEP_VOLUME
            } else {
                -BEEP_VOLUME
            };
            self.phase = (self.phase + self.phase_inc) % 1.0;
        }
    }
}

/// plays a tone while the sound timer is running
pub struct Beeper {
    device: Option<AudioDevice<SquareWave>>,
    is_beeping: bool,
}

impl Beeper {
    pub fn new(audio: &AudioSubsystem) -> Result<Self, String> {
        let desired = AudioSpecDesired {
            freq: Some(44_100),
            channels: Some(1),
            samples: None,
        };
        let device = audio.open_playback(None, &desired, |spec| SquareWave {
            phase_inc: BEEP_PITCH / spec.freq as f32,
            phase: 0.0,
        })?;
        Ok(Self {
            device: Some(device),
            is_beeping: false,
        })
    }

    pub fn mute() -> Self {
        Self {
            device: None,
            is_beeping: false,
        }
    }

    pub fn set(&mut self, on: bool) {
        if on == self.is_beeping {
            return;
        }
        if let Some(device) = &self.device {
            if on {
                device.resume();
            } else {
                device.pause();
            }
        }
        self.is_beeping = on;
    }
}
