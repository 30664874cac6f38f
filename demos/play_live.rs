//! Interactive playback through the default output device.
//!
//! Keys:
//! - SPACE: start/stop the oscillator
//! - W: cycle waveform
//! - UP/DOWN: glide the frequency up or down a fifth
//! - LEFT/RIGHT: pan
//! - N: start/stop noise, C: cycle its color
//! - Q or ESC: quit

use anyhow::Result;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SampleFormat, StreamConfig};
use crossterm::{
    ExecutableCommand,
    cursor::{Hide, MoveTo, Show},
    event::{self, Event, KeyCode, KeyEventKind},
    terminal::{
        Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode,
        enable_raw_mode,
    },
};
use std::io::{Write, stdout};
use std::panic;
use std::time::Duration;
use tonewheel::{AudioContext, Control, Noise, NoiseColor, Oscillator, Waveform};

const GLIDE: f64 = 0.15;

struct Instrument {
    osc: Oscillator,
    noise: Noise,
    frequency: f64,
    pan: f64,
}

impl Instrument {
    fn new(ctx: &AudioContext) -> Result<Self> {
        let mut osc = Oscillator::new(ctx, Waveform::Sine, 220.0);
        osc.amp(0.25)?;
        let mut noise = Noise::new(ctx, NoiseColor::White);
        noise.amp(0.08)?;
        Ok(Self {
            osc,
            noise,
            frequency: 220.0,
            pan: 0.0,
        })
    }

    fn handle_key(&mut self, code: KeyCode) -> Result<()> {
        match code {
            KeyCode::Char(' ') => {
                if self.osc.is_started() {
                    self.osc.stop()?;
                } else {
                    self.osc.start()?;
                }
            }
            KeyCode::Char('w') | KeyCode::Char('W') => {
                let next = match self.osc.waveform() {
                    Waveform::Sine => Waveform::Triangle,
                    Waveform::Triangle => Waveform::Sawtooth,
                    Waveform::Sawtooth => Waveform::Square,
                    Waveform::Square => Waveform::Sine,
                };
                self.osc.set_type(next)?;
            }
            KeyCode::Up => self.glide(1.5)?,
            KeyCode::Down => self.glide(1.0 / 1.5)?,
            KeyCode::Left => self.pan_by(-0.25)?,
            KeyCode::Right => self.pan_by(0.25)?,
            KeyCode::Char('n') | KeyCode::Char('N') => {
                if self.noise.is_started() {
                    self.noise.stop()?;
                } else {
                    self.noise.start()?;
                }
            }
            KeyCode::Char('c') | KeyCode::Char('C') => {
                let next = match self.noise.color() {
                    NoiseColor::White => NoiseColor::Pink,
                    NoiseColor::Pink => NoiseColor::Brown,
                    NoiseColor::Brown => NoiseColor::White,
                };
                self.noise.set_type(next)?;
            }
            _ => {}
        }
        Ok(())
    }

    fn glide(&mut self, ratio: f64) -> Result<()> {
        self.frequency = (self.frequency * ratio).clamp(30.0, 4000.0);
        self.osc.freq(Control::ramp(self.frequency, GLIDE, 0.0))?;
        Ok(())
    }

    fn pan_by(&mut self, step: f64) -> Result<()> {
        self.pan = (self.pan + step).clamp(-1.0, 1.0);
        self.osc.pan(self.pan)?;
        self.noise.pan(self.pan)?;
        Ok(())
    }

    fn draw(&self) -> Result<()> {
        let mut out = stdout();
        out.execute(Clear(ClearType::All))?;
        out.execute(MoveTo(0, 0))?;
        let lines = [
            "tonewheel live".to_string(),
            String::new(),
            format!(
                "oscillator: {} {:.1} Hz [{}]",
                self.osc.waveform(),
                self.frequency,
                if self.osc.is_started() { "on" } else { "off" }
            ),
            format!(
                "noise:      {} [{}]",
                self.noise.color(),
                if self.noise.is_started() { "on" } else { "off" }
            ),
            format!("pan:        {:+.2}", self.pan),
            String::new(),
            "SPACE osc, W waveform, UP/DOWN glide, LEFT/RIGHT pan".to_string(),
            "N noise, C color, Q/ESC quit".to_string(),
        ];
        for line in lines {
            write!(out, "{line}\r\n")?;
        }
        out.flush()?;
        Ok(())
    }
}

fn main() -> Result<()> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| anyhow::anyhow!("No output device available"))?;
    let config = device.default_output_config()?;

    let ctx = AudioContext::new(config.sample_rate().0);
    let mut instrument = Instrument::new(&ctx)?;

    let _stream = match config.sample_format() {
        SampleFormat::F32 => create_audio_stream::<f32>(&device, &config.into(), ctx.clone())?,
        SampleFormat::I16 => create_audio_stream::<i16>(&device, &config.into(), ctx.clone())?,
        SampleFormat::U16 => create_audio_stream::<u16>(&device, &config.into(), ctx.clone())?,
        sample_format => {
            return Err(anyhow::anyhow!(
                "Unsupported sample format: {}",
                sample_format
            ));
        }
    };

    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    stdout().execute(Hide)?;

    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        cleanup_terminal();
        original_hook(panic_info);
    }));

    let result = run(&mut instrument);
    cleanup_terminal();
    result
}

fn run(instrument: &mut Instrument) -> Result<()> {
    instrument.draw()?;
    loop {
        if !event::poll(Duration::from_millis(50))? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        if matches!(key.code, KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc) {
            return Ok(());
        }
        instrument.handle_key(key.code)?;
        instrument.draw()?;
    }
}

/// Creates an output stream that renders the context straight into the device buffer.
fn create_audio_stream<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    ctx: AudioContext,
) -> Result<cpal::Stream>
where
    T: Sample + FromSample<f64> + cpal::SizedSample,
{
    let channels = config.channels as usize;
    let mut stereo = Vec::new();

    let stream = device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            let frames = data.len() / channels;
            stereo.resize(2 * frames, 0.0);
            ctx.render(&mut stereo);
            for (frame, pair) in data.chunks_mut(channels).zip(stereo.chunks(2)) {
                match frame {
                    [mono] => *mono = T::from_sample(0.5 * (pair[0] + pair[1])),
                    [left, right, rest @ ..] => {
                        *left = T::from_sample(pair[0]);
                        *right = T::from_sample(pair[1]);
                        for s in rest {
                            *s = T::EQUILIBRIUM;
                        }
                    }
                    [] => {}
                }
            }
        },
        |err| eprintln!("Audio stream error: {}", err),
        None,
    )?;

    stream.play()?;
    Ok(stream)
}

fn cleanup_terminal() {
    let _ = stdout().execute(Show);
    let _ = stdout().execute(LeaveAlternateScreen);
    let _ = disable_raw_mode();
}
