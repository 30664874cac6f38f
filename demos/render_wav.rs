//! Offline render to a WAV file.
//!
//! Plays a vibrato sine, a sweeping pulse and a pink-noise swell, then
//! writes the stereo result to `tonewheel_demo.wav` (or the path given as
//! the first argument).

use anyhow::Result;
use simplelog::{ColorChoice, Config, LevelFilter, TerminalMode, TermLogger};
use tonewheel::{AudioContext, Control, Noise, NoiseColor, Pulse, SinOsc, Sound};

const SAMPLE_RATE: u32 = 44100;
const SECONDS: f64 = 6.0;

fn main() -> Result<()> {
    TermLogger::init(
        LevelFilter::Debug,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )?;

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "tonewheel_demo.wav".to_string());

    let ctx = AudioContext::new(SAMPLE_RATE);

    // 5 Hz vibrato, +/- 6 Hz around 330 Hz
    let mut vibrato = SinOsc::new(&ctx, 5.0);
    vibrato.amp(6.0)?;
    vibrato.disconnect()?;
    vibrato.start()?;

    let mut lead = SinOsc::new(&ctx, 330.0);
    lead.freq(vibrato.output())?;
    lead.pan(-0.4)?;
    lead.amp(Control::ramp(0.3, 0.2, 0.0))?;
    lead.start()?;
    lead.amp(Control::ramp(0.0, 1.0, 2.5))?;

    let mut pulse = Pulse::new(&ctx, 110.0, 0.5);
    pulse.pan(0.4)?;
    pulse.amp(Control::ramp(0.15, 0.1, 1.0))?;
    pulse.start_in(1.0, None)?;
    pulse.freq(Control::ramp(220.0, 3.0, 1.0))?;
    pulse.width(0.1)?;
    pulse.stop_in(4.5)?;

    let mut hiss = Noise::new(&ctx, NoiseColor::Pink);
    hiss.amp(Control::ramp(0.2, 1.5, 3.0))?;
    hiss.start()?;
    hiss.amp(Control::ramp(0.0, 1.0, 5.0))?;

    let spec = hound::WavSpec {
        channels: 2,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(&path, spec)?;

    let mut block = vec![0.0; 2 * 1024];
    let total = (SECONDS * SAMPLE_RATE as f64) as usize;
    let mut written = 0;
    while written < total {
        let frames = (total - written).min(block.len() / 2);
        let out = &mut block[..2 * frames];
        ctx.render(out);
        for &sample in out.iter() {
            let value = (sample.clamp(-1.0, 1.0) * i16::MAX as f64) as i16;
            writer.write_sample(value)?;
        }
        written += frames;
    }
    writer.finalize()?;

    log::info!("wrote {SECONDS}s to {path}");
    Ok(())
}
