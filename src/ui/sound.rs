/// Sound engine: procedural 8-bit style sound effects via rodio.
///
/// Every effect is synthesized once at init into a mono f32 buffer and
/// played fire-and-forget through a detached `Sink`.
///
/// Compile without the "sound" feature to disable audio entirely (the
/// stub SoundEngine does nothing).

#[cfg_attr(not(feature = "sound"), allow(dead_code))]
mod synth {
    use std::f32::consts::TAU;

    pub const SAMPLE_RATE: u32 = 22050;

    fn samples_for(duration: f32) -> usize {
        (SAMPLE_RATE as f32 * duration) as usize
    }

    /// Notes played back to back, each a sine with a 2nd harmonic and
    /// a decaying envelope.
    pub fn arpeggio(notes: &[(f32, f32)], volume: f32) -> Vec<f32> {
        let mut out = Vec::new();
        for &(freq, dur) in notes {
            let n = samples_for(dur);
            out.extend((0..n).map(|i| {
                let t = i as f32 / SAMPLE_RATE as f32;
                let env = 1.0 - (i as f32 / n as f32).powf(0.5);
                let wave = (t * freq * TAU).sin() * 0.7 + (t * freq * 2.0 * TAU).sin() * 0.3;
                wave * env * volume
            }));
        }
        out
    }

    /// Linear pitch sweep from `from` to `to` Hz.
    pub fn sweep(from: f32, to: f32, duration: f32, volume: f32) -> Vec<f32> {
        let n = samples_for(duration);
        let mut phase = 0.0_f32;
        (0..n)
            .map(|i| {
                let t = i as f32 / n as f32;
                let freq = from + (to - from) * t;
                phase += freq / SAMPLE_RATE as f32;
                (phase * TAU).sin() * (1.0 - t).powf(0.6) * volume
            })
            .collect()
    }

    /// Short noise thump for landing.
    pub fn thump(duration: f32, volume: f32) -> Vec<f32> {
        let n = samples_for(duration);
        let mut rng: u32 = 12345;
        (0..n)
            .map(|i| {
                let t = i as f32 / n as f32;
                rng = rng.wrapping_mul(1103515245).wrapping_add(12345);
                let noise = (rng as f32 / u32::MAX as f32) * 2.0 - 1.0;
                let tone = (i as f32 / SAMPLE_RATE as f32 * 90.0 * TAU).sin();
                (tone * 0.6 + noise * 0.4) * (1.0 - t).powi(2) * volume
            })
            .collect()
    }

    /// Square-ish buzz, used for wrong answers.
    pub fn buzz(notes: &[(f32, f32)], volume: f32) -> Vec<f32> {
        let mut out = Vec::new();
        for &(freq, dur) in notes {
            let n = samples_for(dur);
            out.extend((0..n).map(|i| {
                let t = i as f32 / SAMPLE_RATE as f32;
                let s = (t * freq * TAU).sin();
                let square = if s >= 0.0 { 1.0 } else { -1.0 };
                square * (1.0 - i as f32 / n as f32 * 0.4) * volume
            }));
        }
        out
    }

    pub fn jump() -> Vec<f32> { sweep(300.0, 750.0, 0.12, 0.22) }
    pub fn land() -> Vec<f32> { thump(0.06, 0.3) }
    pub fn respawn() -> Vec<f32> { sweep(700.0, 180.0, 0.3, 0.25) }
    pub fn blip() -> Vec<f32> { arpeggio(&[(880.0, 0.035)], 0.2) }

    pub fn correct() -> Vec<f32> {
        arpeggio(&[(784.0, 0.08), (1047.0, 0.16)], 0.3) // G5, C6
    }

    pub fn wrong() -> Vec<f32> {
        buzz(&[(220.0, 0.12), (165.0, 0.2)], 0.12)
    }

    pub fn all_answered() -> Vec<f32> {
        arpeggio(&[(1047.0, 0.045), (1319.0, 0.045), (1568.0, 0.09)], 0.25) // C6 E6 G6
    }

    pub fn clear() -> Vec<f32> {
        arpeggio(
            &[(523.0, 0.1), (659.0, 0.1), (784.0, 0.1), (1047.0, 0.35)], // C5 E5 G5 C6
            0.3,
        )
    }
}

#[cfg(feature = "sound")]
mod inner {
    use log::warn;
    use rodio::buffer::SamplesBuffer;
    use rodio::{OutputStream, OutputStreamHandle, Sink};

    use super::synth::{self, SAMPLE_RATE};

    pub struct SoundEngine {
        _stream: OutputStream,
        handle: OutputStreamHandle,
        sfx_jump: Vec<f32>,
        sfx_land: Vec<f32>,
        sfx_respawn: Vec<f32>,
        sfx_blip: Vec<f32>,
        sfx_correct: Vec<f32>,
        sfx_wrong: Vec<f32>,
        sfx_all_answered: Vec<f32>,
        sfx_clear: Vec<f32>,
    }

    impl SoundEngine {
        pub fn new() -> Option<Self> {
            let (stream, handle) = match OutputStream::try_default() {
                Ok(pair) => pair,
                Err(e) => {
                    warn!("no audio output: {e}");
                    return None;
                }
            };
            Some(SoundEngine {
                _stream: stream,
                handle,
                sfx_jump: synth::jump(),
                sfx_land: synth::land(),
                sfx_respawn: synth::respawn(),
                sfx_blip: synth::blip(),
                sfx_correct: synth::correct(),
                sfx_wrong: synth::wrong(),
                sfx_all_answered: synth::all_answered(),
                sfx_clear: synth::clear(),
            })
        }

        fn play(&self, samples: &[f32]) {
            if let Ok(sink) = Sink::try_new(&self.handle) {
                sink.append(SamplesBuffer::new(1, SAMPLE_RATE, samples.to_vec()));
                sink.detach();
            }
        }

        pub fn play_jump(&self) { self.play(&self.sfx_jump); }
        pub fn play_land(&self) { self.play(&self.sfx_land); }
        pub fn play_respawn(&self) { self.play(&self.sfx_respawn); }
        pub fn play_blip(&self) { self.play(&self.sfx_blip); }
        pub fn play_correct(&self) { self.play(&self.sfx_correct); }
        pub fn play_wrong(&self) { self.play(&self.sfx_wrong); }
        pub fn play_all_answered(&self) { self.play(&self.sfx_all_answered); }
        pub fn play_clear(&self) { self.play(&self.sfx_clear); }
    }
}

// ════════════════════════════════════════════════════════════
//  Public API, compiles to no-ops when sound feature is off
// ════════════════════════════════════════════════════════════

#[cfg(feature = "sound")]
pub use inner::SoundEngine;

#[cfg(not(feature = "sound"))]
pub struct SoundEngine;

#[cfg(not(feature = "sound"))]
impl SoundEngine {
    pub fn new() -> Option<Self> { Some(SoundEngine) }
    pub fn play_jump(&self) {}
    pub fn play_land(&self) {}
    pub fn play_respawn(&self) {}
    pub fn play_blip(&self) {}
    pub fn play_correct(&self) {}
    pub fn play_wrong(&self) {}
    pub fn play_all_answered(&self) {}
    pub fn play_clear(&self) {}
}
