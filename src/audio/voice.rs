// Oscillator voices. Everything is a phase/amp/decay machine so the render
// callback never allocates; timbre roles differ only in oscillator kind,
// base frequency and gain.

use super::StereoFrame;

const SILENCE_FLOOR: f32 = 0.0005;
// hard cap on ad-hoc live voices so sustained typing can't grow the pool
const MAX_TRANSIENTS: usize = 24;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Timbre {
    Sine,
    /// White-noise burst: snare, whoosh, wave, shaker.
    Noise,
    /// Inharmonic partial stack: hihat, gong, chime, crash.
    Metal,
    /// Sine with a downward pitch sweep: kick, tom, thunder.
    Membrane { sweep: f32 },
}

#[derive(Clone, Copy, Debug)]
pub struct SynthVoice {
    timbre: Timbre,
    phase: f32,
    phase_inc: f32,
    amp: f32,
    decay: f32,
    noise_state: u32,
    /// Remaining samples before a transient voice is reclaimed.
    ttl: Option<u32>,
    pub alive: bool,
}

impl SynthVoice {
    pub fn silent(timbre: Timbre) -> Self {
        Self {
            timbre,
            phase: 0.0,
            phase_inc: 0.0,
            amp: 0.0,
            decay: 1.0,
            noise_state: 0x2545_f491,
            ttl: None,
            alive: false,
        }
    }

    /// Retrigger from the top; decay is sized so the voice reaches the
    /// silence floor at the end of `duration` time-units.
    pub fn trigger(&mut self, freq: f32, gain: f32, duration: f64, sample_rate: f32) {
        let samples = (duration.max(0.01) * sample_rate as f64) as f32;
        self.phase = 0.0;
        self.phase_inc = std::f32::consts::TAU * freq / sample_rate;
        self.amp = gain.max(SILENCE_FLOOR * 2.0);
        self.decay = (SILENCE_FLOOR / self.amp).powf(1.0 / samples);
        self.alive = true;
    }

    pub fn with_ttl(mut self, ttl_units: f64, sample_rate: f32) -> Self {
        self.ttl = Some((ttl_units * sample_rate as f64) as u32);
        self
    }

    pub fn next_sample(&mut self) -> f32 {
        if !self.alive {
            return 0.0;
        }

        let raw = match self.timbre {
            Timbre::Sine => self.phase.sin(),
            Timbre::Metal => {
                let p = self.phase;
                0.45 * (p.sin() + 0.6 * (p * 3.01).sin() + 0.4 * (p * 4.16).sin()
                    + 0.25 * (p * 5.43).sin())
            }
            Timbre::Noise => {
                // xorshift keeps the callback free of rng state elsewhere
                let mut x = self.noise_state;
                x ^= x << 13;
                x ^= x >> 17;
                x ^= x << 5;
                self.noise_state = x;
                (x as f32 / u32::MAX as f32) * 2.0 - 1.0
            }
            Timbre::Membrane { sweep } => {
                let s = self.phase.sin();
                self.phase_inc *= sweep;
                s
            }
        };

        let out = self.amp * raw;
        self.phase += self.phase_inc;
        self.amp *= self.decay;
        if self.amp < SILENCE_FLOOR {
            self.alive = false;
        }
        if let Some(ttl) = self.ttl.as_mut() {
            *ttl = ttl.saturating_sub(1);
            if *ttl == 0 {
                self.alive = false;
            }
        }
        out
    }
}

/// Fixed pool of role-bound voices plus a bounded list of transients.
/// Recreated wholesale on every schedule load; never mutated piecemeal.
pub struct VoicePool {
    sample_rate: f32,
    lead: [SynthVoice; 6],
    bass: SynthVoice,
    kick: SynthVoice,
    snare: SynthVoice,
    hihat: SynthVoice,
    tom: SynthVoice,
    gong: SynthVoice,
    bell: [SynthVoice; 3],
    chime: SynthVoice,
    transients: Vec<SynthVoice>,
}

impl VoicePool {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            sample_rate,
            lead: [SynthVoice::silent(Timbre::Sine); 6],
            bass: SynthVoice::silent(Timbre::Sine),
            kick: SynthVoice::silent(Timbre::Membrane { sweep: 0.9995 }),
            snare: SynthVoice::silent(Timbre::Noise),
            hihat: SynthVoice::silent(Timbre::Metal),
            tom: SynthVoice::silent(Timbre::Membrane { sweep: 0.9999 }),
            gong: SynthVoice::silent(Timbre::Metal),
            bell: [SynthVoice::silent(Timbre::Sine); 3],
            chime: SynthVoice::silent(Timbre::Metal),
            transients: Vec::with_capacity(MAX_TRANSIENTS),
        }
    }

    /// Role voices only; transients come and go on top of this.
    pub const FIXED_VOICES: usize = 16;

    pub fn voice_count(&self) -> usize {
        Self::FIXED_VOICES + self.transients.len()
    }

    pub fn trigger_lead(&mut self, freq: f32, duration: f64) {
        let slot = self
            .lead
            .iter()
            .position(|v| !v.alive)
            .unwrap_or(0);
        self.lead[slot].trigger(freq, 0.22, duration, self.sample_rate);
    }

    pub fn trigger_harmony(&mut self, freq: f32, duration: f64) {
        let slot = self
            .lead
            .iter()
            .position(|v| !v.alive)
            .unwrap_or(self.lead.len() - 1);
        self.lead[slot].trigger(freq, 0.12, duration, self.sample_rate);
    }

    pub fn trigger_bass(&mut self, freq: f32, duration: f64) {
        self.bass.trigger(freq, 0.3, duration, self.sample_rate);
    }

    pub fn trigger_kick(&mut self, duration: f64) {
        self.kick.trigger(110.0, 0.5, duration, self.sample_rate);
    }

    pub fn trigger_snare(&mut self, duration: f64) {
        self.snare.trigger(0.0, 0.25, duration, self.sample_rate);
    }

    pub fn trigger_hihat(&mut self, duration: f64) {
        self.hihat.trigger(4000.0, 0.12, duration, self.sample_rate);
    }

    pub fn trigger_tom(&mut self, freq: f32, duration: f64) {
        self.tom.trigger(freq, 0.35, duration, self.sample_rate);
    }

    pub fn trigger_gong(&mut self, duration: f64) {
        self.gong.trigger(60.0, 0.4, duration, self.sample_rate);
    }

    pub fn trigger_bell(&mut self, freq: f32, duration: f64) {
        let slot = self
            .bell
            .iter()
            .position(|v| !v.alive)
            .unwrap_or(0);
        self.bell[slot].trigger(freq, 0.2, duration, self.sample_rate);
    }

    pub fn trigger_chime(&mut self, duration: f64) {
        self.chime.trigger(1200.0, 0.15, duration, self.sample_rate);
    }

    /// Ad-hoc voice with a hard lifetime, reclaimed in `render`.
    pub fn spawn_transient(
        &mut self,
        timbre: Timbre,
        freq: f32,
        gain: f32,
        duration: f64,
        ttl_units: f64,
    ) {
        let mut voice = SynthVoice::silent(timbre).with_ttl(ttl_units, self.sample_rate);
        voice.trigger(freq, gain, duration, self.sample_rate);
        if self.transients.len() < MAX_TRANSIENTS {
            self.transients.push(voice);
        } else if let Some(slot) = self.transients.iter().position(|v| !v.alive) {
            self.transients[slot] = voice;
        } else {
            self.transients[0] = voice;
        }
    }

    fn voices_mut(&mut self) -> impl Iterator<Item = &mut SynthVoice> {
        self.lead
            .iter_mut()
            .chain(std::iter::once(&mut self.bass))
            .chain(std::iter::once(&mut self.kick))
            .chain(std::iter::once(&mut self.snare))
            .chain(std::iter::once(&mut self.hihat))
            .chain(std::iter::once(&mut self.tom))
            .chain(std::iter::once(&mut self.gong))
            .chain(self.bell.iter_mut())
            .chain(std::iter::once(&mut self.chime))
            .chain(self.transients.iter_mut())
    }

    /// Mix every live voice into the block, then reap expired transients.
    pub fn render(&mut self, out: &mut [StereoFrame]) {
        for frame in out.iter_mut() {
            let mut mix = 0.0f32;
            for voice in self.voices_mut() {
                mix += voice.next_sample();
            }
            frame.left += mix;
            frame.right += mix;
        }
        self.transients.retain(|v| v.alive);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: f32 = 44100.0;

    #[test]
    fn triggered_voice_decays_to_silence() {
        let mut v = SynthVoice::silent(Timbre::Sine);
        v.trigger(440.0, 0.3, 0.05, SR);
        assert!(v.alive);
        let mut peak = 0.0f32;
        for _ in 0..(SR as usize / 10) {
            peak = peak.max(v.next_sample().abs());
        }
        assert!(peak > 0.01);
        assert!(!v.alive);
    }

    #[test]
    fn transient_ttl_bounds_lifetime() {
        let mut pool = VoicePool::new(SR);
        // long decay but a 0.01-unit ttl
        pool.spawn_transient(Timbre::Metal, 300.0, 0.3, 10.0, 0.01);
        assert_eq!(pool.voice_count(), VoicePool::FIXED_VOICES + 1);

        let mut block = vec![StereoFrame::default(); 1024];
        pool.render(&mut block);
        assert_eq!(pool.voice_count(), VoicePool::FIXED_VOICES);
    }

    #[test]
    fn transient_count_is_capped() {
        let mut pool = VoicePool::new(SR);
        for _ in 0..100 {
            pool.spawn_transient(Timbre::Noise, 0.0, 0.2, 4.0, 4.0);
        }
        assert_eq!(pool.voice_count(), VoicePool::FIXED_VOICES + MAX_TRANSIENTS);
    }

    #[test]
    fn render_accumulates_into_the_block() {
        let mut pool = VoicePool::new(SR);
        pool.trigger_lead(440.0, 0.5);
        let mut block = vec![StereoFrame::default(); 256];
        pool.render(&mut block);
        assert!(block.iter().any(|f| f.left.abs() > 0.0));
    }
}
