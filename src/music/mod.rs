use serde::{Deserialize, Serialize};

mod charmap;
mod mapping;
mod sequence;

pub use charmap::{
    char_sound, create_character_sequence, resolve_char, CharSound, LineBreakSound, PercSound,
};
pub use mapping::{map_structure, Chord, ChordQuality, Melody, MusicMapping, Rhythm};
pub use sequence::{
    sequence_structure, CharEventPayload, CharacterEvent, DrumSound, Sequence, TimedEvent,
    TimedPayload, TIME_INCREMENT,
};

/// Note-length classes, named after their notation values at the fixed
/// 120 bpm transport tempo.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DurationClass {
    #[serde(rename = "2n")]
    Half,
    #[serde(rename = "4n")]
    Quarter,
    #[serde(rename = "8n")]
    Eighth,
    #[serde(rename = "16n")]
    Sixteenth,
}

impl DurationClass {
    // One time-unit = one second at 120 bpm, so a quarter note is 0.5.
    pub fn time_units(self) -> f64 {
        match self {
            DurationClass::Half => 1.0,
            DurationClass::Quarter => 0.5,
            DurationClass::Eighth => 0.25,
            DurationClass::Sixteenth => 0.125,
        }
    }
}

/// Frequency in Hz for a note name like "C4", "Eb3" or "F#5".
/// Unparseable names land on A4; the mapping tables only produce valid ones.
pub fn note_to_freq(name: &str) -> f32 {
    let mut chars = name.chars();
    let letter = match chars.next() {
        Some(c) => c.to_ascii_uppercase(),
        None => return 440.0,
    };
    let mut semitone: i32 = match letter {
        'C' => 0,
        'D' => 2,
        'E' => 4,
        'F' => 5,
        'G' => 7,
        'A' => 9,
        'B' => 11,
        _ => return 440.0,
    };
    let rest: String = chars.collect();
    let mut octave_str = rest.as_str();
    if let Some(stripped) = rest.strip_prefix('#') {
        semitone += 1;
        octave_str = stripped;
    } else if let Some(stripped) = rest.strip_prefix('b') {
        semitone -= 1;
        octave_str = stripped;
    }
    let octave: i32 = octave_str.parse().unwrap_or(4);
    // MIDI-style numbering: C4 = 60, A4 = 69 = 440 Hz
    let midi = (octave + 1) * 12 + semitone;
    440.0 * 2.0_f32.powf((midi - 69) as f32 / 12.0)
}
