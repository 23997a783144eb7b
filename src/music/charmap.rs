// Fixed character-to-sound table. Every character resolves to exactly one
// entry; anything outside the table falls back to hihat percussion.

use serde::{Deserialize, Serialize};

use super::sequence::{CharEventPayload, CharacterEvent, TIME_INCREMENT};
use super::DurationClass;

/// Named percussion sounds the table can produce.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PercSound {
    Kick,
    Snare,
    Hihat,
    OpenHat,
    CloseHat,
    Crash,
    Ride,
    Clap,
    Cowbell,
    Tom,
    Splash,
    China,
    Accent,
    Bell,
    Coin,
    Triangle,
    Woodblock,
    Conga,
    Shaker,
    Tambourine,
}

/// The configurable sound played for line breaks.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineBreakSound {
    #[default]
    Gong,
    Crash,
    Windchime,
    Bell,
    Harp,
    Reverse,
    Whoosh,
    Thunder,
    Wave,
    Bird,
}

impl LineBreakSound {
    pub const ALL: [LineBreakSound; 10] = [
        LineBreakSound::Gong,
        LineBreakSound::Crash,
        LineBreakSound::Windchime,
        LineBreakSound::Bell,
        LineBreakSound::Harp,
        LineBreakSound::Reverse,
        LineBreakSound::Whoosh,
        LineBreakSound::Thunder,
        LineBreakSound::Wave,
        LineBreakSound::Bird,
    ];

    /// Validated lookup; anything outside the set is rejected so callers can
    /// substitute the default.
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|v| v.name() == s)
    }

    pub fn name(self) -> &'static str {
        match self {
            LineBreakSound::Gong => "gong",
            LineBreakSound::Crash => "crash",
            LineBreakSound::Windchime => "windchime",
            LineBreakSound::Bell => "bell",
            LineBreakSound::Harp => "harp",
            LineBreakSound::Reverse => "reverse",
            LineBreakSound::Whoosh => "whoosh",
            LineBreakSound::Thunder => "thunder",
            LineBreakSound::Wave => "wave",
            LineBreakSound::Bird => "bird",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            LineBreakSound::Gong => "Gong",
            LineBreakSound::Crash => "Cymbal Crash",
            LineBreakSound::Windchime => "Wind Chime",
            LineBreakSound::Bell => "Bell",
            LineBreakSound::Harp => "Harp Gliss",
            LineBreakSound::Reverse => "Reverse Cymbal",
            LineBreakSound::Whoosh => "Whoosh",
            LineBreakSound::Thunder => "Thunder",
            LineBreakSound::Wave => "Ocean Wave",
            LineBreakSound::Bird => "Bird Chirp",
        }
    }

    pub fn next(self) -> Self {
        let i = Self::ALL.iter().position(|v| *v == self).unwrap_or(0);
        Self::ALL[(i + 1) % Self::ALL.len()]
    }
}

/// Raw table entry for a character, before the line-break sound is filled in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CharSound {
    Note(&'static str),
    Perc(PercSound),
    Silence,
    LineBreak,
}

/// The table itself. Lowercase letters map into octaves 4-5, uppercase one
/// octave up; o-z wrap back to the start of the scale. Digits sit lower.
pub fn char_sound(c: char) -> CharSound {
    use CharSound::*;
    use PercSound::*;
    match c {
        'a' => Note("C4"),
        'b' => Note("D4"),
        'c' => Note("E4"),
        'd' => Note("F4"),
        'e' => Note("G4"),
        'f' => Note("A4"),
        'g' => Note("B4"),
        'h' => Note("C5"),
        'i' => Note("D5"),
        'j' => Note("E5"),
        'k' => Note("F5"),
        'l' => Note("G5"),
        'm' => Note("A5"),
        'n' => Note("B5"),
        'o' => Note("C4"),
        'p' => Note("D4"),
        'q' => Note("E4"),
        'r' => Note("F4"),
        's' => Note("G4"),
        't' => Note("A4"),
        'u' => Note("B4"),
        'v' => Note("C5"),
        'w' => Note("D5"),
        'x' => Note("E5"),
        'y' => Note("F5"),
        'z' => Note("G5"),
        'A' => Note("C5"),
        'B' => Note("D5"),
        'C' => Note("E5"),
        'D' => Note("F5"),
        'E' => Note("G5"),
        'F' => Note("A5"),
        'G' => Note("B5"),
        'H' => Note("C6"),
        'I' => Note("D6"),
        'J' => Note("E6"),
        'K' => Note("F6"),
        'L' => Note("G6"),
        'M' => Note("A6"),
        'N' => Note("B6"),
        'O' => Note("C5"),
        'P' => Note("D5"),
        'Q' => Note("E5"),
        'R' => Note("F5"),
        'S' => Note("G5"),
        'T' => Note("A5"),
        'U' => Note("B5"),
        'V' => Note("C6"),
        'W' => Note("D6"),
        'X' => Note("E6"),
        'Y' => Note("F6"),
        'Z' => Note("G6"),
        '0' => Note("C3"),
        '1' => Note("D3"),
        '2' => Note("E3"),
        '3' => Note("F3"),
        '4' => Note("G3"),
        '5' => Note("A3"),
        '6' => Note("B3"),
        '7' => Note("C4"),
        '8' => Note("D4"),
        '9' => Note("E4"),
        ' ' => Silence,
        '.' => Perc(Kick),
        ',' => Perc(Hihat),
        ';' | ':' => Perc(Snare),
        '(' => Perc(OpenHat),
        ')' => Perc(CloseHat),
        '[' | ']' => Perc(Crash),
        '{' | '}' => Perc(Ride),
        '=' => Perc(Clap),
        '+' => Perc(Cowbell),
        '-' | '_' => Perc(Tom),
        '/' | '\\' => Perc(Splash),
        '|' => Perc(China),
        '!' | '?' => Perc(Accent),
        '@' | '#' => Perc(Bell),
        '$' | '%' => Perc(Coin),
        '^' => Perc(Triangle),
        '&' => Perc(Woodblock),
        '*' => Perc(Conga),
        '"' => Perc(Shaker),
        '\'' => Perc(Tambourine),
        '\n' => LineBreak,
        // unmapped characters get a safe default
        _ => Perc(Hihat),
    }
}

/// Resolve a character to its playable payload plus duration class. The
/// line-break sentinel takes the caller-supplied sound.
pub fn resolve_char(c: char, line_break: LineBreakSound) -> (CharEventPayload, DurationClass) {
    match char_sound(c) {
        CharSound::LineBreak => (
            CharEventPayload::Special { sound: line_break },
            DurationClass::Half,
        ),
        CharSound::Silence => (CharEventPayload::Silence, DurationClass::Sixteenth),
        CharSound::Note(pitch) => (CharEventPayload::Note { pitch }, DurationClass::Sixteenth),
        CharSound::Perc(sound) => (
            CharEventPayload::Percussion { sound },
            DurationClass::Sixteenth,
        ),
    }
}

/// Walk the text left to right with a running clock. A line break advances
/// the clock by 4U after its event, a space by 0.5U, everything else by 1U.
pub fn create_character_sequence(text: &str, line_break: LineBreakSound) -> Vec<CharacterEvent> {
    let mut sequence = Vec::new();
    let mut time = 0.0f64;
    let mut line = 1usize;
    let mut column = 0usize;

    for (index, c) in text.chars().enumerate() {
        let (payload, duration) = resolve_char(c, line_break);
        sequence.push(CharacterEvent {
            ch: c,
            payload,
            duration,
            time,
            index,
            line,
            column,
        });

        if c == '\n' {
            time += TIME_INCREMENT * 4.0;
            line += 1;
            column = 0;
        } else if c == ' ' {
            time += TIME_INCREMENT / 2.0;
            column += 1;
        } else {
            time += TIME_INCREMENT;
            column += 1;
        }
    }

    sequence
}
