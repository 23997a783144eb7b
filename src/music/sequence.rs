// Event sequencer: merges the structural mapping (or a raw character walk)
// into one flat, time-ordered timeline.

use log::warn;
use serde::Serialize;

use super::charmap::{LineBreakSound, PercSound};
use super::mapping::{chord_notes, MusicMapping};
use super::DurationClass;

/// Base clock unit U: a sixteenth note at the fixed 120 bpm tempo.
pub const TIME_INCREMENT: f64 = 0.125;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DrumSound {
    Kick,
    Snare,
    Hihat,
}

/// Playable payload of one character event.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum CharEventPayload {
    Note { pitch: &'static str },
    Percussion { sound: PercSound },
    Special { sound: LineBreakSound },
    Silence,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CharacterEvent {
    #[serde(skip)]
    pub ch: char,
    #[serde(flatten)]
    pub payload: CharEventPayload,
    pub duration: DurationClass,
    pub time: f64,
    pub index: usize,
    pub line: usize,
    pub column: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TimedPayload {
    Melody { pitch: &'static str },
    Bass { pitch: &'static str },
    Harmony { pitch: String },
    Drum { sound: DrumSound },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TimedEvent {
    #[serde(flatten)]
    pub payload: TimedPayload,
    pub duration: DurationClass,
    pub time: f64,
}

/// The one live sequence per engine instance. Replaced wholesale on every
/// regeneration, never mutated in place.
#[derive(Clone, Debug, Serialize)]
#[serde(untagged)]
pub enum Sequence {
    Characters(Vec<CharacterEvent>),
    Timed(Vec<TimedEvent>),
}

impl Sequence {
    pub fn len(&self) -> usize {
        match self {
            Sequence::Characters(events) => events.len(),
            Sequence::Timed(events) => events.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Latest event end (time + duration), used to bound the capture wait.
    pub fn max_end_time(&self) -> Option<f64> {
        let end = match self {
            Sequence::Characters(events) => events
                .iter()
                .map(|e| e.time + e.duration.time_units())
                .fold(f64::NEG_INFINITY, f64::max),
            Sequence::Timed(events) => events
                .iter()
                .map(|e| e.time + e.duration.time_units())
                .fold(f64::NEG_INFINITY, f64::max),
        };
        if end.is_finite() { Some(end) } else { None }
    }
}

/// Merge the structural mapping into one timeline. Empty analyses get the
/// fixed default pattern; a failed merge degrades to the minimal fallback.
pub fn sequence_structure(mapping: &MusicMapping) -> Vec<TimedEvent> {
    if !mapping.has_content {
        return default_sequence();
    }
    match merge_structural(mapping) {
        Ok(events) => events,
        Err(e) => {
            warn!("structural merge failed, using fallback sequence: {e:#}");
            fallback_sequence()
        }
    }
}

fn merge_structural(mapping: &MusicMapping) -> anyhow::Result<Vec<TimedEvent>> {
    let mut events = Vec::new();

    for (melody_index, melody) in mapping.melodies.iter().enumerate() {
        let start = melody_index as f64 * 4.0;
        for (i, note) in melody.notes.iter().enumerate() {
            let duration = melody
                .durations
                .get(i)
                .copied()
                .unwrap_or(DurationClass::Eighth);
            events.push(TimedEvent {
                payload: TimedPayload::Melody { pitch: note },
                duration,
                time: start + i as f64 * 0.25,
            });
        }
    }

    for (rhythm_index, rhythm) in mapping.rhythms.iter().enumerate() {
        let start = rhythm_index as f64 * 2.0;
        for (i, step) in rhythm.pattern.iter().enumerate() {
            // rests keep their time slot but emit nothing
            let Some(pitch) = step else { continue };
            let duration = rhythm
                .durations
                .get(i)
                .copied()
                .unwrap_or(DurationClass::Sixteenth);
            events.push(TimedEvent {
                payload: TimedPayload::Bass { pitch },
                duration,
                time: start + i as f64 * 0.125,
            });
        }
    }

    for (harmony_index, harmony) in mapping.harmonies.iter().enumerate() {
        let start = harmony_index as f64 * 4.0;
        for (i, chord) in harmony.chords.iter().enumerate() {
            let duration = harmony
                .durations
                .get(i)
                .copied()
                .unwrap_or(DurationClass::Half);
            let time = start + i as f64 * 2.0;
            for pitch in chord_notes(chord)? {
                events.push(TimedEvent {
                    payload: TimedPayload::Harmony { pitch },
                    duration,
                    time,
                });
            }
        }
    }

    events.extend(drum_pattern(mapping.melodies.len(), mapping.rhythms.len()));

    // stable: ties keep insertion order
    events.sort_by(|a, b| a.time.total_cmp(&b.time));
    Ok(events)
}

/// Derived drum bed, scaled up as the piece gets busier.
fn drum_pattern(melody_count: usize, rhythm_count: usize) -> Vec<TimedEvent> {
    let complexity = melody_count + rhythm_count;
    let length = 16 * (1 + complexity / 4);

    let mut pattern = Vec::new();
    for i in 0..length {
        let time = i as f64 * 0.25;
        if i % 4 == 0 {
            pattern.push(TimedEvent {
                payload: TimedPayload::Drum { sound: DrumSound::Kick },
                duration: DurationClass::Eighth,
                time,
            });
        }
        if i % 4 == 2 {
            pattern.push(TimedEvent {
                payload: TimedPayload::Drum { sound: DrumSound::Snare },
                duration: DurationClass::Eighth,
                time,
            });
        }
        if complexity > 2 && i % 2 == 1 {
            pattern.push(TimedEvent {
                payload: TimedPayload::Drum { sound: DrumSound::Hihat },
                duration: DurationClass::Sixteenth,
                time,
            });
        }
    }
    pattern
}

/// Fixed pattern substituted when the analysis found nothing to map.
fn default_sequence() -> Vec<TimedEvent> {
    let mut events = Vec::new();

    for (i, note) in ["C4", "E4", "G4", "C5", "B4", "G4", "E4", "C4"]
        .iter()
        .enumerate()
    {
        events.push(TimedEvent {
            payload: TimedPayload::Melody { pitch: note },
            duration: DurationClass::Eighth,
            time: i as f64 * 0.5,
        });
    }

    for (i, note) in ["C2", "G2", "A2", "F2"].iter().enumerate() {
        events.push(TimedEvent {
            payload: TimedPayload::Bass { pitch: note },
            duration: DurationClass::Half,
            time: i as f64 * 2.0,
        });
    }

    for i in 0..16 {
        let time = i as f64 * 0.25;
        if i % 4 == 0 {
            events.push(TimedEvent {
                payload: TimedPayload::Drum { sound: DrumSound::Kick },
                duration: DurationClass::Quarter,
                time,
            });
        }
        if i % 4 == 2 {
            events.push(TimedEvent {
                payload: TimedPayload::Drum { sound: DrumSound::Snare },
                duration: DurationClass::Quarter,
                time,
            });
        }
    }

    events.sort_by(|a, b| a.time.total_cmp(&b.time));
    events
}

/// Last-resort sequence when the merge itself fails.
fn fallback_sequence() -> Vec<TimedEvent> {
    ["C4", "E4", "G4", "C5"]
        .iter()
        .enumerate()
        .map(|(i, note)| TimedEvent {
            payload: TimedPayload::Melody { pitch: note },
            duration: DurationClass::Quarter,
            time: i as f64 * 0.5,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{AnalysisResult, ConditionalInfo, FunctionInfo, Language, LoopInfo};
    use crate::music::mapping::map_structure;

    fn empty_analysis() -> AnalysisResult {
        AnalysisResult {
            complexity: 0.0,
            functions: vec![],
            loops: vec![],
            conditionals: vec![],
            variables: vec![],
            line_count: 0,
            language: Language::JavaScript,
        }
    }

    #[test]
    fn empty_analysis_yields_exact_default_sequence() {
        let mapping = map_structure(&empty_analysis());
        let events = sequence_structure(&mapping);

        let melody: Vec<_> = events
            .iter()
            .filter_map(|e| match &e.payload {
                TimedPayload::Melody { pitch } => Some((*pitch, e.time)),
                _ => None,
            })
            .collect();
        assert_eq!(
            melody,
            vec![
                ("C4", 0.0),
                ("E4", 0.5),
                ("G4", 1.0),
                ("C5", 1.5),
                ("B4", 2.0),
                ("G4", 2.5),
                ("E4", 3.0),
                ("C4", 3.5),
            ]
        );

        let bass: Vec<_> = events
            .iter()
            .filter_map(|e| match &e.payload {
                TimedPayload::Bass { pitch } => Some((*pitch, e.time)),
                _ => None,
            })
            .collect();
        assert_eq!(bass, vec![("C2", 0.0), ("G2", 2.0), ("A2", 4.0), ("F2", 6.0)]);

        let kicks: Vec<f64> = events
            .iter()
            .filter_map(|e| match &e.payload {
                TimedPayload::Drum { sound: DrumSound::Kick } => Some(e.time),
                _ => None,
            })
            .collect();
        assert_eq!(kicks, vec![0.0, 1.0, 2.0, 3.0]);

        let snares: Vec<f64> = events
            .iter()
            .filter_map(|e| match &e.payload {
                TimedPayload::Drum { sound: DrumSound::Snare } => Some(e.time),
                _ => None,
            })
            .collect();
        assert_eq!(snares, vec![0.5, 1.5, 2.5, 3.5]);

        // no hihat in the default bed
        assert!(!events.iter().any(|e| matches!(
            e.payload,
            TimedPayload::Drum { sound: DrumSound::Hihat }
        )));
    }

    #[test]
    fn structural_merge_offsets() {
        let mut analysis = empty_analysis();
        analysis.functions.push(FunctionInfo {
            name: "a".into(),
            line_start: 0,
            line_end: 1,
            complexity: 2,
        });
        analysis.functions.push(FunctionInfo {
            name: "b".into(),
            line_start: 0,
            line_end: 0,
            complexity: 1,
        });
        analysis.loops.push(LoopInfo {
            kind: crate::analysis::LoopKind::For,
            depth: 1,
            iterations: 4,
            line: 1,
        });
        let mapping = map_structure(&analysis);
        let events = sequence_structure(&mapping);

        // second melody starts 4 units in, notes 0.25 apart
        let melody_times: Vec<f64> = events
            .iter()
            .filter_map(|e| match &e.payload {
                TimedPayload::Melody { .. } => Some(e.time),
                _ => None,
            })
            .collect();
        assert!(melody_times.contains(&0.0));
        assert!(melody_times.contains(&0.25));
        assert!(melody_times.contains(&4.0));

        // depth-1 loop puts bass on every 0.125 step
        let bass_times: Vec<f64> = events
            .iter()
            .filter_map(|e| match &e.payload {
                TimedPayload::Bass { .. } => Some(e.time),
                _ => None,
            })
            .collect();
        assert_eq!(bass_times, vec![0.0, 0.125, 0.25, 0.375]);
    }

    #[test]
    fn harmony_voices_every_chord_note() {
        let mut analysis = empty_analysis();
        analysis.conditionals.push(ConditionalInfo {
            has_else: false,
            line: 1,
        });
        let events = sequence_structure(&map_structure(&analysis));

        // Cmin7 at t=0 (4 notes), Cmaj at t=2 (3 notes)
        let at_zero: Vec<_> = events
            .iter()
            .filter_map(|e| match &e.payload {
                TimedPayload::Harmony { pitch } if e.time == 0.0 => Some(pitch.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(at_zero, ["C3", "Eb3", "G3", "Bb3"]);

        let at_two: Vec<_> = events
            .iter()
            .filter_map(|e| match &e.payload {
                TimedPayload::Harmony { pitch } if e.time == 2.0 => Some(pitch.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(at_two, ["C3", "E3", "G3"]);
    }

    #[test]
    fn drum_bed_scales_with_complexity() {
        // 3 melodies + 2 rhythms -> complexity 5 -> 32 steps, hihats on
        let beats = drum_pattern(3, 2);
        let max_time = beats.iter().map(|e| e.time).fold(0.0, f64::max);
        assert_eq!(max_time, 31.0 * 0.25);
        assert!(beats.iter().any(|e| matches!(
            e.payload,
            TimedPayload::Drum { sound: DrumSound::Hihat }
        )));

        // quiet piece: 16 steps, no hihat
        let quiet = drum_pattern(1, 0);
        assert!(quiet.iter().all(|e| !matches!(
            e.payload,
            TimedPayload::Drum { sound: DrumSound::Hihat }
        )));
        assert_eq!(quiet.len(), 8); // 4 kicks + 4 snares
    }

    #[test]
    fn timeline_is_sorted_by_time() {
        let mut analysis = empty_analysis();
        analysis.functions.push(FunctionInfo {
            name: "f".into(),
            line_start: 0,
            line_end: 7,
            complexity: 8,
        });
        analysis.loops.push(LoopInfo {
            kind: crate::analysis::LoopKind::While,
            depth: 1,
            iterations: 8,
            line: 2,
        });
        let events = sequence_structure(&map_structure(&analysis));
        for pair in events.windows(2) {
            assert!(pair[0].time <= pair[1].time);
        }
    }

    #[test]
    fn fallback_is_four_quarter_notes() {
        let events = fallback_sequence();
        assert_eq!(events.len(), 4);
        assert_eq!(events[3].time, 1.5);
        assert!(matches!(events[0].payload, TimedPayload::Melody { pitch: "C4" }));
    }

    #[test]
    fn max_end_time_covers_longest_event() {
        let seq = Sequence::Timed(fallback_sequence());
        // last note starts at 1.5 and rings for a quarter (0.5)
        assert_eq!(seq.max_end_time(), Some(2.0));
        assert_eq!(Sequence::Timed(vec![]).max_end_time(), None);
    }

    #[test]
    fn sequence_serializes_to_external_shape() {
        let seq = Sequence::Timed(vec![TimedEvent {
            payload: TimedPayload::Drum { sound: DrumSound::Kick },
            duration: DurationClass::Eighth,
            time: 0.25,
        }]);
        let json = serde_json::to_value(&seq).unwrap();
        assert_eq!(
            json,
            serde_json::json!([
                { "type": "drum", "sound": "kick", "duration": "8n", "time": 0.25 }
            ])
        );
    }
}
