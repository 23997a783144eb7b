// Structural mapper: functions become melodies, loops become rhythm
// patterns, conditionals become chord progressions.

use anyhow::bail;

use crate::analysis::{AnalysisResult, LoopKind};

use super::DurationClass;

const SCALE: [&str; 7] = ["C4", "D4", "E4", "F4", "G4", "A4", "B4"];
const CHORD_ROOTS: [char; 7] = ['C', 'D', 'E', 'F', 'G', 'A', 'B'];

#[derive(Clone, Debug, PartialEq)]
pub struct Melody {
    pub name: String,
    pub notes: Vec<&'static str>,
    pub durations: Vec<DurationClass>,
}

/// One rhythm step: a sounding pitch or a rest that still occupies its slot.
#[derive(Clone, Debug, PartialEq)]
pub struct Rhythm {
    pub kind: LoopKind,
    pub pattern: Vec<Option<&'static str>>,
    pub durations: Vec<DurationClass>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Harmony {
    pub chords: Vec<Chord>,
    pub durations: Vec<DurationClass>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChordQuality {
    Maj,
    Min,
    Maj7,
    Min7,
    Sus4,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Chord {
    pub root: char,
    pub quality: ChordQuality,
}

#[derive(Clone, Debug, Default)]
pub struct MusicMapping {
    pub melodies: Vec<Melody>,
    pub rhythms: Vec<Rhythm>,
    pub harmonies: Vec<Harmony>,
    pub has_content: bool,
}

pub fn map_structure(analysis: &AnalysisResult) -> MusicMapping {
    let has_content = !analysis.functions.is_empty()
        || !analysis.loops.is_empty()
        || !analysis.conditionals.is_empty();

    let melodies = analysis
        .functions
        .iter()
        .enumerate()
        .map(|(index, func)| {
            let length = if func.complexity == 0 {
                4
            } else {
                func.complexity.min(16)
            };

            let notes: Vec<&'static str> = (0..length)
                .map(|i| SCALE[(index * 2 + i + i / 4) % 7])
                .collect();
            let durations = (0..length).map(step_duration).collect();

            Melody {
                name: func.name.clone(),
                notes,
                durations,
            }
        })
        .collect();

    let rhythms = analysis
        .loops
        .iter()
        .map(|lp| {
            let depth = lp.depth.max(1);
            let iterations = if lp.iterations == 0 { 8 } else { lp.iterations };

            let mut pattern = Vec::with_capacity(iterations);
            let mut durations = Vec::with_capacity(iterations);
            for i in 0..iterations {
                if i % depth == 0 {
                    pattern.push(Some("C2"));
                    durations.push(DurationClass::Eighth);
                } else if i % 3 == 0 {
                    pattern.push(Some("G2"));
                    durations.push(DurationClass::Sixteenth);
                } else {
                    pattern.push(None);
                    durations.push(DurationClass::Sixteenth);
                }
            }

            Rhythm {
                kind: lp.kind,
                pattern,
                durations,
            }
        })
        .collect();

    let harmonies = analysis
        .conditionals
        .iter()
        .enumerate()
        .map(|(index, cond)| {
            let root = CHORD_ROOTS[index % CHORD_ROOTS.len()];
            let chords = if cond.has_else {
                vec![
                    Chord { root, quality: ChordQuality::Maj7 },
                    Chord { root, quality: ChordQuality::Min7 },
                    Chord { root, quality: ChordQuality::Sus4 },
                ]
            } else {
                vec![
                    Chord { root, quality: ChordQuality::Min7 },
                    Chord { root, quality: ChordQuality::Maj },
                ]
            };
            let durations = vec![DurationClass::Half; chords.len()];
            Harmony { chords, durations }
        })
        .collect();

    MusicMapping {
        melodies,
        rhythms,
        harmonies,
        has_content,
    }
}

fn step_duration(i: usize) -> DurationClass {
    if i % 4 == 0 {
        DurationClass::Quarter
    } else if i % 2 == 0 {
        DurationClass::Eighth
    } else {
        DurationClass::Sixteenth
    }
}

/// Resolve a chord to its voiced notes. Only root-C chords have real
/// voicings; every other root falls back to the naive `3 / #3 / 4` triad.
pub fn chord_notes(chord: &Chord) -> anyhow::Result<Vec<String>> {
    if !CHORD_ROOTS.contains(&chord.root) {
        bail!("unknown chord root '{}'", chord.root);
    }
    if chord.root == 'C' {
        let notes: &[&str] = match chord.quality {
            ChordQuality::Maj => &["C3", "E3", "G3"],
            ChordQuality::Min => &["C3", "Eb3", "G3"],
            ChordQuality::Maj7 => &["C3", "E3", "G3", "B3"],
            ChordQuality::Min7 => &["C3", "Eb3", "G3", "Bb3"],
            ChordQuality::Sus4 => &["C3", "F3", "G3"],
        };
        return Ok(notes.iter().map(|n| n.to_string()).collect());
    }
    let r = chord.root;
    Ok(vec![format!("{r}3"), format!("{r}#3"), format!("{r}4")])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{ConditionalInfo, FunctionInfo, Language, LoopInfo, VariableInfo};

    fn analysis_with(
        functions: Vec<FunctionInfo>,
        loops: Vec<LoopInfo>,
        conditionals: Vec<ConditionalInfo>,
    ) -> AnalysisResult {
        AnalysisResult {
            complexity: 0.0,
            functions,
            loops,
            conditionals,
            variables: Vec::<VariableInfo>::new(),
            line_count: 1,
            language: Language::JavaScript,
        }
    }

    #[test]
    fn melody_follows_scale_formula() {
        let analysis = analysis_with(
            vec![FunctionInfo {
                name: "foo".into(),
                line_start: 0,
                line_end: 5,
                complexity: 6,
            }],
            vec![],
            vec![],
        );
        let mapping = map_structure(&analysis);
        let melody = &mapping.melodies[0];
        assert_eq!(melody.notes.len(), 6);
        // index 0: (0*2 + j + j/4) % 7 over the diatonic scale
        assert_eq!(melody.notes[..5], ["C4", "D4", "E4", "F4", "A4"]);
        assert_eq!(melody.durations[0], DurationClass::Quarter);
        assert_eq!(melody.durations[1], DurationClass::Sixteenth);
        assert_eq!(melody.durations[2], DurationClass::Eighth);
    }

    #[test]
    fn melody_length_caps_at_sixteen() {
        let analysis = analysis_with(
            vec![FunctionInfo {
                name: "big".into(),
                line_start: 0,
                line_end: 99,
                complexity: 100,
            }],
            vec![],
            vec![],
        );
        assert_eq!(map_structure(&analysis).melodies[0].notes.len(), 16);
    }

    #[test]
    fn rhythm_pattern_from_depth_and_iterations() {
        let analysis = analysis_with(
            vec![],
            vec![LoopInfo {
                kind: LoopKind::For,
                depth: 2,
                iterations: 6,
                line: 1,
            }],
            vec![],
        );
        let rhythm = &map_structure(&analysis).rhythms[0];
        // steps 0,2,4 hit the downbeat; step 3 is the i%3 offbeat
        assert_eq!(
            rhythm.pattern,
            vec![Some("C2"), None, Some("C2"), Some("G2"), Some("C2"), None]
        );
    }

    #[test]
    fn conditional_with_else_gets_three_chords() {
        let analysis = analysis_with(
            vec![],
            vec![],
            vec![
                ConditionalInfo { has_else: true, line: 1 },
                ConditionalInfo { has_else: false, line: 2 },
            ],
        );
        let mapping = map_structure(&analysis);
        assert_eq!(mapping.harmonies[0].chords.len(), 3);
        assert_eq!(mapping.harmonies[0].chords[0].root, 'C');
        assert_eq!(mapping.harmonies[1].chords.len(), 2);
        assert_eq!(mapping.harmonies[1].chords[0].root, 'D');
    }

    #[test]
    fn chord_lookup_and_naive_fallback() {
        let cmin7 = Chord { root: 'C', quality: ChordQuality::Min7 };
        assert_eq!(chord_notes(&cmin7).unwrap(), ["C3", "Eb3", "G3", "Bb3"]);

        // any non-C root skips the table entirely
        let dmaj7 = Chord { root: 'D', quality: ChordQuality::Maj7 };
        assert_eq!(chord_notes(&dmaj7).unwrap(), ["D3", "D#3", "D4"]);

        let bad = Chord { root: 'X', quality: ChordQuality::Maj };
        assert!(chord_notes(&bad).is_err());
    }

    #[test]
    fn empty_analysis_has_no_content() {
        let mapping = map_structure(&analysis_with(vec![], vec![], vec![]));
        assert!(!mapping.has_content);
        assert!(mapping.melodies.is_empty());
    }
}
