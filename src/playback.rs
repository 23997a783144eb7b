// Control-thread side of playback: resolves a sequence into scheduled
// triggers, forwards transport commands, and writes finished captures to
// disk as WAV.

use std::path::Path;
use std::time::Duration;

use anyhow::Context;

use crate::audio::{AudioHandle, CompletedRecording, EngineReport, TransportState};
use crate::audio_api::{AudioCommand, ScheduledEvent, Trigger};
use crate::music::{note_to_freq, CharEventPayload, Sequence, TimedPayload};

// how long a capture waits when the sequence has no finite end
const DEFAULT_RECORD_SECS: f64 = 30.0;
// extra tail so the last note rings out on the recording
const RECORD_TAIL_SECS: f64 = 1.0;

/// Resolve every event down to a frequency-level trigger. Pitch names stop
/// existing past this point; the audio thread only sees numbers.
pub fn build_schedule(sequence: &Sequence) -> Vec<ScheduledEvent> {
    match sequence {
        Sequence::Characters(events) => events
            .iter()
            .map(|ev| ScheduledEvent {
                index: ev.index,
                time: ev.time,
                duration: ev.duration.time_units(),
                trigger: match ev.payload {
                    CharEventPayload::Note { pitch } => Trigger::Lead {
                        freq: note_to_freq(pitch),
                    },
                    CharEventPayload::Percussion { sound } => Trigger::Percussion(sound),
                    CharEventPayload::Special { sound } => Trigger::Special(sound),
                    CharEventPayload::Silence => Trigger::Rest,
                },
            })
            .collect(),
        Sequence::Timed(events) => events
            .iter()
            .enumerate()
            .map(|(index, ev)| ScheduledEvent {
                index,
                time: ev.time,
                duration: ev.duration.time_units(),
                trigger: match &ev.payload {
                    TimedPayload::Melody { pitch } => Trigger::Lead {
                        freq: note_to_freq(pitch),
                    },
                    TimedPayload::Bass { pitch } => Trigger::Bass {
                        freq: note_to_freq(pitch),
                    },
                    TimedPayload::Harmony { pitch } => Trigger::Harmony {
                        freq: note_to_freq(pitch),
                    },
                    TimedPayload::Drum { sound } => Trigger::Drum(*sound),
                },
            })
            .collect(),
    }
}

pub struct PlaybackScheduler {
    audio: AudioHandle,
    sequence: Option<Sequence>,
    capturing: bool,
    last_report: Option<EngineReport>,
}

impl PlaybackScheduler {
    pub fn new(audio: AudioHandle) -> Self {
        Self {
            audio,
            sequence: None,
            capturing: false,
            last_report: None,
        }
    }

    /// Replace the current sequence. The engine tears the old schedule down
    /// and binds the new one; playback does not start until `play`.
    pub fn load(&mut self, sequence: Sequence) {
        self.audio
            .send(AudioCommand::LoadSchedule(build_schedule(&sequence)));
        self.sequence = Some(sequence);
    }

    pub fn play(&mut self) {
        // a stopped engine has dropped its schedule, so rebind first
        if self.state() == TransportState::Stopped {
            if let Some(sequence) = &self.sequence {
                self.audio
                    .send(AudioCommand::LoadSchedule(build_schedule(sequence)));
            }
        }
        self.audio.send(AudioCommand::Play);
    }

    pub fn pause(&self) {
        self.audio.send(AudioCommand::Pause);
    }

    pub fn stop(&self) {
        self.audio.send(AudioCommand::Stop);
    }

    /// Full teardown: schedule, voices and the stored sequence all go.
    pub fn reset(&mut self) {
        self.audio.send(AudioCommand::Reset);
        self.sequence = None;
        self.last_report = None;
    }

    pub fn start_capture(&mut self) {
        self.audio.send(AudioCommand::StartCapture);
        self.capturing = true;
    }

    pub fn stop_capture(&mut self) {
        self.audio.send(AudioCommand::StopCapture);
        self.capturing = false;
    }

    pub fn is_capturing(&self) -> bool {
        self.capturing
    }

    pub fn poll_completed_recording(&self) -> Option<CompletedRecording> {
        self.audio.poll_completed_recording()
    }

    /// Blocking offline-style capture: play the whole sequence once while
    /// capturing, then write the result. Used by the one-shot render path.
    pub fn record_to_file(&mut self, path: &Path) -> anyhow::Result<()> {
        let wait = self
            .sequence
            .as_ref()
            .and_then(Sequence::max_end_time)
            .unwrap_or(DEFAULT_RECORD_SECS)
            + RECORD_TAIL_SECS;

        self.start_capture();
        self.play();
        std::thread::sleep(Duration::from_secs_f64(wait));
        self.stop();
        self.stop_capture();

        let recording = self
            .audio
            .wait_completed_recording(Duration::from_secs(5))
            .context("no recording came back from the audio thread")?;
        write_wav(&recording, path)
    }

    /// Latest engine snapshot; remembers the last one between polls.
    pub fn poll_report(&mut self) -> Option<EngineReport> {
        if let Some(report) = self.audio.poll_report() {
            self.last_report = Some(report);
        }
        self.last_report
    }

    pub fn state(&self) -> TransportState {
        self.last_report
            .map(|r| r.state)
            .unwrap_or(TransportState::Stopped)
    }

    pub fn current_index(&self) -> i64 {
        self.last_report.map(|r| r.current_index).unwrap_or(-1)
    }

    pub fn sequence(&self) -> Option<&Sequence> {
        self.sequence.as_ref()
    }

    pub fn event_count(&self) -> usize {
        self.sequence.as_ref().map(Sequence::len).unwrap_or(0)
    }
}

/// 16-bit stereo WAV at the engine's sample rate.
pub fn write_wav(recording: &CompletedRecording, path: &Path) -> anyhow::Result<()> {
    let spec = hound::WavSpec {
        channels: 2,
        sample_rate: recording.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec)
        .with_context(|| format!("creating {}", path.display()))?;
    for frame in &recording.frames {
        writer.write_sample((frame.left.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)?;
        writer.write_sample((frame.right.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)?;
    }
    writer.finalize().context("finalizing wav")?;
    Ok(())
}
