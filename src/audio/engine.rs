// Render-side state machine. Runs inside the output callback: drains
// commands, fires schedule events as the transport crosses them, and mixes
// the scheduled and live voice pools into the block.

use crossbeam_channel::Sender;

use crate::audio_api::{AudioCommand, ScheduledEvent, Trigger};
use crate::music::{note_to_freq, DrumSound, LineBreakSound, PercSound};

use super::transport::{Transport, TransportState};
use super::voice::{Timbre, VoicePool};
use super::StereoFrame;

/// Finished capture, shipped back to the control thread for writing.
pub struct CompletedRecording {
    pub frames: Vec<StereoFrame>,
    pub sample_rate: u32,
}

/// Periodic snapshot for the UI. `current_index` is -1 outside playback.
#[derive(Clone, Copy, Debug)]
pub struct EngineReport {
    pub state: TransportState,
    pub position: f64,
    pub current_index: i64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Which {
    Scheduled,
    Live,
}

// What a delayed sub-trigger fires. Bells get their own arm so compound
// specials land on the dedicated bell voices instead of the lead slots.
#[derive(Clone, Copy, Debug)]
enum DelayedHit {
    Trigger(Trigger),
    Bell { freq: f32 },
}

// A delayed sub-trigger of a compound special sound.
struct Pending {
    which: Which,
    delay: f64,
    hit: DelayedHit,
    duration: f64,
}

pub struct Engine {
    sample_rate: f32,
    transport: Transport,
    voices: Option<VoicePool>,
    live_voices: Option<VoicePool>,
    schedule: Vec<ScheduledEvent>,
    next_event: usize,
    pending: Vec<Pending>,
    capture: Option<Vec<StereoFrame>>,
    completed_tx: Option<Sender<CompletedRecording>>,
    report_tx: Option<Sender<EngineReport>>,
    current_index: i64,
}

impl Engine {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate: sample_rate as f32,
            transport: Transport::new(),
            voices: None,
            live_voices: None,
            schedule: Vec::new(),
            next_event: 0,
            pending: Vec::new(),
            capture: None,
            completed_tx: None,
            report_tx: None,
            current_index: -1,
        }
    }

    pub fn set_completed_tx(&mut self, tx: Sender<CompletedRecording>) {
        self.completed_tx = Some(tx);
    }

    pub fn set_report_tx(&mut self, tx: Sender<EngineReport>) {
        self.report_tx = Some(tx);
    }

    pub fn handle_cmd(&mut self, cmd: AudioCommand) {
        match cmd {
            AudioCommand::LoadSchedule(events) => self.load_schedule(events),
            AudioCommand::Play => self.play(),
            AudioCommand::Pause => self.transport.pause(),
            AudioCommand::Stop => self.stop(),
            AudioCommand::Reset => self.reset(),
            AudioCommand::StartCapture => self.start_capture(),
            AudioCommand::StopCapture => self.stop_capture(),
            AudioCommand::LiveInit => {
                if self.live_voices.is_none() {
                    self.live_voices = Some(VoicePool::new(self.sample_rate));
                }
            }
            AudioCommand::LiveTrigger { trigger, duration } => {
                if self.live_voices.is_some() {
                    self.fire(Which::Live, trigger, duration);
                }
            }
            AudioCommand::LiveStop => {
                self.live_voices = None;
                self.pending.retain(|p| p.which != Which::Live);
            }
        }
    }

    /// Full teardown of the previous schedule, then a fresh pool with the
    /// new events bound. Loading twice never grows the voice count.
    fn load_schedule(&mut self, events: Vec<ScheduledEvent>) {
        self.transport.stop();
        self.pending.retain(|p| p.which != Which::Scheduled);
        self.voices = Some(VoicePool::new(self.sample_rate));
        self.schedule = events;
        self.next_event = 0;
        self.current_index = -1;
    }

    fn play(&mut self) {
        match self.transport.state {
            // already running: start over from the top
            TransportState::Started | TransportState::Stopped => {
                self.transport.restart();
                self.next_event = 0;
                self.current_index = -1;
            }
            TransportState::Paused => self.transport.start(),
        }
    }

    /// Stop drops the schedule but keeps the pool so tails ring out.
    fn stop(&mut self) {
        self.transport.stop();
        self.pending.retain(|p| p.which != Which::Scheduled);
        self.schedule.clear();
        self.next_event = 0;
        self.current_index = -1;
    }

    /// Reset additionally disposes the scheduled pool.
    fn reset(&mut self) {
        self.stop();
        self.voices = None;
    }

    fn start_capture(&mut self) {
        if self.capture.is_some() {
            log::warn!("capture already running, keeping the current one");
            return;
        }
        self.capture = Some(Vec::new());
    }

    fn stop_capture(&mut self) {
        let Some(frames) = self.capture.take() else {
            return;
        };
        if let Some(tx) = &self.completed_tx {
            let _ = tx.try_send(CompletedRecording {
                frames,
                sample_rate: self.sample_rate as u32,
            });
        }
    }

    pub fn render_block(&mut self, out: &mut [StereoFrame]) {
        for frame in out.iter_mut() {
            *frame = StereoFrame::default();
        }
        let block_dur = out.len() as f64 / self.sample_rate as f64;

        if self.transport.state == TransportState::Started {
            let horizon = self.transport.position + block_dur;
            while self.next_event < self.schedule.len()
                && self.schedule[self.next_event].time < horizon
            {
                let ev = self.schedule[self.next_event];
                self.current_index = ev.index as i64;
                self.fire(Which::Scheduled, ev.trigger, ev.duration);
                self.next_event += 1;
            }
        }

        // delayed sub-triggers run on the wall clock, not the transport
        let mut due = Vec::new();
        for p in self.pending.iter_mut() {
            p.delay -= block_dur;
            if p.delay <= 0.0 {
                due.push((p.which, p.hit, p.duration));
            }
        }
        self.pending.retain(|p| p.delay > 0.0);
        for (which, hit, duration) in due {
            self.dispatch_hit(which, hit, duration);
        }

        self.transport.advance(block_dur);

        if let Some(pool) = self.voices.as_mut() {
            pool.render(out);
        }
        if let Some(pool) = self.live_voices.as_mut() {
            pool.render(out);
        }

        if let Some(capture) = self.capture.as_mut() {
            capture.extend_from_slice(out);
        }

        if let Some(tx) = &self.report_tx {
            let current_index = if self.transport.state == TransportState::Started {
                self.current_index
            } else {
                -1
            };
            let _ = tx.try_send(EngineReport {
                state: self.transport.state,
                position: self.transport.position,
                current_index,
            });
        }
    }

    fn fire(&mut self, which: Which, trigger: Trigger, duration: f64) {
        match trigger {
            Trigger::Special(sound) => self.fire_special(which, sound, duration),
            other => self.dispatch_hit(which, DelayedHit::Trigger(other), duration),
        }
    }

    fn dispatch_hit(&mut self, which: Which, hit: DelayedHit, duration: f64) {
        let pool = match which {
            Which::Scheduled => self.voices.as_mut(),
            Which::Live => self.live_voices.as_mut(),
        };
        let Some(pool) = pool else {
            return;
        };
        match hit {
            DelayedHit::Bell { freq } => pool.trigger_bell(freq, duration),
            DelayedHit::Trigger(trigger) => match trigger {
                Trigger::Lead { freq } => pool.trigger_lead(freq, duration),
                Trigger::Bass { freq } => pool.trigger_bass(freq, duration),
                Trigger::Harmony { freq } => pool.trigger_harmony(freq, duration),
                Trigger::Drum(DrumSound::Kick) => pool.trigger_kick(duration),
                Trigger::Drum(DrumSound::Snare) => pool.trigger_snare(duration),
                Trigger::Drum(DrumSound::Hihat) => pool.trigger_hihat(duration),
                Trigger::Percussion(sound) => dispatch_percussion(pool, sound, duration),
                Trigger::Special(_) | Trigger::Rest => {}
            },
        }
    }

    // Compound specials split into an immediate hit plus delayed sub-triggers.
    fn fire_special(&mut self, which: Which, sound: LineBreakSound, duration: f64) {
        let lead = |name: &str| {
            DelayedHit::Trigger(Trigger::Lead {
                freq: note_to_freq(name),
            })
        };
        let bell = |name: &str| DelayedHit::Bell {
            freq: note_to_freq(name),
        };
        match sound {
            LineBreakSound::Gong => self.dispatch_pool(which, |p| p.trigger_gong(duration)),
            LineBreakSound::Crash => self.dispatch_pool(which, |p| {
                p.spawn_transient(Timbre::Metal, 900.0, 0.25, duration, 2.0)
            }),
            LineBreakSound::Bell => {
                for (i, name) in ["C5", "E5", "G5"].iter().enumerate() {
                    self.after(which, i as f64 * 0.05, bell(name), duration);
                }
            }
            LineBreakSound::Windchime => {
                self.dispatch_pool(which, |p| p.trigger_chime(duration));
                for (i, name) in ["E5", "G5", "B5"].iter().enumerate() {
                    self.after(which, (i + 1) as f64 * 0.1, bell(name), 0.5);
                }
            }
            LineBreakSound::Harp => {
                // upward gliss through the scale
                for (i, name) in ["C4", "D4", "E4", "F4", "G4", "A4", "B4"].iter().enumerate() {
                    self.after(which, i as f64 * 0.05, lead(name), 0.5);
                }
            }
            LineBreakSound::Bird => {
                for (i, name) in ["G6", "E6", "C6", "G6"].iter().enumerate() {
                    self.after(which, i as f64 * 0.1, lead(name), 0.25);
                }
            }
            LineBreakSound::Thunder => {
                self.dispatch_pool(which, |p| p.trigger_kick(duration.max(1.0)));
                self.after(
                    which,
                    0.05,
                    DelayedHit::Trigger(Trigger::Drum(DrumSound::Snare)),
                    duration.max(1.0),
                );
            }
            LineBreakSound::Reverse => self.dispatch_pool(which, |p| {
                p.spawn_transient(Timbre::Metal, 500.0, 0.18, duration.max(1.5), 2.0)
            }),
            LineBreakSound::Whoosh => self.dispatch_pool(which, |p| {
                p.spawn_transient(Timbre::Noise, 0.0, 0.18, duration, 1.0)
            }),
            LineBreakSound::Wave => self.dispatch_pool(which, |p| {
                p.spawn_transient(Timbre::Noise, 0.0, 0.12, duration.max(2.0), 3.0)
            }),
        }
    }

    fn dispatch_pool(&mut self, which: Which, f: impl FnOnce(&mut VoicePool)) {
        let pool = match which {
            Which::Scheduled => self.voices.as_mut(),
            Which::Live => self.live_voices.as_mut(),
        };
        if let Some(pool) = pool {
            f(pool);
        }
    }

    fn after(&mut self, which: Which, delay: f64, hit: DelayedHit, duration: f64) {
        if delay <= 0.0 {
            self.dispatch_hit(which, hit, duration);
        } else {
            self.pending.push(Pending {
                which,
                delay,
                hit,
                duration,
            });
        }
    }

    pub fn voice_count(&self) -> usize {
        self.voices.as_ref().map(VoicePool::voice_count).unwrap_or(0)
    }

    pub fn live_voice_count(&self) -> usize {
        self.live_voices
            .as_ref()
            .map(VoicePool::voice_count)
            .unwrap_or(0)
    }

    pub fn scheduled_len(&self) -> usize {
        self.schedule.len()
    }

    pub fn transport_state(&self) -> TransportState {
        self.transport.state
    }

    pub fn position(&self) -> f64 {
        self.transport.position
    }
}

fn dispatch_percussion(pool: &mut VoicePool, sound: PercSound, duration: f64) {
    match sound {
        PercSound::Kick => pool.trigger_kick(duration),
        PercSound::Snare | PercSound::Clap => pool.trigger_snare(duration),
        PercSound::Hihat | PercSound::OpenHat | PercSound::CloseHat | PercSound::Ride => {
            pool.trigger_hihat(duration)
        }
        PercSound::Tom | PercSound::Conga => pool.trigger_tom(160.0, duration),
        PercSound::Crash | PercSound::Splash | PercSound::China => {
            pool.spawn_transient(Timbre::Metal, 900.0, 0.2, duration.max(1.0), 2.0)
        }
        PercSound::Bell | PercSound::Cowbell => pool.trigger_bell(note_to_freq("A5"), duration),
        PercSound::Accent | PercSound::Coin => pool.trigger_bell(note_to_freq("E6"), duration),
        PercSound::Triangle | PercSound::Tambourine => pool.trigger_chime(duration),
        PercSound::Woodblock => pool.trigger_tom(440.0, duration),
        PercSound::Shaker => pool.spawn_transient(Timbre::Noise, 0.0, 0.1, duration, 1.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio_api::{AudioCommand, ScheduledEvent, Trigger};

    const SR: u32 = 44100;

    fn event(index: usize, time: f64, trigger: Trigger) -> ScheduledEvent {
        ScheduledEvent {
            index,
            time,
            duration: 0.25,
            trigger,
        }
    }

    fn lead(freq: f32) -> Trigger {
        Trigger::Lead { freq }
    }

    #[test]
    fn reloading_a_schedule_never_grows_the_pool() {
        let mut engine = Engine::new(SR);
        engine.handle_cmd(AudioCommand::LoadSchedule(vec![event(0, 0.0, lead(440.0))]));
        let first = engine.voice_count();
        for _ in 0..5 {
            engine.handle_cmd(AudioCommand::LoadSchedule(vec![
                event(0, 0.0, lead(440.0)),
                event(1, 0.5, lead(660.0)),
            ]));
        }
        assert_eq!(engine.voice_count(), first);
    }

    #[test]
    fn events_fire_as_the_transport_crosses_them() {
        let mut engine = Engine::new(SR);
        let (tx, rx) = crossbeam_channel::bounded(64);
        engine.set_report_tx(tx);

        engine.handle_cmd(AudioCommand::LoadSchedule(vec![
            event(0, 0.0, lead(440.0)),
            event(7, 0.01, lead(550.0)),
        ]));
        engine.handle_cmd(AudioCommand::Play);

        let mut block = vec![StereoFrame::default(); 2048];
        engine.render_block(&mut block);

        assert!(block.iter().any(|f| f.left.abs() > 0.0));
        let report = rx.try_recv().ok();
        assert!(report.is_some());
        let report = report.unwrap();
        assert_eq!(report.state, TransportState::Started);
        assert_eq!(report.current_index, 7);
    }

    #[test]
    fn play_restarts_when_already_started() {
        let mut engine = Engine::new(SR);
        engine.handle_cmd(AudioCommand::LoadSchedule(vec![event(0, 0.0, lead(440.0))]));
        engine.handle_cmd(AudioCommand::Play);
        let mut block = vec![StereoFrame::default(); 4096];
        engine.render_block(&mut block);
        assert!(engine.position() > 0.0);

        engine.handle_cmd(AudioCommand::Play);
        assert_eq!(engine.position(), 0.0);
        assert_eq!(engine.transport_state(), TransportState::Started);
    }

    #[test]
    fn pause_then_play_resumes_in_place() {
        let mut engine = Engine::new(SR);
        engine.handle_cmd(AudioCommand::LoadSchedule(vec![event(0, 0.0, lead(440.0))]));
        engine.handle_cmd(AudioCommand::Play);
        let mut block = vec![StereoFrame::default(); 4096];
        engine.render_block(&mut block);
        let pos = engine.position();

        engine.handle_cmd(AudioCommand::Pause);
        engine.render_block(&mut block);
        assert_eq!(engine.position(), pos);

        engine.handle_cmd(AudioCommand::Play);
        assert_eq!(engine.transport_state(), TransportState::Started);
        assert_eq!(engine.position(), pos);
    }

    #[test]
    fn stop_clears_the_schedule_but_keeps_the_pool() {
        let mut engine = Engine::new(SR);
        engine.handle_cmd(AudioCommand::LoadSchedule(vec![event(0, 0.0, lead(440.0))]));
        engine.handle_cmd(AudioCommand::Play);
        engine.handle_cmd(AudioCommand::Stop);
        assert_eq!(engine.scheduled_len(), 0);
        assert!(engine.voice_count() > 0);
        assert_eq!(engine.transport_state(), TransportState::Stopped);
    }

    #[test]
    fn reset_disposes_the_pool() {
        let mut engine = Engine::new(SR);
        engine.handle_cmd(AudioCommand::LoadSchedule(vec![event(0, 0.0, lead(440.0))]));
        engine.handle_cmd(AudioCommand::Reset);
        assert_eq!(engine.voice_count(), 0);
        assert_eq!(engine.scheduled_len(), 0);
    }

    #[test]
    fn capture_round_trip() {
        let mut engine = Engine::new(SR);
        let (tx, rx) = crossbeam_channel::bounded(4);
        engine.set_completed_tx(tx);

        engine.handle_cmd(AudioCommand::StartCapture);
        let mut block = vec![StereoFrame::default(); 512];
        engine.render_block(&mut block);
        engine.render_block(&mut block);
        engine.handle_cmd(AudioCommand::StopCapture);

        let recording = rx.try_recv().ok();
        assert!(recording.is_some());
        let recording = recording.unwrap();
        assert_eq!(recording.frames.len(), 1024);
        assert_eq!(recording.sample_rate, SR);
    }

    #[test]
    fn duplicate_capture_start_keeps_the_first() {
        let mut engine = Engine::new(SR);
        let (tx, rx) = crossbeam_channel::bounded(4);
        engine.set_completed_tx(tx);

        engine.handle_cmd(AudioCommand::StartCapture);
        let mut block = vec![StereoFrame::default(); 256];
        engine.render_block(&mut block);
        engine.handle_cmd(AudioCommand::StartCapture); // ignored
        engine.render_block(&mut block);
        engine.handle_cmd(AudioCommand::StopCapture);

        let recording = rx.try_recv().ok();
        assert!(recording.is_some());
        assert_eq!(recording.unwrap().frames.len(), 512);
    }

    #[test]
    fn live_pool_lifecycle() {
        let mut engine = Engine::new(SR);
        assert_eq!(engine.live_voice_count(), 0);

        // triggers before init are dropped
        engine.handle_cmd(AudioCommand::LiveTrigger {
            trigger: lead(440.0),
            duration: 0.25,
        });
        assert_eq!(engine.live_voice_count(), 0);

        engine.handle_cmd(AudioCommand::LiveInit);
        let base = engine.live_voice_count();
        assert!(base > 0);

        engine.handle_cmd(AudioCommand::LiveTrigger {
            trigger: lead(440.0),
            duration: 0.25,
        });
        let mut block = vec![StereoFrame::default(); 256];
        engine.render_block(&mut block);
        assert!(block.iter().any(|f| f.left.abs() > 0.0));

        engine.handle_cmd(AudioCommand::LiveStop);
        assert_eq!(engine.live_voice_count(), 0);
    }

    #[test]
    fn compound_special_schedules_delayed_hits() {
        let mut engine = Engine::new(SR);
        engine.handle_cmd(AudioCommand::LoadSchedule(vec![event(
            0,
            0.0,
            Trigger::Special(LineBreakSound::Windchime),
        )]));
        engine.handle_cmd(AudioCommand::Play);

        // first block fires the chime and queues the bells
        let mut block = vec![StereoFrame::default(); 2048];
        engine.render_block(&mut block);
        assert!(block.iter().any(|f| f.left.abs() > 0.0));

        // a paused transport still ticks pending sub-triggers
        engine.handle_cmd(AudioCommand::Pause);
        for _ in 0..10 {
            engine.render_block(&mut block);
        }
        assert!(block.iter().any(|f| f.left.abs() > 0.0));
    }

    #[test]
    fn rests_move_the_playhead_silently() {
        let mut engine = Engine::new(SR);
        let (tx, rx) = crossbeam_channel::bounded(64);
        engine.set_report_tx(tx);
        engine.handle_cmd(AudioCommand::LoadSchedule(vec![event(3, 0.0, Trigger::Rest)]));
        engine.handle_cmd(AudioCommand::Play);

        let mut block = vec![StereoFrame::default(); 1024];
        engine.render_block(&mut block);
        assert!(block.iter().all(|f| f.left == 0.0 && f.right == 0.0));
        let report = rx.try_recv();
        assert!(report.is_ok());
        assert_eq!(report.unwrap().current_index, 3);
    }
}
