// The only types that cross into the audio thread. The render engine can't
// touch sequences or analysis state; control code resolves everything down
// to triggers first and sends them over the command channel.

use crate::music::{DrumSound, LineBreakSound, PercSound};

/// One resolved voice trigger.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Trigger {
    Lead { freq: f32 },
    Bass { freq: f32 },
    Harmony { freq: f32 },
    Drum(DrumSound),
    Percussion(PercSound),
    Special(LineBreakSound),
    /// Occupies its time slot (and moves the playhead marker) silently.
    Rest,
}

/// A trigger bound to a transport time. `index` is the position of the
/// source event, fed back to the UI as the playhead marker.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScheduledEvent {
    pub index: usize,
    /// Transport time in time-units (seconds at the fixed tempo).
    pub time: f64,
    /// Sounding length in time-units.
    pub duration: f64,
    pub trigger: Trigger,
}

#[derive(Clone, Debug)]
pub enum AudioCommand {
    /// Replace the whole schedule: full teardown of the previous one, a
    /// fresh voice pool, and every event bound exactly once.
    LoadSchedule(Vec<ScheduledEvent>),
    Play,
    Pause,
    Stop,
    Reset,
    StartCapture,
    StopCapture,
    /// Create the persistent live-typing voice pool.
    LiveInit,
    /// Fire one trigger immediately, off the transport clock.
    LiveTrigger { trigger: Trigger, duration: f64 },
    /// Dispose the live-typing pool.
    LiveStop,
}
