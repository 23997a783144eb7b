// The transport clock. One per engine, tempo fixed at 120 bpm; position is
// measured in time-units (seconds at that tempo).

pub const FIXED_BPM: f32 = 120.0;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TransportState {
    #[default]
    Stopped,
    Paused,
    Started,
}

#[derive(Clone, Copy, Debug)]
pub struct Transport {
    pub state: TransportState,
    pub bpm: f32,
    pub position: f64,
}

impl Transport {
    pub fn new() -> Self {
        Self {
            state: TransportState::Stopped,
            bpm: FIXED_BPM,
            position: 0.0,
        }
    }

    /// Start or resume from the current position.
    pub fn start(&mut self) {
        self.state = TransportState::Started;
    }

    /// Start over from zero.
    pub fn restart(&mut self) {
        self.position = 0.0;
        self.state = TransportState::Started;
    }

    pub fn pause(&mut self) {
        if self.state == TransportState::Started {
            self.state = TransportState::Paused;
        }
    }

    /// Stop always lands at position zero.
    pub fn stop(&mut self) {
        self.state = TransportState::Stopped;
        self.position = 0.0;
    }

    pub fn advance(&mut self, dt: f64) {
        if self.state == TransportState::Started {
            self.position += dt;
        }
    }
}

impl Default for Transport {
    fn default() -> Self {
        Self::new()
    }
}
