// Types shared between the control layer and the TUI. The TUI only ever
// renders a DisplayState and emits InputEvents; all state lives above it.

use crate::audio::TransportState;
use crate::music::LineBreakSound;

/// Which kind of sequence the next generation produces.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Mode {
    #[default]
    Structural,
    Characters,
}

impl Mode {
    pub fn label(self) -> &'static str {
        match self {
            Mode::Structural => "structural",
            Mode::Characters => "characters",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum InputEvent {
    // editing
    Char(char),
    Backspace,
    Enter,

    // generation
    Generate,
    GenerateChars,

    // transport
    Play,
    Pause,
    Stop,
    Reset,

    // capture / live / config
    Record,
    ToggleLive,
    CycleLineBreak,
    Save,
    Export,

    Quit,
}

/// Everything the TUI needs to draw one frame.
#[derive(Clone, Debug)]
pub struct DisplayState {
    pub code: String,
    pub transport: TransportState,
    pub mode: Mode,
    pub line_break: LineBreakSound,
    pub language: &'static str,
    pub complexity: f64,
    pub event_count: usize,
    /// Index of the sounding event, -1 outside playback.
    pub current_index: i64,
    pub live_active: bool,
    pub capturing: bool,
    pub message: String,
}

impl Default for DisplayState {
    fn default() -> Self {
        Self {
            code: String::new(),
            transport: TransportState::Stopped,
            mode: Mode::default(),
            line_break: LineBreakSound::default(),
            language: "javascript",
            complexity: 0.0,
            event_count: 0,
            current_index: -1,
            live_active: false,
            capturing: false,
            message: String::new(),
        }
    }
}
