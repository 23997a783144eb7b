mod analysis;
mod audio;
mod audio_api;
mod live;
mod music;
mod persistence;
mod playback;
mod shared;
mod tui;

use std::path::PathBuf;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crossterm::terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;

use live::LiveInputDriver;
use music::{create_character_sequence, map_structure, sequence_structure, LineBreakSound, Sequence};
use playback::PlaybackScheduler;
use shared::{DisplayState, InputEvent, Mode};

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    env_logger::init();

    let audio = audio::start_audio()?;
    let live = LiveInputDriver::new(audio.command_sender());
    let scheduler = PlaybackScheduler::new(audio);

    let base_dir = std::env::current_dir().unwrap_or_default();
    let mut app = App::new(scheduler, live, base_dir);

    // initial line-break sound; unknown names keep the default
    if let Ok(name) = std::env::var("CODETONE_BREAK") {
        match LineBreakSound::parse(&name) {
            Some(sound) => app.set_line_break(sound),
            None => log::warn!("unknown line-break sound {name:?}, keeping default"),
        }
    }

    let args: Vec<String> = std::env::args().skip(1).collect();

    // `codetone <file> --render <out.wav>` renders once, no TUI
    if let Some(pos) = args.iter().position(|a| a == "--render") {
        let source = args
            .first()
            .filter(|_| pos != 0)
            .ok_or_else(|| anyhow::anyhow!("--render needs a source file argument"))?;
        let out = args
            .get(pos + 1)
            .ok_or_else(|| anyhow::anyhow!("--render needs an output path"))?;
        app.code = std::fs::read_to_string(source)?;
        app.generate_structural();
        return app.scheduler.record_to_file(std::path::Path::new(out));
    }

    // optional source file to start from
    if let Some(path) = args.first().map(PathBuf::from) {
        app.code = std::fs::read_to_string(&path)?;
    }

    terminal::enable_raw_mode()?;
    let _guard = RawModeGuard; // auto drops when out of scope

    let backend = CrosstermBackend::new(std::io::stdout());
    let mut term = Terminal::new(backend)?;
    term.clear()?;

    let tick_rate = Duration::from_millis(16); // ~60fps

    loop {
        let ds = app.display_state();
        term.draw(|frame| {
            tui::view::render(frame, frame.area(), &ds);
        })?;

        let events = tui::input::poll_input(tick_rate)?;
        for event in events {
            if event == InputEvent::Quit {
                drop(term);
                return Ok(());
            }
            app.handle_input(event);
        }

        app.tick();
    }
}

struct App {
    scheduler: PlaybackScheduler,
    live: LiveInputDriver,
    base_dir: PathBuf,
    code: String,
    mode: Mode,
    line_break: LineBreakSound,
    language: &'static str,
    complexity: f64,
    message: String,
}

impl App {
    fn new(scheduler: PlaybackScheduler, live: LiveInputDriver, base_dir: PathBuf) -> Self {
        Self {
            scheduler,
            live,
            base_dir,
            code: String::new(),
            mode: Mode::default(),
            line_break: LineBreakSound::default(),
            language: "javascript",
            complexity: 0.0,
            message: String::new(),
        }
    }

    fn handle_input(&mut self, event: InputEvent) {
        match event {
            InputEvent::Char(c) => {
                self.code.push(c);
                self.live.play_character(c);
            }
            InputEvent::Enter => {
                self.code.push('\n');
                self.live.play_character('\n');
            }
            InputEvent::Backspace => {
                self.code.pop();
            }

            InputEvent::Generate => self.generate_structural(),
            InputEvent::GenerateChars => self.generate_characters(),

            InputEvent::Play => self.scheduler.play(),
            InputEvent::Pause => self.scheduler.pause(),
            InputEvent::Stop => self.scheduler.stop(),
            InputEvent::Reset => {
                self.scheduler.reset();
                self.complexity = 0.0;
                self.message = "reset".to_string();
            }

            InputEvent::Record => self.toggle_record(),
            InputEvent::ToggleLive => {
                if self.live.is_active() {
                    self.live.stop();
                    self.message = "live off".to_string();
                } else {
                    self.live.start();
                    self.message = "live on: type to play".to_string();
                }
            }
            InputEvent::CycleLineBreak => {
                self.set_line_break(self.line_break.next());
                self.message = format!("line break: {}", self.line_break.label());
            }
            InputEvent::Save => self.save(),
            InputEvent::Export => self.export(),

            InputEvent::Quit => {}
        }
    }

    fn set_line_break(&mut self, sound: LineBreakSound) {
        self.line_break = sound;
        self.live.set_line_break(sound);
    }

    fn generate_structural(&mut self) {
        let result = analysis::analyze(&self.code);
        self.language = result.language.name();
        self.complexity = result.complexity;

        let mapping = map_structure(&result);
        let events = sequence_structure(&mapping);
        self.scheduler.load(Sequence::Timed(events));
        self.mode = Mode::Structural;
        self.message = format!("generated {} events", self.scheduler.event_count());
    }

    fn generate_characters(&mut self) {
        let events = create_character_sequence(&self.code, self.line_break);
        self.scheduler.load(Sequence::Characters(events));
        self.mode = Mode::Characters;
        self.message = format!("generated {} events", self.scheduler.event_count());
    }

    fn toggle_record(&mut self) {
        if self.scheduler.is_capturing() {
            self.scheduler.stop_capture();
            self.message = "finishing recording".to_string();
        } else {
            self.scheduler.start_capture();
            self.message = "recording".to_string();
        }
    }

    fn save(&mut self) {
        let date = epoch_secs();
        match persistence::save_composition(&self.base_dir, "untitled", &self.code, &date) {
            Ok(receipt) => self.message = format!("saved composition {}", receipt.id),
            Err(e) => self.message = format!("save failed: {e:#}"),
        }
    }

    fn export(&mut self) {
        let Some(sequence) = self.scheduler.sequence() else {
            self.message = "nothing to export, generate first".to_string();
            return;
        };
        match persistence::export_sequence(&self.base_dir, sequence) {
            Ok(path) => self.message = format!("exported {}", path.display()),
            Err(e) => self.message = format!("export failed: {e:#}"),
        }
    }

    // drain engine feedback once per frame
    fn tick(&mut self) {
        self.scheduler.poll_report();

        if let Some(recording) = self.scheduler.poll_completed_recording() {
            let path = self.base_dir.join(format!("codetone-{}.wav", epoch_secs()));
            match playback::write_wav(&recording, &path) {
                Ok(()) => self.message = format!("wrote {}", path.display()),
                Err(e) => self.message = format!("recording failed: {e:#}"),
            }
        }
    }

    fn display_state(&mut self) -> DisplayState {
        DisplayState {
            code: self.code.clone(),
            transport: self.scheduler.state(),
            mode: self.mode,
            line_break: self.line_break,
            language: self.language,
            complexity: self.complexity,
            event_count: self.scheduler.event_count(),
            current_index: self.scheduler.current_index(),
            live_active: self.live.is_active(),
            capturing: self.scheduler.is_capturing(),
            message: self.message.clone(),
        }
    }
}

fn epoch_secs() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_default()
}

struct RawModeGuard;
impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}
