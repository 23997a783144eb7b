use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};

use crate::shared::InputEvent;

// poll for input and map keys to semantic events; plain keys edit the code
// buffer, ctrl combos drive generation and the transport
pub fn poll_input(timeout: Duration) -> anyhow::Result<Vec<InputEvent>> {
    if !event::poll(timeout)? {
        return Ok(vec![]);
    }

    if let Event::Key(key) = event::read()? {
        if key.kind != KeyEventKind::Press {
            return Ok(vec![]);
        }
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            return Ok(handle_ctrl(key.code));
        }
        return Ok(handle_key(key.code));
    }
    Ok(vec![])
}

fn handle_ctrl(code: KeyCode) -> Vec<InputEvent> {
    match code {
        KeyCode::Char('g') => vec![InputEvent::Generate],
        KeyCode::Char('b') => vec![InputEvent::GenerateChars],
        KeyCode::Char('p') => vec![InputEvent::Play],
        KeyCode::Char('o') => vec![InputEvent::Pause],
        KeyCode::Char('t') => vec![InputEvent::Stop],
        KeyCode::Char('r') => vec![InputEvent::Reset],
        KeyCode::Char('w') => vec![InputEvent::Record],
        KeyCode::Char('l') => vec![InputEvent::ToggleLive],
        KeyCode::Char('n') => vec![InputEvent::CycleLineBreak],
        KeyCode::Char('s') => vec![InputEvent::Save],
        KeyCode::Char('e') => vec![InputEvent::Export],
        KeyCode::Char('c') => vec![InputEvent::Quit],
        _ => vec![],
    }
}

fn handle_key(code: KeyCode) -> Vec<InputEvent> {
    match code {
        KeyCode::Esc => vec![InputEvent::Quit],
        KeyCode::Enter => vec![InputEvent::Enter],
        KeyCode::Backspace => vec![InputEvent::Backspace],
        KeyCode::Tab => vec![
            InputEvent::Char(' '),
            InputEvent::Char(' '),
        ],
        KeyCode::Char(c) => vec![InputEvent::Char(c)],
        _ => vec![],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ctrl_keys_map_to_commands() {
        assert_eq!(handle_ctrl(KeyCode::Char('g')), vec![InputEvent::Generate]);
        assert_eq!(handle_ctrl(KeyCode::Char('p')), vec![InputEvent::Play]);
        assert_eq!(handle_ctrl(KeyCode::Char('z')), vec![]);
    }

    #[test]
    fn plain_keys_edit_the_buffer() {
        assert_eq!(handle_key(KeyCode::Char('x')), vec![InputEvent::Char('x')]);
        assert_eq!(handle_key(KeyCode::Enter), vec![InputEvent::Enter]);
        assert_eq!(handle_key(KeyCode::Esc), vec![InputEvent::Quit]);
        assert_eq!(handle_key(KeyCode::Tab).len(), 2);
    }
}
