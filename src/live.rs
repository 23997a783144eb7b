// Live typing: every keystroke fires immediately through the dedicated
// live voice pool, independent of the transport and any loaded schedule.

use crossbeam_channel::Sender;

use crate::audio_api::{AudioCommand, Trigger};
use crate::music::{note_to_freq, resolve_char, CharEventPayload, LineBreakSound};

pub struct LiveInputDriver {
    tx: Sender<AudioCommand>,
    line_break: LineBreakSound,
    active: bool,
}

impl LiveInputDriver {
    pub fn new(tx: Sender<AudioCommand>) -> Self {
        Self {
            tx,
            line_break: LineBreakSound::default(),
            active: false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn set_line_break(&mut self, sound: LineBreakSound) {
        self.line_break = sound;
    }

    /// Create the live pool. Idempotent on the engine side.
    pub fn start(&mut self) {
        let _ = self.tx.try_send(AudioCommand::LiveInit);
        self.active = true;
    }

    /// Dispose the live pool and everything still pending in it.
    pub fn stop(&mut self) {
        let _ = self.tx.try_send(AudioCommand::LiveStop);
        self.active = false;
    }

    /// Sound the character the user just typed. Spaces stay silent; line
    /// breaks play the configured special sound.
    pub fn play_character(&self, c: char) {
        if !self.active {
            return;
        }
        let (payload, duration) = resolve_char(c, self.line_break);
        let trigger = match payload {
            CharEventPayload::Note { pitch } => Trigger::Lead {
                freq: note_to_freq(pitch),
            },
            CharEventPayload::Percussion { sound } => Trigger::Percussion(sound),
            CharEventPayload::Special { sound } => Trigger::Special(sound),
            CharEventPayload::Silence => return,
        };
        let _ = self.tx.try_send(AudioCommand::LiveTrigger {
            trigger,
            duration: duration.time_units(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::music::PercSound;

    fn driver() -> (LiveInputDriver, crossbeam_channel::Receiver<AudioCommand>) {
        let (tx, rx) = crossbeam_channel::bounded(64);
        (LiveInputDriver::new(tx), rx)
    }

    #[test]
    fn start_inits_the_live_pool() {
        let (mut driver, rx) = driver();
        driver.start();
        assert!(matches!(rx.try_recv(), Ok(AudioCommand::LiveInit)));
        assert!(driver.is_active());
    }

    #[test]
    fn characters_become_immediate_triggers() {
        let (mut driver, rx) = driver();
        driver.start();
        let _ = rx.try_recv();

        driver.play_character('a');
        match rx.try_recv() {
            Ok(AudioCommand::LiveTrigger { trigger, duration }) => {
                assert!(matches!(trigger, Trigger::Lead { freq } if (freq - 261.63).abs() < 0.1));
                assert_eq!(duration, 0.125);
            }
            other => panic!("expected a live trigger, got {other:?}"),
        }

        driver.play_character('.');
        assert!(matches!(
            rx.try_recv(),
            Ok(AudioCommand::LiveTrigger {
                trigger: Trigger::Percussion(PercSound::Kick),
                ..
            })
        ));
    }

    #[test]
    fn line_break_uses_the_configured_sound() {
        let (mut driver, rx) = driver();
        driver.set_line_break(LineBreakSound::Thunder);
        driver.start();
        let _ = rx.try_recv();

        driver.play_character('\n');
        match rx.try_recv() {
            Ok(AudioCommand::LiveTrigger { trigger, duration }) => {
                assert_eq!(trigger, Trigger::Special(LineBreakSound::Thunder));
                assert_eq!(duration, 1.0);
            }
            other => panic!("expected a live trigger, got {other:?}"),
        }
    }

    #[test]
    fn spaces_and_inactive_drivers_stay_silent() {
        let (mut driver, rx) = driver();
        driver.play_character('a'); // not started yet
        assert!(rx.try_recv().is_err());

        driver.start();
        let _ = rx.try_recv();
        driver.play_character(' ');
        assert!(rx.try_recv().is_err());

        driver.stop();
        assert!(matches!(rx.try_recv(), Ok(AudioCommand::LiveStop)));
        driver.play_character('a');
        assert!(rx.try_recv().is_err());
    }
}
