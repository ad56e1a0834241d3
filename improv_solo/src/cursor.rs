// Working state the generation loop carries from one timestep to the next.
//
// `register` is the pitch anchor the interval expert measures from. It
// moves only when a note is played, so after rests and sustains it still
// points at the last onset. `prev_note` is the register's value before the
// most recent onset, which makes `register - prev_note` the leap just taken.

use crate::event::Event;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationCursor {
    pub register: u8,
    pub prev_note: u8,
    /// The most recent event was a rest (or a sustain of one).
    pub is_rest: bool,
    /// The most recent event was a sustain.
    pub is_continue: bool,
}

impl GenerationCursor {
    /// A cursor at the start of a solo: silence, anchored at `register`.
    pub fn new(register: u8) -> Self {
        GenerationCursor {
            register,
            prev_note: register,
            is_rest: true,
            is_continue: false,
        }
    }

    /// Fold a sampled event into the cursor.
    pub fn advance(&mut self, event: &Event) {
        match *event {
            Event::NoteOnset { pitch, .. } => {
                self.prev_note = self.register;
                self.register = pitch;
                self.is_rest = false;
                self.is_continue = false;
            }
            Event::Rest => {
                self.is_rest = true;
                self.is_continue = false;
            }
            Event::Sustain => {
                self.is_continue = true;
            }
        }
    }

    /// Semitones from the previous note to the register.
    pub fn last_interval(&self) -> i32 {
        self.register as i32 - self.prev_note as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn onset_moves_register_and_remembers_previous() {
        let mut c = GenerationCursor::new(60);
        c.advance(&Event::NoteOnset { pitch: 64, chord_root: 0 });
        assert_eq!((c.register, c.prev_note), (64, 60));
        assert!(!c.is_rest && !c.is_continue);
        assert_eq!(c.last_interval(), 4);
    }

    #[test]
    fn rest_keeps_register() {
        let mut c = GenerationCursor::new(60);
        c.advance(&Event::NoteOnset { pitch: 57, chord_root: 0 });
        c.advance(&Event::Rest);
        assert_eq!(c.register, 57);
        assert!(c.is_rest);
        assert!(!c.is_continue);
    }

    #[test]
    fn sustain_only_sets_continue() {
        let mut c = GenerationCursor::new(60);
        c.advance(&Event::NoteOnset { pitch: 62, chord_root: 0 });
        c.advance(&Event::Sustain);
        assert_eq!((c.register, c.prev_note), (62, 60));
        assert!(c.is_continue);
        assert!(!c.is_rest);

        // A new onset clears it again.
        c.advance(&Event::NoteOnset { pitch: 59, chord_root: 0 });
        assert!(!c.is_continue);
        assert_eq!(c.last_interval(), -3);
    }
}
