// The generator's output: one event per timestep.
//
// A `Solo` is the append-only stream the generation loop produces. It knows
// its time signature and grid resolution so downstream code (MIDI writer,
// schedulers, the CLI's text view) can recover bar/beat positions and
// note lengths without reaching back into the generator.

use crate::pitch::pitch_name;
use serde::{Deserialize, Serialize};

/// What happens at one timestep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    Rest,
    /// The previous onset (or rest) keeps going.
    Sustain,
    /// A new note. `chord_root` is the root pitch class that was sounding
    /// when the note was chosen.
    NoteOnset { pitch: u8, chord_root: u8 },
}

/// An event stamped with its position on the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimedEvent {
    pub timestep: u32,
    /// Zero-based bar number.
    pub measure: u32,
    /// Zero-based beat within the bar.
    pub beat: u32,
    /// Zero-based step within the beat.
    pub substep: u32,
    pub event: Event,
}

impl TimedEvent {
    pub fn new(timestep: u32, steps_per_beat: u32, beats_per_measure: u32, event: Event) -> Self {
        let beat_index = timestep / steps_per_beat;
        TimedEvent {
            timestep,
            measure: beat_index / beats_per_measure,
            beat: beat_index % beats_per_measure,
            substep: timestep % steps_per_beat,
            event,
        }
    }
}

/// A note with its length, after folding sustains into their onset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoteSpan {
    pub pitch: u8,
    pub start: u32,
    /// Length in timesteps, at least 1.
    pub length: u32,
    pub chord_root: u8,
}

/// A generated solo line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Solo {
    pub steps_per_beat: u32,
    pub beats_per_measure: u32,
    pub events: Vec<TimedEvent>,
}

impl Solo {
    pub fn new(steps_per_beat: u32, beats_per_measure: u32) -> Self {
        Solo {
            steps_per_beat,
            beats_per_measure,
            events: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, event: TimedEvent) {
        self.events.push(event);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Onset pitches in order.
    pub fn notes(&self) -> Vec<u8> {
        self.events
            .iter()
            .filter_map(|e| match e.event {
                Event::NoteOnset { pitch, .. } => Some(pitch),
                _ => None,
            })
            .collect()
    }

    /// Fold each onset and the sustains that follow it into one span.
    /// Sustains after a rest (or at the very start) extend nothing.
    pub fn note_spans(&self) -> Vec<NoteSpan> {
        let mut spans: Vec<NoteSpan> = Vec::new();
        let mut sounding = false;
        for e in &self.events {
            match e.event {
                Event::NoteOnset { pitch, chord_root } => {
                    spans.push(NoteSpan {
                        pitch,
                        start: e.timestep,
                        length: 1,
                        chord_root,
                    });
                    sounding = true;
                }
                Event::Sustain if sounding => {
                    if let Some(last) = spans.last_mut() {
                        last.length += 1;
                    }
                }
                Event::Sustain => {}
                Event::Rest => sounding = false,
            }
        }
        spans
    }

    /// One-line text view: note names on onsets, `-` per sustained step,
    /// `.` per rest step, `|` at bar lines.
    pub fn summary(&self) -> String {
        let mut out = String::new();
        let steps_per_bar = self.steps_per_beat * self.beats_per_measure;
        for e in &self.events {
            if e.timestep > 0 && steps_per_bar > 0 && e.timestep % steps_per_bar == 0 {
                out.push('|');
            }
            match e.event {
                Event::Rest => out.push('.'),
                Event::Sustain => out.push('-'),
                Event::NoteOnset { pitch, .. } => out.push_str(&pitch_name(pitch)),
            }
        }
        out
    }
}
