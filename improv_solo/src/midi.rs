// MIDI output for generated solos.
//
// SMF format 1 with three tracks: tempo, the solo line, and a sparse
// comping track that holds each chord of the progression for its full
// duration (root in the bass, chord tones an octave up). Sustains are folded
// into their onsets via `Solo::note_spans`, so every melody note gets one
// NoteOn/NoteOff pair.
//
// Uses the `midly` crate.

use crate::chord::Progression;
use crate::error::{Result, SoloError};
use crate::event::Solo;
use midly::{
    Format, Header, MetaMessage, MidiMessage, Smf, Timing, Track, TrackEvent, TrackEventKind,
    num::{u4, u7, u15, u24, u28},
};
use std::path::Path;

/// Ticks per quarter note in MIDI output.
const TICKS_PER_QUARTER: u32 = 480;
/// Largest delta a track event can carry (28 bits).
const MAX_TICK: u32 = (1 << 28) - 1;

const MELODY_CHANNEL: u8 = 0;
const COMP_CHANNEL: u8 = 1;
/// General MIDI tenor sax and acoustic grand, zero-based.
const MELODY_PROGRAM: u8 = 66;
const COMP_PROGRAM: u8 = 0;
const MELODY_VELOCITY: u8 = 90;
const COMP_VELOCITY: u8 = 60;
/// MIDI key of the C below the comping bass root.
const COMP_BASS_C: u8 = 36;

/// A note in absolute ticks, before delta encoding.
struct TickNote {
    start: u32,
    end: u32,
    key: u8,
    velocity: u8,
}

/// Convert a solo and its progression to MIDI and write to a file.
pub fn write_midi(solo: &Solo, progression: &Progression, tempo_bpm: u32, path: &Path) -> Result<()> {
    let smf = solo_to_smf(solo, progression, tempo_bpm)?;
    smf.save(path).map_err(|source| SoloError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Convert a solo and its progression to an in-memory SMF.
pub fn solo_to_smf(solo: &Solo, progression: &Progression, tempo_bpm: u32) -> Result<Smf<'static>> {
    if tempo_bpm == 0 {
        return Err(SoloError::Config("tempo must be positive".into()));
    }
    if solo.steps_per_beat == 0 || TICKS_PER_QUARTER % solo.steps_per_beat != 0 {
        return Err(SoloError::Config(format!(
            "cannot place {} steps per beat on the MIDI grid",
            solo.steps_per_beat
        )));
    }
    let ticks_per_step = TICKS_PER_QUARTER / solo.steps_per_beat;
    if let Some(chord) = progression.chords.iter().find(|c| c.root >= 12) {
        return Err(SoloError::Config(format!(
            "chord root {} is not a pitch class",
            chord.root
        )));
    }
    let last_beat = progression
        .chords
        .iter()
        .map(|c| c.end_beat())
        .max()
        .unwrap_or(0);
    let chord_ticks = last_beat.checked_mul(TICKS_PER_QUARTER);
    let solo_ticks = u32::try_from(solo.len())
        .ok()
        .and_then(|steps| steps.checked_mul(ticks_per_step));
    match (chord_ticks, solo_ticks) {
        (Some(c), Some(s)) if c.max(s) <= MAX_TICK => {}
        _ => {
            return Err(SoloError::Config(
                "solo is too long for a standard MIDI file".into(),
            ));
        }
    }

    let mut smf = Smf::new(Header::new(
        Format::Parallel,
        Timing::Metrical(u15::new(TICKS_PER_QUARTER as u16)),
    ));

    // Track 0: tempo
    let tempo_microseconds = 60_000_000 / tempo_bpm;
    smf.tracks.push(vec![
        TrackEvent {
            delta: u28::new(0),
            kind: TrackEventKind::Meta(MetaMessage::Tempo(u24::new(tempo_microseconds))),
        },
        end_of_track(0),
    ]);

    let melody: Vec<TickNote> = solo
        .note_spans()
        .iter()
        .map(|span| TickNote {
            start: span.start * ticks_per_step,
            end: (span.start + span.length) * ticks_per_step,
            key: span.pitch,
            velocity: MELODY_VELOCITY,
        })
        .collect();
    smf.tracks
        .push(note_track("Solo", MELODY_CHANNEL, MELODY_PROGRAM, melody));

    let mut comping = Vec::new();
    for chord in &progression.chords {
        let start = chord.start_beat * TICKS_PER_QUARTER;
        let end = chord.end_beat() * TICKS_PER_QUARTER;
        let bass = COMP_BASS_C + chord.root;
        comping.push(TickNote {
            start,
            end,
            key: bass,
            velocity: COMP_VELOCITY,
        });
        for &interval in &chord.quality.intervals()[1..] {
            comping.push(TickNote {
                start,
                end,
                key: bass + 12 + interval,
                velocity: COMP_VELOCITY,
            });
        }
    }
    smf.tracks
        .push(note_track("Changes", COMP_CHANNEL, COMP_PROGRAM, comping));

    Ok(smf)
}

fn end_of_track(delta: u32) -> TrackEvent<'static> {
    TrackEvent {
        delta: u28::new(delta),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    }
}

fn note_track(name: &'static str, channel: u8, program: u8, notes: Vec<TickNote>) -> Track<'static> {
    let channel = u4::new(channel);
    let mut track: Track<'static> = vec![
        TrackEvent {
            delta: u28::new(0),
            kind: TrackEventKind::Meta(MetaMessage::TrackName(name.as_bytes())),
        },
        TrackEvent {
            delta: u28::new(0),
            kind: TrackEventKind::Midi {
                channel,
                message: MidiMessage::ProgramChange {
                    program: u7::new(program),
                },
            },
        },
    ];

    // (tick, is_on, key, velocity); offs sort before ons at the same tick so
    // a repeated key is released before it is struck again.
    let mut events: Vec<(u32, bool, u8, u8)> = Vec::with_capacity(notes.len() * 2);
    for note in &notes {
        events.push((note.start, true, note.key, note.velocity));
        events.push((note.end, false, note.key, 0));
    }
    events.sort_by_key(|&(tick, is_on, key, _)| (tick, is_on, key));

    let mut last_tick = 0;
    for (tick, is_on, key, velocity) in events {
        let message = if is_on {
            MidiMessage::NoteOn {
                key: u7::new(key),
                vel: u7::new(velocity),
            }
        } else {
            MidiMessage::NoteOff {
                key: u7::new(key),
                vel: u7::new(0),
            }
        };
        track.push(TrackEvent {
            delta: u28::new(tick - last_tick),
            kind: TrackEventKind::Midi { channel, message },
        });
        last_tick = tick;
    }

    track.push(end_of_track(0));
    track
}
