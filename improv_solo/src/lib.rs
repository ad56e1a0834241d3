// Improvised Solo Generator
//
// Generates jazz solo lines over a chord progression, one event per
// timestep (rest, sustain, or a new note in MIDI range [48, 84)). Two
// recurrent experts each predict the next event from their own point of
// view, and their opinions are multiplied (product of experts):
//
//   interval expert: thinks in melodic leaps from the current register
//   chord expert:    thinks in pitch classes above the current chord root
//
// Each expert is a two-layer LSTM with a dense output, loaded from a JSON
// weight bundle. Recurrent state persists across the whole solo.
//
// Architecture:
// - pitch.rs: pitch window, slot layout of the shared distribution vector
// - chord.rs: chord qualities, symbols, progressions
// - tensor.rs: flat f32 tensors, affine/softmax/normalize helpers
// - lstm.rs: a single gated recurrent (LSTM) cell
// - weights.rs: weight bundles on disk and validated expert weights
// - cursor.rs: generation cursor (register, previous note, rest/sustain flags)
// - encoding.rs: per-expert input encoders (beat, chord, register, previous)
// - projection.rs: per-expert output projection into absolute pitch slots
// - expert.rs: `Expert<V>`, the network plus its persistent state
// - combine.rs: product, rest/sustain rebias, temperature, sampling
// - generator.rs: the generation loop and its configuration
// - event.rs: timed events and the generated `Solo`
// - midi.rs: MIDI file output
// - error.rs: `SoloError`
//
// Generation is deterministic given weights, progression, config and seed.

pub mod chord;
pub mod combine;
pub mod cursor;
pub mod encoding;
pub mod error;
pub mod event;
pub mod expert;
pub mod generator;
pub mod lstm;
pub mod midi;
pub mod pitch;
pub mod projection;
pub mod tensor;
pub mod weights;
