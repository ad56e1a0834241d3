// A recurrent expert: two stacked LSTM cells and a dense output layer,
// plus the recurrent state it carries across a whole solo.
//
// The two experts differ only in what they read and speak. That difference
// is the `Vocabulary` trait: input/output widths, the encoder, and the
// projection into absolute pitch space. `Expert<V>` supplies the network.
//
// Weights are behind an `Arc` so several independent runs can share one
// loaded model; each `Expert` owns its own `ExpertState`.

use crate::encoding::{
    CHORD_INPUT_SIZE, INTERVAL_INPUT_SIZE, INTERVAL_VOCAB, PITCH_CLASS_VOCAB, StepContext,
    encode_chord, encode_interval,
};
use crate::error::{Result, SoloError};
use crate::lstm::LstmState;
use crate::projection::{project_chord, project_interval};
use crate::tensor::softmax;
use crate::weights::ExpertWeights;
use std::marker::PhantomData;
use std::sync::Arc;

/// What one kind of expert reads and how its output maps to pitches.
pub trait Vocabulary {
    const NAME: &'static str;
    const INPUT_SIZE: usize;
    const OUTPUT_SIZE: usize;

    fn encode(ctx: &StepContext<'_>) -> Vec<f32>;

    /// Map a distribution over `OUTPUT_SIZE` local tokens to the shared
    /// `NUM_SLOTS` absolute vector.
    fn project(probs: &[f64], ctx: &StepContext<'_>) -> Vec<f64>;
}

/// Melodic-interval expert: leaps relative to the register.
#[derive(Debug, Clone, Copy)]
pub struct IntervalVocabulary;

impl Vocabulary for IntervalVocabulary {
    const NAME: &'static str = "interval";
    const INPUT_SIZE: usize = INTERVAL_INPUT_SIZE;
    const OUTPUT_SIZE: usize = INTERVAL_VOCAB;

    fn encode(ctx: &StepContext<'_>) -> Vec<f32> {
        encode_interval(ctx)
    }

    fn project(probs: &[f64], ctx: &StepContext<'_>) -> Vec<f64> {
        project_interval(probs, ctx.cursor.register)
    }
}

/// Chord-relative expert: pitch classes above the chord root.
#[derive(Debug, Clone, Copy)]
pub struct ChordVocabulary;

impl Vocabulary for ChordVocabulary {
    const NAME: &'static str = "chord";
    const INPUT_SIZE: usize = CHORD_INPUT_SIZE;
    const OUTPUT_SIZE: usize = PITCH_CLASS_VOCAB;

    fn encode(ctx: &StepContext<'_>) -> Vec<f32> {
        encode_chord(ctx)
    }

    fn project(probs: &[f64], ctx: &StepContext<'_>) -> Vec<f64> {
        project_chord(probs, ctx.chord.root)
    }
}

/// Recurrent state of both layers.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpertState {
    pub layers: [LstmState; 2],
}

impl ExpertState {
    fn initial(weights: &ExpertWeights) -> Self {
        ExpertState {
            layers: [
                weights.layers[0].initial.clone(),
                weights.layers[1].initial.clone(),
            ],
        }
    }
}

#[derive(Debug, Clone)]
pub struct Expert<V: Vocabulary> {
    weights: Arc<ExpertWeights>,
    state: ExpertState,
    vocabulary: PhantomData<V>,
}

impl<V: Vocabulary> Expert<V> {
    /// Wrap validated weights, checking they fit this vocabulary. The state
    /// starts at the trained initial vectors.
    pub fn new(weights: Arc<ExpertWeights>) -> Result<Self> {
        for (what, expected, found) in [
            ("input", V::INPUT_SIZE, weights.input_size()),
            ("output", V::OUTPUT_SIZE, weights.output_size()),
        ] {
            if expected != found {
                return Err(SoloError::VocabularyMismatch {
                    bundle: weights.name.clone(),
                    what,
                    expected,
                    found,
                });
            }
        }
        let state = ExpertState::initial(&weights);
        Ok(Expert {
            weights,
            state,
            vocabulary: PhantomData,
        })
    }

    /// Restore the trained initial state, for the start of a new solo.
    pub fn reset(&mut self) {
        self.state = ExpertState::initial(&self.weights);
    }

    pub fn state(&self) -> &ExpertState {
        &self.state
    }

    /// Put back a state taken from `state()`, undoing a failed step.
    pub(crate) fn restore(&mut self, state: ExpertState) {
        self.state = state;
    }

    /// Advance the recurrence one timestep and return output logits.
    pub fn step(&mut self, input: &[f32]) -> Vec<f32> {
        let [cell1, cell2] = &self.weights.layers;
        let s1 = cell1.step(input, &self.state.layers[0]);
        let s2 = cell2.step(&s1.hidden, &self.state.layers[1]);
        let logits = self.weights.dense.forward(&s2.hidden);
        self.state = ExpertState { layers: [s1, s2] };
        logits
    }

    /// Encode, step, softmax and project: this expert's opinion for the
    /// step, in absolute pitch space.
    pub fn predict(&mut self, ctx: &StepContext<'_>) -> Vec<f64> {
        let input = V::encode(ctx);
        let logits = self.step(&input);
        V::project(&softmax(&logits), ctx)
    }
}
