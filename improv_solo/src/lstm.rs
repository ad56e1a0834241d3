// One LSTM layer: four gates over the concatenation of input and previous
// hidden state.
//
//   z  = [x, h_prev]
//   i  = sigmoid(z·Wi + bi)     f = sigmoid(z·Wf + bf)
//   c~ = tanh(z·Wc + bc)        o = sigmoid(z·Wo + bo)
//   c  = f*c_prev + i*c~        h = o*tanh(c)
//
// The cell holds only read-only weights; recurrent state lives in
// `LstmState`, which the owning expert replaces every step.

use crate::tensor::{Matrix, sigmoid};

/// Weight matrix and bias of one gate. The matrix is
/// `[input_size + hidden_size, hidden_size]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Gate {
    pub weight: Matrix,
    pub bias: Vec<f32>,
}

impl Gate {
    fn preactivation(&self, z: &[f32], out: &mut [f32]) {
        self.weight.affine(z, &self.bias, out);
    }
}

/// Hidden and cell vectors of one layer.
#[derive(Debug, Clone, PartialEq)]
pub struct LstmState {
    pub hidden: Vec<f32>,
    pub cell: Vec<f32>,
}

/// A gated recurrent (LSTM) cell with its trained initial state.
#[derive(Debug, Clone, PartialEq)]
pub struct GatedRecurrentCell {
    pub input_size: usize,
    pub hidden_size: usize,
    pub input_gate: Gate,
    pub forget_gate: Gate,
    pub candidate: Gate,
    pub output_gate: Gate,
    pub initial: LstmState,
}

impl GatedRecurrentCell {
    /// Advance one timestep. Pure: returns the new state and leaves `prev`
    /// alone.
    pub fn step(&self, input: &[f32], prev: &LstmState) -> LstmState {
        debug_assert_eq!(input.len(), self.input_size);
        let h = self.hidden_size;

        let mut z = Vec::with_capacity(self.input_size + h);
        z.extend_from_slice(input);
        z.extend_from_slice(&prev.hidden);

        let mut i = vec![0.0; h];
        let mut f = vec![0.0; h];
        let mut c_tilde = vec![0.0; h];
        let mut o = vec![0.0; h];
        self.input_gate.preactivation(&z, &mut i);
        self.forget_gate.preactivation(&z, &mut f);
        self.candidate.preactivation(&z, &mut c_tilde);
        self.output_gate.preactivation(&z, &mut o);

        let cell: Vec<f32> = f
            .iter()
            .zip(&i)
            .zip(&c_tilde)
            .zip(&prev.cell)
            .map(|(((&f, &i), &c_tilde), &c_prev)| {
                sigmoid(f) * c_prev + sigmoid(i) * c_tilde.tanh()
            })
            .collect();
        let hidden = cell
            .iter()
            .zip(&o)
            .map(|(&c, &o)| sigmoid(o) * c.tanh())
            .collect();
        LstmState { hidden, cell }
    }
}
