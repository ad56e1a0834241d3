// Weight bundles: the on-disk form of an expert, and its validated form.
//
// A `WeightBundle` is what training exports: a name, the declared
// input/output widths, and a map of named flat tensors. `ExpertWeights` is
// the checked, typed version the generator runs on. Conversion validates
// every tensor's presence and shape up front so that a bad export fails
// before the first timestep rather than halfway through a chorus.
//
// Tensor names (`l` is 1 or 2, `gate` is input/forget/candidate/output):
//   lstm{l}.{gate}.weight   [layer_in + hidden, hidden]
//   lstm{l}.{gate}.bias     [hidden]
//   lstm{l}.initial_hidden  [hidden]
//   lstm{l}.initial_cell    [hidden]
//   dense.weight            [hidden, output_size]
//   dense.bias              [output_size]
// `layer_in` is the bundle's input_size for layer 1 and `hidden` for layer 2.
// The hidden width is read from `lstm1.initial_hidden`.

use crate::error::{Result, SoloError};
use crate::lstm::{Gate, GatedRecurrentCell, LstmState};
use crate::tensor::{Matrix, Tensor};
use improv_prng::SoloRng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

const GATE_NAMES: [&str; 4] = ["input", "forget", "candidate", "output"];

/// Serialized weights of one expert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightBundle {
    pub name: String,
    pub input_size: usize,
    pub output_size: usize,
    pub tensors: BTreeMap<String, Tensor>,
}

impl WeightBundle {
    /// Read a bundle from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path).map_err(|source| SoloError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&data)?)
    }

    /// Write a bundle as JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        let data = serde_json::to_string(self)?;
        std::fs::write(path, data).map_err(|source| SoloError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    fn tensor(&self, name: &str) -> Result<&Tensor> {
        self.tensors.get(name).ok_or_else(|| SoloError::MissingTensor {
            bundle: self.name.clone(),
            tensor: name.to_string(),
        })
    }

    /// Fetch a tensor and check it has exactly `expected` shape.
    fn shaped(&self, name: &str, expected: &[usize]) -> Result<Vec<f32>> {
        let tensor = self.tensor(name)?;
        if tensor.shape != expected {
            return Err(SoloError::ShapeMismatch {
                bundle: self.name.clone(),
                tensor: name.to_string(),
                expected: expected.to_vec(),
                found: tensor.shape.clone(),
            });
        }
        if tensor.data.len() != tensor.numel() {
            return Err(SoloError::DataLength {
                bundle: self.name.clone(),
                tensor: name.to_string(),
                expected: tensor.numel(),
                found: tensor.data.len(),
            });
        }
        if let Some(index) = tensor.data.iter().position(|v| !v.is_finite()) {
            return Err(SoloError::NonFiniteWeight {
                bundle: self.name.clone(),
                tensor: name.to_string(),
                index,
            });
        }
        Ok(tensor.data.clone())
    }

    fn hidden_size(&self) -> Result<usize> {
        let name = "lstm1.initial_hidden";
        let tensor = self.tensor(name)?;
        match tensor.shape.as_slice() {
            [h] if *h > 0 => Ok(*h),
            other => Err(SoloError::ShapeMismatch {
                bundle: self.name.clone(),
                tensor: name.to_string(),
                expected: vec![0],
                found: other.to_vec(),
            }),
        }
    }

    fn cell(&self, layer: usize, input_size: usize, hidden: usize) -> Result<GatedRecurrentCell> {
        let rows = input_size + hidden;
        let gate = |gate: &str| -> Result<Gate> {
            let weight = self.shaped(&format!("lstm{layer}.{gate}.weight"), &[rows, hidden])?;
            let bias = self.shaped(&format!("lstm{layer}.{gate}.bias"), &[hidden])?;
            Ok(Gate {
                weight: Matrix::from_flat(rows, hidden, weight),
                bias,
            })
        };
        Ok(GatedRecurrentCell {
            input_size,
            hidden_size: hidden,
            input_gate: gate(GATE_NAMES[0])?,
            forget_gate: gate(GATE_NAMES[1])?,
            candidate: gate(GATE_NAMES[2])?,
            output_gate: gate(GATE_NAMES[3])?,
            initial: LstmState {
                hidden: self.shaped(&format!("lstm{layer}.initial_hidden"), &[hidden])?,
                cell: self.shaped(&format!("lstm{layer}.initial_cell"), &[hidden])?,
            },
        })
    }
}

/// Final projection from the top hidden state to output logits.
#[derive(Debug, Clone, PartialEq)]
pub struct Dense {
    pub weight: Matrix,
    pub bias: Vec<f32>,
}

impl Dense {
    pub fn forward(&self, hidden: &[f32]) -> Vec<f32> {
        let mut out = vec![0.0; self.bias.len()];
        self.weight.affine(hidden, &self.bias, &mut out);
        out
    }
}

/// Validated, read-only weights of one expert.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpertWeights {
    pub name: String,
    pub layers: [GatedRecurrentCell; 2],
    pub dense: Dense,
}

impl ExpertWeights {
    /// Validate a bundle against the vocabulary widths the expert needs.
    pub fn from_bundle(
        bundle: &WeightBundle,
        input_size: usize,
        output_size: usize,
    ) -> Result<Self> {
        for (what, expected, found) in [
            ("input", input_size, bundle.input_size),
            ("output", output_size, bundle.output_size),
        ] {
            if expected != found {
                return Err(SoloError::VocabularyMismatch {
                    bundle: bundle.name.clone(),
                    what,
                    expected,
                    found,
                });
            }
        }

        let hidden = bundle.hidden_size()?;
        let layer1 = bundle.cell(1, input_size, hidden)?;
        let layer2 = bundle.cell(2, hidden, hidden)?;
        let dense = Dense {
            weight: Matrix::from_flat(
                hidden,
                output_size,
                bundle.shaped("dense.weight", &[hidden, output_size])?,
            ),
            bias: bundle.shaped("dense.bias", &[output_size])?,
        };

        log::debug!(
            "loaded expert '{}': input {input_size}, hidden {hidden}, output {output_size}",
            bundle.name
        );
        Ok(ExpertWeights {
            name: bundle.name.clone(),
            layers: [layer1, layer2],
            dense,
        })
    }

    pub fn hidden_size(&self) -> usize {
        self.layers[0].hidden_size
    }

    pub fn input_size(&self) -> usize {
        self.layers[0].input_size
    }

    pub fn output_size(&self) -> usize {
        self.dense.bias.len()
    }

    /// Small uniformly-random weights, Xavier-ish scaled, for demos and
    /// tests. Produced as a bundle first so it goes through validation.
    pub fn random(
        name: &str,
        input_size: usize,
        hidden: usize,
        output_size: usize,
        rng: &mut SoloRng,
    ) -> Result<Self> {
        Self::from_bundle(
            &random_bundle(name, input_size, hidden, output_size, rng),
            input_size,
            output_size,
        )
    }
}

/// A bundle with every required tensor filled from `rng`.
pub fn random_bundle(
    name: &str,
    input_size: usize,
    hidden: usize,
    output_size: usize,
    rng: &mut SoloRng,
) -> WeightBundle {
    let mut tensors = BTreeMap::new();
    let fill = |shape: Vec<usize>, scale: f32, rng: &mut SoloRng| -> Tensor {
        let n: usize = shape.iter().product();
        let data = (0..n).map(|_| rng.range_f32(-scale, scale)).collect();
        Tensor::new(shape, data)
    };

    for (layer, layer_in) in [(1, input_size), (2, hidden)] {
        let rows = layer_in + hidden;
        let scale = 1.0 / (rows as f32).sqrt();
        for gate in GATE_NAMES {
            tensors.insert(
                format!("lstm{layer}.{gate}.weight"),
                fill(vec![rows, hidden], scale, rng),
            );
            tensors.insert(format!("lstm{layer}.{gate}.bias"), fill(vec![hidden], 0.1, rng));
        }
        tensors.insert(format!("lstm{layer}.initial_hidden"), fill(vec![hidden], 0.1, rng));
        tensors.insert(format!("lstm{layer}.initial_cell"), fill(vec![hidden], 0.1, rng));
    }
    let scale = 1.0 / (hidden as f32).sqrt();
    tensors.insert("dense.weight".into(), fill(vec![hidden, output_size], scale, rng));
    tensors.insert("dense.bias".into(), fill(vec![output_size], 0.1, rng));

    WeightBundle {
        name: name.to_string(),
        input_size,
        output_size,
        tensors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bundle() -> WeightBundle {
        random_bundle("test", 5, 4, 3, &mut SoloRng::new(1))
    }

    #[test]
    fn valid_bundle_converts() {
        let w = ExpertWeights::from_bundle(&bundle(), 5, 3).unwrap();
        assert_eq!(w.hidden_size(), 4);
        assert_eq!(w.input_size(), 5);
        assert_eq!(w.output_size(), 3);
        assert_eq!(w.layers[1].input_size, 4);
        assert_eq!(w.layers[0].input_gate.weight.rows(), 9);
        assert_eq!(w.dense.weight.cols(), 3);
    }

    #[test]
    fn missing_tensor_is_reported_by_name() {
        let mut b = bundle();
        b.tensors.remove("lstm2.forget.bias");
        match ExpertWeights::from_bundle(&b, 5, 3) {
            Err(SoloError::MissingTensor { tensor, .. }) => assert_eq!(tensor, "lstm2.forget.bias"),
            other => panic!("expected MissingTensor, got {other:?}"),
        }
    }

    #[test]
    fn wrong_shape_is_rejected() {
        let mut b = bundle();
        b.tensors.insert(
            "dense.weight".into(),
            Tensor::new(vec![3, 4], vec![0.0; 12]),
        );
        assert!(matches!(
            ExpertWeights::from_bundle(&b, 5, 3),
            Err(SoloError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn short_data_is_rejected() {
        let mut b = bundle();
        b.tensors.insert("dense.bias".into(), Tensor::new(vec![3], vec![0.0; 2]));
        assert!(matches!(
            ExpertWeights::from_bundle(&b, 5, 3),
            Err(SoloError::DataLength { expected: 3, found: 2, .. })
        ));
    }

    #[test]
    fn non_finite_weights_are_rejected() {
        for bad in [f32::NAN, f32::INFINITY, f32::NEG_INFINITY] {
            let mut b = bundle();
            if let Some(t) = b.tensors.get_mut("lstm1.candidate.weight") {
                t.data[2] = bad;
            }
            assert!(matches!(
                ExpertWeights::from_bundle(&b, 5, 3),
                Err(SoloError::NonFiniteWeight { ref tensor, index: 2, .. })
                    if tensor == "lstm1.candidate.weight"
            ));
        }
    }

    #[test]
    fn declared_sizes_must_match_vocabulary() {
        assert!(matches!(
            ExpertWeights::from_bundle(&bundle(), 6, 3),
            Err(SoloError::VocabularyMismatch { what: "input", .. })
        ));
        assert!(matches!(
            ExpertWeights::from_bundle(&bundle(), 5, 4),
            Err(SoloError::VocabularyMismatch { what: "output", .. })
        ));
    }

    #[test]
    fn bundle_json_roundtrip_validates() {
        let json = serde_json::to_string(&bundle()).unwrap();
        let restored: WeightBundle = serde_json::from_str(&json).unwrap();
        assert!(ExpertWeights::from_bundle(&restored, 5, 3).is_ok());
    }
}
