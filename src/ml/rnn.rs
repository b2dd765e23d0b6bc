// ============================================================
// Layer 5 — Consensus RNN
// ============================================================
// Bidirectional GRU stack over per-position read summaries.
//
//   encoding [B, W, C]
//     BiGru × num_layers     → [B, W, 2·hidden]
//     attention (optional)   → [B, W, 2·hidden]   self-attention
//     linear(logits)         → [B, W, D]
//   output_logit [B, W, D]
//
// A BiGru runs one GRU left→right and a second one over the
// reversed sequence; the reversed outputs are flipped back so
// position i of both halves refers to the same base.
//
// For zygosity calling only the window centre matters, so the
// classifier adapter keeps the logits at W / 2.
//
// Reference: Cho et al. (2014) Learning Phrase Representations
//            using RNN Encoder-Decoder

use burn::{
    nn::{
        gru::{Gru, GruConfig},
        Linear, LinearConfig,
    },
    prelude::*,
};

use crate::data::encoder::SUMMARY_FEATURES;
use crate::domain::error::ModelError;
use crate::ml::attention::{Attention, AttentionConfig, AttentionKind};
use crate::ml::ports::{Axis, ElementKind, NeuralModule, Port, ZygosityClassifier};

#[derive(Config, Debug)]
pub struct ConsensusRnnConfig {
    /// Number of positions per sample (2 · window + 1)
    pub sequence_length:    usize,
    pub num_output_logits:  usize,
    #[config(default = 10)]
    pub num_input_features: usize,
    #[config(default = 128)]
    pub hidden_size:        usize,
    #[config(default = 2)]
    pub num_layers:         usize,
    pub attention:          Option<AttentionKind>,
}

impl ConsensusRnnConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<ConsensusRnn<B>, ModelError> {
        let zero = [
            ("sequence_length", self.sequence_length),
            ("num_output_logits", self.num_output_logits),
            ("num_input_features", self.num_input_features),
            ("hidden_size", self.hidden_size),
            ("num_layers", self.num_layers),
        ]
        .into_iter()
        .find(|(_, v)| *v == 0);
        if let Some((name, _)) = zero {
            return Err(ModelError::InvalidConfig(format!("ConsensusRnn {name} must be > 0")));
        }

        let layers = (0..self.num_layers)
            .map(|i| {
                let d_input = if i == 0 { self.num_input_features } else { self.hidden_size * 2 };
                BiGru {
                    forward_gru:  GruConfig::new(d_input, self.hidden_size, true).init(device),
                    backward_gru: GruConfig::new(d_input, self.hidden_size, true).init(device),
                }
            })
            .collect();

        let attention = self
            .attention
            .map(|kind| AttentionConfig::new(self.hidden_size * 2, kind).init(device))
            .transpose()?;

        Ok(ConsensusRnn {
            layers,
            attention,
            output: LinearConfig::new(self.hidden_size * 2, self.num_output_logits).init(device),
            sequence_length:    self.sequence_length,
            num_input_features: self.num_input_features,
        })
    }

    /// Config for the summary encoding produced with `window_size`.
    pub fn for_window(window_size: usize, num_output_logits: usize) -> Self {
        Self::new(2 * window_size + 1, num_output_logits).with_num_input_features(SUMMARY_FEATURES)
    }
}

#[derive(Module, Debug)]
pub struct BiGru<B: Backend> {
    pub forward_gru:  Gru<B>,
    pub backward_gru: Gru<B>,
}

impl<B: Backend> BiGru<B> {
    /// x: [B, W, C] → [B, W, 2·hidden]
    pub fn forward(&self, x: Tensor<B, 3>) -> Tensor<B, 3> {
        let fwd = self.forward_gru.forward(x.clone(), None);
        let bwd = self.backward_gru.forward(x.flip([1]), None).flip([1]);
        Tensor::cat(vec![fwd, bwd], 2)
    }
}

#[derive(Module, Debug)]
pub struct ConsensusRnn<B: Backend> {
    pub layers:    Vec<BiGru<B>>,
    pub attention: Option<Attention<B>>,
    pub output:    Linear<B>,
    pub sequence_length:    usize,
    pub num_input_features: usize,
}

impl<B: Backend> ConsensusRnn<B> {
    /// encoding: [B, W, C] → logits: [B, W, D]
    pub fn forward(&self, encoding: Tensor<B, 3>) -> Tensor<B, 3> {
        let mut x = encoding;
        for layer in &self.layers {
            x = layer.forward(x);
        }
        if let Some(attention) = &self.attention {
            let (attended, _weights) = attention.forward(x.clone(), x);
            x = attended;
        }
        self.output.forward(x)
    }
}

impl<B: Backend> NeuralModule for ConsensusRnn<B> {
    const NAME: &'static str = "ConsensusRnn";

    fn input_ports() -> Vec<Port> {
        vec![Port::new("encoding", &[Axis::Batch, Axis::Width, Axis::Channel], ElementKind::Channel)]
    }

    fn output_ports() -> Vec<Port> {
        vec![Port::new(
            "output_logit",
            &[Axis::Batch, Axis::Width, Axis::Dim],
            ElementKind::Logits,
        )]
    }
}

impl<B: Backend> ZygosityClassifier<B> for ConsensusRnn<B> {
    fn classify(&self, encoding: Tensor<B, 4>) -> Tensor<B, 2> {
        // [B, 1, W, C] → [B, W, C]
        let logits = self.forward(encoding.squeeze::<3>(1));
        let [batch, width, classes] = logits.dims();
        let centre = width / 2;
        logits
            .slice([0..batch, centre..centre + 1, 0..classes])
            .squeeze::<2>(1)
    }

    fn check_sample_shape(&self, shape: [usize; 3]) -> Result<(), ModelError> {
        let expected = [1, self.sequence_length, self.num_input_features];
        if shape == expected {
            return Ok(());
        }
        Err(ModelError::IncompatibleEncoding {
            network: Self::NAME,
            shape,
            reason: format!("expected {expected:?}"),
        })
    }
}
