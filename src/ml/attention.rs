// ============================================================
// Layer 5 — Attention Layer
// ============================================================
// Luong-style attention of a query sequence over a context:
//
//   dot:     score(h_j, q) = h_jᵀ q
//   general: score(h_j, q) = h_jᵀ W_a q
//
//   weights = softmax(scores) over the context positions
//   mix     = weights · context
//   output  = tanh(W_out [mix ; q])
//
// Shapes: query [B, L_out, D], context [B, L_in, D]
//         → output [B, L_out, D], weights [B, L_out, L_in]
//
// Reference: Luong et al. (2015) Effective Approaches to
//            Attention-based Neural Machine Translation

use burn::{
    nn::{Linear, LinearConfig},
    prelude::*,
    tensor::activation::{softmax, tanh},
};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::domain::error::ModelError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttentionKind {
    Dot,
    General,
}

impl FromStr for AttentionKind {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dot"     => Ok(AttentionKind::Dot),
            "general" => Ok(AttentionKind::General),
            other     => Err(ModelError::InvalidAttention(other.to_string())),
        }
    }
}

impl fmt::Display for AttentionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttentionKind::Dot     => f.write_str("dot"),
            AttentionKind::General => f.write_str("general"),
        }
    }
}

#[derive(Config, Debug)]
pub struct AttentionConfig {
    pub dimensions: usize,
    pub kind:       AttentionKind,
}

impl AttentionConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<Attention<B>, ModelError> {
        if self.dimensions == 0 {
            return Err(ModelError::InvalidConfig("attention dimensions must be > 0".to_string()));
        }
        let linear_in = match self.kind {
            AttentionKind::General => Some(
                LinearConfig::new(self.dimensions, self.dimensions)
                    .with_bias(false)
                    .init(device),
            ),
            AttentionKind::Dot => None,
        };
        let linear_out = LinearConfig::new(self.dimensions * 2, self.dimensions)
            .with_bias(false)
            .init(device);
        Ok(Attention { linear_in, linear_out })
    }
}

#[derive(Module, Debug)]
pub struct Attention<B: Backend> {
    /// Present only for general attention
    pub linear_in:  Option<Linear<B>>,
    pub linear_out: Linear<B>,
}

impl<B: Backend> Attention<B> {
    pub fn forward(&self, query: Tensor<B, 3>, context: Tensor<B, 3>) -> (Tensor<B, 3>, Tensor<B, 3>) {
        let query = match &self.linear_in {
            Some(linear) => linear.forward(query),
            None => query,
        };

        // [B, L_out, D] x [B, D, L_in] → [B, L_out, L_in]
        let scores  = query.clone().matmul(context.clone().swap_dims(1, 2));
        let weights = softmax(scores, 2);

        // [B, L_out, L_in] x [B, L_in, D] → [B, L_out, D]
        let mix      = weights.clone().matmul(context);
        let combined = Tensor::cat(vec![mix, query], 2);
        let output   = tanh(self.linear_out.forward(combined));

        (output, weights)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_output_and_weight_shapes() {
        let device = Default::default();
        for kind in [AttentionKind::Dot, AttentionKind::General] {
            let attn = AttentionConfig::new(8, kind).init::<TestBackend>(&device).unwrap();
            assert_eq!(attn.linear_in.is_some(), kind == AttentionKind::General);

            let query   = Tensor::<TestBackend, 3>::ones([2, 3, 8], &device);
            let context = Tensor::<TestBackend, 3>::ones([2, 5, 8], &device);
            let (output, weights) = attn.forward(query, context);
            assert_eq!(output.dims(), [2, 3, 8]);
            assert_eq!(weights.dims(), [2, 3, 5]);

            // weights over the context sum to one
            let sums: Vec<f32> = weights.sum_dim(2).into_data().iter::<f32>().collect();
            assert!(sums.iter().all(|s| (s - 1.0).abs() < 1e-5));
        }
    }

    #[test]
    fn test_rejects_unknown_kind() {
        assert_eq!("general".parse::<AttentionKind>().unwrap(), AttentionKind::General);
        let err = "additive".parse::<AttentionKind>().unwrap_err();
        assert!(matches!(err, ModelError::InvalidAttention(k) if k == "additive"));
    }
}
