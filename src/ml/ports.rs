// ============================================================
// Layer 5 — Module Ports
// ============================================================
// Every network declares what it consumes and produces as a
// list of named ports. A port names its tensor axes and the
// semantic type of the values:
//
//   AlexNet       encoding: (B, C, H, W) Channel  →  output_logit: (B, D) Logits
//   ConsensusRnn  encoding: (B, W, C) Channel     →  output_logit: (B, W, D) Logits
//
// The orchestrator only sees the ZygosityClassifier trait,
// which adapts any network to "4D batch in, [B, classes] out".

use burn::prelude::*;
use std::fmt;

use crate::domain::error::ModelError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Batch,
    Channel,
    Height,
    Width,
    /// Generic feature dimension (e.g. number of logits)
    Dim,
}

impl Axis {
    fn symbol(self) -> char {
        match self {
            Axis::Batch   => 'B',
            Axis::Channel => 'C',
            Axis::Height  => 'H',
            Axis::Width   => 'W',
            Axis::Dim     => 'D',
        }
    }
}

/// Semantic type of the values flowing through a port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    Channel,
    Logits,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Port {
    pub name: &'static str,
    pub axes: &'static [Axis],
    pub kind: ElementKind,
}

impl Port {
    pub const fn new(name: &'static str, axes: &'static [Axis], kind: ElementKind) -> Self {
        Self { name, axes, kind }
    }

    pub fn rank(&self) -> usize {
        self.axes.len()
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let axes: Vec<String> = self.axes.iter().map(|a| a.symbol().to_string()).collect();
        write!(f, "{}: ({}) {:?}", self.name, axes.join(", "), self.kind)
    }
}

/// Static port declarations of a network.
pub trait NeuralModule {
    /// Used in logs and checkpoint file names.
    const NAME: &'static str;

    fn input_ports() -> Vec<Port>;

    fn output_ports() -> Vec<Port>;

    fn describe() -> String {
        let fmt_ports = |ports: Vec<Port>| {
            ports.iter().map(Port::to_string).collect::<Vec<_>>().join(", ")
        };
        format!("{} [{}] -> [{}]", Self::NAME, fmt_ports(Self::input_ports()), fmt_ports(Self::output_ports()))
    }
}

/// A network that can score zygosity classes for a batch.
pub trait ZygosityClassifier<B: Backend> {
    /// `[batch, c, h, w]` encodings → `[batch, classes]` logits.
    fn classify(&self, encoding: Tensor<B, 4>) -> Tensor<B, 2>;

    /// Reject sample shapes `[c, h, w]` this network cannot consume.
    fn check_sample_shape(&self, shape: [usize; 3]) -> Result<(), ModelError>;
}
