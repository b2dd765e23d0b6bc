// ============================================================
// Layer 5 — AlexNet
// ============================================================
// Convolutional classifier over pileup images.
//
//   encoding [B, C, H, W]
//     conv 11×11 /4 (64)  → ReLU → maxpool 3 /2
//     conv  5×5     (192) → ReLU → maxpool 3 /2
//     conv  3×3     (384) → ReLU
//     conv  3×3     (256) → ReLU
//     conv  3×3     (256) → ReLU → maxpool 3 /2
//     adaptive avgpool 6×6 → flatten [B, 256·36]
//     dropout → linear(hidden) → ReLU
//     dropout → linear(hidden) → ReLU
//     linear(num_output_logits)
//   output_logit [B, D]
//
// The adaptive pool makes the classifier width independent of
// the input size; the smallest input that survives the three
// strided pools is 63×63.
//
// Reference: Krizhevsky et al. (2012) ImageNet Classification
//            with Deep Convolutional Neural Networks

use burn::{
    nn::{
        conv::{Conv2d, Conv2dConfig},
        pool::{AdaptiveAvgPool2d, AdaptiveAvgPool2dConfig, MaxPool2d, MaxPool2dConfig},
        Dropout, DropoutConfig, Linear, LinearConfig, PaddingConfig2d, Relu,
    },
    prelude::*,
};

use crate::domain::error::ModelError;
use crate::ml::ports::{Axis, ElementKind, NeuralModule, Port, ZygosityClassifier};

/// Smallest height / width accepted by the feature extractor.
pub const MIN_INPUT_SIZE: usize = 63;

const POOLED: usize = 6;
const FEATURES: usize = 256;

#[derive(Config, Debug)]
pub struct AlexNetConfig {
    pub num_input_channels: usize,
    pub num_output_logits:  usize,
    #[config(default = 4096)]
    pub hidden_width:       usize,
    #[config(default = 0.5)]
    pub dropout:            f64,
}

impl AlexNetConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<AlexNet<B>, ModelError> {
        if self.num_input_channels == 0 || self.num_output_logits == 0 || self.hidden_width == 0 {
            return Err(ModelError::InvalidConfig(format!(
                "AlexNet needs non-zero channels, logits and hidden width (got {}, {}, {})",
                self.num_input_channels, self.num_output_logits, self.hidden_width
            )));
        }
        if !(0.0..1.0).contains(&self.dropout) {
            return Err(ModelError::InvalidConfig(format!(
                "dropout must be in [0, 1), got {}", self.dropout
            )));
        }

        let conv = |c_in: usize, c_out: usize, k: usize, stride: usize, pad: usize| {
            Conv2dConfig::new([c_in, c_out], [k, k])
                .with_stride([stride, stride])
                .with_padding(PaddingConfig2d::Explicit(pad, pad))
                .init(device)
        };

        Ok(AlexNet {
            conv1:    conv(self.num_input_channels, 64, 11, 4, 2),
            conv2:    conv(64, 192, 5, 1, 2),
            conv3:    conv(192, 384, 3, 1, 1),
            conv4:    conv(384, 256, 3, 1, 1),
            conv5:    conv(256, FEATURES, 3, 1, 1),
            pool:     MaxPool2dConfig::new([3, 3]).with_strides([2, 2]).init(),
            avgpool:  AdaptiveAvgPool2dConfig::new([POOLED, POOLED]).init(),
            dropout:  DropoutConfig::new(self.dropout).init(),
            fc1:      LinearConfig::new(FEATURES * POOLED * POOLED, self.hidden_width).init(device),
            fc2:      LinearConfig::new(self.hidden_width, self.hidden_width).init(device),
            fc3:      LinearConfig::new(self.hidden_width, self.num_output_logits).init(device),
            activation: Relu::new(),
            num_input_channels: self.num_input_channels,
        })
    }
}

#[derive(Module, Debug)]
pub struct AlexNet<B: Backend> {
    pub conv1:   Conv2d<B>,
    pub conv2:   Conv2d<B>,
    pub conv3:   Conv2d<B>,
    pub conv4:   Conv2d<B>,
    pub conv5:   Conv2d<B>,
    pub pool:    MaxPool2d,
    pub avgpool: AdaptiveAvgPool2d,
    pub dropout: Dropout,
    pub fc1:     Linear<B>,
    pub fc2:     Linear<B>,
    pub fc3:     Linear<B>,
    pub activation: Relu,
    pub num_input_channels: usize,
}

impl<B: Backend> AlexNet<B> {
    /// encoding: [B, C, H, W] → logits: [B, D]
    pub fn forward(&self, encoding: Tensor<B, 4>) -> Tensor<B, 2> {
        let x = self.pool.forward(self.activation.forward(self.conv1.forward(encoding)));
        let x = self.pool.forward(self.activation.forward(self.conv2.forward(x)));
        let x = self.activation.forward(self.conv3.forward(x));
        let x = self.activation.forward(self.conv4.forward(x));
        let x = self.pool.forward(self.activation.forward(self.conv5.forward(x)));

        let x = self.avgpool.forward(x);
        let x: Tensor<B, 2> = x.flatten(1, 3);

        let x = self.activation.forward(self.fc1.forward(self.dropout.forward(x)));
        let x = self.activation.forward(self.fc2.forward(self.dropout.forward(x)));
        self.fc3.forward(x)
    }
}

impl<B: Backend> NeuralModule for AlexNet<B> {
    const NAME: &'static str = "AlexNet";

    fn input_ports() -> Vec<Port> {
        vec![Port::new(
            "encoding",
            &[Axis::Batch, Axis::Channel, Axis::Height, Axis::Width],
            ElementKind::Channel,
        )]
    }

    fn output_ports() -> Vec<Port> {
        vec![Port::new("output_logit", &[Axis::Batch, Axis::Dim], ElementKind::Logits)]
    }
}

impl<B: Backend> ZygosityClassifier<B> for AlexNet<B> {
    fn classify(&self, encoding: Tensor<B, 4>) -> Tensor<B, 2> {
        self.forward(encoding)
    }

    fn check_sample_shape(&self, shape: [usize; 3]) -> Result<(), ModelError> {
        let [c, h, w] = shape;
        let reason = if c != self.num_input_channels {
            Some(format!("expected {} channels", self.num_input_channels))
        } else if h < MIN_INPUT_SIZE || w < MIN_INPUT_SIZE {
            Some(format!("height and width must be at least {MIN_INPUT_SIZE}"))
        } else {
            None
        };
        match reason {
            Some(reason) => Err(ModelError::IncompatibleEncoding { network: Self::NAME, shape, reason }),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_output_matches_port() {
        let device = Default::default();
        let model = AlexNetConfig::new(2, 3)
            .with_hidden_width(16)
            .init::<TestBackend>(&device)
            .unwrap();

        let out = model.forward(Tensor::zeros([2, 2, 64, 64], &device));
        assert_eq!(out.dims(), [2, 3]);

        let ports = AlexNet::<TestBackend>::output_ports();
        assert_eq!(ports[0].rank(), out.dims().len());
        assert_eq!(ports[0].kind, ElementKind::Logits);
    }

    #[test]
    fn test_sample_shape_checks() {
        let device = Default::default();
        let model = AlexNetConfig::new(4, 3).with_hidden_width(8).init::<TestBackend>(&device).unwrap();

        assert!(model.check_sample_shape([4, 100, 63]).is_ok());
        assert!(matches!(
            model.check_sample_shape([3, 100, 100]),
            Err(ModelError::IncompatibleEncoding { network: "AlexNet", .. })
        ));
        assert!(model.check_sample_shape([4, 62, 100]).is_err());
    }

    #[test]
    fn test_rejects_invalid_config() {
        let device = Default::default();
        assert!(matches!(
            AlexNetConfig::new(0, 3).init::<TestBackend>(&device),
            Err(ModelError::InvalidConfig(_))
        ));
        assert!(matches!(
            AlexNetConfig::new(1, 3).with_dropout(1.0).init::<TestBackend>(&device),
            Err(ModelError::InvalidConfig(_))
        ));
    }
}
