//! ResNet-18 feature extractor truncated after its last stage
//!
//! Tensor names follow the torchvision/timm layout (`conv1`, `bn1`,
//! `layer{1..4}.{0,1}.{conv,bn}{1,2}`, `downsample.{0,1}`) so a state dict
//! exported from the training code loads without renaming.

use candle_core::{Module, Result, Tensor, D};
use candle_nn::{batch_norm, conv2d_no_bias, BatchNorm, Conv2d, Conv2dConfig, VarBuilder};

const BN_EPS: f64 = 1e-5;

/// Channel depth of the deepest feature map
pub const RESNET18_FEATURES: usize = 512;

/// Stage layout of ResNet-18: (output channels, stride of the first block)
const STAGES: [(usize, usize); 4] = [(64, 1), (128, 2), (256, 2), (512, 2)];
const BLOCKS_PER_STAGE: usize = 2;

fn conv(
    in_channels: usize,
    out_channels: usize,
    kernel: usize,
    stride: usize,
    padding: usize,
    vb: VarBuilder,
) -> Result<Conv2d> {
    let config = Conv2dConfig {
        stride,
        padding,
        ..Default::default()
    };

    conv2d_no_bias(in_channels, out_channels, kernel, config, vb)
}

/// Convolution followed by inference-mode batch normalization
#[derive(Debug, Clone)]
struct ConvBn {
    conv: Conv2d,
    bn: BatchNorm,
}

impl ConvBn {
    fn forward(&self, xs: &Tensor) -> Result<Tensor> {
        self.conv.forward(xs)?.apply_t(&self.bn, false)
    }
}

/// Two 3x3 convolutions with an identity (or projected) shortcut
#[derive(Debug, Clone)]
struct BasicBlock {
    conv1: Conv2d,
    bn1: BatchNorm,
    conv2: Conv2d,
    bn2: BatchNorm,
    downsample: Option<ConvBn>,
}

impl BasicBlock {
    fn new(in_channels: usize, out_channels: usize, stride: usize, vb: VarBuilder) -> Result<Self> {
        let conv1 = conv(in_channels, out_channels, 3, stride, 1, vb.pp("conv1"))?;
        let bn1 = batch_norm(out_channels, BN_EPS, vb.pp("bn1"))?;
        let conv2 = conv(out_channels, out_channels, 3, 1, 1, vb.pp("conv2"))?;
        let bn2 = batch_norm(out_channels, BN_EPS, vb.pp("bn2"))?;

        let downsample = if stride != 1 || in_channels != out_channels {
            let vb = vb.pp("downsample");
            Some(ConvBn {
                conv: conv(in_channels, out_channels, 1, stride, 0, vb.pp("0"))?,
                bn: batch_norm(out_channels, BN_EPS, vb.pp("1"))?,
            })
        } else {
            None
        };

        Ok(Self {
            conv1,
            bn1,
            conv2,
            bn2,
            downsample,
        })
    }

    fn forward(&self, xs: &Tensor) -> Result<Tensor> {
        let ys = self.conv1.forward(xs)?.apply_t(&self.bn1, false)?.relu()?;
        let ys = self.conv2.forward(&ys)?.apply_t(&self.bn2, false)?;

        let shortcut = match &self.downsample {
            Some(downsample) => downsample.forward(xs)?,
            None => xs.clone(),
        };

        (ys + shortcut)?.relu()
    }
}

/// ResNet-18 trunk emitting only the `layer4` feature map
#[derive(Debug, Clone)]
pub struct ResNet18Features {
    stem: ConvBn,
    stages: Vec<Vec<BasicBlock>>,
}

impl ResNet18Features {
    pub fn new(vb: VarBuilder) -> Result<Self> {
        let stem = ConvBn {
            conv: conv(3, 64, 7, 2, 3, vb.pp("conv1"))?,
            bn: batch_norm(64, BN_EPS, vb.pp("bn1"))?,
        };

        let mut in_channels = 64;
        let mut stages = Vec::with_capacity(STAGES.len());

        for (index, (out_channels, stride)) in STAGES.iter().copied().enumerate() {
            let vb = vb.pp(format!("layer{}", index + 1));
            let mut blocks = Vec::with_capacity(BLOCKS_PER_STAGE);

            for block in 0..BLOCKS_PER_STAGE {
                let block_stride = if block == 0 { stride } else { 1 };
                blocks.push(BasicBlock::new(
                    in_channels,
                    out_channels,
                    block_stride,
                    vb.pp(block.to_string()),
                )?);
                in_channels = out_channels;
            }

            stages.push(blocks);
        }

        Ok(Self { stem, stages })
    }

    /// Map a (B, 3, H, W) batch to its (B, 512, H/32, W/32) feature map
    pub fn forward(&self, xs: &Tensor) -> Result<Tensor> {
        // 3x3/2 max pool with one pixel of padding; inputs are post-ReLU so
        // replicating the border is equivalent to padding with -inf.
        let mut xs = self
            .stem
            .forward(xs)?
            .relu()?
            .pad_with_same(D::Minus1, 1, 1)?
            .pad_with_same(D::Minus2, 1, 1)?
            .max_pool2d_with_stride(3, 2)?;

        for stage in &self.stages {
            for block in stage {
                xs = block.forward(&xs)?;
            }
        }

        Ok(xs)
    }
}
