//! ViT-Tiny/16 encoder used as a headless feature extractor
//!
//! Mirrors the timm `vit_tiny_patch16_224` layout: patch embedding, class
//! token, learned position embedding, twelve pre-norm transformer blocks and a
//! final layer norm. The pooled output is the class token.

use candle_core::{IndexOp, Module, Result, Tensor};
use candle_nn::{conv2d, layer_norm, linear, Conv2d, Conv2dConfig, LayerNorm, Linear, VarBuilder};

/// Hyper-parameters of a ViT encoder
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VitConfig {
    pub image_size: usize,
    pub patch_size: usize,
    pub in_channels: usize,
    pub embed_dim: usize,
    pub depth: usize,
    pub num_heads: usize,
    pub mlp_ratio: usize,
    pub layer_norm_eps: f64,
}

impl VitConfig {
    /// `vit_tiny_patch16_224`
    pub const fn tiny_patch16_224() -> Self {
        Self {
            image_size: 224,
            patch_size: 16,
            in_channels: 3,
            embed_dim: 192,
            depth: 12,
            num_heads: 3,
            mlp_ratio: 4,
            layer_norm_eps: 1e-6,
        }
    }

    pub fn num_patches(&self) -> usize {
        (self.image_size / self.patch_size).pow(2)
    }

    pub fn head_dim(&self) -> usize {
        self.embed_dim / self.num_heads
    }
}

#[derive(Debug, Clone)]
struct Attention {
    qkv: Linear,
    proj: Linear,
    num_heads: usize,
    head_dim: usize,
    scale: f64,
}

impl Attention {
    fn new(config: &VitConfig, vb: VarBuilder) -> Result<Self> {
        let dim = config.embed_dim;
        let head_dim = config.head_dim();

        Ok(Self {
            qkv: linear(dim, dim * 3, vb.pp("qkv"))?,
            proj: linear(dim, dim, vb.pp("proj"))?,
            num_heads: config.num_heads,
            head_dim,
            scale: 1.0 / (head_dim as f64).sqrt(),
        })
    }

    fn forward(&self, xs: &Tensor) -> Result<Tensor> {
        let (batch, tokens, dim) = xs.dims3()?;

        let qkv = self
            .qkv
            .forward(xs)?
            .reshape((batch, tokens, 3, self.num_heads, self.head_dim))?
            .permute((2, 0, 3, 1, 4))?;

        let q = (qkv.i(0)?.contiguous()? * self.scale)?;
        let k = qkv.i(1)?.contiguous()?;
        let v = qkv.i(2)?.contiguous()?;

        let attn = q.matmul(&k.t()?)?;
        let attn = candle_nn::ops::softmax_last_dim(&attn)?;

        let out = attn
            .matmul(&v)?
            .transpose(1, 2)?
            .reshape((batch, tokens, dim))?;

        self.proj.forward(&out)
    }
}

#[derive(Debug, Clone)]
struct Mlp {
    fc1: Linear,
    fc2: Linear,
}

impl Mlp {
    fn new(config: &VitConfig, vb: VarBuilder) -> Result<Self> {
        let hidden = config.embed_dim * config.mlp_ratio;

        Ok(Self {
            fc1: linear(config.embed_dim, hidden, vb.pp("fc1"))?,
            fc2: linear(hidden, config.embed_dim, vb.pp("fc2"))?,
        })
    }

    fn forward(&self, xs: &Tensor) -> Result<Tensor> {
        self.fc2.forward(&self.fc1.forward(xs)?.gelu_erf()?)
    }
}

#[derive(Debug, Clone)]
struct Block {
    norm1: LayerNorm,
    attn: Attention,
    norm2: LayerNorm,
    mlp: Mlp,
}

impl Block {
    fn new(config: &VitConfig, vb: VarBuilder) -> Result<Self> {
        Ok(Self {
            norm1: layer_norm(config.embed_dim, config.layer_norm_eps, vb.pp("norm1"))?,
            attn: Attention::new(config, vb.pp("attn"))?,
            norm2: layer_norm(config.embed_dim, config.layer_norm_eps, vb.pp("norm2"))?,
            mlp: Mlp::new(config, vb.pp("mlp"))?,
        })
    }

    fn forward(&self, xs: &Tensor) -> Result<Tensor> {
        let xs = (xs + self.attn.forward(&self.norm1.forward(xs)?)?)?;
        &xs + self.mlp.forward(&self.norm2.forward(&xs)?)?
    }
}

/// Headless ViT encoder returning the normalized class-token embedding
#[derive(Debug, Clone)]
pub struct VisionTransformer {
    patch_embed: Conv2d,
    cls_token: Tensor,
    pos_embed: Tensor,
    blocks: Vec<Block>,
    norm: LayerNorm,
    config: VitConfig,
}

impl VisionTransformer {
    pub fn new(config: VitConfig, vb: VarBuilder) -> Result<Self> {
        let patch_config = Conv2dConfig {
            stride: config.patch_size,
            ..Default::default()
        };
        let patch_embed = conv2d(
            config.in_channels,
            config.embed_dim,
            config.patch_size,
            patch_config,
            vb.pp("patch_embed").pp("proj"),
        )?;

        let cls_token = vb.get((1, 1, config.embed_dim), "cls_token")?;
        let pos_embed = vb.get((1, config.num_patches() + 1, config.embed_dim), "pos_embed")?;

        let blocks = (0..config.depth)
            .map(|i| Block::new(&config, vb.pp("blocks").pp(i.to_string())))
            .collect::<Result<Vec<_>>>()?;

        let norm = layer_norm(config.embed_dim, config.layer_norm_eps, vb.pp("norm"))?;

        Ok(Self {
            patch_embed,
            cls_token,
            pos_embed,
            blocks,
            norm,
            config,
        })
    }

    pub fn config(&self) -> &VitConfig {
        &self.config
    }

    /// Map a (B, 3, H, W) batch to (B, embed_dim) class-token embeddings
    pub fn forward(&self, xs: &Tensor) -> Result<Tensor> {
        let batch = xs.dim(0)?;

        // (B, D, H/P, W/P) -> (B, N, D)
        let patches = self.patch_embed.forward(xs)?.flatten_from(2)?.transpose(1, 2)?;

        let cls = self.cls_token.broadcast_as((batch, 1, self.config.embed_dim))?;
        let mut tokens = Tensor::cat(&[&cls, &patches], 1)?.broadcast_add(&self.pos_embed)?;

        for block in &self.blocks {
            tokens = block.forward(&tokens)?;
        }

        self.norm.forward(&tokens)?.i((.., 0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::{DType, Device};

    fn small_config() -> VitConfig {
        VitConfig {
            image_size: 32,
            patch_size: 16,
            in_channels: 3,
            embed_dim: 12,
            depth: 2,
            num_heads: 3,
            mlp_ratio: 4,
            layer_norm_eps: 1e-6,
        }
    }

    #[test]
    fn test_tiny_config() {
        let config = VitConfig::tiny_patch16_224();
        assert_eq!(config.num_patches(), 196);
        assert_eq!(config.head_dim(), 64);
        assert_eq!(config.embed_dim, 192);
    }

    #[test]
    fn test_embedding_shape() {
        let device = Device::Cpu;
        let vb = VarBuilder::zeros(DType::F32, &device);
        let config = small_config();
        let model = VisionTransformer::new(config, vb).unwrap();

        let xs = Tensor::zeros((2, 3, 32, 32), DType::F32, &device).unwrap();
        let embedding = model.forward(&xs).unwrap();

        assert_eq!(embedding.dims(), &[2, 12]);
    }
}
