/// Built-in pooled attention classifier
///
/// A compact stand-in for a hub-pretrained encoder: token + position
/// embeddings, one multi-head self-attention block with padding masking, a
/// feed-forward block, masked mean pooling, and a linear classification
/// head. The three dropout probabilities map onto the attention weights,
/// the feed-forward output, and the pooled summary.
use candle_core::{DType, Tensor};
use candle_nn::{
    embedding, layer_norm, linear, loss, ops, Dropout, Embedding, LayerNorm, Linear, Module,
    VarBuilder,
};

use crate::config::ClassifierConfig;
use super::{ClassifierOutput, SequenceClassifier};

pub struct PooledClassifier {
    token_embed: Embedding,
    position_embed: Embedding,
    qkv_proj: Linear,
    o_proj: Linear,
    attn_norm: LayerNorm,
    ffn_up: Linear,
    ffn_down: Linear,
    ffn_norm: LayerNorm,
    attn_dropout: Dropout,
    hidden_dropout: Dropout,
    summary_dropout: Dropout,
    head: Linear,
    num_heads: usize,
    head_dim: usize,
    max_position_embeddings: usize,
}

impl PooledClassifier {
    /// Create a new classifier with freshly initialized parameters
    pub fn new(config: &ClassifierConfig, vb: VarBuilder) -> crate::Result<Self> {
        config.validate()?;

        let hidden = config.hidden_size;
        let token_embed = embedding(config.vocab_size, hidden, vb.pp("token_embed"))?;
        let position_embed = embedding(
            config.max_position_embeddings,
            hidden,
            vb.pp("position_embed"),
        )?;

        // Fused projection: one matmul for Q, K and V
        let qkv_proj = linear(hidden, 3 * hidden, vb.pp("qkv_proj"))?;
        let o_proj = linear(hidden, hidden, vb.pp("o_proj"))?;
        let attn_norm = layer_norm(hidden, 1e-12, vb.pp("attn_norm"))?;

        let ffn_up = linear(hidden, 4 * hidden, vb.pp("ffn_up"))?;
        let ffn_down = linear(4 * hidden, hidden, vb.pp("ffn_down"))?;
        let ffn_norm = layer_norm(hidden, 1e-12, vb.pp("ffn_norm"))?;

        let head = linear(hidden, config.num_classes, vb.pp("head"))?;

        Ok(Self {
            token_embed,
            position_embed,
            qkv_proj,
            o_proj,
            attn_norm,
            ffn_up,
            ffn_down,
            ffn_norm,
            attn_dropout: Dropout::new(config.a_dropout_prob),
            hidden_dropout: Dropout::new(config.h_dropout_prob),
            summary_dropout: Dropout::new(config.s_dropout_prob),
            head,
            num_heads: config.num_heads,
            head_dim: config.head_dim(),
            max_position_embeddings: config.max_position_embeddings,
        })
    }

    /// Self-attention over the embedded sequence with padding masked out
    fn attend(
        &self,
        hidden_states: &Tensor,
        attention_mask: &Tensor,
        train: bool,
    ) -> candle_core::Result<Tensor> {
        let (batch_size, seq_len, hidden) = hidden_states.dims3()?;

        let qkv = self.qkv_proj.forward(hidden_states)?;
        let qkv = qkv.reshape((batch_size, seq_len, 3 * self.num_heads, self.head_dim))?;

        let query = qkv.narrow(2, 0, self.num_heads)?;
        let key = qkv.narrow(2, self.num_heads, self.num_heads)?;
        let value = qkv.narrow(2, 2 * self.num_heads, self.num_heads)?;

        // [batch, seq_len, num_heads, head_dim] -> [batch, num_heads, seq_len, head_dim]
        let query = query.transpose(1, 2)?.contiguous()?;
        let key = key.transpose(1, 2)?.contiguous()?;
        let value = value.transpose(1, 2)?.contiguous()?;

        let scale = 1.0 / (self.head_dim as f64).sqrt();
        let scores = (query.matmul(&key.transpose(2, 3)?.contiguous()?)? * scale)?;

        // Padded positions get a large negative bias before softmax
        let bias = attention_mask
            .to_dtype(DType::F32)?
            .affine(1e9, -1e9)?
            .reshape((batch_size, 1, 1, seq_len))?;
        let scores = scores.broadcast_add(&bias)?;

        let probs = ops::softmax_last_dim(&scores)?;
        let probs = self.attn_dropout.forward(&probs, train)?;

        let context = probs.matmul(&value)?;
        let context = context
            .transpose(1, 2)?
            .contiguous()?
            .reshape((batch_size, seq_len, hidden))?;
        self.o_proj.forward(&context)
    }

    /// Mean pooling over real (unmasked) token positions
    fn pool(&self, hidden_states: &Tensor, attention_mask: &Tensor) -> candle_core::Result<Tensor> {
        let mask = attention_mask.to_dtype(DType::F32)?.unsqueeze(2)?;
        let summed = hidden_states.broadcast_mul(&mask)?.sum(1)?;
        let counts = mask.sum(1)?;
        summed.broadcast_div(&counts)
    }
}

impl SequenceClassifier for PooledClassifier {
    fn forward(
        &self,
        input_ids: &Tensor,
        attention_mask: &Tensor,
        labels: Option<&Tensor>,
        train: bool,
    ) -> crate::Result<ClassifierOutput> {
        let (_, seq_len) = input_ids.dims2()?;
        if seq_len > self.max_position_embeddings {
            return Err(crate::QuadTuneError::Data(format!(
                "sequence length {} exceeds max_position_embeddings {}",
                seq_len, self.max_position_embeddings
            )));
        }

        let positions = Tensor::arange(0u32, seq_len as u32, input_ids.device())?;
        let hidden = self
            .token_embed
            .forward(input_ids)?
            .broadcast_add(&self.position_embed.forward(&positions)?)?;

        let attn_out = self.attend(&hidden, attention_mask, train)?;
        let hidden = self.attn_norm.forward(&(&hidden + &attn_out)?)?;

        let ffn_out = self
            .ffn_down
            .forward(&self.ffn_up.forward(&hidden)?.gelu_erf()?)?;
        let ffn_out = self.hidden_dropout.forward(&ffn_out, train)?;
        let hidden = self.ffn_norm.forward(&(&hidden + &ffn_out)?)?;

        let pooled = self.pool(&hidden, attention_mask)?;
        let pooled = self.summary_dropout.forward(&pooled, train)?;
        let logits = self.head.forward(&pooled)?;

        let loss = match labels {
            Some(labels) => Some(loss::cross_entropy(&logits, labels)?),
            None => None,
        };

        Ok(ClassifierOutput { logits, loss })
    }
}
