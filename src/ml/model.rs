use burn::{
    nn::{
        attention::{generate_autoregressive_mask, MhaInput, MultiHeadAttention, MultiHeadAttentionConfig},
        loss::CrossEntropyLoss,
        Dropout, DropoutConfig,
        Embedding, EmbeddingConfig,
        LayerNorm, LayerNormConfig,
        Linear, LinearConfig,
    },
    prelude::*,
};

use crate::data::vocab::{EOS_ID, PAD_ID, SOS_ID};
use crate::ml::seq2seq::{DecodeOutput, Seq2SeqModel};

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize.
#[derive(Config, Debug)]
pub struct TransformerSeq2SeqConfig {
    pub source_vocab:   usize,
    pub target_vocab:   usize,
    /// Size of the positional table; bounds both sequence lengths
    /// and the number of greedy decoding steps
    pub max_positions:  usize,
    pub d_model:        usize,
    pub num_heads:      usize,
    pub encoder_layers: usize,
    pub decoder_layers: usize,
    pub d_ff:           usize,
    pub dropout:        f64,
}

impl TransformerSeq2SeqConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> TransformerSeq2Seq<B> {
        let source_embedding   = EmbeddingConfig::new(self.source_vocab, self.d_model).init(device);
        let target_embedding   = EmbeddingConfig::new(self.target_vocab, self.d_model).init(device);
        let position_embedding = EmbeddingConfig::new(self.max_positions, self.d_model).init(device);
        let encoder: Vec<EncoderBlock<B>> = (0..self.encoder_layers)
            .map(|_| self.build_encoder_block(device))
            .collect();
        let decoder: Vec<DecoderBlock<B>> = (0..self.decoder_layers)
            .map(|_| self.build_decoder_block(device))
            .collect();
        TransformerSeq2Seq {
            source_embedding,
            target_embedding,
            position_embedding,
            encoder,
            decoder,
            encoder_norm:  LayerNormConfig::new(self.d_model).init(device),
            decoder_norm:  LayerNormConfig::new(self.d_model).init(device),
            output:        LinearConfig::new(self.d_model, self.target_vocab).init(device),
            dropout:       DropoutConfig::new(self.dropout).init(),
            max_positions: self.max_positions,
        }
    }

    fn attention<B: Backend>(&self, device: &B::Device) -> MultiHeadAttention<B> {
        MultiHeadAttentionConfig::new(self.d_model, self.num_heads)
            .with_dropout(self.dropout)
            .init(device)
    }

    fn build_encoder_block<B: Backend>(&self, device: &B::Device) -> EncoderBlock<B> {
        EncoderBlock {
            self_attn:   self.attention(device),
            ffn_linear1: LinearConfig::new(self.d_model, self.d_ff).init(device),
            ffn_linear2: LinearConfig::new(self.d_ff, self.d_model).init(device),
            norm1:       LayerNormConfig::new(self.d_model).init(device),
            norm2:       LayerNormConfig::new(self.d_model).init(device),
            dropout:     DropoutConfig::new(self.dropout).init(),
        }
    }

    fn build_decoder_block<B: Backend>(&self, device: &B::Device) -> DecoderBlock<B> {
        DecoderBlock {
            self_attn:   self.attention(device),
            cross_attn:  self.attention(device),
            ffn_linear1: LinearConfig::new(self.d_model, self.d_ff).init(device),
            ffn_linear2: LinearConfig::new(self.d_ff, self.d_model).init(device),
            norm1:       LayerNormConfig::new(self.d_model).init(device),
            norm2:       LayerNormConfig::new(self.d_model).init(device),
            norm3:       LayerNormConfig::new(self.d_model).init(device),
            dropout:     DropoutConfig::new(self.dropout).init(),
        }
    }
}

#[derive(Module, Debug)]
pub struct EncoderBlock<B: Backend> {
    pub self_attn:   MultiHeadAttention<B>,
    pub ffn_linear1: Linear<B>,
    pub ffn_linear2: Linear<B>,
    pub norm1:       LayerNorm<B>,
    pub norm2:       LayerNorm<B>,
    pub dropout:     Dropout,
}

impl<B: Backend> EncoderBlock<B> {
    /// x: [batch, src_len, d_model], pad: [batch, src_len] (true = padding)
    pub fn forward(&self, x: Tensor<B, 3>, pad: Tensor<B, 2, Bool>) -> Tensor<B, 3> {
        let attn = self.self_attn
            .forward(MhaInput::self_attn(x.clone()).mask_pad(pad))
            .context;
        let x = self.norm1.forward(x + self.dropout.forward(attn));
        let ffn = self.ffn_linear2.forward(
            burn::tensor::activation::gelu(self.ffn_linear1.forward(x.clone()))
        );
        self.norm2.forward(x + self.dropout.forward(ffn))
    }
}

#[derive(Module, Debug)]
pub struct DecoderBlock<B: Backend> {
    pub self_attn:   MultiHeadAttention<B>,
    pub cross_attn:  MultiHeadAttention<B>,
    pub ffn_linear1: Linear<B>,
    pub ffn_linear2: Linear<B>,
    pub norm1:       LayerNorm<B>,
    pub norm2:       LayerNorm<B>,
    pub norm3:       LayerNorm<B>,
    pub dropout:     Dropout,
}

impl<B: Backend> DecoderBlock<B> {
    /// x: [batch, tgt_len, d_model], memory: [batch, src_len, d_model]
    pub fn forward(
        &self,
        x:          Tensor<B, 3>,
        memory:     Tensor<B, 3>,
        causal:     Tensor<B, 3, Bool>,
        memory_pad: Tensor<B, 2, Bool>,
    ) -> Tensor<B, 3> {
        let attn = self.self_attn
            .forward(MhaInput::self_attn(x.clone()).mask_attn(causal))
            .context;
        let x = self.norm1.forward(x + self.dropout.forward(attn));

        let cross = self.cross_attn
            .forward(MhaInput::new(x.clone(), memory.clone(), memory).mask_pad(memory_pad))
            .context;
        let x = self.norm2.forward(x + self.dropout.forward(cross));

        let ffn = self.ffn_linear2.forward(
            burn::tensor::activation::gelu(self.ffn_linear1.forward(x.clone()))
        );
        self.norm3.forward(x + self.dropout.forward(ffn))
    }
}

/// Encoder-decoder transformer mapping question ids to equation ids.
#[derive(Module, Debug)]
pub struct TransformerSeq2Seq<B: Backend> {
    pub source_embedding:   Embedding<B>,
    pub target_embedding:   Embedding<B>,
    pub position_embedding: Embedding<B>,
    pub encoder:            Vec<EncoderBlock<B>>,
    pub decoder:            Vec<DecoderBlock<B>>,
    pub encoder_norm:       LayerNorm<B>,
    pub decoder_norm:       LayerNorm<B>,
    pub output:             Linear<B>,
    pub dropout:            Dropout,
    pub max_positions:      usize,
}

impl<B: Backend> TransformerSeq2Seq<B> {
    fn embed(&self, table: &Embedding<B>, ids: Tensor<B, 2, Int>) -> Tensor<B, 3> {
        let [batch_size, seq_len] = ids.dims();
        debug_assert!(seq_len <= self.max_positions, "sequence longer than positional table");

        let tok_emb = table.forward(ids);
        let positions = Tensor::<B, 1, Int>::arange(0..seq_len as i64, &tok_emb.device())
            .unsqueeze::<2>()
            .expand([batch_size, seq_len]);
        let pos_emb = self.position_embedding.forward(positions);

        self.dropout.forward(tok_emb + pos_emb)
    }

    /// Returns the encoder memory and the source padding mask.
    pub fn encode(&self, source: Tensor<B, 2, Int>) -> (Tensor<B, 3>, Tensor<B, 2, Bool>) {
        let pad = source.clone().equal_elem(PAD_ID as i64);
        let mut x = self.embed(&self.source_embedding, source);
        for layer in &self.encoder {
            x = layer.forward(x, pad.clone());
        }
        (self.encoder_norm.forward(x), pad)
    }

    /// Logits for every position of `prefix`: [batch, len, target_vocab].
    pub fn decode(
        &self,
        prefix:     Tensor<B, 2, Int>,
        memory:     Tensor<B, 3>,
        memory_pad: Tensor<B, 2, Bool>,
    ) -> Tensor<B, 3> {
        let [batch_size, seq_len] = prefix.dims();
        let causal = generate_autoregressive_mask::<B>(batch_size, seq_len, &prefix.device());

        let mut x = self.embed(&self.target_embedding, prefix);
        for layer in &self.decoder {
            x = layer.forward(x, memory.clone(), causal.clone(), memory_pad.clone());
        }
        self.output.forward(self.decoder_norm.forward(x))
    }
}

impl<B: Backend> Seq2SeqModel<B> for TransformerSeq2Seq<B> {
    fn forward(
        &self,
        _questions:    &[String],
        source:        Tensor<B, 2, Int>,
        target_prefix: Tensor<B, 2, Int>,
    ) -> Tensor<B, 3> {
        let (memory, pad) = self.encode(source);
        self.decode(target_prefix, memory, pad)
    }

    fn greedy_decode(
        &self,
        _questions:     &[String],
        source:         Tensor<B, 2, Int>,
        target:         Tensor<B, 2, Int>,
        target_lengths: &[usize],
        criterion:      &CrossEntropyLoss<B>,
        validation:     bool,
    ) -> DecodeOutput {
        let device      = source.device();
        let [batch, _]  = source.dims();
        let (memory, pad) = self.encode(source);

        let target_len = target_lengths.iter().copied().max().unwrap_or(0);
        let steps = if validation {
            target_len.saturating_sub(1)
        } else {
            self.max_positions.saturating_sub(1)
        };

        let start: Vec<i32> = vec![SOS_ID as i32; batch];
        let mut prefix = Tensor::<B, 1, Int>::from_ints(start.as_slice(), &device)
            .reshape([batch, 1]);

        let mut tokens   = vec![Vec::new(); batch];
        let mut finished = vec![false; batch];
        let mut loss     = 0.0f64;

        for step in 0..steps {
            let logits = self.decode(prefix.clone(), memory.clone(), pad.clone());
            let [_, len, vocab] = logits.dims();
            let last = logits
                .slice([0..batch, len - 1..len, 0..vocab])
                .reshape([batch, vocab]);

            if validation {
                let expected = target.clone()
                    .slice([0..batch, step + 1..step + 2])
                    .reshape([batch]);
                loss += criterion.forward(last.clone(), expected).into_scalar().elem::<f64>();
            }

            let next = last.argmax(1); // [batch, 1]
            for (i, id) in next.clone().into_data().iter::<i64>().enumerate() {
                if finished[i] {
                    continue;
                }
                let id = id as usize;
                if id == EOS_ID {
                    finished[i] = true;
                } else {
                    tokens[i].push(id);
                }
            }
            prefix = Tensor::cat(vec![prefix, next], 1);

            // Without a reference there is no loss to finish computing
            if !validation && finished.iter().all(|&f| f) {
                break;
            }
        }

        let loss = if validation && target_len > 0 { loss / target_len as f64 } else { 0.0 };
        DecodeOutput { loss, tokens }
    }
}
