// ============================================================
// Layer 4 — Vocabularies and Batch Encoding
// ============================================================
// Word-level vocabularies for the source (questions) and the
// target (equations), plus the two encoding steps used by the
// training loop and the validation runner:
//
//   sents_to_idx   raw sentences → index sequences
//   process_batch  index sequences → padded Int tensors
//
// Special tokens have fixed ids in every vocabulary:
//   <pad> = 0   <s> = 1   </s> = 2   <unk> = 3
//
// Source sequences:  w1 w2 ... wn </s>
// Target sequences:  <s> w1 w2 ... wn </s>
//
// Tensors are batch-major: [batch, seq_len].

use std::collections::HashMap;

use burn::prelude::*;
use serde::{Deserialize, Serialize};

pub const PAD_ID: usize = 0;
pub const SOS_ID: usize = 1;
pub const EOS_ID: usize = 2;
pub const UNK_ID: usize = 3;

const SPECIALS: [&str; 4] = ["<pad>", "<s>", "</s>", "<unk>"];

/// Which special-token convention `sents_to_idx` applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceSide {
    Source,
    Target,
}

/// Bidirectional word ↔ id mapping.
/// Serialised as the plain word list; the reverse index is rebuilt on load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct Vocabulary {
    words:   Vec<String>,
    word2id: HashMap<String, usize>,
}

impl Vocabulary {
    /// A vocabulary holding only the special tokens.
    pub fn new() -> Self {
        let words: Vec<String> = SPECIALS.iter().map(|s| s.to_string()).collect();
        let mut voc = Self { words, word2id: HashMap::new() };
        voc.reindex();
        voc
    }

    /// Build a vocabulary from every whitespace token of `sentences`.
    /// Ids are assigned in first-seen order, so the result is
    /// deterministic for a given corpus order.
    pub fn build<'a>(sentences: impl IntoIterator<Item = &'a str>) -> Self {
        let mut voc = Self::new();
        for s in sentences {
            voc.add_sentence(s);
        }
        voc
    }

    pub fn add_sentence(&mut self, sentence: &str) {
        for word in sentence.split_whitespace() {
            self.add_word(word);
        }
    }

    pub fn add_word(&mut self, word: &str) -> usize {
        if let Some(&id) = self.word2id.get(word) {
            return id;
        }
        let id = self.words.len();
        self.words.push(word.to_string());
        self.word2id.insert(word.to_string(), id);
        id
    }

    pub fn get_id(&self, word: &str) -> usize {
        self.word2id.get(word).copied().unwrap_or(UNK_ID)
    }

    pub fn get_word(&self, id: usize) -> &str {
        self.words.get(id).map(String::as_str).unwrap_or(SPECIALS[UNK_ID])
    }

    /// Never below 4: the special tokens are always present.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// Map decoded ids back to words, dropping <pad>, <s> and </s>.
    /// <unk> is kept so an equation containing it fails to evaluate.
    pub fn ids_to_words(&self, ids: &[usize]) -> Vec<String> {
        ids.iter()
            .filter(|&&id| !matches!(id, PAD_ID | SOS_ID | EOS_ID))
            .map(|&id| self.get_word(id).to_string())
            .collect()
    }

    fn reindex(&mut self) {
        self.word2id = self
            .words
            .iter()
            .enumerate()
            .map(|(i, w)| (w.clone(), i))
            .collect();
    }
}

impl From<Vec<String>> for Vocabulary {
    fn from(words: Vec<String>) -> Self {
        let mut voc = Self { words, word2id: HashMap::new() };
        voc.reindex();
        voc
    }
}

impl From<Vocabulary> for Vec<String> {
    fn from(voc: Vocabulary) -> Self {
        voc.words
    }
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self::new()
    }
}

/// Source (`voc1`) and target (`voc2`) vocabularies of one model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vocabularies {
    pub voc1: Vocabulary,
    pub voc2: Vocabulary,
}

impl Vocabularies {
    pub fn new(voc1: Vocabulary, voc2: Vocabulary) -> Self {
        Self { voc1, voc2 }
    }
}

/// Convert raw sentences into index sequences.
///
/// At most `max_length` words of each sentence are kept; special
/// tokens are added on top according to `side`.
pub fn sents_to_idx<S: AsRef<str>>(
    voc:        &Vocabulary,
    sentences:  &[S],
    max_length: usize,
    side:       SequenceSide,
) -> Vec<Vec<usize>> {
    sentences
        .iter()
        .map(|s| {
            let mut ids = Vec::with_capacity(max_length + 2);
            if side == SequenceSide::Target {
                ids.push(SOS_ID);
            }
            ids.extend(
                s.as_ref()
                    .split_whitespace()
                    .take(max_length)
                    .map(|w| voc.get_id(w)),
            );
            ids.push(EOS_ID);
            ids
        })
        .collect()
}

// ─── EncodedBatch ─────────────────────────────────────────────────────────────
/// Padded source/target index tensors plus the true (pre-padding)
/// target lengths the decoder is bounded by.
#[derive(Debug, Clone)]
pub struct EncodedBatch<B: Backend> {
    /// [batch, max_source_len]
    pub source:         Tensor<B, 2, Int>,
    /// [batch, max_target_len]
    pub target:         Tensor<B, 2, Int>,
    pub target_lengths: Vec<usize>,
}

/// Pad index sequences to the longest of the batch and build tensors.
pub fn process_batch<B: Backend>(
    source:  &[Vec<usize>],
    target:  &[Vec<usize>],
    device:  &B::Device,
) -> EncodedBatch<B> {
    let (source, _) = pad_to_tensor::<B>(source, device);
    let (target, target_lengths) = pad_to_tensor::<B>(target, device);
    EncodedBatch { source, target, target_lengths }
}

fn pad_to_tensor<B: Backend>(
    seqs:   &[Vec<usize>],
    device: &B::Device,
) -> (Tensor<B, 2, Int>, Vec<usize>) {
    let lengths: Vec<usize> = seqs.iter().map(Vec::len).collect();
    let max_len    = lengths.iter().copied().max().unwrap_or(0).max(1);
    let batch_size = seqs.len();

    // Flatten row by row, padding each row to max_len
    let flat: Vec<i32> = seqs
        .iter()
        .flat_map(|s| {
            s.iter()
                .map(|&id| id as i32)
                .chain(std::iter::repeat(PAD_ID as i32).take(max_len - s.len()))
        })
        .collect();

    let tensor = Tensor::<B, 1, Int>::from_ints(flat.as_slice(), device)
        .reshape([batch_size, max_len]);
    (tensor, lengths)
}
