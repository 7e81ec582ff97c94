//! Local embeddings using Candle (sentence-transformers compatible)

use std::path::Path;

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig, DTYPE};
use tokenizers::Tokenizer;
use tracing::info;

/// Local embedding provider using Candle
pub struct CandleEmbedding {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    dimensions: usize,
}

impl CandleEmbedding {
    /// Load a BERT-family sentence-transformers model from a directory
    ///
    /// The directory must contain `config.json`, `tokenizer.json` and either
    /// `model.safetensors` or `pytorch_model.bin`, e.g. an export of
    /// sentence-transformers/all-MiniLM-L6-v2 (384 dims).
    pub fn load(model_path: &Path) -> anyhow::Result<Self> {
        info!("Loading local embedding model from {:?}", model_path);

        if !model_path.is_dir() {
            anyhow::bail!("model path {:?} is not a directory", model_path);
        }

        let device = Device::Cpu;

        let config_path = model_path.join("config.json");
        let tokenizer_path = model_path.join("tokenizer.json");
        let weights_path = {
            let safetensors = model_path.join("model.safetensors");
            if safetensors.exists() {
                safetensors
            } else {
                model_path.join("pytorch_model.bin")
            }
        };

        let config_content = std::fs::read_to_string(&config_path)
            .map_err(|e| anyhow::anyhow!("Failed to read {:?}: {}", config_path, e))?;
        let config: BertConfig = serde_json::from_str(&config_content)?;
        let dimensions = config.hidden_size;

        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow::anyhow!("Failed to load tokenizer: {}", e))?;

        let vb = if weights_path.extension().map(|e| e == "safetensors").unwrap_or(false) {
            // Safety: the weights file is not modified while mapped
            unsafe { VarBuilder::from_mmaped_safetensors(&[weights_path], DTYPE, &device)? }
        } else {
            VarBuilder::from_pth(weights_path, DTYPE, &device)?
        };

        let model = BertModel::load(vb, &config)?;

        info!("Loaded model: {} dims, device: {:?}", dimensions, device);

        Ok(Self {
            model,
            tokenizer,
            device,
            dimensions,
        })
    }

    /// Get embedding dimensions
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Compute mean-pooled embeddings for texts
    pub fn embed(&self, texts: &[&str]) -> anyhow::Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut all_embeddings = Vec::with_capacity(texts.len());

        for batch in texts.chunks(32) {
            all_embeddings.extend(self.embed_batch(batch)?);
        }

        Ok(all_embeddings)
    }

    fn embed_batch(&self, texts: &[&str]) -> anyhow::Result<Vec<Vec<f32>>> {
        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| anyhow::anyhow!("Tokenization failed: {}", e))?;

        let max_len = encodings.iter().map(|e| e.get_ids().len()).max().unwrap_or(0);

        let mut input_ids = Vec::with_capacity(encodings.len() * max_len);
        let mut attention_mask = Vec::with_capacity(encodings.len() * max_len);
        let mut token_type_ids = Vec::with_capacity(encodings.len() * max_len);

        for encoding in &encodings {
            let mut ids = encoding.get_ids().to_vec();
            let mut mask = encoding.get_attention_mask().to_vec();
            let mut types = encoding.get_type_ids().to_vec();

            ids.resize(max_len, 0);
            mask.resize(max_len, 0);
            types.resize(max_len, 0);

            input_ids.extend(ids);
            attention_mask.extend(mask);
            token_type_ids.extend(types);
        }

        let batch_size = encodings.len();

        let input_ids = Tensor::from_vec(input_ids, (batch_size, max_len), &self.device)?;
        let attention_mask = Tensor::from_vec(attention_mask, (batch_size, max_len), &self.device)?;
        let token_type_ids = Tensor::from_vec(token_type_ids, (batch_size, max_len), &self.device)?;

        let output = self
            .model
            .forward(&input_ids, &token_type_ids, Some(&attention_mask))?;

        let pooled = mean_pooling(&output, &attention_mask)?.to_dtype(DType::F32)?;
        let data = pooled.flatten_all()?.to_vec1::<f32>()?;

        Ok(data
            .chunks(self.dimensions)
            .map(|row| row.to_vec())
            .collect())
    }
}

/// Average token states, ignoring padding
fn mean_pooling(output: &Tensor, attention_mask: &Tensor) -> anyhow::Result<Tensor> {
    // output: (batch, seq_len, hidden), attention_mask: (batch, seq_len)
    let mask = attention_mask
        .to_dtype(output.dtype())?
        .unsqueeze(2)?
        .broadcast_as(output.shape())?;

    let sum = output.mul(&mask)?.sum(1)?;

    let count = attention_mask
        .to_dtype(output.dtype())?
        .sum(1)?
        .unsqueeze(1)?
        .broadcast_as(sum.shape())?;

    Ok(sum.div(&count.clamp(1e-9, f64::INFINITY)?)?)
}
