use crate::core::config::{Config, EmbedderKind};
use crate::core::error::{Error, Result};
use candle_core::{Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig, DTYPE};
use hf_hub::api::sync::Api;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokenizers::{Tokenizer, TruncationParams};

/// Longest token sequence a BERT encoder accepts
const MAX_SEQUENCE_TOKENS: usize = 512;

/// Maps text to unit-norm vectors of a fixed dimension.
///
/// Implementations must be deterministic for a given text and model, and
/// `encode` must return exactly one vector per input, in input order.
pub trait Embedder: Send + Sync {
    fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Whether `encode` can succeed at all
    fn is_available(&self) -> bool {
        true
    }

    /// Identifier of the model behind the vectors
    fn model_id(&self) -> &str;
}

/// The "no embedding capability" variant
#[derive(Debug, Clone, Default)]
pub struct DisabledEmbedder {
    reason: String,
}

impl DisabledEmbedder {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

impl Embedder for DisabledEmbedder {
    fn encode(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Err(Error::CapabilityUnavailable(if self.reason.is_empty() {
            "embedder disabled".to_string()
        } else {
            self.reason.clone()
        }))
    }

    fn is_available(&self) -> bool {
        false
    }

    fn model_id(&self) -> &str {
        "disabled"
    }
}

/// Build the embedder selected by the configuration.
///
/// A BERT model that cannot be loaded degrades to [`DisabledEmbedder`]; a
/// missing model is an expected state, not a fatal one.
pub fn load_embedder(config: &Config) -> Arc<dyn Embedder> {
    match config.embedder {
        EmbedderKind::Disabled => Arc::new(DisabledEmbedder::new("embedder disabled by configuration")),
        EmbedderKind::Bert => match BertEmbedder::load(config, false) {
            Ok(model) => Arc::new(model),
            Err(e) => {
                tracing::warn!(model = %config.model_id, "embedding model unavailable: {}", e);
                Arc::new(DisabledEmbedder::new(format!("failed to load {}: {}", config.model_id, e)))
            }
        },
    }
}

/// Sentence embedding model backed by candle's BERT
pub struct BertEmbedder {
    model: Arc<Mutex<BertModel>>,
    tokenizer: Arc<Mutex<Tokenizer>>,
    device: Device,
    model_id: String,
}

impl BertEmbedder {
    /// Load the configured model, downloading it into `models_dir` first if needed
    pub fn load(config: &Config, verbose: bool) -> Result<Self> {
        let model_dir = Self::model_dir(config);
        std::fs::create_dir_all(&model_dir)?;

        let model_path = model_dir.join("model.safetensors");
        let config_path = model_dir.join("config.json");
        let tokenizer_path = model_dir.join("tokenizer.json");

        if !(model_path.exists() && config_path.exists() && tokenizer_path.exists()) {
            Self::download_model(&config.model_id, &model_path, &config_path, &tokenizer_path, verbose)?;
        }

        let device = Device::cuda_if_available(0).unwrap_or(Device::Cpu);
        let (model, tokenizer) = Self::load_model_files(&model_path, &config_path, &tokenizer_path, &device)?;
        tracing::info!(model = %config.model_id, "embedding model loaded");

        Ok(Self {
            model: Arc::new(Mutex::new(model)),
            tokenizer: Arc::new(Mutex::new(tokenizer)),
            device,
            model_id: config.model_id.clone(),
        })
    }

    /// Per-model directory under `models_dir`
    pub fn model_dir(config: &Config) -> PathBuf {
        config.models_dir.join(config.model_id.replace('/', "--"))
    }

    /// Download model files from HuggingFace Hub
    fn download_model(
        model_id: &str,
        model_path: &Path,
        config_path: &Path,
        tokenizer_path: &Path,
        verbose: bool,
    ) -> Result<()> {
        if verbose {
            println!("Downloading embedding model from HuggingFace Hub...");
            println!("Model: {}", model_id);
        }

        let api = Api::new()?;
        let repo = api.model(model_id.to_string());

        if verbose {
            println!("  Downloading config.json...");
        }
        let config_file = repo.get("config.json")?;

        if verbose {
            println!("  Downloading tokenizer.json...");
        }
        let tokenizer_file = repo.get("tokenizer.json")?;

        if verbose {
            println!("  Downloading model.safetensors (this may take a while)...");
        }
        let weights_file = repo.get("model.safetensors")?;

        std::fs::copy(&config_file, config_path)?;
        std::fs::copy(&tokenizer_file, tokenizer_path)?;
        std::fs::copy(&weights_file, model_path)?;

        if verbose {
            println!("✓ Model downloaded successfully");
        }

        Ok(())
    }

    fn load_model_files(
        model_path: &Path,
        config_path: &Path,
        tokenizer_path: &Path,
        device: &Device,
    ) -> Result<(BertModel, Tokenizer)> {
        let config_content = std::fs::read_to_string(config_path)?;
        let bert_config: BertConfig = serde_json::from_str(&config_content)
            .map_err(|e| Error::Model(format!("Failed to parse config: {}", e)))?;

        let mut tokenizer = Tokenizer::from_file(tokenizer_path)
            .map_err(|e| Error::Tokenizer(format!("Failed to load tokenizer: {}", e)))?;
        tokenizer.with_padding(None);
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: MAX_SEQUENCE_TOKENS,
                ..Default::default()
            }))
            .map_err(|e| Error::Tokenizer(format!("Failed to configure truncation: {}", e)))?;

        // SAFETY: the weights file is not modified while the model is alive.
        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[model_path], DTYPE, device)
                .map_err(|e| Error::Model(format!("Failed to load weights: {}", e)))?
        };

        let model = BertModel::load(vb, &bert_config)
            .map_err(|e| Error::Model(format!("Failed to load model: {}", e)))?;

        Ok((model, tokenizer))
    }

    /// Mean pooling followed by L2 normalization.
    ///
    /// Texts go through the model one at a time and unpadded, so a vector
    /// depends only on its own text, never on the batch it arrived in.
    fn embed_with_model(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let model = self
            .model
            .lock()
            .map_err(|e| Error::Model(format!("Failed to lock model: {}", e)))?;
        let tokenizer = self
            .tokenizer
            .lock()
            .map_err(|e| Error::Model(format!("Failed to lock tokenizer: {}", e)))?;

        let mut result = Vec::with_capacity(texts.len());
        for text in texts {
            let encoding = tokenizer
                .encode(text.as_str(), true)
                .map_err(|e| Error::Tokenizer(format!("Tokenization failed: {}", e)))?;

            let token_ids = Tensor::new(encoding.get_ids(), &self.device)?.unsqueeze(0)?;
            let token_type_ids = token_ids.zeros_like()?;

            // [1, seq, hidden]
            let embeddings = model.forward(&token_ids, &token_type_ids, None)?;

            // Every sequence holds at least [CLS] and [SEP].
            let seq_len = embeddings.dim(1)?;
            let pooled = (embeddings.sum(1)? / seq_len as f64)?;
            let normalized = Self::normalize_l2(&pooled)?;

            result.push(normalized.squeeze(0)?.to_vec1()?);
        }

        Ok(result)
    }

    fn normalize_l2(v: &Tensor) -> Result<Tensor> {
        Ok(v.broadcast_div(&v.sqr()?.sum_keepdim(1)?.sqrt()?)?)
    }
}

impl Embedder for BertEmbedder {
    fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.embed_with_model(texts)
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}
