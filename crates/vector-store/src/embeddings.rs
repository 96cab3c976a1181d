use crate::error::{Result, VectorStoreError};
use crate::paths::model_dir;
use async_trait::async_trait;
use ndarray::{Array, Axis, Ix2, Ix3};
use ort::execution_providers::{CPUExecutionProvider, ExecutionProviderDispatch};
use ort::session::{builder::GraphOptimizationLevel, Session, SessionInputs};
use ort::value::{DynTensor, Tensor};
use ort::Error as OrtError;
use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokenizers::{Encoding, PaddingParams, PaddingStrategy, Tokenizer, TruncationParams};
use tokio::task::spawn_blocking;

pub const DEFAULT_MODEL_ID: &str = "all-minilm-l6-v2";

/// Sentence-embedding service shared by index builds and query encoding.
///
/// Implementations must be deterministic for a given text: the index and
/// the query vector are only comparable when both come from the same model.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Stable identifier, part of every on-disk cache key.
    fn model_id(&self) -> &str;

    fn dimension(&self) -> usize;

    async fn embed_batch(&self, texts: Vec<&str>) -> Result<Vec<Vec<f32>>>;

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut embeddings = self.embed_batch(vec![text]).await?;
        embeddings
            .pop()
            .ok_or_else(|| VectorStoreError::EmbeddingError("Empty embedding result".to_string()))
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum EmbeddingMode {
    Fast,
    Stub,
}

impl EmbeddingMode {
    pub fn from_env() -> Result<Self> {
        let raw = env::var("TCODE_EMBEDDING_MODE")
            .unwrap_or_else(|_| "fast".to_string())
            .to_ascii_lowercase();
        Self::parse(&raw)
    }

    pub fn parse(raw: &str) -> Result<Self> {
        match raw.trim() {
            "fast" => Ok(Self::Fast),
            "stub" => Ok(Self::Stub),
            other => Err(VectorStoreError::EmbeddingError(format!(
                "Unsupported TCODE_EMBEDDING_MODE '{other}' (expected 'fast' or 'stub')"
            ))),
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Fast => "fast",
            Self::Stub => "stub",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct ModelId(String);

impl Display for ModelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl ModelId {
    fn from_raw(model_name: &str) -> Self {
        let model_name = model_name.trim().to_ascii_lowercase();
        let normalized = match model_name.as_str() {
            "" | "minilm" | "all-minilm-l6" | "sentence-transformers/all-minilm-l6-v2" => {
                DEFAULT_MODEL_ID.to_string()
            }
            "bge-small-en-v1.5" => "bge-small".to_string(),
            other => other.to_string(),
        };
        Self(normalized)
    }

    fn from_env() -> Self {
        let model_name =
            env::var("TCODE_EMBEDDING_MODEL").unwrap_or_else(|_| DEFAULT_MODEL_ID.to_string());
        Self::from_raw(&model_name)
    }

    /// Built-in specs for models that work without a manifest.
    fn builtin_spec(&self) -> Option<ModelSpec> {
        let (dimension, max_length) = match self.0.as_str() {
            DEFAULT_MODEL_ID => (384, 256),
            "bge-small" => (384, 512),
            _ => return None,
        };
        Some(ModelSpec {
            id: self.clone(),
            dimension,
            max_length,
            max_batch: DEFAULT_MAX_BATCH,
        })
    }
}

const DEFAULT_MAX_BATCH: usize = 32;

/// Shape of one model. Assets live at `<model_dir>/<id>/model.onnx` and
/// `<model_dir>/<id>/tokenizer.json`.
#[derive(Clone, Debug)]
struct ModelSpec {
    id: ModelId,
    dimension: usize,
    max_length: usize,
    max_batch: usize,
}

impl ModelSpec {
    fn model_path(&self, model_dir: &Path) -> PathBuf {
        model_dir.join(&self.id.0).join("model.onnx")
    }

    fn tokenizer_path(&self, model_dir: &Path) -> PathBuf {
        model_dir.join(&self.id.0).join("tokenizer.json")
    }

    /// `<model_dir>/manifest.json` entries take precedence over the
    /// built-in table; unknown ids are an error.
    fn resolve(id: &ModelId, model_dir: &Path) -> Result<Self> {
        let manifest_path = model_dir.join("manifest.json");
        let entries = if manifest_path.exists() {
            let raw = std::fs::read_to_string(&manifest_path)?;
            serde_json::from_str::<ModelsManifest>(&raw)
                .map_err(|e| {
                    VectorStoreError::EmbeddingError(format!(
                        "Invalid models manifest {}: {e}",
                        manifest_path.display()
                    ))
                })?
                .models
        } else {
            Vec::new()
        };

        if let Some(entry) = entries.iter().find(|m| &ModelId::from_raw(&m.id) == id) {
            return Ok(Self {
                id: id.clone(),
                dimension: entry.dimension,
                max_length: entry.max_length,
                max_batch: entry.max_batch.unwrap_or(DEFAULT_MAX_BATCH).max(1),
            });
        }
        id.builtin_spec().ok_or_else(|| {
            let known: Vec<&str> = entries.iter().map(|m| m.id.as_str()).collect();
            VectorStoreError::EmbeddingError(format!(
                "Unknown embedding model id '{id}' (manifest lists: [{}]; built in: {DEFAULT_MODEL_ID}, bge-small)",
                known.join(", ")
            ))
        })
    }
}

#[derive(Debug, Deserialize)]
struct ModelsManifest {
    models: Vec<ManifestModel>,
}

#[derive(Debug, Deserialize)]
struct ManifestModel {
    id: String,
    dimension: usize,
    max_length: usize,
    max_batch: Option<usize>,
}

struct OrtBackend {
    session: Mutex<Session>,
    tokenizer: Tokenizer,
    max_length: usize,
    max_batch: usize,
    dimension: usize,
}

impl OrtBackend {
    fn new(spec: &ModelSpec, model_dir: &Path) -> Result<Self> {
        if !tokenizers::utils::parallelism::is_parallelism_configured() {
            tokenizers::utils::parallelism::set_parallelism(false);
        }

        let model_path = spec.model_path(model_dir);
        let tokenizer_path = spec.tokenizer_path(model_dir);
        if !model_path.exists() || !tokenizer_path.exists() {
            return Err(VectorStoreError::EmbeddingError(format!(
                "Model files for '{}' are missing. Expected ONNX at {} and tokenizer at {}. Download them or set TCODE_MODEL_DIR (TCODE_EMBEDDING_MODE=stub runs without a model).",
                spec.id,
                model_path.display(),
                tokenizer_path.display(),
            )));
        }

        let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| VectorStoreError::EmbeddingError(format!("Tokenizer load failed: {e}")))?;
        tokenizer.with_padding(Some(PaddingParams {
            strategy: PaddingStrategy::BatchLongest,
            ..PaddingParams::default()
        }));
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: spec.max_length,
                ..TruncationParams::default()
            }))
            .map_err(|e| {
                VectorStoreError::EmbeddingError(format!("Tokenizer truncation failed: {e}"))
            })?;

        let (intra_threads, inter_threads) = default_ort_threads();
        let session = Session::builder()
            .map_err(|e| to_embedding_error(&e))?
            .with_intra_threads(intra_threads)
            .map_err(|e| {
                VectorStoreError::EmbeddingError(format!("Failed to set ORT intra threads: {e}"))
            })?
            .with_inter_threads(inter_threads)
            .map_err(|e| {
                VectorStoreError::EmbeddingError(format!("Failed to set ORT inter threads: {e}"))
            })?
            .with_execution_providers(execution_providers())
            .map_err(|e| {
                VectorStoreError::EmbeddingError(format!(
                    "Failed to register execution provider: {e}"
                ))
            })?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| {
                VectorStoreError::EmbeddingError(format!("Failed to set optimization level: {e}"))
            })?
            .commit_from_file(&model_path)
            .map_err(|e| {
                VectorStoreError::EmbeddingError(format!("Failed to load ONNX model: {e}"))
            })?;

        log::info!(
            "Loaded ONNX model '{}' (dim {}, max_length {}, batch {})",
            spec.id,
            spec.dimension,
            spec.max_length,
            spec.max_batch
        );

        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
            max_length: spec.max_length,
            max_batch: spec.max_batch,
            dimension: spec.dimension,
        })
    }

    fn embed_batch_blocking(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.max_batch) {
            let encodings = self
                .tokenizer
                .encode_batch(batch.to_vec(), true)
                .map_err(|e| {
                    VectorStoreError::EmbeddingError(format!("Tokenization failed: {e}"))
                })?;

            if encodings.is_empty() {
                continue;
            }

            let seq_len = encodings[0].len();
            if seq_len > self.max_length {
                return Err(VectorStoreError::EmbeddingError(format!(
                    "Tokenized length {} exceeds max_length {}",
                    seq_len, self.max_length
                )));
            }
            if encodings.iter().any(|e| e.len() != seq_len) {
                return Err(VectorStoreError::EmbeddingError(
                    "Inconsistent sequence lengths after padding".to_string(),
                ));
            }
            let (ids, masks, type_ids, mask_rows) = build_flat_tensors(&encodings, seq_len);

            let ids_array = Array::from_shape_vec((batch.len(), seq_len), ids)
                .map_err(|e| VectorStoreError::EmbeddingError(format!("IDs shape error: {e}")))?;
            let mask_array = Array::from_shape_vec((batch.len(), seq_len), masks)
                .map_err(|e| VectorStoreError::EmbeddingError(format!("Mask shape error: {e}")))?;
            let type_array = Array::from_shape_vec((batch.len(), seq_len), type_ids)
                .map_err(|e| VectorStoreError::EmbeddingError(format!("Types shape error: {e}")))?;

            let ids_tensor = Tensor::from_array(ids_array.into_dyn())
                .map_err(|e| to_embedding_error(&e))?
                .upcast();
            let mask_tensor = Tensor::from_array(mask_array.into_dyn())
                .map_err(|e| to_embedding_error(&e))?
                .upcast();
            let type_tensor = Tensor::from_array(type_array.into_dyn())
                .map_err(|e| to_embedding_error(&e))?
                .upcast();

            let array = {
                let mut session = self.session.lock().map_err(|_| {
                    VectorStoreError::EmbeddingError("Failed to lock ONNX session".into())
                })?;

                // BERT-style encoders take some subset of these three inputs.
                let mut available: HashMap<&str, DynTensor> = HashMap::from([
                    ("input_ids", ids_tensor),
                    ("attention_mask", mask_tensor),
                    ("token_type_ids", type_tensor),
                ]);
                let mut feed: HashMap<String, DynTensor> = HashMap::new();
                for input in &session.inputs {
                    let value = available.remove(input.name.as_str()).ok_or_else(|| {
                        VectorStoreError::EmbeddingError(format!(
                            "Unsupported model input '{}'",
                            input.name
                        ))
                    })?;
                    feed.insert(input.name.clone(), value);
                }

                let outputs = session.run(SessionInputs::from(feed)).map_err(|e| {
                    VectorStoreError::EmbeddingError(format!("ONNX forward failed: {e}"))
                })?;

                if outputs.len() == 0 {
                    return Err(VectorStoreError::EmbeddingError(
                        "ONNX returned no outputs".to_string(),
                    ));
                }

                let array = outputs[0]
                    .try_extract_array::<f32>()
                    .map_err(|e| {
                        VectorStoreError::EmbeddingError(format!(
                            "Failed to decode ONNX output: {e}"
                        ))
                    })?
                    .to_owned();

                drop(outputs);
                drop(session);

                array
            };
            results.extend(embeddings_from_output(array, &mask_rows, self.dimension)?);
        }

        Ok(results)
    }
}

fn execution_providers() -> Vec<ExecutionProviderDispatch> {
    vec![CPUExecutionProvider::default().build()]
}

fn default_ort_threads() -> (usize, usize) {
    let cpus = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);

    // Query latency matters more than index throughput; the table is small.
    let intra_threads = if cpus <= 4 { 1 } else { 2 };
    (intra_threads, 1)
}

fn ensure_dimension(vec: &[f32], expected: usize) -> Result<()> {
    if vec.len() != expected {
        return Err(VectorStoreError::InvalidDimension {
            expected,
            actual: vec.len(),
        });
    }
    Ok(())
}

fn embeddings_from_output(
    array: ndarray::ArrayD<f32>,
    mask_rows: &[Vec<i64>],
    expected_dimension: usize,
) -> Result<Vec<Vec<f32>>> {
    let mut out = Vec::new();
    match array.ndim() {
        2 => {
            let embeddings = array
                .into_dimensionality::<Ix2>()
                .map_err(|e| VectorStoreError::EmbeddingError(format!("Bad output shape: {e}")))?;
            out.reserve(embeddings.len_of(Axis(0)));
            for row in embeddings.outer_iter() {
                let mut emb = row.to_vec();
                ensure_dimension(&emb, expected_dimension)?;
                l2_normalize(&mut emb);
                out.push(emb);
            }
        }
        3 => {
            let hidden = array
                .into_dimensionality::<Ix3>()
                .map_err(|e| VectorStoreError::EmbeddingError(format!("Bad output shape: {e}")))?;
            out.reserve(hidden.len_of(Axis(0)));
            for (idx, sample) in hidden.outer_iter().enumerate() {
                let attn = mask_rows
                    .get(idx)
                    .cloned()
                    .unwrap_or_else(|| vec![1; sample.len_of(Axis(0))]);
                let mut emb = mean_pool(sample.view(), &attn);
                ensure_dimension(&emb, expected_dimension)?;
                l2_normalize(&mut emb);
                out.push(emb);
            }
        }
        _ => {
            return Err(VectorStoreError::EmbeddingError(format!(
                "Unexpected ONNX output dims: {:?}",
                array.shape()
            )));
        }
    }
    Ok(out)
}

fn mean_pool(sample: ndarray::ArrayView2<'_, f32>, mask: &[i64]) -> Vec<f32> {
    if sample.is_empty() {
        return vec![];
    }

    let hidden = sample.len_of(Axis(1));
    let mut sum = vec![0.0f32; hidden];
    let mut count = 0.0f32;

    for (token_idx, token) in sample.outer_iter().enumerate() {
        if *mask.get(token_idx).unwrap_or(&0) == 0 {
            continue;
        }
        count += 1.0;
        for (dim, value) in token.iter().enumerate() {
            sum[dim] += value;
        }
    }

    if count == 0.0 {
        return sum;
    }

    for value in &mut sum {
        *value /= count;
    }

    sum
}

fn build_flat_tensors(
    encodings: &[Encoding],
    seq_len: usize,
) -> (Vec<i64>, Vec<i64>, Vec<i64>, Vec<Vec<i64>>) {
    let mut ids = Vec::with_capacity(encodings.len() * seq_len);
    let mut masks = Vec::with_capacity(encodings.len() * seq_len);
    let mut type_ids = Vec::with_capacity(encodings.len() * seq_len);
    let mut mask_rows = Vec::with_capacity(encodings.len());

    for encoding in encodings {
        let encoding_ids = encoding.get_ids();
        let encoding_masks = encoding.get_attention_mask();
        let encoding_types = encoding.get_type_ids();

        for idx in 0..seq_len {
            ids.push(i64::from(*encoding_ids.get(idx).unwrap_or(&0)));
            masks.push(i64::from(*encoding_masks.get(idx).unwrap_or(&0)));
            type_ids.push(i64::from(*encoding_types.get(idx).unwrap_or(&0)));
        }

        mask_rows.push(
            encoding_masks
                .iter()
                .take(seq_len)
                .map(|v| i64::from(*v))
                .collect(),
        );
    }

    (ids, masks, type_ids, mask_rows)
}

fn to_embedding_error(error: &OrtError) -> VectorStoreError {
    VectorStoreError::EmbeddingError(format!("{error}"))
}

/// Scales `vec` to unit length; zero vectors are left alone.
pub fn l2_normalize(vec: &mut [f32]) {
    let norm = vec.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm == 0.0 {
        return;
    }
    for value in vec {
        *value /= norm;
    }
}

#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

fn stub_embed(text: &str, dimension: usize) -> Vec<f32> {
    let mut state =
        fnv1a_64(text.as_bytes()) ^ (dimension as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    let mut vec = Vec::with_capacity(dimension);
    for _ in 0..dimension {
        let bits = splitmix64(&mut state);
        let high = (bits >> 32) as u32;
        let mantissa = high >> 9;
        let unit = f32::from_bits(0x3f80_0000 | mantissa) - 1.0;
        vec.push(unit.mul_add(2.0, -1.0));
    }
    l2_normalize(&mut vec);
    vec
}

fn fnv1a_64(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in bytes {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

const fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

enum EmbeddingBackend {
    Ort(Arc<OrtBackend>),
    Stub,
}

/// Sentence-embedding model: ONNX Runtime in `fast` mode, hash-seeded
/// vectors in `stub` mode.
///
/// Construct once per process and share it behind an `Arc`.
pub struct EmbeddingModel {
    backend: EmbeddingBackend,
    id: String,
    dimension: usize,
}

impl EmbeddingModel {
    /// Mode and model id from `TCODE_EMBEDDING_MODE` / `TCODE_EMBEDDING_MODEL`.
    pub fn from_env() -> Result<Self> {
        let mode = EmbeddingMode::from_env()?;
        Self::load(mode, &ModelId::from_env(), &model_dir())
    }

    pub fn new(mode: EmbeddingMode, model_id: &str, model_dir: &Path) -> Result<Self> {
        Self::load(mode, &ModelId::from_raw(model_id), model_dir)
    }

    /// Stub model that needs no assets.
    #[must_use]
    pub fn stub(dimension: usize) -> Self {
        Self {
            backend: EmbeddingBackend::Stub,
            id: format!("stub-{dimension}"),
            dimension,
        }
    }

    fn load(mode: EmbeddingMode, id: &ModelId, dir: &Path) -> Result<Self> {
        let spec = ModelSpec::resolve(id, dir)?;
        match mode {
            EmbeddingMode::Stub => Ok(Self {
                backend: EmbeddingBackend::Stub,
                id: format!("stub-{}", spec.id),
                dimension: spec.dimension,
            }),
            EmbeddingMode::Fast => {
                let backend = OrtBackend::new(&spec, dir)?;
                Ok(Self {
                    backend: EmbeddingBackend::Ort(Arc::new(backend)),
                    id: spec.id.to_string(),
                    dimension: spec.dimension,
                })
            }
        }
    }

    #[must_use]
    pub fn mode(&self) -> EmbeddingMode {
        match self.backend {
            EmbeddingBackend::Ort(_) => EmbeddingMode::Fast,
            EmbeddingBackend::Stub => EmbeddingMode::Stub,
        }
    }
}

#[async_trait]
impl Embedder for EmbeddingModel {
    fn model_id(&self) -> &str {
        &self.id
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed_batch(&self, texts: Vec<&str>) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        match &self.backend {
            EmbeddingBackend::Stub => Ok(texts
                .into_iter()
                .map(|text| stub_embed(text, self.dimension))
                .collect()),
            EmbeddingBackend::Ort(backend) => {
                let owned: Vec<String> = texts.into_iter().map(ToString::to_string).collect();
                let backend = backend.clone();
                spawn_blocking(move || backend.embed_batch_blocking(&owned))
                    .await
                    .map_err(|e| VectorStoreError::EmbeddingError(format!("Join error: {e}")))?
            }
        }
    }
}
