//! Model artifact: the fitted scaler and forest, bundled into one file.
//!
//! Layout (little-endian):
//!
//! ```text
//! "RSKM" | version: u16 | schema: u32 | payload_len: u64 | payload (bincode) | crc32: u32
//! ```
//!
//! `schema` is a CRC32 over the feature order and the categorical code tables,
//! so an artifact trained against a different encoding is rejected on load
//! instead of silently mis-scoring.

use std::fs;
use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::domain::{ApplicantInput, EncodedVector, FEATURE_NAMES};
use crate::error::AppError;
use crate::features::{assemble, encoding_fingerprint};
use crate::math::StandardScaler;
use crate::models::RandomForest;

const MAGIC: &[u8; 4] = b"RSKM";
const FORMAT_VERSION: u16 = 1;
const HEADER_SIZE: usize = 4 + 2 + 4 + 8;
const CHECKSUM_SIZE: usize = 4;

/// Provenance of a trained model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingMetadata {
    pub trained_at: DateTime<Utc>,
    pub n_train: usize,
    pub n_test: usize,
    /// Held-out accuracy (`None` when the test split was empty).
    pub accuracy: Option<f64>,
    pub seed: u64,
    pub n_trees: usize,
    pub dataset: String,
}

/// Everything needed to score an applicant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelBundle {
    pub schema: u32,
    pub scaler: StandardScaler,
    pub forest: RandomForest,
    pub metadata: TrainingMetadata,
}

impl ModelBundle {
    pub fn new(scaler: StandardScaler, forest: RandomForest, metadata: TrainingMetadata) -> Self {
        Self {
            schema: schema_tag(),
            scaler,
            forest,
            metadata,
        }
    }

    /// Scaled model vector for `input`.
    pub fn prepare(&self, input: &ApplicantInput) -> EncodedVector {
        self.scaler.transform(&assemble(input))
    }
}

/// Tag identifying the feature order and code tables this build uses.
pub fn schema_tag() -> u32 {
    let mut text = FEATURE_NAMES.join(",");
    text.push('|');
    text.push_str(&encoding_fingerprint());
    crc32(text.as_bytes())
}

/// Serialize `bundle` and atomically replace `path`.
pub fn save_model(path: &Path, bundle: &ModelBundle) -> Result<(), AppError> {
    let bytes = encode_bundle(bundle)?;

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)
        .map_err(|e| AppError::storage(format!("Failed to create directory '{}': {e}", dir.display())))?;

    let mut tmp = NamedTempFile::new_in(dir)
        .map_err(|e| AppError::storage(format!("Failed to create temp file in '{}': {e}", dir.display())))?;
    tmp.write_all(&bytes)
        .map_err(|e| AppError::storage(format!("Failed to write model: {e}")))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| AppError::storage(format!("Failed to sync model: {e}")))?;
    tmp.persist(path)
        .map_err(|e| AppError::storage(format!("Failed to replace model '{}': {e}", path.display())))?;

    info!(path = %path.display(), bytes = bytes.len(), "model saved");
    Ok(())
}

/// Load and verify a model artifact.
pub fn load_model(path: &Path) -> Result<ModelBundle, AppError> {
    let bytes = fs::read(path).map_err(|e| {
        AppError::invalid(format!(
            "Failed to read model '{}': {e}. Train one with `risk train`.",
            path.display()
        ))
    })?;
    let bundle = decode_bundle(&bytes)?;
    debug!(
        path = %path.display(),
        trees = bundle.forest.n_trees(),
        trained_at = %bundle.metadata.trained_at,
        "model loaded"
    );
    Ok(bundle)
}

pub fn encode_bundle(bundle: &ModelBundle) -> Result<Vec<u8>, AppError> {
    let payload =
        bincode::serialize(bundle).map_err(|e| AppError::new(4, format!("Failed to serialize model: {e}")))?;

    let mut out = Vec::with_capacity(HEADER_SIZE + payload.len() + CHECKSUM_SIZE);
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    out.extend_from_slice(&bundle.schema.to_le_bytes());
    out.extend_from_slice(&(payload.len() as u64).to_le_bytes());
    out.extend_from_slice(&payload);
    let checksum = crc32(&out);
    out.extend_from_slice(&checksum.to_le_bytes());
    Ok(out)
}

pub fn decode_bundle(bytes: &[u8]) -> Result<ModelBundle, AppError> {
    if bytes.len() < HEADER_SIZE + CHECKSUM_SIZE {
        return Err(AppError::invalid(format!("Model file too small: {} bytes.", bytes.len())));
    }
    if &bytes[..4] != MAGIC {
        return Err(AppError::invalid("Not a model file (bad magic)."));
    }

    let body_end = bytes.len() - CHECKSUM_SIZE;
    let stored = u32::from_le_bytes(read_array(&bytes[body_end..]));
    let computed = crc32(&bytes[..body_end]);
    if stored != computed {
        return Err(AppError::invalid(format!(
            "Model file is corrupt (checksum {stored:08x}, computed {computed:08x})."
        )));
    }

    let version = u16::from_le_bytes(read_array(&bytes[4..6]));
    if version != FORMAT_VERSION {
        return Err(AppError::invalid(format!(
            "Unsupported model format version {version} (expected {FORMAT_VERSION})."
        )));
    }

    let schema = u32::from_le_bytes(read_array(&bytes[6..10]));
    let expected = schema_tag();
    if schema != expected {
        return Err(AppError::invalid(format!(
            "Model was trained with a different feature encoding (schema {schema:08x}, expected {expected:08x}). Retrain it."
        )));
    }

    let payload_len = u64::from_le_bytes(read_array(&bytes[10..18]));
    if payload_len != (body_end - HEADER_SIZE) as u64 {
        return Err(AppError::invalid("Model payload length does not match file size."));
    }

    let bundle: ModelBundle = bincode::deserialize(&bytes[HEADER_SIZE..body_end])
        .map_err(|e| AppError::invalid(format!("Failed to decode model payload: {e}")))?;
    if bundle.schema != schema {
        return Err(AppError::invalid("Model header and payload disagree on schema."));
    }
    Ok(bundle)
}

fn read_array<const N: usize>(slice: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&slice[..N]);
    out
}

/// CRC32 (IEEE polynomial).
fn crc32(data: &[u8]) -> u32 {
    const TABLE: [u32; 256] = {
        let mut table = [0u32; 256];
        let mut i = 0;
        while i < 256 {
            let mut crc = i as u32;
            let mut j = 0;
            while j < 8 {
                crc = if crc & 1 != 0 { (crc >> 1) ^ 0xEDB8_8320 } else { crc >> 1 };
                j += 1;
            }
            table[i] = crc;
            i += 1;
        }
        table
    };

    let mut crc = 0xFFFF_FFFF_u32;
    for &byte in data {
        crc = (crc >> 8) ^ TABLE[((crc ^ u32::from(byte)) & 0xFF) as usize];
    }
    !crc
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ForestParams;

    fn tiny_bundle() -> ModelBundle {
        let x: Vec<EncodedVector> = (0..20)
            .map(|i| [30.0 + i as f64, 40_000.0, 5_000.0, i as f64, 2.0, 1.0])
            .collect();
        let y: Vec<u8> = (0..20).map(|i| u8::from(i >= 10)).collect();
        let scaler = StandardScaler::fit(&x).unwrap();
        let params = ForestParams {
            n_trees: 5,
            ..ForestParams::default()
        };
        let forest = RandomForest::fit(&scaler.transform_all(&x), &y, &params).unwrap();
        let metadata = TrainingMetadata {
            trained_at: Utc::now(),
            n_train: 20,
            n_test: 0,
            accuracy: None,
            seed: 42,
            n_trees: 5,
            dataset: "test.csv".to_string(),
        };
        ModelBundle::new(scaler, forest, metadata)
    }

    #[test]
    fn crc32_matches_reference_value() {
        assert_eq!(crc32(b"123456789"), 0xCBF4_3926);
    }

    #[test]
    fn save_then_load_preserves_bundle() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.rkm");
        let bundle = tiny_bundle();
        save_model(&path, &bundle).unwrap();
        let loaded = load_model(&path).unwrap();
        assert_eq!(loaded, bundle);
    }

    #[test]
    fn flipped_byte_fails_checksum() {
        let mut bytes = encode_bundle(&tiny_bundle()).unwrap();
        let mid = bytes.len() / 2;
        bytes[mid] ^= 0xFF;
        let err = decode_bundle(&bytes).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(err.message().contains("corrupt"));
    }

    #[test]
    fn foreign_schema_is_rejected() {
        let mut bundle = tiny_bundle();
        bundle.schema ^= 1;
        let bytes = encode_bundle(&bundle).unwrap();
        let err = decode_bundle(&bytes).unwrap_err();
        assert!(err.message().contains("different feature encoding"));
    }

    #[test]
    fn bad_magic_and_truncation_are_rejected() {
        let mut bytes = encode_bundle(&tiny_bundle()).unwrap();
        assert!(decode_bundle(&bytes[..10]).is_err());
        bytes[0] = b'X';
        assert!(decode_bundle(&bytes).unwrap_err().message().contains("magic"));
    }

    #[test]
    fn missing_file_is_an_input_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_model(&dir.path().join("nope.rkm")).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
