use std::path::Path;

use tokenizers::{FromPretrainedParameters, Tokenizer};

use crate::DatasetError;

/// Environment variable holding a HuggingFace access token for gated tokenizers.
const HF_TOKEN_VAR: &str = "HF_TOKEN";

/// Counts the tokens of a piece of text.
pub trait TokenCounter {
    fn count(&self, text: &str) -> Result<usize, DatasetError>;
}

/// Approximates the token count by the number of whitespace separated words.
///
/// Only used when no processor is configured. It undercounts for sub-word tokenizers.
#[derive(Debug, Default, Clone, Copy)]
pub struct WhitespaceTokenCounter;

impl TokenCounter for WhitespaceTokenCounter {
    fn count(&self, text: &str) -> Result<usize, DatasetError> {
        Ok(text.split_whitespace().count())
    }
}

/// Counts tokens with a HuggingFace tokenizer, without special tokens.
pub struct HfTokenCounter {
    tokenizer: Tokenizer,
}

impl HfTokenCounter {
    /// Load a tokenizer from a `tokenizer.json` file, or from a directory that contains one.
    pub fn from_path(path: &Path) -> Result<Self, DatasetError> {
        let file = if path.is_dir() {
            path.join("tokenizer.json")
        } else {
            path.to_path_buf()
        };
        let tokenizer = Tokenizer::from_file(&file).map_err(|e| DatasetError::Tokenizer {
            path: file.clone(),
            message: e.to_string(),
        })?;
        Ok(Self { tokenizer })
    }

    /// Fetch the tokenizer of a model on the HuggingFace hub, for example `gpt2`.
    ///
    /// `HF_TOKEN` is used for gated models when it is set.
    pub fn from_pretrained(model_id: &str) -> Result<Self, DatasetError> {
        let params = FromPretrainedParameters {
            auth_token: std::env::var(HF_TOKEN_VAR).ok(),
            ..Default::default()
        };
        let tokenizer = Tokenizer::from_pretrained(model_id, Some(params)).map_err(|e| {
            DatasetError::Tokenizer {
                path: model_id.into(),
                message: e.to_string(),
            }
        })?;
        Ok(Self { tokenizer })
    }
}

impl TokenCounter for HfTokenCounter {
    fn count(&self, text: &str) -> Result<usize, DatasetError> {
        self.tokenizer
            .encode(text, false)
            .map(|encoding| encoding.get_ids().len())
            .map_err(|e| DatasetError::Tokenizer {
                path: "<loaded tokenizer>".into(),
                message: e.to_string(),
            })
    }
}

/// Pick a [`TokenCounter`] for the processor reference given on the command line.
///
/// A local `tokenizer.json`, or a directory holding one, is loaded from disk. Anything else is
/// treated as a hub model id. Whitespace counting is only used when there is no processor.
pub fn token_counter_for(processor: Option<&str>) -> Result<Box<dyn TokenCounter>, DatasetError> {
    let Some(processor) = processor else {
        log::warn!(
            "No processor configured, approximating output token counts by whitespace splitting"
        );
        return Ok(Box::new(WhitespaceTokenCounter));
    };

    let path = Path::new(processor);
    if path.is_file() || path.join("tokenizer.json").is_file() {
        log::info!("Loading tokenizer from {}", path.display());
        return Ok(Box::new(HfTokenCounter::from_path(path)?));
    }

    log::info!("Loading tokenizer for model {processor}");
    Ok(Box::new(HfTokenCounter::from_pretrained(processor)?))
}
