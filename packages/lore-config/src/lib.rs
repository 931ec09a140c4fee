mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Chunking, Config, EmbeddingProviderConfig, LlmProviderConfig, Postgres, Providers, Qdrant,
	Retrieval, Service, Storage,
};

use std::{fs, path::Path};

const DEFAULT_COLLECTION_PREFIX: &str = "ws_";

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.storage.postgres.dsn.trim().is_empty() {
		return Err(Error::Validation {
			message: "storage.postgres.dsn must be non-empty.".to_string(),
		});
	}
	if cfg.storage.postgres.pool_max_conns == 0 {
		return Err(Error::Validation {
			message: "storage.postgres.pool_max_conns must be greater than zero.".to_string(),
		});
	}
	if cfg.storage.qdrant.url.trim().is_empty() {
		return Err(Error::Validation {
			message: "storage.qdrant.url must be non-empty.".to_string(),
		});
	}
	if cfg.storage.qdrant.vector_dim == 0 {
		return Err(Error::Validation {
			message: "storage.qdrant.vector_dim must be greater than zero.".to_string(),
		});
	}
	if cfg.providers.embedding.dimensions == 0 {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must be greater than zero.".to_string(),
		});
	}
	if cfg.providers.embedding.dimensions != cfg.storage.qdrant.vector_dim {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must match storage.qdrant.vector_dim."
				.to_string(),
		});
	}
	if !cfg.providers.llm.temperature.is_finite() {
		return Err(Error::Validation {
			message: "providers.llm.temperature must be a finite number.".to_string(),
		});
	}
	if cfg.providers.llm.temperature < 0.0 {
		return Err(Error::Validation {
			message: "providers.llm.temperature must be zero or greater.".to_string(),
		});
	}

	for (label, provider_timeout) in [
		("embedding", cfg.providers.embedding.timeout_ms),
		("llm", cfg.providers.llm.timeout_ms),
	] {
		if provider_timeout == 0 {
			return Err(Error::Validation {
				message: format!("Provider {label} timeout_ms must be greater than zero."),
			});
		}
	}
	for (label, key) in [
		("embedding", &cfg.providers.embedding.api_key),
		("llm", &cfg.providers.llm.api_key),
	] {
		if key.trim().is_empty() {
			return Err(Error::Validation {
				message: format!("Provider {label} api_key must be non-empty."),
			});
		}
	}

	if cfg.chunking.chunk_size == 0 {
		return Err(Error::Validation {
			message: "chunking.chunk_size must be greater than zero.".to_string(),
		});
	}
	if cfg.chunking.chunk_overlap >= cfg.chunking.chunk_size {
		return Err(Error::Validation {
			message: "chunking.chunk_overlap must be less than chunking.chunk_size.".to_string(),
		});
	}
	if cfg.retrieval.top_k == 0 {
		return Err(Error::Validation {
			message: "retrieval.top_k must be greater than zero.".to_string(),
		});
	}
	if cfg.retrieval.max_top_k < cfg.retrieval.top_k {
		return Err(Error::Validation {
			message: "retrieval.max_top_k must be at least retrieval.top_k.".to_string(),
		});
	}
	if cfg.retrieval.source_preview_chars == 0 {
		return Err(Error::Validation {
			message: "retrieval.source_preview_chars must be greater than zero.".to_string(),
		});
	}
	if cfg.retrieval.fallback_passages == 0 {
		return Err(Error::Validation {
			message: "retrieval.fallback_passages must be greater than zero.".to_string(),
		});
	}
	if cfg.retrieval.fallback_preview_chars == 0 {
		return Err(Error::Validation {
			message: "retrieval.fallback_preview_chars must be greater than zero.".to_string(),
		});
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	if cfg.storage.qdrant.collection_prefix.trim().is_empty() {
		cfg.storage.qdrant.collection_prefix = DEFAULT_COLLECTION_PREFIX.to_string();
	}
}
