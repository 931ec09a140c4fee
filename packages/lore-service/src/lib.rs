pub mod access;
pub mod activity;
pub mod answer;
pub mod documents;
pub mod members;
pub mod memory;
pub mod registry;
pub mod search;
pub mod time_serde;
pub mod users;
pub mod workspaces;

mod error;

pub use error::{Error, Result};

use std::{collections::HashMap, future::Future, pin::Pin, sync::Arc};

use qdrant_client::qdrant::{Value, value::Kind};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use uuid::Uuid;

pub use activity::{ActivityResponse, ActivityScope, ListActivitiesRequest};
pub use documents::{
	DocumentResponse, IngestRequest, UploadDocumentRequest, UploadDocumentResponse,
};
pub use members::{AddMemberRequest, MemberResponse, RemoveMemberRequest, UpdateMemberRequest};
pub use memory::{
	CleanupMemoryRequest, CleanupMemoryResponse, MemoryResponse, QueryMemoryRequest,
	StoreMemoryRequest,
};
pub use registry::{CollectionHandle, CollectionRegistry, IndexEntry};
pub use search::{AskRequest, AskResponse, RetrievedPassage, SearchRequest, SourceRef};
pub use users::UserResponse;
pub use workspaces::{CreateWorkspaceRequest, UpdateWorkspaceRequest, WorkspaceResponse};

use lore_config::{Config, EmbeddingProviderConfig, LlmProviderConfig};
use lore_providers::{completion, embedding};
use lore_storage::{db::Db, qdrant::VectorIndex};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait EmbeddingProvider
where
	Self: Send + Sync,
{
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, lore_providers::Result<Vec<Vec<f32>>>>;
}

pub trait CompletionProvider
where
	Self: Send + Sync,
{
	fn complete<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		system: &'a str,
		user: &'a str,
	) -> BoxFuture<'a, lore_providers::Result<String>>;
}

#[derive(Clone)]
pub struct Providers {
	pub embedding: Arc<dyn EmbeddingProvider>,
	pub completion: Arc<dyn CompletionProvider>,
}

struct DefaultProviders;

impl EmbeddingProvider for DefaultProviders {
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, lore_providers::Result<Vec<Vec<f32>>>> {
		Box::pin(embedding::embed(cfg, texts))
	}
}

impl CompletionProvider for DefaultProviders {
	fn complete<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		system: &'a str,
		user: &'a str,
	) -> BoxFuture<'a, lore_providers::Result<String>> {
		Box::pin(completion::complete(cfg, system, user))
	}
}

impl Providers {
	pub fn new(
		embedding: Arc<dyn EmbeddingProvider>,
		completion: Arc<dyn CompletionProvider>,
	) -> Self {
		Self { embedding, completion }
	}
}

impl Default for Providers {
	fn default() -> Self {
		let provider = Arc::new(DefaultProviders);

		Self { embedding: provider.clone(), completion: provider }
	}
}

pub struct LoreService {
	pub cfg: Config,
	pub db: Db,
	pub registry: CollectionRegistry,
	pub providers: Providers,
}
impl LoreService {
	pub fn new(cfg: Config, db: Db, index: VectorIndex) -> Self {
		Self::with_providers(cfg, db, index, Providers::default())
	}

	pub fn with_providers(cfg: Config, db: Db, index: VectorIndex, providers: Providers) -> Self {
		let registry = CollectionRegistry::new(
			index,
			cfg.storage.qdrant.clone(),
			cfg.providers.embedding.clone(),
			providers.embedding.clone(),
		);

		Self { cfg, db, registry, providers }
	}
}

pub(crate) fn payload_str<'p>(payload: &'p HashMap<String, Value>, key: &str) -> Option<&'p str> {
	match payload.get(key)?.kind.as_ref()? {
		Kind::StringValue(text) => Some(text.as_str()),
		_ => None,
	}
}

pub(crate) fn payload_uuid(payload: &HashMap<String, Value>, key: &str) -> Option<Uuid> {
	payload_str(payload, key).and_then(|text| Uuid::parse_str(text).ok())
}

/// True when the payload marks a memory entry whose expiry has passed. This is the vector-index
/// half of the double expiry check; relational reads re-check independently.
pub(crate) fn payload_memory_expired(
	payload: &HashMap<String, Value>,
	now: OffsetDateTime,
) -> bool {
	if payload_str(payload, "type") != Some("memory") {
		return false;
	}

	let Some(raw) = payload_str(payload, "expires_at") else {
		return false;
	};

	match OffsetDateTime::parse(raw, &Rfc3339) {
		Ok(at) => at <= now,
		Err(_) => false,
	}
}
