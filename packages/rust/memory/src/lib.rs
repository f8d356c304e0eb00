//! Publishing extracted records to a memory store.
//!
//! [`Publisher`] builds the observation text and decides create-vs-append;
//! the [`MemoryStore`] trait is the seam to the actual backend. Two stores
//! ship here: [`HttpMemory`] for a real memory service, and [`NullMemory`],
//! a placeholder that only logs what it would do (useful until a backend
//! is wired up, and the default when no endpoint is configured).

mod http;

use async_trait::async_trait;
use tracing::{info, instrument};

use transync_shared::{MeetingRecord, Result};

pub use http::HttpMemory;

/// How many main topics make it into one observation.
const MAX_TOPICS: usize = 3;

// ---------------------------------------------------------------------------
// MemoryStore trait
// ---------------------------------------------------------------------------

/// An entity/observation store.
#[async_trait]
pub trait MemoryStore: Send + Sync {
    /// Whether an entity with this name already exists.
    async fn exists(&self, entity: &str) -> Result<bool>;

    /// Create a new entity with its initial observations.
    async fn create_entity(
        &self,
        entity: &str,
        kind: &str,
        observations: &[String],
    ) -> Result<()>;

    /// Append one observation to an existing entity.
    async fn add_observation(&self, entity: &str, observation: &str) -> Result<()>;
}

// ---------------------------------------------------------------------------
// Publisher
// ---------------------------------------------------------------------------

/// Pushes one observation per record into the store, creating the owner's
/// entity on first contact.
pub struct Publisher<M> {
    store: M,
    entity_kind: String,
}

impl<M: MemoryStore> Publisher<M> {
    pub fn new(store: M, entity_kind: impl Into<String>) -> Self {
        Self {
            store,
            entity_kind: entity_kind.into(),
        }
    }

    /// Publish a record under the given owner.
    #[instrument(skip_all, fields(owner))]
    pub async fn publish(&self, owner: &str, record: &MeetingRecord) -> Result<()> {
        let entity = entity_name(owner);
        let observation = observation_text(record);

        if self.store.exists(&entity).await? {
            self.store.add_observation(&entity, &observation).await?;
        } else {
            self.store
                .create_entity(&entity, &self.entity_kind, &[observation])
                .await?;
        }
        Ok(())
    }
}

/// Normalize an owner name into an entity key: whitespace becomes `_`.
/// Idempotent, so already-normalized names pass through unchanged.
pub fn entity_name(owner: &str) -> String {
    owner.split_whitespace().collect::<Vec<_>>().join("_")
}

/// Render one record as a single observation line:
/// `<date>: Discussed <up to 3 topics>. <first key context> Potential follow-up: <first implied work>`
/// Clauses are omitted when their source list is empty; a missing date
/// becomes the literal `Unknown date`.
pub fn observation_text(record: &MeetingRecord) -> String {
    let mut parts = Vec::new();

    let date = record.date.as_deref().unwrap_or("Unknown date");
    parts.push(format!("{date}:"));

    if !record.main_topics.is_empty() {
        let topics = record
            .main_topics
            .iter()
            .take(MAX_TOPICS)
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ");
        parts.push(format!("Discussed {topics}."));
    }

    if let Some(context) = record.key_context.first() {
        parts.push(context.clone());
    }

    if let Some(work) = record.implied_work.first() {
        parts.push(format!("Potential follow-up: {work}"));
    }

    parts.join(" ")
}

// ---------------------------------------------------------------------------
// NullMemory
// ---------------------------------------------------------------------------

/// Placeholder store: reports every entity as absent and logs each write.
pub struct NullMemory;

#[async_trait]
impl MemoryStore for NullMemory {
    async fn exists(&self, _entity: &str) -> Result<bool> {
        Ok(false)
    }

    async fn create_entity(
        &self,
        entity: &str,
        kind: &str,
        observations: &[String],
    ) -> Result<()> {
        info!(entity, kind, ?observations, "would create entity");
        Ok(())
    }

    async fn add_observation(&self, entity: &str, observation: &str) -> Result<()> {
        info!(entity, observation, "would add observation");
        Ok(())
    }
}
