use std::collections::HashMap;

use miette::Diagnostic;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::RankbotError;
use crate::RankbotResult;
use crate::revision::Revision;

/// Read/write access to the wiki's pages. Implementations own all transport
/// concerns; the engine only ever sees this surface and never blocks inside
/// itself.
pub trait DocumentStore {
	/// Full text of a page at a specific revision.
	fn text(&self, page: &str, revision: u64) -> RankbotResult<String>;

	/// Revision history of a page, newest first.
	fn history(&self, page: &str) -> RankbotResult<Vec<Revision>>;

	/// Id of the latest revision of a page.
	fn latest(&self, page: &str) -> RankbotResult<u64>;

	fn exists(&self, page: &str) -> bool;

	/// Groups a user belongs to, for author-eligibility checks. Unknown or
	/// unregistered users yield an empty list.
	fn user_groups(&self, user: &str) -> RankbotResult<Vec<String>>;

	/// Save new page text. An [`RankbotError::EditConflict`] is recoverable
	/// for the caller; anything else aborts the flush.
	fn save(&mut self, page: &str, text: &str, summary: &str) -> RankbotResult<()>;

	/// Text of the latest revision.
	fn latest_text(&self, page: &str) -> RankbotResult<String> {
		let revision = self.latest(page)?;
		self.text(page, revision)
	}
}

/// Why an entity lookup failed. The two "gone" shapes are deletion signals
/// for the list builder, not fatal errors; `Unavailable` covers transport
/// trouble and skips only the affected entity.
#[derive(Debug, Clone, Diagnostic, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum EntityError {
	#[error("entity not found: {0}")]
	#[diagnostic(code(rankbot::entity_not_found))]
	NotFound(String),

	#[error("entity closed: {0}")]
	#[diagnostic(code(rankbot::entity_closed))]
	Closed(String),

	#[error("entity lookup failed for `{code}`: {reason}")]
	#[diagnostic(code(rankbot::entity_unavailable))]
	Unavailable { code: String, reason: String },
}

impl EntityError {
	/// True for the shapes the list builder treats as "remove this entry".
	pub fn is_deletion(&self) -> bool {
		matches!(self, Self::NotFound(_) | Self::Closed(_))
	}
}

/// Identity of a remote entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityInfo {
	/// Canonical short code.
	pub code: String,
	/// Site display name.
	pub name: String,
	/// Canonical address of the entity's site.
	pub address: String,
	/// Content language code.
	pub language: String,
}

/// Countable statistics of a remote entity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityStats {
	pub articles: u64,
	pub images: u64,
	pub active_users: u64,
}

/// Per-entity lookups against the remote statistics service.
pub trait StatsSource {
	fn info(&mut self, code: &str) -> Result<EntityInfo, EntityError>;

	fn stats(&mut self, code: &str) -> Result<EntityStats, EntityError>;

	/// Number of privileged users with activity inside the window.
	fn active_admins(&mut self, code: &str, window_days: u32) -> Result<u32, EntityError>;
}

/// Memoizes [`StatsSource`] lookups for the lifetime of a run.
///
/// The cache is plain owned state injected wherever it is needed, so tests
/// can start empty or pre-seeded; nothing here is a process global.
pub struct StatsCache {
	source: Box<dyn StatsSource>,
	info: HashMap<String, Result<EntityInfo, EntityError>>,
	stats: HashMap<String, Result<EntityStats, EntityError>>,
	admins: HashMap<String, Result<u32, EntityError>>,
}

impl std::fmt::Debug for StatsCache {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("StatsCache")
			.field("info", &self.info.len())
			.field("stats", &self.stats.len())
			.field("admins", &self.admins.len())
			.finish_non_exhaustive()
	}
}

impl StatsCache {
	pub fn new(source: Box<dyn StatsSource>) -> Self {
		Self {
			source,
			info: HashMap::new(),
			stats: HashMap::new(),
			admins: HashMap::new(),
		}
	}
}

impl StatsSource for StatsCache {
	fn info(&mut self, code: &str) -> Result<EntityInfo, EntityError> {
		if let Some(cached) = self.info.get(code) {
			return cached.clone();
		}

		let result = self.source.info(code);
		self.info.insert(code.to_string(), result.clone());
		result
	}

	fn stats(&mut self, code: &str) -> Result<EntityStats, EntityError> {
		if let Some(cached) = self.stats.get(code) {
			return cached.clone();
		}

		let result = self.source.stats(code);
		self.stats.insert(code.to_string(), result.clone());
		result
	}

	fn active_admins(&mut self, code: &str, window_days: u32) -> Result<u32, EntityError> {
		if let Some(cached) = self.admins.get(code) {
			return cached.clone();
		}

		let result = self.source.active_admins(code, window_days);
		self.admins.insert(code.to_string(), result.clone());
		result
	}
}

/// A page write waiting for the end-of-run flush.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedWrite {
	pub page: String,
	/// The new page text, already trimmed.
	pub text: String,
	/// The text the update was computed from, kept for diff display.
	pub old_text: String,
	pub summary: String,
}

/// Queues page writes during the compute stages and applies them only after
/// the whole run succeeded, so a failure partway through never leaves a
/// half-rewritten page behind.
#[derive(Debug, Default)]
pub struct WriteQueue {
	entries: Vec<QueuedWrite>,
}

impl WriteQueue {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn entries(&self) -> &[QueuedWrite] {
		&self.entries
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	/// Queue a write. Both sides are compared trimmed; an unchanged page is
	/// skipped rather than queued.
	pub fn push(
		&mut self,
		page: impl Into<String>,
		new_text: &str,
		old_text: &str,
		summary: impl Into<String>,
	) {
		let page = page.into();
		let new_text = new_text.trim();
		let old_text = old_text.trim();

		if new_text == old_text {
			tracing::info!(%page, "no changes necessary");
			return;
		}

		let delta = new_text.len() as i64 - old_text.len() as i64;
		tracing::info!(%page, delta, "queueing page update");

		self.entries.push(QueuedWrite {
			page,
			text: new_text.to_string(),
			old_text: old_text.to_string(),
			summary: summary.into(),
		});
	}

	/// Save every queued write in order. An edit conflict on one page is
	/// logged and the rest of the queue continues; any other save failure
	/// aborts. Returns the number of pages saved.
	pub fn flush(&mut self, store: &mut dyn DocumentStore) -> RankbotResult<usize> {
		let mut saved = 0;

		for entry in self.entries.drain(..) {
			tracing::info!(page = %entry.page, summary = %entry.summary, "saving page");

			match store.save(&entry.page, &entry.text, &entry.summary) {
				Ok(()) => saved += 1,
				Err(RankbotError::EditConflict(page)) => {
					tracing::warn!(%page, "edit conflict, skipping");
				}
				Err(error) => return Err(error),
			}
		}

		Ok(saved)
	}
}
