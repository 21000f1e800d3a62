//! File-backed collaborators for offline runs.
//!
//! A site directory stands in for the remote wiki:
//!
//! ```text
//! <site>/
//!   rankbot.toml          config (discovered by the core loader)
//!   users.toml            [groups] table: user name → group list
//!   pages/*.toml          one document per page, revisions newest first
//!   entities/<code>.toml  statistics for one entity
//! ```
//!
//! Page files carry their own `title`, so file names are free-form:
//!
//! ```toml
//! title = "Project:List"
//!
//! [[revisions]]
//! id = 10
//! timestamp = "2015-05-28T09:30:00Z"
//! author = "Admin"
//! summary = "adding a wiki"
//! text = "..."
//! ```

use std::collections::HashMap;
use std::path::Path;
use std::path::PathBuf;

use chrono::DateTime;
use chrono::Utc;
use rankbot_core::RankbotError;
use rankbot_core::RankbotResult;
use rankbot_core::Revision;
use rankbot_core::site::DocumentStore;
use rankbot_core::site::EntityError;
use rankbot_core::site::EntityInfo;
use rankbot_core::site::EntityStats;
use rankbot_core::site::StatsSource;
use serde::Deserialize;
use serde::Serialize;

/// Author recorded on revisions the bot saves locally.
pub const BOT_AUTHOR: &str = "Rankbot";

#[derive(Debug, Serialize, Deserialize)]
struct PageDoc {
	title: String,
	#[serde(default)]
	revisions: Vec<RevisionDoc>,
}

#[derive(Debug, Serialize, Deserialize)]
struct RevisionDoc {
	id: u64,
	timestamp: DateTime<Utc>,
	author: String,
	summary: String,
	text: String,
}

#[derive(Debug, Default, Deserialize)]
struct UsersDoc {
	#[serde(default)]
	groups: HashMap<String, Vec<String>>,
}

fn config_error(path: &Path, error: impl std::fmt::Display) -> RankbotError {
	RankbotError::ConfigParse(format!("{}: {error}", path.display()))
}

/// Documents read from and written back to a site directory.
#[derive(Debug)]
pub struct FsStore {
	pages: HashMap<String, (PathBuf, PageDoc)>,
	groups: HashMap<String, Vec<String>>,
}

impl FsStore {
	/// Load every page file and the user group table from the site
	/// directory. A missing `pages/` directory or `users.toml` is simply
	/// empty, not an error.
	pub fn load(root: &Path) -> RankbotResult<Self> {
		let mut pages = HashMap::new();

		let pages_dir = root.join("pages");
		if pages_dir.is_dir() {
			for entry in std::fs::read_dir(&pages_dir)? {
				let path = entry?.path();
				if path.extension().and_then(|extension| extension.to_str()) != Some("toml") {
					continue;
				}

				let text = std::fs::read_to_string(&path)?;
				let doc: PageDoc =
					toml::from_str(&text).map_err(|error| config_error(&path, error))?;
				pages.insert(doc.title.clone(), (path, doc));
			}
		}

		let users_path = root.join("users.toml");
		let groups = if users_path.is_file() {
			let text = std::fs::read_to_string(&users_path)?;
			let doc: UsersDoc =
				toml::from_str(&text).map_err(|error| config_error(&users_path, error))?;
			doc.groups
		} else {
			HashMap::new()
		};

		Ok(Self { pages, groups })
	}

	fn page(&self, page: &str) -> RankbotResult<&PageDoc> {
		self.pages
			.get(page)
			.map(|(_, doc)| doc)
			.ok_or_else(|| RankbotError::PageMissing(page.to_string()))
	}
}

impl DocumentStore for FsStore {
	fn text(&self, page: &str, revision: u64) -> RankbotResult<String> {
		self.page(page)?
			.revisions
			.iter()
			.find(|rev| rev.id == revision)
			.map(|rev| rev.text.clone())
			.ok_or_else(|| RankbotError::PageMissing(page.to_string()))
	}

	fn history(&self, page: &str) -> RankbotResult<Vec<Revision>> {
		Ok(self
			.page(page)?
			.revisions
			.iter()
			.map(|rev| {
				Revision {
					id: rev.id,
					timestamp: rev.timestamp,
					author: rev.author.clone(),
					summary: rev.summary.clone(),
				}
			})
			.collect())
	}

	fn latest(&self, page: &str) -> RankbotResult<u64> {
		self.page(page)?
			.revisions
			.first()
			.map(|rev| rev.id)
			.ok_or_else(|| RankbotError::EmptyHistory(page.to_string()))
	}

	fn exists(&self, page: &str) -> bool {
		self.pages.contains_key(page)
	}

	fn user_groups(&self, user: &str) -> RankbotResult<Vec<String>> {
		Ok(self.groups.get(user).cloned().unwrap_or_default())
	}

	fn save(&mut self, page: &str, text: &str, summary: &str) -> RankbotResult<()> {
		let Some((path, doc)) = self.pages.get_mut(page) else {
			return Err(RankbotError::PageMissing(page.to_string()));
		};

		let id = doc
			.revisions
			.iter()
			.map(|rev| rev.id)
			.max()
			.unwrap_or_default()
			+ 1;
		doc.revisions.insert(
			0,
			RevisionDoc {
				id,
				timestamp: Utc::now(),
				author: BOT_AUTHOR.to_string(),
				summary: summary.to_string(),
				text: text.to_string(),
			},
		);

		let serialized = toml::to_string_pretty(doc)
			.map_err(|error| RankbotError::ConfigParse(error.to_string()))?;
		std::fs::write(path, serialized)?;

		Ok(())
	}
}

#[derive(Debug, Deserialize)]
struct EntityDoc {
	code: String,
	name: String,
	address: String,
	language: String,
	#[serde(default)]
	articles: u64,
	#[serde(default)]
	images: u64,
	#[serde(default)]
	active_users: u64,
	#[serde(default)]
	active_admins: u32,
	#[serde(default)]
	closed: bool,
}

/// Entity statistics read from `entities/<code>.toml` files. Lookups hit the
/// filesystem every time; wrap in a [`rankbot_core::site::StatsCache`] for a
/// run.
#[derive(Debug)]
pub struct FsStats {
	root: PathBuf,
}

impl FsStats {
	pub fn new(root: &Path) -> Self {
		Self {
			root: root.to_path_buf(),
		}
	}

	fn read(&self, code: &str) -> Result<EntityDoc, EntityError> {
		// Entity codes are subdomain labels; refuse anything that could
		// escape the entities directory.
		if code.is_empty() || !code.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
			return Err(EntityError::NotFound(code.to_string()));
		}

		let path = self.root.join("entities").join(format!("{code}.toml"));
		if !path.is_file() {
			return Err(EntityError::NotFound(code.to_string()));
		}

		let text = std::fs::read_to_string(&path).map_err(|error| {
			EntityError::Unavailable {
				code: code.to_string(),
				reason: error.to_string(),
			}
		})?;
		let doc: EntityDoc = toml::from_str(&text).map_err(|error| {
			EntityError::Unavailable {
				code: code.to_string(),
				reason: error.to_string(),
			}
		})?;

		if doc.closed {
			return Err(EntityError::Closed(code.to_string()));
		}

		Ok(doc)
	}
}

impl StatsSource for FsStats {
	fn info(&mut self, code: &str) -> Result<EntityInfo, EntityError> {
		let doc = self.read(code)?;
		Ok(EntityInfo {
			code: doc.code,
			name: doc.name,
			address: doc.address,
			language: doc.language,
		})
	}

	fn stats(&mut self, code: &str) -> Result<EntityStats, EntityError> {
		let doc = self.read(code)?;
		Ok(EntityStats {
			articles: doc.articles,
			images: doc.images,
			active_users: doc.active_users,
		})
	}

	fn active_admins(&mut self, code: &str, _window_days: u32) -> Result<u32, EntityError> {
		// The activity window is already folded into the stored count.
		self.read(code).map(|doc| doc.active_admins)
	}
}
