use std::path::Path;

use serde::Deserialize;
use serde::Serialize;

use crate::RankbotError;
use crate::RankbotResult;
use crate::region::Tag;
use crate::schedule::EditWindow;
use crate::template::TemplateSet;

/// Default activity window for counting an admin as active, in days.
pub const DEFAULT_ADMIN_ACTIVE_DAYS: u32 = 60;

/// Supported config file locations in discovery order (highest precedence
/// first).
pub const CONFIG_FILE_CANDIDATES: [&str; 3] =
	["rankbot.toml", ".rankbot.toml", ".config/rankbot.toml"];

/// Configuration for one run: the pages to maintain, the record templates,
/// the region markers, admission limits, and the edit-restriction policies.
///
/// ```toml
/// languages = ["en"]
/// allowed_groups = ["sysop", "bureaucrat"]
///
/// [pages]
/// list = "Project:List of wikis"
///
/// [limits]
/// main_article = 100
/// main_image = 50
/// category_article = 20
/// category_image = 10
///
/// [templates]
/// list_record = ["List record", "%(visible)s", "code = %(code)s"]
///
/// [tags]
/// list = { start = "<!-- list start -->", end = "<!-- list end -->" }
///
/// [edit_restriction.list]
/// once = "week"
/// days = [7]
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RankbotConfig {
	/// Content languages accepted onto the list.
	pub languages: Vec<String>,
	/// Groups whose members may hand-edit the list page.
	#[serde(default)]
	pub allowed_groups: Vec<String>,
	/// Individual users who may hand-edit the list page.
	#[serde(default)]
	pub allowed_users: Vec<String>,
	/// Days of inactivity after which an admin stops counting as active.
	#[serde(default = "default_admin_active_days")]
	pub admin_active_days: u32,
	pub pages: PagesConfig,
	pub limits: LimitsConfig,
	pub templates: TemplatesConfig,
	pub tags: TagsConfig,
	pub edit_restriction: EditRestrictionConfig,
	#[serde(default)]
	pub messages: Messages,
}

fn default_admin_active_days() -> u32 {
	DEFAULT_ADMIN_ACTIVE_DAYS
}

/// The pages a run touches. Category ranking pages embed a `%(category)s`
/// placeholder filled per category.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PagesConfig {
	/// The list page, the run's anchor.
	pub list: String,
	/// Talk page carrying the intake queue. Intake is skipped when absent.
	#[serde(default)]
	pub list_talk: Option<String>,
	/// Static column page regenerated from the list row count.
	#[serde(default)]
	pub list_column: Option<String>,
	/// Static column page regenerated from the category row count.
	#[serde(default)]
	pub list_cat_column: Option<String>,
	pub ranking_main_article: String,
	pub ranking_main_image: String,
	pub ranking_category_article: String,
	pub ranking_category_image: String,
}

impl PagesConfig {
	/// Fill the `%(category)s` placeholder of a category ranking page name.
	pub fn category_page(template: &str, category: &str) -> String {
		template.replace("%(category)s", category)
	}
}

/// Minimum counts for ranking admission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct LimitsConfig {
	pub main_article: u64,
	pub main_image: u64,
	pub category_article: u64,
	pub category_image: u64,
}

/// Template specs, each a template name followed by its field specs. The
/// lists deserialize straight into [`crate::TemplateSchema`]s.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TemplatesConfig {
	pub list_record: Vec<String>,
	pub category_record: Vec<String>,
	pub ranking_record: Vec<String>,
}

impl TemplatesConfig {
	/// Build the process-wide template cache from the configured specs.
	pub fn template_set(&self) -> RankbotResult<TemplateSet> {
		TemplateSet::from_specs([
			("list_record", self.list_record.as_slice()),
			("category_record", self.category_record.as_slice()),
			("ranking_record", self.ranking_record.as_slice()),
		])
	}
}

/// Region markers. A document's tagged regions are disjoint and unnested;
/// only the first occurrence of each marker counts.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TagsConfig {
	/// The list region on the list page.
	pub list: Tag,
	/// The category summary region on the list page.
	pub categories: Tag,
	/// The intake queue region on the talk page.
	pub talk: Tag,
	/// Column regions on ranking pages, probed in order until one is
	/// missing.
	pub ranking_columns: Vec<Tag>,
}

/// Per-region edit-restriction policies.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct EditRestrictionConfig {
	pub list: EditWindow,
	pub ranking: EditWindow,
}

/// Edit summaries and user-facing notes, overridable per deployment.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Messages {
	pub setting_update_summary: String,
	pub talk_update_summary: String,
	pub list_update_summary: String,
	pub ranking_update_summary: String,
	/// Carries a `%(count)d` placeholder for the row count.
	pub column_update_summary: String,
	/// Carries `%(languages)s` and `%(lang)s` placeholders.
	pub wrong_language: String,
	pub no_wiki: String,
	pub on_the_list: String,
}

impl Default for Messages {
	fn default() -> Self {
		Self {
			setting_update_summary: "Robot: Updating settings".into(),
			talk_update_summary: "Robot: Updating queue".into(),
			list_update_summary: "Robot: Updating wiki list".into(),
			ranking_update_summary: "Robot: Updating wiki ranking".into(),
			column_update_summary: "Robot: Updating static column. Row count: %(count)d".into(),
			wrong_language: "Only wikis in one of the listed languages (%(languages)s) - given: \
			                 %(lang)s"
				.into(),
			no_wiki: "wiki doesn't exist".into(),
			on_the_list: "already on the list".into(),
		}
	}
}

impl Messages {
	pub fn column_update_summary(&self, count: usize) -> String {
		self.column_update_summary
			.replace("%(count)d", &count.to_string())
	}

	pub fn wrong_language(&self, languages: &[String], lang: &str) -> String {
		self.wrong_language
			.replace("%(languages)s", &languages.join(", "))
			.replace("%(lang)s", lang)
	}
}

impl RankbotConfig {
	/// Load from an explicit TOML file.
	pub fn load(path: &Path) -> RankbotResult<Self> {
		let text = std::fs::read_to_string(path)?;
		toml::from_str(&text).map_err(|error| RankbotError::ConfigParse(error.to_string()))
	}

	/// Discover a config file under `root`, trying
	/// [`CONFIG_FILE_CANDIDATES`] in order.
	pub fn discover(root: &Path) -> RankbotResult<Self> {
		for candidate in CONFIG_FILE_CANDIDATES {
			let path = root.join(candidate);
			if path.is_file() {
				return Self::load(&path);
			}
		}

		Err(RankbotError::ConfigNotFound {
			searched: CONFIG_FILE_CANDIDATES.join(", "),
		})
	}

	/// Serialize as pretty JSON, the settings-blob exchange format.
	pub fn dump_json(&self) -> RankbotResult<String> {
		serde_json::to_string_pretty(self).map_err(|error| {
			RankbotError::ConfigParse(format!("failed to serialize config: {error}"))
		})
	}

	/// Parse the JSON settings-blob form.
	pub fn load_json(text: &str) -> RankbotResult<Self> {
		serde_json::from_str(text).map_err(|error| RankbotError::ConfigParse(error.to_string()))
	}
}
