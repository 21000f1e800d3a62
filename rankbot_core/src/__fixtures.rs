use std::collections::BTreeSet;
use std::collections::HashMap;
use std::collections::HashSet;

use chrono::DateTime;
use chrono::TimeZone;
use chrono::Utc;

use crate::RankbotError;
use crate::RankbotResult;
use crate::config::EditRestrictionConfig;
use crate::config::LimitsConfig;
use crate::config::Messages;
use crate::config::PagesConfig;
use crate::config::RankbotConfig;
use crate::config::TagsConfig;
use crate::config::TemplatesConfig;
use crate::region::Tag;
use crate::revision::Revision;
use crate::schedule::EditWindow;
use crate::schedule::Periodicity;
use crate::site::DocumentStore;
use crate::site::EntityError;
use crate::site::EntityInfo;
use crate::site::EntityStats;
use crate::site::StatsSource;
use crate::template::TemplateSet;

/// TOML form of [`sample_config`], used by the config loading tests.
pub const SAMPLE_CONFIG_TOML: &str = r#"
languages = ["en"]
allowed_groups = ["sysop"]

[pages]
list = "Project:List"
list_talk = "Project talk:List"
list_column = "Template:List column"
ranking_main_article = "Project:Ranking/Articles"
ranking_main_image = "Project:Ranking/Images"
ranking_category_article = "Project:Ranking/%(category)s/Articles"
ranking_category_image = "Project:Ranking/%(category)s/Images"

[limits]
main_article = 50
main_image = 10
category_article = 50
category_image = 10

[templates]
list_record = ["Wiki list record", "%(visible)s", "code = %(code)s", "display = %(display)s", "address = %(address)s", "categories = %(categories)s", "articles = %(articles)s", "images = %(images)s", "users = %(users)s", "admins = %(admins)s"]
category_record = ["Category record", "%(name)s", "articles = %(articles)s", "artcount = %(artcount)s", "images = %(images)s", "imgcount = %(imgcount)s"]
ranking_record = ["Ranking record", "%(place)s", "%(move)s", "%(count)s", "code = %(code)s", "name = %(name)s"]

[tags]
list = { start = "<!-- LIST START -->", end = "<!-- LIST END -->" }
categories = { start = "<!-- CATS START -->", end = "<!-- CATS END -->" }
talk = { start = "<!-- QUEUE START -->", end = "<!-- QUEUE END -->" }
ranking_columns = [
	{ start = "<!-- COL1 -->", end = "<!-- /COL1 -->" },
	{ start = "<!-- COL2 -->", end = "<!-- /COL2 -->" },
]

[edit_restriction.list]
once = "week"
days = [4]

[edit_restriction.ranking]
once = "week"
days = [4]
"#;

/// Thursday, 2015-06-04, ISO week 23. The fixture's "now".
pub fn now() -> DateTime<Utc> {
	Utc.with_ymd_and_hms(2015, 6, 4, 12, 0, 0).unwrap()
}

pub fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
	Utc.with_ymd_and_hms(year, month, day, 9, 30, 0).unwrap()
}

pub fn revision(id: u64, timestamp: DateTime<Utc>, author: &str, summary: &str) -> Revision {
	Revision {
		id,
		timestamp,
		author: author.to_string(),
		summary: summary.to_string(),
	}
}

pub fn strings(values: &[&str]) -> Vec<String> {
	values.iter().map(|value| (*value).to_string()).collect()
}

pub fn sample_config() -> RankbotConfig {
	RankbotConfig {
		languages: strings(&["en"]),
		allowed_groups: strings(&["sysop"]),
		allowed_users: vec![],
		admin_active_days: 60,
		pages: PagesConfig {
			list: "Project:List".into(),
			list_talk: Some("Project talk:List".into()),
			list_column: Some("Template:List column".into()),
			list_cat_column: None,
			ranking_main_article: "Project:Ranking/Articles".into(),
			ranking_main_image: "Project:Ranking/Images".into(),
			ranking_category_article: "Project:Ranking/%(category)s/Articles".into(),
			ranking_category_image: "Project:Ranking/%(category)s/Images".into(),
		},
		limits: LimitsConfig {
			main_article: 50,
			main_image: 10,
			category_article: 50,
			category_image: 10,
		},
		templates: TemplatesConfig {
			list_record: strings(&[
				"Wiki list record",
				"%(visible)s",
				"code = %(code)s",
				"display = %(display)s",
				"address = %(address)s",
				"categories = %(categories)s",
				"articles = %(articles)s",
				"images = %(images)s",
				"users = %(users)s",
				"admins = %(admins)s",
			]),
			category_record: strings(&[
				"Category record",
				"%(name)s",
				"articles = %(articles)s",
				"artcount = %(artcount)s",
				"images = %(images)s",
				"imgcount = %(imgcount)s",
			]),
			ranking_record: strings(&[
				"Ranking record",
				"%(place)s",
				"%(move)s",
				"%(count)s",
				"code = %(code)s",
				"name = %(name)s",
			]),
		},
		tags: TagsConfig {
			list: Tag::new("<!-- LIST START -->", "<!-- LIST END -->"),
			categories: Tag::new("<!-- CATS START -->", "<!-- CATS END -->"),
			talk: Tag::new("<!-- QUEUE START -->", "<!-- QUEUE END -->"),
			ranking_columns: vec![
				Tag::new("<!-- COL1 -->", "<!-- /COL1 -->"),
				Tag::new("<!-- COL2 -->", "<!-- /COL2 -->"),
			],
		},
		edit_restriction: EditRestrictionConfig {
			list: EditWindow {
				once: Periodicity::Week,
				days: BTreeSet::from([4]),
			},
			ranking: EditWindow {
				once: Periodicity::Week,
				days: BTreeSet::from([4]),
			},
		},
		messages: Messages::default(),
	}
}

pub fn sample_templates() -> TemplateSet {
	sample_config()
		.templates
		.template_set()
		.expect("fixture templates compile")
}

pub fn list_page_text() -> String {
	"== Wikis ==\n\
	 <!-- LIST START -->\n\
	 {{Wiki list record | Alpha Wiki \n\
	 | code = alpha\n\
	 | display = \n\
	 | address = http://alpha.wikia.com/\n\
	 | categories = games\n\
	 | articles = 100\n\
	 | images = 30\n\
	 | users = 4\n\
	 | admins = 2\n\
	 }}\n\
	 {{Wiki list record | Beta Wiki \n\
	 | code = beta\n\
	 | display = \n\
	 | address = http://beta.wikia.com/\n\
	 | categories = \n\
	 | articles = 70\n\
	 | images = 12\n\
	 | users = 2\n\
	 | admins = 1\n\
	 }}\n\
	 <!-- LIST END -->\n\
	 == Categories ==\n\
	 <!-- CATS START -->\n\
	 {{Category record | Games \n\
	 | articles = 0\n\
	 | artcount = 0\n\
	 | images = 0\n\
	 | imgcount = 0\n\
	 }}\n\
	 <!-- CATS END -->\n\
	 Footer stays untouched.\n"
		.to_string()
}

pub fn talk_page_text() -> String {
	"Intro text.\n\
	 <!-- QUEUE START -->\n\
	 * [[w:c:gamma|Gamma]] - games\n\
	 * [[w:c:delta]]\n\
	 * [[w:c:alpha|Alpha]]\n\
	 * [http://epsilon.wikia.com Epsilon Wiki]\n\
	 <!-- QUEUE END -->\n\
	 Later discussion.\n\
	 Check out http://zeta.wikia.com please\n"
		.to_string()
}

pub fn ranking_page_text() -> String {
	"Top wikis by articles as of <span class=\"stamp\" id=\"data\">28 May 2015</span>, counting \
	 <span class=\"stamp\" id=\"licznik\">2</span> wikis.\n\
	 <!-- COL1 -->\n\
	 {{Ranking record | 2   | ** |      70 \n\
	 | code = beta\n\
	 | name = Beta Wiki\n\
	 }}\n\
	 <!-- /COL1 -->\n\
	 <!-- COL2 -->\n\
	 {{Ranking record | 1   | ** |     100 \n\
	 | code = alpha\n\
	 | name = Alpha Wiki\n\
	 }}\n\
	 <!-- /COL2 -->\n\
	 Footer stays untouched.\n"
		.to_string()
}

pub fn column_page_text() -> String {
	"Noinclude docs.<onlyinclude>old rows</onlyinclude>\n".to_string()
}

/// An in-memory document store seeded by the tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
	pub texts: HashMap<(String, u64), String>,
	pub histories: HashMap<String, Vec<Revision>>,
	pub groups: HashMap<String, Vec<String>>,
	pub conflicts: HashSet<String>,
	pub saved: Vec<(String, String, String)>,
}

impl MemoryStore {
	/// Register a page with its revisions, newest first.
	pub fn add_page(&mut self, page: &str, revisions: Vec<(Revision, String)>) {
		let mut history = vec![];
		for (revision, text) in revisions {
			self.texts.insert((page.to_string(), revision.id), text);
			history.push(revision);
		}
		self.histories.insert(page.to_string(), history);
	}

	pub fn add_user(&mut self, user: &str, groups: &[&str]) {
		self.groups.insert(user.to_string(), strings(groups));
	}
}

impl DocumentStore for MemoryStore {
	fn text(&self, page: &str, revision: u64) -> RankbotResult<String> {
		self.texts
			.get(&(page.to_string(), revision))
			.cloned()
			.ok_or_else(|| RankbotError::PageMissing(page.to_string()))
	}

	fn history(&self, page: &str) -> RankbotResult<Vec<Revision>> {
		self.histories
			.get(page)
			.cloned()
			.ok_or_else(|| RankbotError::PageMissing(page.to_string()))
	}

	fn latest(&self, page: &str) -> RankbotResult<u64> {
		self.histories
			.get(page)
			.and_then(|history| history.first())
			.map(|revision| revision.id)
			.ok_or_else(|| RankbotError::PageMissing(page.to_string()))
	}

	fn exists(&self, page: &str) -> bool {
		self.histories.contains_key(page)
	}

	fn user_groups(&self, user: &str) -> RankbotResult<Vec<String>> {
		Ok(self.groups.get(user).cloned().unwrap_or_default())
	}

	fn save(&mut self, page: &str, text: &str, summary: &str) -> RankbotResult<()> {
		if self.conflicts.contains(page) {
			return Err(RankbotError::EditConflict(page.to_string()));
		}

		self.saved
			.push((page.to_string(), text.to_string(), summary.to_string()));
		Ok(())
	}
}

/// An in-memory statistics source seeded by the tests.
#[derive(Debug, Default)]
pub struct MemoryStats {
	pub entities: HashMap<String, (EntityInfo, EntityStats, u32)>,
	pub closed: HashSet<String>,
	pub lookups: usize,
}

impl MemoryStats {
	#[allow(clippy::too_many_arguments)]
	pub fn add(
		&mut self,
		code: &str,
		name: &str,
		language: &str,
		articles: u64,
		images: u64,
		active_users: u64,
		admins: u32,
	) {
		self.entities.insert(
			code.to_string(),
			(
				EntityInfo {
					code: code.to_string(),
					name: name.to_string(),
					address: format!("http://{code}.wikia.com"),
					language: language.to_string(),
				},
				EntityStats {
					articles,
					images,
					active_users,
				},
				admins,
			),
		);
	}

	fn lookup(&mut self, code: &str) -> Result<&(EntityInfo, EntityStats, u32), EntityError> {
		self.lookups += 1;

		if self.closed.contains(code) {
			return Err(EntityError::Closed(code.to_string()));
		}

		self.entities
			.get(code)
			.ok_or_else(|| EntityError::NotFound(code.to_string()))
	}
}

impl StatsSource for MemoryStats {
	fn info(&mut self, code: &str) -> Result<EntityInfo, EntityError> {
		self.lookup(code).map(|(info, _, _)| info.clone())
	}

	fn stats(&mut self, code: &str) -> Result<EntityStats, EntityError> {
		self.lookup(code).map(|(_, stats, _)| *stats)
	}

	fn active_admins(&mut self, code: &str, _window_days: u32) -> Result<u32, EntityError> {
		self.lookup(code).map(|(_, _, admins)| *admins)
	}
}

/// A fully seeded store matching [`sample_config`]: list page edited by an
/// eligible sysop, a talk page with proposals and a stray link, a
/// two-column article ranking last touched by the bot in ISO week 22, and a
/// static column page.
pub fn seeded_store() -> MemoryStore {
	let mut store = MemoryStore::default();
	store.add_user("Admin", &["sysop"]);
	store.add_user("Visitor", &[]);

	store.add_page(
		"Project:List",
		vec![(
			revision(
				10,
				at(2015, 5, 28),
				"Admin",
				"adding a wiki",
			),
			list_page_text(),
		)],
	);
	store.add_page(
		"Project talk:List",
		vec![(
			revision(20, at(2015, 6, 1), "Visitor", "new proposals"),
			talk_page_text(),
		)],
	);
	store.add_page(
		"Project:Ranking/Articles",
		vec![(
			revision(
				30,
				at(2015, 5, 28),
				"Listbot",
				"Robot: Updating wiki ranking",
			),
			ranking_page_text(),
		)],
	);
	store.add_page(
		"Template:List column",
		vec![(
			revision(40, at(2015, 5, 28), "Admin", "tweak"),
			column_page_text(),
		)],
	);

	store
}

/// Statistics matching [`seeded_store`]: the listed wikis plus the talk-page
/// proposals (delta closed, epsilon wrong language, zeta proposed lazily).
pub fn seeded_stats() -> MemoryStats {
	let mut stats = MemoryStats::default();
	stats.add("alpha", "Alpha Wiki", "en", 120, 40, 5, 2);
	stats.add("beta", "Beta Wiki", "en", 80, 15, 3, 1);
	stats.add("gamma", "Gamma Wiki", "en", 60, 12, 2, 1);
	stats.add("epsilon", "Epsilon Wiki", "de", 90, 20, 4, 1);
	stats.add("zeta", "Zeta Wiki", "en", 30, 5, 1, 1);
	stats.closed.insert("delta".to_string());
	stats
}
