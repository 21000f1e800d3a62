use std::collections::BTreeMap;
use std::sync::OnceLock;

use chrono::DateTime;
use chrono::NaiveDate;
use chrono::Utc;
use regex_lite::Regex;

use crate::RankbotError;
use crate::RankbotResult;
use crate::codec;
use crate::codec::Record;
use crate::config::LimitsConfig;
use crate::config::PagesConfig;
use crate::config::RankbotConfig;
use crate::ranking;
use crate::ranking::Contender;
use crate::ranking::RankPolicy;
use crate::ranking::RankedEntry;
use crate::ranking::Snapshot;
use crate::region;
use crate::region::Tag;
use crate::revision;
use crate::schedule::EditWindow;
use crate::site::DocumentStore;
use crate::site::EntityError;
use crate::site::EntityInfo;
use crate::site::EntityStats;
use crate::site::StatsSource;
use crate::site::WriteQueue;
use crate::template::TemplateSet;

/// Flags steering one run. All default off.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
	/// Ignore the edit restriction on the list page.
	pub force_list: bool,
	/// Ignore the edit restriction on ranking pages.
	pub force_ranking: bool,
	/// Rank without movement markers.
	pub clean: bool,
	/// Only refresh the list; leave rankings alone.
	pub list_only: bool,
	/// Keep a recorded name as the display override when the canonical name
	/// has changed.
	pub save_old: bool,
	/// Compute everything but treat restrictions as advisory; the caller
	/// shows diffs instead of flushing the queue.
	pub simulate: bool,
	/// Pin ranking movement against the revision on or after this day.
	pub revision_day: Option<NaiveDate>,
}

/// What happened to one page. Skips and failures are page-scoped; the run
/// carries on with the remaining pages.
#[derive(Debug)]
#[non_exhaustive]
pub enum PageOutcome {
	/// A write was queued for the page.
	Updated,
	/// Nothing to do; the reason says why.
	Skipped(String),
	/// The page could not be processed.
	Failed(RankbotError),
}

#[derive(Debug)]
pub struct PageReport {
	pub page: String,
	pub outcome: PageOutcome,
}

/// Per-page outcomes of a run, in processing order.
#[derive(Debug, Default)]
pub struct RunReport {
	pub pages: Vec<PageReport>,
}

impl RunReport {
	fn record(&mut self, page: impl Into<String>, outcome: PageOutcome) {
		self.pages.push(PageReport {
			page: page.into(),
			outcome,
		});
	}

	pub fn failed(&self) -> impl Iterator<Item = &PageReport> {
		self.pages
			.iter()
			.filter(|report| matches!(report.outcome, PageOutcome::Failed(_)))
	}
}

/// Everything a run needs: the collaborators, configuration, the injected
/// template and statistics caches, the write queue, and the wall clock
/// pinned at startup.
pub struct RunContext<'c> {
	pub store: &'c dyn DocumentStore,
	pub stats: &'c mut dyn StatsSource,
	pub config: &'c RankbotConfig,
	pub templates: &'c mut TemplateSet,
	pub queue: &'c mut WriteQueue,
	pub now: DateTime<Utc>,
	pub options: RunOptions,
}

/// A fully refreshed list row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListEntry {
	pub code: String,
	pub name: String,
	/// Display-name override; empty when the canonical name is shown.
	pub display: String,
	pub address: String,
	pub categories: Vec<String>,
	pub articles: u64,
	pub images: u64,
	pub users: u64,
	pub admins: u32,
}

impl ListEntry {
	/// The name shown on the list: the display override when set, the
	/// canonical name otherwise.
	pub fn visible(&self) -> &str {
		if self.display.is_empty() {
			&self.name
		} else {
			&self.display
		}
	}

	/// The record for the list template.
	pub fn to_record(&self) -> Record {
		Record::from_iter([
			("code", self.code.clone()),
			("name", self.name.clone()),
			("display", self.display.clone()),
			("visible", self.visible().to_string()),
			("address", self.address.clone()),
			("categories", self.categories.join(", ")),
			("articles", self.articles.to_string()),
			("images", self.images.to_string()),
			("users", self.users.to_string()),
			("admins", self.admins.to_string()),
		])
	}
}

/// Per-category aggregates over the refreshed list. Only entries meeting the
/// category admission limits contribute to the averages.
#[derive(Debug, Clone, PartialEq)]
pub struct CategorySummary {
	pub name: String,
	/// Average article count over contributing entries, rounded to two
	/// decimals.
	pub articles: f64,
	pub artcount: u32,
	/// Average image count over contributing entries, rounded to two
	/// decimals.
	pub images: f64,
	pub imgcount: u32,
}

impl CategorySummary {
	pub fn to_record(&self) -> Record {
		Record::from_iter([
			("name", self.name.clone()),
			("articles", self.articles.to_string()),
			("artcount", self.artcount.to_string()),
			("images", self.images.to_string()),
			("imgcount", self.imgcount.to_string()),
		])
	}
}

/// A proposal accepted from the intake queue on the talk page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntakeEntry {
	pub code: String,
	/// Label the proposer used; kept as display override when it differs
	/// from the canonical name.
	pub label: String,
	pub categories: Vec<String>,
}

/// The list page's parsed base revision.
#[derive(Debug)]
pub struct ListBase {
	pub revision: u64,
	pub text: String,
	/// Normalized (lowercased) category names, in parse order.
	pub categories: Vec<String>,
	/// Raw category records, kept for the summary render.
	pub category_records: Vec<Record>,
	/// List records as parsed, code derived where necessary.
	pub records: Vec<Record>,
	/// Codes already on the list.
	pub codes: Vec<String>,
}

/// Which count a ranking orders by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankingKind {
	Articles,
	Images,
}

impl RankingKind {
	fn count(self, entry: &ListEntry) -> u64 {
		match self {
			Self::Articles => entry.articles,
			Self::Images => entry.images,
		}
	}
}

/// Run the whole pipeline: select the list base revision, fold in the talk
/// page intake, refresh the list and its static column pages, then every
/// ranking page. All writes land on the queue; flushing is the caller's
/// final step so a failure here never leaves a half-written page.
pub fn run(ctx: &mut RunContext<'_>) -> RankbotResult<RunReport> {
	let mut report = RunReport::default();
	let list_page = ctx.config.pages.list.clone();

	if !ctx.store.exists(&list_page) {
		return Err(RankbotError::PageMissing(list_page));
	}

	if !ctx.options.force_list {
		if let Err(error) = check_edit_restriction(
			ctx.store,
			&list_page,
			&ctx.config.messages.list_update_summary,
			&ctx.config.edit_restriction.list,
			ctx.now,
		) {
			if ctx.options.simulate && matches!(error, RankbotError::EditRestricted { .. }) {
				tracing::info!(%error, "simulation enabled, continuing despite edit restriction");
			} else {
				return Err(error);
			}
		}
	}

	let base = select_list_revision(ctx)?;

	let intake = match process_talk(ctx, &base) {
		Ok(intake) => intake,
		Err(error) => {
			tracing::warn!(%error, "intake queue could not be processed");
			if let Some(talk) = &ctx.config.pages.list_talk {
				report.record(talk.clone(), PageOutcome::Failed(error));
			}
			vec![]
		}
	};

	let entries = refresh_list(ctx, &base, &intake)?;
	report.record(list_page, PageOutcome::Updated);

	if ctx.options.list_only {
		return Ok(report);
	}

	let pages = &ctx.config.pages;
	let mut rankings = vec![
		(
			pages.ranking_main_article.clone(),
			RankingKind::Articles,
			None,
		),
		(pages.ranking_main_image.clone(), RankingKind::Images, None),
	];
	for category in &base.categories {
		rankings.push((
			PagesConfig::category_page(&pages.ranking_category_article, category),
			RankingKind::Articles,
			Some(category.clone()),
		));
		rankings.push((
			PagesConfig::category_page(&pages.ranking_category_image, category),
			RankingKind::Images,
			Some(category.clone()),
		));
	}

	for (page, kind, category) in rankings {
		let outcome = match refresh_ranking(ctx, &page, kind, category.as_deref(), &entries) {
			Ok(outcome) => outcome,
			Err(error) => {
				tracing::warn!(%page, %error, "ranking page failed");
				PageOutcome::Failed(error)
			}
		};
		report.record(page, outcome);
	}

	Ok(report)
}

/// Decide whether the bot may edit a page now. The gate walks history for
/// the newest revision carrying the bot's own summary and feeds its
/// timestamp to the policy; a page with no such revision is unrestricted.
pub fn check_edit_restriction(
	store: &dyn DocumentStore,
	page: &str,
	summary: &str,
	window: &EditWindow,
	now: DateTime<Utc>,
) -> RankbotResult<()> {
	tracing::debug!(page, "checking edit restriction");
	let history = store.history(page)?;

	match revision::select_where(page, &history, |revision| revision.summary == summary) {
		Ok(revision) => {
			tracing::debug!(page, timestamp = %revision.timestamp, "last automated edit");
			window.check(revision.timestamp, now)
		}
		Err(RankbotError::EmptyHistory(_) | RankbotError::NoQualifyingRevision { .. }) => Ok(()),
		Err(error) => Err(error),
	}
}

fn author_eligible(
	store: &dyn DocumentStore,
	config: &RankbotConfig,
	author: &str,
) -> RankbotResult<bool> {
	if config.allowed_users.iter().any(|user| user == author) {
		return Ok(true);
	}

	let groups = store.user_groups(author)?;
	Ok(groups
		.iter()
		.any(|group| config.allowed_groups.contains(group)))
}

/// Walk the list page's history newest-first for a usable base revision: the
/// author must be eligible and the list region must yield records. A
/// revision whose region matched record boundaries but produced nothing is
/// unusable; the walk falls back to the one before it.
pub fn select_list_revision(ctx: &mut RunContext<'_>) -> RankbotResult<ListBase> {
	let page = ctx.config.pages.list.clone();
	let history = ctx.store.history(&page)?;

	if history.is_empty() {
		return Err(RankbotError::EmptyHistory(page));
	}

	for revision in &history {
		if !author_eligible(ctx.store, ctx.config, &revision.author)? {
			tracing::warn!(
				revision = revision.id,
				author = %revision.author,
				"skipping revision, author not allowed to edit the list"
			);
			continue;
		}

		let text = ctx.store.text(&page, revision.id)?;
		match parse_list_revision(ctx, &text) {
			Ok((categories, category_records, records, codes)) => {
				tracing::info!(
					revision = revision.id,
					author = %revision.author,
					"using list revision"
				);
				return Ok(ListBase {
					revision: revision.id,
					text,
					categories,
					category_records,
					records,
					codes,
				});
			}
			Err(error) => {
				tracing::warn!(
					revision = revision.id,
					author = %revision.author,
					%error,
					"skipping revision, it produced an error"
				);
			}
		}
	}

	Err(RankbotError::OutOfRevisions(page))
}

type ParsedListRevision = (Vec<String>, Vec<Record>, Vec<Record>, Vec<String>);

fn parse_list_revision(ctx: &mut RunContext<'_>, text: &str) -> RankbotResult<ParsedListRevision> {
	let (categories, category_records) = {
		let template = ctx.templates.compiled("category_record")?;
		let content = region::extract(text, &ctx.config.tags.categories)?;
		let outcome = codec::parse_all(content, template);

		let categories: Vec<String> = outcome
			.records
			.iter()
			.filter_map(|record| record.field("name"))
			.map(|name| name.trim().to_lowercase())
			.collect();

		(categories, outcome.records)
	};

	let (records, codes) = {
		let template = ctx.templates.compiled("list_record")?;
		let content = region::extract(text, &ctx.config.tags.list)?;
		let outcome =
			codec::parse_all_with(content, template, |record| {
				derive_list_record(record, &categories)
			});

		if outcome.is_degenerate() {
			return Err(RankbotError::TemplateMismatch(template.name().to_string()));
		}

		let codes = outcome
			.records
			.iter()
			.filter_map(|record| record.field("code").map(str::to_string))
			.collect();

		(outcome.records, codes)
	};

	Ok((categories, category_records, records, codes))
}

/// Derivation hook for list records: infer `code` from the address when no
/// explicit code field was present, and normalize the category list against
/// the known set. A record with neither code nor a usable address is
/// dropped.
fn derive_list_record(record: &mut Record, known_categories: &[String]) -> bool {
	if record.field("code").is_none() {
		let Some(code) = record.field("address").and_then(code_from_address) else {
			return false;
		};
		record.set("code", code);
	}

	if let Some(raw) = record.field("categories") {
		let normalized = normalize_categories(raw, known_categories);
		record.set("categories", normalized.join(", "));
	}

	true
}

fn address_regex() -> &'static Regex {
	static ADDRESS: OnceLock<Regex> = OnceLock::new();
	ADDRESS.get_or_init(|| {
		Regex::new(r"(?i)https?://(?:www\.)?([^\s/.]+)\.wikia\.com")
			.expect("literal pattern compiles")
	})
}

/// Short entity code from a URL-shaped field.
fn code_from_address(address: &str) -> Option<String> {
	address_regex()
		.captures(address)
		.and_then(|captures| captures.get(1))
		.map(|code| code.as_str().trim().to_string())
}

/// Lowercase, trim, and keep only known categories, sorted.
fn normalize_categories(raw: &str, known: &[String]) -> Vec<String> {
	let mut categories: Vec<String> = raw
		.split(',')
		.map(|category| category.trim().to_lowercase())
		.filter(|category| !category.is_empty() && known.contains(category))
		.collect();
	categories.sort();
	categories.dedup();
	categories
}

/// Refresh every list row from the statistics source, fold in accepted
/// intake proposals, and queue the rewritten list page (both the list and
/// the category summary regions) plus the static column pages.
///
/// Entities reported gone by the statistics source, and listed entities
/// whose article count dropped to zero, fall off the list.
pub fn refresh_list(
	ctx: &mut RunContext<'_>,
	base: &ListBase,
	intake: &[IntakeEntry],
) -> RankbotResult<Vec<ListEntry>> {
	let mut entries: Vec<ListEntry> = vec![];

	for record in &base.records {
		let Some(code) = record.field("code") else {
			continue;
		};

		let (info, stats, admins) =
			match fetch_entity(ctx.stats, code, ctx.config.admin_active_days) {
				Ok(parts) => parts,
				Err(error) if error.is_deletion() => {
					tracing::warn!(code, %error, "DELETE: dropping list entry");
					continue;
				}
				Err(error) => {
					tracing::warn!(code, %error, "entity unavailable, dropping for this run");
					continue;
				}
			};

		if stats.articles == 0 {
			tracing::warn!(code, "DELETE: no articles");
			continue;
		}

		if entries.iter().any(|entry| entry.code == info.code) {
			continue;
		}

		let recorded_name = record.field("name").unwrap_or_default();
		let mut display = record.field("display").unwrap_or_default().to_string();
		if display.is_empty()
			&& ctx.options.save_old
			&& !recorded_name.is_empty()
			&& recorded_name != info.name
		{
			display = recorded_name.to_string();
		}

		let categories = record
			.field("categories")
			.map(|raw| normalize_categories(raw, &base.categories))
			.unwrap_or_default();

		entries.push(ListEntry {
			code: info.code,
			name: info.name,
			display,
			address: ensure_trailing_slash(info.address),
			categories,
			articles: stats.articles,
			images: stats.images,
			users: stats.active_users,
			admins,
		});
	}

	for proposal in intake {
		let (info, stats, admins) =
			match fetch_entity(ctx.stats, &proposal.code, ctx.config.admin_active_days) {
				Ok(parts) => parts,
				Err(error) => {
					tracing::warn!(code = %proposal.code, %error, "dropping intake proposal");
					continue;
				}
			};

		if entries.iter().any(|entry| entry.code == info.code) {
			continue;
		}

		let display = if !proposal.label.is_empty() && proposal.label != info.name {
			proposal.label.clone()
		} else {
			String::new()
		};

		entries.push(ListEntry {
			code: info.code,
			name: info.name,
			display,
			address: ensure_trailing_slash(info.address),
			categories: proposal.categories.clone(),
			articles: stats.articles,
			images: stats.images,
			users: stats.active_users,
			admins,
		});
	}

	entries.sort_by(|a, b| a.visible().cmp(b.visible()));

	let new_text = {
		let template = ctx.templates.compiled("list_record")?;
		let records: Vec<Record> = entries.iter().map(ListEntry::to_record).collect();
		let rendered = codec::render_all(&records, template);
		region::replace(&base.text, &ctx.config.tags.list, &format!("\n{rendered}\n"))?
	};

	let summaries = summarize_categories(&base.category_records, &entries, &ctx.config.limits);

	let new_text = {
		let template = ctx.templates.compiled("category_record")?;
		let records: Vec<Record> = summaries.iter().map(CategorySummary::to_record).collect();
		let rendered = codec::render_all(&records, template);
		region::replace(
			&new_text,
			&ctx.config.tags.categories,
			&format!("\n{rendered}\n"),
		)?
	};

	ctx.queue.push(
		&ctx.config.pages.list,
		&new_text,
		&base.text,
		&ctx.config.messages.list_update_summary,
	);

	let inactive = entries.iter().filter(|entry| entry.users == 0).count();
	if let Some(page) = ctx.config.pages.list_column.clone() {
		render_column_page(ctx, &page, entries.len(), inactive)?;
	}
	if let Some(page) = ctx.config.pages.list_cat_column.clone() {
		render_column_page(ctx, &page, summaries.len(), 0)?;
	}

	Ok(entries)
}

fn fetch_entity(
	stats: &mut dyn StatsSource,
	code: &str,
	admin_window: u32,
) -> Result<(EntityInfo, EntityStats, u32), EntityError> {
	let info = stats.info(code)?;
	let counts = stats.stats(code)?;
	let admins = stats.active_admins(code, admin_window)?;
	Ok((info, counts, admins))
}

fn ensure_trailing_slash(address: String) -> String {
	let path_start = address.find("://").map_or(0, |index| index + 3);
	if address[path_start..].contains('/') {
		address
	} else {
		format!("{address}/")
	}
}

fn round2(value: f64) -> f64 {
	(value * 100.0).round() / 100.0
}

/// Aggregate per-category article/image averages over the refreshed list.
/// Categories come from the parsed category records; entries below the
/// category admission limits do not contribute.
pub fn summarize_categories(
	category_records: &[Record],
	entries: &[ListEntry],
	limits: &LimitsConfig,
) -> Vec<CategorySummary> {
	struct Totals {
		name: String,
		articles: u64,
		artcount: u32,
		images: u64,
		imgcount: u32,
	}

	let mut totals: BTreeMap<String, Totals> = BTreeMap::new();
	for record in category_records {
		let Some(name) = record.field("name") else {
			continue;
		};
		totals.insert(
			name.trim().to_lowercase(),
			Totals {
				name: name.trim().to_string(),
				articles: 0,
				artcount: 0,
				images: 0,
				imgcount: 0,
			},
		);
	}

	for entry in entries {
		for category in &entry.categories {
			let Some(total) = totals.get_mut(category) else {
				continue;
			};

			if entry.articles >= limits.category_article {
				total.articles += entry.articles;
				total.artcount += 1;
			}
			if entry.images >= limits.category_image {
				total.images += entry.images;
				total.imgcount += 1;
			}
		}
	}

	totals
		.into_values()
		.map(|total| {
			CategorySummary {
				name: total.name,
				articles: if total.artcount == 0 {
					0.0
				} else {
					round2(total.articles as f64 / f64::from(total.artcount))
				},
				artcount: total.artcount,
				images: if total.imgcount == 0 {
					0.0
				} else {
					round2(total.images as f64 / f64::from(total.imgcount))
				},
				imgcount: total.imgcount,
			}
		})
		.collect()
}

/// Regenerate a static column template page: a numbered wiki-table row per
/// list entry, the trailing `inactive` rows flagged, written between
/// `<onlyinclude>` tags. A page without the tags is replaced wholesale.
fn render_column_page(
	ctx: &mut RunContext<'_>,
	page: &str,
	count: usize,
	inactive: usize,
) -> RankbotResult<()> {
	if !ctx.store.exists(page) {
		tracing::warn!(page, "column page not found, skipping");
		return Ok(());
	}

	let old = ctx.store.latest_text(page)?;

	let mut column = vec![
		"{| class=\"{{{class|article-table}}}\" style=\"{{{style|}}}\"\n! style=\"{{{th_style|}}}\" \
		 | {{{1}}}"
			.to_string(),
	];
	for row in 0..count {
		let class_name = if row >= count - inactive {
			" class=\"inactive\""
		} else {
			""
		};
		column.push(format!(
			"|-{class_name}\n| style=\"{{{{{{td_style|}}}}}}\" | {}{{{{{{2|.}}}}}}",
			row + 1
		));
	}
	column.push("|}".to_string());
	let column = column.join("\n");

	let tag = Tag::new("<onlyinclude>", "</onlyinclude>");
	let new = match region::replace(&old, &tag, &column) {
		Ok(new) => new,
		Err(RankbotError::TagsNotFound { .. }) => {
			tracing::warn!(page, "onlyinclude tags not found, replacing whole text");
			format!("<onlyinclude>{column}</onlyinclude>")
		}
		Err(error) => return Err(error),
	};

	ctx.queue.push(
		page,
		&new,
		&old,
		&ctx.config.messages.column_update_summary(count),
	);

	Ok(())
}

/// Refresh one ranking page. Returns a page-scoped outcome; hard failures
/// are the caller's to record, they never abort the run.
pub fn refresh_ranking(
	ctx: &mut RunContext<'_>,
	page: &str,
	kind: RankingKind,
	category: Option<&str>,
	entries: &[ListEntry],
) -> RankbotResult<PageOutcome> {
	tracing::info!(page, ?kind, category, "processing ranking");

	if !ctx.store.exists(page) {
		tracing::info!(page, "page not found, skipping this ranking");
		return Ok(PageOutcome::Skipped("page not found".into()));
	}

	if !ctx.options.force_ranking {
		match check_edit_restriction(
			ctx.store,
			page,
			&ctx.config.messages.ranking_update_summary,
			&ctx.config.edit_restriction.ranking,
			ctx.now,
		) {
			Ok(()) => {}
			Err(RankbotError::EditRestricted { reason }) => {
				if ctx.options.simulate {
					tracing::info!(page, %reason, "simulation enabled, ignoring edit restriction");
				} else {
					return Ok(PageOutcome::Skipped(format!("edit restricted: {reason}")));
				}
			}
			Err(error) => return Err(error),
		}
	}

	// Column content comes from the reference revision so movement can be
	// pinned to a point in time; the rewrite itself always lands on the
	// latest text.
	let reference = if let Some(day) = ctx.options.revision_day {
		let history = ctx.store.history(page)?;
		match revision::select_by_date(&history, day) {
			Some(revision) => {
				tracing::info!(
					page,
					revision = revision.id,
					author = %revision.author,
					"using revision for ranking position reference"
				);
				ctx.store.text(page, revision.id)?
			}
			None => ctx.store.latest_text(page)?,
		}
	} else {
		ctx.store.latest_text(page)?
	};

	let mut columns = vec![];
	for tag in &ctx.config.tags.ranking_columns {
		match region::extract(&reference, tag) {
			Ok(content) => columns.push(content.to_string()),
			Err(RankbotError::TagsNotFound { .. }) => break,
			Err(error) => return Err(error),
		}
	}

	if columns.is_empty() {
		tracing::info!(page, "columns not found, skipping this ranking");
		return Ok(PageOutcome::Skipped("columns not found".into()));
	}

	let template = ctx.templates.compiled("ranking_record")?;

	let snapshot = if ctx.options.clean {
		None
	} else {
		Some(Snapshot::parse(&columns.join("\n"), template))
	};

	let threshold = match (category, kind) {
		(None, RankingKind::Articles) => ctx.config.limits.main_article,
		(None, RankingKind::Images) => ctx.config.limits.main_image,
		(Some(_), RankingKind::Articles) => ctx.config.limits.category_article,
		(Some(_), RankingKind::Images) => ctx.config.limits.category_image,
	};
	let policy = RankPolicy {
		threshold,
		category: category.map(str::to_lowercase),
	};

	let contenders: Vec<Contender> = entries
		.iter()
		.filter(|entry| entry.users != 0)
		.map(|entry| {
			Contender {
				code: entry.code.clone(),
				name: entry.visible().to_string(),
				count: kind.count(entry),
				categories: entry.categories.clone(),
			}
		})
		.collect();

	let ranked = ranking::rank(&contenders, &policy, snapshot.as_ref());
	let admitted = ranked.len();
	let split = ranking::split_columns(&ranked, columns.len());

	let old_text = ctx.store.latest_text(page)?;
	let mut new_text = old_text.clone();
	for (tag, column) in ctx.config.tags.ranking_columns.iter().zip(&split) {
		let records: Vec<Record> = column.iter().map(RankedEntry::to_record).collect();
		let rendered = codec::render_all(&records, template);
		new_text = region::replace(&new_text, tag, &format!("\n{rendered}\n"))?;
	}

	new_text = refresh_spans(&new_text, admitted);

	ctx.queue.push(
		page,
		&new_text,
		&old_text,
		&ctx.config.messages.ranking_update_summary,
	);

	Ok(PageOutcome::Updated)
}

fn date_span_regex() -> &'static Regex {
	static DATE: OnceLock<Regex> = OnceLock::new();
	DATE.get_or_init(|| {
		Regex::new(r#"<span (.*?)id="data"(.*?)>.*?</span>"#).expect("literal pattern compiles")
	})
}

fn counter_span_regex() -> &'static Regex {
	static COUNTER: OnceLock<Regex> = OnceLock::new();
	COUNTER.get_or_init(|| {
		Regex::new(r#"<span (.*?)id="licznik"(.*?)>.*?</span>"#).expect("literal pattern compiles")
	})
}

/// Refresh the date and entry-count spans living outside the column regions.
fn refresh_spans(text: &str, count: usize) -> String {
	let text = date_span_regex().replace_all(
		text,
		r#"<span ${1}id="data"${2}>{{subst:#time:j xg Y}}</span>"#,
	);

	counter_span_regex()
		.replace_all(
			&text,
			format!(r#"<span ${{1}}id="licznik"${{2}}>{count}</span>"#),
		)
		.into_owned()
}

/// A proposal line from the intake queue, normalized from one of the
/// accepted link shapes.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Proposal {
	code: String,
	label: String,
	categories_raw: String,
}

fn proposal_regexes() -> &'static [Regex; 4] {
	static PATTERNS: OnceLock<[Regex; 4]> = OnceLock::new();
	PATTERNS.get_or_init(|| {
		[
			// * [[w:c:code|label]] - categories
			Regex::new(r"^\*\s*\[\[w:c:(?P<code>[^|\]]+)\|(?P<label>[^\]]*)\]\]\s*-?\s*(?P<cats>.*?)\s*$"),
			// * [[w:c:code]] - categories
			Regex::new(r"^\*\s*\[\[w:c:(?P<code>[^|\]]+)\]\]\s*-?\s*(?P<cats>.*?)\s*$"),
			// * [http://code.wikia.com label] - categories
			Regex::new(
				r"(?i)^\*\s*\[https?://(?:www\.)?(?P<code>[^\s/.]+)\.wikia\.com\S*\s+(?P<label>[^\]]*)\]\s*-?\s*(?P<cats>.*?)\s*$",
			),
			// * http://www.code.wikia.com categories
			Regex::new(
				r"(?i)^\*\s*https?://(?:www\.)?(?P<code>[^\s/.]+)\.wikia\.com\S*\s*-?\s*(?P<cats>.*?)\s*$",
			),
		]
		.map(|pattern| pattern.expect("literal pattern compiles"))
	})
}

fn parse_proposal(line: &str) -> Option<Proposal> {
	for pattern in proposal_regexes() {
		if let Some(captures) = pattern.captures(line) {
			return Some(Proposal {
				code: captures
					.name("code")
					.map(|code| code.as_str().trim().to_string())?,
				label: captures
					.name("label")
					.map(|label| label.as_str().trim().to_string())
					.unwrap_or_default(),
				categories_raw: captures
					.name("cats")
					.map(|cats| cats.as_str().trim().to_string())
					.unwrap_or_default(),
			});
		}
	}

	None
}

fn lazy_regexes() -> &'static [Regex; 3] {
	static PATTERNS: OnceLock<[Regex; 3]> = OnceLock::new();
	PATTERNS.get_or_init(|| {
		[
			// bare URL, not already struck or inside a bracket link
			Regex::new(
				r"(?i)(?:^|[^>\[\]\w])(?P<m>https?://(?:www\.)?(?P<code>[^\s/.\[\]]+)\.wikia\.com[^\s\[\]<]*)",
			),
			// external bracket link
			Regex::new(
				r"(?i)(?:^|[^>])(?P<m>\[https?://(?:www\.)?(?P<code>[^\s/.\[\]]+)\.wikia\.com[^\]]*\])",
			),
			// interwiki link
			Regex::new(r"(?:^|[^>])(?P<m>\[\[w:c:(?P<code>[^|\]]+?)(?:\|[^\]]*)?\]\])"),
		]
		.map(|pattern| pattern.expect("literal pattern compiles"))
	})
}

/// Find stray submissions in free-form text, wrap each in a `<span>` so the
/// next run ignores it, and collect the codes found.
fn strike_lazies(text: &str) -> (String, Vec<String>) {
	let mut text = text.to_string();
	let mut codes = vec![];

	for pattern in lazy_regexes() {
		let mut spans: Vec<(usize, usize)> = vec![];

		for captures in pattern.captures_iter(&text) {
			let (Some(found), Some(code)) = (captures.name("m"), captures.name("code")) else {
				continue;
			};
			codes.push(code.as_str().trim().to_string());
			spans.push((found.start(), found.end()));
		}

		// Wrap back to front so earlier offsets stay valid.
		for (start, end) in spans.into_iter().rev() {
			text = format!("{}<span>{}</span>{}", &text[..start], &text[start..end], &text[end..]);
		}
	}

	(text, codes)
}

fn struck_codes(text: &str) -> Vec<String> {
	static STRUCK: OnceLock<Regex> = OnceLock::new();
	let pattern = STRUCK
		.get_or_init(|| Regex::new(r"\[\[w:c:([^|\]]+)\|").expect("literal pattern compiles"));

	pattern
		.captures_iter(text)
		.filter_map(|captures| captures.get(1))
		.map(|code| code.as_str().trim().to_string())
		.collect()
}

/// Process the intake queue on the list's talk page.
///
/// Queue lines propose new wikis in several link shapes. Each proposal is
/// validated against the statistics source: nonexistent wikis are struck
/// with a note, wikis already listed or in a wrong language are struck with
/// the matching note, and accepted proposals are struck plainly and join the
/// list refresh. Stray links elsewhere after the queue region are struck in
/// place and validated the same way.
pub fn process_talk(
	ctx: &mut RunContext<'_>,
	base: &ListBase,
) -> RankbotResult<Vec<IntakeEntry>> {
	let Some(page) = ctx.config.pages.list_talk.clone() else {
		return Ok(vec![]);
	};
	if !ctx.store.exists(&page) {
		tracing::info!(%page, "talk page not found, skipping intake");
		return Ok(vec![]);
	}

	tracing::info!(%page, "processing intake queue");
	let old_text = ctx.store.latest_text(&page)?;
	let tag = ctx.config.tags.talk.clone();
	let queue_region = region::extract(&old_text, &tag)?.to_string();

	let mut accepted: Vec<IntakeEntry> = vec![];
	let mut handled: Vec<String> = vec![];
	let mut new_lines: Vec<String> = vec![];

	for raw_line in queue_region.replace('\r', "").trim().lines() {
		let line = raw_line.trim();

		let Some(proposal) = parse_proposal(line) else {
			new_lines.push(line.to_string());
			continue;
		};

		let info = match ctx.stats.info(&proposal.code) {
			Ok(info) => info,
			Err(error) if error.is_deletion() => {
				let label = if proposal.label.is_empty() {
					&proposal.code
				} else {
					&proposal.label
				};
				new_lines.push(format!(
					"* <s>[[w:c:{}|{}]]</s> - {}",
					proposal.code, label, ctx.config.messages.no_wiki
				));
				continue;
			}
			Err(error) => {
				tracing::warn!(code = %proposal.code, %error, "keeping proposal for next run");
				new_lines.push(line.to_string());
				continue;
			}
		};

		if handled.contains(&info.code) {
			continue;
		}

		if base.codes.contains(&info.code) {
			new_lines.push(format!(
				"* <s>[[w:c:{}|{}]]</s> - {}",
				info.code, info.name, ctx.config.messages.on_the_list
			));
			continue;
		}

		if !ctx.config.languages.contains(&info.language) {
			new_lines.push(format!(
				"* <s>[[w:c:{}|{}]]</s> - {}",
				info.code,
				info.name,
				ctx.config
					.messages
					.wrong_language(&ctx.config.languages, &info.language)
			));
			continue;
		}

		let categories = normalize_categories(&proposal.categories_raw, &base.categories);
		new_lines.push(format!("* <s>[[w:c:{}|{}]]</s>", info.code, info.name));
		handled.push(info.code.clone());
		accepted.push(IntakeEntry {
			code: info.code,
			label: proposal.label,
			categories,
		});
	}

	// Stray submissions after the queue region.
	let end_index = old_text.find(&tag.end).unwrap_or(old_text.len());
	let (head, tail) = old_text.split_at(end_index);
	let (new_tail, lazies) = strike_lazies(tail);

	let strikes = struck_codes(&new_lines.join("\n"));
	for code in lazies {
		if strikes.contains(&code) || handled.contains(&code) || base.codes.contains(&code) {
			continue;
		}

		let Ok(info) = ctx.stats.info(&code) else {
			continue;
		};

		if handled.contains(&info.code)
			|| base.codes.contains(&info.code)
			|| !ctx.config.languages.contains(&info.language)
		{
			continue;
		}

		new_lines.push(format!("* <s>[[w:c:{}|{}]]</s>", info.code, info.name));
		handled.push(info.code.clone());
		accepted.push(IntakeEntry {
			code: info.code,
			label: String::new(),
			categories: vec![],
		});
	}

	let mut rebuilt = String::from(head);
	rebuilt.push_str(&new_tail);
	let new_text = region::replace(&rebuilt, &tag, &format!("\n{}\n\n", new_lines.join("\n")))?;

	ctx.queue.push(
		&page,
		&new_text,
		&old_text,
		&ctx.config.messages.talk_update_summary,
	);

	Ok(accepted)
}
