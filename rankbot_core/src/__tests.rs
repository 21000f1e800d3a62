use chrono::NaiveDate;
use rstest::rstest;
use similar_asserts::assert_eq;
use tracing_test::traced_test;

use super::__fixtures::*;
use super::*;

#[rstest]
#[case::list_record(
	"list_record",
	&[
		("visible", "Alpha Wiki"),
		("code", "alpha"),
		("display", ""),
		("address", "http://alpha.wikia.com/"),
		("categories", "games"),
		("articles", "120"),
		("images", "40"),
		("users", "5"),
		("admins", "2"),
	]
)]
#[case::category_record(
	"category_record",
	&[
		("name", "Games"),
		("articles", "90"),
		("artcount", "2"),
		("images", "26"),
		("imgcount", "2"),
	]
)]
#[case::ranking_record(
	"ranking_record",
	&[
		("place", "1  "),
		("move", "**"),
		("count", "    120"),
		("code", "alpha"),
		("name", "Alpha Wiki"),
	]
)]
fn parse_render_round_trip(#[case] kind: &str, #[case] fields: &[(&str, &str)]) -> RankbotResult<()> {
	let mut templates = sample_templates();
	let template = templates.compiled(kind)?;
	let record: Record = fields.iter().copied().collect();

	let rendered = template.render(&record);
	let outcome = parse_all(&rendered, template);
	assert_eq!(outcome.occurrences, 1);
	assert_eq!(outcome.records.len(), 1);

	// Render of the parsed record reproduces the parsed bytes.
	let reparsed = render_all(&outcome.records, template);
	let again = parse_all(&reparsed, template);
	assert_eq!(again.records, outcome.records);

	Ok(())
}

#[test]
fn missing_field_is_distinct_from_empty() -> RankbotResult<()> {
	let mut templates = sample_templates();
	let template = templates.compiled("list_record")?;

	let text = "{{Wiki list record | Foo \n| code = foo\n| display = \n}}";
	let outcome = parse_all(text, template);
	assert_eq!(outcome.records.len(), 1);

	let record = &outcome.records[0];
	assert_eq!(record.field("display"), Some(""));
	assert_eq!(record.field("address"), None);

	Ok(())
}

#[test]
fn matcher_for_schema_without_positional_fields_is_a_config_error() -> RankbotResult<()> {
	let schema = TemplateSchema::from_spec(&strings(&["Named only", "code = %(code)s"]))?;
	let template = CompiledTemplate::compile(&schema)?;

	assert!(matches!(
		template.positional_matcher(),
		Err(RankbotError::NoPositionalFields(name)) if name == "Named only"
	));

	// Named fields still extract.
	let record = template
		.captures("{{Named only\n| code = foo\n}}")
		.expect("named capture");
	assert_eq!(record.field("code"), Some("foo"));

	Ok(())
}

#[test]
fn unknown_template_kind_errors() {
	let mut templates = sample_templates();
	assert!(matches!(
		templates.compiled("missing_kind"),
		Err(RankbotError::ConfigParse(_))
	));
}

#[test]
fn scan_skips_degenerate_occurrences_and_counts_them() -> RankbotResult<()> {
	let mut templates = sample_templates();
	let template = templates.compiled("list_record")?;

	let text = format!(
		"prose\n{}\nmore prose\n{{{{Wiki list record}}}}\n{}\n",
		"{{Wiki list record | Foo \n| code = foo\n}}",
		"{{Wiki list record | Bar \n| code = bar\n}}"
	);
	let outcome = parse_all(&text, template);
	assert_eq!(outcome.occurrences, 3);
	assert_eq!(outcome.records.len(), 2);
	assert!(!outcome.is_degenerate());

	let only_bad = parse_all("{{Wiki list record}}", template);
	assert_eq!(only_bad.occurrences, 1);
	assert!(only_bad.is_degenerate());

	Ok(())
}

#[test]
fn derivation_hook_can_drop_records() -> RankbotResult<()> {
	let mut templates = sample_templates();
	let template = templates.compiled("list_record")?;

	let text = "{{Wiki list record | Foo \n| code = foo\n}}\n{{Wiki list record | Bar \n| code = \
	            bar\n}}";
	let outcome = parse_all_with(text, template, |record| record.field("code") != Some("bar"));
	assert_eq!(outcome.occurrences, 2);
	assert_eq!(outcome.records.len(), 1);
	assert_eq!(outcome.records[0].field("visible"), Some("Foo"));

	Ok(())
}

#[test]
fn region_extract_and_replace_example() -> RankbotResult<()> {
	let tag = Tag::new("<start>", "<end>");

	assert_eq!(extract("X<start>hello<end>Y", &tag)?, "hello");
	assert_eq!(
		replace("X<start>hello<end>Y", &tag, "bye")?,
		"X<start>bye<end>Y"
	);

	Ok(())
}

#[test]
fn region_replace_then_extract_is_identity() -> RankbotResult<()> {
	let tag = Tag::new("<!-- a -->", "<!-- b -->");
	let text = "before <!-- a -->old<!-- b --> after";

	let replaced = replace(text, &tag, "\nnew content\n")?;
	assert_eq!(extract(&replaced, &tag)?, "\nnew content\n");
	assert!(replaced.starts_with("before <!-- a -->"));
	assert!(replaced.ends_with("<!-- b --> after"));

	Ok(())
}

#[test]
fn region_honors_only_the_first_marker_occurrence() -> RankbotResult<()> {
	let tag = Tag::new("<s>", "<e>");
	let text = "x<s>one<s>two<e>three<e>y";

	assert_eq!(extract(text, &tag)?, "one<s>two");
	assert_eq!(replace(text, &tag, "z")?, "x<s>z<e>three<e>y");

	Ok(())
}

#[rstest]
#[case::both("no markers here", MissingMarker::Both)]
#[case::start("only <e> end", MissingMarker::Start)]
#[case::end("only <s> start", MissingMarker::End)]
fn region_reports_which_marker_is_missing(#[case] text: &str, #[case] expected: MissingMarker) {
	let tag = Tag::new("<s>", "<e>");

	match extract(text, &tag) {
		Err(RankbotError::TagsNotFound { missing, .. }) => assert_eq!(missing, expected),
		other => panic!("expected TagsNotFound, got {other:?}"),
	}
}

fn contender(code: &str, count: u64) -> Contender {
	Contender {
		code: code.to_string(),
		name: code.to_uppercase(),
		count,
		categories: vec![],
	}
}

#[test]
fn ranking_places_ties_and_movement() {
	let contenders = vec![contender("a", 5), contender("b", 5), contender("c", 3)];
	let snapshot: Snapshot = [
		("a".to_string(), 1),
		("b".to_string(), 2),
		("c".to_string(), 3),
	]
	.into_iter()
	.collect();

	let ranked = rank(&contenders, &RankPolicy::default(), Some(&snapshot));

	// Display order is count-descending, ties keep encounter order.
	let codes: Vec<&str> = ranked.iter().map(|entry| entry.code.as_str()).collect();
	assert_eq!(codes, ["a", "b", "c"]);

	// The walk runs from the tail: c takes place 1, b place 2, and a shares
	// b's count so its displayed place is blank.
	assert_eq!(ranked[0].place, None);
	assert_eq!(ranked[1].place, Some(2));
	assert_eq!(ranked[2].place, Some(1));

	assert_eq!(ranked[0].movement, Some(Movement::Down));
	assert_eq!(ranked[1].movement, Some(Movement::Steady));
	assert_eq!(ranked[2].movement, Some(Movement::Up));
}

#[test]
fn ranking_is_deterministic_and_stable() {
	let contenders = vec![
		contender("x", 7),
		contender("y", 7),
		contender("z", 7),
		contender("w", 2),
	];

	let first = rank(&contenders, &RankPolicy::default(), None);
	let second = rank(&contenders, &RankPolicy::default(), None);
	assert_eq!(first, second);

	let codes: Vec<&str> = first.iter().map(|entry| entry.code.as_str()).collect();
	assert_eq!(codes, ["x", "y", "z", "w"]);
}

#[test]
fn ranking_movement_is_total() {
	let contenders = vec![contender("a", 9), contender("b", 4), contender("c", 1)];
	let snapshot: Snapshot = [("b".to_string(), 2)].into_iter().collect();

	let ranked = rank(&contenders, &RankPolicy::default(), Some(&snapshot));
	assert!(ranked.iter().all(|entry| entry.movement.is_some()));

	// b keeps ordinal 2, so it must be Steady.
	let b = ranked.iter().find(|entry| entry.code == "b").unwrap();
	assert_eq!(b.movement, Some(Movement::Steady));
	let a = ranked.iter().find(|entry| entry.code == "a").unwrap();
	assert_eq!(a.movement, Some(Movement::New));
}

#[test]
fn ranking_without_snapshot_renders_no_marker() {
	let ranked = rank(&[contender("a", 9)], &RankPolicy::default(), None);
	assert_eq!(ranked[0].movement, None);
	assert_eq!(ranked[0].to_record().field("move"), Some(""));
}

#[test]
fn ranking_admission_threshold_and_category() {
	let mut gamer = contender("g", 80);
	gamer.categories = vec!["games".to_string()];
	let contenders = vec![gamer, contender("p", 60), contender("q", 10)];

	let policy = RankPolicy {
		threshold: 50,
		category: None,
	};
	let ranked = rank(&contenders, &policy, None);
	let codes: Vec<&str> = ranked.iter().map(|entry| entry.code.as_str()).collect();
	assert_eq!(codes, ["g", "p"]);

	let policy = RankPolicy {
		threshold: 50,
		category: Some("games".to_string()),
	};
	let ranked = rank(&contenders, &policy, None);
	let codes: Vec<&str> = ranked.iter().map(|entry| entry.code.as_str()).collect();
	assert_eq!(codes, ["g"]);
}

#[rstest]
#[case::even(4, 2, vec![2, 2])]
#[case::remainder_goes_to_best(10, 3, vec![3, 3, 4])]
#[case::three_into_two(3, 2, vec![1, 2])]
#[case::more_columns_than_entries(2, 3, vec![0, 1, 1])]
#[case::one_each(5, 5, vec![1, 1, 1, 1, 1])]
fn split_column_boundaries_are_pinned(
	#[case] len: usize,
	#[case] columns: usize,
	#[case] expected_sizes: Vec<usize>,
) {
	let entries: Vec<usize> = (0..len).collect();
	let split = split_columns(&entries, columns);

	let sizes: Vec<usize> = split.iter().map(Vec::len).collect();
	assert_eq!(sizes, expected_sizes);

	// Every entry lands exactly once.
	assert_eq!(sizes.iter().sum::<usize>(), len);

	// No two columns differ by more than one.
	let max = sizes.iter().max().unwrap();
	let min = sizes.iter().min().unwrap();
	assert!(max - min <= 1);

	// Concatenating columns last to first restores display order.
	let restored: Vec<usize> = split.iter().rev().flatten().copied().collect();
	assert_eq!(restored, entries);
}

#[test]
fn snapshot_reads_places_with_inheritance() -> RankbotResult<()> {
	let mut templates = sample_templates();
	let template = templates.compiled("ranking_record")?;

	let text = "{{Ranking record | 5.  | // |      10 \n| code = a\n| name = A\n}}\n\
	            {{Ranking record |     | // |      10 \n| code = b\n| name = B\n}}\n\
	            {{Ranking record | 7   | ++ |       4 \n| code = [[w:c:c]]\n| name = C\n}}";
	let snapshot = Snapshot::parse(text, template);

	assert_eq!(snapshot.get("a"), Some(&5));
	// Blank place inherits the previous record's place.
	assert_eq!(snapshot.get("b"), Some(&5));
	// Dots are stripped and interwiki decoration is normalized away.
	assert_eq!(snapshot.get("c"), Some(&7));

	Ok(())
}

#[rstest]
// 2015-06-04 is a Thursday in ISO week 23; week 22's Thursday is 2015-05-28.
#[case::same_week_denied(Periodicity::Week, 2015, 6, 2, false)]
#[case::last_week_permitted(Periodicity::Week, 2015, 5, 28, true)]
#[case::same_day_denied(Periodicity::Day, 2015, 6, 4, false)]
#[case::previous_day_permitted(Periodicity::Day, 2015, 6, 3, true)]
#[case::two_weeks_blocks_last_week(Periodicity::TwoWeeks, 2015, 5, 28, false)]
#[case::two_weeks_ago_permitted(Periodicity::TwoWeeks, 2015, 5, 21, true)]
fn edit_window_periodicity(
	#[case] once: Periodicity,
	#[case] year: i32,
	#[case] month: u32,
	#[case] day: u32,
	#[case] permitted: bool,
) {
	let window = EditWindow {
		once,
		days: [4].into_iter().collect(),
	};

	assert_eq!(window.is_permitted(at(year, month, day), now()), permitted);
}

#[test]
fn edit_window_denies_disallowed_weekday_with_reason() {
	let window = EditWindow {
		once: Periodicity::Week,
		days: [1].into_iter().collect(),
	};

	// now() is a Thursday (ISO weekday 4).
	match window.check(at(2015, 5, 1), now()) {
		Err(RankbotError::EditRestricted { reason }) => {
			assert!(reason.contains("that day: 4"), "unexpected reason: {reason}");
		}
		other => panic!("expected EditRestricted, got {other:?}"),
	}
}

#[test]
fn edit_window_same_week_number_in_another_year_is_permitted() {
	let window = EditWindow {
		once: Periodicity::Week,
		days: [4].into_iter().collect(),
	};

	// Both dates sit in ISO week 2, a year apart. 2016-01-14 is a Thursday.
	let last_edit = at(2015, 1, 8);
	let now = at(2016, 1, 14);
	assert!(window.is_permitted(last_edit, now));
}

#[test]
fn edit_window_two_week_lookback_crosses_year_boundary() {
	let window = EditWindow {
		once: Periodicity::TwoWeeks,
		days: [4].into_iter().collect(),
	};

	// 2016-01-07 is a Thursday in ISO week 1; 2015-12-31 sits in the
	// immediately preceding ISO week 53.
	assert!(!window.is_permitted(at(2015, 12, 31), at(2016, 1, 7)));
}

#[test]
fn select_where_distinguishes_empty_history_from_no_match() {
	let empty: Vec<Revision> = vec![];
	assert!(matches!(
		select_where("Some page", &empty, |_| true),
		Err(RankbotError::EmptyHistory(_))
	));

	let history = vec![
		revision(2, at(2015, 6, 2), "B", "second"),
		revision(1, at(2015, 6, 1), "A", "first"),
	];
	assert!(matches!(
		select_where("Some page", &history, |revision| revision.author == "Z"),
		Err(RankbotError::NoQualifyingRevision { scanned: 2, .. })
	));

	let found = select_where("Some page", &history, |revision| revision.author == "A").unwrap();
	assert_eq!(found.id, 1);

	// Newest-first: the first satisfying revision wins.
	let found = select_where("Some page", &history, |_| true).unwrap();
	assert_eq!(found.id, 2);
}

#[test]
fn select_by_date_pins_the_reference_revision() {
	let history = vec![
		revision(3, at(2015, 6, 3), "A", "newest"),
		revision(2, at(2015, 5, 20), "A", "middle"),
		revision(1, at(2015, 5, 1), "A", "oldest"),
	];

	// Oldest revision still on or after the cutoff.
	let cutoff = NaiveDate::from_ymd_opt(2015, 5, 15).unwrap();
	assert_eq!(select_by_date(&history, cutoff).unwrap().id, 2);

	// Every revision qualifies: fall through to the globally oldest.
	let cutoff = NaiveDate::from_ymd_opt(2015, 4, 1).unwrap();
	assert_eq!(select_by_date(&history, cutoff).unwrap().id, 1);

	// Even the newest predates the cutoff: the newest is the closest
	// available reference.
	let cutoff = NaiveDate::from_ymd_opt(2015, 6, 10).unwrap();
	assert_eq!(select_by_date(&history, cutoff).unwrap().id, 3);

	assert!(select_by_date(&[], cutoff).is_none());
}

#[traced_test]
#[test]
fn write_queue_skips_unchanged_pages_after_trimming() {
	let mut queue = WriteQueue::new();

	queue.push("Page", "  same text \n", "same text", "summary");
	assert!(queue.is_empty());
	assert!(logs_contain("no changes necessary"));

	queue.push("Page", "new text", "old text", "summary");
	assert_eq!(queue.len(), 1);
	assert_eq!(queue.entries()[0].text, "new text");
}

#[test]
fn write_queue_flush_continues_past_conflicts() -> RankbotResult<()> {
	let mut store = MemoryStore::default();
	store.conflicts.insert("Conflicted".to_string());

	let mut queue = WriteQueue::new();
	queue.push("Conflicted", "new a", "old a", "sum a");
	queue.push("Clean", "new b", "old b", "sum b");

	let saved = queue.flush(&mut store)?;
	assert_eq!(saved, 1);
	assert!(queue.is_empty());
	assert_eq!(store.saved.len(), 1);
	assert_eq!(store.saved[0].0, "Clean");

	Ok(())
}

#[test]
fn stats_cache_memoizes_lookups_including_failures() {
	let mut source = MemoryStats::default();
	source.add("alpha", "Alpha Wiki", "en", 10, 2, 1, 1);
	let mut cache = StatsCache::new(Box::new(source));

	let first = cache.info("alpha").unwrap();
	let second = cache.info("alpha").unwrap();
	assert_eq!(first, second);

	assert!(matches!(
		cache.info("missing"),
		Err(EntityError::NotFound(_))
	));
	assert!(matches!(
		cache.info("missing"),
		Err(EntityError::NotFound(_))
	));
}

#[test]
fn restriction_gate_ignores_foreign_edits() -> RankbotResult<()> {
	let config = sample_config();
	let store = seeded_store();

	// The ranking page's last automated edit sits in ISO week 22; now is
	// week 23 on an allowed weekday.
	check_edit_restriction(
		&store,
		"Project:Ranking/Articles",
		&config.messages.ranking_update_summary,
		&config.edit_restriction.ranking,
		now(),
	)?;

	// A bot edit this week blocks.
	let mut store = MemoryStore::default();
	store.add_page(
		"Project:Ranking/Articles",
		vec![(
			revision(31, at(2015, 6, 2), "Listbot", "Robot: Updating wiki ranking"),
			ranking_page_text(),
		)],
	);
	let result = check_edit_restriction(
		&store,
		"Project:Ranking/Articles",
		&config.messages.ranking_update_summary,
		&config.edit_restriction.ranking,
		now(),
	);
	assert!(matches!(result, Err(RankbotError::EditRestricted { .. })));

	// A page the bot never touched is unrestricted.
	let mut store = MemoryStore::default();
	store.add_page(
		"Project:Ranking/Articles",
		vec![(
			revision(32, at(2015, 6, 2), "Someone", "manual tweak"),
			ranking_page_text(),
		)],
	);
	check_edit_restriction(
		&store,
		"Project:Ranking/Articles",
		&config.messages.ranking_update_summary,
		&config.edit_restriction.ranking,
		now(),
	)?;

	Ok(())
}

fn run_fixture(options: RunOptions) -> (RunReport, WriteQueue, MemoryStore) {
	let config = sample_config();
	let mut templates = sample_templates();
	let store = seeded_store();
	let mut stats = seeded_stats();
	let mut queue = WriteQueue::new();

	let report = {
		let mut ctx = RunContext {
			store: &store,
			stats: &mut stats,
			config: &config,
			templates: &mut templates,
			queue: &mut queue,
			now: now(),
			options,
		};
		run(&mut ctx).expect("run succeeds")
	};

	(report, queue, store)
}

#[test]
fn full_run_refreshes_talk_list_column_and_ranking() {
	let (report, queue, _store) = run_fixture(RunOptions::default());

	let pages: Vec<&str> = queue
		.entries()
		.iter()
		.map(|entry| entry.page.as_str())
		.collect();
	assert_eq!(
		pages,
		[
			"Project talk:List",
			"Project:List",
			"Template:List column",
			"Project:Ranking/Articles",
		]
	);

	// Talk page: accepted, rejected, and lazy proposals all handled.
	let talk = &queue.entries()[0].text;
	assert!(talk.contains("* <s>[[w:c:gamma|Gamma Wiki]]</s>"));
	assert!(talk.contains("* <s>[[w:c:delta|delta]]</s> - wiki doesn't exist"));
	assert!(talk.contains("* <s>[[w:c:alpha|Alpha Wiki]]</s> - already on the list"));
	assert!(talk.contains("given: de"));
	assert!(talk.contains("* <s>[[w:c:zeta|Zeta Wiki]]</s>"));
	assert!(talk.contains("<span>http://zeta.wikia.com</span>"));

	// List page: refreshed counts, intake folded in, sorted by visible name,
	// text outside the regions untouched.
	let list = &queue.entries()[1].text;
	assert!(list.contains("| articles = 120"));
	assert!(list.contains("| display = Gamma\n"));
	let alpha = list.find("{{Wiki list record | Alpha Wiki ").unwrap();
	let beta = list.find("{{Wiki list record | Beta Wiki ").unwrap();
	let gamma = list.find("{{Wiki list record | Gamma ").unwrap();
	let zeta = list.find("{{Wiki list record | Zeta Wiki ").unwrap();
	assert!(alpha < beta && beta < gamma && gamma < zeta);
	assert!(list.starts_with("== Wikis =="));
	assert!(list.ends_with("Footer stays untouched."));

	// Category summary: alpha and gamma contribute to both averages.
	assert!(list.contains("{{Category record | Games \n| articles = 90\n| artcount = 2\n"));
	assert!(list.contains("| images = 26\n| imgcount = 2\n"));

	// Static column page: four rows, none inactive.
	let column = &queue.entries()[2].text;
	assert!(column.contains("| 1{{{2|.}}}"));
	assert!(column.contains("| 4{{{2|.}}}"));
	assert!(!column.contains("class=\"inactive\""));

	// Ranking: zeta is under the threshold; gamma, beta, alpha rank with the
	// best entries in the last column.
	let ranking = &queue.entries()[3].text;
	assert!(ranking.contains("{{Ranking record | 1   | ** |      60 \n| code = gamma\n"));
	assert!(ranking.contains("{{Ranking record | 2   | // |      80 \n| code = beta\n"));
	assert!(ranking.contains("{{Ranking record | 3   | -- |     120 \n| code = alpha\n"));
	let gamma = ranking.find("| code = gamma").unwrap();
	let alpha = ranking.find("| code = alpha").unwrap();
	assert!(gamma < alpha, "best entries fill the last column");

	// The spans outside the column regions are refreshed.
	assert!(ranking.contains("<span class=\"stamp\" id=\"licznik\">3</span>"));
	assert!(ranking.contains("<span class=\"stamp\" id=\"data\">{{subst:#time:j xg Y}}</span>"));

	// Nonexistent ranking pages are skipped, not fatal.
	assert!(report.pages.iter().any(|page| {
		page.page == "Project:Ranking/Images" && matches!(page.outcome, PageOutcome::Skipped(_))
	}));
	assert!(report.failed().count() == 0);
}

#[test]
fn list_only_run_leaves_rankings_alone() {
	let (report, queue, _store) = run_fixture(RunOptions {
		list_only: true,
		..RunOptions::default()
	});

	assert!(
		queue
			.entries()
			.iter()
			.all(|entry| entry.page != "Project:Ranking/Articles")
	);
	assert!(
		report
			.pages
			.iter()
			.all(|page| !page.page.starts_with("Project:Ranking"))
	);
}

#[test]
fn clean_run_renders_no_movement_markers() {
	let (_report, queue, _store) = run_fixture(RunOptions {
		clean: true,
		..RunOptions::default()
	});

	let ranking = &queue
		.entries()
		.iter()
		.find(|entry| entry.page == "Project:Ranking/Articles")
		.expect("ranking queued")
		.text;
	assert!(ranking.contains("{{Ranking record | 1   |  |      60 \n| code = gamma\n"));
	assert!(!ranking.contains("| ** |"));
}

#[test]
fn restricted_ranking_is_skipped_unless_forced() {
	let config = sample_config();
	let mut templates = sample_templates();
	let mut store = seeded_store();
	// Move the bot's last ranking edit into the current ISO week.
	store.add_page(
		"Project:Ranking/Articles",
		vec![(
			revision(31, at(2015, 6, 2), "Listbot", "Robot: Updating wiki ranking"),
			ranking_page_text(),
		)],
	);

	let mut stats = seeded_stats();
	let mut queue = WriteQueue::new();
	let report = {
		let mut ctx = RunContext {
			store: &store,
			stats: &mut stats,
			config: &config,
			templates: &mut templates,
			queue: &mut queue,
			now: now(),
			options: RunOptions::default(),
		};
		run(&mut ctx).expect("run succeeds")
	};

	assert!(report.pages.iter().any(|page| {
		page.page == "Project:Ranking/Articles"
			&& matches!(&page.outcome, PageOutcome::Skipped(reason) if reason.contains("edit restricted"))
	}));
	assert!(
		queue
			.entries()
			.iter()
			.all(|entry| entry.page != "Project:Ranking/Articles")
	);

	// force_ranking overrides the restriction.
	let mut stats = seeded_stats();
	let mut templates = sample_templates();
	let mut queue = WriteQueue::new();
	{
		let mut ctx = RunContext {
			store: &store,
			stats: &mut stats,
			config: &config,
			templates: &mut templates,
			queue: &mut queue,
			now: now(),
			options: RunOptions {
				force_ranking: true,
				..RunOptions::default()
			},
		};
		run(&mut ctx).expect("run succeeds");
	}
	assert!(
		queue
			.entries()
			.iter()
			.any(|entry| entry.page == "Project:Ranking/Articles")
	);
}

#[test]
fn restricted_list_aborts_the_run() {
	let config = sample_config();
	let mut templates = sample_templates();
	let mut store = seeded_store();
	store.add_page(
		"Project:List",
		vec![
			(
				revision(11, at(2015, 6, 2), "Listbot", "Robot: Updating wiki list"),
				list_page_text(),
			),
			(
				revision(10, at(2015, 5, 28), "Admin", "adding a wiki"),
				list_page_text(),
			),
		],
	);

	let mut stats = seeded_stats();
	let mut queue = WriteQueue::new();
	let mut ctx = RunContext {
		store: &store,
		stats: &mut stats,
		config: &config,
		templates: &mut templates,
		queue: &mut queue,
		now: now(),
		options: RunOptions::default(),
	};

	assert!(matches!(
		run(&mut ctx),
		Err(RankbotError::EditRestricted { .. })
	));
}

#[test]
fn missing_list_page_is_fatal() {
	let config = sample_config();
	let mut templates = sample_templates();
	let store = MemoryStore::default();
	let mut stats = seeded_stats();
	let mut queue = WriteQueue::new();

	let mut ctx = RunContext {
		store: &store,
		stats: &mut stats,
		config: &config,
		templates: &mut templates,
		queue: &mut queue,
		now: now(),
		options: RunOptions::default(),
	};

	assert!(matches!(run(&mut ctx), Err(RankbotError::PageMissing(_))));
}

#[test]
fn list_revision_walk_skips_ineligible_and_degenerate_revisions() {
	let config = sample_config();
	let mut templates = sample_templates();
	let mut store = seeded_store();

	// Newest: an ineligible author. Next: an eligible author whose list
	// region matched record boundaries but yielded nothing. Oldest: usable.
	let degenerate = "== Wikis ==\n\
	                  <!-- LIST START -->\n\
	                  {{Wiki list record}}\n\
	                  {{Wiki list record}}\n\
	                  <!-- LIST END -->\n\
	                  <!-- CATS START -->\n\
	                  {{Category record | Games \n\
	                  | articles = 0\n\
	                  | artcount = 0\n\
	                  | images = 0\n\
	                  | imgcount = 0\n\
	                  }}\n\
	                  <!-- CATS END -->\n"
		.to_string();

	store.add_page(
		"Project:List",
		vec![
			(
				revision(12, at(2015, 6, 3), "Visitor", "vandalism"),
				list_page_text(),
			),
			(
				revision(11, at(2015, 6, 2), "Admin", "broke the list"),
				degenerate,
			),
			(
				revision(10, at(2015, 5, 28), "Admin", "adding a wiki"),
				list_page_text(),
			),
		],
	);

	let mut stats = seeded_stats();
	let mut queue = WriteQueue::new();
	let mut ctx = RunContext {
		store: &store,
		stats: &mut stats,
		config: &config,
		templates: &mut templates,
		queue: &mut queue,
		now: now(),
		options: RunOptions {
			force_list: true,
			..RunOptions::default()
		},
	};

	let base = select_list_revision(&mut ctx).expect("finds a usable revision");
	assert_eq!(base.revision, 10);
	assert_eq!(base.codes, ["alpha", "beta"]);
	assert_eq!(base.categories, ["games"]);
}

#[test]
fn category_summaries_average_only_qualifying_entries() {
	let config = sample_config();
	let records = vec![Record::from_iter([("name", "Games")])];

	let entry = |code: &str, articles: u64, images: u64, categories: &[&str]| {
		ListEntry {
			code: code.to_string(),
			name: code.to_uppercase(),
			display: String::new(),
			address: format!("http://{code}.wikia.com/"),
			categories: categories.iter().map(|c| (*c).to_string()).collect(),
			articles,
			images,
			users: 1,
			admins: 1,
		}
	};

	let entries = vec![
		entry("a", 120, 40, &["games"]),
		entry("b", 61, 4, &["games"]),
		entry("c", 10, 90, &["games"]),
		entry("d", 500, 500, &[]),
	];

	let summaries = summarize_categories(&records, &entries, &config.limits);
	assert_eq!(summaries.len(), 1);

	let games = &summaries[0];
	assert_eq!(games.name, "Games");
	// Articles: a (120) and b (61) qualify against the 50 limit.
	assert_eq!(games.artcount, 2);
	assert!(float_cmp::approx_eq!(f64, games.articles, 90.5));
	// Images: a (40) and c (90) qualify against the 10 limit.
	assert_eq!(games.imgcount, 2);
	assert!(float_cmp::approx_eq!(f64, games.images, 65.0));
}

#[test]
fn config_parses_from_toml_and_round_trips_as_json() -> RankbotResult<()> {
	let parsed: RankbotConfig = toml::from_str(SAMPLE_CONFIG_TOML)
		.map_err(|error| RankbotError::ConfigParse(error.to_string()))?;
	assert_eq!(parsed, sample_config());

	// Defaults fill the omitted sections.
	assert_eq!(parsed.admin_active_days, 60);
	assert_eq!(parsed.messages.no_wiki, "wiki doesn't exist");

	let json = parsed.dump_json()?;
	let reloaded = RankbotConfig::load_json(&json)?;
	assert_eq!(reloaded, parsed);

	Ok(())
}

#[test]
fn config_discovery_walks_the_candidate_list() -> RankbotResult<()> {
	let dir = tempfile::tempdir()?;

	assert!(matches!(
		RankbotConfig::discover(dir.path()),
		Err(RankbotError::ConfigNotFound { .. })
	));

	std::fs::write(dir.path().join(".rankbot.toml"), SAMPLE_CONFIG_TOML)?;
	let discovered = RankbotConfig::discover(dir.path())?;
	assert_eq!(discovered, sample_config());

	// An earlier candidate takes precedence, even when it fails to parse.
	std::fs::write(dir.path().join("rankbot.toml"), "not valid toml [")?;
	assert!(matches!(
		RankbotConfig::discover(dir.path()),
		Err(RankbotError::ConfigParse(_))
	));

	Ok(())
}

#[test]
fn messages_fill_placeholders() {
	let messages = Messages::default();

	assert_eq!(
		messages.column_update_summary(7),
		"Robot: Updating static column. Row count: 7"
	);
	let wrong = messages.wrong_language(&strings(&["en", "pl"]), "de");
	assert!(wrong.contains("en, pl"));
	assert!(wrong.contains("de"));
}
