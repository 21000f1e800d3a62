use std::path::Path;
use std::path::PathBuf;
use std::process;

use chrono::Utc;
use clap::Parser;
use owo_colors::OwoColorize;
use rankbot_cli::Commands;
use rankbot_cli::RankbotCli;
use rankbot_cli::RunFlags;
use rankbot_cli::store::FsStats;
use rankbot_cli::store::FsStore;
use rankbot_core::PageOutcome;
use rankbot_core::RankbotConfig;
use rankbot_core::RankbotError;
use rankbot_core::RunContext;
use rankbot_core::RunOptions;
use rankbot_core::run;
use rankbot_core::site::StatsCache;
use rankbot_core::site::WriteQueue;
use similar::ChangeTag;
use similar::TextDiff;
use tracing_subscriber::EnvFilter;

fn main() {
	let cli = RankbotCli::parse();

	if cli.no_color || supports_color::on(supports_color::Stream::Stdout).is_none() {
		owo_colors::set_override(false);
	}

	let default_filter = if cli.verbose { "debug" } else { "warn" };
	let filter = EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| EnvFilter::new(default_filter));
	let _ = tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.try_init();

	process::exit(run_cli(cli));
}

/// Exit codes follow the bot's historical contract: 1 missing or invalid
/// config, 2 missing list page, 3 ran out of usable revisions, 4 edit
/// restricted.
fn exit_code(error: &RankbotError) -> i32 {
	match error {
		RankbotError::ConfigNotFound { .. } | RankbotError::ConfigParse(_) => 1,
		RankbotError::PageMissing(_) => 2,
		RankbotError::OutOfRevisions(_)
		| RankbotError::EmptyHistory(_)
		| RankbotError::NoQualifyingRevision { .. } => 3,
		RankbotError::EditRestricted { .. } => 4,
		_ => 1,
	}
}

fn fail(error: &RankbotError) -> i32 {
	eprintln!("{} {error}", "error:".red().bold());
	exit_code(error)
}

fn run_cli(cli: RankbotCli) -> i32 {
	let RankbotCli {
		command,
		site,
		config: config_path,
		..
	} = cli;

	let config = match load_config(&site, config_path.as_deref()) {
		Ok(config) => config,
		Err(error) => return fail(&error),
	};

	match command {
		Commands::Update { flags } => run_pipeline(&site, &config, &flags, false),
		Commands::Check { flags } => run_pipeline(&site, &config, &flags, true),
		Commands::Config { dump, load } => config_command(&config, dump, load),
	}
}

fn load_config(site: &Path, explicit: Option<&Path>) -> Result<RankbotConfig, RankbotError> {
	match explicit {
		Some(path) => RankbotConfig::load(path),
		None => RankbotConfig::discover(site),
	}
}

fn run_pipeline(site: &Path, config: &RankbotConfig, flags: &RunFlags, simulate: bool) -> i32 {
	let mut store = match FsStore::load(site) {
		Ok(store) => store,
		Err(error) => return fail(&error),
	};
	let mut stats = StatsCache::new(Box::new(FsStats::new(site)));
	let mut templates = match config.templates.template_set() {
		Ok(templates) => templates,
		Err(error) => return fail(&error),
	};
	let mut queue = WriteQueue::new();

	let options = RunOptions {
		force_list: flags.force_list,
		force_ranking: flags.force_ranking,
		clean: flags.clean,
		list_only: flags.list_only,
		save_old: flags.save_old,
		simulate,
		revision_day: flags.revision_day,
	};

	let report = {
		let mut ctx = RunContext {
			store: &store,
			stats: &mut stats,
			config,
			templates: &mut templates,
			queue: &mut queue,
			now: Utc::now(),
			options,
		};

		match run(&mut ctx) {
			Ok(report) => report,
			Err(error) => return fail(&error),
		}
	};

	for page in &report.pages {
		match &page.outcome {
			PageOutcome::Updated => {
				println!("{} {}", "updated".green(), page.page);
			}
			PageOutcome::Skipped(reason) => {
				println!("{} {} ({reason})", "skipped".yellow(), page.page);
			}
			PageOutcome::Failed(error) => {
				println!("{} {}: {error}", "failed".red(), page.page);
			}
			_ => {}
		}
	}

	if simulate {
		for entry in queue.entries() {
			println!("\n{} {}", "would save".cyan(), entry.page.bold());
			println!("{} {}", "summary:".dimmed(), entry.summary);
			print_diff(&entry.old_text, &entry.text);
		}
		println!("\n{} page(s) would be saved", queue.len());
		0
	} else {
		match queue.flush(&mut store) {
			Ok(saved) => {
				println!("{saved} page(s) saved");
				0
			}
			Err(error) => fail(&error),
		}
	}
}

fn print_diff(old: &str, new: &str) {
	let diff = TextDiff::from_lines(old, new);

	for change in diff.iter_all_changes() {
		match change.tag() {
			ChangeTag::Delete => print!("{}", format!("-{change}").red()),
			ChangeTag::Insert => print!("{}", format!("+{change}").green()),
			ChangeTag::Equal => {}
		}
	}
}

fn config_command(config: &RankbotConfig, dump: Option<PathBuf>, load: Option<PathBuf>) -> i32 {
	if let Some(path) = load {
		let loaded = std::fs::read_to_string(&path)
			.map_err(RankbotError::from)
			.and_then(|text| RankbotConfig::load_json(&text));

		match loaded {
			Ok(_) => println!("{} {} is a valid settings blob", "ok".green(), path.display()),
			Err(error) => return fail(&error),
		}
	}

	if let Some(path) = dump {
		let written = config
			.dump_json()
			.and_then(|json| std::fs::write(&path, json).map_err(RankbotError::from));

		match written {
			Ok(()) => println!("config written to {}", path.display()),
			Err(error) => return fail(&error),
		}
	}

	println!("list page: {}", config.pages.list.bold());
	println!(
		"rankings: {} / {}",
		config.pages.ranking_main_article, config.pages.ranking_main_image
	);
	println!("languages: {}", config.languages.join(", "));

	0
}
