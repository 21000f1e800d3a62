use std::path::PathBuf;

use chrono::NaiveDate;
use clap::Args;
use clap::Parser;
use clap::Subcommand;

#[derive(Parser)]
#[command(
	author,
	version,
	about = "Keep wiki list and ranking pages up to date from entity statistics.",
	long_about = "rankbot maintains a wiki's list-of-wikis page and the ranking pages derived \
	              from it. It regenerates marker-delimited regions in place — the catalog of \
	              records, per-category summaries, and the ranked columns — while leaving every \
	              byte outside those regions untouched.\n\nQuick start:\n  rankbot check   \
	              Compute all updates and show diffs without writing\n  rankbot update  Refresh \
	              the list and rankings and save the queued pages"
)]
pub struct RankbotCli {
	#[command(subcommand)]
	pub command: Commands,

	/// Path to the site directory (pages, entities, users, config).
	#[arg(long, short, global = true, default_value = ".")]
	pub site: PathBuf,

	/// Path to the config file. Discovered inside the site directory when
	/// omitted.
	#[arg(long, short, global = true)]
	pub config: Option<PathBuf>,

	/// Enable verbose output.
	#[arg(long, short, global = true, default_value_t = false)]
	pub verbose: bool,

	/// Disable colored output.
	#[arg(long, global = true, default_value_t = false)]
	pub no_color: bool,
}

#[derive(Subcommand)]
pub enum Commands {
	/// Refresh the list and rankings, then save every queued page.
	///
	/// Selects the newest usable revision of the list page, refreshes every
	/// entry from the statistics source, folds in accepted talk-page
	/// proposals, recomputes the rankings against their previous render, and
	/// flushes the write queue once every compute stage has succeeded.
	Update {
		#[command(flatten)]
		flags: RunFlags,
	},
	/// Compute every update but write nothing; show diffs instead.
	///
	/// Runs the identical pipeline as `update` with restrictions treated as
	/// advisory, then prints a unified diff per queued page. Ideal for
	/// verifying a config change before letting the bot loose.
	Check {
		#[command(flatten)]
		flags: RunFlags,
	},
	/// Inspect, dump, or validate the configuration.
	Config {
		/// Write the effective config to this file as JSON.
		#[arg(long, value_name = "FILE")]
		dump: Option<PathBuf>,

		/// Validate a JSON settings blob instead of the site config.
		#[arg(long, value_name = "FILE")]
		load: Option<PathBuf>,
	},
}

/// Flags shared by `update` and `check`.
#[derive(Args, Clone, Debug, Default)]
pub struct RunFlags {
	/// Ignore the edit restriction on the list page.
	#[arg(long, default_value_t = false)]
	pub force_list: bool,

	/// Ignore the edit restriction on ranking pages.
	#[arg(long, default_value_t = false)]
	pub force_ranking: bool,

	/// Leave movement markers out of the rankings.
	#[arg(long, default_value_t = false)]
	pub clean: bool,

	/// Only update the list of wikis; rankings won't be changed at all.
	#[arg(long, default_value_t = false)]
	pub list_only: bool,

	/// Keep an old recorded name as the displayed name when the canonical
	/// name has changed.
	#[arg(long, default_value_t = false)]
	pub save_old: bool,

	/// Use the revision made on that day (or the next one right after it)
	/// as the ranking position reference.
	#[arg(long, value_name = "YYYY-MM-DD")]
	pub revision_day: Option<NaiveDate>,
}

pub mod store;
