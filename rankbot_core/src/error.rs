use miette::Diagnostic;
use thiserror::Error;

use crate::region::MissingMarker;

#[derive(Debug, Diagnostic, Error)]
#[non_exhaustive]
pub enum RankbotError {
	#[error(transparent)]
	#[diagnostic(code(rankbot::io_error))]
	Io(#[from] std::io::Error),

	#[error("failed to parse config: {0}")]
	#[diagnostic(
		code(rankbot::config_parse),
		help("check that the config file is valid and every required setting is present")
	)]
	ConfigParse(String),

	#[error("no config file found (searched: {searched})")]
	#[diagnostic(
		code(rankbot::config_not_found),
		help("create a rankbot.toml in the site directory or pass --config")
	)]
	ConfigNotFound { searched: String },

	#[error("template `{0}` declares no positional fields, cannot build a matcher for it")]
	#[diagnostic(
		code(rankbot::no_positional_fields),
		help("add at least one unnamed field to the template spec, or match on named fields only")
	)]
	NoPositionalFields(String),

	#[error("failed to compile pattern for template `{template}`: {reason}")]
	#[diagnostic(code(rankbot::pattern_build))]
	PatternBuild { template: String, reason: String },

	#[error("text did not match template `{0}`")]
	#[diagnostic(code(rankbot::template_mismatch))]
	TemplateMismatch(String),

	#[error("tags not found: `{start}` <-> `{end}`: couldn't find {missing}")]
	#[diagnostic(
		code(rankbot::tags_not_found),
		help("the page must contain both marker strings exactly as configured")
	)]
	TagsNotFound {
		start: String,
		end: String,
		missing: MissingMarker,
	},

	#[error("edit restricted: {reason}")]
	#[diagnostic(code(rankbot::edit_restricted))]
	EditRestricted { reason: String },

	#[error("page `{0}` has no revisions")]
	#[diagnostic(code(rankbot::empty_history))]
	EmptyHistory(String),

	#[error("no qualifying revision for page `{page}` ({scanned} revision(s) scanned)")]
	#[diagnostic(
		code(rankbot::no_qualifying_revision),
		help("none of the page's revisions satisfied the selection predicate")
	)]
	NoQualifyingRevision { page: String, scanned: usize },

	#[error("ran out of usable revisions for page `{0}`")]
	#[diagnostic(
		code(rankbot::out_of_revisions),
		help("every eligible revision of the page failed to yield any records")
	)]
	OutOfRevisions(String),

	#[error("page `{0}` does not exist")]
	#[diagnostic(code(rankbot::page_missing))]
	PageMissing(String),

	#[error("edit conflict while saving page `{0}`")]
	#[diagnostic(code(rankbot::edit_conflict))]
	EditConflict(String),
}

pub type RankbotResult<T> = Result<T, RankbotError>;
