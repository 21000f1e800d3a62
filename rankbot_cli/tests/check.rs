mod common;

use assert_cmd::Command;
use predicates::prelude::*;
use similar_asserts::assert_eq;

fn rankbot(site: &std::path::Path) -> Command {
	let mut command = Command::cargo_bin("rankbot").unwrap();
	command.arg("--no-color").arg("--site").arg(site);
	command
}

#[test]
fn check_shows_diffs_without_writing() {
	let dir = tempfile::tempdir().unwrap();
	common::write_site(dir.path());

	let list_path = dir.path().join("pages").join("list.toml");
	let ranking_path = dir.path().join("pages").join("ranking_articles.toml");
	let list_before = std::fs::read_to_string(&list_path).unwrap();
	let ranking_before = std::fs::read_to_string(&ranking_path).unwrap();

	rankbot(dir.path())
		.arg("check")
		.assert()
		.success()
		.stdout(predicate::str::contains("would save Project:List"))
		.stdout(predicate::str::contains("would save Project:Ranking/Articles"))
		.stdout(predicate::str::contains("2 page(s) would be saved"))
		// The refreshed article count appears as an insertion.
		.stdout(predicate::str::contains("+| articles = 120"))
		.stdout(predicate::str::contains("-| articles = 100"))
		// The ranking movement markers come from the previous render.
		.stdout(predicate::str::contains("| ++ |"))
		.stdout(predicate::str::contains("| -- |"));

	// Nothing was written.
	assert_eq!(std::fs::read_to_string(&list_path).unwrap(), list_before);
	assert_eq!(
		std::fs::read_to_string(&ranking_path).unwrap(),
		ranking_before
	);
}

#[test]
fn check_list_only_skips_rankings() {
	let dir = tempfile::tempdir().unwrap();
	common::write_site(dir.path());

	rankbot(dir.path())
		.arg("check")
		.arg("--list-only")
		.assert()
		.success()
		.stdout(predicate::str::contains("would save Project:List"))
		.stdout(predicate::str::contains("Ranking/Articles").not());
}

#[test]
fn check_clean_renders_no_movement_markers() {
	let dir = tempfile::tempdir().unwrap();
	common::write_site(dir.path());

	rankbot(dir.path())
		.arg("check")
		.arg("--clean")
		.assert()
		.success()
		.stdout(predicate::str::contains("| ++ |").not())
		.stdout(predicate::str::contains("| -- |").not());
}
