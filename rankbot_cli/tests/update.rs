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
fn update_refreshes_list_and_ranking() {
	let dir = tempfile::tempdir().unwrap();
	common::write_site(dir.path());

	rankbot(dir.path())
		.arg("update")
		.assert()
		.success()
		.stdout(predicate::str::contains("updated Project:List"))
		.stdout(predicate::str::contains("updated Project:Ranking/Articles"))
		.stdout(predicate::str::contains("skipped Project:Ranking/Images"))
		.stdout(predicate::str::contains("2 page(s) saved"));

	let list = std::fs::read_to_string(dir.path().join("pages").join("list.toml")).unwrap();
	// A bot revision landed on top of the manual one.
	assert_eq!(list.matches("[[revisions]]").count(), 2);
	assert!(list.contains("Robot: Updating wiki list"));
	assert!(list.contains("| articles = 120"));

	let ranking =
		std::fs::read_to_string(dir.path().join("pages").join("ranking_articles.toml")).unwrap();
	assert!(ranking.contains("Robot: Updating wiki ranking"));
	// The walk assigns place 1 to the lowest admitted count.
	assert!(ranking.contains("| 1   | ++ |      80"));
	assert!(ranking.contains("| 2   | -- |     120"));
}

#[test]
fn second_update_is_edit_restricted() {
	let dir = tempfile::tempdir().unwrap();
	common::write_site(dir.path());

	rankbot(dir.path()).arg("update").assert().success();

	rankbot(dir.path())
		.arg("update")
		.assert()
		.code(4)
		.stderr(predicate::str::contains("edit restricted"));
}

#[test]
fn forced_update_ignores_the_restriction() {
	let dir = tempfile::tempdir().unwrap();
	common::write_site(dir.path());

	rankbot(dir.path()).arg("update").assert().success();

	rankbot(dir.path())
		.arg("update")
		.arg("--force-list")
		.arg("--force-ranking")
		.assert()
		.success();
}

#[test]
fn missing_config_exits_with_code_one() {
	let dir = tempfile::tempdir().unwrap();

	rankbot(dir.path())
		.arg("update")
		.assert()
		.code(1)
		.stderr(predicate::str::contains("no config file found"));
}

#[test]
fn missing_list_page_exits_with_code_two() {
	let dir = tempfile::tempdir().unwrap();
	common::write_site(dir.path());
	std::fs::remove_file(dir.path().join("pages").join("list.toml")).unwrap();

	rankbot(dir.path())
		.arg("update")
		.assert()
		.code(2)
		.stderr(predicate::str::contains("does not exist"));
}

#[test]
fn list_only_update_leaves_the_ranking_file_alone() {
	let dir = tempfile::tempdir().unwrap();
	common::write_site(dir.path());

	let ranking_path = dir.path().join("pages").join("ranking_articles.toml");
	let before = std::fs::read_to_string(&ranking_path).unwrap();

	rankbot(dir.path())
		.arg("update")
		.arg("--list-only")
		.assert()
		.success()
		.stdout(predicate::str::contains("updated Project:List"));

	let after = std::fs::read_to_string(&ranking_path).unwrap();
	assert_eq!(before, after);
}
