mod common;

use assert_cmd::Command;
use predicates::prelude::*;

fn rankbot(site: &std::path::Path) -> Command {
	let mut command = Command::cargo_bin("rankbot").unwrap();
	command.arg("--no-color").arg("--site").arg(site);
	command
}

#[test]
fn config_summary_names_the_maintained_pages() {
	let dir = tempfile::tempdir().unwrap();
	common::write_site(dir.path());

	rankbot(dir.path())
		.arg("config")
		.assert()
		.success()
		.stdout(predicate::str::contains("list page: Project:List"))
		.stdout(predicate::str::contains("languages: en"));
}

#[test]
fn config_dump_and_load_round_trip_as_json() {
	let dir = tempfile::tempdir().unwrap();
	common::write_site(dir.path());
	let blob = dir.path().join("settings.json");

	rankbot(dir.path())
		.arg("config")
		.arg("--dump")
		.arg(&blob)
		.assert()
		.success()
		.stdout(predicate::str::contains("config written to"));

	let json = std::fs::read_to_string(&blob).unwrap();
	assert!(json.contains("\"Project:List\""));

	rankbot(dir.path())
		.arg("config")
		.arg("--load")
		.arg(&blob)
		.assert()
		.success()
		.stdout(predicate::str::contains("valid settings blob"));
}

#[test]
fn config_load_rejects_garbage() {
	let dir = tempfile::tempdir().unwrap();
	common::write_site(dir.path());
	let blob = dir.path().join("settings.json");
	std::fs::write(&blob, "not json at all").unwrap();

	rankbot(dir.path())
		.arg("config")
		.arg("--load")
		.arg(&blob)
		.assert()
		.code(1)
		.stderr(predicate::str::contains("failed to parse config"));
}
