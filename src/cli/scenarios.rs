//! End-to-end command runs against a throwaway store.

use crate::cli::dispatch::{dispatch, Context, Outcome};
use crate::error::{Result, VaultError};
use crate::models::options::{parse_options, OptionValue};
use crate::models::settings::Settings;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

struct Harness {
    dir: TempDir,
    ctx: Context,
}

impl Harness {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let ctx = Context {
            file: Some(dir.path().join("logons.db")),
            local: false,
            settings: Settings::default(),
            actor: "tester".to_string(),
            non_interactive: true,
        };
        Self { dir, ctx }
    }

    fn store_path(&self) -> PathBuf {
        self.dir.path().join("logons.db")
    }

    fn run(&self, line: &[&str]) -> (Result<Outcome>, String) {
        let args: Vec<String> = line[1..].iter().map(|s| s.to_string()).collect();
        let mut out = Vec::new();
        let result = dispatch(line[0], &args, &self.ctx, &mut out);
        (result, String::from_utf8(out).unwrap())
    }

    /// Run a command that must fully succeed and return its stdout.
    fn ok(&self, line: &[&str]) -> String {
        let (result, out) = self.run(line);
        let outcome = result.unwrap_or_else(|e| panic!("{:?} failed: {}", line, e));
        assert_eq!(outcome.failures, 0, "{:?} reported failures", line);
        out
    }

    fn err(&self, line: &[&str]) -> VaultError {
        match self.run(line).0 {
            Ok(_) => panic!("{:?} unexpectedly succeeded", line),
            Err(e) => e,
        }
    }

    fn add_conn1(&self) {
        self.ok(&[
            "add",
            "conn1",
            "userid=bob",
            "password=secret",
            "server=srv1",
            "dbms=oracle",
            "database=db1",
        ]);
    }
}

#[test]
fn test_add_then_show_masks_password() {
    let h = Harness::new();
    h.add_conn1();
    let shown = h.ok(&["show", "conn1"]);
    assert!(shown.contains("userid: bob"));
    assert!(shown.contains("password: [encrypted]"));
    assert!(shown.contains("server: srv1"));
    assert!(shown.contains("dbms: oracle"));
    assert!(shown.contains("database: db1"));
    assert!(shown.contains("create_userid: tester"));
    assert!(!shown.contains("secret"));
}

#[test]
fn test_export_decrypts_password() {
    let h = Harness::new();
    h.add_conn1();
    assert_eq!(h.ok(&["export", "conn1"]), "conn1|bob|secret|srv1|oracle|db1\n");
    assert_eq!(h.ok(&["export", "conn1", "name", "password"]), "conn1|secret\n");
}

#[test]
fn test_password_is_not_stored_in_plaintext() {
    let h = Harness::new();
    h.add_conn1();
    let raw = fs::read_to_string(h.store_path()).unwrap();
    assert!(!raw.contains("secret"));
}

#[test]
fn test_set_password_then_export() {
    let h = Harness::new();
    h.add_conn1();
    h.ok(&["set", "conn1", "password", "newsecret"]);
    assert_eq!(
        h.ok(&["export", "conn1"]),
        "conn1|bob|newsecret|srv1|oracle|db1\n"
    );
    assert_eq!(h.ok(&["password", "conn1", "decrypt"]), "newsecret\n");
    assert_ne!(h.ok(&["password", "conn1"]), "newsecret\n");
}

#[test]
fn test_set_password_without_value_needs_a_terminal() {
    let h = Harness::new();
    h.add_conn1();
    assert!(matches!(
        h.err(&["set", "conn1", "password"]),
        VaultError::Usage(_)
    ));
}

#[test]
fn test_duplicate_add_leaves_store_unchanged() {
    let h = Harness::new();
    h.add_conn1();
    let before = fs::read(h.store_path()).unwrap();

    let err = h.err(&["add", "conn1", "userid=mallory"]);
    assert!(matches!(err, VaultError::AlreadyExists(_)));
    let err = h.err(&["add", "Conn1", "userid=mallory"]);
    assert!(matches!(err, VaultError::AlreadyExists(_)));

    assert_eq!(fs::read(h.store_path()).unwrap(), before);
    assert_eq!(h.ok(&["userid", "conn1"]), "bob\n");
}

#[test]
fn test_delete_then_list() {
    let h = Harness::new();
    h.add_conn1();
    h.ok(&["add", "conn2"]);
    assert_eq!(h.ok(&["delete", "conn1"]), "Entry conn1 deleted.\n");
    assert_eq!(h.ok(&["list"]), "conn2\n");
    assert!(matches!(
        h.err(&["delete", "conn1"]),
        VaultError::NotFound(_)
    ));
}

#[test]
fn test_list_sorted_without_keypair() {
    let h = Harness::new();
    for name in ["zeta", "Alpha", "mid"] {
        h.ok(&["add", name]);
    }
    assert_eq!(h.ok(&["list"]), "alpha\nmid\nzeta\n");
    let long = h.ok(&["list", "--long"]);
    assert!(long.contains("alpha"));
    assert!(!long.contains("@keypair"));
}

#[test]
fn test_update_merges_options_and_set_replaces() {
    let h = Harness::new();
    h.add_conn1();
    h.ok(&["update", "conn1", r#"options={"timeout":30}"#]);
    h.ok(&["update", "conn1", r#"options={"retries":3}"#]);
    let merged = parse_options(h.ok(&["options", "conn1"]).trim()).unwrap();
    assert_eq!(merged.len(), 2);
    assert_eq!(merged["timeout"], OptionValue::Integer(30));
    assert_eq!(merged["retries"], OptionValue::Integer(3));

    h.ok(&["set", "conn1", "options", r#"{"ssl":true}"#]);
    let replaced = parse_options(h.ok(&["options", "conn1"]).trim()).unwrap();
    assert_eq!(replaced.len(), 1);
    assert_eq!(replaced["ssl"], OptionValue::Bool(true));
}

#[test]
fn test_failed_update_applies_nothing() {
    let h = Harness::new();
    h.add_conn1();
    let err = h.err(&["update", "conn1", "userid=alice", "color=blue"]);
    assert!(matches!(err, VaultError::InvalidAttribute(_)));
    let err = h.err(&["update", "conn1", "userid=alice", "options=[1,2]"]);
    assert!(matches!(err, VaultError::InvalidOptions(_)));
    assert_eq!(h.ok(&["userid", "conn1"]), "bob\n");
}

#[test]
fn test_remove_option_all_and_noop() {
    let h = Harness::new();
    h.ok(&["add", "conn1", r#"options={"a":1,"b":2,"c":3}"#]);

    h.ok(&["remove-option", "conn1", "a"]);
    let left = parse_options(h.ok(&["options", "conn1"]).trim()).unwrap();
    assert_eq!(left.len(), 2);

    let stamp = h.ok(&["last-updt-ts", "conn1"]);
    let out = h.ok(&["remove-option", "conn1", "nosuch"]);
    assert!(out.contains("nosuch is not in options."));
    assert_eq!(h.ok(&["last-updt-ts", "conn1"]), stamp);

    h.ok(&["rm-options", "conn1", "ALL"]);
    assert_eq!(h.ok(&["options", "conn1"]), "{}\n");
}

#[test]
fn test_query_matches_every_criterion() {
    let h = Harness::new();
    h.add_conn1();
    h.ok(&["add", "conn2", "userid=bob", "server=srv2"]);
    let out = h.ok(&["query", "userid=bob", "server=srv2"]);
    assert!(out.contains("name: conn2"));
    assert!(!out.contains("name: conn1"));
    assert_eq!(h.ok(&["query", "userid=nobody"]), "");
    assert!(matches!(
        h.err(&["query", "password=secret"]),
        VaultError::InvalidAttribute(_)
    ));
}

#[test]
fn test_export_all_round_trips_through_load_from_text() {
    let h = Harness::new();
    h.add_conn1();
    h.ok(&["add", "conn2", "userid=amy", "dbms=postgres"]);
    let dump = h.ok(&["export", "all"]);
    assert_eq!(dump.lines().count(), 2);

    let dump_file = h.dir.path().join("dump.txt");
    fs::write(&dump_file, &dump).unwrap();

    let other = Harness::new();
    let out = other.ok(&["load-from-text", dump_file.to_str().unwrap()]);
    assert!(out.contains("Imported 2 records."));
    assert_eq!(other.ok(&["export", "all"]), dump);
}

#[test]
fn test_load_from_text_skips_bad_lines() {
    let h = Harness::new();
    let file = h.dir.path().join("in.txt");
    fs::write(&file, "conn1|bob|secret|srv1|oracle|db1\nbroken|line\n\nconn2||||db2|\n").unwrap();
    let (result, out) = h.run(&["load-from-text", file.to_str().unwrap()]);
    let outcome = result.unwrap();
    assert_eq!(outcome.failures, 1);
    assert_eq!(outcome.exit_code(), 1);
    assert!(out.contains("Imported 2 records."));
    assert_eq!(h.ok(&["list"]), "conn1\nconn2\n");
    assert_eq!(h.ok(&["dbms", "conn2"]), "db2\n");
}

#[test]
fn test_load_from_text_keeps_creation_audit() {
    let h = Harness::new();
    h.add_conn1();
    let created = h.ok(&["create-ts", "conn1"]);
    let file = h.dir.path().join("in.txt");
    fs::write(&file, "conn1|carol|pw|srv9|oracle|db1\n").unwrap();
    h.ok(&["load-from-text", file.to_str().unwrap()]);
    assert_eq!(h.ok(&["create-ts", "conn1"]), created);
    assert_eq!(h.ok(&["userid", "conn1"]), "carol\n");
}

#[test]
fn test_import_without_filename_is_missing_file() {
    let h = Harness::new();
    for command in ["load-from-text", "bulk-add"] {
        let err = h.err(&[command]);
        assert!(matches!(err, VaultError::MissingFile(_)));
        assert_eq!(err.exit_code(), 2);
    }
}

#[test]
fn test_bulk_add_reports_and_continues() {
    let h = Harness::new();
    h.add_conn1();
    let file = h.dir.path().join("adds.txt");
    fs::write(
        &file,
        "# staging logons\nconn2 userid=amy\nconn1 userid=dup\nconn3 color=red\nconn4 server=srv4\n",
    )
    .unwrap();
    let (result, out) = h.run(&["bulk-add", file.to_str().unwrap()]);
    assert_eq!(result.unwrap().failures, 2);
    assert!(out.contains("Entry conn2 added."));
    assert!(out.contains("Entry conn4 added."));
    assert_eq!(h.ok(&["list"]), "conn1\nconn2\nconn4\n");
    assert_eq!(h.ok(&["userid", "conn1"]), "bob\n");
}

#[test]
fn test_gen_add_cmd_single_entry_is_a_command_line() {
    let h = Harness::new();
    h.ok(&["add", "conn1", "userid=bob", "password=secret", r#"options={"timeout":30}"#]);
    assert_eq!(
        h.ok(&["gen-add-cmd", "conn1"]),
        "logonmgr add conn1 userid=bob password=secret options='{\"timeout\":30}'\n"
    );
}

#[test]
fn test_gen_add_cmd_all_feeds_bulk_add() {
    let h = Harness::new();
    h.ok(&["add", "conn1", "userid=bob", "password=p w'$x", r#"options={"mode":"read only"}"#]);
    h.ok(&["add", "conn2", "userid=amy", "server=srv 2", "dbms=oracle"]);
    let dump = h.ok(&["gen-add-cmd", "all"]);
    assert_eq!(dump.lines().count(), 2);
    assert!(dump.lines().all(|l| !l.starts_with("logonmgr")));

    let file = h.dir.path().join("adds.txt");
    fs::write(&file, &dump).unwrap();
    let other = Harness::new();
    other.ok(&["bulk-add", file.to_str().unwrap()]);
    assert_eq!(other.ok(&["list"]), "conn1\nconn2\n");
    assert_eq!(other.ok(&["export", "all"]), h.ok(&["export", "all"]));
    assert_eq!(other.ok(&["options", "conn1"]), h.ok(&["options", "conn1"]));
}

#[test]
fn test_update_missing_entry_is_not_found() {
    let h = Harness::new();
    h.add_conn1();
    assert!(matches!(
        h.err(&["update", "nosuch", "userid=amy"]),
        VaultError::NotFound(_)
    ));
}

#[test]
fn test_set_unknown_attribute_is_rejected() {
    let h = Harness::new();
    h.add_conn1();
    let before = fs::read(h.store_path()).unwrap();
    assert!(matches!(
        h.err(&["set", "conn1", "color", "x"]),
        VaultError::InvalidAttribute(_)
    ));
    assert_eq!(fs::read(h.store_path()).unwrap(), before);
}

#[test]
fn test_update_with_empty_options_clears_them() {
    let h = Harness::new();
    h.ok(&["add", "conn1", r#"options={"a":1}"#]);
    h.ok(&["update", "conn1", "options="]);
    assert_eq!(h.ok(&["options", "conn1"]), "{}\n");
}

#[test]
fn test_export_all_skips_corrupt_entry() {
    let h = Harness::new();
    h.add_conn1();
    let mut doc: serde_json::Value =
        serde_json::from_slice(&fs::read(h.store_path()).unwrap()).unwrap();
    doc["records"]["broken"] = serde_json::json!({"name": ["not", "a", "string"]});
    fs::write(h.store_path(), serde_json::to_vec(&doc).unwrap()).unwrap();

    let (result, out) = h.run(&["export", "all"]);
    assert_eq!(result.unwrap().failures, 1);
    assert_eq!(out, "conn1|bob|secret|srv1|oracle|db1\n");
    assert!(matches!(
        h.err(&["show", "broken"]),
        VaultError::CorruptEntry { .. }
    ));
}

#[test]
fn test_read_command_on_missing_store_creates_it() {
    let h = Harness::new();
    assert!(!h.store_path().exists());
    assert_eq!(h.ok(&["list"]), "");
    assert!(h.store_path().exists());
    let info = h.ok(&["info"]);
    assert!(info.contains("Number of entries: 0"));
    assert!(info.contains("Key fingerprint: "));
}

#[test]
fn test_keypair_is_stable_across_runs() {
    let h = Harness::new();
    h.add_conn1();
    let first = h.ok(&["info"]);
    h.ok(&["add", "conn2"]);
    let second = h.ok(&["info"]);
    let fingerprint = |text: &str| {
        text.lines()
            .find(|l| l.starts_with("Key fingerprint: "))
            .map(str::to_string)
    };
    assert_eq!(fingerprint(&first), fingerprint(&second));
    assert_eq!(h.ok(&["password", "conn1", "decrypt"]), "secret\n");
}

#[test]
fn test_not_found_is_reported() {
    let h = Harness::new();
    h.add_conn1();
    let err = h.err(&["show", "nosuch"]);
    assert_eq!(err.to_string(), "Connection Entry nosuch not found");
    assert_eq!(err.exit_code(), 1);
}
