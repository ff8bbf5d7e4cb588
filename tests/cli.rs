//! Spawns the compiled binary against a scratch db file and asserts on its
//! exact stdout, the way a REPL driven by piped input is meant to behave.

use std::io::Write;
use std::process::{Command, Stdio};

fn run_script(commands: &[&str], db_path: &std::path::Path) -> Vec<String> {
    let mut child = Command::new(env!("CARGO_BIN_EXE_tinybase"))
        .arg(db_path)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to spawn tinybase");

    {
        let stdin = child.stdin.as_mut().expect("piped stdin");
        for command in commands {
            writeln!(stdin, "{command}").unwrap();
        }
    }

    let output = child.wait_with_output().expect("failed to wait on child");
    let stdout = String::from_utf8(output.stdout).expect("stdout is utf8");
    stdout.split('\n').map(str::to_string).collect()
}

#[test]
fn inserts_and_retrieves_a_row() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("test.db");
    let result = run_script(
        &["insert 1 user1 person1@example.com", "select", ".exit"],
        &db_path,
    );
    assert_eq!(
        result,
        vec![
            "db > Executed.",
            "db > (1, user1, person1@example.com)",
            "Executed.",
            "db > ",
        ]
    );
}

#[test]
fn allows_inserting_strings_that_are_the_maximum_length() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("test.db");
    let username = "a".repeat(32);
    let email = "a".repeat(255);
    let result = run_script(
        &[&format!("insert 1 {username} {email}"), "select", ".exit"],
        &db_path,
    );
    assert_eq!(result[0], "db > Executed.");
    assert_eq!(result[1], format!("db > ({}, {}, {})", 1, username, email));
    assert_eq!(result[2], "Executed.");
    assert_eq!(result[3], "db > ");
}

#[test]
fn prints_error_message_if_strings_are_too_long() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("test.db");
    let username = "a".repeat(33);
    let email = "a".repeat(256);
    let result = run_script(&[&format!("insert 1 {username} {email}"), ".exit"], &db_path);
    assert_eq!(result, vec!["db > String is too long.", "db > "]);
}

#[test]
fn prints_an_error_message_if_id_is_negative() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("test.db");
    let result = run_script(&["insert -1 cstack foo@bar.com", ".exit"], &db_path);
    assert_eq!(result, vec!["db > ID must be positive.", "db > "]);
}

#[test]
fn prints_an_error_message_for_a_duplicate_key() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("test.db");
    let result = run_script(
        &[
            "insert 1 user1 person1@example.com",
            "insert 1 user1 person1@example.com",
            ".exit",
        ],
        &db_path,
    );
    assert_eq!(
        result,
        vec!["db > Executed.", "db > Error: Duplicate key.", "db > "]
    );
}

#[test]
fn keeps_data_after_closing_connection() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("test.db");

    let result1 = run_script(&["insert 1 user1 person1@example.com", ".exit"], &db_path);
    assert_eq!(result1, vec!["db > Executed.", "db > "]);

    let result2 = run_script(&["select", ".exit"], &db_path);
    assert_eq!(
        result2,
        vec![
            "db > (1, user1, person1@example.com)",
            "Executed.",
            "db > ",
        ]
    );
}

#[test]
fn prints_constants() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("test.db");
    let result = run_script(&[".constants", ".exit"], &db_path);
    assert_eq!(result[0], "db > Constants:");
    assert!(result.iter().any(|line| line.starts_with("ROW_SIZE:")));
}

#[test]
fn prints_an_allocated_btree_structure_after_multiple_splits() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("test.db");

    let mut commands: Vec<String> = (1..=14)
        .map(|i| format!("insert {i} user{i} person{i}@example.com"))
        .collect();
    commands.push(".btree".to_string());
    commands.push(".exit".to_string());
    let command_refs: Vec<&str> = commands.iter().map(String::as_str).collect();

    let result = run_script(&command_refs, &db_path);
    assert!(result.iter().any(|line| line.contains("internal (size")));
    assert_eq!(result.last().unwrap(), "db > ");
}
