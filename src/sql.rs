//! Statement and meta-command parsing.
//!
//! The grammar is deliberately tiny: `insert <id> <username> <email>` and
//! `select`, plus the dot-prefixed meta-commands handled by the REPL. Both
//! are recognized by tokenizing on whitespace rather than a general parser,
//! since there's nothing here a hand-rolled `split_whitespace` can't handle
//! correctly.

use crate::errors::Error;
use crate::storage::{Row, EMAIL_MAX_LEN, USERNAME_MAX_LEN};

#[derive(Debug, PartialEq, Eq)]
pub enum Statement {
    Insert(Row),
    Select,
}

#[derive(Debug, PartialEq, Eq)]
pub enum MetaCommand {
    Exit,
    Constants,
    Btree,
}

/// Parses a `.`-prefixed meta-command. Callers should only invoke this when
/// `input` starts with `.`.
pub fn parse_meta_command(input: &str) -> Result<MetaCommand, Error> {
    match input {
        ".exit" => Ok(MetaCommand::Exit),
        ".constants" => Ok(MetaCommand::Constants),
        ".btree" => Ok(MetaCommand::Btree),
        _ => Err(Error::Input(format!("Unrecognized command '{}'.", input))),
    }
}

/// Parses a statement line into an `insert` or `select`.
pub fn prepare_statement(input: &str) -> Result<Statement, Error> {
    let mut tokens = input.split_whitespace();
    match tokens.next() {
        Some("insert") => prepare_insert(tokens),
        Some("select") => Ok(Statement::Select),
        _ => Err(Error::Input(format!(
            "Unrecognized keyword at start of '{}'.",
            input
        ))),
    }
}

fn prepare_insert<'a>(mut tokens: impl Iterator<Item = &'a str>) -> Result<Statement, Error> {
    let id_str = tokens
        .next()
        .ok_or_else(|| Error::Input("Syntax error. Could not parse statement.".to_string()))?;
    let username = tokens
        .next()
        .ok_or_else(|| Error::Input("Syntax error. Could not parse statement.".to_string()))?;
    let email = tokens
        .next()
        .ok_or_else(|| Error::Input("Syntax error. Could not parse statement.".to_string()))?;
    if tokens.next().is_some() {
        return Err(Error::Input(
            "Syntax error. Could not parse statement.".to_string(),
        ));
    }

    let id: i64 = id_str
        .parse()
        .map_err(|_| Error::Input("Syntax error. Could not parse statement.".to_string()))?;
    if id <= 0 {
        return Err(Error::Input("ID must be positive.".to_string()));
    }
    if username.len() > USERNAME_MAX_LEN || email.len() > EMAIL_MAX_LEN {
        return Err(Error::Input("String is too long.".to_string()));
    }

    Ok(Statement::Insert(Row::new(id as u32, username, email)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_an_insert_statement() {
        let stmt = prepare_statement("insert 1 user1 person1@example.com").unwrap();
        assert_eq!(
            stmt,
            Statement::Insert(Row::new(1, "user1", "person1@example.com"))
        );
    }

    #[test]
    fn parses_a_select_statement() {
        assert_eq!(prepare_statement("select").unwrap(), Statement::Select);
    }

    #[test]
    fn rejects_negative_ids() {
        let err = prepare_statement("insert -1 cstack foo@bar.com").unwrap_err();
        assert_eq!(err.to_string(), "ID must be positive.");
    }

    #[test]
    fn rejects_strings_that_are_too_long() {
        let username = "a".repeat(USERNAME_MAX_LEN + 1);
        let input = format!("insert 1 {username} person1@example.com");
        let err = prepare_statement(&input).unwrap_err();
        assert_eq!(err.to_string(), "String is too long.");
    }

    #[test]
    fn accepts_maximum_length_strings() {
        let username = "a".repeat(USERNAME_MAX_LEN);
        let email = "a".repeat(EMAIL_MAX_LEN);
        let input = format!("insert 1 {username} {email}");
        assert!(prepare_statement(&input).is_ok());
    }

    #[test]
    fn rejects_unrecognized_keywords() {
        let err = prepare_statement("delete 1").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Unrecognized keyword at start of 'delete 1'."
        );
    }

    #[test]
    fn parses_meta_commands() {
        assert_eq!(parse_meta_command(".exit").unwrap(), MetaCommand::Exit);
        assert_eq!(
            parse_meta_command(".constants").unwrap(),
            MetaCommand::Constants
        );
        assert_eq!(parse_meta_command(".btree").unwrap(), MetaCommand::Btree);
    }

    #[test]
    fn rejects_unrecognized_meta_commands() {
        let err = parse_meta_command(".foo").unwrap_err();
        assert_eq!(err.to_string(), "Unrecognized command '.foo'.");
    }
}
