//! The read-eval-print loop.
//!
//! Input is read line by line from stdin until EOF; there is no raw
//! terminal mode, cursor movement, or history recall here, since the REPL
//! is driven by piped input in tests as much as by an interactive shell.

use std::io::{self, BufRead, Write};

use tracing::info;

use crate::errors::Error;
use crate::sql::{self, MetaCommand, Statement};
use crate::storage::{self, Table};

pub fn run(table: &mut Table, mut input: impl BufRead, mut output: impl Write) -> Result<(), Error> {
    loop {
        write!(output, "db > ")?;
        output.flush()?;

        let mut line = String::new();
        let bytes_read = input.read_line(&mut line)?;
        if bytes_read == 0 {
            break;
        }
        let line = line.trim_end_matches(['\n', '\r']);

        if let Some(command) = line.strip_prefix('.') {
            match sql::parse_meta_command(&format!(".{command}")) {
                Ok(MetaCommand::Exit) => break,
                Ok(MetaCommand::Constants) => {
                    writeln!(output, "Constants:")?;
                    write!(output, "{}", storage::constants_dump())?;
                }
                Ok(MetaCommand::Btree) => {
                    writeln!(output, "Tree:")?;
                    write!(output, "{}", table.tree_dump()?)?;
                }
                Err(e) => writeln!(output, "{}", e)?,
            }
            continue;
        }

        match sql::prepare_statement(line) {
            Ok(Statement::Insert(row)) => match table.insert(&row) {
                Ok(()) => writeln!(output, "Executed.")?,
                Err(Error::DuplicateKey) => writeln!(output, "Error: Duplicate key.")?,
                Err(e @ (Error::Storage(_) | Error::Io(_))) => {
                    info!(error = %e, "storage error during insert, exiting");
                    return Err(e);
                }
                Err(e) => writeln!(output, "{}", e)?,
            },
            Ok(Statement::Select) => {
                for row in table.select_all()? {
                    writeln!(output, "({}, {}, {})", row.id, row.username, row.email)?;
                }
                writeln!(output, "Executed.")?;
            }
            Err(e) => writeln!(output, "{}", e)?,
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn run_script(commands: &[&str]) -> String {
        let file = NamedTempFile::new().unwrap();
        let mut table = Table::open(file.path()).unwrap();
        let input = commands.join("\n") + "\n";
        let mut out = Vec::new();
        run(&mut table, input.as_bytes(), &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn inserts_and_retrieves_a_row() {
        let output = run_script(&["insert 1 user1 person1@example.com", "select", ".exit"]);
        assert_eq!(
            output,
            "db > Executed.\n\
             db > (1, user1, person1@example.com)\n\
             Executed.\n\
             db > "
        );
    }

    #[test]
    fn prints_an_error_message_if_id_is_negative() {
        let output = run_script(&["insert -1 cstack foo@bar.com", ".exit"]);
        assert_eq!(output, "db > ID must be positive.\ndb > ");
    }

    #[test]
    fn prints_an_error_message_for_a_duplicate_key() {
        let output = run_script(&[
            "insert 1 user1 person1@example.com",
            "insert 1 user1 person1@example.com",
            ".exit",
        ]);
        assert_eq!(
            output,
            "db > Executed.\ndb > Error: Duplicate key.\ndb > "
        );
    }

    #[test]
    fn reports_unrecognized_meta_commands() {
        let output = run_script(&[".foo", ".exit"]);
        assert_eq!(output, "db > Unrecognized command '.foo'.\ndb > ");
    }
}
