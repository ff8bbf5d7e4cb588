//! Fixed-width record codec for the table's one schema: `(id, username, email)`.
//!
//! The layout is part of the on-disk contract (it is what `.constants` reports
//! and what a previous process left on disk), so it is hand-rolled against
//! explicit byte offsets rather than routed through a general-purpose
//! serialization format.

pub const USERNAME_MAX_LEN: usize = 32;
pub const EMAIL_MAX_LEN: usize = 255;

const ID_SIZE: usize = std::mem::size_of::<u32>();
const USERNAME_SIZE: usize = USERNAME_MAX_LEN + 1; // + null terminator
const EMAIL_SIZE: usize = EMAIL_MAX_LEN + 1;

const ID_OFFSET: usize = 0;
const USERNAME_OFFSET: usize = ID_OFFSET + ID_SIZE;
const EMAIL_OFFSET: usize = USERNAME_OFFSET + USERNAME_SIZE;

/// Total encoded size of a row: 4 + 33 + 256 = 293 bytes.
pub const ROW_SIZE: usize = ID_SIZE + USERNAME_SIZE + EMAIL_SIZE;

/// A single record of the table's one schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub id: u32,
    pub username: String,
    pub email: String,
}

impl Row {
    pub fn new(id: u32, username: impl Into<String>, email: impl Into<String>) -> Self {
        Row {
            id,
            username: username.into(),
            email: email.into(),
        }
    }
}

/// Encodes a row into its fixed 293-byte on-disk representation.
///
/// Strings are copied in and the remainder of their field (including the
/// terminator byte) is left zeroed. Callers are expected to have already
/// validated string lengths; this function does not re-check them.
pub fn encode_row(row: &Row) -> [u8; ROW_SIZE] {
    let mut buf = [0u8; ROW_SIZE];
    buf[ID_OFFSET..ID_OFFSET + ID_SIZE].copy_from_slice(&row.id.to_le_bytes());

    let username_bytes = row.username.as_bytes();
    buf[USERNAME_OFFSET..USERNAME_OFFSET + username_bytes.len()].copy_from_slice(username_bytes);

    let email_bytes = row.email.as_bytes();
    buf[EMAIL_OFFSET..EMAIL_OFFSET + email_bytes.len()].copy_from_slice(email_bytes);

    buf
}

/// Decodes a row from its fixed 293-byte on-disk representation.
///
/// Strings are read up to their null terminator (or the full field width if
/// no zero byte is present).
pub fn decode_row(buf: &[u8; ROW_SIZE]) -> Row {
    let id = u32::from_le_bytes(
        buf[ID_OFFSET..ID_OFFSET + ID_SIZE]
            .try_into()
            .expect("id field is exactly ID_SIZE bytes"),
    );
    let username = read_fixed_str(&buf[USERNAME_OFFSET..USERNAME_OFFSET + USERNAME_SIZE]);
    let email = read_fixed_str(&buf[EMAIL_OFFSET..EMAIL_OFFSET + EMAIL_SIZE]);

    Row { id, username, email }
}

fn read_fixed_str(field: &[u8]) -> String {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    String::from_utf8_lossy(&field[..end]).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_row() {
        let row = Row::new(1, "user1", "person1@example.com");
        let encoded = encode_row(&row);
        assert_eq!(encoded.len(), ROW_SIZE);
        let decoded = decode_row(&encoded);
        assert_eq!(row, decoded);
    }

    #[test]
    fn round_trips_maximum_length_strings() {
        let username = "a".repeat(USERNAME_MAX_LEN);
        let email = "a".repeat(EMAIL_MAX_LEN);
        let row = Row::new(42, username, email);
        let decoded = decode_row(&encode_row(&row));
        assert_eq!(row, decoded);
    }

    #[test]
    fn leaves_unused_bytes_zeroed() {
        let row = Row::new(1, "ab", "c");
        let encoded = encode_row(&row);
        assert_eq!(encoded[USERNAME_OFFSET + 2], 0);
        assert_eq!(encoded[EMAIL_OFFSET + 1], 0);
    }

    #[test]
    fn row_size_matches_the_published_constant() {
        assert_eq!(ROW_SIZE, 293);
    }
}
