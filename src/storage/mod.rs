mod btree;
mod cursor;
mod node;
mod pager;
mod row;

pub use btree::{constants_dump, Table};
pub use row::{Row, EMAIL_MAX_LEN, USERNAME_MAX_LEN};
