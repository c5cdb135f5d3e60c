pub mod date;

pub use date::{DateParseError, parse_date};
