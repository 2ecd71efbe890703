pub mod command;
pub mod parse;
pub mod scanner;

pub use command::{CommandPath, Params, ParsedCommand};
pub use parse::{MAX_PARAM_PAIRS, ParseError, ParseErrorKind, ValueCasing};
pub use scanner::find_next_key_start;
