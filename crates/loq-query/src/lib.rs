//! Lexer, parser, and pipe AST for the loq query pipeline language.
//!
//! A query tail is a `|`-separated chain of pipes:
//!
//! ```text
//! stats by (host, level) count(*) as hits, uniq(ip) as ips | head 100
//! ```
//!
//! Supported pipes: `fields`, `stats`, `head`, `skip`. Stats functions:
//! `count(...)` and `uniq(...)`, each with an optional `as NAME` suffix
//! defaulting to the bare function name.

pub mod lexer;
pub mod parser;
pub mod pipe;

pub use parser::parse_pipes;
pub use pipe::{
    FieldsPipe, HeadPipe, Pipe, SkipPipe, StatsCount, StatsFunc, StatsPipe, StatsUniq,
};
