//! Recursive-descent parser for the pipe language.
//!
//! Grammar (one canonical form; `as NAME` is optional and the result column
//! defaults to the bare function name):
//!
//! ```text
//! pipes      := pipe ( '|' pipe )*
//! pipe       := fields | stats | head | skip
//! fields     := 'fields' field ( ',' field )*
//! stats      := 'stats' [ 'by' '(' fields? ')' ] func ( ',' func )*
//! func       := ( 'count' | 'uniq' ) '(' fields? ')' [ 'as' field ]
//! head       := 'head' NUMBER
//! skip       := 'skip' NUMBER
//! ```

use loq_common::{LoqError, Result};

use crate::lexer::{Lexer, TokenKind};
use crate::pipe::{
    FieldsPipe, HeadPipe, Pipe, SkipPipe, StatsCount, StatsFunc, StatsPipe, StatsUniq,
};

/// Parse a full pipeline tail such as
/// `stats by (host) count(*) as hits | head 10`.
pub fn parse_pipes(input: &str) -> Result<Vec<Pipe>> {
    let mut lex = Lexer::new(input)?;
    if lex.token.kind == TokenKind::Eof {
        return Err(LoqError::Parse("empty query pipeline".to_string()));
    }

    let mut pipes = Vec::new();
    loop {
        pipes.push(parse_pipe(&mut lex)?);
        match lex.token.kind {
            TokenKind::Eof => return Ok(pipes),
            TokenKind::Pipe => lex.next_token()?,
            _ => {
                return Err(LoqError::Parse(format!(
                    "unexpected token {} at offset {}; expecting `|` or end of query",
                    lex.token.describe(),
                    lex.token.offset
                )))
            }
        }
    }
}

fn parse_pipe(lex: &mut Lexer<'_>) -> Result<Pipe> {
    if lex.token.is_keyword("fields") {
        parse_fields_pipe(lex).map(Pipe::Fields)
    } else if lex.token.is_keyword("stats") {
        parse_stats_pipe(lex).map(Pipe::Stats)
    } else if lex.token.is_keyword("head") {
        parse_head_pipe(lex).map(Pipe::Head)
    } else if lex.token.is_keyword("skip") {
        parse_skip_pipe(lex).map(Pipe::Skip)
    } else {
        Err(LoqError::Parse(format!(
            "unknown pipe {} at offset {}",
            lex.token.describe(),
            lex.token.offset
        )))
    }
}

fn parse_fields_pipe(lex: &mut Lexer<'_>) -> Result<FieldsPipe> {
    lex.next_token()?;
    let mut fields = Vec::new();
    loop {
        if lex.token.kind == TokenKind::Comma {
            return Err(LoqError::Parse(format!(
                "unexpected `,` at offset {}; expecting field name",
                lex.token.offset
            )));
        }
        fields.push(parse_field_name(lex)?);
        match lex.token.kind {
            TokenKind::Pipe | TokenKind::Eof => return Ok(FieldsPipe { fields }),
            TokenKind::Comma => lex.next_token()?,
            _ => {
                return Err(LoqError::Parse(format!(
                    "unexpected token {} at offset {}; expecting `,` or `|`",
                    lex.token.describe(),
                    lex.token.offset
                )))
            }
        }
    }
}

fn parse_stats_pipe(lex: &mut Lexer<'_>) -> Result<StatsPipe> {
    lex.next_token()?;

    let by_fields = if lex.token.is_keyword("by") {
        lex.next_token()?;
        parse_field_names_in_parens(lex)
            .map_err(|e| LoqError::Parse(format!("cannot parse stats `by` fields: {e}")))?
    } else {
        Vec::new()
    };

    let mut funcs = Vec::new();
    loop {
        funcs.push(parse_stats_func(lex)?);
        match lex.token.kind {
            TokenKind::Pipe | TokenKind::Eof => return Ok(StatsPipe { by_fields, funcs }),
            TokenKind::Comma => lex.next_token()?,
            _ => {
                return Err(LoqError::Parse(format!(
                    "unexpected token {} at offset {}; expecting `,`, `|` or end of query",
                    lex.token.describe(),
                    lex.token.offset
                )))
            }
        }
    }
}

fn parse_stats_func(lex: &mut Lexer<'_>) -> Result<StatsFunc> {
    if lex.token.is_keyword("count") {
        lex.next_token()?;
        let fields = parse_field_names_in_parens(lex)
            .map_err(|e| LoqError::Parse(format!("cannot parse `count` args: {e}")))?;
        let result_name = parse_result_name(lex, "count")?;
        let contains_star = fields.iter().any(|f| f == "*");
        Ok(StatsFunc::Count(StatsCount {
            fields,
            result_name,
            contains_star,
        }))
    } else if lex.token.is_keyword("uniq") {
        let offset = lex.token.offset;
        lex.next_token()?;
        let fields = parse_field_names_in_parens(lex)
            .map_err(|e| LoqError::Parse(format!("cannot parse `uniq` args: {e}")))?;
        if fields.is_empty() {
            return Err(LoqError::Parse(format!(
                "`uniq` at offset {offset} must contain at least one field"
            )));
        }
        let result_name = parse_result_name(lex, "uniq")?;
        let contains_star = fields.iter().any(|f| f == "*");
        Ok(StatsFunc::Uniq(StatsUniq {
            fields,
            result_name,
            contains_star,
        }))
    } else {
        Err(LoqError::Parse(format!(
            "unknown stats function {} at offset {}",
            lex.token.describe(),
            lex.token.offset
        )))
    }
}

fn parse_result_name(lex: &mut Lexer<'_>, default: &str) -> Result<String> {
    if !lex.token.is_keyword("as") {
        return Ok(default.to_string());
    }
    lex.next_token()?;
    parse_field_name(lex)
        .map_err(|e| LoqError::Parse(format!("cannot parse `as` result name: {e}")))
}

fn parse_field_names_in_parens(lex: &mut Lexer<'_>) -> Result<Vec<String>> {
    if lex.token.kind != TokenKind::LParen {
        return Err(LoqError::Parse(format!(
            "missing `(`, found {} at offset {}",
            lex.token.describe(),
            lex.token.offset
        )));
    }
    lex.next_token()?;

    let mut fields = Vec::new();
    loop {
        if lex.token.kind == TokenKind::RParen {
            lex.next_token()?;
            return Ok(fields);
        }
        if lex.token.kind == TokenKind::Comma {
            return Err(LoqError::Parse(format!(
                "unexpected `,` at offset {}; expecting field name",
                lex.token.offset
            )));
        }
        fields.push(parse_field_name(lex)?);
        match lex.token.kind {
            TokenKind::RParen => {
                lex.next_token()?;
                return Ok(fields);
            }
            TokenKind::Comma => lex.next_token()?,
            _ => {
                return Err(LoqError::Parse(format!(
                    "unexpected token {} at offset {}; expecting `,` or `)`",
                    lex.token.describe(),
                    lex.token.offset
                )))
            }
        }
    }
}

fn parse_field_name(lex: &mut Lexer<'_>) -> Result<String> {
    match lex.token.kind {
        TokenKind::Word | TokenKind::Quoted => {
            let name = lex.token.text.clone();
            lex.next_token()?;
            Ok(name)
        }
        _ => Err(LoqError::Parse(format!(
            "unexpected token {} at offset {}; expecting field name",
            lex.token.describe(),
            lex.token.offset
        ))),
    }
}

fn parse_head_pipe(lex: &mut Lexer<'_>) -> Result<HeadPipe> {
    lex.next_token()?;
    let n = parse_row_count(lex, "head")?;
    Ok(HeadPipe { n })
}

fn parse_skip_pipe(lex: &mut Lexer<'_>) -> Result<SkipPipe> {
    lex.next_token()?;
    let n = parse_row_count(lex, "skip")?;
    Ok(SkipPipe { n })
}

fn parse_row_count(lex: &mut Lexer<'_>, pipe: &str) -> Result<u64> {
    if lex.token.kind != TokenKind::Word {
        return Err(LoqError::Parse(format!(
            "missing row count for `{pipe}`, found {} at offset {}",
            lex.token.describe(),
            lex.token.offset
        )));
    }
    let n = lex.token.text.parse::<u64>().map_err(|e| {
        LoqError::Parse(format!(
            "cannot parse row count `{}` for `{pipe}` at offset {}: {e}",
            lex.token.text, lex.token.offset
        ))
    })?;
    lex.next_token()?;
    Ok(n)
}
