//! Expression lexer built on `logos`.
//!
//! Literal callbacks produce finished values: numeric tokens are parsed (with
//! `0x`/`0o`/`0b` radix prefixes), string and character literals are
//! unescaped. A callback returning `None` turns the slice into a lex error.

use logos::Logos;

use crate::error::ExprError;

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n]+")]
pub enum Token {
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token(",")]
    Comma,
    #[token(".")]
    Dot,
    #[token("?")]
    Question,
    #[token(":")]
    Colon,

    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,

    #[token("&")]
    Amp,
    #[token("&&")]
    AmpAmp,
    #[token("&^")]
    AmpCaret,
    #[token("|")]
    Pipe,
    #[token("||")]
    PipePipe,
    #[token("^")]
    Caret,
    #[token("~")]
    Tilde,

    #[token("!")]
    Bang,
    #[token("!=")]
    BangEq,
    #[token("==")]
    EqEq,
    #[token("<")]
    Lt,
    #[token("<=")]
    Le,
    #[token("<<")]
    Shl,
    #[token(">")]
    Gt,
    #[token(">=")]
    Ge,
    #[token(">>")]
    Shr,

    #[token("true")]
    True,
    #[token("false")]
    False,

    #[regex(r"0[xX][0-9a-fA-F]+", |lex| u64::from_str_radix(&lex.slice()[2..], 16).ok())]
    #[regex(r"0[oO][0-7]+", |lex| u64::from_str_radix(&lex.slice()[2..], 8).ok())]
    #[regex(r"0[bB][01]+", |lex| u64::from_str_radix(&lex.slice()[2..], 2).ok())]
    #[regex(r"[0-9]+", |lex| lex.slice().parse::<u64>().ok())]
    Int(u64),

    #[regex(r"[0-9]+\.[0-9]*(?:[eE][+-]?[0-9]+)?", |lex| lex.slice().parse::<f64>().ok())]
    #[regex(r"\.[0-9]+(?:[eE][+-]?[0-9]+)?", |lex| lex.slice().parse::<f64>().ok())]
    #[regex(r"[0-9]+[eE][+-]?[0-9]+", |lex| lex.slice().parse::<f64>().ok())]
    Float(f64),

    #[regex(r#""(?:[^"\\]|\\.)*""#, |lex| { let s = lex.slice(); unescape(&s[1..s.len() - 1]) })]
    Str(String),

    #[regex(r"'(?:[^'\\]|\\.)*'", |lex| { let s = lex.slice(); unescape_char(&s[1..s.len() - 1]) })]
    Char(u64),

    #[regex(r"[A-Za-z_][A-Za-z0-9_]*", |lex| lex.slice().to_string())]
    Ident(String),
}

/// Decodes the escape sequences of a quoted literal body.
fn unescape(body: &str) -> Option<String> {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let escaped = match chars.next()? {
            'a' => '\x07',
            'b' => '\x08',
            'f' => '\x0C',
            'n' => '\n',
            'r' => '\r',
            't' => '\t',
            'v' => '\x0B',
            '\\' => '\\',
            '\'' => '\'',
            '"' => '"',
            'x' => hex_scalar(&mut chars, 2)?,
            'u' => hex_scalar(&mut chars, 4)?,
            'U' => hex_scalar(&mut chars, 8)?,
            _ => return None,
        };
        out.push(escaped);
    }
    Some(out)
}

fn hex_scalar(chars: &mut std::str::Chars<'_>, digits: usize) -> Option<char> {
    let mut v: u32 = 0;
    for _ in 0..digits {
        let d = chars.next()?.to_digit(16)?;
        v = v.checked_mul(16)?.checked_add(d)?;
    }
    char::from_u32(v)
}

/// A character literal is a single unsigned scalar.
fn unescape_char(body: &str) -> Option<u64> {
    let s = unescape(body)?;
    let mut chars = s.chars();
    let c = chars.next()?;
    if chars.next().is_some() {
        return None;
    }
    Some(c as u64)
}

/// Tokenizes `src`, failing on the first unrecognized or malformed slice.
pub fn lex(src: &str) -> Result<Vec<Token>, ExprError> {
    let mut tokens = Vec::new();
    let mut lexer = Token::lexer(src);
    while let Some(result) = lexer.next() {
        match result {
            Ok(tok) => tokens.push(tok),
            Err(()) => {
                return Err(ExprError::Syntax(format!(
                    "unexpected input {:?} at offset {}",
                    lexer.slice(),
                    lexer.span().start
                )))
            }
        }
    }
    Ok(tokens)
}
