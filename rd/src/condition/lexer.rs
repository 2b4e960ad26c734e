//! Tokenizer for condition expressions

use chrono::TimeDelta;

use super::error::SyntaxError;
use super::value::Comparator;

/// Characters that terminate a bare word
const DELIMITERS: &[char] = &['(', ')', ',', '<', '>', '=', '!', '"', '\''];

/// A lexical token
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// `$status`
    Status,
    /// Unquoted word (keyword, identifier, or literal operand)
    Word(String),
    /// Quoted string literal
    Quoted(String),
    /// Duration literal such as `5m` or `2h`
    Duration(TimeDelta),
    Compare(Comparator),
    Plus,
    Minus,
    LParen,
    RParen,
    Comma,
}

impl Token {
    /// Describe the token for error messages
    pub fn describe(&self) -> String {
        match self {
            Token::Status => "'$status'".to_string(),
            Token::Word(w) => format!("'{}'", w),
            Token::Quoted(s) => format!("\"{}\"", s),
            Token::Duration(d) => format!("duration {}s", d.num_seconds()),
            Token::Compare(op) => format!("'{}'", op),
            Token::Plus => "'+'".to_string(),
            Token::Minus => "'-'".to_string(),
            Token::LParen => "'('".to_string(),
            Token::RParen => "')'".to_string(),
            Token::Comma => "','".to_string(),
        }
    }
}

/// A token with its byte offset in the source
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub offset: usize,
}

/// Split a condition into tokens
///
/// `+` and `-` are operators only when they stand alone; inside a word
/// they belong to the word, so `2024-01-01` stays a single operand.
pub fn tokenize(source: &str) -> Result<Vec<Spanned>, SyntaxError> {
    let mut tokens = Vec::new();
    let mut chars = source.char_indices().peekable();

    while let Some(&(offset, ch)) = chars.peek() {
        if ch.is_whitespace() {
            chars.next();
            continue;
        }

        let token = match ch {
            '(' => {
                chars.next();
                Token::LParen
            }
            ')' => {
                chars.next();
                Token::RParen
            }
            ',' => {
                chars.next();
                Token::Comma
            }
            '<' | '>' | '=' | '!' => {
                let mut symbol = String::new();
                while let Some(&(_, c)) = chars.peek() {
                    if matches!(c, '<' | '>' | '=' | '!') {
                        symbol.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let op = Comparator::from_symbol(&symbol)
                    .ok_or(SyntaxError::UnknownComparator { op: symbol, offset })?;
                Token::Compare(op)
            }
            '"' | '\'' => {
                chars.next();
                let mut literal = String::new();
                let mut closed = false;
                for (_, c) in chars.by_ref() {
                    if c == ch {
                        closed = true;
                        break;
                    }
                    literal.push(c);
                }
                if !closed {
                    return Err(SyntaxError::UnterminatedString { offset });
                }
                Token::Quoted(literal)
            }
            _ => {
                let mut word = String::new();
                while let Some(&(_, c)) = chars.peek() {
                    if c.is_whitespace() || DELIMITERS.contains(&c) {
                        break;
                    }
                    word.push(c);
                    chars.next();
                }
                classify_word(word, offset)?
            }
        };

        tokens.push(Spanned { token, offset });
    }

    Ok(tokens)
}

fn classify_word(word: String, offset: usize) -> Result<Token, SyntaxError> {
    match word.as_str() {
        "+" => return Ok(Token::Plus),
        "-" => return Ok(Token::Minus),
        "$status" => return Ok(Token::Status),
        _ => {}
    }

    // $status is the only variable
    if word.starts_with('$') {
        return Err(SyntaxError::UnexpectedChar { ch: '$', offset });
    }

    if let Some(duration) = parse_duration_literal(&word) {
        return Ok(Token::Duration(duration));
    }

    Ok(Token::Word(word))
}

/// Parse `<digits><unit>` duration literals (`30s`, `5m`, `2h`, `1d`, `1w`)
fn parse_duration_literal(word: &str) -> Option<TimeDelta> {
    let starts_with_digit = word.chars().next().is_some_and(|c| c.is_ascii_digit());
    let ends_with_unit = word.chars().last().is_some_and(|c| c.is_ascii_alphabetic());
    if !starts_with_digit || !ends_with_unit {
        return None;
    }

    let std_duration = humantime::parse_duration(word).ok()?;
    TimeDelta::from_std(std_duration).ok()
}
