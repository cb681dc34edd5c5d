//! KeyValues text format.
//!
//! Used by Steam's `libraryfolders.vdf`, app manifests (`.acf`) and Hammer
//! scene files (`.vmf`). Keys may repeat and are kept in file order; lookups
//! ignore case.

use std::iter::Peekable;
use std::str::Chars;
use thiserror::Error;

/// Deepest block nesting accepted; scene files stay well below this.
pub const MAX_DEPTH: usize = 256;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("line {line}: {message}")]
pub struct KeyValuesError {
    pub line: usize,
    pub message: String,
}

impl KeyValuesError {
    fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Text(String),
    Block(Block),
}

impl Value {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            Value::Block(_) => None,
        }
    }

    pub fn as_block(&self) -> Option<&Block> {
        match self {
            Value::Block(b) => Some(b),
            Value::Text(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pair {
    pub key: String,
    pub value: Value,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Block {
    pairs: Vec<Pair>,
}

impl Block {
    pub fn pairs(&self) -> &[Pair] {
        &self.pairs
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// First direct child with this key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.pairs
            .iter()
            .find(|p| p.key.eq_ignore_ascii_case(key))
            .map(|p| &p.value)
    }

    pub fn get_text(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_text)
    }

    /// Direct child blocks with this key, in file order.
    pub fn blocks<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a Block> + 'a {
        self.pairs
            .iter()
            .filter(move |p| p.key.eq_ignore_ascii_case(key))
            .filter_map(|p| p.value.as_block())
    }

    /// Every value with this key anywhere below this block, depth first.
    pub fn find_all<'a>(&'a self, key: &str) -> Vec<&'a Value> {
        let mut out = Vec::new();
        self.collect_into(key, &mut out);
        out
    }

    /// First text value with this key anywhere below this block.
    pub fn find_text(&self, key: &str) -> Option<&str> {
        self.find_all(key).into_iter().find_map(Value::as_text)
    }

    fn collect_into<'a>(&'a self, key: &str, out: &mut Vec<&'a Value>) {
        for pair in &self.pairs {
            if pair.key.eq_ignore_ascii_case(key) {
                out.push(&pair.value);
            }
            if let Value::Block(child) = &pair.value {
                child.collect_into(key, out);
            }
        }
    }
}

pub fn parse(text: &str) -> Result<Block, KeyValuesError> {
    let mut parser = Parser {
        lexer: Lexer::new(text),
        depth: 0,
    };
    parser.parse_block(None)
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Quoted(String),
    Bare(String),
    Open,
    Close,
}

struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
    line: usize,
    peeked: Option<Option<(Token, usize)>>,
}

impl<'a> Lexer<'a> {
    fn new(text: &'a str) -> Self {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        Self {
            chars: text.chars().peekable(),
            line: 1,
            peeked: None,
        }
    }

    fn peek(&mut self) -> Result<Option<&(Token, usize)>, KeyValuesError> {
        if self.peeked.is_none() {
            let token = self.lex()?;
            self.peeked = Some(token);
        }
        Ok(self.peeked.as_ref().and_then(|t| t.as_ref()))
    }

    fn next(&mut self) -> Result<Option<(Token, usize)>, KeyValuesError> {
        match self.peeked.take() {
            Some(token) => Ok(token),
            None => self.lex(),
        }
    }

    fn lex(&mut self) -> Result<Option<(Token, usize)>, KeyValuesError> {
        self.skip_trivia();
        let line = self.line;
        let Some(c) = self.chars.next() else {
            return Ok(None);
        };

        let token = match c {
            '{' => Token::Open,
            '}' => Token::Close,
            '"' => Token::Quoted(self.quoted(line)?),
            c => {
                let mut word = String::from(c);
                while let Some(&c) = self.chars.peek() {
                    if c.is_whitespace() || matches!(c, '"' | '{' | '}') {
                        break;
                    }
                    word.push(c);
                    self.chars.next();
                }
                Token::Bare(word)
            }
        };
        Ok(Some((token, line)))
    }

    fn quoted(&mut self, start_line: usize) -> Result<String, KeyValuesError> {
        let mut out = String::new();
        loop {
            match self.chars.next() {
                None => return Err(KeyValuesError::new(start_line, "unterminated string")),
                Some('"') => return Ok(out),
                Some('\\') => match self.chars.next() {
                    Some('"') => out.push('"'),
                    Some('\\') => out.push('\\'),
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some(other) => {
                        out.push('\\');
                        self.bump_line(other);
                        out.push(other);
                    }
                    None => return Err(KeyValuesError::new(start_line, "unterminated string")),
                },
                Some(c) => {
                    self.bump_line(c);
                    out.push(c);
                }
            }
        }
    }

    fn skip_trivia(&mut self) {
        loop {
            match self.chars.peek() {
                Some(&c) if c.is_whitespace() => {
                    self.bump_line(c);
                    self.chars.next();
                }
                Some(&'/') => {
                    let mut ahead = self.chars.clone();
                    ahead.next();
                    if ahead.peek() != Some(&'/') {
                        return;
                    }
                    while let Some(c) = self.chars.next() {
                        if c == '\n' {
                            self.line += 1;
                            break;
                        }
                    }
                }
                _ => return,
            }
        }
    }

    fn bump_line(&mut self, c: char) {
        if c == '\n' {
            self.line += 1;
        }
    }
}

struct Parser<'a> {
    lexer: Lexer<'a>,
    depth: usize,
}

impl Parser<'_> {
    /// `opened_at` is the line of the `{` for nested blocks, `None` at top level.
    fn parse_block(&mut self, opened_at: Option<usize>) -> Result<Block, KeyValuesError> {
        let mut block = Block::default();
        loop {
            let Some((token, line)) = self.lexer.next()? else {
                return match opened_at {
                    Some(open) => Err(KeyValuesError::new(
                        open,
                        "block is never closed before end of input",
                    )),
                    None => Ok(block),
                };
            };

            let key = match token {
                Token::Close if opened_at.is_some() => return Ok(block),
                Token::Close => return Err(KeyValuesError::new(line, "unexpected '}'")),
                Token::Open => {
                    return Err(KeyValuesError::new(
                        line,
                        "unexpected '{' where a key was expected",
                    ));
                }
                Token::Quoted(key) | Token::Bare(key) => key,
            };

            let value = match self.lexer.next()? {
                Some((Token::Quoted(text), _)) | Some((Token::Bare(text), _)) => Value::Text(text),
                Some((Token::Open, open)) => {
                    if self.depth >= MAX_DEPTH {
                        return Err(KeyValuesError::new(open, "blocks nested too deeply"));
                    }
                    self.depth += 1;
                    let nested = self.parse_block(Some(open))?;
                    self.depth -= 1;
                    Value::Block(nested)
                }
                Some((Token::Close, _)) | None => {
                    return Err(KeyValuesError::new(
                        line,
                        format!("key \"{key}\" has no value"),
                    ));
                }
            };

            self.skip_conditional()?;
            block.pairs.push(Pair { key, value });
        }
    }

    // [$WIN32] / [!$X360] style platform conditionals are accepted and ignored.
    fn skip_conditional(&mut self) -> Result<(), KeyValuesError> {
        let is_conditional = matches!(
            self.lexer.peek()?,
            Some((Token::Bare(word), _)) if word.starts_with('[') && word.ends_with(']')
        );
        if is_conditional {
            self.lexer.next()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_nested_blocks() {
        let kv = parse(
            r#"
            "AppState"
            {
                "appid"      "220"
                "installdir" "Half-Life 2"
                "UserConfig" { "language" "english" }
            }
            "#,
        )
        .unwrap();

        let state = kv.get("appstate").and_then(Value::as_block).unwrap();
        assert_eq!(state.get_text("AppID"), Some("220"));
        assert_eq!(state.get_text("installdir"), Some("Half-Life 2"));
        assert_eq!(kv.find_text("language"), Some("english"));
    }

    #[test]
    fn test_duplicate_keys_keep_file_order() {
        let kv = parse(r#"side { "material" "A" } side { "material" "B" }"#).unwrap();
        let mats: Vec<_> = kv
            .blocks("side")
            .filter_map(|b| b.get_text("material"))
            .collect();
        assert_eq!(mats, vec!["A", "B"]);
    }

    #[test]
    fn test_escapes_and_comments() {
        let kv = parse(
            "// header comment\n\"path\" \"C:\\\\Program Files (x86)\\\\Steam\" // trailing\n",
        )
        .unwrap();
        assert_eq!(kv.get_text("path"), Some(r"C:\Program Files (x86)\Steam"));
    }

    #[test]
    fn test_bare_words_and_conditionals() {
        let kv = parse("root { key value [$WIN32] other \"x\" }").unwrap();
        let root = kv.get("root").and_then(Value::as_block).unwrap();
        assert_eq!(root.get_text("key"), Some("value"));
        assert_eq!(root.get_text("other"), Some("x"));
        assert_eq!(root.pairs().len(), 2);
    }

    #[test]
    fn test_find_all_is_depth_first() {
        let kv = parse(
            r#"libraryfolders {
                "0" { "path" "/a" "apps" { "220" "1" } }
                "1" { "path" "/b" }
            }"#,
        )
        .unwrap();
        let paths: Vec<_> = kv
            .find_all("path")
            .into_iter()
            .filter_map(Value::as_text)
            .collect();
        assert_eq!(paths, vec!["/a", "/b"]);
    }

    #[test]
    fn test_errors_report_line() {
        let err = parse("a {\n b \"c\"\n").unwrap_err();
        assert_eq!(err.line, 1);

        let err = parse("a \"b\"\n}").unwrap_err();
        assert_eq!(err.line, 2);
        assert!(err.message.contains("unexpected '}'"));

        let err = parse("a \"b\nc").unwrap_err();
        assert!(err.message.contains("unterminated"));

        let err = parse("a { b }").unwrap_err();
        assert!(err.message.contains("no value"));

        let err = parse("{ a b }").unwrap_err();
        assert!(err.message.contains("unexpected '{'"));
    }

    #[test]
    fn test_nesting_limit() {
        let nested = |depth: usize| format!("{}{}", "a { ".repeat(depth), "} ".repeat(depth));

        let kv = parse(&nested(MAX_DEPTH)).unwrap();
        assert_eq!(kv.pairs().len(), 1);

        let err = parse(&nested(MAX_DEPTH + 1)).unwrap_err();
        assert_eq!(err.message, "blocks nested too deeply");

        // Far past the limit fails the same way instead of exhausting the stack
        let err = parse(&nested(200_000)).unwrap_err();
        assert_eq!(err.message, "blocks nested too deeply");
    }

    #[test]
    fn test_empty_input() {
        assert!(parse("").unwrap().is_empty());
        assert!(parse("  // nothing here\n").unwrap().is_empty());
    }
}
