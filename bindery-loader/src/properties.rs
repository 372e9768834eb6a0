//! `.properties` files with a line/column origin for every value
//!
//! Follows the classic format: `#` and `!` start comments, keys end at an
//! unescaped `=`, `:` or whitespace, a trailing backslash continues the value
//! on the next line, and `\t \n \r \f \uXXXX` escapes are decoded. A key
//! repeated later in the file replaces the earlier value.

use crate::error::{LoadError, LoadResult};
use bindery_core::{Location, MapPropertySource, Origin};
use tracing::trace;

/// Parse `content` into a source named `resource`
pub fn load_properties(resource: &str, content: &str) -> LoadResult<MapPropertySource> {
    let mut reader = Reader::new(resource, content);
    let mut source = MapPropertySource::new(resource);
    loop {
        reader.skip(|c| c.is_whitespace());
        match reader.peek() {
            None => break,
            Some('#' | '!') => {
                reader.skip(|c| c != '\n');
                continue;
            }
            Some(_) => {}
        }
        let key = reader.read_token(|c| matches!(c, '=' | ':') || is_blank(c))?;
        reader.skip(is_blank);
        if matches!(reader.peek(), Some('=' | ':')) {
            reader.bump();
            reader.skip(is_blank);
        }
        let location = Location::new(reader.line, reader.column);
        let value = reader.read_token(|_| false)?;
        if key.is_empty() {
            trace!(resource, line = location.line() + 1, "Skipping property with empty key");
            continue;
        }
        let origin = Origin::text_resource(resource, Some(location));
        source.insert(key, value, Some(origin));
    }
    Ok(source)
}

fn is_blank(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\u{c}')
}

struct Reader<'a> {
    resource: &'a str,
    chars: Vec<char>,
    position: usize,
    line: usize,
    column: usize,
}

impl<'a> Reader<'a> {
    fn new(resource: &'a str, content: &str) -> Self {
        Self {
            resource,
            chars: content.chars().collect(),
            position: 0,
            line: 0,
            column: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.position).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.position += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 0;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn skip(&mut self, predicate: impl Fn(char) -> bool) {
        while self.peek().is_some_and(&predicate) {
            self.bump();
        }
    }

    /// Read up to an unescaped end of line or a character matching `stop`
    fn read_token(&mut self, stop: impl Fn(char) -> bool) -> LoadResult<String> {
        let mut token = String::new();
        while let Some(c) = self.peek() {
            if c == '\n' || c == '\r' || stop(c) {
                break;
            }
            self.bump();
            if c != '\\' {
                token.push(c);
                continue;
            }
            match self.bump() {
                None => break,
                Some('\r') => {
                    if self.peek() == Some('\n') {
                        self.bump();
                    }
                    self.skip(is_blank);
                }
                Some('\n') => self.skip(is_blank),
                Some('t') => token.push('\t'),
                Some('n') => token.push('\n'),
                Some('r') => token.push('\r'),
                Some('f') => token.push('\u{c}'),
                Some('u') => token.push(self.read_unicode()?),
                Some(other) => token.push(other),
            }
        }
        Ok(token)
    }

    fn read_unicode(&mut self) -> LoadResult<char> {
        let line = self.line;
        let mut code = 0u32;
        for _ in 0..4 {
            let digit = self.bump().and_then(|c| c.to_digit(16)).ok_or_else(|| LoadError::Properties {
                resource: self.resource.to_string(),
                line: line + 1,
                message: "Malformed \\uxxxx encoding".to_string(),
            })?;
            code = code * 16 + digit;
        }
        char::from_u32(code).ok_or_else(|| LoadError::Properties {
            resource: self.resource.to_string(),
            line: line + 1,
            message: format!("Invalid code point \\u{code:04x}"),
        })
    }
}
