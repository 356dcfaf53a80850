//! Bounded flat JSON scanner.
//!
//! Parses a byte buffer into a single preallocated sequence of typed
//! tokens carrying byte offsets into the input — no parse tree, no
//! per-level heap allocation. A document with more structural elements
//! than the configured capacity is a hard error, never a truncation,
//! so an untrusted network response cannot force unbounded allocation.

use thiserror::Error;

/// Default cap on tokens per document. Tokeninfo payloads are a few
/// dozen fields; this leaves generous headroom.
pub const DEFAULT_MAX_TOKENS: usize = 128;

/// Errors produced while scanning a document.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ScanError {
    /// The input is not valid JSON.
    #[error("invalid JSON at byte {offset}")]
    Syntax { offset: usize },

    /// The input ended mid-value.
    #[error("unexpected end of input")]
    UnexpectedEnd,

    /// The document has more structural elements than the token cap.
    #[error("document exceeds {limit} tokens")]
    TokenLimit { limit: usize },
}

/// The structural kind of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Object,
    Array,
    String,
    /// Number, `true`, `false`, or `null`.
    Primitive,
}

/// One scanned token: a kind plus its byte span in the source buffer.
///
/// String tokens span the unquoted contents; container tokens span from
/// the opening bracket to one past the closing bracket. `children` is
/// the number of immediate child tokens — an object with *n* key/value
/// pairs has `children == 2n`, since each pair contributes a key token
/// and a value token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub start: usize,
    pub end: usize,
    pub children: usize,
}

impl Token {
    /// The raw bytes this token covers in `input`.
    pub fn span<'a>(&self, input: &'a [u8]) -> &'a [u8] {
        &input[self.start..self.end]
    }
}

/// Scan `input` as a single JSON value into a flat token sequence.
///
/// The root token is always at index 0. Object keys are scanned as
/// ordinary values, so a malformed document with a non-string key still
/// scans; deciding what to do with such keys is the caller's business.
pub fn scan(input: &[u8], max_tokens: usize) -> Result<Vec<Token>, ScanError> {
    // A token consumes at least one input byte, so the byte length also
    // bounds the preallocation.
    let mut scanner = Scanner {
        input,
        pos: 0,
        max_tokens,
        tokens: Vec::with_capacity(max_tokens.min(input.len())),
    };
    scanner.value()?;
    scanner.skip_ws();
    if scanner.pos != input.len() {
        return Err(ScanError::Syntax {
            offset: scanner.pos,
        });
    }
    Ok(scanner.tokens)
}

/// How many consecutive token slots the value rooted at `index`
/// occupies: itself plus every descendant.
///
/// Pure and total over any sequence produced by [`scan`]; an
/// out-of-range `index` is a defensive no-op returning 0.
pub fn value_extent(tokens: &[Token], index: usize) -> usize {
    let Some(token) = tokens.get(index) else {
        return 0;
    };
    match token.kind {
        TokenKind::String | TokenKind::Primitive => 1,
        TokenKind::Array => {
            let mut extent = 1;
            for _ in 0..token.children {
                extent += value_extent(tokens, index + extent);
            }
            extent
        }
        TokenKind::Object => {
            let mut extent = 1;
            for _ in 0..token.children / 2 {
                extent += value_extent(tokens, index + extent); // key
                extent += value_extent(tokens, index + extent); // value
            }
            extent
        }
    }
}

struct Scanner<'a> {
    input: &'a [u8],
    pos: usize,
    max_tokens: usize,
    tokens: Vec<Token>,
}

impl Scanner<'_> {
    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t' | b'\n' | b'\r')) {
            self.pos += 1;
        }
    }

    /// Error for the current position: end-of-input or a syntax error.
    fn unexpected(&self) -> ScanError {
        if self.pos >= self.input.len() {
            ScanError::UnexpectedEnd
        } else {
            ScanError::Syntax { offset: self.pos }
        }
    }

    fn push(&mut self, kind: TokenKind, start: usize, end: usize) -> Result<usize, ScanError> {
        if self.tokens.len() == self.max_tokens {
            return Err(ScanError::TokenLimit {
                limit: self.max_tokens,
            });
        }
        self.tokens.push(Token {
            kind,
            start,
            end,
            children: 0,
        });
        Ok(self.tokens.len() - 1)
    }

    fn value(&mut self) -> Result<(), ScanError> {
        self.skip_ws();
        match self.peek() {
            Some(b'{') => self.object(),
            Some(b'[') => self.array(),
            Some(b'"') => self.string().map(|_| ()),
            Some(b'-' | b'0'..=b'9' | b't' | b'f' | b'n') => self.primitive(),
            _ => Err(self.unexpected()),
        }
    }

    fn object(&mut self) -> Result<(), ScanError> {
        let start = self.pos;
        let index = self.push(TokenKind::Object, start, 0)?;
        self.pos += 1; // '{'
        self.skip_ws();
        if self.peek() == Some(b'}') {
            self.pos += 1;
            self.tokens[index].end = self.pos;
            return Ok(());
        }
        loop {
            self.value()?; // key
            self.skip_ws();
            if self.peek() != Some(b':') {
                return Err(self.unexpected());
            }
            self.pos += 1;
            self.value()?;
            self.tokens[index].children += 2;
            self.skip_ws();
            match self.peek() {
                Some(b',') => self.pos += 1,
                Some(b'}') => {
                    self.pos += 1;
                    self.tokens[index].end = self.pos;
                    return Ok(());
                }
                _ => return Err(self.unexpected()),
            }
        }
    }

    fn array(&mut self) -> Result<(), ScanError> {
        let start = self.pos;
        let index = self.push(TokenKind::Array, start, 0)?;
        self.pos += 1; // '['
        self.skip_ws();
        if self.peek() == Some(b']') {
            self.pos += 1;
            self.tokens[index].end = self.pos;
            return Ok(());
        }
        loop {
            self.value()?;
            self.tokens[index].children += 1;
            self.skip_ws();
            match self.peek() {
                Some(b',') => self.pos += 1,
                Some(b']') => {
                    self.pos += 1;
                    self.tokens[index].end = self.pos;
                    return Ok(());
                }
                _ => return Err(self.unexpected()),
            }
        }
    }

    fn string(&mut self) -> Result<usize, ScanError> {
        self.pos += 1; // opening quote
        let start = self.pos;
        loop {
            match self.peek() {
                Some(b'"') => {
                    let index = self.push(TokenKind::String, start, self.pos)?;
                    self.pos += 1;
                    return Ok(index);
                }
                Some(b'\\') => {
                    self.pos += 1;
                    match self.peek() {
                        Some(b'"' | b'\\' | b'/' | b'b' | b'f' | b'n' | b'r' | b't') => {
                            self.pos += 1;
                        }
                        Some(b'u') => {
                            self.pos += 1;
                            for _ in 0..4 {
                                match self.peek() {
                                    Some(c) if c.is_ascii_hexdigit() => self.pos += 1,
                                    _ => return Err(self.unexpected()),
                                }
                            }
                        }
                        _ => return Err(self.unexpected()),
                    }
                }
                Some(_) => self.pos += 1,
                None => return Err(ScanError::UnexpectedEnd),
            }
        }
    }

    fn primitive(&mut self) -> Result<(), ScanError> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            match c {
                b' ' | b'\t' | b'\n' | b'\r' | b',' | b':' | b']' | b'}' => break,
                _ => self.pos += 1,
            }
        }
        self.push(TokenKind::Primitive, start, self.pos)?;
        Ok(())
    }
}
