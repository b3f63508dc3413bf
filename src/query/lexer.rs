use super::error::CompileError;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Identifier(String),
    QuotedIdentifier(String),
    Number(i64),
    Literal(Value),
    RawString(String),
    Dot,
    Star,
    At,
    Comma,
    Colon,
    Pipe,
    Or,
    And,
    Not,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    LParen,
    RParen,
    /// `[?`
    Filter,
    /// `[]`
    Flatten,
    Eof,
}

impl Token {
    /// Left binding power used by the Pratt parser
    pub fn binding_power(&self) -> u8 {
        match self {
            Token::Pipe => 1,
            Token::Or => 2,
            Token::And => 3,
            Token::Eq | Token::Ne | Token::Lt | Token::Le | Token::Gt | Token::Ge => 5,
            Token::Flatten => 9,
            Token::Star => 20,
            Token::Filter => 21,
            Token::Dot => 40,
            Token::Not => 45,
            Token::LBrace => 50,
            Token::LBracket => 55,
            Token::LParen => 60,
            _ => 0,
        }
    }
}

/// A token together with its byte offset in the expression
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub position: usize,
}

/// Split an expression into tokens, always ending with [`Token::Eof`]
pub fn tokenize(expr: &str) -> Result<Vec<Spanned>, CompileError> {
    let mut lexer = Lexer {
        chars: expr.char_indices().collect(),
        pos: 0,
        len: expr.len(),
    };
    let mut tokens = Vec::new();

    loop {
        let spanned = lexer.next_token()?;
        let done = spanned.token == Token::Eof;
        tokens.push(spanned);
        if done {
            return Ok(tokens);
        }
    }
}

struct Lexer {
    chars: Vec<(usize, char)>,
    pos: usize,
    len: usize,
}

impl Lexer {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).map(|(_, c)| *c)
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).map(|(_, c)| *c)
    }

    fn offset(&self) -> usize {
        self.chars.get(self.pos).map_or(self.len, |(i, _)| *i)
    }

    fn syntax(&self, position: usize, message: impl Into<String>) -> CompileError {
        CompileError::Syntax {
            position,
            message: message.into(),
        }
    }

    fn next_token(&mut self) -> Result<Spanned, CompileError> {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }

        let position = self.offset();
        let Some(c) = self.peek() else {
            return Ok(Spanned {
                token: Token::Eof,
                position,
            });
        };

        let token = match c {
            '.' => self.single(Token::Dot),
            '*' => self.single(Token::Star),
            '@' => self.single(Token::At),
            ',' => self.single(Token::Comma),
            ':' => self.single(Token::Colon),
            ']' => self.single(Token::RBracket),
            '{' => self.single(Token::LBrace),
            '}' => self.single(Token::RBrace),
            '(' => self.single(Token::LParen),
            ')' => self.single(Token::RParen),
            '[' => match self.peek_at(1) {
                Some('?') => self.double(Token::Filter),
                Some(']') => self.double(Token::Flatten),
                _ => self.single(Token::LBracket),
            },
            '|' if self.peek_at(1) == Some('|') => self.double(Token::Or),
            '|' => self.single(Token::Pipe),
            '&' if self.peek_at(1) == Some('&') => self.double(Token::And),
            '!' if self.peek_at(1) == Some('=') => self.double(Token::Ne),
            '!' => self.single(Token::Not),
            '=' if self.peek_at(1) == Some('=') => self.double(Token::Eq),
            '<' if self.peek_at(1) == Some('=') => self.double(Token::Le),
            '<' => self.single(Token::Lt),
            '>' if self.peek_at(1) == Some('=') => self.double(Token::Ge),
            '>' => self.single(Token::Gt),
            '"' => self.quoted_identifier(position)?,
            '\'' => self.raw_string(position)?,
            '`' => self.literal(position)?,
            '-' | '0'..='9' => self.number(position)?,
            c if c.is_ascii_alphabetic() || c == '_' => self.identifier(),
            other => {
                return Err(self.syntax(position, format!("unexpected character '{other}'")));
            }
        };

        Ok(Spanned { token, position })
    }

    fn single(&mut self, token: Token) -> Token {
        self.pos += 1;
        token
    }

    fn double(&mut self, token: Token) -> Token {
        self.pos += 2;
        token
    }

    fn identifier(&mut self) -> Token {
        let mut name = String::new();
        while let Some(c) = self.peek() {
            if !(c.is_ascii_alphanumeric() || c == '_') {
                break;
            }
            name.push(c);
            self.pos += 1;
        }
        Token::Identifier(name)
    }

    fn number(&mut self, position: usize) -> Result<Token, CompileError> {
        let mut digits = String::new();
        if self.peek() == Some('-') {
            digits.push('-');
            self.pos += 1;
        }
        while let Some(c) = self.peek().filter(char::is_ascii_digit) {
            digits.push(c);
            self.pos += 1;
        }
        digits
            .parse::<i64>()
            .map(Token::Number)
            .map_err(|_| self.syntax(position, format!("invalid number '{digits}'")))
    }

    /// Collect everything up to the closing `delim`, keeping escapes verbatim
    fn delimited(&mut self, position: usize, delim: char) -> Result<String, CompileError> {
        self.pos += 1;
        let mut body = String::new();
        loop {
            match self.peek() {
                None => {
                    return Err(self.syntax(position, format!("unterminated {delim} delimiter")));
                }
                Some('\\') => {
                    body.push('\\');
                    self.pos += 1;
                    if let Some(next) = self.peek() {
                        body.push(next);
                        self.pos += 1;
                    }
                }
                Some(c) if c == delim => {
                    self.pos += 1;
                    return Ok(body);
                }
                Some(c) => {
                    body.push(c);
                    self.pos += 1;
                }
            }
        }
    }

    fn quoted_identifier(&mut self, position: usize) -> Result<Token, CompileError> {
        let body = self.delimited(position, '"')?;
        serde_json::from_str::<String>(&format!("\"{body}\""))
            .map(Token::QuotedIdentifier)
            .map_err(|e| self.syntax(position, format!("invalid quoted identifier: {e}")))
    }

    fn raw_string(&mut self, position: usize) -> Result<Token, CompileError> {
        let body = self.delimited(position, '\'')?;
        Ok(Token::RawString(body.replace("\\'", "'")))
    }

    fn literal(&mut self, position: usize) -> Result<Token, CompileError> {
        let body = self.delimited(position, '`')?.replace("\\`", "`");
        serde_json::from_str::<Value>(body.trim())
            .map(Token::Literal)
            .map_err(|e| CompileError::InvalidLiteral {
                position,
                message: e.to_string(),
            })
    }
}
