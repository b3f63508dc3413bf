use thiserror::Error;

/// Errors raised while splitting a line into shell-style tokens
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenizeError {
    #[error("unterminated {0} quote")]
    UnterminatedQuote(char),

    #[error("line ends with a dangling escape character")]
    TrailingEscape,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Quote {
    None,
    Single,
    Double,
}

/// Split a line by whitespace while honoring POSIX shell quoting
///
/// Single quotes are literal, double quotes only treat `\"` and `\\` as
/// escapes, and a backslash outside quotes escapes the next character.
/// Adjacent quoted and unquoted segments join into one token, and an empty
/// pair of quotes yields an empty token.
pub fn split(line: &str) -> Result<Vec<String>, TokenizeError> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut quote = Quote::None;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match quote {
            Quote::Single => {
                if c == '\'' {
                    quote = Quote::None;
                } else {
                    current.push(c);
                }
            }
            Quote::Double => match c {
                '"' => quote = Quote::None,
                '\\' => match chars.peek() {
                    Some(&next) if next == '"' || next == '\\' => {
                        current.push(next);
                        chars.next();
                    }
                    Some(_) => current.push(c),
                    None => return Err(TokenizeError::UnterminatedQuote('"')),
                },
                _ => current.push(c),
            },
            Quote::None => match c {
                '\'' => {
                    quote = Quote::Single;
                    in_token = true;
                }
                '"' => {
                    quote = Quote::Double;
                    in_token = true;
                }
                '\\' => {
                    let next = chars.next().ok_or(TokenizeError::TrailingEscape)?;
                    current.push(next);
                    in_token = true;
                }
                c if c.is_whitespace() => {
                    if in_token {
                        tokens.push(std::mem::take(&mut current));
                        in_token = false;
                    }
                }
                _ => {
                    current.push(c);
                    in_token = true;
                }
            },
        }
    }

    match quote {
        Quote::Single => Err(TokenizeError::UnterminatedQuote('\'')),
        Quote::Double => Err(TokenizeError::UnterminatedQuote('"')),
        Quote::None => {
            if in_token {
                tokens.push(current);
            }
            Ok(tokens)
        }
    }
}
