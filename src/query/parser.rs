use super::ast::{Ast, Comparator};
use super::error::CompileError;
use super::functions::Function;
use super::lexer::{Spanned, Token, tokenize};
use serde_json::Value;

/// Projections stop at tokens that bind looser than this
const PROJECTION_STOP: u8 = 10;

/// Deepest nesting of sub-expressions accepted before giving up
const MAX_DEPTH: usize = 128;

/// Parse a query expression into its syntax tree
pub fn parse(expr: &str) -> Result<Ast, CompileError> {
    let mut parser = Parser {
        tokens: tokenize(expr)?,
        index: 0,
        depth: 0,
    };
    let ast = parser.expression(0)?;
    match parser.peek() {
        Token::Eof => Ok(ast),
        other => Err(parser.error(format!("unexpected token {other:?}"))),
    }
}

struct Parser {
    tokens: Vec<Spanned>,
    index: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> &Token {
        self.peek_at(0)
    }

    fn peek_at(&self, offset: usize) -> &Token {
        // The token list always ends with Eof, so clamp to it
        let last = self.tokens.len() - 1;
        &self.tokens[(self.index + offset).min(last)].token
    }

    fn position(&self) -> usize {
        let last = self.tokens.len() - 1;
        self.tokens[self.index.min(last)].position
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.index < self.tokens.len() - 1 {
            self.index += 1;
        }
        token
    }

    fn error(&self, message: impl Into<String>) -> CompileError {
        CompileError::Syntax {
            position: self.position(),
            message: message.into(),
        }
    }

    fn expect(&mut self, expected: Token) -> Result<(), CompileError> {
        if *self.peek() == expected {
            self.advance();
            Ok(())
        } else {
            Err(self.error(format!("expected {:?}, found {:?}", expected, self.peek())))
        }
    }

    fn expression(&mut self, rbp: u8) -> Result<Ast, CompileError> {
        if self.depth >= MAX_DEPTH {
            return Err(self.error(format!("expression nested deeper than {MAX_DEPTH} levels")));
        }
        self.depth += 1;
        let ast = self.binding(rbp);
        self.depth -= 1;
        ast
    }

    fn binding(&mut self, rbp: u8) -> Result<Ast, CompileError> {
        let token = self.advance();
        let mut left = self.nud(token)?;
        while rbp < self.peek().binding_power() {
            let token = self.advance();
            left = self.led(token, left)?;
        }
        Ok(left)
    }

    fn nud(&mut self, token: Token) -> Result<Ast, CompileError> {
        match token {
            Token::Identifier(name) => {
                if *self.peek() == Token::LParen {
                    self.advance();
                    self.function_call(name)
                } else {
                    Ok(Ast::Field(name))
                }
            }
            Token::QuotedIdentifier(name) => Ok(Ast::Field(name)),
            Token::Literal(value) => Ok(Ast::Literal(value)),
            Token::RawString(text) => Ok(Ast::Literal(Value::String(text))),
            Token::At => Ok(Ast::Identity),
            Token::Not => Ok(Ast::Not(Box::new(
                self.expression(Token::Not.binding_power())?,
            ))),
            Token::LParen => {
                let inner = self.expression(0)?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            Token::Star => Ok(Ast::ObjectProjection {
                lhs: Box::new(Ast::Identity),
                rhs: Box::new(self.projection_rhs(Token::Star.binding_power())?),
            }),
            Token::Filter => self.filter(Ast::Identity),
            Token::Flatten => Ok(Ast::Projection {
                lhs: Box::new(Ast::Flatten(Box::new(Ast::Identity))),
                rhs: Box::new(self.projection_rhs(Token::Flatten.binding_power())?),
            }),
            Token::LBracket => match self.peek() {
                Token::Number(_) | Token::Colon => {
                    let index = self.index_expression()?;
                    self.project_if_slice(Ast::Identity, index)
                }
                Token::Star if *self.peek_at(1) == Token::RBracket => {
                    self.advance();
                    self.advance();
                    Ok(Ast::Projection {
                        lhs: Box::new(Ast::Identity),
                        rhs: Box::new(self.projection_rhs(Token::Star.binding_power())?),
                    })
                }
                _ => self.multi_select_list(),
            },
            Token::LBrace => self.multi_select_hash(),
            Token::Eof => Err(self.error("unexpected end of expression")),
            other => Err(self.error(format!("unexpected token {other:?}"))),
        }
    }

    fn led(&mut self, token: Token, left: Ast) -> Result<Ast, CompileError> {
        let bp = token.binding_power();
        match token {
            Token::Dot => {
                if *self.peek() == Token::Star {
                    self.advance();
                    Ok(Ast::ObjectProjection {
                        lhs: Box::new(left),
                        rhs: Box::new(self.projection_rhs(bp)?),
                    })
                } else {
                    let right = self.dot_rhs(bp)?;
                    Ok(Ast::Subexpr(Box::new(left), Box::new(right)))
                }
            }
            Token::Pipe => Ok(Ast::Pipe(Box::new(left), Box::new(self.expression(bp)?))),
            Token::Or => Ok(Ast::Or(Box::new(left), Box::new(self.expression(bp)?))),
            Token::And => Ok(Ast::And(Box::new(left), Box::new(self.expression(bp)?))),
            Token::Eq => self.comparison(Comparator::Eq, left, bp),
            Token::Ne => self.comparison(Comparator::Ne, left, bp),
            Token::Lt => self.comparison(Comparator::Lt, left, bp),
            Token::Le => self.comparison(Comparator::Le, left, bp),
            Token::Gt => self.comparison(Comparator::Gt, left, bp),
            Token::Ge => self.comparison(Comparator::Ge, left, bp),
            Token::Flatten => Ok(Ast::Projection {
                lhs: Box::new(Ast::Flatten(Box::new(left))),
                rhs: Box::new(self.projection_rhs(bp)?),
            }),
            Token::Filter => self.filter(left),
            Token::LBracket => match self.peek() {
                Token::Number(_) | Token::Colon => {
                    let index = self.index_expression()?;
                    self.project_if_slice(left, index)
                }
                _ => {
                    self.expect(Token::Star)?;
                    self.expect(Token::RBracket)?;
                    Ok(Ast::Projection {
                        lhs: Box::new(left),
                        rhs: Box::new(self.projection_rhs(Token::Star.binding_power())?),
                    })
                }
            },
            other => Err(self.error(format!("unexpected token {other:?}"))),
        }
    }

    fn comparison(&mut self, op: Comparator, left: Ast, bp: u8) -> Result<Ast, CompileError> {
        Ok(Ast::Comparison {
            op,
            lhs: Box::new(left),
            rhs: Box::new(self.expression(bp)?),
        })
    }

    /// Parses the body of `[?...]` once the opening token is consumed
    fn filter(&mut self, left: Ast) -> Result<Ast, CompileError> {
        let predicate = self.expression(0)?;
        self.expect(Token::RBracket)?;
        Ok(Ast::FilterProjection {
            lhs: Box::new(left),
            predicate: Box::new(predicate),
            rhs: Box::new(self.projection_rhs(Token::Filter.binding_power())?),
        })
    }

    fn projection_rhs(&mut self, bp: u8) -> Result<Ast, CompileError> {
        match self.peek() {
            token if token.binding_power() < PROJECTION_STOP => Ok(Ast::Identity),
            Token::LBracket | Token::Filter => self.expression(bp),
            Token::Dot => {
                self.advance();
                self.dot_rhs(bp)
            }
            other => Err(self.error(format!("unexpected token {other:?} after projection"))),
        }
    }

    fn dot_rhs(&mut self, bp: u8) -> Result<Ast, CompileError> {
        match self.peek() {
            Token::Identifier(_) | Token::QuotedIdentifier(_) | Token::Star => self.expression(bp),
            Token::LBracket => {
                self.advance();
                self.multi_select_list()
            }
            Token::LBrace => {
                self.advance();
                self.multi_select_hash()
            }
            other => Err(self.error(format!("unexpected token {other:?} after '.'"))),
        }
    }

    /// Parses `n]` or `start:stop:step]` after an opening bracket
    fn index_expression(&mut self) -> Result<Ast, CompileError> {
        let mut parts: [Option<i64>; 3] = [None; 3];
        let mut part = 0;

        loop {
            match self.advance() {
                Token::Number(n) => {
                    if parts[part].is_some() {
                        return Err(self.error("expected ':' or ']'"));
                    }
                    parts[part] = Some(n);
                }
                Token::Colon => {
                    part += 1;
                    if part > 2 {
                        return Err(self.error("too many ':' in slice"));
                    }
                }
                Token::RBracket => break,
                other => return Err(self.error(format!("unexpected token {other:?} in index"))),
            }
        }

        if part == 0 {
            let index = parts[0].ok_or_else(|| self.error("empty index"))?;
            Ok(Ast::Index(index))
        } else {
            Ok(Ast::Slice {
                start: parts[0],
                stop: parts[1],
                step: parts[2],
            })
        }
    }

    fn project_if_slice(&mut self, left: Ast, index: Ast) -> Result<Ast, CompileError> {
        let is_slice = matches!(index, Ast::Slice { .. });
        let indexed = match left {
            Ast::Identity => index,
            left => Ast::Subexpr(Box::new(left), Box::new(index)),
        };
        if is_slice {
            Ok(Ast::Projection {
                lhs: Box::new(indexed),
                rhs: Box::new(self.projection_rhs(Token::Star.binding_power())?),
            })
        } else {
            Ok(indexed)
        }
    }

    fn multi_select_list(&mut self) -> Result<Ast, CompileError> {
        let mut items = vec![self.expression(0)?];
        while *self.peek() == Token::Comma {
            self.advance();
            items.push(self.expression(0)?);
        }
        self.expect(Token::RBracket)?;
        Ok(Ast::MultiList(items))
    }

    fn multi_select_hash(&mut self) -> Result<Ast, CompileError> {
        let mut pairs = Vec::new();
        loop {
            let key = match self.advance() {
                Token::Identifier(key) | Token::QuotedIdentifier(key) => key,
                other => return Err(self.error(format!("expected key, found {other:?}"))),
            };
            self.expect(Token::Colon)?;
            pairs.push((key, self.expression(0)?));

            match self.advance() {
                Token::Comma => continue,
                Token::RBrace => return Ok(Ast::MultiHash(pairs)),
                other => return Err(self.error(format!("expected ',' or '}}', found {other:?}"))),
            }
        }
    }

    fn function_call(&mut self, name: String) -> Result<Ast, CompileError> {
        let mut args = Vec::new();
        if *self.peek() != Token::RParen {
            args.push(self.expression(0)?);
            while *self.peek() == Token::Comma {
                self.advance();
                args.push(self.expression(0)?);
            }
        }
        self.expect(Token::RParen)?;

        let function = Function::lookup(&name)?;
        function.check_arity(args.len())?;
        Ok(Ast::Call { function, args })
    }
}
