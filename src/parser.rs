// ABOUTME: Recursive-descent parser turning tokens into the littlelang AST

use crate::ast::{BinOp, Block, Expr, Literal, Program, Stmt, UnOp};
use crate::error::ParseError;
use crate::lexer::Lexer;
use crate::token::{Token, TokenKind};

/// One token of lookahead over a `Lexer`.
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token,
}

type PResult<T> = Result<T, ParseError>;

impl<'a> Parser<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        let mut lexer = Lexer::new(bytes);
        let current = lexer.next_token();
        Parser { lexer, current }
    }

    fn bump(&mut self) -> Token {
        let next = self.lexer.next_token();
        std::mem::replace(&mut self.current, next)
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError::new(self.current.position, message.into())
    }

    fn illegal_to_error(&self, tok: &Token) -> ParseError {
        ParseError::new(tok.position, tok.lexeme.clone())
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> PResult<Token> {
        if self.current.kind == TokenKind::Illegal {
            return Err(self.illegal_to_error(&self.current));
        }
        if self.current.kind != kind {
            return Err(self.error(format!("expected {what}, got {:?}", self.current.kind)));
        }
        Ok(self.bump())
    }

    fn check_illegal(&self) -> PResult<()> {
        if self.current.kind == TokenKind::Illegal {
            return Err(self.illegal_to_error(&self.current));
        }
        Ok(())
    }

    pub fn parse_program(&mut self) -> PResult<Program> {
        let mut stmts = Vec::new();
        loop {
            self.check_illegal()?;
            if self.current.kind == TokenKind::Eof {
                break;
            }
            stmts.push(self.parse_statement()?);
        }
        Ok(stmts)
    }

    pub fn parse_expression_top(&mut self) -> PResult<Expr> {
        let expr = self.parse_expression()?;
        self.check_illegal()?;
        if self.current.kind != TokenKind::Eof {
            return Err(self.error(format!("expected end of input, got {:?}", self.current.kind)));
        }
        Ok(expr)
    }

    fn parse_statement(&mut self) -> PResult<Stmt> {
        match self.current.kind {
            TokenKind::If => self.parse_if(),
            TokenKind::While => self.parse_while(),
            TokenKind::For => self.parse_for(),
            TokenKind::Return => self.parse_return(),
            TokenKind::Func => self.parse_func_statement(),
            _ => self.parse_assign_or_expr(),
        }
    }

    fn parse_block(&mut self) -> PResult<Block> {
        self.expect(TokenKind::LBrace, "'{'")?;
        let mut stmts = Vec::new();
        loop {
            self.check_illegal()?;
            if self.current.kind == TokenKind::RBrace {
                break;
            }
            stmts.push(self.parse_statement()?);
        }
        self.expect(TokenKind::RBrace, "'}'")?;
        Ok(stmts)
    }

    fn parse_if(&mut self) -> PResult<Stmt> {
        let position = self.current.position;
        self.bump(); // 'if'
        let cond = self.parse_expression()?;
        let body = self.parse_block()?;
        let else_body = if self.current.kind == TokenKind::Else {
            self.bump();
            if self.current.kind == TokenKind::If {
                Some(vec![self.parse_if()?])
            } else {
                Some(self.parse_block()?)
            }
        } else {
            None
        };
        Ok(Stmt::If {
            cond,
            body,
            else_body,
            position,
        })
    }

    fn parse_while(&mut self) -> PResult<Stmt> {
        let position = self.current.position;
        self.bump(); // 'while'
        let cond = self.parse_expression()?;
        let body = self.parse_block()?;
        Ok(Stmt::While { cond, body, position })
    }

    fn parse_for(&mut self) -> PResult<Stmt> {
        let position = self.current.position;
        self.bump(); // 'for'
        let name_tok = self.expect(TokenKind::Name, "loop variable name")?;
        self.expect(TokenKind::In, "'in'")?;
        let iterable = self.parse_expression()?;
        let body = self.parse_block()?;
        Ok(Stmt::For {
            name: name_tok.lexeme,
            iterable,
            body,
            position,
        })
    }

    fn parse_return(&mut self) -> PResult<Stmt> {
        let position = self.current.position;
        self.bump(); // 'return'
        let result = self.parse_expression()?;
        Ok(Stmt::Return { result, position })
    }

    fn parse_func_statement(&mut self) -> PResult<Stmt> {
        let position = self.current.position;
        self.bump(); // 'func'
        if self.current.kind == TokenKind::Name {
            let name_tok = self.bump();
            let (params, ellipsis) = self.parse_params()?;
            let body = self.parse_block()?;
            return Ok(Stmt::FunctionDefinition {
                name: name_tok.lexeme,
                params,
                ellipsis,
                body,
                position,
            });
        }
        let (params, ellipsis) = self.parse_params()?;
        let body = self.parse_block()?;
        Ok(Stmt::ExpressionStatement {
            expr: Expr::FunctionExpression {
                params,
                ellipsis,
                body,
                position,
            },
            position,
        })
    }

    fn parse_params(&mut self) -> PResult<(Vec<String>, bool)> {
        self.expect(TokenKind::LParen, "'('")?;
        let mut params = Vec::new();
        let mut ellipsis = false;
        if self.current.kind != TokenKind::RParen {
            loop {
                self.check_illegal()?;
                if self.current.kind == TokenKind::Ellipsis {
                    let ell_pos = self.current.position;
                    self.bump();
                    ellipsis = true;
                    if self.current.kind == TokenKind::Comma {
                        self.bump();
                        if self.current.kind != TokenKind::RParen {
                            return Err(ParseError::new(ell_pos, "can only have ... after last parameter"));
                        }
                    }
                    break;
                }
                let name_tok = self.expect(TokenKind::Name, "parameter name")?;
                params.push(name_tok.lexeme);
                if self.current.kind == TokenKind::Ellipsis {
                    let ell_pos = self.current.position;
                    self.bump();
                    ellipsis = true;
                    if self.current.kind == TokenKind::Comma {
                        self.bump();
                        if self.current.kind != TokenKind::RParen {
                            return Err(ParseError::new(ell_pos, "can only have ... after last parameter"));
                        }
                    }
                    break;
                }
                if self.current.kind == TokenKind::Comma {
                    self.bump();
                    if self.current.kind == TokenKind::RParen {
                        break;
                    }
                    continue;
                }
                break;
            }
        }
        self.expect(TokenKind::RParen, "')'")?;
        Ok((params, ellipsis))
    }

    fn parse_assign_or_expr(&mut self) -> PResult<Stmt> {
        let position = self.current.position;
        let expr = self.parse_expression()?;
        if self.current.kind == TokenKind::Assign {
            let assign_pos = self.current.position;
            self.bump();
            if !matches!(expr, Expr::Variable { .. } | Expr::Subscript { .. }) {
                return Err(ParseError::new(
                    assign_pos,
                    "expected name, subscript, or dot expression on left side of =",
                ));
            }
            let value = self.parse_expression()?;
            return Ok(Stmt::Assign {
                target: expr,
                value,
                position: assign_pos,
            });
        }
        Ok(Stmt::ExpressionStatement { expr, position })
    }

    fn parse_expression(&mut self) -> PResult<Expr> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> PResult<Expr> {
        let mut left = self.parse_and()?;
        while self.current.kind == TokenKind::Or {
            let position = self.current.position;
            self.bump();
            let right = self.parse_and()?;
            left = Expr::Binary {
                left: Box::new(left),
                op: BinOp::Or,
                right: Box::new(right),
                position,
            };
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> PResult<Expr> {
        let mut left = self.parse_not()?;
        while self.current.kind == TokenKind::And {
            let position = self.current.position;
            self.bump();
            let right = self.parse_not()?;
            left = Expr::Binary {
                left: Box::new(left),
                op: BinOp::And,
                right: Box::new(right),
                position,
            };
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> PResult<Expr> {
        if self.current.kind == TokenKind::Not {
            let position = self.current.position;
            self.bump();
            let operand = self.parse_not()?;
            return Ok(Expr::Unary {
                op: UnOp::Not,
                operand: Box::new(operand),
                position,
            });
        }
        self.parse_equality()
    }

    fn parse_equality(&mut self) -> PResult<Expr> {
        let mut left = self.parse_comparison()?;
        loop {
            let op = match self.current.kind {
                TokenKind::Eq => BinOp::Eq,
                TokenKind::NotEq => BinOp::NotEq,
                _ => break,
            };
            let position = self.current.position;
            self.bump();
            let right = self.parse_comparison()?;
            left = Expr::Binary {
                left: Box::new(left),
                op,
                right: Box::new(right),
                position,
            };
        }
        Ok(left)
    }

    fn parse_comparison(&mut self) -> PResult<Expr> {
        let mut left = self.parse_addition()?;
        loop {
            let op = match self.current.kind {
                TokenKind::Lt => BinOp::Lt,
                TokenKind::Le => BinOp::Le,
                TokenKind::Gt => BinOp::Gt,
                TokenKind::Ge => BinOp::Ge,
                TokenKind::In => BinOp::In,
                _ => break,
            };
            let position = self.current.position;
            self.bump();
            let right = self.parse_addition()?;
            left = Expr::Binary {
                left: Box::new(left),
                op,
                right: Box::new(right),
                position,
            };
        }
        Ok(left)
    }

    fn parse_addition(&mut self) -> PResult<Expr> {
        let mut left = self.parse_multiply()?;
        loop {
            let op = match self.current.kind {
                TokenKind::Plus => BinOp::Add,
                TokenKind::Minus => BinOp::Sub,
                _ => break,
            };
            let position = self.current.position;
            self.bump();
            let right = self.parse_multiply()?;
            left = Expr::Binary {
                left: Box::new(left),
                op,
                right: Box::new(right),
                position,
            };
        }
        Ok(left)
    }

    fn parse_multiply(&mut self) -> PResult<Expr> {
        let mut left = self.parse_negative()?;
        loop {
            let op = match self.current.kind {
                TokenKind::Star => BinOp::Mul,
                TokenKind::Slash => BinOp::Div,
                TokenKind::Percent => BinOp::Mod,
                _ => break,
            };
            let position = self.current.position;
            self.bump();
            let right = self.parse_negative()?;
            left = Expr::Binary {
                left: Box::new(left),
                op,
                right: Box::new(right),
                position,
            };
        }
        Ok(left)
    }

    fn parse_negative(&mut self) -> PResult<Expr> {
        if self.current.kind == TokenKind::Minus {
            let position = self.current.position;
            self.bump();
            let operand = self.parse_negative()?;
            return Ok(Expr::Unary {
                op: UnOp::Neg,
                operand: Box::new(operand),
                position,
            });
        }
        self.parse_call()
    }

    fn parse_call(&mut self) -> PResult<Expr> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.current.kind {
                TokenKind::LParen => {
                    let position = self.current.position;
                    let (args, ellipsis) = self.parse_args()?;
                    expr = Expr::Call {
                        function: Box::new(expr),
                        args,
                        ellipsis,
                        position,
                    };
                }
                TokenKind::LBracket => {
                    let position = self.current.position;
                    self.bump();
                    let subscript = self.parse_expression()?;
                    self.expect(TokenKind::RBracket, "']'")?;
                    expr = Expr::Subscript {
                        container: Box::new(expr),
                        subscript: Box::new(subscript),
                        position,
                    };
                }
                TokenKind::Dot => {
                    let position = self.current.position;
                    self.bump();
                    let name_tok = self.expect(TokenKind::Name, "field name")?;
                    expr = Expr::Subscript {
                        container: Box::new(expr),
                        subscript: Box::new(Expr::Literal {
                            value: Literal::Str(name_tok.lexeme),
                            position,
                        }),
                        position,
                    };
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_args(&mut self) -> PResult<(Vec<Expr>, bool)> {
        self.expect(TokenKind::LParen, "'('")?;
        let mut args = Vec::new();
        let mut ellipsis = false;
        if self.current.kind != TokenKind::RParen {
            loop {
                self.check_illegal()?;
                args.push(self.parse_expression()?);
                if self.current.kind == TokenKind::Ellipsis {
                    let ell_pos = self.current.position;
                    self.bump();
                    ellipsis = true;
                    if self.current.kind == TokenKind::Comma {
                        self.bump();
                        if self.current.kind != TokenKind::RParen {
                            return Err(ParseError::new(ell_pos, "can only have ... after last argument"));
                        }
                    }
                    break;
                }
                if self.current.kind == TokenKind::Comma {
                    self.bump();
                    if self.current.kind == TokenKind::RParen {
                        break;
                    }
                    continue;
                }
                break;
            }
        }
        self.expect(TokenKind::RParen, "')'")?;
        Ok((args, ellipsis))
    }

    fn parse_primary(&mut self) -> PResult<Expr> {
        self.check_illegal()?;
        let position = self.current.position;
        match self.current.kind {
            TokenKind::Name => {
                let tok = self.bump();
                Ok(Expr::Variable {
                    name: tok.lexeme,
                    position,
                })
            }
            TokenKind::Int => {
                let tok = self.bump();
                let n: i64 = tok
                    .lexeme
                    .parse()
                    .map_err(|_| ParseError::new(position, format!("integer literal {} out of range", tok.lexeme)))?;
                Ok(Expr::Literal {
                    value: Literal::Int(n),
                    position,
                })
            }
            TokenKind::Str => {
                let tok = self.bump();
                Ok(Expr::Literal {
                    value: Literal::Str(tok.lexeme),
                    position,
                })
            }
            TokenKind::True => {
                self.bump();
                Ok(Expr::Literal {
                    value: Literal::Bool(true),
                    position,
                })
            }
            TokenKind::False => {
                self.bump();
                Ok(Expr::Literal {
                    value: Literal::Bool(false),
                    position,
                })
            }
            TokenKind::Nil => {
                self.bump();
                Ok(Expr::Literal {
                    value: Literal::Nil,
                    position,
                })
            }
            TokenKind::LBracket => self.parse_list(),
            TokenKind::LBrace => self.parse_map(),
            TokenKind::Func => {
                self.bump();
                let (params, ellipsis) = self.parse_params()?;
                let body = self.parse_block()?;
                Ok(Expr::FunctionExpression {
                    params,
                    ellipsis,
                    body,
                    position,
                })
            }
            TokenKind::LParen => {
                self.bump();
                let expr = self.parse_expression()?;
                self.expect(TokenKind::RParen, "')'")?;
                Ok(expr)
            }
            _ => Err(self.error(format!("unexpected token {:?}", self.current.kind))),
        }
    }

    fn parse_list(&mut self) -> PResult<Expr> {
        let position = self.current.position;
        self.bump(); // '['
        let mut values = Vec::new();
        if self.current.kind != TokenKind::RBracket {
            loop {
                self.check_illegal()?;
                values.push(self.parse_expression()?);
                if self.current.kind == TokenKind::Comma {
                    self.bump();
                    if self.current.kind == TokenKind::RBracket {
                        break;
                    }
                    continue;
                }
                break;
            }
        }
        self.expect(TokenKind::RBracket, "']'")?;
        Ok(Expr::List { values, position })
    }

    fn parse_map(&mut self) -> PResult<Expr> {
        let position = self.current.position;
        self.bump(); // '{'
        let mut items = Vec::new();
        if self.current.kind != TokenKind::RBrace {
            loop {
                self.check_illegal()?;
                let key = self.parse_expression()?;
                self.expect(TokenKind::Colon, "':'")?;
                let value = self.parse_expression()?;
                items.push((key, value));
                if self.current.kind == TokenKind::Comma {
                    self.bump();
                    if self.current.kind == TokenKind::RBrace {
                        break;
                    }
                    continue;
                }
                break;
            }
        }
        self.expect(TokenKind::RBrace, "'}'")?;
        Ok(Expr::Map { items, position })
    }
}

pub fn parse_program(bytes: &[u8]) -> PResult<Program> {
    Parser::new(bytes).parse_program()
}

pub fn parse_expression(bytes: &[u8]) -> PResult<Expr> {
    Parser::new(bytes).parse_expression_top()
}
