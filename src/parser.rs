pub mod ast;

use anyhow::Result;

use crate::lexer::{self, Span, Token, TokenKind};
use ast::{
    BinaryOperator, CallStep, DictEntry, DictKey, Expression, ExpressionList, IfBranch,
    UnaryOperator,
};

/// EBNF of the surface grammar, printed by the `--ebnf` flag.
pub const GRAMMAR: &str = r#"ExpressionList := Expression*
Expression     := Assignment
Assignment     := LogicAnd ( "=" Assignment )?
LogicAnd       := LogicOr ( "and" LogicAnd )?
LogicOr        := Equality ( "or" LogicOr )?
Equality       := Comparison ( ( "==" | "!=" ) Equality )?
Comparison     := Addition ( ( "<" | "<=" | ">" | ">=" ) Comparison )?
Addition       := Multiplication ( ( "+" | "-" ) Addition )?
Multiplication := Unary ( ( "*" | "/" | "%" ) Multiplication )?
Unary          := ( "!" | "-" ) Unary | Primary
Primary        := If | For | DataLiteral | Call | Return | Break | Continue
                | Number | String | "true" | "false" | "nil" | Ident
If             := "if" Expression Block ( "else" "if" Expression Block )* ( "else" Block )?
For            := "for" ( ForClauses | ForIn )? Block
ForClauses     := ( Expression ( "," Expression )* ";" Expression ";" Expression )? | Expression
ForIn          := ( Ident "," )? Ident "in" Expression
DataLiteral    := FunctionLiteral | ListLiteral | DictLiteral
FunctionLiteral:= ( "(" ( Ident ( "," Ident )* )? ")" | Ident ) "=>" ( Block | Expression )
ListLiteral    := "[" ( Expression ( "," Expression )* ","? )? "]"
DictLiteral    := "{" ( DictEntry ( "," DictEntry )* ","? )? "}"
DictEntry      := ( Ident | Expression ) ":" Expression
Call           := ( Ident | "(" Expression ")" ) CallChain?
CallChain      := ( "(" ( Expression ( "," Expression )* )? ")" | "." Ident | "[" Expression "]" ) CallChain?
Return         := "return" Expression?
Block          := "{" Expression* "}"
"#;

pub struct Parser<'a> {
    tokens: Vec<Token<'a>>,
    pos: usize,
    current: Token<'a>,
}

impl<'a> Parser<'a> {
    pub fn new(mut tokens: Vec<Token<'a>>) -> Self {
        if tokens.is_empty() {
            tokens.push(Token::new(TokenKind::EOF, Span::default()));
        }
        let current = tokens[0].clone();
        Self {
            tokens,
            pos: 0,
            current,
        }
    }

    pub fn parse_expression_list(mut self) -> Result<ExpressionList> {
        let mut expressions = Vec::new();
        while !matches!(self.current.kind, TokenKind::EOF) {
            expressions.push(self.parse_expression()?);
        }
        Ok(ExpressionList { expressions })
    }

    fn parse_expression(&mut self) -> Result<Expression> {
        self.parse_assignment()
    }

    fn parse_assignment(&mut self) -> Result<Expression> {
        let target = self.parse_logic_and()?;
        if matches!(self.current.kind, TokenKind::Equal) {
            self.advance();
            let value = self.parse_assignment()?;
            return Ok(Expression::Assign {
                target: Box::new(target),
                value: Box::new(value),
            });
        }
        Ok(target)
    }

    fn parse_logic_and(&mut self) -> Result<Expression> {
        let left = self.parse_logic_or()?;
        if matches!(self.current.kind, TokenKind::And) {
            self.advance();
            let right = self.parse_logic_and()?;
            return Ok(binary(left, BinaryOperator::And, right));
        }
        Ok(left)
    }

    fn parse_logic_or(&mut self) -> Result<Expression> {
        let left = self.parse_equality()?;
        if matches!(self.current.kind, TokenKind::Or) {
            self.advance();
            let right = self.parse_logic_or()?;
            return Ok(binary(left, BinaryOperator::Or, right));
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<Expression> {
        let left = self.parse_comparison()?;
        let op = match self.current.kind {
            TokenKind::EqualEqual => BinaryOperator::Equal,
            TokenKind::BangEqual => BinaryOperator::NotEqual,
            _ => return Ok(left),
        };
        self.advance();
        let right = self.parse_equality()?;
        Ok(binary(left, op, right))
    }

    fn parse_comparison(&mut self) -> Result<Expression> {
        let left = self.parse_addition()?;
        let op = match self.current.kind {
            TokenKind::Less => BinaryOperator::Less,
            TokenKind::LessEqual => BinaryOperator::LessEqual,
            TokenKind::Greater => BinaryOperator::Greater,
            TokenKind::GreaterEqual => BinaryOperator::GreaterEqual,
            _ => return Ok(left),
        };
        self.advance();
        let right = self.parse_comparison()?;
        Ok(binary(left, op, right))
    }

    fn parse_addition(&mut self) -> Result<Expression> {
        let left = self.parse_multiplication()?;
        let op = match self.current.kind {
            TokenKind::Plus => BinaryOperator::Add,
            TokenKind::Minus => BinaryOperator::Subtract,
            _ => return Ok(left),
        };
        self.advance();
        let right = self.parse_addition()?;
        Ok(binary(left, op, right))
    }

    fn parse_multiplication(&mut self) -> Result<Expression> {
        let left = self.parse_unary()?;
        let op = match self.current.kind {
            TokenKind::Star => BinaryOperator::Multiply,
            TokenKind::Slash => BinaryOperator::Divide,
            TokenKind::Percent => BinaryOperator::Modulo,
            _ => return Ok(left),
        };
        self.advance();
        let right = self.parse_multiplication()?;
        Ok(binary(left, op, right))
    }

    fn parse_unary(&mut self) -> Result<Expression> {
        let op = match self.current.kind {
            TokenKind::Bang => UnaryOperator::Not,
            TokenKind::Minus => UnaryOperator::Negate,
            _ => return self.parse_primary(),
        };
        self.advance();
        let operand = self.parse_unary()?;
        Ok(Expression::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    fn parse_primary(&mut self) -> Result<Expression> {
        match &self.current.kind {
            TokenKind::If => self.parse_if(),
            TokenKind::For => self.parse_for(),
            TokenKind::Return => self.parse_return(),
            TokenKind::Break => {
                let span = self.current.span;
                self.advance();
                Ok(Expression::Break { span })
            }
            TokenKind::Continue => {
                let span = self.current.span;
                self.advance();
                Ok(Expression::Continue { span })
            }
            TokenKind::Number(value) => {
                let value = *value;
                self.advance();
                Ok(Expression::Number(value))
            }
            TokenKind::Str(value) => {
                let value = value.to_string();
                self.advance();
                Ok(Expression::Str(value))
            }
            TokenKind::True => {
                self.advance();
                Ok(Expression::Bool(true))
            }
            TokenKind::False => {
                self.advance();
                Ok(Expression::Bool(false))
            }
            TokenKind::Nil => {
                self.advance();
                Ok(Expression::Nil)
            }
            TokenKind::LBracket => self.parse_list_literal(),
            TokenKind::LBrace => self.parse_dict_literal(),
            TokenKind::LParen => {
                if self.starts_function_literal() {
                    return self.parse_function_literal();
                }
                self.advance();
                let inner = self.parse_expression()?;
                self.expect(TokenKind::RParen, ")")?;
                self.parse_call_chain(inner)
            }
            TokenKind::Identifier(name) => {
                if matches!(self.peek_kind(1), TokenKind::FatArrow) {
                    return self.parse_function_literal();
                }
                let name = name.to_string();
                self.advance();
                self.parse_call_chain(Expression::Identifier(name))
            }
            // `in` is reserved for `for .. in ..` but names the stdin native
            // when called, so it is matched contextually here.
            TokenKind::In if matches!(self.peek_kind(1), TokenKind::LParen) => {
                self.advance();
                self.parse_call_chain(Expression::Identifier("in".to_string()))
            }
            _ => Err(self.error("expression")),
        }
    }

    /// Applies postfix `(args)` / `.name` / `[expr]` steps to a call head.
    fn parse_call_chain(&mut self, head: Expression) -> Result<Expression> {
        let mut chain = Vec::new();
        loop {
            match self.current.kind {
                TokenKind::LParen => {
                    self.advance();
                    let mut args = Vec::new();
                    if !matches!(self.current.kind, TokenKind::RParen) {
                        args.push(self.parse_expression()?);
                        while matches!(self.current.kind, TokenKind::Comma) {
                            self.advance();
                            args.push(self.parse_expression()?);
                        }
                    }
                    self.expect(TokenKind::RParen, ")")?;
                    chain.push(CallStep::Call(args));
                }
                TokenKind::Dot => {
                    self.advance();
                    let name = self.expect_identifier()?;
                    chain.push(CallStep::Member(name));
                }
                TokenKind::LBracket => {
                    self.advance();
                    let index = self.parse_expression()?;
                    self.expect(TokenKind::RBracket, "]")?;
                    chain.push(CallStep::Index(index));
                }
                _ => break,
            }
        }
        if chain.is_empty() {
            return Ok(head);
        }
        Ok(Expression::Call {
            callee: Box::new(head),
            chain,
        })
    }

    fn parse_if(&mut self) -> Result<Expression> {
        self.expect(TokenKind::If, "if")?;
        let condition = self.parse_expression()?;
        let body = self.parse_block()?;
        let mut branches = vec![IfBranch { condition, body }];
        let mut else_body = None;

        while matches!(self.current.kind, TokenKind::Else) {
            self.advance();
            if matches!(self.current.kind, TokenKind::If) {
                self.advance();
                let condition = self.parse_expression()?;
                let body = self.parse_block()?;
                branches.push(IfBranch { condition, body });
            } else {
                else_body = Some(self.parse_block()?);
                break;
            }
        }

        Ok(Expression::If {
            branches,
            else_body,
        })
    }

    fn parse_for(&mut self) -> Result<Expression> {
        self.expect(TokenKind::For, "for")?;

        // `for { ... }` loops forever.
        if matches!(self.current.kind, TokenKind::LBrace) {
            let body = self.parse_block()?;
            return Ok(Expression::For {
                init: Vec::new(),
                condition: None,
                post: None,
                body,
            });
        }

        // `for v in coll` and `for k, v in coll`.
        if let TokenKind::Identifier(first) = self.current.kind {
            if matches!(self.peek_kind(1), TokenKind::In) {
                let binding = first.to_string();
                self.advance();
                self.advance();
                return self.parse_for_in(None, binding);
            }
            if matches!(self.peek_kind(1), TokenKind::Comma)
                && matches!(self.peek_kind(2), TokenKind::Identifier(_))
                && matches!(self.peek_kind(3), TokenKind::In)
            {
                let key = first.to_string();
                self.advance();
                self.advance();
                let binding = self.expect_identifier()?;
                self.advance(); // in
                return self.parse_for_in(Some(key), binding);
            }
        }

        // C-style `for init; cond; post` or condition-only `for cond`.
        let mut clauses = vec![self.parse_expression()?];
        while matches!(self.current.kind, TokenKind::Comma) {
            self.advance();
            clauses.push(self.parse_expression()?);
        }

        if matches!(self.current.kind, TokenKind::Semicolon) {
            self.advance();
            let condition = self.parse_expression()?;
            self.expect(TokenKind::Semicolon, ";")?;
            let post = self.parse_expression()?;
            let body = self.parse_block()?;
            return Ok(Expression::For {
                init: clauses,
                condition: Some(Box::new(condition)),
                post: Some(Box::new(post)),
                body,
            });
        }

        if clauses.len() == 1 && matches!(self.current.kind, TokenKind::LBrace) {
            let condition = clauses.remove(0);
            let body = self.parse_block()?;
            return Ok(Expression::For {
                init: Vec::new(),
                condition: Some(Box::new(condition)),
                post: None,
                body,
            });
        }

        Err(self.error("for loop clauses"))
    }

    fn parse_for_in(&mut self, key: Option<String>, binding: String) -> Result<Expression> {
        let iterable = self.parse_expression()?;
        let body = self.parse_block()?;
        Ok(Expression::ForIn {
            key,
            binding,
            iterable: Box::new(iterable),
            body,
        })
    }

    fn parse_return(&mut self) -> Result<Expression> {
        let span = self.current.span;
        self.expect(TokenKind::Return, "return")?;
        let value = match self.current.kind {
            TokenKind::RBrace
            | TokenKind::RParen
            | TokenKind::RBracket
            | TokenKind::Comma
            | TokenKind::Semicolon
            | TokenKind::EOF => None,
            _ => Some(Box::new(self.parse_expression()?)),
        };
        Ok(Expression::Return { value, span })
    }

    fn parse_list_literal(&mut self) -> Result<Expression> {
        self.expect(TokenKind::LBracket, "[")?;
        let mut elements = Vec::new();
        while !matches!(self.current.kind, TokenKind::RBracket) {
            elements.push(self.parse_expression()?);
            if matches!(self.current.kind, TokenKind::Comma) {
                self.advance();
            } else {
                break;
            }
        }
        self.expect(TokenKind::RBracket, "]")?;
        Ok(Expression::ListLiteral(elements))
    }

    fn parse_dict_literal(&mut self) -> Result<Expression> {
        self.expect(TokenKind::LBrace, "{")?;
        let mut entries = Vec::new();
        while !matches!(self.current.kind, TokenKind::RBrace) {
            let key = match self.current.kind {
                TokenKind::Identifier(name) if matches!(self.peek_kind(1), TokenKind::Colon) => {
                    self.advance();
                    DictKey::Identifier(name.to_string())
                }
                _ => DictKey::Expression(self.parse_expression()?),
            };
            self.expect(TokenKind::Colon, ":")?;
            let value = self.parse_expression()?;
            entries.push(DictEntry { key, value });
            if matches!(self.current.kind, TokenKind::Comma) {
                self.advance();
            } else {
                break;
            }
        }
        self.expect(TokenKind::RBrace, "}")?;
        Ok(Expression::DictLiteral(entries))
    }

    /// Looks past a `(` for the `(a, b) =>` head shape. Parameter lists are
    /// flat, so scanning identifiers and commas up to `) =>` is exact.
    fn starts_function_literal(&self) -> bool {
        let mut offset = 1;
        loop {
            match self.peek_kind(offset) {
                TokenKind::Identifier(_) | TokenKind::Comma => offset += 1,
                TokenKind::RParen => {
                    return matches!(self.peek_kind(offset + 1), TokenKind::FatArrow);
                }
                _ => return false,
            }
        }
    }

    fn parse_function_literal(&mut self) -> Result<Expression> {
        let mut params = Vec::new();
        match self.current.kind {
            TokenKind::LParen => {
                self.advance();
                while !matches!(self.current.kind, TokenKind::RParen) {
                    params.push(self.expect_identifier()?);
                    if matches!(self.current.kind, TokenKind::Comma) {
                        self.advance();
                    } else {
                        break;
                    }
                }
                self.expect(TokenKind::RParen, ")")?;
            }
            TokenKind::Identifier(name) => {
                params.push(name.to_string());
                self.advance();
            }
            _ => return Err(self.error("function parameters")),
        }
        self.expect(TokenKind::FatArrow, "=>")?;

        let body = if matches!(self.current.kind, TokenKind::LBrace) {
            self.parse_block()?
        } else {
            vec![self.parse_expression()?]
        };
        Ok(Expression::FunctionLiteral { params, body })
    }

    fn parse_block(&mut self) -> Result<Vec<Expression>> {
        self.expect(TokenKind::LBrace, "{")?;
        let mut body = Vec::new();
        while !matches!(self.current.kind, TokenKind::RBrace | TokenKind::EOF) {
            body.push(self.parse_expression()?);
        }
        self.expect(TokenKind::RBrace, "}")?;
        Ok(body)
    }

    fn expect(&mut self, kind: TokenKind<'a>, label: &str) -> Result<()> {
        if self.current.kind == kind {
            self.advance();
            Ok(())
        } else {
            Err(self.error(label))
        }
    }

    fn expect_identifier(&mut self) -> Result<String> {
        if let TokenKind::Identifier(name) = &self.current.kind {
            let name = name.to_string();
            self.advance();
            Ok(name)
        } else {
            Err(self.error("identifier"))
        }
    }

    fn advance(&mut self) -> Token<'a> {
        let next = self
            .tokens
            .get(self.pos + 1)
            .cloned()
            .unwrap_or(Token::new(TokenKind::EOF, Span::default()));
        self.pos = self.pos.saturating_add(1);
        std::mem::replace(&mut self.current, next)
    }

    fn peek_kind(&self, offset: usize) -> TokenKind<'a> {
        self.tokens
            .get(self.pos + offset)
            .map(|token| token.kind)
            .unwrap_or(TokenKind::EOF)
    }

    fn error(&self, expected: &str) -> anyhow::Error {
        let span = self.current.span();
        anyhow::anyhow!(
            "Expected {expected}, got {:?} at line {}, column {}",
            self.current.kind(),
            span.line,
            span.column
        )
    }
}

fn binary(left: Expression, op: BinaryOperator, right: Expression) -> Expression {
    Expression::Binary {
        left: Box::new(left),
        op,
        right: Box::new(right),
    }
}

pub fn parse_tokens(tokens: Vec<Token<'_>>) -> Result<ExpressionList> {
    Parser::new(tokens).parse_expression_list()
}

/// Tokenizes and parses `source` in one step.
pub fn parse_source(source: &str) -> Result<ExpressionList> {
    let tokens = lexer::tokenize(source)?;
    parse_tokens(tokens)
}
