mod error;
mod token;

pub use error::{LexError, LexResult};
pub use token::{Span, Token, TokenKind};

pub struct Lexer<'a> {
    input: &'a str,
    pos: usize,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            line: 1,
            column: 1,
        }
    }

    pub fn next_token(&mut self) -> LexResult<Token<'a>> {
        self.skip_trivia()?;

        let span_start = self.start_span();
        let Some(ch) = self.peek_char() else {
            return Ok(Token::new(TokenKind::EOF, span_start));
        };

        if let Some(token) = self.try_consume_operator(span_start) {
            return Ok(token);
        }

        match ch {
            '"' => self.read_string(span_start),
            c if c.is_ascii_digit() => self.read_number(span_start),
            // A leading '.' is only a number when a digit follows; otherwise
            // it is the member-access dot handled above.
            '.' => self.read_number(span_start),
            c if c.is_ascii_alphabetic() || c == '_' => Ok(self.read_identifier(span_start)),
            other => Err(LexError::UnexpectedCharacter {
                character: other,
                line: self.line,
                column: self.column,
            }),
        }
    }

    /// Consumes whitespace, `//` line comments, and `/* */` block comments.
    fn skip_trivia(&mut self) -> LexResult<()> {
        loop {
            match self.peek_char() {
                Some(c) if c.is_whitespace() => {
                    self.consume_char();
                }
                Some('/') if self.peek_char_at(1) == Some('/') => {
                    self.consume_while(|c| c != '\n');
                }
                Some('/') if self.peek_char_at(1) == Some('*') => {
                    let (line, column) = (self.line, self.column);
                    self.consume_char();
                    self.consume_char();
                    loop {
                        match self.peek_char() {
                            Some('*') if self.peek_char_at(1) == Some('/') => {
                                self.consume_char();
                                self.consume_char();
                                break;
                            }
                            Some(_) => {
                                self.consume_char();
                            }
                            None => return Err(LexError::UnterminatedComment { line, column }),
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn try_consume_operator(&mut self, span: Span) -> Option<Token<'a>> {
        let ch = self.peek_char()?;
        let follows = self.peek_char_at(1);

        let (kind, width) = match (ch, follows) {
            ('=', Some('=')) => (TokenKind::EqualEqual, 2),
            ('=', Some('>')) => (TokenKind::FatArrow, 2),
            ('=', _) => (TokenKind::Equal, 1),
            ('!', Some('=')) => (TokenKind::BangEqual, 2),
            ('!', _) => (TokenKind::Bang, 1),
            ('<', Some('=')) => (TokenKind::LessEqual, 2),
            ('<', _) => (TokenKind::Less, 1),
            ('>', Some('=')) => (TokenKind::GreaterEqual, 2),
            ('>', _) => (TokenKind::Greater, 1),
            ('+', _) => (TokenKind::Plus, 1),
            ('-', _) => (TokenKind::Minus, 1),
            ('*', _) => (TokenKind::Star, 1),
            ('/', _) => (TokenKind::Slash, 1),
            ('%', _) => (TokenKind::Percent, 1),
            (',', _) => (TokenKind::Comma, 1),
            ('.', next) if next.is_none_or(|c| !c.is_ascii_digit()) => (TokenKind::Dot, 1),
            (':', _) => (TokenKind::Colon, 1),
            (';', _) => (TokenKind::Semicolon, 1),
            ('(', _) => (TokenKind::LParen, 1),
            (')', _) => (TokenKind::RParen, 1),
            ('[', _) => (TokenKind::LBracket, 1),
            (']', _) => (TokenKind::RBracket, 1),
            ('{', _) => (TokenKind::LBrace, 1),
            ('}', _) => (TokenKind::RBrace, 1),
            _ => return None,
        };

        for _ in 0..width {
            self.consume_char();
        }
        Some(Token::new(kind, self.close_span(span)))
    }

    fn read_identifier(&mut self, span: Span) -> Token<'a> {
        // Identifiers are ASCII only: [A-Za-z_][A-Za-z0-9_]*.
        self.consume_while(|c| c.is_ascii_alphanumeric() || c == '_');
        let ident = &self.input[span.start..self.pos];
        let kind = match ident {
            "if" => TokenKind::If,
            "else" => TokenKind::Else,
            "for" => TokenKind::For,
            "in" => TokenKind::In,
            "and" => TokenKind::And,
            "or" => TokenKind::Or,
            "break" => TokenKind::Break,
            "continue" => TokenKind::Continue,
            "return" => TokenKind::Return,
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            "nil" => TokenKind::Nil,
            _ => TokenKind::Identifier(ident),
        };
        Token::new(kind, self.close_span(span))
    }

    fn read_number(&mut self, span: Span) -> LexResult<Token<'a>> {
        self.consume_while(|c| c.is_ascii_digit());
        // Covers both 'digits.digits' and the bare '.digits' form.
        if self.peek_char() == Some('.')
            && self.peek_char_at(1).is_some_and(|c| c.is_ascii_digit())
        {
            self.consume_char();
            self.consume_while(|c| c.is_ascii_digit());
        }

        let literal = &self.input[span.start..self.pos];
        let value = literal
            .parse::<f64>()
            .map_err(|_| LexError::InvalidNumberLiteral {
                literal: literal.to_string(),
                line: span.line,
                column: span.column,
            })?;
        Ok(Token::new(TokenKind::Number(value), self.close_span(span)))
    }

    fn read_string(&mut self, span: Span) -> LexResult<Token<'a>> {
        self.consume_char(); // opening quote
        let content_start = self.pos;

        // No escape processing: the literal is the raw bytes between the
        // quotes, newlines included. A '"' always terminates.
        self.consume_while(|c| c != '"');

        match self.peek_char() {
            Some('"') => {
                let content = &self.input[content_start..self.pos];
                self.consume_char(); // closing quote
                Ok(Token::new(TokenKind::Str(content), self.close_span(span)))
            }
            _ => Err(LexError::UnterminatedString {
                line: span.line,
                column: span.column,
            }),
        }
    }

    fn consume_while<P>(&mut self, keep_predicate: P) -> usize
    where
        P: Fn(char) -> bool,
    {
        let start = self.pos;
        while let Some(c) = self.peek_char() {
            if !keep_predicate(c) {
                break;
            }
            self.consume_char();
        }
        self.pos - start
    }

    fn peek_char(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn peek_char_at(&self, offset: usize) -> Option<char> {
        let mut chars = self.input[self.pos..].chars();
        for _ in 0..offset {
            chars.next()?;
        }
        chars.next()
    }

    fn consume_char(&mut self) -> Option<char> {
        let c = self.peek_char()?;
        self.pos += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn start_span(&self) -> Span {
        Span {
            start: self.pos,
            end: self.pos,
            line: self.line,
            column: self.column,
        }
    }

    fn close_span(&self, span: Span) -> Span {
        Span {
            end: self.pos,
            ..span
        }
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = LexResult<Token<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_token() {
            Ok(token) => Some(Ok(token)),
            Err(e) => Some(Err(e)),
        }
    }
}

pub fn tokenize(input: &str) -> LexResult<Vec<Token<'_>>> {
    let mut lexer = Lexer::new(input);
    let mut tokens = Vec::new();
    loop {
        let token = lexer.next_token()?;
        let is_eof = matches!(token.kind, TokenKind::EOF);
        tokens.push(token);
        if is_eof {
            break;
        }
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    fn kinds(input: &str) -> Vec<TokenKind<'_>> {
        tokenize(input)
            .expect("tokenize should succeed")
            .into_iter()
            .map(|token| token.kind)
            .collect()
    }

    #[test]
    fn tokenizes_assignment_and_arithmetic() {
        let actual = kinds("x = 1 + 2.5 * y");
        let expected = vec![
            TokenKind::Identifier("x"),
            TokenKind::Equal,
            TokenKind::Number(1.0),
            TokenKind::Plus,
            TokenKind::Number(2.5),
            TokenKind::Star,
            TokenKind::Identifier("y"),
            TokenKind::EOF,
        ];
        assert_eq!(actual, expected);
    }

    #[test]
    fn tokenizes_keywords_and_reserved_words() {
        let actual = kinds("for i in xs and or if else break continue return true false nil");
        let expected = vec![
            TokenKind::For,
            TokenKind::Identifier("i"),
            TokenKind::In,
            TokenKind::Identifier("xs"),
            TokenKind::And,
            TokenKind::Or,
            TokenKind::If,
            TokenKind::Else,
            TokenKind::Break,
            TokenKind::Continue,
            TokenKind::Return,
            TokenKind::True,
            TokenKind::False,
            TokenKind::Nil,
            TokenKind::EOF,
        ];
        assert_eq!(actual, expected);
    }

    #[test]
    fn tokenizes_two_character_operators() {
        let actual = kinds("== != <= >= => = ! < >");
        let expected = vec![
            TokenKind::EqualEqual,
            TokenKind::BangEqual,
            TokenKind::LessEqual,
            TokenKind::GreaterEqual,
            TokenKind::FatArrow,
            TokenKind::Equal,
            TokenKind::Bang,
            TokenKind::Less,
            TokenKind::Greater,
            TokenKind::EOF,
        ];
        assert_eq!(actual, expected);
    }

    #[test]
    fn distinguishes_member_dot_from_fraction() {
        let actual = kinds("xs.pop() 1.5 .5");
        let expected = vec![
            TokenKind::Identifier("xs"),
            TokenKind::Dot,
            TokenKind::Identifier("pop"),
            TokenKind::LParen,
            TokenKind::RParen,
            TokenKind::Number(1.5),
            TokenKind::Number(0.5),
            TokenKind::EOF,
        ];
        assert_eq!(actual, expected);
    }

    #[test]
    fn elides_comments() {
        let input = indoc! {r#"
            a = 1 // trailing comment
            /* block
               comment */ b = 2
        "#};
        let actual = kinds(input);
        let expected = vec![
            TokenKind::Identifier("a"),
            TokenKind::Equal,
            TokenKind::Number(1.0),
            TokenKind::Identifier("b"),
            TokenKind::Equal,
            TokenKind::Number(2.0),
            TokenKind::EOF,
        ];
        assert_eq!(actual, expected);
    }

    #[test]
    fn string_literals_take_raw_contents() {
        let tokens = tokenize(r#""hello, world" "a // not a comment""#).expect("tokenize");
        assert_eq!(tokens[0].kind, TokenKind::Str("hello, world"));
        assert_eq!(tokens[1].kind, TokenKind::Str("a // not a comment"));
    }

    #[test]
    fn string_literals_may_span_lines() {
        let tokens = tokenize("\"line one\nline two\"").expect("tokenize");
        assert_eq!(tokens[0].kind, TokenKind::Str("line one\nline two"));
    }

    #[test]
    fn tracks_line_and_column() {
        let tokens = tokenize("a = 1\n  b = 2").expect("tokenize");
        let b = &tokens[3];
        assert_eq!(b.kind, TokenKind::Identifier("b"));
        assert_eq!(b.span.line, 2);
        assert_eq!(b.span.column, 3);
    }

    #[test]
    fn errors_on_unterminated_string() {
        let err = tokenize(r#"x = "abc"#).expect_err("expected unterminated string failure");
        assert_eq!(err, LexError::UnterminatedString { line: 1, column: 5 });
    }

    #[test]
    fn errors_on_unterminated_block_comment() {
        let err = tokenize("/* never closed").expect_err("expected unterminated comment failure");
        assert_eq!(err, LexError::UnterminatedComment { line: 1, column: 1 });
    }

    #[test]
    fn errors_on_unexpected_character() {
        let err = tokenize("x = 1 @ 2").expect_err("expected lexing failure");
        assert!(err.to_string().contains("Unexpected character '@'"));
    }

    #[test]
    fn identifiers_are_ascii_only() {
        let err = tokenize("π").expect_err("expected lexing failure");
        assert_eq!(
            err,
            LexError::UnexpectedCharacter {
                character: 'π',
                line: 1,
                column: 1,
            }
        );

        // A non-ASCII letter does not continue an identifier either.
        let err = tokenize("café = 1").expect_err("expected lexing failure");
        assert_eq!(
            err,
            LexError::UnexpectedCharacter {
                character: 'é',
                line: 1,
                column: 4,
            }
        );
    }
}
