use crate::error::{FlexError, Span};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenType {
    // Single-character tokens
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
    LeftBracket,
    RightBracket,
    Comma,
    Dot,
    Minus,
    Plus,
    Semicolon,
    Slash,
    Star,

    // One or two character tokens
    Bang,
    BangEqual,
    Equal,
    EqualEqual,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,

    // Literals
    Identifier,
    String,
    Number,

    // Keywords
    And,
    Else,
    False,
    For,
    Function,
    If,
    Null,
    Or,
    Return,
    True,
    While,
    /// `print`: writes without a trailing newline.
    Print,
    /// `etb3`: writes followed by a newline.
    PrintLine,
    /// `da5l`, `d5l`, `scan`.
    Input,

    // Special
    Eof,
}

/// Literal payload carried by number and string tokens.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Number(f64),
    Str(String),
}

#[derive(Debug, Clone)]
pub struct Token {
    pub token_type: TokenType,
    pub lexeme: String,
    pub literal: Option<Literal>,
    pub span: Span,
}

impl Token {
    pub fn new(token_type: TokenType, lexeme: String, literal: Option<Literal>, span: Span) -> Self {
        Self {
            token_type,
            lexeme,
            literal,
            span,
        }
    }

    pub fn line(&self) -> usize {
        self.span.line
    }
}

/// Tokenize `source` in one forward pass.
pub fn tokenize(source: &str) -> Result<Vec<Token>, FlexError> {
    Lexer::new(source).scan_tokens()
}

pub struct Lexer {
    source: Vec<char>,
    tokens: Vec<Token>,
    start: usize,
    current: usize,
    line: usize,
    start_line: usize,
    keywords: HashMap<&'static str, TokenType>,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        let mut keywords = HashMap::new();
        keywords.insert("and", TokenType::And);
        keywords.insert("else", TokenType::Else);
        keywords.insert("false", TokenType::False);
        keywords.insert("for", TokenType::For);
        keywords.insert("function", TokenType::Function);
        keywords.insert("if", TokenType::If);
        keywords.insert("null", TokenType::Null);
        keywords.insert("or", TokenType::Or);
        keywords.insert("return", TokenType::Return);
        keywords.insert("true", TokenType::True);
        keywords.insert("while", TokenType::While);
        keywords.insert("print", TokenType::Print);
        keywords.insert("etb3", TokenType::PrintLine);
        keywords.insert("da5l", TokenType::Input);
        keywords.insert("d5l", TokenType::Input);
        keywords.insert("scan", TokenType::Input);

        Self {
            source: source.chars().collect(),
            tokens: Vec::new(),
            start: 0,
            current: 0,
            line: 1,
            start_line: 1,
            keywords,
        }
    }

    pub fn scan_tokens(mut self) -> Result<Vec<Token>, FlexError> {
        while !self.is_at_end() {
            self.start = self.current;
            self.start_line = self.line;
            self.scan_token()?;
        }

        self.tokens.push(Token::new(
            TokenType::Eof,
            String::new(),
            None,
            Span::new(self.current, self.current, self.line),
        ));

        tracing::debug!(count = self.tokens.len(), "tokenized source");
        Ok(self.tokens)
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.source.len()
    }

    fn scan_token(&mut self) -> Result<(), FlexError> {
        let c = self.advance();

        match c {
            '(' => self.add_token(TokenType::LeftParen),
            ')' => self.add_token(TokenType::RightParen),
            '{' => self.add_token(TokenType::LeftBrace),
            '}' => self.add_token(TokenType::RightBrace),
            '[' => self.add_token(TokenType::LeftBracket),
            ']' => self.add_token(TokenType::RightBracket),
            ',' => self.add_token(TokenType::Comma),
            '.' => self.add_token(TokenType::Dot),
            '-' => self.add_token(TokenType::Minus),
            '+' => self.add_token(TokenType::Plus),
            ';' => self.add_token(TokenType::Semicolon),
            '*' => self.add_token(TokenType::Star),
            '/' => self.add_token(TokenType::Slash),
            '!' => {
                let token_type = if self.match_char('=') {
                    TokenType::BangEqual
                } else {
                    TokenType::Bang
                };
                self.add_token(token_type);
            }
            '=' => {
                let token_type = if self.match_char('=') {
                    TokenType::EqualEqual
                } else {
                    TokenType::Equal
                };
                self.add_token(token_type);
            }
            '<' => {
                let token_type = if self.match_char('=') {
                    TokenType::LessEqual
                } else {
                    TokenType::Less
                };
                self.add_token(token_type);
            }
            '>' => {
                let token_type = if self.match_char('=') {
                    TokenType::GreaterEqual
                } else {
                    TokenType::Greater
                };
                self.add_token(token_type);
            }
            '#' => {
                // Comment goes until end of line
                while self.peek() != '\n' && !self.is_at_end() {
                    self.advance();
                }
            }
            ' ' | '\r' | '\t' => {}
            '\n' => self.line += 1,
            '"' | '\'' => self.string(c)?,
            c if c.is_ascii_digit() => self.number()?,
            c if c.is_ascii_alphabetic() || c == '_' => self.identifier(),
            _ => {
                return Err(FlexError::lexical(
                    Span::single(self.start, self.line),
                    format!("Unexpected character '{}'", c),
                ));
            }
        }

        Ok(())
    }

    fn advance(&mut self) -> char {
        let c = self.peek();
        if !self.is_at_end() {
            self.current += 1;
        }
        c
    }

    fn match_char(&mut self, expected: char) -> bool {
        if self.is_at_end() || self.peek() != expected {
            false
        } else {
            self.current += 1;
            true
        }
    }

    fn peek(&self) -> char {
        self.source.get(self.current).copied().unwrap_or('\0')
    }

    fn peek_next(&self) -> char {
        self.source.get(self.current + 1).copied().unwrap_or('\0')
    }

    fn string(&mut self, quote: char) -> Result<(), FlexError> {
        while self.peek() != quote && !self.is_at_end() {
            if self.peek() == '\n' {
                self.line += 1;
            }
            self.advance();
        }

        if self.is_at_end() {
            return Err(FlexError::lexical(
                Span::new(self.start, self.current, self.start_line),
                "Unterminated string",
            )
            .with_help(format!("Close the string with a matching {} quote.", quote)));
        }

        // The closing quote
        self.advance();

        let content: String = self.source[self.start + 1..self.current - 1].iter().collect();
        self.add_token_with_literal(TokenType::String, Some(Literal::Str(content)));
        Ok(())
    }

    fn number(&mut self) -> Result<(), FlexError> {
        while self.peek().is_ascii_digit() {
            self.advance();
        }

        // Look for a fractional part
        if self.peek() == '.' && self.peek_next().is_ascii_digit() {
            self.advance();
            while self.peek().is_ascii_digit() {
                self.advance();
            }
        }

        let text = self.lexeme();
        let value = text.parse::<f64>().map_err(|_| {
            FlexError::lexical(
                Span::new(self.start, self.current, self.start_line),
                format!("Invalid number: {}", text),
            )
        })?;
        self.add_token_with_literal(TokenType::Number, Some(Literal::Number(value)));
        Ok(())
    }

    fn identifier(&mut self) {
        while self.peek().is_ascii_alphanumeric() || self.peek() == '_' {
            self.advance();
        }

        let text = self.lexeme();
        let token_type = self
            .keywords
            .get(text.as_str())
            .copied()
            .unwrap_or(TokenType::Identifier);

        self.add_token(token_type);
    }

    fn lexeme(&self) -> String {
        self.source[self.start..self.current].iter().collect()
    }

    fn add_token(&mut self, token_type: TokenType) {
        self.add_token_with_literal(token_type, None);
    }

    fn add_token_with_literal(&mut self, token_type: TokenType, literal: Option<Literal>) {
        let lexeme = self.lexeme();
        self.tokens.push(Token::new(
            token_type,
            lexeme,
            literal,
            Span::new(self.start, self.current, self.start_line),
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenType> {
        tokenize(source)
            .expect("source should tokenize")
            .into_iter()
            .map(|token| token.token_type)
            .collect()
    }

    #[test]
    fn two_character_operators_use_lookahead() {
        assert_eq!(
            kinds("a == b != c <= d >= e = !f"),
            vec![
                TokenType::Identifier,
                TokenType::EqualEqual,
                TokenType::Identifier,
                TokenType::BangEqual,
                TokenType::Identifier,
                TokenType::LessEqual,
                TokenType::Identifier,
                TokenType::GreaterEqual,
                TokenType::Identifier,
                TokenType::Equal,
                TokenType::Bang,
                TokenType::Identifier,
                TokenType::Eof,
            ]
        );
    }

    #[test]
    fn keyword_spellings_share_token_kinds() {
        assert_eq!(
            kinds("print etb3 da5l d5l scan printer"),
            vec![
                TokenType::Print,
                TokenType::PrintLine,
                TokenType::Input,
                TokenType::Input,
                TokenType::Input,
                TokenType::Identifier,
                TokenType::Eof,
            ]
        );
    }

    #[test]
    fn strings_accept_either_quote() {
        let tokens = tokenize("'it' \"say 'hi'\"").expect("strings should tokenize");
        assert_eq!(tokens[0].literal, Some(Literal::Str("it".to_string())));
        assert_eq!(tokens[1].literal, Some(Literal::Str("say 'hi'".to_string())));
    }

    #[test]
    fn numbers_are_unsigned_and_decimal() {
        let tokens = tokenize("-12.5 7.").expect("numbers should tokenize");
        assert_eq!(tokens[0].token_type, TokenType::Minus);
        assert_eq!(tokens[1].literal, Some(Literal::Number(12.5)));
        assert_eq!(tokens[2].literal, Some(Literal::Number(7.0)));
        assert_eq!(tokens[3].token_type, TokenType::Dot);
    }

    #[test]
    fn comments_and_newlines_track_lines() {
        let tokens = tokenize("# header\nx = 1; # trailing\n\ny").expect("should tokenize");
        assert_eq!(tokens[0].line(), 2);
        assert_eq!(tokens[4].lexeme, "y");
        assert_eq!(tokens[4].line(), 4);
    }

    #[test]
    fn unterminated_string_is_lexical_error() {
        let error = tokenize("x = \"abc\n").unwrap_err();
        assert_eq!(error.kind, crate::error::ErrorKind::Lexical);
        assert_eq!(error.message, "Unterminated string");
        assert_eq!(error.line(), Some(1));
    }

    #[test]
    fn unexpected_character_is_lexical_error() {
        let error = tokenize("x = 1 @ 2;").unwrap_err();
        assert_eq!(error.message, "Unexpected character '@'");
    }
}
