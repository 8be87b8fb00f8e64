use crate::ast::{Accessor, BinaryOp, Expr, FunctionDecl, LogicalOp, Program, Stmt, UnaryOp};
use crate::error::{FlexError, Span};
use crate::lexer::{Literal, Token, TokenType};
use crate::stack::ensure_sufficient_stack;
use crate::value::Value;
use std::rc::Rc;

/// Parameter and argument lists are capped at this length.
pub const MAX_ARGUMENTS: usize = 255;

pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
}

impl Parser {
    pub fn new(mut tokens: Vec<Token>) -> Self {
        if tokens.last().map(|t| t.token_type) != Some(TokenType::Eof) {
            let span = tokens
                .last()
                .map(|t| Span::new(t.span.end, t.span.end, t.span.line))
                .unwrap_or_else(|| Span::new(0, 0, 1));
            tokens.push(Token::new(TokenType::Eof, String::new(), None, span));
        }
        Self { tokens, current: 0 }
    }

    /// Parses the whole token stream, stopping at the first syntax error.
    pub fn parse(&mut self) -> Result<Program, FlexError> {
        let mut statements = Vec::new();

        while !self.is_at_end() {
            statements.push(self.declaration()?);
        }

        tracing::debug!(statements = statements.len(), "parsed program");
        Ok(Program { statements })
    }

    /// Parses past errors by skipping to the next statement boundary, and
    /// returns every error found along with the statements that did parse.
    pub fn parse_recovering(&mut self) -> (Program, Vec<FlexError>) {
        let mut statements = Vec::new();
        let mut errors = Vec::new();

        while !self.is_at_end() {
            match self.declaration() {
                Ok(statement) => statements.push(statement),
                Err(error) => {
                    errors.push(error);
                    self.synchronize();
                }
            }
        }

        tracing::debug!(
            statements = statements.len(),
            errors = errors.len(),
            "parsed program with recovery"
        );
        (Program { statements }, errors)
    }

    fn declaration(&mut self) -> Result<Stmt, FlexError> {
        ensure_sufficient_stack(|| {
            if self.match_types(&[TokenType::Function]) {
                self.function_declaration()
            } else {
                self.statement()
            }
        })
    }

    fn function_declaration(&mut self) -> Result<Stmt, FlexError> {
        let keyword_span = self.previous().span;
        let name = self
            .consume_with_help(
                TokenType::Identifier,
                "Expected function name.",
                "Functions are declared as: function name(a, b) { ... }",
            )?
            .lexeme
            .clone();
        self.consume(TokenType::LeftParen, "Expected '(' after function name.")?;

        let mut params = Vec::new();
        if !self.check(TokenType::RightParen) {
            loop {
                if params.len() >= MAX_ARGUMENTS {
                    return Err(self.error_at_current("Cannot have more than 255 parameters."));
                }
                params.push(
                    self.consume(TokenType::Identifier, "Expected parameter name.")?
                        .lexeme
                        .clone(),
                );
                if !self.match_types(&[TokenType::Comma]) {
                    break;
                }
            }
        }
        self.consume(TokenType::RightParen, "Expected ')' after parameters.")?;
        self.consume_with_help(
            TokenType::LeftBrace,
            "Expected '{' before function body.",
            "A function body is a block: function name() { ... }",
        )?;
        let body = self.block()?;

        Ok(Stmt::Function(Rc::new(FunctionDecl {
            name,
            params,
            body,
            span: keyword_span.to(&self.previous().span),
        })))
    }

    fn statement(&mut self) -> Result<Stmt, FlexError> {
        if self.match_types(&[TokenType::If]) {
            self.if_statement()
        } else if self.match_types(&[TokenType::While]) {
            self.while_statement()
        } else if self.match_types(&[TokenType::For]) {
            self.for_statement()
        } else if self.match_types(&[TokenType::Return]) {
            self.return_statement()
        } else if self.match_types(&[TokenType::Print, TokenType::PrintLine]) {
            self.print_statement()
        } else if self.match_types(&[TokenType::Input]) {
            self.input_statement()
        } else if self.match_types(&[TokenType::LeftBrace]) {
            let start = self.previous().span;
            let statements = self.block()?;
            Ok(Stmt::Block {
                statements,
                span: start.to(&self.previous().span),
            })
        } else {
            self.expression_statement()
        }
    }

    /// Statements up to the closing brace; the opening brace is already consumed.
    fn block(&mut self) -> Result<Vec<Stmt>, FlexError> {
        let mut statements = Vec::new();

        while !self.check(TokenType::RightBrace) && !self.is_at_end() {
            statements.push(self.declaration()?);
        }

        self.consume_with_help(
            TokenType::RightBrace,
            "Expected '}' after block.",
            "Block statements must be closed with '}' after the opening '{'.",
        )?;
        Ok(statements)
    }

    fn if_statement(&mut self) -> Result<Stmt, FlexError> {
        let start = self.previous().span;

        self.consume_with_help(
            TokenType::LeftParen,
            "Expected '(' after 'if'.",
            "If statements require parentheses around the condition: if (condition) { ... }",
        )?;
        let condition = self.expression()?;
        self.consume_with_help(
            TokenType::RightParen,
            "Expected ')' after if condition.",
            "If conditions must be enclosed in parentheses: if (condition) { ... }",
        )?;

        let then_branch = Box::new(self.statement()?);
        let else_branch = if self.match_types(&[TokenType::Else]) {
            Some(Box::new(self.statement()?))
        } else {
            None
        };

        let end = match else_branch {
            Some(ref else_stmt) => *else_stmt.span(),
            None => *then_branch.span(),
        };

        Ok(Stmt::If {
            condition,
            then_branch,
            else_branch,
            span: start.to(&end),
        })
    }

    fn while_statement(&mut self) -> Result<Stmt, FlexError> {
        let start = self.previous().span;

        self.consume(TokenType::LeftParen, "Expected '(' after 'while'.")?;
        let condition = self.expression()?;
        self.consume(TokenType::RightParen, "Expected ')' after while condition.")?;

        let body = Box::new(self.statement()?);
        let span = start.to(body.span());

        Ok(Stmt::While {
            condition,
            body,
            span,
        })
    }

    /// `for (init; cond; step) body` becomes
    /// `{ init; while (cond) { body; step; } }`.
    fn for_statement(&mut self) -> Result<Stmt, FlexError> {
        let keyword_span = self.previous().span;

        self.consume(TokenType::LeftParen, "Expected '(' after 'for'.")?;

        let initializer = if self.match_types(&[TokenType::Semicolon]) {
            None
        } else {
            Some(self.expression_statement()?)
        };

        let condition = if !self.check(TokenType::Semicolon) {
            Some(self.expression()?)
        } else {
            None
        };
        self.consume(TokenType::Semicolon, "Expected ';' after loop condition.")?;

        let increment = if !self.check(TokenType::RightParen) {
            Some(self.expression()?)
        } else {
            None
        };
        self.consume(TokenType::RightParen, "Expected ')' after for clauses.")?;

        let mut body = self.statement()?;
        let span = keyword_span.to(body.span());

        if let Some(increment) = increment {
            let increment_span = *increment.span();
            body = Stmt::Block {
                statements: vec![body, Self::statement_from(increment, increment_span)],
                span,
            };
        }

        let condition = condition.unwrap_or(Expr::Literal {
            value: Value::Bool(true),
            span: keyword_span,
        });
        let mut desugared = Stmt::While {
            condition,
            body: Box::new(body),
            span,
        };

        if let Some(initializer) = initializer {
            desugared = Stmt::Block {
                statements: vec![initializer, desugared],
                span,
            };
        }

        Ok(desugared)
    }

    fn return_statement(&mut self) -> Result<Stmt, FlexError> {
        let keyword_span = self.previous().span;
        let value = if !self.check(TokenType::Semicolon) {
            Some(self.expression()?)
        } else {
            None
        };
        self.consume(TokenType::Semicolon, "Expected ';' after return value.")?;

        Ok(Stmt::Return {
            value,
            span: keyword_span.to(&self.previous().span),
        })
    }

    fn print_statement(&mut self) -> Result<Stmt, FlexError> {
        let keyword = self.previous().clone();
        let newline = keyword.token_type == TokenType::PrintLine;

        self.consume_with_help(
            TokenType::LeftParen,
            &format!("Expected '(' after '{}'.", keyword.lexeme),
            &format!("Write output as: {}(value);", keyword.lexeme),
        )?;
        let expr = self.expression()?;
        self.consume(TokenType::RightParen, "Expected ')' after print value.")?;
        self.consume(TokenType::Semicolon, "Expected ';' after print statement.")?;

        Ok(Stmt::Print {
            expr,
            newline,
            span: keyword.span.to(&self.previous().span),
        })
    }

    fn input_statement(&mut self) -> Result<Stmt, FlexError> {
        let keyword = self.previous().clone();

        self.consume(
            TokenType::LeftParen,
            &format!("Expected '(' after '{}'.", keyword.lexeme),
        )?;
        let prompt = if !self.check(TokenType::RightParen) {
            Some(self.expression()?)
        } else {
            None
        };
        self.consume(
            TokenType::RightParen,
            &format!("Expected ')' after {} arguments.", keyword.lexeme),
        )?;
        self.consume_with_help(
            TokenType::Semicolon,
            &format!("Expected ';' after {} statement.", keyword.lexeme),
            &format!("To keep the line that was read, assign it: name = {}(\"prompt\");", keyword.lexeme),
        )?;

        Ok(Stmt::Input {
            keyword: keyword.lexeme,
            prompt,
            span: keyword.span.to(&self.previous().span),
        })
    }

    fn expression_statement(&mut self) -> Result<Stmt, FlexError> {
        let expr = self.expression()?;
        self.consume_with_help(
            TokenType::Semicolon,
            "Expected ';' after expression.",
            "Every statement ends with a semicolon.",
        )?;
        let span = expr.span().to(&self.previous().span);
        Ok(Self::statement_from(expr, span))
    }

    /// A bare `name = value` becomes an assignment statement.
    fn statement_from(expr: Expr, span: Span) -> Stmt {
        match expr {
            Expr::Assign { name, value, .. } => Stmt::Assign {
                name,
                value: *value,
                span,
            },
            expr => Stmt::Expression { expr, span },
        }
    }

    fn expression(&mut self) -> Result<Expr, FlexError> {
        ensure_sufficient_stack(|| self.assignment())
    }

    fn assignment(&mut self) -> Result<Expr, FlexError> {
        let expr = self.or()?;

        if self.match_types(&[TokenType::Equal]) {
            let equals = self.previous().clone();
            let value = self.assignment()?;
            let span = expr.span().to(value.span());

            return match expr {
                Expr::Variable { name, .. } => Ok(Expr::Assign {
                    name,
                    value: Box::new(value),
                    span,
                }),
                Expr::Get { object, key, .. } => Ok(Expr::Set {
                    object,
                    key,
                    value: Box::new(value),
                    span,
                }),
                _ => Err(self.error_at(&equals, "Invalid assignment target.").with_help(
                    "Only variables and array elements can be assigned to. Examples: 'x = 10' or 'items[0] = 10'",
                )),
            };
        }

        Ok(expr)
    }

    fn or(&mut self) -> Result<Expr, FlexError> {
        let mut expr = self.and()?;

        while self.match_types(&[TokenType::Or]) {
            let right = self.and()?;
            let span = expr.span().to(right.span());
            expr = Expr::Logical {
                left: Box::new(expr),
                operator: LogicalOp::Or,
                right: Box::new(right),
                span,
            };
        }

        Ok(expr)
    }

    fn and(&mut self) -> Result<Expr, FlexError> {
        let mut expr = self.equality()?;

        while self.match_types(&[TokenType::And]) {
            let right = self.equality()?;
            let span = expr.span().to(right.span());
            expr = Expr::Logical {
                left: Box::new(expr),
                operator: LogicalOp::And,
                right: Box::new(right),
                span,
            };
        }

        Ok(expr)
    }

    fn equality(&mut self) -> Result<Expr, FlexError> {
        let mut expr = self.comparison()?;

        while self.match_types(&[TokenType::BangEqual, TokenType::EqualEqual]) {
            let operator = match self.previous().token_type {
                TokenType::BangEqual => BinaryOp::NotEqual,
                _ => BinaryOp::Equal,
            };
            let right = self.comparison()?;
            expr = Self::binary(expr, operator, right);
        }

        Ok(expr)
    }

    fn comparison(&mut self) -> Result<Expr, FlexError> {
        let mut expr = self.term()?;

        while self.match_types(&[
            TokenType::Greater,
            TokenType::GreaterEqual,
            TokenType::Less,
            TokenType::LessEqual,
        ]) {
            let operator = match self.previous().token_type {
                TokenType::Greater => BinaryOp::Greater,
                TokenType::GreaterEqual => BinaryOp::GreaterEqual,
                TokenType::Less => BinaryOp::Less,
                _ => BinaryOp::LessEqual,
            };
            let right = self.term()?;
            expr = Self::binary(expr, operator, right);
        }

        Ok(expr)
    }

    fn term(&mut self) -> Result<Expr, FlexError> {
        let mut expr = self.factor()?;

        while self.match_types(&[TokenType::Minus, TokenType::Plus]) {
            let operator = match self.previous().token_type {
                TokenType::Minus => BinaryOp::Subtract,
                _ => BinaryOp::Add,
            };
            let right = self.factor()?;
            expr = Self::binary(expr, operator, right);
        }

        Ok(expr)
    }

    fn factor(&mut self) -> Result<Expr, FlexError> {
        let mut expr = self.unary()?;

        while self.match_types(&[TokenType::Slash, TokenType::Star]) {
            let operator = match self.previous().token_type {
                TokenType::Slash => BinaryOp::Divide,
                _ => BinaryOp::Multiply,
            };
            let right = self.unary()?;
            expr = Self::binary(expr, operator, right);
        }

        Ok(expr)
    }

    fn binary(left: Expr, operator: BinaryOp, right: Expr) -> Expr {
        let span = left.span().to(right.span());
        Expr::Binary {
            left: Box::new(left),
            operator,
            right: Box::new(right),
            span,
        }
    }

    fn unary(&mut self) -> Result<Expr, FlexError> {
        if self.match_types(&[TokenType::Bang, TokenType::Minus]) {
            let operator = match self.previous().token_type {
                TokenType::Bang => UnaryOp::Not,
                _ => UnaryOp::Negate,
            };

            let start = self.previous().span;
            let right = self.unary()?;
            let span = start.to(right.span());

            return Ok(Expr::Unary {
                operator,
                operand: Box::new(right),
                span,
            });
        }

        self.call()
    }

    /// Postfix chain: calls, `[index]` and `.name` in any order.
    fn call(&mut self) -> Result<Expr, FlexError> {
        let mut expr = self.primary()?;

        loop {
            if self.match_types(&[TokenType::LeftParen]) {
                expr = self.finish_call(expr)?;
            } else if self.match_types(&[TokenType::LeftBracket]) {
                let index = self.expression()?;
                let close = self
                    .consume(TokenType::RightBracket, "Expected ']' after index.")?
                    .span;
                let span = expr.span().to(&close);
                expr = Expr::Get {
                    object: Box::new(expr),
                    key: Accessor::Index(Box::new(index)),
                    span,
                };
            } else if self.match_types(&[TokenType::Dot]) {
                let property = self
                    .consume_with_help(
                        TokenType::Identifier,
                        "Expected property name after '.'.",
                        "Property access looks like: items.length",
                    )?
                    .clone();
                let span = expr.span().to(&property.span);
                expr = Expr::Get {
                    object: Box::new(expr),
                    key: Accessor::Property(property.lexeme),
                    span,
                };
            } else {
                break;
            }
        }

        Ok(expr)
    }

    fn finish_call(&mut self, callee: Expr) -> Result<Expr, FlexError> {
        let mut args = Vec::new();

        if !self.check(TokenType::RightParen) {
            loop {
                if args.len() >= MAX_ARGUMENTS {
                    return Err(self.error_at_current("Cannot have more than 255 arguments."));
                }
                args.push(self.expression()?);
                if !self.match_types(&[TokenType::Comma]) {
                    break;
                }
            }
        }

        let paren = self
            .consume_with_help(
                TokenType::RightParen,
                "Expected ')' after arguments.",
                "Separate arguments with commas and close the call with ')'.",
            )?
            .span;

        let span = callee.span().to(&paren);
        Ok(Expr::Call {
            callee: Box::new(callee),
            args,
            span,
        })
    }

    fn primary(&mut self) -> Result<Expr, FlexError> {
        if self.is_at_end() {
            return Err(self.error_at_current("Expected expression.").with_help(
                "Expected an expression here. Check for unmatched parentheses, brackets, or incomplete statements.",
            ));
        }

        let token = self.advance().clone();

        match token.token_type {
            TokenType::False => Ok(Expr::Literal {
                value: Value::Bool(false),
                span: token.span,
            }),
            TokenType::True => Ok(Expr::Literal {
                value: Value::Bool(true),
                span: token.span,
            }),
            TokenType::Null => Ok(Expr::Literal {
                value: Value::Null,
                span: token.span,
            }),
            TokenType::Number | TokenType::String => {
                let value = match token.literal {
                    Some(Literal::Number(n)) => Value::Number(n),
                    Some(Literal::Str(s)) => Value::String(s),
                    None => {
                        return Err(self.error_at(&token, "Malformed literal."));
                    }
                };
                Ok(Expr::Literal {
                    value,
                    span: token.span,
                })
            }
            // Keyword spellings name the same-named natives in expression position.
            TokenType::Identifier | TokenType::Print | TokenType::PrintLine | TokenType::Input => {
                Ok(Expr::Variable {
                    name: token.lexeme,
                    span: token.span,
                })
            }
            TokenType::LeftParen => {
                let expr = self.expression()?;
                let end = self
                    .consume_with_help(
                        TokenType::RightParen,
                        "Expected ')' after expression.",
                        "Every opening parenthesis '(' must have a matching closing parenthesis ')'.",
                    )?
                    .span;
                Ok(Expr::Grouping {
                    expr: Box::new(expr),
                    span: token.span.to(&end),
                })
            }
            TokenType::LeftBracket => self.array_literal(token.span),
            _ => {
                let help = match token.token_type {
                    TokenType::RightParen => "Found ')' without matching '('. Check for unbalanced parentheses.",
                    TokenType::RightBrace => "Found '}' without matching '{'. Check for unbalanced braces.",
                    TokenType::RightBracket => "Found ']' without matching '['. Check for unbalanced brackets.",
                    TokenType::Function => "Functions can only be declared as statements: function name() { ... }",
                    _ => "Expected a literal value, variable, or parenthesized expression here.",
                };

                // Leave the offending token for recovery to see
                self.current -= 1;
                Err(self.error_at(&token, "Expected expression.").with_help(help))
            }
        }
    }

    fn array_literal(&mut self, start: Span) -> Result<Expr, FlexError> {
        let mut elements = Vec::new();

        if !self.check(TokenType::RightBracket) {
            loop {
                elements.push(self.expression()?);
                if !self.match_types(&[TokenType::Comma]) {
                    break;
                }
            }
        }

        let end = self
            .consume_with_help(
                TokenType::RightBracket,
                "Expected ']' after array elements.",
                "Array literals look like [1, 2, 3].",
            )?
            .span;

        Ok(Expr::Array {
            elements,
            span: start.to(&end),
        })
    }

    /// Skips tokens until just past a `;` or just before a token that starts
    /// a statement.
    fn synchronize(&mut self) {
        self.advance();

        while !self.is_at_end() {
            if self.previous().token_type == TokenType::Semicolon {
                return;
            }

            match self.peek().token_type {
                TokenType::Function
                | TokenType::If
                | TokenType::While
                | TokenType::For
                | TokenType::Return
                | TokenType::Print
                | TokenType::PrintLine => return,
                _ => {}
            }

            self.advance();
        }
    }

    fn match_types(&mut self, types: &[TokenType]) -> bool {
        for token_type in types {
            if self.check(*token_type) {
                self.advance();
                return true;
            }
        }
        false
    }

    fn check(&self, token_type: TokenType) -> bool {
        if self.is_at_end() {
            false
        } else {
            self.peek().token_type == token_type
        }
    }

    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.previous()
    }

    fn is_at_end(&self) -> bool {
        self.peek().token_type == TokenType::Eof
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.current.saturating_sub(1)]
    }

    fn consume(&mut self, token_type: TokenType, message: &str) -> Result<&Token, FlexError> {
        if self.check(token_type) {
            Ok(self.advance())
        } else {
            Err(self.error_at_current(message))
        }
    }

    fn consume_with_help(
        &mut self,
        token_type: TokenType,
        message: &str,
        help: &str,
    ) -> Result<&Token, FlexError> {
        if self.check(token_type) {
            Ok(self.advance())
        } else {
            Err(self.error_at_current(message).with_help(help))
        }
    }

    fn error_at_current(&self, message: &str) -> FlexError {
        let token = self.peek();
        if token.token_type == TokenType::Eof && self.current > 0 {
            // Point just past the last real token
            let last = self.previous().span;
            FlexError::syntax(Span::single(last.end, last.line), "end".to_string(), message)
        } else {
            self.error_at(token, message)
        }
    }

    fn error_at(&self, token: &Token, message: &str) -> FlexError {
        let near = if token.token_type == TokenType::Eof {
            "end".to_string()
        } else {
            format!("'{}'", token.lexeme)
        };
        FlexError::syntax(token.span, near, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;

    fn parse(source: &str) -> Result<Program, FlexError> {
        Parser::new(tokenize(source)?).parse()
    }

    #[test]
    fn for_loops_desugar_into_while() {
        let program = parse("for (i = 0; i < 3; i = i + 1) { etb3(i); }").expect("should parse");
        let Stmt::Block { statements, .. } = &program.statements[0] else {
            panic!("expected outer block, got {:?}", program.statements[0]);
        };
        assert!(matches!(statements[0], Stmt::Assign { ref name, .. } if name == "i"));
        let Stmt::While { body, .. } = &statements[1] else {
            panic!("expected while, got {:?}", statements[1]);
        };
        let Stmt::Block { statements: inner, .. } = body.as_ref() else {
            panic!("expected body block");
        };
        assert_eq!(inner.len(), 2);
        assert!(matches!(inner[1], Stmt::Assign { .. }));
    }

    #[test]
    fn missing_for_condition_loops_forever() {
        let program = parse("for (;;) { return; }").expect("should parse");
        let Stmt::While { condition, .. } = &program.statements[0] else {
            panic!("expected bare while");
        };
        assert!(matches!(condition, Expr::Literal { value: Value::Bool(true), .. }));
    }

    #[test]
    fn assignment_is_right_associative() {
        let program = parse("a = b = 1;").expect("should parse");
        let Stmt::Assign { name, value, .. } = &program.statements[0] else {
            panic!("expected assignment statement");
        };
        assert_eq!(name, "a");
        assert!(matches!(value, Expr::Assign { name, .. } if name == "b"));
    }

    #[test]
    fn index_assignment_becomes_set() {
        let program = parse("arr[5] = 9;").expect("should parse");
        let Stmt::Expression { expr, .. } = &program.statements[0] else {
            panic!("expected expression statement");
        };
        assert!(matches!(expr, Expr::Set { key: Accessor::Index(_), .. }));
    }

    #[test]
    fn input_keyword_is_callable_in_expressions() {
        let program = parse("name = da5l(\"Name? \"); scan();").expect("should parse");
        assert!(matches!(program.statements[0], Stmt::Assign { .. }));
        assert!(matches!(program.statements[1], Stmt::Input { prompt: None, .. }));
    }

    #[test]
    fn invalid_assignment_target_reports_equals() {
        let error = parse("1 + 2 = 3;").unwrap_err();
        assert_eq!(error.message, "Invalid assignment target.");
        assert_eq!(error.near.as_deref(), Some("'='"));
    }

    #[test]
    fn missing_semicolon_reports_at_end() {
        let error = parse("x = 1").unwrap_err();
        assert_eq!(error.message, "Expected ';' after expression.");
        assert_eq!(error.near.as_deref(), Some("end"));
        assert_eq!(error.line(), Some(1));
    }

    #[test]
    fn recovery_collects_every_error() {
        let tokens = tokenize("x = ;\netb3(1);\ny = (2;\nz = 3;").expect("should tokenize");
        let (program, errors) = Parser::new(tokens).parse_recovering();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].line(), Some(1));
        assert_eq!(errors[1].line(), Some(3));
        assert_eq!(program.statements.len(), 2);
    }

    #[test]
    fn too_many_arguments_is_syntax_error() {
        let args = vec!["1"; MAX_ARGUMENTS + 1].join(", ");
        let error = parse(&format!("f({});", args)).unwrap_err();
        assert_eq!(error.message, "Cannot have more than 255 arguments.");
    }
}
