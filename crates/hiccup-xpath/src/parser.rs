//! Recursive descent parser for the query language
//!
//! Precedence, loosest first: `or`, `and`, equality, relational, unary minus,
//! union `|`, path expressions.

use crate::ast::{Axis, CompareOp, Expr, LocationPath, NodeTest, Step};
use crate::error::XPathError;
use crate::token::{tokenize, Token, TokenKind};

/// Parse a query string into an expression
///
/// # Errors
///
/// Returns `XPathError::Lex` for unknown characters and `XPathError::Syntax`
/// for malformed expressions or trailing input.
pub fn parse(source: &str) -> Result<Expr, XPathError> {
    let tokens = tokenize(source);
    let mut parser = Parser::new(source, tokens);
    parser.parse_query()
}

pub struct Parser<'a> {
    source: &'a str,
    tokens: Vec<Token>,
    pos: usize,
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a str, tokens: Vec<Token>) -> Self {
        Self {
            source,
            tokens,
            pos: 0,
        }
    }

    pub fn parse_query(&mut self) -> Result<Expr, XPathError> {
        if let Some(bad) = self.tokens.iter().find(|t| t.kind == TokenKind::Error) {
            return Err(XPathError::Lex {
                offset: bad.span.start,
                found: bad.text(self.source).to_string(),
            });
        }
        if self.peek() == TokenKind::Eof {
            return Err(self.error("empty query"));
        }
        let expr = self.parse_expr()?;
        if self.peek() != TokenKind::Eof {
            return Err(self.error(format!(
                "unexpected trailing input {:?}",
                self.current().text(self.source)
            )));
        }
        Ok(expr)
    }

    // ===== Token helpers =====

    fn current(&self) -> Token {
        self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek(&self) -> TokenKind {
        self.current().kind
    }

    fn peek_at(&self, offset: usize) -> TokenKind {
        let idx = (self.pos + offset).min(self.tokens.len() - 1);
        self.tokens[idx].kind
    }

    fn current_text(&self) -> &'a str {
        self.current().text(self.source)
    }

    fn advance(&mut self) -> Token {
        let tok = self.current();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Result<Token, XPathError> {
        if self.peek() == kind {
            Ok(self.advance())
        } else {
            Err(self.error(format!(
                "expected {}, found {:?}",
                what,
                self.current_text()
            )))
        }
    }

    fn at_keyword(&self, keyword: &str) -> bool {
        self.peek() == TokenKind::Name && self.current_text() == keyword
    }

    fn error(&self, message: impl Into<String>) -> XPathError {
        XPathError::Syntax {
            offset: self.current().span.start,
            message: message.into(),
        }
    }

    // ===== Expressions =====

    fn parse_expr(&mut self) -> Result<Expr, XPathError> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<Expr, XPathError> {
        let mut lhs = self.parse_and()?;
        while self.at_keyword("or") {
            self.advance();
            let rhs = self.parse_and()?;
            lhs = Expr::Or(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expr, XPathError> {
        let mut lhs = self.parse_equality()?;
        while self.at_keyword("and") {
            self.advance();
            let rhs = self.parse_equality()?;
            lhs = Expr::And(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_equality(&mut self) -> Result<Expr, XPathError> {
        let mut lhs = self.parse_relational()?;
        loop {
            let op = match self.peek() {
                TokenKind::Eq => CompareOp::Eq,
                TokenKind::Ne => CompareOp::Ne,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_relational()?;
            lhs = Expr::Compare(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_relational(&mut self) -> Result<Expr, XPathError> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                TokenKind::Lt => CompareOp::Lt,
                TokenKind::Le => CompareOp::Le,
                TokenKind::Gt => CompareOp::Gt,
                TokenKind::Ge => CompareOp::Ge,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_unary()?;
            lhs = Expr::Compare(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expr, XPathError> {
        if self.peek() == TokenKind::Minus {
            self.advance();
            let inner = self.parse_unary()?;
            return Ok(Expr::Negate(Box::new(inner)));
        }
        self.parse_union()
    }

    fn parse_union(&mut self) -> Result<Expr, XPathError> {
        let mut lhs = self.parse_path_expr()?;
        while self.peek() == TokenKind::Pipe {
            self.advance();
            let rhs = self.parse_path_expr()?;
            lhs = Expr::Union(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_path_expr(&mut self) -> Result<Expr, XPathError> {
        match self.peek() {
            TokenKind::Slash => {
                self.advance();
                let steps = if self.can_start_step() {
                    self.parse_relative_steps()?
                } else {
                    Vec::new()
                };
                Ok(Expr::Path(LocationPath {
                    absolute: true,
                    steps,
                }))
            }
            TokenKind::DoubleSlash => {
                self.advance();
                let mut steps = vec![Step::descendant_or_self()];
                steps.extend(self.parse_relative_steps()?);
                Ok(Expr::Path(LocationPath {
                    absolute: true,
                    steps,
                }))
            }
            _ if self.starts_primary() => {
                let primary = self.parse_primary()?;
                let predicates = self.parse_predicates()?;
                let steps = match self.peek() {
                    TokenKind::Slash => {
                        self.advance();
                        self.parse_relative_steps()?
                    }
                    TokenKind::DoubleSlash => {
                        self.advance();
                        let mut steps = vec![Step::descendant_or_self()];
                        steps.extend(self.parse_relative_steps()?);
                        steps
                    }
                    _ => Vec::new(),
                };
                if predicates.is_empty() && steps.is_empty() {
                    Ok(primary)
                } else {
                    Ok(Expr::Filter {
                        primary: Box::new(primary),
                        predicates,
                        steps,
                    })
                }
            }
            _ if self.can_start_step() => Ok(Expr::Path(LocationPath {
                absolute: false,
                steps: self.parse_relative_steps()?,
            })),
            _ => Err(self.error(format!(
                "expected an expression, found {:?}",
                self.current_text()
            ))),
        }
    }

    fn starts_primary(&self) -> bool {
        match self.peek() {
            TokenKind::Literal | TokenKind::Number | TokenKind::LParen => true,
            TokenKind::Name => {
                self.peek_at(1) == TokenKind::LParen
                    && !matches!(self.current_text(), "node" | "text")
            }
            _ => false,
        }
    }

    fn parse_primary(&mut self) -> Result<Expr, XPathError> {
        let tok = self.advance();
        let text = tok.text(self.source);
        match tok.kind {
            TokenKind::Literal => Ok(Expr::Literal(text[1..text.len() - 1].to_string())),
            TokenKind::Number => text.parse::<f64>().map(Expr::Number).map_err(|_| {
                XPathError::Syntax {
                    offset: tok.span.start,
                    message: format!("bad number {:?}", text),
                }
            }),
            TokenKind::LParen => {
                let inner = self.parse_expr()?;
                self.expect(TokenKind::RParen, "')'")?;
                Ok(inner)
            }
            TokenKind::Name => {
                self.expect(TokenKind::LParen, "'('")?;
                let mut args = Vec::new();
                if self.peek() != TokenKind::RParen {
                    args.push(self.parse_expr()?);
                    while self.peek() == TokenKind::Comma {
                        self.advance();
                        args.push(self.parse_expr()?);
                    }
                }
                self.expect(TokenKind::RParen, "')'")?;
                Ok(Expr::Function {
                    name: text.to_string(),
                    args,
                })
            }
            _ => Err(XPathError::Syntax {
                offset: tok.span.start,
                message: format!("unexpected {:?}", text),
            }),
        }
    }

    // ===== Location paths =====

    fn can_start_step(&self) -> bool {
        matches!(
            self.peek(),
            TokenKind::Dot | TokenKind::DotDot | TokenKind::At | TokenKind::Star | TokenKind::Name
        )
    }

    fn parse_relative_steps(&mut self) -> Result<Vec<Step>, XPathError> {
        let mut steps = vec![self.parse_step()?];
        loop {
            match self.peek() {
                TokenKind::Slash => {
                    self.advance();
                    steps.push(self.parse_step()?);
                }
                TokenKind::DoubleSlash => {
                    self.advance();
                    steps.push(Step::descendant_or_self());
                    steps.push(self.parse_step()?);
                }
                _ => return Ok(steps),
            }
        }
    }

    fn parse_step(&mut self) -> Result<Step, XPathError> {
        match self.peek() {
            TokenKind::Dot => {
                self.advance();
                return Ok(Step::new(Axis::SelfAxis, NodeTest::Node));
            }
            TokenKind::DotDot => {
                self.advance();
                return Ok(Step::new(Axis::Parent, NodeTest::Node));
            }
            _ => {}
        }

        let axis = if self.peek() == TokenKind::At {
            self.advance();
            Axis::Attribute
        } else if self.peek() == TokenKind::Name && self.peek_at(1) == TokenKind::ColonColon {
            let name = self.current_text();
            let axis = Axis::from_name(name)
                .ok_or_else(|| self.error(format!("unknown axis {:?}", name)))?;
            self.advance();
            self.advance();
            axis
        } else {
            Axis::Child
        };

        let test = self.parse_node_test()?;
        let predicates = self.parse_predicates()?;
        Ok(Step {
            axis,
            test,
            predicates,
        })
    }

    fn parse_node_test(&mut self) -> Result<NodeTest, XPathError> {
        match self.peek() {
            TokenKind::Star => {
                self.advance();
                Ok(NodeTest::Any)
            }
            TokenKind::Name => {
                let name = self.current_text();
                if self.peek_at(1) == TokenKind::LParen {
                    let test = match name {
                        "node" => NodeTest::Node,
                        "text" => NodeTest::Text,
                        other => {
                            return Err(self.error(format!(
                                "function {}() cannot be used as a location step",
                                other
                            )))
                        }
                    };
                    self.advance();
                    self.advance();
                    self.expect(TokenKind::RParen, "')'")?;
                    Ok(test)
                } else {
                    self.advance();
                    Ok(NodeTest::Name(name.to_string()))
                }
            }
            _ => Err(self.error(format!(
                "expected a node test, found {:?}",
                self.current_text()
            ))),
        }
    }

    fn parse_predicates(&mut self) -> Result<Vec<Expr>, XPathError> {
        let mut predicates = Vec::new();
        while self.peek() == TokenKind::LBracket {
            self.advance();
            predicates.push(self.parse_expr()?);
            self.expect(TokenKind::RBracket, "']'")?;
        }
        Ok(predicates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(expr: Expr) -> LocationPath {
        match expr {
            Expr::Path(p) => p,
            other => panic!("Expected path, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_relative_child_path() {
        let p = path(parse("tags/primitivish").unwrap());
        assert!(!p.absolute);
        assert_eq!(p.steps.len(), 2);
        assert_eq!(p.steps[0].axis, Axis::Child);
        assert_eq!(p.steps[1].test, NodeTest::Name("primitivish".to_string()));
    }

    #[test]
    fn test_parse_double_slash_expands() {
        let p = path(parse("//meta").unwrap());
        assert!(p.absolute);
        assert_eq!(p.steps[0], Step::descendant_or_self());
        assert_eq!(p.steps[1].test, NodeTest::Name("meta".to_string()));
    }

    #[test]
    fn test_parse_root_only() {
        let p = path(parse("/").unwrap());
        assert!(p.absolute);
        assert!(p.steps.is_empty());
    }

    #[test]
    fn test_parse_abbreviations_and_axes() {
        let p = path(parse("../@_id").unwrap());
        assert_eq!(p.steps[0].axis, Axis::Parent);
        assert_eq!(p.steps[1].axis, Axis::Attribute);

        let p = path(parse("ancestor-or-self::*").unwrap());
        assert_eq!(p.steps[0].axis, Axis::AncestorOrSelf);
        assert_eq!(p.steps[0].test, NodeTest::Any);
    }

    #[test]
    fn test_parse_predicate_with_text_and_keyword_operators() {
        let p = path(parse("a[text()='x' or text()='y' and position() = 1]").unwrap());
        assert_eq!(p.steps[0].predicates.len(), 1);
        match &p.steps[0].predicates[0] {
            Expr::Or(_, rhs) => assert!(matches!(**rhs, Expr::And(_, _))),
            other => panic!("Expected Or, got {:?}", other),
        }
    }

    #[test]
    fn test_names_and_or_are_node_tests_in_step_position() {
        let p = path(parse("and/or").unwrap());
        assert_eq!(p.steps[0].test, NodeTest::Name("and".to_string()));
        assert_eq!(p.steps[1].test, NodeTest::Name("or".to_string()));
    }

    #[test]
    fn test_parse_function_call_and_union() {
        let expr = parse("count(//a) | b").unwrap();
        assert!(matches!(expr, Expr::Union(_, _)));

        let expr = parse("concat('a', \"b\", 1.5)").unwrap();
        match expr {
            Expr::Function { name, args } => {
                assert_eq!(name, "concat");
                assert_eq!(args.len(), 3);
                assert_eq!(args[2], Expr::Number(1.5));
            }
            other => panic!("Expected function, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_filter_expression() {
        let expr = parse("(//a | //b)[1]/c").unwrap();
        match expr {
            Expr::Filter {
                predicates, steps, ..
            } => {
                assert_eq!(predicates.len(), 1);
                assert_eq!(steps.len(), 1);
            }
            other => panic!("Expected filter, got {:?}", other),
        }
    }

    #[test]
    fn test_errors_carry_offsets() {
        match parse("a[").unwrap_err() {
            XPathError::Syntax { offset, .. } => assert_eq!(offset, 2),
            other => panic!("Expected syntax error, got {:?}", other),
        }
        match parse("a # b").unwrap_err() {
            XPathError::Lex { offset, found } => {
                assert_eq!(offset, 2);
                assert_eq!(found, "#");
            }
            other => panic!("Expected lex error, got {:?}", other),
        }
        assert!(matches!(parse(""), Err(XPathError::Syntax { .. })));
        assert!(matches!(parse("a b"), Err(XPathError::Syntax { .. })));
        assert!(matches!(parse("bogus::a"), Err(XPathError::Syntax { .. })));
    }
}
