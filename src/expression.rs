// src/expression.rs
use crate::context::{Context, Lookup};
use crate::errors::{FormulaError, Result};
use crate::lexer::{Op, Token, TokenKind};
use crate::observer::Observer;

/// Evaluate a token stream directly, no tree is built.
///
/// Every token must be consumed; leftovers are a parse error.
pub fn eval_tokens(
    tokens: &[Token],
    ctx: &Context,
    observer: &dyn Observer,
    max_depth: Option<usize>,
) -> Result<f64> {
    let mut p = Descent {
        tokens,
        pos: 0,
        depth: 0,
        max_depth,
        ctx,
        observer,
    };
    let value = p.expression()?;
    if let Some(tok) = p.peek() {
        return Err(unexpected(tok));
    }
    Ok(value)
}

struct Descent<'a> {
    tokens: &'a [Token],
    pos: usize,
    depth: usize,
    max_depth: Option<usize>,
    ctx: &'a Context,
    observer: &'a dyn Observer,
}

impl<'a> Descent<'a> {
    // expression := term (("+" | "-") term)*
    fn expression(&mut self) -> Result<f64> {
        let mut left = self.term()?;
        loop {
            match self.peek_op() {
                Some(Op::Add) => {
                    self.pos += 1;
                    left += self.term()?;
                }
                Some(Op::Sub) => {
                    self.pos += 1;
                    left -= self.term()?;
                }
                _ => break,
            }
        }
        Ok(left)
    }

    // term := factor (("*" | "/") factor)*
    fn term(&mut self) -> Result<f64> {
        let mut left = self.factor()?;
        loop {
            match self.peek_op() {
                Some(Op::Mul) => {
                    self.pos += 1;
                    left *= self.factor()?;
                }
                Some(Op::Div) => {
                    self.pos += 1;
                    let right = self.factor()?;
                    // x / 0 is 0, never inf or NaN
                    left = if right == 0.0 { 0.0 } else { left / right };
                }
                _ => break,
            }
        }
        Ok(left)
    }

    // factor := "-" factor | "(" expression ")" | number | variable
    fn factor(&mut self) -> Result<f64> {
        let tokens = self.tokens;
        let Some(tok) = tokens.get(self.pos) else {
            return Err(FormulaError::Parse("incomplete expression".into()));
        };
        self.pos += 1;
        match &tok.kind {
            TokenKind::Op(Op::Sub) => {
                self.enter()?;
                let v = -self.factor()?;
                self.depth -= 1;
                Ok(v)
            }
            TokenKind::Open => {
                self.enter()?;
                let v = self.expression()?;
                match self.peek() {
                    Some(Token {
                        kind: TokenKind::Close,
                        ..
                    }) => self.pos += 1,
                    Some(other) => {
                        return Err(FormulaError::Parse(format!(
                            "expected ')' but found '{}' at position {}",
                            other.kind, other.pos
                        )))
                    }
                    None => return Err(FormulaError::Parse("unclosed parenthesis".into())),
                }
                self.depth -= 1;
                Ok(v)
            }
            TokenKind::Number(n) => Ok(*n),
            TokenKind::Variable(name) => Ok(self.resolve(name)),
            TokenKind::Op(_) | TokenKind::Close => Err(unexpected(tok)),
        }
    }

    fn resolve(&self, name: &str) -> f64 {
        match self.ctx.lookup(name) {
            Lookup::Number(n) => n,
            Lookup::NotNumeric(v) => {
                self.observer.unresolved_variable(name, Some(v));
                0.0
            }
            Lookup::Missing => {
                self.observer.unresolved_variable(name, None);
                0.0
            }
        }
    }

    fn enter(&mut self) -> Result<()> {
        self.depth += 1;
        match self.max_depth {
            Some(max) if self.depth > max => Err(FormulaError::Limit(format!(
                "expression nested deeper than {max} levels"
            ))),
            _ => Ok(()),
        }
    }

    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn peek_op(&self) -> Option<Op> {
        match self.peek()?.kind {
            TokenKind::Op(op) => Some(op),
            _ => None,
        }
    }
}

fn unexpected(tok: &Token) -> FormulaError {
    FormulaError::Parse(format!(
        "unexpected token '{}' at position {}",
        tok.kind, tok.pos
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;
    use crate::observer::builtins::{RecordingObserver, SilentObserver};
    use pretty_assertions::assert_eq;

    fn run(src: &str, ctx: &Context) -> Result<f64> {
        eval_tokens(&tokenize(src)?, ctx, &SilentObserver, None)
    }

    fn num(src: &str) -> f64 {
        run(src, &Context::new()).unwrap()
    }

    #[test]
    fn precedence_and_grouping() {
        assert_eq!(num("2+3*4"), 14.0);
        assert_eq!(num("(2+3)*4"), 20.0);
        assert_eq!(num("2*3+4*5"), 26.0);
    }

    #[test]
    fn left_associative() {
        assert_eq!(num("10-4-3"), 3.0);
        assert_eq!(num("64/4/2"), 8.0);
        assert_eq!(num("8/2*4"), 16.0);
    }

    #[test]
    fn unary_minus_nests() {
        assert_eq!(num("-5+3"), -2.0);
        assert_eq!(num("--5"), 5.0);
        assert_eq!(num("2*-3"), -6.0);
        assert_eq!(num("-(2+3)*2"), -10.0);
        assert_eq!(num("4--2"), 6.0);
    }

    #[test]
    fn division_by_zero_is_zero() {
        assert_eq!(num("10/0"), 0.0);
        assert_eq!(num("1 + 10/(5-5)"), 1.0);
        assert_eq!(num("0/0"), 0.0);
        assert_eq!(num("7/-0"), 0.0);
    }

    #[test]
    fn variables_resolve_or_default_to_zero() {
        let ctx = Context::new().with("a", 2.0).with("b", 3.0).with("s", "n/a");
        assert_eq!(run("[a]+[b]", &ctx).unwrap(), 5.0);

        let rec = RecordingObserver::new();
        let toks = tokenize("[missing] + [s] + 5").unwrap();
        assert_eq!(eval_tokens(&toks, &ctx, &rec, None).unwrap(), 5.0);
        assert_eq!(rec.unresolved(), vec!["missing".to_string(), "s".to_string()]);
    }

    #[test]
    fn parse_errors() {
        let ctx = Context::new();
        assert_eq!(
            run("(2+3", &ctx).unwrap_err().to_string(),
            "unclosed parenthesis"
        );
        assert_eq!(
            run("2+3)", &ctx).unwrap_err().to_string(),
            "unexpected token ')' at position 3"
        );
        assert_eq!(
            run("2+", &ctx).unwrap_err().to_string(),
            "incomplete expression"
        );
        assert_eq!(
            run("*2", &ctx).unwrap_err().to_string(),
            "unexpected token '*' at position 0"
        );
        assert_eq!(
            run("(1 2)", &ctx).unwrap_err().to_string(),
            "expected ')' but found '2' at position 3"
        );
        assert_eq!(
            run("2 3", &ctx).unwrap_err().to_string(),
            "unexpected token '3' at position 2"
        );
        assert!(matches!(run("()", &ctx), Err(FormulaError::Parse(_))));
        assert!(matches!(run("+1", &ctx), Err(FormulaError::Parse(_))));
    }

    #[test]
    fn depth_guard() {
        let ctx = Context::new();
        let deep = format!("{}1{}", "(".repeat(5), ")".repeat(5));
        let toks = tokenize(&deep).unwrap();
        assert_eq!(eval_tokens(&toks, &ctx, &SilentObserver, Some(5)).unwrap(), 1.0);
        let err = eval_tokens(&toks, &ctx, &SilentObserver, Some(4)).unwrap_err();
        assert_eq!(err.kind(), "limit");

        let toks = tokenize("---1").unwrap();
        assert!(eval_tokens(&toks, &ctx, &SilentObserver, Some(2)).is_err());
        assert_eq!(eval_tokens(&toks, &ctx, &SilentObserver, Some(3)).unwrap(), -1.0);
    }
}
