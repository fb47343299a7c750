//! Arithmetic expansion `$((expr))` (`spec.md` §4.5, SPEC_FULL §11).
//!
//! Precedence, tightest to loosest: unary (`+ - ! ~`), `**` (right
//! associative, binds tighter than the unary operators above it
//! apply to its operands but looser than a leading unary minus),
//! `* / %`, `+ -`, `<< >>`, relational (`< <= > >=`), `== !=`, `&`,
//! `^`, `|`, `&&`, `||`, `?:`, assignment (`=`).

use {
    crate::environment::Environment,
    thiserror::Error,
};

#[derive(Debug, Error, Eq, PartialEq)]
pub enum ArithError
{
    #[error("arithmetic syntax error near {0:?}")]
    Syntax(String),
    #[error("division by zero")]
    DivisionByZero,
    #[error("unexpected end of expression")]
    UnexpectedEof,
}

/// Evaluate an arithmetic expression, reading and optionally assigning
/// shell variables through `env`.
pub fn eval(expr: &str, env: &mut Environment) -> Result<i64, ArithError>
{
    let tokens = lex(expr)?;
    let mut parser = ArithParser { tokens, pos: 0, env };
    let value = parser.parse_assignment()?;
    if parser.pos != parser.tokens.len() {
        return Err(ArithError::Syntax(format!("{:?}", parser.tokens[parser.pos])));
    }
    Ok(value)
}

#[derive(Clone, Debug, PartialEq)]
enum Tok
{
    Num(i64),
    Ident(String),
    Op(&'static str),
    LParen,
    RParen,
    Question,
    Colon,
}

fn lex(src: &str) -> Result<Vec<Tok>, ArithError>
{
    let chars: Vec<char> = src.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        if c.is_ascii_digit() {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_alphanumeric()) {
                i += 1; // allow 0x.. hex digits too
            }
            let text: String = chars[start..i].iter().collect();
            let value = if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
                i64::from_str_radix(hex, 16).map_err(|_| ArithError::Syntax(text.clone()))?
            } else {
                text.parse().map_err(|_| ArithError::Syntax(text.clone()))?
            };
            tokens.push(Tok::Num(value));
            continue;
        }
        if c.is_alphabetic() || c == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            tokens.push(Tok::Ident(chars[start..i].iter().collect()));
            continue;
        }
        macro_rules! two {
            ($a:expr, $b:expr, $op:expr, $fallback:expr) => {
                if i + 1 < chars.len() && chars[i + 1] == $b {
                    i += 2;
                    tokens.push(Tok::Op($op));
                } else {
                    i += 1;
                    tokens.push(Tok::Op($fallback));
                }
            };
        }
        match c {
            '(' => {
                tokens.push(Tok::LParen);
                i += 1;
            },
            ')' => {
                tokens.push(Tok::RParen);
                i += 1;
            },
            '?' => {
                tokens.push(Tok::Question);
                i += 1;
            },
            ':' => {
                tokens.push(Tok::Colon);
                i += 1;
            },
            '+' => {
                i += 1;
                tokens.push(Tok::Op("+"));
            },
            '-' => {
                i += 1;
                tokens.push(Tok::Op("-"));
            },
            '~' => {
                i += 1;
                tokens.push(Tok::Op("~"));
            },
            '%' => {
                i += 1;
                tokens.push(Tok::Op("%"));
            },
            '*' => two!('*', '*', "**", "*"),
            '/' => {
                i += 1;
                tokens.push(Tok::Op("/"));
            },
            '=' => two!('=', '=', "==", "="),
            '!' => two!('!', '=', "!=", "!"),
            '<' => {
                if i + 1 < chars.len() && chars[i + 1] == '<' {
                    i += 2;
                    tokens.push(Tok::Op("<<"));
                } else {
                    two!('<', '=', "<=", "<");
                }
            },
            '>' => {
                if i + 1 < chars.len() && chars[i + 1] == '>' {
                    i += 2;
                    tokens.push(Tok::Op(">>"));
                } else {
                    two!('>', '=', ">=", ">");
                }
            },
            '&' => two!('&', '&', "&&", "&"),
            '|' => two!('|', '|', "||", "|"),
            '^' => {
                i += 1;
                tokens.push(Tok::Op("^"));
            },
            other => return Err(ArithError::Syntax(other.to_string())),
        }
    }
    Ok(tokens)
}

struct ArithParser<'a>
{
    tokens: Vec<Tok>,
    pos: usize,
    env: &'a mut Environment,
}

impl<'a> ArithParser<'a>
{
    fn peek(&self) -> Option<&Tok>
    {
        self.tokens.get(self.pos)
    }

    fn bump(&mut self) -> Option<Tok>
    {
        let t = self.tokens.get(self.pos).cloned();
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    fn eat_op(&mut self, op: &str) -> bool
    {
        if matches!(self.peek(), Some(Tok::Op(o)) if *o == op) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// `IDENT '=' assignment | ternary`
    fn parse_assignment(&mut self) -> Result<i64, ArithError>
    {
        if let Some(Tok::Ident(name)) = self.peek().cloned() {
            if matches!(self.tokens.get(self.pos + 1), Some(Tok::Op("="))) {
                self.pos += 2;
                let value = self.parse_assignment()?;
                self.env.set(&name, value.to_string());
                return Ok(value);
            }
        }
        self.parse_ternary()
    }

    fn parse_ternary(&mut self) -> Result<i64, ArithError>
    {
        let cond = self.parse_logical_or()?;
        if matches!(self.peek(), Some(Tok::Question)) {
            self.bump();
            let then_val = self.parse_assignment()?;
            match self.bump() {
                Some(Tok::Colon) => {},
                other => return Err(ArithError::Syntax(format!("{other:?}"))),
            }
            let else_val = self.parse_assignment()?;
            Ok(if cond != 0 { then_val } else { else_val })
        } else {
            Ok(cond)
        }
    }

    fn parse_logical_or(&mut self) -> Result<i64, ArithError>
    {
        let mut lhs = self.parse_logical_and()?;
        while self.eat_op("||") {
            let rhs = self.parse_logical_and()?;
            lhs = ((lhs != 0) || (rhs != 0)) as i64;
        }
        Ok(lhs)
    }

    fn parse_logical_and(&mut self) -> Result<i64, ArithError>
    {
        let mut lhs = self.parse_bitor()?;
        while self.eat_op("&&") {
            let rhs = self.parse_bitor()?;
            lhs = ((lhs != 0) && (rhs != 0)) as i64;
        }
        Ok(lhs)
    }

    fn parse_bitor(&mut self) -> Result<i64, ArithError>
    {
        let mut lhs = self.parse_bitxor()?;
        while self.eat_op("|") {
            lhs |= self.parse_bitxor()?;
        }
        Ok(lhs)
    }

    fn parse_bitxor(&mut self) -> Result<i64, ArithError>
    {
        let mut lhs = self.parse_bitand()?;
        while self.eat_op("^") {
            lhs ^= self.parse_bitand()?;
        }
        Ok(lhs)
    }

    fn parse_bitand(&mut self) -> Result<i64, ArithError>
    {
        let mut lhs = self.parse_equality()?;
        while self.eat_op("&") {
            lhs &= self.parse_equality()?;
        }
        Ok(lhs)
    }

    fn parse_equality(&mut self) -> Result<i64, ArithError>
    {
        let mut lhs = self.parse_relational()?;
        loop {
            if self.eat_op("==") {
                lhs = (lhs == self.parse_relational()?) as i64;
            } else if self.eat_op("!=") {
                lhs = (lhs != self.parse_relational()?) as i64;
            } else {
                break;
            }
        }
        Ok(lhs)
    }

    fn parse_relational(&mut self) -> Result<i64, ArithError>
    {
        let mut lhs = self.parse_shift()?;
        loop {
            if self.eat_op("<=") {
                lhs = (lhs <= self.parse_shift()?) as i64;
            } else if self.eat_op(">=") {
                lhs = (lhs >= self.parse_shift()?) as i64;
            } else if self.eat_op("<") {
                lhs = (lhs < self.parse_shift()?) as i64;
            } else if self.eat_op(">") {
                lhs = (lhs > self.parse_shift()?) as i64;
            } else {
                break;
            }
        }
        Ok(lhs)
    }

    fn parse_shift(&mut self) -> Result<i64, ArithError>
    {
        let mut lhs = self.parse_additive()?;
        loop {
            if self.eat_op("<<") {
                lhs <<= self.parse_additive()?;
            } else if self.eat_op(">>") {
                lhs >>= self.parse_additive()?;
            } else {
                break;
            }
        }
        Ok(lhs)
    }

    fn parse_additive(&mut self) -> Result<i64, ArithError>
    {
        let mut lhs = self.parse_multiplicative()?;
        loop {
            if self.eat_op("+") {
                lhs += self.parse_multiplicative()?;
            } else if self.eat_op("-") {
                lhs -= self.parse_multiplicative()?;
            } else {
                break;
            }
        }
        Ok(lhs)
    }

    fn parse_multiplicative(&mut self) -> Result<i64, ArithError>
    {
        let mut lhs = self.parse_power()?;
        loop {
            if self.eat_op("*") {
                lhs *= self.parse_power()?;
            } else if self.eat_op("/") {
                let rhs = self.parse_power()?;
                if rhs == 0 {
                    return Err(ArithError::DivisionByZero);
                }
                lhs /= rhs;
            } else if self.eat_op("%") {
                let rhs = self.parse_power()?;
                if rhs == 0 {
                    return Err(ArithError::DivisionByZero);
                }
                lhs %= rhs;
            } else {
                break;
            }
        }
        Ok(lhs)
    }

    /// Right-associative, binds tighter than the other binary
    /// operators but looser than a leading unary operator.
    fn parse_power(&mut self) -> Result<i64, ArithError>
    {
        let base = self.parse_unary()?;
        if self.eat_op("**") {
            let exp = self.parse_power()?;
            Ok(base.pow(u32::try_from(exp.max(0)).unwrap_or(0)))
        } else {
            Ok(base)
        }
    }

    fn parse_unary(&mut self) -> Result<i64, ArithError>
    {
        if self.eat_op("-") {
            Ok(-self.parse_unary()?)
        } else if self.eat_op("+") {
            self.parse_unary()
        } else if self.eat_op("!") {
            Ok((self.parse_unary()? == 0) as i64)
        } else if self.eat_op("~") {
            Ok(!self.parse_unary()?)
        } else {
            self.parse_primary()
        }
    }

    fn parse_primary(&mut self) -> Result<i64, ArithError>
    {
        match self.bump() {
            Some(Tok::Num(n)) => Ok(n),
            Some(Tok::Ident(name)) => Ok(self.env.get(&name).and_then(|v| v.parse().ok()).unwrap_or(0)),
            Some(Tok::LParen) => {
                let value = self.parse_assignment()?;
                match self.bump() {
                    Some(Tok::RParen) => Ok(value),
                    other => Err(ArithError::Syntax(format!("{other:?}"))),
                }
            },
            Some(other) => Err(ArithError::Syntax(format!("{other:?}"))),
            None => Err(ArithError::UnexpectedEof),
        }
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    fn eval_in_fresh_env(expr: &str) -> i64
    {
        let mut env = Environment::new("/");
        eval(expr, &mut env).unwrap()
    }

    #[test]
    fn precedence_multiplication_over_addition()
    {
        assert_eq!(eval_in_fresh_env("2 + 3 * 4"), 14);
    }

    #[test]
    fn power_is_right_associative_and_tighter_than_unary_result()
    {
        assert_eq!(eval_in_fresh_env("2 ** 3 ** 2"), 512);
        assert_eq!(eval_in_fresh_env("-2 ** 2"), -4);
    }

    #[test]
    fn ternary_and_comparison()
    {
        assert_eq!(eval_in_fresh_env("1 < 2 ? 10 : 20"), 10);
    }

    #[test]
    fn bitwise_and_shifts()
    {
        assert_eq!(eval_in_fresh_env("(1 << 4) | 1"), 17);
        assert_eq!(eval_in_fresh_env("6 & 3"), 2);
        assert_eq!(eval_in_fresh_env("5 ^ 1"), 4);
    }

    #[test]
    fn division_by_zero_is_an_error()
    {
        let mut env = Environment::new("/");
        assert_eq!(eval("1 / 0", &mut env), Err(ArithError::DivisionByZero));
    }

    #[test]
    fn assignment_updates_shell_variable()
    {
        let mut env = Environment::new("/");
        env.set("x", "1");
        let result = eval("x = x + 41", &mut env).unwrap();
        assert_eq!(result, 42);
        assert_eq!(env.get("x"), Some("42"));
    }

    #[test]
    fn hex_literal()
    {
        assert_eq!(eval_in_fresh_env("0xFF"), 255);
    }
}
