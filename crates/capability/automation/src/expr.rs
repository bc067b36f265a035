//! 数学表达式规则：`fieldN = <算术表达式>`。
//!
//! 表达式在规则加载时解析为 AST，之后每个数据点只做求值。
//! 可用的名字只有 field1..field8 与 sqrt/abs/pow/min/max/round，
//! 运算符只有 `+ - * /`、一元正负号和括号。

use domain::{FieldIndex, FieldValues};

/// 表达式解析或求值错误。
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExprError {
    #[error("invalid character {0:?} in expression")]
    InvalidCharacter(char),
    #[error("expression must have the form `fieldN = ...`")]
    MissingAssignment,
    #[error("invalid target field: {0}")]
    InvalidTarget(String),
    #[error("unexpected end of expression")]
    UnexpectedEnd,
    #[error("unexpected token `{token}` at offset {offset}")]
    UnexpectedToken { token: String, offset: usize },
    #[error("unknown name: {0}")]
    UnknownName(String),
    #[error("invalid number literal: {0}")]
    InvalidNumber(String),
    #[error("{func}() expects {expected} argument(s), got {actual}")]
    Arity {
        func: &'static str,
        expected: &'static str,
        actual: usize,
    },
    #[error("division by zero")]
    DivisionByZero,
    #[error("math domain error in {0}()")]
    Domain(&'static str),
    #[error("expression result is not finite")]
    NonFinite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

/// 白名单函数。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    Sqrt,
    Abs,
    Pow,
    Min,
    Max,
    Round,
}

impl Function {
    fn lookup(name: &str) -> Option<Self> {
        match name {
            "sqrt" => Some(Self::Sqrt),
            "abs" => Some(Self::Abs),
            "pow" => Some(Self::Pow),
            "min" => Some(Self::Min),
            "max" => Some(Self::Max),
            "round" => Some(Self::Round),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Sqrt => "sqrt",
            Self::Abs => "abs",
            Self::Pow => "pow",
            Self::Min => "min",
            Self::Max => "max",
            Self::Round => "round",
        }
    }

    fn check_arity(self, actual: usize) -> Result<(), ExprError> {
        let (ok, expected) = match self {
            Self::Sqrt | Self::Abs => (actual == 1, "1"),
            Self::Pow => (actual == 2, "2"),
            Self::Min | Self::Max => (actual >= 2, "at least 2"),
            Self::Round => (actual == 1 || actual == 2, "1 or 2"),
        };
        if ok {
            Ok(())
        } else {
            Err(ExprError::Arity {
                func: self.name(),
                expected,
                actual,
            })
        }
    }
}

/// 表达式 AST。
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Field(FieldIndex),
    Neg(Box<Expr>),
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Call {
        func: Function,
        args: Vec<Expr>,
    },
}

impl Expr {
    /// 求值；空字段按 0 处理。
    pub fn evaluate(&self, fields: &FieldValues) -> Result<f64, ExprError> {
        match self {
            Expr::Number(value) => Ok(*value),
            Expr::Field(field) => Ok(fields.get(*field).unwrap_or(0.0)),
            Expr::Neg(inner) => Ok(-inner.evaluate(fields)?),
            Expr::Binary { op, lhs, rhs } => {
                let lhs = lhs.evaluate(fields)?;
                let rhs = rhs.evaluate(fields)?;
                match op {
                    BinaryOp::Add => Ok(lhs + rhs),
                    BinaryOp::Sub => Ok(lhs - rhs),
                    BinaryOp::Mul => Ok(lhs * rhs),
                    BinaryOp::Div => {
                        if rhs == 0.0 {
                            Err(ExprError::DivisionByZero)
                        } else {
                            Ok(lhs / rhs)
                        }
                    }
                }
            }
            Expr::Call { func, args } => {
                let values = args
                    .iter()
                    .map(|arg| arg.evaluate(fields))
                    .collect::<Result<Vec<_>, _>>()?;
                call(*func, &values)
            }
        }
    }
}

fn call(func: Function, args: &[f64]) -> Result<f64, ExprError> {
    match func {
        Function::Sqrt => {
            if args[0] < 0.0 {
                return Err(ExprError::Domain("sqrt"));
            }
            Ok(args[0].sqrt())
        }
        Function::Abs => Ok(args[0].abs()),
        Function::Pow => {
            let (base, exponent) = (args[0], args[1]);
            if base == 0.0 && exponent < 0.0 {
                return Err(ExprError::DivisionByZero);
            }
            let value = base.powf(exponent);
            if value.is_nan() {
                return Err(ExprError::Domain("pow"));
            }
            Ok(value)
        }
        Function::Min => Ok(args[1..].iter().fold(args[0], |acc, v| acc.min(*v))),
        Function::Max => Ok(args[1..].iter().fold(args[0], |acc, v| acc.max(*v))),
        Function::Round => {
            let digits = match args.get(1) {
                Some(digits) if digits.fract() != 0.0 => return Err(ExprError::Domain("round")),
                Some(digits) => *digits as i32,
                None => 0,
            };
            Ok(round_half_even(args[0], digits))
        }
    }
}

/// `round` 位数的有效范围；超出 f64 指数范围的位数按边界处理。
const MAX_ROUND_DIGITS: i32 = 308;

/// 按小数位数做银行家舍入（与 `round(x, n)` 的 half-even 行为一致）。
pub fn round_half_even(value: f64, digits: i32) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let digits = digits.clamp(-MAX_ROUND_DIGITS, MAX_ROUND_DIGITS);
    let rounded = if digits >= 0 {
        let scale = 10f64.powi(digits);
        (value * scale).round_ties_even() / scale
    } else {
        let scale = 10f64.powi(-digits);
        (value / scale).round_ties_even() * scale
    };
    if rounded.is_finite() { rounded } else { value }
}

/// 编译后的数学规则：目标字段 + 右侧 AST。
#[derive(Debug, Clone, PartialEq)]
pub struct MathExpression {
    target: FieldIndex,
    expr: Expr,
}

impl MathExpression {
    /// 解析 `fieldN = <arithmetic>`。
    pub fn parse(source: &str) -> Result<Self, ExprError> {
        let (lhs, rhs) = source
            .trim()
            .split_once('=')
            .ok_or(ExprError::MissingAssignment)?;
        let lhs = lhs.trim();
        let target =
            FieldIndex::parse(lhs).ok_or_else(|| ExprError::InvalidTarget(lhs.to_string()))?;
        if let Some(bad) = rhs.chars().find(|c| !is_allowed_char(*c)) {
            return Err(ExprError::InvalidCharacter(bad));
        }
        let expr = parse_arithmetic(rhs)?;
        Ok(Self { target, expr })
    }

    pub fn target(&self) -> FieldIndex {
        self.target
    }

    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    pub fn evaluate(&self, fields: &FieldValues) -> Result<f64, ExprError> {
        let value = self.expr.evaluate(fields)?;
        if !value.is_finite() {
            return Err(ExprError::NonFinite);
        }
        Ok(value)
    }
}

fn is_allowed_char(c: char) -> bool {
    c.is_ascii_alphanumeric()
        || c.is_whitespace()
        || matches!(c, '+' | '-' | '*' | '/' | '(' | ')' | ',' | '.' | '_')
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
    Comma,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Number(value) => value.to_string(),
            Token::Ident(name) => name.clone(),
            Token::Plus => "+".to_string(),
            Token::Minus => "-".to_string(),
            Token::Star => "*".to_string(),
            Token::Slash => "/".to_string(),
            Token::LParen => "(".to_string(),
            Token::RParen => ")".to_string(),
            Token::Comma => ",".to_string(),
        }
    }
}

fn tokenize(source: &str) -> Result<Vec<(Token, usize)>, ExprError> {
    let chars: Vec<(usize, char)> = source.char_indices().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let (offset, c) = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        let single = match c {
            '+' => Some(Token::Plus),
            '-' => Some(Token::Minus),
            '*' => Some(Token::Star),
            '/' => Some(Token::Slash),
            '(' => Some(Token::LParen),
            ')' => Some(Token::RParen),
            ',' => Some(Token::Comma),
            _ => None,
        };
        if let Some(token) = single {
            tokens.push((token, offset));
            i += 1;
            continue;
        }

        let starts_number = c.is_ascii_digit()
            || (c == '.' && chars.get(i + 1).is_some_and(|(_, n)| n.is_ascii_digit()));
        if starts_number {
            let start = i;
            while i < chars.len() && chars[i].1.is_ascii_digit() {
                i += 1;
            }
            if i < chars.len() && chars[i].1 == '.' {
                i += 1;
                while i < chars.len() && chars[i].1.is_ascii_digit() {
                    i += 1;
                }
            }
            // 指数部分：e/E 后必须跟数字（可带符号），否则不算数字的一部分
            if i < chars.len() && matches!(chars[i].1, 'e' | 'E') {
                let mut j = i + 1;
                if j < chars.len() && matches!(chars[j].1, '+' | '-') {
                    j += 1;
                }
                if j < chars.len() && chars[j].1.is_ascii_digit() {
                    while j < chars.len() && chars[j].1.is_ascii_digit() {
                        j += 1;
                    }
                    i = j;
                }
            }
            let literal: String = chars[start..i].iter().map(|(_, c)| *c).collect();
            let value = literal
                .parse::<f64>()
                .map_err(|_| ExprError::InvalidNumber(literal.clone()))?;
            tokens.push((Token::Number(value), offset));
            continue;
        }

        if c.is_ascii_alphabetic() || c == '_' {
            let start = i;
            while i < chars.len() && (chars[i].1.is_ascii_alphanumeric() || chars[i].1 == '_') {
                i += 1;
            }
            let name: String = chars[start..i].iter().map(|(_, c)| *c).collect();
            tokens.push((Token::Ident(name), offset));
            continue;
        }

        return Err(ExprError::UnexpectedToken {
            token: c.to_string(),
            offset,
        });
    }
    Ok(tokens)
}

fn parse_arithmetic(source: &str) -> Result<Expr, ExprError> {
    let tokens = tokenize(source)?;
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.expression()?;
    match parser.tokens.get(parser.pos) {
        None => Ok(expr),
        Some((token, offset)) => Err(ExprError::UnexpectedToken {
            token: token.describe(),
            offset: *offset,
        }),
    }
}

struct Parser {
    tokens: Vec<(Token, usize)>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(token, _)| token)
    }

    fn next(&mut self) -> Result<(Token, usize), ExprError> {
        let item = self
            .tokens
            .get(self.pos)
            .cloned()
            .ok_or(ExprError::UnexpectedEnd)?;
        self.pos += 1;
        Ok(item)
    }

    fn expect(&mut self, expected: Token) -> Result<(), ExprError> {
        let (token, offset) = self.next()?;
        if token == expected {
            Ok(())
        } else {
            Err(ExprError::UnexpectedToken {
                token: token.describe(),
                offset,
            })
        }
    }

    // expression := term (('+' | '-') term)*
    fn expression(&mut self) -> Result<Expr, ExprError> {
        let mut lhs = self.term()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.term()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
    }

    // term := unary (('*' | '/') unary)*
    fn term(&mut self) -> Result<Expr, ExprError> {
        let mut lhs = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.unary()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
    }

    // unary := ('+' | '-') unary | primary
    fn unary(&mut self) -> Result<Expr, ExprError> {
        match self.peek() {
            Some(Token::Minus) => {
                self.pos += 1;
                Ok(Expr::Neg(Box::new(self.unary()?)))
            }
            Some(Token::Plus) => {
                self.pos += 1;
                self.unary()
            }
            _ => self.primary(),
        }
    }

    // primary := number | field | func '(' args ')' | '(' expression ')'
    fn primary(&mut self) -> Result<Expr, ExprError> {
        let (token, offset) = self.next()?;
        match token {
            Token::Number(value) => Ok(Expr::Number(value)),
            Token::LParen => {
                let inner = self.expression()?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            Token::Ident(name) => {
                if let Some(field) = FieldIndex::parse(&name) {
                    return Ok(Expr::Field(field));
                }
                let func = Function::lookup(&name).ok_or(ExprError::UnknownName(name))?;
                self.expect(Token::LParen)?;
                let args = self.arguments()?;
                func.check_arity(args.len())?;
                Ok(Expr::Call { func, args })
            }
            other => Err(ExprError::UnexpectedToken {
                token: other.describe(),
                offset,
            }),
        }
    }

    fn arguments(&mut self) -> Result<Vec<Expr>, ExprError> {
        let mut args = Vec::new();
        if self.peek() == Some(&Token::RParen) {
            self.pos += 1;
            return Ok(args);
        }
        loop {
            args.push(self.expression()?);
            let (token, offset) = self.next()?;
            match token {
                Token::Comma => continue,
                Token::RParen => return Ok(args),
                other => {
                    return Err(ExprError::UnexpectedToken {
                        token: other.describe(),
                        offset,
                    });
                }
            }
        }
    }
}
