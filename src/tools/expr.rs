//! Arithmetic expression evaluator backing the `calculate` tool.
//!
//! Accepts numeric literals, `+ - * / // % **`, unary signs, parentheses and
//! a fixed allow-list of functions and constants. Anything else is rejected
//! while tokenizing or parsing, before any evaluation happens. Integer and
//! float results are kept apart so `2+2` renders as `4` and `sqrt(16)` as
//! `4.0`.

use std::fmt;

use thiserror::Error;

pub const MAX_EXPRESSION_LEN: usize = 1024;
const MAX_DEPTH: usize = 64;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("invalid character '{0}' at position {1}")]
    InvalidChar(char, usize),
    #[error("invalid number literal '{0}'")]
    InvalidNumber(String),
    #[error("unexpected {0}")]
    Unexpected(String),
    #[error("unexpected end of expression")]
    UnexpectedEnd,
    #[error("name '{0}' is not defined")]
    UnknownName(String),
    #[error("'{0}' is a constant, not a function")]
    NotCallable(String),
    #[error("{name}() takes {expected} argument(s) ({got} given)")]
    Arity {
        name: String,
        expected: &'static str,
        got: usize,
    },
    #[error("{0} expects an integer argument")]
    IntegerRequired(&'static str),
    #[error("division by zero")]
    DivisionByZero,
    #[error("math domain error")]
    Domain,
    #[error("integer result too large")]
    Overflow,
    #[error("expression is longer than {MAX_EXPRESSION_LEN} characters")]
    TooLong,
    #[error("expression nested too deeply")]
    TooDeep,
}

/// A value is either an exact integer or a float, as in the expression
/// language users expect from a calculator prompt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i64),
    Float(f64),
    /// Outcome of a predicate such as `isnan`; arithmetic treats it as 0 or 1.
    Bool(bool),
}

impl Number {
    pub fn as_f64(self) -> f64 {
        match self {
            Number::Int(i) => i as f64,
            Number::Float(f) => f,
            Number::Bool(b) => f64::from(u8::from(b)),
        }
    }

    fn is_zero(self) -> bool {
        match self {
            Number::Int(i) => i == 0,
            Number::Float(f) => f == 0.0,
            Number::Bool(b) => !b,
        }
    }

    fn int_like(self) -> Number {
        match self {
            Number::Bool(b) => Number::Int(i64::from(b)),
            other => other,
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Int(i) => write!(f, "{i}"),
            Number::Float(x) => f.write_str(&format_float(*x)),
            Number::Bool(true) => f.write_str("True"),
            Number::Bool(false) => f.write_str("False"),
        }
    }
}

fn format_float(x: f64) -> String {
    if x.is_nan() {
        return "nan".into();
    }
    if x.is_infinite() {
        return if x > 0.0 { "inf".into() } else { "-inf".into() };
    }
    let abs = x.abs();
    if abs != 0.0 && !(1e-4..1e16).contains(&abs) {
        let rendered = format!("{x:e}");
        if let Some((mantissa, exp)) = rendered.split_once('e') {
            let (sign, digits) = match exp.strip_prefix('-') {
                Some(d) => ('-', d),
                None => ('+', exp),
            };
            return format!("{mantissa}e{sign}{digits:0>2}");
        }
        return rendered;
    }
    if x.fract() == 0.0 {
        format!("{x:.1}")
    } else {
        format!("{x}")
    }
}

/// Parse and evaluate `source`.
pub fn evaluate(source: &str) -> Result<Number, EvalError> {
    if source.chars().count() > MAX_EXPRESSION_LEN {
        return Err(EvalError::TooLong);
    }
    let tokens = tokenize(source)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let value = parser.expr()?;
    match parser.peek() {
        None => Ok(value),
        Some(tok) => Err(EvalError::Unexpected(tok.describe())),
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Num(Number),
    Ident(String),
    Plus,
    Minus,
    Star,
    DoubleStar,
    Slash,
    DoubleSlash,
    Percent,
    LParen,
    RParen,
    Comma,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Num(n) => format!("number {n}"),
            Token::Ident(name) => format!("name '{name}'"),
            Token::Plus => "'+'".into(),
            Token::Minus => "'-'".into(),
            Token::Star => "'*'".into(),
            Token::DoubleStar => "'**'".into(),
            Token::Slash => "'/'".into(),
            Token::DoubleSlash => "'//'".into(),
            Token::Percent => "'%'".into(),
            Token::LParen => "'('".into(),
            Token::RParen => "')'".into(),
            Token::Comma => "','".into(),
        }
    }
}

fn tokenize(source: &str) -> Result<Vec<Token>, EvalError> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            ' ' | '\t' | '\n' | '\r' => i += 1,
            '0'..='9' | '.' => {
                let start = i;
                let mut is_float = false;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    is_float |= chars[i] == '.';
                    i += 1;
                }
                if i < chars.len() && matches!(chars[i], 'e' | 'E') {
                    let mut j = i + 1;
                    if j < chars.len() && matches!(chars[j], '+' | '-') {
                        j += 1;
                    }
                    if j < chars.len() && chars[j].is_ascii_digit() {
                        while j < chars.len() && chars[j].is_ascii_digit() {
                            j += 1;
                        }
                        is_float = true;
                        i = j;
                    }
                }
                let literal: String = chars[start..i].iter().collect();
                tokens.push(Token::Num(parse_number(&literal, is_float)?));
            }
            'a'..='z' | 'A'..='Z' | '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                tokens.push(Token::Ident(chars[start..i].iter().collect()));
            }
            '+' => {
                tokens.push(Token::Plus);
                i += 1;
            }
            '-' => {
                tokens.push(Token::Minus);
                i += 1;
            }
            '*' if chars.get(i + 1) == Some(&'*') => {
                tokens.push(Token::DoubleStar);
                i += 2;
            }
            '*' => {
                tokens.push(Token::Star);
                i += 1;
            }
            '/' if chars.get(i + 1) == Some(&'/') => {
                tokens.push(Token::DoubleSlash);
                i += 2;
            }
            '/' => {
                tokens.push(Token::Slash);
                i += 1;
            }
            '%' => {
                tokens.push(Token::Percent);
                i += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            ',' => {
                tokens.push(Token::Comma);
                i += 1;
            }
            other => return Err(EvalError::InvalidChar(other, i)),
        }
    }
    Ok(tokens)
}

fn parse_number(literal: &str, is_float: bool) -> Result<Number, EvalError> {
    if literal == "." {
        return Err(EvalError::InvalidNumber(literal.to_string()));
    }
    if is_float {
        literal
            .parse::<f64>()
            .map(Number::Float)
            .map_err(|_| EvalError::InvalidNumber(literal.to_string()))
    } else {
        literal.parse::<i64>().map(Number::Int).map_err(|_| EvalError::Overflow)
    }
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn expect(&mut self, want: Token) -> Result<(), EvalError> {
        match self.next() {
            Some(tok) if tok == want => Ok(()),
            Some(tok) => Err(EvalError::Unexpected(tok.describe())),
            None => Err(EvalError::UnexpectedEnd),
        }
    }

    fn descend(&mut self) -> Result<(), EvalError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(EvalError::TooDeep);
        }
        Ok(())
    }

    // expr := term (('+' | '-') term)*
    fn expr(&mut self) -> Result<Number, EvalError> {
        let mut acc = self.term()?;
        loop {
            match self.peek() {
                Some(Token::Plus) => {
                    self.pos += 1;
                    acc = add(acc, self.term()?)?;
                }
                Some(Token::Minus) => {
                    self.pos += 1;
                    acc = sub(acc, self.term()?)?;
                }
                _ => return Ok(acc),
            }
        }
    }

    // term := unary (('*' | '/' | '//' | '%') unary)*
    fn term(&mut self) -> Result<Number, EvalError> {
        let mut acc = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => Token::Star,
                Some(Token::Slash) => Token::Slash,
                Some(Token::DoubleSlash) => Token::DoubleSlash,
                Some(Token::Percent) => Token::Percent,
                _ => return Ok(acc),
            };
            self.pos += 1;
            let rhs = self.unary()?;
            acc = match op {
                Token::Star => mul(acc, rhs)?,
                Token::Slash => true_div(acc, rhs)?,
                Token::DoubleSlash => floor_div(acc, rhs)?,
                _ => modulo(acc, rhs)?,
            };
        }
    }

    // unary := ('+' | '-') unary | power
    fn unary(&mut self) -> Result<Number, EvalError> {
        match self.peek() {
            Some(Token::Plus) => {
                self.pos += 1;
                self.descend()?;
                let v = self.unary();
                self.depth -= 1;
                v
            }
            Some(Token::Minus) => {
                self.pos += 1;
                self.descend()?;
                let v = self.unary().and_then(neg);
                self.depth -= 1;
                v
            }
            _ => self.power(),
        }
    }

    // power := primary ('**' unary)?   (right-associative, binds tighter than a leading sign)
    fn power(&mut self) -> Result<Number, EvalError> {
        let base = self.primary()?;
        if self.peek() == Some(&Token::DoubleStar) {
            self.pos += 1;
            self.descend()?;
            let exp = self.unary();
            self.depth -= 1;
            return pow(base, exp?);
        }
        Ok(base)
    }

    // primary := NUMBER | '(' expr ')' | NAME | NAME '(' args ')'
    fn primary(&mut self) -> Result<Number, EvalError> {
        match self.next() {
            Some(Token::Num(n)) => Ok(n),
            Some(Token::LParen) => {
                self.descend()?;
                let v = self.expr()?;
                self.depth -= 1;
                self.expect(Token::RParen)?;
                Ok(v)
            }
            Some(Token::Ident(name)) => {
                if self.peek() == Some(&Token::LParen) {
                    self.pos += 1;
                    let args = self.call_args()?;
                    call_function(&name, &args)
                } else {
                    constant(&name)
                }
            }
            Some(tok) => Err(EvalError::Unexpected(tok.describe())),
            None => Err(EvalError::UnexpectedEnd),
        }
    }

    fn call_args(&mut self) -> Result<Vec<Number>, EvalError> {
        self.descend()?;
        let mut args = Vec::new();
        if self.peek() == Some(&Token::RParen) {
            self.pos += 1;
            self.depth -= 1;
            return Ok(args);
        }
        loop {
            args.push(self.expr()?);
            match self.next() {
                Some(Token::Comma) => continue,
                Some(Token::RParen) => break,
                Some(tok) => return Err(EvalError::Unexpected(tok.describe())),
                None => return Err(EvalError::UnexpectedEnd),
            }
        }
        self.depth -= 1;
        Ok(args)
    }
}

fn int_or_overflow(v: Option<i64>) -> Result<Number, EvalError> {
    v.map(Number::Int).ok_or(EvalError::Overflow)
}

fn add(a: Number, b: Number) -> Result<Number, EvalError> {
    match (a.int_like(), b.int_like()) {
        (Number::Int(x), Number::Int(y)) => int_or_overflow(x.checked_add(y)),
        _ => Ok(Number::Float(a.as_f64() + b.as_f64())),
    }
}

fn sub(a: Number, b: Number) -> Result<Number, EvalError> {
    match (a.int_like(), b.int_like()) {
        (Number::Int(x), Number::Int(y)) => int_or_overflow(x.checked_sub(y)),
        _ => Ok(Number::Float(a.as_f64() - b.as_f64())),
    }
}

fn mul(a: Number, b: Number) -> Result<Number, EvalError> {
    match (a.int_like(), b.int_like()) {
        (Number::Int(x), Number::Int(y)) => int_or_overflow(x.checked_mul(y)),
        _ => Ok(Number::Float(a.as_f64() * b.as_f64())),
    }
}

fn neg(a: Number) -> Result<Number, EvalError> {
    match a {
        Number::Int(x) => int_or_overflow(x.checked_neg()),
        Number::Float(x) => Ok(Number::Float(-x)),
        Number::Bool(b) => Ok(Number::Int(-i64::from(b))),
    }
}

fn true_div(a: Number, b: Number) -> Result<Number, EvalError> {
    if b.is_zero() {
        return Err(EvalError::DivisionByZero);
    }
    Ok(Number::Float(a.as_f64() / b.as_f64()))
}

fn floor_div(a: Number, b: Number) -> Result<Number, EvalError> {
    if b.is_zero() {
        return Err(EvalError::DivisionByZero);
    }
    match (a.int_like(), b.int_like()) {
        (Number::Int(x), Number::Int(y)) => {
            let q = x.checked_div(y).ok_or(EvalError::Overflow)?;
            if x % y != 0 && ((x < 0) != (y < 0)) {
                Ok(Number::Int(q - 1))
            } else {
                Ok(Number::Int(q))
            }
        }
        _ => Ok(Number::Float((a.as_f64() / b.as_f64()).floor())),
    }
}

fn modulo(a: Number, b: Number) -> Result<Number, EvalError> {
    if b.is_zero() {
        return Err(EvalError::DivisionByZero);
    }
    match (a.int_like(), b.int_like()) {
        (Number::Int(x), Number::Int(y)) => {
            let r = x.checked_rem(y).ok_or(EvalError::Overflow)?;
            if r != 0 && ((r < 0) != (y < 0)) {
                Ok(Number::Int(r + y))
            } else {
                Ok(Number::Int(r))
            }
        }
        _ => {
            let (x, y) = (a.as_f64(), b.as_f64());
            Ok(Number::Float(x - y * (x / y).floor()))
        }
    }
}

fn pow(base: Number, exp: Number) -> Result<Number, EvalError> {
    match (base.int_like(), exp.int_like()) {
        (Number::Int(b), Number::Int(e)) if e >= 0 => {
            let e = u32::try_from(e).map_err(|_| EvalError::Overflow)?;
            int_or_overflow(b.checked_pow(e))
        }
        _ => {
            let (b, e) = (base.as_f64(), exp.as_f64());
            if b == 0.0 && e < 0.0 {
                return Err(EvalError::DivisionByZero);
            }
            if b < 0.0 && e.fract() != 0.0 {
                return Err(EvalError::Domain);
            }
            Ok(Number::Float(b.powf(e)))
        }
    }
}

fn constant(name: &str) -> Result<Number, EvalError> {
    let value = match name {
        "pi" => std::f64::consts::PI,
        "e" => std::f64::consts::E,
        "tau" => std::f64::consts::TAU,
        "inf" => f64::INFINITY,
        "nan" => f64::NAN,
        _ if is_function(name) => return Err(EvalError::NotCallable(name.to_string())),
        _ => return Err(EvalError::UnknownName(name.to_string())),
    };
    Ok(Number::Float(value))
}

const UNARY_FLOAT_FUNCTIONS: &[&str] = &[
    "sqrt", "exp", "expm1", "log10", "log2", "log1p", "sin", "cos", "tan", "asin", "acos",
    "atan", "sinh", "cosh", "tanh", "asinh", "acosh", "atanh", "degrees", "radians", "fabs",
    "cbrt", "exp2", "gamma", "lgamma", "erf", "erfc",
];

const OTHER_FUNCTIONS: &[&str] = &[
    "log", "atan2", "hypot", "pow", "copysign", "fmod", "remainder", "ldexp", "floor", "ceil",
    "trunc", "factorial", "comb", "perm", "gcd", "lcm", "isqrt", "abs", "round", "isnan", "isinf",
    "isfinite", "isclose",
];

fn is_function(name: &str) -> bool {
    UNARY_FLOAT_FUNCTIONS.contains(&name) || OTHER_FUNCTIONS.contains(&name)
}

fn arity(name: &str, args: &[Number], expected: &'static str, ok: bool) -> Result<(), EvalError> {
    if ok {
        Ok(())
    } else {
        Err(EvalError::Arity {
            name: name.to_string(),
            expected,
            got: args.len(),
        })
    }
}

fn domain_checked(v: f64) -> Result<Number, EvalError> {
    if v.is_nan() {
        Err(EvalError::Domain)
    } else {
        Ok(Number::Float(v))
    }
}

fn require_int(name: &'static str, n: Number) -> Result<i64, EvalError> {
    match n {
        Number::Int(i) => Ok(i),
        Number::Float(f) if f.fract() == 0.0 && f.abs() < 9.0e15 => Ok(f as i64),
        Number::Float(_) => Err(EvalError::IntegerRequired(name)),
        Number::Bool(b) => Ok(i64::from(b)),
    }
}

fn float_to_int(v: f64) -> Result<Number, EvalError> {
    if !v.is_finite() || v.abs() >= 9.2e18 {
        return Err(EvalError::Overflow);
    }
    Ok(Number::Int(v as i64))
}

fn call_function(name: &str, args: &[Number]) -> Result<Number, EvalError> {
    if UNARY_FLOAT_FUNCTIONS.contains(&name) {
        arity(name, args, "exactly one", args.len() == 1)?;
        let x = args[0].as_f64();
        let out = match name {
            "sqrt" if x < 0.0 => return Err(EvalError::Domain),
            "sqrt" => x.sqrt(),
            "exp" => x.exp(),
            "expm1" => x.exp_m1(),
            "log10" | "log2" if x <= 0.0 => return Err(EvalError::Domain),
            "log10" => x.log10(),
            "log2" => x.log2(),
            "log1p" if x <= -1.0 => return Err(EvalError::Domain),
            "log1p" => x.ln_1p(),
            "sin" => x.sin(),
            "cos" => x.cos(),
            "tan" => x.tan(),
            "asin" | "acos" if !(-1.0..=1.0).contains(&x) => return Err(EvalError::Domain),
            "asin" => x.asin(),
            "acos" => x.acos(),
            "atan" => x.atan(),
            "sinh" => x.sinh(),
            "cosh" => x.cosh(),
            "tanh" => x.tanh(),
            "asinh" => x.asinh(),
            "acosh" => x.acosh(),
            "atanh" => x.atanh(),
            "degrees" => x.to_degrees(),
            "radians" => x.to_radians(),
            "cbrt" => x.cbrt(),
            "exp2" => x.exp2(),
            "gamma" => gamma(x)?,
            "lgamma" => lgamma(x)?,
            "erf" => erf(x),
            "erfc" => erfc(x),
            _ => x.abs(),
        };
        return domain_checked(out);
    }

    match name {
        "log" => {
            arity(name, args, "one or two", matches!(args.len(), 1 | 2))?;
            let x = args[0].as_f64();
            if x <= 0.0 {
                return Err(EvalError::Domain);
            }
            match args.get(1) {
                None => domain_checked(x.ln()),
                Some(base) => {
                    let b = base.as_f64();
                    if b <= 0.0 || b == 1.0 {
                        return Err(EvalError::Domain);
                    }
                    domain_checked(x.ln() / b.ln())
                }
            }
        }
        "atan2" | "hypot" | "pow" | "copysign" | "fmod" => {
            arity(name, args, "exactly two", args.len() == 2)?;
            let (x, y) = (args[0].as_f64(), args[1].as_f64());
            let out = match name {
                "atan2" => x.atan2(y),
                "hypot" => x.hypot(y),
                "pow" => {
                    if x == 0.0 && y < 0.0 {
                        return Err(EvalError::Domain);
                    }
                    x.powf(y)
                }
                "copysign" => x.copysign(y),
                _ => {
                    if y == 0.0 {
                        return Err(EvalError::Domain);
                    }
                    x % y
                }
            };
            domain_checked(out)
        }
        "remainder" => {
            arity(name, args, "exactly two", args.len() == 2)?;
            domain_checked(ieee_remainder(args[0].as_f64(), args[1].as_f64())?)
        }
        "ldexp" => {
            arity(name, args, "exactly two", args.len() == 2)?;
            let x = args[0].as_f64();
            let exp = require_int("ldexp", args[1])?;
            let out = ldexp(x, exp);
            if x.is_finite() && out.is_infinite() {
                return Err(EvalError::Overflow);
            }
            domain_checked(out)
        }
        "floor" | "ceil" | "trunc" => {
            arity(name, args, "exactly one", args.len() == 1)?;
            match args[0] {
                Number::Float(x) => float_to_int(match name {
                    "floor" => x.floor(),
                    "ceil" => x.ceil(),
                    _ => x.trunc(),
                }),
                other => Ok(other.int_like()),
            }
        }
        "factorial" => {
            arity(name, args, "exactly one", args.len() == 1)?;
            let n = require_int("factorial", args[0])?;
            if n < 0 {
                return Err(EvalError::Domain);
            }
            (1..=n).try_fold(1i64, |acc, k| acc.checked_mul(k))
                .map(Number::Int)
                .ok_or(EvalError::Overflow)
        }
        "comb" => {
            arity(name, args, "exactly two", args.len() == 2)?;
            let n = require_int("comb", args[0])?;
            let k = require_int("comb", args[1])?;
            comb(n, k).map(Number::Int)
        }
        "perm" => {
            arity(name, args, "one or two", matches!(args.len(), 1 | 2))?;
            let n = require_int("perm", args[0])?;
            let k = match args.get(1) {
                Some(k) => require_int("perm", *k)?,
                None => n,
            };
            if n < 0 || k < 0 {
                return Err(EvalError::Domain);
            }
            if k > n {
                return Ok(Number::Int(0));
            }
            (0..k)
                .try_fold(1i64, |acc, i| acc.checked_mul(n - i))
                .map(Number::Int)
                .ok_or(EvalError::Overflow)
        }
        "gcd" => {
            let mut acc: i64 = 0;
            for arg in args {
                let b = require_int("gcd", *arg)?.checked_abs().ok_or(EvalError::Overflow)?;
                acc = gcd(acc, b);
            }
            Ok(Number::Int(acc))
        }
        "lcm" => {
            let mut acc: i64 = 1;
            for arg in args {
                let b = require_int("lcm", *arg)?.checked_abs().ok_or(EvalError::Overflow)?;
                if acc == 0 || b == 0 {
                    acc = 0;
                    continue;
                }
                acc = (acc / gcd(acc, b)).checked_mul(b).ok_or(EvalError::Overflow)?;
            }
            Ok(Number::Int(acc))
        }
        "isqrt" => {
            arity(name, args, "exactly one", args.len() == 1)?;
            let n = require_int("isqrt", args[0])?;
            if n < 0 {
                return Err(EvalError::Domain);
            }
            let mut r = (n as f64).sqrt() as i64;
            while r.checked_mul(r).map_or(true, |sq| sq > n) {
                r -= 1;
            }
            while (r + 1).checked_mul(r + 1).is_some_and(|sq| sq <= n) {
                r += 1;
            }
            Ok(Number::Int(r))
        }
        "abs" => {
            arity(name, args, "exactly one", args.len() == 1)?;
            match args[0] {
                Number::Float(x) => Ok(Number::Float(x.abs())),
                other => int_or_overflow(require_int("abs", other)?.checked_abs()),
            }
        }
        "round" => {
            arity(name, args, "one or two", matches!(args.len(), 1 | 2))?;
            round(args[0], args.get(1).copied())
        }
        "isnan" | "isinf" | "isfinite" => {
            arity(name, args, "exactly one", args.len() == 1)?;
            let x = args[0].as_f64();
            Ok(Number::Bool(match name {
                "isnan" => x.is_nan(),
                "isinf" => x.is_infinite(),
                _ => x.is_finite(),
            }))
        }
        "isclose" => {
            arity(name, args, "exactly two", args.len() == 2)?;
            Ok(Number::Bool(is_close(args[0].as_f64(), args[1].as_f64())))
        }
        _ => Err(EvalError::UnknownName(name.to_string())),
    }
}

// Ties go to the even neighbour.
fn round(x: Number, ndigits: Option<Number>) -> Result<Number, EvalError> {
    let Some(nd) = ndigits else {
        return match x {
            Number::Float(f) => float_to_int(f.round_ties_even()),
            other => Ok(other.int_like()),
        };
    };
    let nd = require_int("round", nd)?;
    let scale = 10f64.powi(nd.clamp(-308, 308) as i32);
    match x {
        Number::Float(f) => {
            let scaled = f * scale;
            // already finer than the requested precision
            if !scaled.is_finite() {
                return Ok(Number::Float(f));
            }
            let out = scaled.round_ties_even() / scale;
            if f.is_finite() && !out.is_finite() {
                return Err(EvalError::Overflow);
            }
            Ok(Number::Float(out))
        }
        other => {
            let i = require_int("round", other)?;
            if nd >= 0 {
                Ok(Number::Int(i))
            } else {
                float_to_int((i as f64 * scale).round_ties_even() / scale)
            }
        }
    }
}

fn gcd(mut a: i64, mut b: i64) -> i64 {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a
}

fn comb(n: i64, k: i64) -> Result<i64, EvalError> {
    if n < 0 || k < 0 {
        return Err(EvalError::Domain);
    }
    if k > n {
        return Ok(0);
    }
    let k = k.min(n - k);
    // C(n, i) grows with i up to n/2, so every partial result must fit too
    let mut acc: i128 = 1;
    for i in 0..k {
        acc = acc * i128::from(n - i) / i128::from(i + 1);
        if acc > i128::from(i64::MAX) {
            return Err(EvalError::Overflow);
        }
    }
    i64::try_from(acc).map_err(|_| EvalError::Overflow)
}

fn is_close(a: f64, b: f64) -> bool {
    const REL_TOL: f64 = 1e-9;
    if a == b {
        return true;
    }
    if a.is_infinite() || b.is_infinite() {
        return false;
    }
    let diff = (b - a).abs();
    diff <= (REL_TOL * b).abs() || diff <= (REL_TOL * a).abs()
}

fn ldexp(x: f64, exp: i64) -> f64 {
    // past this range any finite non-zero x has already hit 0 or inf
    let mut exp = exp.clamp(-2200, 2200) as i32;
    let mut out = x;
    while exp > 1000 {
        out *= 2f64.powi(1000);
        exp -= 1000;
    }
    while exp < -1000 {
        out *= 2f64.powi(-1000);
        exp += 1000;
    }
    out * 2f64.powi(exp)
}

// IEEE 754 remainder: the quotient is rounded to the nearest integer, ties to even.
fn ieee_remainder(x: f64, y: f64) -> Result<f64, EvalError> {
    if x.is_nan() || y.is_nan() {
        return Ok(f64::NAN);
    }
    if x.is_infinite() || y == 0.0 {
        return Err(EvalError::Domain);
    }
    if y.is_infinite() {
        return Ok(x);
    }
    let (ax, ay) = (x.abs(), y.abs());
    let m = ax % ay;
    let c = ay - m;
    let r = if m < c {
        m
    } else if m > c {
        -c
    } else {
        m - 2.0 * ((0.5 * (ax - m)) % ay)
    };
    Ok(1f64.copysign(x) * r)
}

const LANCZOS_G: f64 = 7.0;
const LANCZOS_COEFFS: [f64; 9] = [
    0.999_999_999_999_809_9,
    676.520_368_121_885_1,
    -1_259.139_216_722_402_8,
    771.323_428_777_653_1,
    -176.615_029_162_140_6,
    12.507_343_278_686_905,
    -0.138_571_095_265_720_12,
    9.984_369_578_019_572e-6,
    1.505_632_735_149_311_6e-7,
];

// Lanczos sum and the shifted base `t` for x >= 0.5.
fn lanczos(x: f64) -> (f64, f64) {
    let x = x - 1.0;
    let mut sum = LANCZOS_COEFFS[0];
    for (i, c) in LANCZOS_COEFFS.iter().enumerate().skip(1) {
        sum += c / (x + i as f64);
    }
    (sum, x + LANCZOS_G + 0.5)
}

fn is_pole(x: f64) -> bool {
    x == f64::NEG_INFINITY || (x <= 0.0 && x.fract() == 0.0)
}

fn gamma(x: f64) -> Result<f64, EvalError> {
    if x.is_nan() || x == f64::INFINITY {
        return Ok(x);
    }
    if is_pole(x) {
        return Err(EvalError::Domain);
    }
    if x > 171.624_376_956_302_7 {
        return Err(EvalError::Overflow);
    }
    // exact for small integers, as (x-1)! is representable up to 22!
    if x.fract() == 0.0 && x <= 23.0 {
        return Ok((2..x as u32).fold(1.0, |acc, k| acc * f64::from(k)));
    }
    Ok(gamma_unchecked(x))
}

fn gamma_unchecked(x: f64) -> f64 {
    use std::f64::consts::PI;
    if x < 0.5 {
        return PI / ((PI * x).sin() * gamma_unchecked(1.0 - x));
    }
    let (sum, t) = lanczos(x);
    // split the power so t^(x-0.5) does not overflow before exp(-t) pulls it back
    let half = t.powf((x - 0.5) / 2.0);
    (2.0 * PI).sqrt() * half * (half * (-t).exp()) * sum
}

fn lgamma(x: f64) -> Result<f64, EvalError> {
    if x.is_nan() {
        return Ok(x);
    }
    if x.is_infinite() {
        return Ok(f64::INFINITY);
    }
    if is_pole(x) {
        return Err(EvalError::Domain);
    }
    Ok(lgamma_unchecked(x))
}

fn lgamma_unchecked(x: f64) -> f64 {
    use std::f64::consts::PI;
    if x == 1.0 || x == 2.0 {
        return 0.0;
    }
    if x < 0.5 {
        return (PI / (PI * x).sin().abs()).ln() - lgamma_unchecked(1.0 - x);
    }
    let (sum, t) = lanczos(x);
    0.5 * (2.0 * PI).ln() + (x - 0.5) * t.ln() - t + sum.ln()
}

// Below this the power series is used, above it the continued fraction for erfc.
const ERF_SERIES_CUTOFF: f64 = 3.0;

fn erf(x: f64) -> f64 {
    if x.is_nan() {
        return x;
    }
    if x.abs() < ERF_SERIES_CUTOFF {
        erf_series(x)
    } else {
        (1.0 - erfc_fraction(x.abs())).copysign(x)
    }
}

fn erfc(x: f64) -> f64 {
    if x.is_nan() {
        x
    } else if x >= ERF_SERIES_CUTOFF {
        erfc_fraction(x)
    } else if x <= -ERF_SERIES_CUTOFF {
        2.0 - erfc_fraction(-x)
    } else {
        1.0 - erf_series(x)
    }
}

// erf(x) = 2/sqrt(pi) * exp(-x^2) * sum 2^n x^(2n+1) / (2n+1)!!, all terms positive.
fn erf_series(x: f64) -> f64 {
    let x2 = x * x;
    let mut term = x;
    let mut sum = x;
    for n in 1..200 {
        term *= 2.0 * x2 / f64::from(2 * n + 1);
        sum += term;
        if term.abs() <= sum.abs() * 1e-17 {
            break;
        }
    }
    std::f64::consts::FRAC_2_SQRT_PI * (-x2).exp() * sum
}

// erfc(x) = exp(-x^2)/sqrt(pi) / (x + (1/2)/(x + 1/(x + (3/2)/(x + ...)))), evaluated bottom up.
fn erfc_fraction(x: f64) -> f64 {
    let mut t = x;
    for k in (1..=80).rev() {
        t = x + f64::from(k) * 0.5 / t;
    }
    (-x * x).exp() / (t * std::f64::consts::PI.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn show(src: &str) -> String {
        evaluate(src).unwrap().to_string()
    }

    #[test]
    fn integer_arithmetic_stays_integral() {
        assert_eq!(show("2+2"), "4");
        assert_eq!(show("10*5"), "50");
        assert_eq!(show("2 + 3 * 4"), "14");
        assert_eq!(show("(2 + 3) * 4"), "20");
        assert_eq!(show("2**10"), "1024");
        assert_eq!(show("2**3**2"), "512");
        assert_eq!(show("-2**2"), "-4");
    }

    #[test]
    fn division_and_modulo_follow_floor_semantics() {
        assert_eq!(show("10/4"), "2.5");
        assert_eq!(show("10/2"), "5.0");
        assert_eq!(show("7//2"), "3");
        assert_eq!(show("-7//2"), "-4");
        assert_eq!(show("-7%3"), "2");
        assert_eq!(show("7%-3"), "-2");
        assert_eq!(show("7.5//2"), "3.0");
    }

    #[test]
    fn functions_and_constants() {
        assert_eq!(show("sqrt(16)"), "4.0");
        assert_eq!(show("abs(-3)"), "3");
        assert_eq!(show("round(2.5)"), "2");
        assert_eq!(show("round(3.14159, 2)"), "3.14");
        assert_eq!(show("floor(2.7)"), "2");
        assert_eq!(show("factorial(5)"), "120");
        assert_eq!(show("gcd(12, 18)"), "6");
        assert_eq!(show("log(8, 2)"), "3.0");
        assert_eq!(show("pi"), "3.141592653589793");
        assert_eq!(show("24 * 7"), "168");
        assert_eq!(show("1e20"), "1e+20");
        assert_eq!(show("0.1 + 0.2"), "0.30000000000000004");
    }

    #[test]
    fn rejects_names_outside_the_allow_list() {
        assert_eq!(
            evaluate("__import__").unwrap_err(),
            EvalError::UnknownName("__import__".into())
        );
        assert!(matches!(
            evaluate("__import__('os')").unwrap_err(),
            EvalError::InvalidChar('\'', _)
        ));
        assert!(matches!(
            evaluate("open(1)").unwrap_err(),
            EvalError::UnknownName(name) if name == "open"
        ));
        assert!(evaluate("(1).real").is_err());
        assert!(evaluate("[1,2]").is_err());
        assert_eq!(evaluate("sqrt").unwrap_err(), EvalError::NotCallable("sqrt".into()));
    }

    #[test]
    fn reports_math_errors() {
        assert_eq!(evaluate("1/0").unwrap_err(), EvalError::DivisionByZero);
        assert_eq!(evaluate("5 % 0").unwrap_err(), EvalError::DivisionByZero);
        assert_eq!(evaluate("sqrt(-1)").unwrap_err(), EvalError::Domain);
        assert_eq!(evaluate("2**64").unwrap_err(), EvalError::Overflow);
        assert!(matches!(
            evaluate("sqrt(1, 2)").unwrap_err(),
            EvalError::Arity { .. }
        ));
    }

    fn approx(src: &str, want: f64) {
        let got = evaluate(src).unwrap().as_f64();
        assert!((got - want).abs() <= 1e-12 * want.abs(), "{src} = {got}, want {want}");
    }

    #[test]
    fn integer_combinatorics() {
        assert_eq!(show("comb(5, 2)"), "10");
        assert_eq!(show("comb(5, 7)"), "0");
        assert_eq!(show("comb(60, 30)"), "118264581564861424");
        assert_eq!(evaluate("comb(100, 50)").unwrap_err(), EvalError::Overflow);
        assert_eq!(evaluate("comb(-1, 2)").unwrap_err(), EvalError::Domain);
        assert_eq!(show("perm(5, 2)"), "20");
        assert_eq!(show("perm(4)"), "24");
        assert_eq!(show("perm(3, 5)"), "0");
        assert_eq!(show("perm(9223372036854775807, 0)"), "1");
        assert_eq!(show("lcm(4, 6)"), "12");
        assert_eq!(show("lcm(4, 6, 10)"), "60");
        assert_eq!(show("lcm(0, 5)"), "0");
        assert_eq!(show("lcm()"), "1");
        assert_eq!(
            evaluate("lcm(2.5, 3)").unwrap_err(),
            EvalError::IntegerRequired("lcm")
        );
    }

    #[test]
    fn gamma_and_error_functions() {
        assert_eq!(show("gamma(5)"), "24.0");
        assert_eq!(show("gamma(1)"), "1.0");
        approx("gamma(0.5)", std::f64::consts::PI.sqrt());
        approx("gamma(-0.5)", -2.0 * std::f64::consts::PI.sqrt());
        approx("gamma(30.5)", 4.8226969334909095e31);
        assert_eq!(evaluate("gamma(0)").unwrap_err(), EvalError::Domain);
        assert_eq!(evaluate("gamma(-3)").unwrap_err(), EvalError::Domain);
        assert_eq!(evaluate("gamma(200)").unwrap_err(), EvalError::Overflow);

        assert_eq!(show("lgamma(1)"), "0.0");
        approx("lgamma(10)", 12.801827480081469);
        approx("lgamma(0.5)", 0.5723649429247001);
        approx("lgamma(1000)", 5905.220423209181);

        assert_eq!(show("erf(0)"), "0.0");
        approx("erf(1)", 0.8427007929497149);
        approx("erf(-0.5)", -0.5204998778130465);
        approx("erf(4)", 0.9999999845827421);
        assert_eq!(show("erfc(0)"), "1.0");
        approx("erfc(1)", 0.15729920705028513);
        approx("erfc(5)", 1.5374597944280349e-12);
        approx("erfc(-4)", 1.9999999845827421);
    }

    #[test]
    fn float_helpers() {
        assert_eq!(show("cbrt(27)"), "3.0");
        approx("cbrt(-8)", -2.0);
        assert_eq!(show("exp2(3)"), "8.0");
        assert_eq!(show("ldexp(1, 3)"), "8.0");
        assert_eq!(show("ldexp(0.75, -2)"), "0.1875");
        approx("ldexp(1e-300, 1100)", 1.3582985290493859e31);
        assert_eq!(evaluate("ldexp(1, 2000)").unwrap_err(), EvalError::Overflow);
        assert_eq!(
            evaluate("ldexp(1, 0.5)").unwrap_err(),
            EvalError::IntegerRequired("ldexp")
        );
        assert_eq!(show("remainder(7, 3)"), "1.0");
        assert_eq!(show("remainder(8, 3)"), "-1.0");
        assert_eq!(show("remainder(5, 2)"), "1.0");
        assert_eq!(show("remainder(7, 2)"), "-1.0");
        assert_eq!(show("remainder(-7, 3)"), "-1.0");
        assert_eq!(evaluate("remainder(1, 0)").unwrap_err(), EvalError::Domain);
    }

    #[test]
    fn predicates_render_as_booleans() {
        assert_eq!(show("isnan(nan)"), "True");
        assert_eq!(show("isnan(1)"), "False");
        assert_eq!(show("isinf(-inf)"), "True");
        assert_eq!(show("isfinite(1e308)"), "True");
        assert_eq!(show("isfinite(inf)"), "False");
        assert_eq!(show("isclose(0.1 + 0.2, 0.3)"), "True");
        assert_eq!(show("isclose(1, 1.001)"), "False");
        assert_eq!(show("isclose(inf, inf)"), "True");
        assert_eq!(show("isnan(nan) + 1"), "2");
        assert_eq!(show("-isinf(inf)"), "-1");
        assert_eq!(show("isnan(nan) * 2.5"), "2.5");
        assert_eq!(show("abs(isnan(nan))"), "1");
    }

    #[test]
    fn round_leaves_values_finer_than_the_precision() {
        assert_eq!(show("round(1e10, 308)"), "10000000000.0");
        assert_eq!(show("round(0.5, 400)"), "0.5");
        assert_eq!(show("round(1234.5678, -2)"), "1200.0");
        assert_eq!(show("round(1e10, -400)"), "0.0");
        assert_eq!(show("round(1234, -2)"), "1200");
    }

    #[test]
    fn rejects_malformed_input() {
        assert_eq!(evaluate("").unwrap_err(), EvalError::UnexpectedEnd);
        assert_eq!(evaluate("2 +").unwrap_err(), EvalError::UnexpectedEnd);
        assert!(matches!(evaluate("(2").unwrap_err(), EvalError::UnexpectedEnd));
        assert!(matches!(evaluate("2 3").unwrap_err(), EvalError::Unexpected(_)));
        assert!(matches!(evaluate("1..2").unwrap_err(), EvalError::InvalidNumber(_)));
    }

    #[test]
    fn bounds_length_and_depth() {
        let long = "1+".repeat(MAX_EXPRESSION_LEN) + "1";
        assert_eq!(evaluate(&long).unwrap_err(), EvalError::TooLong);
        let deep = format!("{}1{}", "(".repeat(100), ")".repeat(100));
        assert_eq!(evaluate(&deep).unwrap_err(), EvalError::TooDeep);
        let signs = "-".repeat(200) + "1";
        assert_eq!(evaluate(&signs).unwrap_err(), EvalError::TooDeep);
    }
}
