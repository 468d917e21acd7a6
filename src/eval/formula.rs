//! # Formula Evaluator
//!
//! Small expression language used by conditional components:
//!
//! ```text
//! =count > 5
//! inputs.language = "rust" && !inputs.verbose
//! AND(score >= 3, LEN(inputs.tags) > 0)
//! ```
//!
//! Identifiers resolve through a [`FieldLookup`]. An identifier that resolves
//! to nothing yields an unset sentinel; every comparison involving an unset
//! operand is `false`, so a formula over missing inputs never throws. Only
//! malformed syntax and arithmetic failures produce an [`EvaluationError`].

use core::fmt;
use std::str::FromStr;

use nom::{
    branch::alt,
    bytes::complete::{tag, take_while, take_while1},
    character::complete::{char, digit1, multispace0},
    combinator::{all_consuming, map, map_res, opt, recognize, value},
    error::{context, convert_error, VerboseError},
    multi::{many0, separated_list0, separated_list1},
    sequence::{delimited, pair, preceded},
    IResult,
};
use thiserror::Error;

use crate::ast::{FieldPath, INPUTS_ROOT};
use crate::value::{InputValues, Value};

type FormulaParseResult<'a, T> = IResult<&'a str, T, VerboseError<&'a str>>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvaluationError {
    #[error("Syntax error in formula `{formula}`: {message}")]
    Syntax { formula: String, message: String },
    #[error("Division by zero in formula `{formula}`")]
    DivisionByZero { formula: String },
    #[error("Invalid operands for `{operator}` in formula `{formula}`: {left} and {right}")]
    InvalidOperand {
        formula: String,
        operator: String,
        left: String,
        right: String,
    },
    #[error("{function} expects {expected} argument(s) but got {found} in formula `{formula}`")]
    Arity {
        formula: String,
        function: String,
        expected: String,
        found: usize,
    },
}

pub type EvaluationResult<T> = Result<T, EvaluationError>;

/// Resolves identifiers referenced by a formula.
pub trait FieldLookup {
    fn lookup(&self, path: &FieldPath) -> Value;
}

impl FieldLookup for InputValues {
    fn lookup(&self, path: &FieldPath) -> Value {
        let segments = path.segments();
        let segments = match segments.first() {
            Some(root) if root == INPUTS_ROOT && segments.len() > 1 => &segments[1..],
            _ => segments,
        };
        let Some((name, properties)) = segments.split_first() else {
            return Value::Unset;
        };
        let value = self.get(name).cloned().unwrap_or_default();
        properties
            .iter()
            .fold(value, |value, property| value.property(property))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum FormulaOperator {
    #[strum(serialize = "=")]
    Equal,
    #[strum(serialize = "!=")]
    NotEqual,
    #[strum(serialize = ">")]
    Greater,
    #[strum(serialize = "<")]
    Less,
    #[strum(serialize = ">=")]
    GreaterEqual,
    #[strum(serialize = "<=")]
    LessEqual,
    #[strum(serialize = "+")]
    Add,
    #[strum(serialize = "-")]
    Subtract,
    #[strum(serialize = "*")]
    Multiply,
    #[strum(serialize = "/")]
    Divide,
    #[strum(serialize = "&&")]
    And,
    #[strum(serialize = "||")]
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::EnumString, strum::Display)]
#[strum(ascii_case_insensitive, serialize_all = "UPPERCASE")]
pub enum FormulaFunction {
    And,
    Or,
    Not,
    Len,
    IsBlank,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FormulaExpr {
    Literal(Value),
    Field(FieldPath),
    Not(Box<FormulaExpr>),
    Negate(Box<FormulaExpr>),
    Binary {
        op: FormulaOperator,
        left: Box<FormulaExpr>,
        right: Box<FormulaExpr>,
    },
    Call {
        function: FormulaFunction,
        args: Vec<FormulaExpr>,
    },
}

/// A parsed formula together with its source text.
#[derive(Debug, Clone, PartialEq)]
pub struct Formula {
    source: String,
    expr: FormulaExpr,
}

impl Formula {
    /// Parses a formula. A single leading `=` is accepted and ignored.
    #[tracing::instrument(level = "debug")]
    pub fn parse(source: &str) -> EvaluationResult<Self> {
        let trimmed = source.trim();
        let body = trimmed.strip_prefix('=').unwrap_or(trimmed);
        if body.trim().is_empty() {
            return Err(EvaluationError::Syntax {
                formula: source.to_string(),
                message: "empty formula".to_string(),
            });
        }
        match all_consuming(delimited(multispace0, parse_or, multispace0))(body) {
            Ok((_, expr)) => Ok(Self {
                source: source.to_string(),
                expr,
            }),
            Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => Err(EvaluationError::Syntax {
                formula: source.to_string(),
                message: convert_error(body, e),
            }),
            Err(nom::Err::Incomplete(needed)) => Err(EvaluationError::Syntax {
                formula: source.to_string(),
                message: format!("incomplete input: {:?}", needed),
            }),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn expr(&self) -> &FormulaExpr {
        &self.expr
    }

    /// Every field path the formula reads, in source order.
    pub fn fields(&self) -> Vec<&FieldPath> {
        fn collect<'a>(expr: &'a FormulaExpr, out: &mut Vec<&'a FieldPath>) {
            match expr {
                FormulaExpr::Field(path) => out.push(path),
                FormulaExpr::Not(inner) | FormulaExpr::Negate(inner) => collect(inner, out),
                FormulaExpr::Binary { left, right, .. } => {
                    collect(left, out);
                    collect(right, out);
                }
                FormulaExpr::Call { args, .. } => args.iter().for_each(|arg| collect(arg, out)),
                FormulaExpr::Literal(_) => {}
            }
        }
        let mut out = Vec::new();
        collect(&self.expr, &mut out);
        out
    }

    pub fn evaluate(&self, lookup: &dyn FieldLookup) -> EvaluationResult<Value> {
        Evaluator {
            formula: &self.source,
            lookup,
        }
        .eval(&self.expr)
    }

    pub fn evaluate_bool(&self, lookup: &dyn FieldLookup) -> EvaluationResult<bool> {
        Ok(self.evaluate(lookup)?.is_truthy())
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source)
    }
}

/// Parses `expression` and evaluates it to a boolean against `inputs`.
pub fn evaluate(expression: &str, inputs: &InputValues) -> EvaluationResult<bool> {
    Formula::parse(expression)?.evaluate_bool(inputs)
}

fn ws<'a, O, F>(inner: F) -> impl FnMut(&'a str) -> FormulaParseResult<'a, O>
where
    F: FnMut(&'a str) -> FormulaParseResult<'a, O>,
{
    delimited(multispace0, inner, multispace0)
}

fn fold_binary(first: FormulaExpr, rest: Vec<(FormulaOperator, FormulaExpr)>) -> FormulaExpr {
    rest.into_iter()
        .fold(first, |left, (op, right)| FormulaExpr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        })
}

fn parse_or(input: &str) -> FormulaParseResult<FormulaExpr> {
    let (input, first) = parse_and(input)?;
    let (input, rest) = many0(pair(
        value(FormulaOperator::Or, ws(tag("||"))),
        parse_and,
    ))(input)?;
    Ok((input, fold_binary(first, rest)))
}

fn parse_and(input: &str) -> FormulaParseResult<FormulaExpr> {
    let (input, first) = parse_comparison(input)?;
    let (input, rest) = many0(pair(
        value(FormulaOperator::And, ws(tag("&&"))),
        parse_comparison,
    ))(input)?;
    Ok((input, fold_binary(first, rest)))
}

fn comparison_operator(input: &str) -> FormulaParseResult<FormulaOperator> {
    context(
        "comparison operator",
        alt((
            value(FormulaOperator::NotEqual, tag("!=")),
            value(FormulaOperator::NotEqual, tag("<>")),
            value(FormulaOperator::GreaterEqual, tag(">=")),
            value(FormulaOperator::LessEqual, tag("<=")),
            value(FormulaOperator::Equal, tag("==")),
            value(FormulaOperator::Equal, tag("=")),
            value(FormulaOperator::Greater, tag(">")),
            value(FormulaOperator::Less, tag("<")),
        )),
    )(input)
}

fn parse_comparison(input: &str) -> FormulaParseResult<FormulaExpr> {
    let (input, left) = parse_additive(input)?;
    let (input, right) = opt(pair(ws(comparison_operator), parse_additive))(input)?;
    Ok((
        input,
        match right {
            Some((op, right)) => FormulaExpr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
            None => left,
        },
    ))
}

fn parse_additive(input: &str) -> FormulaParseResult<FormulaExpr> {
    let (input, first) = parse_multiplicative(input)?;
    let (input, rest) = many0(pair(
        ws(alt((
            value(FormulaOperator::Add, char('+')),
            value(FormulaOperator::Subtract, char('-')),
        ))),
        parse_multiplicative,
    ))(input)?;
    Ok((input, fold_binary(first, rest)))
}

fn parse_multiplicative(input: &str) -> FormulaParseResult<FormulaExpr> {
    let (input, first) = parse_unary(input)?;
    let (input, rest) = many0(pair(
        ws(alt((
            value(FormulaOperator::Multiply, char('*')),
            value(FormulaOperator::Divide, char('/')),
        ))),
        parse_unary,
    ))(input)?;
    Ok((input, fold_binary(first, rest)))
}

fn parse_unary(input: &str) -> FormulaParseResult<FormulaExpr> {
    alt((
        map(preceded(ws(char('!')), parse_unary), |expr| {
            FormulaExpr::Not(Box::new(expr))
        }),
        map(preceded(ws(char('-')), parse_unary), |expr| {
            FormulaExpr::Negate(Box::new(expr))
        }),
        parse_primary,
    ))(input)
}

fn parse_primary(input: &str) -> FormulaParseResult<FormulaExpr> {
    ws(alt((
        parse_number,
        parse_string,
        parse_parenthesized,
        parse_call,
        parse_field_or_bool,
    )))(input)
}

fn parse_number(input: &str) -> FormulaParseResult<FormulaExpr> {
    context(
        "number",
        map_res(
            recognize(pair(digit1, opt(pair(char('.'), digit1)))),
            |digits: &str| digits.parse::<f64>().map(|n| FormulaExpr::Literal(Value::Number(n))),
        ),
    )(input)
}

fn parse_string(input: &str) -> FormulaParseResult<FormulaExpr> {
    context(
        "string",
        map(
            alt((
                delimited(char('"'), take_while(|c| c != '"'), char('"')),
                delimited(char('\''), take_while(|c| c != '\''), char('\'')),
            )),
            |s: &str| FormulaExpr::Literal(Value::String(s.to_string())),
        ),
    )(input)
}

fn parse_parenthesized(input: &str) -> FormulaParseResult<FormulaExpr> {
    delimited(char('('), ws(parse_or), char(')'))(input)
}

fn parse_identifier(input: &str) -> FormulaParseResult<&str> {
    context(
        "identifier",
        recognize(pair(
            take_while1(|c: char| c.is_alphabetic() || c == '_'),
            take_while(|c: char| c.is_alphanumeric() || c == '_'),
        )),
    )(input)
}

fn parse_call(input: &str) -> FormulaParseResult<FormulaExpr> {
    context(
        "function call",
        map(
            pair(
                map_res(parse_identifier, FormulaFunction::from_str),
                preceded(
                    multispace0,
                    delimited(
                        char('('),
                        separated_list0(ws(char(',')), ws(parse_or)),
                        ws(char(')')),
                    ),
                ),
            ),
            |(function, args)| FormulaExpr::Call { function, args },
        ),
    )(input)
}

fn parse_field_or_bool(input: &str) -> FormulaParseResult<FormulaExpr> {
    map(separated_list1(char('.'), parse_identifier), |segments| {
        match segments.as_slice() {
            [single] if single.eq_ignore_ascii_case("true") => FormulaExpr::Literal(Value::Bool(true)),
            [single] if single.eq_ignore_ascii_case("false") => {
                FormulaExpr::Literal(Value::Bool(false))
            }
            _ => FormulaExpr::Field(FieldPath::new(segments)),
        }
    })(input)
}

struct Evaluator<'a> {
    formula: &'a str,
    lookup: &'a dyn FieldLookup,
}

impl Evaluator<'_> {
    fn eval(&self, expr: &FormulaExpr) -> EvaluationResult<Value> {
        match expr {
            FormulaExpr::Literal(value) => Ok(value.clone()),
            FormulaExpr::Field(path) => Ok(self.lookup.lookup(path)),
            FormulaExpr::Not(inner) => Ok(Value::Bool(!self.eval(inner)?.is_truthy())),
            FormulaExpr::Negate(inner) => match self.eval(inner)? {
                value if value.is_unset() => Ok(Value::Unset),
                value => match value.as_number() {
                    Some(n) => Ok(Value::Number(-n)),
                    None => Err(self.invalid_operand("-", &Value::Unset, &value)),
                },
            },
            FormulaExpr::Binary { op, left, right } => self.eval_binary(*op, left, right),
            FormulaExpr::Call { function, args } => self.eval_call(*function, args),
        }
    }

    fn eval_binary(
        &self,
        op: FormulaOperator,
        left: &FormulaExpr,
        right: &FormulaExpr,
    ) -> EvaluationResult<Value> {
        // short-circuit logic first
        match op {
            FormulaOperator::And => {
                let result = self.eval(left)?.is_truthy() && self.eval(right)?.is_truthy();
                return Ok(Value::Bool(result));
            }
            FormulaOperator::Or => {
                let result = self.eval(left)?.is_truthy() || self.eval(right)?.is_truthy();
                return Ok(Value::Bool(result));
            }
            _ => {}
        }

        let left = self.eval(left)?;
        let right = self.eval(right)?;
        match op {
            FormulaOperator::Equal
            | FormulaOperator::NotEqual
            | FormulaOperator::Greater
            | FormulaOperator::Less
            | FormulaOperator::GreaterEqual
            | FormulaOperator::LessEqual => Ok(Value::Bool(compare(op, &left, &right))),
            _ => self.arithmetic(op, &left, &right),
        }
    }

    fn arithmetic(
        &self,
        op: FormulaOperator,
        left: &Value,
        right: &Value,
    ) -> EvaluationResult<Value> {
        if left.is_unset() || right.is_unset() {
            return Ok(Value::Unset);
        }
        let numbers = left.as_number().zip(right.as_number());
        match (op, numbers) {
            (FormulaOperator::Add, Some((l, r))) => Ok(Value::Number(l + r)),
            (FormulaOperator::Add, None)
                if matches!(left, Value::String(_)) || matches!(right, Value::String(_)) =>
            {
                Ok(Value::String(format!("{}{}", left, right)))
            }
            (FormulaOperator::Subtract, Some((l, r))) => Ok(Value::Number(l - r)),
            (FormulaOperator::Multiply, Some((l, r))) => Ok(Value::Number(l * r)),
            (FormulaOperator::Divide, Some((_, r))) if r == 0.0 => {
                Err(EvaluationError::DivisionByZero {
                    formula: self.formula.to_string(),
                })
            }
            (FormulaOperator::Divide, Some((l, r))) => Ok(Value::Number(l / r)),
            _ => Err(self.invalid_operand(&op.to_string(), left, right)),
        }
    }

    fn eval_call(&self, function: FormulaFunction, args: &[FormulaExpr]) -> EvaluationResult<Value> {
        match function {
            FormulaFunction::And | FormulaFunction::Or => {
                if args.is_empty() {
                    return Err(self.arity(function, "at least 1", 0));
                }
                for arg in args {
                    let truthy = self.eval(arg)?.is_truthy();
                    if function == FormulaFunction::And && !truthy {
                        return Ok(Value::Bool(false));
                    }
                    if function == FormulaFunction::Or && truthy {
                        return Ok(Value::Bool(true));
                    }
                }
                Ok(Value::Bool(function == FormulaFunction::And))
            }
            FormulaFunction::Not | FormulaFunction::Len | FormulaFunction::IsBlank => {
                let [arg] = args else {
                    return Err(self.arity(function, "1", args.len()));
                };
                let value = self.eval(arg)?;
                Ok(match function {
                    FormulaFunction::Not => Value::Bool(!value.is_truthy()),
                    FormulaFunction::IsBlank => Value::Bool(value.is_empty()),
                    _ => match &value {
                        Value::String(s) => Value::Number(s.chars().count() as f64),
                        Value::List(items) => Value::Number(items.len() as f64),
                        Value::Map(map) => Value::Number(map.len() as f64),
                        _ => Value::Number(0.0),
                    },
                })
            }
        }
    }

    fn invalid_operand(&self, operator: &str, left: &Value, right: &Value) -> EvaluationError {
        EvaluationError::InvalidOperand {
            formula: self.formula.to_string(),
            operator: operator.to_string(),
            left: left.type_name().to_string(),
            right: right.type_name().to_string(),
        }
    }

    fn arity(&self, function: FormulaFunction, expected: &str, found: usize) -> EvaluationError {
        EvaluationError::Arity {
            formula: self.formula.to_string(),
            function: function.to_string(),
            expected: expected.to_string(),
            found,
        }
    }
}

/// Comparisons never fail: unset operands and incomparable types yield `false`
/// (`true` for `!=` between comparable but different values).
fn compare(op: FormulaOperator, left: &Value, right: &Value) -> bool {
    if left.is_unset() || right.is_unset() {
        return false;
    }
    match op {
        FormulaOperator::Equal => loose_equal(left, right),
        FormulaOperator::NotEqual => !loose_equal(left, right),
        _ => {
            let ordering = match (left.as_number(), right.as_number()) {
                (Some(l), Some(r)) => l.partial_cmp(&r),
                _ => match (left, right) {
                    (Value::String(l), Value::String(r)) => Some(l.cmp(r)),
                    _ => None,
                },
            };
            match ordering {
                Some(ordering) => match op {
                    FormulaOperator::Greater => ordering.is_gt(),
                    FormulaOperator::Less => ordering.is_lt(),
                    FormulaOperator::GreaterEqual => ordering.is_ge(),
                    FormulaOperator::LessEqual => ordering.is_le(),
                    _ => false,
                },
                None => false,
            }
        }
    }
}

fn loose_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(l), Value::Number(r)) => l == r,
        (Value::Number(_), Value::String(_)) | (Value::String(_), Value::Number(_)) => {
            match (left.as_number(), right.as_number()) {
                (Some(l), Some(r)) => l == r,
                _ => false,
            }
        }
        (Value::Bool(b), Value::String(s)) | (Value::String(s), Value::Bool(b)) => {
            s.eq_ignore_ascii_case(if *b { "true" } else { "false" })
        }
        _ => left == right,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs() -> InputValues {
        InputValues::new()
            .with("count", 7i64)
            .with("language", "rust")
            .with("verbose", false)
            .with("tags", vec!["a", "b"])
            .with("limit", "10")
    }

    #[test]
    fn test_comparisons() {
        let inputs = inputs();
        assert!(evaluate("count > 5", &inputs).unwrap());
        assert!(evaluate("=count >= 7", &inputs).unwrap());
        assert!(!evaluate("count < 7", &inputs).unwrap());
        assert!(evaluate("count != 8", &inputs).unwrap());
        assert!(evaluate("language = \"rust\"", &inputs).unwrap());
        assert!(evaluate("inputs.language == 'rust'", &inputs).unwrap());
        assert!(evaluate("limit > 9", &inputs).unwrap());
    }

    #[test]
    fn test_unknown_identifier_compares_false() {
        let inputs = inputs();
        assert!(!evaluate("missing = 1", &inputs).unwrap());
        assert!(!evaluate("missing != 1", &inputs).unwrap());
        assert!(!evaluate("missing > 0", &inputs).unwrap());
        assert!(!evaluate("missing", &inputs).unwrap());
        assert!(!evaluate("missing + 1 > 0", &inputs).unwrap());
    }

    #[test]
    fn test_logic_and_functions() {
        let inputs = inputs();
        assert!(evaluate("count > 5 && !verbose", &inputs).unwrap());
        assert!(evaluate("verbose || language = 'rust'", &inputs).unwrap());
        assert!(evaluate("AND(count > 1, LEN(tags) = 2)", &inputs).unwrap());
        assert!(evaluate("or(false, true)", &inputs).unwrap());
        assert!(evaluate("NOT(verbose)", &inputs).unwrap());
        assert!(evaluate("ISBLANK(missing)", &inputs).unwrap());
        assert!(evaluate("(count - 2) * 2 = 10", &inputs).unwrap());
    }

    #[test]
    fn test_syntax_errors() {
        let inputs = inputs();
        assert!(matches!(
            evaluate("count >", &inputs),
            Err(EvaluationError::Syntax { .. })
        ));
        assert!(matches!(
            evaluate("=", &inputs),
            Err(EvaluationError::Syntax { .. })
        ));
        assert!(matches!(
            evaluate("FOO(1)", &inputs),
            Err(EvaluationError::Syntax { .. })
        ));
        assert!(matches!(
            evaluate("(count > 1", &inputs),
            Err(EvaluationError::Syntax { .. })
        ));
    }

    #[test]
    fn test_arithmetic_errors() {
        let inputs = inputs();
        assert!(matches!(
            evaluate("count / 0 > 1", &inputs),
            Err(EvaluationError::DivisionByZero { .. })
        ));
        assert!(matches!(
            evaluate("tags * 2 > 1", &inputs),
            Err(EvaluationError::InvalidOperand { .. })
        ));
        assert!(matches!(
            evaluate("NOT(1, 2)", &inputs),
            Err(EvaluationError::Arity { .. })
        ));
    }

    #[test]
    fn test_inputs_are_not_mutated() {
        let inputs = inputs();
        let before = inputs.clone();
        let _ = evaluate("count > 1 && language = 'go'", &inputs);
        assert_eq!(inputs, before);
    }

    #[test]
    fn test_fields() {
        let formula = Formula::parse("inputs.a > 1 && b.c").unwrap();
        let fields: Vec<String> = formula.fields().iter().map(|p| p.to_string()).collect();
        assert_eq!(fields, ["inputs.a", "b.c"]);
    }
}
