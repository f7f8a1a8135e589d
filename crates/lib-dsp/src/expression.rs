//! Arithmetic over named scalars.
//!
//! User-supplied formulas such as `gm*ro` or `cgs+cgd` are parsed into an
//! [`Expr`] tree and evaluated against a closed set of bindings. Only
//! numbers, identifiers, `+ - * /`, unary minus and parentheses are
//! accepted; there is no function call or attribute access.
//!
//! ```text
//! expr   = term   (('+' | '-') term)*
//! term   = factor (('*' | '/') factor)*
//! factor = number | identifier | '(' expr ')' | '-' factor
//! ```

use crate::error::ExprError;
use nom::{
    branch::alt,
    bytes::complete::take_while,
    character::complete::{char, digit0, digit1, multispace0, one_of, satisfy},
    combinator::{all_consuming, map, opt, recognize},
    multi::many0,
    sequence::{delimited, preceded},
    IResult, Parser,
};
use std::collections::{BTreeSet, HashMap};
use std::str::FromStr;

/// Parsed expression tree.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Literal(f64),
    Var(String),
    Neg(Box<Expr>),
    Add(Box<Expr>, Box<Expr>),
    Sub(Box<Expr>, Box<Expr>),
    Mul(Box<Expr>, Box<Expr>),
    Div(Box<Expr>, Box<Expr>),
}

impl Expr {
    /// Evaluate against a map of bindings.
    ///
    /// Division follows IEEE 754, so dividing by zero yields an infinity or
    /// NaN rather than an error.
    pub fn evaluate(&self, bindings: &HashMap<String, f64>) -> Result<f64, ExprError> {
        self.evaluate_with(&|name: &str| bindings.get(name).copied())
    }

    /// Evaluate with an arbitrary name lookup.
    pub fn evaluate_with(&self, lookup: &dyn Fn(&str) -> Option<f64>) -> Result<f64, ExprError> {
        Ok(match self {
            Expr::Literal(v) => *v,
            Expr::Var(name) => {
                lookup(name).ok_or_else(|| ExprError::UnknownVariable(name.clone()))?
            }
            Expr::Neg(e) => -e.evaluate_with(lookup)?,
            Expr::Add(a, b) => a.evaluate_with(lookup)? + b.evaluate_with(lookup)?,
            Expr::Sub(a, b) => a.evaluate_with(lookup)? - b.evaluate_with(lookup)?,
            Expr::Mul(a, b) => a.evaluate_with(lookup)? * b.evaluate_with(lookup)?,
            Expr::Div(a, b) => a.evaluate_with(lookup)? / b.evaluate_with(lookup)?,
        })
    }

    /// Names referenced by the expression, sorted and deduplicated.
    pub fn variables(&self) -> BTreeSet<&str> {
        let mut names = BTreeSet::new();
        self.collect_variables(&mut names);
        names
    }

    fn collect_variables<'a>(&'a self, names: &mut BTreeSet<&'a str>) {
        match self {
            Expr::Literal(_) => {}
            Expr::Var(name) => {
                names.insert(name.as_str());
            }
            Expr::Neg(e) => e.collect_variables(names),
            Expr::Add(a, b) | Expr::Sub(a, b) | Expr::Mul(a, b) | Expr::Div(a, b) => {
                a.collect_variables(names);
                b.collect_variables(names);
            }
        }
    }
}

impl FromStr for Expr {
    type Err = ExprError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_expression(s)
    }
}

/// Parse an expression. The whole input must be consumed.
pub fn parse_expression(text: &str) -> Result<Expr, ExprError> {
    match all_consuming(parse_expr).parse(text) {
        Ok((_, expr)) => Ok(expr),
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => Err(syntax_error(e.input)),
        Err(nom::Err::Incomplete(_)) => Err(syntax_error("")),
    }
}

/// Parse and evaluate in one step.
pub fn evaluate(text: &str, bindings: &HashMap<String, f64>) -> Result<f64, ExprError> {
    parse_expression(text)?.evaluate(bindings)
}

fn syntax_error(remaining: &str) -> ExprError {
    let remaining = remaining.trim();
    if remaining.is_empty() {
        ExprError::Syntax("end of input".to_string())
    } else {
        ExprError::Syntax(remaining.to_string())
    }
}

// ============================================================================
// Grammar
// ============================================================================

fn parse_expr(input: &str) -> IResult<&str, Expr> {
    let (input, first) = parse_term(input)?;
    let (input, rest) = many0((ws(one_of("+-")), parse_term)).parse(input)?;

    let expr = rest.into_iter().fold(first, |lhs, (op, rhs)| match op {
        '+' => Expr::Add(Box::new(lhs), Box::new(rhs)),
        _ => Expr::Sub(Box::new(lhs), Box::new(rhs)),
    });
    Ok((input, expr))
}

fn parse_term(input: &str) -> IResult<&str, Expr> {
    let (input, first) = parse_factor(input)?;
    let (input, rest) = many0((ws(one_of("*/")), parse_factor)).parse(input)?;

    let expr = rest.into_iter().fold(first, |lhs, (op, rhs)| match op {
        '*' => Expr::Mul(Box::new(lhs), Box::new(rhs)),
        _ => Expr::Div(Box::new(lhs), Box::new(rhs)),
    });
    Ok((input, expr))
}

fn parse_factor(input: &str) -> IResult<&str, Expr> {
    ws(alt((
        map(preceded(char('-'), parse_factor), |e| Expr::Neg(Box::new(e))),
        delimited(char('('), parse_expr, char(')')),
        map(parse_identifier, |name| Expr::Var(name.to_string())),
        map(parse_number, Expr::Literal),
    )))
    .parse(input)
}

fn parse_identifier(input: &str) -> IResult<&str, &str> {
    recognize((
        satisfy(|c: char| c.is_ascii_alphabetic() || c == '_'),
        take_while(|c: char| c.is_ascii_alphanumeric() || c == '_'),
    ))
    .parse(input)
}

/// Unsigned decimal literal with optional fraction and exponent.
fn parse_number(input: &str) -> IResult<&str, f64> {
    let (rest, text) = recognize((
        alt((
            recognize((digit1, opt((char('.'), digit0)))),
            recognize((char('.'), digit1)),
        )),
        opt((one_of("eE"), opt(one_of("+-")), digit1)),
    ))
    .parse(input)?;

    let value: f64 = text.parse().map_err(|_| {
        nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Float))
    })?;
    Ok((rest, value))
}

fn ws<'a, P>(inner: P) -> impl Parser<&'a str, Output = P::Output, Error = nom::error::Error<&'a str>>
where
    P: Parser<&'a str, Error = nom::error::Error<&'a str>>,
{
    delimited(multispace0, inner, multispace0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bindings(pairs: &[(&str, f64)]) -> HashMap<String, f64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_precedence_and_associativity() {
        let empty = HashMap::new();
        assert_eq!(evaluate("1 + 2 * 3", &empty).unwrap(), 7.0);
        assert_eq!(evaluate("(1 + 2) * 3", &empty).unwrap(), 9.0);
        assert_eq!(evaluate("10 - 4 - 3", &empty).unwrap(), 3.0);
        assert_eq!(evaluate("8 / 4 / 2", &empty).unwrap(), 1.0);
        assert_eq!(evaluate("-2 * -3", &empty).unwrap(), 6.0);
        assert_eq!(evaluate("--4", &empty).unwrap(), 4.0);
    }

    #[test]
    fn test_number_forms() {
        let empty = HashMap::new();
        assert_eq!(evaluate("1.5e3", &empty).unwrap(), 1500.0);
        assert_eq!(evaluate(".25", &empty).unwrap(), 0.25);
        assert_eq!(evaluate("2.", &empty).unwrap(), 2.0);
        assert_eq!(evaluate("1E-3", &empty).unwrap(), 1e-3);
    }

    #[test]
    fn test_device_formulas() {
        let vars = bindings(&[
            ("gm", 1e-3),
            ("id", 1e-4),
            ("gds", 2e-6),
            ("cgs", 1e-15),
            ("cgd", 2e-15),
            ("cgb", 3e-15),
        ]);

        assert!((evaluate("gm/id", &vars).unwrap() - 10.0).abs() < 1e-9);
        assert!((evaluate("gm * (1/gds)", &vars).unwrap() - 500.0).abs() < 1e-9);
        assert!((evaluate("cgb+cgs+cgd", &vars).unwrap() - 6e-15).abs() < 1e-27);
    }

    #[test]
    fn test_unknown_variable() {
        let vars = bindings(&[("gm", 1.0)]);
        assert_eq!(
            evaluate("gm * ro", &vars),
            Err(ExprError::UnknownVariable("ro".to_string()))
        );
    }

    #[test]
    fn test_syntax_errors() {
        let empty = HashMap::new();
        assert_eq!(
            parse_expression("1 + 2 )"),
            Err(ExprError::Syntax(")".to_string()))
        );
        assert!(matches!(parse_expression(""), Err(ExprError::Syntax(_))));
        assert!(matches!(parse_expression("1 +"), Err(ExprError::Syntax(_))));
        assert!(matches!(parse_expression("(gm"), Err(ExprError::Syntax(_))));
        assert!(matches!(parse_expression("__import__('os')"), Err(ExprError::Syntax(_))));
        assert!(matches!(parse_expression("gm.real"), Err(ExprError::Syntax(_))));
        assert!(evaluate("2 ** 3", &empty).is_err());
    }

    #[test]
    fn test_tree_shape() {
        let expr: Expr = "a - b * 2".parse().unwrap();
        assert_eq!(
            expr,
            Expr::Sub(
                Box::new(Expr::Var("a".to_string())),
                Box::new(Expr::Mul(
                    Box::new(Expr::Var("b".to_string())),
                    Box::new(Expr::Literal(2.0)),
                )),
            )
        );
        assert_eq!(expr.variables().into_iter().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn test_division_by_zero_is_ieee() {
        let vars = bindings(&[("gds", 0.0)]);
        assert_eq!(evaluate("1/gds", &vars).unwrap(), f64::INFINITY);
    }
}
