//! Parser for the textual term syntax produced by [`TermArena::to_string`].
//!
//! ```text
//! term   ::= var | symbol "(" [term ("," term)*] ")"
//! var    ::= x | y | z | u | v | w | x<digits>
//! symbol ::= any run of characters other than whitespace, "(", ")", ","
//! ```
//!
//! A bare name must be a variable; constants are written `c()`.

use ariadne::{Color, Label, Report, ReportKind, Source};
use chumsky::prelude::*;

use super::{variable_index, TermArena, TermId};
use crate::error::{MalcevError, Result};

/// Syntax tree before interning
#[derive(Clone, Debug, PartialEq, Eq)]
enum Expr {
    Var(usize),
    App(String, Vec<Expr>),
}

fn name() -> impl Parser<char, String, Error = Simple<char>> + Clone {
    filter(|c: &char| !c.is_whitespace() && !matches!(c, '(' | ')' | ','))
        .repeated()
        .at_least(1)
        .collect::<String>()
        .labelled("name")
}

fn parser() -> impl Parser<char, Expr, Error = Simple<char>> + Clone {
    recursive(|expr| {
        let args = expr
            .separated_by(just(','))
            .delimited_by(just('('), just(')'))
            .padded();

        name()
            .padded()
            .then(args.or_not())
            .try_map(|(name, args), span| match args {
                Some(children) => Ok(Expr::App(name, children)),
                None => variable_index(&name).map(Expr::Var).ok_or_else(|| {
                    Simple::custom(
                        span,
                        format!("`{name}` is not a variable; write `{name}()` for a constant"),
                    )
                }),
            })
    })
    .then_ignore(end())
}

/// Render chumsky errors as one ariadne report string.
fn format_errors(source: &str, errors: Vec<Simple<char>>) -> String {
    let mut output = Vec::new();
    for error in &errors {
        let span = error.span();
        let report = Report::build(ReportKind::Error, (), span.start)
            .with_message("Term syntax error")
            .with_label(
                Label::new(span)
                    .with_message(describe(error))
                    .with_color(Color::Red),
            )
            .finish();
        if report.write(Source::from(source), &mut output).is_err() {
            return errors.iter().map(describe).collect::<Vec<_>>().join("; ");
        }
    }
    String::from_utf8(output).unwrap_or_else(|_| "term syntax error".to_string())
}

fn describe(error: &Simple<char>) -> String {
    use chumsky::error::SimpleReason;

    if let SimpleReason::Custom(msg) = error.reason() {
        return msg.clone();
    }
    let found = error
        .found()
        .map(|c| format!("'{c}'"))
        .unwrap_or_else(|| "end of input".to_string());
    let expected: Vec<String> = error
        .expected()
        .filter_map(|c| c.as_ref())
        .map(|c| format!("'{c}'"))
        .collect();
    if expected.is_empty() {
        format!("Unexpected {found}")
    } else {
        format!("Unexpected {found}, expected {}", expected.join(" or "))
    }
}

impl TermArena {
    /// Parse and intern a term. Errors carry an ariadne-rendered report.
    pub fn parse(&mut self, source: &str) -> Result<TermId> {
        let expr = parser()
            .parse(source)
            .map_err(|errors| MalcevError::Parse(format_errors(source, errors)))?;
        self.intern_expr(&expr)
    }

    fn intern_expr(&mut self, root: &Expr) -> Result<TermId> {
        // Post-order without recursion: (expr, children already visited)
        let mut stack: Vec<(&Expr, bool)> = vec![(root, false)];
        let mut done: Vec<TermId> = Vec::new();
        while let Some((expr, visited)) = stack.pop() {
            match expr {
                Expr::Var(i) => done.push(self.make_variable(*i)),
                Expr::App(name, children) if visited => {
                    let args = done.split_off(done.len() - children.len());
                    done.push(self.make_term(name, &args)?);
                }
                Expr::App(_, children) => {
                    stack.push((expr, true));
                    for child in children.iter().rev() {
                        stack.push((child, false));
                    }
                }
            }
        }
        done.pop().ok_or_else(|| MalcevError::Parse("empty term".to_string()))
    }
}
