//! PEST-based parser for the stepping script language
//!
//! Produces the executor's AST, with span information on statements for
//! error reporting.

use pest::Parser;
use pest_derive::Parser;
use serde::{Deserialize, Serialize};
use std::rc::Rc;

use crate::interpreter::executor::types::ast::{
    is_default_span, AssignOp, BinaryOp, Declarator, Expr, ForLoopKind, FunctionBody, FunctionDef,
    LogicalOp, PropKey, Property, Span, Stmt, UnaryOp, VarKind,
};
use crate::interpreter::executor::types::values::number_to_string;
use crate::intrinsics;

pub mod semantic_validator;

#[cfg(test)]
mod tests;

/* ===================== Script Definition ===================== */

/// Script definition - a complete parsed program
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptDef {
    /// Program body (a block of statements)
    pub body: Rc<Stmt>,
    /// Span of the entire program
    #[serde(default, skip_serializing_if = "is_default_span")]
    pub span: Span,
}

/// Text accepted by `eval` and evaluation capabilities
#[derive(Debug, Clone)]
pub enum EvalSource {
    /// A single expression; its value is the result
    Expression(Rc<Expr>),
    /// Statements; the result is `undefined`
    Script(Rc<Stmt>),
}

/* ===================== PEST Parser ===================== */

#[derive(Parser)]
#[grammar = "parser/script.pest"]
struct ScriptParser;

type Pair<'i> = pest::iterators::Pair<'i, Rule>;

/* ===================== Error Types ===================== */

#[derive(Debug)]
pub enum ParseError {
    PestError(String, Option<Span>),
    BuildError(String, Option<Span>),
}

impl ParseError {
    pub fn span(&self) -> Option<Span> {
        match self {
            ParseError::PestError(_, span) => *span,
            ParseError::BuildError(_, span) => *span,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ParseError::PestError(msg, _) => msg,
            ParseError::BuildError(msg, _) => msg,
        }
    }

    /// One-line message: the `= expected ...` line of a pest report
    pub fn summary(&self) -> String {
        self.message()
            .lines()
            .rev()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .map(|line| line.trim_start_matches("= ").to_string())
            .unwrap_or_default()
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::PestError(msg, _) => write!(f, "{}", msg),
            ParseError::BuildError(msg, Some(span)) => write!(
                f,
                "{} at line {}, col {}",
                msg,
                span.start_line + 1,
                span.start_col + 1
            ),
            ParseError::BuildError(msg, None) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for ParseError {}

impl From<pest::error::Error<Rule>> for ParseError {
    fn from(err: pest::error::Error<Rule>) -> Self {
        let (line, col) = match err.line_col {
            pest::error::LineColLocation::Pos(pos) => pos,
            pest::error::LineColLocation::Span(start, _) => start,
        };
        let span = Span::new(0, 0, line.saturating_sub(1), col.saturating_sub(1));
        ParseError::PestError(err.to_string(), Some(span))
    }
}

pub type ParseResult<T> = Result<T, ParseError>;

/* ===================== Span Helpers ===================== */

/// Convert a PEST pair's span to our Span type
fn pair_to_span(pair: &Pair) -> Span {
    let pest_span = pair.as_span();
    let (line, col) = pest_span.start_pos().line_col();
    Span::new(pest_span.start(), pest_span.end(), line - 1, col - 1)
}

fn build_error(message: impl Into<String>, span: Span) -> ParseError {
    ParseError::BuildError(message.into(), Some(span))
}

/// Next child pair, or a build error naming what was expected
fn expect<'i>(
    inner: &mut impl Iterator<Item = Pair<'i>>,
    what: &str,
    span: Span,
) -> ParseResult<Pair<'i>> {
    inner
        .next()
        .ok_or_else(|| build_error(format!("Expected {}", what), span))
}

fn is_keyword_token(rule: Rule) -> bool {
    matches!(
        rule,
        Rule::kw_break
            | Rule::kw_catch
            | Rule::kw_continue
            | Rule::kw_do
            | Rule::kw_else
            | Rule::kw_finally
            | Rule::kw_for
            | Rule::kw_function
            | Rule::kw_if
            | Rule::kw_new
            | Rule::kw_return
            | Rule::kw_throw
            | Rule::kw_try
            | Rule::kw_while
            | Rule::kw_yield
    )
}

/// Children of a pair without keyword tokens
fn significant(pair: Pair) -> impl Iterator<Item = Pair> {
    pair.into_inner().filter(|p| !is_keyword_token(p.as_rule()))
}

/* ===================== Public API ===================== */

/// Parse a complete program
pub fn parse_program(source: &str) -> ParseResult<ScriptDef> {
    let mut pairs = ScriptParser::parse(Rule::program, source)?;
    let program = expect(&mut pairs, "program", Span::default())?;
    let span = pair_to_span(&program);

    let statements = program
        .into_inner()
        .filter(|p| p.as_rule() != Rule::EOI)
        .map(|p| build_statement(p).map(Rc::new))
        .collect::<ParseResult<Vec<_>>>()?;

    Ok(ScriptDef {
        body: Rc::new(Stmt::Block {
            body: statements.into(),
            span,
        }),
        span,
    })
}

/// Parse a single expression (an optional trailing `;` is allowed)
pub fn parse_expression(source: &str) -> ParseResult<Rc<Expr>> {
    let mut pairs = ScriptParser::parse(Rule::expression_program, source)?;
    let program = expect(&mut pairs, "expression", Span::default())?;
    let span = pair_to_span(&program);
    let expr = expect(&mut program.into_inner(), "expression", span)?;
    Ok(Rc::new(build_expression(expr)?))
}

/// Parse text for `eval`: an expression if possible, statements otherwise
pub fn parse_eval_source(source: &str) -> ParseResult<EvalSource> {
    if let Ok(expr) = parse_expression(source) {
        return Ok(EvalSource::Expression(expr));
    }
    parse_program(source).map(|script| EvalSource::Script(script.body))
}

/* ===================== Statement Builders ===================== */

fn build_statement(pair: Pair) -> ParseResult<Stmt> {
    let span = pair_to_span(&pair);

    match pair.as_rule() {
        Rule::statement => {
            let inner = expect(&mut pair.into_inner(), "statement", span)?;
            build_statement(inner)
        }
        Rule::block | Rule::function_body => build_block(pair),
        Rule::empty_stmt => Ok(Stmt::Empty { span }),
        Rule::var_decl | Rule::var_decl_head => build_var_decl(pair),
        Rule::function_decl => {
            let def = build_function(pair, false)?;
            Ok(Stmt::Function {
                def: Rc::new(def),
                span,
            })
        }
        Rule::if_stmt => build_if_stmt(pair),
        Rule::while_stmt => {
            let mut inner = significant(pair);
            let test = build_expression(expect(&mut inner, "loop test", span)?)?;
            let body = build_statement(expect(&mut inner, "loop body", span)?)?;
            Ok(Stmt::While {
                test: Rc::new(test),
                body: Rc::new(body),
                span,
            })
        }
        Rule::do_while_stmt => build_do_while_stmt(pair),
        Rule::for_stmt => build_for_stmt(pair),
        Rule::return_stmt => {
            let value = match significant(pair).next() {
                Some(expr) => Some(Rc::new(build_expression(expr)?)),
                None => None,
            };
            Ok(Stmt::Return { value, span })
        }
        Rule::break_stmt => Ok(Stmt::Break { span }),
        Rule::continue_stmt => Ok(Stmt::Continue { span }),
        Rule::throw_stmt => {
            let value = build_expression(expect(&mut significant(pair), "thrown value", span)?)?;
            Ok(Stmt::Throw {
                value: Rc::new(value),
                span,
            })
        }
        Rule::try_stmt => build_try_stmt(pair),
        Rule::yield_stmt => {
            let value = build_expression(expect(&mut significant(pair), "yielded value", span)?)?;
            Ok(Stmt::Yield {
                value: Rc::new(value),
                span,
            })
        }
        Rule::expr_stmt => {
            let expr = build_expression(expect(&mut pair.into_inner(), "expression", span)?)?;
            Ok(Stmt::Expr {
                expr: Rc::new(expr),
                span,
            })
        }
        _ => Err(build_error(
            format!("Unexpected statement rule: {:?}", pair.as_rule()),
            span,
        )),
    }
}

fn build_block(pair: Pair) -> ParseResult<Stmt> {
    let span = pair_to_span(&pair);
    let statements = pair
        .into_inner()
        .map(|p| build_statement(p).map(Rc::new))
        .collect::<ParseResult<Vec<_>>>()?;

    Ok(Stmt::Block {
        body: statements.into(),
        span,
    })
}

fn build_var_decl(pair: Pair) -> ParseResult<Stmt> {
    let span = pair_to_span(&pair);
    let mut inner = pair.into_inner();

    let kind_pair = expect(&mut inner, "declaration kind", span)?;
    let var_kind = match kind_pair.as_str() {
        "let" => VarKind::Let,
        "const" => VarKind::Const,
        "var" => VarKind::Var,
        other => {
            return Err(build_error(
                format!("Expected 'let', 'const' or 'var', got: {}", other),
                pair_to_span(&kind_pair),
            ))
        }
    };

    let declarations = inner
        .map(build_declarator)
        .collect::<ParseResult<Vec<_>>>()?;

    Ok(Stmt::Declare {
        var_kind,
        declarations: declarations.into(),
        span,
    })
}

fn build_declarator(pair: Pair) -> ParseResult<Declarator> {
    let span = pair_to_span(&pair);
    let mut inner = pair.into_inner();
    let name = expect(&mut inner, "binding name", span)?.as_str().to_string();

    let init = match inner.next() {
        Some(expr_pair) => {
            let expr = name_anonymous_function(build_expression(expr_pair)?, &name);
            Some(Rc::new(expr))
        }
        None => None,
    };

    Ok(Declarator { name, init })
}

/// `const f = () => ...` names the function `f`
fn name_anonymous_function(expr: Expr, name: &str) -> Expr {
    match expr {
        Expr::Function { def } if def.name.is_none() => {
            let mut named = (*def).clone();
            named.name = Some(name.to_string());
            Expr::Function {
                def: Rc::new(named),
            }
        }
        other => other,
    }
}

/// Group a statement with the checkpoint that follows it
fn absorb_checkpoint(stmt: Stmt, checkpoint: Stmt) -> Stmt {
    let span = stmt.span();
    Stmt::Block {
        body: vec![Rc::new(stmt), Rc::new(checkpoint)].into(),
        span,
    }
}

fn build_if_stmt(pair: Pair) -> ParseResult<Stmt> {
    let span = pair_to_span(&pair);
    let mut inner = significant(pair);

    let test = build_expression(expect(&mut inner, "if test", span)?)?;
    let mut then_s = build_statement(expect(&mut inner, "if branch", span)?)?;
    let mut else_s = None;

    for rest in inner {
        match rest.as_rule() {
            Rule::yield_stmt => then_s = absorb_checkpoint(then_s, build_statement(rest)?),
            Rule::else_clause => {
                let else_span = pair_to_span(&rest);
                let stmt = expect(&mut significant(rest), "else branch", else_span)?;
                else_s = Some(Rc::new(build_statement(stmt)?));
            }
            other => {
                return Err(build_error(
                    format!("Unexpected if statement content: {:?}", other),
                    span,
                ))
            }
        }
    }

    Ok(Stmt::If {
        test: Rc::new(test),
        then_s: Rc::new(then_s),
        else_s,
        span,
    })
}

fn build_do_while_stmt(pair: Pair) -> ParseResult<Stmt> {
    let span = pair_to_span(&pair);
    let mut inner = significant(pair);

    let mut body = build_statement(expect(&mut inner, "loop body", span)?)?;
    let mut next = expect(&mut inner, "loop test", span)?;
    if next.as_rule() == Rule::yield_stmt {
        body = absorb_checkpoint(body, build_statement(next)?);
        next = expect(&mut inner, "loop test", span)?;
    }
    let test = build_expression(next)?;

    Ok(Stmt::DoWhile {
        body: Rc::new(body),
        test: Rc::new(test),
        span,
    })
}

fn build_for_stmt(pair: Pair) -> ParseResult<Stmt> {
    let span = pair_to_span(&pair);
    let mut inner = significant(pair);

    let head = expect(&mut inner, "loop header", span)?;
    let body = Rc::new(build_statement(expect(&mut inner, "loop body", span)?)?);

    match head.as_rule() {
        Rule::for_each_head => {
            let mut parts = head.into_inner().peekable();
            let var_kind = match parts.peek().map(|p| p.as_rule()) {
                Some(Rule::var_kind) => {
                    let kind = expect(&mut parts, "declaration kind", span)?;
                    Some(match kind.as_str() {
                        "const" => VarKind::Const,
                        "var" => VarKind::Var,
                        _ => VarKind::Let,
                    })
                }
                _ => None,
            };
            let binding = expect(&mut parts, "loop binding", span)?.as_str().to_string();
            let kind = match expect(&mut parts, "'of' or 'in'", span)?.as_str() {
                "of" => ForLoopKind::Of,
                _ => ForLoopKind::In,
            };
            let iterable = build_expression(expect(&mut parts, "iterable", span)?)?;

            Ok(Stmt::ForLoop {
                kind,
                var_kind,
                binding,
                iterable: Rc::new(iterable),
                body,
                span,
            })
        }
        Rule::for_classic_head => {
            let mut init = None;
            let mut test = None;
            let mut update = None;

            for part in head.into_inner() {
                let part_span = pair_to_span(&part);
                let rule = part.as_rule();
                let clause = expect(&mut part.into_inner(), "loop clause", part_span)?;
                match rule {
                    Rule::for_init => {
                        let stmt = match clause.as_rule() {
                            Rule::var_decl_head => build_var_decl(clause)?,
                            _ => Stmt::Expr {
                                expr: Rc::new(build_expression(clause)?),
                                span: part_span,
                            },
                        };
                        init = Some(Rc::new(stmt));
                    }
                    Rule::for_test => test = Some(Rc::new(build_expression(clause)?)),
                    Rule::for_update => update = Some(Rc::new(build_expression(clause)?)),
                    other => {
                        return Err(build_error(
                            format!("Unexpected loop clause: {:?}", other),
                            part_span,
                        ))
                    }
                }
            }

            Ok(Stmt::For {
                init,
                test,
                update,
                body,
                span,
            })
        }
        other => Err(build_error(
            format!("Unexpected loop header: {:?}", other),
            span,
        )),
    }
}

fn build_try_stmt(pair: Pair) -> ParseResult<Stmt> {
    let span = pair_to_span(&pair);
    let mut inner = significant(pair);

    let body = Rc::new(build_block(expect(&mut inner, "try block", span)?)?);
    let mut catch_var = None;
    let mut catch_body = None;
    let mut finally_body = None;

    for clause in inner {
        match clause.as_rule() {
            Rule::catch_clause => {
                for part in significant(clause) {
                    match part.as_rule() {
                        Rule::identifier => catch_var = Some(part.as_str().to_string()),
                        _ => catch_body = Some(Rc::new(build_block(part)?)),
                    }
                }
            }
            Rule::finally_clause => {
                let clause_span = pair_to_span(&clause);
                let block = expect(&mut significant(clause), "finally block", clause_span)?;
                finally_body = Some(Rc::new(build_block(block)?));
            }
            other => {
                return Err(build_error(
                    format!("Unexpected try clause: {:?}", other),
                    span,
                ))
            }
        }
    }

    if catch_body.is_none() && finally_body.is_none() {
        return Err(build_error("Missing catch or finally after try", span));
    }

    Ok(Stmt::Try {
        body,
        catch_var,
        catch_body,
        finally_body,
        span,
    })
}

/* ===================== Expression Builders ===================== */

fn build_expression(pair: Pair) -> ParseResult<Expr> {
    let span = pair_to_span(&pair);

    match pair.as_rule() {
        Rule::expression => {
            let mut exprs = pair
                .into_inner()
                .map(|p| build_expression(p).map(Rc::new))
                .collect::<ParseResult<Vec<_>>>()?;
            if exprs.len() == 1 {
                if let Some(only) = exprs.pop() {
                    return Ok(Rc::unwrap_or_clone(only));
                }
            }
            Ok(Expr::Sequence { exprs })
        }
        Rule::assignment => build_assignment(pair),
        Rule::arrow_function => build_arrow_function(pair),
        Rule::conditional => {
            let mut inner = pair.into_inner();
            let condition = build_expression(expect(&mut inner, "condition", span)?)?;
            match inner.next() {
                Some(consequent_pair) => {
                    let consequent = build_expression(consequent_pair)?;
                    let alternate = build_expression(expect(&mut inner, "alternate", span)?)?;
                    Ok(Expr::Ternary {
                        condition: Rc::new(condition),
                        consequent: Rc::new(consequent),
                        alternate: Rc::new(alternate),
                    })
                }
                None => Ok(condition),
            }
        }
        Rule::nullish_expr
        | Rule::logical_or_expr
        | Rule::logical_and_expr
        | Rule::equality_expr
        | Rule::comparison_expr
        | Rule::additive_expr
        | Rule::multiplicative_expr => build_binary_expr(pair),
        Rule::exponent_expr => {
            let mut inner = pair.into_inner();
            let base = build_expression(expect(&mut inner, "operand", span)?)?;
            match inner.next() {
                Some(_op) => {
                    let exponent = build_expression(expect(&mut inner, "exponent", span)?)?;
                    Ok(Expr::Binary {
                        op: BinaryOp::Pow,
                        left: Rc::new(base),
                        right: Rc::new(exponent),
                    })
                }
                None => Ok(base),
            }
        }
        Rule::unary_expr => {
            let mut inner = pair.into_inner();
            let first = expect(&mut inner, "operand", span)?;
            if first.as_rule() != Rule::unary_op {
                return build_expression(first);
            }
            let op = match first.as_str() {
                "!" => UnaryOp::Not,
                "-" => UnaryOp::Neg,
                "+" => UnaryOp::Plus,
                "typeof" => UnaryOp::TypeOf,
                _ => UnaryOp::Void,
            };
            let operand = build_expression(expect(&mut inner, "operand", span)?)?;
            Ok(Expr::Unary {
                op,
                operand: Rc::new(operand),
            })
        }
        Rule::prefix_update => {
            let mut inner = pair.into_inner();
            let op = expect(&mut inner, "update operator", span)?;
            let target = build_expression(expect(&mut inner, "operand", span)?)?;
            check_target(&target, "prefix operation", span)?;
            Ok(Expr::Update {
                increment: op.as_str() == "++",
                prefix: true,
                target: Rc::new(target),
            })
        }
        Rule::postfix_expr => {
            let mut inner = pair.into_inner();
            let target = build_expression(expect(&mut inner, "operand", span)?)?;
            match inner.next() {
                Some(op) => {
                    check_target(&target, "postfix operation", span)?;
                    Ok(Expr::Update {
                        increment: op.as_str() == "++",
                        prefix: false,
                        target: Rc::new(target),
                    })
                }
                None => Ok(target),
            }
        }
        Rule::call_expr => build_call_expr(pair),
        Rule::new_expr => {
            let mut inner = significant(pair);
            let callee = build_member_chain(expect(&mut inner, "constructor", span)?)?;
            let args = match inner.next() {
                Some(args_pair) => build_args(args_pair)?,
                None => vec![],
            };
            Ok(Expr::New {
                callee: Rc::new(callee),
                args,
            })
        }
        Rule::paren_expr => {
            let inner = expect(&mut pair.into_inner(), "expression", span)?;
            build_expression(inner)
        }
        Rule::number => Ok(Expr::LitNum {
            v: parse_number(pair.as_str(), span)?,
        }),
        Rule::string => Ok(Expr::LitStr {
            v: unescape_quoted(pair.as_str(), span)?,
        }),
        Rule::template => build_template(pair),
        Rule::bool_lit => Ok(Expr::LitBool {
            v: pair.as_str() == "true",
        }),
        Rule::null_lit => Ok(Expr::LitNull),
        Rule::identifier => Ok(match pair.as_str() {
            intrinsics::EVALUATE => Expr::Capability,
            name => Expr::Ident {
                name: name.to_string(),
            },
        }),
        Rule::array_lit => {
            let elements = pair
                .into_inner()
                .map(|p| build_expression(p).map(Rc::new))
                .collect::<ParseResult<Vec<_>>>()?;
            Ok(Expr::LitList { elements })
        }
        Rule::object_lit => build_object_lit(pair),
        Rule::function_expr => {
            let def = build_function(pair, false)?;
            Ok(Expr::Function { def: Rc::new(def) })
        }
        _ => Err(build_error(
            format!("Unexpected expression rule: {:?}", pair.as_rule()),
            span,
        )),
    }
}

fn check_target(target: &Expr, context: &str, span: Span) -> ParseResult<()> {
    match target {
        Expr::Ident { .. } | Expr::Member { .. } | Expr::Index { .. } => Ok(()),
        _ => Err(build_error(
            format!("Invalid left-hand side expression in {}", context),
            span,
        )),
    }
}

fn build_assignment(pair: Pair) -> ParseResult<Expr> {
    let span = pair_to_span(&pair);
    let mut inner = pair.into_inner();
    let first = expect(&mut inner, "expression", span)?;
    let left = build_expression(first)?;

    let Some(op_pair) = inner.next() else {
        return Ok(left);
    };
    check_target(&left, "assignment", span)?;

    let op = match op_pair.as_str() {
        "=" => AssignOp::Assign,
        "+=" => AssignOp::Compound(BinaryOp::Add),
        "-=" => AssignOp::Compound(BinaryOp::Sub),
        "*=" => AssignOp::Compound(BinaryOp::Mul),
        "/=" => AssignOp::Compound(BinaryOp::Div),
        "%=" => AssignOp::Compound(BinaryOp::Rem),
        "**=" => AssignOp::Compound(BinaryOp::Pow),
        other => {
            return Err(build_error(
                format!("Unknown assignment operator: {}", other),
                span,
            ))
        }
    };

    let mut value = build_expression(expect(&mut inner, "assigned value", span)?)?;
    if let (AssignOp::Assign, Expr::Ident { name }) = (op, &left) {
        value = name_anonymous_function(value, name);
    }

    Ok(Expr::Assign {
        op,
        target: Rc::new(left),
        value: Rc::new(value),
    })
}

fn build_binary_expr(pair: Pair) -> ParseResult<Expr> {
    let span = pair_to_span(&pair);
    let inner_pairs: Vec<_> = pair.into_inner().collect();

    let Some(first) = inner_pairs.first() else {
        return Err(build_error("Empty binary expression", span));
    };
    let mut left = build_expression(first.clone())?;

    for chunk in inner_pairs[1..].chunks(2) {
        let [op_pair, right_pair] = chunk else {
            return Err(build_error("Missing right operand after operator", span));
        };
        let right = Rc::new(build_expression(right_pair.clone())?);
        let lhs = Rc::new(left);

        left = match op_pair.as_rule() {
            Rule::op_and => logical(LogicalOp::And, lhs, right),
            Rule::op_or => logical(LogicalOp::Or, lhs, right),
            Rule::op_nullish => logical(LogicalOp::Nullish, lhs, right),
            _ => {
                let op = match op_pair.as_str() {
                    "+" => BinaryOp::Add,
                    "-" => BinaryOp::Sub,
                    "*" => BinaryOp::Mul,
                    "/" => BinaryOp::Div,
                    "%" => BinaryOp::Rem,
                    "==" => BinaryOp::Eq,
                    "!=" => BinaryOp::Ne,
                    "===" => BinaryOp::StrictEq,
                    "!==" => BinaryOp::StrictNe,
                    "<" => BinaryOp::Lt,
                    "<=" => BinaryOp::Lte,
                    ">" => BinaryOp::Gt,
                    ">=" => BinaryOp::Gte,
                    "instanceof" => BinaryOp::InstanceOf,
                    "in" => BinaryOp::In,
                    other => {
                        return Err(build_error(
                            format!("Expected operator, got {:?}", other),
                            pair_to_span(op_pair),
                        ))
                    }
                };
                Expr::Binary {
                    op,
                    left: lhs,
                    right,
                }
            }
        };
    }

    Ok(left)
}

fn logical(op: LogicalOp, left: Rc<Expr>, right: Rc<Expr>) -> Expr {
    Expr::Logical { op, left, right }
}

fn build_call_expr(pair: Pair) -> ParseResult<Expr> {
    let span = pair_to_span(&pair);
    let mut inner = pair.into_inner();
    let mut expr = build_expression(expect(&mut inner, "callee", span)?)?;

    for postfix in inner {
        expr = match postfix.as_rule() {
            Rule::call_args => {
                let args = build_args(postfix)?;
                let is_watch = args.is_empty()
                    && matches!(&expr, Expr::Ident { name } if name == intrinsics::WATCH);
                if is_watch {
                    Expr::WatchSnapshot
                } else {
                    Expr::Call {
                        callee: Rc::new(expr),
                        args,
                    }
                }
            }
            Rule::member_op | Rule::index_op => apply_accessor(expr, postfix)?,
            other => {
                return Err(build_error(
                    format!("Unexpected postfix operation: {:?}", other),
                    span,
                ))
            }
        };
    }

    Ok(expr)
}

fn build_member_chain(pair: Pair) -> ParseResult<Expr> {
    let span = pair_to_span(&pair);
    let mut inner = pair.into_inner();
    let mut expr = build_expression(expect(&mut inner, "constructor", span)?)?;
    for accessor in inner {
        expr = apply_accessor(expr, accessor)?;
    }
    Ok(expr)
}

fn apply_accessor(object: Expr, pair: Pair) -> ParseResult<Expr> {
    let span = pair_to_span(&pair);
    let rule = pair.as_rule();
    let part = expect(&mut pair.into_inner(), "property", span)?;
    Ok(match rule {
        Rule::member_op => Expr::Member {
            object: Rc::new(object),
            property: part.as_str().to_string(),
        },
        _ => Expr::Index {
            object: Rc::new(object),
            index: Rc::new(build_expression(part)?),
        },
    })
}

fn build_args(pair: Pair) -> ParseResult<Vec<Rc<Expr>>> {
    pair.into_inner()
        .map(|p| build_expression(p).map(Rc::new))
        .collect()
}

fn build_template(pair: Pair) -> ParseResult<Expr> {
    let span = pair_to_span(&pair);
    let mut quasis = Vec::new();
    let mut exprs = Vec::new();
    let mut current = String::new();

    for part in pair.into_inner() {
        match part.as_rule() {
            Rule::template_chunk => current.push_str(&unescape(part.as_str(), span)?),
            _ => {
                quasis.push(std::mem::take(&mut current));
                let expr = expect(&mut part.into_inner(), "substitution", span)?;
                exprs.push(Rc::new(build_expression(expr)?));
            }
        }
    }
    quasis.push(current);

    Ok(Expr::Template {
        quasis: quasis.into(),
        exprs,
    })
}

fn build_object_lit(pair: Pair) -> ParseResult<Expr> {
    let mut properties = Vec::new();

    for prop in pair.into_inner() {
        let span = pair_to_span(&prop);
        let entry = expect(&mut prop.into_inner(), "property", span)?;
        let entry_span = pair_to_span(&entry);

        let property = match entry.as_rule() {
            Rule::shorthand_prop => {
                let name = entry.as_str().to_string();
                Property {
                    key: PropKey::Static { name: name.clone() },
                    value: Rc::new(Expr::Ident { name }),
                }
            }
            Rule::keyed_prop => {
                let mut inner = entry.into_inner();
                let key = build_prop_key(expect(&mut inner, "property name", entry_span)?)?;
                let mut value = build_expression(expect(&mut inner, "property value", entry_span)?)?;
                if let PropKey::Static { name } = &key {
                    value = name_anonymous_function(value, name);
                }
                Property {
                    key,
                    value: Rc::new(value),
                }
            }
            _ => {
                let mut inner = entry.into_inner();
                let key = build_prop_key(expect(&mut inner, "method name", entry_span)?)?;
                let name = match &key {
                    PropKey::Static { name } => Some(name.clone()),
                    PropKey::Computed { .. } => None,
                };
                let params = build_params(expect(&mut inner, "parameters", entry_span)?);
                let body = build_block(expect(&mut inner, "method body", entry_span)?)?;
                Property {
                    key,
                    value: Rc::new(Expr::Function {
                        def: Rc::new(FunctionDef {
                            name,
                            params,
                            body: FunctionBody::Block {
                                body: Rc::new(body),
                            },
                            is_arrow: false,
                        }),
                    }),
                }
            }
        };
        properties.push(property);
    }

    Ok(Expr::LitObj { properties })
}

fn build_prop_key(pair: Pair) -> ParseResult<PropKey> {
    let span = pair_to_span(&pair);
    let key = expect(&mut pair.into_inner(), "property name", span)?;
    Ok(match key.as_rule() {
        Rule::string => PropKey::Static {
            name: unescape_quoted(key.as_str(), span)?,
        },
        Rule::number => PropKey::Static {
            name: number_to_string(parse_number(key.as_str(), span)?),
        },
        Rule::computed_key => {
            let expr = expect(&mut key.into_inner(), "computed key", span)?;
            PropKey::Computed {
                expr: Rc::new(build_expression(expr)?),
            }
        }
        _ => PropKey::Static {
            name: key.as_str().to_string(),
        },
    })
}

/* ===================== Functions ===================== */

fn build_params(pair: Pair) -> Vec<String> {
    pair.into_inner().map(|p| p.as_str().to_string()).collect()
}

/// Build a function declaration or expression: `function name?(params) { body }`
fn build_function(pair: Pair, is_arrow: bool) -> ParseResult<FunctionDef> {
    let span = pair_to_span(&pair);
    let mut name = None;
    let mut params = Vec::new();
    let mut body = None;

    for part in significant(pair) {
        match part.as_rule() {
            Rule::identifier => name = Some(part.as_str().to_string()),
            Rule::params => params = build_params(part),
            _ => body = Some(build_block(part)?),
        }
    }

    let body = body.ok_or_else(|| build_error("Expected function body", span))?;
    Ok(FunctionDef {
        name,
        params,
        body: FunctionBody::Block {
            body: Rc::new(body),
        },
        is_arrow,
    })
}

fn build_arrow_function(pair: Pair) -> ParseResult<Expr> {
    let span = pair_to_span(&pair);
    let mut inner = pair.into_inner();

    let params_pair = expect(&mut inner, "arrow parameters", span)?;
    let params_inner = expect(&mut params_pair.into_inner(), "arrow parameters", span)?;
    let params = match params_inner.as_rule() {
        Rule::identifier => vec![params_inner.as_str().to_string()],
        _ => build_params(params_inner),
    };

    let body_pair = expect(&mut inner, "arrow body", span)?;
    let body = match body_pair.as_rule() {
        Rule::function_body => FunctionBody::Block {
            body: Rc::new(build_block(body_pair)?),
        },
        _ => FunctionBody::Expr {
            expr: Rc::new(build_expression(body_pair)?),
        },
    };

    Ok(Expr::Function {
        def: Rc::new(FunctionDef {
            name: None,
            params,
            body,
            is_arrow: true,
        }),
    })
}

/* ===================== Literals ===================== */

fn parse_number(text: &str, span: Span) -> ParseResult<f64> {
    let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16).map(|v| v as f64).ok(),
        None => text.parse::<f64>().ok(),
    };
    parsed.ok_or_else(|| build_error(format!("Invalid number literal: {}", text), span))
}

/// Unescape a quoted string literal, dropping the quotes
fn unescape_quoted(text: &str, span: Span) -> ParseResult<String> {
    let inner = text
        .get(1..text.len().saturating_sub(1))
        .ok_or_else(|| build_error("Malformed string literal", span))?;
    unescape(inner, span)
}

/// Resolve backslash escapes (JSON escapes included)
fn unescape(text: &str, span: Span) -> ParseResult<String> {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    let mut pending_high: Option<u32> = None;

    while let Some(ch) = chars.next() {
        if ch != '\\' {
            flush_surrogate(&mut out, &mut pending_high);
            out.push(ch);
            continue;
        }
        let Some(escaped) = chars.next() else {
            return Err(build_error("Unterminated escape sequence", span));
        };
        let unit = match escaped {
            'u' => {
                let code = if chars.peek() == Some(&'{') {
                    chars.next();
                    let digits: String = chars.by_ref().take_while(|c| *c != '}').collect();
                    u32::from_str_radix(&digits, 16).ok()
                } else {
                    let digits: String = chars.by_ref().take(4).collect();
                    u32::from_str_radix(&digits, 16).ok()
                };
                code.ok_or_else(|| build_error("Invalid Unicode escape sequence", span))?
            }
            'x' => {
                let digits: String = chars.by_ref().take(2).collect();
                u32::from_str_radix(&digits, 16)
                    .map_err(|_| build_error("Invalid hexadecimal escape sequence", span))?
            }
            // Line continuation
            '\n' => continue,
            other => {
                flush_surrogate(&mut out, &mut pending_high);
                out.push(match other {
                    'n' => '\n',
                    't' => '\t',
                    'r' => '\r',
                    'b' => '\u{0008}',
                    'f' => '\u{000C}',
                    'v' => '\u{000B}',
                    '0' => '\0',
                    c => c,
                });
                continue;
            }
        };

        match unit {
            0xD800..=0xDBFF => {
                flush_surrogate(&mut out, &mut pending_high);
                pending_high = Some(unit);
            }
            0xDC00..=0xDFFF => match pending_high.take() {
                Some(high) => {
                    let combined = 0x10000 + ((high - 0xD800) << 10) + (unit - 0xDC00);
                    out.push(char::from_u32(combined).unwrap_or('\u{FFFD}'));
                }
                None => out.push('\u{FFFD}'),
            },
            _ => {
                flush_surrogate(&mut out, &mut pending_high);
                out.push(char::from_u32(unit).unwrap_or('\u{FFFD}'));
            }
        }
    }
    flush_surrogate(&mut out, &mut pending_high);

    Ok(out)
}

/// A lone high surrogate has no char; substitute the replacement character
fn flush_surrogate(out: &mut String, pending_high: &mut Option<u32>) {
    if pending_high.take().is_some() {
        out.push('\u{FFFD}');
    }
}
