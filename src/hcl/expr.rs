//! Purpose: Parse one HCL expression and describe its syntax tree as serializable nodes.
//! Exports: `parse_expression`, `Node`, `Traverser`, `ObjectItem`, `SrcRange`, `ParseDiagnostics`.
//! Role: Expression parser behind the `parseExpression` operation.
//! Invariants: Every node carries a `SrcRange` positioned relative to the caller's start position.
//! Invariants: Quoted strings always become `TemplateExpr` (or `TemplateWrapExpr` for a lone interpolation).
//! Notes: Template directives (`%{if}`/`%{for}`) are reported as opaque `TemplateDirective` nodes
//! spanning the directive itself.
use std::error::Error as StdError;
use std::fmt;
use std::ops::Range;

use hcl_edit::Span;
use hcl_edit::expr::{Expression, ObjectKey, Traversal, TraversalOperator};
use hcl_edit::template::Element;
use serde::Serialize;
use serde_json::Value;

use super::number_value;
use crate::config::Pos;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SrcRange {
    pub filename: String,
    pub start: Pos,
    pub end: Pos,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "Type", rename_all_fields = "PascalCase")]
pub enum Node {
    LiteralValueExpr {
        val: Value,
        src_range: SrcRange,
    },
    TemplateExpr {
        parts: Vec<Node>,
        src_range: SrcRange,
    },
    TemplateWrapExpr {
        wrapped: Box<Node>,
        src_range: SrcRange,
    },
    TemplateDirective {
        src_range: SrcRange,
    },
    ScopeTraversalExpr {
        traversal: Vec<Traverser>,
        src_range: SrcRange,
    },
    RelativeTraversalExpr {
        source: Box<Node>,
        traversal: Vec<Traverser>,
        src_range: SrcRange,
    },
    IndexExpr {
        collection: Box<Node>,
        key: Box<Node>,
        src_range: SrcRange,
    },
    SplatExpr {
        source: Box<Node>,
        each: Vec<Traverser>,
        src_range: SrcRange,
    },
    FunctionCallExpr {
        name: String,
        args: Vec<Node>,
        expand_final: bool,
        src_range: SrcRange,
    },
    ConditionalExpr {
        condition: Box<Node>,
        true_result: Box<Node>,
        false_result: Box<Node>,
        src_range: SrcRange,
    },
    BinaryOpExpr {
        #[serde(rename = "LHS")]
        lhs: Box<Node>,
        op: String,
        #[serde(rename = "RHS")]
        rhs: Box<Node>,
        src_range: SrcRange,
    },
    UnaryOpExpr {
        op: String,
        val: Box<Node>,
        src_range: SrcRange,
    },
    TupleConsExpr {
        exprs: Vec<Node>,
        src_range: SrcRange,
    },
    ObjectConsExpr {
        items: Vec<ObjectItem>,
        src_range: SrcRange,
    },
    ObjectConsKeyExpr {
        wrapped: Box<Node>,
        src_range: SrcRange,
    },
    ForExpr {
        key_var: Option<String>,
        val_var: String,
        coll_expr: Box<Node>,
        key_expr: Option<Box<Node>>,
        val_expr: Box<Node>,
        cond_expr: Option<Box<Node>>,
        group: bool,
        src_range: SrcRange,
    },
    ParenthesesExpr {
        wrapped: Box<Node>,
        src_range: SrcRange,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ObjectItem {
    pub key_expr: Node,
    pub value_expr: Node,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "Type", rename_all_fields = "PascalCase")]
pub enum Traverser {
    TraverseRoot { name: String, src_range: SrcRange },
    TraverseAttr { name: String, src_range: SrcRange },
    TraverseIndex { key: Value, src_range: SrcRange },
    TraverseSplat { src_range: SrcRange },
}

/// Parser diagnostics for one expression, labeled with the diagnostic filename.
#[derive(Debug)]
pub struct ParseDiagnostics {
    label: String,
    detail: String,
}

impl ParseDiagnostics {
    pub fn label(&self) -> &str {
        &self.label
    }
}

impl fmt::Display for ParseDiagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.label, self.detail.trim_end())
    }
}

impl StdError for ParseDiagnostics {}

pub fn parse_expression(bytes: &[u8], label: &str, start: Pos) -> Result<Node, ParseDiagnostics> {
    let source = std::str::from_utf8(bytes).map_err(|err| ParseDiagnostics {
        label: label.to_string(),
        detail: format!("expression is not valid UTF-8: {err}"),
    })?;
    let expr = hcl_edit::parser::parse_expr(source).map_err(|err| ParseDiagnostics {
        label: label.to_string(),
        detail: err.to_string(),
    })?;
    let builder = TreeBuilder {
        source,
        label,
        start,
    };
    Ok(builder.node(&expr))
}

struct TreeBuilder<'a> {
    source: &'a str,
    label: &'a str,
    start: Pos,
}

impl TreeBuilder<'_> {
    fn pos(&self, byte: usize) -> Pos {
        let byte = byte.min(self.source.len());
        let before = self.source.get(..byte).unwrap_or(self.source);
        match before.rfind('\n') {
            Some(newline) => Pos {
                line: self.start.line + before.matches('\n').count(),
                column: before[newline + 1..].chars().count() + 1,
                byte: self.start.byte + byte,
            },
            None => Pos {
                line: self.start.line,
                column: self.start.column + before.chars().count(),
                byte: self.start.byte + byte,
            },
        }
    }

    fn range(&self, span: Option<Range<usize>>) -> SrcRange {
        let span = span.unwrap_or(0..self.source.len());
        SrcRange {
            filename: self.label.to_string(),
            start: self.pos(span.start),
            end: self.pos(span.end),
        }
    }

    fn node(&self, expr: &Expression) -> Node {
        let src_range = self.range(expr.span());
        match expr {
            Expression::Null(_) => Node::LiteralValueExpr {
                val: Value::Null,
                src_range,
            },
            Expression::Bool(value) => Node::LiteralValueExpr {
                val: Value::Bool(*value.value()),
                src_range,
            },
            Expression::Number(number) => Node::LiteralValueExpr {
                val: number_value(number.value()),
                src_range,
            },
            Expression::String(value) => {
                let inner = expr
                    .span()
                    .filter(|span| span.len() >= 2)
                    .map(|span| span.start + 1..span.end - 1);
                Node::TemplateExpr {
                    parts: vec![Node::LiteralValueExpr {
                        val: Value::String(value.value().to_string()),
                        src_range: self.range(inner),
                    }],
                    src_range,
                }
            }
            Expression::StringTemplate(template) => self.template(template.iter(), src_range),
            Expression::HeredocTemplate(heredoc) => {
                self.template(heredoc.template.iter(), src_range)
            }
            Expression::Array(array) => Node::TupleConsExpr {
                exprs: array.iter().map(|item| self.node(item)).collect(),
                src_range,
            },
            Expression::Object(object) => Node::ObjectConsExpr {
                items: object
                    .iter()
                    .map(|(key, value)| ObjectItem {
                        key_expr: self.object_key(key),
                        value_expr: self.node(value.expr()),
                    })
                    .collect(),
                src_range,
            },
            Expression::Parenthesis(parens) => Node::ParenthesesExpr {
                wrapped: Box::new(self.node(parens.inner())),
                src_range,
            },
            Expression::Variable(variable) => Node::ScopeTraversalExpr {
                traversal: vec![Traverser::TraverseRoot {
                    name: variable.as_str().to_string(),
                    src_range: self.range(variable.span()),
                }],
                src_range,
            },
            Expression::Conditional(conditional) => Node::ConditionalExpr {
                condition: Box::new(self.node(&conditional.cond_expr)),
                true_result: Box::new(self.node(&conditional.true_expr)),
                false_result: Box::new(self.node(&conditional.false_expr)),
                src_range,
            },
            Expression::FuncCall(call) => {
                let mut name = String::new();
                for segment in &call.name.namespace {
                    name.push_str(segment.as_str());
                    name.push_str("::");
                }
                name.push_str(call.name.name.as_str());
                Node::FunctionCallExpr {
                    name,
                    args: call.args.iter().map(|arg| self.node(arg)).collect(),
                    expand_final: call.args.expand_final(),
                    src_range,
                }
            }
            Expression::Traversal(traversal) => self.traversal(traversal, src_range),
            Expression::UnaryOp(op) => Node::UnaryOpExpr {
                op: op.operator.value().as_str().to_string(),
                val: Box::new(self.node(&op.expr)),
                src_range,
            },
            Expression::BinaryOp(op) => Node::BinaryOpExpr {
                lhs: Box::new(self.node(&op.lhs_expr)),
                op: op.operator.value().as_str().to_string(),
                rhs: Box::new(self.node(&op.rhs_expr)),
                src_range,
            },
            Expression::ForExpr(for_expr) => Node::ForExpr {
                key_var: for_expr
                    .intro
                    .key_var
                    .as_ref()
                    .map(|var| var.as_str().to_string()),
                val_var: for_expr.intro.value_var.as_str().to_string(),
                coll_expr: Box::new(self.node(&for_expr.intro.collection_expr)),
                key_expr: for_expr
                    .key_expr
                    .as_ref()
                    .map(|key| Box::new(self.node(key))),
                val_expr: Box::new(self.node(&for_expr.value_expr)),
                cond_expr: for_expr
                    .cond
                    .as_ref()
                    .map(|cond| Box::new(self.node(&cond.expr))),
                group: for_expr.grouping,
                src_range,
            },
        }
    }

    fn template<'e>(
        &self,
        elements: impl IntoIterator<Item = &'e Element>,
        src_range: SrcRange,
    ) -> Node {
        let elements: Vec<&Element> = elements.into_iter().collect();
        if let [Element::Interpolation(interpolation)] = elements.as_slice() {
            return Node::TemplateWrapExpr {
                wrapped: Box::new(self.node(&interpolation.expr)),
                src_range,
            };
        }
        let parts = elements
            .into_iter()
            .map(|element| match element {
                Element::Literal(literal) => Node::LiteralValueExpr {
                    val: Value::String(literal.value().to_string()),
                    src_range: self.range(literal.span()),
                },
                Element::Interpolation(interpolation) => self.node(&interpolation.expr),
                Element::Directive(directive) => Node::TemplateDirective {
                    src_range: self.range(directive.span()),
                },
            })
            .collect();
        Node::TemplateExpr { parts, src_range }
    }

    fn object_key(&self, key: &ObjectKey) -> Node {
        match key {
            ObjectKey::Ident(ident) => {
                let src_range = self.range(ident.span());
                Node::ObjectConsKeyExpr {
                    wrapped: Box::new(Node::ScopeTraversalExpr {
                        traversal: vec![Traverser::TraverseRoot {
                            name: ident.as_str().to_string(),
                            src_range: src_range.clone(),
                        }],
                        src_range: src_range.clone(),
                    }),
                    src_range,
                }
            }
            ObjectKey::Expression(expr) => Node::ObjectConsKeyExpr {
                wrapped: Box::new(self.node(expr)),
                src_range: self.range(expr.span()),
            },
        }
    }

    /// Fold a traversal into scope/relative traversals, index and splat nodes.
    fn traversal(&self, traversal: &Traversal, src_range: SrcRange) -> Node {
        let start = traversal.expr.span().map(|span| span.start);
        let mut source: Option<Node> = None;
        let mut steps = Vec::new();
        match &traversal.expr {
            Expression::Variable(variable) => steps.push(Traverser::TraverseRoot {
                name: variable.as_str().to_string(),
                src_range: self.range(variable.span()),
            }),
            other => source = Some(self.node(other)),
        }
        let mut splat: Option<(Node, Vec<Traverser>)> = None;

        for operator in &traversal.operators {
            let op_range = self.range(operator.span());
            let partial = match (start, operator.span()) {
                (Some(start), Some(span)) => self.range(Some(start..span.end)),
                _ => src_range.clone(),
            };
            let step = match operator.value() {
                TraversalOperator::GetAttr(ident) => Traverser::TraverseAttr {
                    name: ident.as_str().to_string(),
                    src_range: op_range,
                },
                TraversalOperator::LegacyIndex(index) => Traverser::TraverseIndex {
                    key: Value::from(*index.value()),
                    src_range: op_range,
                },
                TraversalOperator::Index(key) => match literal_key(key) {
                    Some(key) => Traverser::TraverseIndex {
                        key,
                        src_range: op_range,
                    },
                    None if splat.is_none() => {
                        let collection =
                            finish(source.take(), std::mem::take(&mut steps), partial.clone());
                        source = Some(Node::IndexExpr {
                            collection: Box::new(collection),
                            key: Box::new(self.node(key)),
                            src_range: partial,
                        });
                        continue;
                    }
                    None => Traverser::TraverseIndex {
                        key: Value::String(self.text(key.span())),
                        src_range: op_range,
                    },
                },
                TraversalOperator::AttrSplat(_) | TraversalOperator::FullSplat(_) => {
                    match splat.as_mut() {
                        Some((_, each)) => {
                            each.push(Traverser::TraverseSplat { src_range: op_range })
                        }
                        None => {
                            let before =
                                finish(source.take(), std::mem::take(&mut steps), partial);
                            splat = Some((before, Vec::new()));
                        }
                    }
                    continue;
                }
            };
            match splat.as_mut() {
                Some((_, each)) => each.push(step),
                None => steps.push(step),
            }
        }

        match splat {
            Some((before, each)) => Node::SplatExpr {
                source: Box::new(before),
                each,
                src_range,
            },
            None => finish(source, steps, src_range),
        }
    }

    fn text(&self, span: Option<Range<usize>>) -> String {
        span.and_then(|span| self.source.get(span))
            .unwrap_or_default()
            .trim()
            .to_string()
    }
}

fn finish(source: Option<Node>, steps: Vec<Traverser>, src_range: SrcRange) -> Node {
    match source {
        None => Node::ScopeTraversalExpr {
            traversal: steps,
            src_range,
        },
        Some(source) if steps.is_empty() => source,
        Some(source) => Node::RelativeTraversalExpr {
            source: Box::new(source),
            traversal: steps,
            src_range,
        },
    }
}

fn literal_key(key: &Expression) -> Option<Value> {
    match key {
        Expression::Number(number) => Some(number_value(number.value())),
        Expression::String(text) => Some(Value::String(text.value().to_string())),
        _ => None,
    }
}
