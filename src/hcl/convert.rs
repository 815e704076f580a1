//! Purpose: Convert an HCL document into its JSON equivalent.
//! Exports: `to_json`, `to_value`.
//! Role: Document converter behind the `parse` operation.
//! Invariants: Blocks nest by type then label; the innermost key holds an array of bodies in source order.
//! Invariants: Non-literal expressions become `${<source>}` strings; literals stay JSON literals.
//! Invariants: `!`/`-` over a literal and a lone `"${literal}"` evaluate to the literal.
//! Invariants: Templates render decoded text with `%{if ..}`/`%{for ..}` markers; `~` strips are applied.
//! Invariants: With key validation on, an attribute may be set once per body.
use std::collections::BTreeSet;

use hcl_edit::Span;
use hcl_edit::expr::{Expression, ObjectKey, UnaryOperator};
use hcl_edit::structure::{Block, BlockLabel, Body, Structure};
use hcl_edit::template::{Directive, Element, Strip, Template};
use serde_json::map::Entry;
use serde_json::{Map, Value};

use super::{number_value, slice_span};
use crate::config::ConvertOptions;
use crate::core::error::{Error, ErrorKind};

/// Convert document bytes to compact JSON text with sorted object keys.
pub fn to_json(bytes: &[u8], filename: &str, options: ConvertOptions) -> Result<Vec<u8>, Error> {
    let value = to_value(bytes, filename, options)?;
    serde_json::to_vec(&value).map_err(|err| {
        Error::new(ErrorKind::Conversion)
            .with_message(format!("{filename}: failed to encode JSON"))
            .with_source(err)
    })
}

pub fn to_value(bytes: &[u8], filename: &str, options: ConvertOptions) -> Result<Value, Error> {
    let source = std::str::from_utf8(bytes).map_err(|err| {
        Error::new(ErrorKind::Conversion)
            .with_message(format!("{filename}: document is not valid UTF-8"))
            .with_source(err)
    })?;
    let body = hcl_edit::parser::parse_body(source).map_err(|err| {
        Error::new(ErrorKind::Conversion)
            .with_message(format!("parse config: {filename}"))
            .with_source(err)
    })?;
    let converter = Converter {
        source,
        filename,
        options,
    };
    converter.body(&body).map(Value::Object)
}

struct Converter<'a> {
    source: &'a str,
    filename: &'a str,
    options: ConvertOptions,
}

impl Converter<'_> {
    fn body(&self, body: &Body) -> Result<Map<String, Value>, Error> {
        let mut out = Map::new();
        let mut seen = BTreeSet::new();
        for structure in body.iter() {
            match structure {
                Structure::Attribute(attribute) => {
                    let key = attribute.key.as_str().to_string();
                    if !self.options.no_key_validation && !seen.insert(key.clone()) {
                        return Err(Error::new(ErrorKind::Conversion).with_message(format!(
                            "{}: Attribute redefined: the argument \"{key}\" was already set",
                            self.filename
                        )));
                    }
                    let value = self.expression(&attribute.value)?;
                    out.insert(key, value);
                }
                Structure::Block(block) => self.block(block, &mut out)?,
            }
        }
        Ok(out)
    }

    fn block(&self, block: &Block, out: &mut Map<String, Value>) -> Result<(), Error> {
        let mut path = vec![block.ident.as_str().to_string()];
        path.extend(block.labels.iter().map(label_text));
        let body = Value::Object(self.body(&block.body)?);
        if insert_block(out, &path, body) {
            Ok(())
        } else {
            Err(Error::new(ErrorKind::Conversion).with_message(format!(
                "{}: unable to convert block to JSON: {}",
                self.filename,
                path.join(".")
            )))
        }
    }

    fn expression(&self, expr: &Expression) -> Result<Value, Error> {
        let value = match expr {
            Expression::Null(_) => Value::Null,
            Expression::Bool(value) => Value::Bool(*value.value()),
            Expression::Number(number) => number_value(number.value()),
            Expression::String(value) => Value::String(value.value().to_string()),
            Expression::Array(array) => Value::Array(
                array
                    .iter()
                    .map(|item| self.expression(item))
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            Expression::Object(object) => {
                let mut map = Map::new();
                for (key, value) in object.iter() {
                    map.insert(self.object_key(key)?, self.expression(value.expr())?);
                }
                Value::Object(map)
            }
            Expression::StringTemplate(template) => match template.as_single_element() {
                Some(Element::Interpolation(interpolation)) => {
                    self.expression(&interpolation.expr)?
                }
                _ => Value::String(self.template(template, None)?),
            },
            Expression::HeredocTemplate(heredoc) => {
                Value::String(self.template(&heredoc.template, heredoc.indent())?)
            }
            Expression::UnaryOp(op) => match (op.operator.value(), &op.expr) {
                (UnaryOperator::Not, Expression::Bool(value)) => Value::Bool(!*value.value()),
                (UnaryOperator::Neg, Expression::Number(number)) => {
                    number_value(&-*number.value())
                }
                _ => self.wrapped(expr)?,
            },
            other => self.wrapped(other)?,
        };
        Ok(value)
    }

    fn wrapped(&self, expr: &Expression) -> Result<Value, Error> {
        Ok(Value::String(format!("${{{}}}", self.source_of(expr)?)))
    }

    fn object_key(&self, key: &ObjectKey) -> Result<String, Error> {
        match key {
            ObjectKey::Ident(ident) => Ok(ident.as_str().to_string()),
            ObjectKey::Expression(expr) => match self.expression(expr)? {
                Value::String(text) => Ok(text),
                other => Ok(other.to_string()),
            },
        }
    }

    /// Render a template as text: decoded literals, `${..}` for interpolations and
    /// `%{..}` markers for directives, with `~` strip markers applied.
    fn template(&self, template: &Template, indent: Option<usize>) -> Result<String, Error> {
        let mut writer = TemplateWriter::new(indent);
        self.write_elements(template, &mut writer)?;
        Ok(writer.finish())
    }

    fn write_elements(
        &self,
        template: &Template,
        writer: &mut TemplateWriter,
    ) -> Result<(), Error> {
        for element in template.iter() {
            match element {
                Element::Literal(literal) => writer.literal(literal.value()),
                Element::Interpolation(interpolation) => {
                    let text = self.interpolated(&interpolation.expr)?;
                    writer.marker(interpolation.strip, &text);
                }
                Element::Directive(directive) => self.write_directive(directive, writer)?,
            }
        }
        Ok(())
    }

    fn write_directive(
        &self,
        directive: &Directive,
        writer: &mut TemplateWriter,
    ) -> Result<(), Error> {
        match directive {
            Directive::If(directive) => {
                let intro = &directive.if_expr;
                let cond = self.source_of(&intro.cond_expr)?;
                writer.marker(intro.strip, &format!("%{{if {cond}}}"));
                writer.nested(|writer| self.write_elements(&intro.template, writer))?;
                if let Some(other) = &directive.else_expr {
                    writer.marker(other.strip, "%{else}");
                    writer.nested(|writer| self.write_elements(&other.template, writer))?;
                }
                writer.marker(directive.endif_expr.strip, "%{endif}");
            }
            Directive::For(directive) => {
                let intro = &directive.for_expr;
                let collection = self.source_of(&intro.collection_expr)?;
                let vars = match &intro.key_var {
                    Some(key) => format!("{}, {}", key.as_str(), intro.value_var.as_str()),
                    None => intro.value_var.as_str().to_string(),
                };
                writer.marker(intro.strip, &format!("%{{for {vars} in {collection}}}"));
                writer.nested(|writer| self.write_elements(&intro.template, writer))?;
                writer.marker(directive.endfor_expr.strip, "%{endfor}");
            }
        }
        Ok(())
    }

    /// Text an interpolation contributes: scalars inline, everything else as `${<source>}`.
    fn interpolated(&self, expr: &Expression) -> Result<String, Error> {
        Ok(match self.expression(expr)? {
            Value::String(text) => text,
            Value::Number(number) => number.to_string(),
            Value::Bool(value) => value.to_string(),
            _ => format!("${{{}}}", self.source_of(expr)?),
        })
    }

    fn source_of(&self, expr: &Expression) -> Result<&str, Error> {
        slice_span(self.source, expr.span(), ErrorKind::Conversion)
            .map(str::trim)
            .map_err(|err| {
                Error::new(ErrorKind::Conversion)
                    .with_message(format!("{}: {}", self.filename, err.callback_message()))
            })
    }
}

/// Accumulates rendered template text.
///
/// Literals inside directives are not dedented by the parser; `indent` is stripped from
/// their line starts here.
struct TemplateWriter {
    out: String,
    indent: Option<usize>,
    depth: usize,
    strip_next: bool,
}

impl TemplateWriter {
    fn new(indent: Option<usize>) -> Self {
        Self {
            out: String::new(),
            indent,
            depth: 0,
            strip_next: false,
        }
    }

    fn literal(&mut self, text: &str) {
        let text = if std::mem::take(&mut self.strip_next) {
            text.trim_start()
        } else {
            text
        };
        match self.indent {
            Some(indent) if self.depth > 0 => {
                let at_line_start = self.out.is_empty() || self.out.ends_with('\n');
                self.out.push_str(&dedent_lines(text, indent, at_line_start));
            }
            _ => self.out.push_str(text),
        }
    }

    fn marker(&mut self, strip: Strip, text: &str) {
        if strip.strip_start() {
            let kept = self.out.trim_end().len();
            self.out.truncate(kept);
        }
        self.strip_next = false;
        self.out.push_str(text);
        self.strip_next = strip.strip_end();
    }

    fn nested(
        &mut self,
        write: impl FnOnce(&mut Self) -> Result<(), Error>,
    ) -> Result<(), Error> {
        self.depth += 1;
        let result = write(self);
        self.depth -= 1;
        result
    }

    fn finish(self) -> String {
        self.out
    }
}

/// Remove up to `indent` leading spaces from each line that starts inside `text`.
fn dedent_lines(text: &str, indent: usize, at_line_start: bool) -> String {
    let mut out = String::with_capacity(text.len());
    for (index, line) in text.split_inclusive('\n').enumerate() {
        if index == 0 && !at_line_start {
            out.push_str(line);
            continue;
        }
        let leading = line
            .bytes()
            .take(indent)
            .take_while(|byte| *byte == b' ' || *byte == b'\t')
            .count();
        out.push_str(&line[leading..]);
    }
    out
}

fn label_text(label: &BlockLabel) -> String {
    match label {
        BlockLabel::Ident(ident) => ident.as_str().to_string(),
        BlockLabel::String(text) => text.value().to_string(),
    }
}

/// Append `body` at `path`, creating intermediate objects. Returns false on a shape clash.
fn insert_block(out: &mut Map<String, Value>, path: &[String], body: Value) -> bool {
    let Some((key, rest)) = path.split_first() else {
        return false;
    };
    if rest.is_empty() {
        return match out.entry(key.clone()) {
            Entry::Vacant(slot) => {
                slot.insert(Value::Array(vec![body]));
                true
            }
            Entry::Occupied(mut slot) => match slot.get_mut() {
                Value::Array(list) => {
                    list.push(body);
                    true
                }
                _ => false,
            },
        };
    }
    match out
        .entry(key.clone())
        .or_insert_with(|| Value::Object(Map::new()))
    {
        Value::Object(inner) => insert_block(inner, rest, body),
        _ => false,
    }
}
