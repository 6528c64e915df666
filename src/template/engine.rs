//! Handlebars-flavoured renderer for notification templates.
//!
//! Supported markers:
//!
//! - `{{#if name}}...{{/if}}` keeps its body when `name` is truthy in the
//!   top-level context.
//! - `{{#each name}}...{{/each}}` repeats its body once per element of the
//!   array `name`; element fields shadow top-level keys and `{{@index}}`
//!   is the 1-based position.
//! - `{{key}}` is replaced by the value of `key`. Unknown keys are left as
//!   written; `null` renders as the empty string.
//!
//! Templates are parsed into a tree once, so blocks may nest and values
//! substituted into the output are never scanned for markers again.
//! Unbalanced markers are kept as literal text.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::TemplateError;

pub type Context = Map<String, Value>;

static TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{(?:#(if|each)\s+(\w+)|/(if|each)|(@index)|(\w+))\}\}")
        .expect("token pattern is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockKind {
    If,
    Each,
}

impl BlockKind {
    fn from_tag(tag: &str) -> Self {
        if tag == "if" {
            BlockKind::If
        } else {
            BlockKind::Each
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Text(String),
    Var { name: String, raw: String },
    Index { raw: String },
    Block {
        kind: BlockKind,
        name: String,
        body: Vec<Node>,
    },
}

struct Frame {
    open: Option<(BlockKind, String, String)>,
    nodes: Vec<Node>,
}

impl Frame {
    fn root() -> Self {
        Self {
            open: None,
            nodes: Vec::new(),
        }
    }

    fn push_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if let Some(Node::Text(last)) = self.nodes.last_mut() {
            last.push_str(text);
        } else {
            self.nodes.push(Node::Text(text.to_string()));
        }
    }

    /// Turns an unclosed block back into literal text followed by its body.
    fn flatten_into(self, parent: &mut Frame) {
        if let Some((_, _, raw)) = self.open {
            parent.push_text(&raw);
        }
        for node in self.nodes {
            match node {
                Node::Text(text) => parent.push_text(&text),
                other => parent.nodes.push(other),
            }
        }
    }
}

/// A parsed template, reusable across renders.
#[derive(Debug, Clone)]
pub struct Template {
    nodes: Vec<Node>,
}

impl Template {
    pub fn parse(source: &str) -> Self {
        let mut stack = vec![Frame::root()];
        let mut cursor = 0;

        for caps in TOKEN_RE.captures_iter(source) {
            let Some(whole) = caps.get(0) else {
                continue;
            };
            let raw = whole.as_str();
            top(&mut stack).push_text(&source[cursor..whole.start()]);
            cursor = whole.end();

            if let (Some(tag), Some(name)) = (caps.get(1), caps.get(2)) {
                stack.push(Frame {
                    open: Some((
                        BlockKind::from_tag(tag.as_str()),
                        name.as_str().to_string(),
                        raw.to_string(),
                    )),
                    nodes: Vec::new(),
                });
            } else if let Some(tag) = caps.get(3) {
                close_block(&mut stack, BlockKind::from_tag(tag.as_str()), raw);
            } else if caps.get(4).is_some() {
                top(&mut stack).nodes.push(Node::Index {
                    raw: raw.to_string(),
                });
            } else if let Some(name) = caps.get(5) {
                top(&mut stack).nodes.push(Node::Var {
                    name: name.as_str().to_string(),
                    raw: raw.to_string(),
                });
            }
        }
        top(&mut stack).push_text(&source[cursor..]);

        while stack.len() > 1 {
            if let Some(frame) = stack.pop() {
                frame.flatten_into(top(&mut stack));
            }
        }

        Self {
            nodes: stack.pop().map(|f| f.nodes).unwrap_or_default(),
        }
    }

    pub fn render(&self, context: &Context) -> String {
        let mut out = String::new();
        render_nodes(&self.nodes, context, &[], None, &mut out);
        out
    }
}

fn top(stack: &mut [Frame]) -> &mut Frame {
    // The root frame is never popped while parsing.
    let last = stack.len() - 1;
    &mut stack[last]
}

fn close_block(stack: &mut Vec<Frame>, kind: BlockKind, raw: &str) {
    let Some(pos) = stack
        .iter()
        .rposition(|f| matches!(&f.open, Some((k, _, _)) if *k == kind))
    else {
        top(stack).push_text(raw);
        return;
    };

    // Anything opened after the block we are closing was never closed.
    while stack.len() > pos + 1 {
        if let Some(frame) = stack.pop() {
            frame.flatten_into(top(stack));
        }
    }

    if let Some(Frame {
        open: Some((kind, name, _)),
        nodes,
    }) = stack.pop()
    {
        top(stack).nodes.push(Node::Block {
            kind,
            name,
            body: nodes,
        });
    }
}

fn lookup<'a>(name: &str, root: &'a Context, scopes: &[&'a Context]) -> Option<&'a Value> {
    scopes
        .iter()
        .rev()
        .find_map(|scope| scope.get(name))
        .or_else(|| root.get(name))
}

fn render_nodes(
    nodes: &[Node],
    root: &Context,
    scopes: &[&Context],
    index: Option<usize>,
    out: &mut String,
) {
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Var { name, raw } => match lookup(name, root, scopes) {
                Some(value) => out.push_str(&coerce(value)),
                None => out.push_str(raw),
            },
            Node::Index { raw } => match index {
                Some(i) => out.push_str(&(i + 1).to_string()),
                None => out.push_str(raw),
            },
            Node::Block {
                kind: BlockKind::If,
                name,
                body,
            } => {
                if root.get(name).is_some_and(is_truthy) {
                    render_nodes(body, root, scopes, index, out);
                }
            }
            Node::Block {
                kind: BlockKind::Each,
                name,
                body,
            } => {
                let Some(Value::Array(items)) = lookup(name, root, scopes) else {
                    continue;
                };
                let empty = Context::new();
                for (i, item) in items.iter().enumerate() {
                    let scope = item.as_object().unwrap_or(&empty);
                    let mut inner = scopes.to_vec();
                    inner.push(scope);
                    render_nodes(body, root, &inner, Some(i), out);
                }
            }
        }
    }
}

/// `null`, `false`, `0` and `""` are falsy; everything else is truthy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

pub fn coerce(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => match (n.as_i64(), n.as_u64(), n.as_f64()) {
            (Some(i), _, _) => i.to_string(),
            (_, Some(u), _) => u.to_string(),
            (_, _, Some(f)) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
            _ => n.to_string(),
        },
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(coerce).collect::<Vec<_>>().join(","),
        Value::Object(_) => value.to_string(),
    }
}

/// Renders `source` against `context` in one go.
pub fn render(source: &str, context: &Context) -> String {
    Template::parse(source).render(context)
}

/// Serializes a typed payload into a render context.
pub fn to_context<T: Serialize>(payload: &T) -> Result<Context, TemplateError> {
    match serde_json::to_value(payload) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(TemplateError::Context(format!("got {}", other))),
        Err(e) => Err(TemplateError::Context(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx(value: Value) -> Context {
        match value {
            Value::Object(map) => map,
            _ => panic!("context must be an object"),
        }
    }

    #[test]
    fn substitutes_scalars() {
        let out = render("Hello {{name}}!", &ctx(json!({"name": "Ada"})));
        assert_eq!(out, "Hello Ada!");
    }

    #[test]
    fn rendered_output_is_stable() {
        let once = render("Hello {{name}}!", &ctx(json!({"name": "Ada"})));
        assert_eq!(render(&once, &Context::new()), once);
    }

    #[test]
    fn conditional_blocks() {
        let template = "A{{#if flag}}B{{/if}}C";
        assert_eq!(render(template, &ctx(json!({"flag": true}))), "ABC");
        assert_eq!(render(template, &ctx(json!({"flag": false}))), "AC");
        assert_eq!(render(template, &Context::new()), "AC");
        assert_eq!(render(template, &ctx(json!({"flag": 0}))), "AC");
        assert_eq!(render(template, &ctx(json!({"flag": ""}))), "AC");
        assert_eq!(render(template, &ctx(json!({"flag": null}))), "AC");
        assert_eq!(render(template, &ctx(json!({"flag": "yes"}))), "ABC");
        assert_eq!(render(template, &ctx(json!({"flag": []}))), "ABC");
    }

    #[test]
    fn loop_blocks() {
        let template = "{{#each items}}{{@index}}:{{name}};{{/each}}";
        let context = ctx(json!({"items": [{"name": "x"}, {"name": "y"}]}));
        assert_eq!(render(template, &context), "1:x;2:y;");
    }

    #[test]
    fn loop_over_missing_or_scalar_is_empty() {
        let template = "[{{#each items}}{{name}}{{/each}}]";
        assert_eq!(render(template, &Context::new()), "[]");
        assert_eq!(render(template, &ctx(json!({"items": "nope"}))), "[]");
    }

    #[test]
    fn loop_falls_back_to_top_level_keys() {
        let template = "{{#each items}}{{name}}@{{venue}} {{/each}}";
        let context = ctx(json!({
            "venue": "Hall",
            "items": [{"name": "a"}, {"name": "b", "venue": null}]
        }));
        assert_eq!(render(template, &context), "a@Hall b@ ");
    }

    #[test]
    fn unknown_placeholders_stay_literal() {
        let out = render("{{known}} {{unknown}} {{@index}}", &ctx(json!({"known": 1})));
        assert_eq!(out, "1 {{unknown}} {{@index}}");
    }

    #[test]
    fn null_renders_empty() {
        assert_eq!(render("[{{gone}}]", &ctx(json!({"gone": null}))), "[]");
    }

    #[test]
    fn substituted_values_are_not_rescanned() {
        let context = ctx(json!({"a": "{{b}}", "b": "oops"}));
        assert_eq!(render("{{a}}", &context), "{{b}}");
    }

    #[test]
    fn nested_conditionals_resolve_by_structure() {
        let template = "{{#if outer}}O{{#if inner}}I{{/if}}o{{/if}}.";
        assert_eq!(
            render(template, &ctx(json!({"outer": true, "inner": true}))),
            "OIo."
        );
        assert_eq!(
            render(template, &ctx(json!({"outer": true, "inner": false}))),
            "Oo."
        );
        assert_eq!(
            render(template, &ctx(json!({"outer": false, "inner": true}))),
            "."
        );
    }

    #[test]
    fn conditional_inside_loop_reads_top_level() {
        let template = "{{#each items}}{{name}}{{#if show}}!{{/if}}{{/each}}";
        let context = ctx(json!({
            "show": true,
            "items": [{"name": "a", "show": false}]
        }));
        assert_eq!(render(template, &context), "a!");
    }

    #[test]
    fn unbalanced_markers_are_literal() {
        assert_eq!(render("a{{/if}}b", &Context::new()), "a{{/if}}b");
        assert_eq!(
            render("{{#if x}}a{{name}}", &ctx(json!({"name": "n"}))),
            "{{#if x}}an"
        );
        assert_eq!(
            render("{{#if x}}a{{#each y}}b{{/if}}", &ctx(json!({"x": true}))),
            "a{{#each y}}b"
        );
    }

    #[test]
    fn coerces_numbers_like_display_copy() {
        let context = ctx(json!({"i": 3, "f": 2.0, "g": 2.5, "list": ["a", 1]}));
        assert_eq!(render("{{i}} {{f}} {{g}} {{list}}", &context), "3 2 2.5 a,1");
    }

    #[test]
    fn typed_payload_becomes_context() {
        #[derive(Serialize)]
        struct Payload {
            name: &'static str,
            count: u32,
        }
        let context = to_context(&Payload { name: "Ada", count: 2 }).unwrap();
        assert_eq!(render("{{name}}x{{count}}", &context), "Adax2");
        assert!(to_context(&5).is_err());
    }
}
