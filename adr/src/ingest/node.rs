// SPDX-License-Identifier: Apache-2.0
// Copyright 2024, 2026 Joe Pearson

//! The open-element node stack the dispatcher in [`super`] drives.
//!
//! Every element on the stack is one of three kinds: a text leaf, a link
//! leaf (a UUID pulled from an `xlink:href` attribute), or a structured node
//! that integrates its children through [`Node::on_subelement`]. An unknown
//! element becomes an [`IgnoreNode`], so the dispatcher never has to special
//! case schema it doesn't model.

use std::any::Any;

use crate::error::Error;
use crate::id::Uuid;

/// What a node contributes to its parent once its closing tag is reached.
///
/// Matching on this enum at the parent *is* the double dispatch the
/// factory table sets up: the parent decides how to integrate a child from
/// its element name plus which of these variants the child produced.
pub enum Value {
    Text(String),
    Link(Uuid),
    Node(Box<dyn Any>),
    Ignore,
}

impl Value {
    pub fn into_text(self) -> Option<String> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn into_link(self) -> Option<Uuid> {
        match self {
            Value::Link(uuid) => Some(uuid),
            _ => None,
        }
    }

    pub fn downcast<T: 'static>(self) -> Option<T> {
        match self {
            Value::Node(any) => any.downcast::<T>().ok().map(|b| *b),
            _ => None,
        }
    }
}

/// One open element. `on_text`/`on_attribute` accumulate as the parser
/// scans the element's content; `on_subelement` fires once per closed
/// child, in document order; `finish` is called exactly once, when this
/// node's own closing tag is reached.
pub trait Node {
    fn on_text(&mut self, _text: &str) {}

    fn on_attribute(&mut self, _name: &str, _value: &str) {}

    fn on_subelement(&mut self, _name: &str, _value: Value) -> Result<(), Error> {
        Ok(())
    }

    fn finish(self: Box<Self>) -> Value;
}

/// A leaf that accumulates character content, e.g. `aixm:name`.
#[derive(Default)]
pub struct TextNode(String);

impl Node for TextNode {
    fn on_text(&mut self, text: &str) {
        self.0.push_str(text);
    }

    fn finish(self: Box<Self>) -> Value {
        Value::Text(self.0)
    }
}

/// A leaf carrying a UUID extracted from an `xlink:href` attribute, e.g.
/// `<aixm:usedRunway xlink:href="urn:uuid:...">`.
#[derive(Default)]
pub struct LinkNode(Uuid);

impl Node for LinkNode {
    fn on_attribute(&mut self, name: &str, value: &str) {
        if name == "href" {
            self.0 = parse_href(value);
        }
    }

    fn finish(self: Box<Self>) -> Value {
        Value::Link(self.0)
    }
}

/// Strips the `urn:uuid:` scheme (or a bare `#fragment`) an AIXM xlink href
/// carries, leaving the canonical UUID string.
pub fn parse_href(value: &str) -> Uuid {
    let raw = value.rsplit(':').next().unwrap_or(value).trim_start_matches('#');
    raw.parse().unwrap_or(Uuid::NIL)
}

/// A measurement with an optional `uom` attribute, e.g. `aixm:fieldElevation
/// uom="M"`.
#[derive(Default)]
pub struct MeasureNode {
    text: String,
    uom: Option<String>,
}

impl Node for MeasureNode {
    fn on_text(&mut self, text: &str) {
        self.text.push_str(text);
    }

    fn on_attribute(&mut self, name: &str, value: &str) {
        if name == "uom" {
            self.uom = Some(value.to_string());
        }
    }

    fn finish(self: Box<Self>) -> Value {
        Value::Node(Box::new(Measure {
            text: self.text,
            uom: self.uom,
        }))
    }
}

pub struct Measure {
    pub text: String,
    pub uom: Option<String>,
}

impl Measure {
    pub fn feet(&self) -> Option<i32> {
        let uom = self.uom.as_deref().unwrap_or("FT");
        match self.text.trim() {
            "GND" | "SFC" => Some(0),
            _ => {
                let raw: f64 = self.text.trim().parse().ok()?;
                let factor = super::uom::alt_factor(uom);
                Some((raw * factor).round() as i32)
            }
        }
    }
}

/// A `gml:TimePeriod` endpoint, e.g. `gml:beginPosition` / `gml:endPosition`,
/// which may carry `indeterminatePosition="unknown"` instead of a literal
/// timestamp.
#[derive(Default)]
pub struct TimeBoundNode {
    text: String,
    indeterminate: Option<String>,
}

impl Node for TimeBoundNode {
    fn on_text(&mut self, text: &str) {
        self.text.push_str(text);
    }

    fn on_attribute(&mut self, name: &str, value: &str) {
        if name == "indeterminatePosition" {
            self.indeterminate = Some(value.to_string());
        }
    }

    fn finish(self: Box<Self>) -> Value {
        Value::Node(Box::new(TimeBound {
            text: self.text,
            indeterminate: self.indeterminate,
        }))
    }
}

pub struct TimeBound {
    pub text: String,
    pub indeterminate: Option<String>,
}

/// A container whose own element carries no data; it simply forwards the
/// value of its single structured child, e.g. `aixm:timeSlice`,
/// `gml:validTime`, `gml:exterior`.
#[derive(Default)]
pub struct PassthroughNode(Option<Value>);

impl Node for PassthroughNode {
    fn on_subelement(&mut self, _name: &str, value: Value) -> Result<(), Error> {
        self.0 = Some(value);
        Ok(())
    }

    fn finish(self: Box<Self>) -> Value {
        self.0.unwrap_or(Value::Ignore)
    }
}

/// Swallows an unrecognised element: children are dropped, but the element
/// itself is still balanced against the node stack.
pub struct IgnoreNode;

impl Node for IgnoreNode {
    fn finish(self: Box<Self>) -> Value {
        Value::Ignore
    }
}
