//! XML → [`Document`].
//!
//! Pull parser over `quick-xml` events. Known node blocks (`properties`,
//! `values`, `children`) are modelled; any other child element of a node is
//! captured as raw XML and written back untouched.

use std::borrow::Cow;
use std::sync::Arc;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use super::CodecError;
use crate::document::{
    Color, Document, DocumentMeta, Frame, Node, Property, PropertyValue, RawBlock,
    ValueDescriptor,
};

pub fn parse(text: &str) -> Result<Document, CodecError> {
    Parser::new(text).document()
}

struct Parser<'i> {
    input: &'i str,
    reader: Reader<&'i [u8]>,
    /// Byte offset where the most recently returned event starts.
    event_start: usize,
}

impl<'i> Parser<'i> {
    fn new(input: &'i str) -> Self {
        Self {
            input,
            reader: Reader::from_str(input),
            event_start: 0,
        }
    }

    fn position(&self) -> usize {
        self.reader.buffer_position() as usize
    }

    fn raw_event(&mut self) -> Result<Event<'i>, CodecError> {
        self.event_start = self.position();
        self.reader.read_event().map_err(|source| CodecError::Xml {
            position: self.reader.error_position() as u64,
            source,
        })
    }

    /// Next structural event: whitespace, comments and PIs are skipped.
    fn next(&mut self) -> Result<Event<'i>, CodecError> {
        loop {
            match self.raw_event()? {
                Event::Text(t) if t.iter().all(u8::is_ascii_whitespace) => continue,
                Event::Comment(_) | Event::PI(_) | Event::DocType(_) => continue,
                Event::Eof => return Err(CodecError::structure("unexpected end of document")),
                event => return Ok(event),
            }
        }
    }

    fn document(mut self) -> Result<Document, CodecError> {
        let mut meta = DocumentMeta::default();
        let mut root = None;

        loop {
            let event = match self.raw_event()? {
                Event::Eof => break,
                event => event,
            };
            match event {
                Event::Decl(decl) => {
                    let version = decl
                        .version()
                        .map_err(|e| CodecError::structure(e.to_string()))?;
                    meta.xml_version = utf8(&version)?.into_owned();
                    if let Some(encoding) = decl.encoding() {
                        let encoding = encoding.map_err(|e| CodecError::structure(e.to_string()))?;
                        meta.encoding = utf8(&encoding)?.into_owned();
                    }
                }
                Event::Start(e) if e.name().as_ref() == b"lexml" => {
                    if let Some(version) = attribute(&e, b"version")? {
                        meta.lexml_version = version;
                    }
                    root = Some(self.lexml()?);
                }
                Event::Text(t) if t.iter().all(u8::is_ascii_whitespace) => {}
                Event::Comment(_) | Event::PI(_) | Event::DocType(_) => {}
                other => {
                    return Err(CodecError::structure(format!(
                        "unexpected top-level {other:?}"
                    )));
                }
            }
        }

        let root = root.ok_or_else(|| CodecError::structure("missing <lexml> element"))?;
        Ok(Document {
            meta,
            root: Arc::new(root),
        })
    }

    fn lexml(&mut self) -> Result<Node, CodecError> {
        let mut root = None;
        loop {
            match self.next()? {
                Event::Start(e) if e.name().as_ref() == b"node" && root.is_none() => {
                    root = Some(self.node(&e)?);
                }
                Event::End(e) if e.name().as_ref() == b"lexml" => break,
                other => return Err(unexpected("lexml", &other)),
            }
        }
        root.ok_or_else(|| CodecError::structure("<lexml> has no root <node>"))
    }

    fn node(&mut self, start: &BytesStart<'_>) -> Result<Node, CodecError> {
        let id = attribute(start, b"ID")?.unwrap_or_default();
        let kind = attribute(start, b"type")?
            .ok_or_else(|| CodecError::structure(format!("node `{id}` has no type")))?;
        let mut node = Node::new(id, kind);

        loop {
            match self.next()? {
                Event::Start(e) => match e.name().as_ref() {
                    b"properties" => node.properties = self.properties()?,
                    b"values" => node.values = self.values()?,
                    b"children" => node.children = Some(self.children()?),
                    _ => {
                        let start = self.event_start;
                        self.reader
                            .read_to_end(e.name())
                            .map_err(|source| CodecError::Xml {
                                position: self.reader.error_position() as u64,
                                source,
                            })?;
                        let raw = &self.input[start..self.position()];
                        node.extra.push(RawBlock(raw.to_string()));
                    }
                },
                Event::Empty(e) => match e.name().as_ref() {
                    b"properties" | b"values" => {}
                    b"children" => node.children = Some(Vec::new()),
                    _ => {
                        let raw = &self.input[self.event_start..self.position()];
                        node.extra.push(RawBlock(raw.to_string()));
                    }
                },
                Event::End(e) if e.name().as_ref() == b"node" => break,
                other => return Err(unexpected("node", &other)),
            }
        }

        Ok(node)
    }

    fn properties(&mut self) -> Result<Vec<Property>, CodecError> {
        let mut properties = Vec::new();
        loop {
            match self.next()? {
                Event::Start(e) if e.name().as_ref() == b"property" => {
                    let code = attribute(&e, b"type")?.unwrap_or_else(|| "s".to_string());
                    properties.push(self.property(code)?);
                }
                Event::End(e) if e.name().as_ref() == b"properties" => break,
                other => return Err(unexpected("properties", &other)),
            }
        }
        Ok(properties)
    }

    fn property(&mut self, code: String) -> Result<Property, CodecError> {
        let mut key = None;
        let mut value = None;

        loop {
            match self.next()? {
                Event::Start(e) => match e.name().as_ref() {
                    b"key" => key = Some(self.text_until(b"key")?),
                    b"value" => value = Some(self.property_value(&code)?),
                    other => {
                        return Err(CodecError::structure(format!(
                            "unexpected <{}> in property",
                            String::from_utf8_lossy(other)
                        )));
                    }
                },
                Event::Empty(e) if e.name().as_ref() == b"value" => {
                    value = Some(match code.as_str() {
                        "b" | "s" | "i" | "f" => scalar(&code, "")?,
                        _ => PropertyValue::Other {
                            code: code.clone(),
                            raw: String::new(),
                        },
                    });
                }
                Event::End(e) if e.name().as_ref() == b"property" => break,
                other => return Err(unexpected("property", &other)),
            }
        }

        let key = key.ok_or_else(|| CodecError::structure("property without key"))?;
        let value = value.ok_or_else(|| CodecError::structure(format!("property `{key}` has no value")))?;
        Ok(Property { key, value })
    }

    fn property_value(&mut self, code: &str) -> Result<PropertyValue, CodecError> {
        match code {
            "c" => {
                let [r, g, b, a] = self.components(["r", "g", "b", "a"])?;
                Ok(PropertyValue::Color(Color { r, g, b, a }))
            }
            "r" => {
                let [x, y, w, h] = self.components(["x", "y", "w", "h"])?;
                Ok(PropertyValue::Frame(Frame { x, y, w, h }))
            }
            "b" | "s" | "i" | "f" => {
                let text = self.text_until(b"value")?;
                scalar(code, &text)
            }
            _ => {
                let span = self
                    .reader
                    .read_to_end(quick_xml::name::QName(b"value"))
                    .map_err(|source| CodecError::Xml {
                        position: self.reader.error_position() as u64,
                        source,
                    })?;
                let raw = &self.input[span.start as usize..span.end as usize];
                Ok(PropertyValue::Other {
                    code: code.to_string(),
                    raw: raw.to_string(),
                })
            }
        }
    }

    /// Named numeric children of a compound `<value>`, in any order.
    fn components<const N: usize>(&mut self, names: [&str; N]) -> Result<[f64; N], CodecError> {
        let mut out = [0.0; N];
        loop {
            match self.next()? {
                Event::Start(e) => {
                    let name = utf8(e.name().as_ref())?.into_owned();
                    let text = self.text_until(name.as_bytes())?;
                    match names.iter().position(|n| *n == name) {
                        Some(i) => out[i] = number(&name, &text)?,
                        None => crate::debug!("codec"; "ignoring component <{}>", name),
                    }
                }
                Event::End(e) if e.name().as_ref() == b"value" => break,
                other => return Err(unexpected("value", &other)),
            }
        }
        Ok(out)
    }

    fn values(&mut self) -> Result<Vec<ValueDescriptor>, CodecError> {
        let mut values = Vec::new();
        loop {
            match self.next()? {
                Event::Start(e) if e.name().as_ref() == b"value" => values.push(self.value()?),
                Event::End(e) if e.name().as_ref() == b"values" => break,
                other => return Err(unexpected("values", &other)),
            }
        }
        Ok(values)
    }

    fn value(&mut self) -> Result<ValueDescriptor, CodecError> {
        let mut value = ValueDescriptor::default();
        loop {
            match self.next()? {
                Event::Start(e) => {
                    let name = utf8(e.name().as_ref())?.into_owned();
                    let text = self.text_until(name.as_bytes())?;
                    match name.as_str() {
                        "key" => value.key = text,
                        "locked" => value.locked = text,
                        "lockedDefaultCurrent" => value.locked_default_current = text,
                        "default" => value.default = text,
                        "defaultPull" => value.default_pull = Some(text),
                        _ => crate::debug!("codec"; "ignoring value field <{}>", name),
                    }
                }
                Event::Empty(e) if e.name().as_ref() == b"defaultPull" => {
                    value.default_pull = Some(String::new());
                }
                Event::Empty(_) => {}
                Event::End(e) if e.name().as_ref() == b"value" => break,
                other => return Err(unexpected("value", &other)),
            }
        }
        Ok(value)
    }

    fn children(&mut self) -> Result<Vec<Arc<Node>>, CodecError> {
        let mut children = Vec::new();
        loop {
            match self.next()? {
                Event::Start(e) if e.name().as_ref() == b"node" => {
                    children.push(Arc::new(self.node(&e)?));
                }
                Event::End(e) if e.name().as_ref() == b"children" => break,
                other => return Err(unexpected("children", &other)),
            }
        }
        Ok(children)
    }

    /// Concatenated character data up to `</end>`. Whitespace is kept.
    fn text_until(&mut self, end: &[u8]) -> Result<String, CodecError> {
        let mut text = String::new();
        loop {
            match self.raw_event()? {
                Event::Text(t) => text.push_str(&utf8(&t)?),
                Event::CData(c) => text.push_str(&utf8(&c)?),
                Event::GeneralRef(r) => push_reference(&mut text, &utf8(&r)?),
                Event::End(e) if e.name().as_ref() == end => return Ok(text),
                Event::Comment(_) => {}
                Event::Eof => return Err(CodecError::structure("unexpected end of document")),
                other => return Err(unexpected(&String::from_utf8_lossy(end), &other)),
            }
        }
    }
}

fn utf8(bytes: &[u8]) -> Result<Cow<'_, str>, CodecError> {
    std::str::from_utf8(bytes)
        .map(Cow::Borrowed)
        .map_err(|e| CodecError::structure(format!("invalid UTF-8: {e}")))
}

fn attribute(start: &BytesStart<'_>, name: &[u8]) -> Result<Option<String>, CodecError> {
    for attr in start.attributes() {
        let attr = attr.map_err(|e| CodecError::structure(format!("bad attribute: {e}")))?;
        if attr.key.as_ref() == name {
            let raw = utf8(&attr.value)?;
            let value = quick_xml::escape::unescape(&raw)
                .map_err(|e| CodecError::structure(format!("bad attribute value: {e}")))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

/// Resolve `&name;` / `&#N;` / `&#xN;` into `text`; unknown entities are kept.
fn push_reference(text: &mut String, name: &str) {
    let resolved = if let Some(hex) = name.strip_prefix("#x") {
        u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
    } else if let Some(dec) = name.strip_prefix('#') {
        dec.parse().ok().and_then(char::from_u32)
    } else {
        match name {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            _ => None,
        }
    };
    match resolved {
        Some(c) => text.push(c),
        None => {
            text.push('&');
            text.push_str(name);
            text.push(';');
        }
    }
}

fn scalar(code: &str, text: &str) -> Result<PropertyValue, CodecError> {
    Ok(match code {
        "b" => PropertyValue::Boolean(matches!(text.trim(), "1" | "true")),
        "i" => PropertyValue::Integer(
            text.trim()
                .parse()
                .map_err(|_| CodecError::structure(format!("invalid integer `{text}`")))?,
        ),
        "f" => PropertyValue::Float(number("float", text)?),
        _ => PropertyValue::String(text.to_string()),
    })
}

fn number(what: &str, text: &str) -> Result<f64, CodecError> {
    text.trim()
        .parse()
        .map_err(|_| CodecError::structure(format!("invalid number for {what}: `{text}`")))
}

fn unexpected(context: &str, event: &Event<'_>) -> CodecError {
    CodecError::structure(format!("unexpected {event:?} in <{context}>"))
}
