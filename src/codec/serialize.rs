//! [`Document`] → XML.

use std::io::{Cursor, Write};

use quick_xml::Writer;
use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesStart, BytesText, Event};

use super::CodecError;
use crate::document::{Document, Node, PropertyValue, SCRIPT_KEY, ValueDescriptor};

const CDATA_END: &str = "]]>";

/// How `text` appears in serialized output when it contains no `]]>`.
pub fn cdata(text: &str) -> String {
    format!("<![CDATA[{text}]]>")
}

/// Serialized `key`/`value` pair of a `script` property holding `text`.
///
/// Only meaningful when `text` contains no `]]>`: otherwise the serializer
/// splits the CDATA section and the fragment does not appear verbatim.
pub fn script_fragment(text: &str) -> String {
    format!("<key>{}</key><value>{}</value>", cdata(SCRIPT_KEY), cdata(text))
}

pub fn embeds_verbatim(text: &str) -> bool {
    !text.contains(CDATA_END)
}

pub fn serialize(doc: &Document) -> Result<String, CodecError> {
    let mut w = XmlOut::new();

    w.emit(Event::Decl(BytesDecl::new(
        &doc.meta.xml_version,
        Some(&doc.meta.encoding),
        None,
    )))?;
    w.emit(Event::Start(
        BytesStart::new("lexml").with_attributes([("version", doc.meta.lexml_version.as_str())]),
    ))?;
    w.node(&doc.root)?;
    w.end("lexml")?;

    String::from_utf8(w.writer.into_inner().into_inner())
        .map_err(|e| CodecError::Write(e.to_string()))
}

struct XmlOut {
    writer: Writer<Cursor<Vec<u8>>>,
}

impl XmlOut {
    fn new() -> Self {
        Self {
            writer: Writer::new(Cursor::new(Vec::with_capacity(64 * 1024))),
        }
    }

    fn emit(&mut self, event: Event<'_>) -> Result<(), CodecError> {
        self.writer
            .write_event(event)
            .map_err(|e| CodecError::Write(e.to_string()))
    }

    fn start(&mut self, name: &str) -> Result<(), CodecError> {
        self.emit(Event::Start(BytesStart::new(name)))
    }

    fn end(&mut self, name: &str) -> Result<(), CodecError> {
        self.emit(Event::End(BytesEnd::new(name)))
    }

    fn raw(&mut self, xml: &str) -> Result<(), CodecError> {
        self.writer
            .get_mut()
            .write_all(xml.as_bytes())
            .map_err(|e| CodecError::Write(e.to_string()))
    }

    /// CDATA, split around any `]]>` so the payload survives verbatim.
    fn cdata(&mut self, text: &str) -> Result<(), CodecError> {
        let mut rest = text;
        while let Some(i) = rest.find(CDATA_END) {
            let (head, tail) = rest.split_at(i + 2);
            self.emit(Event::CData(BytesCData::new(head)))?;
            rest = tail;
        }
        self.emit(Event::CData(BytesCData::new(rest)))
    }

    fn text_element(&mut self, name: &str, text: &str) -> Result<(), CodecError> {
        self.start(name)?;
        self.emit(Event::Text(BytesText::new(text)))?;
        self.end(name)
    }

    fn cdata_element(&mut self, name: &str, text: &str) -> Result<(), CodecError> {
        self.start(name)?;
        self.cdata(text)?;
        self.end(name)
    }

    fn node(&mut self, node: &Node) -> Result<(), CodecError> {
        self.emit(Event::Start(BytesStart::new("node").with_attributes([
            ("ID", node.id.as_str()),
            ("type", node.kind.as_str()),
        ])))?;

        self.start("properties")?;
        for property in &node.properties {
            self.emit(Event::Start(
                BytesStart::new("property").with_attributes([("type", property.value.code())]),
            ))?;
            self.cdata_element("key", &property.key)?;
            self.property_value(&property.value)?;
            self.end("property")?;
        }
        self.end("properties")?;

        self.start("values")?;
        for value in &node.values {
            self.value(value)?;
        }
        self.end("values")?;

        for block in &node.extra {
            self.raw(&block.0)?;
        }

        if let Some(children) = &node.children {
            self.start("children")?;
            for child in children {
                self.node(child)?;
            }
            self.end("children")?;
        }

        self.end("node")
    }

    fn property_value(&mut self, value: &PropertyValue) -> Result<(), CodecError> {
        match value {
            PropertyValue::Boolean(b) => self.text_element("value", if *b { "1" } else { "0" }),
            PropertyValue::String(s) => self.cdata_element("value", s),
            PropertyValue::Integer(i) => self.text_element("value", &i.to_string()),
            PropertyValue::Float(f) => self.text_element("value", &f.to_string()),
            PropertyValue::Color(c) => {
                self.start("value")?;
                for (name, v) in [("r", c.r), ("g", c.g), ("b", c.b), ("a", c.a)] {
                    self.text_element(name, &v.to_string())?;
                }
                self.end("value")
            }
            PropertyValue::Frame(r) => {
                self.start("value")?;
                for (name, v) in [("x", r.x), ("y", r.y), ("w", r.w), ("h", r.h)] {
                    self.text_element(name, &v.to_string())?;
                }
                self.end("value")
            }
            PropertyValue::Other { raw, .. } if raw.is_empty() => {
                self.emit(Event::Empty(BytesStart::new("value")))
            }
            PropertyValue::Other { raw, .. } => {
                self.start("value")?;
                self.raw(raw)?;
                self.end("value")
            }
        }
    }

    fn value(&mut self, value: &ValueDescriptor) -> Result<(), CodecError> {
        self.start("value")?;
        self.cdata_element("key", &value.key)?;
        self.text_element("locked", &value.locked)?;
        self.text_element("lockedDefaultCurrent", &value.locked_default_current)?;
        self.cdata_element("default", &value.default)?;
        if let Some(pull) = &value.default_pull {
            self.text_element("defaultPull", pull)?;
        }
        self.end("value")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Node, Property};

    #[test]
    fn test_no_indentation() {
        let root = Node::new("r", "GROUP").with_child(Node::new("c", "LABEL"));
        let text = serialize(&Document::new(root)).unwrap();
        assert!(!text.contains("\n "));
        assert!(text.starts_with("<?xml"));
        assert!(text.contains("<lexml version=\"3\"><node ID=\"r\" type=\"GROUP\">"));
    }

    #[test]
    fn test_attributes_escaped() {
        let root = Node::new("a\"b", "GROUP");
        let text = serialize(&Document::new(root)).unwrap();
        assert!(text.contains("ID=\"a&quot;b\""));
    }

    #[test]
    fn test_script_cdata_form() {
        let root = Node::new("r", "GROUP").with_property(Property::script("x < 1"));
        let text = serialize(&Document::new(root)).unwrap();
        assert!(text.contains(&cdata("x < 1")));
        assert!(text.contains(&script_fragment("x < 1")));
    }

    #[test]
    fn test_embeds_verbatim() {
        assert!(embeds_verbatim("a[1] > 0"));
        assert!(!embeds_verbatim("a[b[1]]>0"));
    }
}
