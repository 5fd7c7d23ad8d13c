//! ---
//! fls_section: "14-licensing"
//! fls_subsection: "module"
//! fls_type: "source"
//! fls_scope: "code"
//! fls_description: "License document signing, key material, and validation."
//! fls_version: "v0.0.0-prealpha"
//! fls_owner: "tbd"
//! ---
//! Minimal owned XML tree used for license documents and key blobs.
//!
//! Documents are small and shallow, so the whole tree is materialised in
//! memory. Parsing and pretty printing go through `quick-xml`; the canonical
//! form used for digests is produced here.

use std::fmt::Write as _;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::error::{LicenseError, LicenseResult};

/// Child node of an [`XmlElement`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlNode {
    /// Nested element.
    Element(XmlElement),
    /// Character data.
    Text(String),
}

/// Element with ordered attributes and children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlElement {
    /// Element name.
    pub name: String,
    /// Attributes in document order.
    pub attributes: Vec<(String, String)>,
    /// Child nodes in document order.
    pub children: Vec<XmlNode>,
}

impl XmlElement {
    /// Create an empty element.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Builder form of [`XmlElement::set_attribute`].
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attribute(name, value);
        self
    }

    /// Builder form of [`XmlElement::push_child`].
    #[must_use]
    pub fn with_child(mut self, child: XmlElement) -> Self {
        self.push_child(child);
        self
    }

    /// Append a text node.
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.children.push(XmlNode::Text(text.into()));
        self
    }

    /// Set an attribute, replacing an existing value in place.
    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(key, _)| *key == name) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((name, value)),
        }
    }

    /// Append a child element.
    pub fn push_child(&mut self, child: XmlElement) {
        self.children.push(XmlNode::Element(child));
    }

    /// Look up an attribute value.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Iterate over child elements, skipping text.
    pub fn elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|child| match child {
            XmlNode::Element(element) => Some(element),
            XmlNode::Text(_) => None,
        })
    }

    /// First child element with the given name.
    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.elements().find(|element| element.name == name)
    }

    /// Concatenated, trimmed text content of the direct text children.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for child in &self.children {
            if let XmlNode::Text(text) = child {
                out.push_str(text);
            }
        }
        out.trim().to_owned()
    }

    /// Remove and return the last child element with the given name.
    pub fn take_last_child(&mut self, name: &str) -> Option<XmlElement> {
        let position = self.children.iter().rposition(
            |child| matches!(child, XmlNode::Element(element) if element.name == name),
        )?;
        match self.children.remove(position) {
            XmlNode::Element(element) => Some(element),
            XmlNode::Text(_) => None,
        }
    }

    /// Parse a document and return its root element.
    pub fn parse(input: &str) -> LicenseResult<Self> {
        let mut reader = Reader::from_str(input);
        reader.trim_text(true);
        let mut stack: Vec<XmlElement> = Vec::new();
        loop {
            match reader.read_event().map_err(xml_error)? {
                Event::Start(start) => stack.push(element_from_start(&start)?),
                Event::Empty(start) => {
                    let element = element_from_start(&start)?;
                    if let Some(root) = attach(&mut stack, element) {
                        return Ok(root);
                    }
                }
                Event::End(_) => {
                    let element = stack
                        .pop()
                        .ok_or_else(|| LicenseError::Xml("unbalanced end tag".to_owned()))?;
                    if let Some(root) = attach(&mut stack, element) {
                        return Ok(root);
                    }
                }
                Event::Text(text) => {
                    let value = text.unescape().map_err(xml_error)?;
                    if let Some(parent) = stack.last_mut() {
                        parent.children.push(XmlNode::Text(value.into_owned()));
                    }
                }
                Event::CData(data) => {
                    let value = String::from_utf8(data.into_inner().into_owned())
                        .map_err(|err| LicenseError::Xml(err.to_string()))?;
                    if let Some(parent) = stack.last_mut() {
                        parent.children.push(XmlNode::Text(value));
                    }
                }
                Event::Eof => {
                    return Err(LicenseError::Xml(
                        "document ended before the root element closed".to_owned(),
                    ))
                }
                _ => {}
            }
        }
    }

    /// Serialise as an indented UTF-8 document with an XML declaration.
    pub fn to_pretty_string(&self) -> LicenseResult<String> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))
            .map_err(xml_error)?;
        self.write_events(&mut writer)?;
        String::from_utf8(writer.into_inner()).map_err(|err| LicenseError::Xml(err.to_string()))
    }

    fn write_events(&self, writer: &mut Writer<Vec<u8>>) -> LicenseResult<()> {
        let mut start = BytesStart::new(self.name.as_str());
        for (key, value) in &self.attributes {
            start.push_attribute((key.as_str(), value.as_str()));
        }
        if self.children.is_empty() {
            writer.write_event(Event::Empty(start)).map_err(xml_error)?;
            return Ok(());
        }
        writer.write_event(Event::Start(start)).map_err(xml_error)?;
        for child in &self.children {
            match child {
                XmlNode::Element(element) => element.write_events(writer)?,
                XmlNode::Text(text) => writer
                    .write_event(Event::Text(BytesText::new(text)))
                    .map_err(xml_error)?,
            }
        }
        writer
            .write_event(Event::End(BytesEnd::new(self.name.as_str())))
            .map_err(xml_error)?;
        Ok(())
    }

    /// Canonical serialisation used as digest input.
    ///
    /// Attributes are sorted with namespace declarations first, every element
    /// is written as a start/end pair, text is trimmed and whitespace-only text
    /// is dropped so indentation never changes the digest.
    pub fn canonical(&self) -> String {
        let mut out = String::new();
        self.write_canonical(&mut out);
        out
    }

    fn write_canonical(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.name);
        let mut attributes: Vec<&(String, String)> = self.attributes.iter().collect();
        attributes.sort_by(|(a, _), (b, _)| {
            let a_ns = a == "xmlns" || a.starts_with("xmlns:");
            let b_ns = b == "xmlns" || b.starts_with("xmlns:");
            b_ns.cmp(&a_ns).then_with(|| a.cmp(b))
        });
        for (key, value) in attributes {
            let _ = write!(out, " {key}=\"{}\"", escape_attribute(value));
        }
        out.push('>');
        for child in &self.children {
            match child {
                XmlNode::Element(element) => element.write_canonical(out),
                XmlNode::Text(text) => {
                    let trimmed = text.trim();
                    if !trimmed.is_empty() {
                        out.push_str(&escape_text(trimmed));
                    }
                }
            }
        }
        out.push_str("</");
        out.push_str(&self.name);
        out.push('>');
    }
}

fn attach(stack: &mut Vec<XmlElement>, element: XmlElement) -> Option<XmlElement> {
    match stack.last_mut() {
        Some(parent) => {
            parent.push_child(element);
            None
        }
        None => Some(element),
    }
}

fn element_from_start(start: &BytesStart<'_>) -> LicenseResult<XmlElement> {
    let name = std::str::from_utf8(start.name().as_ref())
        .map_err(|err| LicenseError::Xml(err.to_string()))?
        .to_owned();
    let mut element = XmlElement::new(name);
    for attribute in start.attributes() {
        let attribute = attribute.map_err(|err| LicenseError::Xml(err.to_string()))?;
        let key = std::str::from_utf8(attribute.key.as_ref())
            .map_err(|err| LicenseError::Xml(err.to_string()))?
            .to_owned();
        let value = attribute.unescape_value().map_err(xml_error)?.into_owned();
        element.attributes.push((key, value));
    }
    Ok(element)
}

fn xml_error(err: quick_xml::Error) -> LicenseError {
    LicenseError::Xml(err.to_string())
}

fn escape_attribute(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '"' => out.push_str("&quot;"),
            '\t' => out.push_str("&#x9;"),
            '\n' => out.push_str("&#xA;"),
            '\r' => out.push_str("&#xD;"),
            other => out.push(other),
        }
    }
    out
}

fn escape_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\r' => out.push_str("&#xD;"),
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pretty_output_parses_back_to_same_tree() {
        let doc = XmlElement::new("license")
            .with_attribute("id", "42")
            .with_attribute("note", "a < b & \"c\"")
            .with_child(XmlElement::new("name").with_text("Alice & Bob"));
        let raw = doc.to_pretty_string().unwrap();
        assert!(raw.starts_with("<?xml"));
        assert!(raw.contains('\n'));

        let parsed = XmlElement::parse(&raw).unwrap();
        assert_eq!(parsed.attribute("note"), Some("a < b & \"c\""));
        assert_eq!(parsed.child("name").unwrap().text(), "Alice & Bob");
        assert_eq!(parsed.canonical(), doc.canonical());
    }

    #[test]
    fn canonical_form_sorts_attributes_and_ignores_indentation() {
        let a = XmlElement::parse("<r b=\"2\" a=\"1\">\n  <x/>\n</r>").unwrap();
        let b = XmlElement::parse("<r a=\"1\" b=\"2\"><x></x></r>").unwrap();
        assert_eq!(a.canonical(), "<r a=\"1\" b=\"2\"><x></x></r>");
        assert_eq!(a.canonical(), b.canonical());
    }

    #[test]
    fn namespace_declarations_sort_first() {
        let el = XmlElement::new("Signature")
            .with_attribute("Id", "sig")
            .with_attribute("xmlns", "urn:x");
        assert_eq!(el.canonical(), "<Signature xmlns=\"urn:x\" Id=\"sig\"></Signature>");
    }

    #[test]
    fn take_last_child_removes_only_the_last_match() {
        let mut el = XmlElement::new("r")
            .with_child(XmlElement::new("s").with_text("1"))
            .with_child(XmlElement::new("t"))
            .with_child(XmlElement::new("s").with_text("2"));
        let taken = el.take_last_child("s").unwrap();
        assert_eq!(taken.text(), "2");
        assert_eq!(el.elements().count(), 2);
        assert!(el.take_last_child("missing").is_none());
    }

    #[test]
    fn truncated_document_is_rejected() {
        assert!(XmlElement::parse("<license><name>x</name>").is_err());
    }
}
