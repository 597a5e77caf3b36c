//! An owned, arena-backed XML tree.
//!
//! Nodes live in one `Vec` and refer to each other by [`NodeId`]. Detaching a
//! node only unlinks it from its parent; the slot stays in the arena until the
//! document is dropped. Names are kept as written (`w:t`, `x14ac:dyDescent`),
//! and attribute order is preserved so untouched elements serialize back the
//! way they came in.

use quick_xml::Reader;
use quick_xml::escape::{escape, unescape};
use quick_xml::events::{BytesStart, Event as XmlEvent};

use crate::error::OoxmlError;

const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// The synthetic document node holding the top-level children.
    Document,
    Element {
        name: String,
        attrs: Vec<(String, String)>,
    },
    Text(String),
    CData(String),
}

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

#[derive(Debug, Clone)]
pub struct XmlDocument {
    nodes: Vec<Node>,
}

impl Default for XmlDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl XmlDocument {
    /// An empty document with only the document node.
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                kind: NodeKind::Document,
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    pub fn parse_bytes(bytes: &[u8]) -> Result<Self, OoxmlError> {
        let source = std::str::from_utf8(bytes)?;
        // Some producers write a byte order mark.
        Self::parse(source.trim_start_matches('\u{feff}'))
    }

    /// Parses `source`, keeping whitespace text, elements, and CDATA.
    /// Comments, processing instructions, and the declaration are dropped.
    pub fn parse(source: &str) -> Result<Self, OoxmlError> {
        let mut doc = XmlDocument::new();
        let mut reader = Reader::from_str(source);
        reader.config_mut().trim_text(false);
        let mut buf = Vec::new();
        let mut stack = vec![doc.document()];

        loop {
            let parent = *stack.last().unwrap_or(&doc.document());
            match reader.read_event_into(&mut buf)? {
                XmlEvent::Start(e) => {
                    let (name, attrs) = owned_name_and_attrs(&e)?;
                    let id = doc.create_element(name, attrs);
                    doc.append_child(parent, id);
                    stack.push(id);
                }
                XmlEvent::Empty(e) => {
                    let (name, attrs) = owned_name_and_attrs(&e)?;
                    let id = doc.create_element(name, attrs);
                    doc.append_child(parent, id);
                }
                XmlEvent::Text(e) => {
                    let raw_text = std::str::from_utf8(&e)?;
                    let text = unescape(raw_text)
                        .map_err(|err| OoxmlError::QuickXml(err.into()))?
                        .into_owned();
                    // Whitespace outside the root element is not content.
                    let outside_root = parent == doc.document() && text.trim().is_empty();
                    if !text.is_empty() && !outside_root {
                        let id = doc.create_text(text);
                        doc.append_child(parent, id);
                    }
                }
                XmlEvent::CData(e) => {
                    let text = std::str::from_utf8(&e)?.to_string();
                    let id = doc.push(NodeKind::CData(text));
                    doc.append_child(parent, id);
                }
                XmlEvent::End(_) => {
                    if stack.len() <= 1 {
                        return Err(OoxmlError::Malformed {
                            part: String::new(),
                            message: "unbalanced closing tag".to_string(),
                        });
                    }
                    stack.pop();
                }
                XmlEvent::Eof => break,
                _ => (),
            }
            buf.clear();
        }

        if stack.len() != 1 {
            return Err(OoxmlError::Malformed {
                part: String::new(),
                message: "unclosed element at end of input".to_string(),
            });
        }
        Ok(doc)
    }

    pub fn document(&self) -> NodeId {
        NodeId(0)
    }

    /// The single top-level element, if any.
    pub fn root_element(&self) -> Option<NodeId> {
        self.children(self.document())
            .iter()
            .copied()
            .find(|&id| self.is_element(id))
    }

    fn push(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            kind,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    /// Creates a detached element.
    pub fn create_element(
        &mut self,
        name: impl Into<String>,
        attrs: Vec<(String, String)>,
    ) -> NodeId {
        self.push(NodeKind::Element {
            name: name.into(),
            attrs,
        })
    }

    /// Creates a detached text node.
    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.push(NodeKind::Text(text.into()))
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.0].kind
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.kind(id), NodeKind::Element { .. })
    }

    /// Qualified name of an element, `None` for other nodes.
    pub fn name(&self, id: NodeId) -> Option<&str> {
        match self.kind(id) {
            NodeKind::Element { name, .. } => Some(name),
            _ => None,
        }
    }

    /// True if `id` is an element named exactly `name`.
    pub fn is(&self, id: NodeId, name: &str) -> bool {
        self.name(id) == Some(name)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    /// Element children with the given name, in document order.
    pub fn children_named<'a>(
        &'a self,
        id: NodeId,
        name: &'a str,
    ) -> impl Iterator<Item = NodeId> + 'a {
        self.children(id)
            .iter()
            .copied()
            .filter(move |&c| self.is(c, name))
    }

    pub fn first_child_named(&self, id: NodeId, name: &str) -> Option<NodeId> {
        self.children_named(id, name).next()
    }

    /// All nodes below `id` in document order, `id` excluded.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).iter().rev().copied());
        }
        out
    }

    /// Descendant elements named `name`, in document order.
    pub fn descendants_named(&self, id: NodeId, name: &str) -> Vec<NodeId> {
        self.descendants(id)
            .into_iter()
            .filter(|&d| self.is(d, name))
            .collect()
    }

    /// Nearest ancestor element named `name`.
    pub fn ancestor_named(&self, id: NodeId, name: &str) -> Option<NodeId> {
        let mut current = self.parent(id);
        while let Some(p) = current {
            if self.is(p, name) {
                return Some(p);
            }
            current = self.parent(p);
        }
        None
    }

    pub fn attr(&self, id: NodeId, key: &str) -> Option<&str> {
        match self.kind(id) {
            NodeKind::Element { attrs, .. } => attrs
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str()),
            _ => None,
        }
    }

    /// Sets or replaces an attribute, keeping its position if it existed.
    pub fn set_attr(&mut self, id: NodeId, key: &str, value: impl Into<String>) {
        if let NodeKind::Element { attrs, .. } = &mut self.nodes[id.0].kind {
            let value = value.into();
            match attrs.iter_mut().find(|(k, _)| k == key) {
                Some(slot) => slot.1 = value,
                None => attrs.push((key.to_string(), value)),
            }
        }
    }

    pub fn remove_attr(&mut self, id: NodeId, key: &str) -> Option<String> {
        if let NodeKind::Element { attrs, .. } = &mut self.nodes[id.0].kind {
            let pos = attrs.iter().position(|(k, _)| k == key)?;
            return Some(attrs.remove(pos).1);
        }
        None
    }

    /// Concatenated text and CDATA below `id`.
    pub fn text(&self, id: NodeId) -> String {
        let mut out = String::new();
        match self.kind(id) {
            NodeKind::Text(t) | NodeKind::CData(t) => out.push_str(t),
            _ => {
                for d in self.descendants(id) {
                    if let NodeKind::Text(t) | NodeKind::CData(t) = self.kind(d) {
                        out.push_str(t);
                    }
                }
            }
        }
        out
    }

    /// Replaces all children of `id` with one text node.
    pub fn set_text(&mut self, id: NodeId, text: impl Into<String>) {
        self.clear_children(id);
        let t = self.create_text(text);
        self.append_child(id, t);
    }

    pub fn clear_children(&mut self, id: NodeId) {
        let old = std::mem::take(&mut self.nodes[id.0].children);
        for c in old {
            self.nodes[c.0].parent = None;
        }
    }

    /// Appends a detached node as the last child of `parent`.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    /// Inserts `child` at `index` among `parent`'s children (clamped to the end).
    pub fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) {
        self.detach(child);
        let children = &mut self.nodes[parent.0].children;
        let index = index.min(children.len());
        children.insert(index, child);
        self.nodes[child.0].parent = Some(parent);
    }

    /// Inserts `new` right after `sibling`. Does nothing if `sibling` is detached.
    pub fn insert_after(&mut self, sibling: NodeId, new: NodeId) {
        if let Some(parent) = self.parent(sibling)
            && let Some(pos) = self.index_in_parent(sibling)
        {
            self.insert_child(parent, pos + 1, new);
        }
    }

    pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|&c| c == id)
    }

    /// Unlinks `id` from its parent. The node and its subtree stay usable.
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id.0].parent.take() {
            self.nodes[parent.0].children.retain(|&c| c != id);
        }
    }

    /// Copies the subtree at `id` into new detached nodes.
    pub fn deep_clone(&mut self, id: NodeId) -> NodeId {
        let kind = self.kind(id).clone();
        let copy = self.push(kind);
        let children = self.children(id).to_vec();
        for c in children {
            let cc = self.deep_clone(c);
            self.append_child(copy, cc);
        }
        copy
    }

    /// Serializes the whole document with a standard declaration.
    pub fn to_xml_string(&self) -> String {
        let mut out = String::with_capacity(self.nodes.len() * 16);
        out.push_str(XML_DECLARATION);
        out.push_str("\r\n");
        for &c in self.children(self.document()) {
            self.write_node(c, &mut out);
        }
        out
    }

    /// Serializes the subtree at `id` without a declaration.
    pub fn node_to_string(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_node(id, &mut out);
        out
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.to_xml_string().into_bytes()
    }

    fn write_node(&self, id: NodeId, out: &mut String) {
        match self.kind(id) {
            NodeKind::Document => {
                for &c in self.children(id) {
                    self.write_node(c, out);
                }
            }
            NodeKind::Text(t) => out.push_str(&escape(t.as_str())),
            NodeKind::CData(t) => {
                out.push_str("<![CDATA[");
                out.push_str(t);
                out.push_str("]]>");
            }
            NodeKind::Element { name, attrs } => {
                out.push('<');
                out.push_str(name);
                for (k, v) in attrs {
                    out.push(' ');
                    out.push_str(k);
                    out.push_str("=\"");
                    out.push_str(&escape(v.as_str()));
                    out.push('"');
                }
                let children = self.children(id);
                if children.is_empty() {
                    out.push_str("/>");
                } else {
                    out.push('>');
                    for &c in children {
                        self.write_node(c, out);
                    }
                    out.push_str("</");
                    out.push_str(name);
                    out.push('>');
                }
            }
        }
    }
}

fn owned_name_and_attrs(e: &BytesStart<'_>) -> Result<(String, Vec<(String, String)>), OoxmlError> {
    let name = std::str::from_utf8(e.name().as_ref())?.to_string();
    let mut attrs = Vec::new();
    for attr in e.attributes() {
        let attr = attr?;
        let key = std::str::from_utf8(attr.key.as_ref())?.to_string();
        let value = attr.unescape_value()?.into_owned();
        attrs.push((key, value));
    }
    Ok((name, attrs))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="urn:w"><w:body><w:p><w:r><w:t xml:space="preserve">Hello &amp; {name}</w:t></w:r></w:p><w:p/></w:body></w:document>"#;

    #[test]
    fn test_parse_structure() {
        let doc = XmlDocument::parse(SAMPLE).unwrap();
        let root = doc.root_element().unwrap();
        assert!(doc.is(root, "w:document"));
        assert_eq!(doc.attr(root, "xmlns:w"), Some("urn:w"));

        let ts = doc.descendants_named(root, "w:t");
        assert_eq!(ts.len(), 1);
        assert_eq!(doc.text(ts[0]), "Hello & {name}");
        assert_eq!(doc.attr(ts[0], "xml:space"), Some("preserve"));
        assert!(doc.ancestor_named(ts[0], "w:body").is_some());
        assert!(doc.ancestor_named(ts[0], "w:tbl").is_none());
    }

    #[test]
    fn test_serialize_escapes_and_keeps_empty_elements() {
        let doc = XmlDocument::parse(SAMPLE).unwrap();
        let xml = doc.to_xml_string();
        assert!(xml.starts_with(XML_DECLARATION));
        assert!(xml.contains("Hello &amp; {name}"));
        assert!(xml.contains("<w:p/>"));

        let again = XmlDocument::parse(&xml).unwrap();
        assert_eq!(again.to_xml_string(), xml);
    }

    #[test]
    fn test_set_text_and_attrs() {
        let mut doc = XmlDocument::parse("<a><b x=\"1\">old<c/></b></a>").unwrap();
        let root = doc.root_element().unwrap();
        let b = doc.first_child_named(root, "b").unwrap();
        doc.set_text(b, "<new>");
        doc.set_attr(b, "x", "2");
        doc.set_attr(b, "y", "\"q\"");
        assert_eq!(doc.remove_attr(b, "missing"), None);
        assert_eq!(
            doc.node_to_string(root),
            "<a><b x=\"2\" y=\"&quot;q&quot;\">&lt;new&gt;</b></a>"
        );
    }

    #[test]
    fn test_clone_insert_and_detach() {
        let mut doc = XmlDocument::parse("<rows><row r=\"1\"><c/></row><row r=\"2\"/></rows>").unwrap();
        let root = doc.root_element().unwrap();
        let first = doc.children(root)[0];
        let copy = doc.deep_clone(first);
        doc.set_attr(copy, "r", "9");
        doc.insert_after(first, copy);
        assert_eq!(
            doc.node_to_string(root),
            "<rows><row r=\"1\"><c/></row><row r=\"9\"><c/></row><row r=\"2\"/></rows>"
        );

        doc.detach(first);
        assert_eq!(doc.children(root).len(), 2);
        assert_eq!(doc.index_in_parent(copy), Some(0));
        assert_eq!(doc.parent(first), None);
    }

    #[test]
    fn test_cdata_and_whitespace_preserved() {
        let doc = XmlDocument::parse("<a>  <b><![CDATA[x < y]]></b>\n</a>").unwrap();
        assert_eq!(doc.node_to_string(doc.root_element().unwrap()), "<a>  <b><![CDATA[x < y]]></b>\n</a>");
    }

    #[test]
    fn test_unbalanced_input_is_error() {
        assert!(XmlDocument::parse("<a><b></a>").is_err());
        assert!(XmlDocument::parse("<a>").is_err());
    }
}
