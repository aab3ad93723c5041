use std::fs;
use std::path::Path;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use thiserror::Error;

use crate::tree::XmlNode;

/// Errors that can occur while writing XML from an [`XmlNode`] tree.
#[derive(Debug, Error)]
pub enum WriteError {
    /// Failed to serialize XML bytes.
    #[error("failed to write XML: {0}")]
    Xml(#[from] quick_xml::Error),
    /// Serialized bytes were not valid UTF-8.
    #[error("serialized XML is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
    /// Failed to write output file.
    #[error("failed to write XML file: {0}")]
    Io(#[from] std::io::Error),
}

/// Layout options for [`write_with_options`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteOptions {
    /// Spaces per nesting level. Zero writes the whole tree on one line.
    pub indent: usize,
    /// Emit an `<?xml version="1.0" encoding="UTF-8"?>` prologue.
    pub declaration: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            indent: 2,
            declaration: false,
        }
    }
}

/// Serialize an [`XmlNode`] tree into XML bytes.
pub fn write_with_options(node: &XmlNode, opts: WriteOptions) -> Result<Vec<u8>, WriteError> {
    let mut writer = if opts.indent == 0 {
        Writer::new(Vec::new())
    } else {
        Writer::new_with_indent(Vec::new(), b' ', opts.indent)
    };
    if opts.declaration {
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    }
    write_node(&mut writer, node)?;
    Ok(writer.into_inner())
}

/// Serialize an [`XmlNode`] tree into a `String`.
pub fn write_string(node: &XmlNode, opts: WriteOptions) -> Result<String, WriteError> {
    let bytes = write_with_options(node, opts)?;
    Ok(String::from_utf8(bytes)?)
}

/// Serialize an [`XmlNode`] tree and write it to `path`.
pub fn write_file(node: &XmlNode, path: &Path, opts: WriteOptions) -> Result<(), WriteError> {
    let bytes = write_with_options(node, opts)?;
    fs::write(path, bytes)?;
    Ok(())
}

fn write_node(writer: &mut Writer<Vec<u8>>, node: &XmlNode) -> Result<(), quick_xml::Error> {
    let mut start = BytesStart::new(node.tag.as_str());

    // push_attribute escapes all five reserved characters in the value.
    for (key, value) in &node.attributes {
        start.push_attribute((key.as_str(), value.as_str()));
    }

    if node.children.is_empty() && node.text.is_none() {
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    }

    writer.write_event(Event::Start(start))?;

    if let Some(text) = &node.text {
        writer.write_event(Event::Text(BytesText::new(text)))?;
    }

    for child in &node.children {
        write_node(writer, child)?;
    }

    writer.write_event(Event::End(BytesEnd::new(node.tag.as_str())))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{write_string, WriteOptions};
    use crate::tree::XmlNode;

    #[test]
    fn escapes_reserved_characters_in_attributes() {
        let node = XmlNode::new("host").with_attr("name", r#"a<b>&"c'"#);
        let out = write_string(&node, WriteOptions::default()).expect("write");

        assert_eq!(out, r#"<host name="a&lt;b&gt;&amp;&quot;c&apos;"/>"#);
    }

    #[test]
    fn text_children_stay_on_their_element_line() {
        let node = XmlNode::new("service")
            .with_child(XmlNode::new("protocol").with_text("udp"));
        let opts = WriteOptions {
            indent: 4,
            declaration: false,
        };
        let out = write_string(&node, opts).expect("write");

        assert_eq!(out, "<service>\n    <protocol>udp</protocol>\n</service>");
    }

    #[test]
    fn declaration_precedes_root() {
        let opts = WriteOptions {
            indent: 2,
            declaration: true,
        };
        let out = write_string(&XmlNode::new("root"), opts).expect("write");

        assert!(out.starts_with(r#"<?xml version="1.0" encoding="UTF-8"?>"#));
        assert!(out.ends_with("<root/>"));
    }
}
