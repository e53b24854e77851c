//! Nmap XML loading into a generic element tree.

use crate::error::{ReportError, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::path::Path;
use tracing::{debug, info, warn};

/// One XML element with its attributes, child elements and leading text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Element>,
    /// Text between the start tag and the first child element, untrimmed.
    pub text: String,
}

impl Element {
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// First child element with the given name.
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    /// All child elements with the given name, in document order.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }
}

/// Parsed scan-result document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanTree {
    pub root: Element,
}

/// Read and parse the document at `path`.
///
/// Any failure to read the file maps to [`ReportError::NotFound`]; anything
/// wrong with its content maps to [`ReportError::MalformedDocument`].
pub async fn load_document(path: impl AsRef<Path>) -> Result<ScanTree> {
    let path = path.as_ref();
    info!("Loading scan document: {}", path.display());

    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| ReportError::NotFound {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
    let content = String::from_utf8(bytes).map_err(|e| {
        ReportError::malformed(format!("content is not valid UTF-8: {e}")).with_origin(path)
    })?;

    parse_document(&content).map_err(|e| e.with_origin(path))
}

/// Parse XML content into a [`ScanTree`].
pub fn parse_document(xml: &str) -> Result<ScanTree> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(false);

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                if stack.is_empty() && root.is_some() {
                    return Err(ReportError::malformed("more than one root element"));
                }
                stack.push(open_element(&e)?);
            }
            Ok(Event::Empty(e)) => {
                let element = open_element(&e)?;
                attach(&mut stack, &mut root, element)?;
            }
            Ok(Event::End(e)) => {
                let element = stack.pop().ok_or_else(|| {
                    ReportError::malformed(format!(
                        "closing tag </{}> without matching opening tag",
                        String::from_utf8_lossy(e.name().as_ref())
                    ))
                })?;
                attach(&mut stack, &mut root, element)?;
            }
            Ok(Event::Text(e)) => {
                let text = e
                    .unescape()
                    .map_err(|e| ReportError::malformed(format!("bad text content: {e}")))?;
                match stack.last_mut() {
                    Some(top) if top.children.is_empty() => top.text.push_str(&text),
                    Some(_) => {}
                    None if text.trim().is_empty() => {}
                    None => return Err(ReportError::malformed("text outside the root element")),
                }
            }
            Ok(Event::CData(e)) => {
                if let Some(top) = stack.last_mut().filter(|top| top.children.is_empty()) {
                    top.text.push_str(&String::from_utf8_lossy(&e.into_inner()));
                }
            }
            Ok(Event::Eof) => break,
            // Declarations, comments, processing instructions, doctype
            Ok(_) => {}
            Err(e) => {
                return Err(ReportError::malformed(format!(
                    "at byte {}: {}",
                    reader.buffer_position(),
                    e
                )))
            }
        }
    }

    if let Some(open) = stack.last() {
        return Err(ReportError::malformed(format!(
            "unexpected end of document inside <{}>",
            open.name
        )));
    }

    let root = root.ok_or_else(|| ReportError::malformed("document has no root element"))?;
    if root.name != "nmaprun" {
        warn!("Root element is <{}>, expected <nmaprun>", root.name);
    }
    debug!(
        "Parsed document root <{}> with {} children",
        root.name,
        root.children.len()
    );

    Ok(ScanTree { root })
}

fn open_element(start: &BytesStart<'_>) -> Result<Element> {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut attributes = Vec::new();
    for attr in start.attributes() {
        let attr = attr
            .map_err(|e| ReportError::malformed(format!("bad attribute on <{name}>: {e}")))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|e| ReportError::malformed(format!("bad value for {name}@{key}: {e}")))?
            .into_owned();
        attributes.push((key, value));
    }
    Ok(Element {
        name,
        attributes,
        ..Element::default()
    })
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, element: Element) -> Result<()> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None if root.is_none() => *root = Some(element),
        None => return Err(ReportError::malformed("more than one root element")),
    }
    Ok(())
}
