//! Streaming attribute filter over HTML-ish markup.
//!
//! Walks open-tag and text events without building a tree. An element whose
//! attribute matches anchors the match; the configured skip depth then ignores
//! that many following open tags before text is collected.

use quick_xml::escape::resolve_html5_entity;
use quick_xml::events::{BytesStart, BytesText, Event};
use quick_xml::Reader;
use std::borrow::Cow;
use std::collections::HashMap;
use tracing::debug;

/// Attribute used to tag processor entries in the catalog filter markup
pub const CATALOG_ATTR: &str = "data-for";
pub const CATALOG_ATTR_VALUE: &str = "f_dpg+id";
pub const CATALOG_VALUE_ATTR: &str = "value";

/// Attribute used to tag phone names in listing fragments
pub const DEVICE_ATTR: &str = "class";
pub const DEVICE_ATTR_VALUE: &str = "device-name";
pub const DEVICE_SKIP_DEPTH: usize = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeFilter {
    attr: String,
    value: String,
    skip_depth: usize,
}

/// One collected text, with the value attribute of its anchoring element if requested
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterMatch {
    pub text: String,
    pub value: Option<String>,
}

enum ScanState {
    Idle,
    Matched { skip: usize, value: Option<String> },
}

impl AttributeFilter {
    pub fn new(attr: &str, value: &str) -> Self {
        Self {
            attr: attr.to_string(),
            value: value.to_string(),
            skip_depth: 0,
        }
    }

    /// Number of open tags to skip after an anchor before collecting text
    pub fn skip_depth(mut self, depth: usize) -> Self {
        self.skip_depth = depth;
        self
    }

    /// Filter used on listing fragments to pull out phone model names
    pub fn device_names() -> Self {
        Self::new(DEVICE_ATTR, DEVICE_ATTR_VALUE).skip_depth(DEVICE_SKIP_DEPTH)
    }

    /// Filter used on the catalog markup to map processor names to IDs
    pub fn processor_ids() -> Self {
        Self::new(CATALOG_ATTR, CATALOG_ATTR_VALUE)
    }

    /// Collected texts in document order, duplicates kept
    pub fn texts(&self, markup: &str) -> Vec<String> {
        self.scan(markup, None).into_iter().map(|m| m.text).collect()
    }

    /// Text -> value of `value_attr` on the anchoring element. Later texts overwrite earlier ones.
    pub fn value_map(&self, markup: &str, value_attr: &str) -> HashMap<String, String> {
        self.scan(markup, Some(value_attr))
            .into_iter()
            .map(|m| (m.text, m.value.unwrap_or_default()))
            .collect()
    }

    /// Runs the scanner, returning every collected text in order
    pub fn scan(&self, markup: &str, value_attr: Option<&str>) -> Vec<FilterMatch> {
        let mut reader = Reader::from_str(markup);
        reader.config_mut().trim_text(true);
        reader.config_mut().check_end_names = false;

        let mut state = ScanState::Idle;
        let mut matches = Vec::new();

        loop {
            match reader.read_event() {
                Ok(Event::Start(tag)) | Ok(Event::Empty(tag)) => {
                    state = self.on_open_tag(state, &tag, value_attr);
                }
                Ok(Event::Text(text)) => {
                    if let ScanState::Matched { skip: 0, value } = &state {
                        let text = decode_text(&text);
                        let text = text.trim();
                        if !text.is_empty() {
                            matches.push(FilterMatch {
                                text: text.to_string(),
                                value: value.clone(),
                            });
                        }
                    }
                }
                Ok(Event::CData(data)) => {
                    if let ScanState::Matched { skip: 0, value } = &state {
                        let text = String::from_utf8_lossy(&data);
                        let text = text.trim();
                        if !text.is_empty() {
                            matches.push(FilterMatch {
                                text: text.to_string(),
                                value: value.clone(),
                            });
                        }
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    debug!(
                        "Stopping markup scan at byte {}: {}",
                        reader.buffer_position(),
                        e
                    );
                    break;
                }
                _ => {}
            }
        }

        matches
    }

    fn on_open_tag(
        &self,
        state: ScanState,
        tag: &BytesStart<'_>,
        value_attr: Option<&str>,
    ) -> ScanState {
        if let ScanState::Matched { skip, value } = state {
            if skip > 0 {
                return ScanState::Matched {
                    skip: skip - 1,
                    value,
                };
            }
        }

        if attribute(tag, &self.attr).as_deref() == Some(self.value.as_str()) {
            ScanState::Matched {
                skip: self.skip_depth,
                value: value_attr.and_then(|name| attribute(tag, name)),
            }
        } else {
            ScanState::Idle
        }
    }
}

fn attribute(tag: &BytesStart<'_>, name: &str) -> Option<String> {
    tag.html_attributes()
        .filter_map(|a| a.ok())
        .find(|a| a.key.as_ref() == name.as_bytes())
        .map(|a| match a.unescape_value_with(resolve_html5_entity) {
            Ok(v) => v.into_owned(),
            Err(_) => String::from_utf8_lossy(&a.value).into_owned(),
        })
}

// Resolves the full HTML5 entity set; text with a broken reference (no `;`) is kept raw
fn decode_text<'a>(text: &'a BytesText<'a>) -> Cow<'a, str> {
    match text.unescape_with(resolve_html5_entity) {
        Ok(t) => t,
        Err(_) => String::from_utf8_lossy(text).into_owned().into(),
    }
}
