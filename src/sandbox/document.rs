//! A page document with addressable element slots.
//!
//! The page template marks each element the renderer may fill with a
//! `{{element-id}}` placeholder. Only ids present in the template exist;
//! writes to any other id are skipped, so a page that leaves out an
//! optional element simply doesn't show it.

use std::collections::BTreeMap;

use super::markup::escape;

#[derive(Debug, Clone)]
pub struct Document {
    template: String,
    slots: BTreeMap<String, String>,
}

impl Document {
    /// Parse `{{id}}` markers out of `template`. Ids are ASCII
    /// alphanumerics, `-` and `_`; anything else between braces is left
    /// as literal text.
    pub fn from_template(template: impl Into<String>) -> Self {
        let template = template.into();
        let mut slots = BTreeMap::new();
        for id in markers(&template) {
            slots.entry(id.to_string()).or_insert_with(String::new);
        }
        Self { template, slots }
    }

    pub fn has(&self, id: &str) -> bool {
        self.slots.contains_key(id)
    }

    /// Set an element's text content. Returns `false` if the element is absent.
    pub fn set_text(&mut self, id: &str, text: &str) -> bool {
        self.set_html(id, escape(text).into_owned())
    }

    /// Replace an element's inner markup. Returns `false` if the element is absent.
    pub fn set_html(&mut self, id: &str, html: impl Into<String>) -> bool {
        match self.slots.get_mut(id) {
            Some(slot) => {
                *slot = html.into();
                true
            }
            None => false,
        }
    }

    pub fn get(&self, id: &str) -> Option<&str> {
        self.slots.get(id).map(String::as_str)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.slots.keys().map(String::as_str)
    }

    /// The template with every marker replaced by its slot content.
    pub fn render(&self) -> String {
        let mut out = String::with_capacity(self.template.len() + 4096);
        let mut rest = self.template.as_str();
        while let Some(start) = rest.find("{{") {
            let after = &rest[start + 2..];
            match after.find("}}") {
                Some(end) if is_id(&after[..end]) => {
                    out.push_str(&rest[..start]);
                    out.push_str(self.get(&after[..end]).unwrap_or_default());
                    rest = &after[end + 2..];
                }
                _ => {
                    out.push_str(&rest[..start + 2]);
                    rest = after;
                }
            }
        }
        out.push_str(rest);
        out
    }
}

fn is_id(s: &str) -> bool {
    !s.is_empty()
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn markers(template: &str) -> Vec<&str> {
    let mut found = Vec::new();
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        let after = &rest[start + 2..];
        match after.find("}}") {
            Some(end) if is_id(&after[..end]) => {
                found.push(&after[..end]);
                rest = &after[end + 2..];
            }
            _ => rest = after,
        }
    }
    found
}
