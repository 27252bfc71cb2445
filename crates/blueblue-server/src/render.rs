//! HTML page rendering.
//!
//! Pages are rendered from two templates in the public directory, `index.html` and
//! `devices.html`, parsed once at startup. The template language is deliberately tiny:
//!
//! - `{{field}}` inserts an HTML-escaped value
//! - `{{#devices}} ... {{/devices}}` repeats its body once per device
//!
//! A template that is missing or fails to parse is remembered as an error; rendering it
//! then fails with that error so the handler can answer 500 while the rest of the server
//! keeps working.

use std::collections::HashMap;
use std::fmt::Write;
use std::path::Path;

use blueblue_core::{DeviceView, ScanState};
use thiserror::Error;

/// File name of the control page template.
pub const INDEX_TEMPLATE: &str = "index.html";

/// File name of the device list template.
pub const DEVICES_TEMPLATE: &str = "devices.html";

/// Errors raised while loading or executing a template.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RenderError {
    /// The template could not be read or parsed at startup.
    #[error("template {name} is unavailable: {reason}")]
    Unavailable {
        /// Template file name.
        name: &'static str,
        /// Why loading failed.
        reason: String,
    },

    /// The template refers to a field the page does not provide.
    #[error("template {name}: unknown field '{field}'")]
    UnknownField {
        /// Template file name.
        name: &'static str,
        /// The offending placeholder.
        field: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Field(String),
    Section { name: String, body: Vec<Segment> },
}

#[derive(Debug, Clone)]
struct Template {
    name: &'static str,
    segments: Vec<Segment>,
}

/// The parsed page templates.
#[derive(Debug, Clone)]
pub struct Templates {
    index: Result<Template, RenderError>,
    devices: Result<Template, RenderError>,
}

impl Templates {
    /// Read and parse both templates from `dir`.
    #[must_use]
    pub fn load(dir: &Path) -> Self {
        Self {
            index: load_template(dir, INDEX_TEMPLATE),
            devices: load_template(dir, DEVICES_TEMPLATE),
        }
    }

    /// Build templates from in-memory sources.
    #[must_use]
    pub fn from_sources(index: &str, devices: &str) -> Self {
        Self {
            index: parse(INDEX_TEMPLATE, index),
            devices: parse(DEVICES_TEMPLATE, devices),
        }
    }

    /// Load problems, one per template that failed.
    #[must_use]
    pub fn problems(&self) -> Vec<&RenderError> {
        [&self.index, &self.devices]
            .into_iter()
            .filter_map(|t| t.as_ref().err())
            .collect()
    }

    /// Render the control page.
    ///
    /// # Errors
    ///
    /// Returns a [`RenderError`] if the template is unavailable or uses an unknown field.
    pub fn render_index(&self, state: ScanState) -> Result<String, RenderError> {
        let template = self.index.as_ref().map_err(Clone::clone)?;
        let scanning = state.is_scanning();
        let fields = HashMap::from([
            ("state", state.to_string()),
            ("scanning", scanning.to_string()),
            ("stopped", (!scanning).to_string()),
        ]);
        let mut out = String::new();
        template.execute(&template.segments, &fields, &[], &mut out)?;
        Ok(out)
    }

    /// Render the device list.
    ///
    /// # Errors
    ///
    /// Returns a [`RenderError`] if the template is unavailable or uses an unknown field.
    pub fn render_devices(&self, devices: &[DeviceView]) -> Result<String, RenderError> {
        let template = self.devices.as_ref().map_err(Clone::clone)?;
        let fields = HashMap::from([("count", devices.len().to_string())]);
        let mut out = String::new();
        template.execute(&template.segments, &fields, devices, &mut out)?;
        Ok(out)
    }
}

fn load_template(dir: &Path, name: &'static str) -> Result<Template, RenderError> {
    let path = dir.join(name);
    let source = std::fs::read_to_string(&path).map_err(|e| RenderError::Unavailable {
        name,
        reason: format!("{}: {e}", path.display()),
    })?;
    parse(name, &source)
}

fn parse(name: &'static str, source: &str) -> Result<Template, RenderError> {
    let mut stack: Vec<(String, Vec<Segment>)> = vec![(String::new(), Vec::new())];
    let mut rest = source;

    while let Some(open) = rest.find("{{") {
        let (text, after) = rest.split_at(open);
        push_text(&mut stack, text);

        let Some(close) = after.find("}}") else {
            return Err(unavailable(name, "unterminated '{{'"));
        };
        let tag = after[2..close].trim();
        rest = &after[close + 2..];

        if let Some(section) = tag.strip_prefix('#') {
            stack.push((section.trim().to_string(), Vec::new()));
        } else if let Some(section) = tag.strip_prefix('/') {
            let (open_name, body) = stack
                .pop()
                .filter(|_| !stack.is_empty())
                .ok_or_else(|| unavailable(name, "unexpected section close"))?;
            if open_name != section.trim() {
                return Err(unavailable(
                    name,
                    &format!("section '{open_name}' closed by '{}'", section.trim()),
                ));
            }
            current(&mut stack).push(Segment::Section {
                name: open_name,
                body,
            });
        } else if tag.is_empty() {
            return Err(unavailable(name, "empty placeholder"));
        } else {
            current(&mut stack).push(Segment::Field(tag.to_string()));
        }
    }
    push_text(&mut stack, rest);

    if stack.len() != 1 {
        return Err(unavailable(name, "unclosed section"));
    }
    let (_, segments) = stack.pop().unwrap_or_default();
    Ok(Template { name, segments })
}

fn current(stack: &mut [(String, Vec<Segment>)]) -> &mut Vec<Segment> {
    // The root frame is never popped while parsing.
    &mut stack[stack.len() - 1].1
}

fn push_text(stack: &mut [(String, Vec<Segment>)], text: &str) {
    if !text.is_empty() {
        current(stack).push(Segment::Text(text.to_string()));
    }
}

fn unavailable(name: &'static str, reason: &str) -> RenderError {
    RenderError::Unavailable {
        name,
        reason: reason.to_string(),
    }
}

impl Template {
    fn execute(
        &self,
        segments: &[Segment],
        fields: &HashMap<&str, String>,
        devices: &[DeviceView],
        out: &mut String,
    ) -> Result<(), RenderError> {
        for segment in segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Field(field) => {
                    let value = fields.get(field.as_str()).ok_or_else(|| self.unknown(field))?;
                    escape_into(out, value);
                }
                Segment::Section { name, body } if name == "devices" => {
                    for device in devices {
                        let row = device_fields(device);
                        self.execute(body, &row, &[], out)?;
                    }
                }
                Segment::Section { name, .. } => return Err(self.unknown(name)),
            }
        }
        Ok(())
    }

    fn unknown(&self, field: &str) -> RenderError {
        RenderError::UnknownField {
            name: self.name,
            field: field.to_string(),
        }
    }
}

fn device_fields(device: &DeviceView) -> HashMap<&'static str, String> {
    HashMap::from([
        ("address", device.address.clone()),
        ("detected", device.detected.format("%Y-%m-%d %H:%M:%S UTC").to_string()),
        ("since", device.since.clone()),
        ("name", device.name.clone()),
        ("rssi", device.rssi.to_string()),
        ("advertisement", device.advertisement.clone()),
        ("scanresponse", device.scan_response.clone()),
    ])
}

fn escape_into(out: &mut String, value: &str) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&#34;"),
            '\'' => out.push_str("&#39;"),
            c => {
                let _ = out.write_char(c);
            }
        }
    }
}
