//! Call-control document model.
//!
//! A document is an ordered list of verbs the telephony platform executes
//! top to bottom. Rendering produces the XML `<Response>` body the platform
//! expects from every callback.

use crate::{CallflowError, Result};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::Cursor;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GatherInput {
    Digits { num_digits: u32 },
    Speech,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Gather {
    pub input: GatherInput,
    /// Absolute or root-relative URL the platform posts the result to
    pub action: String,
    pub method: String,
    pub language: Option<String>,
    /// Post to `action` even when nothing was recognised
    pub action_on_empty_result: bool,
    /// Verbs played while waiting for input (only `Say`/`Play`/`Pause` are meaningful)
    pub prompts: Vec<Verb>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Verb {
    Say { text: String, language: Option<String> },
    Gather(Gather),
    Play { url: String },
    Pause { length: u32 },
    Redirect { url: String, method: String },
    Hangup,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CallDocument {
    verbs: Vec<Verb>,
}

impl CallDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn say(mut self, text: impl Into<String>, language: &str) -> Self {
        self.verbs.push(Verb::Say {
            text: text.into(),
            language: Some(language.to_string()),
        });
        self
    }

    pub fn gather(mut self, gather: Gather) -> Self {
        self.verbs.push(Verb::Gather(gather));
        self
    }

    pub fn play(mut self, url: impl Into<String>) -> Self {
        self.verbs.push(Verb::Play { url: url.into() });
        self
    }

    pub fn pause(mut self, length: u32) -> Self {
        self.verbs.push(Verb::Pause { length });
        self
    }

    pub fn redirect(mut self, url: impl Into<String>) -> Self {
        self.verbs.push(Verb::Redirect {
            url: url.into(),
            method: "POST".to_string(),
        });
        self
    }

    pub fn hangup(mut self) -> Self {
        self.verbs.push(Verb::Hangup);
        self
    }

    pub fn verbs(&self) -> &[Verb] {
        &self.verbs
    }

    /// Target of the first redirect, if any
    pub fn redirect_target(&self) -> Option<&str> {
        self.verbs.iter().find_map(|v| match v {
            Verb::Redirect { url, .. } => Some(url.as_str()),
            _ => None,
        })
    }

    pub fn play_url(&self) -> Option<&str> {
        self.verbs.iter().find_map(|v| match v {
            Verb::Play { url } => Some(url.as_str()),
            _ => None,
        })
    }

    pub fn gather_step(&self) -> Option<&Gather> {
        self.verbs.iter().find_map(|v| match v {
            Verb::Gather(g) => Some(g),
            _ => None,
        })
    }

    /// Ends with a hangup and never hands control back
    pub fn is_terminal(&self) -> bool {
        matches!(self.verbs.last(), Some(Verb::Hangup)) && self.redirect_target().is_none()
    }

    /// Spoken text of every top-level `Say`, in order
    pub fn spoken(&self) -> Vec<&str> {
        self.verbs
            .iter()
            .filter_map(|v| match v {
                Verb::Say { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn render(&self) -> Result<String> {
        let mut writer = Writer::new(Cursor::new(Vec::new()));
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(xml_err)?;
        writer
            .write_event(Event::Start(BytesStart::new("Response")))
            .map_err(xml_err)?;
        for verb in &self.verbs {
            write_verb(&mut writer, verb)?;
        }
        writer
            .write_event(Event::End(BytesEnd::new("Response")))
            .map_err(xml_err)?;
        String::from_utf8(writer.into_inner().into_inner())
            .map_err(|e| CallflowError::Document(e.to_string()))
    }
}

fn xml_err<E: std::fmt::Display>(e: E) -> CallflowError {
    CallflowError::Document(e.to_string())
}

fn write_text_element(
    writer: &mut Writer<Cursor<Vec<u8>>>,
    start: BytesStart<'_>,
    text: &str,
) -> Result<()> {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    writer.write_event(Event::Start(start)).map_err(xml_err)?;
    writer
        .write_event(Event::Text(BytesText::new(text)))
        .map_err(xml_err)?;
    writer
        .write_event(Event::End(BytesEnd::new(name)))
        .map_err(xml_err)?;
    Ok(())
}

fn write_verb(writer: &mut Writer<Cursor<Vec<u8>>>, verb: &Verb) -> Result<()> {
    match verb {
        Verb::Say { text, language } => {
            let mut start = BytesStart::new("Say");
            if let Some(lang) = language {
                start.push_attribute(("language", lang.as_str()));
            }
            write_text_element(writer, start, text)
        }
        Verb::Play { url } => write_text_element(writer, BytesStart::new("Play"), url),
        Verb::Redirect { url, method } => {
            let mut start = BytesStart::new("Redirect");
            start.push_attribute(("method", method.as_str()));
            write_text_element(writer, start, url)
        }
        Verb::Pause { length } => {
            let mut start = BytesStart::new("Pause");
            let length = length.to_string();
            start.push_attribute(("length", length.as_str()));
            writer.write_event(Event::Empty(start)).map_err(xml_err)?;
            Ok(())
        }
        Verb::Hangup => {
            writer
                .write_event(Event::Empty(BytesStart::new("Hangup")))
                .map_err(xml_err)?;
            Ok(())
        }
        Verb::Gather(g) => {
            let mut start = BytesStart::new("Gather");
            match &g.input {
                GatherInput::Digits { num_digits } => {
                    let n = num_digits.to_string();
                    start.push_attribute(("numDigits", n.as_str()));
                }
                GatherInput::Speech => start.push_attribute(("input", "speech")),
            }
            start.push_attribute(("action", g.action.as_str()));
            start.push_attribute(("method", g.method.as_str()));
            if let Some(lang) = &g.language {
                start.push_attribute(("language", lang.as_str()));
            }
            if g.action_on_empty_result {
                start.push_attribute(("actionOnEmptyResult", "true"));
            }
            writer.write_event(Event::Start(start)).map_err(xml_err)?;
            for prompt in &g.prompts {
                write_verb(writer, prompt)?;
            }
            writer
                .write_event(Event::End(BytesEnd::new("Gather")))
                .map_err(xml_err)?;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_terminal_document() {
        let xml = CallDocument::new()
            .say("Invalid selection. Goodbye.", "en-IN")
            .hangup()
            .render()
            .expect("render");
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(xml.contains("<Say language=\"en-IN\">Invalid selection. Goodbye.</Say>"));
        assert!(xml.ends_with("<Hangup/></Response>"));
    }

    #[test]
    fn escapes_text_and_attributes() {
        let xml = CallDocument::new()
            .redirect("https://host/play?file=a.mp3&lang=hi-IN&attempt=1")
            .say("Ginger & honey <daily>", "hi-IN")
            .render()
            .expect("render");
        assert!(xml.contains("file=a.mp3&amp;lang=hi-IN&amp;attempt=1"));
        assert!(xml.contains("Ginger &amp; honey &lt;daily&gt;"));
    }

    #[test]
    fn renders_nested_gather() {
        let doc = CallDocument::new().gather(Gather {
            input: GatherInput::Digits { num_digits: 1 },
            action: "/set_language".into(),
            method: "POST".into(),
            language: None,
            action_on_empty_result: false,
            prompts: vec![Verb::Say {
                text: "Press 1".into(),
                language: Some("en-IN".into()),
            }],
        });
        let xml = doc.render().expect("render");
        assert!(xml.contains(
            "<Gather numDigits=\"1\" action=\"/set_language\" method=\"POST\"><Say language=\"en-IN\">Press 1</Say></Gather>"
        ));
        assert!(!doc.is_terminal());
    }

    #[test]
    fn pause_then_redirect_is_not_terminal() {
        let doc = CallDocument::new().pause(1).redirect("/play");
        assert_eq!(doc.redirect_target(), Some("/play"));
        assert!(!doc.is_terminal());
        assert!(doc.render().expect("render").contains("<Pause length=\"1\"/>"));
    }
}
