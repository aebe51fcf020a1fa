use std::io::Cursor;

use quick_xml::events::attributes::AttrError;
use quick_xml::events::{BytesStart, Event};
use quick_xml::{Reader, Writer};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Layouts a BigBlueButton client offers.
pub const AVAILABLE_LAYOUTS: [&str; 6] = [
    "Default",
    "Video Chat",
    "Meeting",
    "Webinar",
    "Lecture assistant",
    "Lecture",
];

#[derive(Debug, Error)]
pub enum ConfigXmlError {
    #[error("Malformed config.xml: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Malformed config.xml attribute: {0}")]
    Attribute(#[from] AttrError),

    #[error("Malformed config.xml attribute value: {0}")]
    Escape(#[from] quick_xml::escape::EscapeError),

    #[error("Failed to write config.xml: {0}")]
    Write(#[from] std::io::Error),

    #[error("config.xml is not UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Options of one room, stored in `room_options`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomOptions {
    pub room_id: i64,
    pub default_layout: Option<String>,
}

impl RoomOptions {
    pub fn new(room_id: i64) -> Self {
        Self {
            room_id,
            default_layout: None,
        }
    }

    pub fn available_layouts(&self) -> &'static [&'static str] {
        &AVAILABLE_LAYOUTS
    }

    /// True when any option was set and has to be pushed to the server.
    pub fn is_modified(&self) -> bool {
        self.default_layout.is_some()
    }

    /// Write these options into a client `config.xml`.
    ///
    /// Sets `defaultLayout` on the first `<layout>` element. Returns the new
    /// document, or `None` when it already carried these values (or there is
    /// nothing to set).
    pub fn apply_to_config_xml(&self, xml: &str) -> Result<Option<String>, ConfigXmlError> {
        let Some(layout) = self.default_layout.as_deref() else {
            return Ok(None);
        };

        let mut reader = Reader::from_str(xml);
        let mut writer = Writer::new(Cursor::new(Vec::new()));
        let mut seen_layout = false;
        let mut modified = false;

        loop {
            match reader.read_event()? {
                Event::Eof => break,
                Event::Start(e) if !seen_layout && e.local_name().as_ref() == b"layout" => {
                    seen_layout = true;
                    let (element, changed) = with_attribute(&e, "defaultLayout", layout)?;
                    modified |= changed;
                    writer.write_event(Event::Start(element))?;
                }
                Event::Empty(e) if !seen_layout && e.local_name().as_ref() == b"layout" => {
                    seen_layout = true;
                    let (element, changed) = with_attribute(&e, "defaultLayout", layout)?;
                    modified |= changed;
                    writer.write_event(Event::Empty(element))?;
                }
                event => writer.write_event(event)?,
            }
        }

        if !modified {
            return Ok(None);
        }
        Ok(Some(String::from_utf8(writer.into_inner().into_inner())?))
    }
}

/// Copy of `element` with `key` set to `value`, keeping attribute order.
/// The flag tells whether the value differs from what was there.
fn with_attribute(
    element: &BytesStart<'_>,
    key: &str,
    value: &str,
) -> Result<(BytesStart<'static>, bool), ConfigXmlError> {
    let name = String::from_utf8_lossy(element.name().as_ref()).into_owned();
    let mut updated = BytesStart::new(name);
    let mut previous = None;

    for attr in element.attributes() {
        let attr = attr?;
        if attr.key.as_ref() == key.as_bytes() {
            previous = Some(attr.unescape_value()?.into_owned());
            updated.push_attribute((key, value));
        } else {
            updated.push_attribute(attr);
        }
    }

    let changed = previous.as_deref() != Some(value);
    if previous.is_none() {
        updated.push_attribute((key, value));
    }
    Ok((updated, changed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_utils::test_db;

    const CONFIG_XML: &str = r#"<config><modules><module name="LayoutModule"/><layout showToolbar="true" defaultLayout="Default"/></modules></config>"#;

    fn options(layout: Option<&str>) -> RoomOptions {
        RoomOptions {
            room_id: 1,
            default_layout: layout.map(String::from),
        }
    }

    #[test]
    fn test_available_layouts() {
        let layouts = RoomOptions::new(1).available_layouts();
        assert_eq!(layouts.len(), 6);
        assert_eq!(layouts[0], "Default");
        assert!(layouts.contains(&"Lecture assistant"));
    }

    #[test]
    fn test_is_modified() {
        assert!(!RoomOptions::new(1).is_modified());
        assert!(options(Some("Webinar")).is_modified());
    }

    #[test]
    fn test_apply_sets_default_layout() {
        let xml = options(Some("Webinar"))
            .apply_to_config_xml(CONFIG_XML)
            .expect("apply")
            .expect("modified");
        assert!(xml.contains(r#"defaultLayout="Webinar""#));
        assert!(xml.contains(r#"showToolbar="true""#));
        assert!(xml.contains(r#"<module name="LayoutModule"/>"#));
        assert!(!xml.contains(r#"defaultLayout="Default""#));
    }

    #[test]
    fn test_apply_adds_missing_attribute() {
        let xml = options(Some("Lecture"))
            .apply_to_config_xml(r#"<config><layout showToolbar="true"></layout></config>"#)
            .expect("apply")
            .expect("modified");
        assert!(xml.contains(r#"defaultLayout="Lecture""#));
    }

    #[test]
    fn test_apply_unchanged_returns_none() {
        assert!(options(Some("Default"))
            .apply_to_config_xml(CONFIG_XML)
            .expect("apply")
            .is_none());
        assert!(RoomOptions::new(1)
            .apply_to_config_xml(CONFIG_XML)
            .expect("apply")
            .is_none());
    }

    #[test]
    fn test_apply_without_layout_element() {
        assert!(options(Some("Webinar"))
            .apply_to_config_xml("<config><modules/></config>")
            .expect("apply")
            .is_none());
    }

    #[test]
    fn test_options_persist_per_room() {
        let db = test_db();
        let room_id = db.insert_room("room-1", None).expect("room");
        let mut opts = RoomOptions::new(room_id);
        opts.default_layout = Some("Meeting".to_string());
        db.save_room_options(&opts).expect("save");
        assert_eq!(db.get_room_options(room_id).expect("get"), Some(opts));
    }
}
