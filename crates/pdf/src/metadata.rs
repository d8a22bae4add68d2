//! Info dictionary stamping for redacted output.

use chrono::Local;
use lopdf::{Dictionary, Document, Object};

const TOOL_NAME: &str = "rmhf";
const TOOL_VERSION: &str = env!("CARGO_PKG_VERSION");

/// PDF date string, e.g. `D:20250103142501+08'00'`.
fn pdf_date() -> String {
    let now = Local::now();
    let offset = now.format("%z").to_string();
    let (hours, minutes) = offset.split_at(offset.len().saturating_sub(2));
    format!("D:{}{}'{}'", now.format("%Y%m%d%H%M%S"), hours, minutes)
}

/// Records the tool and the time of redaction in the Info dictionary,
/// creating the dictionary if the document has none.
pub fn stamp_producer(doc: &mut Document) {
    let producer = format!("{} v{}", TOOL_NAME, TOOL_VERSION);
    let date = pdf_date();

    let info_id = match doc.trailer.get(b"Info") {
        Ok(Object::Reference(id)) => *id,
        Ok(Object::Dictionary(direct)) => {
            let copy = direct.clone();
            let id = doc.add_object(Object::Dictionary(copy));
            doc.trailer.set("Info", Object::Reference(id));
            id
        }
        _ => {
            let id = doc.add_object(Object::Dictionary(Dictionary::new()));
            doc.trailer.set("Info", Object::Reference(id));
            id
        }
    };

    match doc.get_object_mut(info_id) {
        Ok(Object::Dictionary(info)) => {
            info.set("Producer", Object::string_literal(producer.as_str()));
            info.set("ModDate", Object::string_literal(date.as_str()));
            info.set("RedactedBy", Object::string_literal(producer.as_str()));
        }
        _ => {
            log::warn!("[Redact] Info entry {:?} is not a dictionary, not stamped", info_id);
            return;
        }
    }

    log::debug!("[Redact] stamped Producer={}, ModDate={}", producer, date);
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::dictionary;

    fn info_string(doc: &Document, key: &[u8]) -> String {
        let id = doc.trailer.get(b"Info").unwrap().as_reference().unwrap();
        let info = doc.get_dictionary(id).unwrap();
        match info.get(key).unwrap() {
            Object::String(bytes, _) => String::from_utf8_lossy(bytes).into_owned(),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_stamp_creates_info() {
        let mut doc = Document::with_version("1.5");
        stamp_producer(&mut doc);
        assert!(info_string(&doc, b"Producer").starts_with("rmhf v"));
        assert!(info_string(&doc, b"ModDate").starts_with("D:"));
    }

    #[test]
    fn test_stamp_keeps_existing_entries() {
        let mut doc = Document::with_version("1.5");
        let info_id = doc.add_object(dictionary! {
            "Title" => Object::string_literal("Quarterly report"),
        });
        doc.trailer.set("Info", info_id);
        stamp_producer(&mut doc);
        assert_eq!(info_string(&doc, b"Title"), "Quarterly report");
        assert_eq!(info_string(&doc, b"RedactedBy"), info_string(&doc, b"Producer"));
    }

    #[test]
    fn test_pdf_date_shape() {
        let date = pdf_date();
        assert!(date.starts_with("D:"));
        assert!(date.ends_with('\''));
        assert_eq!(date.len(), "D:20250103142501+08'00'".len());
    }
}
