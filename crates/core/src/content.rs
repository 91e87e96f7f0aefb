//! Structural validation of process documents.
//!
//! The engine owns full BPMN semantics; this layer only rejects documents
//! that could never deploy: malformed XML, a missing `<definitions>` root,
//! no `<process>`, a process without an id, or duplicate element ids.

use std::collections::HashSet;

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::error::CoreError;
use crate::template::MAX_CONTENT_SIZE;

/// Validates process documents before any store write.
pub trait ContentValidator: Send + Sync {
    /// Return every structural problem found in `content`; empty means valid.
    fn validate(&self, content: &str) -> Vec<String>;

    /// [`validate`](Self::validate) folded into a `Result`.
    fn check(&self, content: &str) -> Result<(), CoreError> {
        let errors = self.validate(content);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(CoreError::InvalidContent(errors))
        }
    }
}

/// Default validator for BPMN 2.0 XML documents.
#[derive(Debug, Default, Clone, Copy)]
pub struct BpmnStructureValidator;

impl ContentValidator for BpmnStructureValidator {
    fn validate(&self, content: &str) -> Vec<String> {
        if content.trim().is_empty() {
            return vec!["Process content must not be empty".to_string()];
        }
        if content.len() > MAX_CONTENT_SIZE {
            return vec![format!(
                "Process content exceeds {MAX_CONTENT_SIZE} bytes"
            )];
        }

        let scan = scan_document(content);
        let mut errors = scan.errors;

        if let Some(root) = &scan.root {
            if root != "definitions" {
                errors.push(format!(
                    "Root element must be 'definitions', found '{root}'"
                ));
            }
        } else if errors.is_empty() {
            errors.push("Document contains no elements".to_string());
        }

        if scan.process_ids.is_empty() && scan.root.is_some() {
            errors.push("Document defines no process".to_string());
        }
        for id in &scan.process_ids {
            if id.is_none() {
                errors.push("Every process must declare a non-empty id".to_string());
                break;
            }
        }
        errors
    }
}

/// Id of the first `<process>` element, which the engine uses as the
/// definition key.
pub fn main_process_id(content: &str) -> Option<String> {
    scan_document(content)
        .process_ids
        .into_iter()
        .next()
        .flatten()
}

#[derive(Debug, Default)]
struct Scan {
    root: Option<String>,
    /// One entry per `<process>`; `None` when its id is missing or blank.
    process_ids: Vec<Option<String>>,
    errors: Vec<String>,
}

fn scan_document(content: &str) -> Scan {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    let mut scan = Scan::default();
    let mut seen_ids: HashSet<String> = HashSet::new();
    let mut depth: usize = 0;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                inspect_element(&e, &mut scan, &mut seen_ids);
                depth += 1;
            }
            Ok(Event::Empty(e)) => inspect_element(&e, &mut scan, &mut seen_ids),
            Ok(Event::End(_)) => depth = depth.saturating_sub(1),
            Ok(Event::Eof) => {
                if depth > 0 {
                    scan.errors
                        .push("Malformed XML: unexpected end of document".to_string());
                }
                break;
            }
            Ok(_) => {}
            Err(e) => {
                scan.errors.push(format!(
                    "Malformed XML at byte {}: {e}",
                    reader.buffer_position()
                ));
                break;
            }
        }
    }
    scan
}

fn inspect_element(e: &BytesStart<'_>, scan: &mut Scan, seen_ids: &mut HashSet<String>) {
    let local = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();

    let id = match e.try_get_attribute("id") {
        Ok(Some(attr)) => match attr.unescape_value() {
            Ok(value) => Some(value.trim().to_string()).filter(|v| !v.is_empty()),
            Err(err) => {
                scan.errors
                    .push(format!("Invalid id attribute on '{local}': {err}"));
                None
            }
        },
        Ok(None) => None,
        Err(err) => {
            scan.errors
                .push(format!("Invalid attributes on '{local}': {err}"));
            None
        }
    };

    if let Some(id) = &id {
        if !seen_ids.insert(id.clone()) {
            scan.errors.push(format!("Duplicate element id '{id}'"));
        }
    }

    if scan.root.is_none() {
        scan.root = Some(local.clone());
    }
    if local == "process" {
        scan.process_ids.push(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    const VALID: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<definitions xmlns="http://www.omg.org/spec/BPMN/20100524/MODEL" id="defs">
  <process id="leave_request" isExecutable="true">
    <startEvent id="start"/>
    <userTask id="approve" name="Approve"/>
    <endEvent id="end"/>
    <sequenceFlow id="f1" sourceRef="start" targetRef="approve"/>
    <sequenceFlow id="f2" sourceRef="approve" targetRef="end"/>
  </process>
</definitions>"#;

    #[test]
    fn accepts_minimal_process() {
        assert!(BpmnStructureValidator.validate(VALID).is_empty());
        assert_eq!(main_process_id(VALID).as_deref(), Some("leave_request"));
    }

    #[test]
    fn accepts_prefixed_namespace() {
        let doc = r#"<bpmn:definitions xmlns:bpmn="http://www.omg.org/spec/BPMN/20100524/MODEL">
  <bpmn:process id="p1"><bpmn:startEvent id="s"/></bpmn:process>
</bpmn:definitions>"#;
        assert!(BpmnStructureValidator.validate(doc).is_empty());
        assert_eq!(main_process_id(doc).as_deref(), Some("p1"));
    }

    #[test]
    fn rejects_blank_content() {
        assert_matches!(
            BpmnStructureValidator.check("   "),
            Err(CoreError::InvalidContent(errors)) if errors.len() == 1
        );
    }

    #[test]
    fn rejects_malformed_xml() {
        let errors = BpmnStructureValidator.validate("<definitions><process id=\"p\"></definitions>");
        assert!(errors.iter().any(|e| e.starts_with("Malformed XML")), "{errors:?}");
    }

    #[test]
    fn rejects_unclosed_document() {
        let errors = BpmnStructureValidator.validate("<definitions><process id=\"p\">");
        assert!(errors.iter().any(|e| e.contains("Malformed XML")), "{errors:?}");
    }

    #[test]
    fn rejects_wrong_root_and_missing_process() {
        let errors = BpmnStructureValidator.validate("<workflow id=\"w\"/>");
        assert!(errors.iter().any(|e| e.contains("Root element")));
        assert!(errors.iter().any(|e| e.contains("no process")));
    }

    #[test]
    fn rejects_process_without_id() {
        let errors =
            BpmnStructureValidator.validate("<definitions><process name=\"x\"/></definitions>");
        assert_eq!(errors, vec!["Every process must declare a non-empty id".to_string()]);
        assert_eq!(main_process_id("<definitions><process/></definitions>"), None);
    }

    #[test]
    fn rejects_duplicate_ids() {
        let doc = r#"<definitions><process id="p"><startEvent id="a"/><endEvent id="a"/></process></definitions>"#;
        let errors = BpmnStructureValidator.validate(doc);
        assert_eq!(errors, vec!["Duplicate element id 'a'".to_string()]);
    }
}
