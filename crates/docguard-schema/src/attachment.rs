//! # Attachments
//!
//! Attachment bodies are uploaded in a separate write from the document
//! that references them. A reference property therefore validates as a
//! string whether or not the file exists yet; content type and size are
//! only checked when the document already carries metadata for the file.
//!
//! Document-level policy bounds the attachments themselves: whether any are
//! allowed, how many, how large, which names and types, and whether each
//! must be referenced by a property.

use std::collections::BTreeSet;

use docguard_core::Document;

use crate::error::SchemaError;
use crate::resolvable::{ResolveContext, Resolvable};
use crate::validator::{AttachmentReferenceConstraints, Pattern};
use crate::violation::{ValidationErrors, Violation};

/// Limits applied to every attachment on a document.
#[derive(Debug, Clone, Default)]
pub struct AttachmentConstraints {
    pub maximum_attachment_count: Option<Resolvable<u64>>,
    pub maximum_individual_size: Option<Resolvable<u64>>,
    pub maximum_total_size: Option<Resolvable<u64>>,
    pub supported_extensions: Option<Resolvable<Vec<String>>>,
    pub supported_content_types: Option<Resolvable<Vec<String>>>,
    pub filename_regex_pattern: Option<Resolvable<Pattern>>,
    pub require_attachment_references: Resolvable<bool>,
}

/// Document-level attachment policy.
#[derive(Debug, Clone, Default)]
pub struct AttachmentPolicy {
    /// Files named by an attachment-reference property are always allowed.
    pub allow_attachments: Resolvable<bool>,
    pub constraints: AttachmentConstraints,
}

impl AttachmentPolicy {
    /// A policy that accepts attachments under `constraints`.
    pub fn allowed(constraints: AttachmentConstraints) -> Self {
        Self {
            allow_attachments: true.into(),
            constraints,
        }
    }
}

fn resolve_opt<T: Clone>(
    slot: &Option<Resolvable<T>>,
    ctx: &ResolveContext<'_>,
) -> Result<Option<T>, SchemaError> {
    Ok(slot.as_ref().map(|s| s.resolve(ctx)).transpose()?)
}

fn extension(filename: &str) -> Option<&str> {
    filename.rsplit_once('.').map(|(_, ext)| ext)
}

fn has_supported_extension(filename: &str, supported: &[String]) -> bool {
    extension(filename).is_some_and(|ext| supported.iter().any(|s| s.eq_ignore_ascii_case(ext)))
}

/// Violations for one attachment-reference value, in extension, content
/// type, size order. `item` is the property-level context.
pub fn check_reference(
    constraints: &AttachmentReferenceConstraints,
    filename: &str,
    item: &ResolveContext<'_>,
) -> Result<Vec<Violation>, SchemaError> {
    let mut violations = Vec::new();

    if let Some(pattern) = resolve_opt(&constraints.regex_pattern, item)? {
        if !pattern.is_match(filename) {
            violations.push(Violation::pattern(&pattern));
        }
    }

    if let Some(supported) = resolve_opt(&constraints.supported_extensions, item)? {
        if !has_supported_extension(filename, &supported) {
            violations.push(Violation::UnsupportedExtension(supported));
        }
    }

    let Some(descriptor) = item.new_doc.attachment(filename) else {
        return Ok(violations);
    };

    if let Some(supported) = resolve_opt(&constraints.supported_content_types, item)? {
        let ok = descriptor
            .content_type
            .as_deref()
            .is_some_and(|ct| supported.iter().any(|s| s == ct));
        if !ok {
            violations.push(Violation::UnsupportedContentType(supported));
        }
    }

    if let Some(maximum) = resolve_opt(&constraints.maximum_size, item)? {
        if descriptor.length.is_some_and(|len| len > maximum) {
            violations.push(Violation::AttachmentTooLarge(maximum));
        }
    }

    Ok(violations)
}

/// Document-level checks over every attachment on `ctx.new_doc`.
///
/// `references` holds every filename named by an attachment-reference
/// property of the document.
pub fn check_document(
    policy: &AttachmentPolicy,
    references: &BTreeSet<String>,
    ctx: &ResolveContext<'_>,
    errors: &mut ValidationErrors,
) -> Result<(), SchemaError> {
    let doc: &Document = ctx.new_doc;
    let attachments = doc.attachments();
    if attachments.is_empty() {
        return Ok(());
    }

    if !policy.allow_attachments.resolve(ctx)?
        && attachments.keys().any(|name| !references.contains(name))
    {
        errors.document(Violation::AttachmentsNotAllowed);
    }

    let c = &policy.constraints;
    if let Some(maximum) = resolve_opt(&c.maximum_attachment_count, ctx)? {
        if attachments.len() as u64 > maximum {
            errors.document(Violation::TooManyAttachments(maximum));
        }
    }

    let individual = resolve_opt(&c.maximum_individual_size, ctx)?;
    let extensions = resolve_opt(&c.supported_extensions, ctx)?;
    let content_types = resolve_opt(&c.supported_content_types, ctx)?;
    let filename_pattern = resolve_opt(&c.filename_regex_pattern, ctx)?;
    let require_refs = c.require_attachment_references.resolve(ctx)?;

    let mut total: u64 = 0;
    for (filename, descriptor) in attachments {
        let length = descriptor.length.unwrap_or(0);
        total = total.saturating_add(length);

        if let Some(maximum) = individual {
            if length > maximum {
                errors.document(Violation::AttachmentExceedsSize {
                    filename: filename.clone(),
                    maximum,
                });
            }
        }
        if let Some(supported) = &extensions {
            if !has_supported_extension(filename, supported) {
                errors.document(Violation::AttachmentExtension {
                    filename: filename.clone(),
                    supported: supported.clone(),
                });
            }
        }
        if let Some(supported) = &content_types {
            let ok = descriptor
                .content_type
                .as_deref()
                .is_some_and(|ct| supported.iter().any(|s| s == ct));
            if !ok {
                errors.document(Violation::AttachmentContentType {
                    filename: filename.clone(),
                    supported: supported.clone(),
                });
            }
        }
        if let Some(pattern) = &filename_pattern {
            if !pattern.is_match(filename) {
                errors.document(Violation::AttachmentFilename {
                    filename: filename.clone(),
                    pattern: pattern.source().to_string(),
                });
            }
        }
        if require_refs && !references.contains(filename) {
            errors.document(Violation::UnreferencedAttachment(filename.clone()));
        }
    }

    if let Some(maximum) = resolve_opt(&c.maximum_total_size, ctx)? {
        if total > maximum {
            errors.document(Violation::AttachmentsExceedTotalSize(maximum));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use docguard_core::Principal;
    use serde_json::json;

    fn strings(items: &[&str]) -> Resolvable<Vec<String>> {
        Resolvable::Literal(items.iter().map(|s| s.to_string()).collect())
    }

    fn logo_doc() -> Document {
        Document::from_value(json!({
            "_attachments": {
                "bogus.mp3": { "content_type": "text/plain", "length": 2097153 }
            }
        }))
        .unwrap()
    }

    fn logo_constraints() -> AttachmentReferenceConstraints {
        AttachmentReferenceConstraints {
            supported_extensions: Some(strings(&["png", "gif", "jpg", "jpeg"])),
            supported_content_types: Some(strings(&["image/png", "image/gif", "image/jpeg"])),
            maximum_size: Some(Resolvable::Literal(2_097_152)),
            regex_pattern: None,
        }
    }

    #[test]
    fn reference_with_metadata_checks_everything() {
        let doc = logo_doc();
        let principal = Principal::anonymous();
        let ctx = ResolveContext::new(&doc, None, &principal, None);
        let messages: Vec<_> = check_reference(&logo_constraints(), "bogus.mp3", &ctx)
            .unwrap()
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(
            messages,
            [
                "must have a supported file extension (png,gif,jpg,jpeg)",
                "must have a supported content type (image/png,image/gif,image/jpeg)",
                "must not be larger than 2097152 bytes",
            ]
        );
    }

    #[test]
    fn reference_without_metadata_checks_only_the_name() {
        let doc = Document::from_value(json!({})).unwrap();
        let principal = Principal::anonymous();
        let ctx = ResolveContext::new(&doc, None, &principal, None);
        assert!(check_reference(&logo_constraints(), "foobar.PNG", &ctx).unwrap().is_empty());
        assert_eq!(check_reference(&logo_constraints(), "noext", &ctx).unwrap().len(), 1);
    }

    #[test]
    fn attachments_not_allowed_unless_referenced() {
        let doc = logo_doc();
        let principal = Principal::anonymous();
        let ctx = ResolveContext::new(&doc, None, &principal, None);
        let policy = AttachmentPolicy::default();

        let mut errors = ValidationErrors::new();
        check_document(&policy, &BTreeSet::new(), &ctx, &mut errors).unwrap();
        assert_eq!(errors.to_string(), "document type does not support attachments");

        let mut errors = ValidationErrors::new();
        let refs = BTreeSet::from(["bogus.mp3".to_string()]);
        check_document(&policy, &refs, &ctx, &mut errors).unwrap();
        assert!(errors.is_empty());
    }

    #[test]
    fn document_constraints() {
        let doc = Document::from_value(json!({
            "_attachments": {
                "foo.html": { "content_type": "text/html", "length": 10 },
                "bar.xml": { "content_type": "application/xml", "length": 20 },
                "baz.pdf": { "content_type": "text/plain", "length": 30 },
                "bad.exe": { "content_type": "application/octet-stream", "length": 40 }
            }
        }))
        .unwrap();
        let principal = Principal::anonymous();
        let ctx = ResolveContext::new(&doc, None, &principal, None);
        let policy = AttachmentPolicy::allowed(AttachmentConstraints {
            maximum_attachment_count: Some(Resolvable::Literal(3)),
            maximum_individual_size: Some(Resolvable::Literal(35)),
            maximum_total_size: Some(Resolvable::Literal(90)),
            supported_extensions: Some(strings(&["html", "pdf", "xml"])),
            supported_content_types: Some(strings(&["text/html", "application/pdf", "application/xml"])),
            filename_regex_pattern: Some(Pattern::new(r"(foo|ba[rz]|qux)\.[a-z]+").unwrap().into()),
            require_attachment_references: true.into(),
        });
        let refs = BTreeSet::from(["foo.html".to_string(), "bar.xml".to_string(), "baz.pdf".to_string()]);

        let mut errors = ValidationErrors::new();
        check_document(&policy, &refs, &ctx, &mut errors).unwrap();
        // Attachments are visited in filename order: bad.exe, bar.xml, baz.pdf, foo.html.
        assert_eq!(
            errors.messages(),
            [
                "the total number of attachments must not exceed 3",
                "attachment \"bad.exe\" must not exceed 35 bytes",
                "attachment \"bad.exe\" must have a supported file extension (html,pdf,xml)",
                "attachment \"bad.exe\" must have a supported content type (text/html,application/pdf,application/xml)",
                "attachment \"bad.exe\" must conform to expected pattern /(foo|ba[rz]|qux)\\.[a-z]+/",
                "attachment \"bad.exe\" must have a corresponding attachment reference property",
                "attachment \"baz.pdf\" must have a supported content type (text/html,application/pdf,application/xml)",
                "the total size of all attachments must not exceed 90 bytes",
            ]
        );
    }
}
