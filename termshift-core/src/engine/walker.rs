use serde_json::{Map, Value};

use super::entities::EntityExtractor;
use super::substitute::{InfixReplacer, Substituter};
use crate::error::Result;
use crate::record::{is_system_field, FieldValue, RichNode, LINK_TARGET_KEYS};
use crate::types::ScanOptions;

/// A rebuilt value plus what changed while building it.
#[derive(Debug, Clone, PartialEq)]
pub struct Walked<T> {
    pub value: T,
    pub has_changes: bool,
    pub change_count: usize,
}

impl<T> Walked<T> {
    fn unchanged(value: T) -> Self {
        Self {
            value,
            has_changes: false,
            change_count: 0,
        }
    }
}

/// Recursive field rewriter.
///
/// The walker never mutates its input: every node on the way down is
/// rebuilt from the original with only the rewritten parts overridden, so
/// a value with no matches comes back equal to what went in.
pub struct TreeWalker<'a> {
    find_term: String,
    replace_term: String,
    plain: Substituter,
    contextual: Option<Substituter>,
    links: Option<InfixReplacer>,
    entities: Option<&'a EntityExtractor>,
}

impl<'a> TreeWalker<'a> {
    pub fn new(
        find_term: &str,
        replace_term: &str,
        options: &ScanOptions,
        extractor: &'a EntityExtractor,
    ) -> Result<Self> {
        let plain = Substituter::new(find_term, replace_term, super::TermClass::Generic)?;
        let contextual = if options.context_aware {
            Some(Substituter::context_aware(find_term, replace_term)?)
        } else {
            None
        };
        let links = if options.update_links {
            Some(InfixReplacer::new(find_term, replace_term)?)
        } else {
            None
        };

        Ok(Self {
            find_term: find_term.to_string(),
            replace_term: replace_term.to_string(),
            plain,
            contextual,
            links,
            entities: options.named_entities.then_some(extractor),
        })
    }

    /// Walk one field. System fields and nulls are skipped.
    pub fn walk(&self, field_key: &str, value: &FieldValue) -> Walked<FieldValue> {
        if is_system_field(field_key) {
            return Walked::unchanged(value.clone());
        }

        match value {
            FieldValue::Null => Walked::unchanged(FieldValue::Null),
            FieldValue::Opaque(raw) => {
                tracing::trace!("Field '{}' has no rewritable shape", field_key);
                Walked::unchanged(FieldValue::Opaque(raw.clone()))
            }
            FieldValue::PlainText(text) => {
                let walked = self.walk_text(field_key, text);
                Walked {
                    value: FieldValue::PlainText(walked.value),
                    has_changes: walked.has_changes,
                    change_count: walked.change_count,
                }
            }
            FieldValue::RichNode(node) => {
                let walked = self.walk_node(field_key, node);
                Walked {
                    value: FieldValue::RichNode(walked.value),
                    has_changes: walked.has_changes,
                    change_count: walked.change_count,
                }
            }
            FieldValue::List(items) => {
                let mut has_changes = false;
                let mut change_count = 0;
                let mut rebuilt = Vec::with_capacity(items.len());

                for (index, item) in items.iter().enumerate() {
                    let walked = self.walk(&format!("{}[{}]", field_key, index), item);
                    has_changes |= walked.has_changes;
                    change_count += walked.change_count;
                    rebuilt.push(walked.value);
                }

                Walked {
                    value: FieldValue::List(rebuilt),
                    has_changes,
                    change_count,
                }
            }
            FieldValue::Group(fields) => {
                let mut has_changes = false;
                let mut change_count = 0;
                let mut rebuilt = Vec::with_capacity(fields.len());

                for (key, item) in fields {
                    if is_system_field(key) {
                        rebuilt.push((key.clone(), item.clone()));
                        continue;
                    }
                    let walked = self.walk(&format!("{}.{}", field_key, key), item);
                    has_changes |= walked.has_changes;
                    change_count += walked.change_count;
                    rebuilt.push((key.clone(), walked.value));
                }

                Walked {
                    value: FieldValue::Group(rebuilt),
                    has_changes,
                    change_count,
                }
            }
        }
    }

    /// Convenience over raw JSON: parse, walk, serialize.
    pub fn walk_value(&self, field_key: &str, value: &Value) -> Walked<Value> {
        let walked = self.walk(field_key, &FieldValue::from_value(value));
        Walked {
            value: walked.value.to_value(),
            has_changes: walked.has_changes,
            change_count: walked.change_count,
        }
    }

    fn walk_text(&self, path: &str, text: &str) -> Walked<String> {
        let mut current = text.to_string();
        let mut change_count = 0;

        if let Some(extractor) = self.entities {
            match extractor
                .mapping_for_term(text, &self.find_term, &self.replace_term)
                .and_then(|mapping| extractor.replace_entities(text, &mapping))
            {
                Ok(result) => {
                    change_count += result.count;
                    current = result.text;
                }
                Err(e) => tracing::warn!("Entity replacement skipped for '{}': {}", path, e),
            }
        }

        let substituter = self.contextual.as_ref().unwrap_or(&self.plain);
        let result = substituter.apply(&current);
        change_count += result.count;

        if result.text == text {
            return Walked::unchanged(result.text);
        }

        Walked {
            value: result.text,
            has_changes: true,
            change_count,
        }
    }

    fn walk_node(&self, path: &str, node: &RichNode) -> Walked<RichNode> {
        let mut has_changes = false;
        let mut change_count = 0;

        let text = node.text.as_deref().map(|text| {
            let walked = self.walk_text(path, text);
            has_changes |= walked.has_changes;
            change_count += walked.change_count;
            walked.value
        });

        let attrs = match (&self.links, &node.attrs) {
            (Some(rewriter), Some(attrs)) if node.is_link() => {
                let walked = rewrite_link_targets(rewriter, attrs);
                has_changes |= walked.has_changes;
                change_count += walked.change_count;
                Some(walked.value)
            }
            _ => node.attrs.clone(),
        };

        let children = node.children.as_ref().map(|children| {
            children
                .iter()
                .enumerate()
                .map(|(index, child)| {
                    let walked = self.walk_node(&format!("{}.children[{}]", path, index), child);
                    has_changes |= walked.has_changes;
                    change_count += walked.change_count;
                    walked.value
                })
                .collect()
        });

        Walked {
            value: node.rebuild(text, attrs, children),
            has_changes,
            change_count,
        }
    }
}

fn rewrite_link_targets(rewriter: &InfixReplacer, attrs: &Map<String, Value>) -> Walked<Map<String, Value>> {
    let mut rebuilt = attrs.clone();
    let mut has_changes = false;
    let mut change_count = 0;

    for key in LINK_TARGET_KEYS {
        if let Some(Value::String(target)) = attrs.get(*key) {
            let result = rewriter.apply(target);
            if result.text != *target {
                has_changes = true;
                change_count += result.count;
                rebuilt.insert((*key).to_string(), Value::String(result.text));
            }
        }
    }

    Walked {
        value: rebuilt,
        has_changes,
        change_count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn options() -> ScanOptions {
        ScanOptions::default()
    }

    #[test]
    fn test_plain_text_field() {
        let extractor = EntityExtractor::default();
        let walker = TreeWalker::new("OldBrand", "NewBrand", &options(), &extractor).unwrap();

        let walked = walker.walk_value("title", &json!("OldBrand news from oldbrand"));
        assert!(walked.has_changes);
        assert_eq!(walked.change_count, 2);
        assert_eq!(walked.value, json!("NewBrand news from NewBrand"));
    }

    #[test]
    fn test_unmatched_tree_is_unchanged() {
        let extractor = EntityExtractor::default();
        let walker = TreeWalker::new("OldBrand", "NewBrand", &options(), &extractor).unwrap();

        let doc = json!({
            "type": "doc",
            "uid": "d1",
            "attrs": {},
            "children": [
                {"type": "p", "uid": "p1", "children": [{"text": "Nothing here", "italic": true}]},
                {"type": "img", "attrs": {"src": "https://cdn/x.png"}}
            ]
        });

        let walked = walker.walk_value("body", &doc);
        assert!(!walked.has_changes);
        assert_eq!(walked.change_count, 0);
        assert_eq!(walked.value, doc);
    }

    #[test]
    fn test_link_text_and_target() {
        let extractor = EntityExtractor::default();
        let opts = ScanOptions {
            update_links: true,
            ..ScanOptions::default()
        };
        let walker = TreeWalker::new("OldBrand", "NewBrand", &opts, &extractor).unwrap();

        let doc = json!({
            "type": "doc",
            "children": [{
                "type": "a",
                "attrs": {"href": "https://oldbrand.com", "target": "_blank"},
                "children": [{"text": "OldBrand site"}]
            }]
        });

        let walked = walker.walk_value("body", &doc);
        assert!(walked.has_changes);
        assert!(walked.change_count >= 2);

        let link = &walked.value["children"][0];
        assert_eq!(link["attrs"]["href"], "https://newbrand.com");
        assert_eq!(link["attrs"]["target"], "_blank");
        assert_eq!(link["children"][0]["text"], "NewBrand site");
    }

    #[test]
    fn test_link_target_untouched_without_option() {
        let extractor = EntityExtractor::default();
        let walker = TreeWalker::new("OldBrand", "NewBrand", &options(), &extractor).unwrap();

        let node = json!({
            "type": "doc",
            "children": [{"type": "a", "attrs": {"href": "https://oldbrand.com"}, "children": []}]
        });

        let walked = walker.walk_value("body", &node);
        assert!(!walked.has_changes);
        assert_eq!(walked.value, node);
    }

    #[test]
    fn test_list_preserves_order_and_sums() {
        let extractor = EntityExtractor::default();
        let walker = TreeWalker::new("OldBrand", "NewBrand", &options(), &extractor).unwrap();

        let walked = walker.walk_value("tags", &json!(["OldBrand", 7, "other", "OldBrand OldBrand"]));
        assert!(walked.has_changes);
        assert_eq!(walked.change_count, 3);
        assert_eq!(walked.value, json!(["NewBrand", 7, "other", "NewBrand NewBrand"]));
    }

    #[test]
    fn test_group_skips_system_fields() {
        let extractor = EntityExtractor::default();
        let walker = TreeWalker::new("OldBrand", "NewBrand", &options(), &extractor).unwrap();

        let walked = walker.walk_value(
            "seo",
            &json!({"uid": "OldBrand", "meta_title": "OldBrand home", "weight": 2}),
        );
        assert!(walked.has_changes);
        assert_eq!(
            walked.value,
            json!({"uid": "OldBrand", "meta_title": "NewBrand home", "weight": 2})
        );
    }

    #[test]
    fn test_system_field_key_is_skipped() {
        let extractor = EntityExtractor::default();
        let walker = TreeWalker::new("OldBrand", "NewBrand", &options(), &extractor).unwrap();

        let walked = walker.walk_value("created_by", &json!("OldBrand"));
        assert!(!walked.has_changes);
        assert_eq!(walked.value, json!("OldBrand"));
    }

    #[test]
    fn test_context_aware_versioned_product() {
        let extractor = EntityExtractor::default();
        let opts = ScanOptions {
            context_aware: true,
            ..ScanOptions::default()
        };
        let walker = TreeWalker::new("Gemini 2.5 Pro", "Aurora", &opts, &extractor).unwrap();

        let walked = walker.walk_value("body", &json!("Try Gemini 2.5 Pro today"));
        assert_eq!(walked.value, json!("Try Aurora 2.5 Pro today"));
        assert_eq!(walked.change_count, 1);
    }

    #[test]
    fn test_named_entities_rewrites_embedded_term() {
        let extractor = EntityExtractor::default();
        let opts = ScanOptions {
            named_entities: true,
            ..ScanOptions::default()
        };
        let walker = TreeWalker::new("OldBrand", "NewBrand", &opts, &extractor).unwrap();

        let walked = walker.walk_value("footer", &json!("OldBrand: mail help@oldbrandsupport.com"));
        assert_eq!(walked.value, json!("NewBrand: mail help@newbrandsupport.com"));
        assert_eq!(walked.change_count, 2);
    }
}
