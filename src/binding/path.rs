//! Extraction of coded values from a JSON resource at a binding's element path.

use serde_json::Value;

use super::{BindingDefinition, CodedType};

/// One system/code pair as found in the resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Coding {
    pub system: Option<String>,
    pub code: String,
}

/// A coded element found at a binding path.
///
/// A `CodeableConcept` is one coded value carrying all of its codings; it
/// conforms when any of them is a member of the bound value set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodedValue {
    /// FHIRPath-like location, e.g. `Condition.category[1]`
    pub location: String,
    pub codings: Vec<Coding>,
}

/// Extract every coded value at the binding's path, in document order.
///
/// Elements that are absent, or present without any code, yield nothing.
pub fn extract_coded_values(resource: &Value, binding: &BindingDefinition) -> Vec<CodedValue> {
    let resource_type = resource
        .get("resourceType")
        .and_then(|v| v.as_str())
        .unwrap_or("Resource");

    let mut roots = vec![(resource, resource_type.to_string())];
    for url in &binding.extensions {
        roots = roots
            .into_iter()
            .flat_map(|(node, location)| matching_extensions(node, url, location))
            .collect();
    }

    let segments: Vec<&str> = binding
        .path
        .split('.')
        .filter(|segment| !segment.is_empty())
        .collect();

    let mut leaves = Vec::new();
    for (node, location) in roots {
        collect_at_path(node, &segments, location, &mut leaves);
    }

    leaves
        .into_iter()
        .filter_map(|(value, location)| to_coded_value(value, location, binding))
        .collect()
}

fn matching_extensions<'a>(
    node: &'a Value,
    url: &str,
    location: String,
) -> Vec<(&'a Value, String)> {
    let Some(extensions) = node.get("extension").and_then(|v| v.as_array()) else {
        return Vec::new();
    };

    extensions
        .iter()
        .enumerate()
        .filter(|(_, ext)| ext.get("url").and_then(|v| v.as_str()) == Some(url))
        .map(|(i, ext)| (ext, format!("{location}.extension[{i}]")))
        .collect()
}

fn collect_at_path<'a>(
    value: &'a Value,
    segments: &[&str],
    location: String,
    results: &mut Vec<(&'a Value, String)>,
) {
    let Some((segment, rest)) = segments.split_first() else {
        results.push((value, location));
        return;
    };

    // Choice elements: "value[x]" matches valueCoding, valueCodeableConcept, ...
    if let Some(prefix) = segment.strip_suffix("[x]") {
        if let Some(obj) = value.as_object() {
            for (key, child) in obj {
                let is_choice = key
                    .strip_prefix(prefix)
                    .and_then(|suffix| suffix.chars().next())
                    .is_some_and(|c| c.is_ascii_uppercase());
                if is_choice {
                    descend(child, key, rest, &location, results);
                }
            }
        }
        return;
    }

    if let Some(child) = value.get(*segment) {
        descend(child, segment, rest, &location, results);
    }
}

fn descend<'a>(
    child: &'a Value,
    key: &str,
    rest: &[&str],
    location: &str,
    results: &mut Vec<(&'a Value, String)>,
) {
    let path = format!("{location}.{key}");
    match child.as_array() {
        Some(items) => {
            for (i, item) in items.iter().enumerate() {
                collect_at_path(item, rest, format!("{path}[{i}]"), results);
            }
        }
        None => collect_at_path(child, rest, path, results),
    }
}

fn infer_type(value: &Value) -> Option<CodedType> {
    match value {
        Value::String(_) => Some(CodedType::Code),
        Value::Object(obj) if obj.contains_key("coding") => Some(CodedType::CodeableConcept),
        Value::Object(obj) if obj.contains_key("code") => Some(CodedType::Coding),
        _ => None,
    }
}

fn to_coded_value(value: &Value, location: String, binding: &BindingDefinition) -> Option<CodedValue> {
    let element_type = binding.element_type.or_else(|| infer_type(value))?;

    let codings = match element_type {
        CodedType::Code => {
            let code = value.as_str()?;
            vec![Coding {
                system: binding.system.clone(),
                code: code.to_string(),
            }]
        }
        CodedType::Coding | CodedType::Quantity => vec![coding_from(value)?],
        CodedType::CodeableConcept => value
            .get("coding")
            .and_then(|v| v.as_array())
            .map(|codings| codings.iter().filter_map(coding_from).collect())
            .unwrap_or_default(),
    };

    if codings.is_empty() {
        return None;
    }

    Some(CodedValue { location, codings })
}

fn coding_from(value: &Value) -> Option<Coding> {
    let code = value.get("code").and_then(|v| v.as_str())?;
    let system = value
        .get("system")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string());
    Some(Coding {
        system,
        code: code.to_string(),
    })
}
