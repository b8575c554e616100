//! Canonical display-spec extraction from heterogeneous spec blobs

use crate::catalog::DetailSpec;
use serde::Serialize;

/// Canonical spec fields shown with a recommendation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DisplaySpecs {
    pub cpu: Option<String>,
    pub ram: Option<String>,
    pub storage: Option<String>,
    pub display: Option<String>,
    pub weight: Option<String>,
    pub gpu: Option<String>,
    pub battery: Option<String>,
}

impl DisplaySpecs {
    /// Compact one-line rendering for prompts, e.g. "무게:1.2kg, CPU:i7"
    pub fn summary_line(&self) -> String {
        let mut parts = Vec::new();
        if let Some(ref weight) = self.weight {
            parts.push(format!("무게:{}", weight));
        }
        if let Some(ref cpu) = self.cpu {
            parts.push(format!("CPU:{}", cpu));
        }
        if let Some(ref ram) = self.ram {
            parts.push(format!("RAM:{}", ram));
        }
        if let Some(ref display) = self.display {
            parts.push(format!("화면:{}", display));
        }
        if let Some(ref gpu) = self.gpu {
            parts.push(format!("GPU:{}", gpu));
        }
        if let Some(ref storage) = self.storage {
            parts.push(format!("저장장치:{}", storage));
        }
        if let Some(ref battery) = self.battery {
            parts.push(format!("배터리:{}", battery));
        }
        parts.join(", ")
    }
}

/// Extract canonical fields from a spec blob using ordered keyword
/// heuristics. First match wins per field; unmatched fields stay `None`.
/// Pure function, no I/O.
pub fn extract_display_specs(detail_spec: &DetailSpec) -> DisplaySpecs {
    let mut specs = DisplaySpecs::default();

    // Pass 1: free-text summary lines
    for item in &detail_spec.spec_summary {
        let item_lower = item.to_lowercase();

        if item_lower.contains("kg") && specs.weight.is_none() {
            specs.weight = Some(item.clone());
        } else if (item_lower.contains("cm") || item_lower.contains("인치"))
            && specs.display.is_none()
        {
            specs.display = Some(item.clone());
        } else if (item_lower.contains("램") || item_lower.contains("ram"))
            && specs.ram.is_none()
        {
            specs.ram = Some(after_colon(item));
        } else if (item_lower.contains("tb") || item_lower.contains("ssd"))
            && specs.storage.is_none()
        {
            specs.storage = Some(after_colon(item));
        }
    }

    // Pass 2: loosely-typed key/value map
    for (key, value) in &detail_spec.spec {
        let key_lower = key.to_lowercase();

        if contains_any(&key_lower, &["코어", "core", "i7", "i5", "i9", "ryzen", "울트라"]) {
            if specs.cpu.is_none() {
                specs.cpu = Some(key_or_value(key, value));
            }
        } else if contains_any(&key_lower, &["rtx", "gtx", "지포스", "radeon"]) {
            if specs.gpu.is_none() {
                specs.gpu = Some(key_or_value(key, value));
            }
        } else if key_lower.contains("배터리") || key_lower.contains("wh") {
            if specs.battery.is_none() {
                specs.battery = Some(key_or_value(key, value));
            }
        } else if key.contains("[구성]램") {
            if specs.ram.is_none() {
                specs.ram = Some(value_text(value));
            }
        } else if key.contains("용량") {
            if specs.storage.is_none() {
                specs.storage = Some(value_text(value));
            }
        } else if key.contains("해상도") {
            // Resolution augments an already-found display size
            specs.display = match specs.display.take() {
                Some(display) => Some(format!("{} ({})", display, value_text(value))),
                None => Some(value_text(value)),
            };
        }
    }

    specs
}

fn contains_any(text: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| text.contains(n))
}

/// "[구성]램:32GB" -> "32GB"; lines without a colon pass through unchanged
fn after_colon(item: &str) -> String {
    match item.rsplit_once(':') {
        Some((_, rest)) => rest.trim().to_string(),
        None => item.to_string(),
    }
}

/// Boolean-true spec entries carry their information in the key
fn key_or_value(key: &str, value: &serde_json::Value) -> String {
    if value == &serde_json::Value::Bool(true) {
        key.to_string()
    } else {
        value_text(value)
    }
}

fn value_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
