//! Per-page geometry and annotation containers.

use super::stroke::Annotation;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Annotations per 1-based page number, each list in draw order
/// (first = bottom, last = top).
pub type PageAnnotations = BTreeMap<u32, Vec<Annotation>>;

/// Page information per 1-based page number.
pub type PageInfoMap = BTreeMap<u32, PageInfo>;

/// Page dimensions in document units, as reported by the viewer or read from
/// the document itself.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub width: f64,
    pub height: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_unit: Option<f64>,
}

impl PageInfo {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            user_unit: None,
        }
    }

    /// Size multiplier for this page, 1.0 unless the document says otherwise.
    pub fn user_unit_or_default(&self) -> f64 {
        match self.user_unit {
            Some(unit) if unit > 0.0 => unit,
            _ => 1.0,
        }
    }
}
