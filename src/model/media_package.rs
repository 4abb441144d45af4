// src/model/media_package.rs

//! The artifact carried through a workflow.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Kind of a media package element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    Track,
    Catalog,
    Attachment,
}

/// A single track, catalog or attachment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaPackageElement {
    pub id: String,
    pub kind: ElementKind,
    /// Flavor in `type/subtype` form, e.g. `presenter/source` or
    /// `dublincore/episode`.
    pub flavor: String,
    pub uri: String,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Inline metadata; catalogs carry their fields here.
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl MediaPackageElement {
    pub fn new(
        id: impl Into<String>,
        kind: ElementKind,
        flavor: impl Into<String>,
        uri: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            flavor: flavor.into(),
            uri: uri.into(),
            tags: Vec::new(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }
}

/// Media package: the recording plus its descriptive metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaPackage {
    pub identifier: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub series: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub series_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
    #[serde(default)]
    pub creators: Vec<String>,
    /// Duration in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u64>,
    #[serde(default)]
    pub elements: Vec<MediaPackageElement>,
}

impl MediaPackage {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            title: None,
            series: None,
            series_title: None,
            language: None,
            license: None,
            creators: Vec::new(),
            duration: None,
            elements: Vec::new(),
        }
    }

    pub fn add(&mut self, element: MediaPackageElement) {
        self.elements.push(element);
    }

    pub fn element(&self, id: &str) -> Option<&MediaPackageElement> {
        self.elements.iter().find(|e| e.id == id)
    }

    pub fn elements_by_flavor<'a>(
        &'a self,
        flavor: &'a str,
    ) -> impl Iterator<Item = &'a MediaPackageElement> + 'a {
        self.elements.iter().filter(move |e| e.flavor == flavor)
    }

    pub fn tracks(&self) -> impl Iterator<Item = &MediaPackageElement> {
        self.elements.iter().filter(|e| e.kind == ElementKind::Track)
    }

    pub fn catalogs(&self) -> impl Iterator<Item = &MediaPackageElement> {
        self.elements.iter().filter(|e| e.kind == ElementKind::Catalog)
    }
}
