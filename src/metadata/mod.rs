// src/metadata/mod.rs

//! Denormalizing descriptive metadata onto the media package.
//!
//! Providers are consulted in ascending `priority` order. For every field the
//! first provider returning a non-blank value wins, and fields that are
//! already set on the media package are never overwritten. A failing
//! provider is logged and skipped.

mod catalog;

use std::fmt;
use std::sync::Arc;

use tracing::warn;

use crate::model::MediaPackage;

pub use catalog::{EpisodeCatalogProvider, SeriesCatalogProvider};

/// Metadata a provider extracted from a media package.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MediaPackageMetadata {
    pub title: Option<String>,
    pub series: Option<String>,
    pub series_title: Option<String>,
    pub language: Option<String>,
    pub license: Option<String>,
    pub creators: Vec<String>,
}

pub trait MetadataProvider: Send + Sync {
    /// Lower values are consulted first.
    fn priority(&self) -> i32;

    fn extract(
        &self,
        media_package: &MediaPackage,
    ) -> anyhow::Result<Option<MediaPackageMetadata>>;
}

#[derive(Clone, Default)]
pub struct MetadataProviders {
    providers: Vec<Arc<dyn MetadataProvider>>,
}

impl fmt::Debug for MetadataProviders {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetadataProviders")
            .field("providers", &self.providers.len())
            .finish()
    }
}

impl MetadataProviders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Episode and series catalog providers.
    pub fn catalogs() -> Self {
        let mut providers = Self::new();
        providers.add(Arc::new(EpisodeCatalogProvider));
        providers.add(Arc::new(SeriesCatalogProvider));
        providers
    }

    pub fn add(&mut self, provider: Arc<dyn MetadataProvider>) {
        self.providers.push(provider);
        self.providers.sort_by_key(|p| p.priority());
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Fill unset fields of `media_package` from the providers.
    pub fn populate(&self, media_package: &mut MediaPackage) {
        for provider in &self.providers {
            let metadata = match provider.extract(media_package) {
                Ok(Some(metadata)) => metadata,
                Ok(None) => continue,
                Err(err) => {
                    warn!(
                        media_package = %media_package.identifier,
                        error = %format!("{err:#}"),
                        "metadata provider failed; skipping"
                    );
                    continue;
                }
            };

            fill(&mut media_package.title, metadata.title);
            fill(&mut media_package.series, metadata.series);
            fill(&mut media_package.series_title, metadata.series_title);
            fill(&mut media_package.language, metadata.language);
            fill(&mut media_package.license, metadata.license);
            if media_package.creators.is_empty() {
                media_package.creators = metadata
                    .creators
                    .into_iter()
                    .filter(|c| !c.trim().is_empty())
                    .collect();
            }
        }
    }
}

fn fill(field: &mut Option<String>, value: Option<String>) {
    let is_blank = |v: &Option<String>| v.as_deref().is_none_or(|s| s.trim().is_empty());
    if is_blank(field) && !is_blank(&value) {
        *field = value;
    }
}
