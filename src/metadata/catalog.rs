// src/metadata/catalog.rs

use anyhow::bail;

use crate::metadata::{MediaPackageMetadata, MetadataProvider};
use crate::model::{ElementKind, MediaPackage, MediaPackageElement};

pub const EPISODE_FLAVOR: &str = "dublincore/episode";
pub const SERIES_FLAVOR: &str = "dublincore/series";

fn single_catalog<'a>(
    media_package: &'a MediaPackage,
    flavor: &str,
) -> anyhow::Result<Option<&'a MediaPackageElement>> {
    let mut catalogs = media_package
        .catalogs()
        .filter(|e| e.kind == ElementKind::Catalog && e.flavor == flavor);
    let first = catalogs.next();
    if first.is_some() && catalogs.next().is_some() {
        bail!("more than one '{flavor}' catalog in media package");
    }
    Ok(first)
}

fn field(element: &MediaPackageElement, key: &str) -> Option<String> {
    element
        .metadata
        .get(key)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Reads the episode catalog (`dublincore/episode`).
#[derive(Debug, Default)]
pub struct EpisodeCatalogProvider;

impl MetadataProvider for EpisodeCatalogProvider {
    fn priority(&self) -> i32 {
        0
    }

    fn extract(
        &self,
        media_package: &MediaPackage,
    ) -> anyhow::Result<Option<MediaPackageMetadata>> {
        let Some(catalog) = single_catalog(media_package, EPISODE_FLAVOR)? else {
            return Ok(None);
        };

        Ok(Some(MediaPackageMetadata {
            title: field(catalog, "title"),
            series: field(catalog, "isPartOf"),
            language: field(catalog, "language"),
            license: field(catalog, "license"),
            creators: field(catalog, "creator")
                .map(|c| c.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or_default(),
            ..Default::default()
        }))
    }
}

/// Reads the series catalog (`dublincore/series`).
#[derive(Debug, Default)]
pub struct SeriesCatalogProvider;

impl MetadataProvider for SeriesCatalogProvider {
    fn priority(&self) -> i32 {
        10
    }

    fn extract(
        &self,
        media_package: &MediaPackage,
    ) -> anyhow::Result<Option<MediaPackageMetadata>> {
        let Some(catalog) = single_catalog(media_package, SERIES_FLAVOR)? else {
            return Ok(None);
        };

        Ok(Some(MediaPackageMetadata {
            series: field(catalog, "identifier"),
            series_title: field(catalog, "title"),
            ..Default::default()
        }))
    }
}
