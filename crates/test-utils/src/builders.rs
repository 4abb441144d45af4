#![allow(dead_code)]

use mediaflow::config::{ConfigFile, DispatchSection, RawConfigFile, ServiceSection};
use mediaflow::model::{
    ElementKind, MediaPackage, MediaPackageElement, OperationDefinition, WorkflowDefinition,
};
use mediaflow::types::Properties;
use std::collections::BTreeMap;

/// Builder for `WorkflowDefinition`.
pub struct DefinitionBuilder {
    definition: WorkflowDefinition,
}

impl DefinitionBuilder {
    pub fn new(id: &str) -> Self {
        Self {
            definition: WorkflowDefinition::new(id),
        }
    }

    pub fn title(mut self, title: &str) -> Self {
        self.definition.title = title.to_string();
        self
    }

    /// Append a plain operation.
    pub fn op(self, template: &str) -> Self {
        self.with(OperationBuilder::new(template).build())
    }

    pub fn with(mut self, operation: OperationDefinition) -> Self {
        self.definition.operations.push(operation);
        self
    }

    pub fn build(self) -> WorkflowDefinition {
        self.definition
    }
}

/// Builder for `OperationDefinition`.
pub struct OperationBuilder {
    operation: OperationDefinition,
}

impl OperationBuilder {
    pub fn new(template: &str) -> Self {
        Self {
            operation: OperationDefinition::new(template),
        }
    }

    pub fn fail_on_error(mut self) -> Self {
        self.operation.fail_on_error = true;
        self
    }

    /// Sets `fail_on_error` as well.
    pub fn exception_handler(mut self, workflow: &str) -> Self {
        self.operation.fail_on_error = true;
        self.operation.exception_handler_workflow = Some(workflow.to_string());
        self
    }

    pub fn config(mut self, key: &str, value: &str) -> Self {
        self.operation
            .configuration
            .insert(key.to_string(), value.to_string());
        self
    }

    pub fn execute_if(mut self, condition: &str) -> Self {
        self.operation.execute_condition = Some(condition.to_string());
        self
    }

    pub fn unless(mut self, condition: &str) -> Self {
        self.operation.skip_condition = Some(condition.to_string());
        self
    }

    pub fn build(self) -> OperationDefinition {
        self.operation
    }
}

/// Builder for `MediaPackage`, including dublin core style catalogs.
pub struct MediaPackageBuilder {
    media_package: MediaPackage,
}

impl MediaPackageBuilder {
    pub fn new(identifier: &str) -> Self {
        Self {
            media_package: MediaPackage::new(identifier),
        }
    }

    pub fn title(mut self, title: &str) -> Self {
        self.media_package.title = Some(title.to_string());
        self
    }

    pub fn track(mut self, id: &str, flavor: &str) -> Self {
        self.media_package.add(MediaPackageElement::new(
            id,
            ElementKind::Track,
            flavor,
            format!("file:///media/{id}"),
        ));
        self
    }

    /// Episode catalog with the given `key = value` metadata.
    pub fn episode_catalog(self, metadata: &[(&str, &str)]) -> Self {
        self.catalog("episode", "dublincore/episode", metadata)
    }

    pub fn series_catalog(self, metadata: &[(&str, &str)]) -> Self {
        self.catalog("series", "dublincore/series", metadata)
    }

    pub fn catalog(mut self, id: &str, flavor: &str, metadata: &[(&str, &str)]) -> Self {
        let element = metadata.iter().fold(
            MediaPackageElement::new(
                id,
                ElementKind::Catalog,
                flavor,
                format!("file:///catalogs/{id}.xml"),
            ),
            |element, (key, value)| element.with_metadata(*key, *value),
        );
        self.media_package.add(element);
        self
    }

    pub fn build(self) -> MediaPackage {
        self.media_package
    }
}

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                service: ServiceSection::default(),
                dispatch: DispatchSection::default(),
                properties: Properties::new(),
                workflow: BTreeMap::new(),
            },
        }
    }

    pub fn with_workflow(mut self, definition: WorkflowDefinition) -> Self {
        self.config
            .workflow
            .insert(definition.id.clone(), definition);
        self
    }

    pub fn with_property(mut self, key: &str, value: &str) -> Self {
        self.config
            .properties
            .insert(key.to_string(), value.to_string());
        self
    }

    pub fn max_concurrent_workflows(mut self, cap: usize) -> Self {
        self.config.service.max_concurrent_workflows = Some(cap);
        self
    }

    pub fn workers(mut self, workers: usize) -> Self {
        self.config.dispatch.workers = workers;
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}
