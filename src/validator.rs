use std::collections::BTreeMap;

use crate::{
    config::AppConfig,
    error::BatchError,
    pipeline::{BatchResult, run_batch},
    profile::EntityProfile,
    source::QuerySource,
    store::ArtifactStore,
    upload::UploadedTable,
};

/// Uniform contract for every upload type.
pub trait Validator {
    fn label(&self) -> &str;

    fn profile(&self) -> &EntityProfile;

    fn run(
        &self,
        upload: &UploadedTable,
        source: &dyn QuerySource,
        store: &dyn ArtifactStore,
    ) -> Result<BatchResult, BatchError>;
}

/// Validator driven entirely by an [`EntityProfile`].
pub struct ProfileValidator {
    profile: EntityProfile,
    config: AppConfig,
}

impl ProfileValidator {
    pub fn new(profile: EntityProfile, config: AppConfig) -> Self {
        Self { profile, config }
    }
}

impl Validator for ProfileValidator {
    fn label(&self) -> &str {
        &self.profile.label
    }

    fn profile(&self) -> &EntityProfile {
        &self.profile
    }

    fn run(
        &self,
        upload: &UploadedTable,
        source: &dyn QuerySource,
        store: &dyn ArtifactStore,
    ) -> Result<BatchResult, BatchError> {
        run_batch(&self.profile, &self.config, upload, source, store)
    }
}

/// Named validators, looked up by the label the caller selects.
#[derive(Default)]
pub struct Registry {
    validators: BTreeMap<String, Box<dyn Validator>>,
}

impl Registry {
    /// Built-in profiles followed by the configured ones; later registrations
    /// replace earlier ones with the same label.
    pub fn from_config(config: &AppConfig) -> Self {
        let mut registry = Self::default();
        for profile in EntityProfile::builtin()
            .into_iter()
            .chain(config.entities.iter().cloned())
        {
            registry.register(Box::new(ProfileValidator::new(profile, config.clone())));
        }
        registry
    }

    pub fn register(&mut self, validator: Box<dyn Validator>) {
        self.validators
            .insert(validator.label().to_string(), validator);
    }

    pub fn get(&self, label: &str) -> Result<&dyn Validator, BatchError> {
        self.validators
            .get(label.trim())
            .map(|validator| validator.as_ref())
            .ok_or_else(|| BatchError::UnknownEntity {
                label: label.to_string(),
                known: self.labels(),
            })
    }

    pub fn labels(&self) -> Vec<String> {
        self.validators.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Validator> {
        self.validators.values().map(|validator| validator.as_ref())
    }
}
