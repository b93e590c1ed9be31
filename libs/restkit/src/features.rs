//! Features and the dynamic feature registry.
//!
//! A [`Feature`] contributes providers during runtime assembly. A
//! [`DynamicFeature`] is consulted once per resource method and may add
//! per-method filters based on the method's [`ResourceInfo`].
//!
//! [`DynamicFeatures`] is the append-only registration list: insertion
//! order is significant, nothing is deduplicated or removed, and readers
//! see exactly the appended sequence. It carries no synchronization;
//! the runtime builder owns it exclusively during assembly.

use std::sync::Arc;

use crate::filters::{
    RequestFilterBinding, ResponseFilterBinding,
};
use crate::mappers::ExceptionMapper;
use crate::resource::ResourceInfo;
use crate::writers::MessageBodyWriter;

/// Contributes providers at assembly time.
pub trait Feature: Send + Sync {
    fn configure(&self, ctx: &mut RegistrationContext<'_>);
}

/// Contributes per-method filters at assembly time.
pub trait DynamicFeature: Send + Sync {
    fn configure(&self, info: &ResourceInfo, registrar: &mut MethodRegistrar<'_>);
}

/// One registered dynamic feature.
pub struct ResourceDynamicFeature {
    pub(crate) feature: Arc<dyn DynamicFeature>,
    pub(crate) name: &'static str,
}

impl ResourceDynamicFeature {
    pub fn new(name: &'static str, feature: Arc<dyn DynamicFeature>) -> Self {
        Self { feature, name }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// Append-only, insertion-ordered dynamic feature registry.
#[derive(Default)]
pub struct DynamicFeatures {
    features: Vec<ResourceDynamicFeature>,
}

impl DynamicFeatures {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_feature(&mut self, feature: ResourceDynamicFeature) {
        self.features.push(feature);
    }

    /// All registrations, in insertion order.
    #[must_use]
    pub fn resource_dynamic_features(&self) -> &[ResourceDynamicFeature] {
        &self.features
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.features.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

/// Registration surface handed to [`Feature::configure`].
pub struct RegistrationContext<'a> {
    pub(crate) request_filters: &'a mut Vec<RequestFilterBinding>,
    pub(crate) response_filters: &'a mut Vec<ResponseFilterBinding>,
    pub(crate) mappers: &'a mut Vec<Arc<dyn ExceptionMapper>>,
    pub(crate) writers: &'a mut Vec<Arc<dyn MessageBodyWriter>>,
}

impl RegistrationContext<'_> {
    pub fn register_request_filter(&mut self, binding: RequestFilterBinding) {
        self.request_filters.push(binding);
    }

    pub fn register_response_filter(&mut self, binding: ResponseFilterBinding) {
        self.response_filters.push(binding);
    }

    pub fn register_exception_mapper(&mut self, mapper: Arc<dyn ExceptionMapper>) {
        self.mappers.push(mapper);
    }

    pub fn register_writer(&mut self, writer: Arc<dyn MessageBodyWriter>) {
        self.writers.push(writer);
    }
}

/// Per-method registration surface handed to [`DynamicFeature::configure`].
pub struct MethodRegistrar<'a> {
    pub(crate) request_filters: &'a mut Vec<RequestFilterBinding>,
    pub(crate) response_filters: &'a mut Vec<ResponseFilterBinding>,
}

impl MethodRegistrar<'_> {
    pub fn register_request_filter(&mut self, binding: RequestFilterBinding) {
        self.request_filters.push(binding);
    }

    pub fn register_response_filter(&mut self, binding: ResponseFilterBinding) {
        self.response_filters.push(binding);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Nothing;

    impl DynamicFeature for Nothing {
        fn configure(&self, _info: &ResourceInfo, _registrar: &mut MethodRegistrar<'_>) {}
    }

    #[test]
    fn registry_preserves_append_order() {
        let names = ["first", "second", "third"];
        for n in 0..=names.len() {
            let mut registry = DynamicFeatures::new();
            for name in &names[..n] {
                registry.add_feature(ResourceDynamicFeature::new(name, Arc::new(Nothing)));
            }
            let seen: Vec<_> = registry
                .resource_dynamic_features()
                .iter()
                .map(ResourceDynamicFeature::name)
                .collect();
            assert_eq!(seen, &names[..n]);
        }
    }

    #[test]
    fn registry_keeps_duplicates() {
        let mut registry = DynamicFeatures::new();
        registry.add_feature(ResourceDynamicFeature::new("dup", Arc::new(Nothing)));
        registry.add_feature(ResourceDynamicFeature::new("dup", Arc::new(Nothing)));
        assert_eq!(registry.len(), 2);
    }
}
