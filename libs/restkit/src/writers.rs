//! Message body writers for typed entities.
//!
//! Writers are consulted in registration order; the first writer that
//! claims an entity renders it. `String` and `Bytes` entities fall back to
//! built-in rendering when no custom writer claims them.

use bytes::Bytes;
use std::any::Any;
use std::sync::Arc;

/// Rendered body plus its content type.
pub struct WrittenBody {
    pub content_type: &'static str,
    pub body: Bytes,
}

impl WrittenBody {
    pub fn text(body: impl Into<String>) -> Self {
        Self {
            content_type: "text/plain; charset=utf-8",
            body: Bytes::from(body.into()),
        }
    }

    pub fn bytes(body: impl Into<Bytes>) -> Self {
        Self {
            content_type: "application/octet-stream",
            body: body.into(),
        }
    }
}

/// Renders entities of types it recognizes; returns `None` to pass.
pub trait MessageBodyWriter: Send + Sync {
    /// Writer name, for introspection.
    fn name(&self) -> &'static str;

    fn write(&self, entity: &(dyn Any + Send + Sync)) -> Option<WrittenBody>;
}

#[derive(Default)]
pub(crate) struct WriterRegistry {
    writers: Vec<Arc<dyn MessageBodyWriter>>,
}

impl WriterRegistry {
    pub(crate) fn register(&mut self, writer: Arc<dyn MessageBodyWriter>) {
        self.writers.push(writer);
    }

    pub(crate) fn names(&self) -> Vec<&'static str> {
        self.writers.iter().map(|w| w.name()).collect()
    }

    /// First-claim selection in registration order, then built-in fallbacks.
    pub(crate) fn write(&self, entity: &(dyn Any + Send + Sync)) -> Option<WrittenBody> {
        for writer in &self.writers {
            if let Some(body) = writer.write(entity) {
                return Some(body);
            }
        }
        if let Some(text) = entity.downcast_ref::<String>() {
            return Some(WrittenBody::text(text.clone()));
        }
        if let Some(bytes) = entity.downcast_ref::<Bytes>() {
            return Some(WrittenBody::bytes(bytes.clone()));
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Marker;

    struct MarkerWriter;

    impl MessageBodyWriter for MarkerWriter {
        fn name(&self) -> &'static str {
            "MarkerWriter"
        }

        fn write(&self, entity: &(dyn Any + Send + Sync)) -> Option<WrittenBody> {
            entity
                .downcast_ref::<Marker>()
                .map(|_| WrittenBody::text("MARKER"))
        }
    }

    #[test]
    fn custom_writer_claims_its_type() {
        let mut registry = WriterRegistry::default();
        registry.register(Arc::new(MarkerWriter));
        let body = registry.write(&Marker).unwrap();
        assert_eq!(body.body, Bytes::from_static(b"MARKER"));
    }

    #[test]
    fn string_falls_back_to_text() {
        let registry = WriterRegistry::default();
        let body = registry.write(&"OK".to_owned()).unwrap();
        assert_eq!(body.body, Bytes::from_static(b"OK"));
        assert!(body.content_type.starts_with("text/plain"));
    }

    #[test]
    fn unclaimed_entity_is_rejected() {
        let registry = WriterRegistry::default();
        assert!(registry.write(&Marker).is_none());
    }

    #[test]
    fn writer_names_follow_registration_order() {
        let mut registry = WriterRegistry::default();
        registry.register(Arc::new(MarkerWriter));
        assert_eq!(registry.names(), ["MarkerWriter"]);
    }
}
