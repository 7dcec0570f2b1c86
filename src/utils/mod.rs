//! Utility helpers: YAML/JSON document serializers.
pub mod serialization;

pub use serialization::DocumentFormat;
pub use serialization::FileSerializer;
pub use serialization::FileUtils;
pub use serialization::JsonSerializer;
pub use serialization::Serializer;
pub use serialization::YamlSerializer;
