//! Exports the lights and cameras of a scene to a hand-formatted JSON file.
//!
//! Hosts hand over a flat [`Scene`] object list; the exporter picks out the
//! lights and cameras, reads a fixed set of attributes per subtype and writes
//! a `{"lights": [...], "cameras": [...]}` document. Host integration is kept
//! outside of the crate so the serializer can be driven from any adapter, the
//! bundled CLI or tests.

pub mod export;
pub mod json;
pub mod scene;

pub use export::{
    ensure_json_extension, export_scene, export_to_path, render_document, write_document,
    ExportError, ExportOptions, ExportSummary, JsonRecord,
};
pub use json::{write_property, Property, PropertyValue};
pub use scene::{Camera, CameraKind, Light, LightKind, ObjectData, Scene, SceneObject, SensorFit};
