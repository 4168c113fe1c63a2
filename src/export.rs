use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use log::{debug, info};
use thiserror::Error;

use crate::json::{quote, Property};
use crate::scene::{Camera, CameraKind, Light, LightKind, Scene};

/// Failure to produce the output file. A failed export may leave a
/// truncated file behind.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("unable to create {}", .path.display())]
    Create { path: PathBuf, source: io::Error },
    #[error("unable to write {}", .path.display())]
    Write { path: PathBuf, source: io::Error },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportOptions {
    /// Force the `.json` extension onto the output path.
    pub check_extension: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            check_extension: true,
        }
    }
}

/// What a finished export wrote and where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    pub path: PathBuf,
    pub lights: usize,
    pub cameras: usize,
}

/// Scene object that is exported as one flat JSON object.
pub trait JsonRecord {
    /// Subtype name, also emitted as the `type` member.
    fn type_name(&self) -> &'static str;

    /// Members in output order.
    fn properties(&self) -> Vec<Property>;
}

impl JsonRecord for Light {
    fn type_name(&self) -> &'static str {
        self.kind.as_str()
    }

    fn properties(&self) -> Vec<Property> {
        let mut properties = vec![
            Property::new("type", self.type_name()),
            Property::new("location", self.location),
            Property::new("color", self.color),
            Property::new("diffuse", self.diffuse),
            Property::new("specular", self.specular),
            Property::new("volume", self.volume),
        ];
        match self.kind {
            LightKind::Point => {
                properties.push(Property::new("power", self.energy));
                properties.push(Property::new("radius", self.radius));
            }
            LightKind::Sun => {
                properties.push(Property::new("strength", self.energy));
                properties.push(Property::new("angle", self.angle));
                properties.push(Property::new("rotation", self.rotation));
            }
            LightKind::Spot | LightKind::Area => {}
        }
        properties
    }
}

impl JsonRecord for Camera {
    fn type_name(&self) -> &'static str {
        self.kind.as_str()
    }

    fn properties(&self) -> Vec<Property> {
        let mut properties = vec![
            Property::new("type", self.type_name()),
            Property::new("location", self.location),
            Property::new("rotation", self.rotation),
            Property::new("lens", self.lens),
            Property::new("clip_start", self.clip_start),
            Property::new("clip_end", self.clip_end),
        ];
        if self.kind == CameraKind::Ortho {
            properties.push(Property::new("ortho_scale", self.ortho_scale));
        }
        properties.push(Property::new("sensor_fit", self.sensor_fit.as_str()));
        properties.push(Property::new("sensor_width", self.sensor_width));
        properties.push(Property::new("sensor_height", self.sensor_height));
        properties
    }
}

/// Renders the full `{"lights": [...], "cameras": [...]}` document,
/// tab-indented and newline-terminated.
pub fn render_document(lights: &[Light], cameras: &[Camera]) -> String {
    let mut output = String::from("{\n");
    push_array(&mut output, "lights", lights);
    output.push_str(",\n");
    push_array(&mut output, "cameras", cameras);
    output.push_str("\n}\n");
    output
}

/// Writes the rendered document to `sink`. Nothing is flushed here.
pub fn write_document<W: Write>(
    sink: &mut W,
    lights: &[Light],
    cameras: &[Camera],
) -> io::Result<()> {
    sink.write_all(render_document(lights, cameras).as_bytes())
}

/// Exports the lights and cameras of `scene` to `path`.
pub fn export_scene(
    scene: &Scene,
    path: impl AsRef<Path>,
    options: &ExportOptions,
) -> Result<ExportSummary, ExportError> {
    export_to_path(path, &scene.lights(), &scene.cameras(), options)
}

/// Creates (or truncates) the file at `path` and writes the document to it.
/// The file handle is dropped on every return path.
pub fn export_to_path(
    path: impl AsRef<Path>,
    lights: &[Light],
    cameras: &[Camera],
    options: &ExportOptions,
) -> Result<ExportSummary, ExportError> {
    let path = if options.check_extension {
        ensure_json_extension(path.as_ref())
    } else {
        path.as_ref().to_path_buf()
    };

    let file = File::create(&path).map_err(|source| ExportError::Create {
        path: path.clone(),
        source,
    })?;
    let mut writer = BufWriter::new(file);
    write_document(&mut writer, lights, cameras)
        .and_then(|()| writer.flush())
        .map_err(|source| ExportError::Write {
            path: path.clone(),
            source,
        })?;

    info!(
        "exported {} light(s) and {} camera(s) to {}",
        lights.len(),
        cameras.len(),
        path.display()
    );
    Ok(ExportSummary {
        path,
        lights: lights.len(),
        cameras: cameras.len(),
    })
}

/// Appends `.json` to a path without an extension and replaces any other
/// extension. A file name ending in `.json` in any case, including a bare
/// `.json` dotfile, is kept as is.
pub fn ensure_json_extension(path: &Path) -> PathBuf {
    let has_json_suffix = path
        .file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.to_ascii_lowercase().ends_with(".json"));
    if has_json_suffix {
        path.to_path_buf()
    } else {
        path.with_extension("json")
    }
}

fn push_array<T: JsonRecord>(output: &mut String, key: &str, records: &[T]) {
    output.push('\t');
    output.push_str(&quote(key));
    output.push_str(": [\n");
    for (index, record) in records.iter().enumerate() {
        debug!("writing {key}[{index}] ({})", record.type_name());
        if index > 0 {
            output.push_str(",\n");
        }
        push_record(output, record);
    }
    if !records.is_empty() {
        output.push('\n');
    }
    output.push_str("\t]");
}

fn push_record<T: JsonRecord>(output: &mut String, record: &T) {
    output.push_str("\t\t{\n");
    let properties = record.properties();
    for (index, property) in properties.iter().enumerate() {
        output.push_str("\t\t\t");
        output.push_str(&property.to_json());
        if index + 1 < properties.len() {
            output.push(',');
        }
        output.push('\n');
    }
    output.push_str("\t\t}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{ObjectData, SceneObject};
    use glam::Vec3;
    use serde_json::Value;
    use tempfile::tempdir;

    fn keys(record: &impl JsonRecord) -> Vec<&'static str> {
        record.properties().iter().map(|p| p.key).collect()
    }

    fn parse(document: &str) -> Value {
        serde_json::from_str(document).expect("document is valid JSON")
    }

    #[test]
    fn empty_scene_renders_empty_arrays() {
        let document = render_document(&[], &[]);
        assert_eq!(document, "{\n\t\"lights\": [\n\t],\n\t\"cameras\": [\n\t]\n}\n");
        assert_eq!(parse(&document), serde_json::json!({"lights": [], "cameras": []}));
    }

    #[test]
    fn point_light_has_eight_members_in_order() {
        let light = Light {
            kind: LightKind::Point,
            energy: 1000.0,
            radius: 0.1,
            ..Light::default()
        };
        assert_eq!(
            keys(&light),
            ["type", "location", "color", "diffuse", "specular", "volume", "power", "radius"]
        );
        let document = parse(&render_document(&[light], &[]));
        assert_eq!(document["lights"][0]["type"], "POINT");
        assert_eq!(document["lights"][0]["power"], 1000.0);
    }

    #[test]
    fn sun_light_swaps_power_for_strength_angle_rotation() {
        let light = Light {
            kind: LightKind::Sun,
            ..Light::default()
        };
        assert_eq!(
            keys(&light),
            [
                "type", "location", "color", "diffuse", "specular", "volume", "strength",
                "angle", "rotation"
            ]
        );
    }

    #[test]
    fn spot_and_area_lights_only_have_common_members() {
        for kind in [LightKind::Spot, LightKind::Area] {
            let light = Light {
                kind,
                ..Light::default()
            };
            assert_eq!(
                keys(&light),
                ["type", "location", "color", "diffuse", "specular", "volume"]
            );
        }
    }

    #[test]
    fn ortho_scale_only_for_orthographic_cameras() {
        let persp = Camera::default();
        let ortho = Camera {
            kind: CameraKind::Ortho,
            ..Camera::default()
        };
        assert!(!keys(&persp).contains(&"ortho_scale"));
        assert_eq!(
            keys(&ortho),
            [
                "type",
                "location",
                "rotation",
                "lens",
                "clip_start",
                "clip_end",
                "ortho_scale",
                "sensor_fit",
                "sensor_width",
                "sensor_height"
            ]
        );
    }

    #[test]
    fn single_light_layout() {
        let light = Light {
            kind: LightKind::Point,
            location: Vec3::new(1.0, 2.0, 3.0),
            ..Light::default()
        };
        let expected = concat!(
            "{\n",
            "\t\"lights\": [\n",
            "\t\t{\n",
            "\t\t\t\"type\": \"POINT\",\n",
            "\t\t\t\"location\": [ 1.0, 2.0, 3.0 ],\n",
            "\t\t\t\"color\": [ 1.0, 1.0, 1.0 ],\n",
            "\t\t\t\"diffuse\": 1.0,\n",
            "\t\t\t\"specular\": 1.0,\n",
            "\t\t\t\"volume\": 1.0,\n",
            "\t\t\t\"power\": 10.0,\n",
            "\t\t\t\"radius\": 0.25\n",
            "\t\t}\n",
            "\t],\n",
            "\t\"cameras\": [\n",
            "\t]\n",
            "}\n",
        );
        assert_eq!(render_document(&[light], &[]), expected);
    }

    #[test]
    fn arrays_keep_input_order_without_trailing_commas() {
        let lights: Vec<Light> = (0..3)
            .map(|i| Light {
                location: Vec3::new(i as f32, 0.0, 0.0),
                ..Light::default()
            })
            .collect();
        let cameras = [
            Camera {
                lens: 24.0,
                ..Camera::default()
            },
            Camera {
                kind: CameraKind::Ortho,
                lens: 85.0,
                ..Camera::default()
            },
        ];
        let text = render_document(&lights, &cameras);
        assert!(!text.contains(",\n\t\t}"));
        assert!(!text.contains(",\n\t]"));

        let document = parse(&text);
        for (i, light) in document["lights"].as_array().unwrap().iter().enumerate() {
            assert_eq!(light["location"][0], i as f64);
        }
        assert_eq!(document["cameras"][0]["lens"], 24.0);
        assert_eq!(document["cameras"][1]["lens"], 85.0);
        assert_eq!(document["cameras"][1]["ortho_scale"], 6.0);
    }

    #[test]
    fn export_writes_file_and_forces_extension() {
        let dir = tempdir().unwrap();
        let summary = export_to_path(
            dir.path().join("scene.txt"),
            &[Light::default()],
            &[Camera::default()],
            &ExportOptions::default(),
        )
        .unwrap();
        assert_eq!(summary.path, dir.path().join("scene.json"));
        assert_eq!((summary.lights, summary.cameras), (1, 1));
        let written = std::fs::read_to_string(&summary.path).unwrap();
        assert_eq!(written, render_document(&[Light::default()], &[Camera::default()]));
    }

    #[test]
    fn repeated_export_is_byte_identical() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.json");
        let light = Light {
            kind: LightKind::Sun,
            rotation: Vec3::new(0.1, 0.2, 1.0 / 3.0),
            ..Light::default()
        };
        let options = ExportOptions::default();
        export_to_path(&path, &[light], &[], &options).unwrap();
        let first = std::fs::read(&path).unwrap();
        export_to_path(&path, &[light], &[], &options).unwrap();
        assert_eq!(first, std::fs::read(&path).unwrap());
    }

    #[test]
    fn extension_check_can_be_disabled() {
        let dir = tempdir().unwrap();
        let options = ExportOptions {
            check_extension: false,
        };
        let summary = export_to_path(dir.path().join("lights.txt"), &[], &[], &options).unwrap();
        assert_eq!(summary.path, dir.path().join("lights.txt"));
        assert!(summary.path.exists());
    }

    #[test]
    fn missing_directory_is_a_create_error() {
        let dir = tempdir().unwrap();
        let err = export_to_path(
            dir.path().join("missing").join("out.json"),
            &[],
            &[],
            &ExportOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, ExportError::Create { .. }));
        assert!(err.to_string().starts_with("unable to create"));
    }

    #[test]
    fn ensure_json_extension_cases() {
        assert_eq!(ensure_json_extension(Path::new("out")), PathBuf::from("out.json"));
        assert_eq!(ensure_json_extension(Path::new("out.txt")), PathBuf::from("out.json"));
        assert_eq!(ensure_json_extension(Path::new("out.JSON")), PathBuf::from("out.JSON"));
        assert_eq!(
            ensure_json_extension(Path::new("dir/scene.blend")),
            PathBuf::from("dir/scene.json")
        );
        assert_eq!(ensure_json_extension(Path::new("dir/.json")), PathBuf::from("dir/.json"));
        assert_eq!(ensure_json_extension(Path::new("dir/.Json")), PathBuf::from("dir/.Json"));
    }

    #[test]
    fn export_scene_filters_mixed_object_list() {
        let scene = Scene::new(vec![
            SceneObject::camera(
                "Wide",
                Camera {
                    lens: 24.0,
                    ..Camera::default()
                },
            ),
            SceneObject {
                name: "Cube".into(),
                data: ObjectData::Other("mesh".into()),
            },
            SceneObject::light(
                "Key",
                Light {
                    kind: LightKind::Sun,
                    ..Light::default()
                },
            ),
            SceneObject::camera(
                "Tele",
                Camera {
                    kind: CameraKind::Ortho,
                    lens: 85.0,
                    ..Camera::default()
                },
            ),
        ]);
        let dir = tempdir().unwrap();
        let summary = export_scene(&scene, dir.path().join("mixed"), &ExportOptions::default())
            .unwrap();
        assert_eq!(summary.path, dir.path().join("mixed.json"));
        assert_eq!((summary.lights, summary.cameras), (1, 2));

        let text = std::fs::read_to_string(&summary.path).unwrap();
        assert_eq!(text, render_document(&scene.lights(), &scene.cameras()));
        assert_eq!(text.matches("\t\t},\n").count(), 1);
        assert!(!text.contains(",\n\t]"));

        let document = parse(&text);
        assert_eq!(document["lights"].as_array().unwrap().len(), 1);
        assert_eq!(document["lights"][0]["type"], "SUN");
        let cameras = document["cameras"].as_array().unwrap();
        assert_eq!(cameras.len(), 2);
        assert_eq!(cameras[0]["lens"], 24.0);
        assert!(cameras[0].get("ortho_scale").is_none());
        assert_eq!(cameras[1]["lens"], 85.0);
        assert_eq!(cameras[1]["type"], "ORTHO");
    }

    #[test]
    fn write_document_reports_sink_errors() {
        struct FailingSink;

        impl Write for FailingSink {
            fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
                Err(io::Error::new(io::ErrorKind::Other, "disk full"))
            }

            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let err = write_document(&mut FailingSink, &[], &[]).unwrap_err();
        assert_eq!(err.to_string(), "disk full");
    }
}
