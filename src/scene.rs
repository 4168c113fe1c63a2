use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use anyhow::{anyhow, Context, Result};
use glam::Vec3;
use roxmltree::{Document, Node};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Flat list of objects handed over by the host application.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Scene {
    pub objects: Vec<SceneObject>,
}

impl Scene {
    pub fn new(objects: Vec<SceneObject>) -> Self {
        Self { objects }
    }

    /// Reads a scene description from disk. Files ending in `.json` are read
    /// as JSON, everything else as XML.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("unable to read {}", path.display()))?;
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json(&text)
        } else {
            Self::from_xml(&text)
        }
    }

    /// Parses the XML scene dump produced by host adapters.
    pub fn from_xml(xml: &str) -> Result<Self> {
        let document = Document::parse(xml).context("invalid scene XML")?;
        let mut objects = Vec::new();

        for node in document.descendants().filter(|n| n.has_tag_name("object")) {
            let name = required_text(&node, "name")?;
            let object_type = optional_text(&node, "type").unwrap_or_else(default_object_type);
            let data = match object_type.to_ascii_lowercase().as_str() {
                "light" => ObjectData::Light(
                    light_from_node(&node).with_context(|| format!("invalid light {name}"))?,
                ),
                "camera" => ObjectData::Camera(
                    camera_from_node(&node).with_context(|| format!("invalid camera {name}"))?,
                ),
                _ => ObjectData::Other(object_type),
            };
            objects.push(SceneObject { name, data });
        }

        Ok(Self { objects })
    }

    /// Parses a JSON scene description of the form `{"objects": [...]}`.
    pub fn from_json(json: &str) -> Result<Self> {
        let description: SceneDescription =
            serde_json::from_str(json).context("invalid scene JSON")?;
        let objects = description
            .objects
            .into_iter()
            .map(SceneObject::try_from)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { objects })
    }

    /// Lights in host enumeration order.
    pub fn lights(&self) -> Vec<Light> {
        self.objects
            .iter()
            .filter_map(|object| match object.data {
                ObjectData::Light(light) => Some(light),
                _ => None,
            })
            .collect()
    }

    /// Cameras in host enumeration order.
    pub fn cameras(&self) -> Vec<Camera> {
        self.objects
            .iter()
            .filter_map(|object| match object.data {
                ObjectData::Camera(camera) => Some(camera),
                _ => None,
            })
            .collect()
    }
}

/// Named entry of the host object list.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneObject {
    pub name: String,
    pub data: ObjectData,
}

impl SceneObject {
    pub fn light(name: impl Into<String>, light: Light) -> Self {
        Self {
            name: name.into(),
            data: ObjectData::Light(light),
        }
    }

    pub fn camera(name: impl Into<String>, camera: Camera) -> Self {
        Self {
            name: name.into(),
            data: ObjectData::Camera(camera),
        }
    }
}

/// Type-specific payload of a scene object. Objects that are neither lights
/// nor cameras keep only their type tag.
#[derive(Debug, Clone, PartialEq)]
pub enum ObjectData {
    Light(Light),
    Camera(Camera),
    Other(String),
}

impl ObjectData {
    pub fn type_tag(&self) -> &str {
        match self {
            ObjectData::Light(_) => "light",
            ObjectData::Camera(_) => "camera",
            ObjectData::Other(tag) => tag,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LightKind {
    #[default]
    Point,
    Sun,
    Spot,
    Area,
}

impl LightKind {
    pub const ALL: [Self; 4] = [Self::Point, Self::Sun, Self::Spot, Self::Area];

    pub fn as_str(self) -> &'static str {
        match self {
            LightKind::Point => "POINT",
            LightKind::Sun => "SUN",
            LightKind::Spot => "SPOT",
            LightKind::Area => "AREA",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CameraKind {
    #[default]
    Persp,
    Ortho,
    Pano,
}

impl CameraKind {
    pub const ALL: [Self; 3] = [Self::Persp, Self::Ortho, Self::Pano];

    pub fn as_str(self) -> &'static str {
        match self {
            CameraKind::Persp => "PERSP",
            CameraKind::Ortho => "ORTHO",
            CameraKind::Pano => "PANO",
        }
    }
}

/// Which sensor dimension the lens field of view is fitted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SensorFit {
    #[default]
    Auto,
    Horizontal,
    Vertical,
}

impl SensorFit {
    pub const ALL: [Self; 3] = [Self::Auto, Self::Horizontal, Self::Vertical];

    pub fn as_str(self) -> &'static str {
        match self {
            SensorFit::Auto => "AUTO",
            SensorFit::Horizontal => "HORIZONTAL",
            SensorFit::Vertical => "VERTICAL",
        }
    }
}

macro_rules! keyword_enum_impls {
    ($($ty:ident => $what:literal),* $(,)?) => {
        $(
            impl fmt::Display for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(self.as_str())
                }
            }

            impl FromStr for $ty {
                type Err = anyhow::Error;

                fn from_str(value: &str) -> Result<Self> {
                    let value = value.trim();
                    Self::ALL
                        .into_iter()
                        .find(|kind| kind.as_str().eq_ignore_ascii_case(value))
                        .ok_or_else(|| anyhow!(concat!("unknown ", $what, ": {}"), value))
                }
            }
        )*
    };
}

keyword_enum_impls!(
    LightKind => "light type",
    CameraKind => "camera type",
    SensorFit => "sensor fit",
);

/// Light attributes read from the host.
///
/// `energy` is exported as `power` for point lights and `strength` for sun
/// lights. `radius` only applies to point lights; `angle` and `rotation` only
/// to sun lights.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Light {
    #[serde(rename = "subtype")]
    pub kind: LightKind,
    pub location: Vec3,
    pub rotation: Vec3,
    pub color: Vec3,
    pub diffuse: f32,
    pub specular: f32,
    pub volume: f32,
    pub energy: f32,
    pub radius: f32,
    pub angle: f32,
}

impl Default for Light {
    fn default() -> Self {
        Self {
            kind: LightKind::default(),
            location: Vec3::ZERO,
            rotation: Vec3::ZERO,
            color: Vec3::ONE,
            diffuse: 1.0,
            specular: 1.0,
            volume: 1.0,
            energy: 10.0,
            radius: 0.25,
            angle: 0.009_180_43,
        }
    }
}

/// Camera attributes read from the host. Distances are scene units, `lens`
/// and the sensor dimensions are millimetres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Camera {
    #[serde(rename = "subtype")]
    pub kind: CameraKind,
    pub location: Vec3,
    pub rotation: Vec3,
    pub lens: f32,
    pub clip_start: f32,
    pub clip_end: f32,
    pub ortho_scale: f32,
    pub sensor_fit: SensorFit,
    pub sensor_width: f32,
    pub sensor_height: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            kind: CameraKind::default(),
            location: Vec3::ZERO,
            rotation: Vec3::ZERO,
            lens: 50.0,
            clip_start: 0.1,
            clip_end: 100.0,
            ortho_scale: 6.0,
            sensor_fit: SensorFit::default(),
            sensor_width: 36.0,
            sensor_height: 24.0,
        }
    }
}

fn default_object_type() -> String {
    "mesh".to_string()
}

#[derive(Debug, Deserialize)]
struct SceneDescription {
    #[serde(default)]
    objects: Vec<ObjectDescription>,
}

#[derive(Debug, Deserialize)]
struct ObjectDescription {
    name: String,
    #[serde(rename = "type", default = "default_object_type")]
    object_type: String,
    #[serde(flatten)]
    attributes: Map<String, Value>,
}

impl TryFrom<ObjectDescription> for SceneObject {
    type Error = anyhow::Error;

    fn try_from(description: ObjectDescription) -> Result<Self> {
        let ObjectDescription {
            name,
            object_type,
            attributes,
        } = description;
        let data = match object_type.to_ascii_lowercase().as_str() {
            "light" => ObjectData::Light(
                serde_json::from_value(Value::Object(attributes))
                    .with_context(|| format!("invalid light {name}"))?,
            ),
            "camera" => ObjectData::Camera(
                serde_json::from_value(Value::Object(attributes))
                    .with_context(|| format!("invalid camera {name}"))?,
            ),
            _ => ObjectData::Other(object_type),
        };
        Ok(Self { name, data })
    }
}

fn light_from_node(node: &Node<'_, '_>) -> Result<Light> {
    let defaults = Light::default();
    Ok(Light {
        kind: parse_keyword(optional_text(node, "subtype"), defaults.kind)?,
        location: parse_vec3(optional_text(node, "location"), defaults.location)?,
        rotation: parse_vec3(optional_text(node, "rotation"), defaults.rotation)?,
        color: parse_vec3(optional_text(node, "color"), defaults.color)?,
        diffuse: parse_f32(optional_text(node, "diffuse"), defaults.diffuse)?,
        specular: parse_f32(optional_text(node, "specular"), defaults.specular)?,
        volume: parse_f32(optional_text(node, "volume"), defaults.volume)?,
        energy: parse_f32(optional_text(node, "energy"), defaults.energy)?,
        radius: parse_f32(optional_text(node, "radius"), defaults.radius)?,
        angle: parse_f32(optional_text(node, "angle"), defaults.angle)?,
    })
}

fn camera_from_node(node: &Node<'_, '_>) -> Result<Camera> {
    let defaults = Camera::default();
    Ok(Camera {
        kind: parse_keyword(optional_text(node, "subtype"), defaults.kind)?,
        location: parse_vec3(optional_text(node, "location"), defaults.location)?,
        rotation: parse_vec3(optional_text(node, "rotation"), defaults.rotation)?,
        lens: parse_f32(optional_text(node, "lens"), defaults.lens)?,
        clip_start: parse_f32(optional_text(node, "clip_start"), defaults.clip_start)?,
        clip_end: parse_f32(optional_text(node, "clip_end"), defaults.clip_end)?,
        ortho_scale: parse_f32(optional_text(node, "ortho_scale"), defaults.ortho_scale)?,
        sensor_fit: parse_keyword(optional_text(node, "sensor_fit"), defaults.sensor_fit)?,
        sensor_width: parse_f32(optional_text(node, "sensor_width"), defaults.sensor_width)?,
        sensor_height: parse_f32(optional_text(node, "sensor_height"), defaults.sensor_height)?,
    })
}

fn required_text(node: &Node<'_, '_>, tag: &str) -> Result<String> {
    optional_text(node, tag).ok_or_else(|| anyhow!("<{tag}> tag is missing"))
}

fn optional_text(node: &Node<'_, '_>, tag: &str) -> Option<String> {
    node.children()
        .find(|child| child.has_tag_name(tag))
        .and_then(|child| child.text())
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(|text| text.to_string())
}

fn parse_keyword<T>(value: Option<String>, default: T) -> Result<T>
where
    T: FromStr<Err = anyhow::Error>,
{
    match value {
        Some(value) => value.parse(),
        None => Ok(default),
    }
}

fn parse_vec3(value: Option<String>, default: Vec3) -> Result<Vec3> {
    let Some(value) = value else {
        return Ok(default);
    };
    let components = value
        .split_whitespace()
        .map(|component| {
            component
                .parse::<f32>()
                .map_err(|err| anyhow!("invalid vector component {component:?}: {err}"))
        })
        .collect::<Result<Vec<_>>>()?;
    match components.as_slice() {
        [x, y, z] => Ok(Vec3::new(*x, *y, *z)),
        _ => Err(anyhow!(
            "vector must have 3 components, found {}",
            components.len()
        )),
    }
}

fn parse_f32(value: Option<String>, default: f32) -> Result<f32> {
    match value {
        Some(value) => value
            .parse::<f32>()
            .map_err(|err| anyhow!("failed to parse float {value:?}: {err}")),
        None => Ok(default),
    }
}
