//! Parsed ISF header document.
//!
//! The header is a JSON object using UPPERCASE keys (`DESCRIPTION`,
//! `INPUTS`, `PERSISTENT_BUFFERS`, `PASSES`, …). `DEFAULT`/`MIN`/`MAX` are
//! polymorphic and interpreted per the declared `TYPE`, so the raw document
//! carries them as [`serde_json::Value`] and conversion happens in a second,
//! type-directed step.

use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;
use serde_json::Value;

use crate::EngineError;

/// The declared type tag of one shader input. Immutable after construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputKind {
    Bool,
    Float,
    Color,
    Point2D,
    Long,
    Image,
    Event,
}

impl fmt::Display for InputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            InputKind::Bool => "bool",
            InputKind::Float => "float",
            InputKind::Color => "color",
            InputKind::Point2D => "point2D",
            InputKind::Long => "long",
            InputKind::Image => "image",
            InputKind::Event => "event",
        };
        f.write_str(s)
    }
}

/// One `VALUES`/`LABELS` pair of a long (enumerated int) input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LongEntry {
    pub value: i32,
    pub label: String,
}

/// One typed entry of the header's `INPUTS` array.
#[derive(Debug, Clone, PartialEq)]
pub enum InputDecl {
    Bool {
        name: String,
        default: bool,
    },
    Float {
        name: String,
        default: f32,
        range: Option<(f32, f32)>,
    },
    Color {
        name: String,
        default: [f32; 4],
        range: Option<([f32; 4], [f32; 4])>,
    },
    Point2D {
        name: String,
        default: [f32; 2],
        range: Option<([f32; 2], [f32; 2])>,
    },
    Long {
        name: String,
        default: i32,
        entries: Vec<LongEntry>,
    },
    Image {
        name: String,
    },
    Event {
        name: String,
    },
}

impl InputDecl {
    pub fn name(&self) -> &str {
        match self {
            InputDecl::Bool { name, .. }
            | InputDecl::Float { name, .. }
            | InputDecl::Color { name, .. }
            | InputDecl::Point2D { name, .. }
            | InputDecl::Long { name, .. }
            | InputDecl::Image { name }
            | InputDecl::Event { name } => name,
        }
    }

    pub fn kind(&self) -> InputKind {
        match self {
            InputDecl::Bool { .. } => InputKind::Bool,
            InputDecl::Float { .. } => InputKind::Float,
            InputDecl::Color { .. } => InputKind::Color,
            InputDecl::Point2D { .. } => InputKind::Point2D,
            InputDecl::Long { .. } => InputKind::Long,
            InputDecl::Image { .. } => InputKind::Image,
            InputDecl::Event { .. } => InputKind::Event,
        }
    }
}

/// One `PERSISTENT_BUFFERS` entry. Width/height default to the render size
/// at allocation time when the header does not size the buffer explicitly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferDecl {
    pub name: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// One `PASSES` entry. An empty target renders into the default framebuffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassDecl {
    pub target: String,
}

/// The fully parsed header document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Header {
    pub description: String,
    pub credit: String,
    pub categories: Vec<String>,
    pub inputs: Vec<InputDecl>,
    pub buffers: Vec<BufferDecl>,
    pub passes: Vec<PassDecl>,
}

// ---- Raw serde document (UPPERCASE ISF keys) ----

#[derive(Debug, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
struct RawHeader {
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    credit: Option<String>,
    #[serde(default)]
    categories: Vec<String>,
    #[serde(default)]
    inputs: Vec<RawInput>,
    #[serde(default)]
    persistent_buffers: Option<RawBuffers>,
    #[serde(default)]
    passes: Vec<RawPass>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
struct RawInput {
    name: String,
    #[serde(rename = "TYPE")]
    kind: String,
    #[serde(default)]
    default: Option<Value>,
    #[serde(default)]
    min: Option<Value>,
    #[serde(default)]
    max: Option<Value>,
    #[serde(default)]
    labels: Option<Vec<String>>,
    #[serde(default)]
    values: Option<Vec<i64>>,
}

/// `PERSISTENT_BUFFERS` comes in two shapes: a plain array of names, or an
/// object mapping names to explicit sizes.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawBuffers {
    Names(Vec<String>),
    Sized(BTreeMap<String, RawBufferSize>),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
struct RawBufferSize {
    #[serde(default)]
    width: Option<u32>,
    #[serde(default)]
    height: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
struct RawPass {
    #[serde(default)]
    target: String,
}

impl Header {
    /// Parses header text into the typed document.
    ///
    /// Non-JSON text and a non-object root are distinct failures. Inputs
    /// with an unrecognized `TYPE` are skipped with a warning rather than
    /// failing the parse, so headers written for newer ISF revisions still
    /// load with the inputs this engine understands.
    pub fn parse(text: &str) -> Result<Self, EngineError> {
        let root: Value = serde_json::from_str(text)?;
        if !root.is_object() {
            return Err(EngineError::HeaderNotObject);
        }
        let raw: RawHeader = serde_json::from_value(root)?;

        let mut inputs = Vec::with_capacity(raw.inputs.len());
        for entry in &raw.inputs {
            match convert_input(entry) {
                Some(decl) => inputs.push(decl),
                None => {
                    tracing::warn!(
                        name = %entry.name,
                        kind = %entry.kind,
                        "skipping input with unrecognized TYPE"
                    );
                }
            }
        }

        let buffers = match raw.persistent_buffers {
            None => Vec::new(),
            Some(RawBuffers::Names(names)) => names
                .into_iter()
                .map(|name| BufferDecl {
                    name,
                    width: None,
                    height: None,
                })
                .collect(),
            Some(RawBuffers::Sized(map)) => map
                .into_iter()
                .map(|(name, size)| BufferDecl {
                    name,
                    width: size.width,
                    height: size.height,
                })
                .collect(),
        };

        let passes = raw
            .passes
            .into_iter()
            .map(|p| PassDecl { target: p.target })
            .collect();

        Ok(Header {
            description: raw.description.unwrap_or_default(),
            credit: raw.credit.unwrap_or_default(),
            categories: raw.categories,
            inputs,
            buffers,
            passes,
        })
    }
}

fn convert_input(raw: &RawInput) -> Option<InputDecl> {
    let name = raw.name.clone();
    match raw.kind.as_str() {
        "bool" => Some(InputDecl::Bool {
            name,
            default: raw.default.as_ref().map(value_as_bool).unwrap_or(false),
        }),
        "float" => Some(InputDecl::Float {
            name,
            default: raw
                .default
                .as_ref()
                .and_then(Value::as_f64)
                .unwrap_or(0.0) as f32,
            range: match (
                raw.min.as_ref().and_then(Value::as_f64),
                raw.max.as_ref().and_then(Value::as_f64),
            ) {
                (Some(min), Some(max)) => Some((min as f32, max as f32)),
                _ => None,
            },
        }),
        "color" => Some(InputDecl::Color {
            name,
            default: raw
                .default
                .as_ref()
                .and_then(value_as_vec4)
                .unwrap_or([0.0; 4]),
            range: match (
                raw.min.as_ref().and_then(value_as_vec4),
                raw.max.as_ref().and_then(value_as_vec4),
            ) {
                (Some(min), Some(max)) => Some((min, max)),
                _ => None,
            },
        }),
        "point2D" => Some(InputDecl::Point2D {
            name,
            default: raw
                .default
                .as_ref()
                .and_then(value_as_vec2)
                .unwrap_or([0.0; 2]),
            range: match (
                raw.min.as_ref().and_then(value_as_vec2),
                raw.max.as_ref().and_then(value_as_vec2),
            ) {
                (Some(min), Some(max)) => Some((min, max)),
                _ => None,
            },
        }),
        "long" => {
            let entries = match (&raw.values, &raw.labels) {
                (Some(values), Some(labels)) => values
                    .iter()
                    .zip(labels)
                    .map(|(v, l)| LongEntry {
                        value: *v as i32,
                        label: l.clone(),
                    })
                    .collect(),
                _ => Vec::new(),
            };
            Some(InputDecl::Long {
                name,
                default: raw.default.as_ref().and_then(Value::as_f64).unwrap_or(0.0) as i32,
                entries,
            })
        }
        "image" => Some(InputDecl::Image { name }),
        "event" => Some(InputDecl::Event { name }),
        _ => None,
    }
}

/// Bool defaults tolerate both JSON booleans and 0/1 numbers.
fn value_as_bool(v: &Value) -> bool {
    match v {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|x| x != 0.0).unwrap_or(false),
        _ => false,
    }
}

fn value_as_vec2(v: &Value) -> Option<[f32; 2]> {
    let arr = v.as_array()?;
    if arr.len() < 2 {
        return None;
    }
    Some([arr[0].as_f64()? as f32, arr[1].as_f64()? as f32])
}

fn value_as_vec4(v: &Value) -> Option<[f32; 4]> {
    let arr = v.as_array()?;
    if arr.len() < 4 {
        return None;
    }
    Some([
        arr[0].as_f64()? as f32,
        arr[1].as_f64()? as f32,
        arr[2].as_f64()? as f32,
        arr[3].as_f64()? as f32,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_metadata_and_float_input() {
        let header = Header::parse(
            r#"{
                "DESCRIPTION": "d",
                "CREDIT": "c",
                "CATEGORIES": ["Generator", "Test"],
                "INPUTS": [
                    {"NAME": "amt", "TYPE": "float", "DEFAULT": 0.5, "MIN": 0, "MAX": 1}
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(header.description, "d");
        assert_eq!(header.credit, "c");
        assert_eq!(header.categories, vec!["Generator", "Test"]);
        assert_eq!(
            header.inputs,
            vec![InputDecl::Float {
                name: "amt".into(),
                default: 0.5,
                range: Some((0.0, 1.0)),
            }]
        );
    }

    #[test]
    fn rejects_non_object_root() {
        assert!(matches!(
            Header::parse("[1, 2, 3]"),
            Err(EngineError::HeaderNotObject)
        ));
        assert!(matches!(
            Header::parse("not json at all"),
            Err(EngineError::InvalidHeaderJson(_))
        ));
    }

    #[test]
    fn color_default_reads_each_channel() {
        let header = Header::parse(
            r#"{"INPUTS": [{"NAME": "tint", "TYPE": "color", "DEFAULT": [0.1, 0.2, 0.3, 0.4]}]}"#,
        )
        .unwrap();
        assert_eq!(
            header.inputs,
            vec![InputDecl::Color {
                name: "tint".into(),
                default: [0.1, 0.2, 0.3, 0.4],
                range: None,
            }]
        );
    }

    #[test]
    fn unknown_input_type_is_skipped() {
        let header = Header::parse(
            r#"{"INPUTS": [
                {"NAME": "a", "TYPE": "audioFFT"},
                {"NAME": "b", "TYPE": "bool", "DEFAULT": 1}
            ]}"#,
        )
        .unwrap();
        assert_eq!(
            header.inputs,
            vec![InputDecl::Bool {
                name: "b".into(),
                default: true,
            }]
        );
    }

    #[test]
    fn long_entries_zip_values_and_labels() {
        let header = Header::parse(
            r#"{"INPUTS": [{
                "NAME": "mode", "TYPE": "long", "DEFAULT": 2,
                "VALUES": [0, 1, 2], "LABELS": ["off", "low", "high"]
            }]}"#,
        )
        .unwrap();
        let InputDecl::Long {
            default, entries, ..
        } = &header.inputs[0]
        else {
            panic!("expected a long input");
        };
        assert_eq!(*default, 2);
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[2].value, 2);
        assert_eq!(entries[2].label, "high");
    }

    #[test]
    fn persistent_buffers_array_form() {
        let header =
            Header::parse(r#"{"PERSISTENT_BUFFERS": ["feedback", "blur"]}"#).unwrap();
        assert_eq!(header.buffers.len(), 2);
        assert_eq!(header.buffers[0].name, "feedback");
        assert_eq!(header.buffers[0].width, None);
    }

    #[test]
    fn persistent_buffers_object_form() {
        let header = Header::parse(
            r#"{"PERSISTENT_BUFFERS": {"half": {"WIDTH": 640, "HEIGHT": 360}, "full": {}}}"#,
        )
        .unwrap();
        assert_eq!(header.buffers.len(), 2);
        let half = header.buffers.iter().find(|b| b.name == "half").unwrap();
        assert_eq!((half.width, half.height), (Some(640), Some(360)));
        let full = header.buffers.iter().find(|b| b.name == "full").unwrap();
        assert_eq!((full.width, full.height), (None, None));
    }

    #[test]
    fn passes_keep_declared_order_and_allow_empty_target() {
        let header =
            Header::parse(r#"{"PASSES": [{"TARGET": "a"}, {"TARGET": ""}, {}]}"#).unwrap();
        assert_eq!(
            header.passes,
            vec![
                PassDecl { target: "a".into() },
                PassDecl { target: "".into() },
                PassDecl { target: "".into() },
            ]
        );
    }
}
