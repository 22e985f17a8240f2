//! Typed uniform model and registry.
//
// Value storage, range clamping, GLSL declaration text, and upload staging
// are all GL-free; only `push_to_program` touches the context. The host owns
// the GL lifecycle and passes `&glow::Context` in, as everywhere else in the
// engine.
#![allow(clippy::missing_safety_doc)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(missing_debug_implementations)]

use std::collections::HashMap;

use glow::HasContext;

use risf_core::{EngineError, InputDecl, InputKind, LongEntry};

/// How a bound texture is addressed in GLSL: normalized 0–1 coordinates
/// (`sampler2D`) or pixel coordinates (`sampler2DRect`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureAddressing {
    Normalized,
    Rectangle,
}

/// A texture bound to an image uniform: the GL handle plus the metadata the
/// engine needs without querying the context (size and addressing mode).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageBinding {
    pub texture: glow::NativeTexture,
    pub width: f32,
    pub height: f32,
    pub addressing: TextureAddressing,
}

impl ImageBinding {
    pub fn normalized(texture: glow::NativeTexture, width: f32, height: f32) -> Self {
        Self {
            texture,
            width,
            height,
            addressing: TextureAddressing::Normalized,
        }
    }

    pub fn rectangle(texture: glow::NativeTexture, width: f32, height: f32) -> Self {
        Self {
            texture,
            width,
            height,
            addressing: TextureAddressing::Rectangle,
        }
    }

    /// The normalized-to-actual texel scale uploaded as `_<name>_pct`.
    /// Unit scale for normalized textures, the pixel size for rectangle ones.
    fn pct(&self) -> [f32; 2] {
        match self.addressing {
            TextureAddressing::Normalized => [1.0, 1.0],
            TextureAddressing::Rectangle => [self.width, self.height],
        }
    }

    fn gl_target(&self) -> u32 {
        match self.addressing {
            TextureAddressing::Normalized => glow::TEXTURE_2D,
            TextureAddressing::Rectangle => glow::TEXTURE_RECTANGLE,
        }
    }
}

/// Sequential texture-unit allocator for one render pass.
///
/// Construct a fresh one at the start of every pass. Units are handed out
/// pre-incremented (first allocation returns 1), leaving unit 0 to the host.
/// Rendering is single-threaded and sequential, so a plain value threaded
/// through the upload loop is all the state this needs.
#[derive(Debug, Default, Clone, Copy)]
pub struct TextureUnits {
    last: u32,
}

impl TextureUnits {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(&mut self) -> u32 {
        self.last += 1;
        self.last
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Payload {
    Bool {
        value: bool,
    },
    Float {
        value: f32,
        range: Option<(f32, f32)>,
    },
    Color {
        value: [f32; 4],
        range: Option<([f32; 4], [f32; 4])>,
    },
    Point2D {
        value: [f32; 2],
        range: Option<([f32; 2], [f32; 2])>,
    },
    Long {
        value: i32,
        entries: Vec<LongEntry>,
    },
    Image {
        binding: Option<ImageBinding>,
        was_rectangle: bool,
    },
    Event {
        fired: bool,
    },
}

/// The value a uniform would upload this pass, with clamping and one-shot
/// semantics already applied. Staging is pure so these rules are testable
/// without a GL context.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformUpload {
    Bool(bool),
    Float(f32),
    Color([f32; 4]),
    Point2D([f32; 2]),
    Long(i32),
    Image {
        texture: glow::NativeTexture,
        target: u32,
        pct: [f32; 2],
    },
    /// Nothing to upload (an unbound image input).
    Skip,
}

/// One declared shader input: a name plus a closed typed payload.
///
/// The type tag is fixed at construction; value mutation goes through the
/// type-checked setters, which reject mismatches as an error the caller can
/// log and drop.
#[derive(Debug, Clone, PartialEq)]
pub struct Uniform {
    name: String,
    payload: Payload,
}

impl Uniform {
    /// Builds a uniform from a header input declaration, taking the declared
    /// default as the initial value.
    pub fn from_decl(decl: &InputDecl) -> Self {
        let payload = match decl {
            InputDecl::Bool { default, .. } => Payload::Bool { value: *default },
            InputDecl::Float { default, range, .. } => Payload::Float {
                value: *default,
                range: *range,
            },
            InputDecl::Color { default, range, .. } => Payload::Color {
                value: *default,
                range: *range,
            },
            InputDecl::Point2D { default, range, .. } => Payload::Point2D {
                value: *default,
                range: *range,
            },
            InputDecl::Long {
                default, entries, ..
            } => Payload::Long {
                value: *default,
                entries: entries.clone(),
            },
            InputDecl::Image { .. } => Payload::Image {
                binding: None,
                was_rectangle: false,
            },
            InputDecl::Event { .. } => Payload::Event { fired: false },
        };
        Self {
            name: decl.name().to_string(),
            payload,
        }
    }

    /// An unbound image uniform (host or engine binds a texture later).
    pub fn image(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            payload: Payload::Image {
                binding: None,
                was_rectangle: false,
            },
        }
    }

    /// An image uniform already bound to a texture. Used for the sampler
    /// uniforms synthesized per persistent buffer.
    pub fn bound_image(name: impl Into<String>, binding: ImageBinding) -> Self {
        Self {
            name: name.into(),
            payload: Payload::Image {
                binding: Some(binding),
                was_rectangle: binding.addressing == TextureAddressing::Rectangle,
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> InputKind {
        match self.payload {
            Payload::Bool { .. } => InputKind::Bool,
            Payload::Float { .. } => InputKind::Float,
            Payload::Color { .. } => InputKind::Color,
            Payload::Point2D { .. } => InputKind::Point2D,
            Payload::Long { .. } => InputKind::Long,
            Payload::Image { .. } => InputKind::Image,
            Payload::Event { .. } => InputKind::Event,
        }
    }

    pub fn is_image(&self) -> bool {
        matches!(self.payload, Payload::Image { .. })
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self.payload {
            Payload::Bool { value } => Some(value),
            Payload::Event { fired } => Some(fired),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f32> {
        match self.payload {
            Payload::Float { value, .. } => Some(value),
            _ => None,
        }
    }

    pub fn as_color(&self) -> Option<[f32; 4]> {
        match self.payload {
            Payload::Color { value, .. } => Some(value),
            _ => None,
        }
    }

    pub fn as_point2d(&self) -> Option<[f32; 2]> {
        match self.payload {
            Payload::Point2D { value, .. } => Some(value),
            _ => None,
        }
    }

    pub fn as_long(&self) -> Option<i32> {
        match self.payload {
            Payload::Long { value, .. } => Some(value),
            _ => None,
        }
    }

    pub fn long_entries(&self) -> Option<&[LongEntry]> {
        match &self.payload {
            Payload::Long { entries, .. } => Some(entries),
            _ => None,
        }
    }

    pub fn image_binding(&self) -> Option<ImageBinding> {
        match self.payload {
            Payload::Image { binding, .. } => binding,
            _ => None,
        }
    }

    /// True when this is an image uniform currently bound to a
    /// rectangle-addressed texture. Unbound images are never rectangle.
    pub fn is_rectangle(&self) -> bool {
        matches!(
            self.payload,
            Payload::Image {
                binding: Some(ImageBinding {
                    addressing: TextureAddressing::Rectangle,
                    ..
                }),
                ..
            }
        )
    }

    /// Compares the current addressing mode against the last observed one,
    /// updating the cache. Returns true when a rebind changed the mode
    /// (rectangle ↔ normalized), which obligates a shader regeneration
    /// before the next render. Always false for non-image uniforms.
    pub fn texture_format_changed(&mut self) -> bool {
        let rectangle = self.is_rectangle();
        match &mut self.payload {
            Payload::Image {
                binding: Some(_),
                was_rectangle,
            } => {
                let changed = *was_rectangle != rectangle;
                *was_rectangle = rectangle;
                changed
            }
            _ => false,
        }
    }

    // ---- Type-checked setters ----

    pub fn set_bool(&mut self, v: bool) -> Result<(), EngineError> {
        match &mut self.payload {
            Payload::Bool { value } => {
                *value = v;
                Ok(())
            }
            _ => Err(self.mismatch(InputKind::Bool)),
        }
    }

    pub fn set_float(&mut self, v: f32) -> Result<(), EngineError> {
        match &mut self.payload {
            Payload::Float { value, .. } => {
                *value = v;
                Ok(())
            }
            _ => Err(self.mismatch(InputKind::Float)),
        }
    }

    pub fn set_color(&mut self, v: [f32; 4]) -> Result<(), EngineError> {
        match &mut self.payload {
            Payload::Color { value, .. } => {
                *value = v;
                Ok(())
            }
            _ => Err(self.mismatch(InputKind::Color)),
        }
    }

    pub fn set_point2d(&mut self, v: [f32; 2]) -> Result<(), EngineError> {
        match &mut self.payload {
            Payload::Point2D { value, .. } => {
                *value = v;
                Ok(())
            }
            _ => Err(self.mismatch(InputKind::Point2D)),
        }
    }

    pub fn set_long(&mut self, v: i32) -> Result<(), EngineError> {
        match &mut self.payload {
            Payload::Long { value, .. } => {
                *value = v;
                Ok(())
            }
            _ => Err(self.mismatch(InputKind::Long)),
        }
    }

    /// Arms (or disarms) an event input. The event uploads true for exactly
    /// one render call and then clears itself.
    pub fn set_event(&mut self, v: bool) -> Result<(), EngineError> {
        match &mut self.payload {
            Payload::Event { fired } => {
                *fired = v;
                Ok(())
            }
            _ => Err(self.mismatch(InputKind::Event)),
        }
    }

    pub fn set_image(&mut self, v: Option<ImageBinding>) -> Result<(), EngineError> {
        match &mut self.payload {
            Payload::Image { binding, .. } => {
                *binding = v;
                Ok(())
            }
            _ => Err(self.mismatch(InputKind::Image)),
        }
    }

    fn mismatch(&self, requested: InputKind) -> EngineError {
        EngineError::TypeMismatch {
            name: self.name.clone(),
            requested,
            actual: self.kind(),
        }
    }

    // ---- Declaration / upload ----

    /// The `uniform …;` declaration line(s) for this input. Image uniforms
    /// also declare their `_<name>_pct` scale, and pick the sampler type
    /// from the current addressing mode.
    pub fn declaration(&self) -> String {
        let name = &self.name;
        match &self.payload {
            Payload::Bool { .. } | Payload::Event { .. } => format!("uniform bool {name};"),
            Payload::Float { .. } => format!("uniform float {name};"),
            Payload::Color { .. } => format!("uniform vec4 {name};"),
            Payload::Point2D { .. } => format!("uniform vec2 {name};"),
            Payload::Long { .. } => format!("uniform int {name};"),
            Payload::Image { .. } => {
                let sampler = if self.is_rectangle() {
                    "sampler2DRect"
                } else {
                    "sampler2D"
                };
                format!("uniform {sampler} {name};\nuniform vec2 _{name}_pct;")
            }
        }
    }

    /// Computes the value to upload for this pass: range-clamped for
    /// float/color/point2D (out-of-range values are silently clamped, never
    /// rejected), one-shot for events, resolved to texture/target/pct for
    /// bound images, [`UniformUpload::Skip`] for unbound ones.
    pub fn stage_upload(&mut self) -> UniformUpload {
        match &mut self.payload {
            Payload::Bool { value } => UniformUpload::Bool(*value),
            Payload::Float { value, range } => UniformUpload::Float(match range {
                Some((min, max)) => value.clamp(*min, *max),
                None => *value,
            }),
            Payload::Color { value, range } => {
                let mut v = *value;
                if let Some((min, max)) = range {
                    for i in 0..4 {
                        v[i] = v[i].clamp(min[i], max[i]);
                    }
                }
                UniformUpload::Color(v)
            }
            Payload::Point2D { value, range } => {
                let mut v = *value;
                if let Some((min, max)) = range {
                    for i in 0..2 {
                        v[i] = v[i].clamp(min[i], max[i]);
                    }
                }
                UniformUpload::Point2D(v)
            }
            Payload::Long { value, .. } => UniformUpload::Long(*value),
            Payload::Image { binding, .. } => match binding {
                Some(b) => UniformUpload::Image {
                    texture: b.texture,
                    target: b.gl_target(),
                    pct: b.pct(),
                },
                None => UniformUpload::Skip,
            },
            Payload::Event { fired } => {
                let v = *fired;
                *fired = false;
                UniformUpload::Bool(v)
            }
        }
    }

    /// Uploads the staged value into the program's uniform slot of matching
    /// name. Image uniforms consume the next sequential texture unit and
    /// also upload their percent-scale vector.
    pub unsafe fn push_to_program(
        &mut self,
        gl: &glow::Context,
        program: glow::NativeProgram,
        units: &mut TextureUnits,
    ) {
        match self.stage_upload() {
            UniformUpload::Bool(v) => {
                if let Some(loc) = gl.get_uniform_location(program, &self.name) {
                    gl.uniform_1_i32(Some(&loc), v as i32);
                }
            }
            UniformUpload::Float(v) => {
                if let Some(loc) = gl.get_uniform_location(program, &self.name) {
                    gl.uniform_1_f32(Some(&loc), v);
                }
            }
            UniformUpload::Color(v) => {
                if let Some(loc) = gl.get_uniform_location(program, &self.name) {
                    gl.uniform_4_f32(Some(&loc), v[0], v[1], v[2], v[3]);
                }
            }
            UniformUpload::Point2D(v) => {
                if let Some(loc) = gl.get_uniform_location(program, &self.name) {
                    gl.uniform_2_f32(Some(&loc), v[0], v[1]);
                }
            }
            UniformUpload::Long(v) => {
                if let Some(loc) = gl.get_uniform_location(program, &self.name) {
                    gl.uniform_1_i32(Some(&loc), v);
                }
            }
            UniformUpload::Image {
                texture,
                target,
                pct,
            } => {
                let unit = units.allocate();
                gl.active_texture(glow::TEXTURE0 + unit);
                gl.bind_texture(target, Some(texture));
                if let Some(loc) = gl.get_uniform_location(program, &self.name) {
                    gl.uniform_1_i32(Some(&loc), unit as i32);
                }
                let pct_name = format!("_{}_pct", self.name);
                if let Some(loc) = gl.get_uniform_location(program, &pct_name) {
                    gl.uniform_2_f32(Some(&loc), pct[0], pct[1]);
                }
            }
            UniformUpload::Skip => {}
        }
    }
}

/// Ordered, name-keyed collection of uniforms.
///
/// Insertion order is iteration order is declaration order. The name lookup
/// and the image subsequence are derived indexes, refreshed atomically on
/// every insert/remove so they can never disagree with the sequence.
#[derive(Debug, Clone, Default)]
pub struct UniformRegistry {
    ordered: Vec<Uniform>,
    by_name: HashMap<String, usize>,
    image_indices: Vec<usize>,
}

impl UniformRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    pub fn has(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Appends a uniform. Rejected (returns false, existing entry kept) when
    /// the name is already present.
    pub fn add(&mut self, uniform: Uniform) -> bool {
        if self.has(uniform.name()) {
            return false;
        }
        self.ordered.push(uniform);
        self.reindex();
        true
    }

    /// Removes by name; no-op when absent. Used when an input's type changes
    /// across a reload (old entry out, new one in under the same name).
    pub fn remove(&mut self, name: &str) {
        let Some(idx) = self.by_name.get(name).copied() else {
            return;
        };
        self.ordered.remove(idx);
        self.reindex();
    }

    pub fn clear(&mut self) {
        self.ordered.clear();
        self.by_name.clear();
        self.image_indices.clear();
    }

    pub fn get(&self, name: &str) -> Option<&Uniform> {
        self.by_name.get(name).map(|&i| &self.ordered[i])
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Uniform> {
        match self.by_name.get(name).copied() {
            Some(i) => Some(&mut self.ordered[i]),
            None => None,
        }
    }

    pub fn at(&self, index: usize) -> Option<&Uniform> {
        self.ordered.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Uniform> {
        self.ordered.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Uniform> {
        self.ordered.iter_mut()
    }

    /// Image-typed uniforms in declaration order.
    pub fn images(&self) -> impl Iterator<Item = &Uniform> {
        self.image_indices.iter().map(|&i| &self.ordered[i])
    }

    fn reindex(&mut self) {
        self.by_name.clear();
        self.image_indices.clear();
        for (i, u) in self.ordered.iter().enumerate() {
            self.by_name.insert(u.name().to_string(), i);
            if u.is_image() {
                self.image_indices.push(i);
            }
        }
    }

    // ---- Typed set-by-name ----

    fn lookup_mut(&mut self, name: &str) -> Result<&mut Uniform, EngineError> {
        self.get_mut(name)
            .ok_or_else(|| EngineError::UnknownUniform(name.to_string()))
    }

    pub fn set_bool(&mut self, name: &str, v: bool) -> Result<(), EngineError> {
        self.lookup_mut(name)?.set_bool(v)
    }

    pub fn set_float(&mut self, name: &str, v: f32) -> Result<(), EngineError> {
        self.lookup_mut(name)?.set_float(v)
    }

    pub fn set_color(&mut self, name: &str, v: [f32; 4]) -> Result<(), EngineError> {
        self.lookup_mut(name)?.set_color(v)
    }

    pub fn set_point2d(&mut self, name: &str, v: [f32; 2]) -> Result<(), EngineError> {
        self.lookup_mut(name)?.set_point2d(v)
    }

    pub fn set_long(&mut self, name: &str, v: i32) -> Result<(), EngineError> {
        self.lookup_mut(name)?.set_long(v)
    }

    pub fn set_event(&mut self, name: &str, v: bool) -> Result<(), EngineError> {
        self.lookup_mut(name)?.set_event(v)
    }

    pub fn set_image(&mut self, name: &str, v: Option<ImageBinding>) -> Result<(), EngineError> {
        self.lookup_mut(name)?.set_image(v)
    }
}
