#![forbid(unsafe_code)]

//! GLSL assembly for ISF sources.
//!
//! Takes a macro-annotated fragment body plus the uniform registry and
//! produces the final vertex/fragment pair: a fixed template per stage with
//! `$UNIFORMS$` replaced by every registry declaration in order, and
//! `$ISF_SOURCE$` replaced by the body after image-lookup macro expansion.
//!
//! The ISF macros are a narrow lexical subset of GLSL, so expansion is a
//! textual pattern-substitution pass, not a parse. An image name that does
//! not resolve against the registry aborts generation; nothing is partially
//! rewritten on failure.
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(missing_debug_implementations)]

use std::collections::HashMap;

use regex::Regex;

use risf_core::EngineError;
use risf_uniforms::UniformRegistry;

/// Vertex stage template. The runtime draws a clip-space fullscreen
/// triangle, so the stage only forwards the normalized coordinate.
pub const VERTEX_TEMPLATE: &str = r#"#version 120

uniform int PASSINDEX;
uniform vec2 RENDERSIZE;

attribute vec2 a_pos;
attribute vec2 a_uv;

varying vec2 vv_FragNormCoord;

$UNIFORMS$

void vv_vertShaderInit(void)
{
	gl_Position = vec4(a_pos, 0.0, 1.0);
	vv_FragNormCoord = a_uv;
}

void main(void)
{
	vv_vertShaderInit();
}
"#;

/// Fragment stage template: ISF built-ins, the image lookup helpers the
/// expanded macros call into, and the transformed body.
pub const FRAGMENT_TEMPLATE: &str = r#"#version 120

// ISF built-ins

uniform int PASSINDEX;
uniform vec2 RENDERSIZE;
uniform float TIME;
varying vec2 vv_FragNormCoord;

$UNIFORMS$

// ISF image lookup helpers

vec4 IMG_NORM_PIXEL_2D(sampler2D sampler, vec2 pct, vec2 normLoc)
{
	return texture2D(sampler, normLoc * pct);
}
vec4 IMG_PIXEL_2D(sampler2D sampler, vec2 pct, vec2 loc)
{
	return IMG_NORM_PIXEL_2D(sampler, pct, loc / RENDERSIZE);
}
vec4 IMG_THIS_NORM_PIXEL_2D(sampler2D sampler, vec2 pct)
{
	return texture2D(sampler, vv_FragNormCoord * pct);
}
vec4 IMG_THIS_PIXEL_2D(sampler2D sampler, vec2 pct)
{
	return IMG_THIS_NORM_PIXEL_2D(sampler, pct);
}
vec4 IMG_NORM_PIXEL_RECT(sampler2DRect sampler, vec2 pct, vec2 normLoc)
{
	return texture2DRect(sampler, normLoc * pct);
}
vec4 IMG_PIXEL_RECT(sampler2DRect sampler, vec2 pct, vec2 loc)
{
	return IMG_NORM_PIXEL_RECT(sampler, pct, loc / RENDERSIZE);
}
vec4 IMG_THIS_NORM_PIXEL_RECT(sampler2DRect sampler, vec2 pct)
{
	return texture2DRect(sampler, vv_FragNormCoord * pct);
}
vec4 IMG_THIS_PIXEL_RECT(sampler2DRect sampler, vec2 pct)
{
	return IMG_THIS_NORM_PIXEL_RECT(sampler, pct);
}

// ISF source

$ISF_SOURCE$
"#;

/// The assembled per-stage sources for one compile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedSource {
    pub vertex: String,
    pub fragment: String,
}

/// How one declared image expands at a macro site: helper suffix by
/// addressing mode, percent-scale uniform supplied implicitly.
#[derive(Debug, Clone)]
struct ImageDecl {
    name: String,
    rectangle: bool,
}

impl ImageDecl {
    fn suffix(&self) -> &'static str {
        if self.rectangle {
            "RECT"
        } else {
            "2D"
        }
    }

    fn this_pixel(&self) -> String {
        format!("IMG_THIS_PIXEL_{}({}, _{}_pct)", self.suffix(), self.name, self.name)
    }

    fn this_norm_pixel(&self) -> String {
        format!(
            "IMG_THIS_NORM_PIXEL_{}({}, _{}_pct)",
            self.suffix(),
            self.name,
            self.name
        )
    }

    /// Open form: the caller's coordinate argument stays in place after the
    /// comma, so only the head of the call is rewritten.
    fn pixel_open(&self) -> String {
        format!("IMG_PIXEL_{}({}, _{}_pct,", self.suffix(), self.name, self.name)
    }

    fn norm_pixel_open(&self) -> String {
        format!(
            "IMG_NORM_PIXEL_{}({}, _{}_pct,",
            self.suffix(),
            self.name,
            self.name
        )
    }
}

/// Generates the final vertex/fragment sources for `body` against the
/// registry's current state. Idempotent for a fixed registry: the same body
/// always yields the same output.
pub fn generate(body: &str, uniforms: &UniformRegistry) -> Result<GeneratedSource, EngineError> {
    let image_decls: HashMap<String, ImageDecl> = uniforms
        .images()
        .map(|u| {
            (
                u.name().to_string(),
                ImageDecl {
                    name: u.name().to_string(),
                    rectangle: u.is_rectangle(),
                },
            )
        })
        .collect();

    let expanded = expand_lookup_macros(body, &image_decls)?;

    let mut declarations = String::new();
    for u in uniforms.iter() {
        declarations.push_str(&u.declaration());
        declarations.push('\n');
    }

    let vertex = VERTEX_TEMPLATE.replace("$UNIFORMS$", &declarations);
    let fragment = FRAGMENT_TEMPLATE
        .replace("$UNIFORMS$", &declarations)
        .replace("$ISF_SOURCE$", &expanded);

    Ok(GeneratedSource { vertex, fragment })
}

/// Convenience for counting how many declarations a generated stage carries.
pub fn count_uniform_lines(source: &str) -> usize {
    source
        .lines()
        .filter(|l| l.trim_start().starts_with("uniform "))
        .count()
}

fn expand_lookup_macros(
    body: &str,
    image_decls: &HashMap<String, ImageDecl>,
) -> Result<String, EngineError> {
    // Pass 1: self-coordinate forms, full call rewritten.
    let this_forms = Regex::new(r"(IMG_THIS_PIXEL|IMG_THIS_NORM_PIXEL)\s*\(\s*(.*?)\s*\)")
        .expect("static pattern");
    let mut expanded = rewrite_matches(body, &this_forms, image_decls, |form, decl| {
        if form == "IMG_THIS_PIXEL" {
            decl.this_pixel()
        } else {
            decl.this_norm_pixel()
        }
    })?;

    // Pass 2: comma-continued forms, only the head through the first comma
    // is rewritten; the coordinate expression is left intact.
    let open_forms =
        Regex::new(r"(IMG_PIXEL|IMG_NORM_PIXEL)\s*\(\s*(.*?)\s*,").expect("static pattern");
    expanded = rewrite_matches(&expanded, &open_forms, image_decls, |form, decl| {
        if form == "IMG_PIXEL" {
            decl.pixel_open()
        } else {
            decl.norm_pixel_open()
        }
    })?;

    Ok(expanded)
}

/// Collects every match of `pattern`, resolves the captured image name, and
/// replaces all occurrences of each matched string. Resolution failure
/// aborts before any replacement is applied.
fn rewrite_matches(
    source: &str,
    pattern: &Regex,
    image_decls: &HashMap<String, ImageDecl>,
    replacement_for: impl Fn(&str, &ImageDecl) -> String,
) -> Result<String, EngineError> {
    let mut replacements: Vec<(String, String)> = Vec::new();
    for caps in pattern.captures_iter(source) {
        let full = &caps[0];
        let form = &caps[1];
        let image_name = &caps[2];

        let Some(decl) = image_decls.get(image_name) else {
            tracing::error!(name = image_name, "image name mismatch in lookup macro");
            return Err(EngineError::UnresolvedImageMacro(image_name.to_string()));
        };

        let replacement = replacement_for(form, decl);
        tracing::trace!(from = full, to = %replacement, "expanding image lookup macro");
        replacements.push((full.to_string(), replacement));
    }

    let mut out = source.to_string();
    for (from, to) in replacements {
        out = out.replace(&from, &to);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use risf_uniforms::{ImageBinding, Uniform};
    use std::num::NonZeroU32;

    fn tex(id: u32) -> glow::NativeTexture {
        glow::NativeTexture(NonZeroU32::new(id).unwrap())
    }

    fn registry_with_image(name: &str, rectangle: bool) -> UniformRegistry {
        let mut reg = UniformRegistry::new();
        let binding = if rectangle {
            ImageBinding::rectangle(tex(1), 640.0, 480.0)
        } else {
            ImageBinding::normalized(tex(1), 640.0, 480.0)
        };
        reg.add(Uniform::bound_image(name, binding));
        reg
    }

    #[test]
    fn expands_this_pixel_forms() {
        let reg = registry_with_image("inputImage", false);
        let out = generate("gl_FragColor = IMG_THIS_PIXEL(inputImage);", &reg).unwrap();
        assert!(out
            .fragment
            .contains("gl_FragColor = IMG_THIS_PIXEL_2D(inputImage, _inputImage_pct);"));
    }

    #[test]
    fn expands_open_forms_keeping_coordinate() {
        let reg = registry_with_image("inputImage", false);
        let out = generate(
            "vec4 c = IMG_PIXEL(inputImage, gl_FragCoord.xy + vec2(1.0, 0.0));",
            &reg,
        )
        .unwrap();
        assert!(out.fragment.contains(
            "vec4 c = IMG_PIXEL_2D(inputImage, _inputImage_pct, gl_FragCoord.xy + vec2(1.0, 0.0));"
        ));
    }

    #[test]
    fn rectangle_images_use_rect_helpers() {
        let reg = registry_with_image("cam", true);
        let out = generate("gl_FragColor = IMG_THIS_NORM_PIXEL(cam);", &reg).unwrap();
        assert!(out
            .fragment
            .contains("IMG_THIS_NORM_PIXEL_RECT(cam, _cam_pct)"));
        assert!(out.fragment.contains("uniform sampler2DRect cam;"));
    }

    #[test]
    fn unresolved_image_name_fails_generation() {
        let reg = registry_with_image("inputImage", false);
        let err = generate("gl_FragColor = IMG_PIXEL(foo, xy);", &reg).unwrap_err();
        assert!(matches!(err, EngineError::UnresolvedImageMacro(name) if name == "foo"));
    }

    #[test]
    fn expansion_is_idempotent_for_fixed_registry() {
        let reg = registry_with_image("buf", false);
        let body = "gl_FragColor = IMG_THIS_PIXEL(buf) + IMG_NORM_PIXEL(buf, vv_FragNormCoord);";
        let a = generate(body, &reg).unwrap();
        let b = generate(body, &reg).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn declarations_substituted_into_both_stages() {
        let mut reg = UniformRegistry::new();
        reg.add(Uniform::from_decl(&risf_core::InputDecl::Float {
            name: "amt".into(),
            default: 0.5,
            range: Some((0.0, 1.0)),
        }));
        let out = generate("gl_FragColor = vec4(amt);", &reg).unwrap();
        assert!(out.vertex.contains("uniform float amt;"));
        assert!(out.fragment.contains("uniform float amt;"));
        assert!(out.fragment.contains("gl_FragColor = vec4(amt);"));
        assert!(!out.fragment.contains("$ISF_SOURCE$"));
        assert!(!out.vertex.contains("$UNIFORMS$"));
    }
}
