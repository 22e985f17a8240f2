//! Code-generation contracts: declaration round-trips, macro expansion,
//! and the end-to-end header→fragment scenario.

use std::num::NonZeroU32;

use risf_codegen::{count_uniform_lines, generate};
use risf_core::{split_directive, EngineError, Header, InputDecl};
use risf_uniforms::{ImageBinding, Uniform, UniformRegistry, UniformUpload};

const BASIC_FS: &str = include_str!("../fixtures/basic.fs");
const FEEDBACK_FS: &str = include_str!("../fixtures/feedback.fs");
const BAD_MACRO_FS: &str = include_str!("../fixtures/bad_macro.fs");

fn tex(id: u32) -> glow::NativeTexture {
    glow::NativeTexture(NonZeroU32::new(id).unwrap())
}

/// Builds a registry the way a reload stages one: INPUTS first, then one
/// bound sampler per persistent buffer.
fn registry_for(source: &str) -> (Header, String, UniformRegistry) {
    let split = split_directive(source).unwrap();
    let header = Header::parse(split.header).unwrap();

    let mut registry = UniformRegistry::new();
    for decl in &header.inputs {
        registry.add(Uniform::from_decl(decl));
    }
    for (i, buf) in header.buffers.iter().enumerate() {
        registry.add(Uniform::bound_image(
            &buf.name,
            ImageBinding::normalized(tex(i as u32 + 1), 1280.0, 720.0),
        ));
    }
    (header, split.body.to_string(), registry)
}

#[test]
fn end_to_end_basic_scenario() {
    let (_, body, mut registry) = registry_for(BASIC_FS);

    let out = generate(&body, &registry).expect("basic.fs should generate");
    assert!(out.fragment.contains("uniform float amt;"));
    assert!(out.fragment.contains("gl_FragColor = vec4(amt);"));

    // Out-of-range set uploads the clamped value, not the raw one.
    registry.set_float("amt", 2.0).unwrap();
    let staged = registry.get_mut("amt").unwrap().stage_upload();
    assert_eq!(staged, UniformUpload::Float(1.0));
}

#[test]
fn declaration_round_trip_counts() {
    let (_, body, registry) = registry_for(FEEDBACK_FS);
    let out = generate(&body, &registry).unwrap();

    // Fragment built-ins: PASSINDEX, RENDERSIZE, TIME. Then one line per
    // non-image uniform and two per image (sampler + pct scale).
    let expected = 3 + 2 /* decay, reset */ + 2 /* trail sampler + pct */;
    assert_eq!(count_uniform_lines(&out.fragment), expected);
    assert!(out.fragment.contains("uniform sampler2D trail;"));
    assert!(out.fragment.contains("uniform vec2 _trail_pct;"));
}

#[test]
fn feedback_macros_expand_against_buffer_sampler() {
    let (_, body, registry) = registry_for(FEEDBACK_FS);
    let out = generate(&body, &registry).unwrap();

    assert!(out
        .fragment
        .contains("vec4 prev = IMG_THIS_PIXEL_2D(trail, _trail_pct);"));
    assert!(out
        .fragment
        .contains("gl_FragColor = IMG_NORM_PIXEL_2D(trail, _trail_pct, vv_FragNormCoord);"));
    // No unexpanded call sites survive in the emitted source body.
    assert!(!out.fragment.contains("IMG_THIS_PIXEL(trail)"));
}

#[test]
fn unresolved_macro_fails_and_leaves_previous_output_alone() {
    let (_, good_body, registry) = registry_for(BASIC_FS);
    let previous = generate(&good_body, &registry).unwrap();

    let split = split_directive(BAD_MACRO_FS).unwrap();
    let err = generate(split.body, &registry).unwrap_err();
    assert!(matches!(err, EngineError::UnresolvedImageMacro(ref name) if name == "foo"));

    // The previously generated program source is untouched by the failure.
    assert_eq!(previous, generate(&good_body, &registry).unwrap());
}

#[test]
fn generation_is_idempotent() {
    let (_, body, registry) = registry_for(FEEDBACK_FS);
    let a = generate(&body, &registry).unwrap();
    let b = generate(&body, &registry).unwrap();
    assert_eq!(a, b);
}

#[test]
fn addressing_mode_change_switches_sampler_kind() {
    let mut registry = UniformRegistry::new();
    registry.add(Uniform::from_decl(&InputDecl::Image {
        name: "inputImage".into(),
    }));
    registry
        .set_image(
            "inputImage",
            Some(ImageBinding::normalized(tex(1), 640.0, 480.0)),
        )
        .unwrap();

    let body = "gl_FragColor = IMG_THIS_PIXEL(inputImage);";
    let before = generate(body, &registry).unwrap();
    assert!(before.fragment.contains("uniform sampler2D inputImage;"));
    assert!(before.fragment.contains("IMG_THIS_PIXEL_2D(inputImage"));

    // Rebinding to a rectangle texture regenerates with the rect sampler
    // and rect lookup helper.
    registry
        .set_image(
            "inputImage",
            Some(ImageBinding::rectangle(tex(2), 640.0, 480.0)),
        )
        .unwrap();
    let after = generate(body, &registry).unwrap();
    assert!(after.fragment.contains("uniform sampler2DRect inputImage;"));
    assert!(after.fragment.contains("IMG_THIS_PIXEL_RECT(inputImage"));
}

#[test]
fn event_inputs_declare_as_bool_and_fire_once() {
    let (_, _, mut registry) = registry_for(FEEDBACK_FS);
    assert_eq!(
        registry.get("reset").map(|u| u.declaration()),
        Some("uniform bool reset;".to_string())
    );

    registry.set_event("reset", true).unwrap();
    let first = registry.get_mut("reset").unwrap().stage_upload();
    let second = registry.get_mut("reset").unwrap().stage_upload();
    assert_eq!(first, UniformUpload::Bool(true));
    assert_eq!(second, UniformUpload::Bool(false));
}
