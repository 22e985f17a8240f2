#![forbid(unsafe_code)]

//! Golden-fixture contract tests for the GL-free risf surface: directive
//! splitting, header parsing, the uniform registry, and code generation.
//! GPU-dependent behavior (actual compile/link, persistent-buffer pixels)
//! is exercised by the demo hosts instead.

#[cfg(test)]
mod tests {
    use risf_core::{split_directive, EngineError, Header, InputDecl, InputKind};

    // ---- Golden fixtures (ISF source contracts) ----
    const BASIC_FS: &str = include_str!("../fixtures/basic.fs");
    const FEEDBACK_FS: &str = include_str!("../fixtures/feedback.fs");
    const NO_HEADER_FS: &str = include_str!("../fixtures/no_header.fs");
    const SIZED_BUFFERS_FS: &str = include_str!("../fixtures/sized_buffers.fs");

    #[test]
    fn golden_basic_splits_and_parses() {
        let split = split_directive(BASIC_FS).expect("basic.fs should split");
        let header = Header::parse(split.header).expect("basic.fs header should parse");

        assert_eq!(header.description, "d");
        assert_eq!(header.credit, "risf");
        assert_eq!(header.categories, vec!["Generator"]);
        assert_eq!(header.inputs.len(), 1);
        assert_eq!(header.inputs[0].kind(), InputKind::Float);
        assert!(split.body.contains("gl_FragColor = vec4(amt);"));
    }

    #[test]
    fn golden_no_header_is_rejected() {
        let err = split_directive(NO_HEADER_FS).expect_err("no_header.fs must fail to split");
        assert!(
            err.to_string().to_lowercase().contains("header"),
            "expected error to mention the header, got: {err}"
        );
    }

    #[test]
    fn golden_feedback_declares_buffers_and_passes() {
        let split = split_directive(FEEDBACK_FS).unwrap();
        let header = Header::parse(split.header).unwrap();

        assert_eq!(header.buffers.len(), 1);
        assert_eq!(header.buffers[0].name, "trail");
        assert_eq!(header.buffers[0].width, None);

        // Pass order is significant; the trailing empty target means the
        // final output is the default framebuffer, not "trail".
        assert_eq!(header.passes.len(), 2);
        assert_eq!(header.passes[0].target, "trail");
        assert_eq!(header.passes[1].target, "");

        let kinds: Vec<InputKind> = header.inputs.iter().map(InputDecl::kind).collect();
        assert_eq!(kinds, vec![InputKind::Float, InputKind::Event]);
    }

    #[test]
    fn golden_sized_buffers_carry_dimensions() {
        let split = split_directive(SIZED_BUFFERS_FS).unwrap();
        let header = Header::parse(split.header).unwrap();

        let half = header.buffers.iter().find(|b| b.name == "half").unwrap();
        assert_eq!((half.width, half.height), (Some(640), Some(360)));
        let full = header.buffers.iter().find(|b| b.name == "full").unwrap();
        assert_eq!((full.width, full.height), (None, None));
    }

    #[test]
    fn header_json_failures_are_distinct() {
        assert!(matches!(
            Header::parse("{ not json"),
            Err(EngineError::InvalidHeaderJson(_))
        ));
        assert!(matches!(
            Header::parse("\"just a string\""),
            Err(EngineError::HeaderNotObject)
        ));
    }

    #[test]
    fn type_change_across_reload_replaces_entry() {
        use risf_uniforms::{Uniform, UniformRegistry};

        let mut live = UniformRegistry::new();
        live.add(Uniform::from_decl(&InputDecl::Float {
            name: "x".into(),
            default: 0.25,
            range: None,
        }));

        // A duplicate add never displaces the live entry.
        assert!(!live.add(Uniform::from_decl(&InputDecl::Bool {
            name: "x".into(),
            default: true,
        })));
        assert_eq!(live.get("x").map(Uniform::kind), Some(InputKind::Float));

        // A type change goes remove-then-add under the same name.
        live.remove("x");
        assert!(live.add(Uniform::from_decl(&InputDecl::Bool {
            name: "x".into(),
            default: true,
        })));
        assert_eq!(live.get("x").map(Uniform::kind), Some(InputKind::Bool));
        assert_eq!(live.len(), 1);
    }
}

#[cfg(test)]
mod codegen;
