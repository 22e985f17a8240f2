use crate::EngineError;

/// An ISF source file split into its two directives: the JSON header (the
/// interior of the first `/* … */` comment) and the GLSL body (everything
/// after the closing marker).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitSource<'a> {
    pub header: &'a str,
    pub body: &'a str,
}

/// Splits raw ISF source text into header and body.
///
/// The header is the content strictly between the first `/*` and the first
/// `*/` that follows it. Missing markers or an empty interior are a
/// [`EngineError::MalformedSource`] failure; the caller's prior state is
/// never touched by a failed split.
pub fn split_directive(data: &str) -> Result<SplitSource<'_>, EngineError> {
    let open = data.find("/*").ok_or(EngineError::MalformedSource)?;
    let header_start = open + 2;
    let close = data[header_start..]
        .find("*/")
        .ok_or(EngineError::MalformedSource)?;

    let header = &data[header_start..header_start + close];
    if header.is_empty() {
        return Err(EngineError::MalformedSource);
    }

    let body = &data[header_start + close + 2..];
    Ok(SplitSource { header, body })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_header_and_body() {
        let src = "/*{\"DESCRIPTION\":\"d\"}*/\nvoid main() {}\n";
        let split = split_directive(src).unwrap();
        assert_eq!(split.header, "{\"DESCRIPTION\":\"d\"}");
        assert_eq!(split.body, "\nvoid main() {}\n");
    }

    #[test]
    fn missing_open_marker_fails() {
        assert!(matches!(
            split_directive("void main() {}"),
            Err(EngineError::MalformedSource)
        ));
    }

    #[test]
    fn missing_close_marker_fails() {
        assert!(matches!(
            split_directive("/*{\"DESCRIPTION\":\"d\"}"),
            Err(EngineError::MalformedSource)
        ));
    }

    #[test]
    fn empty_header_fails() {
        assert!(matches!(
            split_directive("/**/ void main() {}"),
            Err(EngineError::MalformedSource)
        ));
    }

    #[test]
    fn only_first_comment_is_the_header() {
        let src = "/*{}*/ body /* a GLSL comment */ end";
        let split = split_directive(src).unwrap();
        assert_eq!(split.header, "{}");
        assert_eq!(split.body, " body /* a GLSL comment */ end");
    }
}
