//! Minification
//!
//! The `Minifier` trait is the seam for a real compressor. `BasicMinifier`
//! is a conservative built-in: it strips comments (keeping `/*! ... */`
//! license blocks), collapses whitespace, and rejects sources it can't
//! scan, such as unterminated strings or comments, or unbalanced CSS blocks.
//!
//! A `/` in script is read as a regular expression literal when it follows
//! an operator, an opening bracket, `return`, or the start of the source.
//! Anywhere else it is division. Sources that defeat this heuristic fail to
//! scan and the request falls back to individual tags.

use crate::asset::AssetKind;
use crate::error::{PressError, PressResult};

/// Longest excerpt attached to a compression error
const EXCERPT_LEN: usize = 40;

/// Transforms one source into its minified form
pub trait Minifier: Send + Sync {
    /// Minify `source`, read from `path`
    fn minify(&self, kind: AssetKind, path: &str, source: &str) -> PressResult<String>;
}

/// Comment and whitespace stripping minifier
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicMinifier;

impl Minifier for BasicMinifier {
    fn minify(&self, kind: AssetKind, path: &str, source: &str) -> PressResult<String> {
        Scanner::new(kind, path, source).run()
    }
}

struct Scanner<'a> {
    kind: AssetKind,
    path: &'a str,
    source: &'a str,
    out: String,
    line: usize,
    pending_ws: Option<char>,
    depth: usize,
}

impl<'a> Scanner<'a> {
    fn new(kind: AssetKind, path: &'a str, source: &'a str) -> Self {
        Self {
            kind,
            path,
            source,
            out: String::with_capacity(source.len()),
            line: 1,
            pending_ws: None,
            depth: 0,
        }
    }

    fn run(mut self) -> PressResult<String> {
        let mut chars = self.source.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '"' | '\'' => self.string(c, &mut chars)?,
                '`' if self.kind == AssetKind::Script => self.string(c, &mut chars)?,
                '/' if chars.peek() == Some(&'*') => {
                    chars.next();
                    let start = self.line;
                    let keep = chars.peek() == Some(&'!');
                    let mut body = String::new();
                    let mut closed = false;
                    while let Some(b) = chars.next() {
                        if b == '\n' {
                            self.line += 1;
                        }
                        if b == '*' && chars.peek() == Some(&'/') {
                            chars.next();
                            closed = true;
                            break;
                        }
                        body.push(b);
                    }
                    if !closed {
                        return Err(self.error(start, "unterminated comment"));
                    }
                    if keep {
                        self.flush_ws('/');
                        self.out.push_str("/*");
                        self.out.push_str(&body);
                        self.out.push_str("*/\n");
                    } else if self.pending_ws.is_none() {
                        self.pending_ws = Some(' ');
                    }
                }
                '/' if self.kind == AssetKind::Script && chars.peek() == Some(&'/') => {
                    while let Some(&n) = chars.peek() {
                        if n == '\n' {
                            break;
                        }
                        chars.next();
                    }
                }
                '/' if self.kind == AssetKind::Script && self.regex_allowed() => {
                    self.regex(&mut chars)?
                }
                c if c.is_whitespace() => {
                    if c == '\n' {
                        self.line += 1;
                        self.pending_ws = Some('\n');
                    } else if self.pending_ws.is_none() {
                        self.pending_ws = Some(' ');
                    }
                }
                _ => {
                    if self.kind == AssetKind::Style {
                        self.track_block(c)?;
                    }
                    self.flush_ws(c);
                    self.out.push(c);
                }
            }
        }

        if self.depth > 0 {
            return Err(self.error(self.line, "unclosed block"));
        }

        Ok(self.out.trim().to_string())
    }

    fn string(
        &mut self,
        quote: char,
        chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
    ) -> PressResult<()> {
        let start = self.line;
        self.flush_ws(quote);
        self.out.push(quote);

        while let Some(s) = chars.next() {
            self.out.push(s);
            match s {
                '\\' => {
                    if let Some(escaped) = chars.next() {
                        if escaped == '\n' {
                            self.line += 1;
                        }
                        self.out.push(escaped);
                    }
                }
                '\n' => {
                    if quote != '`' {
                        return Err(self.error(start, "unterminated string literal"));
                    }
                    self.line += 1;
                }
                _ if s == quote => return Ok(()),
                _ => {}
            }
        }

        Err(self.error(start, "unterminated string literal"))
    }

    /// Whether a `/` at this point starts a regular expression literal
    fn regex_allowed(&self) -> bool {
        let emitted = self.out.trim_end();
        match emitted.chars().last() {
            None => true,
            Some(last) if "(,=:[!&|?{};+-*%<>~^".contains(last) => true,
            Some(_) => {
                let word = emitted
                    .rsplit(|c: char| !(c.is_alphanumeric() || c == '_' || c == '$'))
                    .next()
                    .unwrap_or_default();
                matches!(word, "return" | "typeof" | "case" | "in" | "of" | "void")
            }
        }
    }

    fn regex(&mut self, chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> PressResult<()> {
        let start = self.line;
        self.flush_ws('/');
        self.out.push('/');

        let mut in_class = false;
        while let Some(r) = chars.next() {
            if r == '\n' {
                break;
            }
            self.out.push(r);
            match r {
                '\\' => {
                    if let Some(escaped) = chars.next() {
                        if escaped == '\n' {
                            break;
                        }
                        self.out.push(escaped);
                    }
                }
                '[' => in_class = true,
                ']' => in_class = false,
                '/' if !in_class => return Ok(()),
                _ => {}
            }
        }

        Err(self.error(start, "unterminated regular expression"))
    }

    fn track_block(&mut self, c: char) -> PressResult<()> {
        match c {
            '{' => self.depth += 1,
            '}' if self.depth == 0 => return Err(self.error(self.line, "unexpected '}'")),
            '}' => self.depth -= 1,
            _ => {}
        }
        Ok(())
    }

    fn flush_ws(&mut self, next: char) {
        let Some(ws) = self.pending_ws.take() else {
            return;
        };
        let Some(last) = self.out.chars().last() else {
            return;
        };
        if last == '\n' {
            return;
        }
        match self.kind {
            AssetKind::Style => {
                if !is_css_punct(last) && !is_css_punct(next) {
                    self.out.push(' ');
                }
            }
            AssetKind::Script => self.out.push(ws),
        }
    }

    fn error(&self, line: usize, reason: &str) -> PressError {
        let excerpt: String = self
            .source
            .lines()
            .nth(line.saturating_sub(1))
            .unwrap_or_default()
            .trim()
            .chars()
            .take(EXCERPT_LEN)
            .collect();
        PressError::compression(self.path, excerpt, format!("{} at line {}", reason, line))
    }
}

fn is_css_punct(c: char) -> bool {
    matches!(c, '{' | '}' | ';' | ',' | '>')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn js(src: &str) -> PressResult<String> {
        BasicMinifier.minify(AssetKind::Script, "test.js", src)
    }

    fn css(src: &str) -> PressResult<String> {
        BasicMinifier.minify(AssetKind::Style, "test.css", src)
    }

    #[test]
    fn js_strips_comments_and_blank_lines() {
        let out = js("// header\nvar a = 1; /* note */\n\n\nvar b   =  2;\n").unwrap();
        assert_eq!(out, "var a = 1;\nvar b = 2;");
    }

    #[test]
    fn js_keeps_comment_markers_inside_strings() {
        let out = js("var s = \"/* not a comment */\"; var u = 'http://x';").unwrap();
        assert_eq!(out, "var s = \"/* not a comment */\"; var u = 'http://x';");
    }

    #[test]
    fn js_keeps_license_comments() {
        let out = js("/*! (c) Example */\nvar a;").unwrap();
        assert!(out.starts_with("/*! (c) Example */"));
        assert!(out.ends_with("var a;"));
    }

    #[test]
    fn js_unterminated_string_is_compression_error() {
        let err = js("var ok = 1;\nvar s = \"broken;\nvar t;").unwrap_err();
        match err {
            PressError::Compression {
                path,
                excerpt,
                reason,
            } => {
                assert_eq!(path, "test.js");
                assert_eq!(excerpt, "var s = \"broken;");
                assert!(reason.contains("line 2"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn js_regex_literals_may_hold_quotes_and_slashes() {
        let out = js("var re = /a\"b[/]c/g;\nif (x.match(/'/)) { return /\\//; }").unwrap();
        assert_eq!(out, "var re = /a\"b[/]c/g;\nif (x.match(/'/)) { return /\\//; }");
    }

    #[test]
    fn js_division_is_not_a_regex() {
        let out = js("var half = total / 2; var q = (a) / b / c;").unwrap();
        assert_eq!(out, "var half = total / 2; var q = (a) / b / c;");
    }

    #[test]
    fn js_unterminated_regex_fails() {
        assert!(js("var re = /abc\nvar b;").is_err());
    }

    #[test]
    fn js_template_literals_span_lines() {
        let out = js("var t = `a\nb`;").unwrap();
        assert_eq!(out, "var t = `a\nb`;");
    }

    #[test]
    fn unterminated_comment_fails() {
        assert!(js("var a; /* open").is_err());
        assert!(css("a { } /* open").is_err());
    }

    #[test]
    fn css_collapses_around_punctuation() {
        let out = css("a, b {\n  color : red ;\n  margin: 0 auto;\n}\n/* x */\np > span { }").unwrap();
        assert_eq!(out, "a,b{color : red;margin: 0 auto;}p>span{}");
    }

    #[test]
    fn css_keeps_double_slash_in_urls() {
        let out = css("a { background: url(http://example.com/x.png); }").unwrap();
        assert_eq!(out, "a{background: url(http://example.com/x.png);}");
    }

    #[test]
    fn css_unbalanced_braces_fail() {
        assert!(css("a { color: red;").is_err());
        assert!(css("a { color: red; } }").is_err());
    }
}
