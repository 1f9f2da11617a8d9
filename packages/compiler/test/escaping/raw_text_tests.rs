/**
 * Raw-Text Transition Tests
 *
 * Drives the literal-text scanners through representative HTML/CSS/JS/URL
 * fragments and checks the resulting lexical contexts, including the
 * chunked-scanning behavior the inference walk relies on (a dynamic value
 * can split literal text at any point).
 */

#[cfg(test)]
mod raw_text_tests {
    use sable_compiler::escaping::context::{Context, Delim, Element, JsCtx, State, UrlPart};
    use sable_compiler::escaping::raw_text::escape_raw_text;

    fn scan(ctx: Context, text: &str) -> Context {
        escape_raw_text(ctx, text)
            .unwrap_or_else(|e| panic!("scan failed on {:?}: {}", text, e.message))
            .0
    }

    fn scan_from_text(text: &str) -> Context {
        scan(Context::default(), text)
    }

    /// Scanning a text in one piece and in arbitrary two-piece splits must
    /// agree; raw text reaches the scanner in chunks bounded by dynamic
    /// nodes.
    fn assert_split_stable(text: &str) {
        let whole = scan_from_text(text);
        for i in 0..=text.len() {
            if !text.is_char_boundary(i) {
                continue;
            }
            let mid = scan(Context::default(), &text[..i]);
            let end = scan(mid, &text[i..]);
            assert_eq!(whole, end, "split at {} diverges for {:?}", i, text);
        }
    }

    mod html {
        use super::*;

        #[test]
        fn text_to_tag_and_back() {
            assert_eq!(scan_from_text("hello").state, State::Text);
            assert_eq!(scan_from_text("<div").state, State::Tag);
            assert_eq!(scan_from_text("<div>").state, State::Text);
            assert_eq!(scan_from_text("<div class=\"a\">inner</div>").state, State::Text);
        }

        #[test]
        fn attribute_states() {
            let ctx = scan_from_text("<a href");
            assert_eq!(ctx.state, State::AttrName);
            let ctx = scan_from_text("<a href ");
            assert_eq!(ctx.state, State::AfterName);
            let ctx = scan_from_text("<a href=");
            assert_eq!(ctx.state, State::BeforeValue);
            let ctx = scan_from_text("<a href=\"");
            assert_eq!(ctx.state, State::Url);
            assert_eq!(ctx.delim, Delim::DoubleQuote);
            assert_eq!(ctx.url_part, UrlPart::None);
        }

        #[test]
        fn valueless_attribute() {
            let ctx = scan_from_text("<input disabled>");
            assert_eq!(ctx.state, State::Text);
        }

        #[test]
        fn comment_swallows_markup() {
            let ctx = scan_from_text("<!-- <div> \"quotes\" <script> -->done");
            assert_eq!(ctx.state, State::Text);
            assert_eq!(ctx.element, Element::None);
        }

        #[test]
        fn dynamic_tag_name_position() {
            assert_eq!(scan_from_text("<").state, State::TagName);
            let closing = scan_from_text("</");
            assert_eq!(closing.state, State::TagName);
            assert!(closing.close_tag);
        }

        #[test]
        fn close_tag_resumed_in_a_later_chunk() {
            // `c<` then `/b> d`: the slash of `</b>` arrives in the next
            // chunk and must still be read as a close tag.
            let mid = scan_from_text("c<");
            assert_eq!(mid.state, State::TagName);
            assert_eq!(scan(mid, "/b> d").state, State::Text);
            let mid = scan_from_text("c</");
            assert_eq!(scan(mid, "b> d").state, State::Text);
        }

        #[test]
        fn rcdata_elements() {
            let ctx = scan_from_text("<textarea>some <content");
            assert_eq!(ctx.state, State::Rcdata);
            assert_eq!(ctx.element, Element::Textarea);
            assert_eq!(scan_from_text("<textarea>x</textarea>").state, State::Text);
        }

        #[test]
        fn splits_are_stable() {
            assert_split_stable("a<b href=\"/x?y=1\">c</b> d");
            assert_split_stable("<!-- c --><p title='t'>x</p>");
            assert_split_stable("<input type=text value=abc >done");
        }
    }

    mod urls {
        use super::*;

        #[test]
        fn part_tracking() {
            assert_eq!(scan_from_text("<a href=\"").url_part, UrlPart::None);
            assert_eq!(scan_from_text("<a href=\"/p").url_part, UrlPart::PreQuery);
            assert_eq!(scan_from_text("<a href=\"/p?").url_part, UrlPart::QueryOrFrag);
            assert_eq!(scan_from_text("<a href=\"#frag").url_part, UrlPart::QueryOrFrag);
        }

        #[test]
        fn leaving_the_attribute_resets() {
            let ctx = scan_from_text("<a href=\"/p?q=1\" title=\"");
            assert_eq!(ctx.state, State::Attr);
            assert_eq!(ctx.url_part, UrlPart::None);
        }
    }

    mod js {
        use super::*;

        fn js_ctx() -> Context {
            Context { state: State::Js, element: Element::Script, ..Context::default() }
        }

        #[test]
        fn string_and_regex_literals() {
            assert_eq!(scan(js_ctx(), "var a = \"x").state, State::JsDqStr);
            assert_eq!(scan(js_ctx(), "var a = 'x").state, State::JsSqStr);
            assert_eq!(scan(js_ctx(), "var a = /x").state, State::JsRegexp);
            assert_eq!(scan(js_ctx(), "var a = /x/").state, State::Js);
            assert_eq!(scan(js_ctx(), "var a = /x/;").js_ctx, JsCtx::Regexp);
        }

        #[test]
        fn division_vs_regexp() {
            // After an identifier a slash divides.
            assert_eq!(scan(js_ctx(), "a / b").state, State::Js);
            // After '(' it opens a regexp.
            assert_eq!(scan(js_ctx(), "f(/x").state, State::JsRegexp);
            // Parity of a sign run decides.
            assert_eq!(scan(js_ctx(), "a++").js_ctx, JsCtx::DivOp);
            assert_eq!(scan(js_ctx(), "a + ").js_ctx, JsCtx::Regexp);
        }

        #[test]
        fn escapes_inside_strings() {
            assert_eq!(scan(js_ctx(), "'a\\'b").state, State::JsSqStr);
            assert_eq!(scan(js_ctx(), "'a\\'b'").state, State::Js);
        }

        #[test]
        fn comments() {
            assert_eq!(scan(js_ctx(), "// note").state, State::JsLineComment);
            assert_eq!(scan(js_ctx(), "// note\nx").state, State::Js);
            assert_eq!(scan(js_ctx(), "/* note").state, State::JsBlockComment);
            assert_eq!(scan(js_ctx(), "/* note */x").state, State::Js);
        }

        #[test]
        fn unfinished_escape_is_error() {
            assert!(escape_raw_text(js_ctx(), "'abc\\").is_err());
        }
    }

    mod css {
        use super::*;

        fn css_ctx() -> Context {
            Context { state: State::Css, element: Element::Style, ..Context::default() }
        }

        #[test]
        fn strings_and_urls() {
            assert_eq!(scan(css_ctx(), "content: \"a").state, State::CssDqStr);
            assert_eq!(scan(css_ctx(), "content: 'a").state, State::CssSqStr);
            assert_eq!(scan(css_ctx(), "background: url(").state, State::CssUrl);
            assert_eq!(scan(css_ctx(), "background: url('").state, State::CssSqUrl);
            assert_eq!(scan(css_ctx(), "background: URL(\"").state, State::CssDqUrl);
        }

        #[test]
        fn url_keyword_must_stand_alone() {
            assert_eq!(scan(css_ctx(), "x: blurl(").state, State::Css);
        }

        #[test]
        fn url_part_inside_css_url() {
            assert_eq!(scan(css_ctx(), "background: url(/a").url_part, UrlPart::PreQuery);
            assert_eq!(
                scan(css_ctx(), "background: url(/a?b").url_part,
                UrlPart::QueryOrFrag
            );
            let done = scan(css_ctx(), "background: url(/a?b) ");
            assert_eq!(done.state, State::Css);
            assert_eq!(done.url_part, UrlPart::None);
        }

        #[test]
        fn comments() {
            assert_eq!(scan(css_ctx(), "/* x").state, State::CssBlockComment);
            assert_eq!(scan(css_ctx(), "/* x */ p").state, State::Css);
            assert_eq!(scan(css_ctx(), "// x").state, State::CssLineComment);
        }
    }

    mod special_elements {
        use super::*;

        #[test]
        fn close_tag_beats_inner_language() {
            // `</script>` ends the element even inside a JS string.
            let ctx = scan_from_text("<script>'unterminated</script>");
            assert_eq!(ctx.state, State::Text);
            assert_eq!(ctx.element, Element::None);
        }

        #[test]
        fn close_tag_is_case_insensitive() {
            assert_eq!(scan_from_text("<script>x=1</SCRIPT>").state, State::Text);
            assert_eq!(scan_from_text("<style>p{}</Style >").state, State::Text);
        }

        #[test]
        fn lookalike_close_tag_is_content() {
            let ctx = scan_from_text("<script>var s = 'a</scriptx>'");
            assert_eq!(ctx.state, State::Js);
        }

        #[test]
        fn script_attr_value_is_not_script_body() {
            let ctx = scan_from_text("<script src=\"/app.js\">");
            assert_eq!(ctx.state, State::Js);
            assert_eq!(ctx.element, Element::Script);
        }
    }

    mod rewriting {
        use super::*;

        fn rewrite(text: &str) -> Option<String> {
            escape_raw_text(Context::default(), text).unwrap().1
        }

        #[test]
        fn lone_lt_becomes_entity() {
            assert_eq!(rewrite("1 < 2").as_deref(), Some("1 &lt; 2"));
            assert_eq!(rewrite("a <3 b").as_deref(), Some("a &lt;3 b"));
        }

        #[test]
        fn markup_untouched() {
            assert_eq!(rewrite("<b>bold</b>"), None);
            assert_eq!(rewrite("<!DOCTYPE html><html>"), None);
            assert_eq!(rewrite("<!-- < in comment -->"), None);
        }

        #[test]
        fn mixed_content() {
            assert_eq!(
                rewrite("x < y <em>z</em> <").as_deref(),
                Some("x &lt; y <em>z</em> <")
            );
        }

        #[test]
        fn rcdata_lt_rewritten() {
            assert_eq!(
                rewrite("<title>a < b</title>").as_deref(),
                Some("<title>a &lt; b</title>")
            );
        }
    }
}
