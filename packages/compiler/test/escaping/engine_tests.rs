/**
 * Escaping Engine Tests
 *
 * End-to-end tests for contextual autoescaping: parse, infer, commit,
 * then inspect the rewritten tree.
 */

#[cfg(test)]
mod engine_tests {
    use sable_compiler::template_parser::ast::{BlockValue, Node, TemplateNode};
    use sable_compiler::{
        escape_templates, CompileError, DirectiveRegistry, ErrorKind, EscapeOptions,
        TemplateRegistry,
    };

    fn compile_with(
        sources: &[&str],
        options: &EscapeOptions,
    ) -> Result<TemplateRegistry, CompileError> {
        let mut registry = TemplateRegistry::new();
        for (i, source) in sources.iter().enumerate() {
            registry
                .add_file(source, &format!("file{}.sable", i))
                .unwrap_or_else(|e| panic!("syntax error in test source: {}", e));
        }
        escape_templates(&mut registry, &DirectiveRegistry::builtin(), options)?;
        Ok(registry)
    }

    fn compile(source: &str) -> Result<TemplateRegistry, CompileError> {
        compile_with(&[source], &EscapeOptions::default())
    }

    fn collect_prints<'a>(nodes: &'a [Node], out: &mut Vec<&'a sable_compiler::template_parser::ast::PrintNode>) {
        for node in nodes {
            match node {
                Node::Print(n) => out.push(n),
                Node::If(n) => {
                    for branch in &n.branches {
                        collect_prints(&branch.children, out);
                    }
                    if let Some(children) = &n.else_children {
                        collect_prints(children, out);
                    }
                }
                Node::Switch(n) => {
                    for case in &n.cases {
                        collect_prints(&case.children, out);
                    }
                    if let Some(children) = &n.default_children {
                        collect_prints(children, out);
                    }
                }
                Node::Loop(n) => {
                    collect_prints(&n.children, out);
                    if let Some(children) = &n.if_empty {
                        collect_prints(children, out);
                    }
                }
                Node::Call(n) => {
                    for param in &n.params {
                        if let BlockValue::Block { children, .. } = &param.value {
                            collect_prints(children, out);
                        }
                    }
                }
                Node::Let(n) => {
                    if let BlockValue::Block { children, .. } = &n.value {
                        collect_prints(children, out);
                    }
                }
                Node::RawText(_) => {}
            }
        }
    }

    /// Directive names of every print in the template, in source order.
    fn print_directives(template: &TemplateNode) -> Vec<Vec<String>> {
        let mut prints = Vec::new();
        collect_prints(&template.body, &mut prints);
        prints
            .iter()
            .map(|p| p.directives.iter().map(|d| d.name.clone()).collect())
            .collect()
    }

    fn first_call(template: &TemplateNode) -> &sable_compiler::template_parser::ast::CallNode {
        template
            .body
            .iter()
            .find_map(|n| match n {
                Node::Call(c) => Some(c),
                _ => None,
            })
            .expect("no call node in template")
    }

    mod scenarios {
        use super::*;

        #[test]
        fn plain_text_print_gets_html_escape() {
            let registry = compile(
                "{namespace demo}\n{template .hello}Hello, {$world}!{/template}",
            )
            .unwrap();
            let template = registry.get("demo.hello").unwrap();
            assert_eq!(print_directives(template), vec![vec!["escapeHtml".to_string()]]);
        }

        #[test]
        fn quoted_url_attribute_gets_filter_and_attr_escape() {
            let registry = compile(
                "{namespace demo}\n{template .link}<a href='{$x}'>x</a>{/template}",
            )
            .unwrap();
            let template = registry.get("demo.link").unwrap();
            assert_eq!(
                print_directives(template),
                vec![vec!["filterNormalizeUri".to_string(), "escapeHtmlAttribute".to_string()]]
            );
        }

        #[test]
        fn js_string_print_gets_js_string_escape() {
            let registry = compile(
                "{namespace demo}\n{template .msg}<script>alert('{$x}')</script>{/template}",
            )
            .unwrap();
            let template = registry.get("demo.msg").unwrap();
            assert_eq!(
                print_directives(template),
                vec![vec!["escapeJsString".to_string()]]
            );
        }

        #[test]
        fn branch_ending_inside_script_diverges() {
            let err = compile(
                "{namespace demo}\n\
                 {template .cond}\
                 {if $a}{$x}{elseif $b}<script>{$x}{else}{$x}{/if}\
                 {/template}",
            )
            .unwrap_err();
            assert_eq!(err.kind, ErrorKind::BranchDivergence);
            assert!(err.message.contains("{elseif} branch"), "{}", err.message);
            assert_eq!(err.template, "demo.cond");
        }

        #[test]
        fn css_url_print_gets_uri_path_escaping() {
            let registry = compile(
                "{namespace demo}\n\
                 {template .bg}\
                 <style>body {lb} background: url(\"{$bg}\") {rb}</style>\
                 {/template}",
            )
            .unwrap();
            let template = registry.get("demo.bg").unwrap();
            let directives = print_directives(template);
            assert_eq!(directives.len(), 1);
            assert_eq!(directives[0][0], "filterNormalizeUri");
            assert!(!directives[0].contains(&"escapeHtml".to_string()));
            assert!(!directives[0].contains(&"escapeJsValue".to_string()));
        }

        #[test]
        fn html_block_with_unclosed_script_is_kind_mismatch() {
            let err = compile(
                "{namespace demo}\n\
                 {template .page}\
                 {let $x kind=\"html\"}<script>var a = 1;{/let}{$x}\
                 {/template}",
            )
            .unwrap_err();
            assert_eq!(err.kind, ErrorKind::KindMismatch);
            assert!(err.message.contains("unclosed script block"), "{}", err.message);
        }
    }

    mod laws {
        use super::*;

        #[test]
        fn reescaping_is_idempotent() {
            let source = "{namespace demo}\n\
                          {template .page}\
                          <p>{$a}</p><a href=\"{$u}\">{$b}</a>\
                          {if $c}<b>{$d}</b>{/if}\
                          {/template}";
            let once = compile(source).unwrap();
            let first = print_directives(once.get("demo.page").unwrap());

            // Second pass over the already-escaped tree.
            let mut registry = compile(source).unwrap();
            escape_templates(
                &mut registry,
                &DirectiveRegistry::builtin(),
                &EscapeOptions::default(),
            )
            .unwrap();
            let second = print_directives(registry.get("demo.page").unwrap());
            assert_eq!(first, second);
        }

        #[test]
        fn analysis_is_deterministic() {
            let sources = [
                "{namespace a}\n\
                 {template .page}{call .part /}{call b.widget /}{/template}\n\
                 {template .part}<i>{$x}</i>{/template}",
                "{namespace b}\n\
                 {template .widget kind=\"html\"}<u>{$y}</u>{/template}",
            ];
            let first = compile_with(&sources, &EscapeOptions::default()).unwrap();
            let second = compile_with(&sources, &EscapeOptions::default()).unwrap();
            for name in ["a.page", "a.part", "b.widget"] {
                assert_eq!(
                    print_directives(first.get(name).unwrap()),
                    print_directives(second.get(name).unwrap()),
                    "directives differ for {}",
                    name
                );
            }
        }

        #[test]
        fn equal_branch_contexts_merge() {
            assert!(compile(
                "{namespace demo}\n\
                 {template .t}\
                 {switch $n}{case 1}<b>one</b>{case 2}<i>two</i>{default}none{/switch}\
                 {/template}"
            )
            .is_ok());
        }

        #[test]
        fn diverging_switch_case_fails() {
            let err = compile(
                "{namespace demo}\n\
                 {template .t}\
                 {switch $n}{case 1}<b>one</b>{case 2}<a href=\"{default}none{/switch}\
                 {/template}",
            )
            .unwrap_err();
            assert_eq!(err.kind, ErrorKind::BranchDivergence);
        }

        #[test]
        fn reentrant_loop_body_compiles() {
            assert!(compile(
                "{namespace demo}\n\
                 {template .list}\
                 <ul>{foreach $it in $items}<li>{$it}</li>{ifempty}<li>none</li>{/foreach}</ul>\
                 {/template}"
            )
            .is_ok());
        }

        #[test]
        fn non_reentrant_loop_body_fails() {
            // The unterminated attribute value leaves each iteration
            // inside the <li> start tag.
            let err = compile(
                "{namespace demo}\n\
                 {template .list}{foreach $it in $items}<li id=\"{$it}{/foreach}{/template}",
            )
            .unwrap_err();
            assert_eq!(err.kind, ErrorKind::BranchDivergence);
        }

        #[test]
        fn kind_round_trips() {
            for (kind, body) in [
                ("html", "<p title=\"x\">hello</p>"),
                ("css", "p {lb} color: red {rb}"),
                ("js", "var x = 'y';"),
                ("uri", "/search?q=rust"),
                ("attributes", "class=\"big\" id='x'"),
                ("text", "anything at all < > \" {$x|noAutoescape}"),
            ] {
                let source = format!(
                    "{{namespace demo}}\n{{template .t kind=\"{}\"}}{}{{/template}}",
                    kind, body
                );
                assert!(compile(&source).is_ok(), "kind {} did not round-trip", kind);
            }
        }
    }

    mod calls {
        use super::*;

        #[test]
        fn matching_strict_call_needs_no_escaping() {
            let registry = compile(
                "{namespace demo}\n\
                 {template .page}<div>{call .widget /}</div>{/template}\n\
                 {template .widget kind=\"html\"}<b>{$x}</b>{/template}",
            )
            .unwrap();
            let call = first_call(registry.get("demo.page").unwrap());
            assert!(call.escapes.is_empty());
        }

        #[test]
        fn kind_crossing_call_is_escaped_like_a_print() {
            // An html-kind value used inside a quoted JS string.
            let registry = compile(
                "{namespace demo}\n\
                 {template .page}<script>var s = '{call .widget /}';</script>{/template}\n\
                 {template .widget kind=\"html\"}<b>{$x}</b>{/template}",
            )
            .unwrap();
            let page = registry.get("demo.page").unwrap();
            let call = page
                .body
                .iter()
                .find_map(|n| match n {
                    Node::Call(c) => Some(c),
                    _ => None,
                })
                .unwrap();
            assert_eq!(call.escapes, vec!["escapeJsString".to_string()]);
        }

        #[test]
        fn kindless_callee_is_analyzed_in_caller_context() {
            let registry = compile(
                "{namespace demo}\n\
                 {template .page}<a href=\"{call .frag /}\">x</a>{/template}\n\
                 {template .frag}/path?q={$q}{/template}",
            )
            .unwrap();
            // The callee's print sits in the URL query, so it gets URI
            // escaping even though the callee itself declares nothing.
            let frag = registry.get("demo.frag").unwrap();
            assert_eq!(print_directives(frag), vec![vec!["escapeUri".to_string()]]);
            let call = first_call(registry.get("demo.page").unwrap());
            assert!(call.escapes.is_empty());
        }

        #[test]
        fn kindless_callee_in_conflicting_contexts_rejected() {
            // One caller puts the fragment in a URL attribute value, the
            // other in plain text; its print cannot carry both escapings.
            let err = compile(
                "{namespace demo}\n\
                 {template .a}<a href=\"{call .frag /}\">x</a>{/template}\n\
                 {template .b}<p>{call .frag /}</p>{/template}\n\
                 {template .frag}{$x}{/template}",
            )
            .unwrap_err();
            assert_eq!(err.kind, ErrorKind::AmbiguousContext);
            assert_eq!(err.template, "demo.frag");
        }

        #[test]
        fn kindless_callee_shared_by_matching_contexts() {
            let registry = compile(
                "{namespace demo}\n\
                 {template .a}<p>{call .frag /}</p>{/template}\n\
                 {template .b}<div>{call .frag /}</div>{/template}\n\
                 {template .frag}{$x}{/template}",
            )
            .unwrap();
            let frag = registry.get("demo.frag").unwrap();
            assert_eq!(print_directives(frag), vec![vec!["escapeHtml".to_string()]]);
        }

        #[test]
        fn unchecked_callee_is_opaque() {
            let registry = compile(
                "{namespace demo}\n\
                 {template .page}<p>{call .legacy /}</p>{/template}\n\
                 {template .legacy autoescape=\"false\"}<raw>{$x}</raw>{/template}",
            )
            .unwrap();
            let call = first_call(registry.get("demo.page").unwrap());
            assert_eq!(call.escapes, vec!["escapeHtml".to_string()]);
            // The unchecked template's own prints are untouched.
            let legacy = registry.get("demo.legacy").unwrap();
            assert_eq!(print_directives(legacy), vec![Vec::<String>::new()]);
        }

        #[test]
        fn opaque_call_in_js_poisons_slash() {
            // After an opaque value in JS, a literal '/' cannot be
            // classified as division or regexp.
            let err = compile(
                "{namespace demo}\n\
                 {template .page}<script>var x = {call .legacy /} / 2;</script>{/template}\n\
                 {template .legacy autoescape=\"false\"}1{/template}",
            )
            .unwrap_err();
            assert_eq!(err.kind, ErrorKind::AmbiguousContext);
        }

        #[test]
        fn call_params_are_analyzed() {
            let err = compile(
                "{namespace demo}\n\
                 {template .page}{call .widget}{param body kind=\"html\"}<b{/param}{/call}{/template}\n\
                 {template .widget kind=\"html\"}<b>{$body}</b>{/template}",
            )
            .unwrap_err();
            assert_eq!(err.kind, ErrorKind::KindMismatch);
        }

        #[test]
        fn mutual_recursion_reaches_fixed_point() {
            assert!(compile(
                "{namespace demo}\n\
                 {template .odd}<b>odd</b>{if $more}{call .even /}{/if}{/template}\n\
                 {template .even}<i>even</i>{if $more}{call .odd /}{/if}{/template}"
            )
            .is_ok());
        }
    }

    mod rewrites {
        use super::*;

        #[test]
        fn stray_lt_is_rewritten() {
            let registry = compile(
                "{namespace demo}\n{template .t}a < b <i>c</i>{/template}",
            )
            .unwrap();
            let template = registry.get("demo.t").unwrap();
            let text = template
                .body
                .iter()
                .find_map(|n| match n {
                    Node::RawText(t) => Some(t.value.clone()),
                    _ => None,
                })
                .unwrap();
            assert_eq!(text, "a &lt; b <i>c</i>");
        }

        #[test]
        fn explicit_compatible_escaping_not_duplicated() {
            let registry = compile(
                "{namespace demo}\n{template .t}<p>{$x|escapeHtml}</p>{/template}",
            )
            .unwrap();
            let template = registry.get("demo.t").unwrap();
            assert_eq!(print_directives(template), vec![vec!["escapeHtml".to_string()]]);
        }

        #[test]
        fn formatting_directive_keeps_position() {
            let registry = compile(
                "{namespace demo}\n{template .t}<p>{$x|truncate:10}</p>{/template}",
            )
            .unwrap();
            let template = registry.get("demo.t").unwrap();
            assert_eq!(
                print_directives(template),
                vec![vec!["truncate".to_string(), "escapeHtml".to_string()]]
            );
        }

        #[test]
        fn incompatible_explicit_escaping_rejected() {
            let err = compile(
                "{namespace demo}\n{template .t}<p>{$x|escapeUri}</p>{/template}",
            )
            .unwrap_err();
            assert_eq!(err.kind, ErrorKind::DirectiveIncompatibility);
        }
    }

    mod diagnostics {
        use super::*;

        #[test]
        fn error_carries_template_and_line() {
            let err = compile(
                "{namespace demo}\n\
                 {template .ok}<p>fine</p>{/template}\n\
                 {template .broken}\n\
                 <!-- {$x} -->\n\
                 {/template}",
            )
            .unwrap_err();
            assert_eq!(err.kind, ErrorKind::ContentInComment);
            assert_eq!(err.template, "demo.broken");
            assert_eq!(err.line, 4);
            assert!(err.to_string().starts_with("template demo.broken:4:"));
        }

        #[test]
        fn unterminated_attribute_hint() {
            let err = compile(
                "{namespace demo}\n{template .t}<a href=\"{$u}{/template}",
            )
            .unwrap_err();
            assert_eq!(err.kind, ErrorKind::KindMismatch);
            assert!(err.message.contains("unterminated attribute value"), "{}", err.message);
        }

        #[test]
        fn unknown_url_part_is_ambiguous() {
            // After $a the query boundary is unknown, so $b cannot be
            // escaped safely.
            let err = compile(
                "{namespace demo}\n{template .t}<a href=\"/x/{$a}/{$b}\">y</a>{/template}",
            )
            .unwrap_err();
            assert_eq!(err.kind, ErrorKind::AmbiguousContext);
            // A literal '?' re-anchors the position.
            assert!(compile(
                "{namespace demo}\n{template .t}<a href=\"/x/{$a}?q={$c}\">y</a>{/template}"
            )
            .is_ok());
        }

        #[test]
        fn failed_template_blocks_whole_unit() {
            let err = compile(
                "{namespace demo}\n\
                 {template .a}<p>{$x}</p>{/template}\n\
                 {template .b}<p {/template}",
            )
            .unwrap_err();
            assert_eq!(err.kind, ErrorKind::KindMismatch);
        }
    }
}
