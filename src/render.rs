use crossterm::style::Stylize;
use pulldown_cmark::{Event, Options, Parser, Tag, TagEnd, html};

/// Renders markdown for the terminal using ANSI styles.
pub fn markdown_to_terminal(text: &str) -> String {
    let mut out = String::new();
    let mut heading = false;
    let mut emphasis = 0usize;
    let mut code_block = false;
    let mut list_depth = 0usize;

    for event in Parser::new_ext(text, Options::ENABLE_STRIKETHROUGH) {
        match event {
            Event::Start(Tag::Heading { .. }) => heading = true,
            Event::End(TagEnd::Heading(_)) => {
                heading = false;
                out.push_str("\n\n");
            }
            Event::Start(Tag::Strong | Tag::Emphasis) => emphasis += 1,
            Event::End(TagEnd::Strong | TagEnd::Emphasis) => emphasis = emphasis.saturating_sub(1),
            Event::Start(Tag::CodeBlock(_)) => code_block = true,
            Event::End(TagEnd::CodeBlock) => {
                code_block = false;
                out.push('\n');
            }
            Event::Start(Tag::List(_)) => list_depth += 1,
            Event::End(TagEnd::List(_)) => {
                list_depth = list_depth.saturating_sub(1);
                if list_depth == 0 {
                    out.push('\n');
                }
            }
            Event::Start(Tag::Item) => {
                out.push_str(&"  ".repeat(list_depth.saturating_sub(1)));
                out.push_str("• ");
            }
            Event::End(TagEnd::Item) => {
                if !out.ends_with('\n') {
                    out.push('\n');
                }
            }
            Event::End(TagEnd::Paragraph) => {
                if list_depth == 0 {
                    out.push_str("\n\n");
                }
            }
            Event::Text(t) => {
                let t: &str = &t;
                let styled = if code_block {
                    t.cyan().to_string()
                } else if heading {
                    t.bold().underlined().to_string()
                } else if emphasis > 0 {
                    t.bold().to_string()
                } else {
                    t.to_string()
                };
                out.push_str(&styled);
            }
            Event::Code(t) => out.push_str(&(&*t).yellow().to_string()),
            Event::SoftBreak | Event::HardBreak => out.push('\n'),
            Event::Rule => out.push_str("────────\n"),
            _ => {}
        }
    }
    out.trim_end().to_string()
}

/// A standalone HTML page for viewing conversation markdown in a browser.
pub fn markdown_to_html_page(title: &str, markdown: &str) -> String {
    let mut body = String::new();
    html::push_html(
        &mut body,
        Parser::new_ext(markdown, Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH),
    );
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{title}</title>\n\
         <style>body{{max-width:50em;margin:2em auto;font-family:sans-serif;line-height:1.5}}\
         pre{{background:#f4f4f4;padding:1em;overflow-x:auto}}img{{max-width:100%}}</style>\n\
         </head>\n<body>\n{body}</body>\n</html>\n"
    )
}
