use std::collections::HashSet;
use pulldown_cmark_escape::escape_html;
use pulldown_cmark::{html, CowStr, Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use ag_core::HeadingImage;

const HEADING_IMAGE_STYLE: &str =
    "aspect-ratio: 16/9; object-fit: cover; width: 100%; border-radius: 8px; margin-top: 1em; margin-bottom: 1em;";

/// Text of every `## ` line, trimmed, in document order.
pub fn extract_headings(markdown: &str) -> Vec<String> {
    markdown
        .lines()
        .filter_map(|line| line.strip_prefix("## "))
        .map(|heading| heading.trim().to_string())
        .collect()
}

/// Markdown to HTML. Strong emphasis becomes `<b>`, and the first H2 whose
/// text matches a heading image is followed by that image.
pub fn render_html(markdown: &str, heading_images: &[HeadingImage]) -> String {
    let mut placed: HashSet<&str> = HashSet::new();
    let mut pending: Option<&HeadingImage> = None;
    let mut events = Vec::new();

    let options = Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH;
    for (event, range) in Parser::new_ext(markdown, options).into_offset_iter() {
        match event {
            Event::Start(Tag::Strong) => events.push(Event::Html(CowStr::Borrowed("<b>"))),
            Event::End(TagEnd::Strong) => events.push(Event::Html(CowStr::Borrowed("</b>"))),
            Event::Start(Tag::Heading { level: HeadingLevel::H2, .. }) => {
                let text = markdown[range.clone()].trim().trim_start_matches('#').trim();
                pending = heading_images
                    .iter()
                    .find(|image| image.heading == text)
                    .filter(|image| placed.insert(image.heading.as_str()));
                events.push(event);
            }
            Event::End(TagEnd::Heading(HeadingLevel::H2)) => {
                events.push(event);
                if let Some(image) = pending.take() {
                    events.push(Event::Html(CowStr::from(image_tag(image))));
                }
            }
            other => events.push(other),
        }
    }

    let mut out = String::with_capacity(markdown.len() * 2);
    html::push_html(&mut out, events.into_iter());
    out
}

fn image_tag(image: &HeadingImage) -> String {
    let mut alt = String::with_capacity(image.heading.len());
    // Writing into a String never fails.
    let _ = escape_html(&mut alt, &image.heading);
    format!(
        "<img src=\"{}\" alt=\"{}\" style=\"{}\" />\n",
        image.data_uri(),
        alt,
        HEADING_IMAGE_STYLE
    )
}
