//! Social preview rendering: the Open Graph SVG card and the share landing page.
//!
//! Text reaching these renderers has already been entity-encoded by the
//! share store, so it is inserted as-is. Anything else goes through
//! [`escape_html`].

use crate::sanitize::escape_html;

const QUESTION_PREVIEW_CHARS: usize = 60;
const ANSWER_PREVIEW_CHARS: usize = 100;
const DESCRIPTION_CHARS: usize = 160;
const LINE_WIDTH: usize = 60;
const MAX_LINES: usize = 6;

/// Validated share content, already safe for HTML/SVG
#[derive(Debug, Clone, Copy)]
pub struct PreviewText<'a> {
    pub question: &'a str,
    pub answer: &'a str,
}

/// Cut encoded text to `max` characters without splitting an entity
pub fn truncate_encoded(text: &str, max: usize) -> String {
    let Some((cut, _)) = text.char_indices().nth(max) else {
        return text.to_string();
    };
    let mut head = &text[..cut];
    if let Some(amp) = head.rfind('&') {
        if !head[amp..].contains(';') {
            head = &head[..amp];
        }
    }
    format!("{}...", head.trim_end())
}

/// Greedy word wrap; returns the lines and whether text was dropped
fn wrap(text: &str, width: usize, max_lines: usize) -> (Vec<String>, bool) {
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut words = text.split_whitespace().peekable();

    while let Some(word) = words.next() {
        if !current.is_empty() && current.chars().count() + 1 + word.chars().count() > width {
            lines.push(std::mem::take(&mut current));
            if lines.len() == max_lines {
                return (lines, true);
            }
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
        if words.peek().is_none() {
            lines.push(std::mem::take(&mut current));
        }
    }
    (lines, false)
}

/// 1200x630 Open Graph card
pub fn render_svg(text: Option<PreviewText<'_>>) -> String {
    let mut body = String::new();

    match text {
        Some(PreviewText { question, answer }) => {
            let question = truncate_encoded(question, QUESTION_PREVIEW_CHARS);
            let answer = truncate_encoded(answer, ANSWER_PREVIEW_CHARS);

            body.push_str(&format!(
                r##"<rect x="380" y="80" width="770" height="120" rx="15" fill="rgba(255,255,255,0.15)"/>
<text x="765" y="110" font-family="Arial, sans-serif" font-size="14" font-weight="bold" text-anchor="middle" fill="rgba(255,255,255,0.6)">QUESTION</text>
<text x="765" y="150" font-family="Georgia, serif" font-size="24" text-anchor="middle" fill="white">{question}</text>
<rect x="380" y="220" width="770" height="300" rx="15" fill="rgba(255,255,255,0.12)"/>
<text x="765" y="250" font-family="Arial, sans-serif" font-size="14" font-weight="bold" text-anchor="middle" fill="rgba(255,255,255,0.6)">WISDOM</text>
"##
            ));

            let (lines, clipped) = wrap(&answer, LINE_WIDTH, MAX_LINES);
            for (i, line) in lines.iter().enumerate() {
                body.push_str(&format!(
                    r#"<text x="765" y="{}" font-family="Georgia, serif" font-size="18" text-anchor="middle" fill="rgba(255,255,255,0.95)">{line}</text>
"#,
                    290 + i * 25
                ));
            }
            if clipped {
                body.push_str(&format!(
                    r#"<text x="765" y="{}" font-family="Georgia, serif" font-size="16" text-anchor="middle" fill="rgba(255,255,255,0.7)">...</text>
"#,
                    290 + lines.len() * 25
                ));
            }
        }
        None => body.push_str(
            r#"<rect x="380" y="220" width="770" height="200" rx="15" fill="rgba(255,255,255,0.1)"/>
<text x="765" y="280" font-family="Georgia, serif" font-size="28" text-anchor="middle" fill="rgba(255,255,255,0.9)">&quot;The empty vessel receives the water.&quot;</text>
<text x="765" y="320" font-family="Arial, sans-serif" font-size="18" text-anchor="middle" fill="rgba(255,255,255,0.7)">Share your questions and discover ancient wisdom</text>
"#,
        ),
    }

    format!(
        r##"<svg width="1200" height="630" xmlns="http://www.w3.org/2000/svg">
<defs>
<linearGradient id="bg" x1="0%" y1="0%" x2="100%" y2="100%">
<stop offset="0%" stop-color="#03BFF3"/>
<stop offset="50%" stop-color="#4609A8" stop-opacity="0.8"/>
<stop offset="100%" stop-color="#310080"/>
</linearGradient>
</defs>
<rect width="1200" height="630" fill="url(#bg)"/>
<rect x="50" y="50" width="300" height="120" rx="20" fill="rgba(255,255,255,0.1)"/>
<text x="200" y="130" font-family="Arial, sans-serif" font-size="42" font-weight="bold" text-anchor="middle" fill="white">MINNEBO</text>
{body}<text x="1050" y="575" font-family="Arial, sans-serif" font-size="18" font-weight="bold" text-anchor="middle" fill="white">minnebo.ai</text>
</svg>
"##
    )
}

/// Landing page for `/s/{id}` with Open Graph tags and a redirect into the app
pub fn render_share_page(public_origin: &str, share_id: Option<&str>, text: Option<PreviewText<'_>>) -> String {
    let origin = public_origin.trim_end_matches('/');
    let (app_url, image_url) = match share_id {
        Some(id) => {
            let id = urlencoding::encode(id);
            (
                format!("{origin}/?share={id}"),
                format!("{origin}/api/og-image?id={id}"),
            )
        }
        None => (format!("{origin}/"), format!("{origin}/api/og-image")),
    };
    let app_url = escape_html(&app_url);
    let image_url = escape_html(&image_url);

    let (title, og_title, description) = match text {
        Some(PreviewText { question, answer }) => (
            format!("{question} - minnebo.ai"),
            format!("&quot;{question}&quot;"),
            truncate_encoded(answer, DESCRIPTION_CHARS),
        ),
        None => (
            "MINNEBO".to_string(),
            "MINNEBO - AI Wisdom &amp; Ancient Insights".to_string(),
            "Transform your questions into profound wisdom inspired by ancient sages and mystics."
                .to_string(),
        ),
    };

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8" />
<meta name="viewport" content="width=device-width, initial-scale=1" />
<title>{title}</title>
<meta property="og:title" content="{og_title}" />
<meta property="og:description" content="{description}" />
<meta property="og:url" content="{app_url}" />
<meta property="og:type" content="article" />
<meta property="og:site_name" content="MINNEBO" />
<meta property="og:image" content="{image_url}" />
<meta property="og:image:type" content="image/svg+xml" />
<meta property="og:image:width" content="1200" />
<meta property="og:image:height" content="630" />
<meta name="twitter:card" content="summary_large_image" />
<meta name="twitter:title" content="{og_title}" />
<meta name="twitter:description" content="{description}" />
<meta name="twitter:image" content="{image_url}" />
<meta http-equiv="refresh" content="0; url={app_url}" />
</head>
<body>
<p><a href="{app_url}">Continue to minnebo.ai</a></p>
</body>
</html>
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_keeps_entities_whole() {
        assert_eq!(truncate_encoded("short", 10), "short");
        assert_eq!(truncate_encoded("abcdefghij", 4), "abcd...");
        assert_eq!(truncate_encoded("fish &amp; chips", 8), "fish...");
        assert_eq!(truncate_encoded("fish &amp; chips", 11), "fish &amp;...");
    }

    #[test]
    fn test_wrap_limits_lines() {
        let (lines, clipped) = wrap("one two three", 7, 6);
        assert_eq!(lines, vec!["one two", "three"]);
        assert!(!clipped);

        let long = "word ".repeat(200);
        let (lines, clipped) = wrap(&long, 60, 6);
        assert_eq!(lines.len(), 6);
        assert!(clipped);
    }

    #[test]
    fn test_svg_contains_encoded_text_only() {
        let svg = render_svg(Some(PreviewText {
            question: "What is &lt;b&gt;stillness?",
            answer: "The lake undisturbed.",
        }));
        assert!(svg.contains("What is &lt;b&gt;stillness?"));
        assert!(svg.contains("The lake undisturbed."));
        assert!(!svg.contains("<b>"));

        let fallback = render_svg(None);
        assert!(fallback.contains("The empty vessel receives the water."));
    }

    #[test]
    fn test_share_page_links() {
        let id = "A".repeat(43);
        let page = render_share_page(
            "https://minnebo.ai/",
            Some(&id),
            Some(PreviewText {
                question: "What is stillness?",
                answer: "The lake undisturbed.",
            }),
        );
        assert!(page.contains(&format!("https://minnebo.ai/?share={id}")));
        assert!(page.contains(&format!("https://minnebo.ai/api/og-image?id={id}")));
        assert!(page.contains("<title>What is stillness? - minnebo.ai</title>"));
        assert!(page.contains(r#"content="&quot;What is stillness?&quot;""#));

        let generic = render_share_page("https://minnebo.ai", None, None);
        assert!(generic.contains(r#"content="0; url=https://minnebo.ai/""#));
    }
}
