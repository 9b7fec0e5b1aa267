//! Document text extraction.

use crate::error::{EngineError, EngineResult};
use doclink_core::ContentUnit;

/// Extracted content of one document, in source order.
#[derive(Clone, Debug)]
pub struct Extraction {
    pub units: Vec<ContentUnit>,
}

/// Extracts content units from raw document bytes.
///
/// Implementations must return units in source order and reject
/// documents with no extractable content via `EmptyDocument`.
pub trait DocumentReader: Send + Sync {
    /// Extract from raw bytes. `name` is used for format detection and
    /// error messages.
    fn read(&self, bytes: &[u8], name: &str) -> EngineResult<Extraction>;
}

/// Built-in reader for plain text, Markdown, and (tag-stripped) HTML.
///
/// Pages are delimited by form feeds; Markdown headings and pipe tables
/// set the corresponding unit flags. Sentences are split on terminal
/// punctuation.
#[derive(Clone, Debug, Default)]
pub struct PlainReader;

impl PlainReader {
    pub fn new() -> Self {
        Self
    }

    fn decode(bytes: &[u8], name: &str) -> EngineResult<String> {
        String::from_utf8(bytes.to_vec()).map_err(|e| EngineError::Encoding(format!("{name}: {e}")))
    }

    /// Remove tags, scripts, and styles from an HTML document, keeping
    /// block boundaries as newlines. Deliberately crude: real HTML
    /// extraction belongs to an external engine behind this trait.
    fn strip_html(html: &str) -> String {
        let mut out = String::with_capacity(html.len() / 2);
        let mut chars = html.char_indices();
        let mut skip_until: Option<&'static str> = None;

        while let Some((i, c)) = chars.next() {
            if let Some(end) = skip_until {
                let bytes = html.as_bytes();
                if html.len() - i >= end.len()
                    && bytes[i..i + end.len()].eq_ignore_ascii_case(end.as_bytes())
                {
                    skip_until = None;
                    // Swallow the rest of the closing tag.
                    for (_, c2) in chars.by_ref() {
                        if c2 == '>' {
                            break;
                        }
                    }
                }
                continue;
            }
            if c == '<' {
                let rest = &html.as_bytes()[i + 1..];
                if rest.len() >= 6 && rest[..6].eq_ignore_ascii_case(b"script") {
                    skip_until = Some("</script");
                } else if rest.len() >= 5 && rest[..5].eq_ignore_ascii_case(b"style") {
                    skip_until = Some("</style");
                }
                let mut tag = String::new();
                for (_, c2) in chars.by_ref() {
                    if c2 == '>' {
                        break;
                    }
                    tag.push(c2);
                }
                let tag_name = tag
                    .trim_start_matches('/')
                    .split_whitespace()
                    .next()
                    .unwrap_or("")
                    .to_ascii_lowercase();
                if matches!(
                    tag_name.as_str(),
                    "p" | "div" | "br" | "li" | "tr" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6"
                ) {
                    out.push('\n');
                }
            } else {
                out.push(c);
            }
        }
        out
    }

    fn split_sentences(text: &str) -> Vec<String> {
        let mut sentences = Vec::new();
        let mut current = String::new();
        for c in text.chars() {
            current.push(c);
            if matches!(c, '.' | '!' | '?') {
                let trimmed = current.trim();
                if !trimmed.is_empty() {
                    sentences.push(trimmed.to_string());
                }
                current.clear();
            }
        }
        let tail = current.trim();
        if !tail.is_empty() {
            sentences.push(tail.to_string());
        }
        sentences
    }

    fn extract_text(text: &str) -> Vec<ContentUnit> {
        let mut units = Vec::new();
        let mut page = 1;

        for raw_line in text.lines() {
            let mut line = raw_line;
            // Form feeds mark page boundaries in extracted text.
            while let Some(idx) = line.find('\u{c}') {
                let before = &line[..idx];
                Self::push_line(&mut units, before, page);
                page += 1;
                line = &line[idx + 1..];
            }
            Self::push_line(&mut units, line, page);
        }
        units
    }

    fn push_line(units: &mut Vec<ContentUnit>, line: &str, page: i32) {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return;
        }

        if let Some(heading) = trimmed.strip_prefix('#') {
            let heading = heading.trim_start_matches('#').trim();
            if !heading.is_empty() {
                units.push(ContentUnit {
                    sentence: heading.to_string(),
                    page_number: page,
                    is_header: true,
                    is_table: false,
                });
            }
            return;
        }

        if trimmed.starts_with('|') && trimmed.ends_with('|') {
            // Skip Markdown separator rows (|---|---|).
            let body: String = trimmed
                .chars()
                .filter(|&c| !matches!(c, '|' | '-' | ':' | ' '))
                .collect();
            if body.is_empty() {
                return;
            }
            units.push(ContentUnit {
                sentence: trimmed.to_string(),
                page_number: page,
                is_header: false,
                is_table: true,
            });
            return;
        }

        for sentence in Self::split_sentences(trimmed) {
            units.push(ContentUnit {
                sentence,
                page_number: page,
                is_header: false,
                is_table: false,
            });
        }
    }
}

impl DocumentReader for PlainReader {
    fn read(&self, bytes: &[u8], name: &str) -> EngineResult<Extraction> {
        let lower = name.to_ascii_lowercase();
        let text = if lower.ends_with(".html") || lower.ends_with(".htm") || looks_like_url(&lower)
        {
            Self::strip_html(&Self::decode(bytes, name)?)
        } else if lower.ends_with(".txt")
            || lower.ends_with(".md")
            || lower.ends_with(".markdown")
            || !lower.contains('.')
        {
            Self::decode(bytes, name)?
        } else {
            return Err(EngineError::UnsupportedFormat(name.to_string()));
        };

        let units = Self::extract_text(&text);
        if units.is_empty() {
            return Err(EngineError::EmptyDocument(name.to_string()));
        }
        Ok(Extraction { units })
    }
}

fn looks_like_url(name: &str) -> bool {
    name.starts_with("http://") || name.starts_with("https://")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_plain_sentences() {
        let reader = PlainReader::new();
        let extraction = reader
            .read(b"First sentence. Second sentence! Third?", "notes.txt")
            .unwrap();
        let sentences: Vec<_> = extraction.units.iter().map(|u| u.sentence.as_str()).collect();
        assert_eq!(
            sentences,
            vec!["First sentence.", "Second sentence!", "Third?"]
        );
        assert!(extraction.units.iter().all(|u| u.page_number == 1));
    }

    #[test]
    fn test_markdown_headers_and_tables() {
        let reader = PlainReader::new();
        let doc = "# Title\nBody text here.\n| a | b |\n|---|---|\n| 1 | 2 |\n";
        let extraction = reader.read(doc.as_bytes(), "doc.md").unwrap();

        assert!(extraction.units[0].is_header);
        assert_eq!(extraction.units[0].sentence, "Title");
        assert!(!extraction.units[1].is_header);
        let tables: Vec<_> = extraction.units.iter().filter(|u| u.is_table).collect();
        // The separator row is dropped; header and data rows survive.
        assert_eq!(tables.len(), 2);
    }

    #[test]
    fn test_form_feed_advances_page() {
        let reader = PlainReader::new();
        let extraction = reader
            .read("Page one.\u{c}Page two.".as_bytes(), "paged.txt")
            .unwrap();
        assert_eq!(extraction.units[0].page_number, 1);
        assert_eq!(extraction.units[1].page_number, 2);
    }

    #[test]
    fn test_html_is_stripped() {
        let reader = PlainReader::new();
        let html = "<html><head><style>p{color:red}</style></head>\
                    <body><h1>Heading</h1><p>Some text.</p><script>var x=1;</script></body></html>";
        let extraction = reader.read(html.as_bytes(), "page.html").unwrap();
        let joined: String = extraction
            .units
            .iter()
            .map(|u| u.sentence.clone())
            .collect::<Vec<_>>()
            .join(" ");
        assert!(joined.contains("Heading"));
        assert!(joined.contains("Some text."));
        assert!(!joined.contains("color"));
        assert!(!joined.contains("var x"));
    }

    #[test]
    fn test_empty_document_is_terminal() {
        let reader = PlainReader::new();
        assert!(matches!(
            reader.read(b"   \n  \n", "blank.txt").unwrap_err(),
            EngineError::EmptyDocument(_)
        ));
    }

    #[test]
    fn test_unknown_format_rejected() {
        let reader = PlainReader::new();
        assert!(matches!(
            reader.read(b"\x00\x01", "image.png").unwrap_err(),
            EngineError::UnsupportedFormat(_)
        ));
    }
}
