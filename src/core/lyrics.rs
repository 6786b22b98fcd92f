//! Lyrics text normalization
//!
//! Scraped lyrics arrive with layout artifacts: trailing whitespace,
//! continuation fragments that the page reflowed onto their own line, and
//! section headers glued to the previous verse. `normalize` turns that into
//! clean, section-delimited text.

/// Normalize raw scraped lyrics.
///
/// Rules, applied in order:
/// 1. every line is trimmed;
/// 2. a line starting with `,` is appended to the closest preceding
///    non-blank line (blank lines in between are dropped);
/// 3. a `[...]` section header gets one blank line before it, unless it is
///    the first line;
/// 4. runs of blank lines collapse to a single blank line;
/// 5. leading and trailing blank lines are removed.
///
/// The function is idempotent.
pub fn normalize(raw: &str) -> String {
    let joined = join_continuations(raw.lines().map(str::trim));
    let spaced = space_sections(joined);
    collapse_blank_runs(spaced).join("\n").trim().to_string()
}

fn join_continuations<'a>(lines: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();

    for line in lines {
        if line.starts_with(',') {
            while out.last().is_some_and(|prev| prev.is_empty()) {
                out.pop();
            }
            if let Some(prev) = out.last_mut() {
                prev.push_str(line);
                continue;
            }
        }
        out.push(line.to_string());
    }

    out
}

fn space_sections(lines: Vec<String>) -> Vec<String> {
    let mut out = Vec::with_capacity(lines.len());

    for line in lines {
        if !out.is_empty() && is_section_header(&line) {
            out.push(String::new());
        }
        out.push(line);
    }

    out
}

fn collapse_blank_runs(lines: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(lines.len());

    for line in lines {
        if line.is_empty() && out.last().is_some_and(|prev| prev.is_empty()) {
            continue;
        }
        out.push(line);
    }

    out
}

/// `[Verse 1]`, `[Chorus: Artist]` and friends.
pub fn is_section_header(line: &str) -> bool {
    line.len() >= 2 && line.starts_with('[') && line.ends_with(']')
}
