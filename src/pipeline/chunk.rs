//! Split extracted PRD text into model-sized chunks.
//!
//! Chunks never exceed `max_chars` characters. Boundaries prefer paragraph
//! breaks, then line breaks, and only split inside a line when a single line
//! is longer than the budget. Chunk order follows document order, which is
//! what keeps group order stable after merging.

/// Split `text` into chunks of at most `max_chars` characters.
///
/// Whitespace-only input yields no chunks.
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for piece in pieces(text, max_chars) {
        let piece_len = piece.chars().count();
        let sep_len = if current.is_empty() { 0 } else { 2 };
        if current_len + sep_len + piece_len > max_chars && !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if !current.is_empty() {
            current.push_str("\n\n");
            current_len += 2;
        }
        current.push_str(&piece);
        current_len += piece_len;
    }
    if !current.trim().is_empty() {
        chunks.push(current);
    }
    chunks
}

/// Paragraphs no longer than `max_chars`, breaking oversized ones by line
/// and then by character.
fn pieces(text: &str, max_chars: usize) -> Vec<String> {
    let mut out = Vec::new();
    for para in text.split("\n\n").map(str::trim).filter(|p| !p.is_empty()) {
        if para.chars().count() <= max_chars {
            out.push(para.to_string());
            continue;
        }
        let mut buf = String::new();
        let mut buf_len = 0usize;
        for line in para.lines().map(str::trim_end).filter(|l| !l.trim().is_empty()) {
            let line_len = line.chars().count();
            if line_len > max_chars {
                if !buf.is_empty() {
                    out.push(std::mem::take(&mut buf));
                    buf_len = 0;
                }
                out.extend(hard_split(line, max_chars));
                continue;
            }
            let sep = usize::from(!buf.is_empty());
            if buf_len + sep + line_len > max_chars {
                out.push(std::mem::take(&mut buf));
                buf_len = 0;
            }
            if !buf.is_empty() {
                buf.push('\n');
                buf_len += 1;
            }
            buf.push_str(line);
            buf_len += line_len;
        }
        if !buf.is_empty() {
            out.push(buf);
        }
    }
    out
}

fn hard_split(line: &str, max_chars: usize) -> Vec<String> {
    let chars: Vec<char> = line.chars().collect();
    chars
        .chunks(max_chars)
        .map(|c| c.iter().collect::<String>())
        .collect()
}
