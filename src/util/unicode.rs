use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Display width in terminal cells. Tabs count as 4 cells.
pub fn display_width(s: &str) -> usize {
    s.split('\t')
        .enumerate()
        .map(|(i, part)| {
            let w = UnicodeWidthStr::width(part);
            if i > 0 { w + 4 } else { w }
        })
        .sum()
}

/// Display width of a single character in terminal cells. Tabs count as 4.
pub fn char_display_width(c: char) -> usize {
    if c == '\t' {
        4
    } else {
        UnicodeWidthChar::width(c).unwrap_or(0)
    }
}

/// Truncate a string to fit within `max_cells` terminal cells, appending `…` if truncated.
pub fn truncate_to_width(s: &str, max_cells: usize) -> String {
    if max_cells == 0 {
        return String::new();
    }
    if display_width(s) <= max_cells {
        return s.to_string();
    }
    if max_cells == 1 {
        return "\u{2026}".to_string();
    }
    let budget = max_cells - 1;
    let mut width = 0;
    let mut result = String::new();
    for c in s.chars() {
        let cw = char_display_width(c);
        if width + cw > budget {
            break;
        }
        width += cw;
        result.push(c);
    }
    result.push('\u{2026}');
    result
}

/// Right-pad with spaces to exactly `cells` wide, truncating first if needed
pub fn pad_to_width(s: &str, cells: usize) -> String {
    let mut out = truncate_to_width(s, cells);
    let w = display_width(&out);
    out.extend(std::iter::repeat_n(' ', cells.saturating_sub(w)));
    out
}

/// Byte offset of the char before `byte_offset`, if any
pub fn prev_char_boundary(s: &str, byte_offset: usize) -> Option<usize> {
    s[..byte_offset.min(s.len())]
        .char_indices()
        .next_back()
        .map(|(i, _)| i)
}

/// Byte offset just past the char at `byte_offset`, if any
pub fn next_char_boundary(s: &str, byte_offset: usize) -> Option<usize> {
    s.get(byte_offset..)?
        .chars()
        .next()
        .map(|c| byte_offset + c.len_utf8())
}
