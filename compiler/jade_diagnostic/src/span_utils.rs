//! Span-to-position helpers for emitters.

/// Convert a byte offset to a 1-based (line, column) pair.
///
/// Offsets past the end of the source land on the final position.
pub fn offset_to_line_col(source: &str, offset: u32) -> (u32, u32) {
    let offset = (offset as usize).min(source.len());
    let mut line = 1u32;
    let mut col = 1u32;
    for (index, ch) in source.char_indices() {
        if index >= offset {
            break;
        }
        if ch == '\n' {
            line += 1;
            col = 1;
        } else {
            col += 1;
        }
    }
    (line, col)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn first_line() {
        assert_eq!(offset_to_line_col("hello", 0), (1, 1));
        assert_eq!(offset_to_line_col("hello", 3), (1, 4));
    }

    #[test]
    fn newlines_advance_lines() {
        let source = "ab\ncd\nef";
        assert_eq!(offset_to_line_col(source, 3), (2, 1));
        assert_eq!(offset_to_line_col(source, 7), (3, 2));
    }

    #[test]
    fn past_end_clamps() {
        assert_eq!(offset_to_line_col("ab", 99), (1, 3));
    }
}
