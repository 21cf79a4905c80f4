//! Cursor editing over plain strings. Cursors are char indices, never bytes.

/// Convert a character index to a byte index for UTF-8 safe string operations
pub fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub fn insert_char(text: &mut String, cursor: &mut usize, c: char) {
    let byte_pos = char_to_byte_index(text, *cursor);
    text.insert(byte_pos, c);
    *cursor += 1;
}

pub fn backspace(text: &mut String, cursor: &mut usize) {
    if *cursor > 0 {
        *cursor -= 1;
        let byte_pos = char_to_byte_index(text, *cursor);
        text.remove(byte_pos);
    }
}

pub fn delete(text: &mut String, cursor: usize) {
    if cursor < text.chars().count() {
        let byte_pos = char_to_byte_index(text, cursor);
        text.remove(byte_pos);
    }
}

/// (line, column) of the cursor, both counted in chars
pub fn line_col(text: &str, cursor: usize) -> (usize, usize) {
    let mut line = 0;
    let mut col = 0;
    for c in text.chars().take(cursor) {
        if c == '\n' {
            line += 1;
            col = 0;
        } else {
            col += 1;
        }
    }
    (line, col)
}

/// Char index of the start of each line
fn line_starts(text: &str) -> Vec<usize> {
    let mut starts = vec![0];
    for (i, c) in text.chars().enumerate() {
        if c == '\n' {
            starts.push(i + 1);
        }
    }
    starts
}

fn line_len(text: &str, line: usize) -> usize {
    text.split('\n').nth(line).map(|l| l.chars().count()).unwrap_or(0)
}

pub fn line_start(text: &str, cursor: usize) -> usize {
    let (line, _) = line_col(text, cursor);
    line_starts(text)[line]
}

pub fn line_end(text: &str, cursor: usize) -> usize {
    let (line, _) = line_col(text, cursor);
    line_starts(text)[line] + line_len(text, line)
}

/// Move to the same column on the previous line, clamped to its length
pub fn move_up(text: &str, cursor: usize) -> usize {
    let (line, col) = line_col(text, cursor);
    if line == 0 {
        return 0;
    }
    line_starts(text)[line - 1] + col.min(line_len(text, line - 1))
}

/// Move to the same column on the next line, clamped to its length
pub fn move_down(text: &str, cursor: usize) -> usize {
    let (line, col) = line_col(text, cursor);
    let starts = line_starts(text);
    if line + 1 >= starts.len() {
        return text.chars().count();
    }
    starts[line + 1] + col.min(line_len(text, line + 1))
}
