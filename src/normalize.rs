//! Plain-text rendering of a raw pane capture.
//!
//! Agent TUIs redraw constantly, so a capture is full of SGR colouring,
//! cursor movement and carriage-return overwrites. Pattern matching runs on
//! the output of [`normalize`], never on the raw capture.

use std::sync::LazyLock;

use regex::Regex;

// CSI (ESC [ params intermediates final), OSC (ESC ] ... BEL | ST),
// ESC + intermediates + final (charset designators like `ESC ( B`), and
// two-byte escapes (ESC + one char).
static ANSI_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\x1b\[[0-?]*[ -/]*[@-~]|\x1b\][^\x07\x1b]*(?:\x07|\x1b\\)|\x1b[ -/]+[0-~]|\x1b[^\[\]]",
    )
    .expect("ANSI regex is valid")
});

/// Strip ANSI escape sequences, leaving every other character alone.
pub fn strip_ansi(input: &str) -> String {
    ANSI_RE.replace_all(input, "").into_owned()
}

/// Strip escapes, resolve carriage-return redraws and drop stray control
/// characters. Line structure is preserved.
pub fn normalize(raw: &str) -> String {
    let stripped = strip_ansi(raw);
    let unified = stripped.replace("\r\n", "\n");

    let lines: Vec<String> = unified.split('\n').map(resolve_redraws).collect();
    lines.join("\n")
}

/// Apply bare `\r` overwrites within one line the way a terminal would:
/// each segment after a `\r` is written from column 0 over what was there.
fn resolve_redraws(line: &str) -> String {
    if !line.contains('\r') {
        return drop_controls(line);
    }

    let mut cells: Vec<char> = Vec::new();
    for segment in line.split('\r') {
        for (col, ch) in drop_controls(segment).chars().enumerate() {
            if col < cells.len() {
                cells[col] = ch;
            } else {
                cells.push(ch);
            }
        }
    }
    cells.into_iter().collect()
}

fn drop_controls(segment: &str) -> String {
    segment
        .chars()
        .filter(|c| !c.is_control() || *c == '\t')
        .collect()
}
