use std::borrow::Cow;

/// Canonical form of extracted text: NULs removed, every line's whitespace
/// runs collapsed to one space and trimmed, blank lines dropped, lines joined
/// by a single `\n`.
///
/// Total and idempotent. NUL removal runs first so that a NUL sitting between
/// two spaces cannot leave a double space behind for a second pass to find.
pub fn normalize(raw: &str) -> String {
    let text: Cow<'_, str> = if raw.contains('\0') {
        Cow::Owned(raw.replace('\0', ""))
    } else {
        Cow::Borrowed(raw)
    };

    let mut out = String::with_capacity(text.len());
    for line in text.split('\n') {
        let mut words = line.split_whitespace();
        let Some(first) = words.next() else {
            continue;
        };
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(first);
        for word in words {
            out.push(' ');
            out.push_str(word);
        }
    }
    out
}
