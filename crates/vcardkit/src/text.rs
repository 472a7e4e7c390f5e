//! Character escaping and line folding (RFC 6350 §3.2, §3.4).
//!
//! These functions know nothing about contacts; they operate on property
//! values and content lines only.

/// Default physical line limit, in octets.
pub const DEFAULT_FOLD_LIMIT: usize = 75;

// ─── Escaping ─────────────────────────────────────────────────────────────────

/// Escape a text value: `\`, `;`, `,` and newline.
///
/// Backslash goes first so that the backslashes introduced by the later
/// substitutions are not doubled.
pub fn escape(s: &str) -> String {
  s.replace('\\', "\\\\")
    .replace(';', "\\;")
    .replace(',', "\\,")
    .replace('\n', "\\n")
}

/// Undo [`escape`].
///
/// Escape sequences are read left to right as two-character tokens, so the
/// literal text `\\n` becomes a backslash followed by `n`, never a newline.
/// Unknown sequences and a trailing lone backslash are kept verbatim.
pub fn unescape(s: &str) -> String {
  let mut result = String::with_capacity(s.len());
  let mut chars = s.chars();
  while let Some(c) = chars.next() {
    if c != '\\' {
      result.push(c);
      continue;
    }
    match chars.next() {
      Some('n') | Some('N') => result.push('\n'),
      Some('\\') => result.push('\\'),
      Some(',') => result.push(','),
      Some(';') => result.push(';'),
      Some(other) => {
        result.push('\\');
        result.push(other);
      }
      None => result.push('\\'),
    }
  }
  result
}

/// Split a raw, still-escaped value on every `sep` that is not part of an
/// escape sequence. Components are returned escaped; pass each through
/// [`unescape`].
pub fn split_unescaped(raw: &str, sep: char) -> Vec<&str> {
  let mut parts = Vec::new();
  let mut start = 0usize;
  let mut escaped = false;
  for (i, c) in raw.char_indices() {
    if escaped {
      escaped = false;
    } else if c == '\\' {
      escaped = true;
    } else if c == sep {
      parts.push(&raw[start..i]);
      start = i + c.len_utf8();
    }
  }
  parts.push(&raw[start..]);
  parts
}

// ─── Parameter values (RFC 6868) ──────────────────────────────────────────────

/// Caret-encode a parameter value: `^` becomes `^^`, newline `^n` and `"`
/// `^'`. The result never contains a line break or a double quote.
pub fn caret_encode(s: &str) -> String {
  let mut out = String::with_capacity(s.len());
  for c in s.chars() {
    match c {
      '^' => out.push_str("^^"),
      '\n' => out.push_str("^n"),
      '"' => out.push_str("^'"),
      _ => out.push(c),
    }
  }
  out
}

/// Undo [`caret_encode`]. A caret before any other character, or at the end,
/// is kept as-is.
pub fn caret_decode(s: &str) -> String {
  let mut out = String::with_capacity(s.len());
  let mut chars = s.chars().peekable();
  while let Some(c) = chars.next() {
    if c != '^' {
      out.push(c);
      continue;
    }
    match chars.peek() {
      Some('^') => out.push('^'),
      Some('n') | Some('N') => out.push('\n'),
      Some('\'') => out.push('"'),
      _ => {
        out.push('^');
        continue;
      }
    }
    chars.next();
  }
  out
}

// ─── Folding ──────────────────────────────────────────────────────────────────

/// Split one logical line into physical segments of at most `limit` octets.
///
/// Every segment after the first starts with a single space, which counts
/// toward the limit. Splits land on UTF-8 character boundaries, and each
/// segment carries at least one character even when `limit` is narrower than
/// that character. Always returns at least one segment.
pub fn fold(line: &str, limit: usize) -> Vec<String> {
  let mut segments: Vec<String> = Vec::new();
  let mut rest = line;
  let mut room = limit;

  while rest.len() > room {
    let mut end = room;
    while end > 0 && !rest.is_char_boundary(end) {
      end -= 1;
    }
    if end == 0 {
      end = rest.chars().next().map_or(rest.len(), char::len_utf8);
    }
    push_segment(&mut segments, &rest[..end]);
    rest = &rest[end..];
    room = limit.saturating_sub(1);
  }

  if !rest.is_empty() || segments.is_empty() {
    push_segment(&mut segments, rest);
  }
  segments
}

fn push_segment(segments: &mut Vec<String>, chunk: &str) {
  if segments.is_empty() {
    segments.push(chunk.to_string());
  } else {
    segments.push(format!(" {chunk}"));
  }
}

/// Join continuation lines (leading space or tab) onto the preceding logical
/// line. A continuation with nothing before it is dropped.
pub fn unfold<I, S>(lines: I) -> Vec<String>
where
  I: IntoIterator<Item = S>,
  S: AsRef<str>,
{
  let mut logical: Vec<String> = Vec::new();
  for raw in lines {
    let line = raw.as_ref();
    if let Some(rest) = line.strip_prefix([' ', '\t']) {
      match logical.last_mut() {
        Some(last) => last.push_str(rest),
        None => tracing::debug!(line, "ignoring continuation line with no preceding line"),
      }
    } else {
      logical.push(line.to_string());
    }
  }
  logical
}

/// Split raw text into physical lines. Accepts CRLF and bare LF; exactly one
/// trailing CR is removed from each line.
pub fn split_lines(input: &str) -> impl Iterator<Item = &str> {
  input.split('\n').map(|l| l.strip_suffix('\r').unwrap_or(l))
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;

  // ── Parameter values ────────────────────────────────────────────────────────

  #[test]
  fn caret_encoding_removes_line_breaks_and_quotes() {
    let encoded = caret_encode("say \"hi\"\nx^y");
    assert_eq!(encoded, "say ^'hi^'^nx^^y");
    assert_eq!(caret_decode(&encoded), "say \"hi\"\nx^y");
  }

  #[test]
  fn caret_decode_keeps_unknown_sequences() {
    assert_eq!(caret_decode("a^b^"), "a^b^");
    assert_eq!(caret_decode("^^n"), "^n");
  }

  // ── Escaping ────────────────────────────────────────────────────────────────

  #[test]
  fn escape_covers_all_specials() {
    assert_eq!(escape("a\\b;c,d\ne"), "a\\\\b\\;c\\,d\\ne");
  }

  #[test]
  fn escape_leaves_other_text_alone() {
    assert_eq!(escape("Zoë: \"quoted\" \t tab"), "Zoë: \"quoted\" \t tab");
  }

  #[test]
  fn unescape_inverts_escape() {
    let samples = [
      "",
      "plain",
      "a\\b;c,d\ne",
      "\\n",
      "\\\\n",
      "trailing\\",
      ";;;,,,\n\n",
      "\\;\\,",
      "日本語;テキスト",
    ];
    for s in samples {
      assert_eq!(unescape(&escape(s)), s, "round trip failed for {s:?}");
    }
  }

  #[test]
  fn literal_backslash_before_n_is_not_a_newline() {
    assert_eq!(unescape("\\\\n"), "\\n");
  }

  #[test]
  fn unescape_accepts_uppercase_newline() {
    assert_eq!(unescape("one\\Ntwo"), "one\ntwo");
  }

  #[test]
  fn unescape_keeps_unknown_sequences() {
    assert_eq!(unescape("C:\\temp"), "C:\\temp");
    assert_eq!(unescape("end\\"), "end\\");
  }

  // ── Splitting ───────────────────────────────────────────────────────────────

  #[test]
  fn split_ignores_escaped_separators() {
    assert_eq!(split_unescaped("a\\;b;c", ';'), vec!["a\\;b", "c"]);
  }

  #[test]
  fn split_after_escaped_backslash_is_a_separator() {
    // `\\` is a complete escape, so the following `;` separates.
    assert_eq!(split_unescaped("a\\\\;b", ';'), vec!["a\\\\", "b"]);
  }

  #[test]
  fn split_keeps_empty_components() {
    assert_eq!(split_unescaped(";;x;", ';'), vec!["", "", "x", ""]);
    assert_eq!(split_unescaped("", ','), vec![""]);
  }

  // ── Folding ─────────────────────────────────────────────────────────────────

  #[test]
  fn short_line_is_one_segment() {
    assert_eq!(fold("FN:Alice", DEFAULT_FOLD_LIMIT), vec!["FN:Alice"]);
  }

  #[test]
  fn empty_line_is_one_segment() {
    assert_eq!(fold("", DEFAULT_FOLD_LIMIT), vec![""]);
  }

  #[test]
  fn long_line_segments_respect_limit() {
    let line = format!("NOTE:{}", "x".repeat(300));
    let segments = fold(&line, 75);
    assert!(segments.len() > 1);
    assert_eq!(segments[0].len(), 75);
    for s in &segments[1..] {
      assert!(s.starts_with(' '));
      assert!(s.len() <= 75, "segment too long: {}", s.len());
    }
    assert_eq!(unfold(&segments), vec![line]);
  }

  #[test]
  fn fold_never_splits_a_character() {
    let line = format!("NOTE:{}", "日".repeat(60));
    for limit in [10, 20, 75] {
      let segments = fold(&line, limit);
      for s in &segments {
        assert!(s.len() <= limit, "{} > {limit}", s.len());
      }
      assert_eq!(unfold(&segments), vec![line.clone()]);
    }
  }

  #[test]
  fn fold_makes_progress_with_tiny_limit() {
    let segments = fold("日本", 1);
    assert_eq!(segments, vec!["日", " 本"]);
    assert_eq!(unfold(&segments), vec!["日本"]);
  }

  #[test]
  fn exact_limit_is_not_folded() {
    let line = "y".repeat(75);
    assert_eq!(fold(&line, 75), vec![line]);
  }

  // ── Unfolding ───────────────────────────────────────────────────────────────

  #[test]
  fn unfold_joins_space_and_tab_continuations() {
    let lines = ["NOTE:one", " two", "\tthree", "FN:x"];
    assert_eq!(unfold(lines), vec!["NOTE:onetwothree", "FN:x"]);
  }

  #[test]
  fn unfold_strips_only_one_leading_character() {
    assert_eq!(unfold(["FN:Alice", "  Smith"]), vec!["FN:Alice Smith"]);
  }

  #[test]
  fn orphaned_continuation_is_ignored() {
    assert_eq!(unfold([" orphan", "FN:Bob"]), vec!["FN:Bob"]);
  }

  #[test]
  fn split_lines_handles_crlf_and_lf() {
    let lines: Vec<&str> = split_lines("A:1\r\nB:2\nC:3\r\n").collect();
    assert_eq!(lines, vec!["A:1", "B:2", "C:3", ""]);
  }
}
