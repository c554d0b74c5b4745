//! **Simple** HTML helpers shared by the parser and the engine: message preparation,
//! template substitution and whitespace tidying.
//!
//! The parser never sees raw user text. [prepare_message] escapes it first, so everything
//! the parser copies through is inert, and only tag templates can introduce markup.
use std::borrow::Cow;

/// Escape a raw message for parsing.
/// # Remarks
/// `&`, `<`, `>` and `"` become entities (a double quote turns into `&quot;`, which is why quoted
/// tag values are delimited by `&quot;`), carriage returns are dropped and line feeds become `<br>`.
pub fn prepare_message(raw: &str) -> String {
    let escaped = html_escape::encode_double_quoted_attribute(raw);
    let mut out = String::with_capacity(escaped.len() + escaped.len() / 8);

    for c in escaped.chars() {
        match c {
            '\r' => {}
            '\n' => out.push_str("<br>"),
            _ => out.push(c),
        }
    }

    out
}

/// Replace `$1`..`$9` in `template` with the matching entry of `args`.
/// # Remarks
/// Substitution is a single pass: a `$2` inside the value substituted for `$1` stays literal.
/// Placeholders without a matching argument are left untouched.
pub fn substitute_positional<S: AsRef<str>>(template: &str, args: &[S]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(idx) = rest.find('$') {
        out.push_str(&rest[..idx]);
        let after = &rest[idx + 1..];
        let arg = after
            .bytes()
            .next()
            .filter(|b| (b'1'..=b'9').contains(b))
            .and_then(|b| args.get(usize::from(b - b'1')));

        match arg {
            Some(arg) => {
                out.push_str(arg.as_ref());
                rest = &after[1..];
            }
            None => {
                out.push('$');
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}

/// Replace `{name}` placeholders using `lookup`; unknown names are left untouched.
pub fn substitute_named<'v>(template: &str, lookup: impl Fn(&str) -> Option<&'v str>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];

        let value = after
            .find('}')
            .and_then(|close| lookup(&after[..close]).map(|v| (v, close)));

        match value {
            Some((value, close)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}

/// Neutralize `$` and `{` in a parameter value so it cannot act as a placeholder later on.
pub fn neutralize_placeholders(value: &str) -> Cow<'_, str> {
    if !value.contains(['$', '{']) {
        return Cow::Borrowed(value);
    }

    Cow::Owned(value.replace('$', "&#036;").replace('{', "&#123;"))
}

/// Turn square brackets into entities so the text can never be read as a tag again.
pub fn escape_brackets(value: &str) -> Cow<'_, str> {
    if !value.contains(['[', ']']) {
        return Cow::Borrowed(value);
    }

    Cow::Owned(value.replace('[', "&#91;").replace(']', "&#93;"))
}

/// Keep runs of spaces visible once rendered.
/// # Remarks
/// A leading space (only when `at_start`) becomes `&nbsp;`, two spaces become ` &nbsp;`
/// and a space after a line break becomes `&nbsp;`.
pub fn tidy_spaces(text: &str, at_start: bool) -> Cow<'_, str> {
    if !(text.contains("  ") || text.contains("<br> ") || (at_start && text.starts_with(' '))) {
        return Cow::Borrowed(text);
    }

    let mut out = String::with_capacity(text.len() + 16);
    let mut rest = text;

    if at_start {
        if let Some(stripped) = rest.strip_prefix(' ') {
            out.push_str("&nbsp;");
            rest = stripped;
        }
    }

    while let Some(c) = rest.chars().next() {
        if let Some(stripped) = rest.strip_prefix("<br> ") {
            out.push_str("<br>&nbsp;");
            rest = stripped;
        } else if let Some(stripped) = rest.strip_prefix("  ") {
            out.push_str(" &nbsp;");
            rest = stripped;
        } else {
            out.push(c);
            rest = &rest[c.len_utf8()..];
        }
    }

    Cow::Owned(out)
}
