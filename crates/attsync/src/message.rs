//! Positional message templates.
//!
//! Templates use `{0}`, `{1}`, ... placeholders. A single quote starts or ends
//! a literal section and `''` produces a quote, so `'{0}'` renders verbatim.

/// Substitute positional arguments into `template`.
///
/// Placeholders without a matching argument are kept as written.
#[must_use]
pub fn format_message(template: &str, args: &[&str]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();
    let mut quoted = false;

    while let Some(c) = chars.next() {
        match c {
            '\'' if chars.peek() == Some(&'\'') => {
                chars.next();
                out.push('\'');
            }
            '\'' => quoted = !quoted,
            '{' if !quoted => {
                let mut index = String::new();
                let mut closed = false;
                for next in chars.by_ref() {
                    if next == '}' {
                        closed = true;
                        break;
                    }
                    index.push(next);
                }
                match index.trim().parse::<usize>().ok().and_then(|i| args.get(i)) {
                    Some(arg) if closed => out.push_str(arg),
                    _ => {
                        out.push('{');
                        out.push_str(&index);
                        if closed {
                            out.push('}');
                        }
                    }
                }
            }
            _ => out.push(c),
        }
    }
    out
}
