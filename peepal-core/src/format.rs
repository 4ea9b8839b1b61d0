//! Human-readable labels for route distances, durations and instructions.

/// `"<n> meters"` below one kilometer, `"<n.n> km"` from there on.
#[must_use]
pub fn format_distance(meters: f64) -> String {
    let meters = meters.max(0.0);
    let rounded = meters.round();
    if rounded < 1000.0 {
        format!("{rounded} meters")
    } else {
        format!("{:.1} km", meters / 1000.0)
    }
}

/// `"<h> hr <m> min"` from one hour on, `"<m> min"` below.
///
/// Partial minutes are dropped.
#[must_use]
#[expect(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "clamped to a non-negative whole number of seconds"
)]
pub fn format_duration(seconds: f64) -> String {
    let total = seconds.max(0.0).floor() as u64;
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    if hours > 0 {
        format!("{hours} hr {minutes} min")
    } else {
        format!("{minutes} min")
    }
}

/// Remove HTML tags from provider instructions and tidy whitespace.
#[must_use]
pub fn strip_html(text: &str) -> String {
    let mut plain = String::with_capacity(text.len());
    let mut in_tag = false;
    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            // a bare `<` as in "x < 5" is text, not markup
            '<' if !in_tag
                && chars
                    .peek()
                    .is_some_and(|next| *next == '/' || next.is_ascii_alphabetic()) =>
            {
                in_tag = true;
            }
            '>' if in_tag => in_tag = false,
            _ if !in_tag => plain.push(ch),
            _ => {}
        }
    }
    plain.split_whitespace().collect::<Vec<_>>().join(" ")
}
