//! Validation and normalization of form input.

use crate::error::ValidationError;

/// Scheme prefix a video URL must start with.
pub const URL_SCHEME_PREFIX: &str = "http";

/// Trim a video URL and check it can be sent to the server.
///
/// Returns the trimmed URL. Empty input or input without an `http` prefix is
/// rejected with [`ValidationError::InvalidUrl`].
pub fn validate_video_url(raw: &str) -> Result<&str, ValidationError> {
    let url = raw.trim();
    if url.is_empty() || !url.starts_with(URL_SCHEME_PREFIX) {
        return Err(ValidationError::InvalidUrl);
    }
    Ok(url)
}

/// Build a lowercase URL slug from a title.
///
/// The title is transliterated to ASCII, apostrophes are dropped, `&` reads
/// as `and` and every other run of non-alphanumeric characters becomes a
/// single `-`.
pub fn slugify(title: &str) -> String {
    let spelled: String = title
        .chars()
        .filter(|ch| !matches!(*ch, '\'' | '\u{2019}'))
        .map(|ch| if ch == '&' { " and ".to_string() } else { ch.to_string() })
        .collect();
    let ascii = deunicode::deunicode(&spelled);

    let mut slug = String::with_capacity(ascii.len());
    let mut last_dash = true;

    for ch in ascii.chars() {
        if ch == '\'' {
            continue;
        }
        let lower = ch.to_ascii_lowercase();
        if lower.is_ascii_alphanumeric() {
            slug.push(lower);
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }

    if slug.ends_with('-') {
        slug.pop();
    }
    slug
}
