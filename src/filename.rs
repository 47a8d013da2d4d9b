//! File names derived from video titles.

/// The characters that can't appear in a file name on common file systems.
const INVALID_CHARS: [char; 9] = ['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// The maximum length of a sanitized name, in characters.
pub const MAX_NAME_LEN: usize = 100;

/// Makes a title safe to use as a file name: every invalid character becomes `_`, and the
/// result is cut to [`MAX_NAME_LEN`] characters.
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| if INVALID_CHARS.contains(&c) { '_' } else { c })
        .take(MAX_NAME_LEN)
        .collect()
}

/// The `Content-Disposition` value offering `base_name` with an '.mp4' extension.
///
/// Control characters can't be sent in a header; they are replaced with `_`.
pub fn attachment_disposition(base_name: &str) -> String {
    let visible: String = base_name
        .chars()
        .map(|c| if c.is_control() { '_' } else { c })
        .collect();

    format!("attachment; filename=\"{visible}.mp4\"")
}
