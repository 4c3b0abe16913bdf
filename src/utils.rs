use url::Url;

// Subtitle extensions we know how to name
const SUBTITLE_EXTENSIONS: &[&str] = &["vtt", "srt"];

/// Lowercased extension of the last path segment, ignoring query and fragment.
pub fn url_extension(url: &str) -> Option<String> {
    let path = match Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => url
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .to_string(),
    };

    let file_name = path.rsplit('/').next()?;
    let (stem, ext) = file_name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Extension to save a subtitle under, `vtt` unless the URL says `srt`.
pub fn subtitle_extension(url: &str) -> String {
    url_extension(url)
        .filter(|ext| SUBTITLE_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or_else(|| "vtt".to_string())
}

/// Undo the `\/` escaping JSON encoders apply to URLs.
pub fn unescape_json_slashes(s: &str) -> String {
    s.replace("\\/", "/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_extension() {
        assert_eq!(url_extension("https://cdn/x/en.VTT?token=1"), Some("vtt".to_string()));
        assert_eq!(url_extension("https://cdn/x/subs.srt#t"), Some("srt".to_string()));
        assert_eq!(url_extension("https://cdn/x/"), None);
        assert_eq!(url_extension("relative/file.vtt"), Some("vtt".to_string()));
    }

    #[test]
    fn test_subtitle_extension_defaults_to_vtt() {
        assert_eq!(subtitle_extension("https://cdn/a.srt"), "srt");
        assert_eq!(subtitle_extension("https://cdn/a.ass"), "vtt");
        assert_eq!(subtitle_extension("https://cdn/track"), "vtt");
    }

    #[test]
    fn test_unescape_json_slashes() {
        assert_eq!(
            unescape_json_slashes("https:\\/\\/cdn\\/x.m3u8"),
            "https://cdn/x.m3u8"
        );
    }
}
