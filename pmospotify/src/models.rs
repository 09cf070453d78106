//! Identifiants de titres Spotify
//!
//! Les mutations de playlist attendent des URIs `spotify:track:<id>`, alors
//! que les appelants manipulent souvent des ids nus ou des liens
//! `open.spotify.com`. Tout ce qui part vers l'API passe par [`track_uri`].

/// Préfixe des URIs de titres
pub const TRACK_URI_PREFIX: &str = "spotify:track:";

const OPEN_TRACK_URL: &str = "https://open.spotify.com/track/";

/// Normalise un identifiant de titre en URI Spotify
///
/// ```
/// use pmospotify::models::track_uri;
///
/// assert_eq!(track_uri("15kQGEy89K8deJcZVFEn0N"), "spotify:track:15kQGEy89K8deJcZVFEn0N");
/// assert_eq!(track_uri("spotify:track:abc"), "spotify:track:abc");
/// assert_eq!(
///     track_uri("https://open.spotify.com/track/abc?si=xyz"),
///     "spotify:track:abc"
/// );
/// ```
pub fn track_uri(id: &str) -> String {
    let id = id.trim();

    if id.starts_with("spotify:") {
        return id.to_string();
    }

    if let Some(rest) = id.strip_prefix(OPEN_TRACK_URL) {
        let bare = rest.split(['?', '#', '/']).next().unwrap_or(rest);
        return format!("{}{}", TRACK_URI_PREFIX, bare);
    }

    format!("{}{}", TRACK_URI_PREFIX, id)
}

/// Normalise une liste d'identifiants en conservant l'ordre
pub fn track_uris(ids: &[String]) -> Vec<String> {
    ids.iter().map(|id| track_uri(id)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_track_uri_variants() {
        assert_eq!(track_uri(" abc "), "spotify:track:abc");
        assert_eq!(track_uri("spotify:episode:e1"), "spotify:episode:e1");
        assert_eq!(
            track_uri("https://open.spotify.com/track/abc/"),
            "spotify:track:abc"
        );
    }

    #[test]
    fn test_track_uris_keeps_order() {
        let ids = vec!["b".to_string(), "a".to_string()];
        assert_eq!(track_uris(&ids), vec!["spotify:track:b", "spotify:track:a"]);
    }
}
