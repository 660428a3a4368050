//! Domain normalization and human-readable site names for popup groups.

/// Known media sites, most specific first.
const KNOWN_SITES: &[(&str, &str)] = &[
    ("music.youtube.com", "YouTube Music"),
    ("youtube.com", "YouTube"),
    ("youtu.be", "YouTube"),
    ("open.spotify.com", "Spotify"),
    ("spotify.com", "Spotify"),
    ("soundcloud.com", "SoundCloud"),
    ("music.apple.com", "Apple Music"),
    ("music.amazon.com", "Amazon Music"),
    ("tidal.com", "TIDAL"),
    ("deezer.com", "Deezer"),
    ("bandcamp.com", "Bandcamp"),
    ("twitch.tv", "Twitch"),
    ("netflix.com", "Netflix"),
    ("vimeo.com", "Vimeo"),
    ("primevideo.com", "Prime Video"),
    ("disneyplus.com", "Disney+"),
];

/// Strips the scheme, a leading `www.`, any credentials, port and path.
///
/// `https://www.YouTube.com/watch?v=1` becomes `youtube.com`. Returns `None`
/// when nothing host-like is left.
pub fn normalize_domain(url: &str) -> Option<String> {
    let rest = match url.split_once("://") {
        Some((_, rest)) => rest,
        None => url,
    };
    let host = rest
        .split(|c| c == '/' || c == '?' || c == '#')
        .next()
        .unwrap_or("");
    let host = host.rsplit('@').next().unwrap_or(host);
    let host = host.split(':').next().unwrap_or(host);
    let host = host.to_ascii_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host);
    if host.is_empty() {
        None
    } else {
        Some(host.to_string())
    }
}

/// Display name for a normalized domain; unknown domains are shown as-is.
pub fn site_label(domain: &str) -> String {
    if domain.is_empty() {
        return "Other".to_string();
    }
    KNOWN_SITES
        .iter()
        .find(|(site, _)| {
            domain == *site
                || domain
                    .strip_suffix(site)
                    .is_some_and(|prefix| prefix.ends_with('.'))
        })
        .map(|(_, label)| label.to_string())
        .unwrap_or_else(|| domain.to_string())
}

/// Group summary, e.g. "1 of 2 playing".
pub fn playing_summary(playing: usize, total: usize) -> String {
    if playing == 0 {
        format!("{} paused", total)
    } else {
        format!("{} of {} playing", playing, total)
    }
}
