use chrono::Local;
use rand::Rng;
use std::{path::PathBuf, time::Duration};

pub const VIDEO_METADATA_FILE: &str = "__videometadata.csv";
pub const USER_METADATA_FILE: &str = "__usermetadata.csv";
pub const SOUND_METADATA_FILE: &str = "__soundmetadata.csv";
pub const DEFAULT_URL_FILE: &str = "list.txt";
pub const DEFAULTS_FILE: &str = "defaults";
pub const SHARE_VIDEO_PREFIX: &str = "https://www.tiktok.com/share/video/";
pub const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

pub const VIDEO_HEADERS: [&str; 12] = [
    "videoID",
    "sourceURL",
    "pageURL",
    "userName",
    "userID",
    "userURL",
    "sound",
    "soundURL",
    "caption",
    "likes",
    "comments",
    "timeAcquired",
];

pub const USER_HEADERS: [&str; 8] = [
    "userID",
    "userName",
    "userURL",
    "following",
    "followers",
    "hearts",
    "description",
    "timeAcquired",
];

pub const SOUND_HEADERS: [&str; 6] = [
    "soundID",
    "soundURL",
    "title",
    "author",
    "videoCount",
    "timeAcquired",
];

/// Local time in ISO-8601, microsecond precision.
pub fn timestamp() -> String {
    Local::now()
        .naive_local()
        .format("%Y-%m-%dT%H:%M:%S%.6f")
        .to_string()
}

pub fn strip_sigil(handle: &str) -> &str {
    handle.strip_prefix('@').unwrap_or(handle)
}

pub fn default_output_dir(home: PathBuf) -> PathBuf {
    home.join("Videos").join("TikTok")
}

/// Pause after a navigation, drawn from `[min_secs, max_secs]`.
pub fn wait_after_navigation(min_secs: u64, max_secs: u64) -> Duration {
    if max_secs <= min_secs {
        return Duration::from_secs(min_secs);
    }
    let mut rng = rand::thread_rng();
    Duration::from_secs(rng.gen_range(min_secs..=max_secs))
}

/// Last non-empty path segment of `url`, query and fragment dropped.
pub fn last_path_segment(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or("")
        .to_string()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn strips_only_leading_sigil() {
        assert_eq!(strip_sigil("@jdoe"), "jdoe");
        assert_eq!(strip_sigil("jdoe"), "jdoe");
        assert_eq!(strip_sigil("j@doe"), "j@doe");
    }

    #[test]
    fn last_segment() {
        assert_eq!(
            last_path_segment("https://www.tiktok.com/share/video/6642696300275961093?lang=en"),
            "6642696300275961093"
        );
        assert_eq!(last_path_segment("https://www.tiktok.com/@a/video/42/"), "42");
    }

    #[test]
    fn fixed_wait_when_bounds_match() {
        assert_eq!(wait_after_navigation(1, 1), Duration::from_secs(1));
        let d = wait_after_navigation(2, 4);
        assert!(d >= Duration::from_secs(2) && d <= Duration::from_secs(4));
    }

    #[test]
    fn timestamp_is_iso() {
        let ts = timestamp();
        assert!(chrono::NaiveDateTime::parse_from_str(&ts, "%Y-%m-%dT%H:%M:%S%.f").is_ok());
    }

    #[test]
    fn default_dir_layout() {
        assert_eq!(
            default_output_dir(PathBuf::from("/home/a")),
            PathBuf::from("/home/a/Videos/TikTok")
        );
    }
}
