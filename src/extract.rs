use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::{
    types::{MetadataRecord, PageSnapshot, ScrapeError, VideoPage},
    utils::{last_path_segment, strip_sigil, timestamp, SHARE_VIDEO_PREFIX},
};

lazy_static! {
    static ref COUNTS_RE: Regex =
        Regex::new(r"(?i)(\d+(?:[.,]\d+)*[km]?)\D+?(\d+(?:[.,]\d+)*[km]?)").unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldSource {
    Text,
    Attr(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transform {
    None,
    StripSigil,
    ResolveUrl,
}

/// One scraped field: where it lives in the DOM and which record key it fills.
#[derive(Debug, Clone, Copy)]
pub struct FieldRule {
    pub key: &'static str,
    pub selector: &'static str,
    pub source: FieldSource,
    pub required: bool,
    pub transform: Transform,
}

const fn rule(
    key: &'static str,
    selector: &'static str,
    source: FieldSource,
    required: bool,
    transform: Transform,
) -> FieldRule {
    FieldRule {
        key,
        selector,
        source,
        required,
        transform,
    }
}

// Selector groups list the share page markup first, then the newer data-e2e markup.
pub const VIDEO_RULES: &[FieldRule] = &[
    rule(
        "videoURL",
        r#"video._video_card_, [data-e2e="browse-video"] video, video"#,
        FieldSource::Attr("src"),
        true,
        Transform::ResolveUrl,
    ),
    rule(
        "userName",
        r#"p._video_card_big_user_info_nickname, [data-e2e="browse-user-nickname"]"#,
        FieldSource::Text,
        true,
        Transform::None,
    ),
    rule(
        "userID",
        r#"p._video_card_big_user_info_handle, [data-e2e="browse-username"]"#,
        FieldSource::Text,
        true,
        Transform::StripSigil,
    ),
    rule(
        "userURL",
        r#"a._video_card_big_user_info_, a[data-e2e="browse-user-avatar"]"#,
        FieldSource::Attr("href"),
        true,
        Transform::ResolveUrl,
    ),
    rule(
        "sound",
        r#"div._video_card_big_meta_info_music a, [data-e2e="browse-music"] a"#,
        FieldSource::Text,
        true,
        Transform::None,
    ),
    rule(
        "soundURL",
        r#"div._video_card_big_meta_info_music a, [data-e2e="browse-music"] a"#,
        FieldSource::Attr("href"),
        true,
        Transform::ResolveUrl,
    ),
    rule(
        "caption",
        r#"h1._video_card_big_meta_info_title span, [data-e2e="browse-video-desc"]"#,
        FieldSource::Text,
        false,
        Transform::None,
    ),
    rule(
        "counts",
        r#"div._video_card_big_meta_info_count, [data-e2e="video-counts"]"#,
        FieldSource::Text,
        false,
        Transform::None,
    ),
];

pub const USER_RULES: &[FieldRule] = &[
    rule(
        "userID",
        r#"h1.share-title, [data-e2e="user-title"]"#,
        FieldSource::Text,
        true,
        Transform::StripSigil,
    ),
    rule(
        "userName",
        r#"h1.share-sub-title, [data-e2e="user-subtitle"]"#,
        FieldSource::Text,
        false,
        Transform::None,
    ),
    rule(
        "following",
        r#"strong[title="Following"], [data-e2e="following-count"]"#,
        FieldSource::Text,
        false,
        Transform::None,
    ),
    rule(
        "followers",
        r#"strong[title="Followers"], [data-e2e="followers-count"]"#,
        FieldSource::Text,
        false,
        Transform::None,
    ),
    rule(
        "hearts",
        r#"strong[title="Likes"], strong[title="Hearts"], [data-e2e="likes-count"]"#,
        FieldSource::Text,
        false,
        Transform::None,
    ),
    rule(
        "description",
        r#"h2.share-desc, [data-e2e="user-bio"]"#,
        FieldSource::Text,
        false,
        Transform::None,
    ),
];

pub const SOUND_RULES: &[FieldRule] = &[
    rule(
        "title",
        r#"h1.share-title, [data-e2e="music-title"]"#,
        FieldSource::Text,
        true,
        Transform::None,
    ),
    rule(
        "author",
        r#"h2.share-sub-title a, [data-e2e="music-creator"]"#,
        FieldSource::Text,
        false,
        Transform::None,
    ),
    rule(
        "videoCount",
        r#"h2.description strong, [data-e2e="music-video-count"]"#,
        FieldSource::Text,
        false,
        Transform::None,
    ),
];

const NOT_FOUND_SELECTORS: &[&str] = &[
    "div._error_page_",
    "div.error-page",
    r#"[data-e2e="user-page-not-found"]"#,
    r#"[data-e2e="music-not-found"]"#,
];

const NOT_FOUND_PHRASES: &[&str] = &[
    "Couldn't find this account",
    "Couldn't find this sound",
    "Video currently unavailable",
    "This video isn't available",
    "Page not available",
];

fn normalize_text(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn parse_selector(selector: &str) -> Option<Selector> {
    match Selector::parse(selector) {
        Ok(s) => Some(s),
        Err(e) => {
            error!("invalid selector {}: {:?}", selector, e);
            None
        }
    }
}

fn read_source(el: ElementRef, source: FieldSource) -> Option<String> {
    let value = match source {
        FieldSource::Text => normalize_text(&el.text().collect::<Vec<_>>().join(" ")),
        FieldSource::Attr(name) => el.value().attr(name)?.trim().to_string(),
    };
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

fn apply_transform(value: String, transform: Transform, base: Option<&Url>) -> String {
    match transform {
        Transform::None => value,
        Transform::StripSigil => strip_sigil(&value).to_string(),
        Transform::ResolveUrl => match base.and_then(|b| b.join(&value).ok()) {
            Some(u) => u.to_string(),
            None => value,
        },
    }
}

/// First non-empty value a rule yields on the document.
pub fn find_field(doc: &Html, rule: &FieldRule, base: Option<&Url>) -> Option<String> {
    let selector = parse_selector(rule.selector)?;
    doc.select(&selector)
        .find_map(|el| read_source(el, rule.source))
        .map(|v| apply_transform(v, rule.transform, base))
}

/// Evaluates every rule into `record`. A missing required field is an error
/// naming the rule key, a missing optional one is stored as "".
pub fn apply_rules(
    doc: &Html,
    rules: &[FieldRule],
    base: Option<&Url>,
    record: &mut MetadataRecord,
) -> Result<(), ScrapeError> {
    for rule in rules {
        match find_field(doc, rule, base) {
            Some(v) => record.insert(rule.key, v),
            None if rule.required => {
                return Err(ScrapeError::MissingElement(rule.key.to_string()))
            }
            None => {
                debug!("optional field {} not found, leaving it empty", rule.key);
                record.insert(rule.key, "");
            }
        }
    }
    Ok(())
}

pub fn is_not_found(doc: &Html) -> bool {
    let marked = NOT_FOUND_SELECTORS
        .iter()
        .filter_map(|s| parse_selector(s))
        .any(|s| doc.select(&s).next().is_some());
    if marked {
        return true;
    }
    let text = visible_text(doc);
    NOT_FOUND_PHRASES.iter().any(|p| text.contains(p))
}

/// Rendered text of the page; script, style and noscript bodies are left out.
fn visible_text(doc: &Html) -> String {
    let parts = doc
        .root_element()
        .descendants()
        .filter_map(|node| {
            let text = node.value().as_text()?;
            let hidden = node.ancestors().any(|a| {
                a.value()
                    .as_element()
                    .map_or(false, |e| matches!(e.name(), "script" | "style" | "noscript"))
            });
            if hidden {
                None
            } else {
                Some(&**text)
            }
        })
        .collect::<Vec<_>>();
    normalize_text(&parts.join(" "))
}

/// Pulls the like and comment counts out of a freeform blob such as
/// "1.2k Likes 34 Comments". Yields empty strings when nothing matches.
pub fn parse_counts(text: &str) -> (String, String) {
    match COUNTS_RE.captures(text) {
        Some(caps) => (caps[1].to_string(), caps[2].to_string()),
        None => (String::new(), String::new()),
    }
}

/// Share URL for a video page, or `None` if it already is one.
pub fn share_url(page_url: &str) -> Option<String> {
    let stripped = strip_query(page_url);
    if stripped.contains("/share/video/") {
        return None;
    }
    let id = last_path_segment(stripped);
    let id = id.split('.').next().unwrap_or("");
    if id.is_empty() || !id.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some(format!("{}{}", SHARE_VIDEO_PREFIX, id))
}

fn strip_query(url: &str) -> &str {
    url.split('?').next().unwrap_or(url)
}

fn check_found(doc: &Html, snapshot: &PageSnapshot) -> Result<(), ScrapeError> {
    if is_not_found(doc) {
        return Err(ScrapeError::PageNotFound(snapshot.current_url.clone()));
    }
    Ok(())
}

pub fn extract_video(snapshot: &PageSnapshot) -> Result<VideoPage, ScrapeError> {
    let doc = Html::parse_document(&snapshot.html);
    check_found(&doc, snapshot)?;

    let page_url = strip_query(&snapshot.current_url).to_string();
    let base = Url::parse(&page_url).ok();
    let video_id = last_path_segment(&page_url);

    let mut record = MetadataRecord::new();
    apply_rules(&doc, VIDEO_RULES, base.as_ref(), &mut record).map_err(|e| match e {
        ScrapeError::MissingElement(key) if key == "videoURL" => {
            ScrapeError::VideoMissing(snapshot.requested_url.clone())
        }
        e => e,
    })?;

    let (likes, comments) = parse_counts(record.value("counts"));
    record.insert("likes", likes);
    record.insert("comments", comments);
    record.insert("videoID", video_id.clone());
    record.insert("sourceURL", snapshot.requested_url.clone());
    record.insert("pageURL", page_url);
    record.insert("timeAcquired", timestamp());

    Ok(VideoPage {
        video_id,
        video_url: record.value("videoURL").to_string(),
        user_id: record.value("userID").to_string(),
        user_url: record.value("userURL").to_string(),
        sound_url: record.value("soundURL").to_string(),
        record,
    })
}

pub fn extract_user(snapshot: &PageSnapshot) -> Result<MetadataRecord, ScrapeError> {
    let doc = Html::parse_document(&snapshot.html);
    check_found(&doc, snapshot)?;

    let mut record = MetadataRecord::new();
    let base = Url::parse(&snapshot.current_url).ok();
    apply_rules(&doc, USER_RULES, base.as_ref(), &mut record)?;
    record.insert("userURL", strip_query(&snapshot.current_url));
    record.insert("timeAcquired", timestamp());
    Ok(record)
}

pub fn extract_sound(snapshot: &PageSnapshot) -> Result<MetadataRecord, ScrapeError> {
    let doc = Html::parse_document(&snapshot.html);
    check_found(&doc, snapshot)?;

    let mut record = MetadataRecord::new();
    let base = Url::parse(&snapshot.current_url).ok();
    apply_rules(&doc, SOUND_RULES, base.as_ref(), &mut record)?;
    let sound_url = strip_query(&snapshot.current_url);
    // sound pages end in "<title>-<id>"
    let id = last_path_segment(sound_url);
    let id = id.rsplit('-').next().unwrap_or("").to_string();
    record.insert("soundID", id);
    record.insert("soundURL", sound_url);
    record.insert("timeAcquired", timestamp());
    Ok(record)
}
