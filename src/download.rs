use std::{
    fs::{self, File},
    io,
    path::Path,
    sync::Arc,
    time::Duration,
};

use anyhow::Context;
use reqwest::{blocking::Client, cookie::Jar, StatusCode, Url};

use crate::{
    types::{CookieProvider, DownloadOutcome, SessionCookie},
    utils::strip_sigil,
};

/// `<userID> - <videoID>.mp4`, with the handle's leading `@` removed.
pub fn video_filename(user_id: &str, video_id: &str) -> String {
    format!("{} - {}.mp4", strip_sigil(user_id), video_id)
}

/// Renders a session cookie as a `Set-Cookie` style string. Cookies whose
/// domain has no leading dot were host-only in the browser and stay so here.
pub fn cookie_header(cookie: &SessionCookie) -> String {
    let mut s = format!("{}={}", cookie.name, cookie.value);
    if cookie.domain.starts_with('.') {
        s.push_str(&format!("; Domain={}", cookie.domain));
    }
    if !cookie.path.is_empty() {
        s.push_str(&format!("; Path={}", cookie.path));
    }
    if cookie.secure {
        s.push_str("; Secure");
    }
    if cookie.http_only {
        s.push_str("; HttpOnly");
    }
    s
}

/// URL the cookie is registered against in the jar.
pub fn cookie_url(cookie: &SessionCookie) -> Option<Url> {
    let host = cookie.domain.trim_start_matches('.');
    if host.is_empty() {
        return None;
    }
    let path = if cookie.path.starts_with('/') {
        cookie.path.as_str()
    } else {
        "/"
    };
    Url::parse(&format!("https://{}{}", host, path)).ok()
}

pub struct Downloader {
    client: Client,
    jar: Arc<Jar>,
}

impl Downloader {
    pub fn new(user_agent: &str, timeout: Duration) -> anyhow::Result<Self> {
        let jar = Arc::new(Jar::default());
        let client = Client::builder()
            .cookie_provider(jar.clone())
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .context("could not build http client")?;

        Ok(Downloader { client, jar })
    }

    /// Copies every cookie of the provider into the client's jar and returns
    /// how many were accepted.
    pub fn transplant(&self, provider: &dyn CookieProvider) -> usize {
        let mut added = 0;
        for cookie in provider.cookies() {
            match cookie_url(&cookie) {
                Some(url) => {
                    self.jar.add_cookie_str(&cookie_header(&cookie), &url);
                    added += 1;
                }
                None => debug!("skipping cookie {} without a domain", cookie.name),
            }
        }
        debug!("transplanted {} cookies", added);
        added
    }

    pub fn download(
        &self,
        media_url: &str,
        user_id: &str,
        video_id: &str,
        dir: &Path,
        cookies: &dyn CookieProvider,
    ) -> DownloadOutcome {
        let fname = video_filename(user_id, video_id);
        let file_path = dir.join(&fname);

        // the video ID is in the name, so an existing file is the same video
        if file_path.exists() {
            info!("file {} already exists, skipping download", fname);
            return DownloadOutcome::Skipped(file_path);
        }

        self.transplant(cookies);

        let mut res = match self.client.get(media_url).send() {
            Ok(res) => res,
            Err(e) => {
                error!("connection error on video {}: {}", media_url, e);
                return DownloadOutcome::Failed(e.to_string());
            }
        };

        if res.status() != StatusCode::OK {
            error!(
                "could not get video, status code {} on video {}",
                res.status(),
                media_url
            );
            return DownloadOutcome::Failed(format!("status {}", res.status()));
        }

        match Self::stream_to_file(&mut res, &file_path) {
            Ok(bytes) => {
                info!("downloaded {} ({} bytes)", fname, bytes);
                DownloadOutcome::Downloaded(file_path)
            }
            Err(e) => {
                error!("error while writing {}: {:#}", fname, e);
                if let Err(e) = fs::remove_file(&file_path) {
                    warn!("could not remove partial file {}: {}", fname, e);
                }
                DownloadOutcome::Failed(e.to_string())
            }
        }
    }

    fn stream_to_file(res: &mut reqwest::blocking::Response, path: &Path) -> anyhow::Result<u64> {
        let mut file = File::create(path).context(format!("could not create {:?}", path))?;
        let bytes = io::copy(res, &mut file).context("download interrupted")?;
        file.sync_all()?;
        Ok(bytes)
    }
}
