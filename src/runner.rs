use std::{
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use crate::{
    browser_controller::PageFetcher,
    config::ScraperOptions,
    download::Downloader,
    extract::{extract_sound, extract_user, extract_video, share_url},
    metadata::MetadataWriter,
    types::{DownloadOutcome, PageSnapshot, RunSummary, ScrapeError, VideoPage},
    utils::{
        SOUND_HEADERS, SOUND_METADATA_FILE, USER_HEADERS, USER_METADATA_FILE, VIDEO_HEADERS,
        VIDEO_METADATA_FILE,
    },
};

pub struct Runner<F: PageFetcher> {
    fetcher: F,
    downloader: Downloader,
    options: ScraperOptions,
    directory: PathBuf,
    video_writer: Option<MetadataWriter>,
    user_writer: Option<MetadataWriter>,
    sound_writer: Option<MetadataWriter>,
    should_terminate: Arc<AtomicBool>,
}

fn writer_for(enabled: bool, dir: &Path, file: &str, headers: &[&str]) -> Option<MetadataWriter> {
    if enabled {
        Some(MetadataWriter::new(dir.join(file), headers))
    } else {
        None
    }
}

impl<F: PageFetcher> Runner<F> {
    pub fn new(
        fetcher: F,
        options: ScraperOptions,
        directory: PathBuf,
        should_terminate: Arc<AtomicBool>,
    ) -> anyhow::Result<Self> {
        let downloader = Downloader::new(
            &options.user_agent,
            Duration::from_secs(options.download_timeout),
        )?;

        Ok(Runner {
            video_writer: writer_for(
                options.video_metadata,
                &directory,
                VIDEO_METADATA_FILE,
                &VIDEO_HEADERS,
            ),
            user_writer: writer_for(
                options.user_metadata,
                &directory,
                USER_METADATA_FILE,
                &USER_HEADERS,
            ),
            sound_writer: writer_for(
                options.sound_metadata,
                &directory,
                SOUND_METADATA_FILE,
                &SOUND_HEADERS,
            ),
            fetcher,
            downloader,
            options,
            directory,
            should_terminate,
        })
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Scrapes every target in order. Failures only ever skip the URL they
    /// belong to.
    pub fn run(&self, targets: &[String]) -> RunSummary {
        let mut summary = RunSummary::default();

        for url in targets {
            if self.should_terminate.load(Ordering::Relaxed) {
                warn!("termination requested, stopping before {}", url);
                break;
            }

            info!("scraping video from {}", url);
            match self.scrape(url) {
                Ok(DownloadOutcome::Downloaded(_)) => summary.downloaded += 1,
                Ok(DownloadOutcome::Skipped(_)) => summary.skipped += 1,
                Ok(DownloadOutcome::Failed(_)) => summary.failed += 1,
                Err(e @ ScrapeError::PageNotFound(_)) | Err(e @ ScrapeError::VideoMissing(_)) => {
                    warn!("video not found, check your URL or the video was removed ({})", e);
                    summary.not_found += 1;
                }
                Err(e) => {
                    warn!("skipping {}: {}", url, e);
                    summary.failed += 1;
                }
            }
        }

        info!(
            "{} downloaded, {} skipped, {} failed, {} not found",
            summary.downloaded, summary.skipped, summary.failed, summary.not_found
        );
        summary
    }

    /// Fetches, extracts and downloads a single video. Metadata is only
    /// written when the video file was actually downloaded.
    pub fn scrape(&self, url: &str) -> Result<DownloadOutcome, ScrapeError> {
        let snapshot = self.fetch_video_page(url)?;
        let page = extract_video(&snapshot)?;

        let outcome = self.downloader.download(
            &page.video_url,
            &page.user_id,
            &page.video_id,
            &self.directory,
            &snapshot,
        );
        if !outcome.is_downloaded() {
            return Ok(outcome);
        }

        if let Some(w) = &self.video_writer {
            if let Err(e) = w.write(&page.record) {
                error!("could not write video metadata: {:#}", e);
            }
        }
        if let Some(w) = &self.user_writer {
            self.capture_user(&page, w);
        }
        if let Some(w) = &self.sound_writer {
            self.capture_sound(&page, w);
        }

        Ok(outcome)
    }

    fn fetch_video_page(&self, url: &str) -> Result<PageSnapshot, ScrapeError> {
        let snapshot = self.fetcher.fetch(url)?;
        if !self.options.share_redirect {
            return Ok(snapshot);
        }

        match share_url(&snapshot.current_url) {
            Some(share) => {
                debug!("rewriting {} to share page {}", snapshot.current_url, share);
                let mut shared = self.fetcher.fetch(&share)?;
                shared.requested_url = url.to_string();
                Ok(shared)
            }
            None => Ok(snapshot),
        }
    }

    fn capture_user(&self, page: &VideoPage, writer: &MetadataWriter) {
        if page.user_url.is_empty() {
            warn!("no user URL for video {}, skipping user metadata", page.video_id);
            return;
        }
        let record = self
            .fetcher
            .fetch(&page.user_url)
            .and_then(|snapshot| extract_user(&snapshot));
        match record {
            Ok(record) => {
                if let Err(e) = writer.write(&record) {
                    error!("could not write user metadata: {:#}", e);
                }
            }
            Err(e) => warn!("skipping user metadata for {}: {}", page.user_url, e),
        }
    }

    fn capture_sound(&self, page: &VideoPage, writer: &MetadataWriter) {
        if page.sound_url.is_empty() {
            warn!("no sound URL for video {}, skipping sound metadata", page.video_id);
            return;
        }
        let record = self
            .fetcher
            .fetch(&page.sound_url)
            .and_then(|snapshot| extract_sound(&snapshot));
        match record {
            Ok(record) => {
                if let Err(e) = writer.write(&record) {
                    error!("could not write sound metadata: {:#}", e);
                }
            }
            Err(e) => warn!("skipping sound metadata for {}: {}", page.sound_url, e),
        }
    }
}
