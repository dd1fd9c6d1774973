use std::{
    ffi::OsString,
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context;
use clap::Parser;

use crate::utils::{DEFAULTS_FILE, DEFAULT_URL_FILE, USER_AGENT};

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "TikTok video and metadata scraper", long_about = None)]
#[command(args_override_self = true)]
pub struct Args {
    /// (Parent) directory to download videos to
    #[arg(short = 'd', long)]
    pub directory: Option<PathBuf>,
    /// Single URL to scrape video from
    #[arg(short = 'u', long)]
    pub url: Option<String>,
    /// File with a list of URLs to scrape, one per line
    #[arg(short = 'f', long, num_args = 0..=1, default_missing_value = DEFAULT_URL_FILE)]
    pub file: Option<PathBuf>,
    /// Save video metadata to __videometadata.csv
    #[arg(long = "video-metadata", visible_alias = "vm")]
    pub video_metadata: bool,
    /// Save user metadata to __usermetadata.csv
    #[arg(long = "user-metadata", visible_alias = "um")]
    pub user_metadata: bool,
    /// Save sound metadata to __soundmetadata.csv
    #[arg(long = "sound-metadata", visible_alias = "sm")]
    pub sound_metadata: bool,
    /// File with default arguments, one per line (defaults to <exe dir>/defaults)
    #[arg(long)]
    pub defaults: Option<PathBuf>,
    /// Minimum time in seconds to wait after a tab navigates to a page
    #[arg(long, default_value_t = 1)]
    pub min_wait: u64,
    /// Maximum time in seconds to wait after a tab navigates to a page
    #[arg(long, default_value_t = 1)]
    pub max_wait: u64,
    /// Maximum time the browser will wait for an event before timing out
    #[arg(long, default_value_t = 45)]
    pub browser_timeout: u64,
    /// Maximum time in seconds a single video download may take
    #[arg(long, default_value_t = 300)]
    pub download_timeout: u64,
    /// Show the browser window
    #[arg(long)]
    pub headful: bool,
    /// Do not rewrite video URLs to their share page
    #[arg(long)]
    pub no_share_redirect: bool,
    /// Print the metadata files of the output directory and exit
    #[arg(long)]
    pub dump_metadata: bool,
}

#[derive(Builder, Debug, Clone)]
#[builder(setter(into))]
pub struct ScraperOptions {
    #[builder(default)]
    pub directory: Option<PathBuf>,
    #[builder(default)]
    pub url: Option<String>,
    #[builder(default)]
    pub file: Option<PathBuf>,
    #[builder(default = "true")]
    pub video_metadata: bool,
    #[builder(default = "false")]
    pub user_metadata: bool,
    #[builder(default = "false")]
    pub sound_metadata: bool,
    // pause after navigation in seconds
    #[builder(default = "1")]
    pub min_wait_after_navigation: u64,
    #[builder(default = "1")]
    pub max_wait_after_navigation: u64,
    // browser timeout in seconds
    #[builder(default = "45")]
    pub browser_timeout: u64,
    #[builder(default = "300")]
    pub download_timeout: u64,
    #[builder(default = "true")]
    pub headless: bool,
    #[builder(default = "true")]
    pub share_redirect: bool,
    #[builder(default = "self.default_user_agent()")]
    pub user_agent: String,
    #[builder(default = "false")]
    pub dump_metadata: bool,
}

impl ScraperOptions {
    pub fn default_builder() -> ScraperOptionsBuilder {
        ScraperOptionsBuilder::default()
    }
}

impl ScraperOptionsBuilder {
    fn default_user_agent(&self) -> String {
        USER_AGENT.into()
    }
}

impl TryFrom<Args> for ScraperOptions {
    type Error = anyhow::Error;

    fn try_from(args: Args) -> anyhow::Result<Self> {
        // with no capture flag at all, keep the video metadata file going
        let any_capture = args.video_metadata || args.user_metadata || args.sound_metadata;

        let options = ScraperOptions::default_builder()
            .directory(args.directory)
            .url(args.url)
            .file(args.file)
            .video_metadata(args.video_metadata || !any_capture)
            .user_metadata(args.user_metadata)
            .sound_metadata(args.sound_metadata)
            .min_wait_after_navigation(args.min_wait)
            .max_wait_after_navigation(args.max_wait.max(args.min_wait))
            .browser_timeout(args.browser_timeout)
            .download_timeout(args.download_timeout)
            .headless(!args.headful)
            .share_redirect(!args.no_share_redirect)
            .dump_metadata(args.dump_metadata)
            .build()?;
        Ok(options)
    }
}

/// Splits a defaults file into argument tokens. One argument per line;
/// `-x value` lines are split at the first whitespace, `#` lines and blank
/// lines are ignored.
pub fn parse_defaults(content: &str) -> Vec<String> {
    let mut tokens = vec![];
    for line in content.lines().map(str::trim) {
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match line.split_once(char::is_whitespace) {
            Some((flag, value)) if flag.starts_with('-') && !flag.contains('=') => {
                tokens.push(flag.to_string());
                tokens.push(value.trim().to_string());
            }
            _ => tokens.push(line.to_string()),
        }
    }
    tokens
}

pub fn read_defaults(path: &Path) -> anyhow::Result<Vec<String>> {
    if !path.is_file() {
        debug!("no defaults file at {}", path.display());
        return Ok(vec![]);
    }
    let content =
        fs::read_to_string(path).context(format!("could not read defaults file {:?}", path))?;
    let tokens = parse_defaults(&content);
    debug!("loaded {} default arguments from {}", tokens.len(), path.display());
    Ok(tokens)
}

pub fn default_defaults_path() -> Option<PathBuf> {
    let exe = std::env::current_exe().ok()?;
    Some(exe.parent()?.join(DEFAULTS_FILE))
}

/// Layers the defaults file under the command line: defaults tokens go first
/// so any flag given on the command line overrides them.
pub fn load<I, T>(cli: I) -> anyhow::Result<ScraperOptions>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli: Vec<OsString> = cli.into_iter().map(Into::into).collect();
    let first_pass = Args::try_parse_from(&cli)?;

    let defaults = match first_pass.defaults.clone().or_else(default_defaults_path) {
        Some(path) => read_defaults(&path)?,
        None => vec![],
    };
    if defaults.is_empty() {
        return first_pass.try_into();
    }

    let mut layered: Vec<OsString> = cli.iter().take(1).cloned().collect();
    layered.extend(defaults.into_iter().map(OsString::from));
    layered.extend(cli.iter().skip(1).cloned());

    // Left unwrapped so the caller can hand a clap::Error back to clap.
    let args = Args::try_parse_from(&layered)?;
    args.try_into()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defaults_file_tokens() {
        let content = "# my defaults\n-d /tmp/tik tok\n\n--vm\n--file=urls.txt\n";
        assert_eq!(
            parse_defaults(content),
            vec!["-d", "/tmp/tik tok", "--vm", "--file=urls.txt"]
        );
    }

    #[test]
    fn file_flag_without_value_uses_list_txt() {
        let args = Args::try_parse_from(["tiktok-archiver", "-f"]).unwrap();
        assert_eq!(args.file, Some(PathBuf::from("list.txt")));
        let args = Args::try_parse_from(["tiktok-archiver", "-f", "mine.txt"]).unwrap();
        assert_eq!(args.file, Some(PathBuf::from("mine.txt")));
    }

    #[test]
    fn short_aliases_for_capture_flags() {
        let args = Args::try_parse_from(["tiktok-archiver", "--um", "--sm"]).unwrap();
        assert!(!args.video_metadata);
        assert!(args.user_metadata);
        assert!(args.sound_metadata);
    }

    #[test]
    fn video_metadata_is_on_without_capture_flags() {
        let o = load(["tiktok-archiver", "--defaults", "/nonexistent/defaults"]).unwrap();
        assert!(o.video_metadata);
        assert!(!o.user_metadata);

        let o = load(["tiktok-archiver", "--defaults", "/nonexistent/defaults", "--um"]).unwrap();
        assert!(!o.video_metadata);
        assert!(o.user_metadata);
    }

    #[test]
    fn command_line_overrides_defaults_file() {
        let dir = tempfile::tempdir().unwrap();
        let defaults = dir.path().join("defaults");
        fs::write(&defaults, "-d /from/defaults\n-u https://a\n--sm\n--min-wait 3\n").unwrap();
        let defaults = defaults.to_str().unwrap();

        let o = load(["tiktok-archiver", "--defaults", defaults, "-d", "/from/cli"]).unwrap();
        assert_eq!(o.directory, Some(PathBuf::from("/from/cli")));
        assert_eq!(o.url.as_deref(), Some("https://a"));
        assert!(o.sound_metadata);
        assert!(!o.video_metadata);
        assert_eq!(o.min_wait_after_navigation, 3);
        // max is raised to the min
        assert_eq!(o.max_wait_after_navigation, 3);
    }

    #[test]
    fn help_and_version_reach_clap_unwrapped() {
        use clap::error::ErrorKind;

        let err = Args::try_parse_from(["tiktok-archiver", "--help"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DisplayHelp);

        for (flag, kind) in [
            ("--help", ErrorKind::DisplayHelp),
            ("--version", ErrorKind::DisplayVersion),
            ("--no-such-flag", ErrorKind::UnknownArgument),
        ] {
            let err = load(["tiktok-archiver", "--defaults", "/nonexistent/defaults", flag])
                .unwrap_err();
            assert_eq!(err.chain().count(), 1);
            assert_eq!(err.downcast_ref::<clap::Error>().unwrap().kind(), kind);
        }
    }

    #[test]
    fn bad_defaults_file_is_a_clap_error() {
        let dir = tempfile::tempdir().unwrap();
        let defaults = dir.path().join("defaults");
        fs::write(&defaults, "--min-wait soon
").unwrap();
        let err = load(["tiktok-archiver", "--defaults", defaults.to_str().unwrap()]).unwrap_err();
        assert_eq!(
            err.downcast_ref::<clap::Error>().unwrap().kind(),
            clap::error::ErrorKind::ValueValidation
        );
    }

    #[test]
    fn builder_defaults() {
        let o = ScraperOptions::default_builder().build().unwrap();
        assert!(o.video_metadata && o.headless && o.share_redirect);
        assert_eq!(o.user_agent, USER_AGENT);
        assert_eq!(o.browser_timeout, 45);
    }
}
