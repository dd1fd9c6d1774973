use std::{
    io,
    sync::{atomic::AtomicBool, Arc},
};

use anyhow::Context;
use log::{debug, info};
use signal_hook::consts::{SIGINT, SIGTERM};
use tiktok_archiver::{
    browser_controller::BrowserController,
    config,
    directory::resolve_directory,
    input::resolve_targets,
    metadata,
    runner::Runner,
    utils::{SOUND_METADATA_FILE, USER_METADATA_FILE, VIDEO_METADATA_FILE},
};

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let options = match config::load(std::env::args_os()) {
        Ok(options) => options,
        Err(e) => match e.downcast::<clap::Error>() {
            // help, version and usage errors print and exit the way clap does
            Ok(clap_err) => clap_err.exit(),
            Err(e) => return Err(e),
        },
    };
    debug!("starting with {:#?}", options);

    let directory = resolve_directory(options.directory.as_deref(), dirs::home_dir())?;

    if options.dump_metadata {
        for file in [VIDEO_METADATA_FILE, USER_METADATA_FILE, SOUND_METADATA_FILE] {
            let path = directory.join(file);
            if path.is_file() {
                metadata::dump(&path)?;
            }
        }
        return Ok(());
    }

    let targets = resolve_targets(
        options.file.as_deref(),
        options.url.as_deref(),
        &mut io::stdin().lock(),
        &mut io::stdout(),
    )?;
    info!("{} URL(s) to scrape into {}", targets.len(), directory.display());

    let should_terminate = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register(SIGTERM, Arc::clone(&should_terminate))?;
    signal_hook::flag::register(SIGINT, Arc::clone(&should_terminate))?;

    let browser = BrowserController::new(
        options.browser_timeout,
        options.min_wait_after_navigation,
        options.max_wait_after_navigation,
        options.headless,
    )
    .context("could not start the browser")?;

    let runner = Runner::new(browser, options, directory, should_terminate)?;
    runner.run(&targets);

    // the browser is shut down when the runner drops
    Ok(())
}
