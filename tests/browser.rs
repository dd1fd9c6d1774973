use tiktok_archiver::browser_controller::{BrowserController, PageFetcher};

/*
RUST_LOG=debug cargo test --test browser -- --ignored
 */
#[test]
#[ignore = "browser"]
fn fetches_rendered_page_and_cookies() -> anyhow::Result<()> {
    let _ = env_logger::try_init();
    let browser = BrowserController::new(45, 2, 2, true)?;
    let snapshot = browser.fetch("https://www.tiktok.com/")?;
    println!(
        "{} -> {} ({} bytes, {} cookies)",
        snapshot.requested_url,
        snapshot.current_url,
        snapshot.html.len(),
        snapshot.cookies.len()
    );
    assert!(snapshot.html.contains("<html"));
    Ok(())
}

#[test]
#[ignore = "browser"]
fn scrapes_a_video_page() -> anyhow::Result<()> {
    let _ = env_logger::try_init();
    let browser = BrowserController::new(45, 3, 3, true)?;
    let snapshot = browser.fetch("https://www.tiktok.com/@tiktok/video/7106594312292453675")?;
    match tiktok_archiver::extract::extract_video(&snapshot) {
        Ok(page) => println!("{:#?}", page),
        Err(e) => println!("could not extract: {}", e),
    }
    Ok(())
}
