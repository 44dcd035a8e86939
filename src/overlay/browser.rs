use crate::error::{AutocapError, AutocapResult};
use crate::overlay::{CaptionStyle, TextRasterizer};
use crate::template::CaptionTemplate;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams;
use chromiumoxide::cdp::browser_protocol::page::{CaptureScreenshotFormat, Viewport};
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::Page;
use futures::StreamExt;
use image::RgbaImage;
use std::path::Path;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::debug;

/// Viewport the caption is laid out in. Large enough for a 4K-wide line.
const CANVAS_WIDTH: u32 = 4096;
const CANVAS_HEIGHT: u32 = 1024;

/// Rasterizes caption text by laying it out as HTML in headless Chromium and
/// screenshotting the caption element with a transparent background.
///
/// `render` blocks on the browser from synchronous code, so it must be called
/// from a multi-threaded tokio runtime.
pub struct BrowserRasterizer {
    browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
    template: CaptionTemplate<'static>,
    runtime: Handle,
}

impl BrowserRasterizer {
    /// Launch Chromium (optionally a specific executable) and open the layout page.
    pub async fn launch(
        chrome: Option<&Path>,
        template_override: Option<&Path>,
    ) -> AutocapResult<Self> {
        let mut template = CaptionTemplate::new()?;
        if let Some(path) = template_override {
            template.register_override(path)?;
        }

        let (browser, handler) = launch_browser(chrome).await?;

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| AutocapError::Rasterization(format!("Failed to create page: {e}")))?;

        page.execute(SetDeviceMetricsOverrideParams::new(
            CANVAS_WIDTH as i64,
            CANVAS_HEIGHT as i64,
            1.0,
            false,
        ))
        .await
        .map_err(|e| AutocapError::Rasterization(format!("Failed to set viewport: {e}")))?;

        Ok(Self {
            browser,
            page,
            handler,
            template,
            runtime: Handle::current(),
        })
    }

    /// Lay out `html` and capture the `#caption` element as PNG bytes.
    async fn capture(&self, html: &str) -> AutocapResult<Vec<u8>> {
        self.page
            .set_content(html)
            .await
            .map_err(|e| AutocapError::Rasterization(format!("Failed to set page content: {e}")))?;

        self.page
            .evaluate("document.fonts.ready.then(() => true)")
            .await
            .map_err(|e| AutocapError::Rasterization(format!("Font loading failed: {e}")))?;

        let element = self
            .page
            .find_element("#caption")
            .await
            .map_err(|e| AutocapError::Rasterization(format!("Template has no #caption element: {e}")))?;

        let bbox = element
            .bounding_box()
            .await
            .map_err(|e| AutocapError::Rasterization(format!("Failed to measure caption: {e}")))?;

        if bbox.width < 1.0 || bbox.height < 1.0 {
            return Err(AutocapError::Rasterization(format!(
                "caption laid out to an empty box ({}x{})",
                bbox.width, bbox.height
            )));
        }

        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .clip(Viewport {
                x: bbox.x,
                y: bbox.y,
                width: bbox.width.ceil(),
                height: bbox.height.ceil(),
                scale: 1.0,
            })
            .omit_background(true)
            .build();

        self.page
            .screenshot(params)
            .await
            .map_err(|e| AutocapError::Rasterization(format!("Screenshot failed: {e}")))
    }

    /// Close the page and browser and stop the event handler.
    pub async fn close(self) {
        let Self {
            mut browser,
            page,
            handler,
            ..
        } = self;
        let _ = page.close().await;
        let _ = browser.close().await;
        handler.abort();
    }
}

impl TextRasterizer for BrowserRasterizer {
    fn render(&self, text: &str, style: &CaptionStyle) -> AutocapResult<RgbaImage> {
        let html = self.template.render_html(text, style)?;
        let png = tokio::task::block_in_place(|| self.runtime.block_on(self.capture(&html)))?;
        let bitmap = image::load_from_memory(&png)
            .map_err(|e| AutocapError::Rasterization(format!("Invalid screenshot PNG: {e}")))?
            .to_rgba8();
        debug!(
            "Rasterized \"{}\" to {}x{}",
            text,
            bitmap.width(),
            bitmap.height()
        );
        Ok(bitmap)
    }
}

/// Launch a headless Chromium instance and drive its event handler in the background.
async fn launch_browser(chrome: Option<&Path>) -> AutocapResult<(Browser, JoinHandle<()>)> {
    let mut builder = BrowserConfig::builder()
        .window_size(CANVAS_WIDTH, CANVAS_HEIGHT)
        .viewport(None)
        .arg("--hide-scrollbars")
        .arg("--disable-gpu")
        .arg("--no-sandbox")
        .arg("--disable-dev-shm-usage");
    if let Some(path) = chrome {
        builder = builder.chrome_executable(path);
    }
    let config = builder
        .build()
        .map_err(|e| AutocapError::Rasterization(format!("Failed to configure browser: {e}")))?;

    let (browser, mut handler) = Browser::launch(config)
        .await
        .map_err(|e| AutocapError::Rasterization(format!("Failed to launch browser: {e}")))?;

    let handle = tokio::spawn(async move {
        while let Some(event) = handler.next().await {
            if event.is_err() {
                break;
            }
        }
    });

    Ok((browser, handle))
}
