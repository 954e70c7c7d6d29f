use crate::driver::{RemoteDriver, RemoteElement};
use crate::error::{CaptureError, Result};
use crate::geometry::{Location, RectangleSize};
use crate::scripts;
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::browser::{
    Bounds, GetWindowForTargetParams, SetWindowBoundsParams, WindowId, WindowState,
};
use chromiumoxide::cdp::browser_protocol::page::{CaptureScreenshotFormat, NavigateParams};
use chromiumoxide::page::{Page, ScreenshotParams};
use futures::StreamExt;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

const INITIAL_WINDOW_SIZE: (u32, u32) = (1024, 768);
const NAVIGATION_TIMEOUT: Duration = Duration::from_secs(30);

/// A Chrome session driven over the DevTools protocol.
///
/// DevTools has no notion of a "current frame", so frame switching is emulated: the driver
/// remembers a path of `window.frames` indices and evaluates every script inside the realm
/// that path leads to. Only same-origin frames can be entered this way.
pub struct ChromeDriver {
    browser: Browser,
    page: Page,
    frame_path: Mutex<Vec<usize>>,
    temp_dir: Option<PathBuf>,
}

/// Connection mode for Chrome browser
pub enum ConnectionMode {
    /// Launches a local Chrome with an isolated profile
    Sandboxed {
        chrome_path: Option<String>,
        no_sandbox: bool,
        headless: bool,
    },
    /// Connects to an existing Chrome started with --remote-debugging-port
    DebugPort(u16),
}

impl ChromeDriver {
    /// Launch a headless Chrome, adding --no-sandbox in CI environments
    pub async fn launch_auto() -> Result<Self> {
        let is_ci = std::env::var("CI").is_ok()
            || std::env::var("GITHUB_ACTIONS").is_ok()
            || std::env::var("GITLAB_CI").is_ok();

        Self::new(ConnectionMode::Sandboxed {
            chrome_path: None,
            no_sandbox: is_ci,
            headless: true,
        })
        .await
    }

    /// Connect to existing Chrome on debug port
    pub async fn connect_debug_port(port: u16) -> Result<Self> {
        Self::new(ConnectionMode::DebugPort(port)).await
    }

    pub async fn new(mode: ConnectionMode) -> Result<Self> {
        let (browser, temp_dir) = match mode {
            ConnectionMode::Sandboxed {
                chrome_path,
                no_sandbox,
                headless,
            } => {
                // Unique profile directory so parallel sessions don't share state
                let unique_id = std::time::SystemTime::now()
                    .duration_since(std::time::UNIX_EPOCH)
                    .map(|elapsed| elapsed.as_nanos())
                    .unwrap_or_default();
                let temp_dir =
                    std::env::temp_dir().join(format!("robert-capture-{}", unique_id));
                std::fs::create_dir_all(&temp_dir).map_err(|e| {
                    CaptureError::LaunchFailed(format!("Failed to create temp directory: {}", e))
                })?;

                let mut config = if headless {
                    BrowserConfig::builder()
                } else {
                    BrowserConfig::builder().with_head()
                };

                // No device emulation: the window size must drive the viewport size.
                config = config
                    .user_data_dir(&temp_dir)
                    .viewport(None)
                    .window_size(INITIAL_WINDOW_SIZE.0, INITIAL_WINDOW_SIZE.1);

                if no_sandbox {
                    config = config.no_sandbox();
                }
                if let Some(path) = chrome_path {
                    config = config.chrome_executable(path);
                }

                let config = config.build().map_err(|e| {
                    CaptureError::LaunchFailed(format!(
                        "{}. Install Chrome or pass --chrome-path; on Linux try --no-sandbox",
                        e
                    ))
                })?;

                let (browser, mut handler) = Browser::launch(config)
                    .await
                    .map_err(|e| CaptureError::LaunchFailed(e.to_string()))?;

                tokio::spawn(async move {
                    while (handler.next().await).is_some() {
                        // Drive the connection
                    }
                });

                (browser, Some(temp_dir))
            }
            ConnectionMode::DebugPort(port) => {
                let url = format!("http://localhost:{}", port);
                let (browser, mut handler) = Browser::connect(&url).await.map_err(|e| {
                    CaptureError::ConnectionFailed(format!(
                        "Failed to connect to Chrome on port {}. \
                         Make sure Chrome is running with --remote-debugging-port={}: {}",
                        port, port, e
                    ))
                })?;

                tokio::spawn(async move {
                    while (handler.next().await).is_some() {
                        // Drive the connection
                    }
                });

                (browser, None)
            }
        };

        let page = Self::first_page(&browser).await?;
        log::info!("Chrome session ready");

        Ok(Self {
            browser,
            page,
            frame_path: Mutex::new(Vec::new()),
            temp_dir,
        })
    }

    /// The first page that isn't a chrome:// page, creating one if needed.
    async fn first_page(browser: &Browser) -> Result<Page> {
        let pages = browser.pages().await?;

        for page in pages.iter() {
            if let Ok(Some(url)) = page.url().await {
                if !url.starts_with("chrome://") {
                    return Ok(page.clone());
                }
            }
        }

        if let Some(page) = pages.last() {
            return Ok(page.clone());
        }

        browser
            .new_page("about:blank")
            .await
            .map_err(|e| CaptureError::Other(format!("Failed to create page: {}", e)))
    }

    /// Navigates the top-level page and waits for it to load. Leaves any entered frame.
    pub async fn navigate(&self, url: &str) -> Result<()> {
        let normalized_url = if !url.contains("://")
            && !url.starts_with("about:")
            && !url.starts_with("data:")
        {
            log::debug!("Normalizing URL: {} -> https://{}", url, url);
            format!("https://{}", url)
        } else {
            url.to_string()
        };

        log::info!("Navigating to {}", normalized_url);
        self.frame_path.lock().await.clear();

        let params = NavigateParams::builder()
            .url(&normalized_url)
            .build()
            .map_err(|e| {
                CaptureError::NavigationFailed(format!("Invalid URL {}: {}", normalized_url, e))
            })?;

        let response = self.page.execute(params).await.map_err(|e| {
            if e.to_string().contains("oneshot canceled") {
                CaptureError::NavigationFailed(
                    "Browser connection lost. The browser may have been closed or crashed."
                        .to_string(),
                )
            } else {
                CaptureError::NavigationFailed(format!(
                    "Failed to navigate to {}: {}",
                    normalized_url, e
                ))
            }
        })?;

        if let Some(error_text) = &response.result.error_text {
            return Err(CaptureError::NavigationFailed(format!(
                "Navigation error: {}",
                error_text
            )));
        }

        match tokio::time::timeout(NAVIGATION_TIMEOUT, self.page.wait_for_navigation()).await {
            Ok(Ok(_)) => log::debug!("Page loaded: {}", normalized_url),
            Ok(Err(e)) => log::warn!("Could not wait for page load: {}", e),
            Err(_) => {
                return Err(CaptureError::NavigationFailed(format!(
                    "Timed out after {:?} loading {}",
                    NAVIGATION_TIMEOUT, normalized_url
                )))
            }
        }

        Ok(())
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    /// Check if the browser is still alive and responsive
    pub async fn is_alive(&self) -> bool {
        matches!(
            tokio::time::timeout(Duration::from_secs(2), self.page.url()).await,
            Ok(Ok(_))
        )
    }

    pub async fn close(mut self) -> Result<()> {
        self.browser.close().await?;
        Ok(())
    }

    async fn window_id_and_bounds(&self) -> Result<(WindowId, Bounds)> {
        let window = self
            .page
            .execute(GetWindowForTargetParams {
                target_id: Some(self.page.target_id().clone()),
            })
            .await?;
        Ok((window.window_id.clone(), window.bounds.clone()))
    }

    async fn set_window_bounds(&self, bounds: Bounds) -> Result<()> {
        let (window_id, _) = self.window_id_and_bounds().await?;
        self.page
            .execute(SetWindowBoundsParams { window_id, bounds })
            .await?;
        Ok(())
    }

    async fn evaluate(&self, expression: String) -> Result<Value> {
        let result = self.page.evaluate_expression(expression).await?;
        Ok(result.value().cloned().unwrap_or(Value::Null))
    }
}

#[async_trait]
impl RemoteDriver for ChromeDriver {
    async fn execute_script(&self, script: &str, args: Vec<Value>) -> Result<Value> {
        let path = self.frame_path.lock().await.clone();
        self.evaluate(wrap_script(&path, None, script, &args)?).await
    }

    async fn take_screenshot(&self) -> Result<Vec<u8>> {
        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .build();
        let png = self
            .page
            .screenshot(params)
            .await
            .map_err(|e| CaptureError::Other(format!("Failed to take screenshot: {}", e)))?;
        Ok(png)
    }

    async fn window_size(&self) -> Result<RectangleSize> {
        let (_, bounds) = self.window_id_and_bounds().await?;
        match (bounds.width, bounds.height) {
            (Some(width), Some(height)) => Ok(RectangleSize::new(width as i32, height as i32)),
            _ => Err(CaptureError::Other(
                "Browser did not report a window size".to_string(),
            )),
        }
    }

    async fn set_window_size(&self, size: RectangleSize) -> Result<()> {
        self.set_window_bounds(Bounds {
            left: None,
            top: None,
            width: Some(size.width as i64),
            height: Some(size.height as i64),
            window_state: Some(WindowState::Normal),
        })
        .await
    }

    async fn set_window_position(&self, location: Location) -> Result<()> {
        self.set_window_bounds(Bounds {
            left: Some(location.x as i64),
            top: Some(location.y as i64),
            width: None,
            height: None,
            window_state: Some(WindowState::Normal),
        })
        .await
    }

    async fn switch_to_frame(&self, frame: &dyn RemoteElement) -> Result<()> {
        let mut frame_path = self.frame_path.lock().await;
        if !is_in_frame_path(frame.id(), &frame_path) {
            return Err(CaptureError::ElementNotFound(format!(
                "{} was found outside the current frame {:?}",
                frame.id(),
                *frame_path
            )));
        }

        let index = frame
            .call(scripts::FRAME_INDEX, vec![])
            .await?
            .as_i64()
            .filter(|index| *index >= 0)
            .ok_or_else(|| {
                CaptureError::ElementNotFound(format!("{} is not an iframe", frame.id()))
            })?;

        frame_path.push(index as usize);
        Ok(())
    }

    async fn switch_to_parent_frame(&self) -> Result<()> {
        self.frame_path.lock().await.pop();
        Ok(())
    }

    async fn switch_to_default_content(&self) -> Result<()> {
        self.frame_path.lock().await.clear();
        Ok(())
    }

    async fn find_element(&self, selector: &str) -> Result<Arc<dyn RemoteElement>> {
        let frame_path = self.frame_path.lock().await.clone();
        let element = ChromeElement {
            page: self.page.clone(),
            id: element_id(&frame_path, selector),
            frame_path,
            selector: selector.to_string(),
        };

        let exists = element.call("return true;", vec![]).await;
        match exists {
            Ok(_) => Ok(Arc::new(element)),
            Err(e) => {
                log::debug!("Element lookup for {} failed: {}", selector, e);
                Err(CaptureError::ElementNotFound(selector.to_string()))
            }
        }
    }
}

impl Drop for ChromeDriver {
    fn drop(&mut self) {
        if let Some(temp_dir) = &self.temp_dir {
            if temp_dir.exists() {
                let _ = std::fs::remove_dir_all(temp_dir);
            }
        }
    }
}

/// An element addressed by selector inside a fixed frame path.
pub struct ChromeElement {
    page: Page,
    frame_path: Vec<usize>,
    selector: String,
    id: String,
}

impl ChromeElement {
    pub fn selector(&self) -> &str {
        &self.selector
    }
}

#[async_trait]
impl RemoteElement for ChromeElement {
    fn id(&self) -> &str {
        &self.id
    }

    async fn call(&self, script: &str, args: Vec<Value>) -> Result<Value> {
        let expression = wrap_script(&self.frame_path, Some(&self.selector), script, &args)?;
        let result = self.page.evaluate_expression(expression).await?;
        Ok(result.value().cloned().unwrap_or(Value::Null))
    }
}

/// Element ids lead with the frame path the element was found in.
fn element_id(frame_path: &[usize], selector: &str) -> String {
    format!("{:?}{}", frame_path, selector)
}

fn is_in_frame_path(element_id: &str, frame_path: &[usize]) -> bool {
    element_id.starts_with(&format!("{:?}", frame_path))
}

/// Builds an expression running the function body `script` in the realm of `frame_path`,
/// with `this` bound to that realm's window or to the element matching `selector`.
fn wrap_script(
    frame_path: &[usize],
    selector: Option<&str>,
    script: &str,
    args: &[Value],
) -> Result<String> {
    let window = frame_path
        .iter()
        .fold("window".to_string(), |acc, index| format!("{}.frames[{}]", acc, index));
    let body = serde_json::to_string(script)?;
    let args = serde_json::to_string(args)?;

    let target = match selector {
        Some(selector) => {
            let selector = serde_json::to_string(selector)?;
            format!(
                "var target = w.document.querySelector({selector}); \
                 if (!target) {{ throw new Error('No element matches ' + {selector}); }}"
            )
        }
        None => "var target = w;".to_string(),
    };

    Ok(format!(
        "(function() {{ var w = {window}; {target} return (new w.Function({body})).apply(target, {args}); }})()"
    ))
}
