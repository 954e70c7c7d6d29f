//! HTTP surface: `GET /health` and `POST /capture`.

use crate::browser::chrome::{ChromeDriver, ConnectionMode};
use crate::capture::{capture_element, capture_full_page, CaptureSettings};
use crate::driver::RemoteDriver;
use crate::error::{CaptureError, Result};
use crate::geometry::RectangleSize;
use crate::imaging::Image;
use crate::session::CaptureSession;
use crate::viewport::set_viewport_size;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use warp::Filter;

/// How the server starts Chrome when a capture needs it.
#[derive(Debug, Clone, Default)]
pub struct LaunchOptions {
    pub chrome_path: Option<String>,
    pub no_sandbox: bool,
    pub headed: bool,
}

/// The Chrome instance and the lock every capture on its page runs under.
struct Session {
    chrome: Arc<ChromeDriver>,
    capture: CaptureSession,
}

pub struct AppState {
    session: Mutex<Option<Arc<Session>>>,
    launch: LaunchOptions,
    /// Used when a request carries no settings of its own.
    default_settings: CaptureSettings,
}

impl AppState {
    pub fn new(launch: LaunchOptions) -> Self {
        Self {
            session: Mutex::new(None),
            launch,
            default_settings: CaptureSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: CaptureSettings) -> Self {
        self.default_settings = settings;
        self
    }
}

#[derive(Debug, Deserialize)]
pub struct CaptureRequest {
    pub url: String,
    pub viewport: Option<RectangleSize>,
    pub settings: Option<CaptureSettings>,
    /// Capture this element instead of the whole page.
    pub selector: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CaptureResponse {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub png_base64: Option<String>,
}

impl CaptureResponse {
    fn success(image: &Image, png: &[u8]) -> Self {
        Self {
            status: "success".to_string(),
            message: None,
            width: Some(image.width()),
            height: Some(image.height()),
            sha256: Some(image.sha256_hex()),
            png_base64: Some(base64::engine::general_purpose::STANDARD.encode(png)),
        }
    }

    fn error(message: String) -> Self {
        Self {
            status: "error".to_string(),
            message: Some(message),
            width: None,
            height: None,
            sha256: None,
            png_base64: None,
        }
    }
}

pub fn routes(
    state: Arc<AppState>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let health = warp::path("health")
        .and(warp::get())
        .map(|| warp::reply::json(&serde_json::json!({ "status": "ok" })));

    let state_filter = warp::any().map(move || state.clone());

    let capture = warp::path("capture")
        .and(warp::post())
        .and(warp::body::json())
        .and(state_filter)
        .and_then(handle_capture);

    health.or(capture)
}

async fn handle_capture(
    req: CaptureRequest,
    state: Arc<AppState>,
) -> std::result::Result<impl warp::Reply, warp::Rejection> {
    log::info!("Received capture request for {}", req.url);

    let response = match run_capture(&req, &state).await {
        Ok(response) => response,
        Err(e) => {
            log::error!("Capture of {} failed: {}", req.url, e);
            CaptureResponse::error(e.to_string())
        }
    };

    Ok(warp::reply::json(&response))
}

async fn run_capture(req: &CaptureRequest, state: &AppState) -> Result<CaptureResponse> {
    let settings = req
        .settings
        .clone()
        .unwrap_or_else(|| state.default_settings.clone());
    settings
        .validate()
        .map_err(|e| CaptureError::Other(e.to_string()))?;

    let session = ensure_session(state).await?;

    // Held until the capture is done: viewport sizing and navigation share the page too.
    let mut tracked = session.capture.acquire().await;
    if let Some(viewport) = req.viewport {
        set_viewport_size(session.chrome.as_ref(), viewport).await?;
    }
    session.chrome.navigate(&req.url).await?;

    let image = match &req.selector {
        Some(selector) => {
            let element = tracked.find_element(selector).await?;
            capture_element(&mut tracked, element, &settings).await?
        }
        None => capture_full_page(&mut tracked, &settings).await?,
    };
    drop(tracked);

    let png = image.to_png()?;
    log::info!(
        "Captured {} as {}x{} ({} bytes)",
        req.url,
        image.width(),
        image.height(),
        png.len()
    );
    Ok(CaptureResponse::success(&image, &png))
}

/// The shared Chrome session, relaunched if it died.
async fn ensure_session(state: &AppState) -> Result<Arc<Session>> {
    let mut session_guard = state.session.lock().await;

    if let Some(session) = session_guard.as_ref() {
        if session.chrome.is_alive().await {
            return Ok(session.clone());
        }
        log::warn!("Chrome session DEAD, restarting...");
        *session_guard = None;
    }

    log::info!("Launching new Chrome session...");
    let chrome = Arc::new(
        ChromeDriver::new(ConnectionMode::Sandboxed {
            chrome_path: state.launch.chrome_path.clone(),
            no_sandbox: state.launch.no_sandbox,
            headless: !state.launch.headed,
        })
        .await?,
    );
    let session = Arc::new(Session {
        capture: CaptureSession::new(chrome.clone() as Arc<dyn RemoteDriver>),
        chrome,
    });
    *session_guard = Some(session.clone());
    Ok(session)
}
