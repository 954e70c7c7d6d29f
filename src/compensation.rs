//! Sub-pixel corrections for browsers whose screenshots are shifted relative to DOM geometry.

use crate::driver::RemoteDriver;
use crate::frames::FrameChain;
use crate::geometry::Region;
use crate::scripts;
use crate::user_agent::{BrowserName, UserAgent};

pub trait RegionPositionCompensation: Send + Sync {
    /// Adjusts `region`, already scaled into screenshot pixels, for the given pixel ratio.
    fn compensate(&self, region: Region, pixel_ratio: f64) -> Region;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NullRegionPositionCompensation;

impl RegionPositionCompensation for NullRegionPositionCompensation {
    fn compensate(&self, region: Region, _pixel_ratio: f64) -> Region {
        region
    }
}

/// Firefox screenshots of HiDPI pages start half a CSS pixel early.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirefoxRegionPositionCompensation;

impl RegionPositionCompensation for FirefoxRegionPositionCompensation {
    fn compensate(&self, region: Region, pixel_ratio: f64) -> Region {
        if pixel_ratio == 1.0 {
            return region;
        }
        if region.size.is_empty() {
            return Region::EMPTY;
        }
        region.offset(0, -((pixel_ratio / 2.0).ceil() as i32))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SafariRegionPositionCompensation;

impl RegionPositionCompensation for SafariRegionPositionCompensation {
    fn compensate(&self, region: Region, pixel_ratio: f64) -> Region {
        if pixel_ratio == 1.0 {
            return region;
        }
        if region.size.is_empty() {
            return Region::EMPTY;
        }
        region.offset(0, pixel_ratio.ceil() as i32)
    }
}

/// Minimum Firefox major version whose screenshots need the offset.
const FIREFOX_COMPENSATION_SINCE: u32 = 48;

/// Chooses the compensation for `user_agent` in the context described by `frame_chain`.
/// Firefox only shifts top-level captures.
pub fn compensation_for(
    user_agent: &UserAgent,
    frame_chain: &FrameChain,
) -> Box<dyn RegionPositionCompensation> {
    match user_agent.browser {
        BrowserName::Firefox
            if user_agent.major_version >= FIREFOX_COMPENSATION_SINCE && frame_chain.is_empty() =>
        {
            Box::new(FirefoxRegionPositionCompensation)
        }
        BrowserName::Safari => Box::new(SafariRegionPositionCompensation),
        _ => Box::new(NullRegionPositionCompensation),
    }
}

/// Reads and parses `navigator.userAgent`; unknown when the script fails.
pub async fn detect_user_agent(driver: &dyn RemoteDriver) -> UserAgent {
    match driver.execute_script(scripts::GET_USER_AGENT, vec![]).await {
        Ok(value) => {
            let user_agent = UserAgent::parse(value.as_str().unwrap_or_default());
            log::debug!("Detected browser {}", user_agent);
            user_agent
        }
        Err(e) => {
            log::warn!("Failed to read user agent: {}", e);
            UserAgent::UNKNOWN
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn firefox(major_version: u32) -> UserAgent {
        UserAgent {
            browser: BrowserName::Firefox,
            major_version,
        }
    }

    #[test]
    fn test_firefox_shifts_up_half_ratio() {
        let region = Region::new(0, 100, 50, 50);
        let compensation = FirefoxRegionPositionCompensation;
        assert_eq!(compensation.compensate(region, 1.0), region);
        assert_eq!(compensation.compensate(region, 2.0), Region::new(0, 99, 50, 50));
        assert_eq!(compensation.compensate(region, 3.0), Region::new(0, 98, 50, 50));
        assert_eq!(
            compensation.compensate(Region::new(5, 5, 0, 10), 2.0),
            Region::EMPTY
        );
    }

    #[test]
    fn test_safari_shifts_down_ratio() {
        let region = Region::new(0, 100, 50, 50);
        let compensation = SafariRegionPositionCompensation;
        assert_eq!(compensation.compensate(region, 2.0), Region::new(0, 102, 50, 50));
        assert_eq!(compensation.compensate(region, 1.0), region);
    }

    #[test]
    fn test_selection() {
        let region = Region::new(0, 100, 50, 50);
        let top_level = FrameChain::new();

        let old = compensation_for(&firefox(47), &top_level);
        assert_eq!(old.compensate(region, 2.0), region);

        let new = compensation_for(&firefox(48), &top_level);
        assert_eq!(new.compensate(region, 2.0), Region::new(0, 99, 50, 50));

        let chrome = compensation_for(
            &UserAgent {
                browser: BrowserName::Chrome,
                major_version: 120,
            },
            &top_level,
        );
        assert_eq!(chrome.compensate(region, 2.0), region);
    }
}
