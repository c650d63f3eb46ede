// Module: Config
// Engine-wide settings resolved from defaults, then env, then CLI flags.

use crate::limits::RunLimits;
use crate::planner::PlanSettings;

pub const DEFAULT_BASE_URL: &str = "http://localhost:5001";
pub const DEFAULT_WEBDRIVER_URL: &str = "http://localhost:9515";

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Page loaded by `Navigate` actions and at the start of each live case.
    pub base_url: String,
    /// WebDriver server (chromedriver, geckodriver, selenium grid).
    pub webdriver_url: String,
    pub headless: bool,
    /// Load `base_url` before the first step of every live case.
    pub open_base_url_per_case: bool,
    pub limits: RunLimits,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            webdriver_url: DEFAULT_WEBDRIVER_URL.to_string(),
            headless: false,
            open_base_url_per_case: true,
            limits: RunLimits::default(),
        }
    }
}

impl EngineConfig {
    /// Reads `STEP_ENGINE_BASE_URL`, `STEP_ENGINE_WEBDRIVER_URL`,
    /// `STEP_ENGINE_HEADLESS` and the limit variables.
    pub fn from_env() -> Self {
        let mut config = Self {
            limits: RunLimits::from_env(),
            ..Self::default()
        };

        if let Ok(url) = std::env::var("STEP_ENGINE_BASE_URL") {
            config.base_url = url;
        }

        if let Ok(url) = std::env::var("STEP_ENGINE_WEBDRIVER_URL") {
            config.webdriver_url = url;
        }

        if let Ok(flag) = std::env::var("STEP_ENGINE_HEADLESS") {
            config.headless = matches!(flag.trim().to_lowercase().as_str(), "1" | "true" | "yes");
        }

        config
    }

    pub fn plan_settings(&self) -> PlanSettings {
        PlanSettings {
            base_url: self.base_url.clone(),
            pacing: self.limits.pacing,
        }
    }
}
