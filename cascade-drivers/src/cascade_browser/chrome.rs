use serde_json::json;
use webdriver::capabilities::Capabilities;

/// Chrome launch options for a Cascade session.
#[derive(Debug, Clone)]
pub struct ChromeOptions {
    pub headless: bool,
    pub window_size: (u32, u32),
    /// Additional raw command-line switches, appended verbatim.
    pub extra_args: Vec<String>,
}

impl Default for ChromeOptions {
    fn default() -> Self {
        Self {
            headless: true,
            window_size: (1920, 1080),
            extra_args: Vec::new(),
        }
    }
}

/// Construct Chrome command-line arguments for the given options.
pub fn build_chrome_arguments(options: &ChromeOptions) -> Vec<String> {
    let mut args = vec![
        "--disable-infobars".to_string(),
        "--disable-dev-shm-usage".to_string(),
        "--no-sandbox".to_string(),
        "--disable-extensions".to_string(),
        format!(
            "--window-size={},{}",
            options.window_size.0, options.window_size.1
        ),
    ];
    if options.headless {
        args.push("--headless=new".to_string());
        args.push("--disable-gpu".to_string());
    }
    args.extend(options.extra_args.iter().cloned());
    args
}

/// WebDriver capabilities carrying `goog:chromeOptions`.
pub fn chrome_capabilities(options: &ChromeOptions) -> Capabilities {
    let mut caps = Capabilities::new();
    caps.insert(
        "goog:chromeOptions".to_string(),
        json!({ "args": build_chrome_arguments(options) }),
    );
    caps
}
