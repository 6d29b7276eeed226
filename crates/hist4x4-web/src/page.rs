//! The single-page UI.

const INDEX_TEMPLATE: &str = include_str!("../assets/index.html");
const GOOGLE_FLAG: &str = "__GOOGLE_ENABLED__";

/// Renders the page, telling the script whether Google login is available.
pub fn render_index(google_enabled: bool) -> String {
    INDEX_TEMPLATE.replace(GOOGLE_FLAG, if google_enabled { "true" } else { "false" })
}
