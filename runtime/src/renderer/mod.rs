//! Renderer abstraction for browser-driven page interaction.
//!
//! Defines the `BrowserLauncher`, `Renderer` and `RenderContext` traits that
//! abstract over the browser engine (currently Chromium via chromiumoxide).
//! A launched renderer owns one browser process; callers must `shutdown` it.

pub mod chromium;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Result of navigating to a URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigationResult {
    /// The final URL after any redirects.
    pub final_url: String,
    /// Time taken to load the page in milliseconds.
    pub load_time_ms: u64,
}

/// Starts a browser whose downloads land in a given directory.
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    /// Launch a browser session. Files it downloads are saved in `download_dir`.
    async fn launch(&self, download_dir: &Path) -> Result<Box<dyn Renderer>>;
}

/// A running browser that can create page contexts.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Create a new browser context (tab).
    async fn new_context(&self) -> Result<Box<dyn RenderContext>>;
    /// Shut down the browser and release its process.
    async fn shutdown(&mut self) -> Result<()>;
}

/// A single browser context (tab).
#[async_trait]
pub trait RenderContext: Send + Sync {
    /// Navigate to a URL with a timeout.
    async fn navigate(&mut self, url: &str, timeout_ms: u64) -> Result<NavigationResult>;

    /// Execute JavaScript in the page context and return the result.
    async fn execute_js(&self, script: &str) -> Result<serde_json::Value>;

    /// Choose `value` in the `<select>` with id `element_id`.
    ///
    /// Returns `false` when the control or the option is not on the page yet.
    async fn select_option(&self, element_id: &str, value: &str) -> Result<bool> {
        let result = self
            .execute_js(&scripts::select_option(element_id, value))
            .await?;
        Ok(scripts::succeeded(&result))
    }

    /// Click the first link whose trimmed text is exactly `text`.
    ///
    /// Returns `false` when no such link is on the page yet.
    async fn click_link(&self, text: &str) -> Result<bool> {
        let result = self.execute_js(&scripts::click_link(text)).await?;
        Ok(scripts::succeeded(&result))
    }

    /// Close this context.
    async fn close(self: Box<Self>) -> Result<()>;
}

/// Page scripts. Every script returns `{ success: bool }`.
///
/// Caller values are only ever injected into string literals, after
/// escaping with [`sanitize_js_string`].
pub mod scripts {
    /// Select an option by value and fire the events frameworks listen to.
    pub fn select_option(element_id: &str, value: &str) -> String {
        format!(
            r#"(() => {{
                const el = document.getElementById('{id}');
                if (!el || !el.options) return {{ success: false }};
                const opt = [...el.options].find(o => o.value === '{value}');
                if (!opt) return {{ success: false }};
                el.value = '{value}';
                el.dispatchEvent(new Event('input', {{ bubbles: true }}));
                el.dispatchEvent(new Event('change', {{ bubbles: true }}));
                return {{ success: true }};
            }})()"#,
            id = sanitize_js_string(element_id),
            value = sanitize_js_string(value),
        )
    }

    /// Click a link by its exact visible text.
    pub fn click_link(text: &str) -> String {
        format!(
            r#"(() => {{
                const link = [...document.querySelectorAll('a')]
                    .find(a => a.textContent.trim() === '{text}');
                if (!link) return {{ success: false }};
                link.click();
                return {{ success: true }};
            }})()"#,
            text = sanitize_js_string(text),
        )
    }

    /// Read the `success` flag of a script result.
    pub fn succeeded(result: &serde_json::Value) -> bool {
        result
            .as_object()
            .and_then(|o| o.get("success"))
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }

    /// Escape a value for a single- or double-quoted JS string literal.
    pub fn sanitize_js_string(s: &str) -> String {
        let mut result = String::with_capacity(s.len() + 8);
        for ch in s.chars() {
            match ch {
                '\\' => result.push_str("\\\\"),
                '\'' => result.push_str("\\'"),
                '"' => result.push_str("\\\""),
                '`' => result.push_str("\\`"),
                '\n' => result.push_str("\\n"),
                '\r' => result.push_str("\\r"),
                '\t' => result.push_str("\\t"),
                '\0' => {}
                '<' => result.push_str("\\x3c"),
                '>' => result.push_str("\\x3e"),
                _ => result.push(ch),
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::scripts::*;
    use serde_json::json;

    #[test]
    fn test_sanitize_quotes_and_markup() {
        assert_eq!(sanitize_js_string("it's"), "it\\'s");
        assert_eq!(sanitize_js_string("</script>"), "\\x3c/script\\x3e");
        assert_eq!(sanitize_js_string("a\0b"), "ab");
    }

    #[test]
    fn test_select_option_script_targets_element_and_value() {
        let js = select_option("segment", "2");
        assert!(js.contains("getElementById('segment')"));
        assert!(js.contains("o.value === '2'"));
        assert!(js.contains("'change'"));
    }

    #[test]
    fn test_click_link_script_escapes_text() {
        let js = click_link("Down'load");
        assert!(js.contains("=== 'Down\\'load'"));
    }

    #[test]
    fn test_succeeded() {
        assert!(succeeded(&json!({ "success": true })));
        assert!(!succeeded(&json!({ "success": false })));
        assert!(!succeeded(&json!(null)));
        assert!(!succeeded(&json!("true")));
    }
}
