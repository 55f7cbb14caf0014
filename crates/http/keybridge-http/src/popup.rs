//! Popup completion page.

use keybridge_flow::Outcome;

/// HTML page that delivers `outcome` to the window that opened the
/// popup and then closes itself. Without an opener it falls back to a
/// plain redirect.
///
/// The payload is posted same-origin-only; the embedded JSON is escaped
/// so a provider-controlled string cannot break out of the script tag.
pub fn popup_page(outcome: &Outcome) -> String {
    let payload = escape_for_script(&outcome.to_popup_message().to_string());
    let fallback = outcome
        .redirect
        .as_deref()
        .unwrap_or(Outcome::FAILURE_REDIRECT);
    format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>Signing in...</title></head>
<body>
<script>
  var result = {payload};
  if (window.opener) {{
    window.opener.postMessage(result, window.location.origin);
    window.close();
  }} else {{
    window.location.replace({fallback:?});
  }}
</script>
<noscript>Authentication finished. You can close this window.</noscript>
</body>
</html>
"#
    )
}

fn escape_for_script(json: &str) -> String {
    json.replace('<', "\\u003c")
        .replace('>', "\\u003e")
        .replace("\u{2028}", "\\u2028")
        .replace("\u{2029}", "\\u2029")
}

#[cfg(test)]
mod tests {
    use super::*;
    use keybridge_flow::FlowAction;
    use keybridge_core::Provider;

    #[test]
    fn page_posts_result_and_closes() {
        let outcome = Outcome::failure(Provider::Google, FlowAction::Login, "denied", true);
        let page = popup_page(&outcome);
        assert!(page.contains("\"type\":\"oauth_result\""));
        assert!(page.contains("window.opener.postMessage"));
        assert!(page.contains("window.close()"));
        assert!(page.contains(r#"window.location.replace("/login")"#));
    }

    #[test]
    fn script_breakout_is_escaped() {
        let outcome = Outcome::failure(
            Provider::Google,
            FlowAction::Login,
            "</script><script>alert(1)</script>",
            true,
        );
        let page = popup_page(&outcome);
        assert!(!page.contains("</script><script>alert"));
        assert!(page.contains("\\u003c/script\\u003e"));
    }
}
