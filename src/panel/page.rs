//! Server-rendered HTML for the panel and the configuration error page.

use std::fmt::Write;

use super::models::{BatchId, Flash, PhoneNumber};
use crate::errors::ConfigError;

/// Escape text for use in HTML element content and quoted attributes.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Percent-encode a single path segment (RFC 3986 unreserved characters pass through).
/// `+` is kept literal, which is how the remove links have always looked.
pub fn encode_path_segment(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' | b'+' => {
                out.push(b as char)
            }
            _ => {
                let _ = write!(out, "%{:02X}", b);
            }
        }
    }
    out
}

pub fn render_index(numbers: &[PhoneNumber], flashes: &[Flash], batch: Option<BatchId>) -> String {
    let mut flash_html = String::new();
    for flash in flashes {
        let _ = writeln!(
            flash_html,
            r#"      <div class="flash flash-{}">{}</div>"#,
            flash.kind.as_str(),
            escape_html(&flash.message)
        );
    }

    let mut rows = String::new();
    if numbers.is_empty() {
        rows.push_str("        <li class=\"empty\">No numbers yet.</li>\n");
    }
    for number in numbers {
        let _ = writeln!(
            rows,
            r#"        <li><span class="number">{}</span> <a class="remove" href="/remove_number/{}">Remove</a></li>"#,
            escape_html(number.as_str()),
            escape_html(&encode_path_segment(number.as_str()))
        );
    }

    let batch_attr = batch.map(|b| b.to_string()).unwrap_or_default();

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
  <head>
    <meta charset="utf-8">
    <title>Call Board</title>
    <link rel="stylesheet" href="/static/panel.css">
  </head>
  <body>
    <main>
      <h1>Call Board</h1>
{flash_html}
      <section>
        <h2>Add number</h2>
        <form method="post" action="/add_number">
          <input type="text" name="number" placeholder="+15551234567" autocomplete="off">
          <button type="submit">Add</button>
        </form>
      </section>
      <section>
        <h2>Numbers ({count})</h2>
        <ul id="numbers">
{rows}        </ul>
        <form method="post" action="/call_all">
          <button type="submit" class="call-all"{disabled}>Call all</button>
        </form>
      </section>
      <section>
        <h2>Status</h2>
        <ul id="status" data-batch="{batch_attr}"></ul>
        <button type="button" id="watch-status">Watch status</button>
      </section>
    </main>
    <script src="/static/panel.js"></script>
  </body>
</html>
"#,
        count = numbers.len(),
        disabled = if numbers.is_empty() { " disabled" } else { "" },
    )
}

pub fn render_config_error(err: &ConfigError) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
  <head>
    <meta charset="utf-8">
    <title>Configuration Error</title>
  </head>
  <body style="font-family: Arial, sans-serif; max-width: 600px; margin: 50px auto; padding: 20px;">
    <h1 style="color: #e74c3c;">⚠️ Configuration Error</h1>
    <p>{message}</p>
    <h3>Required Environment Variables:</h3>
    <ul>
      <li><code>TWILIO_ACCOUNT_SID</code> - Your Twilio Account SID</li>
      <li><code>TWILIO_AUTH_TOKEN</code> - Your Twilio Auth Token</li>
    </ul>
    <h3>Optional:</h3>
    <ul>
      <li><code>CALLBOARD_CALLER_ID</code> - Caller ID for outbound calls</li>
      <li><code>CALLBOARD_VOICE_URL</code> - TwiML URL fetched when a call connects</li>
      <li><code>CALLBOARD_CALL_DELAY_SECS</code> - Pause between calls (default 3)</li>
    </ul>
    <p>Set these in your deployment environment or in a <code>.env</code> file next to the binary, then restart.</p>
  </body>
</html>
"#,
        message = escape_html(&err.to_string())
    )
}
