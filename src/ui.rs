//! HTML pages for the browser UI

use crate::handler::Outcome;
use crate::protocol::file_url;
use crate::request::Mode;

const STYLE: &str = r#"
body { font-family: system-ui, sans-serif; max-width: 720px; margin: 2rem auto; padding: 0 1rem; }
label { display: block; margin-top: 1rem; font-weight: 600; }
input[type=text] { width: 100%; padding: .5rem; box-sizing: border-box; }
fieldset { border: none; padding: 0; margin-top: 1rem; }
button { margin-top: 1.5rem; padding: .6rem 1.4rem; font-size: 1rem; }
.success { background: #e8f5e9; padding: .8rem; border-radius: 4px; }
.error { background: #fdecea; padding: .8rem; border-radius: 4px; white-space: pre-wrap; }
video, audio { width: 100%; margin-top: 1rem; }
"#;

/// Escape text for use in HTML content and attribute values
pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

fn page(body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>Video Downloader</title>\n<style>{}</style>\n</head>\n<body>\n\
         <h1>Video Downloader</h1>\n{}\n</body>\n</html>\n",
        STYLE, body
    )
}

/// The input form, pre-filled with the previous values
fn form(url: &str, mode: Mode, filename: &str) -> String {
    let checked = |m: Mode| if m == mode { " checked" } else { "" };
    format!(
        r#"<form method="post" action="/convert" onsubmit="this.querySelector('button').disabled=true;this.querySelector('button').textContent='Processing…';">
<label for="url">Video URL</label>
<input type="text" id="url" name="url" value="{url}" placeholder="https://www.youtube.com/watch?v=...">
<fieldset>
<legend><strong>What do you want to download?</strong></legend>
<label><input type="radio" name="mode" value="video"{video}> Video (MP4)</label>
<label><input type="radio" name="mode" value="audio"{audio}> Audio (MP3)</label>
</fieldset>
<label for="filename">File name (without extension), optional</label>
<input type="text" id="filename" name="filename" value="{filename}">
<button type="submit">Start</button>
</form>"#,
        url = escape_html(url),
        video = checked(Mode::Video),
        audio = checked(Mode::Audio),
        filename = escape_html(filename),
    )
}

pub fn index_page() -> String {
    page(&form("", Mode::Video, ""))
}

/// Result page: preview and download link, or the error, followed by a fresh form
pub fn outcome_page(outcome: &Outcome, url: &str, mode: Mode, filename: &str) -> String {
    let section = match outcome {
        Outcome::Ready(result) => {
            let path = result.path.to_string_lossy();
            let name = escape_html(&result.file_name());
            let inline = escape_html(&file_url(&path, false));
            let download = escape_html(&file_url(&path, true));
            let preview = match result.mode {
                Mode::Video => format!(
                    r#"<video controls src="{}" type="{}"></video>"#,
                    inline,
                    result.mime()
                ),
                Mode::Audio => format!(
                    r#"<audio controls src="{}" type="{}"></audio>"#,
                    inline,
                    result.mime()
                ),
            };
            format!(
                r#"<p class="success">{label} ready: {name}</p>
{preview}
<p><a href="{download}" download="{name}">Download the {label}</a></p>"#,
                label = result.mode.label(),
                name = name,
                preview = preview,
                download = download,
            )
        }
        Outcome::Failed { message, .. } => {
            format!(r#"<p class="error">{}</p>"#, escape_html(message))
        }
    };

    page(&format!("{}\n<hr>\n{}", section, form(url, mode, filename)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConvertError;
    use crate::request::MaterializationResult;
    use std::path::PathBuf;

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("<a href=\"x\">&'"), "&lt;a href=&quot;x&quot;&gt;&amp;&#39;");
    }

    #[test]
    fn test_index_page_has_form_fields() {
        let html = index_page();
        assert!(html.contains(r#"name="url""#));
        assert!(html.contains(r#"value="video" checked"#));
        assert!(html.contains(r#"name="filename""#));
    }

    #[test]
    fn test_ready_page_has_preview_and_download() {
        let outcome = Outcome::Ready(MaterializationResult {
            path: PathBuf::from("/tmp/yt_1/track1.mp3"),
            mode: Mode::Audio,
        });
        let html = outcome_page(&outcome, "https://youtu.be/abc123", Mode::Audio, "track1");
        assert!(html.contains("<audio controls"));
        assert!(html.contains("MP3 ready: track1.mp3"));
        assert!(html.contains("download=1"));
        assert!(html.contains(r#"value="audio" checked"#));
    }

    #[test]
    fn test_failed_page_shows_escaped_message() {
        let error = ConvertError::ExternalToolFailure("ERROR: <timeout>".to_string());
        let message = error.user_message();
        let outcome = Outcome::Failed { error, message };
        let html = outcome_page(&outcome, "https://youtu.be/abc123", Mode::Video, "");
        assert!(html.contains("ERROR: &lt;timeout&gt;"));
        assert!(!html.contains("<video"));
    }
}
