use pdf_chat_core::{ChatRole, ChatTurn, IngestionReport, Notice, NoticeLevel};

pub const PAGE_TITLE: &str = "Chat with PDFs";
pub const HEADER: &str = "Chat with Your PDFs";

pub struct PageView<'a> {
    pub history: &'a [ChatTurn],
    pub notice: Option<Notice>,
    pub ready: bool,
    pub report: Option<&'a IngestionReport>,
}

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

fn render_notice(notice: &Notice) -> String {
    let class = match notice.level {
        NoticeLevel::Info => "info",
        NoticeLevel::Success => "success",
        NoticeLevel::Warning => "warning",
        NoticeLevel::Error => "error",
    };
    format!(
        r#"<div class="notice {class}" role="status">{}</div>"#,
        escape_html(&notice.message)
    )
}

fn render_turn(turn: &ChatTurn) -> String {
    let (class, speaker) = match turn.role {
        ChatRole::User => ("user", "User"),
        ChatRole::Assistant => ("bot", "Bot"),
    };
    format!(
        r#"<div class="turn {class}"><strong>{speaker}:</strong> {}</div>"#,
        escape_html(&turn.text).replace('\n', "<br>")
    )
}

fn render_status(view: &PageView<'_>) -> String {
    match (view.ready, view.report) {
        (true, Some(report)) => format!(
            r#"<p class="status">Indexed {} document(s), {} chunk(s) at {}.</p>"#,
            report.documents,
            report.chunks,
            report.processed_at.format("%H:%M:%S UTC")
        ),
        _ => r#"<p class="status">No documents processed yet.</p>"#.to_string(),
    }
}

pub fn render_page(view: &PageView<'_>) -> String {
    let notice = view.notice.as_ref().map(render_notice).unwrap_or_default();
    let transcript = view
        .history
        .iter()
        .map(render_turn)
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{PAGE_TITLE}</title>
<style>
body {{ font-family: sans-serif; margin: 0; display: flex; min-height: 100vh; }}
aside {{ width: 18rem; padding: 1.5rem; background: #f0f2f6; }}
main {{ flex: 1; padding: 1.5rem 3rem; }}
.notice {{ padding: .75rem 1rem; border-radius: .4rem; margin-bottom: 1rem; }}
.notice.info {{ background: #e3eefc; }}
.notice.success {{ background: #dff5e3; }}
.notice.warning {{ background: #fff4d6; }}
.notice.error {{ background: #fde2e1; }}
.transcript {{ max-height: 60vh; overflow-y: auto; }}
.turn {{ margin: .5rem 0; }}
input[type=text] {{ width: 100%; padding: .5rem; }}
</style>
</head>
<body>
<aside>
<h3>Upload your PDFs</h3>
<form action="/process" method="post" enctype="multipart/form-data">
<label for="documents">Upload PDFs here:</label>
<input id="documents" type="file" name="documents" accept=".pdf,application/pdf" multiple>
<button type="submit">Process</button>
</form>
<form action="/reset" method="post"><button type="submit">Clear session</button></form>
{status}
</aside>
<main>
<h1>{HEADER} &#128218;</h1>
{notice}
<form action="/ask" method="post">
<label for="question">Ask a question about your documents:</label>
<input id="question" type="text" name="question" autocomplete="off" autofocus>
</form>
<section class="transcript">
{transcript}
</section>
</main>
</body>
</html>
"#,
        status = render_status(view),
    )
}
