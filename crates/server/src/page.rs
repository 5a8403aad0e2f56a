//! Server-rendered form page.

use std::fmt::Write as _;

use serde_json::Value;
use shared::{
    domain::EXAMPLE_DESCRIPTIONS,
    protocol::{download_route, session_page_route, ClassifyOutcome, SessionView},
};

const TITLE: &str = "PO L1-L2-L3 Classifier";

pub(crate) fn render_page(view: &SessionView) -> String {
    let mut html = String::with_capacity(4096);
    let action = session_page_route(view.session_id);

    html.push_str("<!doctype html>\n<html><head><meta charset=\"utf-8\">");
    let _ = write!(html, "<title>{TITLE}</title></head><body>");
    let _ = write!(html, "<h1>{TITLE}</h1>");
    html.push_str(
        "<p>Classify purchase order descriptions into L1/L2/L3 categories.</p>",
    );

    let _ = write!(html, "<form method=\"post\" action=\"{}\">", escape(&action));
    html.push_str("<p>Try an example:");
    for idx in 1..=EXAMPLE_DESCRIPTIONS.len() {
        let _ = write!(
            html,
            " <button type=\"submit\" name=\"action\" value=\"example-{idx}\">Example {idx}</button>"
        );
    }
    html.push_str("</p>");

    let _ = write!(
        html,
        "<label>PO Description<br><textarea name=\"description\" rows=\"6\" cols=\"70\" \
         placeholder=\"e.g., {}\" \
         oninput=\"document.getElementById('classify').disabled = !this.value.trim()\">{}</textarea></label><br>",
        escape(EXAMPLE_DESCRIPTIONS[0]),
        escape(&view.description)
    );
    let _ = write!(
        html,
        "<label>Supplier (optional)<br><input type=\"text\" name=\"supplier\" size=\"60\" \
         placeholder=\"e.g., Acme Facilities Inc.\" value=\"{}\"></label><br>",
        escape(&view.supplier)
    );
    let _ = write!(
        html,
        "<label><input type=\"checkbox\" name=\"debug_raw\"{}> Show raw model response on errors</label><br>",
        if view.debug_raw { " checked" } else { "" }
    );
    let _ = write!(
        html,
        "<button type=\"submit\" id=\"classify\" name=\"action\" value=\"classify\"{}>Classify</button>",
        if view.can_classify { "" } else { " disabled" }
    );
    html.push_str("</form>");

    if let Some(outcome) = &view.last_outcome {
        render_outcome(&mut html, outcome);
    }

    if !view.history.is_empty() {
        html.push_str("<h2>Recent Classifications</h2>");
        for entry in &view.history {
            let _ = write!(
                html,
                "<div><p>Description: {}</p><p>Supplier: {}</p>",
                escape(&entry.description),
                escape(&entry.supplier)
            );
            render_json(&mut html, entry.result.value());
            html.push_str("</div>");
        }
    }

    if view.download_available {
        let _ = write!(
            html,
            "<p><a href=\"{}\" download>Download Latest JSON</a></p>",
            escape(&download_route(view.session_id))
        );
    }

    html.push_str("</body></html>\n");
    html
}

fn render_outcome(html: &mut String, outcome: &ClassifyOutcome) {
    match outcome {
        ClassifyOutcome::Displayed { summary, result } => {
            if let Some(summary) = summary {
                html.push_str("<h2>Summary</h2>");
                for line in summary.lines() {
                    let _ = write!(html, "<p>{}</p>", escape(&line));
                }
            }
            html.push_str("<h2>Full JSON</h2>");
            render_json(html, result);
        }
        ClassifyOutcome::Errored {
            message,
            raw_response,
        } => {
            let _ = write!(html, "<p class=\"error\">{}</p>", escape(message));
            if let Some(raw) = raw_response {
                let _ = write!(html, "<pre class=\"raw\">{}</pre>", escape(raw));
            }
        }
    }
}

fn render_json(html: &mut String, value: &Value) {
    let pretty = serde_json::to_string_pretty(value).unwrap_or_default();
    let _ = write!(html, "<pre class=\"json\">{}</pre>", escape(&pretty));
}

pub(crate) fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
#[path = "tests/page_tests.rs"]
mod tests;
