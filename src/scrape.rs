use reqwest::Client;
use scraper::{Html, Selector};
use tracing::warn;

/// Character budget for scraped page text before it reaches the composer.
pub const SCRAPE_CHAR_BUDGET: usize = 4000;

/// Returned whenever the page cannot be fetched or parsed. Advisory only;
/// the rest of the pipeline carries on with it.
pub const SCRAPE_PLACEHOLDER: &str = "Información web no disponible.";

/// Fetch the configured public page and reduce it to bounded plain text.
/// Any failure (timeout, non-2xx, network error) degrades to the fixed
/// placeholder; this never propagates an error.
pub async fn fetch_page_text(http: &Client, url: &str) -> String {
    match fetch_page(http, url).await {
        Ok(html) => extract_visible_text(&html),
        Err(err) => {
            warn!(target = "srbot.scrape", url = url, error = %err, "page scrape failed");
            SCRAPE_PLACEHOLDER.to_string()
        }
    }
}

async fn fetch_page(http: &Client, url: &str) -> Result<String, reqwest::Error> {
    let response = http.get(url).send().await?.error_for_status()?;
    response.text().await
}

/// Visible `<body>` text with whitespace collapsed and the budget applied.
pub fn extract_visible_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let body = Selector::parse("body").expect("static selector");

    let mut text = document
        .select(&body)
        .flat_map(|node| node.text())
        .collect::<Vec<_>>()
        .join(" ");
    text = text.split_whitespace().collect::<Vec<_>>().join(" ");

    truncate_chars(&text, SCRAPE_CHAR_BUDGET)
}

/// Char-based truncation; byte slicing would split multibyte Spanish text.
pub fn truncate_chars(text: &str, budget: usize) -> String {
    if text.chars().count() <= budget {
        text.to_string()
    } else {
        text.chars().take(budget).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_body_text_and_collapses_whitespace() {
        let html = r#"<html><head><title>skip</title></head>
            <body><h1>Sr  Robot</h1>
            <p>Laptops   y
            accesorios</p></body></html>"#;
        let text = extract_visible_text(html);
        assert_eq!(text, "Sr Robot Laptops y accesorios");
    }

    #[test]
    fn respects_character_budget() {
        let body = "palabra ".repeat(2000);
        let html = format!("<html><body><p>{body}</p></body></html>");
        let text = extract_visible_text(&html);
        assert!(text.chars().count() <= SCRAPE_CHAR_BUDGET);
    }

    #[test]
    fn truncation_is_char_safe() {
        let text = "ñ".repeat(10);
        assert_eq!(truncate_chars(&text, 4), "ññññ");
    }

    #[tokio::test]
    async fn unreachable_url_yields_placeholder() {
        let http = crate::http::build_client();
        let text = fetch_page_text(&http, "http://127.0.0.1:1/nope").await;
        assert_eq!(text, SCRAPE_PLACEHOLDER);
    }
}
