use crate::models::Quote;
use crate::scraper::error::ScrapeError;
use scraper::{ElementRef, Html, Selector};

// ── Selectors ─────────────────────────────────────────────────────────────────

fn selector(css: &str) -> Result<Selector, ScrapeError> {
    Selector::parse(css).map_err(|e| ScrapeError::Selector(format!("{css}: {e:?}")))
}

fn element_text(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

// ── Listing page ──────────────────────────────────────────────────────────────

/// Extract every `.quote` block in document order.
///
/// A block without `.text` or `.author` fails the whole page rather than
/// yielding a partial record. Missing `.tag` children just mean no tags.
pub fn extract_quotes(html: &str) -> Result<Vec<Quote>, ScrapeError> {
    let doc = Html::parse_document(html);

    let quote_sel = selector(".quote")?;
    let text_sel = selector(".text")?;
    let author_sel = selector(".author")?;
    let tag_sel = selector(".tag")?;

    let mut quotes = Vec::new();

    for (index, block) in doc.select(&quote_sel).enumerate() {
        let text = block
            .select(&text_sel)
            .next()
            .map(element_text)
            .ok_or(ScrapeError::MissingElement { index, field: "text" })?;

        let author = block
            .select(&author_sel)
            .next()
            .map(element_text)
            .ok_or(ScrapeError::MissingElement { index, field: "author" })?;

        let tags = block.select(&tag_sel).map(element_text).collect();

        quotes.push(Quote { text, author, tags });
    }

    Ok(quotes)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html><body>
        <div class="quote">
            <span class="text">  “The world as we have created it is a process of our thinking.” </span>
            <span>by <small class="author">Albert Einstein</small></span>
            <div class="tags">
                Tags:
                <meta class="keywords" content="change,deep-thoughts">
                <a class="tag" href="/tag/change/page/1/">change</a>
                <a class="tag" href="/tag/deep-thoughts/page/1/"> deep-thoughts </a>
                <a class="tag" href="/tag/change/page/1/">change</a>
            </div>
        </div>
        <div class="quote">
            <span class="text">Não há.</span>
            <span>by <small class="author">José Saramago</small></span>
            <div class="tags">Tags:</div>
        </div>
        </body></html>
    "#;

    #[test]
    fn test_extract_quotes_in_order() {
        let quotes = extract_quotes(PAGE).unwrap();
        assert_eq!(quotes.len(), 2);

        assert_eq!(
            quotes[0].text,
            "“The world as we have created it is a process of our thinking.”"
        );
        assert_eq!(quotes[0].author, "Albert Einstein");
        // duplicates kept, order as on page
        assert_eq!(quotes[0].tags, vec!["change", "deep-thoughts", "change"]);

        assert_eq!(quotes[1].author, "José Saramago");
        assert!(quotes[1].tags.is_empty());
    }

    #[test]
    fn test_page_without_quotes() {
        assert!(extract_quotes("<html><body><p>No quotes found!</p></body></html>")
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_missing_author_fails_page() {
        let html = r#"
            <div class="quote"><span class="text">ok</span><small class="author">A</small></div>
            <div class="quote"><span class="text">orphan</span></div>
        "#;
        let err = extract_quotes(html).unwrap_err();
        assert!(matches!(
            err,
            ScrapeError::MissingElement { index: 1, field: "author" }
        ));
    }

    #[test]
    fn test_missing_text_fails_page() {
        let html = r#"<div class="quote"><small class="author">A</small></div>"#;
        assert!(matches!(
            extract_quotes(html),
            Err(ScrapeError::MissingElement { index: 0, field: "text" })
        ));
    }
}
