use crate::models::Quote;

/// Run-scoped collection: pages appended in order, nothing dropped or merged.
#[derive(Debug, Default)]
pub struct Aggregator {
    quotes: Vec<Quote>,
    pages: u32,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_page(&mut self, quotes: Vec<Quote>) {
        self.quotes.extend(quotes);
        self.pages += 1;
    }

    pub fn pages(&self) -> u32 {
        self.pages
    }

    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }

    pub fn into_quotes(self) -> Vec<Quote> {
        self.quotes
    }
}
