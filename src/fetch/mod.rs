// src/fetch/mod.rs
//! Concrete fetch adapters and URL-based selection between them.

pub mod bird;
pub mod web;

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

use crate::ingest::FetchAdapter;
use crate::model::{RawItem, Source};

pub use bird::BirdCliAdapter;
pub use web::WebAdapter;

/// Routes x.com / twitter.com sources to the CLI adapter, everything else to the web one.
#[derive(Clone)]
pub struct AdapterRouter {
    twitter: Arc<dyn FetchAdapter>,
    web: Arc<dyn FetchAdapter>,
}

impl AdapterRouter {
    pub fn new(twitter: Arc<dyn FetchAdapter>, web: Arc<dyn FetchAdapter>) -> Self {
        Self { twitter, web }
    }

    pub fn select(&self, source: &Source) -> &Arc<dyn FetchAdapter> {
        if is_twitter_url(&source.url) {
            &self.twitter
        } else {
            &self.web
        }
    }
}

pub fn is_twitter_url(url: &str) -> bool {
    let u = url.to_ascii_lowercase();
    u.contains("x.com/") || u.contains("twitter.com/")
}

#[async_trait]
impl FetchAdapter for AdapterRouter {
    async fn fetch(&self, source: &Source) -> Result<Vec<RawItem>> {
        self.select(source).fetch(source).await
    }

    fn name(&self) -> &'static str {
        "router"
    }
}
