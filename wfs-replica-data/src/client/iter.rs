use std::collections::VecDeque;
use std::iter::FusedIterator;

use wfs_replica_core::{FeatureRecord, PageDescriptor};

use super::{WfsClient, WfsError};
use crate::cache::CacheStore;
use crate::transport::HttpSource;

/// Records of planned pages, fetched one page at a time in plan order.
///
/// A failed page is reported once and ends the iteration.
#[derive(Debug)]
pub struct FeatureIter<'a, S, C> {
    client: &'a WfsClient<S, C>,
    pages: VecDeque<PageDescriptor>,
    current: std::vec::IntoIter<FeatureRecord>,
    lowercase: bool,
}

impl<'a, S: HttpSource, C: CacheStore> FeatureIter<'a, S, C> {
    pub(super) fn new(
        client: &'a WfsClient<S, C>,
        pages: Vec<PageDescriptor>,
        lowercase: bool,
    ) -> Self {
        Self {
            client,
            pages: pages.into(),
            current: Vec::new().into_iter(),
            lowercase,
        }
    }

    /// Pages not yet requested.
    #[must_use]
    pub fn remaining_pages(&self) -> usize {
        self.pages.len()
    }
}

impl<S: HttpSource, C: CacheStore> Iterator for FeatureIter<'_, S, C> {
    type Item = Result<FeatureRecord, WfsError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(mut feature) = self.current.next() {
                if self.lowercase {
                    feature.lowercase_attributes();
                }
                return Some(Ok(feature));
            }
            let page = self.pages.pop_front()?;
            match self.client.block_on(self.client.fetch_page(&page, false)) {
                Ok(features) => self.current = features.into_iter(),
                Err(err) => {
                    self.pages.clear();
                    return Some(Err(err));
                }
            }
        }
    }
}

impl<S: HttpSource, C: CacheStore> FusedIterator for FeatureIter<'_, S, C> {}
