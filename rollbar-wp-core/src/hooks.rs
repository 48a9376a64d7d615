//! Ordered filter chains.
//!
//! A chain is a named list of transformations over one value type. Filters
//! run synchronously in registration order, each receiving the previous
//! filter's output.

use std::fmt;

use tracing::trace;

pub type Filter<T> = Box<dyn Fn(T) -> T + Send + Sync>;

pub struct FilterChain<T> {
    name: &'static str,
    filters: Vec<Filter<T>>,
}

impl<T> FilterChain<T> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            filters: Vec::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn add<F>(&mut self, filter: F)
    where
        F: Fn(T) -> T + Send + Sync + 'static,
    {
        self.filters.push(Box::new(filter));
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn apply(&self, value: T) -> T {
        trace!(filter = self.name, count = self.filters.len(), "Applying filters");
        self.filters.iter().fold(value, |acc, filter| filter(acc))
    }
}

impl<T> fmt::Debug for FilterChain<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterChain")
            .field("name", &self.name)
            .field("filters", &self.filters.len())
            .finish()
    }
}
