//! Level trie of wildcard ACL filters
//!
//! Filters are stored one node per `/` level with dedicated `+` and `#`
//! branches, so the candidates for a topic are found by walking the topic's
//! levels rather than scanning every wildcard entry.

use crate::mqtt::{TOPIC_SEP, WILDCARD_MULTI_LEVEL, WILDCARD_SINGLE_LEVEL};
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct FilterTrie<T> {
    children: HashMap<String, FilterTrie<T>>,
    single: Option<Box<FilterTrie<T>>>,
    multi: Vec<T>,
    values: Vec<T>,
}

impl<T> Default for FilterTrie<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> FilterTrie<T> {
    pub fn new() -> Self {
        Self {
            children: HashMap::new(),
            single: None,
            multi: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Store a value under a validated filter
    pub fn insert(&mut self, filter: &str, value: T) {
        let mut node = self;
        let mut levels = filter.split(TOPIC_SEP).peekable();

        while let Some(level) = levels.next() {
            match level {
                // Validation guarantees `#` is last
                WILDCARD_MULTI_LEVEL => {
                    node.multi.push(value);
                    return;
                }
                WILDCARD_SINGLE_LEVEL => {
                    node = node
                        .single
                        .get_or_insert_with(|| Box::new(FilterTrie::new()))
                        .as_mut();
                }
                _ => {
                    node = node.children.entry(level.to_string()).or_default();
                }
            }
            if levels.peek().is_none() {
                node.values.push(value);
                return;
            }
        }
    }

    /// Remove every value under `filter` for which `pred` holds
    pub fn remove_where<F>(&mut self, filter: &str, pred: F) -> usize
    where
        F: Fn(&T) -> bool,
    {
        let levels: Vec<&str> = filter.split(TOPIC_SEP).collect();
        self.remove_at(&levels, &pred)
    }

    fn remove_at<F>(&mut self, levels: &[&str], pred: &F) -> usize
    where
        F: Fn(&T) -> bool,
    {
        let Some((first, rest)) = levels.split_first() else {
            return retain_count(&mut self.values, pred);
        };

        match *first {
            WILDCARD_MULTI_LEVEL => retain_count(&mut self.multi, pred),
            WILDCARD_SINGLE_LEVEL => self
                .single
                .as_mut()
                .map_or(0, |child| child.remove_at(rest, pred)),
            level => self
                .children
                .get_mut(level)
                .map_or(0, |child| child.remove_at(rest, pred)),
        }
    }

    /// Collect every value whose filter could match `topic`
    ///
    /// The result is a superset: the caller still runs the exact matcher,
    /// which owns the system-topic and filter-containment rules.
    pub fn candidates<'a>(&'a self, topic: &str) -> Vec<&'a T> {
        let levels: Vec<&str> = topic.split(TOPIC_SEP).collect();
        let mut out = Vec::new();
        self.collect(&levels, &mut out);
        out
    }

    fn collect<'a>(&'a self, levels: &[&str], out: &mut Vec<&'a T>) {
        // `#` absorbs zero or more remaining levels
        out.extend(self.multi.iter());

        let Some((first, rest)) = levels.split_first() else {
            out.extend(self.values.iter());
            return;
        };

        if let Some(child) = self.children.get(*first) {
            child.collect(rest, out);
        }
        if let Some(single) = &self.single {
            single.collect(rest, out);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
            && self.multi.is_empty()
            && self.single.as_ref().map_or(true, |s| s.is_empty())
            && self.children.values().all(FilterTrie::is_empty)
    }
}

fn retain_count<T, F>(values: &mut Vec<T>, pred: &F) -> usize
where
    F: Fn(&T) -> bool,
{
    let before = values.len();
    values.retain(|v| !pred(v));
    before - values.len()
}
