//! Per-record subrecord presence rules
//!
//! A [`TagSchema`] declares, per record type, which subrecord tags may
//! appear and how often. A [`PresenceTracker`] applies it while one record
//! is decoded and is dropped with it.

use hashbrown::{HashMap, HashSet};

use crate::error::{EsmError, Result};
use crate::tag::Tag;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagPolicy {
    /// Exactly once
    Required,
    /// At most once
    Optional,
    /// Any number of times
    Repeatable,
}

/// Allowed subrecord tags of one record type
#[derive(Debug, Clone)]
pub struct TagSchema {
    record: Tag,
    policies: HashMap<Tag, TagPolicy>,
}

impl TagSchema {
    pub fn new(record: Tag) -> Self {
        Self {
            record,
            policies: HashMap::new(),
        }
    }

    pub fn required(mut self, tags: &[Tag]) -> Self {
        self.extend(tags, TagPolicy::Required);
        self
    }

    pub fn optional(mut self, tags: &[Tag]) -> Self {
        self.extend(tags, TagPolicy::Optional);
        self
    }

    pub fn repeatable(mut self, tags: &[Tag]) -> Self {
        self.extend(tags, TagPolicy::Repeatable);
        self
    }

    fn extend(&mut self, tags: &[Tag], policy: TagPolicy) {
        for &tag in tags {
            self.policies.insert(tag, policy);
        }
    }

    pub fn record(&self) -> Tag {
        self.record
    }

    pub fn policy(&self, tag: Tag) -> Option<TagPolicy> {
        self.policies.get(&tag).copied()
    }

    /// Required tags in byte order
    pub fn required_tags(&self) -> Vec<Tag> {
        let mut tags: Vec<Tag> = self
            .policies
            .iter()
            .filter(|&(_, &policy)| policy == TagPolicy::Required)
            .map(|(&tag, _)| tag)
            .collect();
        tags.sort_unstable();
        tags
    }
}

/// Seen-tag set for the record currently being decoded
#[derive(Debug)]
pub struct PresenceTracker<'s> {
    schema: &'s TagSchema,
    seen: HashSet<Tag>,
}

impl<'s> PresenceTracker<'s> {
    pub fn new(schema: &'s TagSchema) -> Self {
        Self {
            schema,
            seen: HashSet::new(),
        }
    }

    /// Record that `tag` is about to be decoded.
    ///
    /// Call before reading the payload: a rejected tag must not touch any
    /// already-decoded field.
    pub fn mark_seen(&mut self, tag: Tag) -> Result<TagPolicy> {
        let record = self.schema.record();
        let policy = self
            .schema
            .policy(tag)
            .ok_or(EsmError::UnexpectedTag { record, tag })?;
        let first = self.seen.insert(tag);
        if !first && policy != TagPolicy::Repeatable {
            return Err(EsmError::DuplicateTag { record, tag });
        }
        Ok(policy)
    }

    pub fn is_seen(&self, tag: Tag) -> bool {
        self.seen.contains(&tag)
    }

    /// Fail on the first required tag (in byte order) that was never seen
    pub fn check_required(&self) -> Result<()> {
        match self
            .schema
            .required_tags()
            .into_iter()
            .find(|tag| !self.seen.contains(tag))
        {
            Some(tag) => Err(EsmError::MissingRequiredTag {
                record: self.schema.record(),
                tag,
            }),
            None => Ok(()),
        }
    }
}
