// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Composite work-queue key: (execution context, namespace, name).
//!
//! Both ProwJob and PipelineRun events collapse into the same key space so
//! that one queue entry covers both sides of a job/pipeline pair. The
//! encoding is the three parts slash-joined; decoding requires exactly
//! three parts.

use std::fmt;
use std::str::FromStr;

use crate::errors::Error;

/// Separator between the key's parts.
const KEY_SEPARATOR: char = '/';

/// Identity of one job/pipeline pair: build cluster alias, pipeline
/// namespace and object name.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RunKey {
    /// Build cluster alias the pipeline runs in.
    pub context: String,
    /// Namespace the pipeline objects live in.
    pub namespace: String,
    /// Shared name of the ProwJob and its PipelineRun.
    pub name: String,
}

impl RunKey {
    /// Build a key from its parts.
    #[must_use]
    pub fn new(context: &str, namespace: &str, name: &str) -> Self {
        RunKey {
            context: context.to_string(),
            namespace: namespace.to_string(),
            name: name.to_string(),
        }
    }
}

impl fmt::Display for RunKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{sep}{}{sep}{}",
            self.context,
            self.namespace,
            self.name,
            sep = KEY_SEPARATOR
        )
    }
}

impl FromStr for RunKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(KEY_SEPARATOR).collect();
        match parts.as_slice() {
            [context, namespace, name] => Ok(RunKey::new(context, namespace, name)),
            _ => Err(Error::MalformedKey { key: s.to_string() }),
        }
    }
}

#[cfg(test)]
#[path = "key_tests.rs"]
mod key_tests;
