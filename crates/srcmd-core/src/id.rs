//! Cell id generation.

use crc32fast::Hasher;

/// Sequential cell ids seeded from the decoded text.
///
/// Ids take the form `<crc32 of text>-<n>`, so decoding the same text twice
/// hands out the same ids, and ids within one document never repeat.
#[derive(Debug, Clone)]
pub struct IdGenerator {
    seed: String,
    count: u32,
}

impl IdGenerator {
    /// Seed the generator with a document's text.
    pub fn for_text(text: &str) -> Self {
        let mut hasher = Hasher::new();
        hasher.update(text.as_bytes());
        Self::from_seed(format!("{:08x}", hasher.finalize()))
    }

    /// Create a generator with an explicit seed.
    pub fn from_seed(seed: impl Into<String>) -> Self {
        Self {
            seed: seed.into(),
            count: 0,
        }
    }

    /// Hand out the next id.
    pub fn next_id(&mut self) -> String {
        self.count += 1;
        format!("{}-{}", self.seed, self.count)
    }
}
