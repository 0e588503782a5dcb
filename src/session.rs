/// One edit session over one document: the board tree plus the formatting
/// cache captured from the as-fetched markdown. The session lives from
/// fetch to save; `refresh` starts a new one in place after the document
/// changed underneath.
use crate::cache::FormattingCache;
use crate::parser::extract;
use crate::serializer::serialize;
use crate::types::BoardSet;

#[derive(Debug, Clone, Default)]
pub struct BoardSession {
    pub set: BoardSet,
    pub cache: FormattingCache,
}

impl BoardSession {
    pub fn load(content: &str) -> Self {
        let (set, cache) = extract(content);
        Self { set, cache }
    }

    /// Render the current tree into `original`, which is expected to be
    /// the freshest server copy of the document (not necessarily the text
    /// this session was loaded from).
    pub fn render(&self, original: &str) -> String {
        serialize(original, &self.set, &self.cache)
    }

    /// Re-extract tree and cache from new content, discarding all
    /// unsaved state. The cache is only ever rebuilt here, never
    /// piecemeal.
    pub fn refresh(&mut self, content: &str) {
        *self = Self::load(content);
    }
}
