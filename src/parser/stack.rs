//! The stack of open tags, indexed so that closing decisions never walk it.
use std::collections::HashMap;
use std::ops::Deref;

use super::OpenTag;

#[derive(Debug, Default)]
pub(crate) struct TagStack<'t> {
    frames: Vec<OpenTag<'t>>,
    /// Positions of the open frames of each tag, innermost last.
    by_name: HashMap<&'t str, Vec<usize>>,
    /// Positions of the open block-level frames, innermost last.
    blocks: Vec<usize>,
    no_autolink: usize,
}

impl<'t> TagStack<'t> {
    pub fn push(&mut self, frame: OpenTag<'t>) {
        let idx = self.frames.len();
        self.by_name.entry(frame.tag).or_default().push(idx);
        if frame.block_level {
            self.blocks.push(idx);
        }
        if frame.no_autolink {
            self.no_autolink += 1;
        }
        self.frames.push(frame);
    }

    pub fn pop(&mut self) -> Option<OpenTag<'t>> {
        let frame = self.frames.pop()?;
        if let Some(positions) = self.by_name.get_mut(frame.tag) {
            positions.pop();
            if positions.is_empty() {
                self.by_name.remove(frame.tag);
            }
        }
        if frame.block_level {
            self.blocks.pop();
        }
        if frame.no_autolink {
            self.no_autolink -= 1;
        }
        Some(frame)
    }

    /// Position of the innermost open `tag`.
    pub fn innermost(&self, tag: &str) -> Option<usize> {
        self.by_name.get(tag).and_then(|positions| positions.last().copied())
    }

    /// Position of the innermost open block-level frame.
    pub fn innermost_block(&self) -> Option<usize> {
        self.blocks.last().copied()
    }

    pub fn count(&self, tag: &str) -> usize {
        self.by_name.get(tag).map_or(0, Vec::len)
    }

    /// Whether any open frame opts out of autolinking.
    pub fn in_no_autolink(&self) -> bool {
        self.no_autolink > 0
    }
}

impl<'t> Deref for TagStack<'t> {
    type Target = [OpenTag<'t>];

    fn deref(&self) -> &Self::Target {
        &self.frames
    }
}

#[cfg(test)]
mod tests {
    use super::TagStack;
    use crate::parser::OpenTag;
    use crate::tags::Trim;

    fn frame(tag: &'static str, block_level: bool, no_autolink: bool) -> OpenTag<'static> {
        OpenTag {
            tag,
            after: format!("</{tag}>"),
            block_level,
            trim: Trim::None,
            has_parents: false,
            require_children: None,
            disallow_children: None,
            no_autolink,
        }
    }

    #[test]
    fn indexes_follow_pushes_and_pops() {
        let mut stack = TagStack::default();
        stack.push(frame("b", false, false));
        stack.push(frame("quote", true, false));
        stack.push(frame("url", false, true));
        stack.push(frame("b", false, false));

        assert_eq!(stack.innermost("b"), Some(3));
        assert_eq!(stack.innermost("i"), None);
        assert_eq!(stack.innermost_block(), Some(1));
        assert_eq!(stack.count("b"), 2);
        assert!(stack.in_no_autolink());

        stack.pop();
        stack.pop();
        assert_eq!(stack.innermost("b"), Some(0));
        assert!(!stack.in_no_autolink());
        assert_eq!(stack.pop().map(|f| f.tag), Some("quote"));
        assert_eq!(stack.innermost_block(), None);
        assert_eq!(stack.len(), 1);
    }
}
