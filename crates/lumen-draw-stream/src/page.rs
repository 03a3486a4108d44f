use lumen_pages::{PageBlock, PAGE_SIZE};

use crate::opcode::Opcode;

/// One pool block plus its fill level.
///
/// The byte at `used` is always an `End` opcode, so a page is terminated at
/// every point of its life.
pub(crate) struct Page {
    block: PageBlock,
    used: usize,
}

impl Page {
    /// Bytes available to instructions; the final byte is kept for `End`.
    pub(crate) const CAPACITY: usize = PAGE_SIZE - 1;

    pub(crate) fn new(mut block: PageBlock) -> Self {
        block[0] = Opcode::End as u8;
        Self { block, used: 0 }
    }

    pub(crate) fn fits(&self, size: usize) -> bool {
        self.used + size <= Self::CAPACITY
    }

    /// Carves `size` bytes off the end of the page.
    ///
    /// # Panics
    ///
    /// Panics if the region does not fit; callers check [`Page::fits`] first.
    pub(crate) fn alloc(&mut self, size: usize) -> &mut [u8] {
        assert!(self.fits(size), "page overflow: {} + {size} bytes", self.used);
        let start = self.used;
        self.used += size;
        self.block[self.used] = Opcode::End as u8;
        &mut self.block[start..self.used]
    }

    pub(crate) fn used(&self) -> usize {
        self.used
    }

    /// Recorded bytes including the trailing `End`.
    pub(crate) fn bytes(&self) -> &[u8] {
        &self.block[..=self.used]
    }

    pub(crate) fn into_block(self) -> PageBlock {
        self.block
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page() -> Page {
        Page::new(Box::new([0xAA; PAGE_SIZE]))
    }

    #[test]
    fn fresh_page_is_terminated() {
        let page = page();
        assert_eq!(page.bytes(), &[Opcode::End as u8]);
    }

    #[test]
    fn alloc_keeps_terminator_after_region() {
        let mut page = page();
        page.alloc(3).copy_from_slice(&[1, 2, 3]);
        assert_eq!(page.used(), 3);
        assert_eq!(page.bytes(), &[1, 2, 3, Opcode::End as u8]);
    }

    #[test]
    fn last_byte_is_reserved() {
        let mut page = page();
        assert!(page.fits(Page::CAPACITY));
        assert!(!page.fits(PAGE_SIZE));
        page.alloc(Page::CAPACITY - 1);
        assert!(page.fits(1));
        assert!(!page.fits(2));
        page.alloc(1);
        assert_eq!(page.bytes().len(), PAGE_SIZE);
        assert_eq!(page.bytes()[PAGE_SIZE - 1], Opcode::End as u8);
    }
}
