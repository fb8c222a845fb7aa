/// A dense index into an [`crate::arena::Arena`]. Never reused within one
/// arena's lifetime; a call to [`crate::Tree::update`] that prunes the tree
/// hands out fresh ids in a brand new arena instead of recycling old ones.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(pub u32);
