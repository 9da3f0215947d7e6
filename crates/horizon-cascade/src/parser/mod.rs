//! CSS parsers.
//!
//! [`raw`] produces coarse, unvalidated units during the streaming pass;
//! [`selector`] and [`declaration`] are the refinement grammars invoked on
//! demand through [`crate::refine::Refinery`].

pub(crate) mod declaration;
pub(crate) mod raw;
pub(crate) mod selector;
