#![forbid(unsafe_code)]

//! Text attribute helpers over view environments.

use vane_core::environment::{TextAlignment, keys};

use crate::view::{self, ViewHandle};

/// Store a text alignment hint on `view`.
///
/// With `cascades` set, descendant views inherit the alignment unless they
/// set their own.
pub fn set_text_alignment(view: ViewHandle, alignment: TextAlignment, cascades: bool) {
    view::set_environment(view, keys::TEXT_ALIGNMENT, alignment, cascades);
}

/// Resolve the text alignment for `view`, walking cascading ancestors.
#[must_use]
pub fn text_alignment(view: ViewHandle) -> Option<TextAlignment> {
    view::environment(view, keys::TEXT_ALIGNMENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::NullAdapter;

    #[test]
    fn alignment_round_trip() {
        let view = view::register(NullAdapter);
        assert_eq!(text_alignment(view), None);

        set_text_alignment(view, TextAlignment::Center, false);
        assert_eq!(text_alignment(view), Some(TextAlignment::Center));
        view::release(view);
    }

    #[test]
    fn alignment_cascades_to_children() {
        let root = view::register(NullAdapter);
        let child = view::register_child(root, NullAdapter);

        set_text_alignment(root, TextAlignment::Trailing, true);
        assert_eq!(text_alignment(child), Some(TextAlignment::Trailing));

        view::release(child);
        view::release(root);
    }
}
