//! Modifiers understood by the headless backend

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use arbor_core::{AttributeModifier, ComposedModifier, Element};

/// Rounds the corners of the view it is applied to
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CornerRadius(pub f32);

impl AttributeModifier for CornerRadius {
    fn propagates(&self) -> bool {
        false
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Uniform inset around the view's content
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Padding(pub f32);

impl AttributeModifier for Padding {
    fn propagates(&self) -> bool {
        false
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Disables interaction for the view and everything below it
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Disabled(pub bool);

impl AttributeModifier for Disabled {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Tap handler attached to the view it is applied to
#[derive(Clone)]
pub struct OnTap(pub Rc<dyn Fn()>);

impl fmt::Debug for OnTap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("OnTap")
    }
}

impl AttributeModifier for OnTap {
    fn propagates(&self) -> bool {
        false
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Card styling: padding plus rounded corners
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Card {
    pub padding: f32,
    pub radius: f32,
}

impl Default for Card {
    fn default() -> Self {
        Self {
            padding: 12.0,
            radius: 8.0,
        }
    }
}

impl ComposedModifier for Card {
    fn body(&self, content: Element) -> Element {
        content
            .modifier(Padding(self.padding))
            .modifier(CornerRadius(self.radius))
    }
}

/// Fluent modifier methods for [`Element`]
pub trait HeadlessModifiers: Sized {
    fn corner_radius(self, radius: f32) -> Element;
    fn padding(self, padding: f32) -> Element;
    fn disabled(self, disabled: bool) -> Element;
    fn on_tap(self, handler: impl Fn() + 'static) -> Element;
    fn card(self) -> Element;
}

impl<T: Into<Element>> HeadlessModifiers for T {
    fn corner_radius(self, radius: f32) -> Element {
        self.into().modifier(CornerRadius(radius))
    }

    fn padding(self, padding: f32) -> Element {
        self.into().modifier(Padding(padding))
    }

    fn disabled(self, disabled: bool) -> Element {
        self.into().modifier(Disabled(disabled))
    }

    fn on_tap(self, handler: impl Fn() + 'static) -> Element {
        self.into().modifier(OnTap(Rc::new(handler)))
    }

    fn card(self) -> Element {
        self.into().compose(Card::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::text;
    use arbor_core::reduce;

    #[test]
    fn test_card_expands_to_padding_and_radius() {
        let (base, modifiers) = reduce(&text("hi").card(), 16).unwrap();
        assert!(!base.is_empty());
        assert_eq!(modifiers.get::<Padding>(), Some(&Padding(12.0)));
        assert_eq!(modifiers.get::<CornerRadius>(), Some(&CornerRadius(8.0)));
    }

    #[test]
    fn test_outer_modifier_keeps_inner_value() {
        let (_, modifiers) = reduce(&text("hi").card().padding(2.0), 16).unwrap();
        // Card is the inner layer, so its padding wins
        assert_eq!(modifiers.get::<Padding>(), Some(&Padding(12.0)));
    }

    #[test]
    fn test_only_disabled_propagates() {
        let (_, modifiers) = reduce(
            &text("x").on_tap(|| {}).disabled(true).corner_radius(1.0),
            16,
        )
        .unwrap();
        let inherited = modifiers.propagating();
        assert_eq!(inherited.len(), 1);
        assert_eq!(inherited.get::<Disabled>(), Some(&Disabled(true)));
    }
}
