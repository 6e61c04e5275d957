use crate::item::Item;

/// Looks up items by type and name on behalf of an item.
///
/// Item references, reference validation and inheritance rendering all go
/// through a resolver, so that items never hold a handle to their store.
pub trait ItemResolver {
    /// The item of type `item_type` named `name`, if one exists.
    fn resolve(&self, item_type: &str, name: &str) -> Option<Item>;

    fn exists(&self, item_type: &str, name: &str) -> bool {
        self.resolve(item_type, name).is_some()
    }
}

impl<R: ItemResolver + ?Sized> ItemResolver for &R {
    fn resolve(&self, item_type: &str, name: &str) -> Option<Item> {
        (**self).resolve(item_type, name)
    }

    fn exists(&self, item_type: &str, name: &str) -> bool {
        (**self).exists(item_type, name)
    }
}

/// A resolver that knows no items. Every reference is dangling.
#[derive(Clone, Copy, Debug, Default)]
pub struct Detached;

impl ItemResolver for Detached {
    fn resolve(&self, _item_type: &str, _name: &str) -> Option<Item> {
        None
    }

    fn exists(&self, _item_type: &str, _name: &str) -> bool {
        false
    }
}
