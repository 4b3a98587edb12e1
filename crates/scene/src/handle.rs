//! Stable indices into the scene tables.
//!
//! Handles are created by [`Scene`](crate::Scene) when an entry is inserted
//! and stay valid for the life of the scene; entries are never removed.

use std::fmt;

macro_rules! define_handle {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(u32);

        impl $name {
            /// Wraps a raw table index.
            #[inline]
            pub const fn new(index: u32) -> Self {
                Self(index)
            }

            /// Returns the table index.
            #[inline]
            pub const fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "#{}"), self.0)
            }
        }
    };
}

define_handle!(
    /// Handle to a [`Material`](frameflight_resources::Material) in the scene.
    MaterialId,
    "material"
);

define_handle!(
    /// Handle to a [`MeshGeometry`](crate::MeshGeometry) in the scene.
    GeometryId,
    "geometry"
);

define_handle!(
    /// Handle to a [`RenderItem`](crate::RenderItem) in the scene.
    RenderItemId,
    "item"
);
