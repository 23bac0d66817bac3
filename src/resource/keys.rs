//! Resource identifiers.
//!
//! Keys are chosen by the producer and are opaque here: the queue only
//! copies them into records, and consumers compare them for equality.

use std::fmt;

/// Namespace a key was allocated in, typically one per producer connection.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    rkyv::Archive,
    rkyv::Serialize,
    rkyv::Deserialize,
)]
#[rkyv(derive(Debug, PartialEq, Eq))]
pub struct IdNamespace(pub u32);

macro_rules! namespaced_key {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(
            Clone,
            Copy,
            Debug,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            rkyv::Archive,
            rkyv::Serialize,
            rkyv::Deserialize,
        )]
        #[rkyv(derive(Debug, PartialEq, Eq))]
        pub struct $name {
            /// Namespace the key belongs to.
            pub namespace: IdNamespace,
            /// Identifier within the namespace.
            pub id: u32,
        }

        impl $name {
            /// Create a key.
            pub const fn new(namespace: IdNamespace, id: u32) -> Self {
                Self { namespace, id }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "({}:{})"), self.namespace.0, self.id)
            }
        }
    };
}

namespaced_key!(
    /// Identifies an image (raw, blob or external).
    ImageKey,
    "image"
);

namespaced_key!(
    /// Identifies a font face.
    FontKey,
    "font"
);

namespaced_key!(
    /// Identifies a sized, configured instance of a font face.
    FontInstanceKey,
    "font-instance"
);

/// Identifies an image whose pixels live outside the segment transport
/// (for example a texture owned by the consumer).
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    rkyv::Archive,
    rkyv::Serialize,
    rkyv::Deserialize,
)]
#[rkyv(derive(Debug, PartialEq, Eq))]
pub struct ExternalImageId(pub u64);

impl fmt::Display for ExternalImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "external({})", self.0)
    }
}
