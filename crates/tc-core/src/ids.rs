//! Strongly typed identifier wrappers.
//!
//! The external engine names everything with strings, so every ID wraps an
//! `Arc<str>`: cloning into a per-tick snapshot is a reference-count bump,
//! not a heap copy.  All IDs are `Ord + Hash` and `Borrow<str>`, so a
//! `HashSet<VehicleId>` can be probed with a plain `&str`.

use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Generate a typed ID wrapper around a shared string.
macro_rules! string_id {
    ($(#[$attr:meta])* $vis:vis struct $name:ident;) => {
        $(#[$attr])*
        #[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        #[cfg_attr(feature = "serde", serde(transparent))]
        $vis struct $name(Arc<str>);

        impl $name {
            pub fn new(id: impl AsRef<str>) -> Self {
                $name(Arc::from(id.as_ref()))
            }

            #[inline]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// `true` for the empty string (or one made only of whitespace),
            /// which the engine never accepts as an identifier.
            #[inline]
            pub fn is_blank(&self) -> bool {
                self.0.trim().is_empty()
            }
        }

        impl Default for $name {
            /// The empty ID, visibly unset.
            fn default() -> Self {
                $name(Arc::from(""))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                $name::new(s)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                $name(Arc::from(s))
            }
        }
    };
}

string_id! {
    /// A vehicle known to the engine.
    pub struct VehicleId;
}

string_id! {
    /// A registered route (ordered list of edges).
    pub struct RouteId;
}

string_id! {
    /// A directed road segment.
    pub struct EdgeId;
}

string_id! {
    /// A traffic light (TLS) controlled by the engine.
    pub struct LightId;
}

string_id! {
    /// A vehicle type (`vType`) the engine knows how to instantiate.
    pub struct VehicleTypeId;
}

/// Prefix of every ID handed out by [`VehicleId::next_injected`].
pub const INJECTED_PREFIX: &str = "inj_";

static NEXT_INJECTED: AtomicU64 = AtomicU64::new(0);

impl VehicleId {
    /// A fresh ID for an injected vehicle, unique for the lifetime of the
    /// process (`inj_0`, `inj_1`, …).
    pub fn next_injected() -> VehicleId {
        let n = NEXT_INJECTED.fetch_add(1, Ordering::Relaxed);
        VehicleId::from(format!("{INJECTED_PREFIX}{n}"))
    }
}
