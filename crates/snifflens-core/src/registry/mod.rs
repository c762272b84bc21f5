//! Versioned handler registries.
//!
//! Registration happens once at startup through [`RegistryBuilder`];
//! [`RegistryBuilder::freeze`] validates every key's version ranges and
//! produces an immutable [`Registry`] that is shared across decode threads
//! without locking. Resolution picks, among the registrations whose range
//! contains the build, the one with the greatest minimum not exceeding it.
//!
//! Wire layouts that drift across client builds are expressed as separate
//! registrations of the same key, never as build checks inside a routine.

mod error;

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

use crate::decode::DecodeContext;
use crate::wire::WireError;
use crate::{BuildId, Direction};

pub use error::RegistryError;

/// A decode routine. Routines read through the context and report wire
/// failures; they never see the client build.
pub type DecodeFn = fn(&mut DecodeContext<'_>) -> Result<(), WireError>;

/// Primary registry key: opcode plus travel direction.
///
/// # Examples
/// ```
/// use snifflens_core::{Direction, RouteKey};
///
/// let key = RouteKey::new(0x0361, Direction::ServerToClient);
/// assert_eq!(key.to_string(), "0x0361/server_to_client");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RouteKey {
    pub opcode: u32,
    pub direction: Direction,
}

impl RouteKey {
    pub const fn new(opcode: u32, direction: Direction) -> Self {
        Self { opcode, direction }
    }
}

impl fmt::Display for RouteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#06x}/{}", self.opcode, self.direction)
    }
}

/// Secondary registry key: the discriminator carried inside an embedded
/// payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TableKey(pub u32);

impl fmt::Display for TableKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "table {:#010x}", self.0)
    }
}

/// Half-open build range `[min, max)`; an absent `max` runs until the next
/// registered era for the same key.
///
/// # Examples
/// ```
/// use snifflens_core::{BuildId, VersionRange};
///
/// let range = VersionRange::between(BuildId(19033), BuildId(19103));
/// assert!(range.contains(BuildId(19033)));
/// assert!(!range.contains(BuildId(19103)));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionRange {
    min: BuildId,
    max: Option<BuildId>,
}

impl VersionRange {
    pub const fn since(min: BuildId) -> Self {
        Self { min, max: None }
    }

    pub const fn between(min: BuildId, max: BuildId) -> Self {
        Self {
            min,
            max: Some(max),
        }
    }

    pub fn min(&self) -> BuildId {
        self.min
    }

    pub fn contains(&self, build: BuildId) -> bool {
        build >= self.min && self.max.is_none_or(|max| build < max)
    }
}

/// A frozen registration: routine, display name and the range it covers.
#[derive(Debug)]
pub struct Handler {
    pub name: &'static str,
    pub routine: DecodeFn,
    range: VersionRange,
}

impl Handler {
    pub fn range(&self) -> VersionRange {
        self.range
    }
}

/// Startup-time registration surface.
pub struct RegistryBuilder<K> {
    entries: Vec<(K, Handler)>,
}

impl<K> Default for RegistryBuilder<K>
where
    K: Copy + Eq + Hash + fmt::Display,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K> RegistryBuilder<K>
where
    K: Copy + Eq + Hash + fmt::Display,
{
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn register(&mut self, key: K, range: VersionRange, name: &'static str, routine: DecodeFn) {
        self.entries.push((
            key,
            Handler {
                name,
                routine,
                range,
            },
        ));
    }

    /// Validate all ranges and produce the immutable registry.
    ///
    /// Per key, minimum builds must be distinct and an explicit `max` must
    /// not reach into the next era. Violations are fatal here so that no
    /// ambiguity can surface later on a per-packet basis.
    pub fn freeze(self) -> Result<Registry<K>, RegistryError> {
        let mut handlers: HashMap<K, Vec<Handler>> = HashMap::new();
        for (key, handler) in self.entries {
            handlers.entry(key).or_default().push(handler);
        }

        for (key, entries) in &mut handlers {
            entries.sort_by_key(|handler| handler.range.min());
            for pair in entries.windows(2) {
                let (earlier, later) = (&pair[0], &pair[1]);
                if earlier.range.min() == later.range.min() {
                    return Err(RegistryError::DuplicateMin {
                        key: key.to_string(),
                        build: earlier.range.min(),
                        first: earlier.name,
                        second: later.name,
                    });
                }
                if let Some(max) = earlier.range.max {
                    if max > later.range.min() {
                        return Err(RegistryError::Overlap {
                            key: key.to_string(),
                            first: earlier.name,
                            second: later.name,
                        });
                    }
                }
            }
        }

        Ok(Registry { handlers })
    }
}

/// Immutable, validated handler table.
///
/// Lookups are read-only; the registry is shared across worker threads
/// behind the dispatcher without synchronization.
#[derive(Debug)]
pub struct Registry<K> {
    handlers: HashMap<K, Vec<Handler>>,
}

impl<K> Registry<K>
where
    K: Copy + Eq + Hash + fmt::Display,
{
    /// Total number of registrations across all keys.
    pub fn len(&self) -> usize {
        self.handlers.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Resolve the handler for `key` at `build`.
    ///
    /// Among registrations whose range contains the build, the one with the
    /// greatest minimum wins. A build older than every era, or falling in a
    /// gap between two closed ranges, resolves to nothing: decoding with a
    /// neighbouring era's layout would mis-read the payload.
    pub fn resolve(&self, key: K, build: BuildId) -> Result<&Handler, RegistryError> {
        let unknown = || RegistryError::Unknown {
            key: key.to_string(),
            build,
        };
        let entries = self.handlers.get(&key).ok_or_else(unknown)?;
        let candidate = entries
            .iter()
            .rev()
            .find(|handler| handler.range.min() <= build)
            .ok_or_else(unknown)?;
        if candidate.range.contains(build) {
            Ok(candidate)
        } else {
            Err(unknown())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(_ctx: &mut DecodeContext<'_>) -> Result<(), WireError> {
        Ok(())
    }

    const KEY: RouteKey = RouteKey::new(0x10, Direction::ClientToServer);

    #[test]
    fn resolves_greatest_min_not_exceeding_build() {
        let mut builder = RegistryBuilder::new();
        builder.register(KEY, VersionRange::since(BuildId(0)), "base", noop);
        builder.register(KEY, VersionRange::since(BuildId(19033)), "wod", noop);
        builder.register(KEY, VersionRange::since(BuildId(19700)), "next", noop);
        let registry = builder.freeze().unwrap();

        assert_eq!(registry.resolve(KEY, BuildId(18000)).unwrap().name, "base");
        assert_eq!(registry.resolve(KEY, BuildId(19033)).unwrap().name, "wod");
        assert_eq!(registry.resolve(KEY, BuildId(19500)).unwrap().name, "wod");
        assert_eq!(registry.resolve(KEY, BuildId(19700)).unwrap().name, "next");
        assert_eq!(registry.resolve(KEY, BuildId(30000)).unwrap().name, "next");
    }

    #[test]
    fn build_below_every_era_is_unknown() {
        let mut builder = RegistryBuilder::new();
        builder.register(KEY, VersionRange::since(BuildId(19033)), "wod", noop);
        builder.register(KEY, VersionRange::since(BuildId(19700)), "next", noop);
        let registry = builder.freeze().unwrap();

        let err = registry.resolve(KEY, BuildId(18000)).unwrap_err();
        assert_eq!(
            err,
            RegistryError::Unknown {
                key: KEY.to_string(),
                build: BuildId(18000),
            }
        );
    }

    #[test]
    fn gap_between_closed_and_later_era_is_unknown() {
        let mut builder = RegistryBuilder::new();
        builder.register(
            KEY,
            VersionRange::between(BuildId(19033), BuildId(19103)),
            "early",
            noop,
        );
        builder.register(KEY, VersionRange::since(BuildId(19700)), "late", noop);
        let registry = builder.freeze().unwrap();

        assert_eq!(registry.resolve(KEY, BuildId(19033)).unwrap().name, "early");
        assert!(registry.resolve(KEY, BuildId(19500)).is_err());
        assert_eq!(registry.resolve(KEY, BuildId(19700)).unwrap().name, "late");
    }

    #[test]
    fn unregistered_key_is_unknown() {
        let registry = RegistryBuilder::<RouteKey>::new().freeze().unwrap();
        assert!(registry.resolve(KEY, BuildId(19033)).is_err());
    }

    #[test]
    fn duplicate_minimum_is_rejected_at_freeze() {
        let mut builder = RegistryBuilder::new();
        builder.register(KEY, VersionRange::since(BuildId(19033)), "first", noop);
        builder.register(KEY, VersionRange::since(BuildId(19033)), "second", noop);

        let err = builder.freeze().unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateMin { .. }));
    }

    #[test]
    fn overlapping_explicit_max_is_rejected_at_freeze() {
        let mut builder = RegistryBuilder::new();
        builder.register(
            KEY,
            VersionRange::between(BuildId(19033), BuildId(19710)),
            "wide",
            noop,
        );
        builder.register(KEY, VersionRange::since(BuildId(19700)), "late", noop);

        let err = builder.freeze().unwrap_err();
        assert_eq!(
            err,
            RegistryError::Overlap {
                key: KEY.to_string(),
                first: "wide",
                second: "late",
            }
        );
    }

    #[test]
    fn open_range_is_clipped_by_next_era() {
        let mut builder = RegistryBuilder::new();
        builder.register(KEY, VersionRange::since(BuildId(10)), "a", noop);
        builder.register(KEY, VersionRange::since(BuildId(20)), "b", noop);
        let registry = builder.freeze().unwrap();

        assert_eq!(registry.resolve(KEY, BuildId(15)).unwrap().name, "a");
        assert_eq!(registry.resolve(KEY, BuildId(20)).unwrap().name, "b");
    }

    #[test]
    fn max_equal_to_next_min_is_accepted() {
        let mut builder = RegistryBuilder::new();
        builder.register(
            KEY,
            VersionRange::between(BuildId(19033), BuildId(19103)),
            "early",
            noop,
        );
        builder.register(KEY, VersionRange::since(BuildId(19103)), "late", noop);
        let registry = builder.freeze().unwrap();

        assert_eq!(registry.resolve(KEY, BuildId(19102)).unwrap().name, "early");
        assert_eq!(registry.resolve(KEY, BuildId(19103)).unwrap().name, "late");
    }
}
