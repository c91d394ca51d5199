//! Type path normalization.

use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

static INDEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[[0-9]+\]").expect("static regex"));
static NUMERIC_SEGMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.[0-9]+\.").expect("static regex"));

/// Paths that name the same thing as a canonical key.
pub const ALIASES: &[(&str, &str)] = &[
    ("tipset.ParentStateRoot", "stateRoot"),
    ("initActor.AddressMap", "initActorAddresses"),
    ("storagePowerActor.CronEventQueue", "storagePowerCronEventQueue"),
    ("storagePowerActor.Claims", "storagePowerClaims"),
    (
        "storageMinerActor.Deadlines.Due.ExpirationEpochs",
        "storageMinerActor.Deadlines.Due.ExpirationsEpochs",
    ),
    (
        "storageMinerActor.Deadlines.Due.Partitions.ExpirationEpochs",
        "storageMinerActor.Deadlines.Due.Partitions.ExpirationsEpochs",
    ),
];

static ALIAS_TABLE: LazyLock<HashMap<&'static str, &'static str>> =
    LazyLock::new(|| ALIASES.iter().copied().collect());

/// A normalized type path, the registry's lookup key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeKey(String);

impl TypeKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TypeKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for TypeKey {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for TypeKey {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Normalize a type path.
///
/// `/` becomes `.`, list indices (`[3]`) are dropped and numeric segments
/// (`.3.`) collapse to `.`, repeatedly until nothing changes. The result is
/// then looked up in the alias table. Never fails; resolving a key again
/// returns it unchanged.
pub fn resolve_type(path: &str) -> TypeKey {
    let mut key = path.replace('/', ".");
    loop {
        let stripped = INDEX.replace_all(&key, "");
        let collapsed = NUMERIC_SEGMENT.replace_all(&stripped, ".").into_owned();
        if collapsed == key {
            break;
        }
        key = collapsed;
    }
    match ALIAS_TABLE.get(key.as_str()) {
        Some(canonical) => TypeKey(canonical.to_string()),
        None => TypeKey(key),
    }
}
