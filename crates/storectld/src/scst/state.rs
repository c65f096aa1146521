use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One configured target, the unit `create_target`/`snapshot` operate on.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Target {
    pub name: String,
    pub path: String,
}

/// The module's entire in-memory state, keyed by target name. `config`
/// serializes this whole, `init` replaces it wholesale from a previously
/// serialized copy — standing in for the original's `config_mod.c`
/// persistence round trip without a real on-disk format.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct ScstState {
    pub targets: BTreeMap<String, Target>,
}
