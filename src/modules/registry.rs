// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Per-context module registry.
//!
//! Modules are reachable two ways: by the name they were loaded under, and by
//! identity, which is how the engine presents a referrer while linking.
//! Identity lookups are narrowed to the records sharing the engine's identity
//! hash and then confirmed by comparing handles, since hashes may collide.
//! The registry only grows; nothing is removed before the context is
//! disposed.

use rustc_hash::FxHashMap;

/// Identity of a compiled module within one context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModuleId(u32);

/// A compiled module unit.
#[derive(Debug)]
pub(crate) struct ModuleRecord<M> {
    pub(crate) name: String,
    pub(crate) module: M,
}

/// Name and identity lookup over compiled modules, plus the resolution
/// tables captured for each referrer before it was linked.
#[derive(Debug)]
pub(crate) struct ModuleRegistry<M> {
    records: Vec<ModuleRecord<M>>,
    by_name: FxHashMap<String, ModuleId>,
    by_hash: FxHashMap<i32, Vec<ModuleId>>,
    resolutions: FxHashMap<ModuleId, FxHashMap<String, ModuleId>>,
}

impl<M> Default for ModuleRegistry<M> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            by_name: FxHashMap::default(),
            by_hash: FxHashMap::default(),
            resolutions: FxHashMap::default(),
        }
    }
}

impl<M> ModuleRegistry<M> {
    /// Register a compiled module under `name`, bucketed by `hash`.
    ///
    /// Registering a name twice rebinds the name; the earlier module stays
    /// resolvable by identity for the modules already linked against it.
    pub(crate) fn register(&mut self, name: &str, hash: i32, module: M) -> ModuleId {
        let id = ModuleId(self.records.len() as u32);
        self.by_hash.entry(hash).or_default().push(id);
        self.records.push(ModuleRecord {
            name: name.to_string(),
            module,
        });
        if self.by_name.insert(name.to_string(), id).is_some() {
            tracing::warn!(module = name, "module name registered twice, rebinding");
        }
        id
    }

    /// Look up a module by name
    pub(crate) fn lookup(&self, name: &str) -> Option<ModuleId> {
        self.by_name.get(name).copied()
    }

    pub(crate) fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Registered names, sorted
    pub(crate) fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.by_name.keys().cloned().collect();
        names.sort();
        names
    }

    pub(crate) fn record(&self, id: ModuleId) -> Option<&ModuleRecord<M>> {
        self.records.get(id.0 as usize)
    }

    pub(crate) fn module(&self, id: ModuleId) -> Option<&M> {
        self.record(id).map(|record| &record.module)
    }

    /// Find a module by identity among those registered with `hash`.
    /// The most recent registration wins.
    pub(crate) fn identify(&self, hash: i32, mut is_same: impl FnMut(&M) -> bool) -> Option<ModuleId> {
        self.by_hash
            .get(&hash)?
            .iter()
            .rev()
            .copied()
            .find(|id| self.module(*id).is_some_and(|module| is_same(module)))
    }

    /// Store the answers for a referrer's import specifiers.
    ///
    /// A referrer's table is fixed once recorded; a second table is ignored.
    pub(crate) fn record_resolutions(
        &mut self,
        referrer: ModuleId,
        table: FxHashMap<String, ModuleId>,
    ) {
        self.resolutions.entry(referrer).or_insert(table);
    }

    /// Answer an import of `specifier` made by `referrer`.
    pub(crate) fn resolve(&self, referrer: ModuleId, specifier: &str) -> Option<ModuleId> {
        self.resolutions.get(&referrer)?.get(specifier).copied()
    }

    pub(crate) fn len(&self) -> usize {
        self.records.len()
    }
}
