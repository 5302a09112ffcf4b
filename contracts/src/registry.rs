//! # Module Registry
//!
//! An append-only table of module versions. Each version maps operation
//! selectors to the address of the module that implements them:
//!
//! ```text
//! "1.0.0" ─┬─ pulse        → base-module
//!          ├─ withdraw     → base-module
//!          └─ supply       → yield-module
//! "1.1.0" ─┬─ ...
//! ```
//!
//! Once a version tag is registered its bindings never change. A second
//! registration under the same tag is rejected whole, even if it only
//! adds selectors. Upgrades get a fresh tag, and vaults opt in by moving
//! their own `version`.
//!
//! Module code is deployed into a catalog keyed by an address derived from
//! the module's name. A version can only point at deployed modules.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use pulsevault_protocol::config::{GENESIS_MODULE_VERSION, MODULE_ID_DOMAIN};
use pulsevault_protocol::types::{AccountId, ModuleVersion, Selector};
use tracing::info;

use crate::error::{ContractResult, RoutingError, StateError, ValidationError};
use crate::modules::{builtin_modules, VaultModule};

/// Deployed modules plus the versioned selector table.
#[derive(Default)]
pub struct ModuleRegistry {
    versions: BTreeMap<ModuleVersion, BTreeMap<Selector, AccountId>>,
    catalog: HashMap<AccountId, Arc<dyn VaultModule>>,
}

/// Address a module is deployed at.
pub fn module_address(name: &str) -> AccountId {
    AccountId::derive(MODULE_ID_DOMAIN, &[name.as_bytes()])
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the built-in modules deployed and registered under
    /// the genesis version.
    pub fn with_builtin_modules() -> ContractResult<Self> {
        let mut registry = Self::new();
        let genesis = ModuleVersion::new(GENESIS_MODULE_VERSION)
            .map_err(|_| ValidationError::EmptyImplementation)?;
        registry.register_version_from_modules(genesis, &builtin_modules())?;
        Ok(registry)
    }

    /// Add module code to the catalog. Deploying the same name twice keeps
    /// the first deployment.
    pub fn deploy_module(&mut self, module: Arc<dyn VaultModule>) -> AccountId {
        let address = module_address(module.name());
        self.catalog.entry(address).or_insert_with(|| {
            info!(module = module.name(), %address, "module deployed");
            module
        });
        address
    }

    pub fn is_deployed(&self, address: &AccountId) -> bool {
        self.catalog.contains_key(address)
    }

    /// Bind `selectors[i]` to `addresses[i]` under a brand-new `version`.
    ///
    /// All-or-nothing: every check runs before anything is written.
    pub fn set_new_version_implementation(
        &mut self,
        version: ModuleVersion,
        selectors: &[Selector],
        addresses: &[AccountId],
    ) -> ContractResult<()> {
        if selectors.len() != addresses.len() {
            return Err(ValidationError::LengthMismatch {
                what: "addresses",
                expected: selectors.len(),
                actual: addresses.len(),
            }
            .into());
        }
        if self.versions.contains_key(&version) {
            return Err(StateError::VersionExists(version).into());
        }
        if selectors.is_empty() {
            return Err(ValidationError::EmptyImplementation.into());
        }

        let mut table = BTreeMap::new();
        for (selector, address) in selectors.iter().zip(addresses) {
            if !self.is_deployed(address) {
                return Err(ValidationError::UnknownModule(*address).into());
            }
            if table.insert(*selector, *address).is_some() {
                return Err(ValidationError::DuplicateSelector(*selector).into());
            }
        }

        info!(%version, selectors = table.len(), "module version registered");
        self.versions.insert(version, table);
        Ok(())
    }

    /// Deploy `modules` and register every selector they expose under
    /// `version`.
    pub fn register_version_from_modules(
        &mut self,
        version: ModuleVersion,
        modules: &[Arc<dyn VaultModule>],
    ) -> ContractResult<()> {
        if self.versions.contains_key(&version) {
            return Err(StateError::VersionExists(version).into());
        }
        let mut selectors = Vec::new();
        let mut addresses = Vec::new();
        for module in modules {
            let address = self.deploy_module(Arc::clone(module));
            for selector in module.selectors() {
                selectors.push(selector);
                addresses.push(address);
            }
        }
        self.set_new_version_implementation(version, &selectors, &addresses)
    }

    pub fn has_version(&self, version: &ModuleVersion) -> bool {
        self.versions.contains_key(version)
    }

    pub fn versions(&self) -> impl Iterator<Item = &ModuleVersion> {
        self.versions.keys()
    }

    pub fn implementation_address(
        &self,
        version: &ModuleVersion,
        selector: &Selector,
    ) -> Option<AccountId> {
        self.versions
            .get(version)
            .and_then(|table| table.get(selector))
            .copied()
    }

    /// The module that executes `selector` for vaults on `version`.
    pub fn resolve(
        &self,
        version: &ModuleVersion,
        selector: &Selector,
    ) -> ContractResult<Arc<dyn VaultModule>> {
        self.implementation_address(version, selector)
            .and_then(|address| self.catalog.get(&address))
            .cloned()
            .ok_or_else(|| {
                RoutingError::NoImplementation {
                    version: version.clone(),
                    selector: *selector,
                }
                .into()
            })
    }
}

impl fmt::Debug for ModuleRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let modules: BTreeSet<&'static str> = self.catalog.values().map(|m| m.name()).collect();
        f.debug_struct("ModuleRegistry")
            .field("versions", &self.versions.keys().collect::<Vec<_>>())
            .field("modules", &modules)
            .finish()
    }
}
