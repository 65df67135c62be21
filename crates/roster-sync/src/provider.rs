//! Identity provider over a store, a set of vaults and a codec

use roster_core::config::ConfigValidation;
use roster_core::{
    ClaimCodec, IdentityProvider, JwtCodec, KeyVaults, OperatorNode, ProviderConfig, Result,
    StoreBackend,
};
use roster_store::{DirectoryKeyVaults, DirectoryStore};

use crate::loader::Loader;
use crate::synchronizer::{StoreSummary, Synchronizer};

/// Load/store engine bound to its collaborators
#[derive(Debug, Clone)]
pub struct Provider<S, V, C = JwtCodec> {
    store: S,
    vaults: V,
    codec: C,
}

/// Provider over the directory layout with JWT claims
pub type DirectoryProvider = Provider<DirectoryStore, DirectoryKeyVaults, JwtCodec>;

impl<S, V> Provider<S, V, JwtCodec>
where
    S: StoreBackend,
    V: KeyVaults,
{
    /// Provider decoding claims with [`JwtCodec`]
    pub fn new(store: S, vaults: V) -> Self {
        Self::with_codec(store, vaults, JwtCodec)
    }
}

impl<S, V, C> Provider<S, V, C>
where
    S: StoreBackend,
    V: KeyVaults,
    C: ClaimCodec,
{
    /// Provider with an explicit codec
    pub fn with_codec(store: S, vaults: V, codec: C) -> Self {
        Self {
            store,
            vaults,
            codec,
        }
    }

    /// Claim store
    pub fn store_backend(&self) -> &S {
        &self.store
    }

    /// Key vaults
    pub fn vaults(&self) -> &V {
        &self.vaults
    }

    /// Store and report per-operator what was written
    pub fn store_with_summary(&self, operators: &mut [OperatorNode]) -> Result<Vec<StoreSummary>> {
        Synchronizer::new(&self.store, &self.vaults).store(operators)
    }
}

impl DirectoryProvider {
    /// Provider over the directories named in `config`
    pub fn from_config(config: &ProviderConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(
            DirectoryStore::new(&config.stores_dir),
            DirectoryKeyVaults::new(&config.keys_dir),
        ))
    }
}

impl<S, V, C> IdentityProvider for Provider<S, V, C>
where
    S: StoreBackend,
    V: KeyVaults,
    C: ClaimCodec,
{
    fn load(&self) -> Result<Vec<OperatorNode>> {
        Loader::new(&self.store, &self.vaults, &self.codec).load()
    }

    fn store(&self, operators: &mut [OperatorNode]) -> Result<()> {
        self.store_with_summary(operators).map(|_| ())
    }
}
