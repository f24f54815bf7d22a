//! `GreenroomServer` builder and server loop.
//!
//! The entry point for running a greenroom deployment: ties together
//! storage, password hashing, the hub, the store, and the WebSocket
//! gateway.

use greenroom_gateway::{LobbyGateway, TokenVerifier};
use greenroom_hub::{HubConfig, RoomsHub};
use greenroom_store::{
    BcryptHasher, MemoryStorage, PasswordHasher, RoomStore, Storage, StoreConfig,
};
use tracing::info;

use crate::{GreenroomError, Lobby};

/// Builder for configuring and starting a greenroom server.
///
/// # Example
///
/// ```rust,no_run
/// use greenroom::prelude::*;
///
/// # async fn run() -> Result<(), GreenroomError> {
/// let server = GreenroomServerBuilder::new()
///     .bind("0.0.0.0:8080")
///     .build(JwtVerifier::new("change-me"))
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct GreenroomServerBuilder {
    bind_addr: String,
    store_config: StoreConfig,
    hub_config: HubConfig,
}

impl GreenroomServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            store_config: StoreConfig::default(),
            hub_config: HubConfig::default(),
        }
    }

    /// Sets the address to bind the gateway to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Sets the room store configuration.
    pub fn store_config(mut self, config: StoreConfig) -> Self {
        self.store_config = config;
        self
    }

    /// Sets the event hub configuration.
    pub fn hub_config(mut self, config: HubConfig) -> Self {
        self.hub_config = config;
        self
    }

    /// Builds a server over in-memory storage and bcrypt hashing at the
    /// default cost.
    pub async fn build<V: TokenVerifier>(
        self,
        verifier: V,
    ) -> Result<GreenroomServer<MemoryStorage, BcryptHasher, V>, GreenroomError> {
        self.build_with(MemoryStorage::default(), BcryptHasher::new(), verifier)
            .await
    }

    /// Builds a server over the given storage and hashing backends.
    ///
    /// Unstarted rooms still present in storage are restored and their
    /// expiry timers re-armed before the gateway starts accepting.
    pub async fn build_with<S, H, V>(
        self,
        storage: S,
        hasher: H,
        verifier: V,
    ) -> Result<GreenroomServer<S, H, V>, GreenroomError>
    where
        S: Storage,
        H: PasswordHasher,
        V: TokenVerifier,
    {
        let hub = RoomsHub::new(self.hub_config);
        let store = RoomStore::new(storage, hasher, hub.clone(), self.store_config);
        store.restore().await?;

        let gateway =
            LobbyGateway::bind(&self.bind_addr, store.clone(), hub.clone(), verifier).await?;

        Ok(GreenroomServer {
            lobby: Lobby::new(store, hub),
            gateway,
        })
    }
}

impl Default for GreenroomServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A running greenroom server.
///
/// Call [`run()`](Self::run) to start accepting connections; grab a
/// [`lobby()`](Self::lobby) handle first for the mutation surface.
pub struct GreenroomServer<S, H, V> {
    lobby: Lobby<S, H>,
    gateway: LobbyGateway<S, H, V>,
}

impl<S, H, V> GreenroomServer<S, H, V>
where
    S: Storage,
    H: PasswordHasher,
    V: TokenVerifier,
{
    /// Creates a new builder.
    pub fn builder() -> GreenroomServerBuilder {
        GreenroomServerBuilder::new()
    }

    /// A handle for creating, joining, and starting rooms.
    pub fn lobby(&self) -> Lobby<S, H> {
        self.lobby.clone()
    }

    /// The address the gateway is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.gateway.local_addr()
    }

    /// Runs the gateway accept loop until the process is terminated.
    pub async fn run(self) -> Result<(), GreenroomError> {
        info!("greenroom server running");
        self.gateway.run().await?;
        Ok(())
    }
}
