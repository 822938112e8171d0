//! Application state shared by the HTTP handlers.

use crate::availability::AvailabilityChecker;
use crate::broadcast::ChannelBroadcaster;
use crate::config::RequestConfig;
use crate::conversation::ConversationService;
use crate::mocks::{
    InMemoryAccounts, InMemoryConversationRepository, InMemoryRequestRepository,
    InMemoryStockRegistry,
};
use crate::providers::{
    ConversationRepository, RegisterTokenRepository, RegistrationStore, RequestRepository,
    UserRepository,
};
use crate::registration::RegistrationService;
use crate::request::{RequestEnvironment, RequestService};
use crate::stock::{Equipment, Material, Reactive, StockCatalog, StockRegistries};
use crate::stores::postgres::PostgresStores;
use labdesk_core::environment::Clock;
use std::sync::Arc;

/// Every storage seam the services are built on.
#[derive(Clone)]
pub struct Providers {
    /// Stock registries, one per kind
    pub stock: StockRegistries,
    /// Request storage
    pub requests: Arc<dyn RequestRepository>,
    /// Conversation storage
    pub conversations: Arc<dyn ConversationRepository>,
    /// User accounts
    pub users: Arc<dyn UserRepository>,
    /// Registration tokens
    pub tokens: Arc<dyn RegisterTokenRepository>,
    /// Atomic token redeem
    pub registration: Arc<dyn RegistrationStore>,
}

impl Providers {
    /// Providers that keep everything in process memory.
    #[must_use]
    pub fn in_memory() -> Self {
        let accounts = Arc::new(InMemoryAccounts::new());
        Self {
            stock: StockRegistries {
                equipment: Arc::new(InMemoryStockRegistry::<Equipment>::new()),
                materials: Arc::new(InMemoryStockRegistry::<Material>::new()),
                reactives: Arc::new(InMemoryStockRegistry::<Reactive>::new()),
            },
            requests: Arc::new(InMemoryRequestRepository::new()),
            conversations: Arc::new(InMemoryConversationRepository::new()),
            users: accounts.clone(),
            tokens: accounts.clone(),
            registration: accounts,
        }
    }

    /// Providers backed by `PostgreSQL`.
    #[must_use]
    pub fn postgres(stores: &PostgresStores) -> Self {
        let accounts = Arc::new(stores.accounts());
        Self {
            stock: stores.stock_registries(),
            requests: Arc::new(stores.requests()),
            conversations: Arc::new(stores.conversations()),
            users: accounts.clone(),
            tokens: accounts.clone(),
            registration: accounts,
        }
    }
}

/// Application state shared across all HTTP handlers.
///
/// Cloned for each request; every field is a cheap handle.
#[derive(Clone)]
pub struct AppState {
    /// Stock CRUD
    pub catalog: StockCatalog,
    /// Request lifecycle
    pub requests: RequestService,
    /// Conversations
    pub conversations: ConversationService,
    /// Tokens and sign-up
    pub registration: RegistrationService,
    /// Room fan-out the WebSocket endpoint subscribes to
    pub rooms: ChannelBroadcaster,
}

impl AppState {
    /// Wire the services on top of `providers`.
    #[must_use]
    pub fn new(
        providers: Providers,
        rooms: ChannelBroadcaster,
        clock: Arc<dyn Clock>,
        config: &RequestConfig,
    ) -> Self {
        let broadcaster = Arc::new(rooms.clone());
        let conversations = ConversationService::new(
            providers.conversations,
            providers.users.clone(),
            broadcaster.clone(),
            clock.clone(),
        );
        let checker = Arc::new(AvailabilityChecker::new(&providers.stock));
        let requests = RequestService::new(
            providers.requests,
            providers.users.clone(),
            conversations.clone(),
            checker,
            RequestEnvironment::new(clock.clone(), broadcaster, config.ttl_seconds()),
        );
        let registration = RegistrationService::new(
            providers.users,
            providers.tokens,
            providers.registration,
            clock.clone(),
        );

        Self {
            catalog: StockCatalog::new(providers.stock, clock),
            requests,
            conversations,
            registration,
            rooms,
        }
    }
}
